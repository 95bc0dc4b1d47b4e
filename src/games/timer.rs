//! One-shot resolution timer.
//!
//! At most one deferred resolution is in flight per game. Scheduling a new one
//! aborts the previous task, and [`ResolutionTimer::cancel`] aborts it outright.
//! Even if an aborted timer already fired, the engine drops the stale ticket.

use log::trace;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::{Deferred, ResolutionTicket};

pub struct ResolutionTimer {
    tx: mpsc::UnboundedSender<ResolutionTicket>,
    handle: Option<JoinHandle<()>>,
}

impl ResolutionTimer {
    /// Create a timer plus the receiver that yields tickets as they come due.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResolutionTicket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, handle: None }, rx)
    }

    /// Deliver `deferred.ticket` after `deferred.delay`, replacing any earlier schedule.
    pub fn schedule(&mut self, deferred: Deferred) {
        self.cancel();
        let tx = self.tx.clone();
        let Deferred { ticket, delay } = deferred;
        trace!("Scheduling resolution {:?} in {:?}", ticket, delay);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the server is shutting down.
            let _ = tx.send(ticket);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// True while a scheduled resolution has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for ResolutionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
