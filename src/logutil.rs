//! Helpers for putting untrusted chat text into log lines.

use std::fmt::Write;

/// Longest chat preview written to the log, in characters.
pub const MAX_PREVIEW: usize = 200;

/// Render chat text on a single line.
///
/// Line breaks and tabs become `\n`, `\r`, `\t`; other control characters
/// and bidi overrides become `\u{..}` escapes. Text past [`MAX_PREVIEW`]
/// characters is cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || is_bidi_control(c) => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

// Can visually reorder the rest of a log line.
fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_text_stays_on_one_line() {
        assert_eq!(escape_log("gg\nwp\r\t!"), "gg\\nwp\\r\\t!");
        assert_eq!(escape_log("a\u{7}b"), "a\\u{7}b");
        assert_eq!(escape_log("x\u{202E}y"), "x\\u{202e}y");
    }

    #[test]
    fn long_messages_are_cut() {
        let long = "k".repeat(MAX_PREVIEW + 50);
        let esc = escape_log(&long);
        assert_eq!(esc.chars().count(), MAX_PREVIEW + 1);
        assert!(esc.ends_with('…'));
    }
}
