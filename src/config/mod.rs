//! # Configuration Management Module
//!
//! One TOML file configures the host and all three games. Every section is
//! optional; missing sections and keys take their defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatgames::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Channel: {}", config.chat.channel);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [chat]
//! channel = "mychannel"
//! command_prefix = "!"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "chatgames.log"
//!
//! [memory]
//! board_size = "6x4"
//! max_players = 10
//!
//! [roulette]
//! starting_balance = 1000
//! red_chance = 50
//! black_chance = 45
//! green_chance = 5
//!
//! [number_guess]
//! min_number = 1
//! max_number = 100
//! cooldown_seconds = 30
//!
//! [[faces]]
//! id = "25"
//! name = "Kappa"
//! ```
//!
//! Saved game blobs override the game sections once a game has been played.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::games::commands::ALLOWED_PREFIXES;
use crate::games::memory::{BoardSize, Face, MemorySettings};
use crate::games::number_guess::{NumberGuessSettings, MAX_COOLDOWN_SECONDS};
use crate::games::roulette::RouletteSettings;
use crate::games::EngineOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Channel the games listen to; informational for the stdin host.
    #[serde(default)]
    pub channel: String,
    /// Command prefix. Must be one of `! ^ + $ / >`; anything else falls back to `!`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_prefix: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            command_prefix: Some("!".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub roulette: RouletteSettings,
    #[serde(default)]
    pub number_guess: NumberGuessSettings,
    /// Memory face catalogue; placeholders are generated when empty.
    #[serde(default)]
    pub faces: Vec<Face>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values no game could start with. Softer problems are reported
    /// by [`Config::warnings`].
    pub fn validate(&self) -> Result<()> {
        self.memory
            .board_size
            .parse::<BoardSize>()
            .map_err(|e| anyhow!("[memory] {}", e))?;
        if self.memory.max_players == 0 {
            return Err(anyhow!("[memory] max_players must be at least 1"));
        }
        if self.number_guess.min_number >= self.number_guess.max_number {
            return Err(anyhow!(
                "[number_guess] min_number ({}) must be below max_number ({})",
                self.number_guess.min_number,
                self.number_guess.max_number
            ));
        }
        if self.roulette.total_segments == 0 {
            return Err(anyhow!("[roulette] total_segments must be at least 1"));
        }
        if self.number_guess.cooldown_seconds > MAX_COOLDOWN_SECONDS {
            return Err(anyhow!(
                "[number_guess] cooldown_seconds ({}) must not exceed {}",
                self.number_guess.cooldown_seconds,
                MAX_COOLDOWN_SECONDS
            ));
        }
        Ok(())
    }

    /// Problems that fall back to a default instead of failing the load.
    /// Callers log these once logging is up.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(raw) = self.chat.command_prefix.as_deref() {
            if raw.trim() != self.command_prefix().to_string() {
                warnings.push(format!("Ignoring invalid command_prefix {:?}; using '!'", raw));
            }
        }
        warnings
    }

    /// Effective command prefix after validation.
    pub fn command_prefix(&self) -> char {
        self.chat
            .command_prefix
            .as_deref()
            .map(str::trim)
            .and_then(|p| {
                let mut chars = p.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if ALLOWED_PREFIXES.contains(&c) => Some(c),
                    _ => None,
                }
            })
            .unwrap_or('!')
    }

    pub fn engine_options(&self, seed: Option<u64>) -> EngineOptions {
        EngineOptions {
            memory: self.memory.clone(),
            roulette: self.roulette.clone(),
            number_guess: self.number_guess.clone(),
            faces: self.faces.clone(),
            command_prefix: Some(self.command_prefix().to_string()),
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.roulette.starting_balance, 1000);
        assert_eq!(config.memory.board_size, "6x4");
        assert_eq!(config.storage.data_dir, "./data");
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chat]
            command_prefix = "^"

            [roulette]
            green_chance = 10

            [[faces]]
            id = "1"
            name = "Kappa"
            "#,
        )
        .unwrap();
        assert_eq!(config.command_prefix(), '^');
        assert_eq!(config.roulette.green_chance, 10);
        assert_eq!(config.roulette.red_chance, 50);
        assert_eq!(config.faces.len(), 1);
        assert!(config.faces[0].url.is_none());
    }

    #[test]
    fn invalid_prefix_falls_back() {
        let mut config = Config::default();
        config.chat.command_prefix = Some("#".into());
        assert_eq!(config.command_prefix(), '!');
        assert!(config.validate().is_ok());
        assert_eq!(config.warnings().len(), 1);
        assert!(Config::default().warnings().is_empty());
    }

    #[test]
    fn validate_rejects_unplayable_settings() {
        let mut config = Config::default();
        config.memory.board_size = "3x3".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.number_guess.min_number = 100;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.number_guess.cooldown_seconds = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn create_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let config = Config::load(path).await.unwrap();
        assert_eq!(config.number_guess.cooldown_seconds, 30);
        assert!(Config::load("/nonexistent/config.toml").await.is_err());
    }
}
