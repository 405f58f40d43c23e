//! Engine configuration: tunables (batch caps, payload cap, clock tick)
//! made overridable through layered defaults — defaults, then an optional
//! TOML file, then `LEDGERSYNC_*` environment variables — and validated on
//! load so a bad override fails fast instead of silently misbehaving at
//! 3am.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tunable limits for the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum items accepted in a single `push` batch.
    pub max_push_batch: usize,
    /// Maximum items returned from a single `pull` page.
    pub max_pull_page: usize,
    /// Maximum serialized payload size per item, in bytes.
    pub max_payload_bytes: usize,
    /// Minimum spacing, in microseconds, enforced between two
    /// `server_modified` assignments on the same wallet.
    pub clock_tick_epsilon_micros: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_push_batch: 200,
            max_pull_page: 500,
            max_payload_bytes: 256 * 1024,
            clock_tick_epsilon_micros: 1,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then overlay a TOML file if present, then environment
    /// variables (`LEDGERSYNC_MAX_PUSH_BATCH`, etc.), validating the result.
    pub fn load(toml_path: Option<&std::path::Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = toml_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| Error::config(format!("reading {}: {e}", path.display())))?;
            config = toml::from_str(&contents)
                .map_err(|e| Error::config(format!("parsing {}: {e}", path.display())))?;
        }

        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `LEDGERSYNC_*` environment variables onto this config.
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("LEDGERSYNC_MAX_PUSH_BATCH") {
            self.max_push_batch = v
                .parse()
                .map_err(|_| Error::config("LEDGERSYNC_MAX_PUSH_BATCH must be a positive integer"))?;
        }
        if let Ok(v) = std::env::var("LEDGERSYNC_MAX_PULL_PAGE") {
            self.max_pull_page = v
                .parse()
                .map_err(|_| Error::config("LEDGERSYNC_MAX_PULL_PAGE must be a positive integer"))?;
        }
        if let Ok(v) = std::env::var("LEDGERSYNC_MAX_PAYLOAD_BYTES") {
            self.max_payload_bytes = v
                .parse()
                .map_err(|_| Error::config("LEDGERSYNC_MAX_PAYLOAD_BYTES must be a positive integer"))?;
        }
        Ok(())
    }

    /// Validate invariants that a hand-edited config or bad env override
    /// could otherwise violate silently.
    pub fn validate(&self) -> Result<()> {
        if self.max_push_batch == 0 || self.max_push_batch > 200 {
            return Err(Error::config("max_push_batch must be in 1..=200"));
        }
        if self.max_pull_page == 0 || self.max_pull_page > 500 {
            return Err(Error::config("max_pull_page must be in 1..=500"));
        }
        if self.max_payload_bytes == 0 {
            return Err(Error::config("max_payload_bytes must be positive"));
        }
        if self.clock_tick_epsilon_micros <= 0 {
            return Err(Error::config("clock_tick_epsilon_micros must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_caps() {
        let config = EngineConfig::default();
        assert_eq!(config.max_push_batch, 200);
        assert_eq!(config.max_pull_page, 500);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_batch_cap_above_spec_ceiling() {
        let mut config = EngineConfig::default();
        config.max_push_batch = 201;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_is_applied_and_validated() {
        std::env::set_var("LEDGERSYNC_MAX_PULL_PAGE", "50");
        let mut config = EngineConfig::default();
        config.merge_env().unwrap();
        assert_eq!(config.max_pull_page, 50);
        std::env::remove_var("LEDGERSYNC_MAX_PULL_PAGE");
    }
}
