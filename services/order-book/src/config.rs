//! Book configuration

use tracing::warn;

pub const DISPLAY_DEPTH_ENV: &str = "ORDER_BOOK_DISPLAY_DEPTH";
pub const LOG_LEVEL_ENV: &str = "ORDER_BOOK_LOG";

/// Configuration for the order book and its binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookConfig {
    /// Levels per side shown in the book dump.
    pub display_depth: usize,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            display_depth: 5,
            log_level: "info".to_string(),
        }
    }
}

impl BookConfig {
    /// Defaults overridden by `ORDER_BOOK_DISPLAY_DEPTH` and `ORDER_BOOK_LOG`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; malformed values keep the default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(DISPLAY_DEPTH_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(depth) => config.display_depth = depth,
                Err(_) => warn!(
                    key = DISPLAY_DEPTH_ENV,
                    value = %raw,
                    fallback = config.display_depth,
                    "Ignoring malformed display depth"
                ),
            }
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                config.log_level = level.trim().to_string();
            }
        }

        config
    }
}
