//! Runtime settings with environment variable overrides.
//!
//! Loading flow:
//! 1. Start with [`Settings::default()`]
//! 2. Apply `SNAPSHOT_*` environment variables
//! 3. The binary applies command-line flags last

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "./snapshots.db";
pub const DEFAULT_LIST_LIMIT: u32 = 100;

pub const ENV_DB_PATH: &str = "SNAPSHOT_DB_PATH";
pub const ENV_LOG: &str = "SNAPSHOT_LOG";
pub const ENV_LOG_FORMAT: &str = "SNAPSHOT_LOG_FORMAT";
pub const ENV_LIST_LIMIT: &str = "SNAPSHOT_LIST_LIMIT";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// SQLite file holding the snapshots table.
    pub db_path: PathBuf,
    /// Default tracing filter; `RUST_LOG` still wins when set.
    pub log_level: String,
    pub log_json: bool,
    /// Limit used by `list_snapshots` when the caller gives none.
    pub default_list_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: "info".to_string(),
            log_json: false,
            default_list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// An environment value that was present but could not be used.
///
/// Settings load before logging is up, so callers report these once a
/// subscriber exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    pub key: &'static str,
    pub value: String,
    pub reason: &'static str,
}

impl std::fmt::Display for RejectedOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={:?}: {}", self.key, self.value, self.reason)
    }
}

impl Settings {
    /// Defaults overridden by the process environment, plus any values that
    /// were ignored.
    pub fn from_env() -> (Self, Vec<RejectedOverride>) {
        let mut settings = Self::default();
        let rejected = settings.apply_overrides(|key| std::env::var(key).ok());
        (settings, rejected)
    }

    /// Apply overrides from any key lookup. Empty values are skipped; invalid
    /// ones are skipped and returned.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<RejectedOverride>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = read(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG) {
            self.log_level = level;
        }
        if let Some(format) = read(ENV_LOG_FORMAT) {
            self.log_json = format.eq_ignore_ascii_case("json");
        }
        if let Some(raw) = read(ENV_LIST_LIMIT) {
            match parse_u32_range(&raw, 1, 10_000) {
                Some(limit) => self.default_list_limit = limit,
                None => rejected.push(RejectedOverride {
                    key: ENV_LIST_LIMIT,
                    value: raw,
                    reason: "expected an integer between 1 and 10000",
                }),
            }
        }

        rejected
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
