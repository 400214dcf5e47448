//! Toolkit configuration.

use std::env;

use tracing::warn;

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_KEY_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    /// Tasks foreign threads may have queued before `queue` blocks.
    pub queue_capacity: usize,
    /// Unconsumed keys buffered for the application before new ones are
    /// dropped.
    pub key_capacity: usize,
    /// Where the demo writes its log.
    pub log_file: Option<String>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            key_capacity: DEFAULT_KEY_CAPACITY,
            log_file: None,
        }
    }
}

impl ToolkitConfig {
    /// Reads `TTK_QUEUE_CAPACITY`, `TTK_KEY_CAPACITY` and `TTK_LOG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            queue_capacity: env_capacity(&lookup, "TTK_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
            key_capacity: env_capacity(&lookup, "TTK_KEY_CAPACITY", DEFAULT_KEY_CAPACITY),
            log_file: env_string_opt(&lookup, "TTK_LOG"),
        }
    }
}

/// A positive integer, anything else falls back to `default`.
fn env_capacity(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    let Some(value) = lookup(key) else {
        return default;
    };
    match value.trim().parse::<usize>() {
        Ok(capacity) if capacity > 0 => capacity,
        _ => {
            warn!(key, value = %value, "ignoring invalid capacity");
            default
        }
    }
}

fn env_string_opt(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}
