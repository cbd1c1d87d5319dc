use std::{env, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Overrides [`SessionConfig::loop_guard`] when set.
pub const LOOP_GUARD_ENV: &str = "PIECESCRIPT_LOOP_GUARD";

/// Runtime knobs for one scene session. Every field has a default, so a
/// config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Delay between the first queued write and the batched flush.
    pub flush_interval_ms: u64,
    /// Polling step of glides and wait-until.
    pub frame_interval_ms: u64,
    /// Iterations one execution may spend in loops before it is aborted.
    pub loop_guard: u64,
    /// Object metadata key holding the stored behavior graph.
    pub behavior_key: String,
    /// Object metadata key set on freshly spawned clones.
    pub clone_flag_key: String,
    /// Object metadata key pointing a clone at the object it was cloned from.
    pub clone_source_key: String,
    /// Scene metadata key holding tags, messages, sounds and variables.
    pub resources_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 16,
            frame_interval_ms: 16,
            loop_guard: 100_000,
            behavior_key: "piecescript/behavior".to_string(),
            clone_flag_key: "piecescript/clone".to_string(),
            clone_source_key: "piecescript/cloneOf".to_string(),
            resources_key: "piecescript/resources".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn with_loop_guard(mut self, loop_guard: u64) -> Self {
        self.loop_guard = loop_guard;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Applies environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = env::var(LOOP_GUARD_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.loop_guard = seed,
                Err(_) => warn!(value = %raw, "ignoring invalid {}", LOOP_GUARD_ENV),
            }
        }
        self
    }
}
