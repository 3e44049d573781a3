// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

/// Host-facing timeout-wrapper configuration, defaults per `spec.md` §6.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub default_state_timeout: Option<Duration>,
    pub default_transition_timeout: Option<Duration>,
    pub default_action_timeout: Option<Duration>,
    pub enable_recovery: bool,
    pub timeout_event_name: String,
    pub send_timeouts_to_dlq: bool,
    pub enable_adaptive_timeout: bool,
    pub adaptive_multiplier: f64,
    /// Samples required before an adaptive recommendation is trusted
    /// enough to override a static configuration (`spec.md` §4.5).
    pub warmup_samples: usize,
    /// Per-state overrides of `default_state_timeout`, keyed by the
    /// fully-qualified state id. `spec.md` §4.5 describes state timeouts
    /// as "max residency in a named state" — most hosts only need a
    /// handful of states watched, so a sparse map is cheaper than
    /// extending every `StateNode` with a timeout field the core itself
    /// has no opinion about.
    pub state_timeouts: HashMap<String, Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_state_timeout: None,
            default_transition_timeout: None,
            default_action_timeout: None,
            enable_recovery: true,
            timeout_event_name: "state.timeout".to_string(),
            send_timeouts_to_dlq: true,
            enable_adaptive_timeout: false,
            adaptive_multiplier: 1.5,
            warmup_samples: 30,
            state_timeouts: HashMap::new(),
        }
    }
}

impl TimeoutConfig {
    pub fn with_default_state_timeout(mut self, duration: Duration) -> Self {
        self.default_state_timeout = Some(duration);
        self
    }

    pub fn with_default_transition_timeout(mut self, duration: Duration) -> Self {
        self.default_transition_timeout = Some(duration);
        self
    }

    pub fn with_default_action_timeout(mut self, duration: Duration) -> Self {
        self.default_action_timeout = Some(duration);
        self
    }

    pub fn with_state_timeout(mut self, state_id: impl Into<String>, duration: Duration) -> Self {
        self.state_timeouts.insert(state_id.into(), duration);
        self
    }

    pub fn with_timeout_event_name(mut self, name: impl Into<String>) -> Self {
        self.timeout_event_name = name.into();
        self
    }

    pub fn with_adaptive_timeout_enabled(mut self, enabled: bool) -> Self {
        self.enable_adaptive_timeout = enabled;
        self
    }

    pub fn without_dlq(mut self) -> Self {
        self.send_timeouts_to_dlq = false;
        self
    }

    /// The deadline configured for `state_id`: an explicit override if
    /// one exists, else the blanket default, else `None` (no timeout).
    pub fn state_timeout(&self, state_id: &str) -> Option<Duration> {
        self.state_timeouts.get(state_id).copied().or(self.default_state_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = TimeoutConfig::default();
        assert_eq!(config.timeout_event_name, "state.timeout");
        assert!(config.send_timeouts_to_dlq);
        assert!(!config.enable_adaptive_timeout);
        assert_eq!(config.adaptive_multiplier, 1.5);
        assert_eq!(config.warmup_samples, 30);
    }

    #[test]
    fn per_state_override_wins_over_default() {
        let config = TimeoutConfig::default()
            .with_default_state_timeout(Duration::from_secs(10))
            .with_state_timeout("root.loading", Duration::from_secs(2));
        assert_eq!(config.state_timeout("root.loading"), Some(Duration::from_secs(2)));
        assert_eq!(config.state_timeout("root.other"), Some(Duration::from_secs(10)));
    }
}
