//! Dispatcher configuration: circuit breaker thresholds, session cache
//! TTL, default scopes, and tier availability flags. Loadable from a TOML
//! file or environment variables, following the builder-struct pattern the
//! rest of this crate's options types use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breaker::BreakerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
    pub half_open_success_threshold: u32,
    pub session_cache_ttl_seconds: u64,
    pub session_cache_max_entries: usize,
    pub default_scopes: Vec<String>,
    pub sandbox_enabled: bool,
    /// Wall-clock budget for a single native-tier command. `run_native`
    /// races the command's `execute` future against this deadline and
    /// drops it (see spec.md §5's cancellation-token note) on expiry,
    /// returning exit code 130 rather than letting a runaway command
    /// (e.g. a pathological regex in `grep`) hold the dispatcher forever.
    pub native_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_ms: 30_000,
            half_open_success_threshold: 1,
            session_cache_ttl_seconds: 300,
            // Open question in the distilled spec: the source's session
            // cache has no eviction cap. Resolved here with a finite
            // default; see DESIGN.md.
            session_cache_max_entries: 10_000,
            default_scopes: Vec::new(),
            sandbox_enabled: false,
            native_timeout_ms: 30_000,
        }
    }
}

impl DispatcherConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Overlay values present as `BASHX_*` environment variables onto the
    /// defaults. Unset variables leave the existing value untouched.
    pub fn from_env(mut self) -> Self {
        if let Ok(v) = std::env::var("BASHX_FAILURE_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.failure_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("BASHX_COOLDOWN_MS") {
            if let Ok(n) = v.parse() {
                self.cooldown_ms = n;
            }
        }
        if let Ok(v) = std::env::var("BASHX_SESSION_CACHE_TTL_SECONDS") {
            if let Ok(n) = v.parse() {
                self.session_cache_ttl_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("BASHX_SESSION_CACHE_MAX_ENTRIES") {
            if let Ok(n) = v.parse() {
                self.session_cache_max_entries = n;
            }
        }
        if let Ok(v) = std::env::var("BASHX_SANDBOX_ENABLED") {
            self.sandbox_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("BASHX_NATIVE_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.native_timeout_ms = n;
            }
        }
        self
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_millis(self.cooldown_ms),
            half_open_success_threshold: self.half_open_success_threshold,
            timeout: None,
            window: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_finite_session_cache_cap() {
        let cfg = DispatcherConfig::default();
        assert!(cfg.session_cache_max_entries > 0);
    }

    #[test]
    fn parses_from_toml() {
        let cfg = DispatcherConfig::from_toml_str(
            "failure_threshold = 10\ncooldown_ms = 5000\n",
        )
        .unwrap();
        assert_eq!(cfg.failure_threshold, 10);
        assert_eq!(cfg.cooldown_ms, 5000);
        // Unspecified fields retain defaults.
        assert_eq!(cfg.session_cache_ttl_seconds, 300);
    }
}
