use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Defaults ──────────────────────────────────────────────────

pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 16;
pub const DEFAULT_MAX_FORMULA_LENGTH: usize = 1024;
pub const DEFAULT_AMOUNT_SCALE: u32 = 2;

// ── Engine config ─────────────────────────────────────────────

/// Tunables for ruleset compilation and evaluation.
///
/// Passed into every compile/evaluate call; the engine never reads the
/// environment on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Maximum nesting of condition groups and formula sub-expressions.
    pub max_condition_depth: usize,
    /// Maximum formula source length in bytes.
    pub max_formula_length: usize,
    /// Decimal places each rule adjustment is rounded to.
    pub amount_scale: u32,
    /// Bulk evaluation pool size (0 = rayon default).
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            max_condition_depth: DEFAULT_MAX_CONDITION_DEPTH,
            max_formula_length: DEFAULT_MAX_FORMULA_LENGTH,
            amount_scale: DEFAULT_AMOUNT_SCALE,
            worker_threads: 0,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VALUATOR_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VALUATOR_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            max_condition_depth: profiled_env_usize(
                p,
                "VALUATOR_MAX_CONDITION_DEPTH",
                DEFAULT_MAX_CONDITION_DEPTH,
            )
            .max(1),
            max_formula_length: profiled_env_usize(
                p,
                "VALUATOR_MAX_FORMULA_LENGTH",
                DEFAULT_MAX_FORMULA_LENGTH,
            ),
            amount_scale: profiled_env_u32(p, "VALUATOR_AMOUNT_SCALE", DEFAULT_AMOUNT_SCALE),
            worker_threads: profiled_env_usize(p, "VALUATOR_WORKER_THREADS", 0),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Engine config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  limits:   max_condition_depth={}, max_formula_length={}",
            self.max_condition_depth,
            self.max_formula_length
        );
        tracing::info!("  amounts:  scale={}", self.amount_scale);
        let workers = if self.worker_threads == 0 {
            "auto".to_string()
        } else {
            self.worker_threads.to_string()
        };
        tracing::info!("  bulk:     worker_threads={}", workers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_condition_depth, 16);
        assert_eq!(cfg.max_formula_length, 1024);
        assert_eq!(cfg.amount_scale, 2);
        assert_eq!(cfg.worker_threads, 0);
        assert_eq!(cfg.profile_label(), "default");
    }

    #[test]
    fn profile_prefixed_keys_win() {
        // Unique key names keep this test independent of other env readers.
        env::set_var("ZZTEST_VALUATOR_AMOUNT_SCALE", "4");
        env::set_var("VALUATOR_MAX_FORMULA_LENGTH", "77");
        let cfg = EngineConfig::for_profile("zztest");
        assert_eq!(cfg.profile, "ZZTEST");
        assert_eq!(cfg.amount_scale, 4);
        assert_eq!(cfg.max_formula_length, 77);
        assert_eq!(cfg.profile_label(), "ZZTEST");
        env::remove_var("ZZTEST_VALUATOR_AMOUNT_SCALE");
        env::remove_var("VALUATOR_MAX_FORMULA_LENGTH");
    }
}
