use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::policy::PolicyLoader;
use crate::rules::{RuleCompiler, DEFAULT_MAX_DEPTH};

/// Policy engine configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "enforcr")]
#[command(about = "Deterministic compliance policy engine")]
pub struct Config {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "ENFORCR_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Path to policy YAML file (built-in default policy if not set)
    #[arg(long, env = "ENFORCR_POLICY_PATH")]
    pub policy_path: Option<PathBuf>,

    /// Policy reload check interval in seconds (at least 1)
    #[arg(
        long,
        default_value = "30",
        env = "ENFORCR_POLICY_RELOAD_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub policy_reload_secs: u64,

    /// Latency budget in milliseconds for decision endpoints
    #[arg(long, default_value = "100", env = "ENFORCR_LATENCY_BUDGET_MS")]
    pub latency_budget_ms: u64,

    /// Maximum nesting depth of rule conditions
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, env = "ENFORCR_MAX_CONDITION_DEPTH")]
    pub max_condition_depth: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false", env = "ENFORCR_LOG_JSON")]
    pub log_json: bool,

    /// Enable graceful shutdown
    #[arg(long, default_value = "true", env = "ENFORCR_GRACEFUL_SHUTDOWN")]
    pub graceful_shutdown: bool,
}

impl Config {
    /// Get policy reload interval as Duration, never shorter than a second.
    pub fn policy_reload_interval(&self) -> Duration {
        Duration::from_secs(self.policy_reload_secs.max(1))
    }

    /// Get latency budget as Duration.
    pub fn latency_budget(&self) -> Duration {
        Duration::from_millis(self.latency_budget_ms)
    }

    /// Rule compiler honoring the configured limits.
    pub fn compiler(&self) -> RuleCompiler {
        RuleCompiler::new().with_max_depth(self.max_condition_depth)
    }

    /// Policy loader for the configured source.
    pub fn policy_loader(&self) -> PolicyLoader {
        let loader = match &self.policy_path {
            Some(path) => PolicyLoader::new(path.clone()),
            None => PolicyLoader::builtin(),
        };
        loader.with_compiler(self.compiler())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8080".to_string(),
            policy_path: None,
            policy_reload_secs: 30,
            latency_budget_ms: 100,
            max_condition_depth: DEFAULT_MAX_DEPTH,
            log_level: "info".to_string(),
            log_json: false,
            graceful_shutdown: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicySource;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.latency_budget_ms, 100);
        assert!(config.policy_path.is_none());
        assert_eq!(config.policy_loader().source(), &PolicySource::Builtin);
    }

    #[test]
    fn test_parse_args() {
        let config = Config::try_parse_from([
            "enforcr",
            "--policy-path",
            "/etc/enforcr/policy.yaml",
            "--max-condition-depth",
            "8",
        ])
        .unwrap();

        assert_eq!(
            config.policy_loader().source(),
            &PolicySource::File(PathBuf::from("/etc/enforcr/policy.yaml"))
        );
        assert_eq!(config.compiler().max_depth(), 8);
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config {
            policy_reload_secs: 60,
            latency_budget_ms: 15,
            ..Default::default()
        };

        assert_eq!(config.policy_reload_interval(), Duration::from_secs(60));
        assert_eq!(config.latency_budget(), Duration::from_millis(15));
    }

    #[test]
    fn test_zero_reload_interval_rejected() {
        let result = Config::try_parse_from(["enforcr", "--policy-reload-secs", "0"]);
        assert!(result.is_err());

        let config = Config {
            policy_reload_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.policy_reload_interval(), Duration::from_secs(1));
    }
}
