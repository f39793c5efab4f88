//! Resolved runtime configuration.

use super::env::{EnvError, EnvParser};
use super::source::Sourced;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub documents_root: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
    pub region: Option<String>,
    pub log_level: Option<String>,
}

/// Configuration shared by the publisher, the validator and the alarm manager.
#[derive(Debug, Clone)]
pub struct DigitoConfig {
    pub documents_root: Sourced<PathBuf>,
    pub scripts_dir: Sourced<PathBuf>,
    pub region: Sourced<Option<String>>,
    pub log_level: Sourced<String>,
    pub json_logs: Sourced<bool>,
    pub aws_max_attempts: Sourced<u32>,
    pub alarm_bucket: Sourced<Option<String>>,
    pub stack_poll_interval_secs: Sourced<u64>,
    pub stack_poll_max_attempts: Sourced<u32>,
    pub teardown_parallelism: Sourced<u32>,
    pub warn_only_services: Sourced<Vec<String>>,
}

impl DigitoConfig {
    /// Read `DIGITO_*` variables, then apply command-line overrides.
    ///
    /// Returns every environment error instead of stopping at the first one.
    pub fn load(overrides: ConfigOverrides) -> (Self, Vec<EnvError>) {
        let mut parser = EnvParser::new();

        let documents_root = parser
            .get_path("DOCUMENTS_ROOT", "documents", false)
            .override_with(overrides.documents_root);
        let scripts_dir = parser
            .get_path("SCRIPTS_DIR", "documents/util/scripts/src", false)
            .override_with(overrides.scripts_dir);

        let mut region = parser.get_region("REGION");
        if region.value.is_none()
            && let Ok(aws_region) = std::env::var("AWS_REGION")
            && !aws_region.is_empty()
        {
            region = Sourced::from_env(Some(aws_region), "AWS_REGION".to_string());
        }
        let region = region.override_with(overrides.region.map(Some));

        let log_level = parser
            .get_log_level("LOG_LEVEL", "info")
            .override_with(overrides.log_level);

        let config = Self {
            documents_root,
            scripts_dir,
            region,
            log_level,
            json_logs: parser.get_bool("JSON_LOGS", false),
            aws_max_attempts: parser.get_in_range("AWS_MAX_ATTEMPTS", 20, 1, 50),
            alarm_bucket: parser.get_bucket_name("ALARM_BUCKET"),
            stack_poll_interval_secs: parser.get_in_range("STACK_POLL_INTERVAL_SECS", 10, 1, 300),
            stack_poll_max_attempts: parser.get_in_range("STACK_POLL_MAX_ATTEMPTS", 90, 1, 1000),
            teardown_parallelism: parser.get_in_range("TEARDOWN_PARALLELISM", 10, 1, 64),
            warn_only_services: parser.get_string_list("WARN_ONLY_SERVICES", Vec::new()),
        };

        debug!(
            documents_root = %config.documents_root.value.display(),
            documents_root_source = %config.documents_root.describe_source(),
            region_source = %config.region.describe_source(),
            "configuration loaded"
        );

        (config, parser.take_errors())
    }

    pub fn stack_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stack_poll_interval_secs.value)
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, env_test_lock};

    const VARS: &[&str] = &[
        "DIGITO_DOCUMENTS_ROOT",
        "DIGITO_REGION",
        "DIGITO_TEARDOWN_PARALLELISM",
        "DIGITO_LOG_LEVEL",
    ];

    fn cleanup_env() {
        for var in VARS {
            // SAFETY: env access is serialized by env_test_lock
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn test_defaults_apply_without_environment() {
        let _guard = env_test_lock();
        cleanup_env();

        let (config, errors) = DigitoConfig::load(ConfigOverrides::default());
        assert!(errors.is_empty());
        assert_eq!(config.documents_root.value, PathBuf::from("documents"));
        assert_eq!(config.aws_max_attempts.value, 20);
        assert_eq!(config.teardown_parallelism.value, 10);
        assert_eq!(config.log_level.value, "info");
    }

    #[test]
    fn test_cli_overrides_win_over_environment() {
        let _guard = env_test_lock();
        cleanup_env();
        // SAFETY: env access is serialized by env_test_lock
        unsafe {
            std::env::set_var("DIGITO_REGION", "us-west-2");
            std::env::set_var("DIGITO_LOG_LEVEL", "debug");
        }

        let (config, errors) = DigitoConfig::load(ConfigOverrides {
            region: Some("eu-west-1".to_string()),
            ..ConfigOverrides::default()
        });
        assert!(errors.is_empty());
        assert_eq!(config.region.value.as_deref(), Some("eu-west-1"));
        assert_eq!(config.region.source, ConfigSource::CommandLine);
        assert_eq!(config.log_level.value, "debug");
        assert_eq!(config.log_level.source, ConfigSource::Environment);

        cleanup_env();
    }

    #[test]
    fn test_invalid_environment_values_are_collected() {
        let _guard = env_test_lock();
        cleanup_env();
        // SAFETY: env access is serialized by env_test_lock
        unsafe {
            std::env::set_var("DIGITO_TEARDOWN_PARALLELISM", "0");
            std::env::set_var("DIGITO_LOG_LEVEL", "chatty");
        }

        let (config, errors) = DigitoConfig::load(ConfigOverrides::default());
        assert_eq!(errors.len(), 2);
        assert_eq!(config.teardown_parallelism.value, 10);

        cleanup_env();
    }
}
