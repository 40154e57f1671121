//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a conversion's format label is checked against the output extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPolicy {
    /// The label is only reported; mismatches are logged.
    #[default]
    Permissive,
    /// A label that does not match the output extension is rejected.
    Strict,
}

/// Configuration for the engine-backed converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to the engine binary.
    #[serde(default = "default_engine_path")]
    pub path: PathBuf,

    /// Arguments placed right after the engine path on every invocation
    /// (e.g. `["-hide_banner", "-loglevel", "error"]`).
    #[serde(default)]
    pub global_args: Vec<String>,

    /// Maximum jobs running at the same time.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_jobs: usize,

    /// Kill a job after this many seconds. `None` waits forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// How often a cancellable run checks for cancellation.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Output format label checking.
    #[serde(default)]
    pub format_policy: FormatPolicy,
}

fn default_engine_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_max_parallel() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    50
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            global_args: Vec::new(),
            max_parallel_jobs: default_max_parallel(),
            timeout_secs: None,
            poll_interval_ms: default_poll_interval(),
            format_policy: FormatPolicy::default(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with a custom engine path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the global arguments.
    pub fn with_global_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum parallel jobs.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel_jobs = max;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Sets the format policy.
    pub fn with_format_policy(mut self, policy: FormatPolicy) -> Self {
        self.format_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.path, PathBuf::from("ffmpeg"));
        assert!(config.global_args.is_empty());
        assert_eq!(config.max_parallel_jobs, 4);
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.format_policy, FormatPolicy::Permissive);
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::with_path("/usr/local/bin/ffmpeg")
            .with_global_args(["-hide_banner"])
            .with_max_parallel(8)
            .with_timeout(600)
            .with_format_policy(FormatPolicy::Strict);

        assert_eq!(config.path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.global_args, vec!["-hide_banner".to_string()]);
        assert_eq!(config.max_parallel_jobs, 8);
        assert_eq!(config.timeout_secs, Some(600));
        assert_eq!(config.format_policy, FormatPolicy::Strict);
    }

    #[test]
    fn test_config_serialization() {
        let config = ConverterConfig::default().with_format_policy(FormatPolicy::Strict);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"strict\""));
        let parsed: ConverterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_parallel_jobs, config.max_parallel_jobs);
        assert_eq!(parsed.format_policy, FormatPolicy::Strict);
    }
}
