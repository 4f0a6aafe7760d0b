use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 1024 * 1024; // 1MB
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024; // 16MB per stream

/// Judge configuration
/// Passed to the engine at construction; the engine never reads the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeConfig {
    /// Each evaluation creates one uniquely named scratch directory under here
    pub temp_root: PathBuf,
    pub compile_timeout_ms: u64,
    pub execution_timeout_ms: u64,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
    /// Cap on captured stdout and on captured stderr of any one process
    pub max_output_bytes: usize,
    /// JSON language table; the built-in table is used when unset
    pub languages_path: Option<PathBuf>,
}

impl JudgeConfig {
    /// Defaults with environment variable overrides
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temp_root: env::var("JUDGE_TEMP_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_root),
            compile_timeout_ms: parse_var("JUDGE_COMPILE_TIMEOUT_MS")
                .unwrap_or(defaults.compile_timeout_ms),
            execution_timeout_ms: parse_var("JUDGE_EXECUTION_TIMEOUT_MS")
                .unwrap_or(defaults.execution_timeout_ms),
            max_source_bytes: parse_var("JUDGE_MAX_SOURCE_BYTES")
                .unwrap_or(defaults.max_source_bytes),
            max_input_bytes: parse_var("JUDGE_MAX_INPUT_BYTES")
                .unwrap_or(defaults.max_input_bytes),
            max_output_bytes: parse_var("JUDGE_MAX_OUTPUT_BYTES")
                .unwrap_or(defaults.max_output_bytes),
            languages_path: env::var("JUDGE_LANGUAGES")
                .ok()
                .map(PathBuf::from)
                .or(defaults.languages_path),
        }
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            temp_root: env::temp_dir(),
            compile_timeout_ms: DEFAULT_TIMEOUT_MS,
            execution_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            languages_path: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = JudgeConfig::default();
        assert_eq!(config.compile_timeout_ms, 5000);
        assert_eq!(config.execution_timeout_ms, 5000);
        assert_eq!(config.compile_timeout(), Duration::from_secs(5));
        assert_eq!(config.execution_timeout(), Duration::from_secs(5));
        assert_eq!(config.temp_root, env::temp_dir());
        assert_eq!(config.max_output_bytes, 16 * 1024 * 1024);
        assert!(config.languages_path.is_none());
    }

    #[test]
    fn test_parse_var_ignores_garbage() {
        env::set_var("CODECLASS_TEST_PARSE_VAR", "not-a-number");
        assert_eq!(parse_var::<u64>("CODECLASS_TEST_PARSE_VAR"), None);

        env::set_var("CODECLASS_TEST_PARSE_VAR", "250");
        assert_eq!(parse_var::<u64>("CODECLASS_TEST_PARSE_VAR"), Some(250));
        env::remove_var("CODECLASS_TEST_PARSE_VAR");
    }
}
