/// Executor configuration loading
///
/// Precedence: built-in defaults, then an optional JSON file, then
/// `CODEBOX_*` environment variables. The CLI layers its own flags on top.
use crate::config::types::{CodeboxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_FILE: &str = "CODEBOX_CONFIG";
pub const ENV_COMPILE_TIMEOUT: &str = "CODEBOX_COMPILE_TIMEOUT_SECS";
pub const ENV_RUN_TIMEOUT: &str = "CODEBOX_RUN_TIMEOUT_SECS";
pub const ENV_WORKSPACE_ROOT: &str = "CODEBOX_WORKSPACE_ROOT";
pub const ENV_TOOLCHAIN_PATH: &str = "CODEBOX_TOOLCHAIN_PATH";

const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 15;
const DEFAULT_KILL_GRACE_MS: u64 = 200;
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 2_000;

/// Per-language overrides from the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageLimits {
    pub compile_timeout_secs: Option<u64>,
    pub run_timeout_secs: Option<u64>,
}

/// Full configuration consumed by the execution facade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Wall-clock bound for the compile step
    pub compile_timeout_secs: u64,
    /// Wall-clock bound for the run step
    pub run_timeout_secs: u64,
    /// Delay between SIGTERM and SIGKILL when tearing down a process group
    pub kill_grace_ms: u64,
    /// How long to wait for stdout/stderr to drain after the child exits
    pub drain_timeout_ms: u64,
    /// Parent directory for per-request workspaces (host temp dir if unset)
    pub workspace_root: Option<PathBuf>,
    /// Search path for compilers and interpreters (host PATH if unset)
    pub toolchain_path: Option<String>,
    /// Overrides keyed by canonical language id
    pub languages: HashMap<String, LanguageLimits>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            compile_timeout_secs: DEFAULT_COMPILE_TIMEOUT_SECS,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            kill_grace_ms: DEFAULT_KILL_GRACE_MS,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
            workspace_root: None,
            toolchain_path: None,
            languages: HashMap::new(),
        }
    }
}

/// Timeouts resolved for one language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLimits {
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
    pub kill_grace: Duration,
    pub drain_timeout: Duration,
}

impl ExecutorConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CodeboxError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            CodeboxError::Config(format!(
                "Failed to parse config JSON {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Defaults, then `CODEBOX_CONFIG` (if set), then environment overrides
    pub fn from_env() -> Result<Self> {
        let file = std::env::var_os(ENV_CONFIG_FILE).map(PathBuf::from);
        Self::load(file.as_deref())
    }

    /// Defaults or `file`, then environment overrides
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let base = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var_os(key))
    }

    /// Apply `CODEBOX_*` overrides through an injectable lookup
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(value) = lookup(ENV_COMPILE_TIMEOUT) {
            self.compile_timeout_secs = parse_secs(ENV_COMPILE_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_RUN_TIMEOUT) {
            self.run_timeout_secs = parse_secs(ENV_RUN_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_WORKSPACE_ROOT) {
            if !value.is_empty() {
                self.workspace_root = Some(PathBuf::from(value));
            }
        }
        if let Some(value) = lookup(ENV_TOOLCHAIN_PATH) {
            if !value.is_empty() {
                self.toolchain_path = Some(value.to_string_lossy().into_owned());
            }
        }
        Ok(self)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.compile_timeout_secs == 0 {
            return Err(CodeboxError::Config(
                "compile_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.run_timeout_secs == 0 {
            return Err(CodeboxError::Config(
                "run_timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (language, limits) in &self.languages {
            if limits.compile_timeout_secs == Some(0) || limits.run_timeout_secs == Some(0) {
                return Err(CodeboxError::Config(format!(
                    "timeouts for language '{}' must be greater than zero",
                    language
                )));
            }
        }
        if let Some(root) = &self.workspace_root {
            let parent_missing = root
                .parent()
                .map(|parent| !parent.as_os_str().is_empty() && !parent.exists())
                .unwrap_or(false);
            if parent_missing {
                return Err(CodeboxError::Config(format!(
                    "workspace_root parent directory does not exist: {}",
                    root.display()
                )));
            }
        }
        Ok(())
    }

    /// Effective workspace root
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Effective toolchain search path
    pub fn toolchain_path(&self) -> OsString {
        self.toolchain_path
            .as_ref()
            .map(OsString::from)
            .or_else(|| std::env::var_os("PATH"))
            .unwrap_or_default()
    }

    /// Stage timeouts for a canonical language id
    pub fn limits_for(&self, language: &str) -> StageLimits {
        let overrides = self.languages.get(language);
        let compile_secs = overrides
            .and_then(|o| o.compile_timeout_secs)
            .unwrap_or(self.compile_timeout_secs);
        let run_secs = overrides
            .and_then(|o| o.run_timeout_secs)
            .unwrap_or(self.run_timeout_secs);

        StageLimits {
            compile_timeout: Duration::from_secs(compile_secs),
            run_timeout: Duration::from_secs(run_secs),
            kill_grace: Duration::from_millis(self.kill_grace_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        }
    }
}

fn parse_secs(key: &str, value: &OsString) -> Result<u64> {
    value
        .to_str()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            CodeboxError::Config(format!(
                "{} must be a whole number of seconds, got {:?}",
                key, value
            ))
        })
}
