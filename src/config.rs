//! Layered configuration for a `winbash` orchestrator instance.
//!
//! A single optional `winbash.toml` file (one layer, unlike `vtcode-config`'s
//! multi-file merge) plus environment variable overrides for CI, mirroring
//! the suggested constants called out throughout `spec.md` (30s/60s
//! timeouts, nesting depth 8).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use winbash_core::preprocess_pipeline::DEFAULT_MAX_NESTING_DEPTH;

const DEFAULT_GENERAL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PYTHON_TIMEOUT_SECS: u64 = 60;

/// Configuration governing one [`crate::orchestrator::BashToolExecutor`].
#[derive(Debug, Clone)]
pub struct WinbashConfig {
    /// Root directory backing the virtual Unix namespace (`claude/`,
    /// `uploads/`, `outputs/`) and per-tool scratch directories.
    pub workspace_root: PathBuf,
    /// Timeout applied to `cmd`/`powershell`/`bash`/`native` invocations.
    pub general_timeout: Duration,
    /// Timeout applied to Python invocations (unused; Python execution is
    /// not carried forward in this port, kept only so a `winbash.toml`
    /// written against the original tool's key names still parses).
    pub python_timeout: Duration,
    /// Recursion bound for pipeline-level preprocessing (`$()`, `<()`/`>()`).
    pub max_nesting_depth: usize,
    /// Additional binary names to probe for on top of the fixed
    /// `{diff, tar, awk, sed, grep, jq}` native-binary set.
    pub extra_native_binaries: Vec<String>,
}

impl WinbashConfig {
    /// Defaults matching the suggested constants in `spec.md` (§4.4, §4.8).
    pub fn with_workspace_root(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            general_timeout: Duration::from_secs(DEFAULT_GENERAL_TIMEOUT_SECS),
            python_timeout: Duration::from_secs(DEFAULT_PYTHON_TIMEOUT_SECS),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            extra_native_binaries: Vec::new(),
        }
    }

    /// Load `winbash.toml` from `config_path` if it exists, falling back to
    /// defaults rooted at `workspace_root` otherwise; then apply
    /// `WINBASH_*` environment overrides so CI can tune timeouts without a
    /// checked-in file.
    pub fn load(workspace_root: impl Into<PathBuf>, config_path: &Path) -> Result<Self> {
        let workspace_root = workspace_root.into();
        let mut config = Self::with_workspace_root(&workspace_root);

        if config_path.is_file() {
            let raw = std::fs::read_to_string(config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            let file: WinbashConfigFile = toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", config_path.display()))?;
            file.apply(&mut config);
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secs) = std::env::var("WINBASH_GENERAL_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.general_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(secs) = std::env::var("WINBASH_PYTHON_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.python_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(depth) = std::env::var("WINBASH_MAX_NESTING_DEPTH") {
            if let Ok(depth) = depth.parse() {
                self.max_nesting_depth = depth;
            }
        }
    }
}

/// On-disk shape of `winbash.toml`. Every field optional; an absent field
/// keeps [`WinbashConfig`]'s default.
#[derive(Debug, Deserialize, Default)]
struct WinbashConfigFile {
    general_timeout_secs: Option<u64>,
    python_timeout_secs: Option<u64>,
    max_nesting_depth: Option<usize>,
    #[serde(default)]
    extra_native_binaries: Vec<String>,
}

impl WinbashConfigFile {
    fn apply(self, config: &mut WinbashConfig) {
        if let Some(secs) = self.general_timeout_secs {
            config.general_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.python_timeout_secs {
            config.python_timeout = Duration::from_secs(secs);
        }
        if let Some(depth) = self.max_nesting_depth {
            config.max_nesting_depth = depth;
        }
        if !self.extra_native_binaries.is_empty() {
            config.extra_native_binaries = self.extra_native_binaries;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_suggested_constants() {
        let config = WinbashConfig::with_workspace_root(PathBuf::from("/tmp/ws"));
        assert_eq!(config.general_timeout, Duration::from_secs(30));
        assert_eq!(config.python_timeout, Duration::from_secs(60));
        assert_eq!(config.max_nesting_depth, 8);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = WinbashConfig::load("/tmp/ws", Path::new("/does/not/exist.toml")).unwrap();
        assert_eq!(config.max_nesting_depth, 8);
    }

    #[test]
    fn parses_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("winbash.toml");
        std::fs::write(&config_path, "general_timeout_secs = 45\nmax_nesting_depth = 4\n").unwrap();
        let config = WinbashConfig::load(dir.path(), &config_path).unwrap();
        assert_eq!(config.general_timeout, Duration::from_secs(45));
        assert_eq!(config.max_nesting_depth, 4);
    }
}
