//! Backend configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::http::HttpExamService;

/// Top-level examflow configuration.
///
/// Note: Custom Debug impl masks the token to prevent accidental
/// exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ExamflowConfig {
    /// Base URL of the remote exam backend.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token; supports `${VAR_NAME}` references.
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Directory of TOML exam files for local mode.
    #[serde(default = "default_exam_dir")]
    pub exam_dir: PathBuf,
}

impl std::fmt::Debug for ExamflowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamflowConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("exam_dir", &self.exam_dir)
            .finish()
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_exam_dir() -> PathBuf {
    PathBuf::from("./exams")
}

impl Default for ExamflowConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            request_timeout_secs: default_timeout(),
            exam_dir: default_exam_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examflow.toml` in the current directory
/// 2. `~/.config/examflow/config.toml`
///
/// Environment variable overrides: `EXAMFLOW_BASE_URL`, `EXAMFLOW_TOKEN`.
pub fn load_config() -> Result<ExamflowConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamflowConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examflow.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamflowConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamflowConfig::default(),
    };

    // Apply env var overrides
    if let Ok(url) = std::env::var("EXAMFLOW_BASE_URL") {
        config.base_url = Some(url);
    }
    if let Ok(token) = std::env::var("EXAMFLOW_TOKEN") {
        config.token = Some(token);
    }

    config.base_url = config.base_url.as_deref().map(resolve_env_vars);
    config.token = config.token.as_deref().map(resolve_env_vars);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examflow"))
}

/// Create the remote service from its configuration.
pub fn create_remote_service(config: &ExamflowConfig) -> Result<HttpExamService> {
    let base_url = config
        .base_url
        .as_deref()
        .context("config has no base_url; remote mode needs one")?;
    Ok(HttpExamService::with_timeout(
        base_url,
        config.token.clone(),
        config.request_timeout_secs,
    ))
}
