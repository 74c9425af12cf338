//! Client configuration and backend factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizmill_core::engine::EngineServices;

use crate::mock::MockBackend;
use crate::rest::RestBackend;

/// Configuration for the evaluation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Rest {
        base_url: String,
        user_id: String,
        /// Use the question-generator endpoint instead of the pre-built
        /// data files for multiple-choice sets.
        #[serde(default)]
        generated: bool,
    },
    /// In-process scripted backend; offline runs and tests.
    Mock,
}

/// Top-level quizmill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendConfig,
    /// Default study level for attempts that do not specify one.
    #[serde(default = "default_level")]
    pub default_level: String,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_backend() -> BackendConfig {
    BackendConfig::Rest {
        base_url: "http://localhost:3001".to_string(),
        user_id: String::new(),
        generated: false,
    }
}
fn default_level() -> String {
    "L3".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizmill-reports")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            default_level: default_level(),
            output_dir: default_output_dir(),
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

fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Rest {
            base_url,
            user_id,
            generated,
        } => BackendConfig::Rest {
            base_url: resolve_env_vars(base_url),
            user_id: resolve_env_vars(user_id),
            generated: *generated,
        },
        BackendConfig::Mock => BackendConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizmill.toml` in the current directory
/// 2. `~/.config/quizmill/config.toml`
///
/// Environment variable overrides: `QUIZMILL_BASE_URL`, `QUIZMILL_USER_ID`.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizmill.toml");
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
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(url) = std::env::var("QUIZMILL_BASE_URL") {
        if let BackendConfig::Rest { base_url, .. } = &mut config.backend {
            *base_url = url;
        }
    }
    if let Ok(id) = std::env::var("QUIZMILL_USER_ID") {
        if let BackendConfig::Rest { user_id, .. } = &mut config.backend {
            *user_id = id;
        }
    }

    config.backend = resolve_backend_config(&config.backend);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizmill"))
}

/// Build the engine's service set from a backend configuration.
pub fn create_backend(config: &BackendConfig) -> Result<EngineServices> {
    match config {
        BackendConfig::Rest {
            base_url,
            user_id,
            generated,
        } => {
            let backend = Arc::new(RestBackend::new(base_url, user_id, *generated)?);
            Ok(EngineServices {
                questions: backend.clone(),
                oracle: backend.clone(),
                notes: backend.clone(),
                planner: backend.clone(),
                references: backend,
            })
        }
        BackendConfig::Mock => {
            let backend = Arc::new(MockBackend::with_sample_course());
            Ok(EngineServices {
                questions: backend.clone(),
                oracle: backend.clone(),
                notes: backend.clone(),
                planner: backend.clone(),
                references: backend,
            })
        }
    }
}
