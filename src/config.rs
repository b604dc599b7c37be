//! Application Configuration
//!
//! TOML settings file covering the daemon endpoint, global sampling
//! defaults, per-role model/sampling overrides, approval mode, and the
//! retry/history bounds. Role model inheritance is resolved every time the
//! configuration is read (`resolve_roles`), never cached across changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use draftsmith_core::role::{ResolvedRoles, RolesConfig, Sampling};
use draftsmith_llm::OLLAMA_DEFAULT_URL;

use crate::error::{AppError, AppResult};

/// Application settings, deserialized from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Base URL of the local inference daemon.
    pub daemon_url: String,
    /// Model used by any role with no pinned or inherited model.
    pub default_model: String,
    /// Generation length cap passed to the daemon.
    pub num_predict: Option<u32>,
    /// Prompt before applying each file action and shell command.
    pub require_approval: bool,
    /// Emit incremental role output to the attached front end.
    pub live_stream: bool,
    /// Maximum plan-generation attempts before the turn fails.
    pub max_plan_attempts: u32,
    /// Number of recent conversation messages loaded into each turn.
    pub history_limit: usize,
    /// Global sampling defaults; per-role settings override field-wise.
    pub sampling: Sampling,
    /// Per-role model and sampling configuration.
    pub roles: RolesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            daemon_url: OLLAMA_DEFAULT_URL.to_string(),
            default_model: "llama3.1:8b".to_string(),
            num_predict: Some(1024),
            require_approval: true,
            live_stream: true,
            max_plan_attempts: 3,
            history_limit: 40,
            sampling: Sampling {
                temperature: Some(0.7),
                top_p: Some(0.9),
                repeat_penalty: Some(1.1),
            },
            roles: RolesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default on-disk location of the settings file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("draftsmith").join("config.toml"))
    }

    /// Load settings from the default location; a missing file yields the
    /// defaults, an unreadable or unparseable one is an error.
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| AppError::config(format!("{}: {e}", path.display())))
    }

    /// Resolve every role to a concrete model and sampling set. Re-run on
    /// every read so upstream model changes propagate to roles still
    /// marked as inheriting.
    pub fn resolve_roles(&self) -> ResolvedRoles {
        self.roles.resolve(&self.default_model, self.sampling)
    }
}
