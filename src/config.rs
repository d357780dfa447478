use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`BackendConfig::base_url`].
pub const ENV_BACKEND_URL: &str = "LITELLM_PROXY_URL";
/// Environment variable overriding [`ProxyConfig::port`].
pub const ENV_PORT: &str = "FASTAPI_PROXY_PORT";
/// Environment variable overriding [`BackendConfig::default_model_alias`].
pub const ENV_DEFAULT_MODEL: &str = "DEFAULT_LITELLM_MODEL_ALIAS";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model id reported for backend models that carry no id of their own.
    #[serde(default = "default_model_alias")]
    pub default_model_alias: String,
    #[serde(default = "default_list_timeout_secs")]
    pub list_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_chat_timeout_secs")]
    pub chat_timeout_secs: u64,
}

fn default_port() -> u16 {
    8001
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_model_alias() -> String {
    "groq-llama4-scout".to_string()
}

fn default_list_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_chat_timeout_secs() -> u64 {
    600
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model_alias: default_model_alias(),
            list_timeout_secs: default_list_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            chat_timeout_secs: default_chat_timeout_secs(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend: BackendConfig::default(),
            log_file: None,
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.base_url = url;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| {
                ProxyError::config(format!("{ENV_PORT} must be a port number, got '{port}'"))
            })?;
        }
        if let Some(alias) = lookup(ENV_DEFAULT_MODEL) {
            self.backend.default_model_alias = alias;
        }
        Ok(())
    }

    /// Reject settings the proxy cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProxyError::config(format!(
                "Backend URL must start with http:// or https://, got '{url}'"
            )));
        }
        if self.backend.list_timeout_secs == 0
            || self.backend.connect_timeout_secs == 0
            || self.backend.chat_timeout_secs == 0
        {
            return Err(ProxyError::config("Backend timeouts must be greater than zero"));
        }
        Ok(())
    }

    /// Full URL of a backend endpoint, e.g. `endpoint("v1/models")`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.backend.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    #[must_use]
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.list_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.connect_timeout_secs)
    }

    #[must_use]
    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.chat_timeout_secs)
    }
}

/// Locations searched for a config file, in priority order.
#[must_use]
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("lmstudio-proxy.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("lmstudio-proxy")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("lmstudio-proxy").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("lmstudio-proxy").join("config.toml"));
        }
    }

    // Home directory fallback
    if let Some(home) = home_dir() {
        paths.push(home.join(".lmstudio-proxy.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
