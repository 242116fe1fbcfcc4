//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "TSYNC_ROOT_FOLDER";

/// Service settings file name, looked up inside the root folder
pub const SERVICE_CONFIG_FILE: &str = "tsync.toml";

/// Default HTTP port for the sync API
pub const DEFAULT_PORT: u16 = 5790;

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_user_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get the per-user configuration file path for the platform
fn locate_user_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tsync").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tsync/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/tsync (or /var/lib/tsync for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("tsync"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tsync"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("tsync"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tsync"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("tsync"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tsync"))
    } else {
        PathBuf::from("./tsync_data")
    }
}

/// API token entry from `tsync.toml`
///
/// Only the SHA-256 of the token is stored; callers present the raw token as a
/// bearer credential.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTokenConfig {
    /// Human-readable label used in logs
    pub name: String,
    /// Lowercase hex SHA-256 of the raw token
    pub sha256: String,
    /// Whether the token grants the content-edit capability
    #[serde(default)]
    pub can_edit: bool,
}

/// Sync service configuration (`tsync.toml` in the root folder)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Base URL canonical entry URLs are derived from
    pub site_url: String,
    /// Database file name, relative to the root folder
    pub database_file: String,
    pub api_tokens: Vec<ApiTokenConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            site_url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            database_file: "tsync.db".to_string(),
            api_tokens: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Load `tsync.toml` from the root folder
    ///
    /// A missing file is not an error: defaults are used (with no API tokens, so
    /// every write request is refused until tokens are configured).
    pub fn load(root_folder: &Path) -> Result<Self> {
        let path = root_folder.join(SERVICE_CONFIG_FILE);
        if !path.exists() {
            info!("No {} in {}, using defaults", SERVICE_CONFIG_FILE, root_folder.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", SERVICE_CONFIG_FILE, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail much later at request time
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }

        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "site_url must be an http(s) URL, got '{}'",
                self.site_url
            )));
        }

        if self.database_file.trim().is_empty() {
            return Err(Error::Config("database_file must not be empty".to_string()));
        }

        for token in &self.api_tokens {
            let well_formed = token.sha256.len() == 64
                && token.sha256.chars().all(|c| c.is_ascii_hexdigit());
            if !well_formed {
                return Err(Error::Config(format!(
                    "api token '{}' must carry a 64-character hex sha256",
                    token.name
                )));
            }
        }

        Ok(())
    }

    /// Absolute database path for a given root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        root_folder.join(&self.database_file)
    }

    /// Site URL without a trailing slash
    pub fn site_base(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }
}
