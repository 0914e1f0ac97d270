//! Configuration file management for tally.
//!
//! Provides a TOML-based config file at `~/.config/tally/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tally_core::draft::DRAFT_KEY;
use tally_core::erp::DEFAULT_TIMEOUT;
use tally_db::config::DbConfig;

pub const DRAFTS_DIR_ENV: &str = "TALLY_DRAFTS_DIR";
pub const WEBHOOK_URL_ENV: &str = "TALLY_WEBHOOK_URL";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub erp: ErpSection,
    #[serde(default)]
    pub drafts: DraftsSection,
    #[serde(default)]
    pub notifications: NotificationsSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErpSection {
    /// Per-request timeout for ERP calls.
    pub timeout_secs: u64,
}

impl Default for ErpSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DraftsSection {
    /// Directory holding draft files. Defaults to `<data dir>/tally/drafts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NotificationsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// `$<var>/tally`, or `~/<fallback>/tally` when the variable is unset.
fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    if let Some(base) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return PathBuf::from(base).join("tally");
    }
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    fallback
        .iter()
        .fold(home, |path, segment| path.join(segment))
        .join("tally")
}

/// `$XDG_CONFIG_HOME/tally` or `~/.config/tally`.
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"])
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// `$XDG_DATA_HOME/tally/drafts` or `~/.local/share/tally/drafts`.
pub fn default_drafts_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"]).join("drafts")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Parse the config file at [`config_path`]. Missing file is an error.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Write the config to [`config_path`], mode 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(&config_path(), config)
}

pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TallyConfig {
    pub db_config: DbConfig,
    pub bind: String,
    pub port: u16,
    pub erp_timeout: Duration,
    pub drafts_dir: PathBuf,
    pub draft_key: String,
    pub webhook_url: Option<String>,
}

impl TallyConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `TALLY_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Drafts dir: `TALLY_DRAFTS_DIR` > `drafts.dir` > [`default_drafts_dir`]
    /// - Webhook: `TALLY_WEBHOOK_URL` > `notifications.webhook_url` > none
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let drafts_dir = if let Ok(dir) = std::env::var(DRAFTS_DIR_ENV) {
            PathBuf::from(dir)
        } else if let Some(dir) = file_config.as_ref().and_then(|c| c.drafts.dir.clone()) {
            dir
        } else {
            default_drafts_dir()
        };

        let webhook_url = std::env::var(WEBHOOK_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| {
                file_config
                    .as_ref()
                    .and_then(|c| c.notifications.webhook_url.clone())
            });

        let (bind, port, timeout_secs, draft_key) = match file_config {
            Some(cfg) => (
                cfg.server.bind,
                cfg.server.port,
                cfg.erp.timeout_secs,
                cfg.drafts.key.unwrap_or_else(|| DRAFT_KEY.to_string()),
            ),
            None => (
                DEFAULT_BIND.to_string(),
                DEFAULT_PORT,
                DEFAULT_TIMEOUT.as_secs(),
                DRAFT_KEY.to_string(),
            ),
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            bind,
            port,
            erp_timeout: Duration::from_secs(timeout_secs),
            drafts_dir,
            draft_key,
            webhook_url,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
