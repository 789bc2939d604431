use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::sources::config::{default_sources, SourceConfig};
use crate::types::ElementKind;

pub const ENV_CONFIG: &str = "LATERLIST_CONFIG";
pub const ENV_DATABASE_URL: &str = "LATERLIST_DATABASE_URL";
pub const ENV_PENDING_DIR: &str = "LATERLIST_PENDING_DIR";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { user_agent: default_user_agent(), timeout_secs: default_timeout_secs() }
    }
}

fn default_user_agent() -> String { format!("laterlist/{}", env!("CARGO_PKG_VERSION")) }
fn default_timeout_secs() -> u64 { 20 }

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ListConfig {
    pub name: String,
    #[serde(default)]
    pub kind: ElementKind,
}

impl ListConfig {
    pub fn new(name: &str, kind: ElementKind) -> Self {
        Self { name: name.to_string(), kind }
    }
}

pub fn default_lists() -> Vec<ListConfig> {
    vec![
        ListConfig::new("movies", ElementKind::Movie),
        ListConfig::new("shows", ElementKind::Show),
        ListConfig::new("books", ElementKind::Book),
        ListConfig::new("articles", ElementKind::Article),
    ]
}

fn default_failed_cap() -> usize { 200 }

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Defaults to a SQLite file in the data directory.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Directory holding `<list>.txt` pending files. Defaults to `<data dir>/pending`.
    #[serde(default)]
    pub pending_dir: Option<PathBuf>,
    /// Most recent failed URLs kept per list.
    #[serde(default = "default_failed_cap")]
    pub failed_cap: usize,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_lists")]
    pub lists: Vec<ListConfig>,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            pending_dir: None,
            failed_cap: default_failed_cap(),
            http: HttpConfig::default(),
            lists: default_lists(),
            sources: default_sources(),
        }
    }
}

impl Config {
    /// Load from an explicit path, `$LATERLIST_CONFIG`, or the platform config dir,
    /// falling back to defaults. Env overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from))
            .or_else(|| project_dirs().map(|p| p.config_dir().join("config.toml")).filter(|p| p.exists()));

        let mut cfg = match path {
            Some(p) => {
                debug!(path = %p.display(), "loading config");
                Self::from_file(&p)?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing config file: {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) {
        if let Some(url) = std::env::var(ENV_DATABASE_URL).ok().filter(|s| !s.trim().is_empty()) {
            self.database_url = Some(url);
        }
        if let Some(dir) = std::env::var_os(ENV_PENDING_DIR).filter(|s| !s.is_empty()) {
            self.pending_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn pending_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.pending_dir { return Ok(dir.clone()); }
        let proj = project_dirs().context("unable to determine data directory for pending files")?;
        Ok(proj.data_dir().join("pending"))
    }
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "laterlist", "laterlist")
}
