use anyhow::{Context, Result};
use sqlx::{any::AnyConnectOptions, AnyPool, ConnectOptions, migrate::Migrator};
use sqlx::any::AnyPoolOptions;
use std::{path::{Path, PathBuf}, str::FromStr};
use std::sync::Once;

use crate::dao;
use crate::element::ListElement;
use crate::mapping::{element_from_row, entry_insert_from_element};
use crate::storage::Store;
use crate::types::{Field, StatusFilter};

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

// Embed SQL migrations from the migrations/ directory
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    // Create a connection pool. If database_url is None, use a SQLite file in
    // the user's data directory.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?;
        // Quiet by default; callers can enable SQLX_LOG if they want
        let opts = opts.disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        Ok(Self { pool })
    }

    /// Connect to a SQLite file, creating it if needed.
    pub async fn open_file(path: &Path) -> Result<Self> {
        Self::connect(Some(&sqlite_url_for(path))).await
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("running migrations")
    }
}

#[async_trait::async_trait]
impl Store for Database {
    async fn save(&self, element: &ListElement) -> Result<ListElement> {
        if let Some(id) = element.id {
            anyhow::bail!("entry {} of {} is already stored", id, element.list_name);
        }
        let insert = entry_insert_from_element(element);
        let id = dao::insert_entry(&self.pool, &insert)
            .await
            .with_context(|| format!("saving \"{}\" to {}", element.name, element.list_name))?;
        Ok(ListElement { id: Some(id), ..element.clone() })
    }

    async fn load(&self, list_name: &str, id: i64) -> Result<Option<ListElement>> {
        Ok(dao::find_entry(&self.pool, list_name, id).await?.map(element_from_row))
    }

    async fn load_all(&self, list_name: &str, filter: StatusFilter) -> Result<Vec<ListElement>> {
        let rows = dao::list_entries(&self.pool, list_name).await?;
        Ok(rows
            .into_iter()
            .map(element_from_row)
            .filter(|e| filter.admits(e.was_viewed, e.was_removed))
            .collect())
    }

    async fn update_field(&self, element: &ListElement, field: Field) -> Result<bool> {
        let Some(id) = element.id else { return Ok(false); };
        let n = dao::set_entry_field(&self.pool, &element.list_name, id, field).await?;
        Ok(n > 0)
    }
}

pub fn sqlite_url_for(path: &Path) -> String {
    // Encode spaces in the path for a valid sqlite URL
    let path_str = path.to_string_lossy().replace(' ', "%20");
    format!("sqlite://{path_str}?mode=rwc")
}

fn default_sqlite_url() -> Result<String> {
    let proj = crate::config::project_dirs()
        .context("unable to determine data directory for default sqlite path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating data dir: {}", path.display()))?;
    path.push("laterlist.db");
    Ok(sqlite_url_for(&path))
}
