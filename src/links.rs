use crate::error::{CatalogError, CatalogResult};
use crate::paths;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Catalog path prefix under which link records are addressed.
const LINK_PATH_PREFIX: &str = "links/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub category_path: String,
    pub added: i64,
}

impl LinkRecord {
    pub fn catalog_path(&self) -> String {
        format!("{LINK_PATH_PREFIX}{}", self.id)
    }
}

/// Parses a catalog path of the form `links/{id}`.
pub fn parse_link_path(path: &str) -> Option<i64> {
    path.strip_prefix(LINK_PATH_PREFIX)
        .and_then(|id| id.parse().ok())
}

pub async fn init_db(pool: &SqlitePool) -> CatalogResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS links (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            url TEXT NOT NULL,\
            name TEXT NOT NULL,\
            category_path TEXT NOT NULL,\
            added INTEGER NOT NULL\
        );",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Registers an external URL as a catalog entry. Only `https` URLs are
/// accepted.
pub async fn add_link(
    pool: &SqlitePool,
    raw_url: &str,
    name: Option<&str>,
    category: Option<&str>,
) -> CatalogResult<LinkRecord> {
    let url = Url::parse(raw_url).map_err(|_| CatalogError::InvalidUrl(raw_url.to_string()))?;
    if url.scheme() != "https" || url.host_str().is_none() {
        return Err(CatalogError::InvalidUrl(raw_url.to_string()));
    }

    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url.host_str().unwrap_or_default().to_string());

    let category_path = match category {
        Some(raw) => paths::rel_to_string(&paths::sanitize_relative(raw)?),
        None => String::new(),
    };

    let added = unix_now();
    let result = sqlx::query(
        "INSERT INTO links (url, name, category_path, added) VALUES (?, ?, ?, ?);",
    )
    .bind(url.as_str())
    .bind(&name)
    .bind(&category_path)
    .bind(added)
    .execute(pool)
    .await?;

    Ok(LinkRecord {
        id: result.last_insert_rowid(),
        url: url.to_string(),
        name,
        category_path,
        added,
    })
}

pub async fn list_links(pool: &SqlitePool) -> CatalogResult<Vec<LinkRecord>> {
    let rows = sqlx::query("SELECT id, url, name, category_path, added FROM links ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(row_to_link).collect())
}

pub async fn remove_link(pool: &SqlitePool, id: i64) -> CatalogResult<bool> {
    let result = sqlx::query("DELETE FROM links WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn row_to_link(row: SqliteRow) -> LinkRecord {
    LinkRecord {
        id: row.get("id"),
        url: row.get("url"),
        name: row.get("name"),
        category_path: row.get("category_path"),
        added: row.get("added"),
    }
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// A single connection keeps the in-memory database alive across queries.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_db(&pool).await.unwrap();
    pool
}
