use anyhow::Result;
use sqlx::AnyPool;

use crate::types::Field;

#[derive(Debug, Clone)]
pub struct EntryInsert {
    pub list_name: String,
    pub kind: String, // "movie" | "show" | "book" | "article" | "generic"
    pub name: String,
    pub url: String,
    pub description: String,
    pub rating: f64,
    pub was_viewed: i64,
    pub was_removed: i64,
}

/// Row as read back: (id, list_name, kind, name, url, description, rating, was_viewed, was_removed)
pub type EntryRow = (i64, String, String, String, String, String, f64, i64, i64);

const ENTRY_COLUMNS: &str = "id, list_name, kind, name, url, description, rating, was_viewed, was_removed";

/// Insert a new entry, allocating the next id within its list. Returns the id.
pub async fn insert_entry(pool: &AnyPool, e: &EntryInsert) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO entries(list_name, id, kind, name, url, description, rating, was_viewed, was_removed)\n         VALUES(?, (SELECT COALESCE(MAX(id), 0) + 1 FROM entries WHERE list_name = ?), ?, ?, ?, ?, ?, ?, ?)\n         RETURNING id",
    )
    .bind(&e.list_name)
    .bind(&e.list_name)
    .bind(&e.kind)
    .bind(&e.name)
    .bind(&e.url)
    .bind(&e.description)
    .bind(e.rating)
    .bind(e.was_viewed)
    .bind(e.was_removed)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn find_entry(pool: &AnyPool, list_name: &str, id: i64) -> Result<Option<EntryRow>> {
    let row = sqlx::query_as::<_, EntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries WHERE list_name = ? AND id = ? LIMIT 1"
    ))
    .bind(list_name)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Every entry of a list in insertion order; status filtering happens in the caller.
pub async fn list_entries(pool: &AnyPool, list_name: &str) -> Result<Vec<EntryRow>> {
    let rows = sqlx::query_as::<_, EntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries WHERE list_name = ? ORDER BY id"
    ))
    .bind(list_name)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn set_entry_field(pool: &AnyPool, list_name: &str, id: i64, field: Field) -> Result<u64> {
    // Column names come from a closed enum, never from input.
    let sql = format!(
        "UPDATE entries SET {} = ?, updated_at = CURRENT_TIMESTAMP WHERE list_name = ? AND id = ?",
        field.column()
    );
    let q = sqlx::query(&sql);
    let q = match field {
        Field::WasViewed(v) | Field::WasRemoved(v) => q.bind(v as i64),
        Field::Rating(r) => q.bind(r),
    };
    let res = q.bind(list_name).bind(id).execute(pool).await?;
    Ok(res.rows_affected())
}
