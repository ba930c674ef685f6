//! Pilar database operations

use crate::db::Upserted;
use smap_common::db::models::Pilar;
use smap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const COLUMNS: &str =
    "id, klausul_id, nama, deskripsi, is_active, created_at, updated_at, created_by, updated_by";

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Pilar> {
    Ok(Pilar {
        id: Uuid::parse_str(row.get("id"))?,
        klausul_id: Uuid::parse_str(row.get("klausul_id"))?,
        nama: row.get("nama"),
        deskripsi: row.get("deskripsi"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    })
}

/// Idempotent upsert by the (klausul_id, nama) natural key
///
/// The nama column is NOCASE, so lookup and unique constraint both fold
/// case the same way the importer's cache key does.
pub async fn upsert(
    pool: &SqlitePool,
    klausul_id: Uuid,
    nama: &str,
    deskripsi: &str,
    actor: &str,
) -> Result<Upserted> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM master_pilar WHERE klausul_id = ? AND nama = ?")
            .bind(klausul_id.to_string())
            .bind(nama)
            .fetch_optional(&mut *tx)
            .await?;

    let upserted = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE master_pilar \
                 SET deskripsi = ?, updated_at = CURRENT_TIMESTAMP, updated_by = ? \
                 WHERE id = ?",
            )
            .bind(deskripsi)
            .bind(actor)
            .bind(&id)
            .execute(&mut *tx)
            .await?;
            Upserted {
                id: Uuid::parse_str(&id)?,
                created: false,
            }
        }
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO master_pilar (id, klausul_id, nama, deskripsi, is_active, created_by) \
                 VALUES (?, ?, ?, ?, 1, ?)",
            )
            .bind(id.to_string())
            .bind(klausul_id.to_string())
            .bind(nama)
            .bind(deskripsi)
            .bind(actor)
            .execute(&mut *tx)
            .await?;
            Upserted { id, created: true }
        }
    };

    tx.commit().await?;
    Ok(upserted)
}

pub async fn list(
    pool: &SqlitePool,
    klausul_id: Option<Uuid>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Pilar>> {
    let mut sql = format!("SELECT {} FROM master_pilar WHERE 1=1", COLUMNS);
    if klausul_id.is_some() {
        sql.push_str(" AND klausul_id = ?");
    }
    if search.is_some() {
        sql.push_str(" AND nama LIKE ?");
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query(&sql);
    if let Some(id) = klausul_id {
        query = query.bind(id.to_string());
    }
    if let Some(search) = search {
        query = query.bind(format!("%{}%", search));
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    rows.iter().map(map_row).collect()
}

pub async fn count(
    pool: &SqlitePool,
    klausul_id: Option<Uuid>,
    search: Option<&str>,
) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM master_pilar WHERE 1=1");
    if klausul_id.is_some() {
        sql.push_str(" AND klausul_id = ?");
    }
    if search.is_some() {
        sql.push_str(" AND nama LIKE ?");
    }

    let mut query = sqlx::query_scalar(&sql);
    if let Some(id) = klausul_id {
        query = query.bind(id.to_string());
    }
    if let Some(search) = search {
        query = query.bind(format!("%{}%", search));
    }
    Ok(query.fetch_one(pool).await?)
}

/// Active children of a clause, for hierarchy assembly
pub async fn list_by_klausul(
    pool: &SqlitePool,
    klausul_id: Uuid,
    active_only: bool,
) -> Result<Vec<Pilar>> {
    let mut sql = format!("SELECT {} FROM master_pilar WHERE klausul_id = ?", COLUMNS);
    if active_only {
        sql.push_str(" AND is_active = 1");
    }
    sql.push_str(" ORDER BY nama");

    let rows = sqlx::query(&sql)
        .bind(klausul_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_row).collect()
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Pilar>> {
    let row = sqlx::query(&format!("SELECT {} FROM master_pilar WHERE id = ?", COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_row).transpose()
}

pub async fn create(
    pool: &SqlitePool,
    klausul_id: Uuid,
    nama: &str,
    deskripsi: Option<&str>,
    is_active: bool,
) -> Result<Pilar> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO master_pilar (id, klausul_id, nama, deskripsi, is_active) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(klausul_id.to_string())
    .bind(nama)
    .bind(deskripsi)
    .bind(is_active as i64)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| smap_common::Error::Internal("pilar vanished after insert".into()))
}

/// Partial update; None fields keep their current value
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    klausul_id: Option<Uuid>,
    nama: Option<&str>,
    deskripsi: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<Pilar>> {
    let result = sqlx::query(
        "UPDATE master_pilar SET \
           klausul_id = COALESCE(?, klausul_id), \
           nama = COALESCE(?, nama), \
           deskripsi = COALESCE(?, deskripsi), \
           is_active = COALESCE(?, is_active), \
           updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(klausul_id.map(|v| v.to_string()))
    .bind(nama)
    .bind(deskripsi)
    .bind(is_active.map(|a| a as i64))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM master_pilar WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        smap_common::db::create_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn upsert_folds_name_case() {
        let pool = test_pool().await;
        let klausul = crate::db::klausul::upsert(&pool, "8.1", "Perencanaan", "d", "t")
            .await
            .unwrap();

        let first = upsert(&pool, klausul.id, "Monitoring", "Pilar Monitoring", "t")
            .await
            .unwrap();
        assert!(first.created);

        // Same name in different case resolves to the same row
        let second = upsert(&pool, klausul.id, "monitoring", "Pilar monitoring", "t")
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);
    }
}
