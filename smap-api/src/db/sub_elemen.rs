//! SubElemen database operations

use crate::db::Upserted;
use smap_common::db::models::SubElemen;
use smap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const COLUMNS: &str =
    "id, elemen_id, nama, deskripsi, is_active, created_at, updated_at, created_by, updated_by";

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<SubElemen> {
    Ok(SubElemen {
        id: Uuid::parse_str(row.get("id"))?,
        elemen_id: Uuid::parse_str(row.get("elemen_id"))?,
        nama: row.get("nama"),
        deskripsi: row.get("deskripsi"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    })
}

/// Idempotent upsert by the (elemen_id, nama) natural key
pub async fn upsert(
    pool: &SqlitePool,
    elemen_id: Uuid,
    nama: &str,
    deskripsi: &str,
    actor: &str,
) -> Result<Upserted> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM master_sub_elemen WHERE elemen_id = ? AND nama = ?")
            .bind(elemen_id.to_string())
            .bind(nama)
            .fetch_optional(&mut *tx)
            .await?;

    let upserted = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE master_sub_elemen \
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
                "INSERT INTO master_sub_elemen (id, elemen_id, nama, deskripsi, is_active, created_by) \
                 VALUES (?, ?, ?, ?, 1, ?)",
            )
            .bind(id.to_string())
            .bind(elemen_id.to_string())
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
    elemen_id: Option<Uuid>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<SubElemen>> {
    let mut sql = format!("SELECT {} FROM master_sub_elemen WHERE 1=1", COLUMNS);
    if elemen_id.is_some() {
        sql.push_str(" AND elemen_id = ?");
    }
    if search.is_some() {
        sql.push_str(" AND nama LIKE ?");
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query(&sql);
    if let Some(id) = elemen_id {
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
    elemen_id: Option<Uuid>,
    search: Option<&str>,
) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM master_sub_elemen WHERE 1=1");
    if elemen_id.is_some() {
        sql.push_str(" AND elemen_id = ?");
    }
    if search.is_some() {
        sql.push_str(" AND nama LIKE ?");
    }

    let mut query = sqlx::query_scalar(&sql);
    if let Some(id) = elemen_id {
        query = query.bind(id.to_string());
    }
    if let Some(search) = search {
        query = query.bind(format!("%{}%", search));
    }
    Ok(query.fetch_one(pool).await?)
}

pub async fn list_by_elemen(
    pool: &SqlitePool,
    elemen_id: Uuid,
    active_only: bool,
) -> Result<Vec<SubElemen>> {
    let mut sql = format!("SELECT {} FROM master_sub_elemen WHERE elemen_id = ?", COLUMNS);
    if active_only {
        sql.push_str(" AND is_active = 1");
    }
    sql.push_str(" ORDER BY nama");

    let rows = sqlx::query(&sql)
        .bind(elemen_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_row).collect()
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<SubElemen>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM master_sub_elemen WHERE id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_row).transpose()
}

pub async fn create(
    pool: &SqlitePool,
    elemen_id: Uuid,
    nama: &str,
    deskripsi: Option<&str>,
    is_active: bool,
) -> Result<SubElemen> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO master_sub_elemen (id, elemen_id, nama, deskripsi, is_active) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(elemen_id.to_string())
    .bind(nama)
    .bind(deskripsi)
    .bind(is_active as i64)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| smap_common::Error::Internal("sub elemen vanished after insert".into()))
}

/// Partial update; None fields keep their current value
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    elemen_id: Option<Uuid>,
    nama: Option<&str>,
    deskripsi: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<SubElemen>> {
    let result = sqlx::query(
        "UPDATE master_sub_elemen SET \
           elemen_id = COALESCE(?, elemen_id), \
           nama = COALESCE(?, nama), \
           deskripsi = COALESCE(?, deskripsi), \
           is_active = COALESCE(?, is_active), \
           updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(elemen_id.map(|v| v.to_string()))
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
    let result = sqlx::query("DELETE FROM master_sub_elemen WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
