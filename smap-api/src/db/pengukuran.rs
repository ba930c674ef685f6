//! Pengukuran (measurement definition) database operations

use crate::db::Upserted;
use smap_common::db::models::Pengukuran;
use smap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const COLUMNS: &str = "id, sub_elemen_id, nama_pengukuran, jadwal_pengerjaan, kualitas_pemenuhan, \
                       indikator, evidence, link_evidence, pic, is_active, created_at, updated_at, \
                       created_by, updated_by";

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Pengukuran> {
    Ok(Pengukuran {
        id: Uuid::parse_str(row.get("id"))?,
        sub_elemen_id: Uuid::parse_str(row.get("sub_elemen_id"))?,
        nama_pengukuran: row.get("nama_pengukuran"),
        jadwal_pengerjaan: row.get("jadwal_pengerjaan"),
        kualitas_pemenuhan: row.get("kualitas_pemenuhan"),
        indikator: row.get("indikator"),
        evidence: row.get("evidence"),
        link_evidence: row.get("link_evidence"),
        pic: row.get("pic"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    })
}

/// Descriptive fields carried by a measurement, outside its natural key
#[derive(Debug, Clone, Default)]
pub struct PengukuranAttrs {
    pub jadwal_pengerjaan: Option<String>,
    pub kualitas_pemenuhan: Option<String>,
    pub evidence: Option<String>,
    pub link_evidence: Option<String>,
    pub pic: Option<String>,
}

/// Idempotent upsert by the (sub_elemen_id, nama_pengukuran, indikator)
/// natural key. Descriptive attributes are refreshed on every hit.
pub async fn upsert(
    pool: &SqlitePool,
    sub_elemen_id: Uuid,
    nama_pengukuran: &str,
    indikator: &str,
    attrs: &PengukuranAttrs,
    actor: &str,
) -> Result<Upserted> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT id FROM pengukuran_master \
         WHERE sub_elemen_id = ? AND nama_pengukuran = ? AND indikator = ?",
    )
    .bind(sub_elemen_id.to_string())
    .bind(nama_pengukuran)
    .bind(indikator)
    .fetch_optional(&mut *tx)
    .await?;

    let upserted = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE pengukuran_master SET \
                   jadwal_pengerjaan = ?, kualitas_pemenuhan = ?, evidence = ?, \
                   link_evidence = ?, pic = ?, \
                   updated_at = CURRENT_TIMESTAMP, updated_by = ? \
                 WHERE id = ?",
            )
            .bind(&attrs.jadwal_pengerjaan)
            .bind(&attrs.kualitas_pemenuhan)
            .bind(&attrs.evidence)
            .bind(&attrs.link_evidence)
            .bind(&attrs.pic)
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
                "INSERT INTO pengukuran_master \
                   (id, sub_elemen_id, nama_pengukuran, jadwal_pengerjaan, kualitas_pemenuhan, \
                    indikator, evidence, link_evidence, pic, is_active, created_by) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
            )
            .bind(id.to_string())
            .bind(sub_elemen_id.to_string())
            .bind(nama_pengukuran)
            .bind(&attrs.jadwal_pengerjaan)
            .bind(&attrs.kualitas_pemenuhan)
            .bind(indikator)
            .bind(&attrs.evidence)
            .bind(&attrs.link_evidence)
            .bind(&attrs.pic)
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
    sub_elemen_id: Option<Uuid>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Pengukuran>> {
    let mut sql = format!("SELECT {} FROM pengukuran_master WHERE 1=1", COLUMNS);
    if sub_elemen_id.is_some() {
        sql.push_str(" AND sub_elemen_id = ?");
    }
    if search.is_some() {
        sql.push_str(" AND (nama_pengukuran LIKE ? OR indikator LIKE ?)");
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query(&sql);
    if let Some(id) = sub_elemen_id {
        query = query.bind(id.to_string());
    }
    if let Some(search) = search {
        let pattern = format!("%{}%", search);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    rows.iter().map(map_row).collect()
}

pub async fn count(
    pool: &SqlitePool,
    sub_elemen_id: Option<Uuid>,
    search: Option<&str>,
) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM pengukuran_master WHERE 1=1");
    if sub_elemen_id.is_some() {
        sql.push_str(" AND sub_elemen_id = ?");
    }
    if search.is_some() {
        sql.push_str(" AND (nama_pengukuran LIKE ? OR indikator LIKE ?)");
    }

    let mut query = sqlx::query_scalar(&sql);
    if let Some(id) = sub_elemen_id {
        query = query.bind(id.to_string());
    }
    if let Some(search) = search {
        let pattern = format!("%{}%", search);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    Ok(query.fetch_one(pool).await?)
}

pub async fn list_by_sub_elemen(
    pool: &SqlitePool,
    sub_elemen_id: Uuid,
    active_only: bool,
) -> Result<Vec<Pengukuran>> {
    let mut sql = format!(
        "SELECT {} FROM pengukuran_master WHERE sub_elemen_id = ?",
        COLUMNS
    );
    if active_only {
        sql.push_str(" AND is_active = 1");
    }
    sql.push_str(" ORDER BY nama_pengukuran");

    let rows = sqlx::query(&sql)
        .bind(sub_elemen_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_row).collect()
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Pengukuran>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM pengukuran_master WHERE id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_row).transpose()
}

pub async fn create(
    pool: &SqlitePool,
    sub_elemen_id: Uuid,
    nama_pengukuran: &str,
    indikator: &str,
    attrs: &PengukuranAttrs,
    is_active: bool,
    actor: Option<&str>,
) -> Result<Pengukuran> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO pengukuran_master \
           (id, sub_elemen_id, nama_pengukuran, jadwal_pengerjaan, kualitas_pemenuhan, \
            indikator, evidence, link_evidence, pic, is_active, created_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(sub_elemen_id.to_string())
    .bind(nama_pengukuran)
    .bind(&attrs.jadwal_pengerjaan)
    .bind(&attrs.kualitas_pemenuhan)
    .bind(indikator)
    .bind(&attrs.evidence)
    .bind(&attrs.link_evidence)
    .bind(&attrs.pic)
    .bind(is_active as i64)
    .bind(actor)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| smap_common::Error::Internal("pengukuran vanished after insert".into()))
}

/// Partial update; None fields keep their current value
#[allow(clippy::too_many_arguments)]
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    sub_elemen_id: Option<Uuid>,
    nama_pengukuran: Option<&str>,
    indikator: Option<&str>,
    attrs: &PengukuranAttrs,
    is_active: Option<bool>,
    actor: Option<&str>,
) -> Result<Option<Pengukuran>> {
    let result = sqlx::query(
        "UPDATE pengukuran_master SET \
           sub_elemen_id = COALESCE(?, sub_elemen_id), \
           nama_pengukuran = COALESCE(?, nama_pengukuran), \
           indikator = COALESCE(?, indikator), \
           jadwal_pengerjaan = COALESCE(?, jadwal_pengerjaan), \
           kualitas_pemenuhan = COALESCE(?, kualitas_pemenuhan), \
           evidence = COALESCE(?, evidence), \
           link_evidence = COALESCE(?, link_evidence), \
           pic = COALESCE(?, pic), \
           is_active = COALESCE(?, is_active), \
           updated_at = CURRENT_TIMESTAMP, \
           updated_by = COALESCE(?, updated_by) \
         WHERE id = ?",
    )
    .bind(sub_elemen_id.map(|v| v.to_string()))
    .bind(nama_pengukuran)
    .bind(indikator)
    .bind(&attrs.jadwal_pengerjaan)
    .bind(&attrs.kualitas_pemenuhan)
    .bind(&attrs.evidence)
    .bind(&attrs.link_evidence)
    .bind(&attrs.pic)
    .bind(is_active.map(|a| a as i64))
    .bind(actor)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM pengukuran_master WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
