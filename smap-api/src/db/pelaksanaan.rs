//! PelaksanaanSemester (execution instance) database operations

use crate::db::Upserted;
use smap_common::db::models::{ExecutionStatus, Pelaksanaan, Semester};
use smap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const COLUMNS: &str = "id, pengukuran_id, semester, tahun, tanggal_target, tanggal_mulai, \
                       tanggal_selesai, status, progress, catatan, evidence_actual, \
                       link_evidence_actual, pic_pelaksana, is_active, created_at, updated_at, \
                       created_by, updated_by";

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Pelaksanaan> {
    Ok(Pelaksanaan {
        id: Uuid::parse_str(row.get("id"))?,
        pengukuran_id: Uuid::parse_str(row.get("pengukuran_id"))?,
        semester: row.get::<&str, _>("semester").parse()?,
        tahun: row.get::<i64, _>("tahun") as i32,
        tanggal_target: row.get("tanggal_target"),
        tanggal_mulai: row.get("tanggal_mulai"),
        tanggal_selesai: row.get("tanggal_selesai"),
        status: row.get::<&str, _>("status").parse()?,
        progress: row.get("progress"),
        catatan: row.get("catatan"),
        evidence_actual: row.get("evidence_actual"),
        link_evidence_actual: row.get("link_evidence_actual"),
        pic_pelaksana: row.get("pic_pelaksana"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    })
}

/// Idempotent upsert by the (pengukuran_id, semester, tahun) natural key,
/// as driven by the importer. Re-import of the same logical execution
/// refreshes the target date, status and PIC in place.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_for_import(
    pool: &SqlitePool,
    pengukuran_id: Uuid,
    semester: Semester,
    tahun: i32,
    tanggal_target: &str,
    status: ExecutionStatus,
    pic_pelaksana: Option<&str>,
    actor: &str,
) -> Result<Upserted> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT id FROM pelaksanaan_semester \
         WHERE pengukuran_id = ? AND semester = ? AND tahun = ?",
    )
    .bind(pengukuran_id.to_string())
    .bind(semester.as_str())
    .bind(tahun)
    .fetch_optional(&mut *tx)
    .await?;

    let upserted = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE pelaksanaan_semester SET \
                   tanggal_target = ?, status = ?, pic_pelaksana = ?, \
                   updated_at = CURRENT_TIMESTAMP, updated_by = ? \
                 WHERE id = ?",
            )
            .bind(tanggal_target)
            .bind(status.as_str())
            .bind(pic_pelaksana)
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
                "INSERT INTO pelaksanaan_semester \
                   (id, pengukuran_id, semester, tahun, tanggal_target, status, progress, \
                    pic_pelaksana, created_by) \
                 VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
            )
            .bind(id.to_string())
            .bind(pengukuran_id.to_string())
            .bind(semester.as_str())
            .bind(tahun)
            .bind(tanggal_target)
            .bind(status.as_str())
            .bind(pic_pelaksana)
            .bind(actor)
            .execute(&mut *tx)
            .await?;
            Upserted { id, created: true }
        }
    };

    tx.commit().await?;
    Ok(upserted)
}

/// Filters for the execution list endpoint
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub status: Option<ExecutionStatus>,
    pub semester: Option<Semester>,
    pub tahun: Option<i32>,
    pub pengukuran_id: Option<Uuid>,
    /// Matches pic_pelaksana or catatan
    pub search: Option<String>,
}

fn push_filter_sql(filter: &ListFilter, sql: &mut String) {
    if filter.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if filter.semester.is_some() {
        sql.push_str(" AND semester = ?");
    }
    if filter.tahun.is_some() {
        sql.push_str(" AND tahun = ?");
    }
    if filter.pengukuran_id.is_some() {
        sql.push_str(" AND pengukuran_id = ?");
    }
    if filter.search.is_some() {
        sql.push_str(" AND (pic_pelaksana LIKE ? OR catatan LIKE ?)");
    }
}

fn bind_filter<'q>(
    filter: &'q ListFilter,
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(semester) = filter.semester {
        query = query.bind(semester.as_str());
    }
    if let Some(tahun) = filter.tahun {
        query = query.bind(tahun);
    }
    if let Some(id) = filter.pengukuran_id {
        query = query.bind(id.to_string());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    query
}

pub async fn list(
    pool: &SqlitePool,
    filter: &ListFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Pelaksanaan>> {
    let mut sql = format!("SELECT {} FROM pelaksanaan_semester WHERE 1=1", COLUMNS);
    push_filter_sql(filter, &mut sql);
    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

    let rows = bind_filter(filter, sqlx::query(&sql))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_row).collect()
}

pub async fn count(pool: &SqlitePool, filter: &ListFilter) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM pelaksanaan_semester WHERE 1=1");
    push_filter_sql(filter, &mut sql);

    let total: i64 = bind_filter(filter, sqlx::query(&sql))
        .fetch_one(pool)
        .await?
        .get(0);
    Ok(total)
}

/// Executions of one measurement, newest year first then S1 before S2,
/// for hierarchy assembly and execution summaries
pub async fn list_for_pengukuran(
    pool: &SqlitePool,
    pengukuran_id: Uuid,
    semester: Option<Semester>,
    tahun: Option<i32>,
    limit: Option<i64>,
) -> Result<Vec<Pelaksanaan>> {
    let mut sql = format!(
        "SELECT {} FROM pelaksanaan_semester WHERE pengukuran_id = ?",
        COLUMNS
    );
    if semester.is_some() {
        sql.push_str(" AND semester = ?");
    }
    if tahun.is_some() {
        sql.push_str(" AND tahun = ?");
    }
    sql.push_str(" ORDER BY tahun DESC, semester ASC");
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql).bind(pengukuran_id.to_string());
    if let Some(semester) = semester {
        query = query.bind(semester.as_str());
    }
    if let Some(tahun) = tahun {
        query = query.bind(tahun);
    }
    if let Some(limit) = limit {
        query = query.bind(limit);
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(map_row).collect()
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Pelaksanaan>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM pelaksanaan_semester WHERE id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_row).transpose()
}

/// Fields accepted when creating an execution through the API
#[derive(Debug, Clone)]
pub struct NewPelaksanaan {
    pub pengukuran_id: Uuid,
    pub semester: Semester,
    pub tahun: i32,
    pub tanggal_target: Option<String>,
    pub tanggal_mulai: Option<String>,
    pub tanggal_selesai: Option<String>,
    pub status: ExecutionStatus,
    pub progress: i64,
    pub catatan: Option<String>,
    pub evidence_actual: Option<String>,
    pub link_evidence_actual: Option<String>,
    pub pic_pelaksana: Option<String>,
    pub created_by: Option<String>,
}

pub async fn create(pool: &SqlitePool, new: &NewPelaksanaan) -> Result<Pelaksanaan> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO pelaksanaan_semester \
           (id, pengukuran_id, semester, tahun, tanggal_target, tanggal_mulai, tanggal_selesai, \
            status, progress, catatan, evidence_actual, link_evidence_actual, pic_pelaksana, \
            created_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(new.pengukuran_id.to_string())
    .bind(new.semester.as_str())
    .bind(new.tahun)
    .bind(&new.tanggal_target)
    .bind(&new.tanggal_mulai)
    .bind(&new.tanggal_selesai)
    .bind(new.status.as_str())
    .bind(new.progress)
    .bind(&new.catatan)
    .bind(&new.evidence_actual)
    .bind(&new.link_evidence_actual)
    .bind(&new.pic_pelaksana)
    .bind(&new.created_by)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| smap_common::Error::Internal("pelaksanaan vanished after insert".into()))
}

/// Fields accepted when updating an execution; None keeps the current value
#[derive(Debug, Clone, Default)]
pub struct PelaksanaanChanges {
    pub pengukuran_id: Option<Uuid>,
    pub semester: Option<Semester>,
    pub tahun: Option<i32>,
    pub tanggal_target: Option<String>,
    pub tanggal_mulai: Option<String>,
    pub tanggal_selesai: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub progress: Option<i64>,
    pub catatan: Option<String>,
    pub evidence_actual: Option<String>,
    pub link_evidence_actual: Option<String>,
    pub pic_pelaksana: Option<String>,
    pub updated_by: Option<String>,
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    changes: &PelaksanaanChanges,
) -> Result<Option<Pelaksanaan>> {
    let result = sqlx::query(
        "UPDATE pelaksanaan_semester SET \
           pengukuran_id = COALESCE(?, pengukuran_id), \
           semester = COALESCE(?, semester), \
           tahun = COALESCE(?, tahun), \
           tanggal_target = COALESCE(?, tanggal_target), \
           tanggal_mulai = COALESCE(?, tanggal_mulai), \
           tanggal_selesai = COALESCE(?, tanggal_selesai), \
           status = COALESCE(?, status), \
           progress = COALESCE(?, progress), \
           catatan = COALESCE(?, catatan), \
           evidence_actual = COALESCE(?, evidence_actual), \
           link_evidence_actual = COALESCE(?, link_evidence_actual), \
           pic_pelaksana = COALESCE(?, pic_pelaksana), \
           updated_at = CURRENT_TIMESTAMP, \
           updated_by = COALESCE(?, updated_by) \
         WHERE id = ?",
    )
    .bind(changes.pengukuran_id.map(|v| v.to_string()))
    .bind(changes.semester.map(|s| s.as_str()))
    .bind(changes.tahun)
    .bind(&changes.tanggal_target)
    .bind(&changes.tanggal_mulai)
    .bind(&changes.tanggal_selesai)
    .bind(changes.status.map(|s| s.as_str()))
    .bind(changes.progress)
    .bind(&changes.catatan)
    .bind(&changes.evidence_actual)
    .bind(&changes.link_evidence_actual)
    .bind(&changes.pic_pelaksana)
    .bind(&changes.updated_by)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, id).await
}

pub async fn set_status(
    pool: &SqlitePool,
    id: Uuid,
    status: ExecutionStatus,
    actor: Option<&str>,
) -> Result<Option<Pelaksanaan>> {
    let result = sqlx::query(
        "UPDATE pelaksanaan_semester \
         SET status = ?, updated_at = CURRENT_TIMESTAMP, updated_by = COALESCE(?, updated_by) \
         WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(actor)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, id).await
}

pub async fn set_progress(
    pool: &SqlitePool,
    id: Uuid,
    progress: i64,
    actor: Option<&str>,
) -> Result<Option<Pelaksanaan>> {
    let result = sqlx::query(
        "UPDATE pelaksanaan_semester \
         SET progress = ?, updated_at = CURRENT_TIMESTAMP, updated_by = COALESCE(?, updated_by) \
         WHERE id = ?",
    )
    .bind(progress)
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
    let result = sqlx::query("DELETE FROM pelaksanaan_semester WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
