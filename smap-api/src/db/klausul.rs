//! Klausul database operations

use crate::db::Upserted;
use smap_common::db::models::{Klausul, Semester};
use smap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const COLUMNS: &str =
    "id, kode, nama, deskripsi, is_active, created_at, updated_at, created_by, updated_by";

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Klausul> {
    Ok(Klausul {
        id: Uuid::parse_str(row.get("id"))?,
        kode: row.get("kode"),
        nama: row.get("nama"),
        deskripsi: row.get("deskripsi"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    })
}

/// Idempotent upsert by the unique `kode` natural key
///
/// Creates the clause if missing; otherwise refreshes the descriptive
/// fields (nama, deskripsi) and leaves the identity untouched. One
/// transaction per call.
pub async fn upsert(
    pool: &SqlitePool,
    kode: &str,
    nama: &str,
    deskripsi: &str,
    actor: &str,
) -> Result<Upserted> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM master_klausul WHERE kode = ?")
        .bind(kode)
        .fetch_optional(&mut *tx)
        .await?;

    let upserted = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE master_klausul \
                 SET nama = ?, deskripsi = ?, updated_at = CURRENT_TIMESTAMP, updated_by = ? \
                 WHERE id = ?",
            )
            .bind(nama)
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
                "INSERT INTO master_klausul (id, kode, nama, deskripsi, is_active, created_by) \
                 VALUES (?, ?, ?, ?, 1, ?)",
            )
            .bind(id.to_string())
            .bind(kode)
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

/// Filters for the klausul list endpoint
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// Restrict to clauses that have at least one matching execution
    pub semester: Option<Semester>,
    pub tahun: Option<i32>,
}

fn push_filter_sql(filter: &ListFilter, sql: &mut String) {
    if filter.search.is_some() {
        sql.push_str(" AND (kode LIKE ? OR nama LIKE ?)");
    }
    if filter.is_active.is_some() {
        sql.push_str(" AND is_active = ?");
    }
    if filter.semester.is_some() || filter.tahun.is_some() {
        sql.push_str(
            " AND EXISTS (\
               SELECT 1 FROM master_pilar p \
               JOIN master_elemen e ON e.pilar_id = p.id \
               JOIN master_sub_elemen s ON s.elemen_id = e.id \
               JOIN pengukuran_master m ON m.sub_elemen_id = s.id \
               JOIN pelaksanaan_semester x ON x.pengukuran_id = m.id \
               WHERE p.klausul_id = master_klausul.id",
        );
        if filter.semester.is_some() {
            sql.push_str(" AND x.semester = ?");
        }
        if filter.tahun.is_some() {
            sql.push_str(" AND x.tahun = ?");
        }
        sql.push(')');
    }
}

fn bind_filter<'q>(
    filter: &'q ListFilter,
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    if let Some(active) = filter.is_active {
        query = query.bind(active as i64);
    }
    if let Some(semester) = filter.semester {
        query = query.bind(semester.as_str());
    }
    if let Some(tahun) = filter.tahun {
        query = query.bind(tahun);
    }
    query
}

pub async fn list(
    pool: &SqlitePool,
    filter: &ListFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Klausul>> {
    let mut sql = format!("SELECT {} FROM master_klausul WHERE 1=1", COLUMNS);
    push_filter_sql(filter, &mut sql);
    sql.push_str(" ORDER BY created_at DESC, kode LIMIT ? OFFSET ?");

    let rows = bind_filter(filter, sqlx::query(&sql))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_row).collect()
}

pub async fn count(pool: &SqlitePool, filter: &ListFilter) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM master_klausul WHERE 1=1");
    push_filter_sql(filter, &mut sql);

    let total: i64 = bind_filter(filter, sqlx::query(&sql))
        .fetch_one(pool)
        .await?
        .get(0);
    Ok(total)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Klausul>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM master_klausul WHERE id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn create(
    pool: &SqlitePool,
    kode: &str,
    nama: &str,
    deskripsi: Option<&str>,
    is_active: bool,
) -> Result<Klausul> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO master_klausul (id, kode, nama, deskripsi, is_active) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(kode)
    .bind(nama)
    .bind(deskripsi)
    .bind(is_active as i64)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| smap_common::Error::Internal("klausul vanished after insert".into()))
}

/// Partial update; None fields keep their current value
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    kode: Option<&str>,
    nama: Option<&str>,
    deskripsi: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<Klausul>> {
    let result = sqlx::query(
        "UPDATE master_klausul SET \
           kode = COALESCE(?, kode), \
           nama = COALESCE(?, nama), \
           deskripsi = COALESCE(?, deskripsi), \
           is_active = COALESCE(?, is_active), \
           updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(kode)
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
    let result = sqlx::query("DELETE FROM master_klausul WHERE id = ?")
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
        // Single connection so every query sees the same in-memory database
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
    async fn upsert_reports_created_then_updated() {
        let pool = test_pool().await;

        let first = upsert(&pool, "8.1", "Perencanaan", "8.1 - Perencanaan", "tester")
            .await
            .unwrap();
        assert!(first.created);

        let second = upsert(&pool, "8.1", "Perencanaan revisi", "8.1 - Perencanaan revisi", "tester")
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let loaded = get(&pool, first.id).await.unwrap().unwrap();
        assert_eq!(loaded.nama, "Perencanaan revisi");
        assert_eq!(loaded.kode, "8.1");
    }

    #[tokio::test]
    async fn search_matches_kode_and_nama() {
        let pool = test_pool().await;
        upsert(&pool, "8.1", "Perencanaan operasi", "x", "t").await.unwrap();
        upsert(&pool, "9.1", "Pemantauan", "x", "t").await.unwrap();

        let filter = ListFilter {
            search: Some("pemantau".to_string()),
            ..Default::default()
        };
        let found = list(&pool, &filter, 10, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kode, "9.1");
        assert_eq!(count(&pool, &filter).await.unwrap(), 1);
    }
}
