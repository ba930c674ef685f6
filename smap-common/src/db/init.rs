//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up with
//! idempotent `CREATE TABLE IF NOT EXISTS` statements.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers while an import is writing
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Idempotent - safe to call multiple times
    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables and indices (idempotent)
///
/// Public so tests can bootstrap an in-memory database with the same schema
/// the service runs against.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_master_klausul_table(pool).await?;
    create_master_pilar_table(pool).await?;
    create_master_elemen_table(pool).await?;
    create_master_sub_elemen_table(pool).await?;
    create_pengukuran_master_table(pool).await?;
    create_pelaksanaan_semester_table(pool).await?;
    create_history_log_table(pool).await?;
    Ok(())
}

async fn create_master_klausul_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS master_klausul (
            id TEXT PRIMARY KEY,
            kode TEXT NOT NULL UNIQUE,
            nama TEXT NOT NULL,
            deskripsi TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT,
            updated_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_master_pilar_table(pool: &SqlitePool) -> Result<()> {
    // NOCASE on nama keeps the sibling-uniqueness invariant case-insensitive,
    // matching the importer's composite-key folding
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS master_pilar (
            id TEXT PRIMARY KEY,
            klausul_id TEXT NOT NULL REFERENCES master_klausul(id) ON DELETE CASCADE,
            nama TEXT NOT NULL COLLATE NOCASE,
            deskripsi TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT,
            updated_by TEXT,
            UNIQUE (klausul_id, nama)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_master_pilar_klausul ON master_pilar(klausul_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_master_elemen_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS master_elemen (
            id TEXT PRIMARY KEY,
            pilar_id TEXT NOT NULL REFERENCES master_pilar(id) ON DELETE CASCADE,
            nama TEXT NOT NULL COLLATE NOCASE,
            deskripsi TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT,
            updated_by TEXT,
            UNIQUE (pilar_id, nama)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_master_elemen_pilar ON master_elemen(pilar_id)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_master_sub_elemen_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS master_sub_elemen (
            id TEXT PRIMARY KEY,
            elemen_id TEXT NOT NULL REFERENCES master_elemen(id) ON DELETE CASCADE,
            nama TEXT NOT NULL COLLATE NOCASE,
            deskripsi TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT,
            updated_by TEXT,
            UNIQUE (elemen_id, nama)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_master_sub_elemen_elemen ON master_sub_elemen(elemen_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_pengukuran_master_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pengukuran_master (
            id TEXT PRIMARY KEY,
            sub_elemen_id TEXT NOT NULL REFERENCES master_sub_elemen(id) ON DELETE CASCADE,
            nama_pengukuran TEXT NOT NULL COLLATE NOCASE,
            jadwal_pengerjaan TEXT,
            kualitas_pemenuhan TEXT,
            indikator TEXT NOT NULL COLLATE NOCASE DEFAULT '',
            evidence TEXT,
            link_evidence TEXT,
            pic TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT,
            updated_by TEXT,
            UNIQUE (sub_elemen_id, nama_pengukuran, indikator)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pengukuran_sub_elemen ON pengukuran_master(sub_elemen_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_pelaksanaan_semester_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pelaksanaan_semester (
            id TEXT PRIMARY KEY,
            pengukuran_id TEXT NOT NULL REFERENCES pengukuran_master(id) ON DELETE CASCADE,
            semester TEXT NOT NULL CHECK (semester IN ('S1', 'S2')),
            tahun INTEGER NOT NULL,
            tanggal_target TEXT,
            tanggal_mulai TEXT,
            tanggal_selesai TEXT,
            status TEXT NOT NULL DEFAULT 'PLANNED',
            progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
            catatan TEXT,
            evidence_actual TEXT,
            link_evidence_actual TEXT,
            pic_pelaksana TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT,
            updated_by TEXT,
            UNIQUE (pengukuran_id, semester, tahun)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pelaksanaan_pengukuran ON pelaksanaan_semester(pengukuran_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pelaksanaan_periode ON pelaksanaan_semester(tahun, semester)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_history_log_table(pool: &SqlitePool) -> Result<()> {
    // Append-only audit trail. No UPDATE or DELETE is ever issued against
    // this table; rows reference an execution and are kept past its deletion.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history_log (
            id TEXT PRIMARY KEY,
            pelaksanaan_semester_id TEXT NOT NULL,
            action TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_pelaksanaan ON history_log(pelaksanaan_semester_id, created_at)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_database_file_and_schema() {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("nested").join("smap.db");

        let pool = init_database(&db_path).await.expect("init database");
        assert!(db_path.exists());

        // Idempotent: a second pass over an existing file succeeds
        create_tables(&pool).await.expect("re-create tables");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        for expected in [
            "history_log",
            "master_elemen",
            "master_klausul",
            "master_pilar",
            "master_sub_elemen",
            "pelaksanaan_semester",
            "pengukuran_master",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }
    }
}
