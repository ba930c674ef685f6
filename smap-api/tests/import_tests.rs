//! Integration tests for the hierarchical data importer
//!
//! Covers idempotent re-import, the first-code anchor policy, lenient row
//! skipping, per-row error isolation, semester fan-out with audit trail
//! entries, and case-insensitive sibling dedup within a run.

use smap_api::import::{DataImporter, ImportOptions, ImportRow};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Single connection so every query sees the same in-memory database
async fn setup_test_db() -> SqlitePool {
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

fn test_options() -> ImportOptions {
    ImportOptions {
        created_by: "import-test".to_string(),
        default_year: 2024,
        log_progress: false,
    }
}

/// A fully populated row anchored under clause 8.1
fn sample_row() -> ImportRow {
    ImportRow {
        id: Some("row-1".to_string()),
        klausul_smap: "8.1 - Perencanaan dan pengendalian operasi".to_string(),
        pilar: "Pendeteksian".to_string(),
        elemen: "Monitoring".to_string(),
        sub_elemen: "Fraud dan Compliance Risk Assessment".to_string(),
        pengukuran: "Pemenuhan Pemantauan Compliance Risk Assessment".to_string(),
        jadwal_pengerjaan: "Dilakukan setiap Triwulan".to_string(),
        kualitas_pemenuhan: "Kualitas".to_string(),
        indikator: "Pemantauan monitoring dan evaluasi CRA".to_string(),
        evidence: "Monev efektivitas CRA".to_string(),
        pic: "Tim SDM".to_string(),
        link_evidence: Some("https://example.com/evidence".to_string()),
        semester1: Some("10/04/2024".to_string()),
        semester2: None,
        status: None,
    }
}

async fn table_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

// =============================================================================
// Idempotent re-import
// =============================================================================

#[tokio::test]
async fn reimport_updates_instead_of_duplicating() {
    let pool = setup_test_db().await;
    let rows = vec![sample_row()];

    let first = DataImporter::new(&pool)
        .import(&rows, &test_options())
        .await
        .unwrap();
    assert_eq!(first.created.klausul, 1);
    assert_eq!(first.created.pilar, 1);
    assert_eq!(first.created.elemen, 1);
    assert_eq!(first.created.sub_elemen, 1);
    assert_eq!(first.created.pengukuran, 1);
    assert_eq!(first.created.pelaksanaan, 1);
    assert_eq!(first.updated.total(), 0);
    assert!(first.errors.is_empty());

    // Fresh importer = fresh cache, so every level round-trips again
    let second = DataImporter::new(&pool)
        .import(&rows, &test_options())
        .await
        .unwrap();
    assert_eq!(second.created.total(), 0);
    assert_eq!(second.updated.klausul, 1);
    assert_eq!(second.updated.pilar, 1);
    assert_eq!(second.updated.elemen, 1);
    assert_eq!(second.updated.sub_elemen, 1);
    assert_eq!(second.updated.pengukuran, 1);
    assert_eq!(second.updated.pelaksanaan, 1);
    assert!(second.errors.is_empty());

    // No duplicate siblings anywhere
    assert_eq!(table_count(&pool, "master_klausul").await, 1);
    assert_eq!(table_count(&pool, "master_pilar").await, 1);
    assert_eq!(table_count(&pool, "master_elemen").await, 1);
    assert_eq!(table_count(&pool, "master_sub_elemen").await, 1);
    assert_eq!(table_count(&pool, "pengukuran_master").await, 1);
    assert_eq!(table_count(&pool, "pelaksanaan_semester").await, 1);
}

// =============================================================================
// Anchor policy
// =============================================================================

#[tokio::test]
async fn hierarchy_anchors_on_first_parsed_code() {
    let pool = setup_test_db().await;
    let row = ImportRow {
        klausul_smap: "9.1 - Pemantauan\n8.1 - Perencanaan".to_string(),
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[row], &test_options())
        .await
        .unwrap();

    // Both clauses upserted, one pilar chain
    assert_eq!(outcome.created.klausul, 2);
    assert_eq!(outcome.created.pilar, 1);
    assert_eq!(table_count(&pool, "master_klausul").await, 2);

    // The chain hangs under 9.1, the first parsed code
    let anchor_id: String =
        sqlx::query_scalar("SELECT id FROM master_klausul WHERE kode = '9.1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    let pilar_parent: String = sqlx::query_scalar("SELECT klausul_id FROM master_pilar")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(pilar_parent, anchor_id);

    // 8.1 is upserted standalone, without children
    let orphan_children: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM master_pilar p \
         JOIN master_klausul k ON p.klausul_id = k.id WHERE k.kode = '8.1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphan_children, 0);
}

// =============================================================================
// Lenient row skipping
// =============================================================================

#[tokio::test]
async fn row_missing_required_field_is_skipped_silently() {
    let pool = setup_test_db().await;
    let row = ImportRow {
        sub_elemen: String::new(),
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[row], &test_options())
        .await
        .unwrap();

    assert_eq!(outcome.created.total(), 0);
    assert_eq!(outcome.updated.total(), 0);
    assert!(outcome.errors.is_empty());
    assert_eq!(table_count(&pool, "master_klausul").await, 0);
}

#[tokio::test]
async fn row_without_clause_codes_is_skipped_silently() {
    let pool = setup_test_db().await;
    let row = ImportRow {
        klausul_smap: "tidak ada kode di sini".to_string(),
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[row], &test_options())
        .await
        .unwrap();

    assert_eq!(outcome.created.total(), 0);
    assert!(outcome.errors.is_empty());
    assert_eq!(table_count(&pool, "master_klausul").await, 0);
}

// =============================================================================
// Error isolation
// =============================================================================

#[tokio::test]
async fn one_bad_row_does_not_abort_the_batch() {
    let pool = setup_test_db().await;

    let good_one = ImportRow {
        klausul_smap: "4.1 - Konteks organisasi".to_string(),
        ..sample_row()
    };
    let bad = ImportRow {
        klausul_smap: "5.1 - Kepemimpinan".to_string(),
        status: Some("BOGUS".to_string()),
        id: Some("row-2".to_string()),
        ..sample_row()
    };
    let good_two = ImportRow {
        klausul_smap: "6.1 - Perencanaan".to_string(),
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[good_one, bad, good_two], &test_options())
        .await
        .unwrap();

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].item_index, 2);
    assert_eq!(outcome.errors[0].item_id.as_deref(), Some("row-2"));
    assert!(outcome.errors[0].error.contains("invalid status"));

    // Rows 1 and 3 are fully persisted
    assert_eq!(outcome.created.pelaksanaan, 2);
    let executions: i64 = table_count(&pool, "pelaksanaan_semester").await;
    assert_eq!(executions, 2);
}

#[tokio::test]
async fn invalid_date_is_a_row_error_not_a_batch_failure() {
    let pool = setup_test_db().await;
    let row = ImportRow {
        semester1: Some("2024-04-10".to_string()),
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[row], &test_options())
        .await
        .unwrap();

    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].error.contains("DD/MM/YYYY"));

    // The hierarchy above the failing step stays persisted; each upsert is
    // its own transaction and there is no row-level rollback
    assert_eq!(outcome.created.pengukuran, 1);
    assert_eq!(outcome.created.pelaksanaan, 0);
    assert_eq!(table_count(&pool, "pengukuran_master").await, 1);
    assert_eq!(table_count(&pool, "pelaksanaan_semester").await, 0);
}

// =============================================================================
// Semester fan-out and audit trail
// =============================================================================

#[tokio::test]
async fn declared_semesters_fan_out_with_history_entries() {
    let pool = setup_test_db().await;
    let row = ImportRow {
        semester1: Some("10/04/2024".to_string()),
        semester2: Some("08/10/2024".to_string()),
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[row], &test_options())
        .await
        .unwrap();

    assert_eq!(outcome.created.pengukuran, 1);
    assert_eq!(outcome.created.pelaksanaan, 2);

    let rows = sqlx::query_as::<_, (String, i64, String)>(
        "SELECT semester, tahun, tanggal_target FROM pelaksanaan_semester ORDER BY semester",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ("S1".to_string(), 2024, "2024-04-10".to_string()));
    assert_eq!(rows[1], ("S2".to_string(), 2024, "2024-10-08".to_string()));

    // One IMPORT_CREATE audit entry per created execution
    let history: Vec<String> =
        sqlx::query_scalar("SELECT action FROM history_log ORDER BY created_at")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(history, vec!["IMPORT_CREATE", "IMPORT_CREATE"]);

    // Re-import touches the executions without new audit entries
    let again = DataImporter::new(&pool)
        .import(
            &[ImportRow {
                semester1: Some("11/04/2024".to_string()),
                semester2: Some("09/10/2024".to_string()),
                ..sample_row()
            }],
            &test_options(),
        )
        .await
        .unwrap();
    assert_eq!(again.updated.pelaksanaan, 2);
    assert_eq!(table_count(&pool, "history_log").await, 2);
}

// =============================================================================
// Case-insensitive dedup within a run
// =============================================================================

#[tokio::test]
async fn sibling_names_dedup_case_insensitively() {
    let pool = setup_test_db().await;

    let first = sample_row();
    let second = ImportRow {
        pilar: "pendeteksian ".to_string(),
        elemen: "MONITORING".to_string(),
        pengukuran: "Pengukuran lain".to_string(),
        semester1: None,
        ..sample_row()
    };

    let outcome = DataImporter::new(&pool)
        .import(&[first, second], &test_options())
        .await
        .unwrap();

    // Second row reuses the cached pilar and elemen
    assert_eq!(outcome.created.pilar, 1);
    assert_eq!(outcome.created.elemen, 1);
    assert_eq!(outcome.updated.pilar, 0);
    assert_eq!(outcome.created.pengukuran, 2);

    assert_eq!(table_count(&pool, "master_pilar").await, 1);
    assert_eq!(table_count(&pool, "master_elemen").await, 1);
}

// =============================================================================
// Counters under repeated rows in one run
// =============================================================================

#[tokio::test]
async fn repeated_rows_in_one_run_hit_the_cache_once_per_level() {
    let pool = setup_test_db().await;
    let rows = vec![sample_row(), sample_row(), sample_row()];

    let outcome = DataImporter::new(&pool)
        .import(&rows, &test_options())
        .await
        .unwrap();

    // Cache memoizes every level, so only the first row writes
    assert_eq!(outcome.created.klausul, 1);
    assert_eq!(outcome.created.pilar, 1);
    assert_eq!(outcome.created.pengukuran, 1);
    assert_eq!(outcome.created.pelaksanaan, 1);
    assert_eq!(outcome.updated.total(), 0);
}
