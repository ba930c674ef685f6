//! Execution history recorder
//!
//! Append-only audit trail for PelaksanaanSemester changes. Rows are never
//! updated or deleted; retrieval is most-recent-first.

use smap_common::db::models::{HistoryAction, HistoryLog};
use smap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const COLUMNS: &str =
    "id, pelaksanaan_semester_id, action, old_value, new_value, description, created_at, created_by";

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryLog> {
    Ok(HistoryLog {
        id: Uuid::parse_str(row.get("id"))?,
        pelaksanaan_semester_id: Uuid::parse_str(row.get("pelaksanaan_semester_id"))?,
        action: row.get::<&str, _>("action").parse()?,
        old_value: row.get("old_value"),
        new_value: row.get("new_value"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
    })
}

/// Append one immutable audit trail entry
pub async fn append(
    pool: &SqlitePool,
    pelaksanaan_id: Uuid,
    action: HistoryAction,
    old_value: Option<String>,
    new_value: Option<String>,
    description: &str,
    actor: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO history_log \
           (id, pelaksanaan_semester_id, action, old_value, new_value, description, created_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(pelaksanaan_id.to_string())
    .bind(action.as_str())
    .bind(old_value)
    .bind(new_value)
    .bind(description)
    .bind(actor)
    .execute(pool)
    .await?;

    Ok(())
}

/// History of one execution, most recent first
pub async fn list_for_pelaksanaan(
    pool: &SqlitePool,
    pelaksanaan_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<HistoryLog>> {
    // rowid breaks ties between entries appended within the same second
    let mut sql = format!(
        "SELECT {} FROM history_log WHERE pelaksanaan_semester_id = ? \
         ORDER BY created_at DESC, rowid DESC",
        COLUMNS
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql).bind(pelaksanaan_id.to_string());
    if let Some(limit) = limit {
        query = query.bind(limit);
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(map_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn entries_come_back_most_recent_first() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        smap_common::db::create_tables(&pool).await.unwrap();

        let target = Uuid::new_v4();
        for (action, note) in [
            (HistoryAction::Create, "first"),
            (HistoryAction::UpdateStatus, "second"),
            (HistoryAction::UpdateProgress, "third"),
        ] {
            append(&pool, target, action, None, None, note, Some("tester"))
                .await
                .unwrap();
        }

        let entries = list_for_pelaksanaan(&pool, target, None).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].description.as_deref(), Some("third"));
        assert_eq!(entries[2].description.as_deref(), Some("first"));

        let limited = list_for_pelaksanaan(&pool, target, Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
