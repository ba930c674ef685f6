//! Read-side aggregation over the persisted tree
//!
//! Status distribution, progress averages and semester grouping, computed
//! with SQL aggregation rather than by walking materialized trees.

use smap_common::db::models::{ExecutionStatus, Semester};
use smap_common::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Count per execution status, serialized with the status tags as keys
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusDistribution {
    #[serde(rename = "PLANNED")]
    pub planned: i64,
    #[serde(rename = "IN_PROGRESS")]
    pub in_progress: i64,
    #[serde(rename = "REVIEW")]
    pub review: i64,
    #[serde(rename = "COMPLETED")]
    pub completed: i64,
    #[serde(rename = "OVERDUE")]
    pub overdue: i64,
    #[serde(rename = "CANCELLED")]
    pub cancelled: i64,
    #[serde(rename = "ON_HOLD")]
    pub on_hold: i64,
}

impl StatusDistribution {
    pub fn record(&mut self, status: ExecutionStatus, count: i64) {
        match status {
            ExecutionStatus::Planned => self.planned += count,
            ExecutionStatus::InProgress => self.in_progress += count,
            ExecutionStatus::Review => self.review += count,
            ExecutionStatus::Completed => self.completed += count,
            ExecutionStatus::Overdue => self.overdue += count,
            ExecutionStatus::Cancelled => self.cancelled += count,
            ExecutionStatus::OnHold => self.on_hold += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.planned
            + self.in_progress
            + self.review
            + self.completed
            + self.overdue
            + self.cancelled
            + self.on_hold
    }
}

/// Dashboard-level statistics over all executions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub status_distribution: StatusDistribution,
    pub average_progress: f64,
}

/// Status distribution and average progress, optionally narrowed to one
/// year and/or semester
pub async fn dashboard_stats(
    pool: &SqlitePool,
    tahun: Option<i32>,
    semester: Option<Semester>,
) -> Result<DashboardStats> {
    let mut sql = String::from(
        "SELECT status, COUNT(*) AS n FROM pelaksanaan_semester WHERE 1=1",
    );
    if tahun.is_some() {
        sql.push_str(" AND tahun = ?");
    }
    if semester.is_some() {
        sql.push_str(" AND semester = ?");
    }
    sql.push_str(" GROUP BY status");

    let mut query = sqlx::query(&sql);
    if let Some(tahun) = tahun {
        query = query.bind(tahun);
    }
    if let Some(semester) = semester {
        query = query.bind(semester.as_str());
    }

    let mut distribution = StatusDistribution::default();
    for row in query.fetch_all(pool).await? {
        let status: ExecutionStatus = row.get::<&str, _>("status").parse()?;
        distribution.record(status, row.get("n"));
    }

    let mut sql = String::from("SELECT AVG(progress) FROM pelaksanaan_semester WHERE 1=1");
    if tahun.is_some() {
        sql.push_str(" AND tahun = ?");
    }
    if semester.is_some() {
        sql.push_str(" AND semester = ?");
    }
    let mut query = sqlx::query_scalar::<_, Option<f64>>(&sql);
    if let Some(tahun) = tahun {
        query = query.bind(tahun);
    }
    if let Some(semester) = semester {
        query = query.bind(semester.as_str());
    }
    let average_progress = query.fetch_one(pool).await?.unwrap_or(0.0);

    Ok(DashboardStats {
        status_distribution: distribution,
        average_progress,
    })
}

/// Aggregates for one semester across the whole hierarchy
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterStats {
    pub total_klausul: i64,
    pub total_pengukuran: i64,
    pub total_pelaksanaan: i64,
    pub status_distribution: StatusDistribution,
    pub average_progress: i64,
}

/// Semester grouping over executions, joined up to the owning clause
pub async fn semester_stats(
    pool: &SqlitePool,
    semester: Semester,
    tahun: Option<i32>,
) -> Result<SemesterStats> {
    let mut sql = String::from(
        "SELECT x.status AS status, x.progress AS progress, k.id AS klausul_id, \
                m.id AS pengukuran_id \
         FROM pelaksanaan_semester x \
         JOIN pengukuran_master m ON x.pengukuran_id = m.id \
         JOIN master_sub_elemen s ON m.sub_elemen_id = s.id \
         JOIN master_elemen e ON s.elemen_id = e.id \
         JOIN master_pilar p ON e.pilar_id = p.id \
         JOIN master_klausul k ON p.klausul_id = k.id \
         WHERE x.semester = ?",
    );
    if tahun.is_some() {
        sql.push_str(" AND x.tahun = ?");
    }

    let mut query = sqlx::query(&sql).bind(semester.as_str());
    if let Some(tahun) = tahun {
        query = query.bind(tahun);
    }

    let mut stats = SemesterStats::default();
    let mut klausul_seen = std::collections::HashSet::new();
    let mut pengukuran_seen = std::collections::HashSet::new();
    let mut progress_sum: i64 = 0;

    for row in query.fetch_all(pool).await? {
        let status: ExecutionStatus = row.get::<&str, _>("status").parse()?;
        stats.status_distribution.record(status, 1);
        stats.total_pelaksanaan += 1;
        progress_sum += row.get::<i64, _>("progress");
        klausul_seen.insert(row.get::<String, _>("klausul_id"));
        pengukuran_seen.insert(row.get::<String, _>("pengukuran_id"));
    }

    stats.total_klausul = klausul_seen.len() as i64;
    stats.total_pengukuran = pengukuran_seen.len() as i64;
    if stats.total_pelaksanaan > 0 {
        stats.average_progress =
            (progress_sum as f64 / stats.total_pelaksanaan as f64).round() as i64;
    }

    Ok(stats)
}
