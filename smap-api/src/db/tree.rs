//! Hierarchy assembly
//!
//! Builds the nested Klausul → Pilar → Elemen → SubElemen → Pengukuran →
//! Pelaksanaan view the read endpoints return, one level at a time.

use crate::db;
use crate::db::stats::StatusDistribution;
use smap_common::db::models::{
    Elemen, HistoryLog, Klausul, Pelaksanaan, Pengukuran, Pilar, Semester, SubElemen,
};
use smap_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// Limit on executions returned per measurement in list views
const EXECUTIONS_PER_PENGUKURAN: i64 = 10;

/// How much of the subtree to materialize
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeFilter {
    /// Restrict executions to one semester
    pub semester: Option<Semester>,
    /// Restrict executions to one year
    pub tahun: Option<i32>,
    /// Skip inactive nodes below the root
    pub active_only: bool,
    /// History entries per execution (0 = none)
    pub history_limit: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PelaksanaanNode {
    #[serde(flatten)]
    pub pelaksanaan: Pelaksanaan,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history_log: Vec<HistoryLog>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PengukuranNode {
    #[serde(flatten)]
    pub pengukuran: Pengukuran,
    pub pelaksanaan_semester: Vec<PelaksanaanNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubElemenNode {
    #[serde(flatten)]
    pub sub_elemen: SubElemen,
    pub pengukuran: Vec<PengukuranNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElemenNode {
    #[serde(flatten)]
    pub elemen: Elemen,
    pub sub_elemen: Vec<SubElemenNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilarNode {
    #[serde(flatten)]
    pub pilar: Pilar,
    pub elemen: Vec<ElemenNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlausulTree {
    #[serde(flatten)]
    pub klausul: Klausul,
    pub pilar: Vec<PilarNode>,
}

/// Materialize the full subtree of one clause
pub async fn load_klausul_tree(
    pool: &SqlitePool,
    klausul: Klausul,
    filter: &TreeFilter,
) -> Result<KlausulTree> {
    let mut pilar_nodes = Vec::new();

    for pilar in db::pilar::list_by_klausul(pool, klausul.id, filter.active_only).await? {
        let mut elemen_nodes = Vec::new();

        for elemen in db::elemen::list_by_pilar(pool, pilar.id, filter.active_only).await? {
            let mut sub_elemen_nodes = Vec::new();

            for sub_elemen in
                db::sub_elemen::list_by_elemen(pool, elemen.id, filter.active_only).await?
            {
                let mut pengukuran_nodes = Vec::new();

                for pengukuran in
                    db::pengukuran::list_by_sub_elemen(pool, sub_elemen.id, filter.active_only)
                        .await?
                {
                    let executions = db::pelaksanaan::list_for_pengukuran(
                        pool,
                        pengukuran.id,
                        filter.semester,
                        filter.tahun,
                        Some(EXECUTIONS_PER_PENGUKURAN),
                    )
                    .await?;

                    let mut pelaksanaan_nodes = Vec::with_capacity(executions.len());
                    for pelaksanaan in executions {
                        let history_log = if filter.history_limit > 0 {
                            db::history::list_for_pelaksanaan(
                                pool,
                                pelaksanaan.id,
                                Some(filter.history_limit),
                            )
                            .await?
                        } else {
                            Vec::new()
                        };
                        pelaksanaan_nodes.push(PelaksanaanNode {
                            pelaksanaan,
                            history_log,
                        });
                    }

                    pengukuran_nodes.push(PengukuranNode {
                        pengukuran,
                        pelaksanaan_semester: pelaksanaan_nodes,
                    });
                }

                sub_elemen_nodes.push(SubElemenNode {
                    sub_elemen,
                    pengukuran: pengukuran_nodes,
                });
            }

            elemen_nodes.push(ElemenNode {
                elemen,
                sub_elemen: sub_elemen_nodes,
            });
        }

        pilar_nodes.push(PilarNode {
            pilar,
            elemen: elemen_nodes,
        });
    }

    Ok(KlausulTree {
        klausul,
        pilar: pilar_nodes,
    })
}

/// Statistics computed over one materialized clause subtree
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlausulStatistics {
    pub total_pilar: usize,
    pub total_elemen: usize,
    pub total_sub_elemen: usize,
    pub total_pengukuran: usize,
    pub total_pelaksanaan: usize,
    pub status_distribution: StatusDistribution,
    pub average_progress: i64,
    /// Percentage of executions that reached COMPLETED
    pub completion_rate: i64,
}

pub fn compute_statistics(tree: &KlausulTree) -> KlausulStatistics {
    let mut total_elemen = 0;
    let mut total_sub_elemen = 0;
    let mut total_pengukuran = 0;
    let mut total_pelaksanaan = 0;
    let mut distribution = StatusDistribution::default();
    let mut progress_sum: i64 = 0;

    for pilar in &tree.pilar {
        total_elemen += pilar.elemen.len();
        for elemen in &pilar.elemen {
            total_sub_elemen += elemen.sub_elemen.len();
            for sub_elemen in &elemen.sub_elemen {
                total_pengukuran += sub_elemen.pengukuran.len();
                for pengukuran in &sub_elemen.pengukuran {
                    total_pelaksanaan += pengukuran.pelaksanaan_semester.len();
                    for node in &pengukuran.pelaksanaan_semester {
                        distribution.record(node.pelaksanaan.status, 1);
                        progress_sum += node.pelaksanaan.progress;
                    }
                }
            }
        }
    }

    let average_progress = if total_pelaksanaan > 0 {
        (progress_sum as f64 / total_pelaksanaan as f64).round() as i64
    } else {
        0
    };
    let completion_rate = if total_pelaksanaan > 0 {
        (distribution.completed as f64 / total_pelaksanaan as f64 * 100.0).round() as i64
    } else {
        0
    };

    KlausulStatistics {
        total_pilar: tree.pilar.len(),
        total_elemen,
        total_sub_elemen,
        total_pengukuran,
        total_pelaksanaan,
        status_distribution: distribution,
        average_progress,
        completion_rate,
    }
}
