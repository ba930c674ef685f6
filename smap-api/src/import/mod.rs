//! Bulk JSON import
//!
//! Row contract, orchestration types and dry-run validation for the
//! hierarchical data importer.

pub mod importer;
pub mod resolver;

pub use importer::DataImporter;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smap_common::db::models::ExecutionStatus;
use smap_common::{Error, Result};

/// One flat import row as uploaded by the dashboard.
///
/// Unknown fields are ignored; missing fields default to empty so partially
/// filled spreadsheets deserialize instead of failing the whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportRow {
    /// External reference, echoed back in error reports
    pub id: Option<String>,
    /// Multi-line clause text, e.g. "8.1 - Perencanaan\n9.1 - Pemantauan"
    pub klausul_smap: String,
    pub pilar: String,
    pub elemen: String,
    pub sub_elemen: String,
    pub pengukuran: String,
    pub jadwal_pengerjaan: String,
    pub kualitas_pemenuhan: String,
    pub indikator: String,
    pub evidence: String,
    pub pic: String,
    pub link_evidence: Option<String>,
    /// Target date for semester 1, DD/MM/YYYY; empty = not applicable
    pub semester1: Option<String>,
    /// Target date for semester 2, DD/MM/YYYY; empty = not applicable
    pub semester2: Option<String>,
    pub status: Option<String>,
}

/// Options for one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Actor recorded as created_by/updated_by on touched rows
    pub created_by: String,
    /// Year the semester executions are filed under
    pub default_year: i32,
    /// Emit a progress log line per row
    pub log_progress: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            created_by: "system".to_string(),
            default_year: Utc::now().year(),
            log_progress: true,
        }
    }
}

/// Per-level counters for one import run
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCounts {
    pub klausul: u32,
    pub pilar: u32,
    pub elemen: u32,
    pub sub_elemen: u32,
    pub pengukuran: u32,
    pub pelaksanaan: u32,
}

impl LevelCounts {
    pub fn total(&self) -> u32 {
        self.klausul + self.pilar + self.elemen + self.sub_elemen + self.pengukuran
            + self.pelaksanaan
    }
}

/// A row that failed mid-processing; the batch continues without it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    /// 1-based position in the uploaded payload
    pub item_index: usize,
    /// External reference from the row, if declared
    pub item_id: Option<String>,
    pub error: String,
    /// The offending row, echoed back for correction
    pub item: ImportRow,
}

/// Aggregated result of one import run
#[derive(Debug, Default, Serialize)]
pub struct ImportOutcome {
    pub created: LevelCounts,
    pub updated: LevelCounts,
    pub errors: Vec<ImportRowError>,
}

/// Parse an import date (`DD/MM/YYYY`) into ISO `YYYY-MM-DD` storage form
pub(crate) fn parse_import_date(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| {
            Error::InvalidInput(format!(
                "invalid date '{}', expected DD/MM/YYYY",
                trimmed
            ))
        })
}

/// Validation outcome for one row of a dry-run check
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValidation {
    pub index: usize,
    pub id: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Dry-run validation report; touches no storage
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub valid: Vec<RowValidation>,
    pub invalid: Vec<RowValidation>,
    pub warnings: Vec<RowValidation>,
}

/// Structurally validate rows without importing them.
///
/// Mirrors the importer's required-field rules; date shape, status and URL
/// checks only warn because the importer tolerates or rejects those
/// per-row at import time.
pub fn validate_rows(rows: &[ImportRow]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (index, row) in rows.iter().enumerate() {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let required = [
            ("klausulSmap", &row.klausul_smap),
            ("pilar", &row.pilar),
            ("elemen", &row.elemen),
            ("subElemen", &row.sub_elemen),
            ("pengukuran", &row.pengukuran),
            ("jadwalPengerjaan", &row.jadwal_pengerjaan),
            ("kualitasPemenuhan", &row.kualitas_pemenuhan),
            ("indikator", &row.indikator),
            ("evidence", &row.evidence),
            ("pic", &row.pic),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                errors.push(format!("Missing required field: {}", name));
            }
        }

        if !row.klausul_smap.trim().is_empty()
            && resolver::parse_codes(&row.klausul_smap).is_empty()
        {
            errors.push("klausulSmap should contain klausul codes (e.g., \"8.1\")".to_string());
        }

        for (name, value) in [("semester1", &row.semester1), ("semester2", &row.semester2)] {
            if let Some(raw) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                if parse_import_date(raw).is_err() {
                    warnings.push(format!("{} should be in DD/MM/YYYY format", name));
                }
            }
        }

        if let Some(status) = row.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if status.parse::<ExecutionStatus>().is_err() {
                warnings.push(format!(
                    "Invalid status: {}. Valid values: {}",
                    status,
                    ExecutionStatus::ALL
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        if let Some(link) = row.link_evidence.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !link.starts_with("http://") && !link.starts_with("https://") {
                warnings.push("linkEvidence should be a valid URL".to_string());
            }
        }

        let validation = RowValidation {
            index: index + 1,
            id: row.id.clone(),
            errors,
            warnings,
        };

        if !validation.warnings.is_empty() {
            report.warnings.push(RowValidation {
                index: validation.index,
                id: validation.id.clone(),
                errors: validation.errors.clone(),
                warnings: validation.warnings.clone(),
            });
        }
        if validation.errors.is_empty() {
            report.valid.push(validation);
        } else {
            report.invalid.push(validation);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_date_converts_to_iso() {
        assert_eq!(parse_import_date("10/04/2024").unwrap(), "2024-04-10");
        assert_eq!(parse_import_date(" 01/12/2025 ").unwrap(), "2025-12-01");
    }

    #[test]
    fn import_date_rejects_bad_shapes() {
        assert!(parse_import_date("2024-04-10").is_err());
        assert!(parse_import_date("31/02/2024").is_err());
        assert!(parse_import_date("soon").is_err());
    }

    #[test]
    fn validation_partitions_rows() {
        let good = ImportRow {
            klausul_smap: "8.1 - Perencanaan".to_string(),
            pilar: "Pendeteksian".to_string(),
            elemen: "Monitoring".to_string(),
            sub_elemen: "CRA".to_string(),
            pengukuran: "Pemantauan CRA".to_string(),
            jadwal_pengerjaan: "Triwulan".to_string(),
            kualitas_pemenuhan: "Kualitas".to_string(),
            indikator: "Monev".to_string(),
            evidence: "Laporan".to_string(),
            pic: "Tim SDM".to_string(),
            ..Default::default()
        };
        let missing_field = ImportRow {
            sub_elemen: String::new(),
            ..good.clone()
        };
        let bad_status = ImportRow {
            status: Some("DONE".to_string()),
            ..good.clone()
        };

        let report = validate_rows(&[good, missing_field, bad_status]);
        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].index, 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].index, 3);
    }
}
