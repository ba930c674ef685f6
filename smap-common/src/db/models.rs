//! Entity models and closed enums
//!
//! The wire format (JSON) uses camelCase field names and upper-snake enum
//! tags, matching the import row contract consumed by the dashboard.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Semester half of an execution year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    S1,
    S2,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::S1 => "S1",
            Semester::S2 => "S2",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S1" => Ok(Semester::S1),
            "S2" => Ok(Semester::S2),
            other => Err(Error::InvalidInput(format!(
                "invalid semester '{}', expected S1 or S2",
                other
            ))),
        }
    }
}

/// Execution status of a measurement within a semester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Planned,
    InProgress,
    Review,
    Completed,
    Overdue,
    Cancelled,
    OnHold,
}

impl ExecutionStatus {
    /// All statuses, in display order
    pub const ALL: [ExecutionStatus; 7] = [
        ExecutionStatus::Planned,
        ExecutionStatus::InProgress,
        ExecutionStatus::Review,
        ExecutionStatus::Completed,
        ExecutionStatus::Overdue,
        ExecutionStatus::Cancelled,
        ExecutionStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Planned => "PLANNED",
            ExecutionStatus::InProgress => "IN_PROGRESS",
            ExecutionStatus::Review => "REVIEW",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Overdue => "OVERDUE",
            ExecutionStatus::Cancelled => "CANCELLED",
            ExecutionStatus::OnHold => "ON_HOLD",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExecutionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "invalid status '{}', expected one of PLANNED, IN_PROGRESS, REVIEW, \
                     COMPLETED, OVERDUE, CANCELLED, ON_HOLD",
                    s
                ))
            })
    }
}

/// Kind of change recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Create,
    Update,
    UpdateStatus,
    UpdateProgress,
    ImportCreate,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Create => "CREATE",
            HistoryAction::Update => "UPDATE",
            HistoryAction::UpdateStatus => "UPDATE_STATUS",
            HistoryAction::UpdateProgress => "UPDATE_PROGRESS",
            HistoryAction::ImportCreate => "IMPORT_CREATE",
        }
    }
}

impl FromStr for HistoryAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(HistoryAction::Create),
            "UPDATE" => Ok(HistoryAction::Update),
            "UPDATE_STATUS" => Ok(HistoryAction::UpdateStatus),
            "UPDATE_PROGRESS" => Ok(HistoryAction::UpdateProgress),
            "IMPORT_CREATE" => Ok(HistoryAction::ImportCreate),
            other => Err(Error::InvalidInput(format!(
                "invalid history action '{}'",
                other
            ))),
        }
    }
}

/// Top-level regulatory clause
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Klausul {
    pub id: Uuid,
    pub kode: String,
    pub nama: String,
    pub deskripsi: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Pillar grouping under a clause; unique on (klausul_id, nama)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilar {
    pub id: Uuid,
    pub klausul_id: Uuid,
    pub nama: String,
    pub deskripsi: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Element under a pillar; unique on (pilar_id, nama)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elemen {
    pub id: Uuid,
    pub pilar_id: Uuid,
    pub nama: String,
    pub deskripsi: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Sub-element under an element; unique on (elemen_id, nama)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubElemen {
    pub id: Uuid,
    pub elemen_id: Uuid,
    pub nama: String,
    pub deskripsi: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Measurement definition; unique on (sub_elemen_id, nama_pengukuran, indikator)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pengukuran {
    pub id: Uuid,
    pub sub_elemen_id: Uuid,
    pub nama_pengukuran: String,
    pub jadwal_pengerjaan: Option<String>,
    pub kualitas_pemenuhan: Option<String>,
    pub indikator: String,
    pub evidence: Option<String>,
    pub link_evidence: Option<String>,
    pub pic: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// One semester-scoped execution of a measurement;
/// unique on (pengukuran_id, semester, tahun)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pelaksanaan {
    pub id: Uuid,
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
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Immutable audit trail entry for an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLog {
    pub id: Uuid,
    pub pelaksanaan_semester_id: Uuid,
    pub action: HistoryAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub created_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in ExecutionStatus::ALL {
            assert_eq!(status.as_str().parse::<ExecutionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_serde_uses_upper_snake_tags() {
        let json = serde_json::to_string(&ExecutionStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let back: ExecutionStatus = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(back, ExecutionStatus::OnHold);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("DONE".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn semester_parse() {
        assert_eq!("S1".parse::<Semester>().unwrap(), Semester::S1);
        assert!("S3".parse::<Semester>().is_err());
    }
}
