//! HTTP API handlers for smap-api

pub mod elemen;
pub mod health;
pub mod import;
pub mod klausul;
pub mod pelaksanaan;
pub mod pengukuran;
pub mod pilar;
pub mod sub_elemen;

use crate::pagination::PageInfo;
use serde::Serialize;

/// Response envelope used by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            pagination: None,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: PageInfo) -> Self {
        Self {
            success: true,
            message: None,
            data,
            pagination: Some(pagination),
        }
    }
}
