//! Data import endpoints
//!
//! JSON payload import delegating to the orchestrator, a dry-run
//! validation endpoint, and the row template.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::ApiResponse;
use crate::error::ApiResult;
use crate::import::{
    validate_rows, DataImporter, ImportOptions, ImportOutcome, ImportRow, ValidationReport,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/template", get(import_template))
        .route("/validate", post(validate_import))
        .route("/json", post(import_json))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportRequestOptions {
    pub default_year: Option<i32>,
    pub log_progress: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJsonRequest {
    pub data: Vec<ImportRow>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub options: ImportRequestOptions,
}

/// Totals across all hierarchy levels
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_processed: usize,
    pub total_created: u32,
    pub total_updated: u32,
    pub total_errors: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub summary: ImportSummary,
    pub details: ImportOutcome,
}

/// POST /api/import/json
///
/// Import an array of rows. Always answers with a result summary; failed
/// rows are listed under details.errors while the rest of the batch goes
/// through.
pub async fn import_json(
    State(state): State<AppState>,
    Json(request): Json<ImportJsonRequest>,
) -> ApiResult<Json<ApiResponse<ImportResponse>>> {
    let options = ImportOptions {
        created_by: request.created_by.unwrap_or_else(|| "api-user".to_string()),
        default_year: request
            .options
            .default_year
            .unwrap_or_else(|| ImportOptions::default().default_year),
        log_progress: request.options.log_progress.unwrap_or(true),
    };

    info!(
        rows = request.data.len(),
        year = options.default_year,
        actor = %options.created_by,
        "starting JSON import"
    );

    let mut importer = DataImporter::new(&state.db);
    let outcome = importer.import(&request.data, &options).await?;

    let summary = ImportSummary {
        total_processed: request.data.len(),
        total_created: outcome.created.total(),
        total_updated: outcome.updated.total(),
        total_errors: outcome.errors.len(),
    };
    info!(
        created = summary.total_created,
        updated = summary.total_updated,
        errors = summary.total_errors,
        "JSON import finished"
    );

    Ok(Json(ApiResponse::with_message(
        "Data import completed",
        ImportResponse {
            summary,
            details: outcome,
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub data: Vec<ImportRow>,
}

#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    #[serde(rename = "withWarnings")]
    pub with_warnings: usize,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub summary: ValidationSummary,
    pub details: ValidationReport,
}

/// POST /api/import/validate
///
/// Structurally check rows without touching storage.
pub async fn validate_import(
    Json(request): Json<ValidateRequest>,
) -> ApiResult<Json<ApiResponse<ValidationResponse>>> {
    let report = validate_rows(&request.data);
    let summary = ValidationSummary {
        total: request.data.len(),
        valid: report.valid.len(),
        invalid: report.invalid.len(),
        with_warnings: report.warnings.len(),
    };

    Ok(Json(ApiResponse::with_message(
        "Validation completed",
        ValidationResponse {
            summary,
            details: report,
        },
    )))
}

/// GET /api/import/template
///
/// Example row plus field instructions for spreadsheet exports.
pub async fn import_template() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Import template",
        "data": [{
            "id": "1",
            "klausulSmap": "8.1 - Perencanaan dan pengendalian operasi\n9.1 - Pemantauan, pengukuran, analisis dan evaluasi",
            "pilar": "Pendeteksian",
            "elemen": "Monitoring",
            "subElemen": "Fraud dan Compliance Risk Assessment",
            "pengukuran": "Pemenuhan Pemantauan Compliance Risk Assessment",
            "jadwalPengerjaan": "Dilakukan setiap Triwulan",
            "semester1": "10/04/2024",
            "semester2": "",
            "kualitasPemenuhan": "Kualitas",
            "indikator": "Pemantauan monitoring dan evaluasi CRA",
            "evidence": "Monev efektivitas CRA",
            "linkEvidence": "https://example.com/evidence",
            "pic": "Tim SDM",
            "status": "PLANNED"
        }],
        "instructions": {
            "requiredFields": [
                "klausulSmap - Contains klausul codes and names (e.g., '8.1 - Name\\n9.1 - Name')",
                "pilar - Pilar name",
                "elemen - Elemen name",
                "subElemen - Sub elemen name",
                "pengukuran - Pengukuran name",
                "jadwalPengerjaan - Schedule description",
                "kualitasPemenuhan - Quality fulfillment",
                "indikator - Indicator description",
                "evidence - Evidence description",
                "pic - Person in charge"
            ],
            "optionalFields": [
                "id - External ID for reference",
                "semester1 - Target date for semester 1 (DD/MM/YYYY)",
                "semester2 - Target date for semester 2 (DD/MM/YYYY)",
                "linkEvidence - URL to evidence",
                "status - Status (PLANNED, IN_PROGRESS, REVIEW, COMPLETED, OVERDUE, CANCELLED, ON_HOLD)"
            ],
            "importOptions": [
                "createdBy - User who performs the import",
                "options.defaultYear - Year for pelaksanaan semester (default: current year)",
                "options.logProgress - Emit progress logs (default: true)"
            ]
        }
    }))
}
