//! Import orchestrator
//!
//! Drives the hierarchy upserts row by row: resolves clause codes, creates
//! or refreshes each of the five levels top-down, fans declared semester
//! target dates out into execution records, and records an audit trail
//! entry for every execution it creates. Rows are processed strictly in
//! input order; later rows may hit entities cached by earlier ones.

use std::collections::HashMap;

use smap_common::db::models::{ExecutionStatus, HistoryAction, Semester};
use smap_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;
use crate::db::pengukuran::PengukuranAttrs;
use crate::import::{resolver, ImportOptions, ImportOutcome, ImportRow, ImportRowError};

/// Per-run memoization of resolved entity ids, keyed by composite natural
/// key. Scoped to one importer instance and discarded with it; this is the
/// correctness mechanism that lets later rows reuse entities created by
/// earlier rows without a second lookup.
#[derive(Debug, Default)]
struct ImportCache {
    klausul: HashMap<String, Uuid>,
    pilar: HashMap<String, Uuid>,
    elemen: HashMap<String, Uuid>,
    sub_elemen: HashMap<String, Uuid>,
    pengukuran: HashMap<String, Uuid>,
    pelaksanaan: HashMap<String, Uuid>,
}

/// Why a row produced no writes; not an error
enum Skip {
    MissingRequiredFields,
    NoClauseCodes,
}

impl Skip {
    fn reason(&self) -> &'static str {
        match self {
            Skip::MissingRequiredFields => "missing required fields",
            Skip::NoClauseCodes => "no clause codes found",
        }
    }
}

enum RowDisposition {
    Imported,
    Skipped(Skip),
}

/// Hierarchical data importer with a per-run entity cache
pub struct DataImporter<'a> {
    pool: &'a SqlitePool,
    cache: ImportCache,
}

impl<'a> DataImporter<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            cache: ImportCache::default(),
        }
    }

    /// Import rows strictly in input order.
    ///
    /// Rows with missing required fields or no parseable clause code are
    /// skipped silently; a failure while processing one row is recorded in
    /// the outcome's error list and the batch continues. Each upsert is its
    /// own transaction, so a mid-row failure leaves the levels already
    /// written in place.
    pub async fn import(
        &mut self,
        rows: &[ImportRow],
        options: &ImportOptions,
    ) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome::default();

        for (index, row) in rows.iter().enumerate() {
            let item_index = index + 1;

            if options.log_progress {
                info!(
                    item = item_index,
                    total = rows.len(),
                    pengukuran = %row.pengukuran,
                    "processing import row"
                );
            }

            match self.process_row(row, options, &mut outcome).await {
                Ok(RowDisposition::Imported) => {}
                Ok(RowDisposition::Skipped(skip)) => {
                    debug!(item = item_index, reason = skip.reason(), "skipping import row");
                }
                Err(err) => {
                    warn!(item = item_index, error = %err, "import row failed");
                    outcome.errors.push(ImportRowError {
                        item_index,
                        item_id: row.id.clone(),
                        error: err.to_string(),
                        item: row.clone(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Resolve and persist one row top-down: Klausul(s) → Pilar → Elemen →
    /// SubElemen → Pengukuran → PelaksanaanSemester per declared semester.
    async fn process_row(
        &mut self,
        row: &ImportRow,
        options: &ImportOptions,
        outcome: &mut ImportOutcome,
    ) -> Result<RowDisposition> {
        if row.klausul_smap.trim().is_empty()
            || row.pilar.trim().is_empty()
            || row.elemen.trim().is_empty()
            || row.sub_elemen.trim().is_empty()
            || row.pengukuran.trim().is_empty()
        {
            return Ok(RowDisposition::Skipped(Skip::MissingRequiredFields));
        }

        // 1. Clauses. Every referenced clause is upserted, but only the
        // first parsed code anchors the rest of the hierarchy.
        let codes = resolver::parse_codes(&row.klausul_smap);
        if codes.is_empty() {
            return Ok(RowDisposition::Skipped(Skip::NoClauseCodes));
        }

        let mut anchor: Option<Uuid> = None;
        for kode in &codes {
            let id = match self.cache.klausul.get(kode) {
                Some(id) => *id,
                None => {
                    let nama = resolver::extract_name(&row.klausul_smap, kode);
                    let upserted = db::klausul::upsert(
                        self.pool,
                        kode,
                        &nama,
                        &row.klausul_smap,
                        &options.created_by,
                    )
                    .await?;
                    tally(&mut outcome.created.klausul, &mut outcome.updated.klausul, upserted.created);
                    self.cache.klausul.insert(kode.clone(), upserted.id);
                    upserted.id
                }
            };
            anchor.get_or_insert(id);
        }
        let Some(klausul_id) = anchor else {
            return Ok(RowDisposition::Skipped(Skip::NoClauseCodes));
        };

        // 2. Pilar
        let pilar_nama = row.pilar.trim();
        let pilar_key = resolver::cache_key(klausul_id, pilar_nama);
        let pilar_id = match self.cache.pilar.get(&pilar_key) {
            Some(id) => *id,
            None => {
                let upserted = db::pilar::upsert(
                    self.pool,
                    klausul_id,
                    pilar_nama,
                    &format!("Pilar {}", pilar_nama),
                    &options.created_by,
                )
                .await?;
                tally(&mut outcome.created.pilar, &mut outcome.updated.pilar, upserted.created);
                self.cache.pilar.insert(pilar_key, upserted.id);
                upserted.id
            }
        };

        // 3. Elemen
        let elemen_nama = row.elemen.trim();
        let elemen_key = resolver::cache_key(pilar_id, elemen_nama);
        let elemen_id = match self.cache.elemen.get(&elemen_key) {
            Some(id) => *id,
            None => {
                let upserted = db::elemen::upsert(
                    self.pool,
                    pilar_id,
                    elemen_nama,
                    &format!("Elemen {}", elemen_nama),
                    &options.created_by,
                )
                .await?;
                tally(&mut outcome.created.elemen, &mut outcome.updated.elemen, upserted.created);
                self.cache.elemen.insert(elemen_key, upserted.id);
                upserted.id
            }
        };

        // 4. SubElemen
        let sub_elemen_nama = row.sub_elemen.trim();
        let sub_elemen_key = resolver::cache_key(elemen_id, sub_elemen_nama);
        let sub_elemen_id = match self.cache.sub_elemen.get(&sub_elemen_key) {
            Some(id) => *id,
            None => {
                let upserted = db::sub_elemen::upsert(
                    self.pool,
                    elemen_id,
                    sub_elemen_nama,
                    &format!("Sub Elemen {}", sub_elemen_nama),
                    &options.created_by,
                )
                .await?;
                tally(
                    &mut outcome.created.sub_elemen,
                    &mut outcome.updated.sub_elemen,
                    upserted.created,
                );
                self.cache.sub_elemen.insert(sub_elemen_key, upserted.id);
                upserted.id
            }
        };

        // 5. Pengukuran; the indikator participates in the natural key
        let pengukuran_nama = row.pengukuran.trim();
        let indikator = row.indikator.trim();
        let pengukuran_key = resolver::cache_key(
            sub_elemen_id,
            &format!("{}_{}", pengukuran_nama, indikator),
        );
        let pengukuran_id = match self.cache.pengukuran.get(&pengukuran_key) {
            Some(id) => *id,
            None => {
                let attrs = PengukuranAttrs {
                    jadwal_pengerjaan: non_empty(&row.jadwal_pengerjaan),
                    kualitas_pemenuhan: non_empty(&row.kualitas_pemenuhan),
                    evidence: non_empty(&row.evidence),
                    link_evidence: row.link_evidence.as_deref().and_then(non_empty),
                    pic: non_empty(&row.pic),
                };
                let upserted = db::pengukuran::upsert(
                    self.pool,
                    sub_elemen_id,
                    pengukuran_nama,
                    indikator,
                    &attrs,
                    &options.created_by,
                )
                .await?;
                tally(
                    &mut outcome.created.pengukuran,
                    &mut outcome.updated.pengukuran,
                    upserted.created,
                );
                self.cache.pengukuran.insert(pengukuran_key, upserted.id);
                upserted.id
            }
        };

        // 6. Semester executions. Each declared target date produces one
        // execution keyed by (pengukuran, semester, import year).
        let status = match row.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<ExecutionStatus>()?,
            None => ExecutionStatus::Planned,
        };

        let pic = non_empty(&row.pic);
        let mut declared: Vec<(Semester, &str)> = Vec::new();
        if let Some(date) = row.semester1.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            declared.push((Semester::S1, date));
        }
        if let Some(date) = row.semester2.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            declared.push((Semester::S2, date));
        }

        for (semester, raw_date) in declared {
            let pelaksanaan_key =
                format!("{}_{}_{}", pengukuran_id, semester, options.default_year);
            if self.cache.pelaksanaan.contains_key(&pelaksanaan_key) {
                continue;
            }

            let tanggal_target = super::parse_import_date(raw_date)?;
            let upserted = db::pelaksanaan::upsert_for_import(
                self.pool,
                pengukuran_id,
                semester,
                options.default_year,
                &tanggal_target,
                status,
                pic.as_deref(),
                &options.created_by,
            )
            .await?;
            tally(
                &mut outcome.created.pelaksanaan,
                &mut outcome.updated.pelaksanaan,
                upserted.created,
            );
            self.cache.pelaksanaan.insert(pelaksanaan_key, upserted.id);

            // Audit trail entry only for executions this run created
            if upserted.created {
                let record = db::pelaksanaan::get(self.pool, upserted.id)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal("pelaksanaan vanished after upsert".to_string())
                    })?;
                db::history::append(
                    self.pool,
                    upserted.id,
                    HistoryAction::ImportCreate,
                    None,
                    Some(serde_json::to_string(&record)?),
                    &format!(
                        "Imported from JSON data - Item ID: {}",
                        row.id.as_deref().unwrap_or("-")
                    ),
                    Some(&options.created_by),
                )
                .await?;
            }
        }

        Ok(RowDisposition::Imported)
    }
}

fn tally(created: &mut u32, updated: &mut u32, was_created: bool) {
    if was_created {
        *created += 1;
    } else {
        *updated += 1;
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
