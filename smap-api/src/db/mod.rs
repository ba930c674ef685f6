//! Database access for smap-api
//!
//! One module per entity, each exposing natural-key upserts for the
//! importer plus the query functions the HTTP handlers need. All ids are
//! UUIDs stored as TEXT; timestamps are TEXT set by SQLite.

pub mod elemen;
pub mod history;
pub mod klausul;
pub mod pelaksanaan;
pub mod pengukuran;
pub mod pilar;
pub mod stats;
pub mod sub_elemen;
pub mod tree;

use uuid::Uuid;

/// Result of an idempotent natural-key upsert
///
/// `created` is reported by the upsert itself rather than inferred from
/// timestamp equality, so import counters stay correct under clock skew.
#[derive(Debug, Clone, Copy)]
pub struct Upserted {
    pub id: Uuid,
    pub created: bool,
}
