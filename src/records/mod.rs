//! FRAP analysis records persisted by this crate.
//!
//! A [`Molecule`] groups the [`Embryo`] datasets of one labelled molecule;
//! embryos reference a shared [`Geometry`] through `Rc`. Records carry a
//! `schema_version` and migrate in place via `update_version()`; decoders
//! are tolerant of missing fields so archives written under an older
//! schema load first and migrate second.

pub mod embryo;
pub mod geometry;
pub mod molecule;

pub use embryo::Embryo;
pub use geometry::Geometry;
pub use molecule::Molecule;

use uuid::Uuid;

use crate::archive::value::{Fields, Value};
use crate::error::StoreError;

/// Schema version stamped on newly created and migrated records.
///
/// Version 1 archives predate `created_at` (and `description` on
/// molecules); version 2 carries both.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// UTC timestamp in the RFC-3339 form stored on records.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

// ── Tolerant field accessors shared by the record decoders ─────────────────

pub(crate) fn str_field(fields: &Fields, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn u32_field(fields: &Fields, key: &str, default: u32) -> u32 {
    fields
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

pub(crate) fn float_list_field(fields: &Fields, key: &str) -> Vec<f64> {
    fields
        .get(key)
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

/// Record id accessor. Version-1 archives carry no id, so a missing field
/// mints a fresh one; a present-but-malformed id is a decode error.
pub(crate) fn uuid_field(fields: &Fields, key: &str) -> Result<Uuid, StoreError> {
    match fields.get(key).and_then(Value::as_str) {
        Some(s) => Uuid::parse_str(s)
            .map_err(|e| StoreError::Decode(format!("malformed record id `{s}`: {e}"))),
        None => Ok(Uuid::new_v4()),
    }
}
