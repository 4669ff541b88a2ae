//! The `.pk` archive container: a ZIP holding `manifest.json` + `record.bin`.
//!
//! # Save
//! 1. Encode the record into a [`ValueGraph`](super::value::ValueGraph) and
//!    serialize it with the binary codec.
//! 2. Write a complete ZIP archive to `<target>.tmp` (same directory → same
//!    filesystem as the final path).
//! 3. Atomically rename the temp file over the target.
//! On any failure the temp file is deleted and the original is left intact.
//!
//! # Load
//! 1. Open the ZIP and read `manifest.json`.
//! 2. Validate `format_version == 1` and the payload's SHA-256 digest;
//!    reject anything else with a clear error.
//! 3. Decode `record.bin` through the caller's [`TypeRegistry`].
//! Reads are always binary; there is no platform-conditional file mode.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use super::codec;
use super::object::{Decoder, Encoder, Persistable};
use super::registry::TypeRegistry;
use crate::error::StoreError;

/// Name of the manifest inside every `.pk` ZIP.
const MANIFEST_JSON: &str = "manifest.json";

/// Name of the binary value-graph payload inside every `.pk` ZIP.
const RECORD_BIN: &str = "record.bin";

/// Container format version; only version `1` exists so far.
pub const FORMAT_VERSION: u32 = 1;

/// frapstore version embedded in every saved archive.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level structure of `manifest.json` inside a `.pk` archive.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    /// Container layout version; only version `1` is supported.
    format_version: u32,
    /// frapstore version string that last saved this file (`CARGO_PKG_VERSION`).
    app_version: String,
    /// ISO-8601 save timestamp (UTC).
    saved_at: String,
    /// Type name of the root record (e.g. `"molecule"`).
    type_name: String,
    /// Display name of the root record, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record_name: Option<String>,
    /// SHA-256 hex digest of `record.bin`.
    payload_sha256: String,
}

/// Save `record` to a `.pk` archive at `path` using an atomic write.
///
/// The ZIP is written to `<path>.tmp` in the same directory (guaranteeing
/// same-filesystem placement), then renamed over `path`. On any error the
/// temp file is removed and `path` is left unchanged.
pub fn save(record: &dyn Persistable, path: &Path) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    if let Err(e) = write_archive(record, &tmp_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        StoreError::Save(format!("rename to final path failed: {e}"))
    })
}

/// Load a `.pk` archive from `path`, resolving record types through
/// `registry`.
///
/// Returns [`StoreError::Load`] if the file cannot be read, is not a valid
/// ZIP, has an unsupported `format_version`, or fails the payload digest
/// check; decoding failures surface as [`StoreError::Decode`] or
/// [`StoreError::UnknownType`].
pub fn load(path: &Path, registry: &TypeRegistry) -> Result<Box<dyn Persistable>, StoreError> {
    let file = std::fs::File::open(path)
        .map_err(|e| StoreError::Load(format!("cannot open file: {e}")))?;

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| StoreError::Load(format!("not a valid archive: {e}")))?;

    // Read each entry inside a block so the borrow on `archive` is released
    // before the next lookup.
    let manifest: Manifest = {
        let mut entry = archive.by_name(MANIFEST_JSON).map_err(|e| {
            StoreError::Load(format!("{MANIFEST_JSON} not found in archive: {e}"))
        })?;
        let mut s = String::new();
        entry
            .read_to_string(&mut s)
            .map_err(|e| StoreError::Load(format!("cannot read {MANIFEST_JSON}: {e}")))?;
        serde_json::from_str(&s)
            .map_err(|e| StoreError::Load(format!("cannot parse {MANIFEST_JSON}: {e}")))?
    };

    if manifest.format_version != FORMAT_VERSION {
        return Err(StoreError::Load(format!(
            "unsupported format version {}; only format version {FORMAT_VERSION} is supported",
            manifest.format_version
        )));
    }

    let payload = {
        let mut entry = archive
            .by_name(RECORD_BIN)
            .map_err(|e| StoreError::Load(format!("{RECORD_BIN} not found in archive: {e}")))?;
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| StoreError::Load(format!("cannot read {RECORD_BIN}: {e}")))?;
        buf
    };

    let digest = format!("{:x}", sha2::Sha256::digest(&payload));
    if digest != manifest.payload_sha256 {
        return Err(StoreError::Load(format!(
            "payload digest mismatch: manifest says {}, payload hashes to {digest}",
            manifest.payload_sha256
        )));
    }

    let graph = codec::read_graph(&mut payload.as_slice())?;
    Decoder::decode_graph(&graph, registry)
}

/// Write the ZIP archive to `path` (the temp file location).
///
/// Separated from [`save`] so that cleanup on error is handled entirely by
/// the caller.
fn write_archive(record: &dyn Persistable, path: &Path) -> Result<(), StoreError> {
    let graph = Encoder::encode_graph(record)?;
    let mut payload = Vec::new();
    codec::write_graph(&mut payload, &graph)?;

    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        app_version: APP_VERSION.to_string(),
        saved_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        type_name: record.type_name().to_string(),
        record_name: record.record_name().map(str::to_owned),
        payload_sha256: format!("{:x}", sha2::Sha256::digest(&payload)),
    };

    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| StoreError::Save(format!("cannot serialize manifest: {e}")))?;

    let file = std::fs::File::create(path)
        .map_err(|e| StoreError::Save(format!("cannot create temp file: {e}")))?;
    let mut zip = zip::ZipWriter::new(file);
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_JSON, opts)
        .map_err(|e| StoreError::Save(format!("cannot create {MANIFEST_JSON} entry: {e}")))?;
    zip.write_all(json.as_bytes())
        .map_err(|e| StoreError::Save(format!("cannot write {MANIFEST_JSON}: {e}")))?;

    zip.start_file(RECORD_BIN, opts)
        .map_err(|e| StoreError::Save(format!("cannot create {RECORD_BIN} entry: {e}")))?;
    zip.write_all(&payload)
        .map_err(|e| StoreError::Save(format!("cannot write {RECORD_BIN}: {e}")))?;

    zip.finish()
        .map_err(|e| StoreError::Save(format!("cannot finalize archive: {e}")))?;

    Ok(())
}
