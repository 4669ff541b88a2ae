//! Top-level persistence operations over `.pk` archives.
//!
//! Thin orchestration over [`crate::archive`]: default-filename
//! derivation, the best-effort memory hook, and the typed molecule/embryo
//! wrappers that run schema migration after load.
//!
//! Everything here is synchronous and blocking. The crate assumes
//! single-writer usage: concurrent saves against the same path from
//! multiple processes can race, and nothing here locks.

use std::path::{Path, PathBuf};

use crate::archive::{container, Persistable, TypeRegistry};
use crate::error::StoreError;
use crate::records::{Embryo, Molecule};

/// File extension used for archives, including default-named ones.
pub const ARCHIVE_EXT: &str = "pk";

/// Save `record` to a `.pk` archive and return the path actually written.
///
/// With `path == None` the destination is derived from the record's
/// display name — `<name>.pk` in the current directory — falling back to
/// `unnamed.pk` for nameless records.
pub fn save(record: &dyn Persistable, path: Option<&Path>) -> Result<PathBuf, StoreError> {
    compact_memory();
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_archive_name(record)),
    };
    container::save(record, &path)?;
    tracing::debug!(
        path = %path.display(),
        type_name = record.type_name(),
        "archive saved"
    );
    Ok(path)
}

/// Load a record from a `.pk` archive, resolving types through `registry`.
///
/// The registry is an explicit argument so the set of reconstructible
/// types is always visible at the call site; typed wrappers pass
/// [`TypeRegistry::builtin`].
pub fn load(path: &Path, registry: &TypeRegistry) -> Result<Box<dyn Persistable>, StoreError> {
    compact_memory();
    let record = container::load(path, registry)?;
    tracing::debug!(
        path = %path.display(),
        type_name = record.type_name(),
        "archive loaded"
    );
    Ok(record)
}

/// Load a [`Molecule`] archive and, when `update` is true, migrate it to
/// the current record schema before returning it.
pub fn load_molecule(path: &Path, update: bool) -> Result<Molecule, StoreError> {
    let mut molecule: Molecule = load_as(path, Molecule::TYPE_NAME)?;
    if update {
        molecule.update_version();
    }
    Ok(molecule)
}

/// Load an [`Embryo`] archive and, when `update` is true, migrate it to
/// the current record schema before returning it.
pub fn load_embryo(path: &Path, update: bool) -> Result<Embryo, StoreError> {
    let mut embryo: Embryo = load_as(path, Embryo::TYPE_NAME)?;
    if update {
        embryo.update_version();
    }
    Ok(embryo)
}

/// Best-effort memory release between large archive operations.
///
/// The original toolchain forced a garbage-collection pass before every
/// save and load to bound peak memory in long interactive sessions. Rust
/// reclaims memory deterministically on drop, so there is nothing to
/// trigger; the hook stays so save/load keep their "release memory first"
/// call sequence and callers have a named seam to instrument. Correctness
/// never depends on it.
pub fn compact_memory() {
    tracing::trace!("compact_memory: deterministic drop already reclaimed, nothing to do");
}

/// Generic typed load through the builtin registry.
fn load_as<T: Persistable>(path: &Path, expected: &'static str) -> Result<T, StoreError> {
    let record = load(path, &TypeRegistry::builtin())?;
    let found = record.type_name();
    record
        .into_any()
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| StoreError::WrongRecordType {
            expected,
            found: found.to_string(),
        })
}

/// Default archive filename for a record: `<name>.pk`, or `unnamed.pk`
/// when the record has no (or an empty) display name.
fn default_archive_name(record: &dyn Persistable) -> String {
    match record.record_name() {
        Some(name) if !name.is_empty() => format!("{name}.{ARCHIVE_EXT}"),
        _ => format!("unnamed.{ARCHIVE_EXT}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Geometry;

    fn tmp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("frapstore_store_{name}.pk"))
    }

    // ── Default naming ──────────────────────────────────────────────────────

    #[test]
    fn default_name_comes_from_the_record_name() {
        let embryo = Embryo::new("sample");
        assert_eq!(default_archive_name(&embryo), "sample.pk");
    }

    #[test]
    fn default_name_falls_back_to_unnamed() {
        let geometry = Geometry {
            name: "dome".to_string(),
            geo_path: String::new(),
            msh_path: String::new(),
        };
        // Geometry exposes no display name.
        assert_eq!(default_archive_name(&geometry), "unnamed.pk");

        let nameless = Embryo::new("");
        assert_eq!(default_archive_name(&nameless), "unnamed.pk");
    }

    #[test]
    fn save_without_a_path_writes_the_derived_name() {
        // No destination → `<name>.pk` relative to the current directory.
        let embryo = Embryo::new("frapstore_default_name_sample");
        let path = save(&embryo, None).expect("save should succeed");
        assert_eq!(
            path,
            PathBuf::from("frapstore_default_name_sample.pk"),
            "save must return the path it derived"
        );
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    // ── Typed loads and the version hook ────────────────────────────────────

    #[test]
    fn load_embryo_with_update_migrates_the_schema() {
        let mut embryo = Embryo::new("embryo01");
        embryo.schema_version = 1;
        embryo.created_at = String::new();
        let tmp = tmp_path("embryo_update");
        save(&embryo, Some(&tmp)).expect("save should succeed");

        let loaded = load_embryo(&tmp, true).expect("load should succeed");
        let _ = std::fs::remove_file(&tmp);

        assert_eq!(loaded.schema_version, crate::records::CURRENT_SCHEMA_VERSION);
        assert!(!loaded.created_at.is_empty());
    }

    #[test]
    fn load_embryo_without_update_leaves_the_schema_alone() {
        let mut embryo = Embryo::new("embryo01");
        embryo.schema_version = 1;
        embryo.created_at = String::new();
        let tmp = tmp_path("embryo_no_update");
        save(&embryo, Some(&tmp)).expect("save should succeed");

        let loaded = load_embryo(&tmp, false).expect("load should succeed");
        let _ = std::fs::remove_file(&tmp);

        assert_eq!(loaded.schema_version, 1, "update=false must not migrate");
        assert!(loaded.created_at.is_empty());
    }

    #[test]
    fn load_molecule_with_update_migrates_nested_embryos() {
        let mut molecule = Molecule::new("fitc-dextran-70k");
        molecule.schema_version = 1;
        let mut old_embryo = Embryo::new("embryo01");
        old_embryo.schema_version = 1;
        molecule.embryos.push(old_embryo);
        let tmp = tmp_path("molecule_update");
        save(&molecule, Some(&tmp)).expect("save should succeed");

        let loaded = load_molecule(&tmp, true).expect("load should succeed");
        let _ = std::fs::remove_file(&tmp);

        assert_eq!(loaded.schema_version, crate::records::CURRENT_SCHEMA_VERSION);
        assert_eq!(
            loaded.embryos[0].schema_version,
            crate::records::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn typed_load_rejects_the_wrong_record_type() {
        let embryo = Embryo::new("embryo01");
        let tmp = tmp_path("wrong_type");
        save(&embryo, Some(&tmp)).expect("save should succeed");

        let result = load_molecule(&tmp, true);
        let _ = std::fs::remove_file(&tmp);

        match result.expect_err("an embryo archive is not a molecule") {
            StoreError::WrongRecordType { expected, found } => {
                assert_eq!(expected, "molecule");
                assert_eq!(found, "embryo");
            }
            other => panic!("expected StoreError::WrongRecordType, got {other:?}"),
        }
    }

    #[test]
    fn load_returns_err_for_missing_file() {
        let registry = TypeRegistry::builtin();
        let result = load(Path::new("/nonexistent/path/record.pk"), &registry);
        assert!(matches!(result, Err(StoreError::Load(_))));
    }

    #[test]
    fn save_to_invalid_path_returns_err() {
        let embryo = Embryo::new("embryo01");
        let result = save(
            &embryo,
            Some(Path::new("/nonexistent_dir_frapstore/record.pk")),
        );
        assert!(matches!(result, Err(StoreError::Save(_))));
    }
}
