//! Best-effort filesystem utilities for mesh artifacts.
//!
//! Both operations fail soft: they never return an error. Each copy
//! reports its own outcome through [`CopyOutcome`], so a larger workflow
//! (e.g. saving a whole molecule after re-meshing) is not aborted over a
//! filesystem hiccup. Failures are additionally logged via `tracing`.

use std::path::{Path, PathBuf};

/// Conventional subdirectory name that collocates `.geo`/`.msh` artifacts.
pub const MESHFILES_DIR: &str = "meshfiles";

/// Result of one best-effort copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyOutcome {
    /// The path callers should use from now on. For
    /// [`relocate_mesh_files`] this is always the intended destination;
    /// [`copy_and_rename`] falls back to the source path on failure so
    /// callers are always left holding a usable file.
    pub path: PathBuf,
    /// Whether the copy actually succeeded.
    pub copied: bool,
    /// Diagnostic for a failed copy.
    pub error: Option<String>,
}

/// Outcome of [`relocate_mesh_files`] for the geometry and mesh file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRelocation {
    /// Outcome for the `.geo` geometry-definition file.
    pub geo: CopyOutcome,
    /// Outcome for the `.msh` mesh file.
    pub msh: CopyOutcome,
}

/// Copy a `.geo`/`.msh` pair into a canonical `meshfiles` directory.
///
/// `dest_hint` may be a directory, or a file whose parent directory is
/// used. A destination already named `meshfiles` is used as-is — even if
/// it does not exist yet; otherwise a `meshfiles` subdirectory is created
/// underneath it. Directory creation is best-effort: "already exists" is
/// expected, and any other failure is logged while the copies still run
/// and report their own outcome. Original filenames are preserved.
pub fn relocate_mesh_files(dest_hint: &Path, geo_path: &Path, msh_path: &Path) -> MeshRelocation {
    let dir = resolve_meshfiles_dir(dest_hint);
    MeshRelocation {
        geo: copy_into(geo_path, &dir),
        msh: copy_into(msh_path, &dir),
    }
}

/// Copy `source` next to itself under a new base name, keeping the
/// original extension.
///
/// Fails soft: on any copy failure the outcome's `path` is the original
/// `source` path, `copied` is false, and `error` carries the diagnostic.
pub fn copy_and_rename(source: &Path, new_base_name: &str) -> CopyOutcome {
    let mut file_name = new_base_name.to_string();
    if let Some(ext) = source.extension() {
        file_name.push('.');
        file_name.push_str(&ext.to_string_lossy());
    }
    let dest = source.with_file_name(&file_name);

    // Copying a file onto itself would truncate it before reading; keep the
    // original intact and report the no-op.
    if is_same_file(source, &dest) {
        tracing::warn!(path = %source.display(), "copy-and-rename targets the source file itself");
        return CopyOutcome {
            path: source.to_path_buf(),
            copied: false,
            error: Some("source and destination are the same file".to_string()),
        };
    }

    match std::fs::copy(source, &dest) {
        Ok(_) => {
            tracing::debug!(from = %source.display(), to = %dest.display(), "copied and renamed");
            CopyOutcome {
                path: dest,
                copied: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(
                from = %source.display(),
                to = %dest.display(),
                "copy-and-rename failed, keeping the original path: {e}"
            );
            CopyOutcome {
                path: source.to_path_buf(),
                copied: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Resolve (and best-effort create) the target `meshfiles` directory.
fn resolve_meshfiles_dir(dest_hint: &Path) -> PathBuf {
    let mut dir = if dest_hint.is_dir() {
        dest_hint.to_path_buf()
    } else {
        // A file hint (or a path that does not exist yet) resolves to its
        // parent directory.
        dest_hint
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    if dir.file_name().is_some_and(|n| n == MESHFILES_DIR) {
        return dir;
    }

    dir.push(MESHFILES_DIR);
    match std::fs::create_dir(&dir) {
        Ok(()) => tracing::debug!(dir = %dir.display(), "created meshfiles directory"),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
        Err(e) => {
            // Best effort: the copies surface their own failures.
            tracing::warn!(dir = %dir.display(), "cannot create meshfiles directory: {e}");
        }
    }
    dir
}

/// Copy `source` into `dir`, keeping the original filename.
fn copy_into(source: &Path, dir: &Path) -> CopyOutcome {
    let Some(file_name) = source.file_name() else {
        tracing::warn!(from = %source.display(), "source path has no filename");
        return CopyOutcome {
            path: source.to_path_buf(),
            copied: false,
            error: Some("source path has no filename".to_string()),
        };
    };
    let dest = dir.join(file_name);

    // A file that already lives in the target directory must not be copied
    // onto itself: the truncating open would empty it.
    if is_same_file(source, &dest) {
        tracing::debug!(path = %dest.display(), "mesh file already in place, nothing to copy");
        return CopyOutcome {
            path: dest,
            copied: false,
            error: Some("source and destination are the same file".to_string()),
        };
    }

    match std::fs::copy(source, &dest) {
        Ok(_) => {
            tracing::debug!(from = %source.display(), to = %dest.display(), "copied mesh file");
            CopyOutcome {
                path: dest,
                copied: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(from = %source.display(), to = %dest.display(), "mesh file copy failed: {e}");
            CopyOutcome {
                path: dest,
                copied: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Whether `source` and `dest` name the same underlying file.
///
/// Canonicalization resolves symlinks and `..` segments; when either path
/// cannot be canonicalized (e.g. the destination does not exist yet) the
/// raw paths are compared instead.
fn is_same_file(source: &Path, dest: &Path) -> bool {
    if source == dest {
        return true;
    }
    match (source.canonicalize(), dest.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
