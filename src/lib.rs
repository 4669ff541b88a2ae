//! frapstore — persistence and file utilities for FRAP analysis records.
//!
//! Molecule and embryo records are saved to `.pk` archives: ZIP containers
//! holding a JSON manifest and a binary value-graph payload. The payload
//! preserves shared (`Rc`-aliased) references, so two embryos pointing at
//! one geometry before a save point at one geometry after the load. Two
//! best-effort helpers relocate `.geo`/`.msh` mesh artifacts into a
//! canonical `meshfiles` directory and copy-rename files in place.
//!
//! Everything is synchronous, blocking, and single-threaded; records use
//! `Rc`, and the crate assumes single-writer access to archive paths.
//!
//! ```no_run
//! use frapstore::records::Embryo;
//!
//! let embryo = Embryo::new("embryo01");
//! let path = frapstore::save(&embryo, None)?; // → embryo01.pk
//! let restored = frapstore::load_embryo(&path, true)?;
//! assert_eq!(restored.name, "embryo01");
//! # Ok::<(), frapstore::StoreError>(())
//! ```

pub mod archive;
pub mod error;
pub mod fsutil;
pub mod records;
pub mod store;

pub use archive::{Persistable, TypeRegistry};
pub use error::StoreError;
pub use fsutil::{copy_and_rename, relocate_mesh_files, CopyOutcome, MeshRelocation};
pub use store::{compact_memory, load, load_embryo, load_molecule, save};
