//! The `.pk` archive format.
//!
//! # Module structure
//!
//! ```text
//! archive/
//! ├── value.rs     — value-graph model (shared-node table + root value)
//! ├── codec.rs     — length-prefixed tagged binary encoding
//! ├── object.rs    — Persistable trait, Encoder / Decoder
//! ├── registry.rs  — explicit type-name → decoder registry
//! └── container.rs — ZIP container: manifest.json + record.bin
//! ```
//!
//! Code outside this module normally goes through [`crate::store`]; the
//! pieces are public so hosts can persist their own [`Persistable`] types
//! and register decoders for them.

pub mod codec;
pub mod container;
pub mod object;
pub mod registry;
pub mod value;

pub use container::FORMAT_VERSION;
pub use object::{DecodeFn, Decoder, Encoder, Persistable};
pub use registry::TypeRegistry;
pub use value::{Fields, NodeId, Value, ValueGraph};
