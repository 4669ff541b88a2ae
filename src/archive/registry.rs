//! Explicit mapping from record type names to decode functions.
//!
//! The registry is an argument to every load, so the set of
//! reconstructible types is visible in the call signature instead of
//! living in process-global state. [`TypeRegistry::builtin`] covers the
//! crate's own record types; hosts embedding their own [`Persistable`]
//! types register them on top.
//!
//! [`Persistable`]: super::object::Persistable

use std::collections::HashMap;

use super::object::DecodeFn;
use crate::records;

/// Type-name → decoder table consumed by [`Decoder`](super::Decoder).
#[derive(Default)]
pub struct TypeRegistry {
    decoders: HashMap<&'static str, DecodeFn>,
}

impl TypeRegistry {
    /// An empty registry; decodes nothing until types are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry covering the crate's record types (molecule, embryo,
    /// geometry).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(records::Molecule::TYPE_NAME, records::molecule::decode);
        registry.register(records::Embryo::TYPE_NAME, records::embryo::decode);
        registry.register(records::Geometry::TYPE_NAME, records::geometry::decode);
        registry
    }

    /// Register (or replace) the decoder for `type_name`.
    pub fn register(&mut self, type_name: &'static str, decode: DecodeFn) {
        self.decoders.insert(type_name, decode);
    }

    /// Look up the decoder for `type_name`.
    pub fn decoder(&self, type_name: &str) -> Option<DecodeFn> {
        self.decoders.get(type_name).copied()
    }
}
