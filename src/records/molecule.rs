//! Molecule record: the embryo datasets of one labelled molecule.

use std::any::Any;

use uuid::Uuid;

use super::{Embryo, CURRENT_SCHEMA_VERSION};
use crate::archive::value::{Fields, Value};
use crate::archive::{Decoder, Encoder, Persistable};
use crate::error::StoreError;

/// All experiments performed with one labelled molecule (e.g. a dextran
/// of a given size), grouped for joint fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    /// Unique identifier; minted on creation (absent in version-1 archives).
    pub id: Uuid,
    /// Human-readable molecule name, also the default archive filename stem.
    pub name: String,
    /// Free-form notes; empty in version-1 archives.
    pub description: String,
    /// Record schema version; see [`CURRENT_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// RFC-3339 creation timestamp; empty in version-1 archives until
    /// [`Molecule::update_version`] runs.
    pub created_at: String,
    /// Embryo datasets belonging to this molecule.
    pub embryos: Vec<Embryo>,
}

impl Molecule {
    /// Stable type name used in streams and registries.
    pub const TYPE_NAME: &'static str = "molecule";

    /// Create a new, empty molecule at the current schema version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: super::now_rfc3339(),
            embryos: Vec::new(),
        }
    }

    /// Migrate this molecule and all of its embryos in place to
    /// [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Embryos migrate first so a molecule loaded from an old archive is
    /// consistent all the way down. Idempotent at the current version.
    pub fn update_version(&mut self) {
        for embryo in &mut self.embryos {
            embryo.update_version();
        }
        if self.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }
        tracing::debug!(
            name = %self.name,
            from = self.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating molecule record"
        );
        if self.created_at.is_empty() {
            self.created_at = super::now_rfc3339();
        }
        self.schema_version = CURRENT_SCHEMA_VERSION;
    }
}

impl Persistable for Molecule {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn record_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn encode(&self, enc: &mut Encoder) -> Result<Value, StoreError> {
        let mut embryos = Vec::with_capacity(self.embryos.len());
        for embryo in &self.embryos {
            embryos.push(embryo.encode(enc)?);
        }
        let mut fields = Fields::new();
        fields.insert("id".into(), Value::Str(self.id.to_string()));
        fields.insert("name".into(), Value::Str(self.name.clone()));
        fields.insert("description".into(), Value::Str(self.description.clone()));
        fields.insert(
            "schema_version".into(),
            Value::Int(i64::from(self.schema_version)),
        );
        fields.insert("created_at".into(), Value::Str(self.created_at.clone()));
        fields.insert("embryos".into(), Value::List(embryos));
        Ok(Value::Object {
            type_name: Self::TYPE_NAME.to_string(),
            fields,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Decode function registered under [`Molecule::TYPE_NAME`].
pub(crate) fn decode(
    fields: &Fields,
    dec: &mut Decoder<'_>,
) -> Result<Box<dyn Persistable>, StoreError> {
    let mut embryos = Vec::new();
    if let Some(items) = fields.get("embryos").and_then(Value::as_list) {
        for item in items {
            embryos.push(dec.record::<Embryo>(item)?);
        }
    }
    Ok(Box::new(Molecule {
        id: super::uuid_field(fields, "id")?,
        name: super::str_field(fields, "name"),
        description: super::str_field(fields, "description"),
        schema_version: super::u32_field(fields, "schema_version", 1),
        created_at: super::str_field(fields, "created_at"),
        embryos,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::TypeRegistry;

    #[test]
    fn new_molecule_is_empty_and_current() {
        let molecule = Molecule::new("fitc-dextran-70k");
        assert_eq!(molecule.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(molecule.embryos.is_empty());
        assert!(molecule.description.is_empty());
    }

    #[test]
    fn update_version_recurses_into_embryos() {
        let mut molecule = Molecule::new("fitc-dextran-70k");
        molecule.schema_version = 1;
        molecule.created_at = String::new();
        let mut old_embryo = Embryo::new("embryo01");
        old_embryo.schema_version = 1;
        molecule.embryos.push(old_embryo);

        molecule.update_version();
        assert_eq!(molecule.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(!molecule.created_at.is_empty());
        assert_eq!(molecule.embryos[0].schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn encode_decode_round_trip_with_embryos() {
        let mut molecule = Molecule::new("fitc-dextran-70k");
        molecule.description = "70 kDa control series".to_string();
        let mut embryo = Embryo::new("embryo01");
        embryo.intensities = vec![0.2, 0.5, 0.8];
        molecule.embryos.push(embryo);

        let graph = Encoder::encode_graph(&molecule).expect("encode");
        let registry = TypeRegistry::builtin();
        let boxed = Decoder::decode_graph(&graph, &registry).expect("decode");
        let recovered = boxed
            .into_any()
            .downcast::<Molecule>()
            .expect("root must be a molecule");
        assert_eq!(*recovered, molecule);
    }
}
