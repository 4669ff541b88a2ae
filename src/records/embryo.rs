//! Embryo record: one FRAP experiment dataset.

use std::any::Any;
use std::rc::Rc;

use uuid::Uuid;

use super::{Geometry, CURRENT_SCHEMA_VERSION};
use crate::archive::value::{Fields, Value};
use crate::archive::{Decoder, Encoder, Persistable};
use crate::error::StoreError;

/// A single embryo dataset: the recovery curve measured in one experiment
/// plus a reference to the simulation geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Embryo {
    /// Unique identifier; minted on creation (absent in version-1 archives).
    pub id: Uuid,
    /// Human-readable embryo name (e.g. `"embryo01"`), also the default
    /// archive filename stem.
    pub name: String,
    /// Record schema version; see [`CURRENT_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// RFC-3339 creation timestamp; empty in version-1 archives until
    /// [`Embryo::update_version`] runs.
    pub created_at: String,
    /// Shared simulation geometry, once the embryo has been meshed.
    pub geometry: Option<Rc<Geometry>>,
    /// Mean ROI intensity per frame of the recovery curve.
    pub intensities: Vec<f64>,
}

impl Embryo {
    /// Stable type name used in streams and registries.
    pub const TYPE_NAME: &'static str = "embryo";

    /// Create a new embryo at the current schema version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: super::now_rfc3339(),
            geometry: None,
            intensities: Vec::new(),
        }
    }

    /// Migrate this embryo in place to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Version-1 archives predate `created_at`; migration stamps the
    /// current time. A record already at the current version is left
    /// untouched.
    pub fn update_version(&mut self) {
        if self.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }
        tracing::debug!(
            name = %self.name,
            from = self.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating embryo record"
        );
        if self.created_at.is_empty() {
            self.created_at = super::now_rfc3339();
        }
        self.schema_version = CURRENT_SCHEMA_VERSION;
    }
}

impl Persistable for Embryo {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn record_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn encode(&self, enc: &mut Encoder) -> Result<Value, StoreError> {
        let mut fields = Fields::new();
        fields.insert("id".into(), Value::Str(self.id.to_string()));
        fields.insert("name".into(), Value::Str(self.name.clone()));
        fields.insert(
            "schema_version".into(),
            Value::Int(i64::from(self.schema_version)),
        );
        fields.insert("created_at".into(), Value::Str(self.created_at.clone()));
        fields.insert(
            "intensities".into(),
            Value::List(self.intensities.iter().copied().map(Value::Float).collect()),
        );
        if let Some(geometry) = &self.geometry {
            fields.insert("geometry".into(), enc.shared(geometry)?);
        }
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

/// Decode function registered under [`Embryo::TYPE_NAME`].
pub(crate) fn decode(
    fields: &Fields,
    dec: &mut Decoder<'_>,
) -> Result<Box<dyn Persistable>, StoreError> {
    let geometry = match fields.get("geometry") {
        Some(value) => Some(dec.shared::<Geometry>(value)?),
        None => None,
    };
    Ok(Box::new(Embryo {
        id: super::uuid_field(fields, "id")?,
        name: super::str_field(fields, "name"),
        schema_version: super::u32_field(fields, "schema_version", 1),
        created_at: super::str_field(fields, "created_at"),
        geometry,
        intensities: super::float_list_field(fields, "intensities"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::TypeRegistry;

    #[test]
    fn new_embryo_is_at_current_schema_version() {
        let embryo = Embryo::new("embryo01");
        assert_eq!(embryo.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(!embryo.created_at.is_empty());
        assert!(embryo.geometry.is_none());
    }

    #[test]
    fn update_version_migrates_a_version_one_record() {
        let mut embryo = Embryo::new("embryo01");
        embryo.schema_version = 1;
        embryo.created_at = String::new();

        embryo.update_version();
        assert_eq!(embryo.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(
            !embryo.created_at.is_empty(),
            "migration must stamp created_at"
        );
    }

    #[test]
    fn update_version_is_idempotent_at_the_current_version() {
        let mut embryo = Embryo::new("embryo01");
        let before = embryo.clone();
        embryo.update_version();
        assert_eq!(embryo, before);
    }

    #[test]
    fn encode_decode_round_trip_without_geometry() {
        let mut embryo = Embryo::new("embryo01");
        embryo.intensities = vec![0.12, 0.44, 0.83];

        let graph = Encoder::encode_graph(&embryo).expect("encode");
        let registry = TypeRegistry::builtin();
        let boxed = Decoder::decode_graph(&graph, &registry).expect("decode");
        let recovered = boxed
            .into_any()
            .downcast::<Embryo>()
            .expect("root must be an embryo");
        assert_eq!(*recovered, embryo);
    }

    #[test]
    fn decode_tolerates_version_one_field_set() {
        // A version-1 stream: no id, no created_at, no intensities.
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::Str("embryo01".into()));
        fields.insert("schema_version".into(), Value::Int(1));
        let graph = crate::archive::ValueGraph {
            nodes: vec![],
            root: Value::Object {
                type_name: Embryo::TYPE_NAME.to_string(),
                fields,
            },
        };

        let registry = TypeRegistry::builtin();
        let boxed = Decoder::decode_graph(&graph, &registry).expect("decode");
        let embryo = boxed
            .into_any()
            .downcast::<Embryo>()
            .expect("root must be an embryo");
        assert_eq!(embryo.name, "embryo01");
        assert_eq!(embryo.schema_version, 1);
        assert!(embryo.created_at.is_empty());
        assert!(embryo.intensities.is_empty());
    }
}
