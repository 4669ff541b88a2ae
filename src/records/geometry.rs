//! Mesh geometry referenced by embryos.

use std::any::Any;

use crate::archive::value::{Fields, Value};
use crate::archive::{Decoder, Encoder, Persistable};
use crate::error::StoreError;

/// Geometry definition backing an embryo's simulation mesh.
///
/// Embryos of the same experiment usually share one geometry; hold it in
/// an `Rc` so a saved archive stores it once and a load restores the
/// aliasing (see [`Encoder::shared`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Human-readable geometry name (e.g. `"zebrafish dome"`).
    pub name: String,
    /// Path to the `.geo` geometry-definition file.
    pub geo_path: String,
    /// Path to the generated `.msh` mesh file.
    pub msh_path: String,
}

impl Geometry {
    /// Stable type name used in streams and registries.
    pub const TYPE_NAME: &'static str = "geometry";
}

impl Persistable for Geometry {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn encode(&self, _enc: &mut Encoder) -> Result<Value, StoreError> {
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::Str(self.name.clone()));
        fields.insert("geo_path".into(), Value::Str(self.geo_path.clone()));
        fields.insert("msh_path".into(), Value::Str(self.msh_path.clone()));
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

/// Decode function registered under [`Geometry::TYPE_NAME`].
pub(crate) fn decode(
    fields: &Fields,
    _dec: &mut Decoder<'_>,
) -> Result<Box<dyn Persistable>, StoreError> {
    Ok(Box::new(Geometry {
        name: super::str_field(fields, "name"),
        geo_path: super::str_field(fields, "geo_path"),
        msh_path: super::str_field(fields, "msh_path"),
    }))
}
