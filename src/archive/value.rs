//! In-memory value graph written to and read from `record.bin`.
//!
//! A [`ValueGraph`] is a table of shared nodes plus a root value. A record
//! referenced from two places (e.g. one [`Rc`](std::rc::Rc) geometry held
//! by two embryos) is stored once in the table and pointed at by two
//! [`Value::Shared`] entries, so aliasing survives a round-trip instead of
//! being flattened into equal-but-distinct copies.

use std::collections::BTreeMap;

/// Index into the shared-node table of a [`ValueGraph`].
pub type NodeId = u32;

/// Named fields of an object value. A `BTreeMap` keeps field order
/// deterministic, so identical records produce identical payload bytes.
pub type Fields = BTreeMap<String, Value>;

/// A single value in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A typed record: stable type name plus named fields.
    Object { type_name: String, fields: Fields },
    /// Reference to an entry in the shared-node table.
    Shared(NodeId),
}

impl Value {
    /// Short kind name used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object { .. } => "object",
            Value::Shared(_) => "shared",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric accessor; integers promote to `f64` so decoders accept a
    /// whole-number sample written as an int.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A complete persisted object graph: shared nodes plus the root value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGraph {
    /// Shared-node table; [`Value::Shared`] entries index into it.
    pub nodes: Vec<Value>,
    /// The root record, always a [`Value::Object`] when produced by the
    /// encoder.
    pub root: Value,
}

impl ValueGraph {
    /// Look up a shared node, `None` when the id is out of range.
    pub fn node(&self, id: NodeId) -> Option<&Value> {
        self.nodes.get(id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_some_for_matching_kind() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(-3).as_i64(), Some(-3));
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Str("dome".into()).as_str(), Some("dome"));
        assert_eq!(
            Value::List(vec![Value::Null]).as_list(),
            Some(&[Value::Null][..])
        );
    }

    #[test]
    fn accessors_return_none_for_other_kinds() {
        assert_eq!(Value::Null.as_bool(), None);
        assert_eq!(Value::Str("7".into()).as_i64(), None);
        assert_eq!(Value::Bool(true).as_str(), None);
    }

    #[test]
    fn int_promotes_to_f64() {
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
    }

    #[test]
    fn node_lookup_is_none_out_of_range() {
        let graph = ValueGraph {
            nodes: vec![Value::Null],
            root: Value::Null,
        };
        assert!(graph.node(0).is_some());
        assert!(graph.node(1).is_none());
    }
}
