//! Encoding and decoding seam between records and the value graph.
//!
//! Records implement [`Persistable`] to describe themselves as a
//! [`Value::Object`]; `Rc`-shared members go through [`Encoder::shared`] /
//! [`Decoder::shared`] so pointer identity survives a round-trip. Decoding
//! resolves type names through an explicit [`TypeRegistry`] — the set of
//! loadable types is an argument to every load, never process-global
//! state.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use super::registry::TypeRegistry;
use super::value::{Fields, NodeId, Value, ValueGraph};
use crate::error::StoreError;

/// A record that can be persisted to a `.pk` archive.
///
/// Decoding is deliberately *not* a trait method: it lives in a
/// [`DecodeFn`] registered with a [`TypeRegistry`], so a stream can only
/// reconstruct types the host explicitly allowed.
///
/// `Debug` is a supertrait so boxed records render in logs and test
/// assertions.
pub trait Persistable: Any + std::fmt::Debug {
    /// Stable type name written to the stream and the manifest.
    fn type_name(&self) -> &'static str;

    /// Display name used to derive a default archive filename.
    fn record_name(&self) -> Option<&str> {
        None
    }

    /// Encode this record as a [`Value::Object`].
    fn encode(&self, enc: &mut Encoder) -> Result<Value, StoreError>;

    /// Borrowed upcast for typed downcasting after a generic load.
    fn as_any(&self) -> &dyn Any;

    /// Owned upcast for typed downcasting after a generic load.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Decode function registered per type name.
pub type DecodeFn = fn(&Fields, &mut Decoder<'_>) -> Result<Box<dyn Persistable>, StoreError>;

/// Builds a [`ValueGraph`] from a root record.
pub struct Encoder {
    nodes: Vec<Value>,
    /// `Rc` pointer address → node id, so an aliased record is written once.
    interned: HashMap<usize, NodeId>,
}

impl Encoder {
    /// Encode `root` and everything reachable from it into a graph.
    pub fn encode_graph(root: &dyn Persistable) -> Result<ValueGraph, StoreError> {
        let mut enc = Encoder {
            nodes: Vec::new(),
            interned: HashMap::new(),
        };
        let root = root.encode(&mut enc)?;
        Ok(ValueGraph {
            nodes: enc.nodes,
            root,
        })
    }

    /// Encode an `Rc`-shared record, interning it by pointer identity.
    ///
    /// The first encounter writes the node into the shared table; later
    /// encounters of the same `Rc` emit only a [`Value::Shared`] reference.
    pub fn shared<T: Persistable>(&mut self, node: &Rc<T>) -> Result<Value, StoreError> {
        let key = Rc::as_ptr(node) as usize;
        if let Some(&id) = self.interned.get(&key) {
            return Ok(Value::Shared(id));
        }
        // Reserve the slot before recursing so references encountered while
        // encoding the node itself already resolve.
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Value::Null);
        self.interned.insert(key, id);
        let encoded = node.encode(self)?;
        self.nodes[id as usize] = encoded;
        Ok(Value::Shared(id))
    }
}

/// Reconstructs records from a [`ValueGraph`] through a [`TypeRegistry`].
pub struct Decoder<'a> {
    graph: &'a ValueGraph,
    registry: &'a TypeRegistry,
    /// Node id → reconstructed `Rc`, so aliasing is restored.
    memo: HashMap<NodeId, Rc<dyn Any>>,
}

impl<'a> Decoder<'a> {
    /// Decode the graph root into a boxed record.
    pub fn decode_graph(
        graph: &'a ValueGraph,
        registry: &'a TypeRegistry,
    ) -> Result<Box<dyn Persistable>, StoreError> {
        let mut dec = Decoder {
            graph,
            registry,
            memo: HashMap::new(),
        };
        let root = graph.root.clone();
        dec.object(&root)
    }

    /// Decode an inline [`Value::Object`] through the registry.
    pub fn object(&mut self, value: &Value) -> Result<Box<dyn Persistable>, StoreError> {
        match value {
            Value::Object { type_name, fields } => {
                let decode = self
                    .registry
                    .decoder(type_name)
                    .ok_or_else(|| StoreError::UnknownType(type_name.clone()))?;
                decode(fields, self)
            }
            other => Err(StoreError::Decode(format!(
                "expected an object value, found {}",
                other.kind()
            ))),
        }
    }

    /// Decode an owned nested record of a known concrete type.
    pub fn record<T: Persistable>(&mut self, value: &Value) -> Result<T, StoreError> {
        let boxed = self.object(value)?;
        let found = boxed.type_name();
        boxed
            .into_any()
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| StoreError::Decode(format!("nested record has type `{found}`")))
    }

    /// Decode an `Rc`-shared record reference, restoring aliasing: every
    /// reference to the same node id yields a clone of one `Rc`.
    pub fn shared<T: Persistable>(&mut self, value: &Value) -> Result<Rc<T>, StoreError> {
        let id = match value {
            Value::Shared(id) => *id,
            other => {
                return Err(StoreError::Decode(format!(
                    "expected a shared reference, found {}",
                    other.kind()
                )))
            }
        };
        if let Some(existing) = self.memo.get(&id) {
            return Rc::clone(existing).downcast::<T>().map_err(|_| {
                StoreError::Decode(format!("shared node {id} decoded as a different type"))
            });
        }
        let node = self
            .graph
            .node(id)
            .cloned()
            .ok_or_else(|| StoreError::Decode(format!("shared node {id} is out of range")))?;
        let boxed = self.object(&node)?;
        let found = boxed.type_name();
        let concrete = boxed
            .into_any()
            .downcast::<T>()
            .map_err(|_| StoreError::Decode(format!("shared node {id} has type `{found}`")))?;
        let rc: Rc<T> = Rc::from(concrete);
        self.memo.insert(id, Rc::clone(&rc) as Rc<dyn Any>);
        Ok(rc)
    }
}
