//! Length-prefixed tagged binary encoding of a [`ValueGraph`].
//!
//! Layout: `[node_count: u32][node …][root]`, every integer little-endian.
//! Each value starts with a one-byte tag followed by its payload; strings,
//! byte buffers, and collections carry a `u32` length prefix. The payload
//! is wrapped in the ZIP container by [`super::container`], which owns the
//! format version and the integrity digest, so the codec itself stays
//! unversioned.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::value::{Fields, Value, ValueGraph};
use crate::error::StoreError;

// Value tags. Stable on disk; append only.
const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_LIST: u8 = 6;
const TAG_MAP: u8 = 7;
const TAG_OBJECT: u8 = 8;
const TAG_SHARED: u8 = 9;

/// Write `graph` to `w`: the shared-node table first, then the root.
pub fn write_graph<W: Write>(w: &mut W, graph: &ValueGraph) -> Result<(), StoreError> {
    write_len(w, graph.nodes.len())?;
    for node in &graph.nodes {
        write_value(w, node)?;
    }
    write_value(w, &graph.root)
}

/// Read a complete graph from `r`.
pub fn read_graph<R: Read>(r: &mut R) -> Result<ValueGraph, StoreError> {
    let count = read_u32(r)?;
    let mut nodes = Vec::new();
    for _ in 0..count {
        nodes.push(read_value(r)?);
    }
    let root = read_value(r)?;
    Ok(ValueGraph { nodes, root })
}

fn write_value<W: Write>(w: &mut W, value: &Value) -> Result<(), StoreError> {
    match value {
        Value::Null => write_u8(w, TAG_NULL),
        Value::Bool(v) => {
            write_u8(w, TAG_BOOL)?;
            write_u8(w, *v as u8)
        }
        Value::Int(v) => {
            write_u8(w, TAG_INT)?;
            w.write_all(&v.to_le_bytes())?;
            Ok(())
        }
        Value::Float(v) => {
            write_u8(w, TAG_FLOAT)?;
            w.write_all(&v.to_le_bytes())?;
            Ok(())
        }
        Value::Str(s) => {
            write_u8(w, TAG_STR)?;
            write_str(w, s)
        }
        Value::Bytes(b) => {
            write_u8(w, TAG_BYTES)?;
            write_len(w, b.len())?;
            w.write_all(b)?;
            Ok(())
        }
        Value::List(items) => {
            write_u8(w, TAG_LIST)?;
            write_len(w, items.len())?;
            for item in items {
                write_value(w, item)?;
            }
            Ok(())
        }
        Value::Map(entries) => {
            write_u8(w, TAG_MAP)?;
            write_len(w, entries.len())?;
            for (key, entry) in entries {
                write_str(w, key)?;
                write_value(w, entry)?;
            }
            Ok(())
        }
        Value::Object { type_name, fields } => {
            write_u8(w, TAG_OBJECT)?;
            write_str(w, type_name)?;
            write_len(w, fields.len())?;
            for (key, field) in fields {
                write_str(w, key)?;
                write_value(w, field)?;
            }
            Ok(())
        }
        Value::Shared(id) => {
            write_u8(w, TAG_SHARED)?;
            write_u32(w, *id)
        }
    }
}

fn read_value<R: Read>(r: &mut R) -> Result<Value, StoreError> {
    match read_u8(r)? {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOL => Ok(Value::Bool(read_u8(r)? != 0)),
        TAG_INT => {
            let mut buf = [0u8; 8];
            read_exact(r, &mut buf)?;
            Ok(Value::Int(i64::from_le_bytes(buf)))
        }
        TAG_FLOAT => {
            let mut buf = [0u8; 8];
            read_exact(r, &mut buf)?;
            Ok(Value::Float(f64::from_le_bytes(buf)))
        }
        TAG_STR => Ok(Value::Str(read_str(r)?)),
        TAG_BYTES => {
            let len = read_u32(r)? as usize;
            Ok(Value::Bytes(read_vec(r, len)?))
        }
        TAG_LIST => {
            let len = read_u32(r)?;
            let mut items = Vec::new();
            for _ in 0..len {
                items.push(read_value(r)?);
            }
            Ok(Value::List(items))
        }
        TAG_MAP => {
            let len = read_u32(r)?;
            let mut entries = BTreeMap::new();
            for _ in 0..len {
                let key = read_str(r)?;
                entries.insert(key, read_value(r)?);
            }
            Ok(Value::Map(entries))
        }
        TAG_OBJECT => {
            let type_name = read_str(r)?;
            let len = read_u32(r)?;
            let mut fields = Fields::new();
            for _ in 0..len {
                let key = read_str(r)?;
                fields.insert(key, read_value(r)?);
            }
            Ok(Value::Object { type_name, fields })
        }
        TAG_SHARED => Ok(Value::Shared(read_u32(r)?)),
        tag => Err(StoreError::Decode(format!("unknown value tag {tag}"))),
    }
}

// ── Primitive helpers ───────────────────────────────────────────────────────

fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<(), StoreError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<(), StoreError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_len<W: Write>(w: &mut W, len: usize) -> Result<(), StoreError> {
    let len = u32::try_from(len)
        .map_err(|_| StoreError::Encode(format!("length {len} exceeds the u32 wire limit")))?;
    write_u32(w, len)
}

fn write_str<W: Write>(w: &mut W, s: &str) -> Result<(), StoreError> {
    write_len(w, s.len())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Largest single allocation made on behalf of a length prefix. Longer
/// payloads grow chunk by chunk, so a malformed prefix on a short stream
/// fails with [`StoreError::Decode`] instead of a multi-gigabyte
/// allocation.
const READ_CHUNK: usize = 64 * 1024;

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), StoreError> {
    r.read_exact(buf)
        .map_err(|e| StoreError::Decode(format!("truncated value stream: {e}")))
}

/// Read exactly `len` bytes, allocating at most [`READ_CHUNK`] ahead of
/// the bytes actually received.
fn read_vec<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(READ_CHUNK);
        let filled = buf.len();
        buf.resize(filled + chunk, 0);
        read_exact(r, &mut buf[filled..])?;
        remaining -= chunk;
    }
    Ok(buf)
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8, StoreError> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, StoreError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_str<R: Read>(r: &mut R) -> Result<String, StoreError> {
    let len = read_u32(r)? as usize;
    let buf = read_vec(r, len)?;
    String::from_utf8(buf).map_err(|e| StoreError::Decode(format!("malformed string: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> ValueGraph {
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::Str("embryo01".into()));
        fields.insert("frames".into(), Value::Int(120));
        fields.insert("bleach_depth".into(), Value::Float(0.37));
        fields.insert(
            "intensities".into(),
            Value::List(vec![Value::Float(0.2), Value::Float(0.5)]),
        );
        fields.insert("geometry".into(), Value::Shared(0));
        fields.insert("raw".into(), Value::Bytes(vec![0, 1, 255]));
        fields.insert("masked".into(), Value::Bool(false));
        fields.insert("notes".into(), Value::Null);

        let mut meta = BTreeMap::new();
        meta.insert("channel".to_string(), Value::Str("488nm".into()));
        fields.insert("meta".into(), Value::Map(meta));

        let mut geo_fields = Fields::new();
        geo_fields.insert("name".into(), Value::Str("dome".into()));

        ValueGraph {
            nodes: vec![Value::Object {
                type_name: "geometry".into(),
                fields: geo_fields,
            }],
            root: Value::Object {
                type_name: "embryo".into(),
                fields,
            },
        }
    }

    #[test]
    fn graph_round_trips_every_value_kind() {
        let graph = sample_graph();
        let mut buf = Vec::new();
        write_graph(&mut buf, &graph).expect("write graph");
        let recovered = read_graph(&mut buf.as_slice()).expect("read graph");
        assert_eq!(recovered, graph);
    }

    #[test]
    fn identical_graphs_produce_identical_bytes() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_graph(&mut a, &sample_graph()).expect("write a");
        write_graph(&mut b, &sample_graph()).expect("write b");
        assert_eq!(a, b, "field ordering must be deterministic");
    }

    #[test]
    fn truncated_stream_is_a_decode_error() {
        let mut buf = Vec::new();
        write_graph(&mut buf, &sample_graph()).expect("write graph");
        buf.truncate(buf.len() / 2);
        let err = read_graph(&mut buf.as_slice()).expect_err("must fail");
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn unknown_tag_is_a_decode_error() {
        // node_count = 0, then a bogus tag for the root value.
        let buf = vec![0, 0, 0, 0, 0xEE];
        let err = read_graph(&mut buf.as_slice()).expect_err("must fail");
        match err {
            StoreError::Decode(msg) => assert!(msg.contains("unknown value tag"), "got: {msg}"),
            other => panic!("expected StoreError::Decode, got {other:?}"),
        }
    }

    #[test]
    fn oversized_length_prefix_fails_without_a_matching_allocation() {
        // node_count = 0, then a bytes value claiming 4 GiB with three
        // bytes actually present.
        let mut buf = vec![0, 0, 0, 0];
        buf.push(TAG_BYTES);
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&[1, 2, 3]);
        let err = read_graph(&mut buf.as_slice()).expect_err("must fail");
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn non_utf8_string_is_a_decode_error() {
        let mut buf = Vec::new();
        // node_count = 0, then a string value with invalid UTF-8 bytes.
        buf.extend_from_slice(&[0, 0, 0, 0]);
        buf.push(TAG_STR);
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0xFF, 0xFE]);
        let err = read_graph(&mut buf.as_slice()).expect_err("must fail");
        assert!(matches!(err, StoreError::Decode(_)), "got {err:?}");
    }
}
