//! Context module: the nested-collection (CDT) traversal path compiler.
//!
//! A context path descends into nested lists and maps before an operation is
//! applied. The binding layer hands paths over as a loose list of
//! `[type, value]` pairs; this module compiles them into typed steps and back,
//! and provides an opaque base64 interchange form.

use crate::{OpError, OpResult, Value};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

// Base step tags, stable wire contract.
const TAG_LIST_INDEX: u8 = 0x10;
const TAG_LIST_RANK: u8 = 0x11;
const TAG_LIST_VALUE: u8 = 0x13;
const TAG_MAP_INDEX: u8 = 0x20;
const TAG_MAP_RANK: u8 = 0x21;
const TAG_MAP_KEY: u8 = 0x22;
const TAG_MAP_VALUE: u8 = 0x23;

const MODIFIER_MASK: u8 = 0xC0;

/// Creation modifier for a traversal step: creates the intermediate
/// collection if absent, with the given ordering. Only meaningful on
/// list-index and map-key steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CdtModifier {
    #[default]
    None,
    CreateUnordered,
    CreateOrderedAllowDuplicates,
    CreateOrderedUnique,
}

impl CdtModifier {
    /// Modifier bit pattern OR'd onto the base tag (wire contract).
    pub fn bits(self) -> u8 {
        match self {
            CdtModifier::None => 0x00,
            CdtModifier::CreateUnordered => 0x40,
            CdtModifier::CreateOrderedAllowDuplicates => 0x80,
            CdtModifier::CreateOrderedUnique => 0xC0,
        }
    }

    fn from_bits(bits: u8) -> CdtModifier {
        match bits & MODIFIER_MASK {
            0x40 => CdtModifier::CreateUnordered,
            0x80 => CdtModifier::CreateOrderedAllowDuplicates,
            0xC0 => CdtModifier::CreateOrderedUnique,
            _ => CdtModifier::None,
        }
    }
}

/// One traversal step of a context path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CdtContextStep {
    ListIndex { index: i64, create: CdtModifier },
    ListRank { rank: i64 },
    ListValue { value: Value },
    MapIndex { index: i64 },
    MapRank { rank: i64 },
    MapKey { key: Value, create: CdtModifier },
    MapValue { value: Value },
}

impl CdtContextStep {
    /// Wire tag byte, including any creation-modifier bits.
    pub fn tag(&self) -> u8 {
        match self {
            CdtContextStep::ListIndex { create, .. } => TAG_LIST_INDEX | create.bits(),
            CdtContextStep::ListRank { .. } => TAG_LIST_RANK,
            CdtContextStep::ListValue { .. } => TAG_LIST_VALUE,
            CdtContextStep::MapIndex { .. } => TAG_MAP_INDEX,
            CdtContextStep::MapRank { .. } => TAG_MAP_RANK,
            CdtContextStep::MapKey { create, .. } => TAG_MAP_KEY | create.bits(),
            CdtContextStep::MapValue { .. } => TAG_MAP_VALUE,
        }
    }

    fn payload(&self) -> Value {
        match self {
            CdtContextStep::ListIndex { index, .. } => Value::Int(*index),
            CdtContextStep::ListRank { rank } => Value::Int(*rank),
            CdtContextStep::ListValue { value } => value.clone(),
            CdtContextStep::MapIndex { index } => Value::Int(*index),
            CdtContextStep::MapRank { rank } => Value::Int(*rank),
            CdtContextStep::MapKey { key, .. } => key.clone(),
            CdtContextStep::MapValue { value } => value.clone(),
        }
    }
}

/// An ordered root-to-leaf traversal path; may be empty (operate on the bin
/// directly). Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CdtContextPath {
    steps: Vec<CdtContextStep>,
}

impl CdtContextPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<CdtContextStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[CdtContextStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Compiles the loose `[type, value]` pair list handed over by the
    /// binding layer.
    ///
    /// `Nil` yields an empty path and is not an error. A non-list container,
    /// or an item that is not a `[tag, value]` pair with an integer tag, is a
    /// parameter error. A pair with an unrecognized tag is a tolerated no-op:
    /// no step is emitted.
    pub fn from_wire(wire: &Value) -> OpResult<CdtContextPath> {
        let items = match wire {
            Value::Nil => return Ok(CdtContextPath::new()),
            Value::List(items) => items,
            other => {
                return Err(OpError::param(format!(
                    "context must be a list of [type, value] pairs, got {}",
                    other.type_name()
                )))
            }
        };
        let mut steps = Vec::with_capacity(items.len());
        for item in items {
            let pair = match item.as_list() {
                Some(pair) if pair.len() == 2 => pair,
                _ => {
                    return Err(OpError::param(
                        "context step must be a [type, value] pair".to_string(),
                    ))
                }
            };
            let Some(tag) = pair[0].as_int() else {
                return Err(OpError::param(
                    "context step type must be an integer tag".to_string(),
                ));
            };
            let Ok(tag) = u8::try_from(tag) else {
                log::warn!("skipping unrecognized context step tag {tag:#x}");
                continue;
            };
            match Self::step_from_pair(tag, &pair[1])? {
                Some(step) => steps.push(step),
                None => log::warn!("skipping unrecognized context step tag {tag:#04x}"),
            }
        }
        Ok(CdtContextPath { steps })
    }

    fn step_from_pair(tag: u8, payload: &Value) -> OpResult<Option<CdtContextStep>> {
        let base = tag & !MODIFIER_MASK;
        let create = CdtModifier::from_bits(tag);
        let step = match (base, create) {
            (TAG_LIST_INDEX, create) => CdtContextStep::ListIndex {
                index: int_payload(payload, "list index")?,
                create,
            },
            (TAG_MAP_KEY, create) => CdtContextStep::MapKey {
                key: payload.clone(),
                create,
            },
            // Modifier bits are only defined on list-index and map-key
            // steps; a modified tag of any other kind is unrecognized.
            (TAG_LIST_RANK, CdtModifier::None) => CdtContextStep::ListRank {
                rank: int_payload(payload, "list rank")?,
            },
            (TAG_LIST_VALUE, CdtModifier::None) => CdtContextStep::ListValue {
                value: payload.clone(),
            },
            (TAG_MAP_INDEX, CdtModifier::None) => CdtContextStep::MapIndex {
                index: int_payload(payload, "map index")?,
            },
            (TAG_MAP_RANK, CdtModifier::None) => CdtContextStep::MapRank {
                rank: int_payload(payload, "map rank")?,
            },
            (TAG_MAP_VALUE, CdtModifier::None) => CdtContextStep::MapValue {
                value: payload.clone(),
            },
            _ => return Ok(None),
        };
        Ok(Some(step))
    }

    /// The exact inverse of [`CdtContextPath::from_wire`].
    pub fn to_wire(&self) -> Value {
        Value::List(
            self.steps
                .iter()
                .map(|step| {
                    Value::List(vec![Value::Int(i64::from(step.tag())), step.payload()])
                })
                .collect(),
        )
    }

    /// Serializes the path into an opaque base64 string for passing contexts
    /// between calls.
    pub fn to_base64(&self) -> String {
        let mut buf = Vec::new();
        write_u32(&mut buf, self.steps.len() as u32);
        for step in &self.steps {
            buf.push(step.tag());
            write_value(&mut buf, &step.payload());
        }
        BASE64.encode(buf)
    }

    /// Decodes a path previously produced by [`CdtContextPath::to_base64`].
    ///
    /// `capacity` bounds the number of decoded steps; longer inputs are
    /// rejected with a parameter error.
    pub fn from_base64(encoded: &str, capacity: usize) -> OpResult<CdtContextPath> {
        let buf = BASE64
            .decode(encoded)
            .map_err(|e| OpError::param(format!("invalid base64 context: {e}")))?;
        let mut reader = Reader::new(&buf);
        let count = reader.read_u32()? as usize;
        if count > capacity {
            return Err(OpError::param(format!(
                "context path has {count} steps, capacity is {capacity}"
            )));
        }
        let mut steps = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = reader.read_u8()?;
            let payload = read_value(&mut reader)?;
            match Self::step_from_pair(tag, &payload)? {
                Some(step) => steps.push(step),
                None => {
                    return Err(OpError::param(format!(
                        "encoded context carries unrecognized step tag {tag:#04x}"
                    )))
                }
            }
        }
        if !reader.is_at_end() {
            return Err(OpError::param(
                "trailing bytes after encoded context".to_string(),
            ));
        }
        Ok(CdtContextPath { steps })
    }
}

fn int_payload(payload: &Value, what: &str) -> OpResult<i64> {
    payload.as_int().ok_or_else(|| {
        OpError::param(format!(
            "{what} context step requires an integer, got {}",
            payload.type_name()
        ))
    })
}

// Compact binary value encoding used only by the base64 interchange form.
// Integers travel as full big-endian i64: one unambiguous signed
// representation.

const KIND_NIL: u8 = 0;
const KIND_BOOL: u8 = 1;
const KIND_INT: u8 = 2;
const KIND_FLOAT: u8 = 3;
const KIND_STR: u8 = 4;
const KIND_BYTES: u8 = 5;
const KIND_LIST: u8 = 6;
const KIND_MAP: u8 = 7;
const KIND_GEO: u8 = 8;

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Nil => buf.push(KIND_NIL),
        Value::Bool(b) => {
            buf.push(KIND_BOOL);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(KIND_INT);
            buf.extend_from_slice(&i.to_be_bytes());
        }
        Value::Float(f) => {
            buf.push(KIND_FLOAT);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        Value::Str(s) => {
            buf.push(KIND_STR);
            write_u32(buf, s.len() as u32);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            buf.push(KIND_BYTES);
            write_u32(buf, b.len() as u32);
            buf.extend_from_slice(b);
        }
        Value::List(items) => {
            buf.push(KIND_LIST);
            write_u32(buf, items.len() as u32);
            for item in items {
                write_value(buf, item);
            }
        }
        Value::Map(pairs) => {
            buf.push(KIND_MAP);
            write_u32(buf, pairs.len() as u32);
            for (k, v) in pairs {
                write_value(buf, k);
                write_value(buf, v);
            }
        }
        Value::Geo(s) => {
            buf.push(KIND_GEO);
            write_u32(buf, s.len() as u32);
            buf.extend_from_slice(s.as_bytes());
        }
    }
}

fn read_value(reader: &mut Reader<'_>) -> OpResult<Value> {
    let kind = reader.read_u8()?;
    let value = match kind {
        KIND_NIL => Value::Nil,
        KIND_BOOL => Value::Bool(reader.read_u8()? != 0),
        KIND_INT => Value::Int(reader.read_i64()?),
        KIND_FLOAT => Value::Float(reader.read_f64()?),
        KIND_STR => Value::Str(reader.read_string()?),
        KIND_BYTES => {
            let len = reader.read_u32()? as usize;
            Value::Bytes(reader.take(len)?.to_vec())
        }
        KIND_LIST => {
            let count = reader.read_u32()? as usize;
            reader.check_remaining(count)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(reader)?);
            }
            Value::List(items)
        }
        KIND_MAP => {
            let count = reader.read_u32()? as usize;
            reader.check_remaining(count)?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let k = read_value(reader)?;
                let v = read_value(reader)?;
                pairs.push((k, v));
            }
            Value::Map(pairs)
        }
        KIND_GEO => Value::Geo(reader.read_string()?),
        other => {
            return Err(OpError::param(format!(
                "unknown value kind {other} in encoded context"
            )))
        }
    };
    Ok(value)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> OpResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| OpError::param("truncated encoded context".to_string()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> OpResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> OpResult<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_i64(&mut self) -> OpResult<i64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(bytes))
    }

    fn read_f64(&mut self) -> OpResult<f64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(f64::from_be_bytes(bytes))
    }

    fn read_string(&mut self) -> OpResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| OpError::param("encoded context string is not UTF-8".to_string()))
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    // Each collection element needs at least one kind byte, so a count
    // larger than the remaining bytes is malformed.
    fn check_remaining(&self, count: usize) -> OpResult<()> {
        if count > self.buf.len() - self.pos {
            return Err(OpError::param("truncated encoded context".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(tag: i64, payload: Value) -> Value {
        Value::List(vec![Value::Int(tag), payload])
    }

    #[test]
    fn test_nil_yields_empty_path() {
        let path = CdtContextPath::from_wire(&Value::Nil).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_from_wire_basic_steps() {
        let wire = Value::List(vec![
            pair(0x10, Value::Int(3)),
            pair(0x22, Value::Str("k".into())),
            pair(0x23, Value::Int(7)),
        ]);
        let path = CdtContextPath::from_wire(&wire).unwrap();
        assert_eq!(
            path.steps(),
            &[
                CdtContextStep::ListIndex {
                    index: 3,
                    create: CdtModifier::None
                },
                CdtContextStep::MapKey {
                    key: Value::Str("k".into()),
                    create: CdtModifier::None
                },
                CdtContextStep::MapValue {
                    value: Value::Int(7)
                },
            ]
        );
    }

    #[test]
    fn test_creation_modifiers() {
        let wire = Value::List(vec![
            pair(0x10 | 0x40, Value::Int(0)),
            pair(0x22 | 0x80, Value::Str("a".into())),
            pair(0x22 | 0xC0, Value::Str("b".into())),
        ]);
        let path = CdtContextPath::from_wire(&wire).unwrap();
        assert_eq!(
            path.steps(),
            &[
                CdtContextStep::ListIndex {
                    index: 0,
                    create: CdtModifier::CreateUnordered
                },
                CdtContextStep::MapKey {
                    key: Value::Str("a".into()),
                    create: CdtModifier::CreateOrderedAllowDuplicates
                },
                CdtContextStep::MapKey {
                    key: Value::Str("b".into()),
                    create: CdtModifier::CreateOrderedUnique
                },
            ]
        );
    }

    #[test]
    fn test_unrecognized_tag_is_skipped() {
        let wire = Value::List(vec![
            pair(0x10, Value::Int(1)),
            pair(0x99, Value::Int(0)),
            // A modifier on a rank step is not a defined combination.
            pair(0x11 | 0x40, Value::Int(2)),
            // Tags outside the byte range are no-ops too, not errors.
            pair(0x1FF, Value::Int(3)),
            pair(-1, Value::Int(3)),
            pair(0x21, Value::Int(4)),
        ]);
        let path = CdtContextPath::from_wire(&wire).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(
            path.steps()[1],
            CdtContextStep::MapRank { rank: 4 }
        );
    }

    #[test]
    fn test_malformed_container_is_param_error() {
        let err = CdtContextPath::from_wire(&Value::Int(1)).unwrap_err();
        assert!(matches!(err, OpError::Param(_)));
        let err =
            CdtContextPath::from_wire(&Value::List(vec![Value::Int(0x10)])).unwrap_err();
        assert!(matches!(err, OpError::Param(_)));
        let err = CdtContextPath::from_wire(&Value::List(vec![pair(
            0x10,
            Value::Str("not an int".into()),
        )]))
        .unwrap_err();
        assert!(matches!(err, OpError::Param(_)));
    }

    #[test]
    fn test_wire_round_trip() {
        let wire = Value::List(vec![
            pair(0x10 | 0x40, Value::Int(-2)),
            pair(0x11, Value::Int(1)),
            pair(0x13, Value::Str("v".into())),
            pair(0x20, Value::Int(0)),
            pair(0x21, Value::Int(-1)),
            pair(0x22 | 0xC0, Value::Bytes(vec![1, 2])),
            pair(0x23, Value::Float(0.5)),
        ]);
        let path = CdtContextPath::from_wire(&wire).unwrap();
        assert_eq!(path.to_wire(), wire);
        let again = CdtContextPath::from_wire(&path.to_wire()).unwrap();
        assert_eq!(again, path);
    }

    #[test]
    fn test_base64_round_trip() {
        let path = CdtContextPath::from_steps(vec![
            CdtContextStep::ListIndex {
                index: i64::MIN,
                create: CdtModifier::CreateOrderedUnique,
            },
            CdtContextStep::MapKey {
                key: Value::List(vec![Value::Int(1), Value::Nil]),
                create: CdtModifier::None,
            },
            CdtContextStep::MapValue {
                value: Value::Map(vec![(Value::Str("k".into()), Value::Bool(true))]),
            },
        ]);
        let encoded = path.to_base64();
        let decoded = CdtContextPath::from_base64(&encoded, 8).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_base64_capacity_bound() {
        let path = CdtContextPath::from_steps(vec![
            CdtContextStep::ListRank { rank: 0 },
            CdtContextStep::ListRank { rank: 1 },
        ]);
        let encoded = path.to_base64();
        let err = CdtContextPath::from_base64(&encoded, 1).unwrap_err();
        assert!(matches!(err, OpError::Param(_)));
    }

    #[test]
    fn test_base64_rejects_garbage() {
        assert!(CdtContextPath::from_base64("@@not base64@@", 8).is_err());
        // Valid base64, truncated payload.
        let truncated = BASE64.encode([0u8, 0, 0, 2, 0x11]);
        assert!(CdtContextPath::from_base64(&truncated, 8).is_err());
    }
}
