//! Scalar module: encoder for whole-bin read/write operations.
//!
//! Seven opcodes. `READ`, `TOUCH` and `DELETE` need no value; the other four
//! take a `value` parameter whose dynamic type determines the wire
//! representation, or a type error if no encoding is defined.

use crate::descriptor::{OperationDescriptor, Params};
use crate::opcode;
use crate::ops::{CompiledOperation, OpArgs};
use crate::{CdtContextPath, OpError, OpResult, Value};

/// Typed arguments of a compiled scalar operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScalarArgs {
    /// Full-value write; every value kind has a defined encoding.
    Write { value: Value },
    Read,
    /// Numeric increment; integer or float deltas only.
    Incr { delta: Value },
    Prepend { value: Value },
    Append { value: Value },
    Touch { ttl: Option<u32> },
    Delete,
}

struct OpSpec {
    name: &'static str,
    handler: fn(&mut Params) -> OpResult<ScalarArgs>,
}

static TABLE: &[OpSpec] = &[
    OpSpec { name: "WRITE", handler: write },
    OpSpec { name: "READ", handler: read },
    OpSpec { name: "INCR", handler: incr },
    OpSpec { name: "PREPEND", handler: prepend },
    OpSpec { name: "APPEND", handler: append },
    OpSpec { name: "TOUCH", handler: touch },
    OpSpec { name: "DELETE", handler: delete },
];

pub(crate) fn encode(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
    let OperationDescriptor {
        op,
        bin,
        mut params,
        ..
    } = desc;
    let spec = TABLE.get(opcode::index_of(op)).ok_or_else(|| {
        OpError::param(format!("opcode {op:#06x} is out of range for the scalar table"))
    })?;
    let args = (spec.handler)(&mut params).map_err(|e| e.label(spec.name))?;
    Ok(CompiledOperation {
        opcode: op,
        bin,
        ctx: CdtContextPath::new(),
        args: OpArgs::Scalar(args),
    })
}

fn write(params: &mut Params) -> OpResult<ScalarArgs> {
    let value = params.req_value("value")?;
    Ok(ScalarArgs::Write { value })
}

fn read(_params: &mut Params) -> OpResult<ScalarArgs> {
    Ok(ScalarArgs::Read)
}

fn incr(params: &mut Params) -> OpResult<ScalarArgs> {
    let delta = params.req_value("value")?;
    match delta {
        Value::Int(_) | Value::Float(_) => Ok(ScalarArgs::Incr { delta }),
        other => Err(OpError::mistyped(format!(
            "cannot increment by a {} value",
            other.type_name()
        ))),
    }
}

fn prepend(params: &mut Params) -> OpResult<ScalarArgs> {
    let value = string_like(params.req_value("value")?, "prepend")?;
    Ok(ScalarArgs::Prepend { value })
}

fn append(params: &mut Params) -> OpResult<ScalarArgs> {
    let value = string_like(params.req_value("value")?, "append")?;
    Ok(ScalarArgs::Append { value })
}

fn touch(params: &mut Params) -> OpResult<ScalarArgs> {
    let ttl = match params.opt_int("ttl")? {
        None => None,
        Some(ttl) if (0..=i64::from(u32::MAX)).contains(&ttl) => Some(ttl as u32),
        Some(other) => {
            return Err(OpError::param(format!("ttl {other} is out of range")))
        }
    };
    Ok(ScalarArgs::Touch { ttl })
}

fn delete(_params: &mut Params) -> OpResult<ScalarArgs> {
    Ok(ScalarArgs::Delete)
}

fn string_like(value: Value, what: &str) -> OpResult<Value> {
    match value {
        Value::Str(_) | Value::Bytes(_) => Ok(value),
        other => Err(OpError::mistyped(format!(
            "cannot {what} a {} value",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::SCALAR_NAMES;

    fn encode_one(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
        encode(desc)
    }

    #[test]
    fn test_table_matches_published_names() {
        assert_eq!(TABLE.len(), SCALAR_NAMES.len());
        for (spec, name) in TABLE.iter().zip(SCALAR_NAMES) {
            assert_eq!(spec.name, *name);
        }
    }

    #[test]
    fn test_write_accepts_every_value_kind() {
        for value in [
            Value::Nil,
            Value::Bool(true),
            Value::Int(42),
            Value::Float(1.5),
            Value::Str("s".into()),
            Value::Bytes(vec![1, 2]),
            Value::List(vec![Value::Int(1)]),
            Value::Map(vec![(Value::Str("k".into()), Value::Int(1))]),
            Value::Geo("{\"type\":\"Point\"}".into()),
        ] {
            let desc =
                OperationDescriptor::new(opcode::WRITE, "x").param("value", value.clone());
            let op = encode_one(desc).unwrap();
            assert_eq!(op.args, OpArgs::Scalar(ScalarArgs::Write { value }));
        }
    }

    #[test]
    fn test_write_int_scenario() {
        let desc = OperationDescriptor::new(opcode::WRITE, "x").param("value", 42i64);
        let op = encode_one(desc).unwrap();
        assert_eq!(op.opcode, opcode::WRITE);
        assert_eq!(op.bin, "x");
        assert!(op.ctx.is_empty());
        assert_eq!(
            op.args,
            OpArgs::Scalar(ScalarArgs::Write {
                value: Value::Int(42)
            })
        );
    }

    #[test]
    fn test_write_requires_value() {
        let desc = OperationDescriptor::new(opcode::WRITE, "x");
        assert!(matches!(encode_one(desc), Err(OpError::Param(_))));
    }

    #[test]
    fn test_incr_type_checking() {
        let ok = OperationDescriptor::new(opcode::INCR, "n").param("value", 1i64);
        assert!(encode_one(ok).is_ok());
        let ok = OperationDescriptor::new(opcode::INCR, "n").param("value", 0.5f64);
        assert!(encode_one(ok).is_ok());
        let bad = OperationDescriptor::new(opcode::INCR, "n").param("value", "one");
        assert!(matches!(encode_one(bad), Err(OpError::Type(_))));
    }

    #[test]
    fn test_append_prepend_type_checking() {
        let ok = OperationDescriptor::new(opcode::APPEND, "s").param("value", "tail");
        assert!(encode_one(ok).is_ok());
        let ok =
            OperationDescriptor::new(opcode::PREPEND, "s").param("value", vec![0u8, 1]);
        assert!(encode_one(ok).is_ok());
        let bad = OperationDescriptor::new(opcode::APPEND, "s").param("value", 9i64);
        assert!(matches!(encode_one(bad), Err(OpError::Type(_))));
    }

    #[test]
    fn test_touch_ttl() {
        let desc = OperationDescriptor::new(opcode::TOUCH, "any").param("ttl", 300i64);
        let op = encode_one(desc).unwrap();
        assert_eq!(
            op.args,
            OpArgs::Scalar(ScalarArgs::Touch { ttl: Some(300) })
        );
        let desc = OperationDescriptor::new(opcode::TOUCH, "any");
        let op = encode_one(desc).unwrap();
        assert_eq!(op.args, OpArgs::Scalar(ScalarArgs::Touch { ttl: None }));
        let desc = OperationDescriptor::new(opcode::TOUCH, "any").param("ttl", -1i64);
        assert!(matches!(encode_one(desc), Err(OpError::Param(_))));
    }

    #[test]
    fn test_read_delete_need_nothing() {
        assert!(encode_one(OperationDescriptor::new(opcode::READ, "x")).is_ok());
        assert!(encode_one(OperationDescriptor::new(opcode::DELETE, "x")).is_ok());
    }

    #[test]
    fn test_out_of_range_index() {
        let desc = OperationDescriptor::new(opcode::namespace::SCALAR | 0x42, "x");
        assert!(matches!(encode_one(desc), Err(OpError::Param(_))));
    }
}
