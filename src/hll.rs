//! Hll module: encoder for approximate-count (HyperLogLog) bin operations.

use crate::descriptor::{OperationDescriptor, Params};
use crate::opcode;
use crate::ops::{CompiledOperation, OpArgs};
use crate::policy::HllPolicy;
use crate::{OpError, OpResult, Value};

/// Typed arguments of a compiled HyperLogLog operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HllArgs {
    Init {
        policy: HllPolicy,
        index_bits: i64,
        minhash_bits: Option<i64>,
    },
    Add {
        policy: HllPolicy,
        values: Vec<Value>,
        index_bits: Option<i64>,
        minhash_bits: Option<i64>,
    },
    SetUnion { policy: HllPolicy, values: Vec<Value> },
    RefreshCount,
    Fold { index_bits: i64 },
    GetCount,
    GetUnion { values: Vec<Value> },
    GetUnionCount { values: Vec<Value> },
    GetIntersectCount { values: Vec<Value> },
    GetSimilarity { values: Vec<Value> },
    Describe,
}

struct OpSpec {
    name: &'static str,
    handler: fn(&mut Params) -> OpResult<HllArgs>,
}

static TABLE: &[OpSpec] = &[
    OpSpec { name: "HLL_INIT", handler: init },
    OpSpec { name: "HLL_ADD", handler: add },
    OpSpec { name: "HLL_SET_UNION", handler: set_union },
    OpSpec { name: "HLL_REFRESH_COUNT", handler: refresh_count },
    OpSpec { name: "HLL_FOLD", handler: fold },
    OpSpec { name: "HLL_GET_COUNT", handler: get_count },
    OpSpec { name: "HLL_GET_UNION", handler: get_union },
    OpSpec { name: "HLL_GET_UNION_COUNT", handler: get_union_count },
    OpSpec { name: "HLL_GET_INTERSECT_COUNT", handler: get_intersect_count },
    OpSpec { name: "HLL_GET_SIMILARITY", handler: get_similarity },
    OpSpec { name: "HLL_DESCRIBE", handler: describe },
];

pub(crate) fn encode(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
    let OperationDescriptor {
        op,
        bin,
        mut params,
        ..
    } = desc;
    let spec = TABLE.get(opcode::index_of(op)).ok_or_else(|| {
        OpError::param(format!("opcode {op:#06x} is out of range for the hll table"))
    })?;
    let ctx = params.take_context().map_err(|e| e.label(spec.name))?;
    let args = (spec.handler)(&mut params).map_err(|e| e.label(spec.name))?;
    Ok(CompiledOperation {
        opcode: op,
        bin,
        ctx,
        args: OpArgs::Hll(args),
    })
}

fn init(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::Init {
        policy: params.take_hll_policy()?,
        index_bits: params.req_int("indexBits")?,
        minhash_bits: params.opt_int("minhashBits")?,
    })
}

fn add(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::Add {
        policy: params.take_hll_policy()?,
        values: params.req_list("values")?,
        index_bits: params.opt_int("indexBits")?,
        minhash_bits: params.opt_int("minhashBits")?,
    })
}

fn set_union(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::SetUnion {
        policy: params.take_hll_policy()?,
        values: hll_list(params)?,
    })
}

fn refresh_count(_params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::RefreshCount)
}

fn fold(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::Fold {
        index_bits: params.req_int("indexBits")?,
    })
}

fn get_count(_params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::GetCount)
}

fn get_union(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::GetUnion { values: hll_list(params)? })
}

fn get_union_count(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::GetUnionCount { values: hll_list(params)? })
}

fn get_intersect_count(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::GetIntersectCount { values: hll_list(params)? })
}

fn get_similarity(params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::GetSimilarity { values: hll_list(params)? })
}

fn describe(_params: &mut Params) -> OpResult<HllArgs> {
    Ok(HllArgs::Describe)
}

// Union-style operations combine previously stored sketches, handed over as
// a list of byte buffers.
fn hll_list(params: &mut Params) -> OpResult<Vec<Value>> {
    let values = params.req_list("values")?;
    for value in &values {
        if !matches!(value, Value::Bytes(_)) {
            return Err(OpError::mistyped(format!(
                "sketch operands must be byte buffers, got {}",
                value.type_name()
            )));
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::HLL_NAMES;
    use crate::policy::hll_write_flags;

    #[test]
    fn test_table_matches_published_names() {
        assert_eq!(TABLE.len(), HLL_NAMES.len());
        for (spec, name) in TABLE.iter().zip(HLL_NAMES) {
            assert_eq!(spec.name, *name);
        }
    }

    #[test]
    fn test_init() {
        let policy = Value::Map(vec![(
            Value::Str("writeFlags".into()),
            Value::Int(i64::from(hll_write_flags::CREATE_ONLY)),
        )]);
        let op = encode(
            OperationDescriptor::new(opcode::HLL_INIT, "h")
                .param("indexBits", 10i64)
                .param("policy", policy),
        )
        .unwrap();
        assert_eq!(
            op.args,
            OpArgs::Hll(HllArgs::Init {
                policy: HllPolicy {
                    flags: hll_write_flags::CREATE_ONLY
                },
                index_bits: 10,
                minhash_bits: None
            })
        );
    }

    #[test]
    fn test_add_values() {
        let op = encode(
            OperationDescriptor::new(opcode::HLL_ADD, "h")
                .param("values", Value::List(vec![Value::Str("a".into())]))
                .param("indexBits", 8i64),
        )
        .unwrap();
        assert_eq!(
            op.args,
            OpArgs::Hll(HllArgs::Add {
                policy: HllPolicy::default(),
                values: vec![Value::Str("a".into())],
                index_bits: Some(8),
                minhash_bits: None
            })
        );
    }

    #[test]
    fn test_union_operands_must_be_sketches() {
        let err = encode(
            OperationDescriptor::new(opcode::HLL_GET_UNION, "h")
                .param("values", Value::List(vec![Value::Int(1)])),
        )
        .unwrap_err();
        assert!(matches!(err, OpError::Type(_)));
        let ok = encode(
            OperationDescriptor::new(opcode::HLL_GET_UNION, "h")
                .param("values", Value::List(vec![Value::Bytes(vec![0x11])])),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_fold_requires_index_bits() {
        let err = encode(OperationDescriptor::new(opcode::HLL_FOLD, "h")).unwrap_err();
        assert_eq!(
            err,
            OpError::Param("HLL_FOLD: missing required parameter 'indexBits'".into())
        );
    }

    #[test]
    fn test_parameterless_operations() {
        for op in [
            opcode::HLL_REFRESH_COUNT,
            opcode::HLL_GET_COUNT,
            opcode::HLL_DESCRIBE,
        ] {
            assert!(encode(OperationDescriptor::new(op, "h")).is_ok());
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let desc = OperationDescriptor::new(opcode::namespace::HLL | 0x20, "h");
        assert!(matches!(encode(desc), Err(OpError::Param(_))));
    }
}
