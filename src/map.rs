//! Map module: encoder for key-ordered map sub-bin operations.
//!
//! Mirrors the list encoder: one compiled operation per descriptor, policy
//! defaults applied silently, return type plus independent inversion on the
//! read/remove variants. When a policy carries both a write mode and write
//! flags, the flags win.

use crate::descriptor::{OperationDescriptor, Params};
use crate::opcode;
use crate::ops::{CompiledOperation, OpArgs};
use crate::policy::{MapOrder, MapPolicy};
use crate::{OpError, OpResult, Value};

/// Entry selector shared by the get-by/remove-by operation pairs.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MapSelector {
    Key { key: Value },
    KeyList { keys: Vec<Value> },
    KeyRange { begin: Option<Value>, end: Option<Value> },
    KeyRelIndexRange { key: Value, index: i64, count: Option<i64> },
    Value { value: Value },
    ValueList { values: Vec<Value> },
    ValueRange { begin: Option<Value>, end: Option<Value> },
    ValueRelRankRange { value: Value, rank: i64, count: Option<i64> },
    Index { index: i64 },
    IndexRange { index: i64, count: Option<i64> },
    Rank { rank: i64 },
    RankRange { rank: i64, count: Option<i64> },
}

/// Typed arguments of a compiled map operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MapArgs {
    SetPolicy { policy: MapPolicy },
    Put { policy: MapPolicy, key: Value, value: Value },
    PutItems { policy: MapPolicy, items: Vec<(Value, Value)> },
    Increment { policy: MapPolicy, key: Value, delta: Value },
    Clear,
    Size,
    GetBy { selector: MapSelector, return_type: u32 },
    RemoveBy { selector: MapSelector, return_type: u32 },
}

struct OpSpec {
    name: &'static str,
    handler: fn(&mut Params) -> OpResult<MapArgs>,
}

static TABLE: &[OpSpec] = &[
    OpSpec { name: "MAP_SET_POLICY", handler: set_policy },
    OpSpec { name: "MAP_PUT", handler: put },
    OpSpec { name: "MAP_PUT_ITEMS", handler: put_items },
    OpSpec { name: "MAP_INCREMENT", handler: increment },
    OpSpec { name: "MAP_CLEAR", handler: clear },
    OpSpec { name: "MAP_SIZE", handler: size },
    OpSpec { name: "MAP_GET_BY_KEY", handler: get_by_key },
    OpSpec { name: "MAP_GET_BY_KEY_LIST", handler: get_by_key_list },
    OpSpec { name: "MAP_GET_BY_KEY_RANGE", handler: get_by_key_range },
    OpSpec {
        name: "MAP_GET_BY_KEY_REL_INDEX_RANGE",
        handler: get_by_key_rel_index_range,
    },
    OpSpec { name: "MAP_GET_BY_VALUE", handler: get_by_value },
    OpSpec { name: "MAP_GET_BY_VALUE_LIST", handler: get_by_value_list },
    OpSpec { name: "MAP_GET_BY_VALUE_RANGE", handler: get_by_value_range },
    OpSpec {
        name: "MAP_GET_BY_VALUE_REL_RANK_RANGE",
        handler: get_by_value_rel_rank_range,
    },
    OpSpec { name: "MAP_GET_BY_INDEX", handler: get_by_index },
    OpSpec { name: "MAP_GET_BY_INDEX_RANGE", handler: get_by_index_range },
    OpSpec { name: "MAP_GET_BY_RANK", handler: get_by_rank },
    OpSpec { name: "MAP_GET_BY_RANK_RANGE", handler: get_by_rank_range },
    OpSpec { name: "MAP_REMOVE_BY_KEY", handler: remove_by_key },
    OpSpec { name: "MAP_REMOVE_BY_KEY_LIST", handler: remove_by_key_list },
    OpSpec { name: "MAP_REMOVE_BY_KEY_RANGE", handler: remove_by_key_range },
    OpSpec {
        name: "MAP_REMOVE_BY_KEY_REL_INDEX_RANGE",
        handler: remove_by_key_rel_index_range,
    },
    OpSpec { name: "MAP_REMOVE_BY_VALUE", handler: remove_by_value },
    OpSpec { name: "MAP_REMOVE_BY_VALUE_LIST", handler: remove_by_value_list },
    OpSpec { name: "MAP_REMOVE_BY_VALUE_RANGE", handler: remove_by_value_range },
    OpSpec {
        name: "MAP_REMOVE_BY_VALUE_REL_RANK_RANGE",
        handler: remove_by_value_rel_rank_range,
    },
    OpSpec { name: "MAP_REMOVE_BY_INDEX", handler: remove_by_index },
    OpSpec { name: "MAP_REMOVE_BY_INDEX_RANGE", handler: remove_by_index_range },
    OpSpec { name: "MAP_REMOVE_BY_RANK", handler: remove_by_rank },
    OpSpec { name: "MAP_REMOVE_BY_RANK_RANGE", handler: remove_by_rank_range },
];

pub(crate) fn encode(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
    let OperationDescriptor {
        op,
        bin,
        mut params,
        ..
    } = desc;
    let spec = TABLE.get(opcode::index_of(op)).ok_or_else(|| {
        OpError::param(format!("opcode {op:#06x} is out of range for the map table"))
    })?;
    let ctx = params.take_context().map_err(|e| e.label(spec.name))?;
    let args = (spec.handler)(&mut params).map_err(|e| e.label(spec.name))?;
    Ok(CompiledOperation {
        opcode: op,
        bin,
        ctx,
        args: OpArgs::Map(args),
    })
}

fn set_policy(params: &mut Params) -> OpResult<MapArgs> {
    // The policy is the whole point here, but absence still defaults.
    let policy = params.take_map_policy()?;
    Ok(MapArgs::SetPolicy { policy })
}

fn put(params: &mut Params) -> OpResult<MapArgs> {
    let policy = params.take_map_policy()?;
    let key = params.req_value("key")?;
    let value = params.req_value("value")?;
    Ok(MapArgs::Put { policy, key, value })
}

fn put_items(params: &mut Params) -> OpResult<MapArgs> {
    let policy = params.take_map_policy()?;
    let items = params.req_map("items")?;
    Ok(MapArgs::PutItems { policy, items })
}

fn increment(params: &mut Params) -> OpResult<MapArgs> {
    let policy = params.take_map_policy()?;
    let key = params.req_value("key")?;
    let delta = match params.take("value") {
        None | Some(Value::Nil) => Value::Int(1),
        Some(delta @ (Value::Int(_) | Value::Float(_))) => delta,
        Some(other) => {
            return Err(OpError::mistyped(format!(
                "cannot increment by a {} value",
                other.type_name()
            )))
        }
    };
    Ok(MapArgs::Increment { policy, key, delta })
}

fn clear(_params: &mut Params) -> OpResult<MapArgs> {
    Ok(MapArgs::Clear)
}

fn size(_params: &mut Params) -> OpResult<MapArgs> {
    Ok(MapArgs::Size)
}

// Selector extractors shared by the get-by/remove-by pairs.

fn sel_key(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::Key {
        key: params.req_value("key")?,
    })
}

fn sel_key_list(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::KeyList {
        keys: params.req_list("keys")?,
    })
}

fn sel_key_range(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::KeyRange {
        begin: params.take("begin").filter(|v| !v.is_nil()),
        end: params.take("end").filter(|v| !v.is_nil()),
    })
}

fn sel_key_rel_index_range(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::KeyRelIndexRange {
        key: params.req_value("key")?,
        index: params.req_int("index")?,
        count: params.opt_int("count")?,
    })
}

fn sel_value(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::Value {
        value: params.req_value("value")?,
    })
}

fn sel_value_list(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::ValueList {
        values: params.req_list("values")?,
    })
}

fn sel_value_range(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::ValueRange {
        begin: params.take("begin").filter(|v| !v.is_nil()),
        end: params.take("end").filter(|v| !v.is_nil()),
    })
}

fn sel_value_rel_rank_range(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::ValueRelRankRange {
        value: params.req_value("value")?,
        rank: params.req_int("rank")?,
        count: params.opt_int("count")?,
    })
}

fn sel_index(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::Index {
        index: params.req_int("index")?,
    })
}

fn sel_index_range(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::IndexRange {
        index: params.req_int("index")?,
        count: params.opt_int("count")?,
    })
}

fn sel_rank(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::Rank {
        rank: params.req_int("rank")?,
    })
}

fn sel_rank_range(params: &mut Params) -> OpResult<MapSelector> {
    Ok(MapSelector::RankRange {
        rank: params.req_int("rank")?,
        count: params.opt_int("count")?,
    })
}

macro_rules! by_selector {
    ($($get:ident, $remove:ident => $sel:ident;)*) => {
        $(
            fn $get(params: &mut Params) -> OpResult<MapArgs> {
                let selector = $sel(params)?;
                let return_type = params.take_return_type()?;
                Ok(MapArgs::GetBy { selector, return_type })
            }

            fn $remove(params: &mut Params) -> OpResult<MapArgs> {
                let selector = $sel(params)?;
                let return_type = params.take_return_type()?;
                Ok(MapArgs::RemoveBy { selector, return_type })
            }
        )*
    };
}

by_selector! {
    get_by_key, remove_by_key => sel_key;
    get_by_key_list, remove_by_key_list => sel_key_list;
    get_by_key_range, remove_by_key_range => sel_key_range;
    get_by_key_rel_index_range, remove_by_key_rel_index_range => sel_key_rel_index_range;
    get_by_value, remove_by_value => sel_value;
    get_by_value_list, remove_by_value_list => sel_value_list;
    get_by_value_range, remove_by_value_range => sel_value_range;
    get_by_value_rel_rank_range, remove_by_value_rel_rank_range => sel_value_rel_rank_range;
    get_by_index, remove_by_index => sel_index;
    get_by_index_range, remove_by_index_range => sel_index_range;
    get_by_rank, remove_by_rank => sel_rank;
    get_by_rank_range, remove_by_rank_range => sel_rank_range;
}
