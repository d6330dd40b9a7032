//! List module: encoder for ordered-list sub-bin operations.
//!
//! Every handler consumes one descriptor and appends exactly one compiled
//! operation, or fails without side effects. Range operations are two-mode:
//! a missing `count` means "from the start index to the end of the list".

use crate::descriptor::{OperationDescriptor, Params};
use crate::opcode;
use crate::ops::{CompiledOperation, OpArgs};
use crate::policy::{ListOrder, ListPolicy};
use crate::{OpError, OpResult, Value};

/// Element selector shared by the get-by/remove-by operation pairs.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ListSelector {
    Index { index: i64 },
    IndexRange { index: i64, count: Option<i64> },
    Rank { rank: i64 },
    RankRange { rank: i64, count: Option<i64> },
    Value { value: Value },
    ValueList { values: Vec<Value> },
    ValueRange { begin: Option<Value>, end: Option<Value> },
    ValueRelRankRange { value: Value, rank: i64, count: Option<i64> },
}

/// Typed arguments of a compiled list operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ListArgs {
    SetOrder { order: ListOrder },
    Sort { flags: u32 },
    Append { policy: ListPolicy, value: Value },
    AppendItems { policy: ListPolicy, values: Vec<Value> },
    Insert { policy: ListPolicy, index: i64, value: Value },
    InsertItems { policy: ListPolicy, index: i64, values: Vec<Value> },
    Pop { index: i64 },
    PopRange { index: i64, count: Option<i64> },
    Remove { index: i64 },
    RemoveRange { index: i64, count: Option<i64> },
    Set { policy: ListPolicy, index: i64, value: Value },
    Trim { index: i64, count: i64 },
    Clear,
    Increment { policy: ListPolicy, index: i64, delta: Value },
    Size,
    Get { index: i64 },
    GetRange { index: i64, count: Option<i64> },
    GetBy { selector: ListSelector, return_type: u32 },
    RemoveBy { selector: ListSelector, return_type: u32 },
}

struct OpSpec {
    name: &'static str,
    handler: fn(&mut Params) -> OpResult<ListArgs>,
}

static TABLE: &[OpSpec] = &[
    OpSpec { name: "LIST_SET_ORDER", handler: set_order },
    OpSpec { name: "LIST_SORT", handler: sort },
    OpSpec { name: "LIST_APPEND", handler: append },
    OpSpec { name: "LIST_APPEND_ITEMS", handler: append_items },
    OpSpec { name: "LIST_INSERT", handler: insert },
    OpSpec { name: "LIST_INSERT_ITEMS", handler: insert_items },
    OpSpec { name: "LIST_POP", handler: pop },
    OpSpec { name: "LIST_POP_RANGE", handler: pop_range },
    OpSpec { name: "LIST_REMOVE", handler: remove },
    OpSpec { name: "LIST_REMOVE_RANGE", handler: remove_range },
    OpSpec { name: "LIST_SET", handler: set },
    OpSpec { name: "LIST_TRIM", handler: trim },
    OpSpec { name: "LIST_CLEAR", handler: clear },
    OpSpec { name: "LIST_INCREMENT", handler: increment },
    OpSpec { name: "LIST_SIZE", handler: size },
    OpSpec { name: "LIST_GET", handler: get },
    OpSpec { name: "LIST_GET_RANGE", handler: get_range },
    OpSpec { name: "LIST_GET_BY_INDEX", handler: get_by_index },
    OpSpec { name: "LIST_GET_BY_INDEX_RANGE", handler: get_by_index_range },
    OpSpec { name: "LIST_GET_BY_RANK", handler: get_by_rank },
    OpSpec { name: "LIST_GET_BY_RANK_RANGE", handler: get_by_rank_range },
    OpSpec { name: "LIST_GET_BY_VALUE", handler: get_by_value },
    OpSpec { name: "LIST_GET_BY_VALUE_LIST", handler: get_by_value_list },
    OpSpec { name: "LIST_GET_BY_VALUE_RANGE", handler: get_by_value_range },
    OpSpec {
        name: "LIST_GET_BY_VALUE_REL_RANK_RANGE",
        handler: get_by_value_rel_rank_range,
    },
    OpSpec { name: "LIST_REMOVE_BY_INDEX", handler: remove_by_index },
    OpSpec { name: "LIST_REMOVE_BY_INDEX_RANGE", handler: remove_by_index_range },
    OpSpec { name: "LIST_REMOVE_BY_RANK", handler: remove_by_rank },
    OpSpec { name: "LIST_REMOVE_BY_RANK_RANGE", handler: remove_by_rank_range },
    OpSpec { name: "LIST_REMOVE_BY_VALUE", handler: remove_by_value },
    OpSpec { name: "LIST_REMOVE_BY_VALUE_LIST", handler: remove_by_value_list },
    OpSpec { name: "LIST_REMOVE_BY_VALUE_RANGE", handler: remove_by_value_range },
    OpSpec {
        name: "LIST_REMOVE_BY_VALUE_REL_RANK_RANGE",
        handler: remove_by_value_rel_rank_range,
    },
];

pub(crate) fn encode(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
    let OperationDescriptor {
        op,
        bin,
        mut params,
        ..
    } = desc;
    let spec = TABLE.get(opcode::index_of(op)).ok_or_else(|| {
        OpError::param(format!("opcode {op:#06x} is out of range for the list table"))
    })?;
    let ctx = params.take_context().map_err(|e| e.label(spec.name))?;
    let args = (spec.handler)(&mut params).map_err(|e| e.label(spec.name))?;
    Ok(CompiledOperation {
        opcode: op,
        bin,
        ctx,
        args: OpArgs::List(args),
    })
}

fn set_order(params: &mut Params) -> OpResult<ListArgs> {
    let order = ListOrder::from_wire(params.req_int("order")?)?;
    Ok(ListArgs::SetOrder { order })
}

fn sort(params: &mut Params) -> OpResult<ListArgs> {
    let flags = match params.opt_int("sortFlags")? {
        None => 0,
        Some(flags) if (0..=i64::from(u32::MAX)).contains(&flags) => flags as u32,
        Some(other) => {
            return Err(OpError::param(format!("sortFlags {other} is out of range")))
        }
    };
    Ok(ListArgs::Sort { flags })
}

fn append(params: &mut Params) -> OpResult<ListArgs> {
    let policy = params.take_list_policy()?;
    let value = params.req_value("value")?;
    Ok(ListArgs::Append { policy, value })
}

fn append_items(params: &mut Params) -> OpResult<ListArgs> {
    let policy = params.take_list_policy()?;
    let values = params.req_list("values")?;
    Ok(ListArgs::AppendItems { policy, values })
}

fn insert(params: &mut Params) -> OpResult<ListArgs> {
    let policy = params.take_list_policy()?;
    let index = params.req_int("index")?;
    let value = params.req_value("value")?;
    Ok(ListArgs::Insert { policy, index, value })
}

fn insert_items(params: &mut Params) -> OpResult<ListArgs> {
    let policy = params.take_list_policy()?;
    let index = params.req_int("index")?;
    let values = params.req_list("values")?;
    Ok(ListArgs::InsertItems { policy, index, values })
}

fn pop(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::Pop {
        index: params.req_int("index")?,
    })
}

fn pop_range(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::PopRange {
        index: params.req_int("index")?,
        count: params.opt_int("count")?,
    })
}

fn remove(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::Remove {
        index: params.req_int("index")?,
    })
}

fn remove_range(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::RemoveRange {
        index: params.req_int("index")?,
        count: params.opt_int("count")?,
    })
}

fn set(params: &mut Params) -> OpResult<ListArgs> {
    let policy = params.take_list_policy()?;
    let index = params.req_int("index")?;
    let value = params.req_value("value")?;
    Ok(ListArgs::Set { policy, index, value })
}

fn trim(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::Trim {
        index: params.req_int("index")?,
        count: params.req_int("count")?,
    })
}

fn clear(_params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::Clear)
}

fn increment(params: &mut Params) -> OpResult<ListArgs> {
    let policy = params.take_list_policy()?;
    let index = params.req_int("index")?;
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
    Ok(ListArgs::Increment { policy, index, delta })
}

fn size(_params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::Size)
}

fn get(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::Get {
        index: params.req_int("index")?,
    })
}

fn get_range(params: &mut Params) -> OpResult<ListArgs> {
    Ok(ListArgs::GetRange {
        index: params.req_int("index")?,
        count: params.opt_int("count")?,
    })
}

// Selector extractors shared by the get-by/remove-by pairs.

fn sel_index(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::Index {
        index: params.req_int("index")?,
    })
}

fn sel_index_range(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::IndexRange {
        index: params.req_int("index")?,
        count: params.opt_int("count")?,
    })
}

fn sel_rank(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::Rank {
        rank: params.req_int("rank")?,
    })
}

fn sel_rank_range(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::RankRange {
        rank: params.req_int("rank")?,
        count: params.opt_int("count")?,
    })
}

fn sel_value(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::Value {
        value: params.req_value("value")?,
    })
}

fn sel_value_list(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::ValueList {
        values: params.req_list("values")?,
    })
}

fn sel_value_range(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::ValueRange {
        begin: params.take("begin").filter(|v| !v.is_nil()),
        end: params.take("end").filter(|v| !v.is_nil()),
    })
}

fn sel_value_rel_rank_range(params: &mut Params) -> OpResult<ListSelector> {
    Ok(ListSelector::ValueRelRankRange {
        value: params.req_value("value")?,
        rank: params.req_int("rank")?,
        count: params.opt_int("count")?,
    })
}

macro_rules! by_selector {
    ($($get:ident, $remove:ident => $sel:ident;)*) => {
        $(
            fn $get(params: &mut Params) -> OpResult<ListArgs> {
                let selector = $sel(params)?;
                let return_type = params.take_return_type()?;
                Ok(ListArgs::GetBy { selector, return_type })
            }

            fn $remove(params: &mut Params) -> OpResult<ListArgs> {
                let selector = $sel(params)?;
                let return_type = params.take_return_type()?;
                Ok(ListArgs::RemoveBy { selector, return_type })
            }
        )*
    };
}

by_selector! {
    get_by_index, remove_by_index => sel_index;
    get_by_index_range, remove_by_index_range => sel_index_range;
    get_by_rank, remove_by_rank => sel_rank;
    get_by_rank_range, remove_by_rank_range => sel_rank_range;
    get_by_value, remove_by_value => sel_value;
    get_by_value_list, remove_by_value_list => sel_value_list;
    get_by_value_range, remove_by_value_range => sel_value_range;
    get_by_value_rel_rank_range, remove_by_value_rel_rank_range => sel_value_rel_rank_range;
}
