//! Bits module: encoder for bit-string sub-bin operations.
//!
//! Byte and bit offsets are signed: a negative offset addresses from the end
//! of the bin, consistent with the wire protocol. Arithmetic operations take
//! an overflow action, defaulting to fail.

use crate::descriptor::{OperationDescriptor, Params};
use crate::opcode;
use crate::ops::{CompiledOperation, OpArgs};
use crate::policy::BitPolicy;
use crate::{OpError, OpResult};
use serde::{Deserialize, Serialize};

/// Behavior of `BIT_ADD`/`BIT_SUBTRACT` when the result does not fit the
/// addressed bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitOverflowAction {
    #[default]
    Fail,
    Saturate,
    Wrap,
}

impl BitOverflowAction {
    fn from_wire(v: i64) -> OpResult<BitOverflowAction> {
        match v {
            0 => Ok(BitOverflowAction::Fail),
            1 => Ok(BitOverflowAction::Saturate),
            2 => Ok(BitOverflowAction::Wrap),
            other => Err(OpError::param(format!(
                "unknown overflow action {other}"
            ))),
        }
    }
}

/// Typed arguments of a compiled bit-string operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BitArgs {
    Resize { policy: BitPolicy, byte_size: i64, flags: u32 },
    Insert { policy: BitPolicy, byte_offset: i64, value: Vec<u8> },
    Remove { policy: BitPolicy, byte_offset: i64, byte_size: i64 },
    Set { policy: BitPolicy, bit_offset: i64, bit_size: i64, value: Vec<u8> },
    Or { policy: BitPolicy, bit_offset: i64, bit_size: i64, value: Vec<u8> },
    Xor { policy: BitPolicy, bit_offset: i64, bit_size: i64, value: Vec<u8> },
    And { policy: BitPolicy, bit_offset: i64, bit_size: i64, value: Vec<u8> },
    Not { policy: BitPolicy, bit_offset: i64, bit_size: i64 },
    Lshift { policy: BitPolicy, bit_offset: i64, bit_size: i64, shift: i64 },
    Rshift { policy: BitPolicy, bit_offset: i64, bit_size: i64, shift: i64 },
    Add {
        policy: BitPolicy,
        bit_offset: i64,
        bit_size: i64,
        delta: i64,
        signed: bool,
        action: BitOverflowAction,
    },
    Subtract {
        policy: BitPolicy,
        bit_offset: i64,
        bit_size: i64,
        delta: i64,
        signed: bool,
        action: BitOverflowAction,
    },
    SetInt { policy: BitPolicy, bit_offset: i64, bit_size: i64, value: i64 },
    Get { bit_offset: i64, bit_size: i64 },
    Count { bit_offset: i64, bit_size: i64 },
    /// Scan for the first bit equal to `value`, counting from the end of the
    /// addressed range. Both `BIT_LSCAN` and `BIT_RSCAN` compile to this
    /// primitive for wire compatibility.
    Scan { bit_offset: i64, bit_size: i64, value: bool },
    GetInt { bit_offset: i64, bit_size: i64, signed: bool },
}

struct OpSpec {
    name: &'static str,
    handler: fn(&mut Params) -> OpResult<BitArgs>,
}

static TABLE: &[OpSpec] = &[
    OpSpec { name: "BIT_RESIZE", handler: resize },
    OpSpec { name: "BIT_INSERT", handler: insert },
    OpSpec { name: "BIT_REMOVE", handler: remove },
    OpSpec { name: "BIT_SET", handler: set },
    OpSpec { name: "BIT_OR", handler: or },
    OpSpec { name: "BIT_XOR", handler: xor },
    OpSpec { name: "BIT_AND", handler: and },
    OpSpec { name: "BIT_NOT", handler: not },
    OpSpec { name: "BIT_LSHIFT", handler: lshift },
    OpSpec { name: "BIT_RSHIFT", handler: rshift },
    OpSpec { name: "BIT_ADD", handler: add },
    OpSpec { name: "BIT_SUBTRACT", handler: subtract },
    OpSpec { name: "BIT_SET_INT", handler: set_int },
    OpSpec { name: "BIT_GET", handler: get },
    OpSpec { name: "BIT_COUNT", handler: count },
    OpSpec { name: "BIT_LSCAN", handler: scan },
    OpSpec { name: "BIT_RSCAN", handler: scan },
    OpSpec { name: "BIT_GET_INT", handler: get_int },
];

pub(crate) fn encode(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
    let OperationDescriptor {
        op,
        bin,
        mut params,
        ..
    } = desc;
    let spec = TABLE.get(opcode::index_of(op)).ok_or_else(|| {
        OpError::param(format!("opcode {op:#06x} is out of range for the bit table"))
    })?;
    let ctx = params.take_context().map_err(|e| e.label(spec.name))?;
    let args = (spec.handler)(&mut params).map_err(|e| e.label(spec.name))?;
    Ok(CompiledOperation {
        opcode: op,
        bin,
        ctx,
        args: OpArgs::Bit(args),
    })
}

fn resize(params: &mut Params) -> OpResult<BitArgs> {
    let policy = params.take_bit_policy()?;
    let byte_size = params.req_int("byteSize")?;
    let flags = match params.opt_int("resizeFlags")? {
        None => 0,
        Some(flags) if (0..=i64::from(u32::MAX)).contains(&flags) => flags as u32,
        Some(other) => {
            return Err(OpError::param(format!("resizeFlags {other} is out of range")))
        }
    };
    Ok(BitArgs::Resize { policy, byte_size, flags })
}

fn insert(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Insert {
        policy: params.take_bit_policy()?,
        byte_offset: params.req_int("byteOffset")?,
        value: params.req_bytes("value")?,
    })
}

fn remove(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Remove {
        policy: params.take_bit_policy()?,
        byte_offset: params.req_int("byteOffset")?,
        byte_size: params.req_int("byteSize")?,
    })
}

fn set(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Set {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        value: params.req_bytes("value")?,
    })
}

fn or(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Or {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        value: params.req_bytes("value")?,
    })
}

fn xor(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Xor {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        value: params.req_bytes("value")?,
    })
}

fn and(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::And {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        value: params.req_bytes("value")?,
    })
}

fn not(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Not {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
    })
}

fn lshift(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Lshift {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        shift: params.req_int("shift")?,
    })
}

fn rshift(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Rshift {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        shift: params.req_int("shift")?,
    })
}

fn arithmetic(params: &mut Params) -> OpResult<(BitPolicy, i64, i64, i64, bool, BitOverflowAction)> {
    let policy = params.take_bit_policy()?;
    let bit_offset = params.req_int("bitOffset")?;
    let bit_size = params.req_int("bitSize")?;
    let delta = params.req_int("value")?;
    let signed = params.opt_bool("signed")?.unwrap_or(false);
    let action = match params.opt_int("overflowAction")? {
        None => BitOverflowAction::Fail,
        Some(v) => BitOverflowAction::from_wire(v)?,
    };
    Ok((policy, bit_offset, bit_size, delta, signed, action))
}

fn add(params: &mut Params) -> OpResult<BitArgs> {
    let (policy, bit_offset, bit_size, delta, signed, action) = arithmetic(params)?;
    Ok(BitArgs::Add { policy, bit_offset, bit_size, delta, signed, action })
}

fn subtract(params: &mut Params) -> OpResult<BitArgs> {
    let (policy, bit_offset, bit_size, delta, signed, action) = arithmetic(params)?;
    Ok(BitArgs::Subtract { policy, bit_offset, bit_size, delta, signed, action })
}

fn set_int(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::SetInt {
        policy: params.take_bit_policy()?,
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        value: params.req_int("value")?,
    })
}

fn get(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Get {
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
    })
}

fn count(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Count {
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
    })
}

fn scan(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::Scan {
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        value: params.req_bool("value")?,
    })
}

fn get_int(params: &mut Params) -> OpResult<BitArgs> {
    Ok(BitArgs::GetInt {
        bit_offset: params.req_int("bitOffset")?,
        bit_size: params.req_int("bitSize")?,
        signed: params.opt_bool("signed")?.unwrap_or(false),
    })
}
