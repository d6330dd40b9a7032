//! Exprc module: compiles flat filter-expression entries into one opaque
//! executable expression value, and encodes the two operations that embed a
//! compiled expression into an operation list.

use crate::descriptor::OperationDescriptor;
use crate::opcode;
use crate::ops::{CompiledOperation, OpArgs};
use crate::policy::{ListPolicy, MapPolicy};
use crate::{CdtContextPath, OpError, OpResult, Value};
use serde::{Deserialize, Serialize};

/// One loose entry of the flat expression wire format.
///
/// An entry carries an opaque expression op number, optional `count`/`size`
/// markers, and at most one payload. The payload slots mirror the published
/// wire keys; when more than one is set, the first in declaration order wins
/// (ambiguous input is tolerated, not rejected).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpressionEntry {
    pub op: u32,
    pub count: Option<u32>,
    pub size: Option<u32>,
    pub value: Option<Value>,
    pub string_val: Option<String>,
    pub bytes_val: Option<Vec<u8>>,
    pub int_val: Option<i64>,
    pub uint_val: Option<u64>,
    pub float_val: Option<f64>,
    pub bool_val: Option<bool>,
    /// A context path in its loose `[type, value]` pair form.
    pub ctx_val: Option<Value>,
    /// A list write policy in its loose map form.
    pub list_policy_val: Option<Value>,
    /// A map write policy in its loose map form.
    pub map_policy_val: Option<Value>,
}

impl ExpressionEntry {
    pub fn new(op: u32) -> Self {
        Self {
            op,
            ..Self::default()
        }
    }
}

/// Resolved payload of one compiled expression entry. Every variant owns its
/// data outright; dropping the expression releases everything it holds.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprPayload {
    None,
    Value(Value),
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Ctx(CdtContextPath),
    ListPolicy(ListPolicy),
    MapPolicy(MapPolicy),
}

/// One validated entry of a compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledEntry {
    pub op: u32,
    pub count: Option<u32>,
    pub size: Option<u32>,
    pub payload: ExprPayload,
}

/// An opaque, executable filter expression.
///
/// Owned by whichever operation or command references it; immutable once
/// compiled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    entries: Vec<CompiledEntry>,
}

impl CompiledExpression {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The validated entries, in input order; consumed by the execution
    /// layer when serializing the expression.
    pub fn entries(&self) -> &[CompiledEntry] {
        &self.entries
    }
}

pub struct ExpressionCompiler;

impl ExpressionCompiler {
    /// Compiles a flat entry sequence into one expression value.
    ///
    /// All-or-nothing: the first malformed entry fails the whole compile,
    /// attributed to its index, and nothing is produced.
    pub fn compile(entries: Vec<ExpressionEntry>) -> OpResult<CompiledExpression> {
        let mut compiled = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            compiled.push(Self::compile_entry(entry).map_err(|e| e.at("entry", index))?);
        }
        Ok(CompiledExpression { entries: compiled })
    }

    fn compile_entry(entry: ExpressionEntry) -> OpResult<CompiledEntry> {
        let ExpressionEntry {
            op,
            count,
            size,
            value,
            string_val,
            bytes_val,
            int_val,
            uint_val,
            float_val,
            bool_val,
            ctx_val,
            list_policy_val,
            map_policy_val,
        } = entry;
        // First matching payload slot wins.
        let payload = if let Some(v) = value {
            ExprPayload::Value(v)
        } else if let Some(s) = string_val {
            ExprPayload::Str(s)
        } else if let Some(b) = bytes_val {
            ExprPayload::Bytes(b)
        } else if let Some(i) = int_val {
            ExprPayload::Int(i)
        } else if let Some(u) = uint_val {
            ExprPayload::Uint(u)
        } else if let Some(f) = float_val {
            ExprPayload::Float(f)
        } else if let Some(b) = bool_val {
            ExprPayload::Bool(b)
        } else if let Some(ctx) = ctx_val {
            ExprPayload::Ctx(CdtContextPath::from_wire(&ctx)?)
        } else if let Some(p) = list_policy_val {
            ExprPayload::ListPolicy(ListPolicy::from_value(Some(p))?)
        } else if let Some(p) = map_policy_val {
            ExprPayload::MapPolicy(MapPolicy::from_value(Some(p))?)
        } else if count.is_some() || size.is_some() {
            // Structural entries (operator arity, buffer sizing) carry no
            // payload of their own.
            ExprPayload::None
        } else {
            return Err(OpError::param(format!(
                "expression entry op {op} carries no payload, count or size"
            )));
        };
        Ok(CompiledEntry {
            op,
            count,
            size,
            payload,
        })
    }
}

/// Typed arguments of a compiled expression operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprArgs {
    Write { expression: CompiledExpression, flags: u32 },
    Read { expression: CompiledExpression, flags: u32 },
}

struct OpSpec {
    name: &'static str,
    write: bool,
}

static TABLE: &[OpSpec] = &[
    OpSpec { name: "EXPR_WRITE", write: true },
    OpSpec { name: "EXPR_READ", write: false },
];

pub(crate) fn encode(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
    let OperationDescriptor {
        op,
        bin,
        mut params,
        expression,
    } = desc;
    let spec = TABLE.get(opcode::index_of(op)).ok_or_else(|| {
        OpError::param(format!(
            "opcode {op:#06x} is out of range for the expression table"
        ))
    })?;
    let expression = expression.ok_or_else(|| {
        OpError::param(format!("{}: descriptor carries no compiled expression", spec.name))
    })?;
    let flags = match params.opt_int("flags").map_err(|e| e.label(spec.name))? {
        None => 0,
        Some(flags) if (0..=i64::from(u32::MAX)).contains(&flags) => flags as u32,
        Some(other) => {
            return Err(OpError::param(format!(
                "{}: flags {other} is out of range",
                spec.name
            )))
        }
    };
    let args = if spec.write {
        ExprArgs::Write { expression, flags }
    } else {
        ExprArgs::Read { expression, flags }
    };
    Ok(CompiledOperation {
        opcode: op,
        bin,
        ctx: CdtContextPath::new(),
        args: OpArgs::Expr(args),
    })
}
