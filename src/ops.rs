//! Ops module: the strongly-typed compiled operations and the operation list.
//!
//! A [`CompiledOperation`] is the validated result of encoding one
//! descriptor. The list is owned by the compiling call and never mutated
//! after compilation returns; it is handed to the execution layer by value.

use crate::bits::BitArgs;
use crate::exprc::ExprArgs;
use crate::hll::HllArgs;
use crate::list::ListArgs;
use crate::map::MapArgs;
use crate::scalar::ScalarArgs;
use crate::CdtContextPath;

/// Typed arguments of a compiled operation, one variant per encoder family.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum OpArgs {
    Scalar(ScalarArgs),
    List(ListArgs),
    Map(MapArgs),
    Bit(BitArgs),
    Hll(HllArgs),
    Expr(ExprArgs),
}

/// One validated, fully-resolved operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    /// The namespaced opcode this operation was compiled from.
    pub opcode: u32,
    /// Target bin name, owned by the operation.
    pub bin: String,
    /// Resolved nested-collection path; empty for whole-bin operations.
    pub ctx: CdtContextPath,
    /// Family-specific typed arguments.
    pub args: OpArgs,
}

/// The ordered, immutable result of compiling a descriptor sequence.
///
/// Order is preserved from the input: execution order matters for bins read
/// after being written within the same list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationList {
    ops: Vec<CompiledOperation>,
}

impl OperationList {
    pub(crate) fn from_ops(ops: Vec<CompiledOperation>) -> Self {
        Self { ops }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CompiledOperation> {
        self.ops.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledOperation> {
        self.ops.iter()
    }

    /// Transfers ownership of the compiled operations to the execution layer.
    pub fn into_vec(self) -> Vec<CompiledOperation> {
        self.ops
    }
}

impl IntoIterator for OperationList {
    type Item = CompiledOperation;
    type IntoIter = std::vec::IntoIter<CompiledOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a OperationList {
    type Item = &'a CompiledOperation;
    type IntoIter = std::slice::Iter<'a, CompiledOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
