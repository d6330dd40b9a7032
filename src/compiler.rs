//! Compiler module: the opcode dispatcher assembling the final operation list.
//!
//! Routes each descriptor by its namespace byte to the owning encoder family,
//! in input order, failing fast on the first malformed descriptor. A failed
//! compile produces nothing: the partially-built list never escapes.

use crate::descriptor::OperationDescriptor;
use crate::opcode::{self, namespace};
use crate::ops::{CompiledOperation, OperationList};
use crate::{bits, exprc, hll, list, map, scalar};
use crate::{OpError, OpResult};

pub struct OperationCompiler;

impl OperationCompiler {
    /// Compiles an ordered descriptor sequence into an operation list.
    ///
    /// The i-th compiled operation corresponds to the i-th descriptor. An
    /// empty sequence is rejected. The first failure aborts the compile and
    /// is attributed to its descriptor index.
    pub fn compile(descriptors: Vec<OperationDescriptor>) -> OpResult<OperationList> {
        if descriptors.is_empty() {
            return Err(OpError::param("empty operation descriptor list"));
        }
        let mut ops = Vec::with_capacity(descriptors.len());
        for (index, desc) in descriptors.into_iter().enumerate() {
            ops.push(Self::compile_one(desc).map_err(|e| e.at("descriptor", index))?);
        }
        log::debug!("compiled {} operations", ops.len());
        Ok(OperationList::from_ops(ops))
    }

    fn compile_one(desc: OperationDescriptor) -> OpResult<CompiledOperation> {
        if desc.op & !(opcode::NAMESPACE_MASK | opcode::INDEX_MASK) != 0 {
            return Err(OpError::param(format!(
                "opcode {:#x} is out of range",
                desc.op
            )));
        }
        match opcode::namespace_of(desc.op) {
            namespace::SCALAR => scalar::encode(desc),
            namespace::LIST => list::encode(desc),
            namespace::MAP => map::encode(desc),
            namespace::BIT => bits::encode(desc),
            namespace::HLL => hll::encode(desc),
            namespace::EXPR => exprc::encode(desc),
            ns => Err(OpError::param(format!(
                "unknown opcode namespace {ns:#06x}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ListArgs;
    use crate::ops::OpArgs;
    use crate::scalar::ScalarArgs;
    use crate::Value;

    #[test]
    fn test_empty_input_is_rejected() {
        let err = OperationCompiler::compile(vec![]).unwrap_err();
        assert_eq!(err, OpError::Param("empty operation descriptor list".into()));
    }

    #[test]
    fn test_order_is_preserved() {
        let descriptors = vec![
            OperationDescriptor::new(opcode::WRITE, "a").param("value", 1i64),
            OperationDescriptor::new(opcode::LIST_APPEND, "b").param("value", 2i64),
            OperationDescriptor::new(opcode::READ, "a"),
        ];
        let list = OperationCompiler::compile(descriptors).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0).unwrap().opcode, opcode::WRITE);
        assert_eq!(list.get(0).unwrap().bin, "a");
        assert_eq!(list.get(1).unwrap().opcode, opcode::LIST_APPEND);
        assert_eq!(list.get(2).unwrap().opcode, opcode::READ);
    }

    #[test]
    fn test_fail_fast_attributes_the_offending_index() {
        let descriptors = vec![
            OperationDescriptor::new(opcode::WRITE, "a").param("value", 1i64),
            OperationDescriptor::new(opcode::WRITE, "b").param("value", 2i64),
            // Missing the required index.
            OperationDescriptor::new(opcode::LIST_GET, "l"),
        ];
        let err = OperationCompiler::compile(descriptors).unwrap_err();
        assert_eq!(
            err,
            OpError::Param(
                "descriptor 2: LIST_GET: missing required parameter 'index'".into()
            )
        );
    }

    #[test]
    fn test_routes_each_namespace() {
        let descriptors = vec![
            OperationDescriptor::new(opcode::WRITE, "s").param("value", "v"),
            OperationDescriptor::new(opcode::LIST_SIZE, "l"),
            OperationDescriptor::new(opcode::MAP_SIZE, "m"),
            OperationDescriptor::new(opcode::BIT_COUNT, "b")
                .param("bitOffset", 0i64)
                .param("bitSize", 4i64),
            OperationDescriptor::new(opcode::HLL_GET_COUNT, "h"),
        ];
        let list = OperationCompiler::compile(descriptors).unwrap();
        assert!(matches!(list.get(0).unwrap().args, OpArgs::Scalar(_)));
        assert!(matches!(list.get(1).unwrap().args, OpArgs::List(_)));
        assert!(matches!(list.get(2).unwrap().args, OpArgs::Map(_)));
        assert!(matches!(list.get(3).unwrap().args, OpArgs::Bit(_)));
        assert!(matches!(list.get(4).unwrap().args, OpArgs::Hll(_)));
    }

    #[test]
    fn test_unknown_namespace_is_rejected() {
        let descriptors = vec![OperationDescriptor::new(0x0900, "x")];
        let err = OperationCompiler::compile(descriptors).unwrap_err();
        assert!(matches!(err, OpError::Param(_)));
        let descriptors = vec![OperationDescriptor::new(0x1_0000, "x")];
        assert!(OperationCompiler::compile(descriptors).is_err());
    }

    #[test]
    fn test_scenario_scalar_then_list_range() {
        let descriptors = vec![
            OperationDescriptor::new(opcode::WRITE, "x").param("value", 42i64),
            OperationDescriptor::new(opcode::LIST_GET_RANGE, "l").param("index", 2i64),
        ];
        let list = OperationCompiler::compile(descriptors).unwrap();
        assert_eq!(
            list.get(0).unwrap().args,
            OpArgs::Scalar(ScalarArgs::Write {
                value: Value::Int(42)
            })
        );
        assert_eq!(
            list.get(1).unwrap().args,
            OpArgs::List(ListArgs::GetRange {
                index: 2,
                count: None
            })
        );
    }
}
