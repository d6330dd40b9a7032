//! Opcode module: the namespaced opcode tables shared with the binding layer.
//!
//! An opcode is a `u32` whose bits 8..=15 select a namespace and whose low
//! byte is a dense index into that namespace's operation table. The
//! name/number assignments below are a stable external contract.

/// Namespace selectors, pre-shifted into bits 8..=15.
pub mod namespace {
    pub const SCALAR: u32 = 0x0000;
    pub const LIST: u32 = 0x0100;
    pub const MAP: u32 = 0x0200;
    pub const BIT: u32 = 0x0300;
    pub const HLL: u32 = 0x0400;
    pub const EXPR: u32 = 0x0500;
}

/// Mask selecting the namespace byte of an opcode.
pub const NAMESPACE_MASK: u32 = 0xFF00;
/// Mask selecting the table index byte of an opcode.
pub const INDEX_MASK: u32 = 0x00FF;

/// Namespace byte of `op` (still shifted, compare against [`namespace`]).
pub fn namespace_of(op: u32) -> u32 {
    op & NAMESPACE_MASK
}

/// Table index encoded in the low byte of `op`.
pub fn index_of(op: u32) -> usize {
    (op & INDEX_MASK) as usize
}

// Scalar (whole-bin) operations.
pub const WRITE: u32 = namespace::SCALAR;
pub const READ: u32 = namespace::SCALAR | 1;
pub const INCR: u32 = namespace::SCALAR | 2;
pub const PREPEND: u32 = namespace::SCALAR | 3;
pub const APPEND: u32 = namespace::SCALAR | 4;
pub const TOUCH: u32 = namespace::SCALAR | 5;
pub const DELETE: u32 = namespace::SCALAR | 6;

// Ordered-list operations.
pub const LIST_SET_ORDER: u32 = namespace::LIST;
pub const LIST_SORT: u32 = namespace::LIST | 1;
pub const LIST_APPEND: u32 = namespace::LIST | 2;
pub const LIST_APPEND_ITEMS: u32 = namespace::LIST | 3;
pub const LIST_INSERT: u32 = namespace::LIST | 4;
pub const LIST_INSERT_ITEMS: u32 = namespace::LIST | 5;
pub const LIST_POP: u32 = namespace::LIST | 6;
pub const LIST_POP_RANGE: u32 = namespace::LIST | 7;
pub const LIST_REMOVE: u32 = namespace::LIST | 8;
pub const LIST_REMOVE_RANGE: u32 = namespace::LIST | 9;
pub const LIST_SET: u32 = namespace::LIST | 10;
pub const LIST_TRIM: u32 = namespace::LIST | 11;
pub const LIST_CLEAR: u32 = namespace::LIST | 12;
pub const LIST_INCREMENT: u32 = namespace::LIST | 13;
pub const LIST_SIZE: u32 = namespace::LIST | 14;
pub const LIST_GET: u32 = namespace::LIST | 15;
pub const LIST_GET_RANGE: u32 = namespace::LIST | 16;
pub const LIST_GET_BY_INDEX: u32 = namespace::LIST | 17;
pub const LIST_GET_BY_INDEX_RANGE: u32 = namespace::LIST | 18;
pub const LIST_GET_BY_RANK: u32 = namespace::LIST | 19;
pub const LIST_GET_BY_RANK_RANGE: u32 = namespace::LIST | 20;
pub const LIST_GET_BY_VALUE: u32 = namespace::LIST | 21;
pub const LIST_GET_BY_VALUE_LIST: u32 = namespace::LIST | 22;
pub const LIST_GET_BY_VALUE_RANGE: u32 = namespace::LIST | 23;
pub const LIST_GET_BY_VALUE_REL_RANK_RANGE: u32 = namespace::LIST | 24;
pub const LIST_REMOVE_BY_INDEX: u32 = namespace::LIST | 25;
pub const LIST_REMOVE_BY_INDEX_RANGE: u32 = namespace::LIST | 26;
pub const LIST_REMOVE_BY_RANK: u32 = namespace::LIST | 27;
pub const LIST_REMOVE_BY_RANK_RANGE: u32 = namespace::LIST | 28;
pub const LIST_REMOVE_BY_VALUE: u32 = namespace::LIST | 29;
pub const LIST_REMOVE_BY_VALUE_LIST: u32 = namespace::LIST | 30;
pub const LIST_REMOVE_BY_VALUE_RANGE: u32 = namespace::LIST | 31;
pub const LIST_REMOVE_BY_VALUE_REL_RANK_RANGE: u32 = namespace::LIST | 32;

// Key-ordered map operations.
pub const MAP_SET_POLICY: u32 = namespace::MAP;
pub const MAP_PUT: u32 = namespace::MAP | 1;
pub const MAP_PUT_ITEMS: u32 = namespace::MAP | 2;
pub const MAP_INCREMENT: u32 = namespace::MAP | 3;
pub const MAP_CLEAR: u32 = namespace::MAP | 4;
pub const MAP_SIZE: u32 = namespace::MAP | 5;
pub const MAP_GET_BY_KEY: u32 = namespace::MAP | 6;
pub const MAP_GET_BY_KEY_LIST: u32 = namespace::MAP | 7;
pub const MAP_GET_BY_KEY_RANGE: u32 = namespace::MAP | 8;
pub const MAP_GET_BY_KEY_REL_INDEX_RANGE: u32 = namespace::MAP | 9;
pub const MAP_GET_BY_VALUE: u32 = namespace::MAP | 10;
pub const MAP_GET_BY_VALUE_LIST: u32 = namespace::MAP | 11;
pub const MAP_GET_BY_VALUE_RANGE: u32 = namespace::MAP | 12;
pub const MAP_GET_BY_VALUE_REL_RANK_RANGE: u32 = namespace::MAP | 13;
pub const MAP_GET_BY_INDEX: u32 = namespace::MAP | 14;
pub const MAP_GET_BY_INDEX_RANGE: u32 = namespace::MAP | 15;
pub const MAP_GET_BY_RANK: u32 = namespace::MAP | 16;
pub const MAP_GET_BY_RANK_RANGE: u32 = namespace::MAP | 17;
pub const MAP_REMOVE_BY_KEY: u32 = namespace::MAP | 18;
pub const MAP_REMOVE_BY_KEY_LIST: u32 = namespace::MAP | 19;
pub const MAP_REMOVE_BY_KEY_RANGE: u32 = namespace::MAP | 20;
pub const MAP_REMOVE_BY_KEY_REL_INDEX_RANGE: u32 = namespace::MAP | 21;
pub const MAP_REMOVE_BY_VALUE: u32 = namespace::MAP | 22;
pub const MAP_REMOVE_BY_VALUE_LIST: u32 = namespace::MAP | 23;
pub const MAP_REMOVE_BY_VALUE_RANGE: u32 = namespace::MAP | 24;
pub const MAP_REMOVE_BY_VALUE_REL_RANK_RANGE: u32 = namespace::MAP | 25;
pub const MAP_REMOVE_BY_INDEX: u32 = namespace::MAP | 26;
pub const MAP_REMOVE_BY_INDEX_RANGE: u32 = namespace::MAP | 27;
pub const MAP_REMOVE_BY_RANK: u32 = namespace::MAP | 28;
pub const MAP_REMOVE_BY_RANK_RANGE: u32 = namespace::MAP | 29;

// Bit-string operations.
pub const BIT_RESIZE: u32 = namespace::BIT;
pub const BIT_INSERT: u32 = namespace::BIT | 1;
pub const BIT_REMOVE: u32 = namespace::BIT | 2;
pub const BIT_SET: u32 = namespace::BIT | 3;
pub const BIT_OR: u32 = namespace::BIT | 4;
pub const BIT_XOR: u32 = namespace::BIT | 5;
pub const BIT_AND: u32 = namespace::BIT | 6;
pub const BIT_NOT: u32 = namespace::BIT | 7;
pub const BIT_LSHIFT: u32 = namespace::BIT | 8;
pub const BIT_RSHIFT: u32 = namespace::BIT | 9;
pub const BIT_ADD: u32 = namespace::BIT | 10;
pub const BIT_SUBTRACT: u32 = namespace::BIT | 11;
pub const BIT_SET_INT: u32 = namespace::BIT | 12;
pub const BIT_GET: u32 = namespace::BIT | 13;
pub const BIT_COUNT: u32 = namespace::BIT | 14;
pub const BIT_LSCAN: u32 = namespace::BIT | 15;
pub const BIT_RSCAN: u32 = namespace::BIT | 16;
pub const BIT_GET_INT: u32 = namespace::BIT | 17;

// Approximate-count (HyperLogLog) operations.
pub const HLL_INIT: u32 = namespace::HLL;
pub const HLL_ADD: u32 = namespace::HLL | 1;
pub const HLL_SET_UNION: u32 = namespace::HLL | 2;
pub const HLL_REFRESH_COUNT: u32 = namespace::HLL | 3;
pub const HLL_FOLD: u32 = namespace::HLL | 4;
pub const HLL_GET_COUNT: u32 = namespace::HLL | 5;
pub const HLL_GET_UNION: u32 = namespace::HLL | 6;
pub const HLL_GET_UNION_COUNT: u32 = namespace::HLL | 7;
pub const HLL_GET_INTERSECT_COUNT: u32 = namespace::HLL | 8;
pub const HLL_GET_SIMILARITY: u32 = namespace::HLL | 9;
pub const HLL_DESCRIBE: u32 = namespace::HLL | 10;

// Filter-expression operations.
pub const EXPR_WRITE: u32 = namespace::EXPR;
pub const EXPR_READ: u32 = namespace::EXPR | 1;

pub(crate) static SCALAR_NAMES: &[&str] = &[
    "WRITE", "READ", "INCR", "PREPEND", "APPEND", "TOUCH", "DELETE",
];

pub(crate) static LIST_NAMES: &[&str] = &[
    "LIST_SET_ORDER",
    "LIST_SORT",
    "LIST_APPEND",
    "LIST_APPEND_ITEMS",
    "LIST_INSERT",
    "LIST_INSERT_ITEMS",
    "LIST_POP",
    "LIST_POP_RANGE",
    "LIST_REMOVE",
    "LIST_REMOVE_RANGE",
    "LIST_SET",
    "LIST_TRIM",
    "LIST_CLEAR",
    "LIST_INCREMENT",
    "LIST_SIZE",
    "LIST_GET",
    "LIST_GET_RANGE",
    "LIST_GET_BY_INDEX",
    "LIST_GET_BY_INDEX_RANGE",
    "LIST_GET_BY_RANK",
    "LIST_GET_BY_RANK_RANGE",
    "LIST_GET_BY_VALUE",
    "LIST_GET_BY_VALUE_LIST",
    "LIST_GET_BY_VALUE_RANGE",
    "LIST_GET_BY_VALUE_REL_RANK_RANGE",
    "LIST_REMOVE_BY_INDEX",
    "LIST_REMOVE_BY_INDEX_RANGE",
    "LIST_REMOVE_BY_RANK",
    "LIST_REMOVE_BY_RANK_RANGE",
    "LIST_REMOVE_BY_VALUE",
    "LIST_REMOVE_BY_VALUE_LIST",
    "LIST_REMOVE_BY_VALUE_RANGE",
    "LIST_REMOVE_BY_VALUE_REL_RANK_RANGE",
];

pub(crate) static MAP_NAMES: &[&str] = &[
    "MAP_SET_POLICY",
    "MAP_PUT",
    "MAP_PUT_ITEMS",
    "MAP_INCREMENT",
    "MAP_CLEAR",
    "MAP_SIZE",
    "MAP_GET_BY_KEY",
    "MAP_GET_BY_KEY_LIST",
    "MAP_GET_BY_KEY_RANGE",
    "MAP_GET_BY_KEY_REL_INDEX_RANGE",
    "MAP_GET_BY_VALUE",
    "MAP_GET_BY_VALUE_LIST",
    "MAP_GET_BY_VALUE_RANGE",
    "MAP_GET_BY_VALUE_REL_RANK_RANGE",
    "MAP_GET_BY_INDEX",
    "MAP_GET_BY_INDEX_RANGE",
    "MAP_GET_BY_RANK",
    "MAP_GET_BY_RANK_RANGE",
    "MAP_REMOVE_BY_KEY",
    "MAP_REMOVE_BY_KEY_LIST",
    "MAP_REMOVE_BY_KEY_RANGE",
    "MAP_REMOVE_BY_KEY_REL_INDEX_RANGE",
    "MAP_REMOVE_BY_VALUE",
    "MAP_REMOVE_BY_VALUE_LIST",
    "MAP_REMOVE_BY_VALUE_RANGE",
    "MAP_REMOVE_BY_VALUE_REL_RANK_RANGE",
    "MAP_REMOVE_BY_INDEX",
    "MAP_REMOVE_BY_INDEX_RANGE",
    "MAP_REMOVE_BY_RANK",
    "MAP_REMOVE_BY_RANK_RANGE",
];

pub(crate) static BIT_NAMES: &[&str] = &[
    "BIT_RESIZE",
    "BIT_INSERT",
    "BIT_REMOVE",
    "BIT_SET",
    "BIT_OR",
    "BIT_XOR",
    "BIT_AND",
    "BIT_NOT",
    "BIT_LSHIFT",
    "BIT_RSHIFT",
    "BIT_ADD",
    "BIT_SUBTRACT",
    "BIT_SET_INT",
    "BIT_GET",
    "BIT_COUNT",
    "BIT_LSCAN",
    "BIT_RSCAN",
    "BIT_GET_INT",
];

pub(crate) static HLL_NAMES: &[&str] = &[
    "HLL_INIT",
    "HLL_ADD",
    "HLL_SET_UNION",
    "HLL_REFRESH_COUNT",
    "HLL_FOLD",
    "HLL_GET_COUNT",
    "HLL_GET_UNION",
    "HLL_GET_UNION_COUNT",
    "HLL_GET_INTERSECT_COUNT",
    "HLL_GET_SIMILARITY",
    "HLL_DESCRIBE",
];

pub(crate) static EXPR_NAMES: &[&str] = &["EXPR_WRITE", "EXPR_READ"];

/// All namespaces with their name tables, in namespace order.
pub(crate) static NAMESPACES: &[(u32, &[&str])] = &[
    (namespace::SCALAR, SCALAR_NAMES),
    (namespace::LIST, LIST_NAMES),
    (namespace::MAP, MAP_NAMES),
    (namespace::BIT, BIT_NAMES),
    (namespace::HLL, HLL_NAMES),
    (namespace::EXPR, EXPR_NAMES),
];

/// Published name of an opcode, if the opcode is in range.
pub fn name_of(op: u32) -> Option<&'static str> {
    if op & !(NAMESPACE_MASK | INDEX_MASK) != 0 {
        return None;
    }
    let ns = namespace_of(op);
    let idx = index_of(op);
    NAMESPACES
        .iter()
        .find(|entry| entry.0 == ns)
        .and_then(|entry| entry.1.get(idx).copied())
}

/// Opcode for a published name, if the name exists.
pub fn lookup(name: &str) -> Option<u32> {
    for &(ns, names) in NAMESPACES {
        if let Some(idx) = names.iter().position(|n| *n == name) {
            return Some(ns | idx as u32);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_name_round_trip() {
        for &(ns, names) in NAMESPACES {
            for (idx, name) in names.iter().enumerate() {
                let op = ns | idx as u32;
                assert_eq!(name_of(op), Some(*name));
                assert_eq!(lookup(name), Some(op));
            }
        }
    }

    #[test]
    fn test_names_unique_and_dense() {
        let mut seen = HashSet::new();
        for &(_, names) in NAMESPACES {
            for name in names {
                assert!(seen.insert(*name), "duplicate opcode name {name}");
            }
            // Density: every index below the table length resolves, the
            // next one does not.
            assert!(!names.is_empty());
        }
        for &(ns, names) in NAMESPACES {
            for idx in 0..names.len() {
                assert!(name_of(ns | idx as u32).is_some());
            }
            assert_eq!(name_of(ns | names.len() as u32), None);
        }
    }

    #[test]
    fn test_known_assignments_are_stable() {
        assert_eq!(WRITE, 0x0000);
        assert_eq!(DELETE, 0x0006);
        assert_eq!(LIST_SET_ORDER, 0x0100);
        assert_eq!(LIST_GET_RANGE, 0x0110);
        assert_eq!(MAP_PUT, 0x0201);
        assert_eq!(BIT_LSCAN, 0x030F);
        assert_eq!(BIT_RSCAN, 0x0310);
        assert_eq!(HLL_INIT, 0x0400);
        assert_eq!(EXPR_WRITE, 0x0500);
        assert_eq!(EXPR_READ, 0x0501);
    }

    #[test]
    fn test_namespace_and_index_helpers() {
        assert_eq!(namespace_of(LIST_APPEND), namespace::LIST);
        assert_eq!(index_of(LIST_APPEND), 2);
        assert_eq!(name_of(0xFF05), None);
        assert_eq!(name_of(0x1_0000), None);
        assert_eq!(lookup("NO_SUCH_OP"), None);
    }
}
