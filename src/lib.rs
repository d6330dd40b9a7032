//! Opforge: an operation and filter-expression compiler for record-oriented
//! key-value store clients.
//!
//! This crate is the compiler front end of a client library: it takes a
//! dynamically-typed, ordered sequence of operation descriptors (each naming a
//! target bin, an opcode, and loosely-typed parameters) and produces a
//! validated, strongly-typed operation list. Separately, it compiles a flat
//! sequence of filter-expression entries into a single opaque, executable
//! expression value.
//!
//! # Architecture
//! - Tagged dynamic values (the converter boundary with the binding layer)
//! - Namespaced opcode tables (stable name/number contract)
//! - Nested-collection context path compiler (with base64 interchange)
//! - Per-collection-type write policies and defaults
//! - Scalar / List / Map / Bit / HLL operation encoders
//! - Filter-expression compiler and the two operations that embed one
//! - Opcode dispatcher assembling the final operation list
//!
//! Transport, cluster topology, retries and the callback plumbing that
//! eventually consumes the compiled artifacts are out of scope.

mod bits;
mod compiler;
mod context;
mod descriptor;
mod exprc;
mod hll;
mod list;
mod map;
mod opcode;
mod ops;
mod policy;
mod scalar;
mod types;

pub use compiler::*;
pub use context::*;
pub use descriptor::*;
pub use exprc::*;
pub use opcode::*;
pub use ops::*;
pub use policy::*;
pub use types::*;

pub use bits::{BitArgs, BitOverflowAction};
pub use hll::HllArgs;
pub use list::{ListArgs, ListSelector};
pub use map::{MapArgs, MapSelector};
pub use scalar::ScalarArgs;

use thiserror::Error;

/// Unified error type for all compile stages.
///
/// There are exactly two kinds: [`OpError::Param`] for malformed, missing or
/// mistyped input, and [`OpError::Type`] for a value whose dynamic type has no
/// defined encoding for the requested operation. Neither is retriable; both
/// carry enough context to identify the offending descriptor or entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("parameter error: {0}")]
    Param(String),
    #[error("type error: {0}")]
    Type(String),
}

impl OpError {
    pub(crate) fn param(msg: impl Into<String>) -> Self {
        OpError::Param(msg.into())
    }

    pub(crate) fn mistyped(msg: impl Into<String>) -> Self {
        OpError::Type(msg.into())
    }

    /// Prefixes positional context (descriptor or entry index) onto the
    /// message, preserving the error kind.
    pub(crate) fn at(self, what: &str, index: usize) -> Self {
        match self {
            OpError::Param(msg) => OpError::Param(format!("{what} {index}: {msg}")),
            OpError::Type(msg) => OpError::Type(format!("{what} {index}: {msg}")),
        }
    }

    /// Prefixes the published operation name onto the message, preserving
    /// the error kind.
    pub(crate) fn label(self, name: &str) -> Self {
        match self {
            OpError::Param(msg) => OpError::Param(format!("{name}: {msg}")),
            OpError::Type(msg) => OpError::Type(format!("{name}: {msg}")),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type OpResult<T> = std::result::Result<T, OpError>;
