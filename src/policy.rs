//! Policy module: per-collection-type write policies and return-type flags.
//!
//! Policies arrive from the binding layer as loose value maps; each type
//! parses and defaults its own fields at the boundary. The numeric flag and
//! order values are a stable wire contract.

use crate::{OpError, OpResult, Value};
use serde::{Deserialize, Serialize};

/// List write flags (bit set).
pub mod list_write_flags {
    pub const DEFAULT: u32 = 0;
    pub const ADD_UNIQUE: u32 = 1;
    pub const INSERT_BOUNDED: u32 = 2;
    pub const NO_FAIL: u32 = 4;
    pub const PARTIAL: u32 = 8;
}

/// Map write flags (bit set). Flags take precedence over a write mode when
/// both are supplied.
pub mod map_write_flags {
    pub const DEFAULT: u32 = 0;
    pub const CREATE_ONLY: u32 = 1;
    pub const UPDATE_ONLY: u32 = 2;
    pub const NO_FAIL: u32 = 4;
    pub const PARTIAL: u32 = 8;
}

/// Bit-string write flags (bit set).
pub mod bit_write_flags {
    pub const DEFAULT: u32 = 0;
    pub const CREATE_ONLY: u32 = 1;
    pub const UPDATE_ONLY: u32 = 2;
    pub const NO_FAIL: u32 = 4;
    pub const PARTIAL: u32 = 8;
}

/// HyperLogLog write flags (bit set).
pub mod hll_write_flags {
    pub const DEFAULT: u32 = 0;
    pub const CREATE_ONLY: u32 = 1;
    pub const UPDATE_ONLY: u32 = 2;
    pub const NO_FAIL: u32 = 4;
    pub const ALLOW_FOLD: u32 = 8;
}

/// Return-type selector for read/remove collection operations.
pub mod return_type {
    pub const NONE: u32 = 0;
    pub const INDEX: u32 = 1;
    pub const REVERSE_INDEX: u32 = 2;
    pub const RANK: u32 = 3;
    pub const REVERSE_RANK: u32 = 4;
    pub const COUNT: u32 = 5;
    pub const KEY: u32 = 6;
    pub const VALUE: u32 = 7;
    pub const KEY_VALUE: u32 = 8;
    pub const EXISTS: u32 = 13;
    /// OR'd in when the independent `inverted` parameter is true.
    pub const INVERTED: u32 = 0x10000;
}

/// Ordering of a list bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListOrder {
    #[default]
    Unordered,
    Ordered,
}

impl ListOrder {
    pub(crate) fn from_wire(v: i64) -> OpResult<ListOrder> {
        match v {
            0 => Ok(ListOrder::Unordered),
            1 => Ok(ListOrder::Ordered),
            other => Err(OpError::param(format!("unknown list order {other}"))),
        }
    }
}

/// Ordering of a map bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapOrder {
    #[default]
    Unordered,
    KeyOrdered,
    KeyValueOrdered,
}

impl MapOrder {
    pub(crate) fn from_wire(v: i64) -> OpResult<MapOrder> {
        match v {
            0 => Ok(MapOrder::Unordered),
            1 => Ok(MapOrder::KeyOrdered),
            3 => Ok(MapOrder::KeyValueOrdered),
            other => Err(OpError::param(format!("unknown map order {other}"))),
        }
    }
}

/// Write mode of a map operation; the coarse precursor of write flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapWriteMode {
    #[default]
    Update,
    UpdateOnly,
    CreateOnly,
}

impl MapWriteMode {
    fn from_wire(v: i64) -> OpResult<MapWriteMode> {
        match v {
            0 => Ok(MapWriteMode::Update),
            1 => Ok(MapWriteMode::UpdateOnly),
            2 => Ok(MapWriteMode::CreateOnly),
            other => Err(OpError::param(format!("unknown map write mode {other}"))),
        }
    }

    fn flags(self) -> u32 {
        match self {
            MapWriteMode::Update => map_write_flags::DEFAULT,
            MapWriteMode::UpdateOnly => map_write_flags::UPDATE_ONLY,
            MapWriteMode::CreateOnly => map_write_flags::CREATE_ONLY,
        }
    }
}

/// Write policy for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListPolicy {
    pub order: ListOrder,
    pub flags: u32,
}

impl ListPolicy {
    /// Parses an optional loose policy map; absence defaults silently.
    pub fn from_value(value: Option<Value>) -> OpResult<ListPolicy> {
        let Some(value) = value else {
            return Ok(ListPolicy::default());
        };
        let fields = policy_fields(&value, "list policy")?;
        let mut policy = ListPolicy::default();
        for (key, val) in fields {
            match key {
                "order" => policy.order = ListOrder::from_wire(policy_int(key, val)?)?,
                "writeFlags" => policy.flags = policy_flags(key, val)?,
                _ => {
                    return Err(OpError::param(format!(
                        "unknown list policy field '{key}'"
                    )))
                }
            }
        }
        Ok(policy)
    }
}

/// Write policy for map operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapPolicy {
    pub order: MapOrder,
    pub flags: u32,
}

impl MapPolicy {
    /// Parses an optional loose policy map; absence defaults silently.
    ///
    /// A policy may carry `writeMode`, `writeFlags`, or both; when both are
    /// present the flags win and the mode is ignored.
    pub fn from_value(value: Option<Value>) -> OpResult<MapPolicy> {
        let Some(value) = value else {
            return Ok(MapPolicy::default());
        };
        let fields = policy_fields(&value, "map policy")?;
        let mut order = MapOrder::default();
        let mut mode = MapWriteMode::default();
        let mut flags = None;
        for (key, val) in fields {
            match key {
                "order" => order = MapOrder::from_wire(policy_int(key, val)?)?,
                "writeMode" => mode = MapWriteMode::from_wire(policy_int(key, val)?)?,
                "writeFlags" => flags = Some(policy_flags(key, val)?),
                _ => {
                    return Err(OpError::param(format!(
                        "unknown map policy field '{key}'"
                    )))
                }
            }
        }
        Ok(MapPolicy {
            order,
            flags: flags.unwrap_or_else(|| mode.flags()),
        })
    }
}

/// Write policy for bit-string operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitPolicy {
    pub flags: u32,
}

impl BitPolicy {
    pub fn from_value(value: Option<Value>) -> OpResult<BitPolicy> {
        let Some(value) = value else {
            return Ok(BitPolicy::default());
        };
        let fields = policy_fields(&value, "bit policy")?;
        let mut policy = BitPolicy::default();
        for (key, val) in fields {
            match key {
                "writeFlags" => policy.flags = policy_flags(key, val)?,
                _ => {
                    return Err(OpError::param(format!(
                        "unknown bit policy field '{key}'"
                    )))
                }
            }
        }
        Ok(policy)
    }
}

/// Write policy for HyperLogLog operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HllPolicy {
    pub flags: u32,
}

impl HllPolicy {
    pub fn from_value(value: Option<Value>) -> OpResult<HllPolicy> {
        let Some(value) = value else {
            return Ok(HllPolicy::default());
        };
        let fields = policy_fields(&value, "hll policy")?;
        let mut policy = HllPolicy::default();
        for (key, val) in fields {
            match key {
                "writeFlags" => policy.flags = policy_flags(key, val)?,
                _ => {
                    return Err(OpError::param(format!(
                        "unknown hll policy field '{key}'"
                    )))
                }
            }
        }
        Ok(policy)
    }
}

fn policy_fields<'a>(value: &'a Value, what: &str) -> OpResult<Vec<(&'a str, &'a Value)>> {
    let Value::Map(pairs) = value else {
        return Err(OpError::param(format!(
            "{what} must be a map, got {}",
            value.type_name()
        )));
    };
    pairs
        .iter()
        .map(|(k, v)| {
            k.as_str()
                .map(|k| (k, v))
                .ok_or_else(|| OpError::param(format!("{what} field names must be strings")))
        })
        .collect()
}

fn policy_int(key: &str, value: &Value) -> OpResult<i64> {
    value.as_int().ok_or_else(|| {
        OpError::param(format!(
            "policy field '{key}' must be an integer, got {}",
            value.type_name()
        ))
    })
}

fn policy_flags(key: &str, value: &Value) -> OpResult<u32> {
    match policy_int(key, value)? {
        v if (0..=i64::from(u32::MAX)).contains(&v) => Ok(v as u32),
        other => Err(OpError::param(format!(
            "policy field '{key}' value {other} is out of range"
        ))),
    }
}
