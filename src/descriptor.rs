//! Descriptor module: the loosely-typed operation descriptors handed over by
//! the binding layer, and the typed parameter extractors that validate them.
//!
//! A descriptor is ephemeral: it is consumed exactly once during compilation,
//! and every extractor moves its parameter out of the map.

use crate::exprc::CompiledExpression;
use crate::policy::{BitPolicy, HllPolicy, ListPolicy, MapPolicy};
use crate::{return_type, CdtContextPath, OpError, OpResult, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operation-specific parameters keyed by their published wire names
/// (`index`, `value`, `returnType`, `context`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(HashMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Moves a parameter out of the map, whatever its type.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn req_value(&mut self, key: &str) -> OpResult<Value> {
        self.take(key)
            .ok_or_else(|| OpError::param(format!("missing required parameter '{key}'")))
    }

    pub fn req_int(&mut self, key: &str) -> OpResult<i64> {
        let value = self.req_value(key)?;
        value.as_int().ok_or_else(|| {
            OpError::param(format!(
                "parameter '{key}' must be an integer, got {}",
                value.type_name()
            ))
        })
    }

    pub fn opt_int(&mut self, key: &str) -> OpResult<Option<i64>> {
        match self.take(key) {
            None | Some(Value::Nil) => Ok(None),
            Some(Value::Int(i)) => Ok(Some(i)),
            Some(other) => Err(OpError::param(format!(
                "parameter '{key}' must be an integer, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn opt_bool(&mut self, key: &str) -> OpResult<Option<bool>> {
        match self.take(key) {
            None | Some(Value::Nil) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(OpError::param(format!(
                "parameter '{key}' must be a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn req_list(&mut self, key: &str) -> OpResult<Vec<Value>> {
        match self.req_value(key)? {
            Value::List(items) => Ok(items),
            other => Err(OpError::param(format!(
                "parameter '{key}' must be a list, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn req_bytes(&mut self, key: &str) -> OpResult<Vec<u8>> {
        match self.req_value(key)? {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(OpError::param(format!(
                "parameter '{key}' must be a byte buffer, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn req_bool(&mut self, key: &str) -> OpResult<bool> {
        match self.req_value(key)? {
            Value::Bool(b) => Ok(b),
            other => Err(OpError::param(format!(
                "parameter '{key}' must be a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn req_map(&mut self, key: &str) -> OpResult<Vec<(Value, Value)>> {
        match self.req_value(key)? {
            Value::Map(pairs) => Ok(pairs),
            other => Err(OpError::param(format!(
                "parameter '{key}' must be a map, got {}",
                other.type_name()
            ))),
        }
    }

    /// Resolves the optional `context` parameter into a compiled path.
    pub(crate) fn take_context(&mut self) -> OpResult<CdtContextPath> {
        match self.take("context") {
            None => Ok(CdtContextPath::new()),
            Some(wire) => CdtContextPath::from_wire(&wire),
        }
    }

    /// Resolves `returnType` (default none) plus the independent `inverted`
    /// boolean, which ORs the inverted bit into the return type.
    pub(crate) fn take_return_type(&mut self) -> OpResult<u32> {
        let rt = match self.opt_int("returnType")? {
            None => return_type::NONE,
            Some(rt) if (0..=u32::MAX as i64).contains(&rt) => rt as u32,
            Some(other) => {
                return Err(OpError::param(format!("invalid return type {other}")))
            }
        };
        let inverted = self.opt_bool("inverted")?.unwrap_or(false);
        Ok(if inverted {
            rt | return_type::INVERTED
        } else {
            rt
        })
    }

    pub(crate) fn take_list_policy(&mut self) -> OpResult<ListPolicy> {
        ListPolicy::from_value(self.take("policy"))
    }

    pub(crate) fn take_map_policy(&mut self) -> OpResult<MapPolicy> {
        MapPolicy::from_value(self.take("policy"))
    }

    pub(crate) fn take_bit_policy(&mut self) -> OpResult<BitPolicy> {
        BitPolicy::from_value(self.take("policy"))
    }

    pub(crate) fn take_hll_policy(&mut self) -> OpResult<HllPolicy> {
        HllPolicy::from_value(self.take("policy"))
    }
}

/// One operation as described by the binding layer: an opcode, a target bin
/// and loosely-typed parameters, plus an optional pre-compiled filter
/// expression for the expression namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub op: u32,
    pub bin: String,
    #[serde(flatten)]
    pub params: Params,
    #[serde(skip)]
    pub expression: Option<CompiledExpression>,
}

impl OperationDescriptor {
    pub fn new(op: u32, bin: impl Into<String>) -> Self {
        Self {
            op,
            bin: bin.into(),
            params: Params::new(),
            expression: None,
        }
    }

    /// Builder-style parameter setter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Attaches a compiled filter expression (expression namespace only).
    pub fn expression(mut self, expression: CompiledExpression) -> Self {
        self.expression = Some(expression);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode;

    #[test]
    fn test_required_extractors() {
        let mut params = Params::new();
        params.insert("index", 4i64);
        params.insert("value", "abc");
        assert_eq!(params.req_int("index").unwrap(), 4);
        assert_eq!(params.req_value("value").unwrap(), Value::Str("abc".into()));
        // Consumed once.
        assert!(params.req_int("index").is_err());
        let err = params.req_int("count").unwrap_err();
        assert_eq!(
            err,
            OpError::Param("missing required parameter 'count'".into())
        );
    }

    #[test]
    fn test_mistyped_parameters() {
        let mut params = Params::new();
        params.insert("index", "not an int");
        assert!(matches!(params.req_int("index"), Err(OpError::Param(_))));
        let mut params = Params::new();
        params.insert("inverted", 1i64);
        assert!(matches!(params.opt_bool("inverted"), Err(OpError::Param(_))));
    }

    #[test]
    fn test_optional_extractors_tolerate_nil() {
        let mut params = Params::new();
        params.insert("count", Value::Nil);
        assert_eq!(params.opt_int("count").unwrap(), None);
        assert_eq!(params.opt_int("absent").unwrap(), None);
    }

    #[test]
    fn test_return_type_inversion() {
        let mut params = Params::new();
        params.insert("returnType", i64::from(return_type::VALUE));
        params.insert("inverted", true);
        assert_eq!(
            params.take_return_type().unwrap(),
            return_type::VALUE | return_type::INVERTED
        );
        // Defaults to none, not inverted.
        let mut params = Params::new();
        assert_eq!(params.take_return_type().unwrap(), return_type::NONE);
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = OperationDescriptor::new(opcode::LIST_GET, "scores").param("index", 2i64);
        assert_eq!(desc.op, opcode::LIST_GET);
        assert_eq!(desc.bin, "scores");
        assert!(desc.params.contains("index"));
    }

    #[test]
    fn test_descriptor_json_shape() {
        // The wire shape of the binding layer: op, bin, and operation
        // parameters flattened alongside them.
        let json = r#"{"op": 271, "bin": "l", "index": 2}"#;
        let desc: OperationDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc.op, opcode::LIST_GET);
        assert_eq!(desc.bin, "l");
        let mut params = desc.params;
        assert_eq!(params.req_int("index").unwrap(), 2);
    }
}
