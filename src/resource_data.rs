//! Flat key/value record store holding one resource's local state.
//!
//! Getters return the zero value of the attribute's type when a key is absent
//! or null, so handlers can build request structs without unwrapping every
//! field. The identity lives under `id`; an empty identity means the remote
//! object is gone.

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::validation::as_int64;

/// Key under which the remote identity is stored.
pub const ID_KEY: &str = "id";

/// The local state of a single resource or data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceData {
    attributes: Map<String, Value>,
}

impl ResourceData {
    /// Load a state document, filling schema defaults for absent attributes.
    ///
    /// A null state loads as empty. Anything other than an object is rejected.
    pub fn new(schema: &Schema, state: Value) -> Result<Self, ProviderError> {
        let mut attributes = match state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::InvalidRequest(format!(
                    "expected state object, got {}",
                    other
                )))
            },
        };

        for (name, attr) in &schema.block.attributes {
            if let Some(default) = &attr.default {
                let missing = attributes.get(name).map_or(true, Value::is_null);
                if missing {
                    attributes.insert(name.clone(), default.clone());
                }
            }
        }

        Ok(Self { attributes })
    }

    /// The remote identity, empty if unset.
    pub fn id(&self) -> &str {
        self.attributes
            .get(ID_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Set the remote identity. An empty string marks the record as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.attributes
            .insert(ID_KEY.to_string(), Value::String(id.into()));
    }

    /// Raw access to an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The attribute if it holds a non-zero value.
    ///
    /// Null, `""`, `0`, `false` and empty collections count as unset.
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !is_zero(v))
    }

    /// A string attribute, `""` when unset.
    pub fn get_string(&self, key: &str) -> String {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// An integer attribute, `0` when unset.
    pub fn get_int(&self, key: &str) -> i64 {
        self.attributes
            .get(key)
            .and_then(as_int64)
            .unwrap_or_default()
    }

    /// A set of strings, deduplicated, in first-seen order.
    pub fn get_string_set(&self, key: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for value in self.array(key) {
            if let Some(s) = value.as_str() {
                if !out.iter().any(|seen| seen == s) {
                    out.push(s.to_string());
                }
            }
        }
        out
    }

    /// A list of nested blocks, in order. Non-object entries are skipped.
    pub fn get_blocks(&self, key: &str) -> Vec<&Map<String, Value>> {
        self.array(key).iter().filter_map(Value::as_object).collect()
    }

    /// Set an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Consume the record and return the state document.
    pub fn into_state(self) -> Value {
        Value::Object(self.attributes)
    }

    fn array(&self, key: &str) -> &[Value] {
        self.attributes
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
