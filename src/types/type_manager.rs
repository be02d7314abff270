use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializer handed to remote message dispatchers for wire payloads.
///
/// Wraps `serde_json`; polymorphic resource shapes are covered by the serde
/// tags on the domain types, so no runtime type registration is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeManager;

impl TypeManager {
    pub fn new() -> Self {
        Self
    }

    pub fn write_value<T: Serialize>(&self, value: &T) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(value)
    }

    pub fn write_string<T: Serialize>(&self, value: &T) -> Result<String, serde_json::Error> {
        serde_json::to_string(value)
    }

    pub fn read_value<T: DeserializeOwned>(
        &self,
        value: serde_json::Value,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(value)
    }
}
