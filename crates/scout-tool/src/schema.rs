//! Parameter schemas advertised by tools

use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

/// JSON schema for a parameter struct deriving `JsonSchema`
pub fn generate_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

/// Manual builder for object schemas
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(
        self,
        name: impl Into<String>,
        type_: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.property_spec(name, field(type_.into(), description.into()))
    }

    /// Optional property with a documented default value
    pub fn property_with_default(
        self,
        name: impl Into<String>,
        type_: impl Into<String>,
        description: impl Into<String>,
        default: Value,
    ) -> Self {
        let mut prop = field(type_.into(), description.into());
        prop.insert("default".to_string(), default);
        self.property_spec(name, prop)
    }

    /// String property restricted to a fixed set of values
    pub fn enum_property(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
    ) -> Self {
        let mut prop = field("string".to_string(), description.into());
        prop.insert(
            "enum".to_string(),
            Value::Array(values.iter().map(|v| Value::String((*v).to_string())).collect()),
        );
        self.property_spec(name, prop)
    }

    /// Array property whose items share one type
    pub fn array_property(
        self,
        name: impl Into<String>,
        item_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut prop = field("array".to_string(), description.into());
        prop.insert(
            "items".to_string(),
            serde_json::json!({ "type": item_type.into() }),
        );
        self.property_spec(name, prop)
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn build(self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(self.properties));
        schema.insert(
            "required".to_string(),
            Value::Array(self.required.into_iter().map(Value::String).collect()),
        );

        Value::Object(schema)
    }

    fn property_spec(mut self, name: impl Into<String>, prop: Map<String, Value>) -> Self {
        self.properties.insert(name.into(), Value::Object(prop));
        self
    }
}

fn field(type_: String, description: String) -> Map<String, Value> {
    let mut prop = Map::new();
    prop.insert("type".to_string(), Value::String(type_));
    prop.insert("description".to_string(), Value::String(description));
    prop
}
