//! Declarative input schemas with per-action visibility metadata.
//!
//! Visibility rules are consumed by hosts that render forms. Dispatch never
//! reads them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON type of a schema field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperation {
    NotEqual,
    Equal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleEffect {
    Hide,
    Show,
}

/// `{operation, valueA, valueB, action}` rule evaluated by form renderers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRule {
    pub operation: RuleOperation,
    pub value_a: String,
    pub value_b: String,
    pub action: RuleEffect,
}

impl VisibilityRule {
    /// Hide the field unless the selected action equals `action`.
    pub fn hide_unless_action(action: &str) -> Self {
        Self {
            operation: RuleOperation::NotEqual,
            value_a: action.to_string(),
            value_b: "{{action}}".to_string(),
            action: RuleEffect::Hide,
        }
    }
}

/// One property of an input schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub field_type: FieldType,
    pub title: Option<&'static str>,
    pub description: Option<&'static str>,
    pub enum_values: Vec<&'static str>,
    pub default: Option<Value>,
    pub items: Option<FieldType>,
    pub rules: Vec<VisibilityRule>,
}

impl FieldSchema {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            title: None,
            description: None,
            enum_values: Vec::new(),
            default: None,
            items: None,
            rules: Vec::new(),
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn object(name: &'static str) -> Self {
        Self::new(name, FieldType::Object)
    }

    pub fn array(name: &'static str, items: FieldType) -> Self {
        let mut field = Self::new(name, FieldType::Array);
        field.items = Some(items);
        field
    }

    pub fn title(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn enumerated(mut self, values: &[&'static str]) -> Self {
        self.enum_values = values.to_vec();
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Attach one hide rule per action the field applies to.
    pub fn shown_for(mut self, actions: &[&str]) -> Self {
        self.rules
            .extend(actions.iter().map(|a| VisibilityRule::hide_unless_action(a)));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!(self.field_type));
        if let Some(title) = self.title {
            obj.insert("title".into(), json!(title));
        }
        if let Some(description) = self.description {
            obj.insert("description".into(), json!(description));
        }
        if !self.enum_values.is_empty() {
            obj.insert("enum".into(), json!(self.enum_values));
        }
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.clone());
        }
        if let Some(items) = self.items {
            obj.insert("items".into(), json!({ "type": items }));
        }
        if !self.rules.is_empty() {
            obj.insert("rules".into(), json!(self.rules));
        }
        Value::Object(obj)
    }
}

/// Object schema: ordered properties and top-level required names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSchema {
    pub fields: Vec<FieldSchema>,
    pub required: Vec<&'static str>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a field and list it as always required.
    pub fn required_field(mut self, field: FieldSchema) -> Self {
        self.required.push(field.name);
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.to_json()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}
