use std::collections::BTreeMap;

use datagen_core::FieldType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declarative model document: ordered fields plus sink metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelDefinition {
    /// Fields in output order.
    pub fields: Vec<FieldDefinition>,
    /// Sink names keyed by table-name key (ex.: `KAFKA_TOPIC`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub table_names: BTreeMap<String, String>,
    /// Field lists keyed by primary-key purpose (ex.: `HBASE_PRIMARY_KEY`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub primary_keys: BTreeMap<String, Vec<String>>,
    /// Option values keyed by option name; strings, numbers or booleans.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
    /// Seed making generation reproducible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// One field of a model document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    /// Lower bound; a number, or a date string for date-like fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    /// Upper bound; a number, or a date string for date-like fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_values: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_values_weighted: Vec<WeightedValue>,
    /// Country filters for dictionary fields, `column=value` filters for CSV.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    /// Ordered conditional rules; a non-empty list makes the field computed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditionals: Vec<ConditionalRule>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ghost: bool,
    /// CSV file backing a `CSV` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// CSV column rendered as the field's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// CSV separator, `;` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Pattern for `STRING_REGEX` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// strftime pattern of `DATE_AS_STRING` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Use the wall clock for `TIMESTAMP`, `DATE` and `DATE_AS_STRING` fields.
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_now: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hbase_column_qualifier: Option<String>,
}

/// A possible value with its relative weight.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WeightedValue {
    pub value: serde_json::Value,
    pub weight: u32,
}

/// One conditional line: a key selecting the rule and the value it yields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalRule {
    /// `$col=value` conditions joined by `&`/`|`, or `formula`, `link`,
    /// `injection`, `default`.
    pub key: String,
    pub value: String,
}

impl FieldDefinition {
    /// Minimal definition of a field, used by builders and tests.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: None,
            min: None,
            max: None,
            possible_values: Vec::new(),
            possible_values_weighted: Vec::new(),
            filters: Vec::new(),
            conditionals: Vec::new(),
            ghost: false,
            file: None,
            field: None,
            separator: None,
            regex: None,
            pattern: None,
            use_now: false,
            hbase_column_qualifier: None,
        }
    }

    pub fn is_computed(&self) -> bool {
        !self.conditionals.is_empty()
    }

    pub fn with_conditional(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditionals.push(ConditionalRule {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_possible_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.possible_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bounds(
        mut self,
        min: impl Into<serde_json::Value>,
        max: impl Into<serde_json::Value>,
    ) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    pub fn with_length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn ghost(mut self) -> Self {
        self.ghost = true;
        self
    }
}

impl ModelDefinition {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            table_names: BTreeMap::new(),
            primary_keys: BTreeMap::new(),
            options: BTreeMap::new(),
            seed: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Text form of a scalar JSON value; `None` for arrays, objects and null.
pub fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
