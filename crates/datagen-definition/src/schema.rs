use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::ModelDefinition;

/// Emit the JSON Schema for model documents.
pub fn model_json_schema() -> RootSchema {
    schema_for!(ModelDefinition)
}
