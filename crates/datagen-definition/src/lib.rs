//! Model document contracts, grammar and validation.

pub mod conditionals;
pub mod errors;
pub mod model;
pub mod schema;
pub mod validate;

pub use conditionals::{
    Comparison, ConditionSyntax, LineSyntax, Operand, TemplatePart, formula_references,
    parse_condition, parse_line_key, parse_link, parse_template, template_references,
    variable_pattern,
};
pub use errors::{DefinitionError, IssueSeverity, Result, ValidationIssue, ValidationReport};
pub use model::{ConditionalRule, FieldDefinition, ModelDefinition, WeightedValue, scalar_text};
pub use schema::model_json_schema;
pub use validate::{
    parse_model_definition, read_model_definition, validate_model, validate_model_json,
    verify_model_definition,
};
