use std::collections::{HashMap, HashSet};
use std::path::Path;

use datagen_core::{ComparisonKind, FieldType, OptionKey, PrimaryKeyKind, TableNameKey};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::conditionals::{
    LineSyntax, Operand, formula_references, parse_line_key, parse_link, template_references,
};
use crate::errors::{DefinitionError, ValidationReport};
use crate::model::{FieldDefinition, ModelDefinition, scalar_text};
use crate::schema::model_json_schema;

/// Validated model with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedModel {
    pub definition: ModelDefinition,
    pub warnings: Vec<crate::errors::ValidationIssue>,
}

/// Validate a model JSON document against the model JSON Schema.
pub fn validate_model_json(
    model_json: &Value,
    model_schema: &Value,
) -> Result<ValidationReport, DefinitionError> {
    let compiled = JSONSchema::compile(model_schema)
        .map_err(|err| DefinitionError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(model_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.error("schema_violation", path, error.to_string(), None);
        }
    }

    Ok(report)
}

/// Deserialize a model document.
pub fn parse_model_definition(model_json: &Value) -> Result<ModelDefinition, DefinitionError> {
    Ok(serde_json::from_value(model_json.clone())?)
}

/// Read and deserialize a model document from disk.
pub fn read_model_definition(path: &Path) -> Result<ModelDefinition, DefinitionError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Validate the model end-to-end, returning structured issues on failure.
pub fn validate_model(model_json: &Value) -> Result<ValidatedModel, ValidationReport> {
    let schema_json = match serde_json::to_value(model_json_schema()) {
        Ok(value) => value,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.error("schema_generation_error", "/", err.to_string(), None);
            return Err(report);
        }
    };

    let structural = match validate_model_json(model_json, &schema_json) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.error("schema_validation_error", "/", err.to_string(), None);
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let definition = match parse_model_definition(model_json) {
        Ok(definition) => definition,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.error("invalid_model_json", "/", err.to_string(), None);
            return Err(report);
        }
    };

    let report = verify_model_definition(&definition);
    if !report.is_ok() {
        return Err(report);
    }

    Ok(ValidatedModel {
        definition,
        warnings: report.warnings,
    })
}

/// Check the semantic invariants of a parsed model.
///
/// This checks:
/// - field names are unique and usable in expressions
/// - constraints fit the field type (bounds, length, possible values, weights)
/// - conditionals parse and only reference existing, non-computed fields
/// - primary keys, partition columns and option values are well-formed
pub fn verify_model_definition(definition: &ModelDefinition) -> ValidationReport {
    let mut report = ValidationReport::default();

    if definition.fields.is_empty() {
        report.error(
            "empty_model",
            "/fields",
            "model declares no field",
            Some("add at least one field"),
        );
        return report;
    }

    let index = FieldIndex::build(definition, &mut report);

    for (position, field) in definition.fields.iter().enumerate() {
        let path = format!("/fields/{position}");
        validate_constraints(field, &path, &mut report);
        validate_conditionals(field, &path, &index, &mut report);
    }

    validate_primary_keys(definition, &index, &mut report);
    validate_table_names(definition, &mut report);
    validate_options(definition, &index, &mut report);

    report
}

struct FieldIndex<'a> {
    fields: HashMap<&'a str, &'a FieldDefinition>,
}

impl<'a> FieldIndex<'a> {
    fn build(definition: &'a ModelDefinition, report: &mut ValidationReport) -> Self {
        let mut fields = HashMap::new();
        for (position, field) in definition.fields.iter().enumerate() {
            let path = format!("/fields/{position}/name");
            if field.name.trim().is_empty() {
                report.error("empty_field_name", path, "field name is empty", None);
                continue;
            }
            if fields.insert(field.name.as_str(), field).is_some() {
                report.error(
                    "duplicate_field",
                    path,
                    format!("field '{}' is declared more than once", field.name),
                    Some("rename one of the fields"),
                );
            } else if !is_reference_name(&field.name) {
                report.warning(
                    "unreferenceable_name",
                    path,
                    format!("field '{}' cannot be referenced from expressions", field.name),
                    Some("use letters, digits and underscores only"),
                );
            }
        }
        Self { fields }
    }

    fn get(&self, name: &str) -> Option<&'a FieldDefinition> {
        self.fields.get(name).copied()
    }

    /// Report a reference to a missing or computed field.
    fn check_reference(&self, name: &str, path: &str, report: &mut ValidationReport) {
        match self.get(name) {
            None => report.error(
                "unknown_column",
                path,
                format!("reference to unknown field '{name}'"),
                None,
            ),
            Some(target) if target.is_computed() => report.error(
                "computed_dependency",
                path,
                format!("reference to computed field '{name}'"),
                Some("conditionals may only read independent fields"),
            ),
            Some(_) => {}
        }
    }
}

fn validate_constraints(field: &FieldDefinition, path: &str, report: &mut ValidationReport) {
    let field_type = field.field_type;

    if field.min.is_some() || field.max.is_some() {
        if !field_type.accepts_bounds() {
            report.warning(
                "bounds_ignored",
                format!("{path}/min"),
                format!("{field_type} fields ignore min/max"),
                None,
            );
        } else if field_type == FieldType::Float
            && let Some((bound, raw)) = [("min", field.min.as_ref()), ("max", field.max.as_ref())]
                .into_iter()
                .find_map(|(bound, raw)| raw.filter(|raw| overflows_f32(raw)).map(|raw| (bound, raw)))
        {
            report.error(
                "invalid_bounds",
                format!("{path}/{bound}"),
                format!("{bound} {raw} does not fit a FLOAT"),
                None,
            );
        } else if let (Some(min), Some(max)) = (
            field.min.as_ref().and_then(numeric_bound),
            field.max.as_ref().and_then(numeric_bound),
        ) && min > max
        {
            report.error(
                "invalid_bounds",
                format!("{path}/min"),
                format!("min {min} is greater than max {max}"),
                None,
            );
        }
    }

    if let Some(length) = field.length {
        if length < 0 {
            report.error(
                "invalid_length",
                format!("{path}/length"),
                format!("length {length} is negative"),
                None,
            );
        } else if !field_type.accepts_length() {
            report.warning(
                "length_ignored",
                format!("{path}/length"),
                format!("{field_type} fields ignore length"),
                None,
            );
        }
    }

    let weighted_values = field.possible_values_weighted.iter().map(|weighted| &weighted.value);
    for (position, value) in field.possible_values.iter().chain(weighted_values).enumerate() {
        if !possible_value_fits(field_type, value) {
            report.error(
                "invalid_possible_value",
                format!("{path}/possible_values/{position}"),
                format!("{value} is not a valid {field_type} value"),
                None,
            );
        }
    }

    if !field.possible_values_weighted.is_empty()
        && field
            .possible_values_weighted
            .iter()
            .all(|weighted| weighted.weight == 0)
    {
        report.error(
            "zero_weights",
            format!("{path}/possible_values_weighted"),
            "every weighted value has a weight of 0",
            Some("give at least one value a positive weight"),
        );
    }

    if field.pattern.is_some() && field_type != FieldType::DateAsString {
        report.warning(
            "pattern_ignored",
            format!("{path}/pattern"),
            format!("{field_type} fields ignore pattern"),
            None,
        );
    }

    match field_type {
        FieldType::StringRegex => match field.regex.as_deref() {
            None => report.error(
                "missing_regex",
                format!("{path}/regex"),
                "STRING_REGEX field needs a regex",
                None,
            ),
            Some(pattern) => {
                if let Err(err) = regex::Regex::new(pattern) {
                    report.error("invalid_regex", format!("{path}/regex"), err.to_string(), None);
                }
            }
        },
        FieldType::Csv => {
            if field.file.is_none() {
                report.error("missing_csv_file", format!("{path}/file"), "CSV field needs a file", None);
            }
            if field.field.is_none() {
                report.error(
                    "missing_csv_field",
                    format!("{path}/field"),
                    "CSV field needs the column to render",
                    None,
                );
            }
            for (position, filter) in field.filters.iter().enumerate() {
                if !filter.contains('=') {
                    report.error(
                        "invalid_filter",
                        format!("{path}/filters/{position}"),
                        format!("CSV filter '{filter}' must look like column=value"),
                        None,
                    );
                }
            }
        }
        _ => {}
    }
}

fn validate_conditionals(
    field: &FieldDefinition,
    path: &str,
    index: &FieldIndex<'_>,
    report: &mut ValidationReport,
) {
    let mut default_seen = false;
    for (position, rule) in field.conditionals.iter().enumerate() {
        let rule_path = format!("{path}/conditionals/{position}");
        if default_seen {
            report.warning(
                "unreachable_conditional",
                &rule_path,
                "conditional after a default line is never evaluated",
                None,
            );
        }

        let syntax = match parse_line_key(&rule.key) {
            Ok(syntax) => syntax,
            Err(message) => {
                report.error("invalid_conditional", format!("{rule_path}/key"), message, None);
                continue;
            }
        };

        match syntax {
            LineSyntax::Conditions(groups) => {
                for condition in groups.iter().flatten() {
                    index.check_reference(&condition.column, &rule_path, report);
                    let left_kind = index
                        .get(&condition.column)
                        .map(|target| target.field_type.comparison_kind());
                    match &condition.operand {
                        Operand::Column(other) => {
                            index.check_reference(other, &rule_path, report);
                            let right_kind = index
                                .get(other)
                                .map(|target| target.field_type.comparison_kind());
                            if let (Some(left), Some(right)) = (left_kind, right_kind)
                                && left != right
                            {
                                report.warning(
                                    "mismatched_comparison",
                                    &rule_path,
                                    format!(
                                        "'{}' and '{}' do not share a value type",
                                        condition.column, other
                                    ),
                                    None,
                                );
                            }
                        }
                        Operand::Literal(literal) => {
                            if let Some(kind) = left_kind
                                && !literal_fits(kind, literal)
                            {
                                report.error(
                                    "invalid_literal",
                                    format!("{rule_path}/key"),
                                    format!(
                                        "'{literal}' cannot be compared with '{}'",
                                        condition.column
                                    ),
                                    None,
                                );
                            }
                        }
                    }
                }
                for name in template_references(&rule.value) {
                    index.check_reference(&name, &format!("{rule_path}/value"), report);
                }
            }
            LineSyntax::Formula => {
                for name in formula_references(&rule.value) {
                    index.check_reference(&name, &format!("{rule_path}/value"), report);
                }
            }
            LineSyntax::Injection => {
                for name in template_references(&rule.value) {
                    index.check_reference(&name, &format!("{rule_path}/value"), report);
                }
            }
            LineSyntax::Link => {
                let value_path = format!("{rule_path}/value");
                match parse_link(&rule.value) {
                    Err(message) => report.error("invalid_link", value_path, message, None),
                    Ok((target, attribute)) => {
                        index.check_reference(&target, &value_path, report);
                        if let Some(target_field) = index.get(&target)
                            && let Some(attributes) = target_field.field_type.link_attributes()
                            && !attributes.contains(&attribute.as_str())
                        {
                            report.error(
                                "invalid_link",
                                value_path,
                                format!(
                                    "{} field '{target}' has no attribute '{attribute}'",
                                    target_field.field_type
                                ),
                                None,
                            );
                        }
                    }
                }
            }
            LineSyntax::Default => default_seen = true,
        }
    }
}

fn validate_primary_keys(
    definition: &ModelDefinition,
    index: &FieldIndex<'_>,
    report: &mut ValidationReport,
) {
    for (kind, names) in &definition.primary_keys {
        let path = format!("/primary_keys/{kind}");
        if kind.parse::<PrimaryKeyKind>().is_err() {
            report.warning(
                "unknown_primary_key",
                &path,
                format!("primary key purpose '{kind}' is not recognized and will be ignored"),
                None,
            );
            continue;
        }
        for name in names {
            match index.get(name) {
                None => report.error(
                    "missing_primary_key_field",
                    &path,
                    format!("primary key field '{name}' does not exist"),
                    None,
                ),
                Some(field) if field.ghost => report.error(
                    "ghost_primary_key",
                    &path,
                    format!("primary key field '{name}' is a ghost field"),
                    Some("ghost fields never reach sinks"),
                ),
                Some(_) => {}
            }
        }
    }
}

fn validate_table_names(definition: &ModelDefinition, report: &mut ValidationReport) {
    for (key, value) in &definition.table_names {
        let path = format!("/table_names/{key}");
        let Ok(parsed) = key.parse::<TableNameKey>() else {
            report.warning(
                "unknown_table_name",
                &path,
                format!("table name key '{key}' is not recognized and will be ignored"),
                None,
            );
            continue;
        };
        match parsed {
            TableNameKey::OzoneVolume | TableNameKey::OzoneBucket if !is_ozone_name(value) => {
                report.warning(
                    "invalid_ozone_name",
                    &path,
                    format!("'{value}' is not a valid Ozone volume or bucket name"),
                    Some("use 3-63 lowercase letters, digits, '.' or '-'"),
                );
            }
            TableNameKey::KafkaTopic if !is_kafka_topic(value) => {
                report.warning(
                    "invalid_kafka_topic",
                    &path,
                    format!("'{value}' contains characters Kafka topics should avoid"),
                    Some("use letters, digits, '.' or '_'"),
                );
            }
            _ => {}
        }
    }
}

fn validate_options(
    definition: &ModelDefinition,
    index: &FieldIndex<'_>,
    report: &mut ValidationReport,
) {
    let mut partition_columns = HashSet::new();
    for (key, raw) in &definition.options {
        let path = format!("/options/{key}");
        let Ok(option) = key.parse::<OptionKey>() else {
            report.warning(
                "unknown_option",
                &path,
                format!("option '{key}' is not recognized and will be ignored"),
                None,
            );
            continue;
        };
        let value = match option.parse_json(raw) {
            Ok(value) => value,
            Err(err) => {
                report.error("invalid_option", &path, err.to_string(), None);
                continue;
            }
        };
        match option {
            OptionKey::HiveTablePartitionsCols | OptionKey::HiveTableBucketsCols => {
                for name in value.as_list() {
                    if index.get(&name).is_none() {
                        report.error(
                            "unknown_column",
                            &path,
                            format!("option references unknown field '{name}'"),
                            None,
                        );
                    }
                    if option == OptionKey::HiveTablePartitionsCols {
                        partition_columns.insert(name);
                    }
                }
            }
            OptionKey::HbaseColumnFamiliesMapping => {
                for name in value.as_column_families().into_iter().flat_map(|map| map.keys()) {
                    if index.get(name).is_none() {
                        report.warning(
                            "unknown_column",
                            &path,
                            format!("column family mapping names unknown field '{name}'"),
                            None,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    let kudu_keys = definition
        .primary_keys
        .get(PrimaryKeyKind::KuduPrimaryKeys.as_str())
        .filter(|keys| !keys.is_empty());
    if let Some(keys) = kudu_keys
        && !partition_columns.is_empty()
        && keys.iter().any(|key| !partition_columns.contains(key))
    {
        report.warning(
            "reorder_conflict",
            "/options/HIVE_TABLE_PARTITIONS_COLS",
            "Hive partition columns and Kudu keys reorder columns differently",
            Some("use the same columns for both"),
        );
    }
}

fn numeric_bound(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn overflows_f32(value: &Value) -> bool {
    numeric_bound(value).is_some_and(|bound| !(bound as f32).is_finite())
}

fn possible_value_fits(field_type: FieldType, value: &Value) -> bool {
    let Some(text) = scalar_text(value) else {
        return false;
    };
    let text = text.trim();
    match field_type {
        FieldType::Integer | FieldType::IncrementInteger => text.parse::<i32>().is_ok(),
        FieldType::Long | FieldType::IncrementLong | FieldType::Timestamp => {
            text.parse::<i64>().is_ok()
        }
        FieldType::Float => text.parse::<f32>().is_ok(),
        FieldType::Boolean => text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false"),
        _ => true,
    }
}

fn literal_fits(kind: ComparisonKind, literal: &str) -> bool {
    let literal = literal.trim();
    match kind {
        ComparisonKind::Integer => literal.parse::<i32>().is_ok(),
        ComparisonKind::Long => literal.parse::<i64>().is_ok(),
        ComparisonKind::Float => literal.parse::<f32>().is_ok(),
        ComparisonKind::Text => true,
    }
}

fn is_reference_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_ozone_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

fn is_kafka_topic(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
