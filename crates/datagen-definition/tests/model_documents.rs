use datagen_core::FieldType;
use datagen_definition::{
    model_json_schema, read_model_definition, validate_model, validate_model_json,
};
use std::fs;
use std::path::Path;

fn example_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models/examples/customers.model.json")
}

fn load_json(path: &Path) -> serde_json::Value {
    let contents =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse json")
}

#[test]
fn example_model_validates_end_to_end() {
    let model_json = load_json(&example_path());
    let schema_json = serde_json::to_value(model_json_schema()).expect("serialize schema");

    let structural = validate_model_json(&model_json, &schema_json).expect("validate json");
    assert!(structural.errors.is_empty(), "structural errors found");

    let validated = validate_model(&model_json).expect("model should validate");
    assert_eq!(validated.definition.fields.len(), 10);
    assert_eq!(validated.definition.seed, Some(42));
    assert!(validated.warnings.is_empty(), "{:?}", validated.warnings);
}

#[test]
fn unknown_field_type_is_a_schema_violation() {
    let model_json = serde_json::json!({
        "fields": [{ "name": "id", "type": "DECIMAL" }]
    });
    let report = validate_model(&model_json).expect_err("should fail");
    assert!(report.has_code("schema_violation"));
}

#[test]
fn definition_round_trips_through_json() {
    let definition = read_model_definition(&example_path()).expect("read model");
    let encoded = serde_json::to_value(&definition).expect("serialize");
    let decoded: datagen_definition::ModelDefinition =
        serde_json::from_value(encoded).expect("deserialize");

    let types: Vec<FieldType> = decoded.fields.iter().map(|field| field.field_type).collect();
    assert_eq!(types[0], FieldType::IncrementInteger);
    assert!(decoded.field("score").is_some_and(|field| field.ghost));
    assert_eq!(decoded.field("tier").map(|field| field.conditionals.len()), Some(3));
}
