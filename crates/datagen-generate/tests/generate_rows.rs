use std::collections::HashSet;
use std::path::PathBuf;

use datagen_core::{FieldType, PrimaryKeyKind};
use datagen_definition::{FieldDefinition, ModelDefinition, read_model_definition};
use datagen_generate::{
    FieldValue, GenerationControl, GenerationError, Model, Row, write_rows_csv, write_rows_json,
};

fn customers() -> Model {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../models/examples/customers.model.json");
    let definition = read_model_definition(&path).expect("read customers model");
    Model::build(&definition).expect("build customers model")
}

fn seeded(seed: u64) -> Model {
    let mut definition = ModelDefinition::new(vec![
        FieldDefinition::new("code", FieldType::StringAz).with_length(8),
        FieldDefinition::new("amount", FieldType::Long).with_bounds(0, 1_000),
        FieldDefinition::new("country", FieldType::Country),
        FieldDefinition::new("big", FieldType::Boolean)
            .with_conditional("$amount>500", "true")
            .with_conditional("default", "false"),
    ]);
    definition.seed = Some(seed);
    Model::build(&definition).expect("build seeded model")
}

fn text(row: &Row, name: &str) -> String {
    row.text(name).unwrap_or_else(|| panic!("missing field {name}"))
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("datagen-it-{}-{name}", std::process::id()))
}

#[test]
fn generates_the_requested_number_of_rows() {
    let model = customers();
    assert_eq!(model.generate_random_rows(10, 3).expect("generate").len(), 10);
    assert_eq!(model.generate_random_rows(0, 2).expect("generate").len(), 0);
    assert_eq!(model.generate_random_rows(3, 8).expect("generate").len(), 3);
}

#[test]
fn zero_threads_is_rejected() {
    let err = customers().generate_random_rows(5, 0).expect_err("no workers");
    assert!(matches!(err, GenerationError::InvalidThreadCount));
}

#[test]
fn same_seed_gives_same_rows() {
    let first: Vec<String> = seeded(7)
        .generate_random_rows(50, 3)
        .expect("generate")
        .iter()
        .map(Row::to_csv)
        .collect();
    let second: Vec<String> = seeded(7)
        .generate_random_rows(50, 3)
        .expect("generate")
        .iter()
        .map(Row::to_csv)
        .collect();
    let other: Vec<String> = seeded(8)
        .generate_random_rows(50, 3)
        .expect("generate")
        .iter()
        .map(Row::to_csv)
        .collect();
    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn computed_fields_follow_their_rules() {
    let rows = customers().generate_random_rows(200, 4).expect("generate");
    for row in &rows {
        let age: i64 = text(row, "age").parse().expect("age");
        let score: f64 = text(row, "score").parse().expect("score");
        let expected = if age > 65 || score > 9.0 {
            "gold"
        } else if text(row, "segment") == "business" && score > 5.0 {
            "silver"
        } else {
            "standard"
        };
        assert_eq!(text(row, "tier"), expected, "{row}");

        assert_eq!(
            text(row, "email"),
            format!("{}.{}@example.com", text(row, "name"), text(row, "id"))
        );

        let FieldValue::City(city) = row.value("city").expect("city") else {
            panic!("city should hold a dictionary entry");
        };
        assert_eq!(city.country, "France");
        assert_eq!(text(row, "latitude"), city.latitude);

        let doubled: f64 = text(row, "doubled_score").parse().expect("doubled");
        assert!((doubled - score * 2.0).abs() < 1e-3, "{doubled} vs {score}");
    }
}

#[test]
fn increments_are_unique_across_workers() {
    let rows = customers().generate_random_rows(120, 4).expect("generate");
    let ids: HashSet<String> = rows.iter().map(|row| text(row, "id")).collect();
    assert_eq!(ids.len(), rows.len());
}

#[test]
fn ghost_fields_stay_out_of_sinks() {
    let model = customers();
    let rows = model.generate_random_rows(1, 1).expect("generate");
    let row = &rows[0];
    assert!(!model.csv_header().split(',').any(|name| name == "score"));
    let json: serde_json::Value = serde_json::from_str(&row.to_json().expect("json")).expect("parse");
    assert!(json.get("score").is_none());
    assert!(json.get("tier").is_some());
    assert!(row.to_string().contains("score : "));
    assert_eq!(row.to_csv().split("\",\"").count(), model.print_fields().count());
}

#[test]
fn primary_keys_concatenate_field_text() {
    let rows = customers().generate_random_rows(5, 1).expect("generate");
    for row in &rows {
        assert_eq!(row.primary_key_value(PrimaryKeyKind::KafkaMsgKey), text(row, "id"));
        assert_eq!(
            row.primary_key_value(PrimaryKeyKind::HbasePrimaryKey),
            format!("{}{}", text(row, "id"), text(row, "name"))
        );
    }
}

#[test]
fn interrupted_workers_keep_finished_rows() {
    let model = seeded(1);
    let control = GenerationControl::new();
    control.interrupt_worker_after(1, 5);
    let rows = model
        .generate_random_rows_with_control(100, 4, &control)
        .expect("interruption is not an error");
    assert_eq!(rows.len(), 80);

    let control = GenerationControl::new();
    control.interrupt_all();
    let rows = model
        .generate_random_rows_with_control(100, 4, &control)
        .expect("interruption is not an error");
    assert!(rows.is_empty());
}

#[test]
fn sinks_write_every_row() {
    let model = customers();
    let rows = model.generate_random_rows(25, 2).expect("generate");

    let csv_path = temp_path("customers.csv");
    let report = write_rows_csv(&csv_path, &model, &rows).expect("csv sink");
    let csv = std::fs::read_to_string(&csv_path).expect("read csv");
    std::fs::remove_file(&csv_path).ok();
    assert_eq!(report.rows, 25);
    assert_eq!(csv.lines().count(), 26);
    assert_eq!(csv.lines().next(), Some(model.csv_header().as_str()));

    let json_path = temp_path("customers.ndjson");
    let report = write_rows_json(&json_path, &model, &rows).expect("json sink");
    let json = std::fs::read_to_string(&json_path).expect("read json");
    std::fs::remove_file(&json_path).ok();
    assert_eq!(report.rows, 25);
    assert_eq!(report.bytes_written, json.len() as u64);
    for line in json.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("each line is json");
    }
}

#[test]
fn computed_fields_may_precede_the_fields_they_read() {
    let mut definition = ModelDefinition::new(vec![
        FieldDefinition::new("label", FieldType::Long).with_conditional("formula", "$n * 2"),
        FieldDefinition::new("n", FieldType::Integer).with_bounds(1, 10),
    ]);
    definition.seed = Some(21);
    let model = Model::build(&definition).expect("build model");
    let rows = model.generate_random_rows(20, 2).expect("generate");
    assert_eq!(rows.len(), 20);
    for row in &rows {
        let n: i64 = text(row, "n").parse().expect("n");
        let label: i64 = text(row, "label").parse().expect("label");
        assert!((1..=10).contains(&n));
        assert_eq!(label, n * 2, "{}", row.to_csv());
    }
}
