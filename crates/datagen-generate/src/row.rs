use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use datagen_core::PrimaryKeyKind;

use crate::errors::{GenerationError, Result};
use crate::model::Model;
use crate::value::FieldValue;

/// One generated record. Values are stored by field slot; absent values
/// render as `null`.
#[derive(Debug, Clone)]
pub struct Row {
    model: Model,
    values: Vec<Option<FieldValue>>,
}

impl Row {
    pub(crate) fn empty(model: Model) -> Self {
        let values = vec![None; model.slot_count()];
        Self { model, values }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.model.slot(name).and_then(|slot| self.value_at(slot))
    }

    pub(crate) fn value_at(&self, slot: usize) -> Option<&FieldValue> {
        self.values.get(slot).and_then(Option::as_ref)
    }

    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let slot = self
            .model
            .slot(name)
            .ok_or_else(|| GenerationError::InvalidModel(format!("row has no field '{name}'")))?;
        self.set_at(slot, value);
        Ok(())
    }

    pub(crate) fn set_at(&mut self, slot: usize, value: FieldValue) {
        if let Some(entry) = self.values.get_mut(slot) {
            *entry = Some(value);
        }
    }

    /// Text of the value of `name` through its field's conversion.
    pub fn text(&self, name: &str) -> Option<String> {
        self.model.slot(name).map(|slot| self.text_at(slot))
    }

    pub(crate) fn text_at(&self, slot: usize) -> String {
        let value = self.value_at(slot).unwrap_or(&FieldValue::Null);
        self.model.field_at(slot).to_string_value(value)
    }

    /// Print fields quoted and comma separated; inner quotes are doubled.
    pub fn to_csv(&self) -> String {
        self.model
            .print_slots()
            .map(|slot| format!("\"{}\"", self.text_at(slot).replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Print fields as one JSON object of strings, in output order.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&PrintView(self))?)
    }

    /// Concatenation of the primary-key fields declared for `kind`; empty
    /// when the model declares none.
    pub fn primary_key_value(&self, kind: PrimaryKeyKind) -> String {
        self.model
            .primary_key_slots(kind)
            .iter()
            .map(|slot| self.text_at(*slot))
            .collect()
    }
}

/// `name : value` for every field, ghosts included.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, slot) in self.model.ordered_slots().iter().enumerate() {
            if position > 0 {
                f.write_str("  ")?;
            }
            write!(
                f,
                "{} : {}",
                self.model.field_at(*slot).name(),
                self.text_at(*slot)
            )?;
        }
        Ok(())
    }
}

struct PrintView<'a>(&'a Row);

impl Serialize for PrintView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let row = self.0;
        let mut map = serializer.serialize_map(None)?;
        for slot in row.model.print_slots() {
            map.serialize_entry(row.model.field_at(slot).name(), &row.text_at(slot))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::FieldType;
    use datagen_definition::{FieldDefinition, ModelDefinition};

    fn sample() -> Row {
        let mut definition = ModelDefinition::new(vec![
            FieldDefinition::new("code", FieldType::String),
            FieldDefinition::new("number", FieldType::Integer),
            FieldDefinition::new("note", FieldType::String).ghost(),
        ]);
        definition.primary_keys.insert(
            "KAFKA_MSG_KEY".to_string(),
            vec!["code".to_string(), "number".to_string()],
        );
        let model = Model::build(&definition).expect("build");
        let mut row = Row::empty(model);
        row.set("code", FieldValue::Text("x".to_string())).expect("set");
        row.set("number", FieldValue::Int(7)).expect("set");
        row.set("note", FieldValue::Text("say \"hi\"".to_string()))
            .expect("set");
        row
    }

    #[test]
    fn primary_key_concatenates_without_separator() {
        let row = sample();
        assert_eq!(row.primary_key_value(PrimaryKeyKind::KafkaMsgKey), "x7");
        assert_eq!(row.primary_key_value(PrimaryKeyKind::KuduHashKeys), "");
    }

    #[test]
    fn ghost_fields_only_show_in_the_string_view() {
        let row = sample();
        assert_eq!(row.to_csv(), "\"x\",\"7\"");
        assert_eq!(row.to_json().expect("json"), r#"{"code":"x","number":"7"}"#);
        assert_eq!(row.to_string(), "code : x  number : 7  note : say \"hi\"");
    }

    #[test]
    fn csv_doubles_inner_quotes() {
        let mut row = sample();
        row.set("code", FieldValue::Text("a\"b".to_string())).expect("set");
        assert_eq!(row.to_csv(), "\"a\"\"b\",\"7\"");
    }

    #[test]
    fn missing_values_render_as_null() {
        let row = Row::empty(sample().model().clone());
        assert_eq!(row.text("number").as_deref(), Some("null"));
        assert!(row.value("number").is_none());
        assert!(row.clone().set("unknown", FieldValue::Null).is_err());
    }
}
