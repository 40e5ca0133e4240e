//! Rule engine of computed fields.
//!
//! A computed field owns a [`ConditionalEvaluator`]: an ordered list of
//! [`ConditionsLine`]s where the first satisfied line produces the value.
//! Lines are conditions joined by AND/OR, formulas, links, injections or a
//! default. Every field reference is resolved once when the model is built.

mod condition;
pub mod formula;
mod injection;
mod line;
mod link;

use std::collections::HashMap;

use datagen_core::FieldType;
use datagen_definition::{ConditionalRule, FieldDefinition};

use crate::errors::{GenerationError, Result};
use crate::row::Row;
use crate::value::FieldValue;

pub use condition::Condition;
pub use formula::{Formula, FormulaError, Scalar, evaluate, try_evaluate};
pub use injection::Injection;
pub use line::{ConditionsLine, LineKind};
pub use link::{Link, LinkAttribute};

/// Ordered conditional lines of one computed field.
#[derive(Debug)]
pub struct ConditionalEvaluator {
    owner: String,
    lines: Vec<ConditionsLine>,
}

impl ConditionalEvaluator {
    pub(crate) fn build(rules: &[ConditionalRule], resolver: &FieldResolver<'_>) -> Result<Self> {
        let lines = rules
            .iter()
            .map(|rule| ConditionsLine::build(rule, resolver))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            owner: resolver.owner().to_string(),
            lines,
        })
    }

    pub fn lines(&self) -> &[ConditionsLine] {
        &self.lines
    }

    /// Value of the first satisfied line, or an empty string when none is.
    pub fn evaluate(&self, row: &Row) -> Result<String> {
        for line in &self.lines {
            if let Some(value) = line.evaluate(row, &self.owner)? {
                return Ok(value);
            }
        }
        Ok(String::new())
    }
}

/// Field referenced by a rule, resolved to its slot in the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedField {
    pub(crate) name: String,
    pub(crate) slot: usize,
    pub(crate) field_type: FieldType,
}

impl ResolvedField {
    /// Value of this field in `row`; absent values are model defects.
    pub(crate) fn value<'r>(&self, row: &'r Row, owner: &str) -> Result<&'r FieldValue> {
        row.value_at(self.slot)
            .ok_or_else(|| GenerationError::MissingDependency {
                field: owner.to_string(),
                dependency: self.name.clone(),
            })
    }

    /// Text form of this field's value in `row`.
    pub(crate) fn text(&self, row: &Row, owner: &str) -> Result<String> {
        let value = self.value(row, owner)?;
        Ok(row.model().field_at(self.slot).to_string_value(value))
    }
}

/// Resolves field names while the rules of `owner` are built.
pub(crate) struct FieldResolver<'a> {
    owner: &'a str,
    definitions: &'a [FieldDefinition],
    slots: &'a HashMap<String, usize>,
}

impl<'a> FieldResolver<'a> {
    pub(crate) fn new(
        owner: &'a str,
        definitions: &'a [FieldDefinition],
        slots: &'a HashMap<String, usize>,
    ) -> Self {
        Self {
            owner,
            definitions,
            slots,
        }
    }

    pub(crate) fn owner(&self) -> &str {
        self.owner
    }

    /// Resolve `name`, rejecting unknown and computed fields.
    pub(crate) fn resolve(&self, name: &str) -> Result<ResolvedField> {
        let slot = *self.slots.get(name).ok_or_else(|| {
            GenerationError::InvalidModel(format!(
                "field '{}' references unknown field '{name}'",
                self.owner
            ))
        })?;
        let definition = &self.definitions[slot];
        if definition.is_computed() {
            return Err(GenerationError::InvalidModel(format!(
                "field '{}' references computed field '{name}'",
                self.owner
            )));
        }
        Ok(ResolvedField {
            name: name.to_string(),
            slot,
            field_type: definition.field_type,
        })
    }

    pub(crate) fn invalid(&self, message: impl std::fmt::Display) -> GenerationError {
        GenerationError::InvalidModel(format!("field '{}': {message}", self.owner))
    }
}

#[cfg(test)]
mod tests {
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    use crate::test_support::{model_of, row_with};
    use crate::value::FieldValue;

    #[test]
    fn first_satisfied_line_wins() {
        let model = model_of(vec![
            FieldDefinition::new("age", FieldType::Integer),
            FieldDefinition::new("band", FieldType::String)
                .with_conditional("$age>60", "senior")
                .with_conditional("$age>30", "adult")
                .with_conditional("default", "young"),
        ]);
        let band = model.field("band").expect("band");
        let evaluator = band.conditional().expect("computed");

        let row = row_with(&model, &[("age", FieldValue::Int(70))]);
        assert_eq!(evaluator.evaluate(&row).expect("evaluate"), "senior");
        let row = row_with(&model, &[("age", FieldValue::Int(40))]);
        assert_eq!(evaluator.evaluate(&row).expect("evaluate"), "adult");
        let row = row_with(&model, &[("age", FieldValue::Int(10))]);
        assert_eq!(evaluator.evaluate(&row).expect("evaluate"), "young");
    }

    #[test]
    fn no_match_yields_empty_text() {
        let model = model_of(vec![
            FieldDefinition::new("age", FieldType::Integer),
            FieldDefinition::new("band", FieldType::String).with_conditional("$age>60", "senior"),
        ]);
        let band = model.field("band").expect("band");
        let row = row_with(&model, &[("age", FieldValue::Int(3))]);
        let evaluator = band.conditional().expect("computed");
        assert_eq!(evaluator.evaluate(&row).expect("evaluate"), "");
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let model = model_of(vec![
            FieldDefinition::new("age", FieldType::Integer),
            FieldDefinition::new("band", FieldType::String).with_conditional("$age>60", "senior"),
        ]);
        let band = model.field("band").expect("band");
        let row = row_with(&model, &[]);
        let err = band.generate_computed_value(&row).expect_err("should fail");
        assert!(matches!(
            err,
            crate::GenerationError::MissingDependency { ref dependency, .. } if dependency == "age"
        ));
    }
}
