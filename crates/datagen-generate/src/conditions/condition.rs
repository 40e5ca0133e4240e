use std::cmp::Ordering;

use datagen_core::ComparisonKind;
use datagen_definition::{Comparison, ConditionSyntax, Operand};

use crate::conditions::{FieldResolver, ResolvedField};
use crate::errors::Result;
use crate::row::Row;
use crate::value::FieldValue;

/// `$column <op> literal` or `$column <op> $other`.
///
/// The comparison family is taken from the left column's type when the model
/// is built; numeric literals are parsed at the same time.
#[derive(Debug)]
pub struct Condition {
    left: ResolvedField,
    kind: ComparisonKind,
    comparison: Comparison,
    right: RightHand,
}

#[derive(Debug)]
enum RightHand {
    Column(ResolvedField),
    Literal { text: String, number: Option<Number> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Whole(i64),
    Real(f64),
}

impl Condition {
    pub(crate) fn build(syntax: &ConditionSyntax, resolver: &FieldResolver<'_>) -> Result<Self> {
        let left = resolver.resolve(&syntax.column)?;
        let kind = left.field_type.comparison_kind();
        let right = match &syntax.operand {
            Operand::Column(name) => RightHand::Column(resolver.resolve(name)?),
            Operand::Literal(text) => {
                let text = text.trim().to_string();
                let number = parse_number(kind, &text);
                if kind != ComparisonKind::Text && number.is_none() {
                    return Err(resolver.invalid(format!(
                        "'{text}' cannot be compared with numeric field '{}'",
                        left.name
                    )));
                }
                RightHand::Literal { text, number }
            }
        };
        Ok(Self {
            left,
            kind,
            comparison: syntax.comparison,
            right,
        })
    }

    pub fn column(&self) -> &str {
        &self.left.name
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn is_satisfied(&self, row: &Row, owner: &str) -> Result<bool> {
        let left_value = self.left.value(row, owner)?;
        let left_text = self.left.text(row, owner)?;
        let (right_text, right_number) = match &self.right {
            RightHand::Literal { text, number } => (text.clone(), *number),
            RightHand::Column(other) => {
                let value = other.value(row, owner)?;
                let text = other.text(row, owner)?;
                let number = number_of(self.kind, value, &text);
                (text, number)
            }
        };
        let left_text = left_text.trim();
        let right_text = right_text.trim();

        Ok(match self.comparison {
            Comparison::Equals => same_text(left_text, right_text),
            Comparison::Unequals => !same_text(left_text, right_text),
            Comparison::Superior | Comparison::Inferior => {
                let ordering = match (number_of(self.kind, left_value, left_text), right_number) {
                    (Some(left), Some(right)) => compare(left, right),
                    _ => Some(left_text.cmp(right_text)),
                };
                let wanted = if self.comparison == Comparison::Superior {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
                ordering == Some(wanted)
            }
        })
    }
}

/// Case-insensitive equality over Unicode lowercase mappings.
fn same_text(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}

fn parse_number(kind: ComparisonKind, text: &str) -> Option<Number> {
    match kind {
        ComparisonKind::Integer | ComparisonKind::Long => text.parse().ok().map(Number::Whole),
        ComparisonKind::Float => text.parse().ok().map(Number::Real),
        ComparisonKind::Text => None,
    }
}

fn number_of(kind: ComparisonKind, value: &FieldValue, text: &str) -> Option<Number> {
    match kind {
        ComparisonKind::Integer | ComparisonKind::Long => value
            .as_i64()
            .map(Number::Whole)
            .or_else(|| parse_number(kind, text.trim())),
        ComparisonKind::Float => value
            .as_f64()
            .map(Number::Real)
            .or_else(|| parse_number(kind, text.trim())),
        ComparisonKind::Text => None,
    }
}

fn compare(left: Number, right: Number) -> Option<Ordering> {
    match (left, right) {
        (Number::Whole(left), Number::Whole(right)) => Some(left.cmp(&right)),
        (left, right) => as_real(left).partial_cmp(&as_real(right)),
    }
}

fn as_real(number: Number) -> f64 {
    match number {
        Number::Whole(value) => value as f64,
        Number::Real(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    use crate::test_support::{model_of, row_with};
    use crate::value::FieldValue;

    fn satisfied(key: &str, values: &[(&str, FieldValue)]) -> bool {
        let model = model_of(vec![
            FieldDefinition::new("age", FieldType::Integer),
            FieldDefinition::new("limit", FieldType::Integer),
            FieldDefinition::new("score", FieldType::Float),
            FieldDefinition::new("city", FieldType::String),
            FieldDefinition::new("out", FieldType::String).with_conditional(key, "hit"),
        ]);
        let row = row_with(&model, values);
        let out = model.field("out").expect("out");
        let evaluator = out.conditional().expect("computed");
        evaluator.evaluate(&row).expect("evaluate") == "hit"
    }

    #[test]
    fn equality_ignores_case_and_padding() {
        let city = [("city", FieldValue::Text(" Paris ".to_string()))];
        assert!(satisfied("$city=paris", &city));
        assert!(!satisfied("$city!=PARIS", &city));
        assert!(satisfied("$city!Lyon", &city));
    }

    #[test]
    fn equality_folds_non_ascii_case() {
        let city = [("city", FieldValue::Text("ÉVRY".to_string()))];
        assert!(satisfied("$city=évry", &city));
        assert!(!satisfied("$city!=Évry", &city));
        assert!(!satisfied("$city=evry", &city));
    }

    #[test]
    fn numeric_comparisons_are_strict() {
        assert!(satisfied("$age>17", &[("age", FieldValue::Int(18))]));
        assert!(!satisfied("$age>18", &[("age", FieldValue::Int(18))]));
        assert!(!satisfied("$age<18", &[("age", FieldValue::Int(18))]));
        assert!(satisfied("$age<100", &[("age", FieldValue::Int(18))]));
    }

    #[test]
    fn numbers_do_not_compare_as_text() {
        assert!(satisfied("$age>9", &[("age", FieldValue::Int(10))]));
        assert!(satisfied("$score<10", &[("score", FieldValue::Float(9.5))]));
    }

    #[test]
    fn columns_compare_against_columns() {
        let values = [("age", FieldValue::Int(30)), ("limit", FieldValue::Int(21))];
        assert!(satisfied("$age>$limit", &values));
        assert!(!satisfied("$age<$limit", &values));
    }

    #[test]
    fn text_fields_compare_lexicographically() {
        let city = [("city", FieldValue::Text("Berlin".to_string()))];
        assert!(satisfied("$city<Paris", &city));
        assert!(!satisfied("$city>Paris", &city));
    }
}
