use datagen_definition::{ConditionalRule, LineSyntax, parse_line_key};

use crate::conditions::{Condition, FieldResolver, Formula, Injection, Link};
use crate::errors::Result;
use crate::row::Row;

/// What a conditional line does once selected.
#[derive(Debug)]
pub enum LineKind {
    /// OR of AND-groups; the value template is rendered when satisfied.
    Conditions {
        groups: Vec<Vec<Condition>>,
        value: Injection,
    },
    Formula(Formula),
    Link(Link),
    Injection(Injection),
    Default(Injection),
}

/// One line of a field's conditionals.
#[derive(Debug)]
pub struct ConditionsLine {
    kind: LineKind,
}

impl ConditionsLine {
    pub(crate) fn build(rule: &ConditionalRule, resolver: &FieldResolver<'_>) -> Result<Self> {
        let syntax = parse_line_key(&rule.key).map_err(|message| resolver.invalid(message))?;
        let kind = match syntax {
            LineSyntax::Conditions(groups) => LineKind::Conditions {
                groups: groups
                    .iter()
                    .map(|group| {
                        group
                            .iter()
                            .map(|condition| Condition::build(condition, resolver))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect::<Result<Vec<_>>>()?,
                value: Injection::build(&rule.value, resolver)?,
            },
            LineSyntax::Formula => LineKind::Formula(Formula::build(&rule.value, resolver)?),
            LineSyntax::Link => LineKind::Link(Link::build(&rule.value, resolver)?),
            LineSyntax::Injection => LineKind::Injection(Injection::build(&rule.value, resolver)?),
            LineSyntax::Default => LineKind::Default(Injection::build(&rule.value, resolver)?),
        };
        Ok(Self { kind })
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    /// AND binds tighter than OR and both short-circuit; lines other than
    /// conditions always hold.
    pub fn is_satisfied(&self, row: &Row, owner: &str) -> Result<bool> {
        let LineKind::Conditions { groups, .. } = &self.kind else {
            return Ok(true);
        };
        for group in groups {
            let mut holds = true;
            for condition in group {
                if !condition.is_satisfied(row, owner)? {
                    holds = false;
                    break;
                }
            }
            if holds {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Value of the line, or `None` when its conditions do not hold.
    pub fn evaluate(&self, row: &Row, owner: &str) -> Result<Option<String>> {
        let value = match &self.kind {
            LineKind::Conditions { value, .. } => {
                if !self.is_satisfied(row, owner)? {
                    return Ok(None);
                }
                value.render(row, owner)?
            }
            LineKind::Formula(formula) => formula.compute(row, owner)?,
            LineKind::Link(link) => link.resolve(row, owner)?,
            LineKind::Injection(injection) | LineKind::Default(injection) => {
                injection.render(row, owner)?
            }
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    use crate::model::Model;
    use crate::row::Row;
    use crate::test_support::{model_of, row_with};
    use crate::value::FieldValue;

    fn flags_model() -> Model {
        model_of(vec![
            FieldDefinition::new("a", FieldType::Boolean),
            FieldDefinition::new("b", FieldType::Boolean),
            FieldDefinition::new("c", FieldType::Boolean),
            FieldDefinition::new("out", FieldType::String)
                .with_conditional("$a=true & $b=true | $c=true", "yes"),
        ])
    }

    fn flags(model: &Model, a: bool, b: bool, c: bool) -> Row {
        row_with(
            model,
            &[
                ("a", FieldValue::Bool(a)),
                ("b", FieldValue::Bool(b)),
                ("c", FieldValue::Bool(c)),
            ],
        )
    }

    fn line_holds(model: &Model, row: &Row) -> bool {
        let out = model.field("out").expect("out");
        let line = &out.conditional().expect("computed").lines()[0];
        line.is_satisfied(row, "out").expect("evaluate")
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let model = flags_model();
        assert!(line_holds(&model, &flags(&model, true, false, true)));
        assert!(!line_holds(&model, &flags(&model, true, false, false)));
        assert!(line_holds(&model, &flags(&model, true, true, false)));
        assert!(!line_holds(&model, &flags(&model, false, true, false)));
    }

    #[test]
    fn or_short_circuits_on_first_group() {
        let model = flags_model();
        let row = row_with(
            &model,
            &[("a", FieldValue::Bool(true)), ("b", FieldValue::Bool(true))],
        );
        assert!(line_holds(&model, &row));
    }

    #[test]
    fn condition_values_accept_placeholders() {
        let model = model_of(vec![
            FieldDefinition::new("age", FieldType::Integer),
            FieldDefinition::new("label", FieldType::String)
                .with_conditional("$age>17", "adult-${age}")
                .with_conditional("default", "minor"),
        ]);
        let row = row_with(&model, &[("age", FieldValue::Int(30))]);
        let label = model.field("label").expect("label");
        assert_eq!(
            label.generate_computed_value(&row).expect("compute"),
            FieldValue::Text("adult-30".to_string())
        );
    }
}
