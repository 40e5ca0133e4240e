use datagen_definition::{TemplatePart, parse_template};

use crate::conditions::{FieldResolver, ResolvedField};
use crate::errors::Result;
use crate::row::Row;

/// Template whose `${field}` placeholders are replaced by row values.
#[derive(Debug)]
pub struct Injection {
    parts: Vec<Part>,
}

#[derive(Debug)]
enum Part {
    Literal(String),
    Field(ResolvedField),
}

impl Injection {
    pub(crate) fn build(template: &str, resolver: &FieldResolver<'_>) -> Result<Self> {
        let parts = parse_template(template)
            .into_iter()
            .map(|part| match part {
                TemplatePart::Literal(text) => Ok(Part::Literal(text)),
                TemplatePart::Field(name) => resolver.resolve(&name).map(Part::Field),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { parts })
    }

    /// Names of the fields the template reads.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Field(field) => Some(field.name.as_str()),
            Part::Literal(_) => None,
        })
    }

    pub fn render(&self, row: &Row, owner: &str) -> Result<String> {
        let mut rendered = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => rendered.push_str(text),
                Part::Field(field) => rendered.push_str(&field.text(row, owner)?),
            }
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    use crate::test_support::{model_of, row_with};
    use crate::value::FieldValue;

    #[test]
    fn placeholders_take_row_values() {
        let model = model_of(vec![
            FieldDefinition::new("first", FieldType::String),
            FieldDefinition::new("id", FieldType::Integer),
            FieldDefinition::new("login", FieldType::String)
                .with_conditional("injection", "${first}_${id}@corp"),
        ]);
        let row = row_with(
            &model,
            &[
                ("first", FieldValue::Text("ada".to_string())),
                ("id", FieldValue::Int(7)),
            ],
        );
        let login = model.field("login").expect("login");
        assert_eq!(
            login.generate_computed_value(&row).expect("compute"),
            FieldValue::Text("ada_7@corp".to_string())
        );
    }
}
