use datagen_core::FieldType;
use datagen_definition::parse_link;
use tracing::warn;

use crate::conditions::{FieldResolver, ResolvedField};
use crate::errors::Result;
use crate::row::Row;
use crate::value::FieldValue;

/// Attribute a link reads from a structured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAttribute {
    Latitude,
    Longitude,
    Country,
    Sex,
    Male,
    Female,
    Unisex,
    Column(String),
}

/// `$field.attribute`: one attribute of a city, a name or a CSV row.
#[derive(Debug)]
pub struct Link {
    target: ResolvedField,
    attribute: LinkAttribute,
}

impl Link {
    pub(crate) fn build(expression: &str, resolver: &FieldResolver<'_>) -> Result<Self> {
        let (field, attribute) = parse_link(expression).map_err(|message| resolver.invalid(message))?;
        let target = resolver.resolve(&field)?;
        let attribute = match (target.field_type, attribute.as_str()) {
            (FieldType::City, "lat") => LinkAttribute::Latitude,
            (FieldType::City, "long") => LinkAttribute::Longitude,
            (FieldType::City, "country") => LinkAttribute::Country,
            (FieldType::Name, "sex") => LinkAttribute::Sex,
            (FieldType::Name, "male") => LinkAttribute::Male,
            (FieldType::Name, "female") => LinkAttribute::Female,
            (FieldType::Name, "unisex") => LinkAttribute::Unisex,
            (FieldType::Csv, column) => LinkAttribute::Column(column.to_string()),
            (field_type, other) => {
                return Err(resolver.invalid(format!(
                    "{field_type} field '{field}' has no attribute '{other}'"
                )));
            }
        };
        Ok(Self { target, attribute })
    }

    pub fn target(&self) -> &str {
        &self.target.name
    }

    pub fn attribute(&self) -> &LinkAttribute {
        &self.attribute
    }

    /// Attribute text; values that do not carry the attribute are logged and
    /// give an empty string.
    pub fn resolve(&self, row: &Row, owner: &str) -> Result<String> {
        let value = self.target.value(row, owner)?;
        let resolved = match (&self.attribute, value) {
            (LinkAttribute::Latitude, FieldValue::City(city)) => Some(city.latitude.clone()),
            (LinkAttribute::Longitude, FieldValue::City(city)) => Some(city.longitude.clone()),
            (LinkAttribute::Country, FieldValue::City(city)) => Some(city.country.clone()),
            (LinkAttribute::Sex, FieldValue::Name(entry)) => Some(entry.sex().to_string()),
            (LinkAttribute::Male, FieldValue::Name(entry)) => Some(entry.male.to_string()),
            (LinkAttribute::Female, FieldValue::Name(entry)) => Some(entry.female.to_string()),
            (LinkAttribute::Unisex, FieldValue::Name(entry)) => Some(entry.unisex.to_string()),
            (LinkAttribute::Column(column), FieldValue::CsvRow(record)) => {
                record.get(column).map(str::to_string)
            }
            _ => None,
        };
        Ok(resolved.unwrap_or_else(|| {
            warn!(
                field = owner,
                target = %self.target.name,
                attribute = ?self.attribute,
                "link could not be resolved, using an empty value"
            );
            String::new()
        }))
    }
}

#[cfg(test)]
mod tests {
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    use crate::dictionaries::{find_city, find_name};
    use crate::test_support::{model_of, row_with};
    use crate::value::FieldValue;

    #[test]
    fn city_and_name_attributes_resolve() {
        let model = model_of(vec![
            FieldDefinition::new("city", FieldType::City),
            FieldDefinition::new("first", FieldType::Name),
            FieldDefinition::new("lat", FieldType::String).with_conditional("link", "$city.lat"),
            FieldDefinition::new("country", FieldType::String)
                .with_conditional("link", "$city.country"),
            FieldDefinition::new("sex", FieldType::String).with_conditional("link", "$first.sex"),
        ]);
        let row = row_with(
            &model,
            &[
                ("city", FieldValue::City(find_city("Lyon").expect("lyon"))),
                ("first", FieldValue::Name(find_name("Marie").expect("marie"))),
            ],
        );
        let computed = |name: &str| {
            model
                .field(name)
                .expect("field")
                .generate_computed_value(&row)
                .expect("compute")
        };
        assert_eq!(computed("lat"), FieldValue::Text("45.7640".to_string()));
        assert_eq!(computed("country"), FieldValue::Text("France".to_string()));
        assert_eq!(computed("sex"), FieldValue::Text("FEMALE".to_string()));
    }

    #[test]
    fn values_without_the_attribute_give_empty_text() {
        let model = model_of(vec![
            FieldDefinition::new("city", FieldType::City),
            FieldDefinition::new("lat", FieldType::String).with_conditional("link", "$city.lat"),
        ]);
        let row = row_with(&model, &[("city", FieldValue::Null)]);
        let lat = model.field("lat").expect("lat");
        assert_eq!(
            lat.generate_computed_value(&row).expect("compute"),
            FieldValue::Text(String::new())
        );
    }
}
