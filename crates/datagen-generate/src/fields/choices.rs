use rand::{Rng, RngCore};

use datagen_definition::{FieldDefinition, scalar_text};

use crate::errors::{GenerationError, Result};
use crate::value::FieldValue;

/// Possible values of a field: a uniform list, or weighted values drawn
/// proportionally to their weights.
#[derive(Debug, Default)]
pub(crate) struct Choices {
    values: Vec<FieldValue>,
    weighted: Vec<(u64, FieldValue)>,
    total_weight: u64,
}

impl Choices {
    /// Parse the possible values of `definition` with `parse`; a value `parse`
    /// rejects is a model error.
    pub(crate) fn build<F>(definition: &FieldDefinition, parse: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<FieldValue>,
    {
        let convert = |raw: &serde_json::Value| -> Result<FieldValue> {
            scalar_text(raw)
                .and_then(|text| parse(text.trim()))
                .ok_or_else(|| {
                    GenerationError::InvalidModel(format!(
                        "field '{}': {raw} is not a valid {} value",
                        definition.name, definition.field_type
                    ))
                })
        };

        let values = definition
            .possible_values
            .iter()
            .map(convert)
            .collect::<Result<Vec<_>>>()?;

        let mut weighted = Vec::with_capacity(definition.possible_values_weighted.len());
        let mut total_weight = 0_u64;
        for entry in &definition.possible_values_weighted {
            if entry.weight == 0 {
                continue;
            }
            total_weight += u64::from(entry.weight);
            weighted.push((total_weight, convert(&entry.value)?));
        }

        Ok(Self {
            values,
            weighted,
            total_weight,
        })
    }

    pub(crate) fn pick(&self, rng: &mut dyn RngCore) -> Option<FieldValue> {
        if !self.values.is_empty() {
            let idx = rng.random_range(0..self.values.len());
            return Some(self.values[idx].clone());
        }
        if self.total_weight == 0 {
            return None;
        }
        let draw = rng.random_range(0..self.total_weight);
        self.weighted
            .iter()
            .find(|(upper, _)| draw < *upper)
            .map(|(_, value)| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::FieldType;
    use datagen_definition::WeightedValue;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn text(raw: &str) -> Option<FieldValue> {
        Some(FieldValue::Text(raw.to_string()))
    }

    #[test]
    fn weighted_values_follow_their_weights() {
        let mut definition = FieldDefinition::new("segment", FieldType::String);
        definition.possible_values_weighted = vec![
            WeightedValue {
                value: "retail".into(),
                weight: 90,
            },
            WeightedValue {
                value: "business".into(),
                weight: 10,
            },
            WeightedValue {
                value: "never".into(),
                weight: 0,
            },
        ];
        let choices = Choices::build(&definition, text).expect("build");
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut retail = 0;
        for _ in 0..1000 {
            match choices.pick(&mut rng) {
                Some(FieldValue::Text(value)) if value == "retail" => retail += 1,
                Some(FieldValue::Text(value)) => assert_eq!(value, "business"),
                other => panic!("unexpected pick {other:?}"),
            }
        }
        assert!((850..=950).contains(&retail), "retail drawn {retail} times");
    }

    #[test]
    fn plain_values_win_over_weighted_ones() {
        let definition = FieldDefinition::new("flag", FieldType::String).with_possible_values(["a"]);
        let choices = Choices::build(&definition, text).expect("build");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(choices.pick(&mut rng), text("a"));
    }

    #[test]
    fn unparsable_values_are_model_errors() {
        let definition =
            FieldDefinition::new("age", FieldType::Integer).with_possible_values(["old"]);
        let err = Choices::build(&definition, |raw| raw.parse().ok().map(FieldValue::Int))
            .expect_err("should fail");
        assert!(matches!(err, GenerationError::InvalidModel(_)));
    }

    #[test]
    fn empty_choices_pick_nothing() {
        let definition = FieldDefinition::new("free", FieldType::String);
        let choices = Choices::build(&definition, text).expect("build");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(choices.pick(&mut rng), None);
    }
}
