//! Generators drawing from dictionaries or user CSV files.

use std::path::Path;
use std::sync::Arc;

use fake::Fake;
use rand::{Rng, RngCore};
use tracing::warn;

use datagen_definition::FieldDefinition;

use crate::dictionaries::{self, csv_files};
use crate::errors::{GenerationError, Result};
use crate::fields::choices::Choices;
use crate::fields::primitives::{ALPHANUMERIC, random_chars};
use crate::value::{City, CsvRecord, FieldValue, NameEntry};

const PHONE_DIGITS: usize = 11;

pub(crate) struct NameGen {
    entries: Vec<Arc<NameEntry>>,
}

impl NameGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Self {
        Self {
            entries: names_for(definition),
        }
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        pick(&self.entries, rng)
            .map(FieldValue::Name)
            .unwrap_or(FieldValue::Null)
    }
}

/// Cities filtered by country; filtered cities are drawn proportionally to
/// their population.
pub(crate) struct CityGen {
    entries: Vec<Arc<City>>,
    cumulative: Vec<u64>,
}

impl CityGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Self {
        let all = dictionaries::cities();
        let filtered: Vec<Arc<City>> = all
            .iter()
            .filter(|city| {
                definition
                    .filters
                    .iter()
                    .any(|country| city.country.eq_ignore_ascii_case(country.trim()))
            })
            .cloned()
            .collect();

        if filtered.is_empty() {
            return Self {
                entries: all.to_vec(),
                cumulative: Vec::new(),
            };
        }

        let smallest = filtered
            .iter()
            .map(|city| city.population)
            .min()
            .unwrap_or(1)
            .max(1);
        let mut total = 0_u64;
        let cumulative = filtered
            .iter()
            .map(|city| {
                total += city.population / smallest + 1;
                total
            })
            .collect();

        Self {
            entries: filtered,
            cumulative,
        }
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        let Some(total) = self.cumulative.last().copied() else {
            return pick(&self.entries, rng)
                .map(FieldValue::City)
                .unwrap_or(FieldValue::Null);
        };
        let draw = rng.random_range(0..total);
        let idx = self.cumulative.partition_point(|upper| *upper <= draw);
        self.entries
            .get(idx)
            .cloned()
            .map(FieldValue::City)
            .unwrap_or(FieldValue::Null)
    }
}

pub(crate) struct CountryGen {
    choices: Choices,
}

impl CountryGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        Ok(Self {
            choices: Choices::build(definition, |raw| Some(FieldValue::Text(raw.to_string())))?,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.choices.pick(rng).unwrap_or_else(|| {
            pick(dictionaries::countries(), rng)
                .map(FieldValue::Text)
                .unwrap_or(FieldValue::Null)
        })
    }
}

/// E-mail addresses built from first names: `<prefix><name>@<provider>`,
/// where the prefix is one alphanumeric character or another name and a dot.
pub(crate) struct EmailGen {
    choices: Choices,
    names: Vec<Arc<NameEntry>>,
}

impl EmailGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        Ok(Self {
            choices: Choices::build(definition, |raw| Some(FieldValue::Text(raw.to_string())))?,
            names: names_for(definition),
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        if let Some(value) = self.choices.pick(rng) {
            return value;
        }
        let prefix = if rng.random_bool(0.5) {
            random_chars(rng, ALPHANUMERIC, 1)
        } else {
            pick(&self.names, rng)
                .map(|entry| format!("{}.", entry.name))
                .unwrap_or_default()
        };
        let name = pick(&self.names, rng)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| "user".to_string());
        let provider: String = fake::faker::internet::en::FreeEmailProvider().fake_with_rng(rng);
        FieldValue::Text(format!("{prefix}{name}@{provider}").to_lowercase())
    }
}

/// Phone numbers `+<indicator> <digits>` with 11 characters once the
/// indicator is counted.
pub(crate) struct PhoneGen {
    indicators: Vec<String>,
}

impl PhoneGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Self {
        let all = dictionaries::phone_indicators();
        let mut indicators: Vec<String> = all
            .iter()
            .filter(|line| {
                definition
                    .filters
                    .iter()
                    .any(|country| line.country.eq_ignore_ascii_case(country.trim()))
            })
            .map(|line| line.indicator.clone())
            .collect();
        if indicators.is_empty() {
            indicators = all.iter().map(|line| line.indicator.clone()).collect();
        }
        Self { indicators }
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        let indicator = pick(&self.indicators, rng).unwrap_or_else(|| "1".to_string());
        let digits = random_chars(
            rng,
            b"0123456789",
            PHONE_DIGITS.saturating_sub(indicator.len()),
        );
        FieldValue::Text(format!("+{indicator} {digits}"))
    }
}

/// Rows of a user CSV file matching every `column=value` filter.
pub(crate) struct CsvGen {
    rows: Vec<Arc<CsvRecord>>,
    column: String,
}

impl CsvGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let invalid = |message: String| {
            GenerationError::InvalidModel(format!("field '{}': {message}", definition.name))
        };
        let file = definition
            .file
            .as_deref()
            .ok_or_else(|| invalid("CSV field needs a file".to_string()))?;
        let column = definition
            .field
            .clone()
            .ok_or_else(|| invalid("CSV field needs the column to render".to_string()))?;
        let separator = match definition.separator.as_deref().map(str::as_bytes) {
            None => b';',
            Some([single]) => *single,
            Some(_) => return Err(invalid("separator must be a single byte".to_string())),
        };

        let table = csv_files().load(Path::new(file), separator)?;
        if !table.headers.contains(&column) {
            return Err(invalid(format!("file {file} has no column '{column}'")));
        }

        let filters = definition
            .filters
            .iter()
            .map(|filter| {
                filter
                    .split_once('=')
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                    .ok_or_else(|| invalid(format!("filter '{filter}' must look like column=value")))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows: Vec<Arc<CsvRecord>> = table
            .rows
            .iter()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(name, value)| row.get(name) == Some(value.as_str()))
            })
            .cloned()
            .collect();
        if rows.is_empty() {
            warn!(field = %definition.name, file, "no CSV row matches the filters");
        }

        Ok(Self { rows, column })
    }

    pub(crate) fn column(&self) -> &str {
        &self.column
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        pick(&self.rows, rng)
            .map(FieldValue::CsvRow)
            .unwrap_or(FieldValue::Null)
    }

    /// Row whose rendered column equals `value`.
    pub(crate) fn find(&self, value: &str) -> Option<Arc<CsvRecord>> {
        self.rows
            .iter()
            .find(|row| row.get(&self.column) == Some(value))
            .cloned()
    }
}

fn names_for(definition: &FieldDefinition) -> Vec<Arc<NameEntry>> {
    let all = dictionaries::names();
    let filtered: Vec<Arc<NameEntry>> = all
        .iter()
        .filter(|entry| {
            definition
                .filters
                .iter()
                .any(|country| entry.country.eq_ignore_ascii_case(country.trim()))
        })
        .cloned()
        .collect();
    if filtered.is_empty() {
        all.to_vec()
    } else {
        filtered
    }
}

fn pick<T: Clone>(values: &[T], rng: &mut dyn RngCore) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    Some(values[rng.random_range(0..values.len())].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::FieldType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn filtered(field_type: FieldType, filters: &[&str]) -> FieldDefinition {
        let mut definition = FieldDefinition::new("f", field_type);
        definition.filters = filters.iter().map(|f| f.to_string()).collect();
        definition
    }

    #[test]
    fn cities_respect_country_filters() {
        let generator = CityGen::build(&filtered(FieldType::City, &["france"]));
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let FieldValue::City(city) = generator.generate(&mut rng) else {
                panic!("expected a city");
            };
            assert_eq!(city.country, "France");
        }
    }

    #[test]
    fn populous_cities_come_up_more_often() {
        let generator = CityGen::build(&filtered(FieldType::City, &["France"]));
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let paris = (0..2000)
            .filter(|_| {
                matches!(generator.generate(&mut rng), FieldValue::City(city) if city.name == "Paris")
            })
            .count();
        assert!(paris > 500, "paris drawn {paris} times");
    }

    #[test]
    fn unknown_filters_fall_back_to_every_name() {
        let generator = NameGen::build(&filtered(FieldType::Name, &["Atlantis"]));
        assert_eq!(generator.entries.len(), dictionaries::names().len());
    }

    #[test]
    fn phones_pad_to_eleven_characters() {
        let generator = PhoneGen::build(&filtered(FieldType::Phone, &["France"]));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let FieldValue::Text(phone) = generator.generate(&mut rng) else {
            panic!("expected text");
        };
        assert!(phone.starts_with("+33 "), "{phone}");
        assert_eq!(phone.len(), "+33 ".len() + 9);
    }

    #[test]
    fn emails_have_a_local_part_and_a_domain() {
        let generator = EmailGen::build(&filtered(FieldType::Email, &["US"])).expect("build");
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let FieldValue::Text(email) = generator.generate(&mut rng) else {
            panic!("expected text");
        };
        let (local, domain) = email.split_once('@').expect("an @");
        assert!(!local.is_empty());
        assert!(domain.contains('.'));
    }

    #[test]
    fn csv_rows_are_filtered_by_column_value() {
        let dir = std::env::temp_dir().join(format!("datagen-lookup-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create dir");
        let path = dir.join("products.csv");
        std::fs::write(&path, "sku;label;aisle\nA1;apple;fruit\nB2;bread;bakery\n")
            .expect("write csv");

        let mut definition = filtered(FieldType::Csv, &["aisle=bakery"]);
        definition.file = Some(path.display().to_string());
        definition.field = Some("label".to_string());
        let generator = CsvGen::build(&definition).expect("build");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let FieldValue::CsvRow(row) = generator.generate(&mut rng) else {
            panic!("expected a csv row");
        };
        assert_eq!(row.get("label"), Some("bread"));
        assert!(generator.find("bread").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
