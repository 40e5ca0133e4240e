//! Typed fields: random value production, computed values and conversions.

mod choices;
mod lookup;
mod primitives;

use std::sync::Arc;

use rand::RngCore;
use tracing::warn;

use datagen_core::FieldType;
use datagen_definition::FieldDefinition;

use crate::conditions::ConditionalEvaluator;
use crate::dictionaries::{find_city, find_name};
use crate::errors::Result;
use crate::row::Row;
use crate::value::{City, CsvRecord, FieldValue, NameEntry};

use lookup::{CityGen, CountryGen, CsvGen, EmailGen, NameGen, PhoneGen};
use primitives::{
    ALPHANUMERIC, BIRTHDATE_FORMAT, BirthdateGen, BooleanGen, BytesGen, DateGen, DateTextGen,
    FloatGen, HashGen, IncrementGen, IntegerGen, LETTERS, LongGen, RegexGen, TextGen, TimestampGen,
    md5_digest, parse_birthdate, parse_bool, parse_date_time, random_ip, random_uuid,
};

/// Column qualifier used when neither the field nor the column-family
/// mapping names one.
pub const DEFAULT_HBASE_QUALIFIER: &str = "cq";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

enum Generator {
    Text(TextGen),
    Regex(RegexGen),
    Integer(IntegerGen),
    Long(LongGen),
    Float(FloatGen),
    Boolean(BooleanGen),
    Increment(IncrementGen),
    Timestamp(TimestampGen),
    Date(DateGen),
    DateText(DateTextGen),
    Birthdate(BirthdateGen),
    Name(NameGen),
    City(CityGen),
    Country(CountryGen),
    Email(EmailGen),
    Phone(PhoneGen),
    Ip,
    Uuid,
    Bytes(BytesGen),
    Hash(HashGen),
    Csv(CsvGen),
}

impl Generator {
    fn build(definition: &FieldDefinition) -> Result<Self> {
        Ok(match definition.field_type {
            FieldType::String => Generator::Text(TextGen::build(definition, ALPHANUMERIC)?),
            FieldType::StringAz => Generator::Text(TextGen::build(definition, LETTERS)?),
            FieldType::StringRegex => Generator::Regex(RegexGen::build(definition)?),
            FieldType::Integer => Generator::Integer(IntegerGen::build(definition)?),
            FieldType::IncrementInteger => Generator::Increment(IncrementGen::integer(definition)?),
            FieldType::Long => Generator::Long(LongGen::build(definition)?),
            FieldType::IncrementLong => Generator::Increment(IncrementGen::long(definition)?),
            FieldType::Float => Generator::Float(FloatGen::build(definition)?),
            FieldType::Boolean => Generator::Boolean(BooleanGen::build(definition)?),
            FieldType::Timestamp => Generator::Timestamp(TimestampGen::build(definition)?),
            FieldType::Date => Generator::Date(DateGen::build(definition)?),
            FieldType::DateAsString => Generator::DateText(DateTextGen::build(definition)?),
            FieldType::Birthdate => Generator::Birthdate(BirthdateGen::build(definition)?),
            FieldType::Name => Generator::Name(NameGen::build(definition)),
            FieldType::City => Generator::City(CityGen::build(definition)),
            FieldType::Country => Generator::Country(CountryGen::build(definition)?),
            FieldType::Email => Generator::Email(EmailGen::build(definition)?),
            FieldType::Phone => Generator::Phone(PhoneGen::build(definition)),
            FieldType::Ip => Generator::Ip,
            FieldType::Uuid => Generator::Uuid,
            FieldType::Bytes => Generator::Bytes(BytesGen::build(definition)?),
            FieldType::HashMd5 => Generator::Hash(HashGen::build(definition)?),
            FieldType::Csv => Generator::Csv(CsvGen::build(definition)?),
        })
    }

    fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        match self {
            Generator::Text(generator) => generator.generate(rng),
            Generator::Regex(generator) => generator.generate(rng),
            Generator::Integer(generator) => generator.generate(rng),
            Generator::Long(generator) => generator.generate(rng),
            Generator::Float(generator) => generator.generate(rng),
            Generator::Boolean(generator) => generator.generate(rng),
            Generator::Increment(generator) => generator.generate(),
            Generator::Timestamp(generator) => generator.generate(rng),
            Generator::Date(generator) => generator.generate(rng),
            Generator::DateText(generator) => generator.generate(rng),
            Generator::Birthdate(generator) => generator.generate(rng),
            Generator::Name(generator) => generator.generate(rng),
            Generator::City(generator) => generator.generate(rng),
            Generator::Country(generator) => generator.generate(rng),
            Generator::Email(generator) => generator.generate(rng),
            Generator::Phone(generator) => generator.generate(rng),
            Generator::Ip => random_ip(rng),
            Generator::Uuid => random_uuid(rng),
            Generator::Bytes(generator) => generator.generate(rng),
            Generator::Hash(generator) => generator.generate(rng),
            Generator::Csv(generator) => generator.generate(rng),
        }
    }
}

/// A field of a built model. Immutable once built and shared by every worker;
/// the only mutable state is the counter of increment fields.
pub struct Field {
    name: String,
    field_type: FieldType,
    ghost: bool,
    hbase_column_qualifier: String,
    generator: Generator,
    conditional: Option<ConditionalEvaluator>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("ghost", &self.ghost)
            .field("computed", &self.is_computed())
            .finish()
    }
}

impl Field {
    /// Build a field without its conditional; `hbase_family` comes from the
    /// model's column-family mapping.
    pub(crate) fn build(definition: &FieldDefinition, hbase_family: Option<&str>) -> Result<Self> {
        let hbase_column_qualifier = definition
            .hbase_column_qualifier
            .as_deref()
            .or(hbase_family)
            .unwrap_or(DEFAULT_HBASE_QUALIFIER)
            .to_string();
        Ok(Self {
            name: definition.name.clone(),
            field_type: definition.field_type,
            ghost: definition.ghost,
            hbase_column_qualifier,
            generator: Generator::build(definition)?,
            conditional: None,
        })
    }

    pub(crate) fn set_conditional(&mut self, conditional: ConditionalEvaluator) {
        self.conditional = Some(conditional);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_ghost(&self) -> bool {
        self.ghost
    }

    pub fn is_computed(&self) -> bool {
        self.conditional.is_some()
    }

    pub fn hbase_column_qualifier(&self) -> &str {
        &self.hbase_column_qualifier
    }

    pub fn conditional(&self) -> Option<&ConditionalEvaluator> {
        self.conditional.as_ref()
    }

    /// Produce one random value honouring the field's constraints.
    pub fn generate_random_value(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.generator.generate(rng)
    }

    /// Derive the value of a computed field from the independent values
    /// already present in `row`.
    pub fn generate_computed_value(&self, row: &Row) -> Result<FieldValue> {
        match &self.conditional {
            Some(conditional) => {
                let raw = conditional.evaluate(row)?;
                Ok(self.cast_value(&raw))
            }
            None => Ok(FieldValue::Null),
        }
    }

    /// Text form of a value, used by every row projection.
    pub fn to_string_value(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => "null".to_string(),
            FieldValue::Bool(value) => value.to_string(),
            FieldValue::Int(value) => value.to_string(),
            FieldValue::Long(value) => value.to_string(),
            FieldValue::Float(value) => value.to_string(),
            FieldValue::Text(value) => value.clone(),
            FieldValue::Bytes(value) => hex::encode(value),
            FieldValue::Date(value) => value.format(DATE_FORMAT).to_string(),
            FieldValue::Birthdate(value) => value.format(BIRTHDATE_FORMAT).to_string(),
            FieldValue::City(city) => city.name.clone(),
            FieldValue::Name(entry) => entry.name.clone(),
            FieldValue::CsvRow(record) => match &self.generator {
                Generator::Csv(generator) => record.get(generator.column()).unwrap_or("").to_string(),
                _ => String::new(),
            },
        }
    }

    /// Parse the text produced by a conditional back into this field's type.
    ///
    /// An empty string yields `Null` for non-text fields; text that does not
    /// parse is logged and also yields `Null`.
    pub fn cast_value(&self, raw: &str) -> FieldValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() && !self.is_textual() {
            return FieldValue::Null;
        }

        let parsed = match self.field_type {
            FieldType::Integer | FieldType::IncrementInteger => trimmed
                .parse::<i32>()
                .ok()
                .or_else(|| whole_number(trimmed).and_then(|value| i32::try_from(value).ok()))
                .map(FieldValue::Int),
            FieldType::Long | FieldType::IncrementLong | FieldType::Timestamp => trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| whole_number(trimmed))
                .map(FieldValue::Long),
            FieldType::Float => trimmed.parse::<f32>().ok().map(FieldValue::Float),
            FieldType::Boolean => parse_bool(trimmed),
            FieldType::Date => parse_date_time(trimmed).map(FieldValue::Date),
            FieldType::Birthdate => parse_birthdate(trimmed).map(FieldValue::Birthdate),
            FieldType::Bytes => Some(FieldValue::Bytes(
                hex::decode(trimmed).unwrap_or_else(|_| raw.as_bytes().to_vec()),
            )),
            FieldType::HashMd5 => Some(FieldValue::Bytes(md5_digest(raw))),
            FieldType::Name => Some(FieldValue::Name(find_name(trimmed).unwrap_or_else(|| {
                Arc::new(NameEntry {
                    name: trimmed.to_string(),
                    country: String::new(),
                    male: false,
                    female: false,
                    unisex: false,
                })
            }))),
            FieldType::City => Some(FieldValue::City(find_city(trimmed).unwrap_or_else(|| {
                Arc::new(City {
                    name: trimmed.to_string(),
                    latitude: String::new(),
                    longitude: String::new(),
                    country: String::new(),
                    population: 0,
                })
            }))),
            FieldType::Csv => match &self.generator {
                Generator::Csv(generator) => Some(FieldValue::CsvRow(
                    generator.find(trimmed).unwrap_or_else(|| {
                        let mut record = CsvRecord::default();
                        record
                            .columns
                            .insert(generator.column().to_string(), trimmed.to_string());
                        Arc::new(record)
                    }),
                )),
                _ => None,
            },
            FieldType::String
            | FieldType::StringAz
            | FieldType::StringRegex
            | FieldType::Country
            | FieldType::Email
            | FieldType::Phone
            | FieldType::Ip
            | FieldType::Uuid
            | FieldType::DateAsString => Some(FieldValue::Text(raw.to_string())),
        };

        parsed.unwrap_or_else(|| {
            warn!(
                field = %self.name,
                field_type = %self.field_type,
                value = raw,
                "computed value does not fit the field type"
            );
            FieldValue::Null
        })
    }

    /// Hive column type.
    pub fn sql_type(&self) -> &'static str {
        match self.field_type {
            FieldType::Integer | FieldType::IncrementInteger => "INT",
            FieldType::Long | FieldType::IncrementLong | FieldType::Timestamp => "BIGINT",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Bytes => "BINARY",
            FieldType::Date => "TIMESTAMP",
            _ => "STRING",
        }
    }

    /// Avro primitive type.
    pub fn avro_type(&self) -> &'static str {
        match self.field_type {
            FieldType::Integer | FieldType::IncrementInteger => "int",
            FieldType::Long | FieldType::IncrementLong | FieldType::Timestamp => "long",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Bytes | FieldType::HashMd5 => "bytes",
            _ => "string",
        }
    }

    fn is_textual(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::String
                | FieldType::StringAz
                | FieldType::StringRegex
                | FieldType::Country
                | FieldType::Email
                | FieldType::Phone
                | FieldType::Ip
                | FieldType::Uuid
                | FieldType::DateAsString
        )
    }
}

/// Integer value of a decimal string such as `14.0`; fractional parts are
/// truncated.
fn whole_number(raw: &str) -> Option<i64> {
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.abs() < 9.0e18 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}
