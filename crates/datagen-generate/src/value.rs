//! Values held by rows.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

/// Value generated for one field of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDateTime),
    Birthdate(NaiveDate),
    City(Arc<City>),
    Name(Arc<NameEntry>),
    CsvRow(Arc<CsvRecord>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(i64::from(*value)),
            FieldValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(value) => Some(f64::from(*value)),
            FieldValue::Long(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(f64::from(*value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

/// Entry of the city dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub country: String,
    pub population: u64,
}

/// Entry of the first-name dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub name: String,
    pub country: String,
    pub male: bool,
    pub female: bool,
    pub unisex: bool,
}

/// Sex derived from the gender flags of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl NameEntry {
    pub fn sex(&self) -> Sex {
        match (self.male, self.female) {
            (true, false) => Sex::Male,
            (false, true) => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Male => "MALE",
            Sex::Female => "FEMALE",
            Sex::Unknown => "UNKNOWN",
        })
    }
}

/// One line of a user-provided CSV file, keyed by header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvRecord {
    pub columns: BTreeMap<String, String>,
}

impl CsvRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(male: bool, female: bool) -> NameEntry {
        NameEntry {
            name: "Camille".to_string(),
            country: "FR".to_string(),
            male,
            female,
            unisex: male && female,
        }
    }

    #[test]
    fn sex_follows_gender_flags() {
        assert_eq!(name(true, false).sex(), Sex::Male);
        assert_eq!(name(false, true).sex(), Sex::Female);
        assert_eq!(name(true, true).sex().to_string(), "UNKNOWN");
    }

    #[test]
    fn numeric_views_widen() {
        assert_eq!(FieldValue::Int(7).as_i64(), Some(7));
        assert_eq!(FieldValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(FieldValue::Text("7".to_string()).as_i64(), None);
    }
}
