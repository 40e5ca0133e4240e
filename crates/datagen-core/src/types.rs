use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Nominal type tag of a field, as written in model documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    #[serde(rename = "STRINGAZ")]
    StringAz,
    StringRegex,
    Integer,
    IncrementInteger,
    Long,
    IncrementLong,
    Float,
    Boolean,
    Timestamp,
    Date,
    DateAsString,
    Birthdate,
    Name,
    City,
    Country,
    Email,
    Phone,
    Ip,
    Uuid,
    Bytes,
    HashMd5,
    Csv,
}

/// Numeric family a condition should compare values with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    Integer,
    Long,
    Float,
    Text,
}

impl FieldType {
    pub const ALL: [FieldType; 23] = [
        FieldType::String,
        FieldType::StringAz,
        FieldType::StringRegex,
        FieldType::Integer,
        FieldType::IncrementInteger,
        FieldType::Long,
        FieldType::IncrementLong,
        FieldType::Float,
        FieldType::Boolean,
        FieldType::Timestamp,
        FieldType::Date,
        FieldType::DateAsString,
        FieldType::Birthdate,
        FieldType::Name,
        FieldType::City,
        FieldType::Country,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Ip,
        FieldType::Uuid,
        FieldType::Bytes,
        FieldType::HashMd5,
        FieldType::Csv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::StringAz => "STRINGAZ",
            FieldType::StringRegex => "STRING_REGEX",
            FieldType::Integer => "INTEGER",
            FieldType::IncrementInteger => "INCREMENT_INTEGER",
            FieldType::Long => "LONG",
            FieldType::IncrementLong => "INCREMENT_LONG",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Date => "DATE",
            FieldType::DateAsString => "DATE_AS_STRING",
            FieldType::Birthdate => "BIRTHDATE",
            FieldType::Name => "NAME",
            FieldType::City => "CITY",
            FieldType::Country => "COUNTRY",
            FieldType::Email => "EMAIL",
            FieldType::Phone => "PHONE",
            FieldType::Ip => "IP",
            FieldType::Uuid => "UUID",
            FieldType::Bytes => "BYTES",
            FieldType::HashMd5 => "HASH_MD5",
            FieldType::Csv => "CSV",
        }
    }

    /// Comparison family used when a condition reads this field.
    pub fn comparison_kind(&self) -> ComparisonKind {
        match self {
            FieldType::Integer | FieldType::IncrementInteger => ComparisonKind::Integer,
            FieldType::Long | FieldType::IncrementLong | FieldType::Timestamp => {
                ComparisonKind::Long
            }
            FieldType::Float => ComparisonKind::Float,
            _ => ComparisonKind::Text,
        }
    }

    /// Attributes a link expression can read from values of this type.
    ///
    /// `None` means any attribute name is accepted (CSV columns are only known
    /// once the file is loaded).
    pub fn link_attributes(&self) -> Option<&'static [&'static str]> {
        match self {
            FieldType::City => Some(&["lat", "long", "country"]),
            FieldType::Name => Some(&["sex", "male", "female", "unisex"]),
            FieldType::Csv => None,
            _ => Some(&[]),
        }
    }

    /// True when values of this type carry more than one attribute.
    pub fn is_structured(&self) -> bool {
        matches!(self, FieldType::City | FieldType::Name | FieldType::Csv)
    }

    /// True when `min`/`max` constrain generated values.
    pub fn accepts_bounds(&self) -> bool {
        matches!(
            self,
            FieldType::Integer
                | FieldType::IncrementInteger
                | FieldType::Long
                | FieldType::IncrementLong
                | FieldType::Float
                | FieldType::Date
                | FieldType::DateAsString
                | FieldType::Birthdate
        )
    }

    /// True when `length` changes generated values.
    pub fn accepts_length(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::StringAz | FieldType::Bytes | FieldType::HashMd5
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_ascii_uppercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|field_type| field_type.as_str() == upper)
            .ok_or_else(|| format!("unknown field type '{value}'"))
    }
}
