//! Generators that need no dictionary: text, numbers, dates, identifiers.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fake::Fake;
use md5::{Digest, Md5};
use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;
use serde_json::Value;

use datagen_definition::FieldDefinition;

use crate::errors::{GenerationError, Result};
use crate::fields::choices::Choices;
use crate::value::FieldValue;

const DEFAULT_LENGTH: usize = 20;
const DEFAULT_MAX_REPEAT: u32 = 32;
pub(crate) const ALPHANUMERIC: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz";
pub(crate) const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
pub(crate) const BIRTHDATE_FORMAT: &str = "%d/%m/%Y";
const DATE_BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Pattern of `DATE_AS_STRING` fields without one: an RFC 3339 instant.
const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%dT%H:%M:%SZ";
/// Widest float range a uniform draw can cover without overflowing.
const FLOAT_SPAN: f32 = f32::MAX / 2.0;
/// 9999-12-31T23:59:59 UTC, upper bound of unbounded dates.
const LATEST_DATE_SECONDS: i64 = 253_402_300_799;

pub(crate) struct TextGen {
    choices: Choices,
    length: usize,
    charset: &'static [u8],
}

impl TextGen {
    pub(crate) fn build(definition: &FieldDefinition, charset: &'static [u8]) -> Result<Self> {
        Ok(Self {
            choices: Choices::build(definition, |raw| Some(FieldValue::Text(raw.to_string())))?,
            length: length_of(definition)?,
            charset,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.choices
            .pick(rng)
            .unwrap_or_else(|| FieldValue::Text(random_chars(rng, self.charset, self.length)))
    }
}

pub(crate) struct RegexGen {
    regex: RandRegex,
}

impl RegexGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let pattern = definition.regex.as_deref().ok_or_else(|| {
            GenerationError::InvalidModel(format!("field '{}' needs a regex", definition.name))
        })?;
        let regex = RandRegex::compile(pattern, DEFAULT_MAX_REPEAT).map_err(|err| {
            GenerationError::InvalidModel(format!(
                "field '{}': invalid regex pattern: {err}",
                definition.name
            ))
        })?;
        Ok(Self { regex })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        let value: String = rng.sample(&self.regex);
        FieldValue::Text(value)
    }
}

pub(crate) struct IntegerGen {
    choices: Choices,
    min: i32,
    max: i32,
}

impl IntegerGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let min = int_bound(definition, definition.min.as_ref())?.unwrap_or(i64::from(i32::MIN));
        let max = int_bound(definition, definition.max.as_ref())?.unwrap_or(i64::from(i32::MAX));
        let (min, max) = ordered(definition, min, max)?;
        let narrow = |value: i64| {
            i32::try_from(value).map_err(|_| {
                GenerationError::InvalidModel(format!(
                    "field '{}': bound {value} does not fit an integer",
                    definition.name
                ))
            })
        };
        Ok(Self {
            choices: Choices::build(definition, |raw| raw.parse().ok().map(FieldValue::Int))?,
            min: narrow(min)?,
            max: narrow(max)?,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.choices
            .pick(rng)
            .unwrap_or_else(|| FieldValue::Int(rng.random_range(self.min..=self.max)))
    }
}

pub(crate) struct LongGen {
    choices: Choices,
    min: i64,
    max: i64,
}

impl LongGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let min = int_bound(definition, definition.min.as_ref())?.unwrap_or(i64::MIN);
        let max = int_bound(definition, definition.max.as_ref())?.unwrap_or(i64::MAX);
        let (min, max) = ordered(definition, min, max)?;
        Ok(Self {
            choices: Choices::build(definition, |raw| raw.parse().ok().map(FieldValue::Long))?,
            min,
            max,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.choices
            .pick(rng)
            .unwrap_or_else(|| FieldValue::Long(rng.random_range(self.min..=self.max)))
    }
}

pub(crate) struct FloatGen {
    choices: Choices,
    bounds: Option<(f32, f32)>,
}

impl FloatGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let min = float_bound(definition, definition.min.as_ref())?;
        let max = float_bound(definition, definition.max.as_ref())?;
        let bounds = match (min, max) {
            (None, None) => None,
            (Some(min), None) => Some((min, (min + FLOAT_SPAN).min(f32::MAX))),
            (None, Some(max)) if max >= 0.0 => Some(((max - FLOAT_SPAN).max(0.0), max)),
            (None, Some(max)) => Some(((max - FLOAT_SPAN).max(f32::MIN), max)),
            (Some(min), Some(max)) => Some(float_range(definition, min, max)?),
        };
        Ok(Self {
            choices: Choices::build(definition, |raw| raw.parse().ok().map(FieldValue::Float))?,
            bounds,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        if let Some(value) = self.choices.pick(rng) {
            return value;
        }
        let value = match self.bounds {
            Some((min, max)) => rng.random_range(min..=max),
            None => rng.random_range(0.0_f32..1.0),
        };
        FieldValue::Float(value)
    }
}

pub(crate) struct BooleanGen {
    choices: Choices,
}

impl BooleanGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        Ok(Self {
            choices: Choices::build(definition, parse_bool)?,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.choices
            .pick(rng)
            .unwrap_or_else(|| FieldValue::Bool(rng.random_bool(0.5)))
    }
}

/// Counter shared by every worker generating the same model.
pub(crate) enum IncrementGen {
    Integer(AtomicI32),
    Long(AtomicI64),
}

impl IncrementGen {
    pub(crate) fn integer(definition: &FieldDefinition) -> Result<Self> {
        let start = int_bound(definition, definition.min.as_ref())?.unwrap_or(0);
        let start = i32::try_from(start).map_err(|_| {
            GenerationError::InvalidModel(format!(
                "field '{}': start {start} does not fit an integer",
                definition.name
            ))
        })?;
        Ok(IncrementGen::Integer(AtomicI32::new(start)))
    }

    pub(crate) fn long(definition: &FieldDefinition) -> Result<Self> {
        let start = int_bound(definition, definition.min.as_ref())?.unwrap_or(0);
        Ok(IncrementGen::Long(AtomicI64::new(start)))
    }

    /// Next value of the counter; the first call returns `min + 1`.
    pub(crate) fn generate(&self) -> FieldValue {
        match self {
            IncrementGen::Integer(counter) => {
                FieldValue::Int(counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
            }
            IncrementGen::Long(counter) => {
                FieldValue::Long(counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
            }
        }
    }
}

pub(crate) struct TimestampGen {
    choices: Choices,
    use_now: bool,
}

impl TimestampGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        Ok(Self {
            choices: Choices::build(definition, |raw| raw.parse().ok().map(FieldValue::Long))?,
            use_now: definition.use_now,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        if !self.use_now
            && let Some(value) = self.choices.pick(rng)
        {
            return value;
        }
        FieldValue::Long(Utc::now().timestamp_millis())
    }
}

pub(crate) struct DateGen {
    choices: Choices,
    min: i64,
    max: i64,
    use_now: bool,
}

impl DateGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let (min, max) = epoch_range(definition)?;
        Ok(Self {
            choices: Choices::build(definition, |raw| parse_date_time(raw).map(FieldValue::Date))?,
            min,
            max,
            use_now: definition.use_now,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        if self.use_now {
            return FieldValue::Date(Utc::now().naive_utc());
        }
        if let Some(value) = self.choices.pick(rng) {
            return value;
        }
        let seconds = rng.random_range(self.min..=self.max);
        DateTime::from_timestamp(seconds, 0)
            .map(|date| FieldValue::Date(date.naive_utc()))
            .unwrap_or(FieldValue::Null)
    }
}

/// Dates rendered as text with a strftime pattern.
pub(crate) struct DateTextGen {
    choices: Choices,
    pattern: String,
    min: i64,
    max: i64,
    use_now: bool,
}

impl DateTextGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let pattern = match definition.pattern.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_DATE_PATTERN.to_string(),
            Some(pattern) => pattern.to_string(),
        };
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(GenerationError::InvalidModel(format!(
                "field '{}': invalid date pattern '{pattern}'",
                definition.name
            )));
        }
        let (min, max) = epoch_range(definition)?;
        let choices = Choices::build(definition, |raw| {
            NaiveDateTime::parse_from_str(raw, &pattern)
                .ok()
                .or_else(|| parse_date_time(raw))
                .and_then(|date| format_date(&date, &pattern))
                .map(FieldValue::Text)
        })?;
        Ok(Self {
            choices,
            pattern,
            min,
            max,
            use_now: definition.use_now,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        let date = if self.use_now {
            Utc::now().naive_utc()
        } else if let Some(value) = self.choices.pick(rng) {
            return value;
        } else {
            match DateTime::from_timestamp(rng.random_range(self.min..=self.max), 0) {
                Some(date) => date.naive_utc(),
                None => return FieldValue::Null,
            }
        };
        format_date(&date, &self.pattern)
            .map(FieldValue::Text)
            .unwrap_or(FieldValue::Null)
    }
}

/// MD5 digests of random alphanumeric strings.
pub(crate) struct HashGen {
    choices: Choices,
    length: usize,
}

impl HashGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let length = match length_of(definition)? {
            0 => DEFAULT_LENGTH,
            length => length,
        };
        Ok(Self {
            choices: Choices::build(definition, |raw| {
                Some(FieldValue::Bytes(raw.as_bytes().to_vec()))
            })?,
            length,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        self.choices.pick(rng).unwrap_or_else(|| {
            let source = random_chars(rng, ALPHANUMERIC, self.length);
            FieldValue::Bytes(md5_digest(&source))
        })
    }
}

pub(crate) fn md5_digest(text: &str) -> Vec<u8> {
    Md5::digest(text.as_bytes()).to_vec()
}

pub(crate) struct BirthdateGen {
    choices: Choices,
    min: NaiveDate,
    max: NaiveDate,
}

impl BirthdateGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        let min = birthdate_bound(definition, definition.min.as_ref())?
            .or_else(|| NaiveDate::from_ymd_opt(1920, 1, 1))
            .unwrap_or_default();
        let max = birthdate_bound(definition, definition.max.as_ref())?
            .or_else(|| NaiveDate::from_ymd_opt(2022, 1, 1))
            .unwrap_or_default();
        let (min, max) = ordered(definition, min, max)?;
        Ok(Self {
            choices: Choices::build(definition, |raw| parse_birthdate(raw).map(FieldValue::Birthdate))?,
            min,
            max,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        if let Some(value) = self.choices.pick(rng) {
            return value;
        }
        let span = (self.max - self.min).num_days();
        let offset = rng.random_range(0..=span);
        FieldValue::Birthdate(self.min + chrono::Duration::days(offset))
    }
}

pub(crate) struct BytesGen {
    length: usize,
}

impl BytesGen {
    pub(crate) fn build(definition: &FieldDefinition) -> Result<Self> {
        Ok(Self {
            length: length_of(definition)?,
        })
    }

    pub(crate) fn generate(&self, rng: &mut dyn RngCore) -> FieldValue {
        let mut bytes = vec![0_u8; self.length];
        rng.fill_bytes(&mut bytes);
        FieldValue::Bytes(bytes)
    }
}

pub(crate) fn random_uuid(rng: &mut dyn RngCore) -> FieldValue {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    FieldValue::Text(uuid::Uuid::from_bytes(bytes).to_string())
}

pub(crate) fn random_ip(rng: &mut dyn RngCore) -> FieldValue {
    let value: String = fake::faker::internet::en::IPv4().fake_with_rng(rng);
    FieldValue::Text(value)
}

pub(crate) fn random_chars(rng: &mut dyn RngCore, charset: &[u8], length: usize) -> String {
    (0..length)
        .map(|_| char::from(charset[rng.random_range(0..charset.len())]))
        .collect()
}

pub(crate) fn parse_bool(raw: &str) -> Option<FieldValue> {
    if raw.eq_ignore_ascii_case("true") {
        Some(FieldValue::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Some(FieldValue::Bool(false))
    } else {
        None
    }
}

/// Parse an instant (`2024-03-01T10:00:00Z`), a local date-time
/// (`2024-03-01T10:00:00` or `2024-03-01 10:00:00`) or a bare date.
pub(crate) fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, DATE_BOUND_FORMAT).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub(crate) fn parse_birthdate(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, BIRTHDATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Epoch-second range of a date field; unbounded sides default to the
/// epoch and to the end of year 9999.
fn epoch_range(definition: &FieldDefinition) -> Result<(i64, i64)> {
    let min = date_bound(definition, definition.min.as_ref())?.unwrap_or(0);
    let max = date_bound(definition, definition.max.as_ref())?.unwrap_or(LATEST_DATE_SECONDS);
    ordered(definition, min, max)
}

/// `None` when the pattern needs data a UTC date-time cannot give.
fn format_date(date: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.and_utc().format(pattern)).ok()?;
    Some(out)
}

fn length_of(definition: &FieldDefinition) -> Result<usize> {
    match definition.length {
        None => Ok(DEFAULT_LENGTH),
        Some(length) => usize::try_from(length).map_err(|_| {
            GenerationError::InvalidModel(format!(
                "field '{}': length {length} is negative",
                definition.name
            ))
        }),
    }
}

fn ordered<T: PartialOrd + std::fmt::Debug>(
    definition: &FieldDefinition,
    min: T,
    max: T,
) -> Result<(T, T)> {
    if min > max {
        return Err(GenerationError::InvalidModel(format!(
            "field '{}': min {min:?} must be <= max {max:?}",
            definition.name
        )));
    }
    Ok((min, max))
}

fn float_range(definition: &FieldDefinition, min: f32, max: f32) -> Result<(f32, f32)> {
    let (min, max) = ordered(definition, min, max)?;
    if max - min > FLOAT_SPAN * 1.5 {
        return Err(GenerationError::InvalidModel(format!(
            "field '{}': float range {min}..{max} is too wide",
            definition.name
        )));
    }
    Ok((min, max))
}

fn bound_error(definition: &FieldDefinition, raw: &Value) -> GenerationError {
    GenerationError::InvalidModel(format!(
        "field '{}': bound {raw} is not valid for {}",
        definition.name, definition.field_type
    ))
}

fn int_bound(definition: &FieldDefinition, raw: Option<&Value>) -> Result<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = match raw {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| bound_error(definition, raw))
}

fn float_bound(definition: &FieldDefinition, raw: Option<&Value>) -> Result<Option<f32>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = match raw {
        Value::Number(number) => number.as_f64().map(|value| value as f32),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed
        .filter(|value: &f32| value.is_finite())
        .map(Some)
        .ok_or_else(|| bound_error(definition, raw))
}

fn date_bound(definition: &FieldDefinition, raw: Option<&Value>) -> Result<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => parse_date_time(text).map(|date| date.and_utc().timestamp()),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| bound_error(definition, raw))
}

fn birthdate_bound(definition: &FieldDefinition, raw: Option<&Value>) -> Result<Option<NaiveDate>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.as_str()
        .and_then(parse_birthdate)
        .map(Some)
        .ok_or_else(|| bound_error(definition, raw))
}
