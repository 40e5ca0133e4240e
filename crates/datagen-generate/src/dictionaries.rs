//! Embedded dictionaries and the cache of CSV files read by `CSV` fields.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use serde::Deserialize;
use tracing::warn;

use crate::errors::{GenerationError, Result};
use crate::value::{City, CsvRecord, NameEntry};

const CITIES: &str = include_str!("../assets/dictionaries/cities.csv");
const NAMES: &str = include_str!("../assets/dictionaries/names.csv");
const COUNTRIES: &str = include_str!("../assets/dictionaries/countries.csv");
const PHONE_INDICATORS: &str = include_str!("../assets/dictionaries/phone_indicators.csv");

#[derive(Debug, Deserialize)]
struct CityLine {
    name: String,
    lat: String,
    long: String,
    country: String,
    population: u64,
}

#[derive(Debug, Deserialize)]
struct NameLine {
    name: String,
    country: String,
    male: u8,
    female: u8,
    unisex: u8,
}

#[derive(Debug, Deserialize)]
struct CountryLine {
    country: String,
}

/// International dialing prefix of a country.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneIndicator {
    pub country: String,
    pub indicator: String,
}

pub fn cities() -> &'static [Arc<City>] {
    static CITIES_DICO: OnceLock<Vec<Arc<City>>> = OnceLock::new();
    CITIES_DICO.get_or_init(|| {
        let lines: Vec<CityLine> = parse_embedded("cities", CITIES);
        if lines.is_empty() {
            return vec![Arc::new(City {
                name: "world".to_string(),
                latitude: "0".to_string(),
                longitude: "0".to_string(),
                country: "world".to_string(),
                population: 8_000_000_000,
            })];
        }
        lines
            .into_iter()
            .map(|line| {
                Arc::new(City {
                    name: line.name,
                    latitude: line.lat,
                    longitude: line.long,
                    country: line.country,
                    population: line.population,
                })
            })
            .collect()
    })
}

pub fn names() -> &'static [Arc<NameEntry>] {
    static NAMES_DICO: OnceLock<Vec<Arc<NameEntry>>> = OnceLock::new();
    NAMES_DICO.get_or_init(|| {
        let lines: Vec<NameLine> = parse_embedded("names", NAMES);
        if lines.is_empty() {
            return vec![Arc::new(NameEntry {
                name: "Alex".to_string(),
                country: "world".to_string(),
                male: true,
                female: true,
                unisex: true,
            })];
        }
        lines
            .into_iter()
            .map(|line| {
                Arc::new(NameEntry {
                    name: line.name,
                    country: line.country,
                    male: line.male != 0,
                    female: line.female != 0,
                    unisex: line.unisex != 0,
                })
            })
            .collect()
    })
}

pub fn countries() -> &'static [String] {
    static COUNTRIES_DICO: OnceLock<Vec<String>> = OnceLock::new();
    COUNTRIES_DICO.get_or_init(|| {
        let lines: Vec<CountryLine> = parse_embedded("countries", COUNTRIES);
        let countries: Vec<String> = lines.into_iter().map(|line| line.country).collect();
        if countries.is_empty() {
            vec!["world".to_string()]
        } else {
            countries
        }
    })
}

pub fn phone_indicators() -> &'static [PhoneIndicator] {
    static INDICATORS: OnceLock<Vec<PhoneIndicator>> = OnceLock::new();
    INDICATORS.get_or_init(|| parse_embedded("phone indicators", PHONE_INDICATORS))
}

/// Look up a city by name, case-insensitively.
pub fn find_city(name: &str) -> Option<Arc<City>> {
    cities()
        .iter()
        .find(|city| city.name.eq_ignore_ascii_case(name.trim()))
        .cloned()
}

/// Look up a first name, case-insensitively.
pub fn find_name(name: &str) -> Option<Arc<NameEntry>> {
    names()
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
        .cloned()
}

fn parse_embedded<T>(label: &str, contents: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());
    let mut values = Vec::new();
    for record in reader.deserialize() {
        match record {
            Ok(value) => values.push(value),
            Err(err) => warn!(dictionary = label, error = %err, "skipping dictionary line"),
        }
    }
    values
}

/// Parsed CSV file backing `CSV` fields.
#[derive(Debug)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Arc<CsvRecord>>,
}

/// Cache of CSV files keyed by path and separator, shared by all models.
#[derive(Debug, Default)]
pub struct CsvFileCache {
    cache: RwLock<BTreeMap<(PathBuf, u8), Arc<CsvTable>>>,
}

impl CsvFileCache {
    pub fn load(&self, path: &Path, separator: u8) -> Result<Arc<CsvTable>> {
        let key = (path.to_path_buf(), separator);
        if let Some(table) = self.cached(&key) {
            return Ok(table);
        }

        let table = Arc::new(Self::read_table(path, separator)?);
        let mut cache = self
            .cache
            .write()
            .map_err(|_| GenerationError::InvalidModel("csv cache poisoned".to_string()))?;
        cache.insert(key, Arc::clone(&table));
        Ok(table)
    }

    fn cached(&self, key: &(PathBuf, u8)) -> Option<Arc<CsvTable>> {
        let cache = self.cache.read().ok()?;
        cache.get(key).cloned()
    }

    fn read_table(path: &Path, separator: u8) -> Result<CsvTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(separator)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let columns = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(Arc::new(CsvRecord { columns }));
        }

        Ok(CsvTable { headers, rows })
    }
}

pub fn csv_files() -> &'static CsvFileCache {
    static FILES: OnceLock<CsvFileCache> = OnceLock::new();
    FILES.get_or_init(CsvFileCache::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_dictionaries_parse() {
        assert!(cities().iter().any(|city| city.country == "France"));
        assert!(names().iter().any(|entry| entry.country == "FR"));
        assert!(countries().iter().any(|country| country == "Japan"));
        assert!(phone_indicators().iter().any(|line| line.indicator == "33"));
    }

    #[test]
    fn lookups_ignore_case() {
        let city = find_city("paris").expect("paris");
        assert_eq!(city.latitude, "48.8566");
        let name = find_name("CAMILLE").expect("camille");
        assert!(name.unisex);
    }

    #[test]
    fn csv_files_are_cached_by_path() {
        let dir = std::env::temp_dir().join(format!("datagen-csv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create dir");
        let path = dir.join("products.csv");
        std::fs::write(&path, "sku;label\nA1;apple\nB2;banana\n").expect("write csv");

        let first = csv_files().load(&path, b';').expect("load");
        let second = csv_files().load(&path, b';').expect("load again");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.headers, vec!["sku", "label"]);
        assert_eq!(first.rows[1].get("label"), Some("banana"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
