//! Model options and their documented defaults.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::keys::document_keys;

document_keys! {
    /// Tunable option of a model, read by sinks through `options_or_default`.
    pub enum OptionKey {
        HbaseColumnFamiliesMapping => "HBASE_COLUMN_FAMILIES_MAPPING",
        SolrShards => "SOLR_SHARDS",
        SolrReplicas => "SOLR_REPLICAS",
        SolrJaasFilePath => "SOLR_JAAS_FILE_PATH",
        KuduReplicas => "KUDU_REPLICAS",
        OneFilePerIteration => "ONE_FILE_PER_ITERATION",
        HiveThreadNumber => "HIVE_THREAD_NUMBER",
        HiveTableType => "HIVE_TABLE_TYPE",
        HiveTableFormat => "HIVE_TABLE_FORMAT",
        HiveOnHdfs => "HIVE_ON_HDFS",
        HiveTezQueueName => "HIVE_TEZ_QUEUE_NAME",
        HiveTablePartitionsCols => "HIVE_TABLE_PARTITIONS_COLS",
        HiveTableBucketsCols => "HIVE_TABLE_BUCKETS_COLS",
        HiveTableBucketsNumber => "HIVE_TABLE_BUCKETS_NUMBER",
        CsvHeader => "CSV_HEADER",
        DeletePrevious => "DELETE_PREVIOUS",
        ParquetPageSize => "PARQUET_PAGE_SIZE",
        ParquetRowGroupSize => "PARQUET_ROW_GROUP_SIZE",
        ParquetDictionaryPageSize => "PARQUET_DICTIONARY_PAGE_SIZE",
        ParquetDictionaryEncoding => "PARQUET_DICTIONARY_ENCODING",
        KafkaAcksConfig => "KAFKA_ACKS_CONFIG",
        KafkaRetriesConfig => "KAFKA_RETRIES_CONFIG",
        KafkaJaasFilePath => "KAFKA_JAAS_FILE_PATH",
        KafkaReplicationFactor => "KAFKA_REPLICATION_FACTOR",
        KafkaPartitionsNumber => "KAFKA_PARTITIONS_NUMBER",
        KafkaMessageType => "KAFKA_MESSAGE_TYPE",
        KuduBuckets => "KUDU_BUCKETS",
        KuduBuffer => "KUDU_BUFFER",
        KuduFlush => "KUDU_FLUSH",
        OzoneReplicationFactor => "OZONE_REPLICATION_FACTOR",
        HdfsReplicationFactor => "HDFS_REPLICATION_FACTOR",
        AdlsBlockSize => "ADLS_BLOCK_SIZE",
        AdlsMaxUploadSize => "ADLS_MAX_UPLOAD_SIZE",
        AdlsMaxConcurrency => "ADLS_MAX_CONCURRENCY",
    }
}

/// Declared value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Integer,
    Short,
    Boolean,
    Text,
    ColumnFamilies,
}

/// Parsed option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(i32),
    Short(i16),
    Boolean(bool),
    Text(String),
    /// Field name to HBase column family.
    ColumnFamilies(BTreeMap<String, String>),
}

impl OptionValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(value) => Some(i64::from(*value)),
            OptionValue::Short(value) => Some(i64::from(*value)),
            OptionValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_column_families(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            OptionValue::ColumnFamilies(map) => Some(map),
            _ => None,
        }
    }

    /// Comma-separated text option split into trimmed, non-empty names.
    pub fn as_list(&self) -> Vec<String> {
        self.as_str()
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl OptionKey {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionKey::SolrShards
            | OptionKey::SolrReplicas
            | OptionKey::KuduReplicas
            | OptionKey::HiveThreadNumber
            | OptionKey::HiveTableBucketsNumber
            | OptionKey::ParquetPageSize
            | OptionKey::ParquetDictionaryPageSize
            | OptionKey::ParquetRowGroupSize
            | OptionKey::KafkaRetriesConfig
            | OptionKey::KafkaPartitionsNumber
            | OptionKey::OzoneReplicationFactor
            | OptionKey::KuduBuckets
            | OptionKey::KuduBuffer => OptionKind::Integer,
            OptionKey::OneFilePerIteration
            | OptionKey::HiveOnHdfs
            | OptionKey::CsvHeader
            | OptionKey::ParquetDictionaryEncoding
            | OptionKey::DeletePrevious => OptionKind::Boolean,
            OptionKey::HdfsReplicationFactor | OptionKey::KafkaReplicationFactor => {
                OptionKind::Short
            }
            OptionKey::HbaseColumnFamiliesMapping => OptionKind::ColumnFamilies,
            _ => OptionKind::Text,
        }
    }

    /// Value used when the model does not set this option.
    pub fn default_value(&self) -> Option<OptionValue> {
        let value = match self {
            OptionKey::SolrShards
            | OptionKey::SolrReplicas
            | OptionKey::KuduReplicas
            | OptionKey::HiveThreadNumber => OptionValue::Integer(1),
            OptionKey::CsvHeader
            | OptionKey::ParquetDictionaryEncoding
            | OptionKey::HiveOnHdfs
            | OptionKey::OneFilePerIteration => OptionValue::Boolean(true),
            OptionKey::KafkaAcksConfig => text("all"),
            OptionKey::KafkaMessageType => text("json"),
            OptionKey::KafkaJaasFilePath => text("/home/datagen/jaas/kafka.jaas"),
            OptionKey::SolrJaasFilePath => text("/home/datagen/jaas/solr.jaas"),
            OptionKey::HiveTezQueueName => text("root.default"),
            OptionKey::HiveTableType => text("external"),
            OptionKey::HiveTableFormat => text("orc"),
            OptionKey::HiveTableBucketsCols | OptionKey::HiveTablePartitionsCols => text(""),
            OptionKey::DeletePrevious => OptionValue::Boolean(false),
            OptionKey::ParquetPageSize | OptionKey::ParquetDictionaryPageSize => {
                OptionValue::Integer(1_048_576)
            }
            OptionKey::ParquetRowGroupSize => OptionValue::Integer(134_217_728),
            OptionKey::KafkaRetriesConfig
            | OptionKey::KafkaPartitionsNumber
            | OptionKey::OzoneReplicationFactor => OptionValue::Integer(3),
            OptionKey::HdfsReplicationFactor => OptionValue::Short(3),
            OptionKey::HiveTableBucketsNumber | OptionKey::KuduBuckets => OptionValue::Integer(32),
            OptionKey::KuduBuffer => OptionValue::Integer(100_001),
            OptionKey::KuduFlush => text("MANUAL_FLUSH"),
            OptionKey::KafkaReplicationFactor => OptionValue::Short(1),
            OptionKey::AdlsBlockSize => text("8388608"),
            OptionKey::AdlsMaxConcurrency => text("2"),
            OptionKey::AdlsMaxUploadSize => text("4194304"),
            OptionKey::HbaseColumnFamiliesMapping => return None,
        };
        Some(value)
    }

    /// Parse the textual form of an option into its declared type.
    ///
    /// Booleans follow the lenient convention: only `true` (any case) is true.
    pub fn parse_value(&self, raw: &str) -> Result<OptionValue> {
        let trimmed = raw.trim();
        let invalid = |message: String| Error::InvalidOption {
            key: self.as_str().to_string(),
            message,
        };
        match self.kind() {
            OptionKind::Integer => trimmed
                .parse::<i32>()
                .map(OptionValue::Integer)
                .map_err(|err| invalid(format!("'{raw}' is not an integer: {err}"))),
            OptionKind::Short => trimmed
                .parse::<i16>()
                .map(OptionValue::Short)
                .map_err(|err| invalid(format!("'{raw}' is not a short integer: {err}"))),
            OptionKind::Boolean => Ok(OptionValue::Boolean(trimmed.eq_ignore_ascii_case("true"))),
            OptionKind::Text => Ok(OptionValue::Text(raw.to_string())),
            OptionKind::ColumnFamilies => parse_column_families(raw)
                .map(OptionValue::ColumnFamilies)
                .map_err(invalid),
        }
    }

    /// Parse a JSON option value; numbers and booleans go through their text form.
    pub fn parse_json(&self, raw: &serde_json::Value) -> Result<OptionValue> {
        match raw {
            serde_json::Value::String(value) => self.parse_value(value),
            serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
                self.parse_value(&raw.to_string())
            }
            other => Err(Error::InvalidOption {
                key: self.as_str().to_string(),
                message: format!("unsupported json value {other}"),
            }),
        }
    }
}

/// Parse `family:col1,col2;family2:col3` into a column to family map.
pub fn parse_column_families(raw: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut mapping = BTreeMap::new();
    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (family, columns) = segment
            .split_once(':')
            .ok_or_else(|| format!("segment '{segment}' is missing ':'"))?;
        let family = family.trim();
        if family.is_empty() {
            return Err(format!("segment '{segment}' has an empty column family"));
        }
        for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            mapping.insert(column.to_string(), family.to_string());
        }
    }
    Ok(mapping)
}

fn text(value: &str) -> OptionValue {
    OptionValue::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_options_reject_garbage() {
        let err = OptionKey::KuduBuckets
            .parse_value("many")
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidOption { .. }));
    }

    #[test]
    fn booleans_are_lenient() {
        assert_eq!(
            OptionKey::CsvHeader.parse_value("TRUE").expect("parse"),
            OptionValue::Boolean(true)
        );
        assert_eq!(
            OptionKey::CsvHeader.parse_value("yes").expect("parse"),
            OptionValue::Boolean(false)
        );
    }

    #[test]
    fn json_numbers_follow_declared_kind() {
        let value = OptionKey::HdfsReplicationFactor
            .parse_json(&serde_json::json!(2))
            .expect("parse");
        assert_eq!(value, OptionValue::Short(2));
    }

    #[test]
    fn column_families_map_each_column() {
        let mapping = parse_column_families("cq:id,name;cf2:city").expect("parse");
        assert_eq!(mapping.get("id").map(String::as_str), Some("cq"));
        assert_eq!(mapping.get("name").map(String::as_str), Some("cq"));
        assert_eq!(mapping.get("city").map(String::as_str), Some("cf2"));
        assert!(parse_column_families("nofamily").is_err());
    }

    #[test]
    fn list_options_split_on_commas() {
        let value = OptionValue::Text("year, month,,day".to_string());
        assert_eq!(value.as_list(), vec!["year", "month", "day"]);
    }
}
