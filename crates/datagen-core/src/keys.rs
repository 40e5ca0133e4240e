//! String-keyed enums shared by model documents and the generator.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::warn;

/// Declares an enum whose variants map one-to-one to upper-case document keys.
macro_rules! document_keys {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
            schemars::JsonSchema,
        )]
        $vis enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
                let upper = value.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("unrecognized {} '{}'", stringify!($name), value)),
                }
            }
        }
    };
}

pub(crate) use document_keys;

document_keys! {
    /// Sink-specific table, topic and path names attached to a model.
    pub enum TableNameKey {
        HdfsFilePath => "HDFS_FILE_PATH",
        HdfsFileName => "HDFS_FILE_NAME",
        HiveHdfsFilePath => "HIVE_HDFS_FILE_PATH",
        HbaseTableName => "HBASE_TABLE_NAME",
        HbaseNamespace => "HBASE_NAMESPACE",
        KafkaTopic => "KAFKA_TOPIC",
        OzoneVolume => "OZONE_VOLUME",
        OzoneBucket => "OZONE_BUCKET",
        OzoneKeyName => "OZONE_KEY_NAME",
        OzoneLocalFilePath => "OZONE_LOCAL_FILE_PATH",
        SolrCollection => "SOLR_COLLECTION",
        HiveDatabase => "HIVE_DATABASE",
        HiveTableName => "HIVE_TABLE_NAME",
        HiveTemporaryTableName => "HIVE_TEMPORARY_TABLE_NAME",
        KuduTableName => "KUDU_TABLE_NAME",
        LocalFilePath => "LOCAL_FILE_PATH",
        LocalFileName => "LOCAL_FILE_NAME",
        S3Bucket => "S3_BUCKET",
        S3Directory => "S3_DIRECTORY",
        S3KeyName => "S3_KEY_NAME",
        S3LocalFilePath => "S3_LOCAL_FILE_PATH",
        AdlsContainer => "ADLS_CONTAINER",
        AdlsDirectory => "ADLS_DIRECTORY",
        AdlsFileName => "ADLS_FILE_NAME",
        AdlsLocalFilePath => "ADLS_LOCAL_FILE_PATH",
        GcsBucket => "GCS_BUCKET",
        GcsDirectory => "GCS_DIRECTORY",
        GcsObjectName => "GCS_OBJECT_NAME",
        GcsLocalFilePath => "GCS_LOCAL_FILE_PATH",
        AvroName => "AVRO_NAME",
    }
}

document_keys! {
    /// Purpose a primary-key field list is extracted for.
    pub enum PrimaryKeyKind {
        KafkaMsgKey => "KAFKA_MSG_KEY",
        HbasePrimaryKey => "HBASE_PRIMARY_KEY",
        OzoneBucket => "OZONE_BUCKET",
        OzoneKey => "OZONE_KEY",
        KuduHashKeys => "KUDU_HASH_KEYS",
        KuduRangeKeys => "KUDU_RANGE_KEYS",
        KuduPrimaryKeys => "KUDU_PRIMARY_KEYS",
    }
}

/// Convert raw string keys, dropping (and logging) the ones that are not recognized.
pub fn convert_keys<K, V>(raw: &BTreeMap<String, V>) -> BTreeMap<K, V>
where
    K: FromStr<Err = String> + Ord,
    V: Clone,
{
    let mut converted = BTreeMap::new();
    for (key, value) in raw {
        match key.parse::<K>() {
            Ok(parsed) => {
                converted.insert(parsed, value.clone());
            }
            Err(message) => {
                warn!(key = %key, "{message}, please verify the model document");
            }
        }
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_ignored() {
        let mut raw = BTreeMap::new();
        raw.insert("kafka_topic".to_string(), "events".to_string());
        raw.insert("NOT_A_KEY".to_string(), "x".to_string());

        let converted: BTreeMap<TableNameKey, String> = convert_keys(&raw);
        assert_eq!(converted.len(), 1);
        assert_eq!(
            converted.get(&TableNameKey::KafkaTopic).map(String::as_str),
            Some("events")
        );
    }

    #[test]
    fn primary_key_kinds_round_trip_through_text() {
        for kind in PrimaryKeyKind::ALL {
            assert_eq!(kind.as_str().parse::<PrimaryKeyKind>(), Ok(*kind));
        }
    }
}
