use datagen_core::{OptionKey, OptionValue};

fn default_of(key: OptionKey) -> OptionValue {
    key.default_value()
        .unwrap_or_else(|| panic!("missing default for {key}"))
}

#[test]
fn numeric_defaults_match_documented_table() {
    assert_eq!(default_of(OptionKey::SolrShards), OptionValue::Integer(1));
    assert_eq!(default_of(OptionKey::SolrReplicas), OptionValue::Integer(1));
    assert_eq!(default_of(OptionKey::KuduReplicas), OptionValue::Integer(1));
    assert_eq!(default_of(OptionKey::HiveThreadNumber), OptionValue::Integer(1));
    assert_eq!(default_of(OptionKey::ParquetPageSize), OptionValue::Integer(1_048_576));
    assert_eq!(
        default_of(OptionKey::ParquetDictionaryPageSize),
        OptionValue::Integer(1_048_576)
    );
    assert_eq!(
        default_of(OptionKey::ParquetRowGroupSize),
        OptionValue::Integer(134_217_728)
    );
    assert_eq!(default_of(OptionKey::KafkaRetriesConfig), OptionValue::Integer(3));
    assert_eq!(default_of(OptionKey::OzoneReplicationFactor), OptionValue::Integer(3));
    assert_eq!(default_of(OptionKey::HdfsReplicationFactor), OptionValue::Short(3));
    assert_eq!(default_of(OptionKey::KafkaReplicationFactor), OptionValue::Short(1));
    assert_eq!(default_of(OptionKey::KuduBuckets), OptionValue::Integer(32));
    assert_eq!(default_of(OptionKey::KuduBuffer), OptionValue::Integer(100_001));
}

#[test]
fn boolean_and_text_defaults_match_documented_table() {
    for key in [
        OptionKey::CsvHeader,
        OptionKey::ParquetDictionaryEncoding,
        OptionKey::HiveOnHdfs,
        OptionKey::OneFilePerIteration,
    ] {
        assert_eq!(default_of(key), OptionValue::Boolean(true), "{key}");
    }
    assert_eq!(default_of(OptionKey::DeletePrevious), OptionValue::Boolean(false));

    let text = |value: &str| OptionValue::Text(value.to_string());
    assert_eq!(default_of(OptionKey::KafkaAcksConfig), text("all"));
    assert_eq!(default_of(OptionKey::KafkaMessageType), text("json"));
    assert_eq!(
        default_of(OptionKey::KafkaJaasFilePath),
        text("/home/datagen/jaas/kafka.jaas")
    );
    assert_eq!(
        default_of(OptionKey::SolrJaasFilePath),
        text("/home/datagen/jaas/solr.jaas")
    );
    assert_eq!(default_of(OptionKey::HiveTezQueueName), text("root.default"));
    assert_eq!(default_of(OptionKey::KuduFlush), text("MANUAL_FLUSH"));
}

#[test]
fn column_family_mapping_has_no_default() {
    assert!(OptionKey::HbaseColumnFamiliesMapping.default_value().is_none());
}
