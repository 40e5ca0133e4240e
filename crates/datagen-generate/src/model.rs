//! Built model: typed fields, options and primary keys ready for generation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rand::RngCore;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use datagen_core::{OptionKey, OptionValue, PrimaryKeyKind, TableNameKey, convert_keys};
use datagen_definition::{ModelDefinition, verify_model_definition};

use crate::conditions::{ConditionalEvaluator, FieldResolver};
use crate::errors::{GenerationError, Result};
use crate::fields::Field;
use crate::row::Row;
use crate::worker::{GenerationControl, generate_rows};

const DEFAULT_AVRO_NAME: &str = "default_avro_record_name";
const AVRO_NAMESPACE: &str = "org.apache.avro.ipc";

/// Hive table flavour selected by `HIVE_TABLE_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiveTableType {
    External,
    Managed,
    Iceberg,
}

/// Hive storage format selected by `HIVE_TABLE_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiveTableFormat {
    Parquet,
    Orc,
    Avro,
    Json,
}

impl HiveTableFormat {
    /// Storage clause appended to `CREATE TABLE`.
    pub fn clause(&self) -> &'static str {
        match self {
            HiveTableFormat::Parquet => " STORED AS PARQUET ",
            HiveTableFormat::Avro => " STORED AS AVRO ",
            HiveTableFormat::Json => " STORED AS JSONFILE ",
            HiveTableFormat::Orc => " STORED AS ORC ",
        }
    }
}

/// Immutable model shared by every worker and every row it produces.
///
/// Cloning is cheap. Reordering returns a new model over the same fields, so
/// increment counters keep running across reordered copies.
#[derive(Debug, Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

#[derive(Debug)]
struct ModelInner {
    catalog: Arc<Catalog>,
    /// Slots in output order.
    order: Vec<usize>,
    independent: Vec<usize>,
    computed: Vec<usize>,
}

/// Everything that does not depend on column order. Field slots are
/// declaration indexes and never change.
#[derive(Debug)]
struct Catalog {
    fields: Vec<Field>,
    slots: HashMap<String, usize>,
    table_names: BTreeMap<TableNameKey, String>,
    primary_keys: BTreeMap<PrimaryKeyKind, Vec<usize>>,
    options: BTreeMap<OptionKey, OptionValue>,
    seed: u64,
    definition: ModelDefinition,
}

impl Model {
    /// Verify `definition` and build its fields and conditionals.
    pub fn build(definition: &ModelDefinition) -> Result<Self> {
        let report = verify_model_definition(definition);
        for issue in &report.warnings {
            warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
        }
        if !report.is_ok() {
            return Err(GenerationError::Rejected(report));
        }

        let mut options = BTreeMap::new();
        for (key, raw) in convert_keys::<OptionKey, Value>(&definition.options) {
            let value = key
                .parse_json(&raw)
                .map_err(|err| GenerationError::InvalidModel(err.to_string()))?;
            options.insert(key, value);
        }
        let families = options
            .get(&OptionKey::HbaseColumnFamiliesMapping)
            .and_then(OptionValue::as_column_families);

        let slots: HashMap<String, usize> = definition
            .fields
            .iter()
            .enumerate()
            .map(|(slot, field)| (field.name.clone(), slot))
            .collect();

        let mut fields = definition
            .fields
            .iter()
            .map(|field| {
                let family = families
                    .and_then(|mapping| mapping.get(&field.name))
                    .map(String::as_str);
                Field::build(field, family)
            })
            .collect::<Result<Vec<_>>>()?;

        for (slot, field) in definition.fields.iter().enumerate() {
            if !field.is_computed() {
                continue;
            }
            let resolver = FieldResolver::new(&field.name, &definition.fields, &slots);
            let evaluator = ConditionalEvaluator::build(&field.conditionals, &resolver)?;
            fields[slot].set_conditional(evaluator);
        }

        let mut primary_keys = BTreeMap::new();
        for (kind, names) in convert_keys::<PrimaryKeyKind, Vec<String>>(&definition.primary_keys) {
            let key_slots = names
                .iter()
                .map(|name| {
                    slots.get(name).copied().ok_or_else(|| {
                        GenerationError::InvalidModel(format!(
                            "primary key {kind} names unknown field '{name}'"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            primary_keys.insert(kind, key_slots);
        }

        let seed = definition.seed.unwrap_or_else(rand::random);
        let catalog = Catalog {
            fields,
            slots,
            table_names: convert_keys(&definition.table_names),
            primary_keys,
            options,
            seed,
            definition: definition.clone(),
        };
        let order = (0..catalog.fields.len()).collect();
        let model = Self::with_order(Arc::new(catalog), order);

        info!(
            fields = model.inner.order.len(),
            computed = model.inner.computed.len(),
            seed,
            "model built"
        );
        Ok(model)
    }

    fn with_order(catalog: Arc<Catalog>, order: Vec<usize>) -> Self {
        let (computed, independent): (Vec<usize>, Vec<usize>) = order
            .iter()
            .copied()
            .partition(|slot| catalog.fields[*slot].is_computed());
        Self {
            inner: Arc::new(ModelInner {
                catalog,
                order,
                independent,
                computed,
            }),
        }
    }

    fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn seed(&self) -> u64 {
        self.catalog().seed
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.slot(name).map(|slot| self.field_at(slot))
    }

    pub(crate) fn slot(&self, name: &str) -> Option<usize> {
        self.catalog().slots.get(name).copied()
    }

    pub(crate) fn field_at(&self, slot: usize) -> &Field {
        &self.catalog().fields[slot]
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.catalog().fields.len()
    }

    pub(crate) fn ordered_slots(&self) -> &[usize] {
        &self.inner.order
    }

    pub(crate) fn print_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.inner
            .order
            .iter()
            .copied()
            .filter(|slot| !self.field_at(*slot).is_ghost())
    }

    /// Every field in output order, ghosts included.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.inner.order.iter().map(|slot| self.field_at(*slot))
    }

    /// Fields written by sinks: output order without ghosts.
    pub fn print_fields(&self) -> impl Iterator<Item = &Field> {
        self.print_slots().map(|slot| self.field_at(slot))
    }

    pub fn independent_field_names(&self) -> Vec<&str> {
        self.inner
            .independent
            .iter()
            .map(|slot| self.field_at(*slot).name())
            .collect()
    }

    pub fn computed_field_names(&self) -> Vec<&str> {
        self.inner
            .computed
            .iter()
            .map(|slot| self.field_at(*slot).name())
            .collect()
    }

    /// Explicit option value, else its documented default.
    pub fn options_or_default(&self, key: OptionKey) -> Option<OptionValue> {
        self.catalog()
            .options
            .get(&key)
            .cloned()
            .or_else(|| key.default_value())
    }

    pub fn table_name(&self, key: TableNameKey) -> Option<&str> {
        self.catalog().table_names.get(&key).map(String::as_str)
    }

    pub fn primary_key_fields(&self, kind: PrimaryKeyKind) -> Vec<&Field> {
        self.primary_key_slots(kind)
            .iter()
            .map(|slot| self.field_at(*slot))
            .collect()
    }

    pub(crate) fn primary_key_slots(&self, kind: PrimaryKeyKind) -> &[usize] {
        self.catalog()
            .primary_keys
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Definition of this model with fields in the current output order.
    pub fn to_definition(&self) -> ModelDefinition {
        let mut definition = self.catalog().definition.clone();
        definition.fields = self
            .inner
            .order
            .iter()
            .map(|slot| self.catalog().definition.fields[*slot].clone())
            .collect();
        definition.seed = Some(self.seed());
        definition
    }

    /// Fill one row: independent fields first, then computed fields, each
    /// group in output order.
    pub fn generate_row(&self, rng: &mut dyn RngCore) -> Result<Row> {
        let mut row = Row::empty(self.clone());
        for &slot in &self.inner.independent {
            let value = self.field_at(slot).generate_random_value(rng);
            row.set_at(slot, value);
        }
        for &slot in &self.inner.computed {
            let value = self.field_at(slot).generate_computed_value(&row)?;
            row.set_at(slot, value);
        }
        Ok(row)
    }

    /// Generate `total` rows on `threads` workers.
    pub fn generate_random_rows(&self, total: usize, threads: usize) -> Result<Vec<Row>> {
        self.generate_random_rows_with_control(total, threads, &GenerationControl::new())
    }

    pub fn generate_random_rows_with_control(
        &self,
        total: usize,
        threads: usize,
        control: &GenerationControl,
    ) -> Result<Vec<Row>> {
        generate_rows(self, total, threads, control)
    }

    /// Copy of this model with `columns` moved to the end, in the given order.
    pub fn with_partition_columns_last(&self, columns: &[String]) -> Model {
        let moved = self.known_slots(columns);
        let mut order: Vec<usize> = self
            .inner
            .order
            .iter()
            .copied()
            .filter(|slot| !moved.contains(slot))
            .collect();
        order.extend(moved);
        Self::with_order(Arc::clone(&self.inner.catalog), order)
    }

    /// Copy of this model with `columns` moved to the front, in the given order.
    pub fn with_key_columns_first(&self, columns: &[String]) -> Model {
        let mut order = self.known_slots(columns);
        let rest: Vec<usize> = self
            .inner
            .order
            .iter()
            .copied()
            .filter(|slot| !order.contains(slot))
            .collect();
        order.extend(rest);
        Self::with_order(Arc::clone(&self.inner.catalog), order)
    }

    fn known_slots(&self, columns: &[String]) -> Vec<usize> {
        let mut slots = Vec::with_capacity(columns.len());
        for column in columns {
            match self.slot(column) {
                Some(slot) if !slots.contains(&slot) => slots.push(slot),
                Some(_) => {}
                None => warn!(column = %column, "reordering ignores unknown column"),
            }
        }
        slots
    }

    pub fn hive_partition_columns(&self) -> Vec<String> {
        self.list_option(OptionKey::HiveTablePartitionsCols)
    }

    pub fn hive_bucket_columns(&self) -> Vec<String> {
        self.list_option(OptionKey::HiveTableBucketsCols)
    }

    fn list_option(&self, key: OptionKey) -> Vec<String> {
        self.options_or_default(key)
            .map(|value| value.as_list())
            .unwrap_or_default()
    }

    pub fn hive_table_type(&self) -> HiveTableType {
        let text = self.text_option(OptionKey::HiveTableType);
        match text.as_str() {
            "iceberg" => HiveTableType::Iceberg,
            "managed" => HiveTableType::Managed,
            _ => HiveTableType::External,
        }
    }

    pub fn hive_table_format(&self) -> HiveTableFormat {
        let text = self.text_option(OptionKey::HiveTableFormat);
        match text.as_str() {
            "parquet" => HiveTableFormat::Parquet,
            "avro" => HiveTableFormat::Avro,
            "json" => HiveTableFormat::Json,
            _ => HiveTableFormat::Orc,
        }
    }

    pub fn hive_table_format_clause(&self) -> &'static str {
        self.hive_table_format().clause()
    }

    fn text_option(&self, key: OptionKey) -> String {
        self.options_or_default(key)
            .and_then(|value| value.as_str().map(str::to_ascii_lowercase))
            .unwrap_or_default()
    }

    /// `" ( name TYPE, ... ) "` over print fields, partition columns excluded.
    pub fn sql_schema(&self) -> String {
        let partitions = self.hive_partition_columns();
        let columns: Vec<String> = self
            .print_fields()
            .filter(|field| {
                !partitions
                    .iter()
                    .any(|column| column.eq_ignore_ascii_case(field.name()))
            })
            .map(|field| format!("{} {}", field.name(), field.sql_type()))
            .collect();
        let schema = format!(" ( {} ) ", columns.join(", "));
        debug!(schema = %schema, "sql schema");
        schema
    }

    /// `PARTITIONED BY` and `CLUSTERED BY` clauses of a Hive `CREATE TABLE`.
    pub fn sql_partition_bucket_create(&self) -> String {
        let mut clause = String::new();
        let partitions = self.hive_partition_columns();
        if !partitions.is_empty() {
            let columns: Vec<String> = partitions
                .iter()
                .filter_map(|name| self.field(name))
                .map(|field| format!("{} {}", field.name(), field.sql_type()))
                .collect();
            clause.push_str(&format!(" PARTITIONED BY ( {} ) ", columns.join(", ")));
        }
        let buckets = self.hive_bucket_columns();
        if !buckets.is_empty() {
            let number = self
                .options_or_default(OptionKey::HiveTableBucketsNumber)
                .and_then(|value| value.as_i64())
                .unwrap_or(32);
            clause.push_str(&format!(
                " CLUSTERED BY ( {} )  INTO {number} BUCKETS ",
                buckets.join(", ")
            ));
        }
        clause
    }

    /// `PARTITION` clause of a Hive `INSERT`.
    pub fn sql_partition_insert(&self) -> String {
        let partitions = self.hive_partition_columns();
        if partitions.is_empty() {
            return String::new();
        }
        format!(" PARTITION ( {} ) ", partitions.join(", "))
    }

    /// Parameterized insert over print fields.
    pub fn insert_sql_statement(&self, table: &str) -> String {
        let names: Vec<&str> = self.print_fields().map(Field::name).collect();
        let placeholders = vec!["?"; names.len()];
        format!(
            "INSERT INTO {table} ( {} ) VALUES ( {} ) ",
            names.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn csv_header(&self) -> String {
        self.print_fields()
            .map(Field::name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Avro record schema over print fields, named after `AVRO_NAME`.
    pub fn avro_schema(&self) -> Value {
        let name = self
            .table_name(TableNameKey::AvroName)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_AVRO_NAME);
        let fields: Vec<Value> = self
            .print_fields()
            .map(|field| json!({ "name": field.name(), "type": field.avro_type() }))
            .collect();
        json!({
            "type": "record",
            "name": name,
            "namespace": AVRO_NAMESPACE,
            "fields": fields,
        })
    }

    /// HBase column families used by print fields.
    pub fn hbase_column_families(&self) -> BTreeSet<String> {
        self.print_fields()
            .map(|field| field.hbase_column_qualifier().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    fn definition() -> ModelDefinition {
        let mut definition = ModelDefinition::new(vec![
            FieldDefinition::new("id", FieldType::Long),
            FieldDefinition::new("label", FieldType::String)
                .with_conditional("$id>0", "positive")
                .with_conditional("default", "other"),
            FieldDefinition::new("secret", FieldType::String).ghost(),
            FieldDefinition::new("year", FieldType::Integer),
            FieldDefinition::new("amount", FieldType::Float),
        ]);
        definition
            .options
            .insert("HIVE_TABLE_PARTITIONS_COLS".to_string(), json!("year"));
        definition
            .options
            .insert("HBASE_COLUMN_FAMILIES_MAPPING".to_string(), json!("d:amount"));
        definition
            .table_names
            .insert("AVRO_NAME".to_string(), "sales".to_string());
        definition.seed = Some(3);
        definition
    }

    fn model() -> Model {
        Model::build(&definition()).expect("build model")
    }

    #[test]
    fn fields_are_split_into_independent_and_computed() {
        let model = model();
        assert_eq!(
            model.independent_field_names(),
            vec!["id", "secret", "year", "amount"]
        );
        assert_eq!(model.computed_field_names(), vec!["label"]);
        let printed: Vec<&str> = model.print_fields().map(Field::name).collect();
        assert_eq!(printed, vec!["id", "label", "year", "amount"]);
    }

    #[test]
    fn options_fall_back_to_defaults() {
        let model = model();
        assert_eq!(
            model.options_or_default(OptionKey::KuduBuckets),
            Some(OptionValue::Integer(32))
        );
        assert_eq!(
            model.options_or_default(OptionKey::HiveTablePartitionsCols),
            Some(OptionValue::Text("year".to_string()))
        );
        assert_eq!(model.hive_table_format(), HiveTableFormat::Orc);
        assert_eq!(model.hive_table_type(), HiveTableType::External);
    }

    #[test]
    fn unknown_hive_formats_fall_back_to_orc() {
        for (format, expected) in [
            ("Parquet", HiveTableFormat::Parquet),
            ("json", HiveTableFormat::Json),
            ("csv", HiveTableFormat::Orc),
            ("textfile", HiveTableFormat::Orc),
        ] {
            let mut definition = definition();
            definition
                .options
                .insert("HIVE_TABLE_FORMAT".to_string(), json!(format));
            let model = Model::build(&definition).expect("build model");
            assert_eq!(model.hive_table_format(), expected, "{format}");
        }
        assert_eq!(HiveTableFormat::Orc.clause(), " STORED AS ORC ");
    }

    #[test]
    fn sql_helpers_skip_ghosts_and_partitions() {
        let model = model();
        assert_eq!(
            model.sql_schema(),
            " ( id BIGINT, label STRING, amount FLOAT ) "
        );
        assert_eq!(
            model.sql_partition_bucket_create(),
            " PARTITIONED BY ( year INT ) "
        );
        assert_eq!(model.sql_partition_insert(), " PARTITION ( year ) ");
        assert_eq!(
            model.insert_sql_statement("sales"),
            "INSERT INTO sales ( id, label, year, amount ) VALUES ( ?, ?, ?, ? ) "
        );
        assert_eq!(model.csv_header(), "id,label,year,amount");
    }

    #[test]
    fn avro_schema_uses_the_configured_name() {
        let schema = model().avro_schema();
        assert_eq!(schema["name"], "sales");
        assert_eq!(schema["namespace"], AVRO_NAMESPACE);
        assert_eq!(schema["fields"][0], json!({ "name": "id", "type": "long" }));
        assert_eq!(schema["fields"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn column_family_mapping_sets_qualifiers() {
        let model = model();
        assert_eq!(
            model.field("amount").map(Field::hbase_column_qualifier),
            Some("d")
        );
        let families: Vec<String> = model.hbase_column_families().into_iter().collect();
        assert_eq!(families, vec!["cq".to_string(), "d".to_string()]);
    }

    #[test]
    fn reordering_builds_new_models() {
        let model = model();
        let partitioned = model.with_partition_columns_last(&["year".to_string()]);
        assert_eq!(partitioned.csv_header(), "id,label,amount,year");
        assert_eq!(model.csv_header(), "id,label,year,amount");

        let keyed = model.with_key_columns_first(&["amount".to_string(), "nope".to_string()]);
        assert_eq!(keyed.csv_header(), "amount,id,label,year");
        let names: Vec<String> = keyed
            .to_definition()
            .fields
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, vec!["amount", "id", "label", "secret", "year"]);
    }

    #[test]
    fn definitions_with_errors_are_rejected() {
        let definition = ModelDefinition::new(vec![
            FieldDefinition::new("a", FieldType::String),
            FieldDefinition::new("a", FieldType::String),
        ]);
        let err = Model::build(&definition).expect_err("duplicate names");
        assert!(matches!(err, GenerationError::Rejected(report) if report.has_code("duplicate_field")));
    }
}
