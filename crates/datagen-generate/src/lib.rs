//! Synthetic row generation for datagen models.
//!
//! A [`Model`] is built from a [`datagen_definition::ModelDefinition`]: every
//! field gets a typed generator, computed fields get a
//! [`ConditionalEvaluator`]. [`Model::generate_random_rows`] splits the
//! requested rows over scoped worker threads, each with its own seeded random
//! source, and returns [`Row`]s that project to text, CSV, JSON and primary
//! keys.

pub mod columnar;
pub mod conditions;
pub mod dictionaries;
pub mod errors;
pub mod fields;
pub mod model;
pub mod output;
pub mod row;
pub mod value;
pub mod worker;

pub use columnar::{ColumnBuffer, ColumnarBatch};
pub use conditions::{ConditionalEvaluator, ConditionsLine, evaluate};
pub use errors::{GenerationError, Result};
pub use fields::{DEFAULT_HBASE_QUALIFIER, Field};
pub use model::{HiveTableFormat, HiveTableType, Model};
pub use output::{SinkReport, write_rows_csv, write_rows_json};
pub use row::Row;
pub use value::{City, CsvRecord, FieldValue, NameEntry, Sex};
pub use worker::{GenerationControl, partition_rows};

#[cfg(test)]
pub(crate) mod test_support {
    use datagen_definition::{FieldDefinition, ModelDefinition};

    use crate::model::Model;
    use crate::row::Row;
    use crate::value::FieldValue;

    pub(crate) fn model_of(fields: Vec<FieldDefinition>) -> Model {
        let mut definition = ModelDefinition::new(fields);
        definition.seed = Some(42);
        Model::build(&definition).expect("test model should build")
    }

    pub(crate) fn row_with(model: &Model, values: &[(&str, FieldValue)]) -> Row {
        let mut row = Row::empty(model.clone());
        for (name, value) in values {
            row.set(name, value.clone()).expect("field exists");
        }
        row
    }
}
