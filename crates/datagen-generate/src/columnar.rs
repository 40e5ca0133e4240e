//! Typed column buffers filled from rows, for columnar sinks.

use datagen_core::FieldType;

use crate::fields::Field;
use crate::model::Model;
use crate::row::Row;
use crate::value::FieldValue;

/// One column of values; `None` marks a null.
///
/// Dates are stored as epoch milliseconds; structured values as their text.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnBuffer {
    Int(Vec<Option<i32>>),
    Long(Vec<Option<i64>>),
    Float(Vec<Option<f32>>),
    Bool(Vec<Option<bool>>),
    Bytes(Vec<Option<Vec<u8>>>),
    Text(Vec<Option<String>>),
}

impl ColumnBuffer {
    /// Empty buffer of the column type of `field`.
    pub fn for_field(field: &Field, capacity: usize) -> Self {
        match field.field_type() {
            FieldType::Integer | FieldType::IncrementInteger => {
                ColumnBuffer::Int(Vec::with_capacity(capacity))
            }
            FieldType::Long | FieldType::IncrementLong | FieldType::Timestamp | FieldType::Date => {
                ColumnBuffer::Long(Vec::with_capacity(capacity))
            }
            FieldType::Float => ColumnBuffer::Float(Vec::with_capacity(capacity)),
            FieldType::Boolean => ColumnBuffer::Bool(Vec::with_capacity(capacity)),
            FieldType::Bytes | FieldType::HashMd5 => {
                ColumnBuffer::Bytes(Vec::with_capacity(capacity))
            }
            _ => ColumnBuffer::Text(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnBuffer::Int(values) => values.len(),
            ColumnBuffer::Long(values) => values.len(),
            ColumnBuffer::Float(values) => values.len(),
            ColumnBuffer::Bool(values) => values.len(),
            ColumnBuffer::Bytes(values) => values.len(),
            ColumnBuffer::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Field {
    /// Append `value` to `column`; values that do not fit the column are
    /// appended as nulls.
    pub fn write_into_column(&self, value: &FieldValue, column: &mut ColumnBuffer) {
        match column {
            ColumnBuffer::Int(values) => values.push(match value {
                FieldValue::Int(value) => Some(*value),
                _ => None,
            }),
            ColumnBuffer::Long(values) => values.push(match value {
                FieldValue::Date(date) => Some(date.and_utc().timestamp_millis()),
                other => other.as_i64(),
            }),
            ColumnBuffer::Float(values) => values.push(match value {
                FieldValue::Float(value) => Some(*value),
                _ => None,
            }),
            ColumnBuffer::Bool(values) => values.push(value.as_bool()),
            ColumnBuffer::Bytes(values) => values.push(match value {
                FieldValue::Bytes(bytes) => Some(bytes.clone()),
                _ => None,
            }),
            ColumnBuffer::Text(values) => values.push(if value.is_null() {
                None
            } else {
                Some(self.to_string_value(value))
            }),
        }
    }
}

/// Print fields of a batch of rows, one buffer per column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarBatch {
    names: Vec<String>,
    columns: Vec<ColumnBuffer>,
    num_rows: usize,
}

impl ColumnarBatch {
    pub fn from_rows(model: &Model, rows: &[Row]) -> Self {
        let mut names = Vec::new();
        let mut columns = Vec::new();
        for slot in model.print_slots() {
            let field = model.field_at(slot);
            let mut column = ColumnBuffer::for_field(field, rows.len());
            for row in rows {
                let value = row.value_at(slot).unwrap_or(&FieldValue::Null);
                field.write_into_column(value, &mut column);
            }
            names.push(field.name().to_string());
            columns.push(column);
        }
        Self {
            names,
            columns,
            num_rows: rows.len(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&ColumnBuffer> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|index| self.columns.get(index))
    }
}
