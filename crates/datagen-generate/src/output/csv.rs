use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use datagen_core::OptionKey;
use tracing::debug;

use crate::errors::Result;
use crate::model::Model;
use crate::output::{CountingWriter, SinkReport};
use crate::row::Row;

/// Write print fields as CSV, every value quoted. The header line is written
/// when `CSV_HEADER` is true.
pub fn write_rows_csv(path: &Path, model: &Model, rows: &[Row]) -> Result<SinkReport> {
    let mut counting = CountingWriter::new(BufWriter::new(File::create(path)?));
    let header = model
        .options_or_default(OptionKey::CsvHeader)
        .and_then(|value| value.as_bool())
        .unwrap_or(true);
    if header {
        writeln!(counting, "{}", model.csv_header())?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(counting);
    for row in rows {
        let record: Vec<String> = model.print_slots().map(|slot| row.text_at(slot)).collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    debug!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(SinkReport {
        path: path.to_path_buf(),
        rows: rows.len() as u64,
        bytes_written: counting.bytes_written(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{model_of, row_with};
    use crate::value::FieldValue;
    use datagen_core::FieldType;
    use datagen_definition::FieldDefinition;

    #[test]
    fn header_then_quoted_rows() {
        let model = model_of(vec![
            FieldDefinition::new("name", FieldType::String),
            FieldDefinition::new("age", FieldType::Integer),
        ]);
        let rows = vec![row_with(
            &model,
            &[
                ("name", FieldValue::Text("Ada \"A\"".to_string())),
                ("age", FieldValue::Int(36)),
            ],
        )];
        let path = std::env::temp_dir().join(format!("datagen-csv-{}.csv", std::process::id()));
        let report = write_rows_csv(&path, &model, &rows).expect("write csv");
        let written = std::fs::read_to_string(&path).expect("read back");
        std::fs::remove_file(&path).ok();

        assert_eq!(written, format!("name,age\n{}\n", rows[0].to_csv()));
        assert_eq!(report.rows, 1);
        assert_eq!(report.bytes_written, written.len() as u64);
    }
}
