use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::model::Model;
use crate::output::{CountingWriter, SinkReport};
use crate::row::Row;

/// Write one JSON object per line.
pub fn write_rows_json(path: &Path, model: &Model, rows: &[Row]) -> Result<SinkReport> {
    let mut writer = CountingWriter::new(BufWriter::new(File::create(path)?));
    for row in rows {
        writeln!(writer, "{}", row.to_json()?)?;
    }
    writer.flush()?;
    debug!(
        path = %path.display(),
        rows = rows.len(),
        fields = model.print_fields().count(),
        "json written"
    );
    Ok(SinkReport {
        path: path.to_path_buf(),
        rows: rows.len() as u64,
        bytes_written: writer.bytes_written(),
    })
}
