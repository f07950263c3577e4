//! CSV catalogue writer

use crate::reader::{IoError, IoResult};
use crate::table::Catalogue;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Write a catalogue to a CSV file; missing cells are written empty
pub fn write_csv(catalogue: &Catalogue, path: &str) -> IoResult<()> {
    let file = File::create(path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
    write_csv_to(catalogue, BufWriter::new(file))
}

/// Write a catalogue as CSV to any writer
pub fn write_csv_to<W: Write>(catalogue: &Catalogue, writer: W) -> IoResult<()> {
    let mut writer = csv::Writer::from_writer(writer);

    writer
        .write_record(catalogue.column_names())
        .map_err(|e| IoError::Io(e.to_string()))?;

    let mut record = Vec::with_capacity(catalogue.num_columns());
    for row in 0..catalogue.len() {
        record.clear();
        for column in catalogue.columns() {
            if column.is_masked(row) {
                record.push(String::new());
            } else {
                record.push(column.data.format_value(row));
            }
        }
        writer
            .write_record(&record)
            .map_err(|e| IoError::Io(e.to_string()))?;
    }

    writer.flush().map_err(|e| IoError::Io(e.to_string()))
}
