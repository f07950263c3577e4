//! CSV catalogue reader with type inference

use crate::reader::{CatalogueReader, IoError, IoResult};
use crate::schema::{ColumnDescriptor, ColumnType, DataColumn, DataSchema};
use crate::table::{Catalogue, Column};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Rows sampled for type inference
const INFERENCE_ROWS: usize = 100;

/// CSV catalogue reader
pub struct CsvReader {
    path: String,
    schema: DataSchema,
    metadata: HashMap<String, String>,
    delimiter: u8,
    has_header: bool,
}

impl CsvReader {
    /// Open a CSV file
    pub fn open(path: &str) -> IoResult<Self> {
        Self::open_with_options(path, b',', true)
    }

    /// Open a CSV file with options
    pub fn open_with_options(path: &str, delimiter: u8, has_header: bool) -> IoResult<Self> {
        if !Path::new(path).exists() {
            return Err(IoError::FileNotFound(path.to_string()));
        }

        let file = File::open(path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(has_header)
            .from_reader(BufReader::new(file));

        let schema = infer_schema(&mut reader, has_header)?;

        let mut metadata = HashMap::new();
        metadata.insert("format".to_string(), "CSV".to_string());
        metadata.insert("delimiter".to_string(), (delimiter as char).to_string());
        metadata.insert("source".to_string(), path.to_string());

        Ok(Self {
            path: path.to_string(),
            schema,
            metadata,
            delimiter,
            has_header,
        })
    }
}

impl CatalogueReader for CsvReader {
    fn read_schema(&self) -> IoResult<DataSchema> {
        Ok(self.schema.clone())
    }

    fn read_catalogue(&self) -> IoResult<Catalogue> {
        let file = File::open(&self.path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .from_reader(BufReader::new(file));

        let mut catalogue = parse_records(reader, &self.schema)?;
        catalogue.metadata = self.metadata.clone();
        Ok(catalogue)
    }

    fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    fn path(&self) -> Option<&str> {
        Some(&self.path)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

/// Parse CSV text held in memory into a catalogue
pub fn read_csv_str(text: &str) -> IoResult<Catalogue> {
    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let schema = infer_schema(&mut reader, true)?;
    let reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    parse_records(reader, &schema)
}

fn infer_schema<R: Read>(reader: &mut csv::Reader<R>, has_header: bool) -> IoResult<DataSchema> {
    let mut headers = if has_header {
        reader
            .headers()
            .map_err(|e| IoError::InvalidFormat(e.to_string()))?
            .iter()
            .map(|s| s.trim().to_string())
            .collect::<Vec<_>>()
    } else {
        Vec::new()
    };

    let mut sample_values: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut num_records = 0;

    for result in reader.records() {
        let record = result.map_err(|e| IoError::InvalidFormat(e.to_string()))?;
        if num_records < INFERENCE_ROWS {
            if !has_header && headers.len() < record.len() {
                headers.extend((headers.len()..record.len()).map(|i| format!("col_{}", i)));
                sample_values.resize(headers.len(), Vec::new());
            }
            for (i, value) in record.iter().enumerate() {
                if i < sample_values.len() {
                    sample_values[i].push(value.trim().to_string());
                }
            }
        }
        num_records += 1;
    }

    let columns: Vec<ColumnDescriptor> = headers
        .into_iter()
        .zip(sample_values.iter())
        .map(|(name, samples)| ColumnDescriptor::new(name, infer_type(samples)))
        .collect();

    Ok(DataSchema::new(columns, num_records))
}

fn parse_records<R: Read>(mut reader: csv::Reader<R>, schema: &DataSchema) -> IoResult<Catalogue> {
    let mut raw: Vec<Vec<String>> = vec![Vec::with_capacity(schema.num_records); schema.num_columns()];

    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| IoError::InvalidFormat(format!("record {}: {}", line, e)))?;
        if record.len() != schema.num_columns() {
            return Err(IoError::InvalidFormat(format!(
                "record {} has {} fields, expected {}",
                line,
                record.len(),
                schema.num_columns()
            )));
        }
        for (column, value) in raw.iter_mut().zip(record.iter()) {
            column.push(value.trim().to_string());
        }
    }

    let mut catalogue = Catalogue::new();
    for (descriptor, values) in schema.columns.iter().zip(raw) {
        // Inference only samples the head of the file; widen when a later cell disagrees
        let mut dtype = descriptor.dtype;
        let (data, mask) = loop {
            match parse_column(&values, dtype) {
                Some(parsed) => break parsed,
                None => dtype = widen(dtype),
            }
        };
        catalogue.add_column(Column::with_mask(descriptor.name.clone(), data, mask)?)?;
    }
    Ok(catalogue)
}

/// Infer column type from sample values
fn infer_type(values: &[String]) -> ColumnType {
    let non_empty: Vec<&str> = values
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    // Nothing to go on: numeric, so a header-only position column still reads as coordinates
    if non_empty.is_empty() {
        return ColumnType::Float64;
    }

    if non_empty.iter().all(|s| s.parse::<i64>().is_ok()) {
        return ColumnType::Int64;
    }

    if non_empty.iter().all(|s| s.parse::<f64>().is_ok()) {
        return ColumnType::Float64;
    }

    if non_empty.iter().all(|s| parse_bool(s).is_some()) {
        return ColumnType::Bool;
    }

    ColumnType::String
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "yes" | "1" => Some(true),
        "false" | "f" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Next type to try when a value does not parse as `dtype`
fn widen(dtype: ColumnType) -> ColumnType {
    match dtype {
        ColumnType::Int32 | ColumnType::Int64 | ColumnType::Float32 => ColumnType::Float64,
        ColumnType::Float64 | ColumnType::Bool | ColumnType::String => ColumnType::String,
    }
}

/// Parse column values; empty cells are masked
///
/// Returns `None` if a non-empty cell does not parse as `dtype`.
fn parse_column(values: &[String], dtype: ColumnType) -> Option<(DataColumn, Vec<bool>)> {
    fn parse_all<T: Default>(
        values: &[String],
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<(Vec<T>, Vec<bool>)> {
        let mut data = Vec::with_capacity(values.len());
        let mut mask = Vec::with_capacity(values.len());
        for s in values {
            if s.is_empty() {
                data.push(T::default());
                mask.push(true);
            } else {
                data.push(parse(s)?);
                mask.push(false);
            }
        }
        Some((data, mask))
    }

    let parsed = match dtype {
        ColumnType::Float32 => {
            let (v, m) = parse_all(values, |s| s.parse::<f32>().ok())?;
            (DataColumn::Float32(v), m)
        }
        ColumnType::Float64 => {
            let (v, m) = parse_all(values, |s| s.parse::<f64>().ok())?;
            (DataColumn::Float64(v), m)
        }
        ColumnType::Int32 => {
            let (v, m) = parse_all(values, |s| s.parse::<i32>().ok())?;
            (DataColumn::Int32(v), m)
        }
        ColumnType::Int64 => {
            let (v, m) = parse_all(values, |s| s.parse::<i64>().ok())?;
            (DataColumn::Int64(v), m)
        }
        ColumnType::Bool => {
            let (v, m) = parse_all(values, parse_bool)?;
            (DataColumn::Bool(v), m)
        }
        ColumnType::String => (DataColumn::String(values.to_vec()), vec![false; values.len()]),
    };
    Some(parsed)
}
