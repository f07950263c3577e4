//! Schema and column types for catalogue data

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Schema describing the structure of a catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSchema {
    /// Column descriptors
    pub columns: Vec<ColumnDescriptor>,

    /// Number of records
    pub num_records: usize,
}

impl DataSchema {
    /// Create a new schema
    pub fn new(columns: Vec<ColumnDescriptor>, num_records: usize) -> Self {
        Self {
            columns,
            num_records,
        }
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Descriptor for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Data type
    pub dtype: ColumnType,

    /// Physical units (if known)
    pub unit: Option<String>,

    /// Description
    pub description: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            unit: None,
            description: None,
        }
    }

    /// Whether this column follows the boolean flag naming convention
    pub fn is_flag(&self) -> bool {
        self.name.contains("flag")
    }
}

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Float32,
    Float64,
    Int32,
    Int64,
    Bool,
    String,
}

impl ColumnType {
    /// Check if this is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Float32 | ColumnType::Float64 | ColumnType::Int32 | ColumnType::Int64
        )
    }

    /// Type name as used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Float32 => "float32",
            ColumnType::Float64 => "float64",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Bool => "bool",
            ColumnType::String => "string",
        }
    }

    /// Common type two columns can be stacked into, if any
    ///
    /// Identical types stack as-is; mixed numeric types widen to float64.
    pub fn stack_with(self, other: ColumnType) -> Option<ColumnType> {
        if self == other {
            Some(self)
        } else if self.is_numeric() && other.is_numeric() {
            Some(ColumnType::Float64)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A column of data
#[derive(Debug, Clone, PartialEq)]
pub enum DataColumn {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Bool(Vec<bool>),
    String(Vec<String>),
}

impl DataColumn {
    /// A column of `len` default values (zero, false or empty string)
    pub fn filled(dtype: ColumnType, len: usize) -> Self {
        match dtype {
            ColumnType::Float32 => DataColumn::Float32(vec![0.0; len]),
            ColumnType::Float64 => DataColumn::Float64(vec![0.0; len]),
            ColumnType::Int32 => DataColumn::Int32(vec![0; len]),
            ColumnType::Int64 => DataColumn::Int64(vec![0; len]),
            ColumnType::Bool => DataColumn::Bool(vec![false; len]),
            ColumnType::String => DataColumn::String(vec![String::new(); len]),
        }
    }

    /// Get the column type
    pub fn dtype(&self) -> ColumnType {
        match self {
            DataColumn::Float32(_) => ColumnType::Float32,
            DataColumn::Float64(_) => ColumnType::Float64,
            DataColumn::Int32(_) => ColumnType::Int32,
            DataColumn::Int64(_) => ColumnType::Int64,
            DataColumn::Bool(_) => ColumnType::Bool,
            DataColumn::String(_) => ColumnType::String,
        }
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        match self {
            DataColumn::Float32(v) => v.len(),
            DataColumn::Float64(v) => v.len(),
            DataColumn::Int32(v) => v.len(),
            DataColumn::Int64(v) => v.len(),
            DataColumn::Bool(v) => v.len(),
            DataColumn::String(v) => v.len(),
        }
    }

    /// Check if the column is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to f64 (for numeric types)
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            DataColumn::Float32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            DataColumn::Float64(v) => Some(v.clone()),
            DataColumn::Int32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            DataColumn::Int64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            _ => None,
        }
    }

    /// Borrow boolean values
    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            DataColumn::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Mutably borrow boolean values
    pub fn as_bool_mut(&mut self) -> Option<&mut Vec<bool>> {
        match self {
            DataColumn::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Select rows by index, in the order given
    ///
    /// Indices must be in bounds; callers validate them first.
    pub fn take(&self, indices: &[usize]) -> DataColumn {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }

        match self {
            DataColumn::Float32(v) => DataColumn::Float32(pick(v, indices)),
            DataColumn::Float64(v) => DataColumn::Float64(pick(v, indices)),
            DataColumn::Int32(v) => DataColumn::Int32(pick(v, indices)),
            DataColumn::Int64(v) => DataColumn::Int64(pick(v, indices)),
            DataColumn::Bool(v) => DataColumn::Bool(pick(v, indices)),
            DataColumn::String(v) => DataColumn::String(pick(v, indices)),
        }
    }

    /// Convert to another type for stacking
    ///
    /// Only identity and numeric-to-float64 conversions are supported.
    pub fn cast(self, dtype: ColumnType) -> Option<DataColumn> {
        if self.dtype() == dtype {
            return Some(self);
        }
        match dtype {
            ColumnType::Float64 => self.to_f64().map(DataColumn::Float64),
            _ => None,
        }
    }

    /// Append another column of the same type
    ///
    /// Returns the other column back if the types differ.
    pub fn append(&mut self, other: DataColumn) -> Result<(), DataColumn> {
        match (self, other) {
            (DataColumn::Float32(a), DataColumn::Float32(b)) => a.extend(b),
            (DataColumn::Float64(a), DataColumn::Float64(b)) => a.extend(b),
            (DataColumn::Int32(a), DataColumn::Int32(b)) => a.extend(b),
            (DataColumn::Int64(a), DataColumn::Int64(b)) => a.extend(b),
            (DataColumn::Bool(a), DataColumn::Bool(b)) => a.extend(b),
            (DataColumn::String(a), DataColumn::String(b)) => a.extend(b),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Compare two rows of this column
    ///
    /// Floats use a total order so NaN sorts after every number.
    pub fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        match self {
            DataColumn::Float32(v) => v[a].total_cmp(&v[b]),
            DataColumn::Float64(v) => v[a].total_cmp(&v[b]),
            DataColumn::Int32(v) => v[a].cmp(&v[b]),
            DataColumn::Int64(v) => v[a].cmp(&v[b]),
            DataColumn::Bool(v) => v[a].cmp(&v[b]),
            DataColumn::String(v) => v[a].cmp(&v[b]),
        }
    }

    /// Render one value as text
    pub fn format_value(&self, index: usize) -> String {
        match self {
            DataColumn::Float32(v) => v[index].to_string(),
            DataColumn::Float64(v) => v[index].to_string(),
            DataColumn::Int32(v) => v[index].to_string(),
            DataColumn::Int64(v) => v[index].to_string(),
            DataColumn::Bool(v) => v[index].to_string(),
            DataColumn::String(v) => v[index].clone(),
        }
    }
}
