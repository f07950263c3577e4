//! In-memory catalogue tables
//!
//! A `Catalogue` is an ordered list of equally long named columns. Row order
//! is meaningful: it is the identity of a source within one table, and every
//! operation here either preserves it or applies an explicit permutation.
//!
//! Columns may carry a mask marking missing cells. Masks appear when tables
//! with different columns are stacked vertically, or when a file has empty
//! cells; masked slots hold the type's default value.

use crate::reader::{IoError, IoResult};
use crate::schema::{ColumnDescriptor, ColumnType, DataColumn};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A named column with optional missing-value mask
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub descriptor: ColumnDescriptor,
    pub data: DataColumn,
    /// `true` marks a missing cell
    mask: Option<Vec<bool>>,
}

impl Column {
    /// Create an unmasked column
    pub fn new(name: impl Into<String>, data: DataColumn) -> Self {
        Self {
            descriptor: ColumnDescriptor::new(name, data.dtype()),
            data,
            mask: None,
        }
    }

    /// Create a column with a missing-value mask
    pub fn with_mask(name: impl Into<String>, data: DataColumn, mask: Vec<bool>) -> IoResult<Self> {
        if mask.len() != data.len() {
            return Err(IoError::LengthMismatch {
                expected: data.len(),
                actual: mask.len(),
            });
        }
        let mut column = Self::new(name, data);
        column.mask = mask.iter().any(|&m| m).then_some(mask);
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The missing-value mask, if any cell is missing
    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// Whether a given cell is missing
    pub fn is_masked(&self, row: usize) -> bool {
        self.mask.as_ref().is_some_and(|m| m[row])
    }

    /// Number of missing cells
    pub fn masked_count(&self) -> usize {
        self.mask
            .as_ref()
            .map_or(0, |m| m.iter().filter(|&&x| x).count())
    }

    /// Numeric values as f64, with missing cells as NaN
    pub fn values_f64(&self) -> Option<Vec<f64>> {
        let mut values = self.data.to_f64()?;
        if let Some(mask) = &self.mask {
            for (value, &missing) in values.iter_mut().zip(mask) {
                if missing {
                    *value = f64::NAN;
                }
            }
        }
        Some(values)
    }

    /// Replace missing cells of a boolean column with `value` and drop the mask
    pub fn fill_masked_bool(&mut self, value: bool) -> IoResult<()> {
        let dtype = self.dtype();
        let Some(values) = self.data.as_bool_mut() else {
            return Err(IoError::TypeMismatch {
                column: self.descriptor.name.clone(),
                expected: ColumnType::Bool.to_string(),
                actual: dtype.to_string(),
            });
        };
        if let Some(mask) = self.mask.take() {
            for (slot, missing) in values.iter_mut().zip(mask) {
                if missing {
                    *slot = value;
                }
            }
        }
        Ok(())
    }

    fn take(&self, indices: &[usize]) -> Column {
        let mask = self
            .mask
            .as_ref()
            .map(|m| indices.iter().map(|&i| m[i]).collect::<Vec<_>>())
            .filter(|m| m.iter().any(|&x| x));
        Column {
            descriptor: self.descriptor.clone(),
            data: self.data.take(indices),
            mask,
        }
    }

    fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        // Missing cells sort last
        match (self.is_masked(a), self.is_masked(b)) {
            (false, false) => self.data.compare_rows(a, b),
            (true, true) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
        }
    }
}

/// An ordered table of sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    columns: Vec<Column>,
    num_rows: usize,
    /// Free-form key/value metadata
    pub metadata: HashMap<String, String>,
}

impl Catalogue {
    /// Create an empty catalogue with no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalogue from columns, checking lengths and names
    pub fn from_columns(columns: Vec<Column>) -> IoResult<Self> {
        let mut catalogue = Self::new();
        for column in columns {
            catalogue.add_column(column)?;
        }
        Ok(catalogue)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> IoResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| IoError::ColumnNotFound(name.to_string()))
    }

    /// Look up a column by name for modification
    pub fn column_mut(&mut self, name: &str) -> IoResult<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| IoError::ColumnNotFound(name.to_string()))
    }

    /// Numeric column values as f64 (missing cells become NaN)
    pub fn float_column(&self, name: &str) -> IoResult<Vec<f64>> {
        let column = self.column(name)?;
        column.values_f64().ok_or_else(|| IoError::TypeMismatch {
            column: name.to_string(),
            expected: "numeric".to_string(),
            actual: column.dtype().to_string(),
        })
    }

    /// Append a column
    ///
    /// The first column of a column-less catalogue sets the row count.
    pub fn add_column(&mut self, column: Column) -> IoResult<()> {
        if self.has_column(column.name()) {
            return Err(IoError::DuplicateColumn(column.name().to_string()));
        }
        if self.columns.is_empty() {
            self.num_rows = column.len();
        } else if column.len() != self.num_rows {
            return Err(IoError::LengthMismatch {
                expected: self.num_rows,
                actual: column.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column and return it
    pub fn remove_column(&mut self, name: &str) -> IoResult<Column> {
        let index = self
            .position(name)
            .ok_or_else(|| IoError::ColumnNotFound(name.to_string()))?;
        Ok(self.columns.remove(index))
    }

    /// Rename a column in place
    pub fn rename_column(&mut self, from: &str, to: &str) -> IoResult<()> {
        if from == to {
            return self.column(from).map(|_| ());
        }
        if self.has_column(to) {
            return Err(IoError::DuplicateColumn(to.to_string()));
        }
        self.column_mut(from)?.descriptor.name = to.to_string();
        Ok(())
    }

    /// Set the physical unit of a column
    pub fn set_unit(&mut self, name: &str, unit: &str) -> IoResult<()> {
        self.column_mut(name)?.descriptor.unit = Some(unit.to_string());
        Ok(())
    }

    /// Select rows by index, in the order given
    pub fn take(&self, indices: &[usize]) -> IoResult<Catalogue> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.num_rows) {
            return Err(IoError::OutOfBounds {
                index,
                size: self.num_rows,
            });
        }
        Ok(Catalogue {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            num_rows: indices.len(),
            metadata: self.metadata.clone(),
        })
    }

    /// Select rows where `keep` is true
    pub fn filter(&self, keep: &[bool]) -> IoResult<Catalogue> {
        if keep.len() != self.num_rows {
            return Err(IoError::LengthMismatch {
                expected: self.num_rows,
                actual: keep.len(),
            });
        }
        let indices: Vec<usize> = (0..self.num_rows).filter(|&i| keep[i]).collect();
        self.take(&indices)
    }

    /// Stable ascending sort on one or more key columns
    pub fn sorted_by<S: AsRef<str>>(&self, keys: &[S]) -> IoResult<Catalogue> {
        let key_columns = keys
            .iter()
            .map(|k| self.column(k.as_ref()))
            .collect::<IoResult<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..self.num_rows).collect();
        order.sort_by(|&a, &b| {
            key_columns
                .iter()
                .map(|c| c.compare_rows(a, b))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        self.take(&order)
    }

    /// Reverse row order
    pub fn reversed(&self) -> Catalogue {
        let order: Vec<usize> = (0..self.num_rows).rev().collect();
        Catalogue {
            columns: self.columns.iter().map(|c| c.take(&order)).collect(),
            num_rows: self.num_rows,
            metadata: self.metadata.clone(),
        }
    }

    /// Concatenate tables side by side
    ///
    /// All tables must have the same row count and disjoint column names.
    pub fn hstack(tables: &[&Catalogue]) -> IoResult<Catalogue> {
        let mut result = Catalogue::new();
        let Some(first) = tables.first() else {
            return Ok(result);
        };
        result.num_rows = first.num_rows;
        result.metadata = first.metadata.clone();

        for table in tables {
            if table.num_rows != result.num_rows {
                return Err(IoError::LengthMismatch {
                    expected: result.num_rows,
                    actual: table.num_rows,
                });
            }
            for column in &table.columns {
                if result.has_column(column.name()) {
                    return Err(IoError::DuplicateColumn(column.name().to_string()));
                }
                result.columns.push(column.clone());
            }
        }
        Ok(result)
    }

    /// Concatenate tables one after another (outer join on column names)
    ///
    /// Column order follows first appearance. Cells of a column absent from
    /// one of the inputs are masked. Mixed numeric types widen to float64;
    /// any other type disagreement is an error.
    pub fn vstack(tables: &[&Catalogue]) -> IoResult<Catalogue> {
        let mut descriptors: Vec<ColumnDescriptor> = Vec::new();
        for table in tables {
            for column in &table.columns {
                match descriptors.iter_mut().find(|d| d.name == column.name()) {
                    Some(existing) => {
                        existing.dtype = existing.dtype.stack_with(column.dtype()).ok_or_else(
                            || IoError::TypeMismatch {
                                column: column.name().to_string(),
                                expected: existing.dtype.to_string(),
                                actual: column.dtype().to_string(),
                            },
                        )?;
                    }
                    None => descriptors.push(column.descriptor.clone()),
                }
            }
        }

        let total: usize = tables.iter().map(|t| t.num_rows).sum();
        let mut columns = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let mut data = DataColumn::filled(descriptor.dtype, 0);
            let mut mask = Vec::with_capacity(total);

            for table in tables {
                let (part, part_mask) = match table.column(&descriptor.name) {
                    Ok(column) => {
                        let part = column.data.clone().cast(descriptor.dtype).ok_or_else(|| {
                            IoError::TypeMismatch {
                                column: descriptor.name.clone(),
                                expected: descriptor.dtype.to_string(),
                                actual: column.dtype().to_string(),
                            }
                        })?;
                        let part_mask = column
                            .mask()
                            .map_or_else(|| vec![false; table.num_rows], <[bool]>::to_vec);
                        (part, part_mask)
                    }
                    Err(_) => (
                        DataColumn::filled(descriptor.dtype, table.num_rows),
                        vec![true; table.num_rows],
                    ),
                };
                data.append(part).map_err(|part| IoError::TypeMismatch {
                    column: descriptor.name.clone(),
                    expected: descriptor.dtype.to_string(),
                    actual: part.dtype().to_string(),
                })?;
                mask.extend(part_mask);
            }

            let mut column = Column::with_mask(descriptor.name.clone(), data, mask)?;
            column.descriptor = descriptor;
            columns.push(column);
        }

        Ok(Catalogue {
            columns,
            num_rows: total,
            metadata: tables.first().map(|t| t.metadata.clone()).unwrap_or_default(),
        })
    }
}
