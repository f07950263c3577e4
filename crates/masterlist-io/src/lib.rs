//! masterlist-io - Catalogue tables and file I/O
//!
//! This crate provides the tabular substrate the matching algorithms run on:
//!
//! - **Catalogue**: ordered, named, typed columns with missing-value masks
//! - **Stacking**: horizontal and vertical (outer join) concatenation
//! - **CSV**: reading with type inference, and writing
//!
//! # Design
//!
//! Readers implement the `CatalogueReader` trait for uniform access. Tables
//! are plain values: every operation returns a new `Catalogue` and leaves
//! its inputs untouched.

pub mod reader;
pub mod schema;
pub mod table;

#[cfg(feature = "csv")]
pub mod csv_reader;

#[cfg(feature = "csv")]
pub mod csv_writer;

pub use reader::*;
pub use schema::*;
pub use table::*;

#[cfg(feature = "csv")]
pub use csv_reader::{read_csv_str, CsvReader};

#[cfg(feature = "csv")]
pub use csv_writer::{write_csv, write_csv_to};
