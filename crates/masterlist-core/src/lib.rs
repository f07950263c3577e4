//! masterlist-core - Cross-matching of astronomical source catalogues
//!
//! This crate builds master lists of sources from several overlapping
//! catalogues of the same sky area.
//!
//! # Key Components
//!
//! - **Sky**: angles, positions and great-circle separations
//! - **Spatial**: pair finding over sky positions, backed by a bounding-volume tree
//! - **Dedupe**: removal of duplicated sources within one catalogue
//! - **Merge**: one-to-one association of two catalogues into one
//! - **Diagnostics**: nearest neighbours and astrometric offsets
//! - **Config**: pipeline parameters from TOML or JSON
//!
//! # Flags
//!
//! Both operations record what they did in boolean columns whose names
//! contain `flag`: `flag_cleaned` marks sources that had a duplicate, and
//! `flag_merged` marks sources whose association was ambiguous.

pub mod config;
pub mod dedupe;
pub mod diagnostics;
pub mod error;
pub mod merge;
pub mod sky;
pub mod spatial;

pub use config::{DedupeConfig, MasterlistConfig, MergeConfig};
pub use dedupe::*;
pub use diagnostics::*;
pub use error::{MasterlistError, MasterlistResult};
pub use merge::*;
pub use sky::*;
pub use spatial::*;
