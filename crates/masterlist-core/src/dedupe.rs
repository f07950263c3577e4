//! Duplicate removal within one catalogue
//!
//! The catalogue is matched against itself. Every source with a neighbour
//! within the radius is flagged, and every source with a *lower-indexed*
//! neighbour within the radius is removed. Row order therefore decides
//! which source of a group survives; sort keys let callers put the preferred
//! sources first.
//!
//! Removal percolates: if A is near B and B is near C, both B and C are
//! removed even when A and C are farther apart than the radius. There is no
//! re-clustering by connected components beyond this index-order rule.

use crate::error::{validation, MasterlistResult};
use crate::sky::{catalogue_coords, Angle, DEGREE_UNIT};
use crate::spatial::{PairFinder, TreePairFinder};
use masterlist_io::{Catalogue, Column, DataColumn};
use tracing::{debug, info};

/// Default name of the duplicate flag column
pub const FLAG_CLEANED: &str = "flag_cleaned";

/// Parameters for duplicate removal
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeOptions {
    /// Right ascension column (decimal degrees)
    pub ra_col: String,
    /// Declination column (decimal degrees)
    pub dec_col: String,
    /// Sources closer than this are duplicates
    pub radius: Angle,
    /// Columns to sort by (ascending) before removal; the first row wins
    pub sort_keys: Vec<String>,
    /// Reverse the row order after sorting
    pub reverse: bool,
    /// Name of the flag column to add
    pub flag_name: String,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            ra_col: "ra".to_string(),
            dec_col: "dec".to_string(),
            radius: Angle::default(),
            sort_keys: Vec::new(),
            reverse: false,
            flag_name: FLAG_CLEANED.to_string(),
        }
    }
}

impl DedupeOptions {
    pub fn new(radius: Angle) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }

    /// Prioritise rows by sorting on `keys` (optionally reversed)
    pub fn with_sort<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>, reverse: bool) -> Self {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self.reverse = reverse;
        self
    }

    /// Use other position columns
    pub fn with_positions(mut self, ra_col: impl Into<String>, dec_col: impl Into<String>) -> Self {
        self.ra_col = ra_col.into();
        self.dec_col = dec_col.into();
        self
    }

    /// Use another flag column name
    pub fn with_flag_name(mut self, flag_name: impl Into<String>) -> Self {
        self.flag_name = flag_name.into();
        self
    }
}

/// Result of duplicate removal
#[derive(Debug, Clone)]
pub struct DedupeOutcome {
    /// Surviving rows, in priority order, with the flag column attached
    pub catalogue: Catalogue,
    /// Flag value of each surviving row
    pub flags: Vec<bool>,
    /// Number of rows removed
    pub removed: usize,
    /// Number of rows (before removal) involved in any duplicate pair
    pub flagged: usize,
}

/// Remove duplicated sources using the default pair finder
pub fn remove_duplicates(
    table: &Catalogue,
    options: &DedupeOptions,
) -> MasterlistResult<DedupeOutcome> {
    remove_duplicates_with(&TreePairFinder::new(), table, options)
}

/// Remove duplicated sources using the given pair finder
pub fn remove_duplicates_with<F: PairFinder + ?Sized>(
    finder: &F,
    table: &Catalogue,
    options: &DedupeOptions,
) -> MasterlistResult<DedupeOutcome> {
    let has_flag = validation::validate_optional_bool(table, &options.flag_name)?;

    let mut working = if options.sort_keys.is_empty() {
        table.clone()
    } else {
        table.sorted_by(&options.sort_keys)?
    };
    if options.reverse {
        working = working.reversed();
    }
    working.set_unit(&options.ra_col, DEGREE_UNIT)?;
    working.set_unit(&options.dec_col, DEGREE_UNIT)?;

    let coords = catalogue_coords(&working, &options.ra_col, &options.dec_col)?;
    let pairs = finder.search_around(&coords, &coords, options.radius);

    let n = working.len();
    let mut flags = vec![false; n];
    let mut remove = vec![false; n];
    for pair in pairs.iter().filter(|p| p.first != p.second) {
        flags[pair.first] = true;
        flags[pair.second] = true;
        if pair.first > pair.second {
            remove[pair.first] = true;
        }
    }
    let flagged = flags.iter().filter(|&&f| f).count();
    debug!(rows = n, pairs = pairs.len(), flagged, "self-match complete");

    if has_flag {
        let column = working.column_mut(&options.flag_name)?;
        column.fill_masked_bool(false)?;
        if let Some(existing) = column.data.as_bool() {
            for (flag, &previous) in flags.iter_mut().zip(existing) {
                *flag |= previous;
            }
        }
        column.data = DataColumn::Bool(flags);
    } else {
        working.add_column(Column::new(options.flag_name.clone(), DataColumn::Bool(flags)))?;
    }

    let keep: Vec<bool> = remove.iter().map(|&r| !r).collect();
    let catalogue = working.filter(&keep)?;
    let flags = catalogue
        .column(&options.flag_name)?
        .data
        .as_bool()
        .map(<[bool]>::to_vec)
        .unwrap_or_default();
    let removed = n - catalogue.len();

    info!(
        rows = n,
        removed,
        flagged,
        radius_arcsec = options.radius.arcsec(),
        "removed duplicates"
    );

    Ok(DedupeOutcome {
        catalogue,
        flags,
        removed,
        flagged,
    })
}
