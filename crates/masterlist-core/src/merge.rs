//! Merging a second catalogue into a master catalogue
//!
//! The merge runs in four stages:
//!
//! 1. **Pairs**: every cross pair within the radius.
//! 2. **Ambiguity flags**: sources with several candidate counterparts, and
//!    the counterparts of such sources, are flagged in `flag_merged`. The
//!    flags are advisory and do not change which pairs get matched.
//! 3. **Association**: closest pairs first, in rounds. Each round commits
//!    every pair that is the closest remaining candidate of *both* its
//!    sources, then drops all pairs touching a committed source.
//! 4. **Assembly**: rows only in the first catalogue, then matched rows, then
//!    rows only in the second catalogue.
//!
//! `flag_merged` is inherited from the first catalogue when present, so
//! catalogues can be folded in one at a time without losing earlier flags.

use crate::error::{validation, MasterlistError, MasterlistResult};
use crate::sky::{catalogue_coords, Angle, DEGREE_UNIT};
use crate::spatial::{MatchPair, PairFinder, TreePairFinder};
use masterlist_io::{Catalogue, Column, ColumnType, DataColumn};
use std::collections::HashSet;
use tracing::{debug, info};

/// Name of the merge ambiguity flag column
pub const FLAG_MERGED: &str = "flag_merged";

/// Position columns of the master catalogue
pub const RA_COL: &str = "ra";
pub const DEC_COL: &str = "dec";

/// Parameters for a merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOptions {
    /// Right ascension column of the second catalogue
    pub ra_col_2: String,
    /// Declination column of the second catalogue
    pub dec_col_2: String,
    /// Association radius
    pub radius: Angle,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            ra_col_2: RA_COL.to_string(),
            dec_col_2: DEC_COL.to_string(),
            radius: Angle::default(),
        }
    }
}

impl MergeOptions {
    pub fn new(ra_col_2: impl Into<String>, dec_col_2: impl Into<String>, radius: Angle) -> Self {
        Self {
            ra_col_2: ra_col_2.into(),
            dec_col_2: dec_col_2.into(),
            radius,
        }
    }
}

/// Result of a merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged catalogue
    pub catalogue: Catalogue,
    /// Committed associations, in commit order
    pub matches: Vec<MatchPair>,
    /// Rows of the first catalogue without a counterpart
    pub only_in_first: usize,
    /// Rows of the second catalogue without a counterpart
    pub only_in_second: usize,
    /// Rows of the first catalogue flagged ambiguous by this merge
    pub ambiguous_first: usize,
    /// Rows of the second catalogue flagged ambiguous by this merge
    pub ambiguous_second: usize,
}

/// A catalogue and the names of its position columns
#[derive(Debug, Clone, Copy)]
pub struct CatalogueSource<'a> {
    pub catalogue: &'a Catalogue,
    pub ra_col: &'a str,
    pub dec_col: &'a str,
}

impl<'a> CatalogueSource<'a> {
    pub fn new(catalogue: &'a Catalogue, ra_col: &'a str, dec_col: &'a str) -> Self {
        Self {
            catalogue,
            ra_col,
            dec_col,
        }
    }
}

/// Flag sources with ambiguous associations
///
/// A source is directly ambiguous when it appears in more than one pair.
/// One propagation pass then flags every source paired with a directly
/// ambiguous source of the other catalogue.
pub fn flag_ambiguous(
    pairs: &[MatchPair],
    len_first: usize,
    len_second: usize,
) -> (Vec<bool>, Vec<bool>) {
    let mut count_first = vec![0usize; len_first];
    let mut count_second = vec![0usize; len_second];
    for pair in pairs {
        count_first[pair.first] += 1;
        count_second[pair.second] += 1;
    }

    let mut flags_first = vec![false; len_first];
    let mut flags_second = vec![false; len_second];
    for pair in pairs {
        let direct_first = count_first[pair.first] > 1;
        let direct_second = count_second[pair.second] > 1;
        if direct_first || direct_second {
            flags_first[pair.first] = true;
            flags_second[pair.second] = true;
        }
    }

    (flags_first, flags_second)
}

/// Associate sources one-to-one, closest pairs first
///
/// Pairs are ordered by separation, ties broken by first then second index.
/// Each round commits every pair that is the first remaining occurrence of
/// both its sources, then removes every pair touching a committed source.
/// The leading pair of the list always qualifies, so each round shrinks the
/// list and the loop terminates.
pub fn mutual_nearest_matches(pairs: &[MatchPair]) -> Vec<MatchPair> {
    let mut remaining = pairs.to_vec();
    remaining.sort_by(|a, b| {
        a.separation
            .total_cmp(&b.separation)
            .then(a.first.cmp(&b.first))
            .then(a.second.cmp(&b.second))
    });

    let mut committed = Vec::new();
    let mut rounds = 0;
    while !remaining.is_empty() {
        rounds += 1;

        let mut seen_first = HashSet::new();
        let mut seen_second = HashSet::new();
        let round: Vec<MatchPair> = remaining
            .iter()
            .filter(|pair| {
                let first_seen = seen_first.insert(pair.first);
                let second_seen = seen_second.insert(pair.second);
                first_seen && second_seen
            })
            .copied()
            .collect();

        let used_first: HashSet<usize> = round.iter().map(|p| p.first).collect();
        let used_second: HashSet<usize> = round.iter().map(|p| p.second).collect();
        remaining.retain(|p| !used_first.contains(&p.first) && !used_second.contains(&p.second));

        committed.extend(round);
    }

    debug!(pairs = pairs.len(), matches = committed.len(), rounds, "association complete");
    committed
}

/// Merge `cat_2` into `cat_1` using the default pair finder
pub fn merge_catalogues(
    cat_1: &Catalogue,
    cat_2: &Catalogue,
    options: &MergeOptions,
) -> MasterlistResult<MergeOutcome> {
    merge_catalogues_with(&TreePairFinder::new(), cat_1, cat_2, options)
}

/// Merge `cat_2` into `cat_1` using the given pair finder
///
/// `cat_1` must have `ra`/`dec` columns. The position columns of `cat_2`
/// become `ra`/`dec` for its unmatched rows and are dropped for matched
/// rows. Every other column name of `cat_2` must be new to `cat_1`.
pub fn merge_catalogues_with<F: PairFinder + ?Sized>(
    finder: &F,
    cat_1: &Catalogue,
    cat_2: &Catalogue,
    options: &MergeOptions,
) -> MasterlistResult<MergeOutcome> {
    let ra_2 = options.ra_col_2.as_str();
    let dec_2 = options.dec_col_2.as_str();

    validation::validate_column_exists(cat_1, RA_COL)?;
    validation::validate_column_exists(cat_1, DEC_COL)?;
    validation::validate_column_exists(cat_2, ra_2)?;
    validation::validate_column_exists(cat_2, dec_2)?;
    validation::validate_disjoint_columns(cat_1, cat_2, &[ra_2, dec_2], &[FLAG_MERGED])?;
    let inherited_flag = validation::validate_optional_bool(cat_1, FLAG_MERGED)?;

    let mut first = cat_1.clone();
    first.set_unit(RA_COL, DEGREE_UNIT)?;
    first.set_unit(DEC_COL, DEGREE_UNIT)?;
    let mut second = cat_2.clone();
    second.set_unit(ra_2, DEGREE_UNIT)?;
    second.set_unit(dec_2, DEGREE_UNIT)?;

    // Stage 1
    let coords_1 = catalogue_coords(&first, RA_COL, DEC_COL)?;
    let coords_2 = catalogue_coords(&second, ra_2, dec_2)?;
    let pairs = finder.search_around(&coords_1, &coords_2, options.radius);

    // Stage 2
    let (flags_1, flags_2) = flag_ambiguous(&pairs, first.len(), second.len());
    let ambiguous_first = flags_1.iter().filter(|&&f| f).count();
    let ambiguous_second = flags_2.iter().filter(|&&f| f).count();
    attach_merge_flags(&mut first, flags_1, inherited_flag)?;

    // Stage 3
    let matches = mutual_nearest_matches(&pairs);

    // Stage 4
    let assembly = assemble(&first, &second, &matches, &flags_2, ra_2, dec_2)?;

    info!(
        first = first.len(),
        second = second.len(),
        pairs = pairs.len(),
        matched = matches.len(),
        only_in_first = assembly.only_in_first,
        only_in_second = assembly.only_in_second,
        ambiguous_first,
        ambiguous_second,
        "merged catalogues"
    );

    Ok(MergeOutcome {
        catalogue: assembly.catalogue,
        matches,
        only_in_first: assembly.only_in_first,
        only_in_second: assembly.only_in_second,
        ambiguous_first,
        ambiguous_second,
    })
}

/// Fold several catalogues into one master list, in order
///
/// The first catalogue's position columns are renamed to `ra`/`dec`; each
/// following catalogue is merged into the running result.
pub fn merge_all(sources: &[CatalogueSource<'_>], radius: Angle) -> MasterlistResult<Catalogue> {
    let Some((head, rest)) = sources.split_first() else {
        return Ok(Catalogue::new());
    };

    let mut master = head.catalogue.clone();
    if head.ra_col != RA_COL {
        master.rename_column(head.ra_col, RA_COL)?;
    }
    if head.dec_col != DEC_COL {
        master.rename_column(head.dec_col, DEC_COL)?;
    }

    for (round, source) in rest.iter().enumerate() {
        let options = MergeOptions::new(source.ra_col, source.dec_col, radius);
        let outcome = merge_catalogues(&master, source.catalogue, &options)?;
        debug!(round = round + 1, rows = outcome.catalogue.len(), "folded catalogue");
        master = outcome.catalogue;
    }

    Ok(master)
}

/// OR this merge's flags into `flag_merged`, creating it if needed
fn attach_merge_flags(
    catalogue: &mut Catalogue,
    mut flags: Vec<bool>,
    inherited: bool,
) -> MasterlistResult<()> {
    if !inherited {
        catalogue.add_column(Column::new(FLAG_MERGED, DataColumn::Bool(flags)))?;
        return Ok(());
    }

    let column = catalogue.column_mut(FLAG_MERGED)?;
    column.fill_masked_bool(false)?;
    if let Some(previous) = column.data.as_bool() {
        for (flag, &before) in flags.iter_mut().zip(previous) {
            *flag |= before;
        }
    }
    column.data = DataColumn::Bool(flags);
    Ok(())
}

struct Assembly {
    catalogue: Catalogue,
    only_in_first: usize,
    only_in_second: usize,
}

fn unmatched(len: usize, matched: &[usize]) -> Vec<usize> {
    let mut used = vec![false; len];
    for &i in matched {
        used[i] = true;
    }
    (0..len).filter(|&i| !used[i]).collect()
}

fn assemble(
    first: &Catalogue,
    second: &Catalogue,
    matches: &[MatchPair],
    flags_2: &[bool],
    ra_2: &str,
    dec_2: &str,
) -> MasterlistResult<Assembly> {
    let matched_1: Vec<usize> = matches.iter().map(|p| p.first).collect();
    let matched_2: Vec<usize> = matches.iter().map(|p| p.second).collect();
    let unmatched_1 = unmatched(first.len(), &matched_1);
    let unmatched_2 = unmatched(second.len(), &matched_2);

    let only_in_first = first.take(&unmatched_1)?;

    let mut only_in_second = second.take(&unmatched_2)?;
    only_in_second.rename_column(ra_2, RA_COL)?;
    only_in_second.rename_column(dec_2, DEC_COL)?;

    let mut second_payload = second.take(&matched_2)?;
    second_payload.remove_column(ra_2)?;
    second_payload.remove_column(dec_2)?;
    let both = Catalogue::hstack(&[&first.take(&matched_1)?, &second_payload])?;

    let mut catalogue = Catalogue::vstack(&[&only_in_first, &both, &only_in_second])?;

    // Flags missing on a row's side of the stack read as false
    let names: Vec<String> = catalogue.columns().iter().map(|c| c.name().to_string()).collect();
    for name in names {
        let column = catalogue.column_mut(&name)?;
        if column.descriptor.is_flag() && column.dtype() == ColumnType::Bool {
            column.fill_masked_bool(false)?;
        }
    }

    // Second-catalogue ambiguity flags, in output row order
    let second_flags = std::iter::repeat(false)
        .take(unmatched_1.len())
        .chain(matched_2.iter().map(|&j| flags_2[j]))
        .chain(unmatched_2.iter().map(|&j| flags_2[j]));

    let merged_flags = catalogue
        .column_mut(FLAG_MERGED)?
        .data
        .as_bool_mut()
        .ok_or_else(|| MasterlistError::TypeMismatch {
            column: FLAG_MERGED.to_string(),
            expected: ColumnType::Bool.to_string(),
            actual: "non-boolean".to_string(),
        })?;
    for (flag, extra) in merged_flags.iter_mut().zip(second_flags) {
        *flag |= extra;
    }

    Ok(Assembly {
        catalogue,
        only_in_first: unmatched_1.len(),
        only_in_second: unmatched_2.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(first: usize, second: usize, arcsec: f64) -> MatchPair {
        MatchPair {
            first,
            second,
            separation: Angle::from_arcsec(arcsec),
        }
    }

    #[test]
    fn test_flag_direct_and_propagated() {
        // first 0 has two candidates; second 1 also pairs with first 1
        let pairs = vec![pair(0, 0, 0.1), pair(0, 1, 0.2), pair(1, 1, 0.3), pair(2, 2, 0.1)];
        let (flags_1, flags_2) = flag_ambiguous(&pairs, 4, 3);

        assert_eq!(flags_1, vec![true, true, false, false]);
        assert_eq!(flags_2, vec![true, true, false]);
    }

    #[test]
    fn test_flag_whole_chain() {
        // Every source of the chain 0-0, 0-1, 1-1, 1-2, 2-2 is flagged; 3-3 is clean
        let pairs = vec![
            pair(0, 0, 0.1),
            pair(0, 1, 0.1),
            pair(1, 1, 0.1),
            pair(1, 2, 0.1),
            pair(2, 2, 0.1),
            pair(3, 3, 0.1),
        ];
        let (flags_1, flags_2) = flag_ambiguous(&pairs, 4, 4);
        assert_eq!(flags_1, vec![true, true, true, false]);
        assert_eq!(flags_2, vec![true, true, true, false]);
    }

    #[test]
    fn test_flag_counts_cover_last_index() {
        // Counts are indexed by row, so the last row of each side must register
        let n = 1000;
        let mut pairs: Vec<MatchPair> = (0..n - 1).map(|i| pair(i, i, 0.1)).collect();
        pairs.push(pair(n - 1, n - 1, 0.1));
        pairs.push(pair(n - 1, n - 2, 0.2));
        let (flags_1, flags_2) = flag_ambiguous(&pairs, n, n);

        assert_eq!(flags_1.iter().filter(|&&f| f).count(), 2);
        assert!(flags_1[n - 1] && flags_1[n - 2]);
        assert_eq!(flags_2.iter().filter(|&&f| f).count(), 2);
        assert!(flags_2[n - 1] && flags_2[n - 2]);
    }

    #[test]
    fn test_mutual_nearest_prefers_closer() {
        let pairs = vec![pair(0, 0, 0.3), pair(0, 1, 0.1), pair(1, 1, 0.2)];
        let matches = mutual_nearest_matches(&pairs);
        let indices: Vec<(usize, usize)> = matches.iter().map(|p| (p.first, p.second)).collect();
        // (0,1) wins; (1,1) and (0,0) are invalidated with it
        assert_eq!(indices, vec![(0, 1)]);
    }

    #[test]
    fn test_mutual_nearest_needs_rounds() {
        // Round 1: (0,0) at 0.1 and (2,2) at 0.15 are mutually first.
        // (1,0) at 0.12 loses to (0,0); (1,1) at 0.3 is taken in round 2.
        let pairs = vec![pair(0, 0, 0.1), pair(1, 0, 0.12), pair(2, 2, 0.15), pair(1, 1, 0.3)];
        let matches = mutual_nearest_matches(&pairs);
        let indices: Vec<(usize, usize)> = matches.iter().map(|p| (p.first, p.second)).collect();
        assert_eq!(indices, vec![(0, 0), (2, 2), (1, 1)]);
    }

    #[test]
    fn test_mutual_nearest_tie_break() {
        let pairs = vec![pair(1, 0, 0.2), pair(0, 0, 0.2)];
        let matches = mutual_nearest_matches(&pairs);
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].first, matches[0].second), (0, 0));
    }

    #[test]
    fn test_mutual_nearest_empty() {
        assert!(mutual_nearest_matches(&[]).is_empty());
    }

    #[test]
    fn test_unmatched() {
        assert_eq!(unmatched(5, &[3, 0]), vec![1, 2, 4]);
        assert!(unmatched(0, &[]).is_empty());
    }
}
