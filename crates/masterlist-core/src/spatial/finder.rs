//! Pair finding between sets of sky positions
//!
//! The matching algorithms only need two questions answered: which pairs of
//! positions lie within a radius of each other, and which position of a
//! second set is nearest to each position of a first set. `PairFinder` is
//! that seam. `TreePairFinder` answers it with a `SkyTree`;
//! `BruteForcePairFinder` checks every pair and serves as a reference.

use crate::sky::{chord_length, Angle, SkyCoord};
use crate::spatial::tree::{SkyTree, TreeConfig};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Two positions within the search radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPair {
    /// Index into the first set
    pub first: usize,
    /// Index into the second set
    pub second: usize,
    pub separation: Angle,
}

/// Nearest position of the second set for one position of the first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch {
    pub index: usize,
    pub separation: Angle,
}

/// Spatial pair-finding oracle
pub trait PairFinder {
    /// All pairs `(i, j)` with `first[i]` and `second[j]` within `radius`
    ///
    /// The radius is inclusive. Positions that are not finite never match,
    /// and an unusable radius (zero, negative, NaN) yields no pairs. When
    /// `first` and `second` are the same set, self-pairs are included.
    /// Pairs are ordered by `(first, second)`.
    fn search_around(&self, first: &[SkyCoord], second: &[SkyCoord], radius: Angle)
        -> Vec<MatchPair>;

    /// For each position of `first`, the nearest position of `second`
    ///
    /// `None` when `second` has no finite position or the query itself is
    /// not finite.
    fn nearest(&self, first: &[SkyCoord], second: &[SkyCoord]) -> Vec<Option<NearestMatch>>;
}

/// Tree-backed pair finder
#[derive(Debug, Clone, Default)]
pub struct TreePairFinder {
    config: TreeConfig,
}

impl TreePairFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self { config }
    }

    fn index(&self, coords: &[SkyCoord]) -> SkyTree {
        SkyTree::build_with_config(
            coords
                .iter()
                .enumerate()
                .filter(|(_, c)| c.is_finite())
                .map(|(i, c)| (c.to_unit_vector(), i)),
            self.config.clone(),
        )
    }
}

impl PairFinder for TreePairFinder {
    fn search_around(
        &self,
        first: &[SkyCoord],
        second: &[SkyCoord],
        radius: Angle,
    ) -> Vec<MatchPair> {
        if !radius.is_usable_radius() || first.is_empty() || second.is_empty() {
            return Vec::new();
        }

        let tree = self.index(second);
        // Widen the chord a little; exact separations decide membership
        let chord = chord_length(radius) * (1.0 + 1e-6) + f64::EPSILON;

        let candidates = |(i, coord): (usize, &SkyCoord)| -> Vec<MatchPair> {
            if !coord.is_finite() {
                return Vec::new();
            }
            tree.query_sphere(coord.to_unit_vector(), chord)
                .into_iter()
                .filter_map(|j| {
                    let separation = coord.separation(&second[j]);
                    radius.contains(separation).then_some(MatchPair {
                        first: i,
                        second: j,
                        separation,
                    })
                })
                .collect()
        };

        #[cfg(feature = "parallel")]
        let mut pairs: Vec<MatchPair> = first
            .par_iter()
            .enumerate()
            .flat_map_iter(candidates)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let mut pairs: Vec<MatchPair> = first.iter().enumerate().flat_map(candidates).collect();

        pairs.sort_unstable_by_key(|p| (p.first, p.second));
        debug!(
            first = first.len(),
            second = second.len(),
            radius_arcsec = radius.arcsec(),
            pairs = pairs.len(),
            "pair search complete"
        );
        pairs
    }

    fn nearest(&self, first: &[SkyCoord], second: &[SkyCoord]) -> Vec<Option<NearestMatch>> {
        let tree = self.index(second);
        first
            .iter()
            .map(|coord| {
                if !coord.is_finite() {
                    return None;
                }
                tree.nearest(coord.to_unit_vector()).map(|(index, _)| NearestMatch {
                    index,
                    separation: coord.separation(&second[index]),
                })
            })
            .collect()
    }
}

/// Exhaustive O(n·m) pair finder
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForcePairFinder;

impl PairFinder for BruteForcePairFinder {
    fn search_around(
        &self,
        first: &[SkyCoord],
        second: &[SkyCoord],
        radius: Angle,
    ) -> Vec<MatchPair> {
        if !radius.is_usable_radius() {
            return Vec::new();
        }

        let mut pairs = Vec::new();
        for (i, a) in first.iter().enumerate().filter(|(_, c)| c.is_finite()) {
            for (j, b) in second.iter().enumerate().filter(|(_, c)| c.is_finite()) {
                let separation = a.separation(b);
                if radius.contains(separation) {
                    pairs.push(MatchPair {
                        first: i,
                        second: j,
                        separation,
                    });
                }
            }
        }
        pairs
    }

    fn nearest(&self, first: &[SkyCoord], second: &[SkyCoord]) -> Vec<Option<NearestMatch>> {
        first
            .iter()
            .map(|a| {
                if !a.is_finite() {
                    return None;
                }
                second
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.is_finite())
                    .map(|(index, b)| NearestMatch {
                        index,
                        separation: a.separation(b),
                    })
                    .min_by(|x, y| {
                        x.separation
                            .total_cmp(&y.separation)
                            .then(x.index.cmp(&y.index))
                    })
            })
            .collect()
    }
}
