//! Positional diagnostics between two catalogues
//!
//! Produces the numbers that offset plots are drawn from: for each source
//! of a first catalogue, its nearest neighbour in a second catalogue, and the
//! RA/Dec offsets of the neighbours found within a radius. A robust summary
//! (median and MAD) tells whether one catalogue is shifted against the other.

use crate::error::MasterlistResult;
use crate::merge::{DEC_COL, RA_COL};
use crate::sky::{catalogue_coords, Angle, SkyCoord};
use crate::spatial::{NearestMatch, PairFinder, TreePairFinder};
use masterlist_io::Catalogue;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scale factor making the MAD comparable to a standard deviation
const MAD_TO_SIGMA: f64 = 1.4826;

/// Nearest neighbours of `first` in `second`, kept only within `radius`
pub fn nearest_matches(
    first: &[SkyCoord],
    second: &[SkyCoord],
    radius: Angle,
) -> Vec<Option<NearestMatch>> {
    TreePairFinder::new()
        .nearest(first, second)
        .into_iter()
        .map(|m| m.filter(|m| radius.contains(m.separation)))
        .collect()
}

/// Robust location and spread of one offset component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustSummary {
    pub count: usize,
    pub median: f64,
    /// Median absolute deviation
    pub mad: f64,
}

impl RobustSummary {
    /// Summarise finite values; NaN fields when none are finite
    pub fn from_data(data: &[f64]) -> Self {
        let mut sorted: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return Self {
                count: 0,
                median: f64::NAN,
                mad: f64::NAN,
            };
        }
        sorted.sort_by(f64::total_cmp);
        let median = median_of_sorted(&sorted);

        let mut deviations: Vec<f64> = sorted.iter().map(|x| (x - median).abs()).collect();
        deviations.sort_by(f64::total_cmp);

        Self {
            count: sorted.len(),
            median,
            mad: median_of_sorted(&deviations),
        }
    }

    /// Spread scaled to a Gaussian sigma
    pub fn sigma(&self) -> f64 {
        MAD_TO_SIGMA * self.mad
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Offsets of nearest counterparts, second minus first, in arcsec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstrometricOffsets {
    /// Index pairs `(first, second)` of the counterparts used
    pub pairs: Vec<(usize, usize)>,
    /// ΔRA·cos(dec) per counterpart
    pub dra_arcsec: Vec<f64>,
    /// ΔDec per counterpart
    pub ddec_arcsec: Vec<f64>,
    pub dra: RobustSummary,
    pub ddec: RobustSummary,
}

/// Compare positions of `cat_2` against the `ra`/`dec` of `cat_1`
pub fn astrometric_offsets(
    cat_1: &Catalogue,
    cat_2: &Catalogue,
    ra_col_2: &str,
    dec_col_2: &str,
    radius: Angle,
) -> MasterlistResult<AstrometricOffsets> {
    let coords_1 = catalogue_coords(cat_1, RA_COL, DEC_COL)?;
    let coords_2 = catalogue_coords(cat_2, ra_col_2, dec_col_2)?;

    let mut pairs = Vec::new();
    let mut dra_arcsec = Vec::new();
    let mut ddec_arcsec = Vec::new();
    for (i, found) in nearest_matches(&coords_1, &coords_2, radius).into_iter().enumerate() {
        if let Some(m) = found {
            let (dra, ddec) = coords_1[i].offset_to(&coords_2[m.index]);
            pairs.push((i, m.index));
            dra_arcsec.push(dra);
            ddec_arcsec.push(ddec);
        }
    }

    let dra = RobustSummary::from_data(&dra_arcsec);
    let ddec = RobustSummary::from_data(&ddec_arcsec);
    debug!(
        counterparts = pairs.len(),
        median_dra = dra.median,
        median_ddec = ddec.median,
        "computed astrometric offsets"
    );

    Ok(AstrometricOffsets {
        pairs,
        dra_arcsec,
        ddec_arcsec,
        dra,
        ddec,
    })
}
