//! Angles and sky positions
//!
//! Positions are right ascension / declination pairs in decimal degrees.
//! Separations are great-circle distances computed with the Vincenty
//! formula, which stays accurate from sub-milliarcsecond scales up to
//! antipodal points.

use crate::error::MasterlistResult;
use masterlist_io::Catalogue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

/// Default proximity radius for duplicate removal and merging
pub const DEFAULT_RADIUS_ARCSEC: f64 = 0.4;

/// Unit string attached to position columns
pub const DEGREE_UNIT: &str = "deg";

/// Relative slack under which a separation counts as equal to the radius
///
/// Keeps the radius boundary inclusive when a separation that is exactly the
/// radius on paper comes out one rounding step above it.
pub const SEPARATION_RTOL: f64 = 1e-9;

const ARCSEC_PER_DEGREE: f64 = 3600.0;

/// An angle, stored in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub const fn from_degrees(degrees: f64) -> Self {
        Self(degrees)
    }

    pub fn from_arcsec(arcsec: f64) -> Self {
        Self(arcsec / ARCSEC_PER_DEGREE)
    }

    pub fn from_radians(radians: f64) -> Self {
        Self(radians.to_degrees())
    }

    pub fn degrees(self) -> f64 {
        self.0
    }

    pub fn arcsec(self) -> f64 {
        self.0 * ARCSEC_PER_DEGREE
    }

    pub fn radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Whether this angle can serve as a search radius
    ///
    /// Zero, negative and non-finite radii match nothing.
    pub fn is_usable_radius(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    /// Whether a separation lies within this radius (inclusive)
    pub fn contains(self, separation: Angle) -> bool {
        separation.0 <= self.0 * (1.0 + SEPARATION_RTOL)
    }

    /// Total order used when sorting by separation
    pub fn total_cmp(&self, other: &Angle) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Default for Angle {
    fn default() -> Self {
        Angle::from_arcsec(DEFAULT_RADIUS_ARCSEC)
    }
}

impl std::fmt::Display for Angle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\"", self.arcsec())
    }
}

/// A position on the celestial sphere, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    pub ra: f64,
    pub dec: f64,
}

impl SkyCoord {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    pub fn is_finite(&self) -> bool {
        self.ra.is_finite() && self.dec.is_finite()
    }

    /// Unit vector on the sphere
    pub fn to_unit_vector(&self) -> [f64; 3] {
        radec_to_xyz(self.ra, self.dec)
    }

    /// Great-circle distance to another position
    ///
    /// Symmetric bit for bit: the arguments are put in a canonical order
    /// before evaluating, so `a.separation(b) == b.separation(a)`.
    pub fn separation(&self, other: &SkyCoord) -> Angle {
        let swap = (self.ra, self.dec)
            .partial_cmp(&(other.ra, other.dec))
            .is_some_and(|o| o == Ordering::Greater);
        let (a, b) = if swap { (other, self) } else { (self, other) };
        vincenty(a, b)
    }

    /// Offset of `other` relative to this position, in arcsec
    ///
    /// Returns (ΔRA·cos(dec), ΔDec), with ΔRA wrapped into [-180°, 180°).
    pub fn offset_to(&self, other: &SkyCoord) -> (f64, f64) {
        let dra = (other.ra - self.ra + 180.0).rem_euclid(360.0) - 180.0;
        let dra = dra * self.dec.to_radians().cos() * ARCSEC_PER_DEGREE;
        let ddec = (other.dec - self.dec) * ARCSEC_PER_DEGREE;
        (dra, ddec)
    }
}

fn vincenty(a: &SkyCoord, b: &SkyCoord) -> Angle {
    let (lon1, lat1) = (a.ra.to_radians(), a.dec.to_radians());
    let (lon2, lat2) = (b.ra.to_radians(), b.dec.to_radians());
    let dlon = lon2 - lon1;

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_lat2, cos_lat2) = lat2.sin_cos();
    let (sin_dlon, cos_dlon) = dlon.sin_cos();

    let num1 = cos_lat2 * sin_dlon;
    let num2 = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon;
    let denominator = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;

    Angle::from_radians(num1.hypot(num2).atan2(denominator))
}

/// Convert RA/Dec in degrees to a unit vector
pub fn radec_to_xyz(ra: f64, dec: f64) -> [f64; 3] {
    let (sin_ra, cos_ra) = ra.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec.to_radians().sin_cos();
    [cos_dec * cos_ra, cos_dec * sin_ra, sin_dec]
}

/// Straight-line distance between two unit vectors separated by `angle`
pub fn chord_length(angle: Angle) -> f64 {
    let half = angle.radians().clamp(0.0, std::f64::consts::PI) / 2.0;
    2.0 * half.sin()
}

/// Read positions from two numeric columns of a catalogue
///
/// Rows with a missing or non-finite coordinate are kept (so indices line
/// up with rows) but never match anything downstream.
pub fn catalogue_coords(
    catalogue: &Catalogue,
    ra_col: &str,
    dec_col: &str,
) -> MasterlistResult<Vec<SkyCoord>> {
    let ra = catalogue.float_column(ra_col)?;
    let dec = catalogue.float_column(dec_col)?;

    let coords: Vec<SkyCoord> = ra
        .into_iter()
        .zip(dec)
        .map(|(ra, dec)| SkyCoord::new(ra, dec))
        .collect();

    let invalid = coords.iter().filter(|c| !c.is_finite()).count();
    if invalid > 0 {
        warn!(
            ra_col,
            dec_col,
            invalid,
            "rows without a finite position are excluded from matching"
        );
    }

    Ok(coords)
}
