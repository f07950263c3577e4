//! Spatial indexing for sky positions
//!
//! Provides a bounding-volume tree over unit vectors and the pair-finding
//! oracle built on it:
//! - All pairs within an angular radius
//! - Nearest neighbour across two position sets

pub mod finder;
pub mod tree;

pub use finder::{BruteForcePairFinder, MatchPair, NearestMatch, PairFinder, TreePairFinder};
pub use tree::{BoundingBox, SkyTree, TreeConfig};
