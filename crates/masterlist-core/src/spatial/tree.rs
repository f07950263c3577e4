//! Bounding-volume tree over unit vectors
//!
//! Sky positions are indexed as points on the unit sphere, so an angular
//! radius becomes a chord length and every query is a Euclidean ball query.
//! The tree is bulk-loaded: the point set is split recursively at the median
//! of its widest axis until each leaf holds at most `leaf_size` entries.
//! Queries are O(log n + k) for well-spread catalogues.

use serde::{Deserialize, Serialize};

/// Configuration for tree construction
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Maximum entries per leaf (default: 16)
    pub leaf_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { leaf_size: 16 }
    }
}

/// A 3D axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Create an empty (invalid) bounding box
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    /// Check if the bounding box is empty/invalid
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Expand to include a point
    pub fn expand_to_include(&mut self, point: [f64; 3]) {
        for (i, &p) in point.iter().enumerate() {
            self.min[i] = self.min[i].min(p);
            self.max[i] = self.max[i].max(p);
        }
    }

    /// Axis with the largest extent
    fn widest_axis(&self) -> usize {
        (0..3)
            .max_by(|&a, &b| {
                (self.max[a] - self.min[a]).total_cmp(&(self.max[b] - self.min[b]))
            })
            .unwrap_or(0)
    }

    /// Squared distance from a point to the nearest point of the box
    pub fn distance_sq_to_point(&self, point: [f64; 3]) -> f64 {
        let mut dist_sq = 0.0;
        for (i, &p) in point.iter().enumerate() {
            if p < self.min[i] {
                dist_sq += (self.min[i] - p).powi(2);
            } else if p > self.max[i] {
                dist_sq += (p - self.max[i]).powi(2);
            }
        }
        dist_sq
    }
}

/// An entry in the tree (point with its row index)
#[derive(Clone, Copy, Debug)]
struct Entry {
    point: [f64; 3],
    index: usize,
}

/// A node in the tree
#[derive(Debug)]
enum Node {
    Leaf {
        bounds: BoundingBox,
        entries: Vec<Entry>,
    },
    Internal {
        bounds: BoundingBox,
        children: Vec<Node>,
    },
}

impl Node {
    fn bounds(&self) -> &BoundingBox {
        match self {
            Node::Leaf { bounds, .. } => bounds,
            Node::Internal { bounds, .. } => bounds,
        }
    }

    fn build(mut entries: Vec<Entry>, leaf_size: usize) -> Node {
        let mut bounds = BoundingBox::empty();
        for entry in &entries {
            bounds.expand_to_include(entry.point);
        }

        if entries.len() <= leaf_size {
            return Node::Leaf { bounds, entries };
        }

        let axis = bounds.widest_axis();
        let mid = entries.len() / 2;
        entries.select_nth_unstable_by(mid, |a, b| a.point[axis].total_cmp(&b.point[axis]));
        let upper = entries.split_off(mid);

        Node::Internal {
            bounds,
            children: vec![Node::build(entries, leaf_size), Node::build(upper, leaf_size)],
        }
    }
}

fn distance_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Spatial index over points on the unit sphere
#[derive(Debug)]
pub struct SkyTree {
    root: Option<Node>,
    size: usize,
}

impl SkyTree {
    /// Build a tree from `(point, index)` pairs
    pub fn build(points: impl IntoIterator<Item = ([f64; 3], usize)>) -> Self {
        Self::build_with_config(points, TreeConfig::default())
    }

    /// Build a tree with custom configuration
    pub fn build_with_config(
        points: impl IntoIterator<Item = ([f64; 3], usize)>,
        config: TreeConfig,
    ) -> Self {
        let entries: Vec<Entry> = points
            .into_iter()
            .map(|(point, index)| Entry { point, index })
            .collect();
        let size = entries.len();
        let root = (!entries.is_empty()).then(|| Node::build(entries, config.leaf_size.max(1)));
        Self { root, size }
    }

    /// Indices of points within `radius` (Euclidean, inclusive) of `center`
    pub fn query_sphere(&self, center: [f64; 3], radius: f64) -> Vec<usize> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            Self::query_sphere_recursive(root, center, radius * radius, &mut results);
        }
        results
    }

    fn query_sphere_recursive(
        node: &Node,
        center: [f64; 3],
        radius_sq: f64,
        results: &mut Vec<usize>,
    ) {
        if node.bounds().distance_sq_to_point(center) > radius_sq {
            return;
        }

        match node {
            Node::Leaf { entries, .. } => {
                for entry in entries {
                    if distance_sq(entry.point, center) <= radius_sq {
                        results.push(entry.index);
                    }
                }
            }
            Node::Internal { children, .. } => {
                for child in children {
                    Self::query_sphere_recursive(child, center, radius_sq, results);
                }
            }
        }
    }

    /// Nearest point to `query`, as `(index, squared distance)`
    ///
    /// Equidistant candidates resolve to the lowest index.
    pub fn nearest(&self, query: [f64; 3]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        if let Some(root) = &self.root {
            Self::nearest_recursive(root, query, &mut best);
        }
        best
    }

    fn nearest_recursive(node: &Node, query: [f64; 3], best: &mut Option<(usize, f64)>) {
        let bound = node.bounds().distance_sq_to_point(query);
        if best.is_some_and(|(_, d)| bound > d) {
            return;
        }

        match node {
            Node::Leaf { entries, .. } => {
                for entry in entries {
                    let d = distance_sq(entry.point, query);
                    let better = match *best {
                        None => true,
                        Some((index, best_d)) => d < best_d || (d == best_d && entry.index < index),
                    };
                    if better {
                        *best = Some((entry.index, d));
                    }
                }
            }
            Node::Internal { children, .. } => {
                // Visit the closer child first for better pruning
                let mut order: Vec<(&Node, f64)> = children
                    .iter()
                    .map(|c| (c, c.bounds().distance_sq_to_point(query)))
                    .collect();
                order.sort_by(|a, b| a.1.total_cmp(&b.1));

                for (child, _) in order {
                    Self::nearest_recursive(child, query, best);
                }
            }
        }
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bounding box of all points
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.root.as_ref().map(|r| *r.bounds())
    }
}
