// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Octree spatial index for radius neighbor queries.
//!
//! Points are binned into a cubic octree whose leaves hold at most
//! [`MAX_LEAF_POINTS`] indices. Queries walk only the octants whose cells
//! overlap the search kernel's bounding cube, then filter candidates with
//! the exact kernel test. The tree stores indices into the caller's point
//! slice; the same slice must be passed back to [`Octree::search_neighbors`].

use crate::point::Point;

/// Leaves are split once they exceed this many points.
const MAX_LEAF_POINTS: usize = 100;

/// Octants smaller than this are never split further, regardless of
/// occupancy. Guards against infinite subdivision of duplicate points.
const MIN_OCTANT_RADIUS: f64 = 1e-6;

/// Neighborhood membership test used by [`Octree::search_neighbors`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    /// Points within euclidean distance `radius` of the center.
    Sphere,
    /// Points within the axis-aligned cube of half-edge `radius`.
    Cube,
}

impl Kernel {
    fn is_inside(&self, center: &Point, radius: f64, p: &Point) -> bool {
        match self {
            Kernel::Sphere => center.distance_sq(p) <= radius * radius,
            Kernel::Cube => {
                (p.x - center.x).abs() <= radius
                    && (p.y - center.y).abs() <= radius
                    && (p.z - center.z).abs() <= radius
            }
        }
    }
}

/// Cubic octree over point indices.
#[derive(Debug, Default)]
pub struct Octree {
    center: Point,
    radius: f64,
    octants: Vec<Octree>,
    indices: Vec<u32>,
}

impl Octree {
    /// Build an octree over the given points.
    ///
    /// An empty slice yields an empty tree for which every query returns
    /// no neighbors.
    pub fn new(points: &[Point]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let (center, radius) = bounding_cube(points);
        let mut root = Octree {
            center,
            radius,
            octants: Vec::new(),
            indices: Vec::new(),
        };
        let indices: Vec<u32> = (0..points.len() as u32).collect();
        root.fill(points, indices);
        root
    }

    pub fn is_empty(&self) -> bool {
        self.octants.is_empty() && self.indices.is_empty()
    }

    fn is_leaf(&self) -> bool {
        self.octants.is_empty()
    }

    /// Place indices into this node, subdividing when over capacity.
    fn fill(&mut self, points: &[Point], indices: Vec<u32>) {
        if indices.len() <= MAX_LEAF_POINTS || self.radius <= MIN_OCTANT_RADIUS {
            self.indices = indices;
            return;
        }

        // Partition indices into the 8 octants around the center
        let mut buckets: [Vec<u32>; 8] = Default::default();
        for i in indices {
            buckets[self.octant_idx(&points[i as usize])].push(i);
        }

        let center = self.center;
        let half = self.radius / 2.0;
        self.octants = buckets
            .into_iter()
            .enumerate()
            .map(|(o, bucket)| {
                let offset = Point::new(
                    if o & 1 != 0 { half } else { -half },
                    if o & 2 != 0 { half } else { -half },
                    if o & 4 != 0 { half } else { -half },
                );
                let mut child = Octree {
                    center: center + offset,
                    radius: half,
                    octants: Vec::new(),
                    indices: Vec::new(),
                };
                child.fill(points, bucket);
                child
            })
            .collect();
    }

    fn octant_idx(&self, p: &Point) -> usize {
        (p.x > self.center.x) as usize
            | ((p.y > self.center.y) as usize) << 1
            | ((p.z > self.center.z) as usize) << 2
    }

    /// Does this octant's cell overlap the cube [center ± radius]?
    fn overlaps(&self, center: &Point, radius: f64) -> bool {
        let reach = self.radius + radius;
        (self.center.x - center.x).abs() <= reach
            && (self.center.y - center.y).abs() <= reach
            && (self.center.z - center.z).abs() <= reach
    }

    /// Indices of all points within `radius` of `center` under the given
    /// kernel. The query point itself is included when present in the tree.
    pub fn search_neighbors(
        &self,
        center: &Point,
        radius: f64,
        kernel: Kernel,
        points: &[Point],
    ) -> Vec<usize> {
        let mut found = Vec::new();
        self.collect_neighbors(center, radius, kernel, points, &mut found);
        found
    }

    fn collect_neighbors(
        &self,
        center: &Point,
        radius: f64,
        kernel: Kernel,
        points: &[Point],
        found: &mut Vec<usize>,
    ) {
        if self.is_empty() || !self.overlaps(center, radius) {
            return;
        }

        if self.is_leaf() {
            for &i in &self.indices {
                if kernel.is_inside(center, radius, &points[i as usize]) {
                    found.push(i as usize);
                }
            }
        } else {
            for octant in &self.octants {
                octant.collect_neighbors(center, radius, kernel, points, found);
            }
        }
    }
}

/// Minimum cube enclosing all points: (center, half-edge).
fn bounding_cube(points: &[Point]) -> (Point, f64) {
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }

    let delta = max - min;
    let radius = (delta.x.max(delta.y).max(delta.z) / 2.0).max(MIN_OCTANT_RADIUS);
    (min + delta / 2.0, radius)
}
