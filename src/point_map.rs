// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Deduplicating point accumulator for one capture window.
//!
//! Scanners deliver the same coordinates repeatedly when the scene holds
//! still; [`PointMap`] keeps the first occurrence of each coordinate
//! triple, remembers the capture start timestamp, and can index its
//! points in an [`Octree`] once the capture ends.

use crate::octree::{Kernel, Octree};
use crate::point::{LidarPoint, Point, Timestamp};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct PointMap {
    start_time: Option<Timestamp>,
    keys: HashSet<[u64; 3]>,
    points: Vec<Point>,
    map: Option<Octree>,
}

impl PointMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scanned point, dropping exact coordinate duplicates.
    /// Returns whether the point was new.
    pub fn insert(&mut self, p: &LidarPoint) -> bool {
        let key = [
            p.point.x.to_bits(),
            p.point.y.to_bits(),
            p.point.z.to_bits(),
        ];
        if self.keys.insert(key) {
            self.points.push(p.point);
            true
        } else {
            false
        }
    }

    /// Build the octree over the collected points. Call once the capture
    /// window has ended; neighbor queries need it.
    pub fn build_octree(&mut self) {
        self.map = Some(Octree::new(&self.points));
    }

    /// Whether any collected point lies within `radius` of `p`.
    /// Always false before [`PointMap::build_octree`].
    pub fn has_neighbor(&self, p: &Point, radius: f64) -> bool {
        match &self.map {
            Some(map) => !map
                .search_neighbors(p, radius, Kernel::Sphere, &self.points)
                .is_empty(),
            None => false,
        }
    }

    pub fn set_start_time(&mut self, t: Timestamp) {
        self.start_time = Some(t);
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lp(x: f64, y: f64, z: f64) -> LidarPoint {
        LidarPoint::new(Timestamp::from_nanos(0), 100, x, y, z)
    }

    #[test]
    fn test_insert_dedups() {
        let mut map = PointMap::new();
        assert!(map.insert(&lp(1.0, 2.0, 3.0)));
        assert!(!map.insert(&lp(1.0, 2.0, 3.0)));
        assert!(map.insert(&lp(1.0, 2.0, 3.1)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_has_neighbor_requires_octree() {
        let mut map = PointMap::new();
        map.insert(&lp(0.0, 0.0, 0.0));

        let p = Point::new(0.01, 0.0, 0.0);
        assert!(!map.has_neighbor(&p, 0.1));

        map.build_octree();
        assert!(map.has_neighbor(&p, 0.1));
        assert!(!map.has_neighbor(&Point::new(1.0, 0.0, 0.0), 0.1));
    }

    #[test]
    fn test_start_time() {
        let mut map = PointMap::new();
        assert!(map.start_time().is_none());
        map.set_start_time(Timestamp::from_nanos(42));
        assert_eq!(map.start_time(), Some(Timestamp::from_nanos(42)));
    }
}
