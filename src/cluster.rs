// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! DBSCAN clustering and normal-based face detection.
//!
//! [`clusters`] groups a point cloud into dense regions using octree
//! neighbor queries. [`faces`] runs the same expansion, but a candidate
//! joins a region only when its plane normal agrees both with the normal
//! of the expansion point and with the running mean normal of the region,
//! which splits an object into its flat faces.

use crate::geometry::{self, compute_normals};
use crate::octree::{Kernel, Octree};
use crate::point::{Point, Vector};

/// Maximum distance between a point and a cluster member (meters).
pub const CLUSTER_POINT_PROXIMITY: f64 = 0.020;
/// Minimum neighborhood size for a cluster seed.
pub const MIN_CLUSTER_POINTS: usize = 20;
/// Neighborhood radius for per-point normal estimation (meters).
pub const NORMAL_CALC_POINT_PROXIMITY: f64 = 0.060;
/// Maximum distance between a point and a face member (meters).
pub const FACE_POINT_PROXIMITY: f64 = 0.030;
/// Minimum neighborhood size for a face seed.
pub const MIN_FACE_POINTS: usize = 20;
/// Maximum angle between a candidate normal and the expansion point's
/// normal (radians).
pub const MAX_NORMAL_VECT_ANGLE: f64 = 5.0 * geometry::RAD_PER_DEG;
/// Maximum angle between a candidate normal and the running mean normal
/// of the face (radians).
pub const MAX_MEAN_VECT_ANGLE: f64 = 45.0 * geometry::RAD_PER_DEG;

const UNCLASSIFIED: i32 = -1;
const NOISE: i32 = -2;

/// DBSCAN over the cloud. Returns clusters as vectors of point indices;
/// noise points belong to no cluster.
pub fn clusters(points: &[Point]) -> Vec<Vec<usize>> {
    let map = Octree::new(points);
    let mut labels = vec![UNCLASSIFIED; points.len()];
    let mut out = Vec::new();

    let mut id = 1;
    for i in 0..points.len() {
        if labels[i] != UNCLASSIFIED {
            continue;
        }
        if let Some(members) = expand_cluster(i, id, points, &map, &mut labels) {
            out.push(members);
            id += 1;
        }
    }

    out
}

/// Grow one cluster from a seed point. Returns `None` (marking the seed
/// as noise) when the seed neighborhood is too small.
fn expand_cluster(
    seed: usize,
    id: i32,
    points: &[Point],
    map: &Octree,
    labels: &mut [i32],
) -> Option<Vec<usize>> {
    let (_, candidates) = neighbors(seed, points, map, labels);
    if candidates.len() < MIN_CLUSTER_POINTS {
        labels[seed] = NOISE;
        return None;
    }

    let mut members = candidates.clone();
    for &i in &candidates {
        labels[i] = id;
    }

    // BFS with a cursor; the seed itself needs no re-expansion
    let mut queue: Vec<usize> = candidates.into_iter().filter(|&i| i != seed).collect();
    let mut qi = 0;
    while qi < queue.len() {
        let p = queue[qi];
        qi += 1;

        let (count, candidates) = neighbors(p, points, map, labels);
        if count < MIN_CLUSTER_POINTS {
            continue; // border point
        }
        for i in candidates {
            if labels[i] == UNCLASSIFIED {
                queue.push(i);
            }
            labels[i] = id;
            members.push(i);
        }
    }

    Some(members)
}

/// Total neighbor count within the cluster radius, plus the subset that is
/// still unlabeled (unclassified or noise).
fn neighbors(
    center: usize,
    points: &[Point],
    map: &Octree,
    labels: &[i32],
) -> (usize, Vec<usize>) {
    let found = map.search_neighbors(
        &points[center],
        CLUSTER_POINT_PROXIMITY,
        Kernel::Sphere,
        points,
    );
    let unlabeled = found.iter().copied().filter(|&i| labels[i] < 0).collect();
    (found.len(), unlabeled)
}

/// Detect the faces of an object: regions of points whose normals agree.
/// Points without a valid normal (fewer than 3 neighbors) never seed or
/// join a face.
pub fn faces(points: &[Point]) -> Vec<Vec<usize>> {
    let map = Octree::new(points);
    let normals = compute_normals(points, &map, NORMAL_CALC_POINT_PROXIMITY);

    let mut labels = vec![UNCLASSIFIED; points.len()];
    let mut out = Vec::new();

    let mut id = 1;
    for i in 0..points.len() {
        if labels[i] != UNCLASSIFIED || normals[i].is_zero() {
            continue;
        }
        if let Some(members) = expand_face(i, id, points, &normals, &map, &mut labels) {
            out.push(members);
            id += 1;
        }
    }

    out
}

fn expand_face(
    seed: usize,
    id: i32,
    points: &[Point],
    normals: &[Vector],
    map: &Octree,
    labels: &mut [i32],
) -> Option<Vec<usize>> {
    let (_, candidates) = normal_neighbors(seed, &normals[seed], points, normals, map, labels);
    if candidates.len() < MIN_FACE_POINTS {
        labels[seed] = NOISE;
        return None;
    }

    let mut members = candidates.clone();
    let mut face_normals: Vec<Vector> = candidates.iter().map(|&i| normals[i]).collect();
    for &i in &candidates {
        labels[i] = id;
    }

    let mut queue: Vec<usize> = candidates.into_iter().filter(|&i| i != seed).collect();
    let mut qi = 0;
    while qi < queue.len() {
        let p = queue[qi];
        qi += 1;

        // The mean normal drifts as the face grows, letting gently curved
        // surfaces stay in one face while sharp edges split it
        let mean_normal = geometry::mean(&face_normals);
        let (count, candidates) = normal_neighbors(p, &mean_normal, points, normals, map, labels);
        if count < MIN_FACE_POINTS {
            continue;
        }
        for i in candidates {
            if labels[i] == UNCLASSIFIED {
                queue.push(i);
            }
            labels[i] = id;
            face_normals.push(normals[i]);
            members.push(i);
        }
    }

    Some(members)
}

/// Neighbors within the face radius whose normals deviate at most
/// [`MAX_NORMAL_VECT_ANGLE`] from the expansion point's normal and
/// [`MAX_MEAN_VECT_ANGLE`] from the running mean normal.
fn normal_neighbors(
    center: usize,
    mean_normal: &Vector,
    points: &[Point],
    normals: &[Vector],
    map: &Octree,
    labels: &[i32],
) -> (usize, Vec<usize>) {
    let found = map.search_neighbors(&points[center], FACE_POINT_PROXIMITY, Kernel::Sphere, points);

    let mut matching = 0;
    let mut unlabeled = Vec::new();
    for i in found {
        if normals[i].is_zero() {
            continue;
        }
        if normals[center].angle_to(&normals[i]) <= MAX_NORMAL_VECT_ANGLE
            && mean_normal.angle_to(&normals[i]) <= MAX_MEAN_VECT_ANGLE
        {
            matching += 1;
            if labels[i] < 0 {
                unlabeled.push(i);
            }
        }
    }

    (matching, unlabeled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dense square patch of points spanning two directions.
    fn patch(origin: Point, du: Vector, dv: Vector, n: usize) -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(origin + du * i as f64 + dv * j as f64);
            }
        }
        points
    }

    #[test]
    fn test_two_clusters_and_noise() {
        let step = Vector::new(0.005, 0.0, 0.0);
        let rise = Vector::new(0.0, 0.005, 0.0);
        let mut points = patch(Point::zero(), step, rise, 8);
        points.extend(patch(Point::new(1.0, 0.0, 0.0), step, rise, 8));
        // Far-away stragglers are noise
        points.push(Point::new(5.0, 5.0, 5.0));
        points.push(Point::new(-5.0, 5.0, 5.0));

        let found = clusters(&points);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].len(), 64);
        assert_eq!(found[1].len(), 64);

        let clustered: usize = found.iter().map(|c| c.len()).sum();
        assert_eq!(clustered, points.len() - 2);
    }

    #[test]
    fn test_sparse_cloud_is_all_noise() {
        // Pairwise distances far above the cluster radius
        let points: Vec<Point> = (0..50)
            .map(|i| Point::new(i as f64, (i * 3) as f64, 0.0))
            .collect();
        assert!(clusters(&points).is_empty());
    }

    #[test]
    fn test_empty_cloud() {
        assert!(clusters(&[]).is_empty());
        assert!(faces(&[]).is_empty());
    }

    #[test]
    fn test_faces_of_differently_oriented_planes() {
        // A vertical patch (normal along x) and a 45°-tilted patch far
        // enough away that their neighborhoods never mix
        let step = 0.005;
        let mut points = patch(
            Point::zero(),
            Vector::new(0.0, step, 0.0),
            Vector::new(0.0, 0.0, step),
            20,
        );
        points.extend(patch(
            Point::new(1.0, 0.0, 0.0),
            Vector::new(step, 0.0, step),
            Vector::new(0.0, step, 0.0),
            20,
        ));

        let found = faces(&points);
        assert_eq!(found.len(), 2, "expected two faces, got {}", found.len());
        assert_eq!(found[0].len(), 400);
        assert_eq!(found[1].len(), 400);
    }

    #[test]
    fn test_single_plane_single_face() {
        // Patch in the yz plane: every normal is (1, 0, 0)
        let step = 0.005;
        let points = patch(
            Point::zero(),
            Vector::new(0.0, step, 0.0),
            Vector::new(0.0, 0.0, step),
            20,
        );
        let found = faces(&points);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), points.len());
    }
}
