// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Geometric primitives for object characterization.
//!
//! Plane normals come from the smallest eigenvector of the neighborhood
//! covariance (analytic 3×3 symmetric eigendecomposition, Smith 1961 /
//! Kopp 2008). Minimum-volume bounding boxes come from an exhaustive
//! rotation search: a coarse 6° grid over [0°,90°)³ followed by a ±5°
//! fine pass around the best coarse rotation, then a canonical axis
//! ordering so that length ≥ width ≥ height.

use crate::octree::{Kernel, Octree};
use crate::point::{Point, Vector};
use serde::{Deserialize, Serialize};

pub const RAD_PER_DEG: f64 = std::f64::consts::PI / 180.0;

/// 3×3 rotation matrix, row major.
pub type Matrix3 = [[f64; 3]; 3];

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    min: Point,
    max: Point,
}

impl BBox {
    /// Bounding box of a point set. Empty input yields the default
    /// zero-extent box.
    pub fn from_points(points: &[Point]) -> Self {
        Self::enclose(points.iter().copied())
    }

    /// Bounding box of a point set after applying a rotation.
    pub fn from_rotated(points: &[Point], rot: &Matrix3) -> Self {
        Self::enclose(points.iter().map(|p| rotate(p, rot)))
    }

    /// Bounding box of an index subset, optionally rotated.
    pub fn from_indexed(points: &[Point], indices: &[usize], rot: Option<&Matrix3>) -> Self {
        match rot {
            Some(m) => Self::enclose(indices.iter().map(|&i| rotate(&points[i], m))),
            None => Self::enclose(indices.iter().map(|&i| points[i])),
        }
    }

    /// Box of the given extent centered on the origin.
    pub fn centered(extent: Vector) -> Self {
        let half = extent / 2.0;
        Self {
            min: Point::zero() - half,
            max: half,
        }
    }

    fn enclose(points: impl Iterator<Item = Point>) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut any = false;
        for p in points {
            any = true;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        if !any {
            return Self::default();
        }
        Self { min, max }
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    /// Edge lengths along each axis.
    pub fn delta(&self) -> Vector {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let d = self.delta();
        d.x * d.y * d.z
    }
}

/// Geometric center of a point set.
pub fn centroid(points: &[Point]) -> Point {
    let mut sum = Point::zero();
    for p in points {
        sum = sum + *p;
    }
    sum / points.len() as f64
}

/// Mean of a set of vectors.
pub fn mean(vectors: &[Vector]) -> Vector {
    centroid(vectors)
}

/// Apply a rotation matrix to a point.
pub fn rotate(p: &Point, m: &Matrix3) -> Point {
    Point::new(
        m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z,
        m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z,
        m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z,
    )
}

/// Rotation matrix from per-axis angles in degrees (Rz·Ry·Rx).
pub fn rotation_matrix(deg: Vector) -> Matrix3 {
    let gamma = deg.x * RAD_PER_DEG;
    let beta = deg.y * RAD_PER_DEG;
    let alpha = deg.z * RAD_PER_DEG;
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let (sg, cg) = gamma.sin_cos();
    [
        [ca * cb, ca * sb * sg - sa * cg, ca * sb * cg + sa * sg],
        [sa * cb, sa * sb * sg + ca * cg, sa * sb * cg - ca * sg],
        [-sb, cb * sg, cb * cg],
    ]
}

/// Plane normal of a point subset: the eigenvector of the covariance
/// matrix with the smallest eigenvalue, flipped so its x component is
/// non-negative.
pub fn compute_normal(points: &[Point], indices: &[usize]) -> Vector {
    let k = indices.len();
    let inv_k = 1.0 / k as f64;

    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut cz = 0.0;
    for &i in indices {
        cx += points[i].x;
        cy += points[i].y;
        cz += points[i].z;
    }
    cx *= inv_k;
    cy *= inv_k;
    cz *= inv_k;

    let mut cov = [0.0f64; 6];
    for &i in indices {
        let dx = points[i].x - cx;
        let dy = points[i].y - cy;
        let dz = points[i].z - cz;
        cov[0] += dx * dx;
        cov[1] += dx * dy;
        cov[2] += dx * dz;
        cov[3] += dy * dy;
        cov[4] += dy * dz;
        cov[5] += dz * dz;
    }
    for c in cov.iter_mut() {
        *c *= inv_k;
    }

    let (eigenvalues, eigenvectors) = sym3x3_eigen(cov);
    let v = eigenvectors[smallest_eigenvalue_index(eigenvalues)];
    let normal = Vector::new(v[0], v[1], v[2]);
    if normal.x < 0.0 {
        normal * -1.0
    } else {
        normal
    }
}

/// Per-point normals over a cloud.
///
/// A point needs at least 3 neighbors within `radius` for a plane fit;
/// points without one keep the zero vector, which downstream face
/// detection treats as "no normal".
pub fn compute_normals(points: &[Point], map: &Octree, radius: f64) -> Vec<Vector> {
    let mut normals = vec![Vector::zero(); points.len()];
    for (i, normal) in normals.iter_mut().enumerate() {
        let neighbors = map.search_neighbors(&points[i], radius, Kernel::Sphere, points);
        if neighbors.len() > 2 {
            *normal = compute_normal(points, &neighbors);
        }
    }
    normals
}

const COARSE_STEP: usize = 6;
const FINE_SPAN: i32 = 5;

/// Search the rotation (degrees per axis) minimizing the volume of the
/// rotated bounding box of `select`-ed points.
fn search_min_rotation<F>(initial: BBox, select: F) -> (BBox, Vector)
where
    F: Fn(&Matrix3) -> BBox,
{
    let mut best = initial;
    let mut best_rot = Vector::zero();

    // Coarse pass over [0,90)³; the unrotated box is the starting best
    for i in (0..90).step_by(COARSE_STEP) {
        for j in (0..90).step_by(COARSE_STEP) {
            for k in (0..90).step_by(COARSE_STEP) {
                if i == 0 && j == 0 && k == 0 {
                    continue;
                }
                let rot = Vector::new(i as f64, j as f64, k as f64);
                let bb = select(&rotation_matrix(rot));
                if bb.volume() < best.volume() {
                    best = bb;
                    best_rot = rot;
                }
            }
        }
    }

    // Fine pass around the best coarse rotation
    let (ci, cj, ck) = (best_rot.x as i32, best_rot.y as i32, best_rot.z as i32);
    for i in ci - FINE_SPAN..=ci + FINE_SPAN {
        for j in cj - FINE_SPAN..=cj + FINE_SPAN {
            for k in ck - FINE_SPAN..=ck + FINE_SPAN {
                if i == ci && j == cj && k == ck {
                    continue;
                }
                let rot = Vector::new(i as f64, j as f64, k as f64);
                let bb = select(&rotation_matrix(rot));
                if bb.volume() < best.volume() {
                    best = bb;
                    best_rot = rot;
                }
            }
        }
    }

    (best, best_rot)
}

/// Minimum-volume bounding box of the whole cloud, re-posing the points
/// into the canonical frame: rotated to the minimum-volume orientation,
/// translated so the box center sits at the origin, then rotated to the
/// canonical axis order.
///
/// Returns the centered box and the rotation angles (degrees) that
/// produced the minimum.
pub fn minimum_bbox_rot_trans(points: &mut [Point]) -> (BBox, Vector) {
    let (bbmin, rotmin) = search_min_rotation(BBox::from_points(points), |m| {
        BBox::from_rotated(points, m)
    });

    let rotmatrix = rotation_matrix(rotmin);
    let trans = Point::zero() - (bbmin.delta() / 2.0 + bbmin.min());

    let (oriented, orirot) = best_orientation(&bbmin);
    let orirotmatrix = rotation_matrix(orirot);

    for p in points.iter_mut() {
        *p = rotate(&(rotate(p, &rotmatrix) + trans), &orirotmatrix);
    }

    (BBox::centered(oriented.delta()), rotmin)
}

/// Minimum-volume bounding box of each index subset (face), without
/// touching the points. Returns the canonically-oriented box and the total
/// rotation angles for each subset.
pub fn minimum_bboxes(points: &[Point], faces: &[Vec<usize>]) -> Vec<(BBox, Vector)> {
    faces
        .iter()
        .map(|indices| {
            let (bbmin, rotmin) =
                search_min_rotation(BBox::from_indexed(points, indices, None), |m| {
                    BBox::from_indexed(points, indices, Some(m))
                });
            let (oriented, orirot) = best_orientation(&bbmin);
            (BBox::centered(oriented.delta()), rotmin + orirot)
        })
        .collect()
}

/// Pick the axis permutation of a box so dimensions are ordered
/// length ≥ width ≥ height, returning the permuted box and the rotation
/// (degrees) realizing it.
pub fn best_orientation(bbox: &BBox) -> (BBox, Vector) {
    let bd = bbox.delta();
    let deltas = [
        bd,
        Vector::new(bd.x, bd.z, bd.y),
        Vector::new(bd.y, bd.x, bd.z),
        Vector::new(bd.y, bd.z, bd.x),
        Vector::new(bd.z, bd.x, bd.y),
        Vector::new(bd.z, bd.y, bd.x),
    ];
    const ROTATIONS: [Vector; 6] = [
        Vector::new(0.0, 0.0, 0.0),
        Vector::new(90.0, 0.0, 0.0),
        Vector::new(0.0, 0.0, 90.0),
        Vector::new(90.0, 0.0, 90.0),
        Vector::new(0.0, 90.0, 90.0),
        Vector::new(0.0, 90.0, 0.0),
    ];

    let mut best = 0;
    for i in 1..6 {
        if better_dimensions(&deltas[i], &deltas[best]) {
            best = i;
        }
    }
    (BBox::centered(deltas[best]), ROTATIONS[best])
}

/// Dimension ordering with millimeter resolution: larger x first, then
/// larger y, then larger z.
fn better_dimensions(new: &Vector, old: &Vector) -> bool {
    let x = ((old.x - new.x) * 1000.0) as i64;
    let y = ((old.y - new.y) * 1000.0) as i64;
    let z = ((old.z - new.z) * 1000.0) as i64;
    x > 0 || (x == 0 && (y > 0 || (y == 0 && z > 0)))
}

fn smallest_eigenvalue_index(eigenvalues: [f64; 3]) -> usize {
    if eigenvalues[0] <= eigenvalues[1] && eigenvalues[0] <= eigenvalues[2] {
        0
    } else if eigenvalues[1] <= eigenvalues[2] {
        1
    } else {
        2
    }
}

/// Eigendecomposition of a 3×3 symmetric matrix
/// [a11, a12, a13, a22, a23, a33].
fn sym3x3_eigen(cov: [f64; 6]) -> ([f64; 3], [[f64; 3]; 3]) {
    let [a11, a12, a13, a22, a23, a33] = cov;

    let q = (a11 + a22 + a33) / 3.0;
    let p1 = a12 * a12 + a13 * a13 + a23 * a23;

    let eigenvalues = if p1 < 1e-30 {
        let mut evs = [a11, a22, a33];
        evs.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        evs
    } else {
        let p2 = (a11 - q) * (a11 - q) + (a22 - q) * (a22 - q) + (a33 - q) * (a33 - q) + 2.0 * p1;
        let p = (p2 / 6.0).sqrt();
        let inv_p = 1.0 / p;

        let b11 = (a11 - q) * inv_p;
        let b12 = a12 * inv_p;
        let b13 = a13 * inv_p;
        let b22 = (a22 - q) * inv_p;
        let b23 = a23 * inv_p;
        let b33 = (a33 - q) * inv_p;

        let half_det = (b11 * b22 * b33 + 2.0 * b12 * b13 * b23
            - b11 * b23 * b23
            - b22 * b13 * b13
            - b33 * b12 * b12)
            / 2.0;

        let phi = half_det.clamp(-1.0, 1.0).acos() / 3.0;

        let e1 = q + 2.0 * p * phi.cos();
        let e3 = q + 2.0 * p * (phi + std::f64::consts::TAU / 3.0).cos();
        let e2 = 3.0 * q - e1 - e3;
        [e1, e2, e3]
    };

    let mat = [a11, a12, a13, a22, a23, a33];
    let eigenvectors = [
        eigenvector_for(mat, eigenvalues[0]),
        eigenvector_for(mat, eigenvalues[1]),
        eigenvector_for(mat, eigenvalues[2]),
    ];

    (eigenvalues, eigenvectors)
}

/// Eigenvector of a 3×3 symmetric matrix for a given eigenvalue, from the
/// largest cross product of rows of (A - λI).
fn eigenvector_for(mat: [f64; 6], lambda: f64) -> [f64; 3] {
    let m00 = mat[0] - lambda;
    let m01 = mat[1];
    let m02 = mat[2];
    let m11 = mat[3] - lambda;
    let m12 = mat[4];
    let m22 = mat[5] - lambda;

    let v0x = m01 * m12 - m02 * m11;
    let v0y = m02 * m01 - m00 * m12;
    let v0z = m00 * m11 - m01 * m01;

    let v1x = m01 * m22 - m02 * m12;
    let v1y = m02 * m02 - m00 * m22;
    let v1z = m00 * m12 - m01 * m02;

    let v2x = m11 * m22 - m12 * m12;
    let v2y = m12 * m02 - m01 * m22;
    let v2z = m01 * m12 - m11 * m02;

    let mag0 = v0x * v0x + v0y * v0y + v0z * v0z;
    let mag1 = v1x * v1x + v1y * v1y + v1z * v1z;
    let mag2 = v2x * v2x + v2y * v2y + v2z * v2z;

    let (vx, vy, vz, mag) = if mag0 >= mag1 && mag0 >= mag2 {
        (v0x, v0y, v0z, mag0)
    } else if mag1 >= mag2 {
        (v1x, v1y, v1z, mag1)
    } else {
        (v2x, v2y, v2z, mag2)
    };

    if mag < 1e-30 {
        return [0.0, 0.0, 1.0];
    }

    let inv = 1.0 / mag.sqrt();
    [vx * inv, vy * inv, vz * inv]
}
