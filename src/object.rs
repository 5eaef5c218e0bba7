// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Characterized objects: the output of the characterization pipeline.
//!
//! A [`CharacterizedObject`] is a canonical-posed point cloud with its
//! minimum-volume bounding box and the set of detected [`Face`]s. The
//! pipeline is: DBSCAN → keep the largest cluster → face detection →
//! minimum bounding box search (re-posing the cloud into the canonical
//! frame) → per-face minimum bounding boxes.

use crate::cluster;
use crate::geometry::{self, BBox};
use crate::point::{Point, Vector};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// One flat face of an object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Face {
    /// Indices into the object's point cloud.
    indices: Vec<usize>,
    /// Plane normal of the face (canonical frame).
    normal: Vector,
    /// Minimum-volume bounding box of the face, canonically oriented.
    bbox: BBox,
    /// Rotation angles (degrees) that produced the minimum box.
    rotation: Vector,
}

impl Face {
    pub fn new(indices: Vec<usize>, normal: Vector, bbox: BBox, rotation: Vector) -> Self {
        Self {
            indices,
            normal,
            bbox,
            rotation,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn normal(&self) -> Vector {
        self.normal
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn rotation(&self) -> Vector {
        self.rotation
    }
}

/// A scanned object reduced to its geometric signature.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CharacterizedObject {
    points: Vec<Point>,
    bbox: BBox,
    faces: Vec<Face>,
}

impl CharacterizedObject {
    /// Assemble an object from already-computed parts.
    pub fn from_parts(points: Vec<Point>, bbox: BBox, faces: Vec<Face>) -> Self {
        Self {
            points,
            bbox,
            faces,
        }
    }

    /// Characterize a filtered object point cloud.
    ///
    /// Returns `None` when no object can be extracted: an empty input, no
    /// dense cluster, or no detectable faces. With `chrono` set, prints a
    /// timing breakdown of the pipeline stages.
    pub fn characterize(points: Vec<Point>, chrono: bool) -> Option<Self> {
        if points.is_empty() {
            debug!("no points to characterize");
            return None;
        }

        let start = Instant::now();

        let clusters = cluster::clusters(&points);
        if clusters.is_empty() {
            debug!("no clusters detected");
            return None;
        }

        // The object is the biggest cluster; everything else is clutter
        let best = clusters
            .iter()
            .max_by_key(|c| c.len())
            .expect("clusters is non-empty");
        let mut opoints: Vec<Point> = best.iter().map(|&i| points[i]).collect();

        let end_clustering = Instant::now();

        let face_indices = cluster::faces(&opoints);
        if face_indices.is_empty() {
            debug!("no faces detected");
            return None;
        }

        let end_faces = Instant::now();

        // Re-pose the cloud into the canonical frame, then measure the
        // faces in that frame
        let (bbox, rotation) = geometry::minimum_bbox_rot_trans(&mut opoints);
        debug!("best bounding box rotation angles: {}", rotation);

        let face_boxes = geometry::minimum_bboxes(&opoints, &face_indices);
        let faces: Vec<Face> = face_indices
            .into_iter()
            .zip(face_boxes)
            .map(|(indices, (fbox, frot))| {
                let normal = geometry::compute_normal(&opoints, &indices);
                Face::new(indices, normal, fbox, frot)
            })
            .collect();

        let end = Instant::now();

        if chrono {
            let cl = end_clustering.duration_since(start).as_secs_f64();
            let fd = end_faces.duration_since(end_clustering).as_secs_f64();
            let bb = end.duration_since(end_faces).as_secs_f64();
            println!(
                "Object characterization lasted {:.6}s (clustering: {:.6}s, face detection: {:.6}s, bounding box selection: {:.6}s)",
                cl + fd + bb,
                cl,
                fd,
                bb
            );
        }

        debug!("characterized object with {} faces", faces.len());

        Some(Self {
            points: opoints,
            bbox,
            faces,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }
}
