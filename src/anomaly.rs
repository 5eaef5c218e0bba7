// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Anomaly detection: geometric comparison of an object against a model.
//!
//! The comparison is dimension based. The overall bounding boxes are
//! compared side by side, then faces are greedily paired by the smallest
//! bounding box volume difference and each pair is compared the same way.
//! Any dimension differing by more than [`MAX_DIMENSION_DELTA`] is an
//! anomaly, as is every face left unmatched by a count mismatch.

use crate::manager::Model;
use crate::object::CharacterizedObject;
use crate::point::Vector;
use std::fmt;
use std::time::Instant;

/// Maximum per-dimension difference (meters) for two bounding boxes to be
/// considered similar.
pub const MAX_DIMENSION_DELTA: f64 = 0.040;

/// Side-by-side bounding box comparison: per-dimension deltas
/// (model minus object) and the similarity verdict.
#[derive(Clone, Copy, Debug)]
pub struct Comparison {
    pub similar: bool,
    pub deltas: Vector,
}

impl Comparison {
    fn of(deltas: Vector) -> Self {
        Self {
            similar: deltas.x.abs() <= MAX_DIMENSION_DELTA
                && deltas.y.abs() <= MAX_DIMENSION_DELTA
                && deltas.z.abs() <= MAX_DIMENSION_DELTA,
            deltas,
        }
    }
}

/// Comparison of one matched face pair.
#[derive(Clone, Copy, Debug)]
pub struct FaceComparison {
    pub similar: bool,
    pub model_face: usize,
    pub object_face: usize,
    pub deltas: Vector,
}

/// Full result of an object/model comparison.
#[derive(Clone, Debug)]
pub struct AnomalyReport {
    /// Overall verdict: face counts match and every comparison passed.
    pub similar: bool,
    /// Overall bounding box comparison.
    pub general: Comparison,
    /// Model face count minus object face count.
    pub delta_faces: i64,
    /// Count of failed comparisons plus unmatched faces.
    pub total_anomalies: u64,
    /// Per-pair face comparisons, in pairing order.
    pub face_comparisons: Vec<FaceComparison>,
    /// Indices of the faces (of whichever side has more) left unpaired.
    pub unmatched: Vec<usize>,
}

/// Compares characterized objects against models.
#[derive(Debug, Default)]
pub struct AnomalyDetector {
    chrono: bool,
}

impl AnomalyDetector {
    pub fn new(chrono: bool) -> Self {
        Self { chrono }
    }

    pub fn set_chrono(&mut self, chrono: bool) {
        self.chrono = chrono;
    }

    pub fn is_chrono(&self) -> bool {
        self.chrono
    }

    /// Compare an object against a model.
    pub fn compare(&self, obj: &CharacterizedObject, model: &Model) -> AnomalyReport {
        let start = Instant::now();

        let obj_faces = obj.faces();
        let mod_faces = model.object().faces();

        let mut similar = !obj_faces.is_empty() && obj_faces.len() == mod_faces.len();
        let delta_faces = mod_faces.len() as i64 - obj_faces.len() as i64;
        let mut total_anomalies = delta_faces.unsigned_abs();

        let general = Comparison::of(model.object().bbox().delta() - obj.bbox().delta());
        similar = similar && general.similar;
        if !general.similar {
            total_anomalies += 1;
        }

        // Pair faces greedily by the smallest bounding box volume delta
        let mut delta_volumes = vec![vec![0.0f64; mod_faces.len()]; obj_faces.len()];
        for (i, of) in obj_faces.iter().enumerate() {
            for (j, mf) in mod_faces.iter().enumerate() {
                delta_volumes[i][j] = (mf.bbox().volume() - of.bbox().volume()).abs();
            }
        }

        let mut obj_used = vec![false; obj_faces.len()];
        let mut mod_used = vec![false; mod_faces.len()];
        let pairs = obj_faces.len().min(mod_faces.len());

        let mut face_comparisons = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            let mut best: Option<(usize, usize)> = None;
            for oi in 0..obj_faces.len() {
                if obj_used[oi] {
                    continue;
                }
                for mi in 0..mod_faces.len() {
                    if mod_used[mi] {
                        continue;
                    }
                    match best {
                        Some((bo, bm)) if delta_volumes[oi][mi] >= delta_volumes[bo][bm] => {}
                        _ => best = Some((oi, mi)),
                    }
                }
            }
            let (oi, mi) = match best {
                Some(pair) => pair,
                None => break,
            };
            obj_used[oi] = true;
            mod_used[mi] = true;

            let deltas = mod_faces[mi].bbox().delta() - obj_faces[oi].bbox().delta();
            let comparison = Comparison::of(deltas);
            similar = similar && comparison.similar;
            if !comparison.similar {
                total_anomalies += 1;
            }
            face_comparisons.push(FaceComparison {
                similar: comparison.similar,
                model_face: mi,
                object_face: oi,
                deltas,
            });
        }

        // Faces left over on the bigger side are anomalies by absence
        let leftover = if delta_faces < 0 { &obj_used } else { &mod_used };
        let unmatched: Vec<usize> = leftover
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(i, _)| i)
            .collect();

        if self.chrono {
            println!(
                "Anomaly detection lasted {:.6} s",
                start.elapsed().as_secs_f64()
            );
        }

        AnomalyReport {
            similar,
            general,
            delta_faces,
            total_anomalies,
            face_comparisons,
            unmatched,
        }
    }
}

impl fmt::Display for AnomalyReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.similar {
            writeln!(f, "Result: object matches the model")?;
        } else {
            writeln!(
                f,
                "Result: {} anomal{} detected",
                self.total_anomalies,
                if self.total_anomalies == 1 { "y" } else { "ies" }
            )?;
        }

        writeln!(
            f,
            "Bounding box delta: [{:.3}, {:.3}, {:.3}] m ({})",
            self.general.deltas.x,
            self.general.deltas.y,
            self.general.deltas.z,
            verdict(self.general.similar)
        )?;
        writeln!(f, "Face count delta (model - object): {}", self.delta_faces)?;

        for fc in &self.face_comparisons {
            writeln!(
                f,
                "Face pairing: model {} <-> object {}: delta [{:.3}, {:.3}, {:.3}] m ({})",
                fc.model_face,
                fc.object_face,
                fc.deltas.x,
                fc.deltas.y,
                fc.deltas.z,
                verdict(fc.similar)
            )?;
        }

        if !self.unmatched.is_empty() {
            let side = if self.delta_faces < 0 {
                "object"
            } else {
                "model"
            };
            let list: Vec<String> = self.unmatched.iter().map(|i| i.to_string()).collect();
            writeln!(f, "Unmatched {} faces: {}", side, list.join(", "))?;
        }

        Ok(())
    }
}

fn verdict(similar: bool) -> &'static str {
    if similar {
        "ok"
    } else {
        "anomaly"
    }
}
