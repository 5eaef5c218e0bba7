// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Object characterizer: turns scanner streams into characterized objects.
//!
//! The characterizer drives its scanner through time-framed capture
//! sessions. A *background* session collects every point seen during the
//! background window and indexes it in an octree. An *object* session
//! collects a (shorter) window, subtracts points lying within the
//! background distance of any background point, and hands the survivors
//! to the characterization pipeline. A *discard* session simply swallows
//! points for a while, which lets the operator walk out of the scene.
//!
//! Points below the reflectivity threshold never enter any session.

use crate::object::CharacterizedObject;
use crate::point::Timestamp;
use crate::point_map::PointMap;
use crate::scanner::{Error, PointScanner, ScanFlow, ScanOutcome};
use std::time::Instant;
use tracing::debug;

const NANOS_PER_MS: u64 = 1_000_000;

/// Scanner-driven object characterizer.
pub struct ObjectCharacterizer {
    scanner: Box<dyn PointScanner>,
    background: PointMap,
    obj_frame_ns: u64,
    back_frame_ns: u64,
    back_distance: f64,
    min_reflectivity: f64,
    chrono: bool,
}

impl ObjectCharacterizer {
    /// Create a characterizer around a scanner.
    ///
    /// * `obj_frame_ms` — object capture window
    /// * `back_frame_ms` — background capture window
    /// * `min_reflectivity` — points below this are discarded outright
    /// * `back_distance` — meters a point must keep from every background
    ///   point to count as part of an object
    pub fn new(
        scanner: Box<dyn PointScanner>,
        obj_frame_ms: u64,
        back_frame_ms: u64,
        min_reflectivity: f64,
        back_distance: f64,
    ) -> Self {
        Self {
            scanner,
            background: PointMap::new(),
            obj_frame_ns: obj_frame_ms * NANOS_PER_MS,
            back_frame_ns: back_frame_ms * NANOS_PER_MS,
            back_distance,
            min_reflectivity,
            chrono: false,
        }
    }

    /// Scan the background window and index it for subtraction.
    pub fn define_background(&mut self) -> Result<(), Error> {
        self.background = PointMap::new();

        let min_reflectivity = self.min_reflectivity;
        let back_frame = self.back_frame_ns;
        let background = &mut self.background;
        let mut scan_timer: Option<Instant> = None;

        let outcome = self.scanner.scan(&mut |p| {
            if (p.reflectivity as f64) < min_reflectivity {
                return ScanFlow::Continue;
            }
            let start = match background.start_time() {
                Some(start) => start,
                None => {
                    debug!("first background point timestamp: {}", p.timestamp);
                    scan_timer = Some(Instant::now());
                    background.set_start_time(p.timestamp);
                    p.timestamp
                }
            };
            if start + back_frame > p.timestamp {
                background.insert(p);
                ScanFlow::Continue
            } else {
                debug!("first out-of-frame point timestamp: {}", p.timestamp);
                ScanFlow::Pause
            }
        });
        let scan_elapsed = scan_timer.map(|t| t.elapsed());
        report_outcome(outcome)?;

        let build_timer = Instant::now();
        self.background.build_octree();

        if self.chrono {
            let scanning = scan_elapsed.unwrap_or_default().as_secs_f64();
            let building = build_timer.elapsed().as_secs_f64();
            println!(
                "Background scanning lasted {:.6}s (scanning: {:.6}s, map generation: {:.6}s)",
                scanning + building,
                scanning,
                building
            );
        }
        println!(
            "Scanned background contains {} unique points",
            self.background.len()
        );

        Ok(())
    }

    /// Scan the object window, subtract the background and characterize
    /// what remains. `Ok(None)` means the frame held no usable object.
    pub fn define_object(&mut self) -> Result<Option<CharacterizedObject>, Error> {
        let mut object = PointMap::new();
        let mut scanned = 0usize;

        let min_reflectivity = self.min_reflectivity;
        let obj_frame = self.obj_frame_ns;

        let outcome = self.scanner.scan(&mut |p| {
            if (p.reflectivity as f64) < min_reflectivity {
                return ScanFlow::Continue;
            }
            let start = match object.start_time() {
                Some(start) => start,
                None => {
                    debug!("first object point timestamp: {}", p.timestamp);
                    object.set_start_time(p.timestamp);
                    p.timestamp
                }
            };
            if start + obj_frame > p.timestamp {
                scanned += 1;
                object.insert(p);
                ScanFlow::Continue
            } else {
                debug!("first out-of-frame point timestamp: {}", p.timestamp);
                ScanFlow::Pause
            }
        });
        report_outcome(outcome)?;

        // Background subtraction
        let filter_timer = Instant::now();
        let filtered: Vec<_> = object
            .points()
            .iter()
            .filter(|p| !self.background.has_neighbor(p, self.back_distance))
            .copied()
            .collect();
        if self.chrono {
            println!(
                "Object point filtering lasted {:.6}s",
                filter_timer.elapsed().as_secs_f64()
            );
        }

        println!(
            "Scanned object contains {} unique points (a total of {} points were scanned)",
            filtered.len(),
            scanned
        );

        Ok(CharacterizedObject::characterize(filtered, self.chrono))
    }

    /// Swallow points for the given number of milliseconds.
    pub fn discard(&mut self, ms: u64) -> Result<(), Error> {
        let window = ms * NANOS_PER_MS;
        let min_reflectivity = self.min_reflectivity;
        let mut start: Option<Timestamp> = None;
        let mut count = 0u64;

        let outcome = self.scanner.scan(&mut |p| {
            if (p.reflectivity as f64) < min_reflectivity {
                return ScanFlow::Continue;
            }
            let first = match start {
                Some(first) => first,
                None => {
                    debug!("first discarded point timestamp: {}", p.timestamp);
                    start = Some(p.timestamp);
                    p.timestamp
                }
            };
            if first + window > p.timestamp {
                count += 1;
                ScanFlow::Continue
            } else {
                ScanFlow::Pause
            }
        });
        report_outcome(outcome)?;

        println!("A total of {count} points were discarded during {ms}ms");
        Ok(())
    }

    pub fn set_obj_frame(&mut self, ms: u64) {
        self.obj_frame_ns = ms * NANOS_PER_MS;
    }

    pub fn obj_frame_ms(&self) -> u64 {
        self.obj_frame_ns / NANOS_PER_MS
    }

    pub fn set_back_frame(&mut self, ms: u64) {
        self.back_frame_ns = ms * NANOS_PER_MS;
    }

    pub fn back_frame_ms(&self) -> u64 {
        self.back_frame_ns / NANOS_PER_MS
    }

    pub fn set_back_distance(&mut self, meters: f64) {
        self.back_distance = meters;
    }

    pub fn back_distance(&self) -> f64 {
        self.back_distance
    }

    pub fn set_min_reflectivity(&mut self, reflectivity: f64) {
        self.min_reflectivity = reflectivity;
    }

    pub fn min_reflectivity(&self) -> f64 {
        self.min_reflectivity
    }

    pub fn set_chrono(&mut self, chrono: bool) {
        self.chrono = chrono;
    }

    pub fn is_chrono(&self) -> bool {
        self.chrono
    }

    /// Background points collected by the last
    /// [`ObjectCharacterizer::define_background`].
    pub fn background(&self) -> &PointMap {
        &self.background
    }
}

/// Translate a scan outcome into operator messages; errors abort the
/// running definition.
fn report_outcome(outcome: Result<ScanOutcome, Error>) -> Result<(), Error> {
    match outcome {
        Ok(ScanOutcome::Ok) => Ok(()),
        Ok(ScanOutcome::Eof) => {
            eprintln!("End Of File reached: Scan will end and file will be reset");
            Ok(())
        }
        Err(e) => {
            eprintln!("An error occurred while scanning: Scan will end");
            Err(e)
        }
    }
}
