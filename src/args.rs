// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Point cloud capture to scan from (.csv or .lvx file).
    #[arg(long, env, required_unless_present = "sensor", conflicts_with = "sensor")]
    pub file: Option<PathBuf>,

    /// UDP bind address for live Livox sensor data packets
    /// (e.g. "0.0.0.0:65000").
    #[arg(long, env)]
    pub sensor: Option<String>,

    /// Milliseconds to use as the object frame duration.
    #[arg(long, env, default_value = "250")]
    pub obj_frame: u64,

    /// Milliseconds during which scanned points form the background.
    #[arg(long, env, default_value = "2000")]
    pub back_frame: u64,

    /// Minimum reflectivity value points may have not to be discarded.
    #[arg(long, env, default_value = "0")]
    pub min_reflectivity: f64,

    /// Minimum distance from the background in meters a point must have
    /// not to be discarded.
    #[arg(long, env, default_value = "0.04")]
    pub back_distance: f64,

    /// Chronometers to activate at startup.
    #[arg(long, env, value_enum, default_value = "notime")]
    pub chrono: ChronoMode,

    /// Model files to preload into the model registry.
    #[arg(long, env)]
    pub model: Vec<PathBuf>,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,
}

/// Which stages get wall-clock timing printed.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChronoMode {
    /// No chronometer.
    #[default]
    Notime,
    /// Time the characterization stages.
    Char,
    /// Time the anomaly detection.
    Anom,
    /// Time everything.
    All,
}

impl ChronoMode {
    pub fn characterization(self) -> bool {
        matches!(self, ChronoMode::Char | ChronoMode::All)
    }

    pub fn anomaly(self) -> bool {
        matches!(self, ChronoMode::Anom | ChronoMode::All)
    }
}
