// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Core point cloud primitives.
//!
//! [`Point`] is a cartesian position in meters, [`Timestamp`] a
//! nanosecond-precision time mark, and [`LidarPoint`] the pair of both plus
//! the sensor reflectivity as streamed by the scanners.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanosecond-precision timestamp as emitted by Livox sensors.
///
/// Stored as whole seconds plus a nanosecond remainder so the derived
/// ordering is lexicographic (seconds first), matching the raw u64
/// nanosecond count.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    seconds: u32,
    nanos: u32,
}

impl Timestamp {
    /// Create a timestamp, normalizing nanosecond overflow into seconds.
    pub fn new(seconds: u32, nanos: u32) -> Self {
        Self {
            seconds: seconds + (nanos as u64 / NANOS_PER_SEC) as u32,
            nanos: (nanos as u64 % NANOS_PER_SEC) as u32,
        }
    }

    /// Create a timestamp from a raw nanosecond count.
    pub fn from_nanos(total: u64) -> Self {
        Self {
            seconds: (total / NANOS_PER_SEC) as u32,
            nanos: (total % NANOS_PER_SEC) as u32,
        }
    }

    /// Parse a decimal nanosecond count, as found in Livox CSV exports.
    pub fn parse(utc: &str) -> Option<Self> {
        utc.trim().parse::<u64>().ok().map(Self::from_nanos)
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Total nanoseconds since the epoch of the sensor clock.
    pub fn as_nanos(&self) -> u64 {
        self.seconds as u64 * NANOS_PER_SEC + self.nanos as u64
    }
}

/// Advance a timestamp by a nanosecond offset.
impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, ns: u64) -> Timestamp {
        Timestamp::from_nanos(self.as_nanos() + ns)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}s {}ns", self.seconds, self.nanos)
    }
}

/// A 3D point in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Directions and deltas share the point representation.
pub type Vector = Point;

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, p: &Point) -> f64 {
        self.distance_sq(p).sqrt()
    }

    /// Squared euclidean distance, for threshold comparisons without the
    /// sqrt.
    pub fn distance_sq(&self, p: &Point) -> f64 {
        let dx = self.x - p.x;
        let dy = self.y - p.y;
        let dz = self.z - p.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn dot(&self, v: &Vector) -> f64 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Angle between two vectors in radians.
    ///
    /// Zero-length vectors yield an angle of zero.
    pub fn angle_to(&self, v: &Vector) -> f64 {
        let denom = self.norm() * v.norm();
        if denom < f64::EPSILON {
            return 0.0;
        }
        (self.dot(v) / denom).clamp(-1.0, 1.0).acos()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, p: Point) -> Point {
        Point::new(self.x + p.x, self.y + p.y, self.z + p.z)
    }
}

impl Add<f64> for Point {
    type Output = Point;

    fn add(self, d: f64) -> Point {
        Point::new(self.x + d, self.y + d, self.z + d)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, p: Point) -> Point {
        Point::new(self.x - p.x, self.y - p.y, self.z - p.z)
    }
}

impl Sub<f64> for Point {
    type Output = Point;

    fn sub(self, d: f64) -> Point {
        Point::new(self.x - d, self.y - d, self.z - d)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, d: f64) -> Point {
        Point::new(self.x * d, self.y * d, self.z * d)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, d: f64) -> Point {
        Point::new(self.x / d, self.y / d, self.z / d)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.6}, {:.6}, {:.6}", self.x, self.y, self.z)
    }
}

/// A scanned point: position plus timestamp and reflectivity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LidarPoint {
    pub timestamp: Timestamp,
    pub reflectivity: u32,
    pub point: Point,
}

impl LidarPoint {
    pub fn new(timestamp: Timestamp, reflectivity: u32, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp,
            reflectivity,
            point: Point::new(x, y, z),
        }
    }
}

impl fmt::Display for LidarPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({})",
            self.timestamp, self.reflectivity, self.point
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_normalizes_nanos() {
        let t = Timestamp::new(0, 1_000_000_001);
        assert_eq!(t.seconds(), 1);
        assert_eq!(t.nanos(), 1);
    }

    #[test]
    fn test_timestamp_from_nanos_roundtrip() {
        let t = Timestamp::from_nanos(100_000_000_100);
        assert_eq!(t.seconds(), 100);
        assert_eq!(t.nanos(), 100);
        assert_eq!(t.as_nanos(), 100_000_000_100);
    }

    #[test]
    fn test_timestamp_parse() {
        let t = Timestamp::parse("100000000100").unwrap();
        assert_eq!(t.seconds(), 100);
        assert_eq!(t.nanos(), 100);
        assert!(Timestamp::parse("not a number").is_none());
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::new(6, 100);
        let b = Timestamp::new(6, 200);
        let c = Timestamp::new(7, 0);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, Timestamp::new(6, 100));
    }

    #[test]
    fn test_timestamp_add_nanos() {
        let t = Timestamp::new(1, 999_999_999) + 2;
        assert_eq!(t.seconds(), 2);
        assert_eq!(t.nanos(), 1);
    }

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(1.0, 2.0, 3.0);
        let b = Point::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Point::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Point::new(0.5, 1.5, 2.5));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0, 6.0));
        assert_eq!(a / 2.0, Point::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance_sq(&b), 25.0);
    }

    #[test]
    fn test_vector_angle() {
        let x = Vector::new(1.0, 0.0, 0.0);
        let y = Vector::new(0.0, 1.0, 0.0);
        assert!((x.angle_to(&y) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(x.angle_to(&x).abs() < 1e-12);
        // Degenerate input must not NaN out
        assert_eq!(x.angle_to(&Vector::zero()), 0.0);
    }
}
