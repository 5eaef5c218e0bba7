// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common scanner types and trait abstraction for multi-source support.
//!
//! A [`PointScanner`] streams [`LidarPoint`]s into a sink callback. The
//! sink controls the scan: returning [`ScanFlow::Pause`] stops the stream
//! at the current position, and a later [`PointScanner::scan`] resumes
//! from there. Finite sources report [`ScanOutcome::Eof`] once exhausted
//! and rewind so the next scan starts over.

use crate::point::LidarPoint;
use std::fmt;
use std::path::Path;

/// Common error type for scanner and storage operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error (socket, file operations)
    Io(std::io::Error),
    /// Malformed CSV input
    Csv(csv::Error),
    /// Model file (de)serialization error
    Json(serde_json::Error),
    /// A CSV record that does not carry the expected cells
    InvalidRecord(String),
    /// File does not start with the LVX signature/magic
    InvalidSignature,
    /// LVX file version not supported
    UnsupportedVersion([u8; 4]),
    /// Unexpected end of data at given byte position
    UnexpectedEnd(usize),
    /// Packet carries a data type with unknown layout
    UnknownDataType(u8),
    /// The live sensor channel closed (reader thread gone)
    Disconnected,
    /// Configuration error
    Config(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Csv(err) => write!(f, "csv error: {}", err),
            Error::Json(err) => write!(f, "json error: {}", err),
            Error::InvalidRecord(msg) => write!(f, "invalid record: {}", msg),
            Error::InvalidSignature => write!(f, "not an LVX file"),
            Error::UnsupportedVersion(v) => {
                write!(f, "unsupported LVX version: {}.{}.{}.{}", v[0], v[1], v[2], v[3])
            }
            Error::UnexpectedEnd(pos) => write!(f, "unexpected end of data at byte {}", pos),
            Error::UnknownDataType(typ) => write!(f, "unknown data type: {}", typ),
            Error::Disconnected => write!(f, "sensor disconnected"),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

/// How a scan session ended (errors are reported through `Result`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The sink paused the scan; the source holds its position.
    Ok,
    /// The source ran out of data and rewound to the beginning.
    Eof,
}

/// Sink verdict for each delivered point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanFlow {
    Continue,
    Pause,
}

/// Trait for point stream sources.
///
/// Implementations deliver points in capture order and must support
/// resuming after a pause.
pub trait PointScanner: Send {
    /// Stream points into `sink` until it pauses, the source is
    /// exhausted, or an error occurs.
    fn scan(
        &mut self,
        sink: &mut dyn FnMut(&LidarPoint) -> ScanFlow,
    ) -> Result<ScanOutcome, Error>;
}

/// Open a point cloud file with the scanner matching its extension
/// (`.csv` or `.lvx`).
pub fn open_file(path: &Path) -> Result<Box<dyn PointScanner>, Error> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("csv") => Ok(Box::new(crate::scanner_csv::ScannerCsv::open(path)?)),
        Some("lvx") => Ok(Box::new(crate::scanner_lvx::ScannerLvx::open(path)?)),
        _ => Err(Error::Config(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}

/// Scripted point source for unit testing.
///
/// Delivers a fixed sequence of points, resuming after pauses and
/// rewinding at EOF like the file scanners.
#[derive(Debug, Default)]
pub struct TestScanner {
    points: Vec<LidarPoint>,
    index: usize,
}

impl TestScanner {
    pub fn new(points: Vec<LidarPoint>) -> Self {
        Self { points, index: 0 }
    }

    /// Current stream position.
    pub fn position(&self) -> usize {
        self.index
    }
}

impl PointScanner for TestScanner {
    fn scan(
        &mut self,
        sink: &mut dyn FnMut(&LidarPoint) -> ScanFlow,
    ) -> Result<ScanOutcome, Error> {
        while self.index < self.points.len() {
            let point = self.points[self.index];
            self.index += 1;
            if sink(&point) == ScanFlow::Pause {
                return Ok(ScanOutcome::Ok);
            }
        }
        self.index = 0;
        Ok(ScanOutcome::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Timestamp;

    fn points(n: usize) -> Vec<LidarPoint> {
        (0..n)
            .map(|i| LidarPoint::new(Timestamp::from_nanos(i as u64), 100, i as f64, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_test_scanner_runs_to_eof() {
        let mut scanner = TestScanner::new(points(5));
        let mut seen = 0;
        let outcome = scanner
            .scan(&mut |_| {
                seen += 1;
                ScanFlow::Continue
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(seen, 5);
        // EOF rewinds
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_test_scanner_pause_and_resume() {
        let mut scanner = TestScanner::new(points(5));

        let mut seen = Vec::new();
        let outcome = scanner
            .scan(&mut |p| {
                seen.push(p.point.x);
                if seen.len() == 2 {
                    ScanFlow::Pause
                } else {
                    ScanFlow::Continue
                }
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Ok);
        assert_eq!(seen, vec![0.0, 1.0]);

        // Resume picks up where the pause left off
        let outcome = scanner
            .scan(&mut |p| {
                seen.push(p.point.x);
                ScanFlow::Continue
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_open_file_rejects_unknown_extension() {
        assert!(open_file(Path::new("points.xyz")).is_err());
        assert!(open_file(Path::new("points")).is_err());
    }
}
