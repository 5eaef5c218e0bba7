// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Scanner for Livox Viewer CSV exports.
//!
//! The Viewer writes one point per row with a fixed column layout; only
//! four cells matter here: the timestamp (nanoseconds), the reflectivity
//! and the cartesian coordinates. Column indices are 0-based counting
//! from the first cell of the row.

use crate::point::{LidarPoint, Timestamp};
use crate::scanner::{Error, PointScanner, ScanFlow, ScanOutcome};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

const TIMESTAMP_COL: usize = 7;
const REFLECTIVITY_COL: usize = 11;
const X_COL: usize = 13;
const Y_COL: usize = 14;
const Z_COL: usize = 15;

/// CSV file scanner.
pub struct ScannerCsv {
    path: PathBuf,
    /// Active reader; `None` between EOF and the next scan.
    reader: Option<csv::Reader<File>>,
}

impl ScannerCsv {
    /// Open a CSV export. The file is opened lazily on the first scan, so
    /// this only records the path after checking the file exists.
    pub fn open(path: &Path) -> Result<Self, Error> {
        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            reader: None,
        })
    }

    /// Take the active reader, opening the file when none is held.
    fn take_reader(&mut self) -> Result<csv::Reader<File>, Error> {
        match self.reader.take() {
            Some(reader) => Ok(reader),
            None => {
                debug!("opening csv file {}", self.path.display());
                Ok(csv::ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true)
                    .from_path(&self.path)?)
            }
        }
    }
}

/// Pull one cell out of a record by index.
fn cell<'r>(record: &'r csv::StringRecord, col: usize) -> Result<&'r str, Error> {
    record
        .get(col)
        .ok_or_else(|| Error::InvalidRecord(format!("missing column {col}")))
}

fn parse_point(record: &csv::StringRecord) -> Result<LidarPoint, Error> {
    let timestamp = Timestamp::parse(cell(record, TIMESTAMP_COL)?)
        .ok_or_else(|| Error::InvalidRecord("bad timestamp".into()))?;

    let reflectivity = cell(record, REFLECTIVITY_COL)?
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidRecord("bad reflectivity".into()))? as u32;

    let mut coords = [0.0f64; 3];
    for (value, col) in coords.iter_mut().zip([X_COL, Y_COL, Z_COL]) {
        *value = cell(record, col)?
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRecord(format!("bad coordinate in column {col}")))?;
    }

    Ok(LidarPoint::new(
        timestamp,
        reflectivity,
        coords[0],
        coords[1],
        coords[2],
    ))
}

impl PointScanner for ScannerCsv {
    fn scan(
        &mut self,
        sink: &mut dyn FnMut(&LidarPoint) -> ScanFlow,
    ) -> Result<ScanOutcome, Error> {
        let mut reader = self.take_reader()?;

        let mut record = csv::StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {
                    let point = parse_point(&record)?;
                    if sink(&point) == ScanFlow::Pause {
                        // Keep the reader so the next scan resumes here
                        self.reader = Some(reader);
                        return Ok(ScanOutcome::Ok);
                    }
                }
                Ok(false) => {
                    // EOF: drop the reader so the next scan starts over
                    debug!("csv file {} exhausted", self.path.display());
                    return Ok(ScanOutcome::Eof);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Version,Slot ID,LiDAR Index,Rsvd,Error Code,Timestamp Type,Data Type,Timestamp,Tag,Ori_x,Ori_y,Reflectivity,Ori_z,X,Y,Z";

    fn row(ts: u64, refl: u32, x: f64, y: f64, z: f64) -> String {
        // Cells 7 (timestamp), 11 (reflectivity) and 13-15 (x, y, z) are
        // the ones the scanner reads
        format!("5,0,0,0,0,0,2,{ts},0,0,0,{refl},0,{x},{y},{z}")
    }

    fn write_csv(rows: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for r in rows {
            writeln!(file, "{r}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_all_points() {
        let file = write_csv(&[
            row(1_000, 90, 1.0, 2.0, 3.0),
            row(2_000, 80, 4.0, 5.0, 6.0),
        ]);
        let mut scanner = ScannerCsv::open(file.path()).unwrap();

        let mut points = Vec::new();
        let outcome = scanner
            .scan(&mut |p| {
                points.push(*p);
                ScanFlow::Continue
            })
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, Timestamp::from_nanos(1_000));
        assert_eq!(points[0].reflectivity, 90);
        assert_eq!(points[1].point.x, 4.0);
        assert_eq!(points[1].point.z, 6.0);
    }

    #[test]
    fn test_pause_resume_and_rewind() {
        let file = write_csv(&[
            row(1, 10, 1.0, 0.0, 0.0),
            row(2, 20, 2.0, 0.0, 0.0),
            row(3, 30, 3.0, 0.0, 0.0),
        ]);
        let mut scanner = ScannerCsv::open(file.path()).unwrap();

        // Pause after the first point
        let outcome = scanner.scan(&mut |_| ScanFlow::Pause).unwrap();
        assert_eq!(outcome, ScanOutcome::Ok);

        // Resume: the remaining two points follow
        let mut xs = Vec::new();
        let outcome = scanner
            .scan(&mut |p| {
                xs.push(p.point.x);
                ScanFlow::Continue
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(xs, vec![2.0, 3.0]);

        // After EOF the scan starts over from the first point
        let mut first = None;
        scanner
            .scan(&mut |p| {
                first = Some(p.point.x);
                ScanFlow::Pause
            })
            .unwrap();
        assert_eq!(first, Some(1.0));
    }

    #[test]
    fn test_malformed_row_errors() {
        let file = write_csv(&[row(1, 10, 1.0, 0.0, 0.0), "5,0,0,0".to_string()]);
        let mut scanner = ScannerCsv::open(file.path()).unwrap();

        let result = scanner.scan(&mut |_| ScanFlow::Continue);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(ScannerCsv::open(Path::new("/nonexistent/points.csv")).is_err());
    }

    #[test]
    fn test_empty_file_is_eof() {
        let file = write_csv(&[]);
        let mut scanner = ScannerCsv::open(file.path()).unwrap();
        let outcome = scanner.scan(&mut |_| ScanFlow::Continue).unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
    }
}
