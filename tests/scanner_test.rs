// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! File scanner integration tests: real files on disk, opened through the
//! extension-dispatching factory.

use lidar_inspect::scanner::{self, ScanFlow, ScanOutcome};
use lidar_inspect::{LidarPoint, Timestamp};
use std::io::Write;
use std::path::Path;

// ── CSV ─────────────────────────────────────────────────────────────────

const CSV_HEADER: &str = "Version,Slot ID,LiDAR Index,Rsvd,Error Code,Timestamp Type,Data Type,Timestamp,Tag,Ori_x,Ori_y,Reflectivity,Ori_z,X,Y,Z";

fn csv_row(ts: u64, refl: u32, x: f64, y: f64, z: f64) -> String {
    format!("5,0,0,0,0,0,2,{ts},0,0,0,{refl},0,{x},{y},{z}")
}

fn write_csv(dir: &Path, rows: &[String]) -> std::path::PathBuf {
    let path = dir.join("points.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{CSV_HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    path
}

#[test]
fn test_csv_through_factory() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        dir.path(),
        &[
            csv_row(1_000, 50, 0.1, 0.2, 0.3),
            csv_row(2_000, 60, 0.4, 0.5, 0.6),
        ],
    );

    let mut scanner = scanner::open_file(&path).unwrap();
    let mut points: Vec<LidarPoint> = Vec::new();
    let outcome = scanner
        .scan(&mut |p| {
            points.push(*p);
            ScanFlow::Continue
        })
        .unwrap();

    assert_eq!(outcome, ScanOutcome::Eof);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].timestamp, Timestamp::from_nanos(1_000));
    assert_eq!(points[0].reflectivity, 50);
    assert_eq!(points[1].point.y, 0.5);
}

// ── LVX ─────────────────────────────────────────────────────────────────

const LVX_SIGNATURE: &[u8; 16] = b"livox_tech\0\0\0\0\0\0";
const LVX_MAGIC: u32 = 0xAC0E_A767;
const DEVICE_INFO_SIZE: usize = 59;
const FRAME_HEADER_SIZE: usize = 24;
const POINTS_PER_PACKET: usize = 96;

/// Append one extended cartesian packet, padded to 96 points by
/// repeating the last one.
fn push_lvx_packet(out: &mut Vec<u8>, timestamp: u64, points: &[(i32, i32, i32, u8)]) {
    out.push(0); // device index
    out.push(1); // packet version
    out.extend_from_slice(&[0, 0, 0]); // slot, lidar index, rsvd
    out.extend_from_slice(&0u32.to_le_bytes()); // error code
    out.push(0); // timestamp type
    out.push(2); // extended cartesian
    out.extend_from_slice(&timestamp.to_le_bytes());

    let last = *points.last().unwrap();
    for i in 0..POINTS_PER_PACKET {
        let (x, y, z, refl) = *points.get(i).unwrap_or(&last);
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
        out.extend_from_slice(&z.to_le_bytes());
        out.push(refl);
        out.push(0); // tag
    }
}

fn write_lvx(dir: &Path, frames: &[Vec<u8>]) -> std::path::PathBuf {
    let mut out = Vec::new();
    out.extend_from_slice(LVX_SIGNATURE);
    out.extend_from_slice(&[1, 1, 0, 0]);
    out.extend_from_slice(&LVX_MAGIC.to_le_bytes());
    out.extend_from_slice(&50u32.to_le_bytes()); // frame duration ms
    out.push(1); // device count
    out.extend_from_slice(&[0u8; DEVICE_INFO_SIZE]);

    for (idx, packets) in frames.iter().enumerate() {
        let current = out.len() as u64;
        let next = current + (FRAME_HEADER_SIZE + packets.len()) as u64;
        out.extend_from_slice(&current.to_le_bytes());
        out.extend_from_slice(&next.to_le_bytes());
        out.extend_from_slice(&(idx as u64).to_le_bytes());
        out.extend_from_slice(packets);
    }

    let path = dir.join("capture.lvx");
    std::fs::write(&path, out).unwrap();
    path
}

#[test]
fn test_lvx_through_factory() {
    let dir = tempfile::tempdir().unwrap();
    let mut packets = Vec::new();
    push_lvx_packet(&mut packets, 7_000, &[(1500, -250, 750, 80)]);
    let path = write_lvx(dir.path(), &[packets]);

    let mut scanner = scanner::open_file(&path).unwrap();
    let mut first = None;
    let mut count = 0usize;
    let outcome = scanner
        .scan(&mut |p| {
            if first.is_none() {
                first = Some(*p);
            }
            count += 1;
            ScanFlow::Continue
        })
        .unwrap();

    assert_eq!(outcome, ScanOutcome::Eof);
    assert_eq!(count, POINTS_PER_PACKET);

    let p = first.unwrap();
    assert_eq!(p.timestamp, Timestamp::from_nanos(7_000));
    assert_eq!(p.reflectivity, 80);
    assert_eq!(p.point.x, 1.5);
    assert_eq!(p.point.y, -0.25);
    assert_eq!(p.point.z, 0.75);
}

#[test]
fn test_lvx_pause_spans_scans() {
    let dir = tempfile::tempdir().unwrap();
    let mut packets = Vec::new();
    push_lvx_packet(&mut packets, 1, &[(100, 0, 0, 1)]);
    let path = write_lvx(dir.path(), &[packets]);

    let mut scanner = scanner::open_file(&path).unwrap();

    let mut taken = 0usize;
    let outcome = scanner
        .scan(&mut |_| {
            taken += 1;
            if taken == 30 {
                ScanFlow::Pause
            } else {
                ScanFlow::Continue
            }
        })
        .unwrap();
    assert_eq!(outcome, ScanOutcome::Ok);

    let mut rest = 0usize;
    let outcome = scanner
        .scan(&mut |_| {
            rest += 1;
            ScanFlow::Continue
        })
        .unwrap();
    assert_eq!(outcome, ScanOutcome::Eof);
    assert_eq!(taken + rest, POINTS_PER_PACKET);
}

#[test]
fn test_factory_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.bin");
    std::fs::write(&path, b"not a point cloud").unwrap();
    assert!(scanner::open_file(&path).is_err());
}

#[test]
fn test_factory_accepts_uppercase_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("POINTS.CSV");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{CSV_HEADER}").unwrap();
    drop(file);

    assert!(scanner::open_file(&path).is_ok());
}
