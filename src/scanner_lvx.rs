// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Scanner for Livox LVX v1.1 capture files.
//!
//! # File Structure
//!
//! - Public header: 16-byte signature (`livox_tech` zero padded),
//!   4 version bytes, u32 magic 0xAC0EA767
//! - Private header: u32 frame duration (ms), u8 device count
//! - Device info blocks: 59 bytes per device
//! - Frames: 24-byte header (current offset, next offset, frame index —
//!   all absolute u64 file offsets) followed by data packets up to the
//!   next frame offset
//!
//! # Packet Structure (19-byte header + payload)
//!
//! device index, version, slot, lidar index, reserved, u32 error code,
//! timestamp type, data type, u64 timestamp (ns). Only extended
//! cartesian packets (data type 2: 96 points of i32 x/y/z millimeters,
//! u8 reflectivity, u8 tag) produce points; other known payloads are
//! skipped.
//!
//! The scanner keeps a byte cursor plus an in-packet point index so a
//! paused scan resumes exactly where it stopped, even mid-packet.

use crate::point::{LidarPoint, Timestamp};
use crate::scanner::{Error, PointScanner, ScanFlow, ScanOutcome};
use std::path::Path;
use tracing::debug;

const SIGNATURE: &[u8; 16] = b"livox_tech\0\0\0\0\0\0";
const MAGIC: u32 = 0xAC0E_A767;

const PUBLIC_HEADER_SIZE: usize = 24;
const PRIVATE_HEADER_SIZE: usize = 5;
const DEVICE_INFO_SIZE: usize = 59;
const FRAME_HEADER_SIZE: usize = 24;
const PACKET_HEADER_SIZE: usize = 19;

/// Extended cartesian point: i32 x/y/z in mm, u8 reflectivity, u8 tag.
const EXTEND_CARTESIAN: u8 = 2;
const EXTEND_CARTESIAN_POINTS: usize = 96;
const EXTEND_CARTESIAN_POINT_SIZE: usize = 14;

const MM_PER_M: f64 = 1000.0;

/// Payload length for each known packet data type.
fn payload_len(data_type: u8) -> Result<usize, Error> {
    match data_type {
        0 => Ok(100 * 13), // cartesian
        1 => Ok(100 * 9),  // spherical
        2 => Ok(EXTEND_CARTESIAN_POINTS * EXTEND_CARTESIAN_POINT_SIZE),
        3 => Ok(96 * 10), // extended spherical
        6 => Ok(24),      // IMU
        other => Err(Error::UnknownDataType(other)),
    }
}

/// LVX v1.1 file scanner.
pub struct ScannerLvx {
    data: Vec<u8>,
    /// Offset of the first frame header.
    frames_start: usize,
    /// Cursor: next packet header (or frame header when `frame_end == 0`).
    offset: usize,
    /// Absolute end of the current frame's packet area; 0 when the cursor
    /// sits on a frame header.
    frame_end: usize,
    /// Next point to deliver within the packet at `offset`.
    point_idx: usize,
}

impl ScannerLvx {
    /// Read and validate an LVX file.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Parse an in-memory LVX image.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Error> {
        if data.len() < PUBLIC_HEADER_SIZE + PRIVATE_HEADER_SIZE {
            return Err(Error::UnexpectedEnd(data.len()));
        }
        if &data[..16] != SIGNATURE || read_u32(&data, 20)? != MAGIC {
            return Err(Error::InvalidSignature);
        }

        let version: [u8; 4] = data[16..20].try_into().expect("4-byte slice");
        if version[0] != 1 || version[1] != 1 {
            return Err(Error::UnsupportedVersion(version));
        }

        let device_count = data[PUBLIC_HEADER_SIZE + 4] as usize;
        let frames_start =
            PUBLIC_HEADER_SIZE + PRIVATE_HEADER_SIZE + device_count * DEVICE_INFO_SIZE;
        if frames_start > data.len() {
            return Err(Error::UnexpectedEnd(data.len()));
        }

        debug!(
            "opened lvx capture: {} bytes, {} devices",
            data.len(),
            device_count
        );

        Ok(Self {
            data,
            frames_start,
            offset: frames_start,
            frame_end: 0,
            point_idx: 0,
        })
    }

    fn rewind(&mut self) {
        self.offset = self.frames_start;
        self.frame_end = 0;
        self.point_idx = 0;
    }

    /// Read the frame header at the cursor and enter the frame.
    fn enter_frame(&mut self) -> Result<(), Error> {
        let next_offset = read_u64(&self.data, self.offset + 8)? as usize;
        if next_offset < self.offset + FRAME_HEADER_SIZE || next_offset > self.data.len() {
            return Err(Error::UnexpectedEnd(self.offset));
        }
        self.frame_end = next_offset;
        self.offset += FRAME_HEADER_SIZE;
        Ok(())
    }
}

impl PointScanner for ScannerLvx {
    fn scan(
        &mut self,
        sink: &mut dyn FnMut(&LidarPoint) -> ScanFlow,
    ) -> Result<ScanOutcome, Error> {
        loop {
            if self.frame_end == 0 {
                if self.offset >= self.data.len() {
                    debug!("lvx capture exhausted");
                    self.rewind();
                    return Ok(ScanOutcome::Eof);
                }
                self.enter_frame()?;
            }

            while self.offset < self.frame_end {
                let data_type = *self
                    .data
                    .get(self.offset + 10)
                    .ok_or(Error::UnexpectedEnd(self.offset))?;
                let packet_end = self.offset + PACKET_HEADER_SIZE + payload_len(data_type)?;
                if packet_end > self.frame_end {
                    return Err(Error::UnexpectedEnd(self.offset));
                }

                if data_type == EXTEND_CARTESIAN {
                    let timestamp = Timestamp::from_nanos(read_u64(&self.data, self.offset + 11)?);
                    let base = self.offset + PACKET_HEADER_SIZE;

                    while self.point_idx < EXTEND_CARTESIAN_POINTS {
                        let at = base + self.point_idx * EXTEND_CARTESIAN_POINT_SIZE;
                        let x = read_i32(&self.data, at)?;
                        let y = read_i32(&self.data, at + 4)?;
                        let z = read_i32(&self.data, at + 8)?;
                        let reflectivity = self.data[at + 12] as u32;

                        let point = LidarPoint::new(
                            timestamp,
                            reflectivity,
                            x as f64 / MM_PER_M,
                            y as f64 / MM_PER_M,
                            z as f64 / MM_PER_M,
                        );

                        self.point_idx += 1;
                        if sink(&point) == ScanFlow::Pause {
                            return Ok(ScanOutcome::Ok);
                        }
                    }
                    self.point_idx = 0;
                }

                self.offset = packet_end;
            }

            // Frame consumed: the cursor sits on the next frame header
            self.frame_end = 0;
        }
    }
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32, Error> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_le_bytes(b.try_into().expect("4-byte slice")))
        .ok_or(Error::UnexpectedEnd(pos))
}

fn read_u64(data: &[u8], pos: usize) -> Result<u64, Error> {
    data.get(pos..pos + 8)
        .map(|b| u64::from_le_bytes(b.try_into().expect("8-byte slice")))
        .ok_or(Error::UnexpectedEnd(pos))
}

fn read_i32(data: &[u8], pos: usize) -> Result<i32, Error> {
    data.get(pos..pos + 4)
        .map(|b| i32::from_le_bytes(b.try_into().expect("4-byte slice")))
        .ok_or(Error::UnexpectedEnd(pos))
}


#[cfg(test)]
mod tests {
    use super::testdata::{lvx_image, push_packet};
    use super::*;

    #[test]
    fn test_rejects_bad_signature() {
        let mut data = lvx_image(&[]);
        data[0] = b'x';
        assert!(matches!(
            ScannerLvx::from_bytes(data),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut data = lvx_image(&[]);
        data[16] = 2;
        assert!(matches!(
            ScannerLvx::from_bytes(data),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_file() {
        assert!(matches!(
            ScannerLvx::from_bytes(vec![0u8; 10]),
            Err(Error::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_empty_capture_is_eof() {
        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[])).unwrap();
        let outcome = scanner.scan(&mut |_| ScanFlow::Continue).unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
    }

    #[test]
    fn test_reads_points_with_mm_conversion() {
        let mut packets = Vec::new();
        push_packet(&mut packets, 5_000, &[(1000, -2000, 500, 77)]);
        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[packets])).unwrap();

        let mut first = None;
        scanner
            .scan(&mut |p| {
                first = Some(*p);
                ScanFlow::Pause
            })
            .unwrap();

        let p = first.unwrap();
        assert_eq!(p.timestamp, Timestamp::from_nanos(5_000));
        assert_eq!(p.reflectivity, 77);
        assert_eq!(p.point.x, 1.0);
        assert_eq!(p.point.y, -2.0);
        assert_eq!(p.point.z, 0.5);
    }

    #[test]
    fn test_full_packet_count() {
        let mut packets = Vec::new();
        push_packet(&mut packets, 1, &[(100, 0, 0, 1)]);
        push_packet(&mut packets, 2, &[(200, 0, 0, 1)]);
        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[packets])).unwrap();

        let mut count = 0;
        let outcome = scanner
            .scan(&mut |_| {
                count += 1;
                ScanFlow::Continue
            })
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(count, 2 * EXTEND_CARTESIAN_POINTS);
    }

    #[test]
    fn test_pause_resumes_mid_packet() {
        let mut packets = Vec::new();
        push_packet(&mut packets, 1, &[(100, 0, 0, 1)]);
        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[packets])).unwrap();

        // Take 10 points, pause
        let mut taken = 0;
        let outcome = scanner
            .scan(&mut |_| {
                taken += 1;
                if taken == 10 { ScanFlow::Pause } else { ScanFlow::Continue }
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Ok);

        // Resume: exactly the remaining 86 points of the packet
        let mut rest = 0;
        let outcome = scanner
            .scan(&mut |_| {
                rest += 1;
                ScanFlow::Continue
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(rest, EXTEND_CARTESIAN_POINTS - 10);
    }

    #[test]
    fn test_eof_rewinds_to_start() {
        let mut packets = Vec::new();
        push_packet(&mut packets, 42, &[(123, 0, 0, 1)]);
        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[packets])).unwrap();

        scanner.scan(&mut |_| ScanFlow::Continue).unwrap();

        let mut first = None;
        scanner
            .scan(&mut |p| {
                first = Some(*p);
                ScanFlow::Pause
            })
            .unwrap();
        assert_eq!(first.unwrap().point.x, 0.123);
    }

    #[test]
    fn test_multiple_frames() {
        let mut f0 = Vec::new();
        push_packet(&mut f0, 1, &[(100, 0, 0, 1)]);
        let mut f1 = Vec::new();
        push_packet(&mut f1, 2, &[(200, 0, 0, 1)]);
        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[f0, f1])).unwrap();

        let mut count = 0;
        let outcome = scanner
            .scan(&mut |_| {
                count += 1;
                ScanFlow::Continue
            })
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Eof);
        assert_eq!(count, 2 * EXTEND_CARTESIAN_POINTS);
    }

    #[test]
    fn test_truncated_packet_errors() {
        let mut packets = Vec::new();
        push_packet(&mut packets, 1, &[(100, 0, 0, 1)]);
        packets.truncate(packets.len() - 50);

        let mut scanner = ScannerLvx::from_bytes(lvx_image(&[packets])).unwrap();
        assert!(scanner.scan(&mut |_| ScanFlow::Continue).is_err());
    }
}
