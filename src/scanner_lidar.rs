// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Live Livox sensor scanner.
//!
//! The sensor pushes raw Ethernet data packets over UDP. A reader thread
//! owns the socket, parses each datagram and ships the points through a
//! bounded channel; [`ScannerLidar::scan`] first drains whatever queued up
//! while the scanner was paused (stale captures carry stale timestamps),
//! then forwards fresh points to the sink.
//!
//! # Data packet layout (18-byte header + payload)
//!
//! version, slot, lidar id, reserved, u32 status code, timestamp type,
//! data type, u64 timestamp (ns). Extended cartesian payloads
//! (data type 2) carry up to 96 points of i32 x/y/z millimeters plus
//! u8 reflectivity and u8 tag.

use crate::point::{LidarPoint, Timestamp};
use crate::scanner::{Error, PointScanner, ScanFlow, ScanOutcome};
use std::net::UdpSocket;
use tracing::{debug, error, trace};

const PACKET_HEADER_SIZE: usize = 18;
const EXTEND_CARTESIAN: u8 = 2;
const EXTEND_CARTESIAN_POINT_SIZE: usize = 14;
const MAX_POINTS_PER_PACKET: usize = 96;

const MM_PER_M: f64 = 1000.0;

/// Queue depth between the reader thread and the scan loop; at ~100
/// packets/s of 96 points this holds several seconds of backlog.
const CHANNEL_CAPACITY: usize = 65536;

/// Parse one Livox data datagram into points.
///
/// Packets that are too short or of a non-cartesian data type yield no
/// points; live streams interleave IMU and other packet types which are
/// simply not interesting here.
pub fn parse_data_packet(data: &[u8]) -> Vec<LidarPoint> {
    if data.len() < PACKET_HEADER_SIZE {
        trace!("short datagram: {} bytes", data.len());
        return Vec::new();
    }
    let data_type = data[9];
    if data_type != EXTEND_CARTESIAN {
        trace!("ignoring data type {}", data_type);
        return Vec::new();
    }

    let timestamp = Timestamp::from_nanos(u64::from_le_bytes(
        data[10..18].try_into().expect("8-byte slice"),
    ));

    let payload = &data[PACKET_HEADER_SIZE..];
    let count = (payload.len() / EXTEND_CARTESIAN_POINT_SIZE).min(MAX_POINTS_PER_PACKET);

    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let at = i * EXTEND_CARTESIAN_POINT_SIZE;
        let x = i32::from_le_bytes(payload[at..at + 4].try_into().expect("4-byte slice"));
        let y = i32::from_le_bytes(payload[at + 4..at + 8].try_into().expect("4-byte slice"));
        let z = i32::from_le_bytes(payload[at + 8..at + 12].try_into().expect("4-byte slice"));
        let reflectivity = payload[at + 12] as u32;

        points.push(LidarPoint::new(
            timestamp,
            reflectivity,
            x as f64 / MM_PER_M,
            y as f64 / MM_PER_M,
            z as f64 / MM_PER_M,
        ));
    }
    points
}

/// Live sensor scanner backed by a UDP reader thread.
pub struct ScannerLidar {
    rx: kanal::Receiver<LidarPoint>,
    local_addr: std::net::SocketAddr,
}

impl ScannerLidar {
    /// Bind the data port and start the reader thread.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let socket = UdpSocket::bind(addr)?;
        let local_addr = socket.local_addr()?;
        debug!("listening for lidar data on {}", local_addr);

        let (tx, rx) = kanal::bounded(CHANNEL_CAPACITY);
        std::thread::Builder::new()
            .name("lidar-recv".to_string())
            .spawn(move || reader_loop(socket, tx))?;

        Ok(Self { rx, local_addr })
    }

    /// The address the data socket is bound to.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }
}

fn reader_loop(socket: UdpSocket, tx: kanal::Sender<LidarPoint>) {
    let mut buf = [0u8; 2048];
    loop {
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _src)) => len,
            Err(e) => {
                error!("lidar socket error: {}", e);
                return;
            }
        };
        for point in parse_data_packet(&buf[..len]) {
            // send() blocks when the scan loop falls behind; a closed
            // channel means the scanner was dropped
            if tx.send(point).is_err() {
                return;
            }
        }
    }
}

impl PointScanner for ScannerLidar {
    fn scan(
        &mut self,
        sink: &mut dyn FnMut(&LidarPoint) -> ScanFlow,
    ) -> Result<ScanOutcome, Error> {
        // Drop points that queued up while paused
        let mut stale = 0usize;
        while let Ok(Some(_)) = self.rx.try_recv() {
            stale += 1;
        }
        if stale > 0 {
            debug!("dropped {} stale points", stale);
        }

        loop {
            let point = self.rx.recv().map_err(|_| Error::Disconnected)?;
            if sink(&point) == ScanFlow::Pause {
                return Ok(ScanOutcome::Ok);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datagram(timestamp: u64, points: &[(i32, i32, i32, u8)]) -> Vec<u8> {
        let mut out = vec![5, 0, 0, 0]; // version, slot, id, rsvd
        out.extend_from_slice(&0u32.to_le_bytes()); // status code
        out.push(0); // timestamp type
        out.push(EXTEND_CARTESIAN);
        out.extend_from_slice(&timestamp.to_le_bytes());
        for &(x, y, z, refl) in points {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
            out.extend_from_slice(&z.to_le_bytes());
            out.push(refl);
            out.push(0);
        }
        out
    }

    #[test]
    fn test_parse_extended_cartesian() {
        let data = datagram(12345, &[(1500, -300, 0, 42), (0, 0, 2000, 7)]);
        let points = parse_data_packet(&data);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, Timestamp::from_nanos(12345));
        assert_eq!(points[0].reflectivity, 42);
        assert_eq!(points[0].point.x, 1.5);
        assert_eq!(points[0].point.y, -0.3);
        assert_eq!(points[1].point.z, 2.0);
    }

    #[test]
    fn test_parse_rejects_short_datagram() {
        assert!(parse_data_packet(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_parse_ignores_other_data_types() {
        let mut data = datagram(1, &[(1, 2, 3, 4)]);
        data[9] = 6; // IMU
        assert!(parse_data_packet(&data).is_empty());
    }

    #[test]
    fn test_parse_truncated_point_tail() {
        // A datagram cut mid-point parses only the complete points
        let mut data = datagram(1, &[(1000, 0, 0, 1), (2000, 0, 0, 2)]);
        data.truncate(data.len() - 5);
        let points = parse_data_packet(&data);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].point.x, 1.0);
    }

    #[test]
    fn test_scan_over_loopback() {
        let mut scanner = ScannerLidar::bind("127.0.0.1:0").unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(
                &datagram(99, &[(1000, 2000, 3000, 9)]),
                scanner.local_addr(),
            )
            .unwrap();

        let mut first = None;
        let outcome = scanner
            .scan(&mut |p| {
                first = Some(*p);
                ScanFlow::Pause
            })
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Ok);
        let p = first.unwrap();
        assert_eq!(p.reflectivity, 9);
        assert_eq!(p.point.x, 1.0);
        assert_eq!(p.point.y, 2.0);
        assert_eq!(p.point.z, 3.0);
    }
}
