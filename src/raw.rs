// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Sensor-specific raw frames and their normalization to [`CanonicalPoint`].
//!
//! Every supported sensor reports a ring index per point but disagrees on
//! the per-point time field:
//!
//! | Sensor    | Field       | Semantics                                   |
//! |-----------|-------------|---------------------------------------------|
//! | Velodyne  | `time`      | seconds since scan start, last ≈ scan span  |
//! | Livox     | `time`      | seconds since scan start, last ≈ scan span  |
//! | Ouster    | `t`         | nanoseconds since scan start                |
//! | Robosense | `timestamp` | absolute seconds, span = last − first       |
//!
//! Normalization maps each point's time to a fraction of the scan span and
//! computes the scan end time handed to downstream odometry.

use crate::{
    lidar::{Error, SensorType},
    point::CanonicalPoint,
};
use tracing::{instrument, trace};

/// Velodyne `PointXYZIRT` return.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VelodynePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    pub ring: u16,
    /// Seconds relative to the start of the scan.
    pub time: f32,
}

/// Livox clouds converted to the Velodyne layout by the Livox ROS driver.
pub type LivoxPoint = VelodynePoint;

/// Ouster `PointOS` return (reduced to the fields the pipeline reads).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OusterPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    /// Nanoseconds relative to the start of the scan.
    pub t: u32,
    pub ring: u16,
}

/// Robosense `PointXYZIRT` return.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RobosensePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    pub ring: u16,
    /// Absolute time of the return in seconds.
    pub timestamp: f64,
}

/// Sensor-tagged raw point storage.
#[derive(Clone, Debug, PartialEq)]
pub enum RawPoints {
    Velodyne(Vec<VelodynePoint>),
    Ouster(Vec<OusterPoint>),
    Robosense(Vec<RobosensePoint>),
    Livox(Vec<LivoxPoint>),
}

impl RawPoints {
    /// Sensor kind this storage belongs to.
    pub fn sensor(&self) -> SensorType {
        match self {
            RawPoints::Velodyne(_) => SensorType::Velodyne,
            RawPoints::Ouster(_) => SensorType::Ouster,
            RawPoints::Robosense(_) => SensorType::Robosense,
            RawPoints::Livox(_) => SensorType::Livox,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawPoints::Velodyne(p) | RawPoints::Livox(p) => p.len(),
            RawPoints::Ouster(p) => p.len(),
            RawPoints::Robosense(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One raw scan as delivered by the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrame {
    /// Scan base timestamp in seconds.
    pub stamp: f64,
    /// Dense flag as reported by the producer.
    pub is_dense: bool,
    /// Field names present on the input schema.
    pub fields: Vec<String>,
    pub points: RawPoints,
}

impl RawFrame {
    /// Create a dense frame carrying the sensor's standard field set.
    pub fn new(stamp: f64, points: RawPoints) -> Self {
        let fields = standard_fields(points.sensor())
            .iter()
            .map(|name| name.to_string())
            .collect();
        Self {
            stamp,
            is_dense: true,
            fields,
            points,
        }
    }

    pub fn sensor(&self) -> SensorType {
        self.points.sensor()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

/// Field names each sensor driver publishes.
pub fn standard_fields(sensor: SensorType) -> &'static [&'static str] {
    match sensor {
        SensorType::Velodyne | SensorType::Livox => {
            &["x", "y", "z", "intensity", "ring", "time"]
        }
        SensorType::Ouster => &["x", "y", "z", "intensity", "t", "ring"],
        SensorType::Robosense => &["x", "y", "z", "intensity", "ring", "timestamp"],
    }
}

/// Scan start and end time in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScanTime {
    pub start: f64,
    pub end: f64,
}

/// Normalize a raw frame into `out`, returning the scan time window.
///
/// `out` is cleared first. Fails with a fatal error when the frame does not
/// belong to the configured `sensor`, has no ring field, or is not dense for
/// a sensor kind that requires density.
#[instrument(skip_all, fields(sensor = %sensor, n = frame.points.len()))]
pub fn normalize(
    sensor: SensorType,
    frame: &RawFrame,
    out: &mut Vec<CanonicalPoint>,
) -> Result<ScanTime, Error> {
    let found = frame.sensor();
    if found != sensor {
        return Err(Error::SensorMismatch {
            expected: sensor,
            found,
        });
    }

    if !frame.has_field("ring") {
        return Err(Error::MissingRingField);
    }

    out.clear();
    out.reserve(frame.points.len());

    let span = match &frame.points {
        RawPoints::Velodyne(points) | RawPoints::Livox(points) => normalize_velodyne(points, out),
        RawPoints::Ouster(points) => normalize_ouster(points, out),
        RawPoints::Robosense(points) => normalize_robosense(points, out),
    };

    if sensor.requires_dense() && (!frame.is_dense || out.iter().any(|p| !p.is_finite())) {
        return Err(Error::NotDense(sensor));
    }

    trace!(points = out.len(), span, "normalized");

    Ok(ScanTime {
        start: frame.stamp,
        end: frame.stamp + span,
    })
}

/// Point time as a fraction of the scan span, or `0.0` when the span is
/// degenerate.
#[inline]
fn relative_time(time: f64, span: f64) -> f32 {
    if span.is_finite() && span > 0.0 {
        (time / span) as f32
    } else {
        0.0
    }
}

/// Seconds to add to the scan start, zero when the span is unusable.
#[inline]
fn usable_span(span: f64) -> f64 {
    if span.is_finite() && span > 0.0 {
        span
    } else {
        0.0
    }
}

fn normalize_velodyne(points: &[VelodynePoint], out: &mut Vec<CanonicalPoint>) -> f64 {
    let span = points.last().map_or(0.0, |p| p.time as f64);
    for p in points {
        out.push(CanonicalPoint::new(
            p.x,
            p.y,
            p.z,
            p.intensity,
            p.ring,
            relative_time(p.time as f64, span),
        ));
    }
    usable_span(span)
}

fn normalize_ouster(points: &[OusterPoint], out: &mut Vec<CanonicalPoint>) -> f64 {
    // The final return of an Ouster scan occasionally carries a bogus `t`,
    // so the span is read from the one before it.
    let span_ns = match points.len() {
        0 => 0.0,
        1 => points[0].t as f64,
        n => points[n - 2].t as f64,
    };
    for p in points {
        out.push(CanonicalPoint::new(
            p.x,
            p.y,
            p.z,
            p.intensity,
            p.ring,
            relative_time(p.t as f64, span_ns),
        ));
    }
    usable_span(span_ns) * 1e-9
}

fn normalize_robosense(points: &[RobosensePoint], out: &mut Vec<CanonicalPoint>) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => return 0.0,
    };
    let span = last - first;
    for p in points {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            continue;
        }
        out.push(CanonicalPoint::new(
            p.x,
            p.y,
            p.z,
            p.intensity,
            p.ring,
            relative_time(p.timestamp - first, span),
        ));
    }
    // Robosense stamps the message at the last return, so the header stamp
    // already marks the end of the scan.
    0.0
}
