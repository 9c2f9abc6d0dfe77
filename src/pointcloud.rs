// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! PointCloud2 decoding and encoding.
//!
//! Incoming `sensor_msgs/PointCloud2` scans are decoded into a [`RawFrame`]
//! of the configured sensor kind by looking fields up by name. Feature clouds
//! are packed into a fixed 24-byte little-endian layout.
//!
//! # Formats
//!
//! ## Feature point (24 bytes)
//! ```text
//! ┌───────┬───────┬───────┬───────────┬──────────┬──────────┬────────┬─────┐
//! │ x:f32 │ y:f32 │ z:f32 │ intensity │ time:f32 │ ring:u16 │ tag:u8 │ pad │
//! │ 4B    │ 4B    │ 4B    │ 4B f32    │ 4B       │ 2B       │ 1B     │ 1B  │
//! └───────┴───────┴───────┴───────────┴──────────┴──────────┴────────┴─────┘
//! ```
//!
//! ## Input fields per sensor
//!
//! | sensor          | time field  | time type              |
//! |-----------------|-------------|------------------------|
//! | velodyne, livox | `time`      | seconds from start     |
//! | ouster          | `t`         | nanoseconds from start |
//! | robosense       | `timestamp` | absolute seconds       |

use crate::{
    extractor::CloudInfo,
    lidar::{Error, SensorType},
    point::CanonicalPoint,
    raw::{OusterPoint, RawFrame, RawPoints, RobosensePoint, VelodynePoint},
};
use edgefirst_schemas::{
    builtin_interfaces::Time,
    sensor_msgs::{PointCloud2, PointField},
    std_msgs::Header,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Byte stride of an encoded feature point.
pub const FEATURE_POINT_STEP: usize = 24;

/// Point field data types for PointCloud2 messages.
///
/// These values correspond to the ROS sensor_msgs/PointField datatype field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PointFieldType {
    INT8 = 1,
    UINT8 = 2,
    INT16 = 3,
    UINT16 = 4,
    INT32 = 5,
    UINT32 = 6,
    FLOAT32 = 7,
    FLOAT64 = 8,
}

impl PointFieldType {
    /// Size in bytes of one value.
    pub fn size(self) -> usize {
        match self {
            PointFieldType::INT8 | PointFieldType::UINT8 => 1,
            PointFieldType::INT16 | PointFieldType::UINT16 => 2,
            PointFieldType::INT32 | PointFieldType::UINT32 | PointFieldType::FLOAT32 => 4,
            PointFieldType::FLOAT64 => 8,
        }
    }
}

impl TryFrom<u8> for PointFieldType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => PointFieldType::INT8,
            2 => PointFieldType::UINT8,
            3 => PointFieldType::INT16,
            4 => PointFieldType::UINT16,
            5 => PointFieldType::INT32,
            6 => PointFieldType::UINT32,
            7 => PointFieldType::FLOAT32,
            8 => PointFieldType::FLOAT64,
            other => return Err(other),
        })
    }
}

/// Convert a message stamp to seconds.
pub fn time_to_secs(time: &Time) -> f64 {
    time.sec as f64 + time.nanosec as f64 / 1e9
}

/// Convert seconds to a message stamp, flooring to whole seconds.
pub fn secs_to_time(secs: f64) -> Time {
    let sec = secs.floor();
    let nanosec = ((secs - sec) * 1e9).round().min(999_999_999.0);
    Time {
        sec: sec as i32,
        nanosec: nanosec as u32,
    }
}

/// Location and type of one named field within a point record.
#[derive(Debug, Clone, Copy)]
struct FieldSlot {
    offset: usize,
    datatype: PointFieldType,
}

impl FieldSlot {
    fn find(fields: &[PointField], name: &str) -> Result<Option<Self>, Error> {
        let Some(field) = fields.iter().find(|f| f.name == name) else {
            return Ok(None);
        };
        let datatype = PointFieldType::try_from(field.datatype).map_err(|datatype| {
            Error::UnsupportedFieldType {
                name: field.name.clone(),
                datatype,
            }
        })?;
        Ok(Some(FieldSlot {
            offset: field.offset as usize,
            datatype,
        }))
    }

    fn require(fields: &[PointField], name: &'static str) -> Result<Self, Error> {
        Self::find(fields, name)?.ok_or(Error::MissingField(name))
    }

    /// Read the value at this slot of `point` widened to f64.
    fn read(&self, point: &[u8], big_endian: bool) -> Result<f64, Error> {
        let start = self.offset;
        let end = start + self.datatype.size();
        let bytes = point.get(start..end).ok_or(Error::UnexpectedEnd(end))?;

        macro_rules! num {
            ($ty:ty) => {{
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                if big_endian {
                    <$ty>::from_be_bytes(raw) as f64
                } else {
                    <$ty>::from_le_bytes(raw) as f64
                }
            }};
        }

        Ok(match self.datatype {
            PointFieldType::INT8 => num!(i8),
            PointFieldType::UINT8 => num!(u8),
            PointFieldType::INT16 => num!(i16),
            PointFieldType::UINT16 => num!(u16),
            PointFieldType::INT32 => num!(i32),
            PointFieldType::UINT32 => num!(u32),
            PointFieldType::FLOAT32 => num!(f32),
            PointFieldType::FLOAT64 => num!(f64),
        })
    }
}

/// Field slots common to every sensor kind.
struct CommonSlots {
    x: FieldSlot,
    y: FieldSlot,
    z: FieldSlot,
    intensity: Option<FieldSlot>,
    ring: FieldSlot,
    time: Option<FieldSlot>,
}

impl CommonSlots {
    fn new(fields: &[PointField], time_field: &'static str) -> Result<Self, Error> {
        Ok(Self {
            x: FieldSlot::require(fields, "x")?,
            y: FieldSlot::require(fields, "y")?,
            z: FieldSlot::require(fields, "z")?,
            intensity: FieldSlot::find(fields, "intensity")?,
            ring: FieldSlot::find(fields, "ring")?.ok_or(Error::MissingRingField)?,
            time: FieldSlot::find(fields, time_field)?,
        })
    }

    fn read_optional(slot: Option<FieldSlot>, point: &[u8], be: bool) -> Result<f64, Error> {
        match slot {
            Some(slot) => slot.read(point, be),
            None => Ok(0.0),
        }
    }
}

/// Name of the per-point time field for `sensor`.
pub fn time_field(sensor: SensorType) -> &'static str {
    match sensor {
        SensorType::Velodyne | SensorType::Livox => "time",
        SensorType::Ouster => "t",
        SensorType::Robosense => "timestamp",
    }
}

/// Decode a PointCloud2 message into a raw frame of `sensor`.
///
/// A missing `ring` field fails with [`Error::MissingRingField`]. A missing
/// time or intensity field decodes as zero.
#[instrument(skip_all, fields(sensor = %sensor))]
pub fn decode_raw_frame(sensor: SensorType, msg: &PointCloud2) -> Result<RawFrame, Error> {
    let slots = CommonSlots::new(&msg.fields, time_field(sensor))?;

    let n_points = msg.width as usize * msg.height as usize;
    let step = msg.point_step as usize;
    let needed = n_points * step;
    if msg.data.len() < needed {
        return Err(Error::UnexpectedEnd(msg.data.len()));
    }

    let be = msg.is_bigendian;
    let records = (0..n_points).map(|i| &msg.data[i * step..(i + 1) * step]);

    let points = match sensor {
        SensorType::Velodyne | SensorType::Livox => {
            let mut points = Vec::with_capacity(n_points);
            for p in records {
                points.push(VelodynePoint {
                    x: slots.x.read(p, be)? as f32,
                    y: slots.y.read(p, be)? as f32,
                    z: slots.z.read(p, be)? as f32,
                    intensity: CommonSlots::read_optional(slots.intensity, p, be)? as f32,
                    ring: slots.ring.read(p, be)? as u16,
                    time: CommonSlots::read_optional(slots.time, p, be)? as f32,
                });
            }
            if sensor == SensorType::Livox {
                RawPoints::Livox(points)
            } else {
                RawPoints::Velodyne(points)
            }
        }
        SensorType::Ouster => {
            let mut points = Vec::with_capacity(n_points);
            for p in records {
                points.push(OusterPoint {
                    x: slots.x.read(p, be)? as f32,
                    y: slots.y.read(p, be)? as f32,
                    z: slots.z.read(p, be)? as f32,
                    intensity: CommonSlots::read_optional(slots.intensity, p, be)? as f32,
                    t: CommonSlots::read_optional(slots.time, p, be)? as u32,
                    ring: slots.ring.read(p, be)? as u16,
                });
            }
            RawPoints::Ouster(points)
        }
        SensorType::Robosense => {
            let mut points = Vec::with_capacity(n_points);
            for p in records {
                points.push(RobosensePoint {
                    x: slots.x.read(p, be)? as f32,
                    y: slots.y.read(p, be)? as f32,
                    z: slots.z.read(p, be)? as f32,
                    intensity: CommonSlots::read_optional(slots.intensity, p, be)? as f32,
                    ring: slots.ring.read(p, be)? as u16,
                    timestamp: CommonSlots::read_optional(slots.time, p, be)?,
                });
            }
            RawPoints::Robosense(points)
        }
    };

    Ok(RawFrame {
        stamp: time_to_secs(&msg.header.stamp),
        is_dense: msg.is_dense,
        fields: msg.fields.iter().map(|f| f.name.clone()).collect(),
        points,
    })
}

/// Build the feature point fields (24-byte stride).
pub fn feature_point_fields() -> Vec<PointField> {
    let field = |name: &str, offset: u32, datatype: PointFieldType| PointField {
        name: String::from(name),
        offset,
        datatype: datatype as u8,
        count: 1,
    };
    vec![
        field("x", 0, PointFieldType::FLOAT32),
        field("y", 4, PointFieldType::FLOAT32),
        field("z", 8, PointFieldType::FLOAT32),
        field("intensity", 12, PointFieldType::FLOAT32),
        field("time", 16, PointFieldType::FLOAT32),
        field("ring", 20, PointFieldType::UINT16),
        field("tag", 22, PointFieldType::UINT8),
    ]
}

/// Pack points into a pre-allocated buffer.
///
/// # Panics
///
/// Panics if `out` is smaller than `24 * points.len()` bytes.
pub fn format_feature_points_into(points: &[CanonicalPoint], out: &mut [u8]) {
    assert!(out.len() >= FEATURE_POINT_STEP * points.len());

    for (p, record) in points.iter().zip(out.chunks_exact_mut(FEATURE_POINT_STEP)) {
        record[0..4].copy_from_slice(&p.x.to_le_bytes());
        record[4..8].copy_from_slice(&p.y.to_le_bytes());
        record[8..12].copy_from_slice(&p.z.to_le_bytes());
        record[12..16].copy_from_slice(&p.intensity.to_le_bytes());
        record[16..20].copy_from_slice(&p.time.to_le_bytes());
        record[20..22].copy_from_slice(&p.ring.to_le_bytes());
        record[22] = u8::from(p.tag);
        record[23] = 0;
    }
}

/// Encode points as a dense, unorganized PointCloud2.
#[instrument(skip_all, fields(n = points.len()))]
pub fn encode_cloud(points: &[CanonicalPoint], stamp: Time, frame_id: &str) -> PointCloud2 {
    let mut data = vec![0u8; FEATURE_POINT_STEP * points.len()];
    format_feature_points_into(points, &mut data);

    PointCloud2 {
        header: Header {
            stamp,
            frame_id: frame_id.to_string(),
        },
        height: 1,
        width: points.len() as u32,
        fields: feature_point_fields(),
        is_bigendian: false,
        point_step: FEATURE_POINT_STEP as u32,
        row_step: (FEATURE_POINT_STEP * points.len()) as u32,
        data,
        is_dense: true,
    }
}

/// Decode a cloud produced by [`encode_cloud`].
pub fn decode_feature_cloud(msg: &PointCloud2) -> Result<Vec<CanonicalPoint>, Error> {
    let n_points = msg.width as usize * msg.height as usize;
    let step = msg.point_step as usize;
    if step < FEATURE_POINT_STEP || msg.data.len() < n_points * step {
        return Err(Error::UnexpectedEnd(msg.data.len()));
    }

    let f32_at = |r: &[u8], at: usize| f32::from_le_bytes([r[at], r[at + 1], r[at + 2], r[at + 3]]);

    Ok(msg
        .data
        .chunks_exact(step)
        .take(n_points)
        .map(|r| CanonicalPoint {
            x: f32_at(r, 0),
            y: f32_at(r, 4),
            z: f32_at(r, 8),
            intensity: f32_at(r, 12),
            time: f32_at(r, 16),
            ring: u16::from_le_bytes([r[20], r[21]]),
            tag: r[22].try_into().unwrap_or_default(),
        })
        .collect())
}

/// Per-scan metadata message published next to the feature clouds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudInfoMsg {
    pub header: Header,
    pub scan_end: Time,
    pub start_ring_index: Vec<i32>,
    pub end_ring_index: Vec<i32>,
    pub point_col_ind: Vec<i32>,
    pub point_range: Vec<f32>,
    pub cloud_corner: PointCloud2,
    pub cloud_surface: PointCloud2,
}

impl CloudInfoMsg {
    pub const SCHEMA: &'static str = "lidar_msgs/msg/CloudInfo";

    pub fn new(
        info: CloudInfo,
        frame_id: &str,
        cloud_corner: PointCloud2,
        cloud_surface: PointCloud2,
    ) -> Self {
        Self {
            header: Header {
                stamp: secs_to_time(info.scan_start),
                frame_id: frame_id.to_string(),
            },
            scan_end: secs_to_time(info.scan_end),
            start_ring_index: info.start_ring_index,
            end_ring_index: info.end_ring_index,
            point_col_ind: info.point_col_ind,
            point_range: info.point_range,
            cloud_corner,
            cloud_surface,
        }
    }
}
