// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common LiDAR types shared by every stage of the feature pipeline.
//!
//! This module provides the crate error type and the closed set of sensor
//! kinds the normalizer understands.

use std::{fmt, str::FromStr};

/// Common error type for feature extraction.
///
/// Variants fall into two classes. Configuration faults (see
/// [`Error::is_fatal`]) mean the pipeline is misconfigured for the incoming
/// data and must stop. The remaining variants come from decoding and
/// configuration plumbing around the core.
///
/// Degraded scans (short rings, empty sectors, out-of-range points) are
/// never reported as errors.
#[derive(Debug)]
pub enum Error {
    /// Sensor name does not match any supported sensor kind
    UnknownSensor(String),
    /// Frame variant does not match the configured sensor kind
    SensorMismatch {
        expected: SensorType,
        found: SensorType,
    },
    /// Input schema carries no `ring` field
    MissingRingField,
    /// Point cloud contains invalid points for a sensor required to be dense
    NotDense(SensorType),
    /// Required point field is missing from the input schema
    MissingField(&'static str),
    /// Point field uses a datatype that cannot be decoded
    UnsupportedFieldType { name: String, datatype: u8 },
    /// Unexpected end of data at given byte position
    UnexpectedEnd(usize),
    /// Configuration error
    Config(String),
    /// CDR serialization error
    Cdr(String),
    /// I/O error (config file, socket operations)
    Io(std::io::Error),
}

impl Error {
    /// Returns true for configuration faults that must halt the pipeline.
    ///
    /// These are re-checked on every scan but can only be fixed by changing
    /// the sensor configuration, so no retry is meaningful.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnknownSensor(_)
                | Error::SensorMismatch { .. }
                | Error::MissingRingField
                | Error::NotDense(_)
        )
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownSensor(name) => write!(
                f,
                "invalid sensor type (must be one of 'velodyne', 'ouster', 'robosense' or 'livox'): {}",
                name
            ),
            Error::SensorMismatch { expected, found } => {
                write!(f, "sensor mismatch: configured {} but frame is {}", expected, found)
            }
            Error::MissingRingField => write!(
                f,
                "point cloud ring channel not available, please configure your point cloud data"
            ),
            Error::NotDense(sensor) => write!(
                f,
                "{} point cloud is not in dense format, please remove NaN points first",
                sensor
            ),
            Error::MissingField(name) => write!(f, "missing point field: {}", name),
            Error::UnsupportedFieldType { name, datatype } => {
                write!(f, "unsupported datatype {} for field {}", datatype, name)
            }
            Error::UnexpectedEnd(len) => write!(f, "unexpected end of data at {} bytes", len),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Cdr(msg) => write!(f, "cdr error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Supported LiDAR sensor kinds.
///
/// Each kind has its own per-point time field and semantics, handled by the
/// normalizer in [`crate::raw`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// Velodyne spinning LiDAR (`time` relative to scan start, seconds)
    #[default]
    Velodyne,
    /// Ouster OS series (`t` relative to scan start, nanoseconds)
    Ouster,
    /// Robosense (`timestamp` absolute, seconds)
    Robosense,
    /// Livox solid-state, points arrive in per-ring emission order
    Livox,
}

impl SensorType {
    /// All sensor kinds, in configuration order.
    pub const ALL: [SensorType; 4] = [
        SensorType::Velodyne,
        SensorType::Ouster,
        SensorType::Robosense,
        SensorType::Livox,
    ];

    /// Sensor kinds whose clouds must arrive dense (no NaN returns).
    ///
    /// Robosense clouds are filtered for non-finite points during
    /// normalization instead.
    pub fn requires_dense(self) -> bool {
        !matches!(self, SensorType::Robosense)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorType::Velodyne => write!(f, "velodyne"),
            SensorType::Ouster => write!(f, "ouster"),
            SensorType::Robosense => write!(f, "robosense"),
            SensorType::Livox => write!(f, "livox"),
        }
    }
}

impl FromStr for SensorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "velodyne" => Ok(SensorType::Velodyne),
            "ouster" => Ok(SensorType::Ouster),
            "robosense" => Ok(SensorType::Robosense),
            "livox" => Ok(SensorType::Livox),
            _ => Err(Error::UnknownSensor(s.to_string())),
        }
    }
}
