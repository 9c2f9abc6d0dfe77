// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Canonical point representation shared by all pipeline stages.

/// Feature classification recorded on a point for output bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeatureTag {
    #[default]
    None = 0,
    Corner = 1,
    Surface = 2,
}

impl From<FeatureTag> for u8 {
    fn from(tag: FeatureTag) -> u8 {
        tag as u8
    }
}

impl TryFrom<u8> for FeatureTag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FeatureTag::None),
            1 => Ok(FeatureTag::Corner),
            2 => Ok(FeatureTag::Surface),
            other => Err(other),
        }
    }
}

/// Sensor-agnostic LiDAR return produced by the normalizer.
///
/// `time` is the point's position within the scan, normalized by the scan
/// span so that it lies in `[0, 1]` for well-formed frames. Frames whose
/// span cannot be determined report `0.0` for every point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CanonicalPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    /// Scan line (laser ring) the point was measured on.
    pub ring: u16,
    /// Relative intra-scan time.
    pub time: f32,
    pub tag: FeatureTag,
}

impl CanonicalPoint {
    pub fn new(x: f32, y: f32, z: f32, intensity: f32, ring: u16, time: f32) -> Self {
        Self {
            x,
            y,
            z,
            intensity,
            ring,
            time,
            tag: FeatureTag::None,
        }
    }

    /// Euclidean distance from the sensor origin.
    #[inline]
    pub fn range(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True when all three coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
