// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Feature extractor configuration.
//!
//! The configuration is fixed for the lifetime of a
//! [`FeatureExtractor`](crate::extractor::FeatureExtractor). It can be built
//! in code, deserialized from JSON (missing keys take their defaults), or
//! assembled by the node from command line arguments.
//!
//! ```
//! use edgefirst_lidarfeat::{config::ExtractorConfig, lidar::SensorType};
//!
//! let config = ExtractorConfig::from_json_str(r#"{ "sensor": "ouster", "n_scan": 64 }"#)?;
//! assert_eq!(config.sensor, SensorType::Ouster);
//! assert_eq!(config.n_scan, 64);
//! assert_eq!(config.horizon_scan, 1800);
//! # Ok::<(), edgefirst_lidarfeat::Error>(())
//! ```

use crate::{
    features::FeatureParams,
    lidar::{Error, SensorType},
    projection::{ColumnPolicy, ProjectionParams},
};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};

/// Parameters of the feature extraction pipeline.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub sensor: SensorType,
    /// Number of rings of the range image.
    pub n_scan: usize,
    /// Number of columns of the range image.
    pub horizon_scan: usize,
    /// Keep only rings whose index is a multiple of this factor.
    pub downsample_rate: usize,
    /// Minimum accepted range (meters).
    pub min_range: f32,
    /// Maximum accepted range (meters).
    pub max_range: f32,
    pub edge_threshold: f32,
    pub surf_threshold: f32,
    /// Advisory minimum number of edge features per scan.
    pub edge_feature_min_valid_num: usize,
    /// Advisory minimum number of surface features per scan.
    pub surf_feature_min_valid_num: usize,
    /// Voxel size for surface downsampling (meters).
    pub surf_leaf_size: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sensor: SensorType::Velodyne,
            n_scan: 16,
            horizon_scan: 1800,
            downsample_rate: 1,
            min_range: 1.0,
            max_range: 1000.0,
            edge_threshold: 0.1,
            surf_threshold: 0.1,
            edge_feature_min_valid_num: 10,
            surf_feature_min_valid_num: 100,
            surf_leaf_size: 0.2,
        }
    }
}

impl ExtractorConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters describe a usable pipeline.
    pub fn validate(&self) -> Result<(), Error> {
        if self.n_scan == 0 {
            return Err(Error::Config("n_scan must be > 0".to_string()));
        }
        if self.n_scan > u16::MAX as usize + 1 {
            return Err(Error::Config(format!(
                "n_scan {} exceeds the ring field range",
                self.n_scan
            )));
        }
        if self.horizon_scan == 0 {
            return Err(Error::Config("horizon_scan must be > 0".to_string()));
        }
        let cells = self.n_scan.checked_mul(self.horizon_scan);
        if cells.is_none_or(|n| n > i32::MAX as usize / 6) {
            return Err(Error::Config(format!(
                "range image {}x{} is too large",
                self.n_scan, self.horizon_scan
            )));
        }
        if self.downsample_rate == 0 {
            return Err(Error::Config("downsample_rate must be > 0".to_string()));
        }
        if !(self.min_range.is_finite() && self.max_range.is_finite()) {
            return Err(Error::Config("range limits must be finite".to_string()));
        }
        if self.min_range > self.max_range {
            return Err(Error::Config(format!(
                "min_range {} is greater than max_range {}",
                self.min_range, self.max_range
            )));
        }
        if !self.surf_leaf_size.is_finite() || self.surf_leaf_size <= 0.0 {
            return Err(Error::Config(format!(
                "surf_leaf_size must be > 0, got {}",
                self.surf_leaf_size
            )));
        }
        if self.edge_threshold.is_nan() || self.surf_threshold.is_nan() {
            return Err(Error::Config("thresholds must not be NaN".to_string()));
        }
        Ok(())
    }

    pub fn projection_params(&self) -> ProjectionParams {
        ProjectionParams {
            n_scan: self.n_scan,
            horizon_scan: self.horizon_scan,
            downsample_rate: self.downsample_rate,
            min_range: self.min_range,
            max_range: self.max_range,
            policy: ColumnPolicy::from(self.sensor),
        }
    }

    pub fn feature_params(&self) -> FeatureParams {
        FeatureParams {
            edge_threshold: self.edge_threshold,
            surf_threshold: self.surf_threshold,
            surf_leaf_size: self.surf_leaf_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.sensor, SensorType::Velodyne);
        assert_eq!(config.n_scan, 16);
        assert_eq!(config.horizon_scan, 1800);
        assert_eq!(config.downsample_rate, 1);
        assert_eq!(config.min_range, 1.0);
        assert_eq!(config.max_range, 1000.0);
        assert_eq!(config.edge_threshold, 0.1);
        assert_eq!(config.surf_threshold, 0.1);
        assert_eq!(config.edge_feature_min_valid_num, 10);
        assert_eq!(config.surf_feature_min_valid_num, 100);
        assert_eq!(config.surf_leaf_size, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_partial() {
        let config = ExtractorConfig::from_json_str(
            r#"{ "sensor": "livox", "n_scan": 6, "horizon_scan": 4000, "surf_leaf_size": 0.4 }"#,
        )
        .unwrap();
        assert_eq!(config.sensor, SensorType::Livox);
        assert_eq!(config.n_scan, 6);
        assert_eq!(config.horizon_scan, 4000);
        assert_eq!(config.surf_leaf_size, 0.4);
        assert_eq!(config.max_range, 1000.0);
        assert_eq!(config.projection_params().policy, ColumnPolicy::Sequential);
    }

    #[test]
    fn test_json_unknown_sensor() {
        let err = ExtractorConfig::from_json_str(r#"{ "sensor": "hesai" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{:?}", err);
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            ExtractorConfig {
                n_scan: 0,
                ..Default::default()
            },
            ExtractorConfig {
                horizon_scan: 0,
                ..Default::default()
            },
            ExtractorConfig {
                downsample_rate: 0,
                ..Default::default()
            },
            ExtractorConfig {
                min_range: 10.0,
                max_range: 5.0,
                ..Default::default()
            },
            ExtractorConfig {
                surf_leaf_size: 0.0,
                ..Default::default()
            },
            ExtractorConfig {
                surf_leaf_size: f32::NAN,
                ..Default::default()
            },
            ExtractorConfig {
                edge_threshold: f32::NAN,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "accepted {:?}",
                config
            );
        }
    }

    #[test]
    fn test_params_mapping() {
        let config = ExtractorConfig {
            sensor: SensorType::Ouster,
            n_scan: 64,
            horizon_scan: 1024,
            edge_threshold: 1.0,
            ..Default::default()
        };
        let projection = config.projection_params();
        assert_eq!(projection.n_scan, 64);
        assert_eq!(projection.horizon_scan, 1024);
        assert_eq!(projection.policy, ColumnPolicy::Azimuth);

        let features = config.feature_params();
        assert_eq!(features.edge_threshold, 1.0);
        assert_eq!(features.surf_leaf_size, 0.2);
    }

    #[test]
    fn test_missing_file() {
        let err = ExtractorConfig::from_json_file("/nonexistent/lidarfeat.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
