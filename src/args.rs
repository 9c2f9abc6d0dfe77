// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_lidarfeat::{Error, ExtractorConfig, SensorType};
use serde_json::json;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use zenoh::config::{Config, WhatAmI};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// LiDAR sensor kind: velodyne, ouster, robosense or livox.
    #[arg(long, env, default_value = "velodyne")]
    pub sensor: String,

    /// JSON extractor configuration. When given, it replaces the extractor
    /// options below; `--sensor` still applies.
    #[arg(long, env)]
    pub config: Option<PathBuf>,

    /// Number of LiDAR rings
    #[arg(long, env, default_value = "16")]
    pub n_scan: usize,

    /// Number of range image columns per ring
    #[arg(long, env, default_value = "1800")]
    pub horizon_scan: usize,

    /// Keep only rings whose index is a multiple of this factor
    #[arg(long, env, default_value = "1")]
    pub downsample_rate: usize,

    /// Minimum point range in meters
    #[arg(long, env, default_value = "1.0")]
    pub lidar_min_range: f32,

    /// Maximum point range in meters
    #[arg(long, env, default_value = "1000.0")]
    pub lidar_max_range: f32,

    /// Curvature above which points may become edge features
    #[arg(long, env, default_value = "0.1")]
    pub edge_threshold: f32,

    /// Curvature below which points may become surface features
    #[arg(long, env, default_value = "0.1")]
    pub surf_threshold: f32,

    /// Warn when a scan yields fewer edge features
    #[arg(long, env, default_value = "10")]
    pub edge_feature_min_valid_num: usize,

    /// Warn when a scan yields fewer surface features
    #[arg(long, env, default_value = "100")]
    pub surf_feature_min_valid_num: usize,

    /// Voxel size for surface feature downsampling, in meters
    #[arg(long, env, default_value = "0.2")]
    pub odometry_surface_leaf_size: f32,

    /// raw point cloud topic
    #[arg(long, env, default_value = "rt/points_raw")]
    pub points_topic: String,

    /// edge feature topic
    #[arg(long, env, default_value = "rt/lidar/edge")]
    pub edge_topic: String,

    /// surface feature topic
    #[arg(long, env, default_value = "rt/lidar/surface")]
    pub surface_topic: String,

    /// extracted point cloud topic
    #[arg(long, env, default_value = "rt/lidar/filtered")]
    pub filtered_topic: String,

    /// cloud info topic
    #[arg(long, env, default_value = "rt/lidar/cloud_info")]
    pub cloud_info_topic: String,

    /// The name of the lidar frame
    #[arg(long, env, default_value = "lidar")]
    pub frame_id: String,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,

    /// zenoh connection mode
    #[arg(long, env, default_value = "peer")]
    mode: WhatAmI,

    /// connect to zenoh endpoints
    #[arg(long, env)]
    connect: Vec<String>,

    /// listen to zenoh endpoints
    #[arg(long, env)]
    listen: Vec<String>,

    /// disable zenoh multicast scouting
    #[arg(long, env)]
    no_multicast_scouting: bool,
}

impl Args {
    /// Build the validated extractor configuration.
    ///
    /// An unknown sensor name is a fatal [`Error::UnknownSensor`].
    pub fn extractor_config(&self) -> Result<ExtractorConfig, Error> {
        let sensor: SensorType = self.sensor.parse()?;

        let config = match &self.config {
            Some(path) => ExtractorConfig {
                sensor,
                ..ExtractorConfig::from_json_file(path)?
            },
            None => ExtractorConfig {
                sensor,
                n_scan: self.n_scan,
                horizon_scan: self.horizon_scan,
                downsample_rate: self.downsample_rate,
                min_range: self.lidar_min_range,
                max_range: self.lidar_max_range,
                edge_threshold: self.edge_threshold,
                surf_threshold: self.surf_threshold,
                edge_feature_min_valid_num: self.edge_feature_min_valid_num,
                surf_feature_min_valid_num: self.surf_feature_min_valid_num,
                surf_leaf_size: self.odometry_surface_leaf_size,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<&Args> for Config {
    type Error = zenoh::Error;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut config = Config::default();

        config.insert_json5("mode", &json!(args.mode).to_string())?;

        if !args.connect.is_empty() {
            config.insert_json5("connect/endpoints", &json!(args.connect).to_string())?;
        }

        if !args.listen.is_empty() {
            config.insert_json5("listen/endpoints", &json!(args.listen).to_string())?;
        }

        if args.no_multicast_scouting {
            config.insert_json5("scouting/multicast/enabled", &json!(false).to_string())?;
        }

        config.insert_json5("scouting/multicast/interface", &json!("lo").to_string())?;

        Ok(config)
    }
}
