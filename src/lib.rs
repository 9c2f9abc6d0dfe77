// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! EdgeFirst LiDAR Feature Extraction Library
//!
//! This library turns one raw LiDAR scan into LOAM-style edge and surface
//! features for a downstream odometry and mapping stage.
//!
//! # Architecture
//!
//! Stages run strictly in sequence over buffers owned by the extractor and
//! reused for every scan:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  raw         │──►│  projection  │──►│  smoothness  │──►│  occlusion   │
//! │  (normalize) │   │  (range img) │   │  (curvature) │   │  (picked)    │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!                                                                 │
//!                    ┌──────────────┐   ┌──────────────┐          │
//!                    │  voxel       │◄──│  features    │◄─────────┘
//!                    │  (surface ds)│   │  (classify)  │
//!                    └──────────────┘   └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`extractor`]: Pipeline driver owning all per-scan state
//! - [`config`]: Extractor parameters
//! - [`lidar`]: Error handling and sensor kinds
//! - [`raw`]: Sensor-specific raw frames and the point normalizer
//! - [`projection`]: Range image and per-ring extraction
//! - [`smoothness`]: Scan-line curvature
//! - [`occlusion`]: Occluded and parallel-beam marking
//! - [`features`]: Edge/surface classification
//! - [`voxel`]: Voxel grid downsampling
//! - [`pointcloud`]: PointCloud2 decode/encode
//! - [`buffer`]: Preallocated scan buffers
//! - [`common`]: Shared utilities (priority)
//!
//! # Example
//!
//! ```ignore
//! use edgefirst_lidarfeat::{ExtractorConfig, FeatureExtractor, pointcloud};
//!
//! let config = ExtractorConfig::from_json_file("lidarfeat.json")?;
//! let mut extractor = FeatureExtractor::new(config.clone())?;
//!
//! let frame = pointcloud::decode_raw_frame(config.sensor, &msg)?;
//! let features = extractor.process(&frame)?;
//! println!("{} edges, {} surfaces", features.corner.len(), features.surface.len());
//! ```

pub mod buffer;
pub mod common;
pub mod config;
pub mod extractor;
pub mod features;
pub mod lidar;
pub mod occlusion;
pub mod point;
pub mod pointcloud;
pub mod projection;
pub mod raw;
pub mod smoothness;
pub mod voxel;

// Re-exports for convenience
pub use config::ExtractorConfig;
pub use extractor::{CloudInfo, FeatureExtractor, ScanFeatures};
pub use lidar::{Error, SensorType};
pub use point::{CanonicalPoint, FeatureTag};
pub use pointcloud::PointFieldType;
pub use raw::{RawFrame, RawPoints};
