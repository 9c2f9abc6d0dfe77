// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-scan feature extraction pipeline.
//!
//! [`FeatureExtractor`] owns every buffer the stages need and runs them
//! strictly in sequence for each scan:
//!
//! ```text
//! RawFrame ─► normalize ─► project ─► extract ─► smoothness ─► occlusion ─► classify
//!                │                       │                                     │
//!                ▼                       ▼                                     ▼
//!            ScanTime              ExtractedCloud                     corner / surface
//! ```
//!
//! All state except the configuration is reset at the start of each scan, so
//! processing the same frame twice yields identical results.

use crate::{
    buffer::ScanBuffers,
    config::ExtractorConfig,
    features::{FeatureClassifier, RingFeatureCount},
    lidar::Error,
    occlusion::mark_occluded_points,
    point::CanonicalPoint,
    projection::{ExtractedCloud, ProjectionParams},
    raw::{self, RawFrame, ScanTime},
    smoothness::calculate_smoothness,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Range image bookkeeping published alongside the feature clouds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudInfo {
    /// Scan start time in seconds.
    pub scan_start: f64,
    /// Scan end time in seconds.
    pub scan_end: f64,
    pub start_ring_index: Vec<i32>,
    pub end_ring_index: Vec<i32>,
    /// Range image column of each extracted point.
    pub point_col_ind: Vec<i32>,
    /// Range of each extracted point.
    pub point_range: Vec<f32>,
}

/// Results of one scan, borrowed from the extractor's buffers.
#[derive(Clone, Copy, Debug)]
pub struct ScanFeatures<'a> {
    pub time: ScanTime,
    pub corner: &'a [CanonicalPoint],
    pub surface: &'a [CanonicalPoint],
    /// Full extracted cloud with feature tags applied.
    pub cloud: &'a ExtractedCloud,
    pub ring_counts: &'a [RingFeatureCount],
}

impl ScanFeatures<'_> {
    /// Copy the range image bookkeeping into an owned [`CloudInfo`].
    pub fn cloud_info(&self) -> CloudInfo {
        CloudInfo {
            scan_start: self.time.start,
            scan_end: self.time.end,
            start_ring_index: self.cloud.start_ring_index.clone(),
            end_ring_index: self.cloud.end_ring_index.clone(),
            point_col_ind: self.cloud.column.clone(),
            point_range: self.cloud.range.clone(),
        }
    }
}

/// LOAM-style edge and surface feature extractor.
///
/// # Example
///
/// ```
/// use edgefirst_lidarfeat::{
///     config::ExtractorConfig,
///     extractor::FeatureExtractor,
///     raw::{RawFrame, RawPoints, VelodynePoint},
/// };
///
/// let mut extractor = FeatureExtractor::new(ExtractorConfig::default())?;
/// let points = (0..1800)
///     .map(|i| {
///         let a = (i as f32 * 0.2).to_radians();
///         VelodynePoint {
///             x: 10.0 * a.sin(),
///             y: 10.0 * a.cos(),
///             z: 0.0,
///             intensity: 1.0,
///             ring: 0,
///             time: i as f32 * 5.5e-5,
///         }
///     })
///     .collect();
///
/// let features = extractor.process(&RawFrame::new(12.5, RawPoints::Velodyne(points)))?;
/// assert!(features.corner.is_empty());
/// assert!(!features.surface.is_empty());
/// # Ok::<(), edgefirst_lidarfeat::Error>(())
/// ```
#[derive(Debug)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
    projection: ProjectionParams,
    buffers: ScanBuffers,
    classifier: FeatureClassifier,
}

impl FeatureExtractor {
    /// Validate `config` and allocate all per-scan buffers.
    pub fn new(config: ExtractorConfig) -> Result<Self, Error> {
        config.validate()?;

        let buffers = ScanBuffers::new(config.n_scan, config.horizon_scan);
        let classifier =
            FeatureClassifier::new(config.feature_params(), config.n_scan, buffers.capacity());

        Ok(Self {
            projection: config.projection_params(),
            config,
            buffers,
            classifier,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run the full pipeline on one scan.
    ///
    /// Fails only on configuration faults (see [`Error::is_fatal`]); degraded
    /// scans produce reduced output instead.
    #[instrument(skip_all, fields(stamp = frame.stamp))]
    pub fn process(&mut self, frame: &RawFrame) -> Result<ScanFeatures<'_>, Error> {
        self.buffers.clear();

        let ScanBuffers {
            input,
            image,
            cloud,
            curvature,
            smoothness,
            picked,
            ..
        } = &mut self.buffers;

        let time = raw::normalize(self.config.sensor, frame, input)?;

        image.project(input, &self.projection);
        image.extract(cloud);

        calculate_smoothness(&cloud.range, curvature, smoothness);

        picked.resize(cloud.len(), false);
        mark_occluded_points(&cloud.column, &cloud.range, picked);

        self.classifier.classify(cloud, curvature, smoothness, picked);

        let corners = self.classifier.corner().len();
        let surfaces = self.classifier.surface().len();
        debug!(
            input = input.len(),
            extracted = cloud.len(),
            corners,
            surfaces,
            "scan processed"
        );

        if corners < self.config.edge_feature_min_valid_num {
            warn!(
                "only {} edge features, expected at least {}",
                corners, self.config.edge_feature_min_valid_num
            );
        }
        if surfaces < self.config.surf_feature_min_valid_num {
            warn!(
                "only {} surface features, expected at least {}",
                surfaces, self.config.surf_feature_min_valid_num
            );
        }

        Ok(ScanFeatures {
            time,
            corner: self.classifier.corner(),
            surface: self.classifier.surface(),
            cloud: &self.buffers.cloud,
            ring_counts: self.classifier.ring_counts(),
        })
    }
}
