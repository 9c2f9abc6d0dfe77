// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Range image projection and per-ring cloud extraction.
//!
//! Canonical points are bucketed into a `rings × columns` grid. Each cell
//! keeps the first range written to it during a scan; later points landing in
//! an occupied cell are dropped. The surviving points are then compacted ring
//! by ring, in ascending column order, into an [`ExtractedCloud`].
//!
//! ```text
//!            column 0 ─────────────────────────────► columns-1
//!  ring 0   │ · r · · r r r · r r r r r · · r r r r r r r │
//!  ring 1   │ r r r r r r r r r r r r r r r r r r r r r r │
//!   ...
//!
//!  extracted: [ring 0 points ...][ring 1 points ...] ...
//!                ^start     ^end   (5-point margins excluded)
//! ```

use crate::{lidar::SensorType, point::CanonicalPoint};
use ndarray::Array2;
use tracing::{instrument, trace};

/// Range value marking an empty range image cell.
pub const EMPTY_RANGE: f32 = f32::MAX;

/// Points on each side of a point used by the smoothness window.
pub const HALF_WINDOW: usize = 5;

/// How a point's column in the range image is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Column is the per-ring emission counter; points arrive in angular
    /// order and no angle math is needed.
    Sequential,
    /// Column is derived from the horizontal angle `atan2(x, y)`.
    Azimuth,
}

impl From<SensorType> for ColumnPolicy {
    fn from(sensor: SensorType) -> Self {
        match sensor {
            SensorType::Livox => ColumnPolicy::Sequential,
            SensorType::Velodyne | SensorType::Ouster | SensorType::Robosense => {
                ColumnPolicy::Azimuth
            }
        }
    }
}

/// Range image geometry and validity limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionParams {
    /// Number of rings (rows).
    pub n_scan: usize,
    /// Number of columns per ring.
    pub horizon_scan: usize,
    /// Keep only rings whose index is a multiple of this factor.
    pub downsample_rate: usize,
    pub min_range: f32,
    pub max_range: f32,
    pub policy: ColumnPolicy,
}

/// Column for a point under the azimuth policy, before bounds checks.
///
/// The result is already wrapped once into `[0, horizon_scan)` for every
/// finite input, but callers must still bounds check it.
#[inline]
pub fn azimuth_column(x: f32, y: f32, horizon_scan: usize) -> i64 {
    let horizon_angle = x.atan2(y).to_degrees();
    let resolution = 360.0 / horizon_scan as f32;
    let mut column =
        (-((horizon_angle - 90.0) / resolution).round()) as i64 + (horizon_scan / 2) as i64;
    if column >= horizon_scan as i64 {
        column -= horizon_scan as i64;
    }
    column
}

/// Points compacted ring by ring with their range image bookkeeping.
///
/// `column` and `range` run parallel to `points`. For every ring,
/// `start_ring_index[ring]..=end_ring_index[ring]` is the span usable by the
/// smoothness window; rings with fewer than 11 points have an inverted span
/// (start > end) and must be skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedCloud {
    pub points: Vec<CanonicalPoint>,
    pub column: Vec<i32>,
    pub range: Vec<f32>,
    pub start_ring_index: Vec<i32>,
    pub end_ring_index: Vec<i32>,
}

impl ExtractedCloud {
    /// Create an empty cloud able to hold `capacity` points without
    /// reallocating.
    pub fn with_capacity(n_scan: usize, capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            column: Vec::with_capacity(capacity),
            range: Vec::with_capacity(capacity),
            start_ring_index: vec![0; n_scan],
            end_ring_index: vec![0; n_scan],
        }
    }

    /// Clear all points while retaining capacity.
    pub fn clear(&mut self) {
        self.points.clear();
        self.column.clear();
        self.range.clear();
        self.start_ring_index.fill(0);
        self.end_ring_index.fill(0);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of rings tracked by this cloud.
    pub fn rings(&self) -> usize {
        self.start_ring_index.len()
    }

    /// Usable span of `ring` as inclusive indices, `None` when inverted.
    pub fn ring_span(&self, ring: usize) -> Option<(usize, usize)> {
        let start = *self.start_ring_index.get(ring)?;
        let end = *self.end_ring_index.get(ring)?;
        if start > end {
            return None;
        }
        Some((start as usize, end as usize))
    }
}

/// Fixed-size range image with the point stored for each occupied cell.
#[derive(Clone, Debug)]
pub struct RangeImage {
    ranges: Array2<f32>,
    full_cloud: Vec<CanonicalPoint>,
    column_counts: Vec<usize>,
}

impl RangeImage {
    /// Allocate an empty `n_scan × horizon_scan` image.
    pub fn new(n_scan: usize, horizon_scan: usize) -> Self {
        Self {
            ranges: Array2::from_elem((n_scan, horizon_scan), EMPTY_RANGE),
            full_cloud: vec![CanonicalPoint::default(); n_scan * horizon_scan],
            column_counts: vec![0; n_scan],
        }
    }

    pub fn rows(&self) -> usize {
        self.ranges.nrows()
    }

    pub fn cols(&self) -> usize {
        self.ranges.ncols()
    }

    /// Mark every cell empty.
    ///
    /// The stored points are left in place; they are only read back for
    /// cells holding a range.
    pub fn reset(&mut self) {
        self.ranges.fill(EMPTY_RANGE);
        self.column_counts.fill(0);
    }

    /// Range stored at `(ring, column)`, `None` for empty or out of bounds.
    pub fn range(&self, ring: usize, column: usize) -> Option<f32> {
        match self.ranges.get((ring, column)) {
            Some(&r) if r != EMPTY_RANGE => Some(r),
            _ => None,
        }
    }

    /// Read-only view of the range grid.
    pub fn ranges(&self) -> &Array2<f32> {
        &self.ranges
    }

    /// Project points into the image in input order, returning how many
    /// were written.
    ///
    /// Points outside `[min_range, max_range]`, on rings outside the image or
    /// removed by ring decimation, or mapping outside the column range are
    /// dropped silently. The first point written to a cell wins.
    #[instrument(skip_all)]
    pub fn project(&mut self, points: &[CanonicalPoint], params: &ProjectionParams) -> usize {
        let rows = self.rows();
        let cols = self.cols();
        let rate = params.downsample_rate.max(1);
        let mut written = 0;

        for point in points {
            let range = point.range();
            if !(params.min_range..=params.max_range).contains(&range) {
                continue;
            }

            let row = point.ring as usize;
            if row >= rows || row % rate != 0 {
                continue;
            }

            let column = match params.policy {
                ColumnPolicy::Sequential => {
                    let count = self.column_counts[row];
                    if count >= cols {
                        continue;
                    }
                    self.column_counts[row] = count + 1;
                    count as i64
                }
                ColumnPolicy::Azimuth => azimuth_column(point.x, point.y, cols),
            };

            if column < 0 || column >= cols as i64 {
                continue;
            }
            let column = column as usize;

            let cell = &mut self.ranges[[row, column]];
            if *cell != EMPTY_RANGE {
                continue;
            }
            *cell = range;
            self.full_cloud[row * cols + column] = *point;
            written += 1;
        }

        trace!(input = points.len(), written, "projected");
        written
    }

    /// Compact occupied cells ring by ring into `cloud`.
    #[instrument(skip_all)]
    pub fn extract(&self, cloud: &mut ExtractedCloud) {
        let cols = self.cols();
        let margin = HALF_WINDOW as i32;

        cloud.clear();
        cloud.start_ring_index.resize(self.rows(), 0);
        cloud.end_ring_index.resize(self.rows(), 0);

        let mut count: i32 = 0;
        for (row, ranges) in self.ranges.outer_iter().enumerate() {
            cloud.start_ring_index[row] = count + margin;

            for (column, &range) in ranges.iter().enumerate() {
                if range == EMPTY_RANGE {
                    continue;
                }
                cloud.column.push(column as i32);
                cloud.range.push(range);
                cloud.points.push(self.full_cloud[row * cols + column]);
                count += 1;
            }

            cloud.end_ring_index[row] = count - 1 - margin;
        }

        trace!(points = cloud.len(), "extracted");
    }
}
