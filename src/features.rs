// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Edge and surface feature selection.
//!
//! Each ring's usable span is split into [`SECTORS`] contiguous sectors so
//! that features spread around the full sweep. Within a sector:
//!
//! 1. Records are sorted by curvature.
//! 2. **Edges**: highest curvature first, up to [`MAX_CORNERS_PER_SECTOR`]
//!    unpicked points above `edge_threshold` are accepted.
//! 3. **Surfaces**: lowest curvature first, unpicked points below
//!    `surf_threshold` are labelled surface.
//! 4. Every point of the sector that is not an edge is a surface candidate.
//!
//! Each accepted point suppresses up to [`NEIGHBOR_RADIUS`] neighbours on
//! both sides; suppression stops at the first column gap larger than
//! [`NEIGHBOR_COLUMN_GAP`], which separates different physical surfaces.
//! Surface candidates are voxel-downsampled per ring.

use crate::{
    point::{CanonicalPoint, FeatureTag},
    projection::ExtractedCloud,
    smoothness::{Smoothness, record_position},
    voxel::VoxelGrid,
};
use tracing::{instrument, trace};

/// Sectors per ring.
pub const SECTORS: i64 = 6;

/// Maximum edge features accepted in one sector.
pub const MAX_CORNERS_PER_SECTOR: usize = 20;

/// Neighbours suppressed on each side of an accepted feature.
pub const NEIGHBOR_RADIUS: usize = 5;

/// Column gap that stops neighbour suppression.
pub const NEIGHBOR_COLUMN_GAP: i32 = 10;

/// Classification thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureParams {
    /// Curvature above which a point may become an edge.
    pub edge_threshold: f32,
    /// Curvature below which a point may become a surface.
    pub surf_threshold: f32,
    /// Voxel size for surface downsampling (meters).
    pub surf_leaf_size: f32,
}

/// Per-point classification state for one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Label {
    #[default]
    None,
    Corner,
    Surface,
}

/// Number of features a ring contributed to the scan outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingFeatureCount {
    pub corners: usize,
    /// Surface points after downsampling.
    pub surfaces: usize,
}

/// Inclusive bounds `(sp, ep)` of `sector` within the span `start..=end`.
///
/// Bounds use truncating integer division so consecutive sectors tile the
/// span without overlap; `ep` of the last sector is `end − 1`. A sector with
/// `sp >= ep` is empty.
#[inline]
pub fn sector_bounds(start: i64, end: i64, sector: i64) -> (i64, i64) {
    let sp = (start * (SECTORS - sector) + end * sector) / SECTORS;
    let ep = (start * (SECTORS - 1 - sector) + end * (sector + 1)) / SECTORS - 1;
    (sp, ep)
}

/// Mark `index` and its neighbours picked, stopping at column gaps.
pub fn suppress_neighbors(index: usize, column: &[i32], picked: &mut [bool]) {
    picked[index] = true;

    for l in 1..=NEIGHBOR_RADIUS {
        let next = index + l;
        if next >= column.len() {
            break;
        }
        if (column[next] - column[next - 1]).abs() > NEIGHBOR_COLUMN_GAP {
            break;
        }
        picked[next] = true;
    }

    for l in 1..=NEIGHBOR_RADIUS {
        if l > index {
            break;
        }
        let prev = index - l;
        if (column[prev] - column[prev + 1]).abs() > NEIGHBOR_COLUMN_GAP {
            break;
        }
        picked[prev] = true;
    }
}

/// Edge/surface classifier owning the scan's feature outputs.
#[derive(Clone, Debug)]
pub struct FeatureClassifier {
    params: FeatureParams,
    voxel: VoxelGrid,
    label: Vec<Label>,
    corner: Vec<CanonicalPoint>,
    surface: Vec<CanonicalPoint>,
    ring_surface: Vec<CanonicalPoint>,
    ring_surface_ds: Vec<CanonicalPoint>,
    ring_counts: Vec<RingFeatureCount>,
}

impl FeatureClassifier {
    /// Create a classifier whose buffers can hold `capacity` points.
    pub fn new(params: FeatureParams, n_scan: usize, capacity: usize) -> Self {
        Self {
            params,
            voxel: VoxelGrid::new(params.surf_leaf_size),
            label: Vec::with_capacity(capacity),
            corner: Vec::with_capacity(capacity),
            surface: Vec::with_capacity(capacity),
            ring_surface: Vec::with_capacity(capacity),
            ring_surface_ds: Vec::with_capacity(capacity),
            ring_counts: vec![RingFeatureCount::default(); n_scan],
        }
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Clear all outputs from the previous scan.
    pub fn reset(&mut self) {
        self.label.clear();
        self.corner.clear();
        self.surface.clear();
        self.ring_surface.clear();
        self.ring_surface_ds.clear();
        self.ring_counts.fill(RingFeatureCount::default());
    }

    /// Edge features of the last classified scan.
    pub fn corner(&self) -> &[CanonicalPoint] {
        &self.corner
    }

    /// Downsampled surface features of the last classified scan.
    pub fn surface(&self) -> &[CanonicalPoint] {
        &self.surface
    }

    /// Per-point labels of the last classified scan.
    pub fn labels(&self) -> &[Label] {
        &self.label
    }

    /// Per-ring feature counts of the last classified scan.
    pub fn ring_counts(&self) -> &[RingFeatureCount] {
        &self.ring_counts
    }

    /// Classify `cloud` into edge and surface features.
    ///
    /// `picked` is the reliability flag array already populated by occlusion
    /// marking; it is extended in place. Tags of selected points are written
    /// back into `cloud`. Rings with an inverted span contribute nothing.
    #[instrument(skip_all)]
    pub fn classify(
        &mut self,
        cloud: &mut ExtractedCloud,
        curvature: &[f32],
        smoothness: &mut [Smoothness],
        picked: &mut [bool],
    ) {
        self.reset();
        self.label.resize(cloud.len(), Label::None);
        self.ring_counts.resize(cloud.rings(), RingFeatureCount::default());

        for ring in 0..cloud.rings() {
            let Some((start, end)) = cloud.ring_span(ring) else {
                continue;
            };

            self.ring_surface.clear();
            let corners_before = self.corner.len();

            for sector in 0..SECTORS {
                let (sp, ep) = sector_bounds(start as i64, end as i64, sector);
                if sp >= ep {
                    continue;
                }
                let (sp, ep) = (sp as usize, ep as usize);

                // The sort leaves the record at `ep` in place while both
                // scans below include it.
                smoothness[record_position(sp)..record_position(ep)]
                    .sort_by(|a, b| a.value.total_cmp(&b.value));

                self.pick_corners(cloud, curvature, smoothness, picked, sp, ep);
                self.pick_surfaces(cloud, curvature, smoothness, picked, sp, ep);

                for k in sp..=ep {
                    if self.label[k] != Label::Corner {
                        cloud.points[k].tag = FeatureTag::Surface;
                        self.ring_surface.push(cloud.points[k]);
                    }
                }
            }

            self.voxel.filter(&self.ring_surface, &mut self.ring_surface_ds);
            self.surface.extend_from_slice(&self.ring_surface_ds);

            self.ring_counts[ring] = RingFeatureCount {
                corners: self.corner.len() - corners_before,
                surfaces: self.ring_surface_ds.len(),
            };
        }

        trace!(
            corners = self.corner.len(),
            surfaces = self.surface.len(),
            "classified"
        );
    }

    fn pick_corners(
        &mut self,
        cloud: &mut ExtractedCloud,
        curvature: &[f32],
        smoothness: &[Smoothness],
        picked: &mut [bool],
        sp: usize,
        ep: usize,
    ) {
        let mut picked_num = 0;
        for k in (sp..=ep).rev() {
            let ind = smoothness[record_position(k)].index;
            if picked[ind] || curvature[ind] <= self.params.edge_threshold {
                continue;
            }

            picked_num += 1;
            if picked_num > MAX_CORNERS_PER_SECTOR {
                break;
            }

            self.label[ind] = Label::Corner;
            cloud.points[ind].tag = FeatureTag::Corner;
            self.corner.push(cloud.points[ind]);

            suppress_neighbors(ind, &cloud.column, picked);
        }
    }

    fn pick_surfaces(
        &mut self,
        cloud: &ExtractedCloud,
        curvature: &[f32],
        smoothness: &[Smoothness],
        picked: &mut [bool],
        sp: usize,
        ep: usize,
    ) {
        for k in sp..=ep {
            let ind = smoothness[record_position(k)].index;
            if picked[ind] || curvature[ind] >= self.params.surf_threshold {
                continue;
            }

            self.label[ind] = Label::Surface;
            suppress_neighbors(ind, &cloud.column, picked);
        }
    }
}
