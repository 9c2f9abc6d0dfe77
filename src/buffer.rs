// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-scan working buffers.
//!
//! Every stage of the pipeline writes into storage allocated once, sized for
//! a full `n_scan × horizon_scan` image. [`ScanBuffers::clear`] resets
//! lengths and flags between scans without releasing memory, so steady-state
//! processing does not allocate.
//!
//! # Layout
//!
//! ```text
//! ┌────────────────────────── ScanBuffers ──────────────────────────┐
//! │ input:      [CanonicalPoint]          normalized scan           │
//! │ image:      RangeImage (rows × cols)  first-writer-wins cells   │
//! │ cloud:      ExtractedCloud            points/column/range/spans │
//! │ curvature:  [f32]                     indexed like cloud        │
//! │ smoothness: [Smoothness]              sortable curvature keys   │
//! │ picked:     [bool]                    occlusion + suppression   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use edgefirst_lidarfeat::buffer::ScanBuffers;
//!
//! let mut buffers = ScanBuffers::new(16, 1800);
//! assert_eq!(buffers.capacity(), 16 * 1800);
//!
//! buffers.picked.resize(100, true);
//! buffers.clear();
//! assert!(buffers.picked.is_empty());
//! assert!(buffers.picked.capacity() >= 16 * 1800);
//! ```

use crate::{
    point::CanonicalPoint,
    projection::{ExtractedCloud, RangeImage},
    smoothness::Smoothness,
};

/// Preallocated storage shared by all pipeline stages for one scan.
///
/// Fields are public so a caller can borrow stages disjointly.
#[derive(Clone, Debug)]
pub struct ScanBuffers {
    pub input: Vec<CanonicalPoint>,
    pub image: RangeImage,
    pub cloud: ExtractedCloud,
    pub curvature: Vec<f32>,
    pub smoothness: Vec<Smoothness>,
    pub picked: Vec<bool>,
    capacity: usize,
}

impl ScanBuffers {
    /// Allocate buffers for an `n_scan × horizon_scan` range image.
    pub fn new(n_scan: usize, horizon_scan: usize) -> Self {
        let capacity = n_scan * horizon_scan;
        Self {
            input: Vec::with_capacity(capacity),
            image: RangeImage::new(n_scan, horizon_scan),
            cloud: ExtractedCloud::with_capacity(n_scan, capacity),
            curvature: Vec::with_capacity(capacity),
            smoothness: Vec::with_capacity(capacity),
            picked: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Points a full range image can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset every buffer for the next scan, keeping allocations.
    pub fn clear(&mut self) {
        self.input.clear();
        self.image.reset();
        self.cloud.clear();
        self.curvature.clear();
        self.smoothness.clear();
        self.picked.clear();
    }
}
