// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Scan-line curvature over an 11-point range window.
//!
//! For an interior index `i` the curvature is
//!
//! ```text
//! c[i] = ( Σ_{k=1..5} r[i-k] + Σ_{k=1..5} r[i+k] − 10·r[i] )²
//! ```
//!
//! which is near zero on locally planar or linear runs and large at sharp
//! edges and corners.

use crate::projection::HALF_WINDOW;
use tracing::instrument;

/// Sortable curvature key for one extracted point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Smoothness {
    pub value: f32,
    /// Index into the extracted cloud.
    pub index: usize,
}

/// Offset of the record for extracted index `i` within the smoothness table.
#[inline]
pub fn record_position(index: usize) -> usize {
    index - HALF_WINDOW
}

/// Curvature of the window centred on `i`.
///
/// `range` must hold at least `HALF_WINDOW` values on both sides of `i`.
#[inline]
pub fn window_curvature(range: &[f32], i: usize) -> f32 {
    let diff = range[i - 5] + range[i - 4] + range[i - 3] + range[i - 2] + range[i - 1]
        - range[i] * 10.0
        + range[i + 1]
        + range[i + 2]
        + range[i + 3]
        + range[i + 4]
        + range[i + 5];
    diff * diff
}

/// Compute curvature for every interior point of `range`.
///
/// `curvature` is resized to `range.len()` with zero outside the interior
/// band `5 ≤ i < len − 5`. `smoothness` receives one record per interior
/// point, the record for index `i` at position `i − 5`.
#[instrument(skip_all)]
pub fn calculate_smoothness(
    range: &[f32],
    curvature: &mut Vec<f32>,
    smoothness: &mut Vec<Smoothness>,
) {
    let n = range.len();
    curvature.clear();
    curvature.resize(n, 0.0);
    smoothness.clear();

    if n <= 2 * HALF_WINDOW {
        return;
    }

    for i in HALF_WINDOW..n - HALF_WINDOW {
        let value = window_curvature(range, i);
        curvature[i] = value;
        smoothness.push(Smoothness { value, index: i });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_cover_interior_only() {
        let range: Vec<f32> = (0..30).map(|i| 5.0 + (i as f32 * 0.37).sin()).collect();
        let mut curvature = Vec::new();
        let mut smoothness = Vec::new();
        calculate_smoothness(&range, &mut curvature, &mut smoothness);

        assert_eq!(curvature.len(), 30);
        assert_eq!(smoothness.len(), 20);
        for (pos, record) in smoothness.iter().enumerate() {
            assert!(record.index >= 5 && record.index < 25);
            assert_eq!(record_position(record.index), pos);
            assert_eq!(record.value, curvature[record.index]);
        }
        assert!(curvature[..5].iter().all(|&c| c == 0.0));
        assert!(curvature[25..].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_constant_range_has_zero_curvature() {
        let range = vec![7.5f32; 40];
        let mut curvature = Vec::new();
        let mut smoothness = Vec::new();
        calculate_smoothness(&range, &mut curvature, &mut smoothness);
        assert!(smoothness.iter().all(|s| s.value < 1e-8));
    }

    #[test]
    fn test_linear_ramp_has_zero_curvature() {
        let range: Vec<f32> = (0..40).map(|i| 2.0 + i as f32 * 0.25).collect();
        let mut curvature = Vec::new();
        let mut smoothness = Vec::new();
        calculate_smoothness(&range, &mut curvature, &mut smoothness);
        assert!(smoothness.iter().all(|s| s.value < 1e-6));
    }

    #[test]
    fn test_spike_value() {
        let mut range = vec![10.0f32; 11];
        range[5] = 9.0;
        assert_eq!(window_curvature(&range, 5), 100.0);
    }

    #[test]
    fn test_short_cloud_has_no_records() {
        for n in 0..=10 {
            let range = vec![1.0f32; n];
            let mut curvature = vec![3.0; 4];
            let mut smoothness = vec![Smoothness::default(); 2];
            calculate_smoothness(&range, &mut curvature, &mut smoothness);
            assert_eq!(curvature.len(), n);
            assert!(smoothness.is_empty());
        }
    }
}
