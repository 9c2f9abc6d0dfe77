// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Occluded and parallel-beam point marking.
//!
//! Points near a depth discontinuity belong to a surface partially hidden by
//! a closer one; their curvature reflects the occlusion edge rather than the
//! geometry. Points where the beam grazes a surface have unstable ranges.
//! Both are flagged in the shared `picked` array so the classifier never
//! selects them.

use crate::projection::HALF_WINDOW;
use tracing::{instrument, trace};

/// Depth jump (meters) between neighbours that marks an occlusion.
pub const OCCLUSION_DEPTH_GAP: f32 = 0.3;

/// Neighbours further apart than this many columns are not compared.
pub const OCCLUSION_COLUMN_GAP: i32 = 10;

/// Relative range jump on both sides that marks a parallel beam.
pub const PARALLEL_BEAM_RATIO: f32 = 0.02;

/// Flag occluded and parallel-beam points in `picked`.
///
/// Marks are only ever set, never cleared. `column`, `range` and `picked`
/// must have equal length.
#[instrument(skip_all)]
pub fn mark_occluded_points(column: &[i32], range: &[f32], picked: &mut [bool]) {
    let n = range.len();
    debug_assert_eq!(n, column.len());
    debug_assert_eq!(n, picked.len());

    let mut occluded = 0usize;
    let mut parallel = 0usize;

    for i in HALF_WINDOW..n.saturating_sub(HALF_WINDOW + 1) {
        let depth1 = range[i];
        let depth2 = range[i + 1];
        let column_diff = (column[i + 1] - column[i]).abs();

        if column_diff < OCCLUSION_COLUMN_GAP {
            if depth1 - depth2 > OCCLUSION_DEPTH_GAP {
                // Far side of the jump is hidden behind the next point
                picked[i - 5..=i].fill(true);
                occluded += 1;
            } else if depth2 - depth1 > OCCLUSION_DEPTH_GAP {
                picked[i + 1..=i + 6].fill(true);
                occluded += 1;
            }
        }

        let diff1 = (range[i - 1] - range[i]).abs();
        let diff2 = (range[i + 1] - range[i]).abs();
        if diff1 > PARALLEL_BEAM_RATIO * range[i] && diff2 > PARALLEL_BEAM_RATIO * range[i] {
            picked[i] = true;
            parallel += 1;
        }
    }

    trace!(occluded, parallel, "marked unreliable points");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(picked: &[bool]) -> Vec<usize> {
        picked
            .iter()
            .enumerate()
            .filter(|(_, p)| **p)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_step_towards_sensor_marks_far_side() {
        // 20 points at 10m then 20 at 9m, consecutive columns
        let range: Vec<f32> = (0..40).map(|i| if i < 20 { 10.0 } else { 9.0 }).collect();
        let column: Vec<i32> = (0..40).collect();
        let mut picked = vec![false; 40];

        mark_occluded_points(&column, &range, &mut picked);
        assert_eq!(marked(&picked), (14..=19).collect::<Vec<_>>());
    }

    #[test]
    fn test_step_away_from_sensor_marks_far_side() {
        let range: Vec<f32> = (0..40).map(|i| if i < 20 { 9.0 } else { 10.0 }).collect();
        let column: Vec<i32> = (0..40).collect();
        let mut picked = vec![false; 40];

        mark_occluded_points(&column, &range, &mut picked);
        assert_eq!(marked(&picked), (20..=25).collect::<Vec<_>>());
    }

    #[test]
    fn test_column_gap_suppresses_occlusion() {
        let range: Vec<f32> = (0..40).map(|i| if i < 20 { 10.0 } else { 9.0 }).collect();
        let column: Vec<i32> = (0..40).map(|i| if i < 20 { i } else { i + 10 }).collect();
        let mut picked = vec![false; 40];

        mark_occluded_points(&column, &range, &mut picked);
        assert!(marked(&picked).is_empty());
    }

    #[test]
    fn test_parallel_beam() {
        // Isolated spike: both neighbours differ by more than 2%
        let mut range = vec![10.0f32; 30];
        range[15] = 10.25;
        let column: Vec<i32> = (0..30).collect();
        let mut picked = vec![false; 30];

        mark_occluded_points(&column, &range, &mut picked);
        assert_eq!(marked(&picked), vec![15]);
    }

    #[test]
    fn test_small_depth_change_not_marked() {
        let range: Vec<f32> = (0..30).map(|i| 10.0 + i as f32 * 0.01).collect();
        let column: Vec<i32> = (0..30).collect();
        let mut picked = vec![false; 30];

        mark_occluded_points(&column, &range, &mut picked);
        assert!(marked(&picked).is_empty());
    }

    #[test]
    fn test_marks_are_monotone() {
        let range = vec![10.0f32; 30];
        let column: Vec<i32> = (0..30).collect();
        let mut picked = vec![false; 30];
        picked[3] = true;
        picked[20] = true;

        mark_occluded_points(&column, &range, &mut picked);
        assert_eq!(marked(&picked), vec![3, 20]);
    }

    #[test]
    fn test_short_cloud() {
        for n in 0..12 {
            let range = vec![1.0f32; n];
            let column: Vec<i32> = (0..n as i32).collect();
            let mut picked = vec![false; n];
            mark_occluded_points(&column, &range, &mut picked);
        }
    }
}
