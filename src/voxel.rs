// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Voxel grid downsampling for surface features.
//!
//! Space is divided into cubic voxels of size `leaf_size`. Every occupied
//! voxel contributes one output point at the centroid of its members
//! (position, intensity and relative time are averaged; ring and tag are
//! taken from the first member).
//!
//! Output order is ascending voxel index with `x` varying fastest, then `y`,
//! then `z`, so results depend only on the input set and its order, never on
//! hash iteration order.

use crate::point::CanonicalPoint;
use std::collections::HashMap;

type VoxelKey = (i32, i32, i32);

/// Running sums for one occupied voxel.
#[derive(Clone, Copy, Debug)]
struct VoxelAccum {
    key: VoxelKey,
    x: f64,
    y: f64,
    z: f64,
    intensity: f64,
    time: f64,
    count: u32,
    first: CanonicalPoint,
}

impl VoxelAccum {
    fn new(key: VoxelKey, p: &CanonicalPoint) -> Self {
        Self {
            key,
            x: p.x as f64,
            y: p.y as f64,
            z: p.z as f64,
            intensity: p.intensity as f64,
            time: p.time as f64,
            count: 1,
            first: *p,
        }
    }

    fn add(&mut self, p: &CanonicalPoint) {
        self.x += p.x as f64;
        self.y += p.y as f64;
        self.z += p.z as f64;
        self.intensity += p.intensity as f64;
        self.time += p.time as f64;
        self.count += 1;
    }

    fn centroid(&self) -> CanonicalPoint {
        let inv = 1.0 / self.count as f64;
        CanonicalPoint {
            x: (self.x * inv) as f32,
            y: (self.y * inv) as f32,
            z: (self.z * inv) as f32,
            intensity: (self.intensity * inv) as f32,
            time: (self.time * inv) as f32,
            ..self.first
        }
    }
}

/// Reusable voxel grid filter.
///
/// Internal buffers are retained between calls so steady-state filtering
/// does not allocate.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    leaf_size: f32,
    inv_leaf_size: f32,
    cells: HashMap<VoxelKey, usize>,
    voxels: Vec<VoxelAccum>,
}

impl VoxelGrid {
    /// Create a filter with cubic voxels of `leaf_size` meters.
    ///
    /// # Panics
    /// Panics if `leaf_size` is not strictly positive.
    pub fn new(leaf_size: f32) -> Self {
        assert!(leaf_size > 0.0, "leaf_size must be > 0");
        Self {
            leaf_size,
            inv_leaf_size: 1.0 / leaf_size,
            cells: HashMap::new(),
            voxels: Vec::new(),
        }
    }

    pub fn leaf_size(&self) -> f32 {
        self.leaf_size
    }

    fn voxel_key(&self, p: &CanonicalPoint) -> VoxelKey {
        (
            (p.x * self.inv_leaf_size).floor() as i32,
            (p.y * self.inv_leaf_size).floor() as i32,
            (p.z * self.inv_leaf_size).floor() as i32,
        )
    }

    /// Replace `output` with one centroid per voxel occupied by `input`.
    pub fn filter(&mut self, input: &[CanonicalPoint], output: &mut Vec<CanonicalPoint>) {
        output.clear();
        self.cells.clear();
        self.voxels.clear();

        for p in input {
            let key = self.voxel_key(p);
            match self.cells.get(&key) {
                Some(&slot) => self.voxels[slot].add(p),
                None => {
                    self.cells.insert(key, self.voxels.len());
                    self.voxels.push(VoxelAccum::new(key, p));
                }
            }
        }

        self.voxels.sort_by_key(|v| (v.key.2, v.key.1, v.key.0));
        output.extend(self.voxels.iter().map(VoxelAccum::centroid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FeatureTag;

    fn pt(x: f32, y: f32, z: f32) -> CanonicalPoint {
        CanonicalPoint::new(x, y, z, 1.0, 3, 0.5)
    }

    #[test]
    fn test_single_voxel_centroid() {
        let mut grid = VoxelGrid::new(0.2);
        let input = [pt(0.01, 0.01, 0.01), pt(0.03, 0.05, 0.07), pt(0.02, 0.03, 0.04)];
        let mut out = Vec::new();
        grid.filter(&input, &mut out);

        assert_eq!(out.len(), 1);
        assert!((out[0].x - 0.02).abs() < 1e-6);
        assert!((out[0].y - 0.03).abs() < 1e-6);
        assert!((out[0].z - 0.04).abs() < 1e-6);
        assert_eq!(out[0].ring, 3);
    }

    #[test]
    fn test_distinct_voxels() {
        let mut grid = VoxelGrid::new(0.2);
        let input = [pt(0.1, 0.1, 0.1), pt(1.1, 0.1, 0.1), pt(-0.1, 0.1, 0.1)];
        let mut out = Vec::new();
        grid.filter(&input, &mut out);

        assert_eq!(out.len(), 3);
        // Ordered by x index within the same y/z slab
        assert!(out[0].x < out[1].x && out[1].x < out[2].x);
    }

    #[test]
    fn test_order_is_z_major() {
        let mut grid = VoxelGrid::new(1.0);
        let input = [pt(0.5, 0.5, 5.5), pt(5.5, 0.5, 0.5), pt(0.5, 5.5, 0.5)];
        let mut out = Vec::new();
        grid.filter(&input, &mut out);

        assert_eq!(out.len(), 3);
        assert_eq!((out[0].x, out[0].y, out[0].z), (5.5, 0.5, 0.5));
        assert_eq!((out[1].x, out[1].y, out[1].z), (0.5, 5.5, 0.5));
        assert_eq!((out[2].x, out[2].y, out[2].z), (0.5, 0.5, 5.5));
    }

    #[test]
    fn test_deterministic_and_reusable() {
        let input: Vec<_> = (0..500)
            .map(|i| {
                let a = i as f32 * 0.05;
                pt(5.0 * a.cos(), 5.0 * a.sin(), (i % 7) as f32 * 0.03)
            })
            .collect();
        let mut grid = VoxelGrid::new(0.2);
        let mut first = Vec::new();
        let mut second = Vec::new();
        grid.filter(&input, &mut first);
        grid.filter(&input, &mut second);

        assert!(!first.is_empty());
        assert!(first.len() < input.len());
        assert_eq!(first, second);
    }

    #[test]
    fn test_keeps_tag() {
        let mut grid = VoxelGrid::new(0.5);
        let mut p = pt(0.1, 0.1, 0.1);
        p.tag = FeatureTag::Surface;
        let mut out = Vec::new();
        grid.filter(&[p, p], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, FeatureTag::Surface);
    }

    #[test]
    fn test_empty_input() {
        let mut grid = VoxelGrid::new(0.2);
        let mut out = vec![pt(1.0, 1.0, 1.0)];
        grid.filter(&[], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_zero_leaf_size_panics() {
        let _ = VoxelGrid::new(0.0);
    }
}
