// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end tests of the feature pipeline on synthetic scans.
//!
//! Scans are generated on exact range image column centres so every point
//! lands in a known cell.

use edgefirst_lidarfeat::{
    Error, ExtractorConfig, FeatureExtractor, FeatureTag, SensorType,
    features::{MAX_CORNERS_PER_SECTOR, SECTORS, sector_bounds, suppress_neighbors},
    occlusion::mark_occluded_points,
    projection::{ExtractedCloud, RangeImage},
    raw::{self, RawFrame, RawPoints, VelodynePoint},
    smoothness::calculate_smoothness,
};

const COLS: usize = 1800;

/// Horizontal angle (radians) at the centre of `column`.
fn column_angle(column: usize) -> f32 {
    let resolution = 360.0 / COLS as f32;
    (90.0 - (column as f32 - (COLS / 2) as f32) * resolution).to_radians()
}

/// Scan with one point per (ring, column) for which `distance` returns a
/// horizontal distance, emitted column-major like a spinning sensor.
fn scan(rings: u16, distance: impl Fn(u16, usize) -> Option<f32>) -> RawFrame {
    let mut points = Vec::new();
    for column in 0..COLS {
        let a = column_angle(column);
        for ring in 0..rings {
            let Some(d) = distance(ring, column) else {
                continue;
            };
            let elevation = (-15.0 + 2.0 * ring as f32).to_radians();
            points.push(VelodynePoint {
                x: d * a.sin(),
                y: d * a.cos(),
                z: d * elevation.tan(),
                intensity: 20.0,
                ring,
                time: column as f32 / (COLS - 1) as f32 * 0.1,
            });
        }
    }
    RawFrame::new(1_700_000_000.0, RawPoints::Velodyne(points))
}

/// Horizontal distance to the walls of a 16 m × 10 m room centred on the
/// sensor.
fn room(column: usize) -> f32 {
    let a = column_angle(column);
    let to_x_wall = 8.0 / a.sin().abs().max(1e-6);
    let to_y_wall = 5.0 / a.cos().abs().max(1e-6);
    to_x_wall.min(to_y_wall)
}

/// Run projection and extraction only.
fn extract(config: &ExtractorConfig, frame: &RawFrame) -> ExtractedCloud {
    let mut points = Vec::new();
    raw::normalize(config.sensor, frame, &mut points).unwrap();
    let mut image = RangeImage::new(config.n_scan, config.horizon_scan);
    image.project(&points, &config.projection_params());
    let mut cloud = ExtractedCloud::with_capacity(config.n_scan, config.n_scan * COLS);
    image.extract(&mut cloud);
    cloud
}

fn marked(picked: &[bool]) -> Vec<usize> {
    (0..picked.len()).filter(|&i| picked[i]).collect()
}

#[test]
fn test_smoothness_records_stay_in_interior() {
    let config = ExtractorConfig::default();
    let cloud = extract(&config, &scan(16, |_, c| Some(room(c))));
    assert_eq!(cloud.len(), 16 * COLS);

    let mut curvature = Vec::new();
    let mut smoothness = Vec::new();
    calculate_smoothness(&cloud.range, &mut curvature, &mut smoothness);

    assert_eq!(smoothness.len(), cloud.len() - 10);
    for record in &smoothness {
        assert!(record.index >= 5 && record.index < cloud.len() - 5);
    }
}

#[test]
fn test_flat_plane_yields_only_surfaces() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let features = extractor.process(&scan(16, |_, _| Some(12.0))).unwrap();

    assert!(features.corner.is_empty());
    assert!(!features.surface.is_empty());
    assert!(features.surface.iter().all(|p| p.tag == FeatureTag::Surface));
    assert!(
        features
            .cloud
            .points
            .iter()
            .all(|p| p.tag != FeatureTag::Corner)
    );
}

#[test]
fn test_room_corners_found() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let features = extractor.process(&scan(16, |_, c| Some(room(c)))).unwrap();

    assert!(!features.corner.is_empty());
    assert!(!features.surface.is_empty());

    // Every edge sits near one of the four room corners
    for p in features.corner {
        let near_x_wall = (p.x.abs() - 8.0).abs() < 0.5;
        let near_y_wall = (p.y.abs() - 5.0).abs() < 0.5;
        assert!(near_x_wall && near_y_wall, "edge at ({}, {})", p.x, p.y);
    }
}

#[test]
fn test_corner_and_surface_disjoint() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let frame = scan(16, |ring, c| {
        Some(room(c) + if (c + ring as usize * 7) % 97 == 0 { 0.15 } else { 0.0 })
    });
    let features = extractor.process(&frame).unwrap();

    let tagged_corners = features
        .cloud
        .points
        .iter()
        .filter(|p| p.tag == FeatureTag::Corner)
        .count();
    assert_eq!(tagged_corners, features.corner.len());
    assert!(features.corner.iter().all(|p| p.tag == FeatureTag::Corner));
    assert!(features.surface.iter().all(|p| p.tag == FeatureTag::Surface));
    for corner in features.corner {
        assert!(!features.surface.contains(corner));
    }
}

#[test]
fn test_corner_quota_per_sector() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let frame = scan(4, |_, c| Some(if c % 2 == 0 { 10.0 } else { 10.15 }));
    let features = extractor.process(&frame).unwrap();
    let cloud = features.cloud;

    let mut busiest = 0;
    for ring in 0..cloud.rings() {
        let Some((start, end)) = cloud.ring_span(ring) else {
            continue;
        };
        for sector in 0..SECTORS {
            let (sp, ep) = sector_bounds(start as i64, end as i64, sector);
            if sp >= ep {
                continue;
            }
            let corners = (sp as usize..=ep as usize)
                .filter(|&i| cloud.points[i].tag == FeatureTag::Corner)
                .count();
            assert!(corners <= MAX_CORNERS_PER_SECTOR);
            busiest = busiest.max(corners);
        }
    }
    assert!(busiest > 0);
}

#[test]
fn test_suppression_stops_at_column_gap() {
    let config = ExtractorConfig::default();
    // Columns 900..920 are missing on the only ring
    let cloud = extract(&config, &scan(1, |_, c| (!(900..920).contains(&c)).then_some(10.0)));
    assert_eq!(cloud.column[899], 899);
    assert_eq!(cloud.column[900], 920);

    let mut picked = vec![false; cloud.len()];
    suppress_neighbors(898, &cloud.column, &mut picked);
    assert_eq!(marked(&picked), (893..=899).collect::<Vec<_>>());

    let mut picked = vec![false; cloud.len()];
    suppress_neighbors(901, &cloud.column, &mut picked);
    assert_eq!(marked(&picked), (900..=906).collect::<Vec<_>>());
}

#[test]
fn test_step_discontinuity_occlusion_windows() {
    let config = ExtractorConfig::default();
    // 1 m step towards the sensor at column 600, back out at column 1200
    let cloud = extract(
        &config,
        &scan(1, |_, c| Some(if (600..1200).contains(&c) { 9.0 } else { 10.0 })),
    );
    assert_eq!(cloud.len(), COLS);

    let mut picked = vec![false; cloud.len()];
    mark_occluded_points(&cloud.column, &cloud.range, &mut picked);

    let expected: Vec<usize> = (594..=599).chain(1200..=1205).collect();
    assert_eq!(marked(&picked), expected);
}

#[test]
fn test_short_ring_contributes_nothing() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    // Ring 1 only has 8 usable points
    let frame = scan(2, |ring, c| match ring {
        0 => Some(room(c)),
        _ => (c < 8).then_some(room(c)),
    });
    let features = extractor.process(&frame).unwrap();

    let (start, end) = (
        features.cloud.start_ring_index[1],
        features.cloud.end_ring_index[1],
    );
    assert!(start > end);
    assert_eq!(features.ring_counts[1].corners, 0);
    assert_eq!(features.ring_counts[1].surfaces, 0);
    assert!(features.corner.iter().all(|p| p.ring != 1));
    assert!(features.surface.iter().all(|p| p.ring != 1));
    assert!(!features.surface.is_empty());
}

#[test]
fn test_idempotent_across_extractors() {
    let frame = scan(16, |ring, c| {
        Some(room(c) + ((c as f32 * 0.013 + ring as f32).sin() * 0.05))
    });

    let mut first = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let a = first.process(&frame).unwrap();
    let corner = a.corner.to_vec();
    let surface = a.surface.to_vec();
    let info = a.cloud_info();

    let mut second = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let b = second.process(&frame).unwrap();
    assert_eq!(corner, b.corner);
    assert_eq!(surface, b.surface);
    assert_eq!(info, b.cloud_info());

    // A different scan in between leaves no trace
    first.process(&scan(16, |_, _| Some(3.0))).unwrap();
    let c = first.process(&frame).unwrap();
    assert_eq!(corner, c.corner);
    assert_eq!(surface, c.surface);
}

#[test]
fn test_unknown_sensor_is_fatal() {
    let err = "hesai".parse::<SensorType>().unwrap_err();
    assert!(matches!(err, Error::UnknownSensor(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_not_dense_is_fatal() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let mut frame = scan(2, |_, c| Some(room(c)));
    frame.is_dense = false;
    let err = extractor.process(&frame).unwrap_err();
    assert!(matches!(err, Error::NotDense(SensorType::Velodyne)));
    assert!(err.is_fatal());
}

#[test]
fn test_scan_end_time() {
    let mut extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let features = extractor.process(&scan(2, |_, c| Some(room(c)))).unwrap();
    assert_eq!(features.time.start, 1_700_000_000.0);
    assert!((features.time.end - 1_700_000_000.1).abs() < 1e-6);
}
