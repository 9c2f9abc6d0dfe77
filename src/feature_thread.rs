// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_lidarfeat::{
    Error, FeatureExtractor, ScanFeatures,
    common::set_process_priority,
    pointcloud::{CloudInfoMsg, decode_raw_frame, encode_cloud, secs_to_time},
};
use edgefirst_schemas::{sensor_msgs::PointCloud2, serde_cdr};
use kanal::Receiver;
use serde::Serialize;
use tracing::{error, instrument, trace, warn};
use zenoh::{
    Wait as _,
    bytes::{Encoding, ZBytes},
    pubsub::Publisher,
};

/// Output publishers owned by the feature worker.
pub struct Publishers {
    pub edge: Publisher<'static>,
    pub surface: Publisher<'static>,
    pub filtered: Publisher<'static>,
    pub cloud_info: Publisher<'static>,
}

// If the receiver is empty, waits for the next message, otherwise returns the
// most recent message on this receiver. If the receiver is closed, returns None
fn drain_recv<T>(rx: &Receiver<T>) -> Option<T> {
    let mut msg = match rx.try_recv() {
        Err(_) => return None,
        Ok(Some(v)) => v,
        Ok(None) => return rx.recv().ok(),
    };
    while let Ok(Some(v)) = rx.try_recv() {
        msg = v;
    }
    Some(msg)
}

/// Process scans until the channel closes or a fatal fault occurs.
///
/// Stale scans queued behind the one being processed are dropped so at most
/// one scan is in flight.
pub fn feature_thread(
    rx: Receiver<PointCloud2>,
    publishers: Publishers,
    mut extractor: FeatureExtractor,
    frame_id: String,
) -> Result<(), Error> {
    set_process_priority();
    let sensor = extractor.config().sensor;

    while let Some(msg) = drain_recv(&rx) {
        let frame = match decode_raw_frame(sensor, &msg) {
            Ok(v) => v,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("dropping undecodable scan: {}", e);
                continue;
            }
        };
        drop(msg);

        let features = extractor.process(&frame)?;

        if let Err(e) = publish(&publishers, &features, &frame_id) {
            error!("feature publish error: {}", e);
        }
    }

    Ok(())
}

fn cdr_bytes<T: Serialize>(msg: &T) -> Result<ZBytes, Error> {
    let bytes = serde_cdr::serialize(msg).map_err(|e| Error::Cdr(e.to_string()))?;
    Ok(ZBytes::from(bytes))
}

fn put(publ: &Publisher<'_>, msg: ZBytes, schema: &str) {
    let enc = Encoding::APPLICATION_CDR.with_schema(schema);
    match publ.put(msg).encoding(enc).wait() {
        Ok(_) => trace!("{} message sent", publ.key_expr()),
        Err(e) => error!("{} publish error: {:?}", publ.key_expr(), e),
    }
}

/// Encode and publish the feature clouds and cloud info of one scan.
#[instrument(skip_all)]
fn publish(
    publishers: &Publishers,
    features: &ScanFeatures<'_>,
    frame_id: &str,
) -> Result<(), Error> {
    const POINT_CLOUD2: &str = "sensor_msgs/msg/PointCloud2";

    let start = features.time.start;
    let edge = encode_cloud(features.corner, secs_to_time(start), frame_id);
    let surface = encode_cloud(features.surface, secs_to_time(start), frame_id);
    let filtered = encode_cloud(&features.cloud.points, secs_to_time(start), frame_id);

    put(&publishers.edge, cdr_bytes(&edge)?, POINT_CLOUD2);
    put(&publishers.surface, cdr_bytes(&surface)?, POINT_CLOUD2);
    put(&publishers.filtered, cdr_bytes(&filtered)?, POINT_CLOUD2);

    let info = CloudInfoMsg::new(features.cloud_info(), frame_id, edge, surface);
    put(&publishers.cloud_info, cdr_bytes(&info)?, CloudInfoMsg::SCHEMA);

    Ok(())
}
