// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;
mod feature_thread;

use args::Args;
use clap::Parser as _;
use edgefirst_lidarfeat::FeatureExtractor;
use edgefirst_schemas::{sensor_msgs::PointCloud2, serde_cdr};
use feature_thread::{Publishers, feature_thread};
use kanal::Sender;
use std::thread;
use tracing::{debug, error, info, trace, warn};
use zenoh::{
    Session,
    pubsub::Publisher,
    qos::{CongestionControl, Priority},
};

/// Scans queued for the feature worker before new scans are dropped.
const SCAN_QUEUE: usize = 4;

async fn declare_publisher(
    session: &Session,
    topic: &str,
) -> Result<Publisher<'static>, Box<dyn std::error::Error + Send + Sync>> {
    match session
        .declare_publisher(topic.to_string())
        .priority(Priority::DataHigh)
        .congestion_control(CongestionControl::Drop)
        .await
    {
        Ok(v) => Ok(v),
        Err(e) => {
            error!("Failed to create publisher {}: {:?}", topic, e);
            Err(e)
        }
    }
}

/// Hand a raw scan to the worker, returning false once the worker is gone.
fn forward(tx: &Sender<PointCloud2>, payload: &[u8]) -> bool {
    let msg = match serde_cdr::deserialize::<PointCloud2>(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to deserialize point cloud: {:?}", e);
            return true;
        }
    };

    match tx.try_send(msg) {
        Ok(true) => true,
        Ok(false) => {
            trace!("feature worker busy, scan dropped");
            true
        }
        Err(_) => false,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.rust_log).init();

    let config = match args.extractor_config() {
        Ok(v) => v,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("{:?}", config);
    let extractor = FeatureExtractor::new(config)?;

    let session = zenoh::open(zenoh::Config::try_from(&args)?).await?;
    debug!("opened zenoh session");

    let publishers = Publishers {
        edge: declare_publisher(&session, &args.edge_topic).await?,
        surface: declare_publisher(&session, &args.surface_topic).await?,
        filtered: declare_publisher(&session, &args.filtered_topic).await?,
        cloud_info: declare_publisher(&session, &args.cloud_info_topic).await?,
    };

    let subscriber = session.declare_subscriber(args.points_topic.clone()).await?;

    let (tx, rx) = kanal::bounded(SCAN_QUEUE);
    let frame_id = args.frame_id.clone();
    let worker = thread::Builder::new()
        .name("features".to_string())
        .spawn(move || feature_thread(rx, publishers, extractor, frame_id))?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            sample = subscriber.recv_async() => {
                let sample = match sample {
                    Ok(v) => v,
                    Err(e) => {
                        error!("{} subscriber closed: {:?}", args.points_topic, e);
                        break;
                    }
                };
                if !forward(&tx, &sample.payload().to_bytes()) {
                    break;
                }
            }
        }
    }

    drop(tx);
    match worker.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("fatal: {}", e);
            Err(e.into())
        }
        Err(_) => Err("feature worker panicked".into()),
    }
}
