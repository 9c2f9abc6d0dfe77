// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Shared process utilities.

#[cfg(target_os = "linux")]
use tracing::warn;

/// Real-time priority requested for the feature worker thread.
pub const WORKER_PRIORITY: i32 = 10;

/// Switch the calling thread to the `SCHED_FIFO` real-time scheduler.
///
/// Failure (usually missing `CAP_SYS_NICE`) is logged and otherwise ignored.
#[cfg(target_os = "linux")]
pub fn set_process_priority() {
    let mut param = libc::sched_param {
        sched_priority: WORKER_PRIORITY,
    };
    let tid = unsafe { libc::pthread_self() };
    let err = unsafe {
        libc::pthread_setschedparam(tid, libc::SCHED_FIFO, &mut param as *mut libc::sched_param)
    };
    if err != 0 {
        let err = std::io::Error::from_raw_os_error(err);
        warn!("unable to set real-time fifo scheduler: {}", err);
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_process_priority() {}
