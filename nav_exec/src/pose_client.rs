//! # Pose Client
//!
//! The PoseClient subscribes to the pose source (odometry, motion capture or the simulation) and
//! keeps a [`PoseFeed`] updated with the latest pose. Poses are published by the source as often
//! as it has them, the client recieves them on a background thread so a slow main loop never
//! misses the newest one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{error, warn};

use crate::loc::{Pose2D, PoseFeed};
use comms_if::{
    eqpt::pose::PoseMsg,
    net::{zmq, JsonMsgError, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PoseClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    feed: PoseFeed,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PoseClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not start the background thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PoseClient {
    /// Create a new instance of the PoseClient, writing recieved poses into `feed`.
    ///
    /// This function will not block until the source connects.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        feed: PoseFeed,
    ) -> Result<Self, PoseClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            subscribe: Some(vec![]),
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            // Bounds how long shutdown waits for the background thread
            recv_timeout: 100,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.pose_endpoint)
            .map_err(PoseClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));

        let bg_run_clone = bg_run.clone();
        let feed_clone = feed.clone();

        let bg_jh = thread::Builder::new()
            .name("pose_client".into())
            .spawn(move || bg_thread(socket, bg_run_clone, feed_clone))
            .map_err(PoseClientError::ThreadError)?;

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            feed,
        })
    }

    /// Get the latest pose recieved from the source.
    pub fn pose(&self) -> Option<Pose2D> {
        self.feed.latest()
    }
}

impl Drop for PoseClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("PoseClient background thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, updates the feed whenever the source publishes a new pose.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, feed: PoseFeed) {
    let mut warned_non_finite = false;

    while run.load(Ordering::Relaxed) {
        let msg: PoseMsg = match socket.recv_json() {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(JsonMsgError::RecvError(e)) => {
                error!("Error recieving pose from the source: {}", e);
                break;
            }
            Err(e) => {
                warn!("Invalid pose message: {}", e);
                continue;
            }
        };

        let pose = Pose2D::from(msg);

        // Keep the last good pose rather than planning from garbage
        if !pose.is_finite() {
            if !warned_non_finite {
                warn!("Pose source published a non-finite pose: {:?}", pose);
                warned_non_finite = true;
            }
            continue;
        }
        warned_non_finite = false;

        feed.update(pose);
    }
}
