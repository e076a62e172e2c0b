//! # Command Server
//!
//! Publishes the executor's output to the drive: velocity demands on the `vel_cmd_endpoint` and
//! finished notifications on `nav_finished_endpoint`. Both sockets are PUB sockets bound by this
//! server, so a drive that connects late simply misses the demands sent before it connected.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Mutex;

use crate::motion_exec::{CmdSink, SinkError};
use comms_if::{
    eqpt::drive::{NavFinished, VelocityCmd},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Velocity command and finished notification server.
///
/// The sockets are locked individually so the server can be shared with the motion thread.
pub struct CmdServer {
    vel_cmd_socket: Mutex<MonitoredSocket>,
    nav_finished_socket: Mutex<MonitoredSocket>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdServerError {
    #[error("Socket error on {0}: {1}")]
    SocketError(String, MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdServer {
    /// Create a new instance of the command server.
    ///
    /// This function will not block until the drive connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, CmdServerError> {
        let vel_cmd_socket = Self::bind(ctx, &params.vel_cmd_endpoint)?;
        let nav_finished_socket = Self::bind(ctx, &params.nav_finished_endpoint)?;

        Ok(Self {
            vel_cmd_socket: Mutex::new(vel_cmd_socket),
            nav_finished_socket: Mutex::new(nav_finished_socket),
        })
    }

    /// Check if anything is listening for velocity commands.
    pub fn is_connected(&self) -> bool {
        match self.vel_cmd_socket.lock() {
            Ok(s) => s.connected(),
            Err(e) => e.into_inner().connected(),
        }
    }

    fn bind(ctx: &zmq::Context, endpoint: &str) -> Result<MonitoredSocket, CmdServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        MonitoredSocket::new(ctx, zmq::PUB, socket_options, endpoint)
            .map_err(|e| CmdServerError::SocketError(endpoint.into(), e))
    }

    fn publish<T: serde::Serialize>(
        socket: &Mutex<MonitoredSocket>,
        msg: &T,
    ) -> Result<(), SinkError> {
        let socket = socket
            .lock()
            .map_err(|_| SinkError::PublishError("socket lock poisoned".into()))?;

        socket
            .send_json(msg)
            .map_err(|e| SinkError::PublishError(e.to_string()))
    }
}

impl CmdSink for CmdServer {
    fn send_vel_cmd(&self, cmd: &VelocityCmd) -> Result<(), SinkError> {
        Self::publish(&self.vel_cmd_socket, cmd)
    }

    fn send_finished(&self) -> Result<(), SinkError> {
        Self::publish(&self.nav_finished_socket, &NavFinished)
    }
}
