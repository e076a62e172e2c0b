//! # Goal Client
//!
//! Recieves goal and cancel telecommands from the operator (see the `goal_cli` executable). Each
//! recieved telecommand must be answered with a [`TcResponse`] before the next can be recieved.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    tc::{Tc, TcParseError, TcResponse},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telecommand client
pub struct GoalClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GoalClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the operator")]
    NotConnected,

    #[error("Could not send the response: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the operator: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the response: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the recieved telecommand: {0}")]
    TcParseError(TcParseError),

    #[error("The operator sent a message which was not valid UTF-8")]
    NonUtf8Tc,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GoalClient {
    /// Create a new instance of the goal client.
    ///
    /// This function will not block until the operator connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, GoalClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, &params.tc_endpoint)
            .map_err(GoalClientError::SocketError)?;

        Ok(Self { socket })
    }

    /// Check if the client is connected to the operator
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Recieve a single TC from the operator.
    ///
    /// Call this in a loop until `Ok(None)` is returned, meaning there are no more TCs pending
    /// right now.
    ///
    /// After recieving a valid TC a response must be sent with `.send_response()` before
    /// attempting to recieve another. If the TC is invalid the `Invalid` response is sent by this
    /// function.
    pub fn recieve_tc(&self) -> Result<Option<Tc>, GoalClientError> {
        if !self.socket.connected() {
            return Err(GoalClientError::NotConnected);
        }

        let tc_str = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                self.send_response(TcResponse::Invalid)?;
                return Err(GoalClientError::NonUtf8Tc);
            }
            Err(zmq::Error::EAGAIN) => return Ok(None),
            // No response is sent if we could not recieve
            Err(e) => return Err(GoalClientError::RecvError(e)),
        };

        match Tc::from_json(&tc_str) {
            Ok(tc) => Ok(Some(tc)),
            Err(e) => {
                self.send_response(TcResponse::Invalid)?;
                Err(GoalClientError::TcParseError(e))
            }
        }
    }

    /// Send the given response back to the operator.
    ///
    /// This function must be called after recieving a TC.
    pub fn send_response(&self, response: TcResponse) -> Result<(), GoalClientError> {
        if !self.socket.connected() {
            return Err(GoalClientError::NotConnected);
        }

        let response_str =
            serde_json::to_string(&response).map_err(GoalClientError::SerializationError)?;

        self.socket
            .send(&response_str, 0)
            .map_err(GoalClientError::SendError)
    }
}
