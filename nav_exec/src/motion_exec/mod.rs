//! # Motion execution module
//!
//! Streams a planned velocity profile to the drive, one sample per tick, rotating each world
//! frame sample into the robot body frame. A run executes in its own thread and can be
//! preempted through its [`CancelToken`]: a cancelled run stops the robot and never reports
//! finished, a completed run stops the robot and then reports finished exactly once.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cancel;
mod executor;
mod state;

pub use cancel::CancelToken;
pub use executor::*;
pub use state::MotionState;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::eqpt::drive::VelocityCmd;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination of the executor's output.
pub trait CmdSink: Send + Sync {
    /// Publish a body frame velocity demand.
    fn send_vel_cmd(&self, cmd: &VelocityCmd) -> Result<(), SinkError>;

    /// Publish the notification that a motion was completed.
    fn send_finished(&self) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Could not publish: {0}")]
    PublishError(String),
}

/// Which yaw the body frame rotation uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YawSource {
    /// The yaw of the planned trajectory at the current sample (open loop).
    Planned,

    /// The latest yaw from the pose feed, falling back to the planned yaw if there is no pose.
    Live,
}

/// How a run ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Finished,
    Cancelled,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for YawSource {
    fn default() -> Self {
        YawSource::Planned
    }
}

#[cfg(test)]
pub(crate) mod test_sink {
    //! Recording sink shared by the motion and navigation tests.

    use std::{
        sync::Mutex,
        thread::{self, ThreadId},
    };

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Event {
        Vel(VelocityCmd),
        Finished,
    }

    /// Records every event along with the thread which published it.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<(ThreadId, Event)>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<Event> {
            self.tagged_events().into_iter().map(|(_, e)| e).collect()
        }

        pub fn tagged_events(&self) -> Vec<(ThreadId, Event)> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: Event) {
            self.events.lock().unwrap().push((thread::current().id(), event));
        }

        pub fn num_finished(&self) -> usize {
            self.events().iter().filter(|e| **e == Event::Finished).count()
        }

        pub fn num_vel_cmds(&self) -> usize {
            self.events().iter().filter(|e| matches!(e, Event::Vel(_))).count()
        }
    }

    impl CmdSink for RecordingSink {
        fn send_vel_cmd(&self, cmd: &VelocityCmd) -> Result<(), SinkError> {
            self.record(Event::Vel(*cmd));
            Ok(())
        }

        fn send_finished(&self) -> Result<(), SinkError> {
            self.record(Event::Finished);
            Ok(())
        }
    }
}
