//! Motion continuity state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::loc::Velocity2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State carried from one run to the next.
///
/// Owned by navigation control while idle and moved into the active run while one is executing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct MotionState {
    /// The last velocity commanded, in the world frame. Used as the start velocity of the next
    /// plan.
    pub last_cmd_vel: Velocity2D,

    /// The yaw the last command was rotated by, `None` before the first command.
    pub tracked_yaw: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionState {
    /// The state of a robot which has not been commanded yet.
    pub fn at_rest() -> Self {
        Self::default()
    }
}
