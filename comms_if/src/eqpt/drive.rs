//! # Drive interface
//!
//! Demands sent to the holonomic drive, and the notification published once a commanded motion
//! has been completed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity demand in the robot body frame.
///
/// The drive takes three independent scalar channels. The turn rate is carried alongside the two
/// planar components rather than as a separate angular twist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCmd {
    /// Forward speed.
    ///
    /// Units: meters/second,
    /// Frame: Robot body
    pub linear_x: f64,

    /// Leftward speed.
    ///
    /// Units: meters/second,
    /// Frame: Robot body
    pub linear_y: f64,

    /// Turn rate about the body Z+ (upwards) axis.
    ///
    /// Units: radians/second
    pub angular_rate: f64,
}

/// Notification that a navigation goal was reached.
///
/// Published exactly once per completed motion, never for a motion that was cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NavFinished;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VelocityCmd {
    /// A demand bringing the robot to rest.
    pub fn stop() -> Self {
        Self::default()
    }

    /// True if every channel is exactly zero.
    pub fn is_stop(&self) -> bool {
        self.linear_x == 0.0 && self.linear_y == 0.0 && self.angular_rate == 0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stop_json() {
        let stop = VelocityCmd::stop();
        assert!(stop.is_stop());

        let json = serde_json::to_string(&stop).unwrap();
        assert_eq!(json, r#"{"linear_x":0.0,"linear_y":0.0,"angular_rate":0.0}"#);

        let cmd: VelocityCmd = serde_json::from_str(
            r#"{"linear_x":0.5,"linear_y":0.0,"angular_rate":-0.1}"#
        ).unwrap();
        assert!(!cmd.is_stop());
        assert_eq!(cmd.angular_rate, -0.1);
    }
}
