//! # Pose interface
//!
//! Messages published by the pose source (odometry, motion capture or simulation).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A pose of the robot in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoseMsg {
    /// A planar pose where the heading has already been extracted by the source.
    Planar {
        /// Units: meters
        x: f64,

        /// Units: meters
        y: f64,

        /// Heading about the world Z+ axis, not normalised.
        ///
        /// Units: radians
        yaw: f64,
    },

    /// A full odometry pose. The heading must be extracted from the attitude by the receiver.
    Odometry {
        /// The position in the world frame.
        ///
        /// Units: meters
        position_m: [f64; 3],

        /// The attitude of the robot in the world frame as an `[x, y, z, w]` quaternion.
        attitude_q: [f64; 4],
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_msg_json() {
        let msg: PoseMsg = serde_json::from_str(
            r#"{"Planar": {"x": 1.0, "y": 2.0, "yaw": 0.25}}"#
        ).unwrap();
        assert_eq!(msg, PoseMsg::Planar { x: 1.0, y: 2.0, yaw: 0.25 });

        let msg: PoseMsg = serde_json::from_str(
            r#"{"Odometry": {"position_m": [1.0, 2.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}}"#
        ).unwrap();
        assert!(matches!(msg, PoseMsg::Odometry { .. }));
    }
}
