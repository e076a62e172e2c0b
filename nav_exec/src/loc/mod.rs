//! # Localisation module
//!
//! Planar pose and velocity of the robot in the world frame, plus the shared pose feed which is
//! written by the [`PoseClient`](crate::pose_client::PoseClient) and read by navigation control
//! and the motion executor.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, RwLock};

use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

use comms_if::eqpt::pose::PoseMsg;
use util::maths::norm;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the robot in the world frame, reduced to the plane.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Heading about the world Z+ axis. Not normalised, so the robot can be asked to turn more
    /// than a full revolution.
    ///
    /// Units: radians
    pub yaw: f64,
}

/// A planar velocity in the world frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity2D {
    /// Units: meters/second
    pub vx: f64,

    /// Units: meters/second
    pub vy: f64,

    /// Units: radians/second
    pub vyaw: f64,
}

/// Latest pose recieved from the pose source, shared between threads.
///
/// Cloning the feed gives another handle onto the same pose.
#[derive(Debug, Clone, Default)]
pub struct PoseFeed {
    latest: Arc<RwLock<Option<Pose2D>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// Straight line distance between this pose and `other` in the plane, ignoring yaw.
    pub fn planar_dist(&self, other: &Pose2D) -> f64 {
        // Both slices are two long so norm can't fail
        norm(&[self.x, self.y], &[other.x, other.y]).unwrap_or(std::f64::NAN)
    }

    /// Add `offset` component-wise to this pose.
    ///
    /// The offset is expressed in the world frame, not the robot body frame.
    pub fn offset_by(&self, offset: &Pose2D) -> Pose2D {
        Pose2D {
            x: self.x + offset.x,
            y: self.y + offset.y,
            yaw: self.yaw + offset.yaw,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite()
    }
}

impl From<PoseMsg> for Pose2D {
    fn from(msg: PoseMsg) -> Self {
        match msg {
            PoseMsg::Planar { x, y, yaw } => Pose2D { x, y, yaw },
            PoseMsg::Odometry { position_m, attitude_q } => {
                // Message order is [x, y, z, w], nalgebra takes w first
                let q = UnitQuaternion::from_quaternion(Quaternion::new(
                    attitude_q[3],
                    attitude_q[0],
                    attitude_q[1],
                    attitude_q[2],
                ));

                Pose2D {
                    x: position_m[0],
                    y: position_m[1],
                    yaw: q.euler_angles().2,
                }
            }
        }
    }
}

impl Velocity2D {
    pub fn new(vx: f64, vy: f64, vyaw: f64) -> Self {
        Self { vx, vy, vyaw }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

impl PoseFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest pose.
    pub fn update(&self, pose: Pose2D) {
        // A poisoned lock only means a reader panicked, the pose itself is still valid
        match self.latest.write() {
            Ok(mut p) => *p = Some(pose),
            Err(e) => *e.into_inner() = Some(pose),
        }
    }

    /// Get the latest pose, or `None` if no pose has been recieved yet.
    pub fn latest(&self) -> Option<Pose2D> {
        match self.latest.read() {
            Ok(p) => *p,
            Err(e) => *e.into_inner(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_from_odometry() {
        let yaw = 0.75f64;
        let msg = PoseMsg::Odometry {
            position_m: [1.0, -2.0, 0.3],
            attitude_q: [0.0, 0.0, (yaw / 2.0).sin(), (yaw / 2.0).cos()],
        };

        let pose = Pose2D::from(msg);

        assert_eq!(pose.x, 1.0);
        assert_eq!(pose.y, -2.0);
        assert!((pose.yaw - yaw).abs() < 1e-9);
    }

    #[test]
    fn test_offset_and_dist() {
        let current = Pose2D::new(1.0, 1.0, 0.5);
        let target = current.offset_by(&Pose2D::new(1.0, 0.0, 0.0));

        assert_eq!(target, Pose2D::new(2.0, 1.0, 0.5));
        assert_eq!(current.planar_dist(&target), 1.0);
        assert!(!Pose2D::new(std::f64::NAN, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_pose_feed() {
        let feed = PoseFeed::new();
        assert_eq!(feed.latest(), None);

        let reader = feed.clone();
        feed.update(Pose2D::new(0.5, 0.0, 0.0));
        assert_eq!(reader.latest(), Some(Pose2D::new(0.5, 0.0, 0.0)));
    }
}
