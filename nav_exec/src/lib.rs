//! # Navigation library.
//!
//! This library allows other crates in the workspace (and the benches) to access items defined
//! inside the navigation executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Localisation types - the robot's pose and velocity, and the live pose feed
pub mod loc;

/// Trajectory generation - quintic curves and the velocity bounded horizon search
pub mod traj_gen;

/// Motion execution - streams a planned profile to the drive as body frame velocity demands
pub mod motion_exec;

/// Navigation control - goal intake, preemption of running motions and continuity state
pub mod nav_ctrl;

/// Pose client - subscribes to the pose source and keeps the pose feed up to date
pub mod pose_client;

/// Goal client - recieves goal telecommands from the operator
pub mod goal_client;

/// Command server - publishes velocity demands and finished notifications
pub mod cmd_server;
