//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the robot's equipment: the pose
//! source feeding the navigation executable, and the drive accepting its velocity demands.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod pose;
