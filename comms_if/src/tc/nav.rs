//! # Navigation telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A goal pose to drive to.
///
/// The robot moves along a straight, independent interpolation of x, y and yaw and arrives at
/// rest.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub struct GoalTc {
    /// The x coordinate of the goal, in meters.
    #[structopt(allow_hyphen_values = true)]
    pub x: f64,

    /// The y coordinate of the goal, in meters.
    #[structopt(allow_hyphen_values = true)]
    pub y: f64,

    /// The heading of the goal, in radians.
    ///
    /// Follows the right hand grip rule about the world Z+ (upwards) axis.
    #[structopt(allow_hyphen_values = true)]
    pub yaw: f64,

    /// If `true` the goal is an offset from the pose at the time the goal is received, if
    /// `false` it is absolute. If not given the executable's configured default is used.
    ///
    /// Command line front ends provide their own `--relative`/`--absolute` flags for this.
    #[structopt(skip)]
    #[serde(default)]
    pub relative: Option<bool>,
}
