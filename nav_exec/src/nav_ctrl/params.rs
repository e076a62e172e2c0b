//! Navigation control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    motion_exec::{ExecParams, YawSource},
    traj_gen::PlannerParams,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for navigation control, loaded from `nav_ctrl.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Bound on the combined velocity metric of a planned profile.
    pub max_vel: f64,

    /// Negate body X commands, for drives mounted backwards.
    pub reverse_x: bool,

    /// Negate body Y commands.
    pub reverse_y: bool,

    /// Positional tolerance of a reached goal. Only used for reporting.
    ///
    /// Units: meters
    pub tolerance_m: f64,

    /// Angular tolerance of a reached goal. Only used for reporting.
    ///
    /// Units: radians
    pub tolerance_rad: f64,

    /// Rate the trajectory is sampled and commanded at.
    ///
    /// Units: hertz
    pub publish_rate_hz: f64,

    /// Horizon increment of the planner search.
    ///
    /// Units: seconds
    pub time_step_s: f64,

    /// Gain applied to every commanded channel.
    pub speed_offset_rate: f64,

    /// Whether goals without an explicit relative flag are offsets from the current pose.
    pub relative_target: bool,

    /// The planner gives up on goals needing a longer horizon than this.
    ///
    /// Units: seconds
    #[serde(default = "default_max_horizon_s")]
    pub max_horizon_s: f64,

    /// Which yaw commands are rotated into the body frame with.
    #[serde(default)]
    pub yaw_source: YawSource,

    /// Treat a goal of exactly `(0, 0, 0)` as a cancel.
    #[serde(default = "default_true")]
    pub origin_goal_cancels: bool,

    /// Archive every planned profile into the session directory.
    #[serde(default)]
    pub save_profiles: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("The {0} parameter must be finite")]
    NotFinite(&'static str),

    #[error("The {0} parameter must be greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("The {0} parameter must not be negative, found {1}")]
    Negative(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters can produce a plan for any goal.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let all = [
            ("max_vel", self.max_vel),
            ("tolerance_m", self.tolerance_m),
            ("tolerance_rad", self.tolerance_rad),
            ("publish_rate_hz", self.publish_rate_hz),
            ("time_step_s", self.time_step_s),
            ("speed_offset_rate", self.speed_offset_rate),
            ("max_horizon_s", self.max_horizon_s),
        ];

        if let Some((name, _)) = all.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ParamsError::NotFinite(*name));
        }

        let positive = [
            ("max_vel", self.max_vel),
            ("publish_rate_hz", self.publish_rate_hz),
            ("time_step_s", self.time_step_s),
            ("max_horizon_s", self.max_horizon_s),
        ];

        if let Some((name, v)) = positive.iter().find(|(_, v)| *v <= 0.0) {
            return Err(ParamsError::NotPositive(*name, *v));
        }

        let non_negative = [
            ("speed_offset_rate", self.speed_offset_rate),
            ("tolerance_m", self.tolerance_m),
            ("tolerance_rad", self.tolerance_rad),
        ];

        if let Some((name, v)) = non_negative.iter().find(|(_, v)| *v < 0.0) {
            return Err(ParamsError::Negative(*name, *v));
        }

        Ok(())
    }

    pub fn planner_params(&self) -> PlannerParams {
        PlannerParams {
            max_combined_vel: self.max_vel,
            sample_rate_hz: self.publish_rate_hz,
            time_step_s: self.time_step_s,
            max_horizon_s: self.max_horizon_s,
        }
    }

    pub fn exec_params(&self) -> ExecParams {
        ExecParams {
            tick_period: Duration::from_secs_f64(1.0 / self.publish_rate_hz),
            reverse_x: self.reverse_x,
            reverse_y: self.reverse_y,
            speed_scale: self.speed_offset_rate,
            yaw_source: self.yaw_source,
            tolerance_m: self.tolerance_m,
            tolerance_rad: self.tolerance_rad,
        }
    }
}

fn default_max_horizon_s() -> f64 {
    600.0
}

fn default_true() -> bool {
    true
}
