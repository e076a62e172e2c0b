//! # Trajectory generation module
//!
//! Plans a motion from the current pose to a goal pose as three independent quintic polynomials
//! (x, y and yaw) sharing one horizon. The horizon starts from a distance based guess and is
//! lengthened until the sampled combined velocity is within the configured bound, after which the
//! trajectory is sampled into a velocity profile at the publish rate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod planner;
mod quintic;

pub use planner::*;
pub use quintic::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Goals closer than this in the plane are considered already reached, regardless of yaw.
///
/// Units: meters
pub const DEGENERATE_DIST_M: f64 = 0.001;

/// Scale applied to the yaw rate before it joins the combined velocity metric.
pub const YAW_RATE_SCALE: f64 = 0.3535;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajGenError {
    #[error("The horizon end ({t1} s) must be after the horizon start ({t0} s)")]
    InvalidHorizon { t0: f64, t1: f64 },

    #[error("Boundary conditions must be finite")]
    NonFiniteBoundary,

    #[error("The start pose or the goal pose is not finite")]
    NonFinitePose,

    #[error(
        "No horizon up to {limit_s} s keeps the combined velocity within the bound \
        (last metric was {metric:.04})"
    )]
    HorizonLimitExceeded { limit_s: f64, metric: f64 },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The combined velocity metric of a single sample.
///
/// `cbrt(vx^2 + vy^2 + (vyaw / 0.3535)^2)`. The cube root is what the bound is compared against,
/// so larger planar speeds are penalised less than a euclidean norm would.
pub fn combined_metric(vx: f64, vy: f64, vyaw: f64) -> f64 {
    (vx.powi(2) + vy.powi(2) + (vyaw / YAW_RATE_SCALE).powi(2)).cbrt()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_combined_metric() {
        assert_eq!(combined_metric(0.0, 0.0, 0.0), 0.0);
        assert!((combined_metric(2.0, 2.0, 0.0) - 2.0).abs() < 1e-12);
        assert!((combined_metric(0.0, 0.0, YAW_RATE_SCALE) - 1.0).abs() < 1e-12);
        assert_eq!(combined_metric(-1.0, 0.0, 0.0), combined_metric(1.0, 0.0, 0.0));
    }
}
