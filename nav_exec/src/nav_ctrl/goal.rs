//! Goal intake

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;

use super::{NavCtrlError, Params};
use crate::loc::Pose2D;
use comms_if::tc::{nav::GoalTc, Tc};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What a recieved telecommand asks navigation to do.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GoalOutcome {
    /// Drive to this absolute pose.
    NewGoal(Pose2D),

    /// Stop the current motion, if any, and stay idle.
    CancelCurrent,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Resolve a telecommand into an absolute goal or a cancel.
///
/// Relative goals are resolved against `current`, the pose at the time the goal arrived.
pub fn resolve(
    tc: &Tc,
    current: Option<Pose2D>,
    params: &Params,
) -> Result<GoalOutcome, NavCtrlError> {
    let goal = match tc {
        Tc::NavCancel => return Ok(GoalOutcome::CancelCurrent),
        Tc::NavGoal(g) => g,
    };

    if params.origin_goal_cancels && is_origin(goal) {
        warn!("Goal of (0, 0, 0) recieved, treating as a cancel");
        return Ok(GoalOutcome::CancelCurrent);
    }

    let requested = Pose2D::new(goal.x, goal.y, goal.yaw);
    if !requested.is_finite() {
        return Err(NavCtrlError::InvalidGoal(requested));
    }

    if goal.relative.unwrap_or(params.relative_target) {
        let current = current.ok_or(NavCtrlError::NoCurrentPose)?;
        Ok(GoalOutcome::NewGoal(current.offset_by(&requested)))
    }
    else {
        Ok(GoalOutcome::NewGoal(requested))
    }
}

/// The sentinel is checked on the raw request, before any relative resolution.
fn is_origin(goal: &GoalTc) -> bool {
    goal.x == 0.0 && goal.y == 0.0 && goal.yaw == 0.0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nav_ctrl::params::test::default_params;

    fn goal(x: f64, y: f64, yaw: f64, relative: Option<bool>) -> Tc {
        Tc::NavGoal(GoalTc { x, y, yaw, relative })
    }

    #[test]
    fn test_relative_resolution() {
        let params = default_params();
        let current = Some(Pose2D::new(1.0, 1.0, 0.5));

        assert_eq!(
            resolve(&goal(1.0, 0.0, 0.0, Some(true)), current, &params).unwrap(),
            GoalOutcome::NewGoal(Pose2D::new(2.0, 1.0, 0.5))
        );

        // Absolute goals ignore the current pose
        assert_eq!(
            resolve(&goal(1.0, 0.0, 0.0, Some(false)), current, &params).unwrap(),
            GoalOutcome::NewGoal(Pose2D::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_relative_default() {
        let mut params = default_params();
        params.relative_target = true;

        assert_eq!(
            resolve(&goal(0.5, -0.5, 0.0, None), Some(Pose2D::new(1.0, 1.0, 0.0)), &params).unwrap(),
            GoalOutcome::NewGoal(Pose2D::new(1.5, 0.5, 0.0))
        );

        assert!(matches!(
            resolve(&goal(0.5, -0.5, 0.0, None), None, &params),
            Err(NavCtrlError::NoCurrentPose)
        ));
    }

    #[test]
    fn test_cancels() {
        let mut params = default_params();
        let current = Some(Pose2D::new(3.0, 3.0, 0.0));

        assert_eq!(resolve(&Tc::NavCancel, None, &params).unwrap(), GoalOutcome::CancelCurrent);

        // A relative zero is still the sentinel, it is checked before resolution
        assert_eq!(
            resolve(&goal(0.0, 0.0, 0.0, Some(true)), current, &params).unwrap(),
            GoalOutcome::CancelCurrent
        );

        params.origin_goal_cancels = false;
        assert_eq!(
            resolve(&goal(0.0, 0.0, 0.0, Some(false)), current, &params).unwrap(),
            GoalOutcome::NewGoal(Pose2D::new(0.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_invalid_goal() {
        assert!(matches!(
            resolve(&goal(std::f64::INFINITY, 0.0, 0.0, None), None, &default_params()),
            Err(NavCtrlError::InvalidGoal(_))
        ));
    }
}
