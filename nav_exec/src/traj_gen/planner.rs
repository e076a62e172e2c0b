//! Horizon search and velocity profile sampling

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use super::*;
use crate::loc::{Pose2D, Velocity2D};
use util::maths::linspace;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the horizon search.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlannerParams {
    /// Bound on the combined velocity metric.
    pub max_combined_vel: f64,

    /// Rate the profile is sampled at, which is also the rate it is executed at.
    ///
    /// Units: hertz
    pub sample_rate_hz: f64,

    /// Amount the horizon is lengthened by after each rejected candidate.
    ///
    /// Units: seconds
    pub time_step_s: f64,

    /// The search gives up once the horizon exceeds this.
    ///
    /// Units: seconds
    pub max_horizon_s: f64,
}

/// Plans quintic trajectories between poses.
#[derive(Debug, Clone)]
pub struct TrajPlanner {
    params: PlannerParams,
}

/// Three quintic curves sharing the horizon `[0, horizon_s]`.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    pub x: QuinticCurve,
    pub y: QuinticCurve,
    pub yaw: QuinticCurve,
    pub horizon_s: f64,
}

/// One sample of a velocity profile, all in the world frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ProfileSample {
    /// Time since the start of the trajectory, seconds
    pub t_s: f64,

    pub vx: f64,
    pub vy: f64,
    pub vyaw: f64,

    /// Planned yaw at this sample, used to rotate the sample into the body frame.
    pub yaw: f64,
}

/// A trajectory sampled at the publish rate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VelocityProfile {
    pub samples: Vec<ProfileSample>,
}

/// An accepted plan which needs executing.
#[derive(Debug, Clone, Serialize)]
pub struct MotionPlan {
    pub start: Pose2D,
    pub start_vel: Velocity2D,
    pub target: Pose2D,
    pub traj: Trajectory,
    pub profile: VelocityProfile,

    /// Combined velocity metric of the accepted profile
    pub metric: f64,

    /// Number of horizons tried, including the accepted one
    pub num_iterations: usize,

    /// Wall time spent planning
    #[serde(skip)]
    pub plan_time: Duration,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of planning towards a goal.
#[derive(Debug, Clone)]
pub enum Plan {
    /// The goal is within `DEGENERATE_DIST_M` of the current position so no motion is needed.
    Degenerate { dist_m: f64 },

    Motion(MotionPlan),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajPlanner {
    pub fn new(params: PlannerParams) -> Self {
        Self { params }
    }

    /// Plan a motion from `pose`, currently moving at `vel` (world frame), to rest at `target`.
    pub fn plan(
        &self,
        pose: &Pose2D,
        vel: &Velocity2D,
        target: &Pose2D,
    ) -> Result<Plan, TrajGenError> {
        if !pose.is_finite() || !target.is_finite() {
            return Err(TrajGenError::NonFinitePose);
        }

        let plan_start = Instant::now();

        let dist_m = pose.planar_dist(target);

        // Yaw only goals are also caught here, the robot does not turn on the spot
        if dist_m < DEGENERATE_DIST_M {
            debug!("Goal is {:.04} m away, treating as reached", dist_m);
            return Ok(Plan::Degenerate { dist_m });
        }

        // The first sample is always the start velocity, so no horizon can bring the metric
        // below it
        let start_metric = combined_metric(vel.vx, vel.vy, vel.vyaw);
        if start_metric > self.params.max_combined_vel {
            return Err(TrajGenError::HorizonLimitExceeded {
                limit_s: self.params.max_horizon_s,
                metric: start_metric,
            });
        }

        let mut horizon_s = (3.0 * dist_m).cbrt();
        let mut num_iterations = 0;

        loop {
            num_iterations += 1;

            let traj = Trajectory::new(pose, vel, target, horizon_s)?;
            let profile = traj.sample(self.num_samples(horizon_s));
            let metric = profile.metric();

            if metric <= self.params.max_combined_vel {
                let plan_time = plan_start.elapsed();

                info!(
                    "Planned {:.03} m in {:.03} s ({} samples, metric {:.04}, {} iterations)",
                    dist_m,
                    horizon_s,
                    profile.len(),
                    metric,
                    num_iterations
                );
                debug!("Planning took {:.06} s", plan_time.as_secs_f64());

                return Ok(Plan::Motion(MotionPlan {
                    start: *pose,
                    start_vel: *vel,
                    target: *target,
                    traj,
                    profile,
                    metric,
                    num_iterations,
                    plan_time,
                }));
            }

            horizon_s += self.params.time_step_s;

            if horizon_s > self.params.max_horizon_s {
                return Err(TrajGenError::HorizonLimitExceeded {
                    limit_s: self.params.max_horizon_s,
                    metric,
                });
            }
        }
    }

    /// Number of samples taken over a horizon of `horizon_s`.
    pub fn num_samples(&self, horizon_s: f64) -> usize {
        (self.params.sample_rate_hz * horizon_s).floor() as usize
    }
}

impl Trajectory {
    /// Build the three axis curves from `pose` at `vel` to rest at `target` over `[0, horizon_s]`.
    pub fn new(
        pose: &Pose2D,
        vel: &Velocity2D,
        target: &Pose2D,
        horizon_s: f64,
    ) -> Result<Self, TrajGenError> {
        Ok(Self {
            x: QuinticCurve::new(&BoundaryCond::arrive_at_rest(
                horizon_s, pose.x, target.x, vel.vx,
            ))?,
            y: QuinticCurve::new(&BoundaryCond::arrive_at_rest(
                horizon_s, pose.y, target.y, vel.vy,
            ))?,
            yaw: QuinticCurve::new(&BoundaryCond::arrive_at_rest(
                horizon_s, pose.yaw, target.yaw, vel.vyaw,
            ))?,
            horizon_s,
        })
    }

    /// Sample the trajectory at `num_samples` evenly spaced instants over the closed horizon.
    pub fn sample(&self, num_samples: usize) -> VelocityProfile {
        let samples = linspace(0.0, self.horizon_s, num_samples)
            .into_iter()
            .map(|t_s| ProfileSample {
                t_s,
                vx: self.x.vel(t_s),
                vy: self.y.vel(t_s),
                vyaw: self.yaw.vel(t_s),
                yaw: self.yaw.pos(t_s),
            })
            .collect();

        VelocityProfile { samples }
    }

    /// Planned pose at time `t_s`.
    pub fn pose(&self, t_s: f64) -> Pose2D {
        Pose2D::new(self.x.pos(t_s), self.y.pos(t_s), self.yaw.pos(t_s))
    }
}

impl VelocityProfile {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak absolute velocity of each axis over all samples.
    pub fn peak(&self) -> Velocity2D {
        self.samples.iter().fold(Velocity2D::zero(), |peak, s| Velocity2D {
            vx: peak.vx.max(s.vx.abs()),
            vy: peak.vy.max(s.vy.abs()),
            vyaw: peak.vyaw.max(s.vyaw.abs()),
        })
    }

    /// The combined velocity metric of the per-axis peaks.
    pub fn metric(&self) -> f64 {
        let peak = self.peak();
        combined_metric(peak.vx, peak.vy, peak.vyaw)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn planner(max_combined_vel: f64) -> TrajPlanner {
        TrajPlanner::new(PlannerParams {
            max_combined_vel,
            sample_rate_hz: 50.0,
            time_step_s: 0.1,
            max_horizon_s: 600.0,
        })
    }

    fn motion(plan: Plan) -> MotionPlan {
        match plan {
            Plan::Motion(m) => m,
            p => panic!("Expected a motion plan, got {:?}", p),
        }
    }

    #[test]
    fn test_straight_line_goal() {
        let plan = motion(
            planner(1.0)
                .plan(&Pose2D::default(), &Velocity2D::zero(), &Pose2D::new(2.0, 0.0, 0.0))
                .unwrap(),
        );

        let horizon_s = plan.traj.horizon_s;

        assert!(plan.metric <= 1.0 + 1e-9);
        assert!(plan.num_iterations > 1);
        assert_eq!(plan.profile.len(), (50.0 * horizon_s).floor() as usize);

        // The rejected horizon just before the accepted one must have violated the bound
        let prev = Trajectory::new(
            &Pose2D::default(),
            &Velocity2D::zero(),
            &Pose2D::new(2.0, 0.0, 0.0),
            horizon_s - 0.1,
        )
        .unwrap();
        assert!(prev.sample((50.0 * (horizon_s - 0.1)).floor() as usize).metric() > 1.0);

        // Rest at both ends
        let first = plan.profile.samples[0];
        let last = plan.profile.samples[plan.profile.len() - 1];
        assert_eq!(first.vx, 0.0);
        assert!(last.vx.abs() < 1e-9);
        assert_eq!(last.t_s, horizon_s);

        // x goes monotonically from 0 to 2, nothing moves on the other axes
        let xs: Vec<f64> = plan.profile.samples.iter()
            .map(|s| plan.traj.x.pos(s.t_s))
            .collect();
        assert_eq!(xs[0], 0.0);
        assert!((xs[xs.len() - 1] - 2.0).abs() < 1e-9);
        assert!(xs.windows(2).all(|w| w[1] >= w[0]));
        assert!(plan.profile.samples.iter().all(|s| s.vy == 0.0 && s.vyaw == 0.0));
    }

    #[test]
    fn test_metric_bound_holds() {
        let cases = [
            (Pose2D::new(0.0, 0.0, 0.0), Velocity2D::zero(), Pose2D::new(0.01, 0.0, 0.0), 0.2),
            (Pose2D::new(1.0, -1.0, 0.3), Velocity2D::zero(), Pose2D::new(-3.0, 4.0, -1.2), 0.5),
            (Pose2D::new(0.0, 0.0, 0.0), Velocity2D::new(0.3, -0.2, 0.1), Pose2D::new(5.0, 5.0, 3.0), 1.5),
            (Pose2D::new(2.0, 2.0, 6.0), Velocity2D::zero(), Pose2D::new(2.5, 2.0, -6.0), 0.8),
        ];

        for (pose, vel, target, max_vel) in cases.iter() {
            let plan = motion(planner(*max_vel).plan(pose, vel, target).unwrap());

            assert!(plan.metric <= max_vel + 1e-9, "metric {} over {}", plan.metric, max_vel);
            assert!(plan.traj.horizon_s >= (3.0 * pose.planar_dist(target)).cbrt());

            // The plan starts from the given velocity and ends at the target
            assert!((plan.traj.x.vel(0.0) - vel.vx).abs() < 1e-9);
            let end = plan.traj.pose(plan.traj.horizon_s);
            assert!(end.planar_dist(target) < 1e-9);
            assert!((end.yaw - target.yaw).abs() < 1e-9);
        }
    }

    #[test]
    fn test_metric_never_increases_with_horizon() {
        let pose = Pose2D::new(0.0, 0.0, 0.2);
        let vel = Velocity2D::new(0.4, 0.1, -0.05);
        let target = Pose2D::new(3.0, -1.0, 1.0);

        // Fixed normalised grid so every horizon is compared on the same sample phases
        let metric_at = |horizon_s: f64| {
            let traj = Trajectory::new(&pose, &vel, &target, horizon_s).unwrap();
            traj.sample(1001).metric()
        };

        let mut prev = metric_at(1.0);
        for i in 1..100 {
            let m = metric_at(1.0 + 0.1 * i as f64);
            assert!(m <= prev + 1e-12, "metric rose from {} to {} at step {}", prev, m, i);
            prev = m;
        }
    }

    #[test]
    fn test_degenerate_goal() {
        let pose = Pose2D::new(1.0, 2.0, 0.0);

        assert!(matches!(
            planner(1.0).plan(&pose, &Velocity2D::zero(), &pose),
            Ok(Plan::Degenerate { .. })
        ));

        // Yaw only changes are not planned
        assert!(matches!(
            planner(1.0).plan(&pose, &Velocity2D::zero(), &Pose2D::new(1.0, 2.0, 1.5)),
            Ok(Plan::Degenerate { .. })
        ));
    }

    #[test]
    fn test_search_errors() {
        let tight = TrajPlanner::new(PlannerParams {
            max_combined_vel: 0.5,
            sample_rate_hz: 50.0,
            time_step_s: 0.1,
            max_horizon_s: 2.0,
        });

        // Already moving faster than the bound allows, so no horizon can satisfy it
        assert!(matches!(
            tight.plan(&Pose2D::default(), &Velocity2D::new(2.0, 0.0, 0.0), &Pose2D::new(1.0, 0.0, 0.0)),
            Err(TrajGenError::HorizonLimitExceeded { .. })
        ));

        assert!(matches!(
            tight.plan(&Pose2D::default(), &Velocity2D::zero(), &Pose2D::new(std::f64::NAN, 0.0, 0.0)),
            Err(TrajGenError::NonFinitePose)
        ));
    }
}
