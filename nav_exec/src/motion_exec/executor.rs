//! Motion executor and run handles

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

use super::*;
use crate::{
    loc::{Pose2D, PoseFeed, Velocity2D},
    traj_gen::{MotionPlan, ProfileSample},
};
use util::maths::get_ang_dist_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the executor, fixed for the life of the executable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ExecParams {
    /// Time between two consecutive commands
    pub tick_period: Duration,

    /// Negate the body X command
    pub reverse_x: bool,

    /// Negate the body Y command
    pub reverse_y: bool,

    /// Gain applied to every command channel
    pub speed_scale: f64,

    pub yaw_source: YawSource,

    /// Positional tolerance checked when a run completes.
    ///
    /// Units: meters
    pub tolerance_m: f64,

    /// Angular tolerance checked when a run completes.
    ///
    /// Units: radians
    pub tolerance_rad: f64,
}

/// Executes velocity profiles against a command sink.
pub struct MotionExecutor {
    params: ExecParams,
    sink: Arc<dyn CmdSink>,
    pose_feed: PoseFeed,
}

/// Summary of a run, returned when its thread is joined.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,

    /// Number of profile commands published, not counting the final stop
    pub num_cmds_sent: usize,

    /// The continuity state at the end of the run
    pub state: MotionState,

    pub target: Pose2D,

    #[serde(skip)]
    pub elapsed: Duration,
}

/// Handle onto a run executing in its own thread.
pub struct RunHandle {
    token: CancelToken,
    target: Pose2D,
    jh: JoinHandle<RunReport>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionExecutor {
    pub fn new(params: ExecParams, sink: Arc<dyn CmdSink>, pose_feed: PoseFeed) -> Self {
        Self {
            params,
            sink,
            pose_feed,
        }
    }

    /// Start executing `plan` in a new thread, taking ownership of the continuity state until the
    /// returned handle is joined.
    pub fn spawn(self: Arc<Self>, plan: MotionPlan, state: MotionState) -> std::io::Result<RunHandle> {
        let token = CancelToken::new();
        let run_token = token.clone();
        let target = plan.target;

        let jh = thread::Builder::new()
            .name("motion_run".into())
            .spawn(move || self.run(&plan, &run_token, state))?;

        Ok(RunHandle { token, target, jh })
    }

    /// Execute `plan` on the calling thread until it completes or `token` is cancelled.
    pub fn run(&self, plan: &MotionPlan, token: &CancelToken, mut state: MotionState) -> RunReport {
        let run_start = Instant::now();
        let num_samples = plan.profile.len();
        let mut num_cmds_sent = 0;

        debug!(
            "Executing {} commands at {:.01} Hz",
            num_samples,
            1.0 / self.params.tick_period.as_secs_f64()
        );

        for (i, sample) in plan.profile.samples.iter().enumerate() {
            if token.take() {
                return self.cancelled(plan, state, num_cmds_sent, run_start);
            }

            let yaw = self.rotation_yaw(sample);
            state.tracked_yaw = Some(yaw);

            let cmd = self.body_frame_cmd(sample, yaw);
            trace!("Command {}/{}: {:?}", i + 1, num_samples, cmd);
            self.publish(&cmd);
            num_cmds_sent += 1;

            state.last_cmd_vel = Velocity2D::new(sample.vx, sample.vy, sample.vyaw);

            self.wait_for_tick(run_start, i + 1);
        }

        // A cancel landing during the final tick still supersedes this run
        if token.take() {
            return self.cancelled(plan, state, num_cmds_sent, run_start);
        }

        self.stop();
        if let Err(e) = self.sink.send_finished() {
            warn!("Could not publish the finished notification: {}", e);
        }

        info!(
            "Motion to ({:.03}, {:.03}, {:.03}) complete",
            plan.target.x, plan.target.y, plan.target.yaw
        );
        self.check_tolerance(&plan.target);

        RunReport {
            outcome: RunOutcome::Finished,
            num_cmds_sent,
            state,
            target: plan.target,
            elapsed: run_start.elapsed(),
        }
    }

    /// Complete a goal which needs no motion: stop, then report finished.
    pub fn finish_immediately(&self) {
        self.stop();
        if let Err(e) = self.sink.send_finished() {
            warn!("Could not publish the finished notification: {}", e);
        }
    }

    /// Publish a zero velocity demand.
    pub fn stop(&self) {
        self.publish(&VelocityCmd::stop());
    }

    /// Rotate a world frame sample by `yaw` into the body frame and apply the reversal factors and
    /// speed scale.
    pub fn body_frame_cmd(&self, sample: &ProfileSample, yaw: f64) -> VelocityCmd {
        let body = Rotation2::new(-yaw) * Vector2::new(sample.vx, sample.vy);

        let rx = if self.params.reverse_x { -1.0 } else { 1.0 };
        let ry = if self.params.reverse_y { -1.0 } else { 1.0 };

        VelocityCmd {
            linear_x: body[0] * self.params.speed_scale * rx,
            linear_y: body[1] * self.params.speed_scale * ry,
            angular_rate: sample.vyaw * self.params.speed_scale,
        }
    }

    fn rotation_yaw(&self, sample: &ProfileSample) -> f64 {
        match self.params.yaw_source {
            YawSource::Planned => sample.yaw,
            YawSource::Live => self
                .pose_feed
                .latest()
                .map(|p| p.yaw)
                .unwrap_or(sample.yaw),
        }
    }

    fn publish(&self, cmd: &VelocityCmd) {
        if let Err(e) = self.sink.send_vel_cmd(cmd) {
            warn!("Could not publish velocity command: {}", e);
        }
    }

    fn cancelled(
        &self,
        plan: &MotionPlan,
        state: MotionState,
        num_cmds_sent: usize,
        run_start: Instant,
    ) -> RunReport {
        self.stop();

        info!(
            "Motion to ({:.03}, {:.03}, {:.03}) cancelled after {} of {} commands",
            plan.target.x,
            plan.target.y,
            plan.target.yaw,
            num_cmds_sent,
            plan.profile.len()
        );

        RunReport {
            outcome: RunOutcome::Cancelled,
            num_cmds_sent,
            state,
            target: plan.target,
            elapsed: run_start.elapsed(),
        }
    }

    /// Sleep until tick `tick` of the run, measured from the run start so that late ticks don't
    /// push back the rest of the schedule.
    fn wait_for_tick(&self, run_start: Instant, tick: usize) {
        let deadline = run_start + self.params.tick_period * tick as u32;
        let now = Instant::now();

        if deadline >= now {
            thread::sleep(deadline - now);
        }
        else {
            warn!(
                "Motion tick {} overran by {:.06} s",
                tick,
                (now - deadline).as_secs_f64()
            );
        }
    }

    fn check_tolerance(&self, target: &Pose2D) {
        let pose = match self.pose_feed.latest() {
            Some(p) => p,
            None => return,
        };

        let pos_err_m = pose.planar_dist(target);
        let ang_err_rad = get_ang_dist_2pi(pose.yaw, target.yaw).abs();

        if pos_err_m > self.params.tolerance_m || ang_err_rad > self.params.tolerance_rad {
            warn!(
                "Goal reached outside of tolerance: position error {:.03} m, heading error {:.03} rad",
                pos_err_m, ang_err_rad
            );
        }
        else {
            debug!(
                "Goal reached within tolerance: position error {:.03} m, heading error {:.03} rad",
                pos_err_m, ang_err_rad
            );
        }
    }
}

impl RunHandle {
    /// The goal this run is driving to.
    pub fn target(&self) -> Pose2D {
        self.target
    }

    /// Ask the run to stop at its next tick. Does not wait for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the run thread has returned, so that joining it won't block.
    pub fn is_finished(&self) -> bool {
        self.jh.is_finished()
    }

    /// Wait for the run to end and get its report.
    ///
    /// Returns `Err` with the panic payload if the run thread panicked.
    pub fn join(self) -> thread::Result<RunReport> {
        self.jh.join()
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::{
        motion_exec::test_sink::{Event, RecordingSink},
        traj_gen::{Plan, PlannerParams, TrajPlanner},
    };

    fn exec_params(tick_ms: u64) -> ExecParams {
        ExecParams {
            tick_period: Duration::from_millis(tick_ms),
            reverse_x: false,
            reverse_y: false,
            speed_scale: 1.0,
            yaw_source: YawSource::Planned,
            tolerance_m: 0.05,
            tolerance_rad: 0.05,
        }
    }

    fn plan_to(start: Pose2D, target: Pose2D) -> MotionPlan {
        let planner = TrajPlanner::new(PlannerParams {
            max_combined_vel: 1.0,
            sample_rate_hz: 50.0,
            time_step_s: 0.1,
            max_horizon_s: 600.0,
        });

        match planner.plan(&start, &Velocity2D::zero(), &target).unwrap() {
            Plan::Motion(m) => m,
            p => panic!("Expected a motion plan, got {:?}", p),
        }
    }

    #[test]
    fn test_run_to_completion() {
        let sink = Arc::new(RecordingSink::default());
        let exec = MotionExecutor::new(exec_params(1), sink.clone(), PoseFeed::new());
        let plan = plan_to(Pose2D::default(), Pose2D::new(2.0, 0.0, 0.0));
        let num_samples = (50.0 * plan.traj.horizon_s).floor() as usize;

        let report = exec.run(&plan, &CancelToken::new(), MotionState::at_rest());

        assert_eq!(report.outcome, RunOutcome::Finished);
        assert_eq!(report.num_cmds_sent, num_samples);

        let events = sink.events();
        assert_eq!(events.len(), num_samples + 2);
        assert_eq!(events[num_samples], Event::Vel(VelocityCmd::stop()));
        assert_eq!(events[num_samples + 1], Event::Finished);
        assert_eq!(sink.num_finished(), 1);

        // Driving along world X with zero yaw is all body X
        assert!(events[..num_samples].iter().all(|e| match e {
            Event::Vel(c) => c.linear_x > -1e-9 && c.linear_y == 0.0 && c.angular_rate == 0.0,
            _ => false,
        }));

        assert!(report.state.last_cmd_vel.vx.abs() < 1e-9);
        assert_eq!(report.state.tracked_yaw, Some(0.0));
    }

    #[test]
    fn test_cancel_never_finishes() {
        let sink = Arc::new(RecordingSink::default());
        let exec = MotionExecutor::new(exec_params(1), sink.clone(), PoseFeed::new());
        let plan = plan_to(Pose2D::default(), Pose2D::new(1.0, 1.0, 0.0));
        let state = MotionState {
            last_cmd_vel: Velocity2D::new(0.1, 0.0, 0.0),
            tracked_yaw: None,
        };

        let token = CancelToken::new();
        token.cancel();
        let report = exec.run(&plan, &token, state);

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert_eq!(report.num_cmds_sent, 0);
        assert_eq!(report.state, state);
        assert_eq!(sink.events(), vec![Event::Vel(VelocityCmd::stop())]);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_spawned_run() {
        let sink = Arc::new(RecordingSink::default());
        let exec = Arc::new(MotionExecutor::new(exec_params(5), sink.clone(), PoseFeed::new()));
        let plan = plan_to(Pose2D::default(), Pose2D::new(2.0, 0.0, 0.0));
        let num_samples = plan.profile.len();

        let handle = exec.spawn(plan, MotionState::at_rest()).unwrap();
        assert_eq!(handle.target(), Pose2D::new(2.0, 0.0, 0.0));

        thread::sleep(Duration::from_millis(50));
        handle.cancel();
        let report = handle.join().unwrap();

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert!(report.num_cmds_sent > 0 && report.num_cmds_sent < num_samples);
        assert_eq!(sink.num_finished(), 0);
        assert_eq!(sink.num_vel_cmds(), report.num_cmds_sent + 1);
        assert_eq!(sink.events().last(), Some(&Event::Vel(VelocityCmd::stop())));

        // Mid motion, so the continuity state carries a non-zero velocity
        assert!(report.state.last_cmd_vel.vx > 0.0);
    }

    #[test]
    fn test_body_frame_rotation() {
        let sink = Arc::new(RecordingSink::default());
        let exec = MotionExecutor::new(
            ExecParams {
                reverse_x: true,
                speed_scale: 0.5,
                ..exec_params(1)
            },
            sink,
            PoseFeed::new(),
        );

        // Moving along world Y while facing world Y is forwards in the body frame
        let sample = ProfileSample {
            t_s: 0.0,
            vx: 0.0,
            vy: 1.0,
            vyaw: 0.2,
            yaw: FRAC_PI_2,
        };
        let cmd = exec.body_frame_cmd(&sample, sample.yaw);

        assert!((cmd.linear_x + 0.5).abs() < 1e-12);
        assert!(cmd.linear_y.abs() < 1e-12);
        assert!((cmd.angular_rate - 0.1).abs() < 1e-12);

        // Moving along world X while facing world Y is to the right
        let cmd = exec.body_frame_cmd(&ProfileSample { vx: 1.0, vy: 0.0, ..sample }, FRAC_PI_2);
        assert!(cmd.linear_x.abs() < 1e-12);
        assert!((cmd.linear_y + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_live_yaw_source() {
        let feed = PoseFeed::new();
        let exec = MotionExecutor::new(
            ExecParams {
                yaw_source: YawSource::Live,
                ..exec_params(1)
            },
            Arc::new(RecordingSink::default()),
            feed.clone(),
        );
        let sample = ProfileSample {
            vx: 1.0,
            ..Default::default()
        };

        // No pose yet so the planned yaw is used
        assert_eq!(exec.rotation_yaw(&sample), 0.0);

        feed.update(Pose2D::new(0.0, 0.0, FRAC_PI_2));
        assert_eq!(exec.rotation_yaw(&sample), FRAC_PI_2);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let sink = Arc::new(RecordingSink::default());
        let exec = MotionExecutor::new(
            ExecParams {
                reverse_x: true,
                reverse_y: true,
                ..exec_params(1)
            },
            sink.clone(),
            PoseFeed::new(),
        );

        assert!(exec.body_frame_cmd(&ProfileSample::default(), 1.2).is_stop());

        exec.stop();
        exec.stop();
        assert_eq!(
            sink.events(),
            vec![Event::Vel(VelocityCmd::stop()), Event::Vel(VelocityCmd::stop())]
        );
    }

    #[test]
    fn test_finish_immediately() {
        let sink = Arc::new(RecordingSink::default());
        let exec = MotionExecutor::new(exec_params(1), sink.clone(), PoseFeed::new());

        exec.finish_immediately();

        assert_eq!(sink.events(), vec![Event::Vel(VelocityCmd::stop()), Event::Finished]);
    }
}
