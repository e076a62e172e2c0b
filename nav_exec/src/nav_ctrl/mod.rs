//! # Navigation control module
//!
//! Navigation control sits between the goal sources and the motion executor. For each
//! telecommand it:
//!
//! 1. Resolves the goal (relative offsets, the origin cancel sentinel).
//! 2. Cancels and joins any active run, taking back the continuity state.
//! 3. Plans from the latest pose and the continuity state to the goal.
//! 4. Either completes immediately (goal already reached) or spawns a new run.
//!
//! Only one run is ever active. Joining the old run before the new one starts means its stop
//! command is always published before any command of the new run.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod goal;
mod params;

pub use goal::*;
pub use params::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    loc::{Pose2D, PoseFeed},
    motion_exec::{CmdSink, MotionExecutor, MotionState, RunHandle, RunOutcome, RunReport},
    traj_gen::{Plan, TrajGenError, TrajPlanner},
};
use comms_if::tc::Tc;
use util::session;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Archive path of saved profiles, a timestamp is added to each file.
const PROFILE_ARCH_PATH: &str = "profiles/profile.json";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct NavCtrl {
    params: Params,

    planner: TrajPlanner,

    executor: Arc<MotionExecutor>,

    pose_feed: PoseFeed,

    /// Continuity state. `None` while it is owned by the active run.
    state: Option<MotionState>,

    /// The run currently executing, if any
    active: Option<RunHandle>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What handling a telecommand did.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NavEvent {
    /// A new run is driving to `target`.
    MotionStarted { target: Pose2D, horizon_s: f64 },

    /// The goal was already reached so finished was reported straight away.
    GoalReached(Pose2D),

    /// Any motion was stopped and navigation is idle.
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum NavCtrlError {
    #[error("No current pose available, has the pose source started publishing?")]
    NoCurrentPose,

    #[error("The goal {0:?} is not finite")]
    InvalidGoal(Pose2D),

    #[error("Could not plan a trajectory to the goal: {0}")]
    PlanError(TrajGenError),

    #[error("Could not start the motion thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The motion thread panicked, continuity state has been reset")]
    RunPanicked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavCtrl {
    /// Create a new navigation controller.
    ///
    /// The parameters are expected to have already been validated.
    pub fn new(params: Params, sink: Arc<dyn CmdSink>, pose_feed: PoseFeed) -> Self {
        let planner = TrajPlanner::new(params.planner_params());
        let executor = Arc::new(MotionExecutor::new(
            params.exec_params(),
            sink,
            pose_feed.clone(),
        ));

        Self {
            params,
            planner,
            executor,
            pose_feed,
            state: Some(MotionState::at_rest()),
            active: None,
        }
    }

    /// Handle a single telecommand.
    ///
    /// Any active run is cancelled and joined before a new one is planned. A telecommand which
    /// can't be resolved leaves the active run untouched.
    pub fn handle_tc(&mut self, tc: &Tc) -> Result<NavEvent, NavCtrlError> {
        let outcome = goal::resolve(tc, self.pose_feed.latest(), &self.params)?;

        let preempted = self.preempt()?;

        match outcome {
            GoalOutcome::CancelCurrent => {
                // Already stopped by the cancelled run
                if preempted.is_none() {
                    self.executor.stop();
                }
                info!("Navigation stopped");
                Ok(NavEvent::Stopped)
            }
            GoalOutcome::NewGoal(target) => self.start(target),
        }
    }

    /// Reap the active run if it has ended, without blocking.
    pub fn poll(&mut self) -> Result<Option<RunReport>, NavCtrlError> {
        let ended = match self.active {
            Some(ref h) => h.is_finished(),
            None => false,
        };

        match self.active.take() {
            Some(h) if ended => self.reap(h).map(Some),
            other => {
                self.active = other;
                Ok(None)
            }
        }
    }

    /// Cancel and join any active run.
    pub fn shutdown(&mut self) -> Result<(), NavCtrlError> {
        if self.preempt()?.is_none() {
            self.executor.stop();
        }

        info!("Navigation shut down");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The continuity state, or `None` while a run owns it.
    pub fn motion_state(&self) -> Option<MotionState> {
        self.state
    }

    fn start(&mut self, target: Pose2D) -> Result<NavEvent, NavCtrlError> {
        let pose = self.pose_feed.latest().ok_or(NavCtrlError::NoCurrentPose)?;
        let state = self.take_state();

        info!(
            "New goal ({:.03}, {:.03}, {:.03}) from ({:.03}, {:.03}, {:.03})",
            target.x, target.y, target.yaw, pose.x, pose.y, pose.yaw
        );

        let plan = match self.planner.plan(&pose, &state.last_cmd_vel, &target) {
            Ok(p) => p,
            Err(e) => {
                self.state = Some(state);
                return Err(NavCtrlError::PlanError(e));
            }
        };

        match plan {
            Plan::Degenerate { dist_m } => {
                self.state = Some(state);
                info!("Already {:.04} m from the goal, reporting finished", dist_m);
                self.executor.finish_immediately();
                Ok(NavEvent::GoalReached(target))
            }
            Plan::Motion(plan) => {
                if self.params.save_profiles {
                    session::save_with_timestamp(PROFILE_ARCH_PATH, plan.clone());
                }

                let horizon_s = plan.traj.horizon_s;

                match self.executor.clone().spawn(plan, state) {
                    Ok(h) => {
                        self.active = Some(h);
                        Ok(NavEvent::MotionStarted { target, horizon_s })
                    }
                    Err(e) => {
                        self.state = Some(state);
                        Err(NavCtrlError::SpawnError(e))
                    }
                }
            }
        }
    }

    fn preempt(&mut self) -> Result<Option<RunReport>, NavCtrlError> {
        match self.active.take() {
            Some(h) => {
                let target = h.target();
                debug!(
                    "Preempting motion to ({:.03}, {:.03}, {:.03})",
                    target.x, target.y, target.yaw
                );

                h.cancel();
                self.reap(h).map(Some)
            }
            None => Ok(None),
        }
    }

    fn reap(&mut self, handle: RunHandle) -> Result<RunReport, NavCtrlError> {
        match handle.join() {
            Ok(report) => {
                self.state = Some(report.state);

                if let Some(yaw) = report.state.tracked_yaw {
                    debug!("Heading demanded at end of run: {:.03} rad", yaw);
                }

                match report.outcome {
                    RunOutcome::Finished => debug!(
                        "Run finished: {} commands in {:.03} s",
                        report.num_cmds_sent,
                        report.elapsed.as_secs_f64()
                    ),
                    RunOutcome::Cancelled => info!(
                        "Motion to ({:.03}, {:.03}, {:.03}) preempted after {} commands",
                        report.target.x,
                        report.target.y,
                        report.target.yaw,
                        report.num_cmds_sent
                    ),
                }

                Ok(report)
            }
            Err(_) => {
                error!("Motion thread panicked");
                self.state = Some(MotionState::at_rest());
                Err(NavCtrlError::RunPanicked)
            }
        }
    }

    fn take_state(&mut self) -> MotionState {
        match self.state.take() {
            Some(s) => s,
            None => {
                warn!("Continuity state missing while idle, assuming the robot is at rest");
                MotionState::at_rest()
            }
        }
    }
}

impl Drop for NavCtrl {
    /// Cancel and join any active run so that the drive is always left with a stop command.
    fn drop(&mut self) {
        if let Some(h) = self.active.take() {
            warn!("NavCtrl dropped with a motion in progress, stopping it");
            h.cancel();
            if h.join().is_err() {
                error!("Motion thread panicked while stopping");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::motion_exec::{
        test_sink::{Event, RecordingSink},
        SinkError,
    };
    use comms_if::{eqpt::drive::VelocityCmd, tc::nav::GoalTc};
    use super::params::test::default_params;

    fn goal(x: f64, y: f64, yaw: f64) -> Tc {
        Tc::NavGoal(GoalTc {
            x,
            y,
            yaw,
            relative: Some(false),
        })
    }

    fn nav_at(pose: Pose2D) -> (NavCtrl, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let feed = PoseFeed::new();
        feed.update(pose);

        (NavCtrl::new(default_params(), sink.clone(), feed), sink)
    }

    fn wait_idle(nav: &mut NavCtrl) {
        let start = Instant::now();
        while nav.is_active() {
            nav.poll().unwrap();
            assert!(start.elapsed() < Duration::from_secs(10), "run never ended");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_single_goal_finishes_once() {
        let (mut nav, sink) = nav_at(Pose2D::default());

        assert!(matches!(
            nav.handle_tc(&goal(0.05, 0.0, 0.0)).unwrap(),
            NavEvent::MotionStarted { .. }
        ));
        assert!(nav.is_active());
        assert_eq!(nav.motion_state(), None);

        wait_idle(&mut nav);

        assert_eq!(sink.num_finished(), 1);
        assert_eq!(sink.events().last(), Some(&Event::Finished));
        assert!(nav.motion_state().is_some());
    }

    #[test]
    fn test_preempted_goal_never_finishes() {
        let (mut nav, sink) = nav_at(Pose2D::default());

        nav.handle_tc(&goal(3.0, 0.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(300));
        nav.handle_tc(&goal(0.05, 0.0, 0.0)).unwrap();

        // The first run has handed back its state, the second has taken it
        assert!(nav.is_active());

        wait_idle(&mut nav);

        assert_eq!(sink.num_finished(), 1);
        assert_eq!(sink.events().last(), Some(&Event::Finished));

        // Every event of the cancelled run, ending in its stop, comes before any of the new run
        let tagged = sink.tagged_events();
        let first_run = tagged[0].0;
        let num_first = tagged.iter().take_while(|(t, _)| *t == first_run).count();

        assert!(num_first >= 2);
        assert_eq!(tagged[num_first - 1].1, Event::Vel(VelocityCmd::stop()));
        assert!(tagged[..num_first].iter().all(|(_, e)| *e != Event::Finished));

        let second_run = tagged[num_first].0;
        assert!(tagged[num_first..].iter().all(|(t, _)| *t == second_run));
    }

    #[test]
    fn test_drop_stops_active_run() {
        let (mut nav, sink) = nav_at(Pose2D::default());

        nav.handle_tc(&goal(3.0, 0.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(100));
        drop(nav);

        let num_events = sink.events().len();
        assert_eq!(sink.events().last(), Some(&Event::Vel(VelocityCmd::stop())));
        assert_eq!(sink.num_finished(), 0);

        // The run was joined, nothing is published after the drop
        thread::sleep(Duration::from_millis(100));
        assert_eq!(sink.events().len(), num_events);
    }

    #[test]
    fn test_chain_of_preemptions_never_finishes() {
        let (mut nav, sink) = nav_at(Pose2D::default());

        nav.handle_tc(&goal(3.0, 0.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(100));
        nav.handle_tc(&goal(0.0, 3.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(100));
        nav.handle_tc(&goal(-3.0, 0.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(100));
        nav.shutdown().unwrap();

        assert!(!nav.is_active());
        assert_eq!(sink.num_finished(), 0);
        assert_eq!(sink.events().last(), Some(&Event::Vel(VelocityCmd::stop())));
    }

    #[test]
    fn test_continuity_state_carried_over() {
        let (mut nav, _sink) = nav_at(Pose2D::default());

        nav.handle_tc(&goal(3.0, 0.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(nav.handle_tc(&Tc::NavCancel).unwrap(), NavEvent::Stopped);

        let state = nav.motion_state().unwrap();
        assert!(state.last_cmd_vel.vx > 0.0);
        assert_eq!(state.last_cmd_vel.vy, 0.0);
        assert_eq!(state.tracked_yaw, Some(0.0));
    }

    #[test]
    fn test_degenerate_goal() {
        let (mut nav, sink) = nav_at(Pose2D::new(1.0, 2.0, 0.0));

        assert_eq!(
            nav.handle_tc(&goal(1.0, 2.0, 0.0)).unwrap(),
            NavEvent::GoalReached(Pose2D::new(1.0, 2.0, 0.0))
        );
        assert!(!nav.is_active());
        assert_eq!(sink.events(), vec![Event::Vel(VelocityCmd::stop()), Event::Finished]);
        assert_eq!(nav.motion_state(), Some(MotionState::at_rest()));
    }

    #[test]
    fn test_origin_sentinel_cancels() {
        let (mut nav, sink) = nav_at(Pose2D::new(1.0, 1.0, 0.0));

        nav.handle_tc(&goal(3.0, 1.0, 0.0)).unwrap();
        thread::sleep(Duration::from_millis(100));

        assert_eq!(nav.handle_tc(&goal(0.0, 0.0, 0.0)).unwrap(), NavEvent::Stopped);
        assert!(!nav.is_active());
        assert_eq!(sink.num_finished(), 0);
    }

    #[test]
    fn test_no_pose_drops_goal() {
        let sink = Arc::new(RecordingSink::default());
        let mut nav = NavCtrl::new(default_params(), sink.clone(), PoseFeed::new());

        assert!(matches!(
            nav.handle_tc(&goal(1.0, 0.0, 0.0)),
            Err(NavCtrlError::NoCurrentPose)
        ));
        assert!(!nav.is_active());
        assert!(sink.events().is_empty());

        // Nothing was running, so a shutdown just makes sure the robot is stopped
        nav.shutdown().unwrap();
        assert_eq!(sink.events(), vec![Event::Vel(VelocityCmd::stop())]);
    }

    #[derive(Default)]
    struct PanickingSink;

    impl CmdSink for PanickingSink {
        fn send_vel_cmd(&self, _cmd: &VelocityCmd) -> Result<(), SinkError> {
            panic!("drive exploded")
        }

        fn send_finished(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn test_panicked_run_resets_state() {
        let feed = PoseFeed::new();
        feed.update(Pose2D::default());
        let mut nav = NavCtrl::new(default_params(), Arc::new(PanickingSink), feed);

        nav.handle_tc(&goal(1.0, 0.0, 0.0)).unwrap();

        let start = Instant::now();
        let result = loop {
            match nav.poll() {
                Ok(None) => (),
                other => break other,
            }
            assert!(start.elapsed() < Duration::from_secs(5), "run never ended");
            thread::sleep(Duration::from_millis(10));
        };

        assert!(matches!(result, Err(NavCtrlError::RunPanicked)));
        assert!(!nav.is_active());
        assert_eq!(nav.motion_state(), Some(MotionState::at_rest()));
    }
}
