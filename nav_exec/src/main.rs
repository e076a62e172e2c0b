//! Main navigation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the network (pose client, command server, goal client)
//!     - Main loop:
//!         - Telecommand acquisition, from the goal client or a script
//!         - Navigation control processing (resolve, preempt, plan, start)
//!         - Reaping of completed motions
//!     - Shutdown, stopping any motion in progress
//!
//! Motions execute on their own thread at the publish rate, the main loop only needs to run fast
//! enough to pick up new goals promptly.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::{
    net::{zmq, NetParams},
    tc::{Tc, TcResponse},
};
use nav_lib::{
    cmd_server::CmdServer,
    goal_client::{GoalClient, GoalClientError},
    loc::PoseFeed,
    nav_ctrl::{NavCtrl, NavCtrlError, NavEvent, Params},
    pose_client::PoseClient,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    host,
    logger::{logger_init, LevelFilter},
    raise_error,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
#[allow(dead_code)]
enum TcSource {
    None,
    Remote(GoalClient),
    Script(ScriptInterpreter),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Navigation Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| "unknown host".into())
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("nav_ctrl.toml").wrap_err("Could not load navigation params")?;
    params
        .validate()
        .wrap_err("Invalid navigation parameters")?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");
    debug!("Navigation parameters: {:#?}", params);

    // ---- INITIALISE TC SOURCE ----

    // TC source is used to determine whether we're getting TCs from a script
    // or from the operator.
    let mut tc_source = TcSource::None;
    let mut use_goal_client = false;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    if args.len() == 2 {
        info!("Loading script from \"{}\"", &args[1]);

        let si = ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

        info!(
            "Loaded script lasts {:.02} s and contains {} TCs\n",
            si.get_duration(),
            si.get_num_tcs()
        );

        tc_source = TcSource::Script(si);
    }
    // If no arguments then setup the goal client
    else if args.len() == 1 {
        info!("No script provided, goals will be recieved by the GoalClient\n");
        use_goal_client = true;
    }
    else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    }

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let pose_feed = PoseFeed::new();

    let pose_client = PoseClient::new(&zmq_ctx, &net_params, pose_feed.clone())
        .wrap_err("Failed to initialise the PoseClient")?;
    info!("PoseClient initialised");

    let cmd_server = Arc::new(
        CmdServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the CmdServer")?,
    );
    info!("CmdServer initialised");

    if use_goal_client {
        tc_source = TcSource::Remote(
            GoalClient::new(&zmq_ctx, &net_params)
                .wrap_err("Failed to initialise the GoalClient")?,
        );
        info!("GoalClient initialised");
    }

    info!("Network initialisation complete");

    // ---- INITIALISE MODULES ----

    let mut nav_ctrl = NavCtrl::new(params, cmd_server.clone(), pose_feed);
    info!("NavCtrl init complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut script_ended = false;
    let mut pose_seen = false;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        if !pose_seen {
            if let Some(p) = pose_client.pose() {
                info!("First pose recieved: ({:.03}, {:.03}, {:.03})", p.x, p.y, p.yaw);
                pose_seen = true;
            }
        }

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            // If no source no point in continuing so break
            TcSource::None => raise_error!("No TC source present"),

            TcSource::Remote(ref client) => {
                // Get commands until none remain
                loop {
                    match client.recieve_tc() {
                        Ok(Some(tc)) => {
                            let response = match exec_tc(&mut nav_ctrl, &tc) {
                                Ok(_) => TcResponse::Ok,
                                Err(_) => TcResponse::CannotExecute,
                            };

                            if let Err(e) = client.send_response(response) {
                                warn!("Could not respond to TC: {}", e);
                            }
                        }
                        Ok(None) => break,
                        // Not connected just means no operator is present yet
                        Err(GoalClientError::NotConnected) => break,
                        Err(GoalClientError::TcParseError(e)) => {
                            warn!("Could not parse recieved TC: {}", e);
                            break;
                        }
                        Err(GoalClientError::NonUtf8Tc) => {
                            warn!("Recieved a TC which was not valid UTF-8");
                            break;
                        }
                        Err(e) => {
                            return Err(e)
                                .wrap_err("An error occured while receiving TCs from the operator")
                        }
                    }
                }
            }

            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        exec_tc(&mut nav_ctrl, tc).ok();
                    }
                }
                PendingTcs::EndOfScript => {
                    if !script_ended {
                        info!("End of TC script reached, waiting for motion to finish");
                        script_ended = true;
                    }
                }
            },
        };

        // ---- NAVIGATION PROCESSING ----

        match nav_ctrl.poll() {
            Ok(Some(report)) => debug!("Motion ended: {:?}", report.outcome),
            Ok(None) => (),
            Err(e) => error!("Error during NavCtrl processing: {}", e),
        }

        if script_ended && !nav_ctrl.is_active() {
            info!("Script complete, stopping");
            break;
        }

        if !cmd_server.is_connected() && nav_ctrl.is_active() {
            debug!("No drive is listening for velocity commands");
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    // ---- SHUTDOWN ----

    nav_ctrl
        .shutdown()
        .wrap_err("Failed to stop navigation cleanly")?;

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Execute a single telecommand, logging the result.
fn exec_tc(nav_ctrl: &mut NavCtrl, tc: &Tc) -> Result<NavEvent, NavCtrlError> {
    debug!("Executing TC: {:?}", tc);

    let result = nav_ctrl.handle_tc(tc);

    match &result {
        Ok(NavEvent::MotionStarted { target, horizon_s }) => info!(
            "Driving to ({:.03}, {:.03}, {:.03}) over {:.03} s",
            target.x, target.y, target.yaw, horizon_s
        ),
        Ok(NavEvent::GoalReached(_)) => info!("Goal already reached"),
        Ok(NavEvent::Stopped) => (),
        Err(e @ NavCtrlError::NoCurrentPose) => warn!("Goal dropped: {}", e),
        Err(e) => error!("Could not execute TC: {}", e),
    }

    result
}
