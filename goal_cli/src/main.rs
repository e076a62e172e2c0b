//! Command line goal sender.
//!
//! Reads commands from an interactive prompt and sends them to `nav_exec` as telecommands:
//!
//! ```text
//! nav $ goal 2.0 0.0 0.0
//! nav $ goal 0.5 -0.5 1.57 --relative
//! nav $ cancel
//! nav $ exit
//! ```

use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Report};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::{clap::AppSettings, StructOpt};

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    tc::{nav::GoalTc, Tc, TcResponse},
};

const PROMPT: &str = "nav $ ";

/// Command line options of the executable itself.
#[derive(Debug, StructOpt)]
#[structopt(name = "goal_cli", about = "Send navigation goals to nav_exec")]
struct Opt {
    /// Endpoint to bind the telecommand socket to. nav_exec connects to this.
    #[structopt(long, default_value = "tcp://*:5020")]
    endpoint: String,

    /// File the prompt history is kept in.
    #[structopt(long, default_value = "goal_cli_history.txt", parse(from_os_str))]
    history: PathBuf,
}

/// A single command entered at the prompt.
#[derive(Debug, StructOpt)]
#[structopt(name = "", setting = AppSettings::NoBinaryName)]
enum CliCmd {
    /// Drive to a goal pose, preempting any motion in progress
    Goal {
        #[structopt(flatten)]
        goal: GoalTc,

        /// The goal is an offset from the current pose
        #[structopt(long, conflicts_with = "absolute")]
        relative: bool,

        /// The goal is an absolute pose
        #[structopt(long)]
        absolute: bool,
    },

    /// Stop the motion in progress
    Cancel,

    /// Leave the prompt
    Exit,
}

enum Handled {
    Continue,
    Exit,
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let ctx = zmq::Context::new();
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::REQ,
        SocketOptions {
            bind: true,
            block_on_first_connect: false,
            req_correlate: true,
            req_relaxed: true,
            linger: 1,
            recv_timeout: 1000,
            send_timeout: 1000,
            ..Default::default()
        },
        &opt.endpoint,
    )
    .wrap_err("Could not bind the telecommand socket")?;

    println!("Telecommands will be sent on {}", opt.endpoint);

    let mut rl = DefaultEditor::new().wrap_err("Could not start the prompt")?;
    if rl.load_history(&opt.history).is_err() {
        println!("No history detected");
    }

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str()).ok();

                match handle_line(&socket, &line) {
                    Handled::Continue => (),
                    Handled::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).wrap_err("Could not read from the prompt"),
        }
    }

    if let Err(e) = rl.save_history(&opt.history) {
        println!("Could not save history: {}", e);
    }

    println!("Exiting...");

    Ok(())
}

fn handle_line(socket: &MonitoredSocket, line: &str) -> Handled {
    let cmd = match CliCmd::from_iter_safe(line.split_whitespace()) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e.message);
            return Handled::Continue;
        }
    };

    let tc = match cmd {
        CliCmd::Goal {
            mut goal,
            relative,
            absolute,
        } => {
            goal.relative = match (relative, absolute) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            Tc::NavGoal(goal)
        }
        CliCmd::Cancel => Tc::NavCancel,
        CliCmd::Exit => return Handled::Exit,
    };

    if !socket.connected() {
        println!("nav_exec is not connected, the command may not be delivered");
    }

    if let Err(e) = socket.send_json(&tc) {
        println!("Could not send the command: {}", e);
        return Handled::Continue;
    }

    match socket.recv_json::<TcResponse>() {
        Ok(Some(TcResponse::Ok)) => println!("Accepted"),
        Ok(Some(r)) => println!("Rejected: {:?}", r),
        Ok(None) => println!("No response from nav_exec"),
        Err(e) => println!("Invalid response: {}", e),
    }

    Handled::Continue
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(line: &str) -> CliCmd {
        CliCmd::from_iter_safe(line.split_whitespace()).unwrap()
    }

    #[test]
    fn test_parse_goal() {
        match parse("goal 1.5 -2 0.25 --relative") {
            CliCmd::Goal { goal, relative, absolute } => {
                assert_eq!((goal.x, goal.y, goal.yaw), (1.5, -2.0, 0.25));
                assert!(relative);
                assert!(!absolute);
            }
            c => panic!("Expected a goal, got {:?}", c),
        }

        assert!(matches!(parse("cancel"), CliCmd::Cancel));
        assert!(CliCmd::from_iter_safe("goal 1.0".split_whitespace()).is_err());
        assert!(CliCmd::from_iter_safe("goal 1 2 3 --relative --absolute".split_whitespace()).is_err());
    }
}
