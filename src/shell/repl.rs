use std::{
    env,
    ffi::c_int,
    io::{self, Write},
    path::PathBuf,
};

use super::{help::BUILTINS_MSG, input::LineReader};
use crate::{
    common::{Command, CommandLine, Error, Session},
    control::{cmd_bg, cmd_fg, cmd_jobs, ControlError},
    exec::{drain_notifications, launch},
    log::{dev_info, user_error},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Logout,
}

fn show_prompt() {
    let cwd = env::current_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    print_ignore_io_error!("{cwd}> ");
}

/// Read and run command lines until `logout` or end of input. Returns the exit status of the
/// shell.
pub(super) fn interactive(session: &mut Session, quiet: bool) -> Result<c_int, Error> {
    let prompt = session.is_interactive();
    if prompt && !quiet {
        println_ignore_io_error!("{BUILTINS_MSG}");
    }

    let mut reader = LineReader::new(io::stdin());
    let signals = session.signals;

    loop {
        if prompt {
            show_prompt();
        }

        let line = reader.next_line(signals, || {
            let reports = drain_notifications(session);
            if reports.is_empty() {
                return;
            }
            let _ = write_reports(&mut io::stdout(), &reports, prompt);
            if prompt {
                show_prompt();
            }
        })?;

        let Some(line) = line else {
            dev_info!("end of input");
            break;
        };

        if run_line(session, &line)? == Flow::Logout {
            break;
        }
    }

    session.hang_up_stopped_jobs();
    println_ignore_io_error!("Bye");
    Ok(session.last_status)
}

/// Run a single command line, as given with `-c`.
pub(super) fn run_command_line(session: &mut Session, line: &str) -> Result<c_int, Error> {
    run_line(session, line)?;
    session.hang_up_stopped_jobs();
    Ok(session.last_status)
}

/// Run the `;`-separated commands of `line` in order. Only fatal errors are returned.
pub(super) fn run_line(session: &mut Session, line: &str) -> Result<Flow, Error> {
    for command in CommandLine::parse(line) {
        let flow = match execute(session, &command) {
            Ok(flow) => flow,
            Err(err) if !err.is_fatal() => {
                user_error!("{err}");
                session.last_status = 1;
                Flow::Continue
            }
            Err(err) => return Err(err),
        };

        let _ = write_reports(&mut io::stdout(), &drain_notifications(session), false);

        if flow == Flow::Logout {
            return Ok(Flow::Logout);
        }
    }

    Ok(Flow::Continue)
}

/// Job lines go on lines of their own, so a prompt still waiting for input gets ended first.
fn write_reports(out: &mut impl Write, reports: &[String], after_prompt: bool) -> io::Result<()> {
    if reports.is_empty() {
        return Ok(());
    }
    if after_prompt {
        writeln!(out)?;
    }
    for report in reports {
        writeln!(out, "{report}")?;
    }
    out.flush()
}

fn execute(session: &mut Session, command: &Command) -> Result<Flow, Error> {
    let argument = command.arguments().first().map(String::as_str);

    match command.program() {
        "logout" => return Ok(Flow::Logout),
        "help" => {
            println_ignore_io_error!("{BUILTINS_MSG}");
            session.last_status = 0;
        }
        "cd" => session.last_status = change_directory(argument),
        "jobs" => {
            cmd_jobs(session);
            session.last_status = 0;
        }
        "fg" => {
            let result = cmd_fg(session, argument);
            control_result(session, result)?;
        }
        "bg" => {
            let result = cmd_bg(session, argument);
            if result.is_ok() {
                session.last_status = 0;
            }
            control_result(session, result)?;
        }
        _ => launch(session, command)?,
    }

    Ok(Flow::Continue)
}

/// User errors are reported here, the rest goes up.
fn control_result(session: &mut Session, result: Result<(), ControlError>) -> Result<(), Error> {
    match result {
        Ok(()) => Ok(()),
        Err(ControlError::Shell(err)) => Err(err),
        Err(err) => {
            user_error!("{err}");
            session.last_status = 1;
            Ok(())
        }
    }
}

fn change_directory(argument: Option<&str>) -> c_int {
    let target = match argument {
        Some(dir) => PathBuf::from(dir),
        None => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home),
            None => {
                user_error!("cd: HOME not set");
                return 1;
            }
        },
    };

    match env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(err) => {
            user_error!("cd: {}: {err}", target.display());
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{run_line, write_reports, Flow};
    use crate::{
        common::Session,
        system::signal::SignalStream,
    };

    fn session() -> Session {
        Session::detached(SignalStream::init().unwrap(), Vec::new())
    }

    #[test]
    fn reports_start_on_a_line_of_their_own() {
        let reports = vec![" [1] sleep (pid=42) : TERMINADO".to_owned()];
        let written = |after_prompt| {
            let mut out = Vec::new();
            write_reports(&mut out, &reports, after_prompt).unwrap();
            String::from_utf8(out).unwrap()
        };

        assert_eq!(written(true), "\n [1] sleep (pid=42) : TERMINADO\n");
        assert_eq!(written(false), " [1] sleep (pid=42) : TERMINADO\n");

        let mut out = Vec::new();
        write_reports(&mut out, &[], true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn sequences_run_left_to_right() {
        let mut session = session();
        assert_eq!(run_line(&mut session, "false; true").unwrap(), Flow::Continue);
        assert_eq!(session.last_status, 0);
        assert_eq!(run_line(&mut session, "true; false").unwrap(), Flow::Continue);
        assert_eq!(session.last_status, 1);
    }

    #[test]
    fn logout_stops_the_line() {
        let mut session = session();
        assert_eq!(run_line(&mut session, "true; logout; false").unwrap(), Flow::Logout);
        assert_eq!(session.last_status, 0);
    }

    #[test]
    fn user_errors_do_not_end_the_shell() {
        let mut session = session();
        assert_eq!(run_line(&mut session, "fg 99").unwrap(), Flow::Continue);
        assert_eq!(session.last_status, 1);
        assert_eq!(run_line(&mut session, "bg uno").unwrap(), Flow::Continue);
        assert_eq!(session.last_status, 1);
        assert_eq!(run_line(&mut session, "jobs").unwrap(), Flow::Continue);
        assert_eq!(session.last_status, 0);
        assert!(session.jobs.is_empty());
    }
}
