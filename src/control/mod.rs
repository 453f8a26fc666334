//! The job control built-ins: `jobs`, `fg` and `bg`.

use std::fmt;

use crate::{
    common::{Error, Session},
    exec::run_in_foreground,
    jobs::{Job, JobLine, JobState, JobTable},
    log::dev_warn,
    system::{killpg, signal::consts::SIGCONT},
};

/// A job control command that could not be carried out. Everything except
/// [`ControlError::Shell`] leaves the job table untouched.
#[derive(Debug)]
pub(crate) enum ControlError {
    /// The argument is missing or is not a non-negative integer.
    InvalidArgument {
        command: &'static str,
        argument: Option<String>,
    },
    NoSuchJob {
        command: &'static str,
        position: usize,
    },
    AlreadyInBackground {
        position: usize,
    },
    /// The foreground episode itself failed.
    Shell(Error),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::InvalidArgument {
                command,
                argument: None,
            } => write!(f, "{command}: se esperaba un número de trabajo"),
            ControlError::InvalidArgument {
                command,
                argument: Some(argument),
            } => write!(f, "{command}: argumento no válido: {argument}"),
            ControlError::NoSuchJob { command, position } => {
                write!(f, "{command}: número de trabajo no válido: {position}")
            }
            ControlError::AlreadyInBackground { position } => {
                write!(f, "bg: el trabajo [{position}] ya está en segundo plano")
            }
            ControlError::Shell(err) => write!(f, "{err}"),
        }
    }
}

impl From<Error> for ControlError {
    fn from(err: Error) -> Self {
        ControlError::Shell(err)
    }
}

/// Accept only plain decimal digits, so `+1`, `-1` and `1a` are all rejected.
fn parse_position(command: &'static str, argument: Option<&str>) -> Result<usize, ControlError> {
    let invalid = || ControlError::InvalidArgument {
        command,
        argument: argument.map(str::to_owned),
    };

    let argument = argument.ok_or_else(invalid)?;
    if argument.is_empty() || !argument.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    argument.parse().map_err(|_| invalid())
}

fn resolve<'a>(
    jobs: &'a JobTable,
    command: &'static str,
    position: usize,
) -> Result<&'a Job, ControlError> {
    jobs.at(position)
        .ok_or(ControlError::NoSuchJob { command, position })
}

/// The lines printed by `jobs`.
pub(crate) fn job_lines(jobs: &JobTable) -> Vec<String> {
    if jobs.is_empty() {
        return vec!["No hay trabajos".to_owned()];
    }

    jobs.iter()
        .map(|(position, job)| JobLine::current(position, job).to_string())
        .collect()
}

pub(crate) fn cmd_jobs(session: &Session) {
    let _guard = session.exclude_notifications();
    for line in job_lines(&session.jobs) {
        println_ignore_io_error!("{line}");
    }
}

/// Bring a job to the foreground, resume it and wait until it stops or ends.
pub(crate) fn cmd_fg(session: &mut Session, argument: Option<&str>) -> Result<(), ControlError> {
    let _guard = session.exclude_notifications();

    let position = parse_position("fg", argument)?;
    let pid = resolve(&session.jobs, "fg", position)?.pid();

    run_in_foreground(session, pid, true)?;
    Ok(())
}

/// Resume a stopped job in the background.
pub(crate) fn cmd_bg(session: &mut Session, argument: Option<&str>) -> Result<(), ControlError> {
    let _guard = session.exclude_notifications();

    let position = parse_position("bg", argument)?;
    let job = resolve(&session.jobs, "bg", position)?;
    if !job.is_stopped {
        return Err(ControlError::AlreadyInBackground { position });
    }
    let pid = job.pid();
    let was_foreground = job.is_foreground();

    if let Some(job) = session.jobs.at_mut(position) {
        job.is_stopped = false;
    }
    if was_foreground {
        session.jobs.clear_foreground();
    }

    if let Err(err) = killpg(pid, SIGCONT) {
        dev_warn!("cannot resume job {pid}: {err}");
    }

    if let Some(job) = session.jobs.at(position) {
        println_ignore_io_error!("{}", JobLine::new(position, job, JobState::Running));
    }

    Ok(())
}
