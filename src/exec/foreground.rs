use super::{reap_jobs, settle, wait_for_change};
use crate::{
    common::{Error, Session},
    log::dev_warn,
    system::{interface::ProcessId, killpg, signal::consts::SIGCONT, term::TerminalLease},
};

/// One foreground episode of the job `pid`: lend it the terminal, optionally wake it up, wait
/// for its next state change and take the terminal back.
///
/// A resumed job gets the terminal mode it left behind last time. The caller keeps
/// notifications excluded for the whole episode.
pub(crate) fn run_in_foreground(
    session: &mut Session,
    pid: ProcessId,
    resume: bool,
) -> Result<(), Error> {
    session.jobs.set_foreground(pid);
    let job_mode = match session.jobs.find_by_pid_mut(pid) {
        Some(job) => {
            job.is_stopped = false;
            job.saved_mode.filter(|_| resume)
        }
        None => None,
    };

    let lease = match &session.term {
        Some(term) => Some(
            TerminalLease::acquire(term, pid, session.pgrp, job_mode.as_ref())
                .map_err(Error::Terminal)?,
        ),
        None => None,
    };

    if resume {
        if let Err(err) = killpg(pid, SIGCONT) {
            dev_warn!("cannot resume job {pid}: {err}");
        }
    }

    let waited = wait_for_change(pid);

    let left_mode = match lease {
        Some(lease) => lease.release().map_err(Error::Terminal)?,
        None => None,
    };

    let status = match waited {
        Ok(status) => status,
        Err(err) => {
            session.jobs.clear_foreground();
            // The process cannot be waited for, so it will never be seen again.
            session.jobs.remove_by_pid(pid);
            return Err(err.into());
        }
    };

    if let Some(job) = session.jobs.find_by_pid_mut(pid) {
        job.last_status = Some(status);
        if left_mode.is_some() {
            job.saved_mode = left_mode;
        }
    }
    if let Some(code) = status.as_exit_code() {
        session.last_status = code;
    }

    if let Some(report) = settle(&mut session.jobs, pid, status) {
        println_ignore_io_error!("{report}");
    }
    session.jobs.clear_foreground();
    for report in reap_jobs(&mut session.jobs) {
        println_ignore_io_error!("{report}");
    }

    Ok(())
}
