#![deny(unsafe_code)]

mod foreground;
mod io_util;
mod launch;
mod notify;

use std::{borrow::Cow, io};

use crate::{
    jobs::{JobLine, JobState, JobTable},
    log::{dev_debug, dev_info, dev_warn},
    system::{
        interface::ProcessId,
        signal::{signal_name, SignalNumber},
        wait::{Wait, WaitError, WaitOptions, WaitStatus},
    },
};

pub(crate) use foreground::run_in_foreground;
pub(crate) use io_util::{retry_while_interrupted, was_interrupted};
pub(crate) use launch::launch;
pub(crate) use notify::{drain_notifications, reap_jobs};

/// Block until `pid` exits, dies or stops.
pub(crate) fn wait_for_change(pid: ProcessId) -> io::Result<WaitStatus> {
    let (_, status) = retry_while_interrupted(|| match pid.wait(WaitOptions::new().untraced()) {
        Ok(ok) => Ok(ok),
        Err(WaitError::Io(err)) => Err(err),
        Err(WaitError::NotReady) => Err(io::ErrorKind::WouldBlock.into()),
    })?;

    Ok(status)
}

/// Record a state change of `pid` in the table and return the line reporting it.
///
/// There is no line for a continued job, or for a pid that is not in the table anymore.
pub(crate) fn settle(jobs: &mut JobTable, pid: ProcessId, status: WaitStatus) -> Option<String> {
    if let Some(exit_code) = status.exit_status() {
        dev_info!("{pid} exited with status code {exit_code}");
    } else if let Some(signal) = status.term_signal() {
        dev_info!("{pid} was terminated by {}", signal_fmt(signal));
    } else if let Some(signal) = status.stop_signal() {
        dev_info!("{pid} was stopped by {}", signal_fmt(signal));
    } else if status.did_continue() {
        dev_info!("{pid} continued execution");
    } else {
        dev_warn!("unexpected wait status for {pid}");
    }

    let state = if status.is_terminated() {
        Some(JobState::Terminated)
    } else if status.was_stopped() {
        Some(JobState::Stopped)
    } else {
        None
    };

    let report = state.zip(jobs.position_of(pid)).and_then(|(state, position)| {
        let job = jobs.at(position)?;
        Some(JobLine::new(position, job, state).to_string())
    });

    let update = jobs.apply_update(pid, status);
    dev_debug!("job {pid}: {update:?}");

    report
}

fn signal_fmt(signal: SignalNumber) -> Cow<'static, str> {
    signal_name(signal)
        .map(|name| name.into())
        .unwrap_or_else(|| format!("unknown signal #{}", signal).into())
}
