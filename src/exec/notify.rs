use super::{settle, signal_fmt};
use crate::{
    common::Session,
    jobs::JobTable,
    log::{dev_debug, dev_warn},
    system::{
        signal::{consts::SIGCHLD, SignalMaskGuard},
        wait::{Wait, WaitError, WaitOptions},
    },
};

/// Empty the signal stream and, if a child changed state, reap every job.
///
/// Returns the lines reporting jobs that stopped or ended, for the caller to print.
pub(crate) fn drain_notifications(session: &mut Session) -> Vec<String> {
    let mut child_changed = false;

    loop {
        match session.signals.try_recv() {
            Ok(Some(info)) => {
                dev_debug!(
                    "received {} from {}",
                    signal_fmt(info.signal()),
                    info.pid()
                );
                child_changed |= info.signal() == SIGCHLD;
            }
            Ok(None) => break,
            Err(err) => {
                dev_warn!("cannot read from the signal stream: {err}");
                break;
            }
        }
    }

    if child_changed {
        reap_jobs(&mut session.jobs)
    } else {
        Vec::new()
    }
}

/// Collect the pending state change of every job without blocking and update the table.
/// Returns one line per job that stopped or ended.
///
/// Safe to call at any time: a status is only ever handed out once by the kernel, and jobs that
/// are already gone are skipped.
pub(crate) fn reap_jobs(jobs: &mut JobTable) -> Vec<String> {
    let _guard = SignalMaskGuard::single(SIGCHLD);
    let options = WaitOptions::new().no_hang().untraced().continued();
    let mut reports = Vec::new();

    for pid in jobs.pids() {
        match pid.wait(options) {
            Ok((_, status)) => reports.extend(settle(jobs, pid, status)),
            Err(WaitError::NotReady) => {}
            Err(WaitError::Io(err)) if err.raw_os_error() == Some(libc::ECHILD) => {
                dev_warn!("job {pid} is not our child anymore");
                jobs.remove_by_pid(pid);
            }
            Err(WaitError::Io(err)) => dev_warn!("cannot wait for job {pid}: {err}"),
        }
    }

    reports
}

#[cfg(test)]
mod tests {
    use std::{os::unix::process::CommandExt, process, thread, time::Duration};

    use pretty_assertions::assert_eq;

    use super::reap_jobs;
    use crate::{
        jobs::{Job, JobTable},
        system::{
            interface::ProcessId,
            kill,
            signal::consts::{SIGCONT, SIGKILL, SIGSTOP},
        },
    };

    fn spawn(jobs: &mut JobTable, program: &str, args: &[&str]) -> ProcessId {
        let child = process::Command::new(program)
            .args(args)
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = ProcessId::new(child.id() as i32);
        jobs.insert(Job::new(pid, program, false));
        pid
    }

    /// Reap until `done` holds, collecting the reported lines.
    fn reap_until(jobs: &mut JobTable, done: impl Fn(&JobTable) -> bool) -> Option<Vec<String>> {
        let mut reports = Vec::new();
        for _ in 0..400 {
            reports.extend(reap_jobs(jobs));
            if done(jobs) {
                return Some(reports);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    fn is_stopped(jobs: &JobTable, pid: ProcessId) -> Option<bool> {
        jobs.find_by_pid(pid).map(|job| job.is_stopped)
    }

    #[test]
    fn finished_jobs_are_removed() {
        let mut jobs = JobTable::new();
        let pid = spawn(&mut jobs, "true", &[]);

        assert_eq!(
            reap_until(&mut jobs, JobTable::is_empty).unwrap(),
            vec![format!(" [1] true (pid={pid}) : TERMINADO")]
        );
        assert!(reap_jobs(&mut jobs).is_empty());
    }

    #[test]
    fn stopped_jobs_are_kept_until_they_die() {
        let mut jobs = JobTable::new();
        let pid = spawn(&mut jobs, "sleep", &["100"]);

        kill(pid, SIGSTOP).unwrap();
        let reports = reap_until(&mut jobs, |jobs| is_stopped(jobs, pid) == Some(true)).unwrap();
        assert_eq!(reports, vec![format!(" [1] sleep (pid={pid}) : PARADO")]);
        assert_eq!(jobs.len(), 1);

        // Continuing is recorded without a report.
        kill(pid, SIGCONT).unwrap();
        let reports = reap_until(&mut jobs, |jobs| is_stopped(jobs, pid) == Some(false)).unwrap();
        assert!(reports.is_empty());

        kill(pid, SIGKILL).unwrap();
        let reports = reap_until(&mut jobs, JobTable::is_empty).unwrap();
        assert_eq!(reports, vec![format!(" [1] sleep (pid={pid}) : TERMINADO")]);
    }
}
