use std::{os::unix::process::CommandExt, process};

use super::foreground::run_in_foreground;
use crate::{
    common::{Command, Error, Session},
    jobs::{Job, JobLine, JobState},
    log::{dev_info, dev_warn},
    system::{
        _exit, fork, getpid, setpgid,
        signal::{consts::*, SignalHandler, SignalMaskGuard},
        ForkResult,
    },
};

/// Dispositions the shell changed that a job must get back.
const RESET_IN_CHILD: [libc::c_int; 6] = [SIGINT, SIGQUIT, SIGTSTP, SIGTTIN, SIGTTOU, SIGCHLD];

/// Run `command` as a new job in its own process group.
///
/// A foreground job gets the terminal and the shell waits until it exits, dies or stops. A
/// background job is announced and left running.
pub(crate) fn launch(session: &mut Session, command: &Command) -> Result<(), Error> {
    let mut process = process::Command::new(command.program());
    process.args(command.arguments());
    let foreground = !command.is_background();

    let guard = session.exclude_notifications();

    #[allow(unsafe_code)]
    let fork_result = unsafe { fork() }.map_err(|err| {
        dev_warn!("unable to fork {}: {err}", command.program());
        Error::Fork(err)
    })?;

    let ForkResult::Parent(pid) = fork_result else {
        exec_child(session, &guard, process, command.program(), foreground);
    };

    // Whichever of parent and child gets here first puts the child in its group. Once the child
    // has called `exec` this fails, which is fine.
    if let Err(err) = setpgid(pid, pid) {
        dev_info!("process group of {pid} already set: {err}");
    }
    dev_info!("launched `{command}` with pid {pid}");

    let mut job = Job::new(pid, command.program(), foreground);
    job.saved_mode = session.term.as_ref().and_then(|term| term.save_mode().ok());
    let position = session.jobs.insert(job);

    if !foreground {
        if let Some(job) = session.jobs.at(position) {
            println_ignore_io_error!("{}", JobLine::new(position, job, JobState::Running));
        }
        session.last_status = 0;
        return Ok(());
    }

    let result = run_in_foreground(session, pid, false);
    drop(guard);
    result
}

fn exec_child(
    session: &Session,
    guard: &SignalMaskGuard,
    mut process: process::Command,
    name: &str,
    foreground: bool,
) -> ! {
    let pid = getpid();
    if let Err(err) = setpgid(pid, pid) {
        dev_warn!("cannot create process group: {err}");
    }

    // Still ignoring SIGTTOU here, so this works from a background group.
    if foreground {
        if let Some(term) = &session.term {
            if let Err(err) = term.give_to(pid) {
                dev_warn!("cannot take the terminal: {err}");
            }
        }
    }

    for signal in RESET_IN_CHILD {
        if let Err(err) = SignalHandler::reset_to_default(signal) {
            dev_warn!("cannot reset signal {signal}: {err}");
        }
    }

    if let Some(set) = guard.original() {
        if let Err(err) = set.set_mask() {
            dev_warn!("cannot restore signal mask: {err}");
        }
    }

    let err = process.exec();

    dev_warn!("failed to execute {name}: {err}");
    eprintln_ignore_io_error!("Error, no se puede ejecutar: {name}");
    _exit(255)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::launch;
    use crate::{
        common::{Command, Session},
        control::{cmd_bg, cmd_fg, ControlError},
        exec::reap_jobs,
        system::{
            kill,
            signal::{
                consts::{SIGKILL, SIGSTOP},
                SignalStream,
            },
            wait::{Wait, WaitOptions},
        },
    };

    /// Stops itself right away and exits with 3 once continued. Written without blanks, which
    /// would split it into several words.
    const STOPS_THEN_EXITS_3: &str = "sh -c kill${IFS}-STOP${IFS}$$;exit${IFS}3";

    fn session() -> Session {
        Session::detached(SignalStream::init().unwrap(), Vec::new())
    }

    fn run(session: &mut Session, line: &str) {
        launch(session, &Command::parse(line).unwrap()).unwrap();
    }

    #[test]
    fn foreground_jobs_leave_their_exit_status() {
        let mut session = session();

        run(&mut session, "true");
        assert_eq!(session.last_status, 0);
        assert!(session.jobs.is_empty());

        run(&mut session, "false");
        assert_eq!(session.last_status, 1);
        assert!(session.jobs.is_empty());
    }

    #[test]
    fn stopped_foreground_jobs_resume_in_background() {
        let mut session = session();
        run(&mut session, STOPS_THEN_EXITS_3);

        assert_eq!(session.last_status, 128 + SIGSTOP);
        assert_eq!(session.jobs.len(), 1);
        let job = session.jobs.at(1).unwrap();
        assert_eq!(job.name(), "sh");
        assert!(job.is_stopped);
        assert!(!job.is_foreground());
        let pid = job.pid();

        cmd_bg(&mut session, Some("1")).unwrap();
        assert!(!session.jobs.at(1).unwrap().is_stopped);
        assert!(matches!(
            cmd_bg(&mut session, Some("1")),
            Err(ControlError::AlreadyInBackground { position: 1 })
        ));

        let mut reports = Vec::new();
        for _ in 0..400 {
            reports.extend(reap_jobs(&mut session.jobs));
            if session.jobs.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(reports, vec![format!(" [1] sh (pid={pid}) : TERMINADO")]);
    }

    #[test]
    fn stopped_foreground_jobs_resume_in_foreground() {
        let mut session = session();
        run(&mut session, STOPS_THEN_EXITS_3);
        assert!(session.jobs.at(1).is_some_and(|job| job.is_stopped));

        cmd_fg(&mut session, Some("1")).unwrap();

        assert_eq!(session.last_status, 3);
        assert!(session.jobs.is_empty());
    }

    #[test]
    fn unknown_programs_exit_with_255() {
        let mut session = session();
        run(&mut session, "fsosh-test-no-such-program");
        assert_eq!(session.last_status, 255);
        assert!(session.jobs.is_empty());
    }

    #[test]
    fn background_jobs_are_tracked() {
        let mut session = session();
        run(&mut session, "sleep 100 &");

        assert_eq!(session.jobs.len(), 1);
        let job = session.jobs.at(1).unwrap();
        assert_eq!(job.name(), "sleep");
        assert!(!job.is_foreground());
        assert!(!job.is_stopped);

        let pid = job.pid();
        kill(pid, SIGKILL).unwrap();
        for _ in 0..200 {
            reap_jobs(&mut session.jobs);
            if session.jobs.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(session.jobs.is_empty());
        assert!(pid.wait(WaitOptions::new().no_hang()).is_err());
    }
}
