use std::io;

use super::{ShellTerm, TermMode};
use crate::{log::dev_warn, system::interface::ProcessId};

/// Ownership of the terminal lent to a job for one foreground episode.
///
/// Acquiring snapshots the shell's mode, installs the job's mode if it has one and hands the
/// terminal to the job's process group. [`TerminalLease::release`] takes it back. A lease that is
/// dropped without being released still reclaims the terminal, on a best-effort basis.
pub(crate) struct TerminalLease<'a> {
    term: &'a ShellTerm,
    shell_pgrp: ProcessId,
    shell_mode: TermMode,
    active: bool,
}

impl<'a> TerminalLease<'a> {
    pub(crate) fn acquire(
        term: &'a ShellTerm,
        pgrp: ProcessId,
        shell_pgrp: ProcessId,
        job_mode: Option<&TermMode>,
    ) -> io::Result<Self> {
        let shell_mode = term.save_mode()?;

        if let Some(mode) = job_mode {
            if let Err(err) = term.restore_mode(mode) {
                dev_warn!("cannot restore terminal mode of group {pgrp}: {err}");
            }
        }

        // A freshly forked child hands itself the terminal too and may already be gone.
        if let Err(err) = term.give_to(pgrp) {
            dev_warn!("cannot give terminal to group {pgrp}: {err}");
        }

        Ok(Self {
            term,
            shell_pgrp,
            shell_mode,
            active: true,
        })
    }

    /// Snapshot the mode the job left behind, take the terminal back and restore the shell's
    /// mode.
    ///
    /// The returned snapshot is `None` if the terminal could not be queried. An error means the
    /// shell could not reclaim its terminal.
    pub(crate) fn release(mut self) -> io::Result<Option<TermMode>> {
        self.active = false;

        let job_mode = match self.term.save_mode() {
            Ok(mode) => Some(mode),
            Err(err) => {
                dev_warn!("cannot snapshot terminal mode: {err}");
                None
            }
        };

        self.term.give_to(self.shell_pgrp)?;
        self.term.restore_mode(&self.shell_mode)?;

        Ok(job_mode)
    }
}

impl Drop for TerminalLease<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        if let Err(err) = self.term.give_to(self.shell_pgrp) {
            dev_warn!("cannot reclaim terminal: {err}");
        }
        if let Err(err) = self.term.restore_mode(&self.shell_mode) {
            dev_warn!("cannot restore shell terminal mode: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        os::{
            fd::{AsRawFd, OwnedFd},
            unix::net::UnixStream,
        },
    };

    use super::TerminalLease;
    use crate::{
        cutils::cerr,
        system::{
            _exit, fork, getpgrp,
            signal::{consts::SIGTTOU, SignalHandler, SignalHandlerBehavior},
            term::{testing::Pty, ShellTerm, TermMode},
            wait::{Wait, WaitOptions},
            ForkResult,
        },
    };

    /// Run `check` in a child that leads a new session with a pty as its controlling terminal.
    fn in_session_with_pty(check: fn(&ShellTerm) -> bool) {
        let (mut rx, mut tx) = UnixStream::pair().unwrap();

        let ForkResult::Parent(child_pid) = (unsafe { fork() }).unwrap() else {
            drop(rx);
            let ok = (|| {
                cerr(unsafe { libc::setsid() }).ok()?;
                let pty = Pty::open().ok()?;
                cerr(unsafe { libc::ioctl(pty.follower.as_raw_fd(), libc::TIOCSCTTY, 0) }).ok()?;
                SignalHandler::register(SIGTTOU, SignalHandlerBehavior::Ignore)
                    .ok()?
                    .forget();
                let term = ShellTerm::new(OwnedFd::from(pty.follower));
                Some(check(&term))
            })()
            .unwrap_or(false);
            tx.write_all(&[ok as u8]).ok();
            _exit(0);
        };
        drop(tx);

        let mut buf = [0];
        rx.read_exact(&mut buf).unwrap();
        child_pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(buf[0], 1);
    }

    fn without_echo(mode: &TermMode) -> TermMode {
        let mut raw = *mode.as_raw();
        raw.c_lflag &= !libc::ECHO;
        TermMode { raw }
    }

    #[test]
    fn shell_mode_survives_a_foreground_episode() {
        in_session_with_pty(|term| {
            let Ok(before) = term.save_mode() else {
                return false;
            };
            let Ok(lease) = TerminalLease::acquire(term, getpgrp(), getpgrp(), None) else {
                return false;
            };
            // The job messes with the terminal while it owns it.
            let job_mode = without_echo(&before);
            if term.restore_mode(&job_mode).is_err() {
                return false;
            }

            let Ok(Some(left_behind)) = lease.release() else {
                return false;
            };
            left_behind == job_mode && term.save_mode().ok() == Some(before)
        });
    }

    #[test]
    fn job_mode_is_installed_on_acquire() {
        in_session_with_pty(|term| {
            let Ok(before) = term.save_mode() else {
                return false;
            };
            let job_mode = without_echo(&before);

            let installed = {
                let Ok(lease) =
                    TerminalLease::acquire(term, getpgrp(), getpgrp(), Some(&job_mode))
                else {
                    return false;
                };
                let installed = term.save_mode().ok() == Some(job_mode);
                // Dropped without release.
                drop(lease);
                installed
            };

            installed
                && term.save_mode().ok() == Some(before)
                && term.foreground_group().ok() == Some(getpgrp())
        });
    }
}
