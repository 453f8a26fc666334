use std::{
    ffi::c_int,
    io,
    mem::MaybeUninit,
    os::fd::{AsFd, AsRawFd, OwnedFd, RawFd},
    sync::atomic::{AtomicBool, Ordering},
};

use libc::{c_void, sigaction, siginfo_t, sighandler_t, SIGTTOU, TCSADRAIN};

use super::{TermMode, Terminal};
use crate::{
    cutils::{cerr, safe_isatty},
    system::{interface::ProcessId, make_zeroed_sigaction},
};

static GOT_SIGTTOU: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigttou(_signal: c_int, _info: *mut siginfo_t, _: *mut c_void) {
    GOT_SIGTTOU.store(true, Ordering::SeqCst);
}

/// Run a terminal operation that must fail instead of silently succeeding or stopping us when we
/// are not in the foreground process group.
///
/// While `op` runs `SIGTTOU` is caught, so a background caller sees the call interrupted and the
/// flag set. Plain interruptions are retried.
fn nobg<F: FnMut() -> io::Result<()>>(mut op: F) -> io::Result<()> {
    let mut original_action = MaybeUninit::<sigaction>::uninit();

    let action = {
        let mut raw: libc::sigaction = make_zeroed_sigaction();
        raw.sa_sigaction = on_sigttou as sighandler_t;
        raw.sa_flags = libc::SA_SIGINFO;
        unsafe { libc::sigemptyset(&mut raw.sa_mask) };
        raw
    };

    GOT_SIGTTOU.store(false, Ordering::SeqCst);
    cerr(unsafe { sigaction(SIGTTOU, &action, original_action.as_mut_ptr()) })?;

    let result = loop {
        match op() {
            Ok(()) => break Ok(()),
            Err(err) => {
                let got_sigttou = GOT_SIGTTOU.load(Ordering::SeqCst);
                if got_sigttou || err.kind() != io::ErrorKind::Interrupted {
                    break Err(err);
                }
            }
        }
    };

    unsafe { sigaction(SIGTTOU, original_action.as_ptr(), std::ptr::null_mut()) };

    result
}

/// The controlling terminal of the shell, as seen through its standard input.
pub(crate) struct ShellTerm {
    tty: OwnedFd,
}

impl ShellTerm {
    /// Wrap standard input if it is a terminal.
    ///
    /// The descriptor is duplicated with close-on-exec set, so children only ever see their own
    /// standard streams.
    pub(crate) fn from_stdin() -> io::Result<Option<Self>> {
        if !safe_isatty(libc::STDIN_FILENO) {
            return Ok(None);
        }

        let tty = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Some(Self::new(tty)))
    }

    pub(crate) fn new(tty: OwnedFd) -> Self {
        Self { tty }
    }

    /// The process group currently owning the terminal.
    pub(crate) fn foreground_group(&self) -> io::Result<ProcessId> {
        self.tty.tcgetpgrp()
    }

    /// Make `pgrp` the foreground process group.
    ///
    /// The shell ignores `SIGTTOU`, which lets it take the terminal back from a job.
    pub(crate) fn give_to(&self, pgrp: ProcessId) -> io::Result<()> {
        self.tty.tcsetpgrp(pgrp)
    }

    /// Like [`ShellTerm::give_to`] but fails if we are not in the foreground process group.
    pub(crate) fn tcsetpgrp_nobg(&self, pgrp: ProcessId) -> io::Result<()> {
        nobg(|| self.tty.tcsetpgrp(pgrp))
    }

    pub(crate) fn save_mode(&self) -> io::Result<TermMode> {
        self.tty.tcgetattr()
    }

    /// Install `mode` once queued output has drained, only if we are in the foreground process
    /// group.
    pub(crate) fn restore_mode(&self, mode: &TermMode) -> io::Result<()> {
        let fd = self.tty.as_raw_fd();
        nobg(|| cerr(unsafe { libc::tcsetattr(fd, TCSADRAIN, mode.as_raw()) }).map(|_| ()))
    }
}

impl AsRawFd for ShellTerm {
    fn as_raw_fd(&self) -> RawFd {
        self.tty.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use std::os::fd::OwnedFd;

    use super::ShellTerm;
    use crate::system::term::testing::Pty;

    #[test]
    fn restored_mode_reads_back_equal() {
        let pty = Pty::open().unwrap();
        let term = ShellTerm::new(OwnedFd::from(pty.follower));

        let original = term.save_mode().unwrap();
        let mut changed = *original.as_raw();
        changed.c_lflag &= !libc::ECHO;
        // The pty is not our controlling terminal, so there is no background check to trip.
        let changed = super::TermMode { raw: changed };

        term.restore_mode(&changed).unwrap();
        assert_eq!(term.save_mode().unwrap(), changed);

        term.restore_mode(&original).unwrap();
        assert_eq!(term.save_mode().unwrap(), original);
    }
}
