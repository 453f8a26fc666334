mod lease;
mod shell_term;

use std::{fmt, io, mem::MaybeUninit, os::fd::AsRawFd};

use libc::{cfgetispeed, cfgetospeed, tcgetattr, termios};

use crate::cutils::cerr;

use super::interface::ProcessId;

pub(crate) use lease::TerminalLease;
pub(crate) use shell_term::ShellTerm;

/// Snapshot of the line discipline settings of a terminal.
#[derive(Clone, Copy)]
pub struct TermMode {
    raw: termios,
}

impl TermMode {
    pub(crate) fn as_raw(&self) -> &termios {
        &self.raw
    }

    fn speeds(&self) -> (libc::speed_t, libc::speed_t) {
        unsafe { (cfgetispeed(&self.raw), cfgetospeed(&self.raw)) }
    }
}

impl PartialEq for TermMode {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.raw, &other.raw);
        a.c_iflag == b.c_iflag
            && a.c_oflag == b.c_oflag
            && a.c_cflag == b.c_cflag
            && a.c_lflag == b.c_lflag
            && a.c_cc == b.c_cc
            && self.speeds() == other.speeds()
    }
}

impl Eq for TermMode {}

impl fmt::Debug for TermMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermMode")
            .field("c_iflag", &format_args!("{:#o}", self.raw.c_iflag))
            .field("c_oflag", &format_args!("{:#o}", self.raw.c_oflag))
            .field("c_cflag", &format_args!("{:#o}", self.raw.c_cflag))
            .field("c_lflag", &format_args!("{:#o}", self.raw.c_lflag))
            .finish_non_exhaustive()
    }
}

mod sealed {
    use std::os::fd::AsRawFd;

    pub(crate) trait Sealed {}

    impl<F: AsRawFd> Sealed for F {}
}

pub(crate) trait Terminal: sealed::Sealed {
    fn tcgetpgrp(&self) -> io::Result<ProcessId>;
    fn tcsetpgrp(&self, pgrp: ProcessId) -> io::Result<()>;
    fn tcgetattr(&self) -> io::Result<TermMode>;
}

impl<F: AsRawFd> Terminal for F {
    /// Get the foreground process group ID associated with this terminal.
    fn tcgetpgrp(&self) -> io::Result<ProcessId> {
        cerr(unsafe { libc::tcgetpgrp(self.as_raw_fd()) }).map(ProcessId::new)
    }

    /// Set the foreground process group ID associated with this terminal to `pgrp`.
    ///
    /// A caller outside the foreground group must ignore or block `SIGTTOU` first.
    fn tcsetpgrp(&self, pgrp: ProcessId) -> io::Result<()> {
        cerr(unsafe { libc::tcsetpgrp(self.as_raw_fd(), pgrp.get()) }).map(|_| ())
    }

    /// Take a snapshot of the current terminal settings.
    fn tcgetattr(&self) -> io::Result<TermMode> {
        let mut raw = MaybeUninit::<termios>::uninit();
        cerr(unsafe { tcgetattr(self.as_raw_fd(), raw.as_mut_ptr()) })?;
        Ok(TermMode {
            raw: unsafe { raw.assume_init() },
        })
    }
}
