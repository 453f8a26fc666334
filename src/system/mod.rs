use std::{io, os::fd::AsRawFd};

use crate::cutils::cerr;
use interface::ProcessId;

use self::signal::SignalNumber;

// generalized traits for when we want to hide implementations
pub mod interface;

pub mod poll;

pub mod signal;

pub mod term;

pub mod wait;

pub(crate) fn _exit(status: libc::c_int) -> ! {
    unsafe { libc::_exit(status) }
}

pub(crate) enum ForkResult {
    // Parent process branch with the child process' PID.
    Parent(ProcessId),
    // Child process branch.
    Child,
}

/// Create a new process.
///
/// # Safety
///
/// In a multithreaded program, only async-signal-safe functions are guaranteed to work in the
/// child process until a call to `execve` or a similar function is done.
pub(crate) unsafe fn fork() -> io::Result<ForkResult> {
    let pid = cerr(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(ProcessId::new(pid)))
    }
}

/// Send a signal to a process with the specified ID.
#[cfg(test)]
pub fn kill(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::kill(pid.get(), signal) }).map(|_| ())
}

/// Send a signal to a process group with the specified ID.
pub fn killpg(pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pgid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::killpg(pgid.get(), signal) }).map(|_| ())
}

/// Get the process ID of the current process.
pub fn getpid() -> ProcessId {
    ProcessId::new(unsafe { libc::getpid() })
}

/// Get the process group ID of the current process.
pub fn getpgrp() -> ProcessId {
    ProcessId::new(unsafe { libc::getpgrp() })
}

/// Get a process group ID.
#[cfg(test)]
pub fn getpgid(pid: ProcessId) -> io::Result<ProcessId> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID
    cerr(unsafe { libc::getpgid(pid.get()) }).map(ProcessId::new)
}

/// Set a process group ID.
///
/// A zero `pid` means the calling process, a zero `pgid` means "use `pid` as the group ID".
pub fn setpgid(pid: ProcessId, pgid: ProcessId) -> io::Result<()> {
    cerr(unsafe { libc::setpgid(pid.get(), pgid.get()) }).map(|_| ())
}

/// Read from a descriptor directly, without any buffering in between.
pub(crate) fn read<F: AsRawFd>(fd: &F, buf: &mut [u8]) -> io::Result<usize> {
    cerr(unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) })
        .map(|n| n as usize)
}

pub fn make_zeroed_sigaction() -> libc::sigaction {
    // SAFETY: since sigaction is a C struct, all-zeroes is a valid representation
    // We cannot use a "literal struct" initialization method since the exact representation
    // of libc::sigaction is not fixed.
    unsafe { std::mem::zeroed() }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        os::unix::net::UnixStream,
    };

    use libc::{SIGCONT, SIGKILL, SIGSTOP};

    use super::{
        fork, getpgid, getpgrp, getpid, kill, killpg, setpgid,
        wait::{Wait, WaitOptions},
        ForkResult, _exit,
    };
    use crate::system::interface::ProcessId;

    #[test]
    fn process_group_of_self() {
        assert_eq!(getpgid(ProcessId::new(0)).unwrap(), getpgrp());
        assert!(getpid().get() > 0);
    }

    #[test]
    fn child_can_lead_its_own_group() {
        let (mut rx, mut tx) = UnixStream::pair().unwrap();

        let ForkResult::Parent(child_pid) = (unsafe { fork() }).unwrap() else {
            drop(rx);
            let ok = setpgid(ProcessId::new(0), ProcessId::new(0)).is_ok()
                && getpgrp() == getpid();
            tx.write_all(&[ok as u8]).ok();
            _exit(0);
        };
        drop(tx);

        let mut buf = [0];
        rx.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 1);

        let (pid, status) = child_pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(pid, child_pid);
        assert_eq!(status.exit_status(), Some(0));
    }

    #[test]
    fn signals_reach_a_whole_group() {
        use std::os::unix::process::CommandExt;

        let command = std::process::Command::new("sleep")
            .arg("10")
            .process_group(0)
            .spawn()
            .unwrap();
        let command_pid = ProcessId::new(command.id() as i32);
        assert_eq!(getpgid(command_pid).unwrap(), command_pid);

        kill(command_pid, SIGSTOP).unwrap();
        let (_, status) = command_pid.wait(WaitOptions::new().untraced()).unwrap();
        assert_eq!(status.stop_signal(), Some(SIGSTOP));

        killpg(command_pid, SIGCONT).unwrap();
        killpg(command_pid, SIGKILL).unwrap();
        let (_, status) = command_pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.term_signal(), Some(SIGKILL));
    }
}
