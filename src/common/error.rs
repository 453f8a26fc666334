use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    /// A new process could not be created.
    Fork(io::Error),
    /// The shell could not put itself in its own process group.
    ProcessGroup(io::Error),
    /// The shell could not take the terminal back after a foreground job.
    Terminal(io::Error),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fork(e) => write!(f, "cannot create a new process: {e}"),
            Error::ProcessGroup(e) => write!(f, "cannot create the shell process group: {e}"),
            Error::Terminal(e) => write!(f, "cannot reclaim the terminal: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl Error {
    /// Returns `true` if the shell cannot go on after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Fork(_) | Self::ProcessGroup(_) | Self::Terminal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use std::io;

    #[test]
    fn only_job_control_failures_are_fatal() {
        let os_error = || io::Error::from_raw_os_error(libc::EAGAIN);
        assert!(Error::Fork(os_error()).is_fatal());
        assert!(Error::ProcessGroup(os_error()).is_fatal());
        assert!(Error::Terminal(os_error()).is_fatal());
        assert!(!Error::Io(os_error()).is_fatal());
    }

    #[test]
    fn fatal_errors_carry_the_os_cause() {
        let error = Error::Fork(io::Error::from_raw_os_error(libc::EAGAIN));
        let message = error.to_string();
        assert!(message.starts_with("cannot create a new process: "));
        assert!(message.contains("os error 11"));
    }
}
