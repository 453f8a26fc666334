//! Utilities to handle signals.
use libc::c_int;

mod handler;
mod info;
mod set;
mod stream;

pub(crate) use handler::{SignalHandler, SignalHandlerBehavior};
pub(crate) use set::SignalMaskGuard;
pub(crate) use stream::{register_handlers, SignalStream};

pub(crate) type SignalNumber = c_int;

macro_rules! define_consts {
    ($($signal:ident,)*) => {
        pub(crate) mod consts {
            pub(crate) use libc::{$($signal,)*};
        }

        pub(crate) fn signal_name(signal: SignalNumber) -> Option<&'static str> {
            match signal {
                $(consts::$signal => Some(stringify!($signal)),)*
                _ => None,
            }
        }
    };
}

define_consts! {
    SIGINT,
    SIGQUIT,
    SIGTSTP,
    SIGTERM,
    SIGHUP,
    SIGCHLD,
    SIGCONT,
    SIGTTIN,
    SIGTTOU,
    SIGKILL,
    SIGSTOP,
}

#[cfg(test)]
mod tests {
    use super::{consts::*, signal_name};

    #[test]
    fn names_of_job_control_signals() {
        assert_eq!(signal_name(SIGTSTP), Some("SIGTSTP"));
        assert_eq!(signal_name(SIGCHLD), Some("SIGCHLD"));
        assert_eq!(signal_name(SIGKILL), Some("SIGKILL"));
        assert_eq!(signal_name(libc::SIGWINCH), None);
    }
}
