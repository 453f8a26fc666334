use crate::{cutils::cerr, log::dev_warn, system::make_zeroed_sigaction};

use super::{handler::SignalHandlerBehavior, SignalNumber};

use std::{io, mem::MaybeUninit};

#[repr(transparent)]
pub(super) struct SignalAction {
    raw: libc::sigaction,
}

impl SignalAction {
    pub(super) fn new(behavior: SignalHandlerBehavior) -> io::Result<Self> {
        // This guarantees that functions won't be interrupted by this signal as long as the
        // handler is alive.
        let mut sa_flags = libc::SA_RESTART;

        // We only need a full `sa_mask` if we are going to stream the signal information as we
        // don't want to be interrupted by any signals while executing `send_siginfo`.
        let (sa_sigaction, sa_mask) = match behavior {
            SignalHandlerBehavior::Default => (libc::SIG_DFL, SignalSet::empty()?),
            SignalHandlerBehavior::Ignore => (libc::SIG_IGN, SignalSet::empty()?),
            SignalHandlerBehavior::Stream => {
                // Specify that we want to pass a signal-catching function in `sa_sigaction`.
                sa_flags |= libc::SA_SIGINFO;
                let send: extern "C" fn(SignalNumber, *mut libc::siginfo_t, *mut libc::c_void) =
                    super::stream::send_siginfo;
                (send as libc::sighandler_t, SignalSet::full()?)
            }
        };

        let mut raw: libc::sigaction = make_zeroed_sigaction();
        raw.sa_sigaction = sa_sigaction;
        raw.sa_mask = sa_mask.raw;
        raw.sa_flags = sa_flags;

        Ok(Self { raw })
    }

    pub(super) fn register(&self, signal: SignalNumber) -> io::Result<Self> {
        let mut original_action = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigaction(signal, &self.raw, original_action.as_mut_ptr().cast()) })?;

        Ok(unsafe { original_action.assume_init() })
    }
}

// A signal set that can be used to mask signals.
#[repr(transparent)]
pub(crate) struct SignalSet {
    raw: libc::sigset_t,
}

impl SignalSet {
    /// Create an empty set.
    pub(crate) fn empty() -> io::Result<Self> {
        let mut set = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigemptyset(set.as_mut_ptr().cast()) })?;

        Ok(unsafe { set.assume_init() })
    }

    /// Create a set containing all the signals.
    pub(crate) fn full() -> io::Result<Self> {
        let mut set = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigfillset(set.as_mut_ptr().cast()) })?;

        Ok(unsafe { set.assume_init() })
    }

    /// Create a set containing only the given signal.
    pub(crate) fn single(signal: SignalNumber) -> io::Result<Self> {
        let mut set = Self::empty()?;
        cerr(unsafe { libc::sigaddset(&mut set.raw, signal) })?;
        Ok(set)
    }

    /// Whether `signal` is a member of this set.
    #[cfg(test)]
    pub(crate) fn contains(&self, signal: SignalNumber) -> bool {
        unsafe { libc::sigismember(&self.raw, signal) == 1 }
    }

    fn sigprocmask(&self, how: libc::c_int) -> io::Result<Self> {
        let mut original_set = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigprocmask(how, &self.raw, original_set.as_mut_ptr().cast()) })?;

        Ok(unsafe { original_set.assume_init() })
    }

    /// Block all the signals in this set and return the previous set of blocked signals.
    ///
    /// After calling this function successfully, the set of blocked signals will be the union of
    /// the previous set of blocked signals and this set.
    pub(crate) fn block(&self) -> io::Result<Self> {
        self.sigprocmask(libc::SIG_BLOCK)
    }

    /// Block only the signals that are in this set and return the previous set of blocked signals.
    ///
    /// After calling this function successfully, the set of blocked signals will be the exactly
    /// this set.
    pub(crate) fn set_mask(&self) -> io::Result<Self> {
        self.sigprocmask(libc::SIG_SETMASK)
    }

    /// The set of currently blocked signals.
    #[cfg(test)]
    pub(crate) fn current_mask() -> io::Result<Self> {
        Self::empty()?.block()
    }
}

/// Keeps a set of signals blocked until dropped, then restores the previous mask.
///
/// Nesting guards is fine: the inner guard restores a mask that still blocks the signals of the
/// outer one.
pub(crate) struct SignalMaskGuard {
    original: Option<SignalSet>,
}

impl SignalMaskGuard {
    pub(crate) fn block(set: &SignalSet) -> Self {
        let original = match set.block() {
            Ok(original) => Some(original),
            Err(err) => {
                dev_warn!("cannot block signals: {err}");
                None
            }
        };

        Self { original }
    }

    /// Block a single signal, usually `SIGCHLD` around job table access.
    pub(crate) fn single(signal: SignalNumber) -> Self {
        match SignalSet::single(signal) {
            Ok(set) => Self::block(&set),
            Err(err) => {
                dev_warn!("cannot build signal set: {err}");
                Self { original: None }
            }
        }
    }

    /// The mask that was in place before this guard was created.
    pub(crate) fn original(&self) -> Option<&SignalSet> {
        self.original.as_ref()
    }
}

impl Drop for SignalMaskGuard {
    fn drop(&mut self) {
        if let Some(set) = self.original.take() {
            if let Err(err) = set.set_mask() {
                dev_warn!("cannot restore signal mask: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SignalMaskGuard, SignalSet};
    use crate::system::signal::consts::{SIGCHLD, SIGHUP};

    #[test]
    fn guard_blocks_for_its_scope_only() {
        let chld = SignalSet::single(SIGCHLD).unwrap();
        assert!(chld.contains(SIGCHLD));
        assert!(!chld.contains(SIGHUP));

        let before = SignalSet::current_mask().unwrap().contains(SIGCHLD);
        {
            let _outer = SignalMaskGuard::block(&chld);
            assert!(SignalSet::current_mask().unwrap().contains(SIGCHLD));
            {
                let inner = SignalMaskGuard::single(SIGCHLD);
                assert!(inner.original().unwrap().contains(SIGCHLD));
                assert!(SignalSet::current_mask().unwrap().contains(SIGCHLD));
            }
            assert!(SignalSet::current_mask().unwrap().contains(SIGCHLD));
        }
        assert_eq!(SignalSet::current_mask().unwrap().contains(SIGCHLD), before);
    }
}
