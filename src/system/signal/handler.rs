use std::io;

use crate::log::dev_warn;

use super::{consts::*, set::SignalAction, signal_name, SignalNumber};

/// The action of a signal, changed for as long as this value lives.
///
/// Dropping it puts back the action that was in place before [`SignalHandler::register`].
pub(crate) struct SignalHandler {
    signal: SignalNumber,
    original_action: SignalAction,
}

impl SignalHandler {
    /// Register `behavior` for `signal`. `SIGKILL` and `SIGSTOP` are refused.
    pub(crate) fn register(
        signal: SignalNumber,
        behavior: SignalHandlerBehavior,
    ) -> io::Result<Self> {
        if matches!(signal, SIGKILL | SIGSTOP) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "the action of {} cannot be changed",
                    signal_name(signal).unwrap_or("?")
                ),
            ));
        }

        let original_action = SignalAction::new(behavior)?.register(signal)?;

        Ok(Self {
            signal,
            original_action,
        })
    }

    /// Put `signal` back to its default action for good, as a job expects to find it.
    pub(crate) fn reset_to_default(signal: SignalNumber) -> io::Result<()> {
        Self::register(signal, SignalHandlerBehavior::Default).map(Self::forget)
    }

    /// Keep the new action after this value is gone.
    pub(crate) fn forget(self) {
        std::mem::forget(self)
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        if let Err(err) = self.original_action.register(self.signal) {
            dev_warn!(
                "cannot restore the action of {}: {err}",
                signal_name(self.signal).unwrap_or("?"),
            )
        }
    }
}

/// The possible behaviors for a [`SignalHandler`].
pub(crate) enum SignalHandlerBehavior {
    Default,
    Ignore,
    /// Forward the signal into the [`super::SignalStream`].
    Stream,
}
