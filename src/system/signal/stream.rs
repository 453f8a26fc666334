use std::{
    io,
    mem::MaybeUninit,
    os::{
        fd::{AsRawFd, RawFd},
        unix::net::UnixStream,
    },
    sync::OnceLock,
};

use crate::{cutils::cerr, log::dev_error};

use super::{
    handler::{SignalHandler, SignalHandlerBehavior},
    info::SignalInfo,
    signal_name, SignalNumber,
};

static STREAM: OnceLock<SignalStream> = OnceLock::new();

pub(super) extern "C" fn send_siginfo(
    _signal: SignalNumber,
    info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    if let Some(tx) = STREAM.get().map(|stream| stream.tx.as_raw_fd()) {
        // A full socket buffer drops the message, which is fine: every drain rescans all jobs.
        unsafe { libc::send(tx, info.cast(), SignalInfo::SIZE, libc::MSG_DONTWAIT) };
    }
}

/// A type able to receive signal information from any [`super::SignalHandler`] with the
/// [`super::SignalHandlerBehavior::Stream`] behavior.
///
/// This is a singleton type. Meaning that there will be only one value of this type during the
/// execution of a program.
pub(crate) struct SignalStream {
    rx: UnixStream,
    tx: UnixStream,
}

impl SignalStream {
    /// Get the [`SignalStream`], creating it on the first call.
    pub(crate) fn init() -> io::Result<&'static Self> {
        if let Some(stream) = STREAM.get() {
            return Ok(stream);
        }

        let (rx, tx) = UnixStream::pair().map_err(|err| {
            dev_error!("cannot create socket pair for `SignalStream`: {err}");
            err
        })?;
        rx.set_nonblocking(true)?;

        Ok(STREAM.get_or_init(|| Self { rx, tx }))
    }

    /// Receives the information related to the arrival of a signal, if any is pending.
    ///
    /// Returns `Ok(None)` without blocking when no signal arrived since the last call.
    pub(crate) fn try_recv(&self) -> io::Result<Option<SignalInfo>> {
        let mut info = MaybeUninit::<SignalInfo>::uninit();
        let fd = self.rx.as_raw_fd();
        let bytes = match cerr(unsafe {
            libc::recv(fd, info.as_mut_ptr().cast(), SignalInfo::SIZE, 0)
        }) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(err) => return Err(err),
        };

        if bytes as usize != SignalInfo::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Not enough bytes when receiving `siginfo_t`",
            ));
        }
        // SAFETY: we can assume `info` is initialized because `recv` wrote enough bytes to fill
        // the value and `siginfo_t` is POD.
        Ok(Some(unsafe { info.assume_init() }))
    }
}

pub(crate) fn register_handlers<const N: usize>(
    signals: [SignalNumber; N],
) -> io::Result<[SignalHandler; N]> {
    let mut handlers = signals.map(|signal| (signal, MaybeUninit::uninit()));

    for (signal, handler) in &mut handlers {
        *handler = SignalHandler::register(*signal, SignalHandlerBehavior::Stream)
            .map(MaybeUninit::new)
            .map_err(|err| {
                let name = signal_name(*signal).unwrap_or("?");
                dev_error!("cannot setup handler for {name}: {err}");
                err
            })?;
    }

    Ok(handlers.map(|(_, handler)| unsafe { handler.assume_init() }))
}

impl AsRawFd for SignalStream {
    fn as_raw_fd(&self) -> RawFd {
        self.rx.as_raw_fd()
    }
}
