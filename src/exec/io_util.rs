use std::io;

/// Return `true` if the IO error is an interruption.
pub(crate) fn was_interrupted(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Call `f` repeatedly until it succeeds or it encounters a non-interruption error.
pub(crate) fn retry_while_interrupted<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match f() {
            Err(err) if was_interrupted(&err) => {}
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{retry_while_interrupted, was_interrupted};

    #[test]
    fn interruptions_are_retried() {
        let mut attempts = 0;
        let value = retry_while_interrupted(|| {
            attempts += 1;
            if attempts < 3 {
                Err(io::Error::from(io::ErrorKind::Interrupted))
            } else {
                Ok(attempts)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn other_errors_are_returned() {
        let err = retry_while_interrupted::<()>(|| Err(io::Error::from_raw_os_error(libc::ECHILD)))
            .unwrap_err();
        assert!(!was_interrupted(&err));
        assert_eq!(err.raw_os_error(), Some(libc::ECHILD));
    }
}
