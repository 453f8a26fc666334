use std::{io, os::fd::AsRawFd};

use crate::{
    exec::{retry_while_interrupted, was_interrupted},
    system::{poll::PollSet, read},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Source {
    Input,
    Wake,
}

/// Reads lines while keeping an eye on a second descriptor that may need attention first.
///
/// Input is read straight from the descriptor into our own buffer, so that `poll` never misses
/// data hidden in a userspace buffer.
pub(crate) struct LineReader<F> {
    input: F,
    buffer: Vec<u8>,
    eof: bool,
}

impl<F: AsRawFd> LineReader<F> {
    pub(crate) fn new(input: F) -> Self {
        Self {
            input,
            buffer: Vec::new(),
            eof: false,
        }
    }

    /// Wait for the next line, without its newline. `on_wake` runs every time `wake` becomes
    /// readable and must drain it.
    ///
    /// A last line without newline is still returned. `None` means end of input.
    pub(crate) fn next_line<W: AsRawFd>(
        &mut self,
        wake: &W,
        mut on_wake: impl FnMut(),
    ) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            if self.eof {
                return Ok(self.take_rest());
            }

            let mut set = PollSet::new();
            set.add_fd_read(Source::Input, &self.input);
            set.add_fd_read(Source::Wake, wake);

            let ready = match set.poll() {
                Ok(ready) => ready,
                Err(err) if was_interrupted(&err) => continue,
                Err(err) => return Err(err),
            };

            if ready.contains(&Source::Wake) {
                on_wake();
            }

            if ready.contains(&Source::Input) {
                self.fill()?;
            }
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0; 1024];
        let n = retry_while_interrupted(|| read(&self.input, &mut chunk))?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buffer.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&byte| byte == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=end).take(end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn take_rest(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            let rest = std::mem::take(&mut self.buffer);
            Some(String::from_utf8_lossy(&rest).into_owned())
        }
    }
}
