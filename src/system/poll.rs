use std::{
    collections::BTreeMap,
    io,
    os::fd::{AsRawFd, RawFd},
};

use crate::cutils::cerr;
use libc::{pollfd, POLLERR, POLLHUP, POLLIN};

/// A set of indexed file descriptors to be polled for readability using the
/// [`poll`](https://manpage.me/?q=poll) system call.
pub struct PollSet<K> {
    fds: BTreeMap<K, RawFd>,
}

impl<K: Eq + PartialEq + Ord + PartialOrd + Clone> PollSet<K> {
    /// Create an empty set of file descriptors.
    pub const fn new() -> Self {
        Self {
            fds: BTreeMap::new(),
        }
    }

    /// Add a file descriptor under the provided key.
    ///
    /// If the provided key is already in the set, calling this function will overwrite the file
    /// descriptor for that key.
    pub fn add_fd_read<F: AsRawFd>(&mut self, key: K, fd: &F) {
        self.fds.insert(key, fd.as_raw_fd());
    }

    /// Poll the set of file descriptors and return the keys of the descriptors that are ready to
    /// be read. A descriptor whose other end hung up counts as ready, reading it yields EOF.
    ///
    /// Calling this function will block until one of the file descriptors in the set is ready.
    pub fn poll(&mut self) -> io::Result<Vec<K>> {
        let mut fds: Vec<pollfd> = self
            .fds
            .values()
            .map(|&fd| pollfd {
                fd,
                events: POLLIN,
                revents: 0,
            })
            .collect();

        let n = cerr(unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as _, -1) })?;

        let mut keys = Vec::with_capacity(n as usize);

        for (key, fd) in self.fds.keys().zip(fds) {
            if fd.revents & (POLLIN | POLLHUP | POLLERR) != 0 {
                keys.push(key.clone());
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, os::unix::net::UnixStream};

    use super::PollSet;

    #[test]
    fn only_readable_keys_are_returned() {
        let (quiet_rx, _quiet_tx) = UnixStream::pair().unwrap();
        let (busy_rx, mut busy_tx) = UnixStream::pair().unwrap();
        busy_tx.write_all(b"x").unwrap();

        let mut set = PollSet::new();
        set.add_fd_read("quiet", &quiet_rx);
        set.add_fd_read("busy", &busy_rx);

        assert_eq!(set.poll().unwrap(), vec!["busy"]);
    }

    #[test]
    fn hang_up_counts_as_readable() {
        let (rx, tx) = UnixStream::pair().unwrap();
        drop(tx);

        let mut set = PollSet::new();
        set.add_fd_read(0u8, &rx);

        assert_eq!(set.poll().unwrap(), vec![0]);
    }
}
