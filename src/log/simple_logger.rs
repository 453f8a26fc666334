use std::{io::Write, sync::Mutex};

#[cfg(feature = "dev")]
use std::{fs::File, path::Path};

use log::Log;

/// Writes each record as one line behind a fixed prefix.
///
/// A line goes out in a single write, so it does not get mixed up with the output of jobs sharing
/// the descriptor.
pub struct SimpleLogger<W> {
    target: Mutex<W>,
    prefix: &'static str,
}

impl<W: Write + Send> SimpleLogger<W> {
    fn new(target: W, prefix: &'static str) -> Self {
        Self {
            target: Mutex::new(target),
            prefix,
        }
    }
}

impl<W: Write + Send> Log for SimpleLogger<W> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        let line = format!("{}{}\n", self.prefix, record.args());
        if let Ok(mut target) = self.target.lock() {
            let _ = target.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut target) = self.target.lock() {
            let _ = target.flush();
        }
    }
}

impl SimpleLogger<std::io::Stderr> {
    pub fn to_stderr(prefix: &'static str) -> Self {
        Self::new(std::io::stderr(), prefix)
    }
}

#[cfg(feature = "dev")]
impl SimpleLogger<File> {
    pub fn to_file<P: AsRef<Path>>(name: P, prefix: &'static str) -> Result<Self, std::io::Error> {
        let target = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(name)?;
        Ok(Self::new(target, prefix))
    }
}
