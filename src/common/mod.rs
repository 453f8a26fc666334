#![forbid(unsafe_code)]

pub use command::{Command, CommandLine};
pub use error::Error;
pub(crate) use session::Session;

pub mod command;
pub mod error;
pub(crate) mod session;
