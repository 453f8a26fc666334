#[macro_use]
mod macros;
pub(crate) mod common;
pub(crate) mod control;
pub(crate) mod cutils;
pub(crate) mod exec;
pub(crate) mod jobs;
pub(crate) mod log;
pub(crate) mod shell;
pub(crate) mod system;

pub use shell::main as shell_main;
