use std::{ffi::c_int, process};

use crate::{
    common::{Error, Session},
    log::{user_error, ShellLogger},
};

use cli::{ShellAction, ShellRunOptions};
use help::{long_help_message, USAGE_MSG};

mod cli;
mod help;
mod input;
mod repl;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn run(options: ShellRunOptions) -> Result<c_int, Error> {
    let mut session = Session::init()?;

    match options.command {
        Some(line) => repl::run_command_line(&mut session, &line),
        None => repl::interactive(&mut session, options.quiet),
    }
}

pub fn main() {
    ShellLogger::new("fsosh: ").into_global_logger();

    let action = match ShellAction::from_env() {
        Ok(action) => action,
        Err(error) => {
            eprintln_ignore_io_error!("fsosh: {error}\n{USAGE_MSG}");
            process::exit(1);
        }
    };

    match action {
        ShellAction::Help => {
            println_ignore_io_error!("{}", long_help_message());
            process::exit(0);
        }
        ShellAction::Version => {
            println_ignore_io_error!("fsosh {VERSION}");
            process::exit(0);
        }
        ShellAction::Run(options) => match run(options) {
            Ok(status) => process::exit(status),
            Err(error) => {
                user_error!("{error}");
                process::exit(1);
            }
        },
    }
}
