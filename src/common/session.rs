use std::ffi::c_int;

use crate::{
    jobs::JobTable,
    log::{dev_info, dev_warn},
    system::{
        getpgrp, getpid,
        interface::ProcessId,
        killpg, setpgid,
        signal::{
            consts::*, register_handlers, SignalHandler, SignalHandlerBehavior, SignalMaskGuard,
            SignalStream,
        },
        term::ShellTerm,
    },
};

use super::Error;

/// Everything the shell owns while it runs: its identity, its terminal and its jobs.
pub(crate) struct Session {
    pub(crate) pgrp: ProcessId,
    /// `None` when standard input is not a terminal. Job control then runs without terminal
    /// handoff.
    pub(crate) term: Option<ShellTerm>,
    pub(crate) jobs: JobTable,
    pub(crate) signals: &'static SignalStream,
    /// Exit status of the last foreground command.
    pub(crate) last_status: c_int,
    _handlers: Vec<SignalHandler>,
}

impl Session {
    /// Signals a job control shell must not be stopped or killed by.
    const IGNORED: [c_int; 5] = [SIGINT, SIGQUIT, SIGTSTP, SIGTTIN, SIGTTOU];

    /// Set up the shell for job control.
    ///
    /// With a terminal the shell waits until it is in the foreground, leads its own process group
    /// and owns the terminal. Without one it only listens for children changing state.
    pub(crate) fn init() -> Result<Self, Error> {
        let signals = SignalStream::init()?;
        let [sigchld] = register_handlers([SIGCHLD])?;
        let mut handlers = vec![sigchld];

        let pid = getpid();
        let term = ShellTerm::from_stdin()?;

        let Some(term) = term else {
            dev_info!("standard input is not a terminal, running without terminal control");
            return Ok(Self::detached(signals, handlers));
        };

        wait_for_foreground(&term)?;

        for signal in Self::IGNORED {
            handlers.push(SignalHandler::register(signal, SignalHandlerBehavior::Ignore)?);
        }

        // A session leader already leads its group and may not change it.
        if getpgrp() != pid {
            setpgid(pid, pid).map_err(Error::ProcessGroup)?;
        }
        let pgrp = getpgrp();

        term.tcsetpgrp_nobg(pgrp).map_err(Error::Terminal)?;

        dev_info!("shell {pid} owns the terminal with process group {pgrp}");

        Ok(Self {
            pgrp,
            term: Some(term),
            jobs: JobTable::new(),
            signals,
            last_status: 0,
            _handlers: handlers,
        })
    }

    /// A session that tracks jobs but never touches a terminal.
    pub(crate) fn detached(signals: &'static SignalStream, handlers: Vec<SignalHandler>) -> Self {
        Self {
            pgrp: getpgrp(),
            term: None,
            jobs: JobTable::new(),
            signals,
            last_status: 0,
            _handlers: handlers,
        }
    }

    pub(crate) fn is_interactive(&self) -> bool {
        self.term.is_some()
    }

    /// Keep notifications out while the job table is being used. They are delivered when the
    /// guard is dropped.
    pub(crate) fn exclude_notifications(&self) -> SignalMaskGuard {
        SignalMaskGuard::single(SIGCHLD)
    }

    /// Hang up stopped jobs and wake them, so nothing is left stopped behind the shell.
    pub(crate) fn hang_up_stopped_jobs(&self) {
        let _guard = self.exclude_notifications();
        for (_, job) in self.jobs.iter().filter(|(_, job)| job.is_stopped) {
            for signal in [SIGHUP, SIGCONT] {
                if let Err(err) = killpg(job.pid(), signal) {
                    dev_warn!("cannot signal job {}: {err}", job.pid());
                }
            }
        }
    }
}

/// Stop ourselves until the terminal's foreground group is ours.
fn wait_for_foreground(term: &ShellTerm) -> Result<(), Error> {
    loop {
        let foreground = term.foreground_group().map_err(Error::Terminal)?;
        let own = getpgrp();
        if foreground == own {
            return Ok(());
        }
        dev_info!("process group {own} is in the background, waiting for the terminal");
        killpg(own, SIGTTIN)?;
    }
}
