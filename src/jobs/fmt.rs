use std::fmt;

use super::Job;

/// The three states a job can be reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Running,
    Stopped,
    Terminated,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobState::Running => "EN EJECUCIÓN",
            JobState::Stopped => "PARADO",
            JobState::Terminated => "TERMINADO",
        })
    }
}

/// ` [<position>] <name> (pid=<pid>) : <STATE>`
pub(crate) struct JobLine<'a> {
    pub(crate) position: usize,
    pub(crate) job: &'a Job,
    pub(crate) state: JobState,
}

impl<'a> JobLine<'a> {
    pub(crate) fn new(position: usize, job: &'a Job, state: JobState) -> Self {
        Self {
            position,
            job,
            state,
        }
    }

    /// The line `jobs` prints for `job`.
    pub(crate) fn current(position: usize, job: &'a Job) -> Self {
        Self::new(position, job, job.state())
    }
}

impl fmt::Display for JobLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " [{}] {} (pid={}) : {}",
            self.position,
            self.job.name(),
            self.job.pid(),
            self.state
        )
    }
}
