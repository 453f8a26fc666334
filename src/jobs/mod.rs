//! The table of jobs tracked by the shell.
//!
//! Positions are 1-based and always derived from the current order of the table, so they
//! renumber as jobs are removed.

mod fmt;

pub(crate) use fmt::{JobLine, JobState};

use crate::system::{interface::ProcessId, term::TermMode, wait::WaitStatus};

/// One external process tracked by the shell. Its pid is also its process group id.
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pid: ProcessId,
    name: String,
    pub(crate) last_status: Option<WaitStatus>,
    pub(crate) is_stopped: bool,
    is_foreground: bool,
    pub(crate) saved_mode: Option<TermMode>,
}

impl Job {
    pub(crate) fn new(pid: ProcessId, name: impl Into<String>, foreground: bool) -> Self {
        Self {
            pid,
            name: name.into(),
            last_status: None,
            is_stopped: false,
            is_foreground: foreground,
            saved_mode: None,
        }
    }

    pub(crate) fn pid(&self) -> ProcessId {
        self.pid
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_foreground(&self) -> bool {
        self.is_foreground
    }

    /// The state shown by `jobs`.
    pub(crate) fn state(&self) -> JobState {
        if self.is_stopped {
            JobState::Stopped
        } else {
            JobState::Running
        }
    }
}

/// What [`JobTable::apply_update`] did with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Update {
    Stopped,
    Continued,
    Removed,
    /// The pid is not (or no longer) in the table.
    Unknown,
}

#[derive(Debug, Default)]
pub(crate) struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append `job` and return its position.
    ///
    /// An entry with the same pid is a leftover of a reused pid and is dropped first. Inserting a
    /// foreground job clears the flag on every other job.
    pub(crate) fn insert(&mut self, job: Job) -> usize {
        self.jobs.retain(|other| other.pid != job.pid);
        if job.is_foreground {
            self.clear_foreground();
        }
        self.jobs.push(job);
        self.jobs.len()
    }

    /// Remove `job` by identity. Removing an absent job is a no-op.
    pub(crate) fn remove(&mut self, job: &Job) -> Option<Job> {
        self.remove_by_pid(job.pid)
    }

    pub(crate) fn remove_by_pid(&mut self, pid: ProcessId) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.pid == pid)?;
        Some(self.jobs.remove(index))
    }

    /// 1-based position of `job`, by identity.
    pub(crate) fn index_of(&self, job: &Job) -> Option<usize> {
        self.position_of(job.pid)
    }

    pub(crate) fn position_of(&self, pid: ProcessId) -> Option<usize> {
        self.jobs
            .iter()
            .position(|other| other.pid == pid)
            .map(|index| index + 1)
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// The job at 1-based `position`.
    pub(crate) fn at(&self, position: usize) -> Option<&Job> {
        self.jobs.get(position.checked_sub(1)?)
    }

    pub(crate) fn at_mut(&mut self, position: usize) -> Option<&mut Job> {
        self.jobs.get_mut(position.checked_sub(1)?)
    }

    pub(crate) fn find_by_pid(&self, pid: ProcessId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.pid == pid)
    }

    pub(crate) fn find_by_pid_mut(&mut self, pid: ProcessId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.pid == pid)
    }

    /// Mark the job with `pid` as the only foreground job. Returns `false` if there is no such
    /// job, in which case nothing changes.
    pub(crate) fn set_foreground(&mut self, pid: ProcessId) -> bool {
        if self.find_by_pid(pid).is_none() {
            return false;
        }
        for job in &mut self.jobs {
            job.is_foreground = job.pid == pid;
        }
        true
    }

    pub(crate) fn clear_foreground(&mut self) {
        for job in &mut self.jobs {
            job.is_foreground = false;
        }
    }

    #[cfg(test)]
    pub(crate) fn foreground(&self) -> Option<&Job> {
        self.jobs.iter().find(|job| job.is_foreground)
    }

    /// Jobs in table order, with their positions.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &Job)> + '_ {
        self.jobs.iter().enumerate().map(|(index, job)| (index + 1, job))
    }

    pub(crate) fn pids(&self) -> Vec<ProcessId> {
        self.jobs.iter().map(|job| job.pid).collect()
    }

    /// Record a state change of `pid`.
    ///
    /// A stopped job stays in the table, a job that exited or was killed is removed, and a
    /// continued one is marked running again. A job that leaves the foreground by stopping or
    /// dying loses the foreground flag.
    pub(crate) fn apply_update(&mut self, pid: ProcessId, status: WaitStatus) -> Update {
        if status.is_terminated() {
            return match self.remove_by_pid(pid) {
                Some(_) => Update::Removed,
                None => Update::Unknown,
            };
        }

        let Some(job) = self.find_by_pid_mut(pid) else {
            return Update::Unknown;
        };

        if status.was_stopped() {
            job.last_status = Some(status);
            job.is_stopped = true;
            job.is_foreground = false;
            Update::Stopped
        } else if status.did_continue() {
            job.is_stopped = false;
            Update::Continued
        } else {
            Update::Unknown
        }
    }
}
