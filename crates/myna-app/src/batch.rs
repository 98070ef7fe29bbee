//! Admission control for jobs launched in batch mode.

use std::collections::VecDeque;
use std::process::{Child, ExitStatus};

use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// FIFO of running children sharing a processor budget.
///
/// A new job may start only while `(active + 1) * procs_per_job <= max_procs`;
/// otherwise the oldest job is waited on first. A single job is always
/// admitted, even if it alone exceeds the budget.
#[derive(Debug)]
pub struct BatchQueue {
    procs_per_job: usize,
    max_procs: usize,
    active: VecDeque<Child>,
    finished: Vec<(u32, ExitStatus)>,
}

impl BatchQueue {
    pub fn new(procs_per_job: usize, max_procs: usize) -> Self {
        Self {
            procs_per_job: procs_per_job.max(1),
            max_procs,
            active: VecDeque::new(),
            finished: Vec::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.active.len()
    }

    pub fn has_room(&self) -> bool {
        (self.active.len() + 1) * self.procs_per_job <= self.max_procs
    }

    /// Wait on the oldest jobs until another one fits.
    pub fn wait_for_room(&mut self) -> AppResult<()> {
        while !self.active.is_empty() && !self.has_room() {
            self.wait_oldest()?;
        }
        Ok(())
    }

    /// Start a job once there is room for it.
    pub fn submit<F>(&mut self, start: F) -> AppResult<u32>
    where
        F: FnOnce() -> AppResult<Child>,
    {
        self.wait_for_room()?;
        let child = start()?;
        let pid = child.id();
        debug!(pid, active = self.active.len() + 1, "Job started");
        self.active.push_back(child);
        Ok(pid)
    }

    fn wait_oldest(&mut self) -> AppResult<()> {
        if let Some(mut child) = self.active.pop_front() {
            let pid = child.id();
            let status = child.wait().map_err(|source| AppError::Wait { pid, source })?;
            info!(pid, %status, "Job complete");
            self.finished.push((pid, status));
        }
        Ok(())
    }

    /// Wait for every job and return `(pid, status)` in completion order.
    pub fn wait_all(&mut self) -> AppResult<Vec<(u32, ExitStatus)>> {
        while !self.active.is_empty() {
            self.wait_oldest()?;
        }
        Ok(std::mem::take(&mut self.finished))
    }

    /// Like [`Self::wait_all`], but any non-zero exit is an error.
    pub fn wait_all_success(&mut self) -> AppResult<()> {
        for (pid, status) in self.wait_all()? {
            if !status.success() {
                return Err(AppError::ProcessFailed { pid, status });
            }
        }
        Ok(())
    }
}
