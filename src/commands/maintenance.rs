use std::fmt;

use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceTask {
    Gc,
    IncrementalRepack,
    CommitGraph,
    Prefetch,
    LooseObjects,
}

impl MaintenanceTask {
    /// Name accepted by `git maintenance run --task=`
    pub fn name(self) -> &'static str {
        match self {
            MaintenanceTask::Gc => "gc",
            MaintenanceTask::IncrementalRepack => "incremental-repack",
            MaintenanceTask::CommitGraph => "commit-graph",
            MaintenanceTask::Prefetch => "prefetch",
            MaintenanceTask::LooseObjects => "loose-objects",
        }
    }
}

impl fmt::Display for MaintenanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    Completed,
    /// The backend or the installed git cannot run this task
    NotSupported,
}

pub struct MaintenanceCommand<'a> {
    backend: &'a dyn GitBackend,
    task: MaintenanceTask,
}

impl<'a> MaintenanceCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            task: MaintenanceTask::Gc,
        }
    }

    #[must_use]
    pub fn task(mut self, task: MaintenanceTask) -> Self {
        self.task = task;
        self
    }

    pub fn execute(self) -> GitResult<MaintenanceOutcome> {
        self.backend.maintenance(self.task)
    }
}
