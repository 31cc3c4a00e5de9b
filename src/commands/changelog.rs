use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::backend::GitBackend;
use crate::error::{GitError, GitResult};

/// Lifecycle of a changelog command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogState {
    Built,
    Executing,
    Completed,
    Aborted,
    Failed,
}

impl ChangelogState {
    fn to_u8(self) -> u8 {
        match self {
            ChangelogState::Built => 0,
            ChangelogState::Executing => 1,
            ChangelogState::Completed => 2,
            ChangelogState::Aborted => 3,
            ChangelogState::Failed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ChangelogState::Built,
            1 => ChangelogState::Executing,
            2 => ChangelogState::Completed,
            3 => ChangelogState::Aborted,
            _ => ChangelogState::Failed,
        }
    }
}

/// Shared view of a changelog command's state; lets another thread abort it
#[derive(Debug, Clone)]
pub struct AbortHandle {
    state: Arc<AtomicU8>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ChangelogState::Built.to_u8())),
        }
    }

    /// Abort unless already completed or failed. Returns whether the command
    /// is now aborted.
    pub fn abort(&self) -> bool {
        let mut current = self.state();
        loop {
            match current {
                ChangelogState::Aborted => return true,
                ChangelogState::Completed | ChangelogState::Failed => return false,
                ChangelogState::Built | ChangelogState::Executing => {
                    match self.state.compare_exchange(
                        current.to_u8(),
                        ChangelogState::Aborted.to_u8(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return true,
                        Err(actual) => current = ChangelogState::from_u8(actual),
                    }
                }
            }
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.state() == ChangelogState::Aborted
    }

    pub fn state(&self) -> ChangelogState {
        ChangelogState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: ChangelogState, to: ChangelogState) -> bool {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ChangelogOptions {
    /// Commits reachable from here are left out
    pub exclude: Option<String>,
    pub include: String,
    pub max: Option<usize>,
}

impl Default for ChangelogOptions {
    fn default() -> Self {
        Self {
            exclude: None,
            include: "HEAD".to_string(),
            max: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogOutcome {
    Completed { bytes: usize },
    /// Nothing was written to the sink
    Aborted,
}

/// Write the raw change log between two revisions to a sink
///
/// Output is assembled in memory and written to the sink only after a final
/// abort check, so an abort that wins leaves the sink untouched.
pub struct ChangelogCommand<'a> {
    backend: &'a dyn GitBackend,
    options: ChangelogOptions,
    sink: Option<&'a mut dyn Write>,
    handle: AbortHandle,
}

impl<'a> ChangelogCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: ChangelogOptions::default(),
            sink: None,
            handle: AbortHandle::new(),
        }
    }

    #[must_use]
    pub fn excludes(mut self, revision: impl Into<String>) -> Self {
        self.options.exclude = Some(revision.into());
        self
    }

    #[must_use]
    pub fn includes(mut self, revision: impl Into<String>) -> Self {
        self.options.include = revision.into();
        self
    }

    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.options.max = Some(max);
        self
    }

    #[must_use]
    pub fn to(mut self, sink: &'a mut dyn Write) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ChangelogState {
        self.handle.state()
    }

    /// Give up without running; the sink receives nothing
    pub fn abort(self) -> ChangelogOutcome {
        self.handle.abort();
        ChangelogOutcome::Aborted
    }

    pub fn execute(self) -> GitResult<ChangelogOutcome> {
        let Some(sink) = self.sink else {
            return Err(GitError::IoError(io::Error::new(
                io::ErrorKind::InvalidInput,
                "changelog has no output sink",
            )));
        };

        if !self
            .handle
            .transition(ChangelogState::Built, ChangelogState::Executing)
        {
            return Ok(ChangelogOutcome::Aborted);
        }

        let mut buffer = Vec::new();
        if let Err(e) = self.backend.changelog(&self.options, &mut buffer, &self.handle) {
            if self.handle.is_aborted() {
                return Ok(ChangelogOutcome::Aborted);
            }
            self.handle
                .transition(ChangelogState::Executing, ChangelogState::Failed);
            return Err(e);
        }

        if !self
            .handle
            .transition(ChangelogState::Executing, ChangelogState::Completed)
        {
            return Ok(ChangelogOutcome::Aborted);
        }

        if let Err(e) = sink.write_all(&buffer).and_then(|_| sink.flush()) {
            self.handle
                .transition(ChangelogState::Completed, ChangelogState::Failed);
            return Err(GitError::IoError(e));
        }

        Ok(ChangelogOutcome::Completed {
            bytes: buffer.len(),
        })
    }
}
