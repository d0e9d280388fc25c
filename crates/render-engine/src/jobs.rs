//! Job registry: cancellation flags and status for running jobs.
//!
//! The registry is an explicit value owned by whoever starts jobs (the CLI
//! creates one per process) and is passed by reference or cloned; clones
//! share the same table.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::batch::{ItemStatus, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running { current: usize, total: usize },
    Finished,
    Failed { message: String },
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed { .. } | Self::Cancelled)
    }
}

#[derive(Debug)]
struct JobEntry {
    label: String,
    cancel: Arc<AtomicBool>,
    status: JobStatus,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    jobs: HashMap<JobId, JobEntry>,
}

/// Shared table of jobs keyed by [`JobId`].
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another holder panicked mid-update; the
    // table itself stays usable.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a queued job and return its handle.
    pub fn register(&self, label: impl Into<String>) -> JobHandle {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = JobId(inner.next_id);
        let cancel = Arc::new(AtomicBool::new(false));
        let label = label.into();
        tracing::debug!(job_id = %id, label = %label, "Registered job");
        inner.jobs.insert(
            id,
            JobEntry {
                label,
                cancel: cancel.clone(),
                status: JobStatus::Queued,
            },
        );
        JobHandle {
            id,
            cancel,
            registry: self.clone(),
        }
    }

    /// Request cooperative cancellation. Returns `false` for unknown ids.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.lock().jobs.get(&id) {
            Some(entry) => {
                entry.cancel.store(true, Ordering::SeqCst);
                tracing::info!(job_id = %id, label = %entry.label, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every non-terminal job; returns how many.
    pub fn cancel_all(&self) -> usize {
        let inner = self.lock();
        let mut count = 0;
        for entry in inner.jobs.values().filter(|e| !e.status.is_terminal()) {
            entry.cancel.store(true, Ordering::SeqCst);
            count += 1;
        }
        count
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.lock().jobs.get(&id).map(|e| e.status.clone())
    }

    pub fn remove(&self, id: JobId) -> Option<JobStatus> {
        self.lock().jobs.remove(&id).map(|e| e.status)
    }

    /// Non-terminal jobs, ordered by id.
    pub fn active(&self) -> Vec<(JobId, String, JobStatus)> {
        let inner = self.lock();
        let mut active: Vec<_> = inner
            .jobs
            .iter()
            .filter(|(_, e)| !e.status.is_terminal())
            .map(|(id, e)| (*id, e.label.clone(), e.status.clone()))
            .collect();
        active.sort_by_key(|(id, _, _)| *id);
        active
    }

    fn set_status(&self, id: JobId, status: JobStatus) {
        if let Some(entry) = self.lock().jobs.get_mut(&id) {
            entry.status = status;
        }
    }
}

/// A job's view of its own registry entry.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    cancel: Arc<AtomicBool>,
    registry: JobRegistry,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: JobStatus) {
        self.registry.set_status(self.id, status);
    }

    /// Progress sink that tracks batch progress in the registry and
    /// forwards events to `inner`.
    pub fn sink<S: ProgressSink>(&self, inner: S) -> JobSink<'_, S> {
        JobSink { handle: self, inner }
    }
}

pub struct JobSink<'a, S> {
    handle: &'a JobHandle,
    inner: S,
}

impl<S: ProgressSink> ProgressSink for JobSink<'_, S> {
    fn emit(&self, event: &ProgressEvent) {
        if event.status == ItemStatus::Processing {
            self.handle.set_status(JobStatus::Running {
                current: event.current,
                total: event.total,
            });
        }
        self.inner.emit(event);
    }

    fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled() || self.inner.is_cancelled()
    }
}
