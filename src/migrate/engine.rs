//! Batch migration engine.
//!
//! Locates every repository under a root once, then runs cycles over the
//! pending set until it is empty:
//!
//! ```text
//!   locate(root) ──► RetryQueue ──► take_cycle ──► for each item:
//!                        ▲                           excluded?  ─► skipped
//!                        │                           migrate()  ─► success
//!                        └──────── requeue ◄──────── error ─────► (or gave up)
//! ```
//!
//! Every attempt produces one [`AttemptRecord`], reported as it happens.

use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, info, info_span, warn};

use crate::config::RetryPolicy;
use crate::git::{locate, RepositoryHandle};
use crate::migrate::error::MigrateResult;
use crate::migrate::pipeline::Migrate;
use crate::migrate::queue::{Pending, RetryQueue};

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Success,
    /// on the exclusion list, never migrated
    Skipped,
    /// failed and queued again
    Failed(String),
    /// failed and out of attempts
    GaveUp(String),
}

/// One line of progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub name: String,
    pub attempt: u32,
    pub status: AttemptStatus,
    /// pending repositories after this attempt
    pub remaining: usize,
    pub total: usize,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            AttemptStatus::Success => write!(f, "success")?,
            AttemptStatus::Skipped => write!(f, "skipped")?,
            AttemptStatus::Failed(error) => write!(f, "{error}")?,
            AttemptStatus::GaveUp(error) => {
                write!(f, "{error} (gave up on {} after {} attempts)", self.name, self.attempt)?
            }
        }
        write!(f, ": {} of {} remaining", self.remaining, self.total)
    }
}

/// Outcome of draining one root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub root: PathBuf,
    pub total: usize,
    /// migrated, in completion order
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    /// name and last error of repositories that ran out of attempts
    pub abandoned: Vec<(String, String)>,
    pub cycles: u32,
}

impl BatchReport {
    /// True when nothing was given up on.
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} migrated, {} skipped, {} abandoned of {} in {} cycle(s)",
            self.root.display(),
            self.succeeded.len(),
            self.skipped.len(),
            self.abandoned.len(),
            self.total,
            self.cycles
        )
    }
}

/// Drives a [`Migrate`] implementation over every repository of a root.
pub struct BatchEngine<M> {
    migrator: M,
    policy: RetryPolicy,
    excluded: Vec<String>,
}

impl<M: Migrate> BatchEngine<M> {
    pub fn new(migrator: M, policy: RetryPolicy) -> Self {
        Self {
            migrator,
            policy,
            excluded: Vec::new(),
        }
    }

    /// Names that are located but never migrated.
    pub fn exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.excluded.extend(names);
        self
    }

    /// Locate everything under `root` and migrate it.
    ///
    /// Fails only when `root` itself can't be walked.
    pub fn run_root(
        &mut self,
        root: &Path,
        progress: impl FnMut(&AttemptRecord),
    ) -> MigrateResult<BatchReport> {
        let span = info_span!("root", path = %root.display());
        let _guard = span.enter();

        let handles = locate(root)?;
        info!(count = handles.len(), "located repositories");

        let mut report = self.run(handles, progress);
        report.root = root.to_path_buf();
        Ok(report)
    }

    /// Migrate `handles` until none is pending.
    pub fn run(
        &mut self,
        handles: Vec<RepositoryHandle>,
        mut progress: impl FnMut(&AttemptRecord),
    ) -> BatchReport {
        let mut queue = RetryQueue::new(handles);
        let mut report = BatchReport {
            total: queue.len(),
            ..BatchReport::default()
        };

        while !queue.is_empty() {
            report.cycles += 1;
            let delay = self.policy.delay_before(report.cycles);
            if !delay.is_zero() {
                debug!(cycle = report.cycles, ?delay, "waiting before next cycle");
                thread::sleep(delay);
            }

            let cycle = queue.take_cycle();
            let mut unvisited = cycle.len();
            for item in cycle {
                unvisited -= 1;
                let record = self.attempt(item, &mut queue, &mut report, unvisited);
                progress(&record);
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            skipped = report.skipped.len(),
            abandoned = report.abandoned.len(),
            "batch drained"
        );
        report
    }

    fn attempt(
        &mut self,
        mut item: Pending,
        queue: &mut RetryQueue,
        report: &mut BatchReport,
        unvisited: usize,
    ) -> AttemptRecord {
        let name = item.handle.name().to_string();

        let status = if self.excluded.iter().any(|excluded| *excluded == name) {
            debug!(repo = %name, "excluded");
            report.skipped.push(name.clone());
            AttemptStatus::Skipped
        } else {
            match self.migrator.migrate(&item.handle) {
                Ok(outcome) => {
                    debug!(repo = %name, injected = outcome.injected, created = outcome.binding.created, "migrated");
                    report.succeeded.push(name.clone());
                    AttemptStatus::Success
                }
                Err(e) => {
                    item.attempts += 1;
                    let error = e.to_string();
                    if self.policy.allows_retry(item.attempts) && e.is_transient() {
                        warn!(repo = %name, attempt = item.attempts, error = %error, "attempt failed, requeued");
                        AttemptStatus::Failed(error)
                    } else {
                        warn!(repo = %name, attempt = item.attempts, error = %error, "giving up");
                        report.abandoned.push((name.clone(), error.clone()));
                        AttemptStatus::GaveUp(error)
                    }
                }
            }
        };

        let attempt = match status {
            AttemptStatus::Success | AttemptStatus::Skipped => item.attempts + 1,
            _ => item.attempts,
        };
        if matches!(status, AttemptStatus::Failed(_)) {
            queue.requeue(item);
        }

        AttemptRecord {
            name,
            attempt,
            status,
            remaining: queue.len() + unvisited,
            total: report.total,
        }
    }
}
