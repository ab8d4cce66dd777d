//! Tracked background tasks.
//!
//! Every task spawned here lives in one [`JoinSet`], so shutdown can abort
//! and await all of them. A task that returns an error or panics is logged
//! and its failure is emitted on the error stream instead of vanishing.

use crate::error::{ErrorReporter, SyncError, SyncResult};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

pub struct BackgroundTasks {
    set: JoinSet<()>,
    reporter: ErrorReporter,
}

impl BackgroundTasks {
    pub fn new(reporter: ErrorReporter) -> Self {
        Self {
            set: JoinSet::new(),
            reporter,
        }
    }

    /// Spawns `task` on the current runtime.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = SyncResult<()>> + Send + 'static,
    {
        self.reap();
        let reporter = self.reporter.clone();
        self.set.spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => debug!(task = name, "background task finished"),
                Ok(Err(e)) => {
                    warn!(task = name, "background task failed: {e}");
                    reporter.report(&e);
                }
                Err(panic) => {
                    let msg = panic_message(panic.as_ref());
                    error!(task = name, "background task panicked: {msg}");
                    reporter.report(&SyncError::TaskFailed(format!("{name}: {msg}")));
                }
            }
        });
    }

    /// Tasks spawned and not yet reaped.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Drops bookkeeping for tasks that already finished.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while self.set.try_join_next().is_some() {
            reaped += 1;
        }
        reaped
    }

    /// Waits for every task to finish on its own.
    pub async fn join_all(&mut self) {
        while self.set.join_next().await.is_some() {}
    }

    /// Aborts every task and waits until all of them are gone.
    pub async fn shutdown(&mut self) {
        let running = self.set.len();
        self.set.abort_all();
        self.join_all().await;
        debug!("background tasks shut down ({running} were tracked)");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_task_is_reported() {
        let reporter = ErrorReporter::new();
        let mut codes = reporter.codes().subscribe();
        let mut tasks = BackgroundTasks::new(reporter);

        tasks.spawn("upload", async { Err(SyncError::UploadFailed("503".into())) });
        tasks.join_all().await;

        assert_eq!(codes.try_next(), Some(ErrorCode::SyncFailed));
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let reporter = ErrorReporter::new();
        let mut codes = reporter.codes().subscribe();
        let mut tasks = BackgroundTasks::new(reporter);

        tasks.spawn("boom", async { panic!("sensor driver crashed") });
        tasks.join_all().await;

        assert_eq!(codes.try_next(), Some(ErrorCode::SyncFailed));
    }

    #[tokio::test]
    async fn successful_task_reports_nothing() {
        let reporter = ErrorReporter::new();
        let mut codes = reporter.codes().subscribe();
        let mut tasks = BackgroundTasks::new(reporter);

        tasks.spawn("noop", async { Ok(()) });
        tasks.join_all().await;

        assert_eq!(codes.try_next(), None);
    }

    #[tokio::test]
    async fn shutdown_aborts_running_tasks() {
        let mut tasks = BackgroundTasks::new(ErrorReporter::new());
        tasks.spawn("forever", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        assert_eq!(tasks.len(), 1);

        tasks.shutdown().await;
        assert!(tasks.is_empty());
    }
}
