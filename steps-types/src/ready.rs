//! Two-phase initialization.
//!
//! A component that needs asynchronous setup (opening a store, binding a
//! service) hands out a [`ReadySignal`] at construction time and resolves it
//! through its [`ReadyHandle`] once setup finished. Dependents await the
//! signal before issuing operations; calling into a component before its
//! signal resolved is a contract violation on the caller's side.

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

/// Why a component never became ready.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotReady {
    #[error("initialization failed: {0}")]
    Failed(String),

    #[error("initialization abandoned before completion")]
    Abandoned,
}

/// Resolving side of a ready signal.
#[derive(Debug)]
pub struct ReadyHandle {
    tx: watch::Sender<Readiness>,
}

/// Awaiting side of a ready signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<Readiness>,
}

/// Creates an unresolved ready signal.
pub fn ready_signal() -> (ReadyHandle, ReadySignal) {
    let (tx, rx) = watch::channel(Readiness::Pending);
    (ReadyHandle { tx }, ReadySignal { rx })
}

impl ReadyHandle {
    /// Resolves the signal successfully. Only the first resolution counts.
    pub fn mark_ready(&self) {
        self.resolve(Readiness::Ready);
    }

    /// Resolves the signal with a failure. Only the first resolution counts.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        self.resolve(Readiness::Failed(reason.into()));
    }

    fn resolve(&self, outcome: Readiness) {
        self.tx.send_if_modified(|state| {
            if *state == Readiness::Pending {
                *state = outcome;
                true
            } else {
                false
            }
        });
    }
}

impl ReadySignal {
    /// Waits until the component is ready or failed to become ready.
    pub async fn wait(&self) -> Result<(), NotReady> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|s| *s != Readiness::Pending)
            .await
            .map_err(|_| NotReady::Abandoned)?;
        match &*state {
            Readiness::Ready => Ok(()),
            Readiness::Failed(reason) => Err(NotReady::Failed(reason.clone())),
            Readiness::Pending => Err(NotReady::Abandoned),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow() == Readiness::Ready
    }
}
