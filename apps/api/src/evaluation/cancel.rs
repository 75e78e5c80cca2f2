//! Attempt cancellation.
//!
//! A `CancelHandle` / `CancelSignal` pair over a `watch` channel. The handle
//! lives in the attempt registry; the signal travels with the attempt and is
//! raced against every in-flight detector call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("attempt was cancelled")]
pub struct Cancelled;

/// Requests cancellation. Cancelling twice is harmless.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Runs `fut` unless cancellation arrives first; the future is dropped on cancel.
    pub async fn race<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Attempt registry
// ────────────────────────────────────────────────────────────────────────────

/// In-flight attempts by id, so an attempt can be cancelled from another request.
#[derive(Debug, Default)]
pub struct AttemptRegistry {
    in_flight: Mutex<HashMap<Uuid, CancelHandle>>,
}

/// Removes its attempt from the registry when dropped, including when the
/// request future is dropped mid-attempt.
#[derive(Debug)]
pub struct AttemptGuard {
    registry: Arc<AttemptRegistry>,
    attempt_id: Uuid,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.attempt_id);
    }
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, CancelHandle>> {
        // The map stays consistent even if a holder panicked.
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a new attempt. `None` if the id is already in flight.
    pub fn register(self: &Arc<Self>, attempt_id: Uuid) -> Option<(AttemptGuard, CancelSignal)> {
        let mut in_flight = self.lock();
        if in_flight.contains_key(&attempt_id) {
            return None;
        }
        let (handle, signal) = cancel_pair();
        in_flight.insert(attempt_id, handle);
        Some((
            AttemptGuard {
                registry: Arc::clone(self),
                attempt_id,
            },
            signal,
        ))
    }

    /// Signals cancellation. Returns false if no such attempt is in flight.
    pub fn cancel(&self, attempt_id: &Uuid) -> bool {
        match self.lock().get(attempt_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_registry_lifecycle() {
        let registry = Arc::new(AttemptRegistry::new());
        let id = Uuid::new_v4();

        let (guard, signal) = registry.register(id).unwrap();
        assert!(registry.register(id).is_none());
        assert_eq!(registry.in_flight(), 1);

        assert!(registry.cancel(&id));
        assert!(signal.is_cancelled());

        drop(guard);
        assert_eq!(registry.in_flight(), 0);
        assert!(!registry.cancel(&id));
    }

    #[tokio::test]
    async fn test_race_completes_without_cancel() {
        let (_handle, signal) = cancel_pair();
        assert_eq!(signal.race(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_cancel_before_race_short_circuits() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.race(async { 7 }).await, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_future() {
        let (handle, signal) = cancel_pair();
        let task = tokio::spawn(async move {
            signal
                .race(tokio::time::sleep(Duration::from_secs(3600)))
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        assert_eq!(task.await.unwrap(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_fire() {
        let signal = CancelSignal::never();
        let raced = tokio::time::timeout(Duration::from_secs(1), signal.cancelled()).await;
        assert!(raced.is_err());
        assert!(signal.check().is_ok());
    }
}
