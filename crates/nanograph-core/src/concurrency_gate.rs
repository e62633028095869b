//! Bounded-concurrency gate for async callables.
//!
//! A [`ConcurrencyGate`] owns `N` slots. Wrapping a callable with
//! [`ConcurrencyGate::wrap`] yields a [`Gated`] callable that holds one slot for
//! the whole duration of each invocation, so at most `N` invocations run at
//! once across every clone of the gate. Callers beyond that wait in FIFO order.
//!
//! A slot is held by an RAII permit, so it is returned on every exit path:
//! normal completion, an error result, a panic, or the caller dropping the
//! future. Dropping a call that is still queued removes it from the queue
//! without consuming a slot.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use nanograph_core::make_gate;
//!
//! let gate = make_gate(2).unwrap();
//! let double = gate.wrap(|x: u32| async move { x * 2 });
//! assert_eq!(double.call(21).await, 42);
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::error::{GraphError, GraphResult};

/// Capacity used by [`ConcurrencyGate::default`].
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Build a gate admitting at most `max_concurrency` concurrent calls.
///
/// Returns [`GraphError::Configuration`] when `max_concurrency` is zero or
/// larger than [`Semaphore::MAX_PERMITS`].
pub fn make_gate(max_concurrency: usize) -> GraphResult<ConcurrencyGate> {
    ConcurrencyGate::new(max_concurrency)
}

/// Admission gate shared by every callable it wraps.
///
/// Cloning is cheap and the clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    pub fn new(max_concurrency: usize) -> GraphResult<Self> {
        if max_concurrency == 0 {
            return Err(GraphError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if max_concurrency > Semaphore::MAX_PERMITS {
            return Err(GraphError::Configuration(format!(
                "max_concurrency must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            capacity: max_concurrency,
        })
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Invocations currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }

    /// Wrap `func` so every call goes through this gate.
    pub fn wrap<F>(&self, func: F) -> Gated<F> {
        Gated {
            gate: self.clone(),
            func,
        }
    }

    /// Run a single future under one slot of this gate.
    pub async fn run<Fut>(&self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let _permit = self.admit().await;
        fut.await
    }

    async fn admit(&self) -> SemaphorePermit<'_> {
        if let Ok(permit) = self.semaphore.try_acquire() {
            tracing::trace!(
                capacity = self.capacity,
                in_flight = self.in_flight(),
                "Call admitted immediately"
            );
            return permit;
        }

        tracing::debug!(capacity = self.capacity, "All slots busy, call queued");
        let queued_at = Instant::now();
        let permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            // The semaphore is private to the gate and close() is never called on it.
            Err(_) => unreachable!("concurrency gate semaphore closed"),
        };
        tracing::trace!(
            capacity = self.capacity,
            waited = ?queued_at.elapsed(),
            "Queued call admitted"
        );
        permit
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
            capacity: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// A callable whose invocations are admitted through a [`ConcurrencyGate`].
///
/// The input and output contract is the wrapped callable's own: `call(args)`
/// resolves to exactly what `func(args).await` would, errors included.
/// Callables taking several arguments receive them as a tuple.
#[derive(Debug, Clone)]
pub struct Gated<F> {
    gate: ConcurrencyGate,
    func: F,
}

impl<F> Gated<F> {
    pub async fn call<A, Fut>(&self, args: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        let _permit = self.gate.admit().await;
        (self.func)(args).await
    }
}
