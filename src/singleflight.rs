//! Per-key request coalescing.
//!
//! The first caller for a key spawns the compute on the runtime; callers
//! arriving while it runs await the same shared future. The compute is
//! detached from its callers: dropping every caller does not cancel it, so
//! its result still reaches the cache.
//!
//! ```text
//! caller A ──▶ run("k") ──▶ spawn(compute) ──▶ remove("k") ──▶ result
//! caller B ──▶ run("k") ──▶ join ─────────────────────────────▶ result
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::{EngineError, EngineResult};

type Flight<T> = Shared<BoxFuture<'static, EngineResult<T>>>;

type Registry<T> = Arc<Mutex<HashMap<String, Flight<T>>>>;

/// Removes a key from the in-flight map when dropped.
struct Deregister<T> {
    registry: Registry<T>,
    key: String,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        if let Ok(mut inflight) = self.registry.lock() {
            inflight.remove(&self.key);
        }
    }
}

/// Whether a caller started the compute or joined one already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Joined,
}

pub struct Coalescer<T> {
    inflight: Registry<T>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key` unless a compute for `key` is already in
    /// flight, in which case await that one instead.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> (EngineResult<T>, Role)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<T>> + Send + 'static,
    {
        let (flight, role) = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.get(key) {
                Some(flight) => (flight.clone(), Role::Joined),
                None => {
                    let fut = compute();
                    let deregister = Deregister {
                        registry: Arc::clone(&self.inflight),
                        key: key.to_string(),
                    };
                    // The entry leaves the map when the task ends, after the
                    // compute (and its cache write) or a panic inside it.
                    let handle = tokio::spawn(async move {
                        let _deregister = deregister;
                        fut.await
                    });
                    let flight = async move {
                        match handle.await {
                            Ok(out) => out,
                            Err(e) => Err(EngineError::from(e)),
                        }
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key.to_string(), flight.clone());
                    (flight, Role::Leader)
                }
            }
        };

        (flight.await, role)
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }
}
