//! Process-wide engine context
//!
//! The context is created once at start-up with [`EngineContext::init`],
//! handed to every [`GeometryEngine`](super::GeometryEngine) and released
//! with [`EngineContext::finish`]. Every backend call runs through
//! [`EngineContext::guard`], which turns backend panics into
//! [`EngineError::Engine`] at the call site.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::{EngineError, Result};

/// Shared handle to the geometry backend
#[derive(Debug)]
pub struct EngineContext {
    active: AtomicBool,
    calls: AtomicU64,
    failures: AtomicU64,
}

impl EngineContext {
    /// Acquire the backend. Call once per process.
    pub fn init() -> Arc<EngineContext> {
        info!("geometry engine context initialized");
        Arc::new(EngineContext {
            active: AtomicBool::new(true),
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        })
    }

    /// Release the backend. Later calls through this context fail.
    pub fn finish(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!(
                calls = self.calls.load(Ordering::Relaxed),
                failures = self.failures.load(Ordering::Relaxed),
                "geometry engine context finished"
            );
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of guarded calls so far
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of guarded calls that failed inside the backend
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Run `f` against the backend, converting a panic into an error.
    pub fn guard<T>(&self, operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if !self.is_active() {
            return Err(EngineError::Engine(format!(
                "{}: engine context has been finished",
                operation
            )));
        }
        self.calls.fetch_add(1, Ordering::Relaxed);

        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                debug!(operation, error = %e, "engine operation failed");
                Err(e)
            }
            Err(payload) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown backend failure".to_string()
                };
                warn!(operation, %message, "geometry backend raised an exception");
                Err(EngineError::Engine(format!("{}: {}", operation, message)))
            }
        }
    }
}
