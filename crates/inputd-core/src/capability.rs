//! Version-adaptive capability resolution.
//!
//! The resolver probes backend candidates newest shape first, caches the
//! first handle that binds, and never re-probes per call. Re-resolution only
//! happens when no handle is cached, which also covers earlier failed
//! attempts. Two workers racing through `initialize` can both probe; the
//! duplicate bind is idempotent and the second write just replaces an
//! equivalent handle.

use std::sync::{Arc, PoisonError, RwLock};

use inputd_platform::capability::{BackendCandidate, EventSink};
use tracing::{debug, info, warn};

pub struct CapabilityResolver {
    candidates: Vec<BackendCandidate>,
    cached: RwLock<Option<Arc<dyn EventSink>>>,
}

impl CapabilityResolver {
    pub fn new(candidates: Vec<BackendCandidate>) -> Self {
        Self {
            candidates,
            cached: RwLock::new(None),
        }
    }

    /// A resolver with nothing to bind; every injection reports false.
    pub fn unavailable() -> Self {
        Self::new(Vec::new())
    }

    /// Attempt to bind the injection facility. Returns false and leaves the
    /// resolver unresolved when no candidate binds; never panics or
    /// propagates the probe errors.
    pub fn initialize(&self) -> bool {
        if self.handle_cached().is_some() {
            return true;
        }
        for candidate in &self.candidates {
            match (candidate.probe)() {
                Ok(sink) => {
                    info!("injection capability bound (shape: {})", candidate.shape);
                    *self
                        .cached
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Some(sink);
                    return true;
                }
                Err(e) => {
                    debug!("shape {} unavailable: {:#}", candidate.shape, e);
                }
            }
        }
        warn!("no injection capability could be bound");
        false
    }

    /// The cached handle, attempting one lazy resolution when absent.
    pub fn handle(&self) -> Option<Arc<dyn EventSink>> {
        if let Some(sink) = self.handle_cached() {
            return Some(sink);
        }
        self.initialize();
        self.handle_cached()
    }

    fn handle_cached(&self) -> Option<Arc<dyn EventSink>> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
