//! Capability seam: every privileged injection backend implements [`EventSink`].

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::event::{KeyEvent, PointerEvent};

/// Which setup/delivery ABI a backend bound against. The uinput setup
/// interface changed additively across kernel revisions; each supported
/// revision is one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// uinput protocol v5+: device created via UI_DEV_SETUP / UI_ABS_SETUP.
    DevSetup,
    /// Older kernels: uinput_user_dev written directly to the fd.
    LegacyWrite,
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallShape::DevSetup => write!(f, "dev-setup"),
            CallShape::LegacyWrite => write!(f, "legacy-write"),
        }
    }
}

/// A bound handle to the privileged injection facility.
///
/// Delivery is fire-and-forget: implementations report whether the event was
/// handed off, not whether any consumer processed it, and must not block
/// waiting for downstream acknowledgement.
pub trait EventSink: Send + Sync {
    fn shape(&self) -> CallShape;

    /// Hand off one pointer event. Display targeting is best-effort; a
    /// backend that cannot target `display_id` logs it and injects against
    /// the default display.
    fn inject_pointer(&self, event: &PointerEvent) -> Result<bool>;

    /// Hand off one key sub-event.
    fn inject_key(&self, event: &KeyEvent) -> Result<bool>;
}

/// One probe-able backend revision. Candidate lists are ordered newest
/// shape first; the resolver binds the first probe that succeeds.
pub struct BackendCandidate {
    pub shape: CallShape,
    pub probe: Box<dyn Fn() -> Result<Arc<dyn EventSink>> + Send + Sync>,
}
