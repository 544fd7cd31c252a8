// Linux uinput backends for the input-injection capability.

#[cfg(target_os = "linux")]
pub mod uinput;

#[cfg(target_os = "linux")]
pub use crate::uinput::UinputBackend;

#[cfg(target_os = "linux")]
use inputd_platform::capability::{BackendCandidate, CallShape};

/// Backend candidates for this platform, newest call shape first.
#[cfg(target_os = "linux")]
pub fn backend_candidates() -> Vec<BackendCandidate> {
    vec![
        BackendCandidate {
            shape: CallShape::DevSetup,
            probe: Box::new(uinput::probe_dev_setup),
        },
        BackendCandidate {
            shape: CallShape::LegacyWrite,
            probe: Box::new(uinput::probe_legacy_write),
        },
    ]
}
