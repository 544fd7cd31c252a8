//! Screen capture collaborator boundary.
//!
//! Capture is outside this core; the contract is that "no path" is returned
//! until a real implementation backs this, as a distinct non-crashing
//! outcome a caller can tell apart from a genuine capture failure.

use std::path::PathBuf;

use tracing::warn;

pub fn capture_screen_to_file(display_id: i32) -> Option<PathBuf> {
    warn!("screen capture not implemented (display {})", display_id);
    None
}
