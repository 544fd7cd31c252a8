//! Synthetic input event model shared by all injection backends.

use std::sync::OnceLock;
use std::time::Instant;

/// Pointer action codes as the automation controller sends them.
pub const ACTION_DOWN: i32 = 0;
pub const ACTION_UP: i32 = 1;
pub const ACTION_MOVE: i32 = 2;

/// Direction of one key sub-event. A logical key press is Down then Up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// A synthesized pointer event targeting a display.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub down_time_ms: u64,
    pub event_time_ms: u64,
    pub action: i32,
    pub x: i32,
    pub y: i32,
    pub meta_state: i32,
    pub display_id: i32,
}

impl PointerEvent {
    /// Build an event stamped with the current monotonic uptime:
    /// down-time equals event-time, zero meta-state.
    pub fn now(display_id: i32, action: i32, x: i32, y: i32) -> Self {
        let now = uptime_millis();
        Self {
            down_time_ms: now,
            event_time_ms: now,
            action,
            x,
            y,
            meta_state: 0,
            display_id,
        }
    }
}

/// One synthesized key sub-event.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub down_time_ms: u64,
    pub event_time_ms: u64,
    pub direction: KeyDirection,
    pub key_code: i32,
}

impl KeyEvent {
    pub fn now(direction: KeyDirection, key_code: i32) -> Self {
        let now = uptime_millis();
        Self {
            down_time_ms: now,
            event_time_ms: now,
            direction,
            key_code,
        }
    }
}

/// Milliseconds of monotonic clock since first use, uptime-style.
/// Backends put these into event timestamps; wall-clock jumps never do.
pub fn uptime_millis() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_event_stamps_down_time_equal_to_event_time() {
        let ev = PointerEvent::now(0, ACTION_DOWN, 100, 200);
        assert_eq!(ev.down_time_ms, ev.event_time_ms);
        assert_eq!(ev.meta_state, 0);
        assert_eq!((ev.x, ev.y), (100, 200));
    }

    #[test]
    fn uptime_is_monotonic() {
        let a = uptime_millis();
        let b = uptime_millis();
        assert!(b >= a);
    }
}
