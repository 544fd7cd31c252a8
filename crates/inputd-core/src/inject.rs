//! Synthetic touch/key injection through the resolved capability.
//!
//! Both operations are pure side effects: nothing is retained between calls
//! beyond the shared capability handle, and errors never cross the handler
//! boundary. Without a resolved capability both deterministically report
//! false after one lazy resolution attempt.

use std::sync::Arc;

use inputd_platform::event::{KeyDirection, KeyEvent, PointerEvent};
use tracing::warn;

use crate::capability::CapabilityResolver;

pub struct InputInjector {
    resolver: Arc<CapabilityResolver>,
}

impl InputInjector {
    pub fn new(resolver: Arc<CapabilityResolver>) -> Self {
        Self { resolver }
    }

    /// Inject one pointer event, fire-and-forget.
    pub fn inject_touch(&self, display_id: i32, action: i32, x: i32, y: i32) -> bool {
        let Some(sink) = self.resolver.handle() else {
            return false;
        };
        let event = PointerEvent::now(display_id, action, x, y);
        match sink.inject_pointer(&event) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("touch injection failed: {:#}", e);
                false
            }
        }
    }

    /// Inject a key press as DOWN then UP with no delay between; the result
    /// is the AND of both sub-events. UP is attempted even when DOWN fails
    /// so a half-delivered press cannot leave a key latched.
    pub fn inject_key(&self, key_code: i32) -> bool {
        let Some(sink) = self.resolver.handle() else {
            return false;
        };
        let down_ok = match sink.inject_key(&KeyEvent::now(KeyDirection::Down, key_code)) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("key down injection failed: {:#}", e);
                false
            }
        };
        let up_ok = match sink.inject_key(&KeyEvent::now(KeyDirection::Up, key_code)) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("key up injection failed: {:#}", e);
                false
            }
        };
        down_ok && up_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use inputd_platform::capability::{BackendCandidate, CallShape, EventSink};
    use inputd_platform::event::ACTION_DOWN;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        log: Mutex<Vec<String>>,
    }

    impl EventSink for RecordingSink {
        fn shape(&self) -> CallShape {
            CallShape::DevSetup
        }
        fn inject_pointer(&self, ev: &PointerEvent) -> Result<bool> {
            self.log
                .lock()
                .unwrap()
                .push(format!("pointer {} {},{}", ev.action, ev.x, ev.y));
            Ok(true)
        }
        fn inject_key(&self, ev: &KeyEvent) -> Result<bool> {
            let dir = match ev.direction {
                KeyDirection::Down => "down",
                KeyDirection::Up => "up",
            };
            self.log
                .lock()
                .unwrap()
                .push(format!("key {} {}", dir, ev.key_code));
            Ok(true)
        }
    }

    fn injector_with_sink(sink: Arc<RecordingSink>) -> InputInjector {
        let resolver = CapabilityResolver::new(vec![BackendCandidate {
            shape: CallShape::DevSetup,
            probe: Box::new(move || Ok(sink.clone() as Arc<dyn EventSink>)),
        }]);
        InputInjector::new(Arc::new(resolver))
    }

    #[test]
    fn touch_reaches_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let injector = injector_with_sink(sink.clone());
        assert!(injector.inject_touch(0, ACTION_DOWN, 100, 200));
        assert_eq!(
            *sink.log.lock().unwrap(),
            vec!["pointer 0 100,200".to_string()]
        );
    }

    #[test]
    fn key_press_is_down_then_up() {
        let sink = Arc::new(RecordingSink::default());
        let injector = injector_with_sink(sink.clone());
        assert!(injector.inject_key(66));
        assert_eq!(
            *sink.log.lock().unwrap(),
            vec!["key down 66".to_string(), "key up 66".to_string()]
        );
    }

    #[test]
    fn unresolved_capability_reports_false() {
        let injector = InputInjector::new(Arc::new(CapabilityResolver::unavailable()));
        assert!(!injector.inject_touch(0, ACTION_DOWN, 1, 1));
        assert!(!injector.inject_key(4));
    }
}
