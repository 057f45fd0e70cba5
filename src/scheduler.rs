//! Coalescing of render requests into display refresh ticks.
//!
//! The scheduler is a single pending slot. The first request after a frame
//! arms the slot and asks the platform for a refresh callback; further
//! requests before that callback only find the slot already armed. When the
//! callback fires, the slot is disarmed and exactly one frame is drawn from
//! whatever config and image are current at that moment.

use std::fmt;

/// Platform "call me on the next refresh" registration, e.g.
/// `winit::window::Window::request_redraw`.
type RefreshHook = Box<dyn FnMut()>;

/// Single-slot frame request tracker.
#[derive(Default)]
pub struct FrameScheduler {
    pending: bool,
    hook: Option<RefreshHook>,
}

impl FrameScheduler {
    /// A scheduler with nothing pending and no platform hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the platform registration called when a frame gets scheduled.
    pub fn set_refresh_hook(&mut self, hook: impl FnMut() + 'static) {
        self.hook = Some(Box::new(hook));
    }

    /// Ask for a frame on the next refresh.
    ///
    /// Returns `true` if this call armed the slot, `false` if a frame was
    /// already pending and the request collapsed into it.
    pub fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        if let Some(hook) = self.hook.as_mut() {
            hook();
        }
        true
    }

    /// Whether a frame is waiting for the next refresh.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Disarm the slot, returning whether a frame was pending.
    ///
    /// Call from the refresh callback; render only when this returns `true`.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending)
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}
