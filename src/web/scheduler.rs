//! `requestAnimationFrame`-backed frame scheduler for the registry flush

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo::render::{AnimationFrame, request_animation_frame};

use crate::registry::{FrameRequest, FrameScheduler, ShapeRegistry};

type Slot = Rc<RefCell<Option<(FrameRequest, AnimationFrame)>>>;

/// Flushes the registry on the next animation frame.
///
/// Holds the registry weakly: the registry owns its scheduler.
pub struct RafScheduler {
    registry: Weak<RefCell<ShapeRegistry>>,
    slot: Slot,
    next: u32,
}

impl RafScheduler {
    pub fn new(registry: Weak<RefCell<ShapeRegistry>>) -> Self {
        Self {
            registry,
            slot: Rc::new(RefCell::new(None)),
            next: 0,
        }
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.next = self.next.wrapping_add(1);
        let request = FrameRequest(self.next);
        arm(self.registry.clone(), Rc::clone(&self.slot), request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref().is_some_and(|(pending, _)| *pending == request) {
            // Dropping the handle cancels the frame
            slot.take();
        }
    }
}

fn arm(registry: Weak<RefCell<ShapeRegistry>>, slot: Slot, request: FrameRequest) {
    let retry_registry = registry.clone();
    let retry_slot = Rc::clone(&slot);
    let handle = request_animation_frame(move |_| {
        retry_slot.borrow_mut().take();
        let Some(shared) = retry_registry.upgrade() else {
            return;
        };
        let Ok(mut registry) = shared.try_borrow_mut() else {
            log::warn!("registry busy at frame time, retrying flush next frame");
            arm(retry_registry, retry_slot, request);
            return;
        };
        registry.flush();
    });
    *slot.borrow_mut() = Some((request, handle));
}
