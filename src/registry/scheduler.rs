//! Animation-frame scheduling seam
//!
//! The registry never calls `requestAnimationFrame` itself. It asks a
//! `FrameScheduler` for one frame and expects `ShapeRegistry::flush` to be
//! called when that frame fires.

/// Handle to a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u32);

/// Source of animation-frame callbacks for the registry's flush
pub trait FrameScheduler {
    /// Request one frame; the host calls `flush` when it fires
    fn request_frame(&mut self) -> FrameRequest;
    /// Cancel a request that has not fired yet
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Scheduler driven by hand (tests, headless runs)
///
/// Records requests and cancellations; the caller decides when a frame
/// "fires" by calling `ShapeRegistry::flush`.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next: u32,
    pub requested: u32,
    pub cancelled: u32,
    pub outstanding: Option<FrameRequest>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.next += 1;
        self.requested += 1;
        let request = FrameRequest(self.next);
        self.outstanding = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.cancelled += 1;
        if self.outstanding == Some(request) {
            self.outstanding = None;
        }
    }
}

/// Shared handle so tests can inspect a scheduler owned by the registry
impl<S: FrameScheduler> FrameScheduler for std::rc::Rc<std::cell::RefCell<S>> {
    fn request_frame(&mut self) -> FrameRequest {
        self.borrow_mut().request_frame()
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.borrow_mut().cancel_frame(request)
    }
}
