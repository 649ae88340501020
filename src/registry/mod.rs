//! Shape registry
//!
//! Every goo container (and the cursor) registers one `ShapeEntry` here.
//! Bounds updates are coalesced per animation frame; removals are immediate.

pub mod entry;
pub mod scheduler;
pub mod store;

pub use entry::{ShapeEntry, ShapeId, ShapeKind, ShapeStyle};
pub use scheduler::{FrameRequest, FrameScheduler, ManualScheduler};
pub use store::{RefreshHook, ShapeMap, ShapeNode, ShapeRegistry, Subscriber};
