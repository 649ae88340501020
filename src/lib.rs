//! Goo Merge - liquid-merge overlay and decorative physics for the web
//!
//! Core modules:
//! - `registry`: Shape registry with frame-batched publication
//! - `reporter`: Per-container bounds tracking
//! - `layer`: Composite layer (one primitive per registered shape)
//! - `filter`: Blur + threshold filter definitions
//! - `cursor`: Cursor overlay that joins the merge
//! - `sim`: Spring/repulsion cluster and rigid-body pill board
//! - `platform`: Capability detection
//! - `presets`: Seeded cluster layouts and the pill catalogue
//! - `settings`: Tunables persisted to LocalStorage
//! - `web`: DOM glue (wasm32 only)

pub mod cursor;
pub mod filter;
pub mod geom;
pub mod layer;
pub mod platform;
pub mod presets;
pub mod registry;
pub mod reporter;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use filter::GooFilter;
pub use geom::Bounds;
pub use layer::{CompositeLayer, LayerFrame, RenderedShape};
pub use platform::Capabilities;
pub use registry::{ShapeEntry, ShapeId, ShapeKind, ShapeRegistry, ShapeStyle};
pub use settings::Settings;

/// Shared tuning constants
pub mod consts {
    /// Viewport width below which the mobile filter radius is used
    pub const MOBILE_BREAKPOINT: f32 = 768.0;

    /// Container layer blur (desktop / mobile) and trailing softening blur
    pub const CONTAINER_BLUR_DESKTOP: f32 = 50.0;
    pub const CONTAINER_BLUR_MOBILE: f32 = 40.0;
    pub const CONTAINER_EXTRA_BLUR: f32 = 12.0;

    /// Default corner radius for `Rounded` shapes (tailwind rounded-3xl)
    pub const DEFAULT_CORNER_RADIUS: &str = "1.5rem";
    /// Fully rounded corners (tailwind rounded-full)
    pub const FULL_CORNER_RADIUS: &str = "9999px";

    /// Cluster integration step clamp (seconds)
    pub const CLUSTER_MAX_DT: f32 = 0.032;
    /// Frame-rate normalization for cluster position integration
    pub const CLUSTER_FPS_NORM: f32 = 60.0;

    /// Pill board fixed timestep (ms) and frame clamp
    pub const PILL_STEP_MS: f32 = 1000.0 / 60.0;
    pub const PILL_MAX_FRAME_MS: f32 = 50.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Map `value` from `[in_min, in_max]` into `[0, 1]`, clamped
#[inline]
pub fn unit_progress(value: f32, in_min: f32, in_max: f32) -> f32 {
    let span = in_max - in_min;
    if span.abs() <= f32::EPSILON {
        return 0.5;
    }
    ((value - in_min) / span).clamp(0.0, 1.0)
}
