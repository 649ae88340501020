//! Bounds reporter
//!
//! Keeps the registry's view of one container's viewport rectangle accurate
//! under four change sources: initial mount, size changes, ancestor scroll,
//! and repositioning by animations the reporter cannot see. The last one is
//! handled by polling every frame for the reporter's whole lifetime; the
//! loop never auto-stops.

use std::rc::Rc;

use crate::consts::CONTAINER_EXTRA_BLUR;
use crate::geom::Bounds;
use crate::platform::Capabilities;
use crate::registry::{ShapeEntry, ShapeId, ShapeRegistry};

/// Something that can report its viewport rectangle
pub trait Measure {
    /// `None` while the target is not attached yet
    fn measure(&self) -> Option<Bounds>;
}

/// Polling loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// Unmounted, no frame loop
    Idle,
    /// Mounted, frame loop running
    Tracking,
}

/// How the container gets its goo background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterMode {
    /// Shape painted by the shared composite layer
    Registered,
    /// No DOM filter support: a locally blurred duplicate under the content
    LocalBlur,
}

/// Tracks one container and reports it to the registry
pub struct BoundsReporter<M: Measure + 'static> {
    id: ShapeId,
    target: Rc<M>,
    template: ShapeEntry,
    mode: ReporterMode,
    state: ReporterState,
    last: Option<Bounds>,
}

impl<M: Measure + 'static> BoundsReporter<M> {
    /// `template` supplies kind and style; its bounds are replaced by measurements
    pub fn new(id: ShapeId, target: Rc<M>, template: ShapeEntry, caps: &Capabilities) -> Self {
        let mode = if caps.dom_filters {
            ReporterMode::Registered
        } else {
            ReporterMode::LocalBlur
        };
        Self {
            id,
            target,
            template,
            mode,
            state: ReporterState::Idle,
            last: None,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn state(&self) -> ReporterState {
        self.state
    }

    pub fn mode(&self) -> ReporterMode {
        self.mode
    }

    /// Register with full style and start tracking.
    ///
    /// Returns whether a frame loop should run (never in `LocalBlur` mode).
    pub fn mount(&mut self, registry: &mut ShapeRegistry) -> bool {
        if self.mode == ReporterMode::LocalBlur {
            return false;
        }
        self.last = None;
        self.register_full(registry);
        self.install_hook(registry);
        self.state = ReporterState::Tracking;
        true
    }

    /// Per-frame check. Commits through the fast path only when the rect
    /// changed since the last commit, and unregisters as soon as the target
    /// stops measuring. Returns whether the registry changed.
    pub fn poll(&mut self, registry: &mut ShapeRegistry) -> bool {
        if self.state != ReporterState::Tracking {
            return false;
        }
        let Some(bounds) = self.target.measure() else {
            // Target left the document: drop the shape, keep watching in
            // case it is re-attached
            if registry.contains(self.id) {
                registry.remove_refresh_hook(self.id);
                registry.unregister(self.id);
                self.last = None;
                return true;
            }
            return false;
        };
        if !registry.contains(self.id) {
            // First measurable frame, or the registry was cleared under us
            registry.register(self.id, self.template.with_bounds(bounds));
            self.install_hook(registry);
            self.last = Some(bounds);
            return true;
        }
        if self.last == Some(bounds) {
            return false;
        }
        registry.update_bounds(self.id, bounds);
        self.last = Some(bounds);
        true
    }

    /// Size change: full re-registration (batched, the id already exists)
    pub fn on_resize(&mut self, registry: &mut ShapeRegistry) {
        if self.state != ReporterState::Tracking {
            return;
        }
        if let Some(bounds) = self.target.measure() {
            registry.register(self.id, self.template.with_bounds(bounds));
            self.last = Some(bounds);
        }
    }

    /// Ancestor scroll: position-only fast path
    pub fn on_scroll(&mut self, registry: &mut ShapeRegistry) {
        if self.state != ReporterState::Tracking {
            return;
        }
        if let Some(bounds) = self.target.measure() {
            registry.update_bounds(self.id, bounds);
            self.last = Some(bounds);
        }
    }

    /// Style change: swap the template and re-register
    pub fn set_template(&mut self, registry: &mut ShapeRegistry, template: ShapeEntry) {
        self.template = template;
        if self.state == ReporterState::Tracking {
            self.register_full(registry);
            self.install_hook(registry);
        }
    }

    /// Stop tracking and remove the shape
    pub fn unmount(&mut self, registry: &mut ShapeRegistry) {
        if self.state == ReporterState::Idle {
            return;
        }
        // Drop our own hook first so the removal does not call back into us
        registry.remove_refresh_hook(self.id);
        registry.unregister(self.id);
        self.state = ReporterState::Idle;
        self.last = None;
    }

    /// Inline style for the blurred duplicate drawn in `LocalBlur` mode
    pub fn local_backdrop_css(&self) -> Option<String> {
        if self.mode != ReporterMode::LocalBlur {
            return None;
        }
        let style = &self.template.style;
        let mut css = vec![
            "position: absolute".to_string(),
            "inset: 0".to_string(),
            "z-index: -1".to_string(),
            "pointer-events: none".to_string(),
            format!("filter: blur({CONTAINER_EXTRA_BLUR}px)"),
        ];
        if let Some(radius) = self.template.effective_corner_radius() {
            css.push(format!("border-radius: {radius}"));
        }
        if let Some(color) = &style.background_color {
            css.push(format!("background-color: {color}"));
        }
        if let Some(image) = &style.background_image {
            css.push(format!("background-image: {image}"));
        }
        for (prop, value) in &style.extra {
            css.push(format!("{prop}: {value}"));
        }
        Some(css.join("; ") + ";")
    }

    fn register_full(&mut self, registry: &mut ShapeRegistry) {
        if let Some(bounds) = self.target.measure() {
            registry.register(self.id, self.template.with_bounds(bounds));
            self.last = Some(bounds);
        }
    }

    fn install_hook(&self, registry: &mut ShapeRegistry) {
        let id = self.id;
        let target = Rc::clone(&self.target);
        let template = self.template.clone();
        registry.set_refresh_hook(
            id,
            Box::new(move |registry: &mut ShapeRegistry| {
                if let Some(bounds) = target.measure() {
                    registry.register(id, template.with_bounds(bounds));
                }
            }),
        );
    }
}

/// Whether an ancestor with these computed values scrolls its content
pub fn is_scroll_container(
    overflow: &str,
    overflow_y: &str,
    scroll_height: i32,
    client_height: i32,
) -> bool {
    let scrolls = |v: &str| v == "auto" || v == "scroll";
    (scrolls(overflow) || scrolls(overflow_y)) && scroll_height > client_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ManualScheduler, ShapeStyle};
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeTarget {
        rect: Cell<Option<Bounds>>,
        reads: Cell<u32>,
    }

    impl FakeTarget {
        fn at(bounds: Bounds) -> Rc<Self> {
            let target = Rc::new(Self::default());
            target.rect.set(Some(bounds));
            target
        }
    }

    impl Measure for FakeTarget {
        fn measure(&self) -> Option<Bounds> {
            self.reads.set(self.reads.get() + 1);
            self.rect.get()
        }
    }

    fn template() -> ShapeEntry {
        ShapeEntry::rounded(Bounds::default(), ShapeStyle::color("#E6DFD7"))
    }

    fn setup(bounds: Bounds) -> (ShapeRegistry, Rc<FakeTarget>, BoundsReporter<FakeTarget>) {
        let mut registry = ShapeRegistry::new(ManualScheduler::new());
        let target = FakeTarget::at(bounds);
        let id = registry.allocate_id();
        let reporter = BoundsReporter::new(id, Rc::clone(&target), template(), &Capabilities::default());
        (registry, target, reporter)
    }

    #[test]
    fn test_mount_registers_immediately_and_tracks() {
        let (mut reg, _target, mut reporter) = setup(Bounds::new(10.0, 20.0, 100.0, 50.0));
        assert_eq!(reporter.state(), ReporterState::Idle);
        assert!(reporter.mount(&mut reg));
        assert_eq!(reporter.state(), ReporterState::Tracking);
        assert_eq!(reg.published()[&reporter.id()].bounds, Bounds::new(10.0, 20.0, 100.0, 50.0));
    }

    #[test]
    fn test_poll_commits_only_on_change() {
        let (mut reg, target, mut reporter) = setup(Bounds::new(0.0, 0.0, 100.0, 50.0));
        reporter.mount(&mut reg);

        assert!(!reporter.poll(&mut reg));
        assert!(!reporter.poll(&mut reg));
        assert_eq!(reg.pending_len(), 0);

        target.rect.set(Some(Bounds::new(5.0, 0.0, 100.0, 50.0)));
        assert!(reporter.poll(&mut reg));
        assert!(!reporter.poll(&mut reg));
        reg.flush();
        assert_eq!(reg.published()[&reporter.id()].bounds.x, 5.0);
    }

    #[test]
    fn test_poll_keeps_tracking_without_measurement() {
        let (mut reg, target, mut reporter) = setup(Bounds::new(0.0, 0.0, 10.0, 10.0));
        target.rect.set(None);
        reporter.mount(&mut reg);
        assert!(reg.is_empty());
        assert!(!reporter.poll(&mut reg));
        assert_eq!(reporter.state(), ReporterState::Tracking);

        // Target attaches later: first measurable frame registers
        target.rect.set(Some(Bounds::new(1.0, 1.0, 10.0, 10.0)));
        assert!(reporter.poll(&mut reg));
        assert!(reg.published().contains_key(&reporter.id()));
    }

    #[test]
    fn test_detached_target_is_unregistered() {
        let (mut reg, target, mut reporter) = setup(Bounds::new(0.0, 0.0, 10.0, 10.0));
        reporter.mount(&mut reg);
        target.rect.set(Some(Bounds::new(4.0, 0.0, 10.0, 10.0)));
        reporter.poll(&mut reg);
        assert_eq!(reg.pending_len(), 1);

        target.rect.set(None);
        assert!(reporter.poll(&mut reg));
        assert!(!reg.published().contains_key(&reporter.id()));
        assert_eq!(reg.pending_len(), 0);
        assert!(!reporter.poll(&mut reg));

        // Re-attached elsewhere: registered again at the new rect
        target.rect.set(Some(Bounds::new(0.0, 80.0, 10.0, 10.0)));
        assert!(reporter.poll(&mut reg));
        assert_eq!(reg.published()[&reporter.id()].bounds.y, 80.0);
    }

    #[test]
    fn test_poll_reregisters_after_route_clear() {
        let (mut reg, _target, mut reporter) = setup(Bounds::new(0.0, 0.0, 10.0, 10.0));
        reg.route_changed("/");
        reporter.mount(&mut reg);
        reg.route_changed("/cv");
        assert!(reg.published().is_empty());

        assert!(reporter.poll(&mut reg));
        assert_eq!(reg.published().len(), 1);
    }

    #[test]
    fn test_resize_is_full_batched_registration() {
        let (mut reg, target, mut reporter) = setup(Bounds::new(0.0, 0.0, 10.0, 10.0));
        reporter.mount(&mut reg);
        target.rect.set(Some(Bounds::new(0.0, 0.0, 40.0, 10.0)));
        reporter.on_resize(&mut reg);
        assert_eq!(reg.published()[&reporter.id()].bounds.width, 10.0);
        reg.flush();
        assert_eq!(reg.published()[&reporter.id()].bounds.width, 40.0);
        // Poll sees no change after the resize commit
        assert!(!reporter.poll(&mut reg));
    }

    #[test]
    fn test_template_change_restyles_and_keeps_bounds() {
        let (mut reg, _target, mut reporter) = setup(Bounds::new(0.0, 0.0, 10.0, 10.0));
        reporter.mount(&mut reg);
        reporter.set_template(&mut reg, ShapeEntry::rounded(Bounds::default(), ShapeStyle::color("#A8BED1")));
        reg.flush();
        let published = reg.published();
        let entry = &published[&reporter.id()];
        assert_eq!(entry.style.background_color.as_deref(), Some("#A8BED1"));
        assert_eq!(entry.bounds, Bounds::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_scroll_uses_fast_path() {
        let (mut reg, target, mut reporter) = setup(Bounds::new(0.0, 100.0, 10.0, 10.0));
        reporter.mount(&mut reg);
        target.rect.set(Some(Bounds::new(0.0, 40.0, 10.0, 10.0)));
        reporter.on_scroll(&mut reg);
        assert_eq!(reg.pending_len(), 1);
        reg.flush();
        assert_eq!(reg.published()[&reporter.id()].bounds.y, 40.0);
    }

    #[test]
    fn test_unmount_removes_and_refreshes_siblings() {
        let mut reg = ShapeRegistry::new(ManualScheduler::new());
        let left = FakeTarget::at(Bounds::new(0.0, 0.0, 10.0, 10.0));
        let right = FakeTarget::at(Bounds::new(20.0, 0.0, 10.0, 10.0));
        let caps = Capabilities::default();
        let left_id = reg.allocate_id();
        let right_id = reg.allocate_id();
        let mut a = BoundsReporter::new(left_id, Rc::clone(&left), template(), &caps);
        let mut b = BoundsReporter::new(right_id, Rc::clone(&right), template(), &caps);
        a.mount(&mut reg);
        b.mount(&mut reg);

        // Removing the left card shifts the right one into its place
        right.rect.set(Some(Bounds::new(0.0, 0.0, 10.0, 10.0)));
        let reads_before = left.reads.get();
        a.unmount(&mut reg);
        assert_eq!(a.state(), ReporterState::Idle);
        assert_eq!(left.reads.get(), reads_before);
        assert!(!reg.published().contains_key(&left_id));

        reg.flush();
        assert_eq!(reg.published()[&right_id].bounds.x, 0.0);
    }

    #[test]
    fn test_local_blur_fallback_never_registers() {
        let mut reg = ShapeRegistry::new(ManualScheduler::new());
        let target = FakeTarget::at(Bounds::new(0.0, 0.0, 10.0, 10.0));
        let caps = Capabilities::from_user_agent("Version/17.4 Safari/605.1.15");
        let id = reg.allocate_id();
        let template = ShapeEntry::rounded(
            Bounds::default(),
            ShapeStyle::color("#C2D0C1").with_corner_radius("0.375rem"),
        );
        let mut reporter = BoundsReporter::new(id, target, template, &caps);

        assert_eq!(reporter.mode(), ReporterMode::LocalBlur);
        assert!(!reporter.mount(&mut reg));
        assert!(!reporter.poll(&mut reg));
        assert!(reg.is_empty());

        let css = reporter.local_backdrop_css().unwrap();
        assert!(css.contains("filter: blur(12px)"));
        assert!(css.contains("border-radius: 0.375rem"));
        assert!(css.contains("background-color: #C2D0C1"));
    }

    #[test]
    fn test_scroll_container_predicate() {
        assert!(is_scroll_container("auto", "visible", 800, 400));
        assert!(is_scroll_container("visible", "scroll", 800, 400));
        assert!(!is_scroll_container("auto", "auto", 400, 400));
        assert!(!is_scroll_container("hidden", "visible", 800, 400));
    }
}
