//! The shape registry
//!
//! Discipline: synchronous mutation, batched publication. Callers mutate the
//! backing store directly; the render-visible map (`published`) is only ever
//! replaced wholesale, at most once per animation frame for batched updates.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

use super::entry::{ShapeEntry, ShapeId};
use super::scheduler::{FrameRequest, FrameScheduler};
use crate::geom::Bounds;

/// Ordered map of live shapes (iteration order = paint order)
pub type ShapeMap = IndexMap<ShapeId, ShapeEntry>;

/// Re-measure callback installed by a container; called with the registry
/// whenever a sibling unregisters
pub type RefreshHook = Box<dyn FnMut(&mut ShapeRegistry)>;

/// Called with the new map on every publication
pub type Subscriber = Box<dyn FnMut(&ShapeMap)>;

/// Render node backing one painted shape (target of the direct fast path)
pub trait ShapeNode {
    fn apply_transform(&self, bounds: &Bounds, scale: Option<f32>);
}

/// Registry of every live goo shape
pub struct ShapeRegistry {
    /// Authoritative backing store
    store: ShapeMap,
    /// Render-visible snapshot
    published: Rc<ShapeMap>,
    /// Coalesced updates awaiting the next frame (last write wins)
    pending: IndexMap<ShapeId, ShapeEntry>,
    frame: Option<FrameRequest>,
    scheduler: Box<dyn FrameScheduler>,
    nodes: HashMap<ShapeId, Rc<dyn ShapeNode>>,
    hooks: IndexMap<ShapeId, RefreshHook>,
    subscribers: Vec<Subscriber>,
    revision: u64,
    next_id: u64,
    route: Option<String>,
}

impl ShapeRegistry {
    pub fn new(scheduler: impl FrameScheduler + 'static) -> Self {
        Self {
            store: ShapeMap::new(),
            published: Rc::new(ShapeMap::new()),
            pending: IndexMap::new(),
            frame: None,
            scheduler: Box::new(scheduler),
            nodes: HashMap::new(),
            hooks: IndexMap::new(),
            subscribers: Vec::new(),
            revision: 0,
            next_id: 1,
            route: None,
        }
    }

    /// Allocate a fresh shape id
    pub fn allocate_id(&mut self) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register or replace a shape.
    ///
    /// A new id is committed and published immediately so the first render
    /// already has correct bounds (no flash at the origin). An existing id is
    /// queued and replaced wholesale at the next flush.
    pub fn register(&mut self, id: ShapeId, entry: ShapeEntry) {
        if !self.store.contains_key(&id) {
            self.store.insert(id, entry);
            log::debug!("registered {id} ({} live)", self.store.len());
            self.publish();
        } else {
            self.schedule(id, entry);
        }
    }

    /// Position-only fast path.
    ///
    /// Merges `bounds` into the latest known entry for `id`, writes the
    /// transform straight to its render node, and queues a batched
    /// publication. Unknown ids are ignored.
    pub fn update_bounds(&mut self, id: ShapeId, bounds: Bounds) {
        let Some(existing) = self.pending.get(&id).or_else(|| self.store.get(&id)) else {
            return;
        };
        let updated = existing.with_bounds(bounds);
        if let Some(entry) = self.store.get_mut(&id) {
            entry.bounds = bounds;
        }
        self.set_transform_direct(id, bounds);
        self.schedule(id, updated);
    }

    /// Performance escape hatch: write `bounds` to the shape's render node
    /// without touching published state. The next flush makes the render
    /// tree consistent again.
    pub fn set_transform_direct(&self, id: ShapeId, bounds: Bounds) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let scale = self.store.get(&id).and_then(|e| e.scale);
        node.apply_transform(&bounds, scale);
    }

    /// Remove a shape immediately.
    ///
    /// Cancels any queued update for `id`, publishes without it, then asks
    /// every remaining container to re-measure so layout shifts caused by
    /// the removal are picked up right away.
    pub fn unregister(&mut self, id: ShapeId) {
        self.store.shift_remove(&id);
        self.nodes.remove(&id);
        self.hooks.shift_remove(&id);
        self.pending.shift_remove(&id);

        let mut hooks = std::mem::take(&mut self.hooks);
        for (hook_id, hook) in hooks.iter_mut() {
            // A hook may unregister a sibling whose hook has not run yet
            if self.store.contains_key(hook_id) {
                hook(self);
            }
        }
        for (hook_id, hook) in hooks {
            if self.store.contains_key(&hook_id) {
                self.hooks.entry(hook_id).or_insert(hook);
            }
        }

        self.publish();

        if self.store.is_empty() {
            self.cancel_frame();
        }
    }

    /// Drop everything: pending frame, shapes, queue, nodes, hooks
    pub fn clear_all(&mut self) {
        self.cancel_frame();
        let dropped = self.store.len();
        self.store.clear();
        self.pending.clear();
        self.nodes.clear();
        self.hooks.clear();
        self.publish();
        log::debug!("cleared registry ({dropped} shapes dropped)");
    }

    /// Route collaborator entry point: clears the registry when the active
    /// route differs from the previously seen one
    pub fn route_changed(&mut self, path: &str) {
        let changed = self.route.as_deref().is_some_and(|prev| prev != path);
        if changed {
            log::info!("route changed to {path}, clearing goo shapes");
            self.clear_all();
        }
        self.route = Some(path.to_string());
    }

    /// Apply every queued update in one transition and publish once.
    /// Called by the host when the requested frame fires.
    pub fn flush(&mut self) {
        self.frame = None;
        if self.pending.is_empty() {
            return;
        }
        let updates = std::mem::take(&mut self.pending);
        let count = updates.len();
        for (id, entry) in updates {
            self.store.insert(id, entry);
        }
        self.publish();
        log::trace!("flushed {count} shape updates");
    }

    /// Attach the render node that paints `id`
    pub fn attach_node(&mut self, id: ShapeId, node: Rc<dyn ShapeNode>) {
        self.nodes.insert(id, node);
    }

    pub fn set_refresh_hook(&mut self, id: ShapeId, hook: RefreshHook) {
        self.hooks.insert(id, hook);
    }

    pub fn remove_refresh_hook(&mut self, id: ShapeId) {
        self.hooks.shift_remove(&id);
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Current render-visible map
    pub fn published(&self) -> Rc<ShapeMap> {
        Rc::clone(&self.published)
    }

    /// Number of publications so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.store.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame.is_some()
    }

    fn schedule(&mut self, id: ShapeId, entry: ShapeEntry) {
        self.pending.insert(id, entry);
        if self.frame.is_none() {
            self.frame = Some(self.scheduler.request_frame());
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(request) = self.frame.take() {
            self.scheduler.cancel_frame(request);
        }
    }

    fn publish(&mut self) {
        self.published = Rc::new(self.store.clone());
        self.revision += 1;
        let published = Rc::clone(&self.published);
        for subscriber in &mut self.subscribers {
            subscriber(&published);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::entry::{ShapeKind, ShapeStyle};
    use crate::registry::scheduler::ManualScheduler;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};

    fn rounded(x: f32, y: f32, w: f32, h: f32) -> ShapeEntry {
        ShapeEntry::rounded(Bounds::new(x, y, w, h), ShapeStyle::color("#C9D5E2"))
    }

    fn registry() -> (ShapeRegistry, Rc<RefCell<ManualScheduler>>) {
        let scheduler = Rc::new(RefCell::new(ManualScheduler::new()));
        (ShapeRegistry::new(Rc::clone(&scheduler)), scheduler)
    }

    #[derive(Default)]
    struct RecordingNode {
        writes: RefCell<Vec<(Bounds, Option<f32>)>>,
    }

    impl ShapeNode for RecordingNode {
        fn apply_transform(&self, bounds: &Bounds, scale: Option<f32>) {
            self.writes.borrow_mut().push((*bounds, scale));
        }
    }

    #[test]
    fn test_new_registration_publishes_immediately() {
        let (mut reg, scheduler) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 50.0, 50.0));

        assert_eq!(reg.published().get(&id).map(|e| e.bounds.width), Some(50.0));
        assert_eq!(reg.revision(), 1);
        assert_eq!(scheduler.borrow().requested, 0);
    }

    #[test]
    fn test_update_bounds_coalesces_into_one_flush() {
        let (mut reg, scheduler) = registry();
        let renders = Rc::new(Cell::new(0));
        let counter = Rc::clone(&renders);
        reg.subscribe(Box::new(move |_| counter.set(counter.get() + 1)));

        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 50.0, 50.0));
        renders.set(0);

        for i in 1..=10 {
            reg.update_bounds(id, Bounds::new(i as f32, 0.0, 50.0, 50.0));
        }
        assert_eq!(scheduler.borrow().requested, 1);
        assert_eq!(reg.pending_len(), 1);
        // Not yet published
        assert_eq!(reg.published()[&id].bounds.x, 0.0);

        reg.flush();
        assert_eq!(renders.get(), 1);
        assert_eq!(reg.published()[&id].bounds.x, 10.0);
        assert_eq!(reg.published().len(), 1);
    }

    #[test]
    fn test_reregistration_replaces_whole_entry() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        let a = rounded(0.0, 0.0, 50.0, 50.0).with_z_index(4).with_scale(1.5);
        reg.register(id, a);

        let b = ShapeEntry::new(Bounds::new(5.0, 5.0, 20.0, 20.0), ShapeKind::Rectangle);
        reg.register(id, b.clone());
        reg.flush();

        let published = reg.published();
        assert_eq!(published[&id], b);
        assert_eq!(published[&id].z_index, None);
        assert_eq!(published[&id].scale, None);
    }

    #[test]
    fn test_update_bounds_merges_only_bounds_into_pending_entry() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 50.0, 50.0));
        reg.register(id, rounded(0.0, 0.0, 50.0, 50.0).with_z_index(7));
        reg.update_bounds(id, Bounds::new(3.0, 4.0, 50.0, 50.0));
        reg.flush();

        let published = reg.published();
        let entry = &published[&id];
        assert_eq!(entry.z_index, Some(7));
        assert_eq!(entry.bounds, Bounds::new(3.0, 4.0, 50.0, 50.0));
    }

    #[test]
    fn test_update_bounds_unknown_id_is_noop() {
        let (mut reg, scheduler) = registry();
        reg.update_bounds(ShapeId(42), Bounds::new(1.0, 1.0, 1.0, 1.0));
        assert!(reg.is_empty());
        assert_eq!(reg.pending_len(), 0);
        assert_eq!(scheduler.borrow().requested, 0);
    }

    #[test]
    fn test_unregister_is_synchronous_and_cancels_pending() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 50.0, 50.0));
        reg.update_bounds(id, Bounds::new(9.0, 9.0, 50.0, 50.0));
        reg.unregister(id);

        assert!(!reg.published().contains_key(&id));
        reg.flush();
        assert!(!reg.published().contains_key(&id));
    }

    #[test]
    fn test_unregister_last_shape_cancels_frame() {
        let (mut reg, scheduler) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 50.0, 50.0));
        reg.update_bounds(id, Bounds::new(1.0, 0.0, 50.0, 50.0));
        assert!(reg.has_pending_frame());

        reg.unregister(id);
        assert!(!reg.has_pending_frame());
        assert_eq!(scheduler.borrow().cancelled, 1);
    }

    #[test]
    fn test_unregister_twice_or_unknown_leaves_others_alone() {
        let (mut reg, _) = registry();
        let a = reg.allocate_id();
        let b = reg.allocate_id();
        reg.register(a, rounded(0.0, 0.0, 10.0, 10.0));
        reg.register(b, rounded(20.0, 0.0, 10.0, 10.0));

        reg.unregister(a);
        reg.unregister(a);
        reg.unregister(ShapeId(999));

        let published = reg.published();
        assert_eq!(published.len(), 1);
        assert!(published.contains_key(&b));
    }

    #[test]
    fn test_unregister_invokes_sibling_refresh_hooks() {
        let (mut reg, _) = registry();
        let a = reg.allocate_id();
        let b = reg.allocate_id();
        reg.register(a, rounded(0.0, 0.0, 10.0, 10.0));
        reg.register(b, rounded(20.0, 0.0, 10.0, 10.0));

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        reg.set_refresh_hook(
            b,
            Box::new(move |reg: &mut ShapeRegistry| {
                seen.set(seen.get() + 1);
                // Sibling removal shifted layout: b moved left
                reg.register(b, rounded(0.0, 0.0, 10.0, 10.0));
            }),
        );
        let removed_calls = Rc::new(Cell::new(0));
        let removed_seen = Rc::clone(&removed_calls);
        reg.set_refresh_hook(
            a,
            Box::new(move |_: &mut ShapeRegistry| removed_seen.set(removed_seen.get() + 1)),
        );

        reg.unregister(a);
        assert_eq!(calls.get(), 1);
        assert_eq!(removed_calls.get(), 0);

        reg.flush();
        assert_eq!(reg.published()[&b].bounds.x, 0.0);

        // Hook survives for later removals
        let c = reg.allocate_id();
        reg.register(c, rounded(50.0, 0.0, 10.0, 10.0));
        reg.unregister(c);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_hook_removing_sibling_drops_sibling_hook() {
        let (mut reg, _) = registry();
        let a = reg.allocate_id();
        let b = reg.allocate_id();
        let c = reg.allocate_id();
        reg.register(a, rounded(0.0, 0.0, 10.0, 10.0));
        reg.register(b, rounded(20.0, 0.0, 10.0, 10.0));
        reg.register(c, rounded(40.0, 0.0, 10.0, 10.0));

        // b's refresh takes c down with it
        reg.set_refresh_hook(b, Box::new(move |reg: &mut ShapeRegistry| reg.unregister(c)));
        let c_calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&c_calls);
        reg.set_refresh_hook(c, Box::new(move |_: &mut ShapeRegistry| seen.set(seen.get() + 1)));

        reg.unregister(a);
        assert!(!reg.contains(c));
        assert_eq!(c_calls.get(), 0);

        // c's hook is gone for good
        let d = reg.allocate_id();
        reg.register(d, rounded(60.0, 0.0, 10.0, 10.0));
        reg.unregister(d);
        assert_eq!(c_calls.get(), 0);
        assert_eq!(reg.published().len(), 1);
    }

    #[test]
    fn test_route_change_clears_everything() {
        let (mut reg, scheduler) = registry();
        reg.route_changed("/");
        let a = reg.allocate_id();
        reg.register(a, rounded(0.0, 0.0, 10.0, 10.0));
        reg.update_bounds(a, Bounds::new(5.0, 0.0, 10.0, 10.0));

        reg.route_changed("/");
        assert_eq!(reg.published().len(), 1);

        reg.route_changed("/insights");
        assert!(reg.published().is_empty());
        assert!(!reg.has_pending_frame());
        assert_eq!(scheduler.borrow().cancelled, 1);

        reg.flush();
        assert!(reg.published().is_empty());
    }

    #[test]
    fn test_first_route_does_not_clear() {
        let (mut reg, _) = registry();
        let a = reg.allocate_id();
        reg.register(a, rounded(0.0, 0.0, 10.0, 10.0));
        reg.route_changed("/cv");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_direct_transform_reaches_node() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 10.0, 10.0).with_scale(1.5));
        let node = Rc::new(RecordingNode::default());
        reg.attach_node(id, node.clone());

        reg.update_bounds(id, Bounds::new(7.0, 8.0, 10.0, 10.0));
        let writes = node.writes.borrow();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], (Bounds::new(7.0, 8.0, 10.0, 10.0), Some(1.5)));
        // Render-visible state still waits for the flush
        assert_eq!(reg.published()[&id].bounds.x, 0.0);
    }

    #[test]
    fn test_direct_path_carries_size_changes() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 10.0, 10.0));
        let node = Rc::new(RecordingNode::default());
        reg.attach_node(id, node.clone());

        reg.update_bounds(id, Bounds::new(0.0, 0.0, 24.0, 16.0));
        let (bounds, _) = node.writes.borrow()[0];
        assert_eq!((bounds.width, bounds.height), (24.0, 16.0));
    }

    #[test]
    fn test_flush_without_pending_does_not_publish() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 10.0, 10.0));
        let before = reg.revision();
        reg.flush();
        assert_eq!(reg.revision(), before);
    }

    #[test]
    fn test_published_snapshot_is_not_patched() {
        let (mut reg, _) = registry();
        let id = reg.allocate_id();
        reg.register(id, rounded(0.0, 0.0, 10.0, 10.0));
        let snapshot = reg.published();
        reg.update_bounds(id, Bounds::new(30.0, 0.0, 10.0, 10.0));
        reg.flush();
        assert_eq!(snapshot[&id].bounds.x, 0.0);
        assert_eq!(reg.published()[&id].bounds.x, 30.0);
    }

    proptest! {
        #[test]
        fn prop_last_write_wins(xs in proptest::collection::vec(-500.0f32..500.0, 1..40)) {
            let (mut reg, scheduler) = registry();
            let id = reg.allocate_id();
            reg.register(id, rounded(0.0, 0.0, 10.0, 10.0));
            let before = reg.revision();
            for x in &xs {
                reg.update_bounds(id, Bounds::new(*x, 1.0, 10.0, 10.0));
            }
            reg.flush();
            prop_assert_eq!(reg.revision(), before + 1);
            prop_assert_eq!(scheduler.borrow().requested, 1);
            prop_assert_eq!(reg.published()[&id].bounds.x, *xs.last().unwrap());
        }
    }
}
