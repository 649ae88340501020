//! Cursor overlay
//!
//! Feeds a synthetic shape into the registry so the cursor dot fuses with
//! nearby goo shapes. Two shapes: a small circle following the pointer, and
//! an inverted highlight covering whatever interactive target is hovered.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::FULL_CORNER_RADIUS;
use crate::geom::Bounds;
use crate::registry::{ShapeEntry, ShapeId, ShapeRegistry, ShapeStyle};
use crate::unit_progress;

/// A hovered target rectangle with precomputed edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_x: f32,
    pub mid_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub mid_y: f32,
    pub max_y: f32,
}

impl CursorRect {
    pub fn from_bounds(b: Bounds) -> Self {
        Self {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
            min_x: b.x,
            mid_x: b.x + b.width / 2.0,
            max_x: b.x + b.width,
            min_y: b.y,
            mid_y: b.y + b.height / 2.0,
            max_y: b.y + b.height,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// Look of the cursor shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorStyle {
    /// Diameter of the default dot
    pub dot_size: f32,
    pub color: String,
    pub hover_corner_radius: String,
    pub z_index: i32,
    /// Scale while a button is held
    pub pressed_scale: f32,
}

impl Default for CursorStyle {
    fn default() -> Self {
        Self {
            dot_size: 80.0,
            // Yves Klein blue
            color: "#002FA7".to_string(),
            hover_corner_radius: "8px".to_string(),
            z_index: 10,
            pressed_scale: 0.85,
        }
    }
}

/// Cursor participant in the goo merge
#[derive(Debug, Clone)]
pub struct CursorOverlay {
    id: ShapeId,
    style: CursorStyle,
    pointer: Option<Vec2>,
    hovered: Option<CursorRect>,
    pressed: bool,
    last: Option<Bounds>,
}

impl CursorOverlay {
    pub fn new(id: ShapeId, style: CursorStyle) -> Self {
        Self {
            id,
            style,
            pointer: None,
            hovered: None,
            pressed: false,
            last: None,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// True once a real pointer position has been seen
    pub fn has_measured(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn hovered(&self) -> Option<&CursorRect> {
        self.hovered.as_ref()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Button state; a pressed cursor shrinks around its transform origin,
    /// sampled when the state changes
    pub fn set_pressed(&mut self, registry: &mut ShapeRegistry, pressed: bool) {
        if self.pressed == pressed {
            return;
        }
        self.pressed = pressed;
        self.register(registry);
    }

    /// Raw pointer sample (viewport coordinates).
    ///
    /// Nothing is registered until the first sample away from the origin,
    /// so the overlay never flashes in the top-left corner.
    pub fn pointer_moved(&mut self, registry: &mut ShapeRegistry, x: f32, y: f32) {
        if self.pointer.is_none() && x == 0.0 && y == 0.0 {
            return;
        }
        let first = self.pointer.is_none();
        self.pointer = Some(Vec2::new(x, y));
        if first {
            self.register(registry);
            return;
        }
        let Some(bounds) = self.bounds() else {
            return;
        };
        if self.last != Some(bounds) {
            registry.update_bounds(self.id, bounds);
            self.last = Some(bounds);
        }
    }

    /// Hover target set or cleared by an interactive element
    pub fn set_hovered(&mut self, registry: &mut ShapeRegistry, hovered: Option<CursorRect>) {
        if self.hovered == hovered {
            return;
        }
        self.hovered = hovered;
        self.register(registry);
    }

    /// The registry was cleared for a new page; put the cursor back
    pub fn route_changed(&mut self, registry: &mut ShapeRegistry) {
        self.register(registry);
    }

    pub fn unmount(&mut self, registry: &mut ShapeRegistry) {
        registry.unregister(self.id);
        self.last = None;
    }

    /// Current shape rectangle, `None` before the first pointer sample
    pub fn bounds(&self) -> Option<Bounds> {
        let pointer = self.pointer?;
        Some(match &self.hovered {
            Some(rect) => rect.bounds(),
            None => Bounds::from_center(pointer, Vec2::splat(self.style.dot_size)),
        })
    }

    /// Full registry entry for the current state
    pub fn entry(&self) -> Option<ShapeEntry> {
        let bounds = self.bounds()?;
        let radius = if self.hovered.is_some() {
            self.style.hover_corner_radius.clone()
        } else {
            FULL_CORNER_RADIUS.to_string()
        };
        let origin = self.transform_origin() * 100.0;
        let style = ShapeStyle::color(self.style.color.clone())
            .with_corner_radius(radius)
            .with_extra("backdrop-filter", "invert(1)")
            .with_extra("-webkit-backdrop-filter", "invert(1)")
            .with_extra("transform-origin", format!("{}% {}%", origin.x, origin.y));
        let entry = ShapeEntry::rounded(bounds, style).with_z_index(self.style.z_index);
        Some(if self.pressed {
            entry.with_scale(self.style.pressed_scale)
        } else {
            entry
        })
    }

    /// Pointer position inside the hovered rect, mapped to `[0, 1]`
    /// (centre when nothing is hovered)
    pub fn transform_origin(&self) -> Vec2 {
        match (self.pointer, &self.hovered) {
            (Some(p), Some(rect)) => Vec2::new(
                unit_progress(p.x, rect.min_x, rect.max_x),
                unit_progress(p.y, rect.min_y, rect.max_y),
            ),
            _ => Vec2::splat(0.5),
        }
    }

    fn register(&mut self, registry: &mut ShapeRegistry) {
        if let Some(entry) = self.entry() {
            self.last = Some(entry.bounds);
            registry.register(self.id, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::render_shape;
    use crate::registry::ManualScheduler;

    fn setup() -> (ShapeRegistry, CursorOverlay) {
        let mut registry = ShapeRegistry::new(ManualScheduler::new());
        let id = registry.allocate_id();
        (registry, CursorOverlay::new(id, CursorStyle::default()))
    }

    #[test]
    fn test_not_registered_before_first_move() {
        let (mut reg, mut cursor) = setup();
        cursor.pointer_moved(&mut reg, 0.0, 0.0);
        assert!(!cursor.has_measured());
        assert!(reg.is_empty());

        cursor.set_hovered(&mut reg, Some(CursorRect::from_bounds(Bounds::new(0.0, 0.0, 10.0, 10.0))));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_first_move_registers_dot_immediately() {
        let (mut reg, mut cursor) = setup();
        cursor.pointer_moved(&mut reg, 200.0, 100.0);
        let published = reg.published();
        let entry = &published[&cursor.id()];
        assert_eq!(entry.bounds, Bounds::new(160.0, 60.0, 80.0, 80.0));
        assert_eq!(entry.style.corner_radius.as_deref(), Some(FULL_CORNER_RADIUS));
        assert_eq!(entry.z_index, Some(10));
    }

    #[test]
    fn test_moves_use_fast_path() {
        let (mut reg, mut cursor) = setup();
        cursor.pointer_moved(&mut reg, 200.0, 100.0);
        cursor.pointer_moved(&mut reg, 210.0, 100.0);
        cursor.pointer_moved(&mut reg, 220.0, 100.0);
        assert_eq!(reg.pending_len(), 1);
        reg.flush();
        assert_eq!(reg.published()[&cursor.id()].bounds.x, 180.0);
    }

    #[test]
    fn test_hover_expands_to_target() {
        let (mut reg, mut cursor) = setup();
        cursor.pointer_moved(&mut reg, 50.0, 50.0);
        let target = CursorRect::from_bounds(Bounds::new(20.0, 30.0, 120.0, 40.0));
        cursor.set_hovered(&mut reg, Some(target));
        reg.flush();

        let published = reg.published();
        let entry = &published[&cursor.id()];
        assert_eq!(entry.bounds, target.bounds());
        assert_eq!(entry.style.corner_radius.as_deref(), Some("8px"));

        // Moving inside the target does not queue anything
        cursor.pointer_moved(&mut reg, 60.0, 50.0);
        assert_eq!(reg.pending_len(), 0);

        cursor.set_hovered(&mut reg, None);
        reg.flush();
        assert_eq!(reg.published()[&cursor.id()].bounds.width, 80.0);
    }

    #[test]
    fn test_transform_origin() {
        let (mut reg, mut cursor) = setup();
        assert_eq!(cursor.transform_origin(), Vec2::splat(0.5));
        cursor.pointer_moved(&mut reg, 50.0, 40.0);
        cursor.set_hovered(&mut reg, Some(CursorRect::from_bounds(Bounds::new(0.0, 0.0, 200.0, 80.0))));
        assert_eq!(cursor.transform_origin(), Vec2::new(0.25, 0.5));
    }

    #[test]
    fn test_pressed_scales_shape() {
        let (mut reg, mut cursor) = setup();
        cursor.pointer_moved(&mut reg, 100.0, 100.0);
        cursor.set_pressed(&mut reg, true);
        assert!(cursor.is_pressed());
        reg.flush();
        assert_eq!(reg.published()[&cursor.id()].scale, Some(0.85));

        cursor.set_pressed(&mut reg, false);
        reg.flush();
        assert_eq!(reg.published()[&cursor.id()].scale, None);
    }

    #[test]
    fn test_pressed_hover_scales_around_pointer() {
        let (mut reg, mut cursor) = setup();
        cursor.pointer_moved(&mut reg, 50.0, 40.0);
        cursor.set_hovered(&mut reg, Some(CursorRect::from_bounds(Bounds::new(0.0, 0.0, 200.0, 80.0))));
        cursor.set_pressed(&mut reg, true);
        reg.flush();

        let shape = render_shape(cursor.id(), &reg.published()[&cursor.id()]);
        assert_eq!(shape.get("transform-origin"), Some("25% 50%"));
        assert_eq!(shape.get("transform"), Some("translate3d(0px, 0px, 0) scale(0.85)"));
        assert_eq!(shape.css().matches("transform-origin").count(), 1);

        cursor.set_hovered(&mut reg, None);
        reg.flush();
        let shape = render_shape(cursor.id(), &reg.published()[&cursor.id()]);
        assert_eq!(shape.get("transform-origin"), Some("50% 50%"));
    }

    #[test]
    fn test_route_change_reregisters() {
        let (mut reg, mut cursor) = setup();
        reg.route_changed("/");
        cursor.pointer_moved(&mut reg, 10.0, 10.0);
        reg.route_changed("/creative");
        assert!(reg.is_empty());
        cursor.route_changed(&mut reg);
        assert!(reg.published().contains_key(&cursor.id()));
    }
}
