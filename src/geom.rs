//! Viewport rectangles

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A rectangle in viewport coordinates (the composite layer is viewport-fixed)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of `size` centred on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Shortest distance between the edges of two rectangles (0 when they touch or overlap)
    pub fn edge_gap(&self, other: &Bounds) -> f32 {
        let dx = (other.x - self.max().x).max(self.x - other.max().x).max(0.0);
        let dy = (other.y - self.max().y).max(self.y - other.max().y).max(0.0);
        Vec2::new(dx, dy).length()
    }

    /// CSS transform placing an element of these bounds in a fixed layer
    pub fn css_transform(&self, scale: Option<f32>) -> String {
        match scale {
            Some(s) => format!(
                "translate3d({}px, {}px, 0) scale({})",
                self.x, self.y, s
            ),
            None => format!("translate3d({}px, {}px, 0)", self.x, self.y),
        }
    }
}

impl From<(f32, f32, f32, f32)> for Bounds {
    fn from((x, y, width, height): (f32, f32, f32, f32)) -> Self {
        Self::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_gap_overlapping_is_zero() {
        let a = Bounds::new(0.0, 0.0, 50.0, 50.0);
        let b = Bounds::new(40.0, 0.0, 50.0, 50.0);
        assert_eq!(a.edge_gap(&b), 0.0);
        assert_eq!(b.edge_gap(&a), 0.0);
    }

    #[test]
    fn test_edge_gap_horizontal_and_diagonal() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let right = Bounds::new(25.0, 0.0, 10.0, 10.0);
        assert_eq!(a.edge_gap(&right), 15.0);

        let diag = Bounds::new(13.0, 14.0, 10.0, 10.0);
        assert!((a.edge_gap(&diag) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_center_roundtrips_center() {
        let b = Bounds::from_center(Vec2::new(100.0, 50.0), Vec2::new(80.0, 80.0));
        assert_eq!(b, Bounds::new(60.0, 10.0, 80.0, 80.0));
        assert_eq!(b.center(), Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_css_transform() {
        let b = Bounds::new(12.0, 8.5, 10.0, 10.0);
        assert_eq!(b.css_transform(None), "translate3d(12px, 8.5px, 0)");
        assert_eq!(
            b.css_transform(Some(1.5)),
            "translate3d(12px, 8.5px, 0) scale(1.5)"
        );
    }
}
