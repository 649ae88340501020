//! Spring + repulsion particle cluster
//!
//! Each body is pulled toward its anchor, pushed away from neighbours inside
//! the repulsion radius, and softly pushed back from the padded container
//! edge. O(n²) per tick, fine for the dozen-odd bodies this drives.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CLUSTER_FPS_NORM, CLUSTER_MAX_DT};

/// Tuning for one cluster instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    pub padding: f32,
    pub repel_radius: f32,
    pub repel_strength: f32,
    pub spring_strength: f32,
    pub damping: f32,
    /// Boundary push per pixel of penetration into the padding
    pub boundary_stiffness: f32,
}

impl ClusterParams {
    /// Header blob cluster
    pub const HEADER: Self = Self {
        padding: 24.0,
        repel_radius: 140.0,
        repel_strength: 1200.0,
        spring_strength: 0.4,
        damping: 0.85,
        boundary_stiffness: 6.0,
    };

    /// Draggable tech graph card
    pub const TECH_GRAPH: Self = Self {
        padding: 32.0,
        repel_radius: 80.0,
        repel_strength: 220.0,
        spring_strength: 0.7,
        damping: 0.88,
        boundary_stiffness: 6.0,
    };
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self::HEADER
    }
}

/// One body of the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterBody {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Spring rest point in pixels (derived from `anchor_frac`)
    pub anchor: Vec2,
    /// Anchor as a fraction of the container size
    pub anchor_frac: Vec2,
    /// Painted width/height, also used for containment and hit testing
    pub footprint: Vec2,
    pub color: String,
    pub label: Option<String>,
}

impl ClusterBody {
    pub fn new(anchor_frac: Vec2, footprint: Vec2, color: impl Into<String>) -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            anchor: Vec2::ZERO,
            anchor_frac,
            footprint,
            color: color.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Point inside the body's elliptical footprint
    pub fn contains(&self, p: Vec2) -> bool {
        let half = self.footprint / 2.0;
        if half.x <= 0.0 || half.y <= 0.0 {
            return false;
        }
        let d = (p - self.position) / half;
        d.length_squared() <= 1.0
    }
}

/// Pointer grab on one body
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    index: usize,
    offset: Vec2,
}

/// Linear-falloff repulsion felt by a body displaced `delta` from another.
///
/// Exactly zero at or beyond `radius` (and for coincident bodies).
pub fn repulsion(delta: Vec2, radius: f32, strength: f32) -> Vec2 {
    let distance = delta.length();
    if distance <= 0.0 || distance >= radius {
        return Vec2::ZERO;
    }
    delta / distance * ((1.0 - distance / radius) * strength)
}

/// Spring pull toward `anchor`
#[inline]
pub fn spring(position: Vec2, anchor: Vec2, strength: f32) -> Vec2 {
    (anchor - position) * strength
}

/// Per-axis push back from the padded container edge
pub fn boundary_force(position: Vec2, size: Vec2, padding: f32, stiffness: f32) -> Vec2 {
    let axis = |p: f32, extent: f32| {
        if p < padding {
            (padding - p) * stiffness
        } else if p > extent - padding {
            -(p - (extent - padding)) * stiffness
        } else {
            0.0
        }
    };
    Vec2::new(axis(position.x, size.x), axis(position.y, size.y))
}

/// A spring/repulsion cluster inside a container
#[derive(Debug, Clone)]
pub struct ParticleCluster {
    bodies: Vec<ClusterBody>,
    params: ClusterParams,
    size: Vec2,
    drag: Option<DragState>,
}

impl ParticleCluster {
    pub fn new(bodies: Vec<ClusterBody>, params: ClusterParams) -> Self {
        Self {
            bodies,
            params,
            size: Vec2::ZERO,
            drag: None,
        }
    }

    pub fn bodies(&self) -> &[ClusterBody] {
        &self.bodies
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.bodies.iter().map(|b| b.position).collect()
    }

    /// Container resized: recompute anchors. Bodies snap to their anchors on
    /// the first sizing, or on every resize when `reset` is set.
    pub fn set_bounds(&mut self, width: f32, height: f32, reset: bool) {
        let first = self.size.x <= 0.0 || self.size.y <= 0.0;
        self.size = Vec2::new(width, height);
        for body in &mut self.bodies {
            body.anchor = body.anchor_frac * self.size;
            if first || reset {
                body.position = body.anchor;
                body.velocity = Vec2::ZERO;
            }
        }
    }

    /// Advance by `dt` seconds (clamped to keep big frame gaps stable)
    pub fn tick(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, CLUSTER_MAX_DT);
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return;
        }
        let p = self.params;
        let size = self.size;
        let snapshot: Vec<Vec2> = self.bodies.iter().map(|b| b.position).collect();
        let dragged = self.drag.map(|d| d.index);

        for (i, body) in self.bodies.iter_mut().enumerate() {
            if dragged == Some(i) {
                body.velocity = Vec2::ZERO;
                continue;
            }

            let mut force = spring(body.position, body.anchor, p.spring_strength);
            for (j, other) in snapshot.iter().enumerate() {
                if i != j {
                    force += repulsion(body.position - *other, p.repel_radius, p.repel_strength);
                }
            }
            force += boundary_force(body.position, size, p.padding, p.boundary_stiffness);

            body.velocity = (body.velocity + force * dt) * p.damping;
            body.position += body.velocity * dt * CLUSTER_FPS_NORM;
            body.position = contain(body.position, body.footprint, size);
        }
    }

    /// Top-most body under the pointer (container coordinates)
    pub fn hit_test(&self, pointer: Vec2) -> Option<usize> {
        self.bodies.iter().rposition(|b| b.contains(pointer))
    }

    /// Grab body `index`; it keeps its offset from the pointer while dragged
    pub fn begin_drag(&mut self, index: usize, pointer: Vec2) -> bool {
        let Some(body) = self.bodies.get(index) else {
            return false;
        };
        self.drag = Some(DragState {
            index,
            offset: body.position - pointer,
        });
        true
    }

    /// Move the grabbed body with the pointer, clamped inside the container
    pub fn drag_to(&mut self, pointer: Vec2) {
        let Some(drag) = self.drag else {
            return;
        };
        let size = self.size;
        if let Some(body) = self.bodies.get_mut(drag.index) {
            body.position = contain(pointer + drag.offset, body.footprint, size);
            body.velocity = Vec2::ZERO;
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn dragged(&self) -> Option<usize> {
        self.drag.map(|d| d.index)
    }

    /// CSS transforms, centred on each body
    pub fn transforms(&self) -> Vec<String> {
        self.bodies
            .iter()
            .map(|b| {
                format!(
                    "translate3d({}px, {}px, 0) translate(-50%, -50%)",
                    b.position.x, b.position.y
                )
            })
            .collect()
    }
}

/// Keep a body's footprint inside the container (centred if it cannot fit)
fn contain(position: Vec2, footprint: Vec2, size: Vec2) -> Vec2 {
    let axis = |p: f32, half: f32, extent: f32| {
        if extent <= half * 2.0 {
            extent / 2.0
        } else {
            p.clamp(half, extent - half)
        }
    };
    let half = footprint / 2.0;
    Vec2::new(axis(position.x, half.x, size.x), axis(position.y, half.y, size.y))
}
