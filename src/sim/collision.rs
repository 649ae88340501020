//! Collision detection for capsule-shaped pills
//!
//! A pill is a segment swept by a radius (a fully chamfered rectangle), so
//! every test reduces to closest points between segments.

use glam::Vec2;

use super::pills::PillBody;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point in world space
    pub point: Vec2,
    /// Contact normal, pointing from the first shape toward the second
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Static half-plane; points with `normal · p >= offset` are inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub normal: Vec2,
    pub offset: f32,
}

impl Wall {
    /// Four walls enclosing a `width` x `height` board, pulled in by `inset`
    pub fn enclosure(width: f32, height: f32, inset: f32) -> [Wall; 4] {
        [
            Wall { normal: Vec2::X, offset: inset },
            Wall { normal: Vec2::NEG_X, offset: -(width - inset) },
            Wall { normal: Vec2::Y, offset: inset },
            Wall { normal: Vec2::NEG_Y, offset: -(height - inset) },
        ]
    }

    /// Signed distance from the wall surface (positive inside)
    #[inline]
    pub fn distance(&self, p: Vec2) -> f32 {
        self.normal.dot(p) - self.offset
    }
}

/// Closest point to `p` on segment `a`-`b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest pair of points between segments `p1`-`q1` and `p2`-`q2`
pub fn closest_points_between_segments(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> (Vec2, Vec2) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    // Degenerate segments collapse to points
    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }
    if a <= f32::EPSILON {
        let t = (f / e).clamp(0.0, 1.0);
        return (p1, p2 + d2 * t);
    }
    let c = d1.dot(r);
    if e <= f32::EPSILON {
        let s = (-c / a).clamp(0.0, 1.0);
        return (p1 + d1 * s, p2);
    }

    let b = d1.dot(d2);
    let denom = a * e - b * b;
    let mut s = if denom > f32::EPSILON {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    } else {
        // Parallel: pick the middle of the overlap on the first segment
        let t0 = (-c / a).clamp(0.0, 1.0);
        let t1 = ((d2.dot(d1) - c) / a).clamp(0.0, 1.0);
        (t0 + t1) * 0.5
    };
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (p1 + d1 * s, p2 + d2 * t)
}

/// Capsule vs capsule. Normal points from `a` toward `b`.
pub fn capsule_capsule(a: &PillBody, b: &PillBody) -> CollisionResult {
    let (a0, a1) = a.segment();
    let (b0, b1) = b.segment();
    let (ca, cb) = closest_points_between_segments(a0, a1, b0, b1);

    let delta = cb - ca;
    let distance = delta.length();
    let reach = a.radius + b.radius;
    if distance >= reach {
        return CollisionResult::miss();
    }

    let normal = if distance > 1e-6 {
        delta / distance
    } else {
        // Segments cross: fall back to the centre offset
        (b.position - a.position).try_normalize().unwrap_or(Vec2::Y)
    };
    let penetration = reach - distance;

    CollisionResult {
        hit: true,
        point: ca + normal * (a.radius - penetration * 0.5),
        normal,
        penetration,
    }
}

/// Capsule vs wall. Up to one contact per segment endpoint, normal points
/// from the wall into the body.
pub fn capsule_wall(body: &PillBody, wall: &Wall) -> Vec<CollisionResult> {
    let (e0, e1) = body.segment();
    let ends = if e0 == e1 { vec![e0] } else { vec![e0, e1] };

    ends.into_iter()
        .filter_map(|end| {
            let gap = wall.distance(end) - body.radius;
            (gap < 0.0).then(|| CollisionResult {
                hit: true,
                point: end - wall.normal * body.radius,
                normal: wall.normal,
                penetration: -gap,
            })
        })
        .collect()
}
