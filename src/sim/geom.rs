//! Geometry helpers for the collision pass
//!
//! Everything here is pure math over `glam::Vec2` and axis-aligned rects
//! given as (top-left, size).

use glam::Vec2;

/// Axis-aligned overlap test. Strict on both axes, so rects that merely
/// touch edges do not collide.
pub fn aabb_overlap(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> bool {
    a_pos.x < b_pos.x + b_size.x
        && a_pos.x + a_size.x > b_pos.x
        && a_pos.y < b_pos.y + b_size.y
        && a_pos.y + a_size.y > b_pos.y
}

/// Intersection point and surface normal of a segment against a rect edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: Vec2,
    pub normal: Vec2,
}

/// Closest intersection of the segment `start..end` with the edges of a
/// rect. Parallel segment/edge pairs contribute no intersection.
pub fn segment_rect_intersection(
    start: Vec2,
    end: Vec2,
    rect_pos: Vec2,
    rect_size: Vec2,
) -> Option<SegmentHit> {
    let tl = rect_pos;
    let tr = rect_pos + Vec2::new(rect_size.x, 0.0);
    let bl = rect_pos + Vec2::new(0.0, rect_size.y);
    let br = rect_pos + rect_size;

    let edges = [
        (tl, tr, Vec2::new(0.0, -1.0)), // top
        (tl, bl, Vec2::new(-1.0, 0.0)), // left
        (tr, br, Vec2::new(1.0, 0.0)),  // right
        (bl, br, Vec2::new(0.0, 1.0)),  // bottom
    ];

    let mut closest: Option<SegmentHit> = None;
    let mut min_dist_sq = f32::INFINITY;

    for (e0, e1, normal) in edges {
        let den = (start.x - end.x) * (e0.y - e1.y) - (start.y - end.y) * (e0.x - e1.x);
        if den == 0.0 {
            continue; // parallel
        }

        let t = ((start.x - e0.x) * (e0.y - e1.y) - (start.y - e0.y) * (e0.x - e1.x)) / den;
        let u = -((start.x - end.x) * (start.y - e0.y) - (start.y - end.y) * (start.x - e0.x)) / den;

        if t > 0.0 && t < 1.0 && (0.0..=1.0).contains(&u) {
            let point = start + (end - start) * t;
            let dist_sq = point.distance_squared(start);
            if dist_sq < min_dist_sq {
                min_dist_sq = dist_sq;
                closest = Some(SegmentHit { point, normal });
            }
        }
    }

    closest
}

/// Squared distance from a point to the segment `a..b`.
pub fn point_segment_dist_sq(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let len_sq = a.distance_squared(b);
    if len_sq == 0.0 {
        return p.distance_squared(a);
    }

    let t = ((p - a).dot(b - a) / len_sq).clamp(0.0, 1.0);
    let closest = a + (b - a) * t;
    p.distance_squared(closest)
}

/// Reflect an incident vector about a surface normal: `v' = v - 2(v.n)n`.
pub fn reflect(incident: Vec2, normal: Vec2) -> Vec2 {
    incident - 2.0 * incident.dot(normal) * normal
}

/// Format a damage amount for floating combat text. One decimal place,
/// trailing ".0" trimmed ("1", "1.5", "0.8").
pub fn format_damage(amount: f32) -> String {
    let s = format!("{amount:.1}");
    s.strip_suffix(".0").map(str::to_owned).unwrap_or(s)
}
