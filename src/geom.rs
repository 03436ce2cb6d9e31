//! 2D geometry primitives used by the check providers.
//!
//! Coordinates are internal units (nanometres) held as `i64`; distance
//! computations run in `f64` to avoid overflow on squared terms. Touching
//! shapes report distance 0 exactly: intersection is checked before any
//! point-to-segment arithmetic, so a zero gap is never rounded into a
//! small positive one.

use serde::Serialize;

/// A point or vector in internal units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Vec2 {
    pub x: i64,
    pub y: i64,
}

impl Vec2 {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
        Vec2::new((a.x + b.x) / 2, (a.y + b.y) / 2)
    }

    #[must_use]
    pub fn distance(self, other: Vec2) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }
}

/// Axis-aligned bounding box in internal units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BBox {
    #[must_use]
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Grow the box by `amount` in every direction.
    #[must_use]
    pub fn inflated(self, amount: i64) -> Self {
        Self {
            min: Vec2::new(self.min.x - amount, self.min.y - amount),
            max: Vec2::new(self.max.x + amount, self.max.y + amount),
        }
    }
}

/// Nearest point on segment `[a, b]` to `p`, with the distance to it.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> (f64, Vec2) {
    let ab = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let ap = ((p.x - a.x) as f64, (p.y - a.y) as f64);
    let ab_len2 = ab.0 * ab.0 + ab.1 * ab.1;

    if ab_len2 == 0.0 {
        // Degenerate segment
        return (p.distance(a), a);
    }

    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab_len2).clamp(0.0, 1.0);
    let nearest = Vec2::new(
        a.x + (t * ab.0).round() as i64,
        a.y + (t * ab.1).round() as i64,
    );
    (p.distance(nearest), nearest)
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> i128 {
    let ox = i128::from(o.x);
    let oy = i128::from(o.y);
    (i128::from(a.x) - ox) * (i128::from(b.y) - oy)
        - (i128::from(a.y) - oy) * (i128::from(b.x) - ox)
}

fn on_segment(p: Vec2, a: Vec2, b: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether segments `[a1, a2]` and `[b1, b2]` intersect, including
/// endpoint touches and collinear overlap.
#[must_use]
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }
    (d1 == 0 && on_segment(a1, b1, b2))
        || (d2 == 0 && on_segment(a2, b1, b2))
        || (d3 == 0 && on_segment(b1, a1, a2))
        || (d4 == 0 && on_segment(b2, a1, a2))
}

/// Minimum distance between two segments and the point of closest approach.
///
/// Intersecting segments return distance 0 at an intersection endpoint.
#[must_use]
pub fn segment_segment_distance(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> (f64, Vec2) {
    if segments_intersect(a1, a2, b1, b2) {
        // Any point on the overlap serves as the closest-approach marker.
        let (_, p) = point_segment_distance(a1, b1, b2);
        return (0.0, p);
    }

    let mut best = (f64::MAX, Vec2::new(0, 0));
    for (p, s1, s2) in [(a1, b1, b2), (a2, b1, b2), (b1, a1, a2), (b2, a1, a2)] {
        let (d, nearest) = point_segment_distance(p, s1, s2);
        if d < best.0 {
            best = (d, Vec2::midpoint(p, nearest));
        }
    }
    best
}

/// A copper outline shape used by clearance-style checks: a stroked
/// segment (track) or a filled circle (via barrel, round pad).
#[derive(Debug, Clone, Copy)]
pub enum CopperShape {
    Segment { a: Vec2, b: Vec2, half_width: i64 },
    Circle { center: Vec2, radius: i64 },
}

impl CopperShape {
    #[must_use]
    pub fn bbox(&self) -> BBox {
        match *self {
            CopperShape::Segment { a, b, half_width } => {
                BBox::from_points(a, b).inflated(half_width)
            }
            CopperShape::Circle { center, radius } => {
                BBox::from_points(center, center).inflated(radius)
            }
        }
    }

    /// Minimum outline-to-outline distance to `other`, clamped at 0 for
    /// overlapping shapes, with the point of closest approach.
    #[must_use]
    pub fn distance(&self, other: &CopperShape) -> (f64, Vec2) {
        let (centerline, at) = match (*self, *other) {
            (
                CopperShape::Segment { a: a1, b: a2, .. },
                CopperShape::Segment { a: b1, b: b2, .. },
            ) => segment_segment_distance(a1, a2, b1, b2),
            (CopperShape::Segment { a, b, .. }, CopperShape::Circle { center, .. })
            | (CopperShape::Circle { center, .. }, CopperShape::Segment { a, b, .. }) => {
                let (d, nearest) = point_segment_distance(center, a, b);
                (d, Vec2::midpoint(center, nearest))
            }
            (CopperShape::Circle { center: c1, .. }, CopperShape::Circle { center: c2, .. }) => {
                (c1.distance(c2), Vec2::midpoint(c1, c2))
            }
        };
        let gap = centerline - (self.outline_offset() + other.outline_offset());
        (gap.max(0.0), at)
    }

    fn outline_offset(&self) -> f64 {
        match *self {
            CopperShape::Segment { half_width, .. } => half_width as f64,
            CopperShape::Circle { radius, .. } => radius as f64,
        }
    }
}
