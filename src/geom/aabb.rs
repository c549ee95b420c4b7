//! Axis-aligned bounding boxes and the ray/box slab test.

use crate::util::{Ray, Vec3};

use super::Triangle;

/// Axis-aligned bounding box.
///
/// A box that has not seen any point yet is the empty sentinel
/// (`min = +inf`, `max = -inf`); [`Aabb::area`] reports zero for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// True until the first point has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include a point.
    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include another AABB.
    #[inline]
    pub fn grow(&mut self, other: &Aabb) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Grow to include all three vertices of a face.
    #[inline]
    pub fn grow_face(&mut self, tri: &Triangle) {
        for v in &tri.v {
            self.grow_point(v.pos);
        }
    }

    /// Per-axis size. Negative on the empty sentinel.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area (for SAH cost). Zero for the empty sentinel.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        surface_area(d.x, d.y, d.z)
    }

    /// Axis of largest extent (0=x, 1=y, 2=z).
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.x > d.y {
            if d.x > d.z { 0 } else { 2 }
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// True if `other` lies entirely within this box.
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.min.cmple(other.min).all() && self.max.cmpge(other.max).all())
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Surface area of a box with the given extents; negative extents count as zero.
#[inline]
pub fn surface_area(dx: f32, dy: f32, dz: f32) -> f32 {
    let (dx, dy, dz) = (dx.max(0.0), dy.max(0.0), dz.max(0.0));
    2.0 * (dx * dy + dx * dz + dy * dz)
}

/// Slab test: does `ray` enter `aabb` somewhere in `[0, t_max]`?
///
/// A zero direction component divides to an infinity and the test for that
/// axis degenerates to "origin between the slabs". NaN slab distances (origin
/// exactly on a slab with a zero component) leave the running interval
/// untouched. The interval is rejected only when it is strictly inverted, so
/// a ray grazing a face counts as a hit.
#[inline]
pub fn ray_aabb_any(ray: &Ray, aabb: &Aabb, t_max: f32) -> bool {
    let mut tmin = 0.0f32;
    let mut tmax = t_max;

    for axis in 0..3 {
        let inv = 1.0 / ray.dir[axis];
        let mut t0 = (aabb.min[axis] - ray.origin[axis]) * inv;
        let mut t1 = (aabb.max[axis] - ray.origin[axis]) * inv;
        if inv < 0.0 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > tmin {
            tmin = t0;
        }
        if t1 < tmax {
            tmax = t1;
        }
        if tmax < tmin {
            return false;
        }
    }
    true
}
