//! Math type re-exports and ray/optics utilities.
//!
//! This module re-exports types from `glam` and provides the small set of
//! vector helpers shared by the intersection kernel and the integrator.

pub use glam::{Mat4, Vec2, Vec3};

/// Display gamma between 8-bit images and linear radiance.
pub const GAMMA: f32 = 2.2;

/// A half-line with an origin and a direction.
///
/// The direction is not required to be normalized; hit distances are
/// measured in units of its length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    #[inline]
    pub const fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    /// Point at parametric distance `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Mirror `v` about the plane with normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - n * (2.0 * v.dot(n))
}

/// Refract unit vector `v` through a surface with unit normal `n` facing
/// against `v`, with `eta` = n_incident / n_transmitted.
///
/// Returns `None` on total internal reflection.
#[inline]
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -v.dot(n);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some(v * eta + n * (eta * cos_i - k.sqrt()))
}

/// Schlick's approximation of Fresnel reflectance.
#[inline]
pub fn schlick(cos_i: f32, ior: f32) -> f32 {
    let r0 = (1.0 - ior) / (1.0 + ior);
    let r0 = r0 * r0;
    let c = (1.0 - cos_i.clamp(0.0, 1.0)).powi(5);
    r0 + (1.0 - r0) * c
}

/// Barycentric coordinates of `p` with respect to triangle `(a, b, c)`.
///
/// Degenerate triangles yield non-finite weights, which callers must treat
/// as a rejection.
#[inline]
pub fn barycentric(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}
