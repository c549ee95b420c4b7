//! Geometry kernel: scene primitives and ray intersection.
//!
//! Everything here is stateless numeric code. NaN distances or barycentric
//! weights always compare as a rejection, so degenerate input never turns
//! into a hit.

mod aabb;

pub use aabb::{ray_aabb_any, surface_area, Aabb};

use crate::material::MaterialId;
use crate::util::{barycentric, Ray, Vec2, Vec3};

/// Rays closer to parallel with a face than this are rejected.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Hits closer than this to the ray origin are rejected (self-intersection).
pub const HIT_EPSILON: f32 = 1e-6;

/// Mesh vertex as produced by the scene loader.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub pos: Vec3,
    pub norm: Vec3,
    pub tex: Vec2,
}

impl Vertex {
    #[inline]
    pub const fn new(pos: Vec3, norm: Vec3, tex: Vec2) -> Self {
        Self { pos, norm, tex }
    }
}

/// Scene triangle with a precomputed unit face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v: [Vertex; 3],
    pub norm: Vec3,
    pub material: MaterialId,
}

impl Triangle {
    /// Build a face, computing its normal from the winding of `v`.
    pub fn new(v: [Vertex; 3], material: MaterialId) -> Self {
        let norm = (v[1].pos - v[0].pos)
            .cross(v[2].pos - v[0].pos)
            .normalize_or_zero();
        Self { v, norm, material }
    }

    /// Centroid of the triangle.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.v[0].pos + self.v[1].pos + self.v[2].pos) / 3.0
    }

    /// Sum of the three vertex coordinates along `axis` (three times the centroid).
    #[inline]
    pub fn centroid_sum(&self, axis: usize) -> f32 {
        self.v[0].pos[axis] + self.v[1].pos[axis] + self.v[2].pos[axis]
    }

    /// Compute AABB of this triangle.
    pub fn aabb(&self) -> Aabb {
        let mut b = Aabb::EMPTY;
        b.grow_face(self);
        b
    }
}

/// Result of a successful ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray, in units of the ray direction's length
    pub t: f32,
    /// Hit position with barycentrically interpolated normal and uv
    pub v: Vertex,
    /// Unit face normal of the triangle that was hit
    pub face_norm: Vec3,
    /// Barycentric weights of the hit point
    pub bary: Vec3,
    pub ray: Ray,
    pub material: MaterialId,
}

/// Distance and barycentric weights of a ray/triangle hit in `(HIT_EPSILON, t_max]`.
#[inline]
pub fn ray_triangle_t(ray: &Ray, tri: &Triangle, t_max: f32) -> Option<(f32, Vec3)> {
    let ndotdir = ray.dir.dot(tri.norm);
    if !(ndotdir.abs() > PARALLEL_EPSILON) {
        return None;
    }

    let t = tri.norm.dot(tri.v[0].pos - ray.origin) / ndotdir;
    if !(t > HIT_EPSILON) || t > t_max {
        return None;
    }

    let pos = ray.at(t);
    let bc = barycentric(tri.v[0].pos, tri.v[1].pos, tri.v[2].pos, pos);
    let unit = 0.0..=1.0;
    if !(unit.contains(&bc.x) && unit.contains(&bc.y) && unit.contains(&bc.z)) {
        return None;
    }
    Some((t, bc))
}

/// Intersect a ray with a triangle, producing the interpolated hit vertex.
pub fn ray_triangle(ray: &Ray, tri: &Triangle, t_max: f32) -> Option<RayHit> {
    let (t, bc) = ray_triangle_t(ray, tri, t_max)?;
    Some(RayHit::new(ray, tri, t, bc))
}

impl RayHit {
    /// Interpolate vertex attributes of `tri` with barycentric weights `bc`.
    pub fn new(ray: &Ray, tri: &Triangle, t: f32, bc: Vec3) -> Self {
        let [a, b, c] = &tri.v;
        Self {
            t,
            v: Vertex {
                pos: ray.at(t),
                norm: a.norm * bc.x + b.norm * bc.y + c.norm * bc.z,
                tex: a.tex * bc.x + b.tex * bc.y + c.tex * bc.z,
            },
            face_norm: tri.norm,
            bary: bc,
            ray: *ray,
            material: tri.material,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit right triangle in the z=`z` plane with +Z normals and uvs matching xy.
    pub(crate) fn make_tri(offset: Vec3, material: u32) -> Triangle {
        let vert = |x: f32, y: f32| {
            Vertex::new(offset + Vec3::new(x, y, 0.0), Vec3::Z, Vec2::new(x, y))
        };
        Triangle::new(
            [vert(0.0, 0.0), vert(1.0, 0.0), vert(0.0, 1.0)],
            MaterialId(material),
        )
    }

    #[test]
    fn test_face_normal() {
        let tri = make_tri(Vec3::ZERO, 0);
        assert_eq!(tri.norm, Vec3::Z);
        assert!((tri.centroid_sum(0) - 3.0 * tri.centroid().x).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_hit() {
        let tri = make_tri(Vec3::new(0.0, 0.0, -2.0), 3);
        let c = tri.centroid();
        let origin = Vec3::new(0.3, -0.2, 4.0);
        let ray = Ray::new(origin, c - origin);

        let hit = ray_triangle(&ray, &tri, f32::MAX).expect("centroid ray must hit");
        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!((hit.v.pos - c).length() < 1e-5);
        for w in hit.bary.to_array() {
            assert!((0.0..=1.0).contains(&w));
        }
        assert!((hit.bary.element_sum() - 1.0).abs() < 1e-5);
        assert!((hit.v.tex - Vec2::splat(1.0 / 3.0)).length() < 1e-5);
        assert_eq!(hit.material, MaterialId(3));
    }

    #[test]
    fn test_parallel_ray_rejected() {
        let tri = make_tri(Vec3::ZERO, 0);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::X);
        assert!(ray_triangle(&ray, &tri, f32::MAX).is_none());
    }

    #[test]
    fn test_behind_and_beyond_rejected() {
        let tri = make_tri(Vec3::ZERO, 0);
        let behind = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::Z);
        assert!(ray_triangle(&behind, &tri, f32::MAX).is_none());

        let toward = Ray::new(Vec3::new(0.2, 0.2, 1.0), -Vec3::Z);
        assert!(ray_triangle(&toward, &tri, 0.5).is_none());
        assert!(ray_triangle(&toward, &tri, 1.0).is_some());
    }

    #[test]
    fn test_origin_on_surface_rejected() {
        let tri = make_tri(Vec3::ZERO, 0);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_triangle(&ray, &tri, f32::MAX).is_none());
    }

    #[test]
    fn test_outside_triangle_rejected() {
        let tri = make_tri(Vec3::ZERO, 0);
        let ray = Ray::new(Vec3::new(0.8, 0.8, 1.0), -Vec3::Z);
        assert!(ray_triangle(&ray, &tri, f32::MAX).is_none());
    }

    #[test]
    fn test_degenerate_triangle_rejected() {
        let p = Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO);
        let tri = Triangle::new([p, p, p], MaterialId(0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z);
        assert!(ray_triangle(&ray, &tri, f32::MAX).is_none());
    }
}
