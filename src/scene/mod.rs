//! Scene aggregate: the single entry point the integrator queries.
//!
//! Holds two triangle arenas, each with its own BVH:
//! - **static**: every mesh of the loaded level, built once
//! - **dynamic**: moving content, rebuilt between render passes
//!
//! Rebuilding takes `&mut Scene`, so it can never overlap a render pass that
//! borrows the scene immutably.

pub mod demo;

use std::ops::Range;

use crate::bvh::{Bvh, HitMode};
use crate::geom::{Aabb, RayHit, Triangle, Vertex};
use crate::material::{Material, MaterialId, MaterialTable};
use crate::util::{Error, Ray, Result, Vec2, Vec3};

/// Triangle soup with one material, as handed over by a mesh loader.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub material: Material,
    pub faces: Vec<[Vertex; 3]>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, material: Material) -> Self {
        Self {
            name: name.into(),
            material,
            faces: Vec::new(),
        }
    }

    /// Append a flat quad `a b c d` (counter-clockwise seen from the front).
    pub fn push_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        self.push_patch(a, b, c, d, 1);
    }

    /// Append quad `a b c d` split into `n x n` cells. Texture coordinates
    /// run from 0 at `a` to 1 at `c` across the whole patch.
    pub fn push_patch(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3, n: u32) {
        let n = n.max(1);
        let norm = (b - a).cross(d - a).normalize_or_zero();
        let vert = |i: u32, j: u32| {
            let (u, w) = (i as f32 / n as f32, j as f32 / n as f32);
            let pos = a.lerp(b, u).lerp(d.lerp(c, u), w);
            Vertex::new(pos, norm, Vec2::new(u, w))
        };

        for j in 0..n {
            for i in 0..n {
                let (va, vb, vc, vd) = (vert(i, j), vert(i + 1, j), vert(i + 1, j + 1), vert(i, j + 1));
                self.faces.push([va, vb, vc]);
                self.faces.push([va, vc, vd]);
            }
        }
    }

    /// Append an axis-aligned box with outward-facing quads.
    pub fn push_cuboid(&mut self, min: Vec3, max: Vec3) {
        let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let (x0, y0, z0, x1, y1, z1) = (min.x, min.y, min.z, max.x, max.y, max.z);
        self.push_quad(p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1)); // +z
        self.push_quad(p(x1, y0, z0), p(x0, y0, z0), p(x0, y1, z0), p(x1, y1, z0)); // -z
        self.push_quad(p(x1, y0, z1), p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1)); // +x
        self.push_quad(p(x0, y0, z0), p(x0, y0, z1), p(x0, y1, z1), p(x0, y1, z0)); // -x
        self.push_quad(p(x0, y1, z1), p(x1, y1, z1), p(x1, y1, z0), p(x0, y1, z0)); // +y
        self.push_quad(p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1), p(x0, y0, z1)); // -y
    }
}

/// One triangle arena and the BVH built over it.
#[derive(Debug, Default)]
struct Layer {
    triangles: Vec<Triangle>,
    bvh: Bvh,
}

impl Layer {
    /// Intern each mesh's material and append its faces, growing the root box.
    fn append(&mut self, materials: &mut MaterialTable, meshes: impl IntoIterator<Item = Mesh>) -> Result<()> {
        for mesh in meshes {
            let start = self.triangles.len();
            self.triangles
                .try_reserve(mesh.faces.len())
                .map_err(|_| Error::BvhAlloc { what: "triangle arena", faces: start + mesh.faces.len() })?;

            let id = materials.insert(mesh.material);
            self.triangles.extend(mesh.faces.iter().map(|&v| Triangle::new(v, id)));
            let range: Range<usize> = start..self.triangles.len();
            tracing::debug!(mesh = %mesh.name, faces = range.len(), "appending mesh faces");
            self.bvh.append(&self.triangles, range)?;
        }
        Ok(())
    }

    fn build(&mut self) -> Result<()> {
        self.bvh.build(&self.triangles)
    }

    #[inline]
    fn query(&self, ray: &Ray, t_max: f32, mode: HitMode) -> Option<RayHit> {
        self.bvh.query(&self.triangles, ray, t_max, mode)
    }
}

#[derive(Debug)]
pub struct Scene {
    background: Vec3,
    materials: MaterialTable,
    static_layer: Layer,
    dynamic_layer: Layer,
}

impl Scene {
    /// Gather all meshes into the static arena and build its BVH once.
    #[tracing::instrument(skip_all)]
    pub fn new(meshes: impl IntoIterator<Item = Mesh>, background: Vec3) -> Result<Self> {
        let mut materials = MaterialTable::new();
        let mut static_layer = Layer::default();
        static_layer.append(&mut materials, meshes)?;

        tracing::info!(
            faces = static_layer.triangles.len(),
            materials = materials.len(),
            "Building static BVH tree"
        );
        static_layer.build()?;

        Ok(Self {
            background,
            materials,
            static_layer,
            dynamic_layer: Layer::default(),
        })
    }

    /// Replace the dynamic content and rebuild its BVH.
    ///
    /// The old dynamic content stays in place if the build fails.
    #[tracing::instrument(skip_all)]
    pub fn rebuild_dynamic(&mut self, meshes: impl IntoIterator<Item = Mesh>) -> Result<()> {
        let mut layer = Layer::default();
        layer.append(&mut self.materials, meshes)?;
        layer.build()?;
        tracing::debug!(faces = layer.triangles.len(), "dynamic BVH rebuilt");
        self.dynamic_layer = layer;
        Ok(())
    }

    /// Query both BVHs. Closest mode returns the nearer of the two hits; any
    /// mode returns whichever hit is found first.
    pub fn ray_query(&self, ray: &Ray, t_max: f32, mode: HitMode) -> Option<RayHit> {
        match mode {
            HitMode::Any => self
                .static_layer
                .query(ray, t_max, mode)
                .or_else(|| self.dynamic_layer.query(ray, t_max, mode)),
            HitMode::Closest => {
                let st = self.static_layer.query(ray, t_max, mode);
                let limit = st.as_ref().map_or(t_max, |h| h.t);
                match self.dynamic_layer.query(ray, limit, mode) {
                    Some(dy) if st.as_ref().map_or(true, |s| dy.t < s.t) => Some(dy),
                    _ => st,
                }
            }
        }
    }

    /// Nearest hit in either BVH.
    #[inline]
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<RayHit> {
        self.ray_query(ray, t_max, HitMode::Closest)
    }

    /// True if anything blocks `ray` within `t_max`.
    pub fn occluded(&self, ray: &Ray, t_max: f32) -> bool {
        self.static_layer.bvh.any_hit(&self.static_layer.triangles, ray, t_max)
            || self.dynamic_layer.bvh.any_hit(&self.dynamic_layer.triangles, ray, t_max)
    }

    #[inline]
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    /// Color returned for rays that leave the scene.
    #[inline]
    pub fn background(&self) -> Vec3 {
        self.background
    }

    /// Union of the static and dynamic bounds.
    pub fn bounds(&self) -> Aabb {
        let mut b = self.static_layer.bvh.root().aabb;
        b.grow(&self.dynamic_layer.bvh.root().aabb);
        b
    }

    pub fn triangle_count(&self) -> usize {
        self.static_layer.triangles.len() + self.dynamic_layer.triangles.len()
    }

    pub fn static_triangles(&self) -> &[Triangle] {
        &self.static_layer.triangles
    }

    pub fn static_bvh(&self) -> &Bvh {
        &self.static_layer.bvh
    }

    pub fn dynamic_triangles(&self) -> &[Triangle] {
        &self.dynamic_layer.triangles
    }

    pub fn dynamic_bvh(&self) -> &Bvh {
        &self.dynamic_layer.bvh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(name: &str, z: f32) -> Mesh {
        let mut m = Mesh::new(name, Material::diffuse(name, Vec3::ONE));
        m.push_quad(
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(1.0, 1.0, z),
            Vec3::new(-1.0, 1.0, z),
        );
        m
    }

    #[test]
    fn test_quad_normals_face_front() {
        let m = panel("p", 0.0);
        assert_eq!(m.faces.len(), 2);
        for face in &m.faces {
            let tri = Triangle::new(*face, MaterialId(0));
            assert!((tri.norm - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_cuboid_outward() {
        let mut m = Mesh::new("box", Material::default());
        m.push_cuboid(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(m.faces.len(), 12);
        for face in &m.faces {
            let tri = Triangle::new(*face, MaterialId(0));
            assert!(tri.norm.dot(tri.centroid()) > 0.0, "face normal must point outward");
        }
    }

    #[test]
    fn test_static_scene_query() {
        let scene = Scene::new([panel("near", -1.0), panel("far", -3.0)], Vec3::splat(0.5)).unwrap();
        assert_eq!(scene.triangle_count(), 4);
        assert_eq!(scene.materials().len(), 2);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let hit = scene.intersect(&ray, f32::MAX).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert_eq!(scene.material(hit.material).unwrap().name, "near");
        assert!(scene.occluded(&ray, 2.0));
        assert!(!scene.occluded(&ray, 0.5));
    }

    #[test]
    fn test_dynamic_nearer_than_static() {
        let mut scene = Scene::new([panel("wall", -3.0)], Vec3::ZERO).unwrap();
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        assert!((scene.intersect(&ray, f32::MAX).unwrap().t - 3.0).abs() < 1e-6);

        scene.rebuild_dynamic([panel("door", -2.0)]).unwrap();
        let hit = scene.intersect(&ray, f32::MAX).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-6);
        assert_eq!(scene.material(hit.material).unwrap().name, "door");

        // Moving the door behind the wall: static wins again
        scene.rebuild_dynamic([panel("door", -4.0)]).unwrap();
        let hit = scene.intersect(&ray, f32::MAX).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-6);
        assert!(scene.bounds().min.z <= -4.0);
    }

    #[test]
    fn test_empty_scene() {
        let scene = Scene::new(Vec::new(), Vec3::ONE).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(scene.intersect(&ray, f32::MAX).is_none());
        assert!(!scene.occluded(&ray, f32::MAX));
        assert!(scene.bounds().is_empty());
    }
}
