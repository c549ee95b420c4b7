//! Surface materials and the de-duplicated material table.
//!
//! Every shading attribute is independently either a constant or a texture
//! lookup at the hit's texture coordinate. Materials are immutable once the
//! scene is built; triangles refer to them by [`MaterialId`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::texture::Texture;
use crate::util::{Vec2, Vec3};

/// Index into a scene's [`MaterialTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialId(pub u32);

/// A material attribute: constant value or texture lookup.
#[derive(Debug, Clone)]
pub enum Attribute {
    Constant(Vec3),
    Texture(Arc<Texture>),
}

impl Attribute {
    #[inline]
    pub fn resolve(&self, uv: Vec2) -> Vec3 {
        match self {
            Self::Constant(v) => *v,
            Self::Texture(tex) => tex.sample(uv),
        }
    }
}

impl From<Vec3> for Attribute {
    fn from(v: Vec3) -> Self {
        Self::Constant(v)
    }
}

impl From<f32> for Attribute {
    fn from(v: f32) -> Self {
        Self::Constant(Vec3::splat(v))
    }
}

impl From<Arc<Texture>> for Attribute {
    fn from(tex: Arc<Texture>) -> Self {
        Self::Texture(tex)
    }
}

/// Material attributes resolved at one surface point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub color: Vec3,
    pub emission: Vec3,
    pub transmittance: Vec3,
    /// Clamped to [0, 1]; splits the energy between diffuse and specular
    pub roughness: f32,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub color: Attribute,
    pub emission: Attribute,
    pub transmittance: Attribute,
    pub roughness: Attribute,
    pub ior: f32,
    pub metal: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            color: Vec3::splat(0.8).into(),
            emission: Vec3::ZERO.into(),
            transmittance: Vec3::ZERO.into(),
            roughness: 1.0.into(),
            ior: 1.5,
            metal: false,
        }
    }
}

impl Material {
    /// Pure diffuse surface.
    pub fn diffuse(name: impl Into<String>, color: Vec3) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            ..Default::default()
        }
    }

    /// Metal tinted by `color`; specular lobe width set by `roughness`.
    pub fn metal(name: impl Into<String>, color: Vec3, roughness: f32) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            roughness: roughness.into(),
            metal: true,
            ..Default::default()
        }
    }

    /// Smooth transmissive dielectric.
    pub fn glass(name: impl Into<String>, ior: f32) -> Self {
        Self {
            name: name.into(),
            color: Vec3::ONE.into(),
            transmittance: Vec3::ONE.into(),
            roughness: 0.0.into(),
            ior,
            ..Default::default()
        }
    }

    /// Light source; also reflects diffusely with `color`.
    pub fn emissive(name: impl Into<String>, color: Vec3, emission: Vec3) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            emission: emission.into(),
            ..Default::default()
        }
    }

    /// Resolve every attribute at texture coordinate `uv`.
    pub fn resolve(&self, uv: Vec2) -> SurfaceSample {
        SurfaceSample {
            color: self.color.resolve(uv),
            emission: self.emission.resolve(uv),
            transmittance: self.transmittance.resolve(uv),
            roughness: self.roughness.resolve(uv).x.clamp(0.0, 1.0),
        }
    }

    /// True if some light can pass through this material.
    pub fn is_transmissive(&self, surf: &SurfaceSample) -> bool {
        !self.metal && surf.transmittance.max_element() > 0.0
    }
}

/// Materials de-duplicated by name.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material, or return the id of the one already registered under its name.
    pub fn insert(&mut self, material: Material) -> MaterialId {
        if let Some(&id) = self.by_name.get(&material.name) {
            return id;
        }
        let id = MaterialId(self.materials.len() as u32);
        self.by_name.insert(material.name.clone(), id);
        self.materials.push(material);
        id
    }

    #[inline]
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
