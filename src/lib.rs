//! # Cyberay
//!
//! Interactive CPU path tracer: a surface-area-heuristic BVH over triangle
//! arenas, a ray/triangle kernel, and a tile-parallel progressive integrator.
//!
//! ## Modules
//!
//! - [`util`] - Errors, `glam` re-exports, ray and optics helpers
//! - [`geom`] - Vertices, triangles, bounding boxes, intersection kernel
//! - [`bvh`] - SAH builder and nearest/any-hit traversal
//! - [`texture`] - 2-D RGB sampler
//! - [`material`] - Materials and the de-duplicated material table
//! - [`scene`] - Static + dynamic scene aggregate, demo level
//! - [`render`] - Camera, integrator, tiles, worker pool, render context
//!
//! ## Example
//!
//! ```ignore
//! use cyberay::prelude::*;
//!
//! let scene = Scene::new(demo::level(), demo::BACKGROUND)?;
//! let mut ctx = RenderContext::new(RenderConfig::default(), scene)?;
//! ctx.set_camera(Camera::new(demo::camera_xform(), 50.0));
//! for _ in 0..16 {
//!     ctx.render()?;
//! }
//! ctx.framebuffer().to_rgb8().save("out.png")?;
//! ```

pub mod util;
pub mod geom;
pub mod bvh;
pub mod texture;
pub mod material;
pub mod scene;
pub mod render;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, Ray, Mat4, Vec2, Vec3};
    pub use crate::geom::{Aabb, RayHit, Triangle, Vertex};
    pub use crate::bvh::{Bvh, BvhNode, HitMode};
    pub use crate::material::{Material, MaterialId, MaterialTable};
    pub use crate::texture::Texture;
    pub use crate::scene::{demo, Mesh, Scene};
    pub use crate::render::{Camera, Framebuffer, RenderConfig, RenderContext, ThreadPool};
}
