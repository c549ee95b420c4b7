//! Tile-parallel progressive renderer.
//!
//! [`RenderContext`] owns the framebuffer, camera and worker pool. Each pass
//! submits every [`Tile`] to the pool as one unit of work; a tile traces its
//! pixels with [`trace`] using its own random stream and accumulates into its
//! own cells.

pub mod camera;
pub mod config;
pub mod context;
pub mod framebuffer;
pub mod integrator;
pub mod pool;
pub mod sampling;

pub use camera::Camera;
pub use config::RenderConfig;
pub use context::RenderContext;
pub use framebuffer::{AccumCell, Framebuffer, Tile};
pub use integrator::{shade, trace};
pub use pool::ThreadPool;
