//! Renderer state owned by the application loop.

use rand::Rng;

use crate::scene::Scene;
use crate::util::{Error, Mat4, Result, Vec2, Vec3};

use super::camera::Camera;
use super::config::RenderConfig;
use super::framebuffer::{Framebuffer, Tile};
use super::integrator::trace;
use super::pool::ThreadPool;

/// Everything a render pass reads, shared by all tiles.
struct Pass<'a> {
    scene: &'a Scene,
    camera: &'a Camera,
    width: u32,
    height: u32,
    samples: u32,
    max_depth: u32,
    sample: u32,
}

impl Pass<'_> {
    fn render_tile(&self, tile: &mut Tile) {
        let inv = 1.0 / self.samples as f32;
        tile.render(self.sample, |x, y, rng| {
            let mut sum = Vec3::ZERO;
            for _ in 0..self.samples {
                let jitter = Vec2::new(rng.random(), rng.random());
                let ray = self.camera.primary_ray(x, y, self.width, self.height, jitter);
                sum += trace(self.scene, &ray, 1.0, self.max_depth, rng);
            }
            sum * inv
        });
    }
}

/// Scene, camera, framebuffer and worker pool of one renderer.
#[derive(Debug)]
pub struct RenderContext {
    config: RenderConfig,
    scene: Scene,
    camera: Camera,
    framebuffer: Framebuffer,
    pool: ThreadPool,
    sample: u32,
}

impl RenderContext {
    pub fn new(config: RenderConfig, scene: Scene) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPool::new(config.threads)?;
        let framebuffer = Framebuffer::new(config.width, config.height, config.tile_size, config.seed)?;
        tracing::info!(
            width = config.width,
            height = config.height,
            tiles = framebuffer.tiles().len(),
            threads = pool.num_threads(),
            "render context ready"
        );

        Ok(Self {
            camera: Camera::new(Mat4::IDENTITY, config.fov),
            config,
            scene,
            framebuffer,
            pool,
            sample: 0,
        })
    }

    /// Recreate the tile grid for a new image size. Accumulation restarts.
    #[tracing::instrument(skip(self))]
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        self.framebuffer = Framebuffer::new(width, height, self.config.tile_size, self.config.seed)?;
        self.config.width = width;
        self.config.height = height;
        self.sample = 0;
        Ok(())
    }

    /// Replace the view. A changed camera invalidates accumulated samples.
    pub fn set_camera(&mut self, camera: Camera) {
        if camera != self.camera {
            self.camera = camera;
            self.sample = 0;
        }
    }

    /// Render one pass at the current sample index and advance it.
    pub fn render(&mut self) -> Result<()> {
        self.render_sample(self.sample)
    }

    /// Render every tile at `index` and wait for all of them.
    ///
    /// On failure the sample index goes back to 0 so the next pass
    /// re-initializes every cell.
    #[tracing::instrument(skip(self), fields(tiles = self.framebuffer.tiles().len()))]
    pub fn render_sample(&mut self, index: u32) -> Result<()> {
        let pass = Pass {
            scene: &self.scene,
            camera: &self.camera,
            width: self.framebuffer.width(),
            height: self.framebuffer.height(),
            samples: self.config.samples,
            max_depth: self.config.max_depth,
            sample: index,
        };

        match self.pool.run_batch(self.framebuffer.tiles_mut(), |tile| pass.render_tile(tile)) {
            Ok(()) => {
                self.sample = index + 1;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "render pass aborted");
                self.sample = 0;
                Err(e)
            }
        }
    }

    /// Drop accumulated samples; the next pass starts from sample 0.
    pub fn reset_accumulation(&mut self) {
        self.sample = 0;
    }

    /// Index the next [`render`](Self::render) call will use.
    pub fn sample_index(&self) -> u32 {
        self.sample
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access, e.g. to rebuild dynamic content between passes.
    /// Accumulation restarts since the image content may change.
    pub fn scene_mut(&mut self) -> &mut Scene {
        self.sample = 0;
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }
}
