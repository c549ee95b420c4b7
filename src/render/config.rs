//! Render configuration record.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Upper bound on `max_depth`; the integrator recurses once per bounce.
pub const MAX_DEPTH_LIMIT: u32 = 64;

/// Settings consumed by the renderer. Missing JSON fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    // Framebuffer
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,

    // Integrator
    /// Jittered primary rays averaged into one accumulation sample
    pub samples: u32,
    /// Maximum path depth
    pub max_depth: u32,
    pub seed: u64,

    // Pool: 0 picks one worker per logical CPU
    pub threads: usize,

    // Camera: vertical field of view in degrees
    pub fov: f32,

    // Output image size relative to the framebuffer
    pub scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            tile_size: 32,
            samples: 2,
            max_depth: 6,
            seed: 0,
            threads: 0,
            fov: 50.0,
            scale: 1.0,
        }
    }
}

impl RenderConfig {
    /// Check every range constraint, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidSize { width: self.width, height: self.height });
        }
        if self.tile_size == 0 {
            return Err(Error::config("tile_size must be > 0"));
        }
        if self.samples == 0 {
            return Err(Error::config("samples must be > 0"));
        }
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(Error::config(format!(
                "max_depth must be in 1..={MAX_DEPTH_LIMIT}, got {}",
                self.max_depth
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(Error::config(format!("fov must be in (0, 180), got {}", self.fov)));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::config(format!("scale must be a positive number, got {}", self.scale)));
        }
        Ok(())
    }

    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Number of tiles along x and y.
    pub fn tile_grid(&self) -> (u32, u32) {
        (self.width.div_ceil(self.tile_size), self.height.div_ceil(self.tile_size))
    }

    /// Framebuffer size multiplied by `scale`, at least one pixel each way.
    pub fn output_size(&self) -> (u32, u32) {
        let scaled = |n: u32| ((n as f32 * self.scale).round() as u32).max(1);
        (scaled(self.width), scaled(self.height))
    }
}
