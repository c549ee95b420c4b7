//! Progressive accumulation framebuffer, split into independently owned tiles.

use image::{Rgb, Rgb32FImage, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::util::{Error, Result, Vec3, GAMMA};

use super::sampling::tile_seed;

/// Running radiance sum for one pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumCell {
    pub sum: Vec3,
    pub count: u32,
}

impl AccumCell {
    /// Mean of the accumulated samples, black before the first one.
    #[inline]
    pub fn value(&self) -> Vec3 {
        if self.count == 0 {
            Vec3::ZERO
        } else {
            self.sum / self.count as f32
        }
    }
}

/// Rectangular framebuffer region rendered as one unit of work.
///
/// Owns its accumulation cells and its random stream, so tiles never share
/// mutable state during a pass.
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    sample: u32,
    seed: u64,
    rng: StdRng,
    cells: Vec<AccumCell>,
}

impl Tile {
    fn new(x: u32, y: u32, width: u32, height: u32, seed: u64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            sample: 0,
            seed,
            rng: StdRng::seed_from_u64(seed),
            cells: vec![AccumCell::default(); width as usize * height as usize],
        }
    }

    /// Sample index of the last pass that rendered this tile.
    pub fn sample(&self) -> u32 {
        self.sample
    }

    /// Cell at tile-local coordinates.
    pub fn cell(&self, lx: u32, ly: u32) -> Option<&AccumCell> {
        if lx >= self.width || ly >= self.height {
            return None;
        }
        self.cells.get(ly as usize * self.width as usize + lx as usize)
    }

    /// Render one pass: `pixel(x, y, rng)` is called for every pixel in
    /// row-major order with framebuffer coordinates.
    ///
    /// Sample 0 reseeds the stream and overwrites every cell; later samples
    /// add to the running sums.
    pub fn render<F>(&mut self, sample: u32, mut pixel: F)
    where
        F: FnMut(u32, u32, &mut StdRng) -> Vec3,
    {
        if sample == 0 {
            self.rng = StdRng::seed_from_u64(self.seed);
        }
        self.sample = sample;

        let mut idx = 0;
        for ly in 0..self.height {
            for lx in 0..self.width {
                let value = pixel(self.x + lx, self.y + ly, &mut self.rng);
                let cell = &mut self.cells[idx];
                if sample == 0 {
                    *cell = AccumCell { sum: value, count: 1 };
                } else {
                    cell.sum += value;
                    cell.count += 1;
                }
                idx += 1;
            }
        }
    }
}

/// Grid of tiles covering a `width x height` image.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
    tiles: Vec<Tile>,
}

impl Framebuffer {
    /// Lay out tiles of `tile_size` (edge tiles are clipped) and seed each
    /// from its grid coordinate.
    pub fn new(width: u32, height: u32, tile_size: u32, seed: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        if tile_size == 0 {
            return Err(Error::config("tile_size must be > 0"));
        }

        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);
        let mut tiles = Vec::with_capacity(tiles_x as usize * tiles_y as usize);
        for gy in 0..tiles_y {
            for gx in 0..tiles_x {
                let (x, y) = (gx * tile_size, gy * tile_size);
                let w = tile_size.min(width - x);
                let h = tile_size.min(height - y);
                tiles.push(Tile::new(x, y, w, h, tile_seed(seed, gx, gy)));
            }
        }

        Ok(Self {
            width,
            height,
            tile_size,
            tiles_x,
            tiles_y,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tile counts along x and y.
    pub fn grid(&self) -> (u32, u32) {
        (self.tiles_x, self.tiles_y)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    fn cell(&self, x: u32, y: u32) -> Option<&AccumCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let (gx, gy) = (x / self.tile_size, y / self.tile_size);
        let tile = self.tiles.get(gy as usize * self.tiles_x as usize + gx as usize)?;
        tile.cell(x - tile.x, y - tile.y)
    }

    /// Accumulated mean at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec3> {
        self.cell(x, y).map(AccumCell::value)
    }

    /// Number of samples accumulated at `(x, y)`.
    pub fn sample_count(&self, x: u32, y: u32) -> Option<u32> {
        self.cell(x, y).map(|c| c.count)
    }

    /// Row-major pixel means.
    pub fn resolve(&self) -> Vec<Vec3> {
        let width = self.width as usize;
        let mut out = vec![Vec3::ZERO; width * self.height as usize];
        for tile in &self.tiles {
            let tw = tile.width as usize;
            for ly in 0..tile.height as usize {
                let row = (tile.y as usize + ly) * width + tile.x as usize;
                let src = &tile.cells[ly * tw..(ly + 1) * tw];
                for (dst, cell) in out[row..row + tw].iter_mut().zip(src) {
                    *dst = cell.value();
                }
            }
        }
        out
    }

    /// Linear float image, for HDR output formats.
    pub fn to_rgb32f(&self) -> Option<Rgb32FImage> {
        let data: Vec<f32> = bytemuck::cast_vec(self.resolve());
        Rgb32FImage::from_raw(self.width, self.height, data)
    }

    /// 8-bit image with clamping and gamma correction.
    pub fn to_rgb8(&self) -> RgbImage {
        let pixels = self.resolve();
        let encode = |c: f32| (c.clamp(0.0, 1.0).powf(1.0 / GAMMA) * 255.0 + 0.5) as u8;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let c = pixels[y as usize * self.width as usize + x as usize];
            Rgb([encode(c.x), encode(c.y), encode(c.z)])
        })
    }
}
