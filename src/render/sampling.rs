//! Random sampling helpers for the integrator and tile seeding.

use rand::Rng;

use crate::util::Vec3;

/// Uniform point inside the unit sphere (rejection sampling).
pub fn sample_in_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}

/// splitmix64 finalizer.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed for the tile at grid cell `(gx, gy)`. Depends only on the inputs,
/// never on scheduling order.
pub fn tile_seed(seed: u64, gx: u32, gy: u32) -> u64 {
    mix64(mix64(seed) ^ ((gy as u64) << 32 | gx as u64))
}
