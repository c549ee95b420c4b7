//! Procedural demo level.
//!
//! A closed room lit by an emissive ceiling panel, with a checkered floor
//! and a few boxes showing off the diffuse, metal and glass paths.

use std::sync::Arc;

use crate::material::Material;
use crate::texture::Texture;
use crate::util::{Mat4, Vec3};

use super::Mesh;

/// Room half-width along x and z.
const ROOM_HALF: f32 = 4.0;
const ROOM_HEIGHT: f32 = 3.2;

/// Room surfaces are split into this many cells per side so the BVH has
/// something to partition.
const WALL_CELLS: u32 = 8;

/// Background seen through nothing: the room is closed, so this only shows
/// up when a path runs out of depth.
pub const BACKGROUND: Vec3 = Vec3::new(0.05, 0.05, 0.08);

fn checker(size: u32, a: Vec3, b: Vec3) -> Texture {
    let pixels = (0..size * size)
        .map(|i| if ((i % size) + (i / size)) % 2 == 0 { a } else { b })
        .collect();
    // size > 0 and the pixel count matches by construction
    Texture::from_pixels(size, size, pixels).unwrap_or_else(|| unreachable!())
}

/// All meshes of the demo level.
pub fn level() -> Vec<Mesh> {
    let (h, y) = (ROOM_HALF, ROOM_HEIGHT);
    let p = Vec3::new;

    let mut floor_mtl = Material::diffuse("floor", Vec3::ONE);
    floor_mtl.color = Arc::new(checker(8, Vec3::splat(0.8), Vec3::splat(0.2))).into();
    let mut floor = Mesh::new("floor", floor_mtl);
    floor.push_patch(p(-h, 0.0, h), p(h, 0.0, h), p(h, 0.0, -h), p(-h, 0.0, -h), WALL_CELLS);

    let mut ceiling = Mesh::new("ceiling", Material::diffuse("white", Vec3::splat(0.75)));
    ceiling.push_patch(p(-h, y, -h), p(h, y, -h), p(h, y, h), p(-h, y, h), WALL_CELLS);

    let mut back = Mesh::new("back", Material::diffuse("white", Vec3::splat(0.75)));
    back.push_patch(p(-h, 0.0, -h), p(h, 0.0, -h), p(h, y, -h), p(-h, y, -h), WALL_CELLS);
    back.push_patch(p(h, 0.0, h), p(-h, 0.0, h), p(-h, y, h), p(h, y, h), WALL_CELLS);

    let mut left = Mesh::new("left", Material::diffuse("red", Vec3::new(0.7, 0.12, 0.1)));
    left.push_patch(p(-h, 0.0, h), p(-h, 0.0, -h), p(-h, y, -h), p(-h, y, h), WALL_CELLS);

    let mut right = Mesh::new("right", Material::diffuse("green", Vec3::new(0.12, 0.6, 0.15)));
    right.push_patch(p(h, 0.0, -h), p(h, 0.0, h), p(h, y, h), p(h, y, -h), WALL_CELLS);

    let mut lamp = Mesh::new(
        "lamp",
        Material::emissive("lamp", Vec3::splat(0.8), Vec3::splat(6.0)),
    );
    lamp.push_quad(
        p(-1.0, y - 0.01, -1.0),
        p(1.0, y - 0.01, -1.0),
        p(1.0, y - 0.01, 1.0),
        p(-1.0, y - 0.01, 1.0),
    );
    // Downward-facing: swap winding so the light faces the room
    for face in &mut lamp.faces {
        face.swap(1, 2);
        for v in face.iter_mut() {
            v.norm = -Vec3::Y;
        }
    }

    let mut pillar = Mesh::new("pillar", Material::diffuse("clay", Vec3::new(0.8, 0.6, 0.4)));
    pillar.push_cuboid(p(-2.6, 0.0, -2.6), p(-1.4, 2.2, -1.4));

    let mut chrome = Mesh::new("chrome", Material::metal("chrome", Vec3::splat(0.9), 0.05));
    chrome.push_cuboid(p(0.6, 0.0, -2.4), p(1.8, 1.2, -1.2));

    let mut glass = Mesh::new("glass", Material::glass("glass", 1.5));
    glass.push_cuboid(p(-0.9, 0.0, -0.6), p(0.1, 1.0, 0.4));

    vec![floor, ceiling, back, left, right, lamp, pillar, chrome, glass]
}

/// Camera-to-world transform looking into the room from the front wall.
pub fn camera_xform() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 1.6, ROOM_HALF - 0.4)) * Mat4::from_rotation_x(-0.12)
}
