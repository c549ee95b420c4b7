//! Recursive Monte Carlo path tracer.
//!
//! Every call draws one uniform number and splits the unit interval into a
//! diffuse probability `energy * roughness` and a specular probability
//! `energy * (1 - roughness)`. The probability that a branch continues is the
//! energy handed to the recursive call, so deep paths die out on their own;
//! `depth` is the hard floor that guarantees termination.
//!
//! The random stream is passed in explicitly, so a caller with a seeded RNG
//! gets a deterministic result.

use rand::Rng;

use crate::geom::RayHit;
use crate::scene::Scene;
use crate::util::{reflect, refract, schlick, Ray, Vec3};

use super::sampling::sample_in_sphere;

/// Distance secondary rays start off the surface, along the normal.
pub const SECONDARY_OFFSET: f32 = 1e-4;

/// Radiance arriving along `ray`.
pub fn trace<R: Rng + ?Sized>(scene: &Scene, ray: &Ray, energy: f32, depth: u32, rng: &mut R) -> Vec3 {
    debug_assert!(energy <= 1.0, "path energy {energy} exceeds 1");
    if depth == 0 {
        return scene.background();
    }
    match scene.intersect(ray, f32::MAX) {
        Some(hit) => shade(scene, &hit, energy, depth, rng),
        None => scene.background(),
    }
}

/// Radiance leaving `hit` back along the incoming ray.
pub fn shade<R: Rng + ?Sized>(scene: &Scene, hit: &RayHit, energy: f32, depth: u32, rng: &mut R) -> Vec3 {
    let Some(mtl) = scene.material(hit.material) else {
        debug_assert!(false, "triangle references unknown material {:?}", hit.material);
        return Vec3::ZERO;
    };

    let dir = hit.ray.dir.normalize_or_zero();
    let entering = hit.face_norm.dot(dir) < 0.0;

    // Two-sided shading
    let mut norm = hit.v.norm.try_normalize().unwrap_or(hit.face_norm);
    if norm.dot(dir) > 0.0 {
        norm = -norm;
    }

    let surf = mtl.resolve(hit.v.tex);
    let mut color = surf.emission;

    let p_diffuse = energy * surf.roughness;
    let p_specular = energy * (1.0 - surf.roughness);
    let r: f32 = rng.random();

    if r <= p_diffuse {
        let mut out = (sample_in_sphere(rng) + norm).try_normalize().unwrap_or(norm);
        if out.dot(norm) < 0.0 {
            out = -out;
        }
        let ray = Ray::new(hit.v.pos + norm * SECONDARY_OFFSET, out);
        color += trace(scene, &ray, p_diffuse, depth - 1, rng) * surf.color;
    } else if r <= p_diffuse + p_specular {
        let mut out = reflect(dir, norm);
        // Side of the surface the outgoing ray must leave from
        let mut side = norm;

        if mtl.is_transmissive(&surf) {
            let eta = if entering { 1.0 / mtl.ior } else { mtl.ior };
            let fresnel = schlick(-dir.dot(norm), mtl.ior);
            if let Some(t) = refract(dir, norm, eta) {
                if rng.random::<f32>() >= fresnel {
                    out = t;
                    side = -norm;
                }
            }
        }

        if surf.roughness > 0.0 {
            out += sample_in_sphere(rng) * surf.roughness;
        }
        let out = out.normalize_or_zero();

        // Perturbed below the surface: the sample contributes nothing
        if out.dot(side) > 0.0 {
            let ray = Ray::new(hit.v.pos + side * SECONDARY_OFFSET, out);
            let rad = trace(scene, &ray, p_specular, depth - 1, rng);
            color += if mtl.metal { rad * surf.color } else { rad };
        }
    }

    color
}
