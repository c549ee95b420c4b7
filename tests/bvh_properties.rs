//! Structural and query properties of built BVH trees over random triangle soups.

use cyberay::bvh::{Bvh, HitMode};
use cyberay::geom::{ray_triangle, Triangle, Vertex};
use cyberay::material::MaterialId;
use cyberay::util::{Ray, Vec2, Vec3};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rand_vec(rng: &mut StdRng, range: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(-range..range),
        rng.random_range(-range..range),
        rng.random_range(-range..range),
    )
}

/// Small triangles scattered through a cube.
fn soup(n: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let c = rand_vec(&mut rng, 20.0);
            let v = |p: Vec3| Vertex::new(p, Vec3::Z, Vec2::ZERO);
            Triangle::new(
                [v(c + rand_vec(&mut rng, 1.0)), v(c + rand_vec(&mut rng, 1.0)), v(c + rand_vec(&mut rng, 1.0))],
                MaterialId(0),
            )
        })
        .collect()
}

fn build(tris: &[Triangle]) -> Bvh {
    let mut bvh = Bvh::empty();
    bvh.append(tris, 0..tris.len()).expect("append");
    bvh.build(tris).expect("build");
    bvh
}

fn brute_force(tris: &[Triangle], ray: &Ray, t_max: f32) -> Option<f32> {
    tris.iter()
        .filter_map(|t| ray_triangle(ray, t, t_max))
        .map(|h| h.t)
        .min_by(|a, b| a.total_cmp(b))
}

#[test]
fn test_leaves_hold_every_face_once() {
    let tris = soup(3000, 1);
    let bvh = build(&tris);

    let mut seen: Vec<u32> = bvh
        .nodes()
        .into_iter()
        .filter(|n| n.is_leaf())
        .flat_map(|n| bvh.node_faces(n).iter().copied())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..3000).collect::<Vec<u32>>());

    let stats = bvh.stats();
    assert_eq!(stats.nodes, 2 * stats.leaves - 1);
    assert!(stats.leaves > 1);
}

#[test]
fn test_child_boxes_inside_parent() {
    let tris = soup(2000, 2);
    let bvh = build(&tris);

    for node in bvh.nodes() {
        match node.children() {
            Some([l, r]) => {
                assert_eq!(node.count, 0);
                assert!(node.aabb.contains(&l.aabb));
                assert!(node.aabb.contains(&r.aabb));
            }
            None => {
                for &f in bvh.node_faces(node) {
                    assert!(node.aabb.contains(&tris[f as usize].aabb()));
                }
            }
        }
    }
}

#[test]
fn test_closest_hit_matches_brute_force() {
    let tris = soup(1500, 3);
    let bvh = build(&tris);
    let mut rng = StdRng::seed_from_u64(99);

    let mut hits = 0;
    for i in 0..500 {
        let origin = rand_vec(&mut rng, 30.0);
        // Aim half the rays at a triangle so plenty of them hit
        let dir = if i % 2 == 0 {
            tris[rng.random_range(0..tris.len())].centroid() - origin
        } else {
            rand_vec(&mut rng, 1.0)
        };
        let ray = Ray::new(origin, dir);
        let t_max = if i % 5 == 0 { 0.5 } else { f32::MAX };

        let expect = brute_force(&tris, &ray, t_max);
        let got = bvh.intersect(&tris, &ray, t_max);
        match (expect, &got) {
            (None, None) => {}
            (Some(t), Some(hit)) => {
                assert!((hit.t - t).abs() <= 1e-5 * t.max(1.0), "ray {i}: bvh {} brute {t}", hit.t);
                hits += 1;
            }
            _ => panic!("ray {i}: bvh {:?} brute {:?}", got.as_ref().map(|h| h.t), expect),
        }

        // Any-hit agrees with closest-hit on whether something was hit
        assert_eq!(bvh.any_hit(&tris, &ray, t_max), expect.is_some(), "ray {i}");
        if let Some(any) = bvh.query(&tris, &ray, t_max, HitMode::Any) {
            assert!(any.t <= t_max);
            assert!(any.t >= expect.unwrap_or(f32::MAX) - 1e-5);
        }
    }
    assert!(hits > 100, "only {hits} hits");
}

#[test]
fn test_axis_aligned_rays() {
    // Zero direction components exercise the infinite slab bounds
    let tris = soup(800, 4);
    let bvh = build(&tris);
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..200 {
        let origin = rand_vec(&mut rng, 25.0);
        for dir in [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z] {
            let ray = Ray::new(origin, dir);
            let expect = brute_force(&tris, &ray, f32::MAX);
            let got = bvh.intersect(&tris, &ray, f32::MAX).map(|h| h.t);
            assert_eq!(expect.is_some(), got.is_some());
            if let (Some(a), Some(b)) = (expect, got) {
                assert!((a - b).abs() < 1e-4);
            }
        }
    }
}

#[test]
fn test_rebuild_after_append() {
    let tris = soup(600, 6);
    let mut bvh = Bvh::empty();
    bvh.append(&tris, 0..300).unwrap();
    bvh.build(&tris).unwrap();
    bvh.append(&tris, 300..600).unwrap();
    assert!(bvh.root().is_leaf());
    assert_eq!(bvh.root().count, 600);
    bvh.build(&tris).unwrap();

    let mut seen: Vec<u32> = bvh.nodes().into_iter().flat_map(|n| bvh.node_faces(n).to_vec()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..600).collect::<Vec<u32>>());
}
