//! SAH-based BVH builder.
//!
//! Splits a node's face range in place. Each level evaluates a fixed set of
//! equally spaced planes along the longest axis of the node's box and keeps
//! the cheapest one by Surface Area Heuristic. Faces are classified by
//! centroid. The two child subtrees share no mutable state once the parent's
//! range is partitioned, so they are built with `rayon::join`.

use crate::geom::{surface_area, Aabb, Triangle};
use crate::util::{Error, Result};

use super::BvhNode;

/// Number of candidate split planes per node.
pub const SPLIT_BUCKETS: usize = 8;

/// Nodes with fewer faces than this stay leaves.
pub const LEAF_FACES: usize = 16;

/// Cost of descending a node relative to one ray/triangle test.
const TRAVERSAL_COST: f32 = 0.2;

/// Subtrees at least this large are built on the rayon pool.
const PARALLEL_FACES: usize = 4096;

/// Best split candidate found so far.
struct Split {
    cost: f32,
    plane: f32,
    left: Aabb,
    right: Aabb,
    nleft: usize,
}

/// Build a subtree over `faces`, which starts at `first` in the owning face array.
///
/// `aabb` must bound every face in the range. On error the range may be
/// reordered, but every committed split was copied back whole, so the faces are
/// still all present exactly once.
pub fn build_sah(triangles: &[Triangle], faces: &mut [u32], first: usize, aabb: Aabb) -> Result<BvhNode> {
    let count = faces.len();
    let mut node = BvhNode::leaf(aabb, first, count);

    if count < LEAF_FACES {
        return Ok(node);
    }

    let ext = aabb.extent();
    let area = surface_area(ext.x, ext.y, ext.z);
    if !(area > 0.0) {
        return Ok(node);
    }

    let axis = aabb.longest_axis();
    node.axis = axis;

    let Some(best) = find_best_split(triangles, faces, &aabb, axis, area) else {
        return Ok(node);
    };

    // Splitting must beat testing every face in one leaf
    if best.cost > count as f32 {
        return Ok(node);
    }

    let mut scratch: Vec<u32> = Vec::new();
    scratch
        .try_reserve_exact(count)
        .map_err(|_| Error::BvhAlloc { what: "scratch buffer", faces: count })?;

    let plane3 = best.plane * 3.0;
    scratch.extend(faces.iter().copied().filter(|&f| triangles[f as usize].centroid_sum(axis) < plane3));
    scratch.extend(faces.iter().copied().filter(|&f| triangles[f as usize].centroid_sum(axis) >= plane3));
    debug_assert_eq!(scratch.len(), count);
    faces.copy_from_slice(&scratch);
    drop(scratch);

    let (lfaces, rfaces) = faces.split_at_mut(best.nleft);
    let rfirst = first + best.nleft;

    let (left, right) = if count >= PARALLEL_FACES {
        rayon::join(
            || build_sah(triangles, lfaces, first, best.left),
            || build_sah(triangles, rfaces, rfirst, best.right),
        )
    } else {
        (
            build_sah(triangles, lfaces, first, best.left),
            build_sah(triangles, rfaces, rfirst, best.right),
        )
    };

    node.count = 0;
    node.children = Some(Box::new([left?, right?]));
    Ok(node)
}

/// Evaluate every candidate plane along `axis`. Ties keep the lowest plane.
fn find_best_split(
    triangles: &[Triangle],
    faces: &[u32],
    aabb: &Aabb,
    axis: usize,
    area: f32,
) -> Option<Split> {
    let gap = aabb.extent()[axis] / SPLIT_BUCKETS as f32;
    let sp0 = aabb.min[axis] + gap * 0.5;

    let mut best: Option<Split> = None;
    for i in 0..SPLIT_BUCKETS {
        let plane = sp0 + i as f32 * gap;
        let Some(split) = eval_split(triangles, faces, axis, plane, area) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| split.cost < b.cost) {
            best = Some(split);
        }
    }
    best
}

/// SAH cost of splitting at `plane`, or `None` if one side would be empty.
fn eval_split(triangles: &[Triangle], faces: &[u32], axis: usize, plane: f32, area: f32) -> Option<Split> {
    let plane3 = plane * 3.0;
    let mut left = Aabb::EMPTY;
    let mut right = Aabb::EMPTY;
    let mut nleft = 0;

    for &f in faces {
        let tri = &triangles[f as usize];
        if tri.centroid_sum(axis) < plane3 {
            left.grow_face(tri);
            nleft += 1;
        } else {
            right.grow_face(tri);
        }
    }

    let nright = faces.len() - nleft;
    if nleft == 0 || nright == 0 {
        return None;
    }

    let cost = TRAVERSAL_COST + (left.area() * nleft as f32 + right.area() * nright as f32) / area;
    Some(Split { cost, plane, left, right, nleft })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::tests::make_tri;
    use crate::util::Vec3;

    fn bounds(tris: &[Triangle]) -> Aabb {
        let mut b = Aabb::EMPTY;
        for t in tris {
            b.grow_face(t);
        }
        b
    }

    fn collect_leaves<'a>(node: &'a BvhNode, out: &mut Vec<&'a BvhNode>) {
        match node.children() {
            Some([l, r]) => {
                collect_leaves(l, out);
                collect_leaves(r, out);
            }
            None => out.push(node),
        }
    }

    #[test]
    fn test_small_node_stays_leaf() {
        let tris: Vec<Triangle> = (0..LEAF_FACES - 1)
            .map(|i| make_tri(Vec3::new(i as f32 * 2.0, 0.0, 0.0), 0))
            .collect();
        let mut faces: Vec<u32> = (0..tris.len() as u32).collect();
        let node = build_sah(&tris, &mut faces, 0, bounds(&tris)).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.count, LEAF_FACES - 1);
    }

    #[test]
    fn test_many_triangles_builds_tree() {
        // 100 triangles spread along X axis -> should split into a tree
        let tris: Vec<Triangle> = (0..100)
            .map(|i| make_tri(Vec3::new(i as f32 * 2.0, 0.0, 0.0), 0))
            .collect();
        let mut faces: Vec<u32> = (0..100).collect();
        let node = build_sah(&tris, &mut faces, 0, bounds(&tris)).unwrap();

        assert!(!node.is_leaf(), "BVH should have internal nodes");
        assert_eq!(node.axis, 0);
        assert_eq!(node.count, 0);

        let mut leaves = Vec::new();
        collect_leaves(&node, &mut leaves);

        // Leaf ranges tile the face array without gaps or overlap
        leaves.sort_by_key(|n| n.first);
        let mut next = 0;
        for leaf in &leaves {
            assert_eq!(leaf.first, next);
            next += leaf.count;
        }
        assert_eq!(next, 100);

        let mut sorted = faces.clone();
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_children_boxes_within_parent() {
        let tris: Vec<Triangle> = (0..64)
            .map(|i| make_tri(Vec3::new((i % 8) as f32 * 3.0, (i / 8) as f32 * 3.0, 0.0), 0))
            .collect();
        let mut faces: Vec<u32> = (0..64).collect();
        let root = build_sah(&tris, &mut faces, 0, bounds(&tris)).unwrap();

        let mut stack = vec![&root];
        while let Some(node) = stack.pop() {
            if let Some([l, r]) = node.children() {
                assert!(node.aabb.contains(&l.aabb));
                assert!(node.aabb.contains(&r.aabb));
                stack.push(l);
                stack.push(r);
            }
        }
    }

    #[test]
    fn test_coincident_faces_stay_leaf() {
        // Every centroid identical: no plane separates them
        let tris: Vec<Triangle> = (0..40).map(|_| make_tri(Vec3::ZERO, 0)).collect();
        let mut faces: Vec<u32> = (0..40).collect();
        let node = build_sah(&tris, &mut faces, 0, bounds(&tris)).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.count, 40);
    }

    #[test]
    fn test_flat_box_is_degenerate() {
        // Zero-area box: a line of points along X
        let line = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let tris: Vec<Triangle> = (0..32).map(|i| make_tri(Vec3::new(i as f32, 0.0, 0.0), 0)).collect();
        let mut faces: Vec<u32> = (0..32).collect();
        let node = build_sah(&tris, &mut faces, 0, line).unwrap();
        assert!(node.is_leaf());
    }

    #[test]
    fn test_tie_prefers_first_plane() {
        // Two clusters far apart: every plane between them has equal cost
        let mut tris: Vec<Triangle> = (0..16).map(|_| make_tri(Vec3::ZERO, 0)).collect();
        tris.extend((0..16).map(|_| make_tri(Vec3::new(100.0, 0.0, 0.0), 0)));
        let faces: Vec<u32> = (0..32).collect();
        let b = bounds(&tris);
        let split = find_best_split(&tris, &faces, &b, 0, b.area()).unwrap();
        let gap = b.extent().x / SPLIT_BUCKETS as f32;
        assert!((split.plane - (b.min.x + gap * 0.5)).abs() < 1e-4);
        assert_eq!(split.nleft, 16);
    }
}
