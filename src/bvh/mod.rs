//! Bounding-volume hierarchy over a triangle arena.
//!
//! The [`Bvh`] owns a single array of face indices into the scene's triangle
//! arena. Every node refers to a contiguous `first..first + count` range of
//! that array; the builder reorders it in place, so leaves never copy faces.
//!
//! ## Layout
//! ```text
//! faces: [ 7 3 9 | 0 4 | 8 1 2 6 5 ]
//!          leaf A  leaf B  leaf C
//! ```

pub mod build;

use std::ops::Range;
use std::time::Instant;

use smallvec::SmallVec;

use crate::geom::{ray_aabb_any, ray_triangle_t, Aabb, RayHit, Triangle};
use crate::util::{Error, Ray, Result, Vec3};

pub use build::{build_sah, LEAF_FACES, SPLIT_BUCKETS};

/// BVH tree node.
///
/// Leaf: `children` is `None` and `first..first + count` are its faces.
/// Internal: exactly two children and `count == 0`.
#[derive(Debug)]
pub struct BvhNode {
    pub aabb: Aabb,
    /// Split axis (0=x, 1=y, 2=z); meaningful on internal nodes
    pub axis: usize,
    pub first: usize,
    pub count: usize,
    pub(crate) children: Option<Box<[BvhNode; 2]>>,
}

impl BvhNode {
    pub fn leaf(aabb: Aabb, first: usize, count: usize) -> Self {
        Self {
            aabb,
            axis: 0,
            first,
            count,
            children: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn children(&self) -> Option<&[BvhNode; 2]> {
        self.children.as_deref()
    }

    /// Face-array range held directly by this node (empty for internal nodes).
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.first..self.first + self.count
    }
}

/// Query mode for [`Bvh::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMode {
    /// Nearest hit along the ray
    Closest,
    /// First hit found, in traversal order
    Any,
}

/// Tree shape summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub max_leaf_faces: usize,
}

/// Face-index arena plus the tree built over it.
#[derive(Debug)]
pub struct Bvh {
    faces: Vec<u32>,
    root: BvhNode,
}

impl Default for Bvh {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bvh {
    /// Single empty leaf with the empty-box sentinel.
    pub fn empty() -> Self {
        Self {
            faces: Vec::new(),
            root: BvhNode::leaf(Aabb::EMPTY, 0, 0),
        }
    }

    /// Add faces `range` of the triangle arena to the root, growing its box.
    ///
    /// Any previously built tree is discarded; call [`Bvh::build`] afterwards.
    pub fn append(&mut self, triangles: &[Triangle], range: Range<usize>) -> Result<()> {
        let newsz = self.faces.len() + range.len();
        self.faces
            .try_reserve(range.len())
            .map_err(|_| Error::BvhAlloc { what: "face array", faces: newsz })?;

        self.flatten();
        for f in range {
            self.root.aabb.grow_face(&triangles[f]);
            self.faces.push(f as u32);
        }
        self.root.count = self.faces.len();
        Ok(())
    }

    /// Run the SAH builder over the root.
    ///
    /// On failure the root is left as one leaf covering every face, which is
    /// still a valid (if slow) tree.
    #[tracing::instrument(skip_all, fields(faces = self.faces.len()))]
    pub fn build(&mut self, triangles: &[Triangle]) -> Result<()> {
        self.flatten();
        let start = Instant::now();
        let aabb = self.root.aabb;

        self.root = build_sah(triangles, &mut self.faces, 0, aabb)?;

        let stats = self.stats();
        tracing::info!(
            nodes = stats.nodes,
            leaves = stats.leaves,
            depth = stats.max_depth,
            "BVH construction took: {} msec",
            start.elapsed().as_millis()
        );
        Ok(())
    }

    #[inline]
    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    /// The face-index array that leaf ranges point into.
    #[inline]
    pub fn faces(&self) -> &[u32] {
        &self.faces
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Face indices referenced by a node's own range.
    #[inline]
    pub fn node_faces(&self, node: &BvhNode) -> &[u32] {
        &self.faces[node.range()]
    }

    /// All nodes, parents before children.
    pub fn nodes(&self) -> Vec<&BvhNode> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some([l, r]) = node.children() {
                stack.push(r);
                stack.push(l);
            }
        }
        out
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        let mut stack = vec![(&self.root, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            match node.children() {
                Some([l, r]) => {
                    stack.push((l, depth + 1));
                    stack.push((r, depth + 1));
                }
                None => {
                    stats.leaves += 1;
                    stats.max_leaf_faces = stats.max_leaf_faces.max(node.count);
                }
            }
        }
        stats
    }

    /// Nearest hit within `t_max`.
    pub fn intersect(&self, triangles: &[Triangle], ray: &Ray, t_max: f32) -> Option<RayHit> {
        self.query(triangles, ray, t_max, HitMode::Closest)
    }

    /// Does anything block `ray` within `t_max`?
    pub fn any_hit(&self, triangles: &[Triangle], ray: &Ray, t_max: f32) -> bool {
        self.traverse(triangles, ray, t_max, HitMode::Any).is_some()
    }

    pub fn query(&self, triangles: &[Triangle], ray: &Ray, t_max: f32, mode: HitMode) -> Option<RayHit> {
        let (face, t, bc) = self.traverse(triangles, ray, t_max, mode)?;
        Some(RayHit::new(ray, &triangles[face as usize], t, bc))
    }

    /// Explicit-stack traversal. Closest mode shrinks the search distance as
    /// hits are found, and visits the child on the near side of the split first.
    fn traverse(&self, triangles: &[Triangle], ray: &Ray, t_max: f32, mode: HitMode) -> Option<(u32, f32, Vec3)> {
        let mut best: Option<(u32, f32, Vec3)> = None;
        let mut t_best = t_max;

        let mut stack: SmallVec<[&BvhNode; 64]> = SmallVec::new();
        stack.push(&self.root);

        while let Some(node) = stack.pop() {
            if !ray_aabb_any(ray, &node.aabb, t_best) {
                continue;
            }

            if let Some([l, r]) = node.children() {
                if ray.dir[node.axis] < 0.0 {
                    stack.push(l);
                    stack.push(r);
                } else {
                    stack.push(r);
                    stack.push(l);
                }
                continue;
            }

            for &f in self.node_faces(node) {
                let Some((t, bc)) = ray_triangle_t(ray, &triangles[f as usize], t_best) else {
                    continue;
                };
                if mode == HitMode::Any {
                    return Some((f, t, bc));
                }
                if best.is_none() || t < t_best {
                    best = Some((f, t, bc));
                    t_best = t;
                }
            }
        }
        best
    }

    /// Collapse the tree back to a single root leaf over all faces.
    fn flatten(&mut self) {
        if let Some(children) = self.root.children.take() {
            drop_subtrees(children);
        }
        self.root.first = 0;
        self.root.count = self.faces.len();
    }
}

impl Drop for Bvh {
    fn drop(&mut self) {
        if let Some(children) = self.root.children.take() {
            drop_subtrees(children);
        }
    }
}

/// Free a subtree without recursion, so very unbalanced trees cannot exhaust the stack.
fn drop_subtrees(children: Box<[BvhNode; 2]>) {
    let mut stack = vec![children];
    while let Some(pair) = stack.pop() {
        let [mut l, mut r] = *pair;
        for node in [&mut l, &mut r] {
            if let Some(grand) = node.children.take() {
                stack.push(grand);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::tests::make_tri;
    use crate::geom::ray_triangle;

    fn grid(n: usize) -> Vec<Triangle> {
        (0..n * n)
            .map(|i| make_tri(Vec3::new((i % n) as f32 * 2.0, (i / n) as f32 * 2.0, -((i % 7) as f32)), 0))
            .collect()
    }

    fn built(tris: &[Triangle]) -> Bvh {
        let mut bvh = Bvh::empty();
        bvh.append(tris, 0..tris.len()).unwrap();
        bvh.build(tris).unwrap();
        bvh
    }

    #[test]
    fn test_empty_bvh() {
        let bvh = Bvh::empty();
        assert!(bvh.is_empty());
        assert!(bvh.root().aabb.is_empty());
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(bvh.intersect(&[], &ray, f32::MAX).is_none());
        assert!(!bvh.any_hit(&[], &ray, f32::MAX));
    }

    #[test]
    fn test_single_triangle() {
        let tris = vec![make_tri(Vec3::ZERO, 0)];
        let bvh = built(&tris);
        assert!(bvh.root().is_leaf());
        assert_eq!(bvh.root().count, 1);

        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), -Vec3::Z);
        let hit = bvh.intersect(&tris, &ray, f32::MAX).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_append_grows_root_box() {
        let tris = grid(4);
        let mut bvh = Bvh::empty();
        bvh.append(&tris, 0..8).unwrap();
        bvh.append(&tris, 8..16).unwrap();
        assert_eq!(bvh.root().count, 16);
        assert_eq!(bvh.faces().len(), 16);
        assert!(bvh.root().aabb.max.x >= 7.0);
        assert!(bvh.root().aabb.max.y >= 7.0);
    }

    #[test]
    fn test_closest_matches_brute_force() {
        let tris = grid(12);
        let bvh = built(&tris);
        assert!(!bvh.root().is_leaf());

        for i in 0..50 {
            let x = (i % 10) as f32 * 2.3 + 0.1;
            let y = (i / 10) as f32 * 4.1 + 0.2;
            let ray = Ray::new(Vec3::new(x, y, 10.0), Vec3::new(0.01, -0.02, -1.0));

            let brute = tris
                .iter()
                .filter_map(|t| ray_triangle(&ray, t, f32::MAX))
                .map(|h| h.t)
                .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |a| a.min(t))));
            let fast = bvh.intersect(&tris, &ray, f32::MAX).map(|h| h.t);
            assert_eq!(brute, fast);
            assert_eq!(brute.is_some(), bvh.any_hit(&tris, &ray, f32::MAX));
        }
    }

    #[test]
    fn test_t_max_limits_hits() {
        let tris = vec![make_tri(Vec3::ZERO, 0)];
        let bvh = built(&tris);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), -Vec3::Z);
        assert!(bvh.intersect(&tris, &ray, 4.0).is_none());
        assert!(!bvh.any_hit(&tris, &ray, 4.0));
        assert!(bvh.any_hit(&tris, &ray, 5.0));
    }

    #[test]
    fn test_stats_and_rebuild() {
        let tris = grid(10);
        let mut bvh = built(&tris);
        let stats = bvh.stats();
        assert_eq!(stats.nodes, 2 * stats.leaves - 1);
        assert!(stats.max_depth > 1);
        assert_eq!(bvh.nodes().len(), stats.nodes);

        // Rebuilding yields a tree over the same faces
        bvh.build(&tris).unwrap();
        assert_eq!(bvh.stats().leaves, stats.leaves);
    }

    #[test]
    fn test_deep_tree_drops() {
        // Hand-built degenerate chain deeper than any recursive drop would like
        let mut node = BvhNode::leaf(Aabb::EMPTY, 0, 0);
        for _ in 0..200_000 {
            let mut parent = BvhNode::leaf(Aabb::EMPTY, 0, 0);
            parent.children = Some(Box::new([node, BvhNode::leaf(Aabb::EMPTY, 0, 0)]));
            node = parent;
        }
        let bvh = Bvh { faces: Vec::new(), root: node };
        drop(bvh);
    }
}
