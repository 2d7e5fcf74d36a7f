use thiserror::Error;
use tracing::debug;

use crate::geometry::{Vec3, AABB};

/// Sentinel for "no node" in every id field of [`BvhNode`]
pub const NO_NODE: i32 = -1;

/// Largest primitive count whose `2n - 1` node ids still fit in an i32
pub const MAX_PRIMITIVES: usize = (i32::MAX as usize).div_ceil(2);

/// Flat, GPU-friendly BVH node. Ids index into the owning node array; [`NO_NODE`] marks absence.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhNode {
    pub box_min: Vec3,
    pub box_max: Vec3,
    // leaf payload, NO_NODE for internal nodes
    pub obj_id: i32,
    pub left_id: i32,
    pub right_id: i32,
    pub parent_id: i32,
    // where to go once this subtree is exhausted
    pub next_id: i32,
}

impl BvhNode {
    fn leaf(bounds: AABB, obj_id: u32, parent_id: i32) -> BvhNode {
        BvhNode {
            box_min: bounds.minimum,
            box_max: bounds.maximum,
            obj_id: obj_id as i32,
            left_id: NO_NODE,
            right_id: NO_NODE,
            parent_id,
            next_id: NO_NODE,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.obj_id != NO_NODE
    }

    pub fn bounds(&self) -> AABB {
        AABB::new(self.box_min, self.box_max)
    }

    /// Leaf payload, `None` for internal nodes
    pub fn object(&self) -> Option<u32> {
        u32::try_from(self.obj_id).ok()
    }

    fn rebased(mut self, offset: i32) -> BvhNode {
        let shift = |id: i32| if id == NO_NODE { NO_NODE } else { id + offset };
        self.left_id = shift(self.left_id);
        self.right_id = shift(self.right_id);
        self.parent_id = shift(self.parent_id);
        self.next_id = shift(self.next_id);
        self
    }
}

/// Input to [`Bvh::build`]: a bounding box and the id the leaf will carry
#[derive(Clone, Copy, Debug)]
pub struct BuildPrimitive {
    pub bounds: AABB,
    pub obj_id: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BvhBuildError {
    #[error("cannot build a BVH over zero primitives")]
    NoPrimitives,
    #[error("{0} primitives exceed the node id range")]
    TooManyPrimitives(usize),
    #[error("a forest of {0} nodes exceeds the node id range")]
    TooManyNodes(usize),
}

/// One or more threaded trees stored in a single node array
#[derive(Clone, Debug, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
}

struct WorkItem {
    prim: BuildPrimitive,
    centroid: Vec3,
}

impl Bvh {
    /// Builds a single tree rooted at node 0 with exactly `2n - 1` nodes.
    ///
    /// Median split along the axis of largest centroid extent (ties favor x, then y), with a
    /// stable sort so identical input order always yields an identical tree.
    pub fn build(primitives: &[BuildPrimitive]) -> Result<Bvh, BvhBuildError> {
        if primitives.is_empty() {
            return Err(BvhBuildError::NoPrimitives);
        }
        if primitives.len() > MAX_PRIMITIVES {
            return Err(BvhBuildError::TooManyPrimitives(primitives.len()));
        }

        let mut work: Vec<WorkItem> = primitives
            .iter()
            .map(|&prim| WorkItem { prim, centroid: prim.bounds.centroid() })
            .collect();

        let mut nodes = Vec::with_capacity(2 * primitives.len() - 1);
        build_recursive(&mut nodes, &mut work, NO_NODE);
        thread_next_ids(&mut nodes);

        debug!(primitives = primitives.len(), nodes = nodes.len(), "built bvh");
        Ok(Bvh { nodes })
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Moves `other` into this array as a disjoint subtree and returns its root id
    pub fn append(&mut self, other: Bvh) -> Result<i32, BvhBuildError> {
        let offset = forest_offset(self.nodes.len(), other.nodes.len())?;
        self.nodes.extend(other.nodes.into_iter().map(|n| n.rebased(offset)));
        Ok(offset)
    }

    pub fn bounds(&self, root: i32) -> AABB {
        usize::try_from(root)
            .ok()
            .and_then(|i| self.nodes.get(i))
            .map(BvhNode::bounds)
            .unwrap_or_else(AABB::empty)
    }

    pub fn walk<F>(&self, root: i32, visit: F)
    where
        F: FnMut(&BvhNode) -> bool,
    {
        walk(&self.nodes, root, visit)
    }
}

/// Stackless threaded traversal starting at `root`.
///
/// `visit` is called on every reached node. For internal nodes its return value decides whether
/// to descend into the subtree; for leaves it is ignored and the walk always moves on.
pub fn walk<F>(nodes: &[BvhNode], root: i32, mut visit: F)
where
    F: FnMut(&BvhNode) -> bool,
{
    let mut current = root;
    while let Some(node) = usize::try_from(current).ok().and_then(|i| nodes.get(i)) {
        let descend = visit(node);
        current = if !node.is_leaf() && descend {
            node.left_id
        } else {
            node.next_id
        };
    }
}

fn split_axis(work: &[WorkItem]) -> usize {
    let centroid_bounds = AABB::from_points(work.iter().map(|w| w.centroid));
    let span = centroid_bounds.maximum - centroid_bounds.minimum;

    if span.0 >= span.1 && span.0 >= span.2 {
        0
    } else if span.1 >= span.2 {
        1
    } else {
        2
    }
}

// preorder: the left subtree gets ids starting at id + 1, the right one follows it
fn build_recursive(nodes: &mut Vec<BvhNode>, work: &mut [WorkItem], parent_id: i32) -> i32 {
    let id = nodes.len() as i32;

    if let [single] = work {
        nodes.push(BvhNode::leaf(single.prim.bounds, single.prim.obj_id, parent_id));
        return id;
    }

    let axis = split_axis(work);
    // slice::sort_by is stable
    work.sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

    nodes.push(BvhNode {
        box_min: Vec3::zero(),
        box_max: Vec3::zero(),
        obj_id: NO_NODE,
        left_id: NO_NODE,
        right_id: NO_NODE,
        parent_id,
        next_id: NO_NODE,
    });

    let mid = work.len() / 2;
    let (left_work, right_work) = work.split_at_mut(mid);
    let left_id = build_recursive(nodes, left_work, id);
    let right_id = build_recursive(nodes, right_work, id);

    let bounds = AABB::surrounding_box(
        nodes[left_id as usize].bounds(),
        nodes[right_id as usize].bounds(),
    );
    let node = &mut nodes[id as usize];
    node.box_min = bounds.minimum;
    node.box_max = bounds.maximum;
    node.left_id = left_id;
    node.right_id = right_id;

    id
}

fn thread_next_ids(nodes: &mut [BvhNode]) {
    for i in 0..nodes.len() {
        let mut current = i as i32;
        let mut next = NO_NODE;

        loop {
            let parent = nodes[current as usize].parent_id;
            if parent == NO_NODE {
                break;
            }
            let right = nodes[parent as usize].right_id;
            if right != current {
                next = right;
                break;
            }
            current = parent;
        }

        nodes[i].next_id = next;
    }
}

// root id of a tree of `added` nodes placed after `current` existing ones
fn forest_offset(current: usize, added: usize) -> Result<i32, BvhBuildError> {
    let total = current.saturating_add(added);
    if total > i32::MAX as usize {
        return Err(BvhBuildError::TooManyNodes(total));
    }
    Ok(current as i32)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn point_prim(p: Vec3, obj_id: u32) -> BuildPrimitive {
        BuildPrimitive { bounds: AABB::new(p, p), obj_id }
    }

    fn random_prims(count: u32, seed: u64) -> Vec<BuildPrimitive> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                let lo = Vec3(rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0));
                let size = Vec3(rng.random_range(0.0..2.0), rng.random_range(0.0..2.0), rng.random_range(0.0..2.0));
                BuildPrimitive { bounds: AABB::new(lo, lo + size), obj_id: i }
            })
            .collect()
    }

    #[test]
    fn zero_primitives_is_rejected() {
        assert_eq!(Bvh::build(&[]).unwrap_err(), BvhBuildError::NoPrimitives);
    }

    #[test]
    fn single_primitive_is_a_lone_leaf() {
        let bvh = Bvh::build(&[point_prim(Vec3(1.0, 2.0, 3.0), 7)]).unwrap();
        assert_eq!(bvh.len(), 1);
        let root = bvh.nodes()[0];
        assert_eq!(root.obj_id, 7);
        assert_eq!(root.parent_id, NO_NODE);
        assert_eq!(root.next_id, NO_NODE);
        assert_eq!(root.left_id, NO_NODE);
    }

    #[test]
    fn node_count_and_leaf_ids() {
        for count in [1, 2, 3, 7, 64, 257] {
            let prims = random_prims(count, count as u64);
            let bvh = Bvh::build(&prims).unwrap();
            assert_eq!(bvh.len(), 2 * count as usize - 1);

            let leaves: Vec<i32> = bvh.nodes().iter().filter(|n| n.is_leaf()).map(|n| n.obj_id).collect();
            let unique: HashSet<i32> = leaves.iter().copied().collect();
            assert_eq!(leaves.len(), count as usize);
            assert_eq!(unique.len(), count as usize);
        }
    }

    #[test]
    fn internal_boxes_contain_children() {
        let bvh = Bvh::build(&random_prims(100, 3)).unwrap();
        for node in bvh.nodes().iter().filter(|n| !n.is_leaf()) {
            let bounds = node.bounds();
            assert!(bounds.contains(&bvh.nodes()[node.left_id as usize].bounds()));
            assert!(bounds.contains(&bvh.nodes()[node.right_id as usize].bounds()));
        }
    }

    #[test]
    fn threaded_walk_visits_every_leaf_once() {
        let prims = random_prims(200, 11);
        let bvh = Bvh::build(&prims).unwrap();

        let mut visited_nodes = HashSet::new();
        let mut leaves = Vec::new();
        bvh.walk(0, |node| {
            let id = node as *const BvhNode;
            assert!(visited_nodes.insert(id), "node visited twice");
            if let Some(obj) = node.object() {
                leaves.push(obj);
            }
            true
        });

        assert_eq!(visited_nodes.len(), bvh.len());
        leaves.sort_unstable();
        assert_eq!(leaves, (0..200).collect::<Vec<u32>>());
    }

    #[test]
    fn rejecting_the_root_skips_everything() {
        let bvh = Bvh::build(&random_prims(16, 5)).unwrap();
        let mut visits = 0;
        bvh.walk(0, |_| {
            visits += 1;
            false
        });
        assert_eq!(visits, 1);
    }

    #[test]
    fn only_root_terminates_the_thread() {
        let bvh = Bvh::build(&random_prims(33, 8)).unwrap();
        let nodes = bvh.nodes();
        assert_eq!(nodes[0].next_id, NO_NODE);
        for node in nodes {
            assert!(node.next_id == NO_NODE || (node.next_id as usize) < nodes.len());
        }
        // the rightmost spine also ends the walk
        let mut id = 0;
        while !nodes[id].is_leaf() {
            id = nodes[id].right_id as usize;
            assert_eq!(nodes[id].next_id, NO_NODE);
        }
    }

    #[test]
    fn ties_split_along_x_first() {
        // equal spans on every axis
        let prims = [
            point_prim(Vec3(1.0, 1.0, 1.0), 0),
            point_prim(Vec3(0.0, 0.0, 0.0), 1),
        ];
        let bvh = Bvh::build(&prims).unwrap();
        let root = bvh.nodes()[0];
        assert_eq!(root.left_id, 1);
        assert_eq!(root.right_id, 2);
        assert_eq!(bvh.nodes()[1].obj_id, 1);
        assert_eq!(bvh.nodes()[2].obj_id, 0);
    }

    #[test]
    fn ties_between_y_and_z_favor_y() {
        // no x extent, equal y/z extent; order along y is reversed relative to z
        let prims = [
            point_prim(Vec3(0.0, 1.0, 0.0), 0),
            point_prim(Vec3(0.0, 0.0, 1.0), 1),
        ];
        let bvh = Bvh::build(&prims).unwrap();
        assert_eq!(bvh.nodes()[1].obj_id, 1);
        assert_eq!(bvh.nodes()[2].obj_id, 0);
    }

    #[test]
    fn same_input_gives_same_tree() {
        let prims = random_prims(50, 21);
        let a = Bvh::build(&prims).unwrap();
        let b = Bvh::build(&prims).unwrap();
        assert_eq!(a.nodes(), b.nodes());
    }

    #[test]
    fn degenerate_identical_boxes_still_build() {
        let prims: Vec<_> = (0..9).map(|i| point_prim(Vec3::zero(), i)).collect();
        let bvh = Bvh::build(&prims).unwrap();
        assert_eq!(bvh.len(), 17);
        let mut leaves = 0;
        bvh.walk(0, |n| {
            leaves += n.is_leaf() as u32;
            true
        });
        assert_eq!(leaves, 9);
    }

    #[test]
    fn appended_subtrees_are_disjoint() {
        let mut forest = Bvh::default();
        let first = forest.append(Bvh::build(&random_prims(5, 1)).unwrap()).unwrap();
        let second = forest.append(Bvh::build(&random_prims(9, 2)).unwrap()).unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 9);
        assert_eq!(forest.len(), 9 + 17);

        let mut count = 0;
        forest.walk(second, |n| {
            count += n.is_leaf() as u32;
            true
        });
        assert_eq!(count, 9);
        assert_eq!(forest.nodes()[second as usize].parent_id, NO_NODE);
        assert_eq!(forest.nodes()[second as usize + 1].parent_id, second);
    }

    #[test]
    fn child_links_reach_every_node_once() {
        for count in [1, 2, 5, 97] {
            let bvh = Bvh::build(&random_prims(count, 40 + count as u64)).unwrap();
            let nodes = bvh.nodes();
            let mut seen = vec![0u32; nodes.len()];

            let mut stack = vec![0i32];
            while let Some(id) = stack.pop() {
                seen[id as usize] += 1;
                let node = nodes[id as usize];
                if node.is_leaf() {
                    assert_eq!((node.left_id, node.right_id), (NO_NODE, NO_NODE));
                    continue;
                }
                for child in [node.left_id, node.right_id] {
                    assert_eq!(nodes[child as usize].parent_id, id, "child {child} of {id}");
                    stack.push(child);
                }
            }

            assert!(seen.iter().all(|&n| n == 1), "{count} primitives: {seen:?}");
            assert_eq!(nodes[0].parent_id, NO_NODE);
        }
    }

    #[test]
    fn forest_offset_stays_in_id_range() {
        assert_eq!(forest_offset(10, 7), Ok(10));
        assert_eq!(forest_offset(i32::MAX as usize - 7, 7), Ok(i32::MAX - 7));
        assert_eq!(
            forest_offset(i32::MAX as usize, 1),
            Err(BvhBuildError::TooManyNodes(i32::MAX as usize + 1))
        );
        assert_eq!(forest_offset(usize::MAX, 3), Err(BvhBuildError::TooManyNodes(usize::MAX)));
    }
}
