use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::geometry::{intersect_linear, Bounds, Shape};
use crate::ray::{Intersection, Ray};
use crate::scene::{RayStats, ShapeStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BvhParams {
    pub max_depth: usize,
    /// A split is only accepted when both halves keep at least this many shapes.
    pub min_shapes: usize,
}

impl Default for BvhParams {
    fn default() -> BvhParams {
        return BvhParams {
            max_depth: 7,
            min_shapes: 4,
        };
    }
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Bounds,
    start: usize,
    end: usize,
    children: Option<[usize; 2]>,
}

/// Bounding volume hierarchy built by splitting each node at the middle of
/// its longest axis, trying the shorter axes when that leaves a side too small.
///
/// Shapes live in one vector, reordered during the build so that every leaf
/// owns a contiguous range of it.
pub struct BvhTree {
    shapes: Vec<Shape>,
    nodes: Vec<Node>,
    children: Vec<Box<dyn ShapeStore>>,
}

/// Moves every item matching `pred` to the front and returns how many there are.
fn partition_in_place<T>(items: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut split = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(split, i);
            split += 1;
        }
    }
    return split;
}

impl BvhTree {
    /// Shapes without finite bounds (planes) cannot be placed in the tree and are dropped.
    pub fn build(shapes: Vec<Shape>, params: BvhParams) -> BvhTree {
        let total = shapes.len();
        let shapes: Vec<Shape> = shapes.into_iter().filter(|s| s.is_boundable()).collect();
        if shapes.len() != total {
            warn!(dropped = total - shapes.len(), "unbounded shapes left out of BVH");
        }

        let mut tree = BvhTree {
            shapes: shapes,
            nodes: Vec::new(),
            children: Vec::new(),
        };
        let root = tree.push_node(0, tree.shapes.len());
        tree.split(root, params, 0);

        debug!(
            shapes = tree.shapes.len(),
            nodes = tree.nodes.len(),
            depth = tree.depth(),
            "built BVH"
        );
        return tree;
    }

    fn push_node(&mut self, start: usize, end: usize) -> usize {
        let bounds = self.shapes[start..end]
            .iter()
            .filter_map(|s| s.bounds())
            .fold(Bounds::empty(), |acc, b| acc.union(&b));

        self.nodes.push(Node {
            bounds: bounds.padded(),
            start: start,
            end: end,
            children: None,
        });
        return self.nodes.len() - 1;
    }

    fn split(&mut self, index: usize, params: BvhParams, depth: usize) {
        let Node { bounds, start, end, .. } = self.nodes[index].clone();
        let count = end - start;
        if depth >= params.max_depth || count <= params.min_shapes {
            return;
        }

        for axis in bounds.major_axes() {
            let middle = bounds.min[axis] + bounds.extent()[axis] / 2.0;
            let split = partition_in_place(&mut self.shapes[start..end], |s| s.center()[axis] < middle);

            if split == 0 || split == count {
                continue;
            }
            if split < params.min_shapes || count - split < params.min_shapes {
                continue;
            }

            let left = self.push_node(start, start + split);
            let right = self.push_node(start + split, end);
            self.nodes[index].children = Some([left, right]);

            self.split(left, params, depth + 1);
            self.split(right, params, depth + 1);
            return;
        }
    }

    pub fn node_count(&self) -> usize {
        return self.nodes.len();
    }

    pub fn leaf_count(&self) -> usize {
        return self.nodes.iter().filter(|n| n.children.is_none()).count();
    }

    /// Number of edges on the longest root to leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0, 0)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some([l, r]) = self.nodes[index].children {
                stack.push((l, depth + 1));
                stack.push((r, depth + 1));
            }
        }
        return deepest;
    }

    pub fn bounds(&self) -> Bounds {
        return self.nodes[0].bounds;
    }

    fn intersect_node(&self, index: usize, ray: &Ray, stats: &mut RayStats, best: &mut Option<Intersection>) {
        let node = &self.nodes[index];
        stats.bound_checks += 1;
        if !node.bounds.ray_intersects(ray) {
            return;
        }

        match node.children {
            Some([left, right]) => {
                self.intersect_node(left, ray, stats, best);
                self.intersect_node(right, ray, stats, best);
            }
            None => {
                stats.shape_checks += node.end - node.start;
                Intersection::replace(best, intersect_linear(ray, &self.shapes[node.start..node.end]));
            }
        }
    }
}

impl ShapeStore for BvhTree {
    fn shape_count(&self) -> usize {
        return self.shapes.len();
    }

    fn intersect_own(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        let mut best = None;
        self.intersect_node(0, ray, stats, &mut best);
        return best;
    }

    fn children(&self) -> &[Box<dyn ShapeStore>] {
        return &self.children;
    }

    fn insert_child(&mut self, child: Box<dyn ShapeStore>) {
        self.children.push(child);
    }
}

#[derive(Debug, Copy, Clone)]
struct ThinNode {
    bounds: Bounds,
    shapes: [usize; 2],
    children: Option<[usize; 2]>,
}

/// A [`BvhTree`] flattened breadth first into one array and walked with an
/// explicit stack instead of recursion.
pub struct ThinBvh {
    shapes: Vec<Shape>,
    nodes: Vec<ThinNode>,
    max_depth: usize,
    children: Vec<Box<dyn ShapeStore>>,
}

impl ThinBvh {
    pub fn from_tree(tree: &BvhTree) -> ThinBvh {
        let mut order = Vec::with_capacity(tree.nodes.len());
        let mut queue = VecDeque::from([0]);
        while let Some(index) = queue.pop_front() {
            order.push(index);
            if let Some([l, r]) = tree.nodes[index].children {
                queue.push_back(l);
                queue.push_back(r);
            }
        }

        let mut flat_index = vec![0; tree.nodes.len()];
        for (flat, &index) in order.iter().enumerate() {
            flat_index[index] = flat;
        }

        let mut shapes = Vec::with_capacity(tree.shapes.len());
        let mut nodes = Vec::with_capacity(order.len());
        for &index in order.iter() {
            let node = &tree.nodes[index];
            let start = shapes.len();
            if node.children.is_none() {
                shapes.extend_from_slice(&tree.shapes[node.start..node.end]);
            }
            nodes.push(ThinNode {
                bounds: node.bounds,
                shapes: [start, shapes.len()],
                children: node.children.map(|[l, r]| [flat_index[l], flat_index[r]]),
            });
        }

        return ThinBvh {
            shapes: shapes,
            nodes: nodes,
            max_depth: tree.depth(),
            children: Vec::new(),
        };
    }

    pub fn build(shapes: Vec<Shape>, params: BvhParams) -> ThinBvh {
        return ThinBvh::from_tree(&BvhTree::build(shapes, params));
    }

    pub fn node_count(&self) -> usize {
        return self.nodes.len();
    }
}

impl ShapeStore for ThinBvh {
    fn shape_count(&self) -> usize {
        return self.shapes.len();
    }

    fn intersect_own(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        let mut best = None;
        if self.nodes.is_empty() {
            return best;
        }

        let mut stack = Vec::with_capacity(self.max_depth + 2);
        stack.push(0);
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];

            stats.bound_checks += 1;
            if !node.bounds.ray_intersects(ray) {
                continue;
            }

            if let Some([left, right]) = node.children {
                stack.push(right);
                stack.push(left);
                continue;
            }

            let [start, end] = node.shapes;
            stats.shape_checks += end - start;
            Intersection::replace(&mut best, intersect_linear(ray, &self.shapes[start..end]));
        }

        return best;
    }

    fn children(&self) -> &[Box<dyn ShapeStore>] {
        return &self.children;
    }

    fn insert_child(&mut self, child: Box<dyn ShapeStore>) {
        self.children.push(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Plane, Sphere, Triangle};
    use crate::random::{self, Lcg48};
    use crate::scene::LinearStore;
    use crate::utils::{Point, Vec3f};

    fn random_point(rng: &mut Lcg48, scale: f64) -> Point {
        let [x, y] = random::unit_square(rng);
        let z = random::uniform_normalised(rng);
        return (Point::new(x, y, z) * 2.0 - Point::new(1.0, 1.0, 1.0)) * scale;
    }

    fn random_shapes(count: usize) -> Vec<Shape> {
        let mut rng = Lcg48::new(1234);
        let mut shapes = Vec::new();
        for i in 0..count {
            let center = random_point(&mut rng, 10.0);
            if i % 2 == 0 {
                shapes.push(
                    Sphere {
                        center: center,
                        radius: 0.3 + random::uniform_normalised(&mut rng),
                        material: i,
                    }
                    .into(),
                );
            } else {
                let a = random_point(&mut rng, 1.0);
                let b = random_point(&mut rng, 1.0);
                shapes.push(Triangle::new(i, [center, center + a, center + b]).into());
            }
        }
        return shapes;
    }

    #[test]
    fn trees_agree_with_linear_search() {
        let shapes = random_shapes(200);
        let linear: LinearStore = shapes.iter().copied().collect();
        let params = BvhParams {
            max_depth: 12,
            min_shapes: 2,
        };
        let tree = BvhTree::build(shapes.clone(), params);
        let thin = ThinBvh::from_tree(&tree);
        assert!(tree.leaf_count() > 1);
        assert_eq!(thin.node_count(), tree.node_count());
        assert_eq!(thin.shape_count(), 200);

        let mut rng = Lcg48::new(77);
        let mut tree_stats = RayStats::default();
        let mut linear_stats = RayStats::default();
        let mut hits = 0;
        for _ in 0..500 {
            let ray = Ray::new(random_point(&mut rng, 15.0), random::unit_vector(&mut rng));
            let expected = linear.intersect(&ray, &mut linear_stats);
            let from_tree = tree.intersect(&ray, &mut tree_stats);
            let from_thin = thin.intersect(&ray, &mut RayStats::default());

            match expected {
                None => {
                    assert!(from_tree.is_none());
                    assert!(from_thin.is_none());
                }
                Some(e) => {
                    hits += 1;
                    assert!((from_tree.unwrap().distance - e.distance).abs() < 1e-9);
                    assert!((from_thin.unwrap().distance - e.distance).abs() < 1e-9);
                }
            }
        }
        assert!(hits > 0);
        assert!(tree_stats.shape_checks < linear_stats.shape_checks);
    }

    #[test]
    fn coincident_centers_are_not_split() {
        let shapes: Vec<Shape> = (0..8)
            .map(|i| {
                Sphere {
                    center: Point::zeros(),
                    radius: 1.0 + i as f64,
                    material: i,
                }
                .into()
            })
            .collect();
        let tree = BvhTree::build(shapes, BvhParams::default());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn depth_and_min_shapes_bound_the_split() {
        let shapes = random_shapes(64);
        let shallow = BvhTree::build(
            shapes.clone(),
            BvhParams {
                max_depth: 1,
                min_shapes: 1,
            },
        );
        assert_eq!(shallow.depth(), 1);
        assert_eq!(shallow.leaf_count(), 2);

        let coarse = BvhTree::build(
            shapes,
            BvhParams {
                max_depth: 32,
                min_shapes: 64,
            },
        );
        assert_eq!(coarse.node_count(), 1);
    }

    #[test]
    fn default_params_stop_at_depth_seven() {
        assert_eq!(
            BvhParams::default(),
            BvhParams {
                max_depth: 7,
                min_shapes: 4,
            }
        );
        let tree = BvhTree::build(random_shapes(2000), BvhParams::default());
        assert!(tree.depth() <= 7);
        assert_eq!(tree.shape_count(), 2000);
    }

    #[test]
    fn planes_are_dropped() {
        let shapes = vec![
            Plane::new(0, Point::zeros(), Vec3f::new(0.0, 1.0, 0.0)).into(),
            Sphere {
                center: Point::zeros(),
                radius: 1.0,
                material: 1,
            }
            .into(),
        ];
        let tree = BvhTree::build(shapes, BvhParams::default());
        assert_eq!(tree.shape_count(), 1);
        assert!(tree.bounds().contains_point(&Point::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn empty_tree_misses() {
        let thin = ThinBvh::build(Vec::new(), BvhParams::default());
        let ray = Ray::new(Point::zeros(), Vec3f::new(0.0, 0.0, 1.0));
        assert!(thin.intersect(&ray, &mut RayStats::default()).is_none());
    }
}
