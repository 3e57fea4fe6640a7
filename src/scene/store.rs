use crate::geometry::{intersect_linear, Shape};
use crate::ray::{Intersection, Ray};
use crate::scene::{RayStats, ShapeStore};

/// Brute force store, tests every shape against every ray.
#[derive(Default)]
pub struct LinearStore {
    shapes: Vec<Shape>,
    children: Vec<Box<dyn ShapeStore>>,
}

impl LinearStore {
    pub fn new() -> LinearStore {
        return LinearStore::default();
    }

}

impl FromIterator<Shape> for LinearStore {
    fn from_iter<I: IntoIterator<Item = Shape>>(iter: I) -> LinearStore {
        return LinearStore {
            shapes: iter.into_iter().collect(),
            children: Vec::new(),
        };
    }
}

impl ShapeStore for LinearStore {
    fn insert(&mut self, shape: Shape) -> bool {
        self.shapes.push(shape);
        return true;
    }

    fn shape_count(&self) -> usize {
        return self.shapes.len();
    }

    fn intersect_own(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        stats.shape_checks += self.shapes.len();
        return intersect_linear(ray, &self.shapes);
    }

    fn children(&self) -> &[Box<dyn ShapeStore>] {
        return &self.children;
    }

    fn insert_child(&mut self, child: Box<dyn ShapeStore>) {
        self.children.push(child);
    }
}
