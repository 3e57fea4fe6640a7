mod bvh;
mod store;

use std::collections::HashMap;

use crate::geometry::Shape;
use crate::material::Material;
use crate::ray::{Intersection, Ray};

pub use self::bvh::{BvhParams, BvhTree, ThinBvh};
pub use self::store::LinearStore;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RayStats {
    pub bound_checks: usize,
    pub shape_checks: usize,
}

/// Anything that can answer "what does this ray hit first".
///
/// Child stores are queried after the store itself and compete for the
/// nearest hit on equal terms.
pub trait ShapeStore: Send + Sync {
    /// Stores that cannot take single shapes (the BVH variants) return `false`.
    fn insert(&mut self, _shape: Shape) -> bool {
        return false;
    }

    fn shape_count(&self) -> usize;

    fn intersect_own(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection>;

    fn children(&self) -> &[Box<dyn ShapeStore>];

    fn insert_child(&mut self, child: Box<dyn ShapeStore>);

    /// Total shapes including every child store.
    fn total_shape_count(&self) -> usize {
        return self.shape_count() + self.children().iter().map(|c| c.total_shape_count()).sum::<usize>();
    }

    fn intersect(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        let mut best = self.intersect_own(ray, stats);
        for child in self.children() {
            Intersection::replace(&mut best, child.intersect(ray, stats));
        }
        return best;
    }
}

#[derive(Default)]
pub struct Scene {
    materials: Vec<Material>,
    aliases: HashMap<String, usize>,
    stores: Vec<Box<dyn ShapeStore>>,
}

impl Scene {
    pub fn new() -> Scene {
        return Scene::default();
    }

    /// Returns the material index; an empty alias registers no name.
    pub fn insert_material(&mut self, material: Material, alias: &str) -> usize {
        self.materials.push(material);
        let index = self.materials.len() - 1;
        if !alias.is_empty() {
            self.aliases.insert(alias.to_string(), index);
        }
        return index;
    }

    /// Unknown aliases resolve to the most recently inserted material.
    pub fn resolve_material(&self, alias: &str) -> usize {
        return match self.aliases.get(alias) {
            Some(&index) => index,
            None => self.materials.len().saturating_sub(1),
        };
    }

    pub fn has_material(&self, alias: &str) -> bool {
        return self.aliases.contains_key(alias);
    }

    /// Out of range indices are clamped; a scene without materials yields the default one.
    pub fn material(&self, index: usize) -> Material {
        if self.materials.is_empty() {
            return Material::default();
        }
        return self.materials[index.min(self.materials.len() - 1)];
    }

    pub fn material_count(&self) -> usize {
        return self.materials.len();
    }

    pub fn insert_store(&mut self, store: Box<dyn ShapeStore>) {
        self.stores.push(store);
    }

    pub fn store_count(&self) -> usize {
        return self.stores.len();
    }
}

impl ShapeStore for Scene {
    fn shape_count(&self) -> usize {
        return 0;
    }

    fn intersect_own(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        let mut best = None;
        for store in self.stores.iter() {
            Intersection::replace(&mut best, store.intersect(ray, stats));
        }
        return best;
    }

    fn children(&self) -> &[Box<dyn ShapeStore>] {
        return &self.stores;
    }

    fn insert_child(&mut self, child: Box<dyn ShapeStore>) {
        self.stores.push(child);
    }

    fn intersect(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        return self.intersect_own(ray, stats);
    }
}
