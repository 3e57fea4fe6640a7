use std::f64;

use crate::ray::{Intersection, Ray};
use crate::utils::{epsilon_point, Point, Vec3f, SENSIBLE_EPS, SENSIBLE_INF};

pub trait Hittable: Sync + Send {
    fn hit(&self, ray: &Ray) -> Option<Intersection>;
}

/// Shapes with finite extents, the only ones a BVH can hold.
pub trait Boundable {
    fn bounds(&self) -> Bounds;
    fn center(&self) -> Point;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: Point, max: Point) -> Bounds {
        return Bounds { min: min, max: max };
    }

    /// Inverted box that any `union` replaces.
    pub fn empty() -> Bounds {
        return Bounds {
            min: Point::new(SENSIBLE_INF, SENSIBLE_INF, SENSIBLE_INF),
            max: Point::new(-SENSIBLE_INF, -SENSIBLE_INF, -SENSIBLE_INF),
        };
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        return Bounds {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        };
    }

    pub fn padded(&self) -> Bounds {
        return Bounds {
            min: self.min - epsilon_point(),
            max: self.max + epsilon_point(),
        };
    }

    pub fn center(&self) -> Point {
        return (self.min + self.max) / 2.0;
    }

    pub fn extent(&self) -> Vec3f {
        return self.max - self.min;
    }

    /// Axis indices sorted by extent, longest first.
    pub fn major_axes(&self) -> [usize; 3] {
        let lengths = self.extent();
        let mut axes = [0, 1, 2];
        axes.sort_by(|&a, &b| lengths[b].total_cmp(&lengths[a]));
        return axes;
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        return (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i]);
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        return self.contains_point(&other.min) && self.contains_point(&other.max);
    }

    /// Slab test. Yields the entry distance, or the exit distance when the origin is inside.
    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for i in 0..3 {
            let t_1 = (self.min[i] - ray.origin[i]) * ray.inv_direction[i];
            let t_2 = (self.max[i] - ray.origin[i]) * ray.inv_direction[i];

            t_min = t_min.max(t_1.min(t_2).min(t_max));
            t_max = t_max.min(t_1.max(t_2).max(t_min));
        }

        if t_max > t_min.max(0.0) {
            return Some(if t_min > 0.0 { t_min } else { t_max });
        }
        return None;
    }

    pub fn ray_intersects(&self, ray: &Ray) -> bool {
        return self.intersect(ray).is_some();
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Sphere {
    pub center: Point,
    pub radius: f64,
    pub material: usize,
}

fn get_sphere_uv(n: &Vec3f) -> [f64; 2] {
    let u = 0.5 + n.x.atan2(n.z) * 0.5 * f64::consts::FRAC_1_PI;
    let v = 0.5 - n.y.asin() * f64::consts::FRAC_1_PI;
    return [u, v];
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray) -> Option<Intersection> {
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2. * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - (self.radius * self.radius);
        let discriminant = (b * b) - (4. * a * c);
        if discriminant < 0.0 {
            return None;
        }

        let sq = discriminant.sqrt();
        let near = (-b - sq) / (2. * a);
        let far = (-b + sq) / (2. * a);
        let t = if near > SENSIBLE_EPS {
            near
        } else if far > SENSIBLE_EPS {
            far
        } else {
            return None;
        };

        let p = ray.point_at(t);
        let normal = (p - self.center).normalize();
        return Some(Intersection::new(ray, self.material, t, normal, get_sphere_uv(&normal)));
    }
}

impl Boundable for Sphere {
    fn bounds(&self) -> Bounds {
        let r = Vec3f::new(self.radius, self.radius, self.radius);
        return Bounds::new(self.center - r, self.center + r);
    }

    fn center(&self) -> Point {
        return self.center;
    }
}

/// Infinite plane through `center`.
#[derive(Debug, Copy, Clone)]
pub struct Plane {
    pub center: Point,
    pub normal: Vec3f,
    pub material: usize,
}

impl Plane {
    pub fn new(material: usize, center: Point, normal: Vec3f) -> Plane {
        return Plane {
            center: center,
            normal: normal.normalize(),
            material: material,
        };
    }

    fn distance(&self, ray: &Ray) -> Option<f64> {
        let denom = self.normal.dot(&ray.direction);
        if denom.abs() <= SENSIBLE_EPS {
            return None;
        }
        let t = (self.center - ray.origin).dot(&self.normal) / denom;
        if t < SENSIBLE_EPS {
            return None;
        }
        return Some(t);
    }
}

impl Hittable for Plane {
    fn hit(&self, ray: &Ray) -> Option<Intersection> {
        let t = self.distance(ray)?;
        return Some(Intersection::new(ray, self.material, t, self.normal, [0.0, 0.0]));
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Disc {
    pub plane: Plane,
    pub radius: f64,
}

impl Disc {
    pub fn new(material: usize, center: Point, normal: Vec3f, radius: f64) -> Disc {
        return Disc {
            plane: Plane::new(material, center, normal),
            radius: radius,
        };
    }
}

impl Hittable for Disc {
    fn hit(&self, ray: &Ray) -> Option<Intersection> {
        let isect = self.plane.hit(ray)?;
        let d = isect.point - self.plane.center;
        if d.dot(&d) > self.radius * self.radius {
            return None;
        }
        return Some(isect);
    }
}

impl Boundable for Disc {
    fn bounds(&self) -> Bounds {
        let r = Vec3f::new(self.radius, self.radius, self.radius);
        return Bounds::new(self.plane.center - r, self.plane.center + r);
    }

    fn center(&self) -> Point {
        return self.plane.center;
    }
}

/// Möller-Trumbore triangle; `parallelogram` accepts the mirrored half as well.
///
/// ```text
/// V2     x  <- V3 for a parallelogram
/// | \
/// E1  \
/// |    \
/// V0-E0-V1
/// ```
#[derive(Debug, Copy, Clone)]
pub struct Triangle {
    pub vertices: [Point; 3],
    pub edges: [Vec3f; 2],
    pub normal: Vec3f,
    pub material: usize,
    pub parallelogram: bool,
}

impl Triangle {
    pub fn new(material: usize, vertices: [Point; 3]) -> Triangle {
        return Triangle::build(material, vertices, false);
    }

    pub fn parallelogram(material: usize, vertices: [Point; 3]) -> Triangle {
        return Triangle::build(material, vertices, true);
    }

    fn build(material: usize, vertices: [Point; 3], parallelogram: bool) -> Triangle {
        let edges = [vertices[1] - vertices[0], vertices[2] - vertices[0]];
        return Triangle {
            vertices: vertices,
            edges: edges,
            normal: edges[0].cross(&edges[1]).normalize(),
            material: material,
            parallelogram: parallelogram,
        };
    }

    fn corners(&self) -> Vec<Point> {
        let mut corners = self.vertices.to_vec();
        if self.parallelogram {
            corners.push(self.vertices[0] + self.edges[0] + self.edges[1]);
        }
        return corners;
    }
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray) -> Option<Intersection> {
        let h = ray.direction.cross(&self.edges[1]);
        let a = self.edges[0].dot(&h);
        if a.abs() <= SENSIBLE_EPS {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.vertices[0];
        let u = f * s.dot(&h);
        if u < 0.0 || u > 1.0 {
            return None;
        }

        let q = s.cross(&self.edges[0]);
        let v = f * ray.direction.dot(&q);
        let outside = if self.parallelogram { v > 1.0 } else { u + v > 1.0 };
        if v < 0.0 || outside {
            return None;
        }

        let t = f * self.edges[1].dot(&q);
        if t <= SENSIBLE_EPS {
            return None;
        }

        return Some(Intersection::new(ray, self.material, t, self.normal, [u, v]));
    }
}

impl Boundable for Triangle {
    fn bounds(&self) -> Bounds {
        let corners = self.corners();
        let mut bounds = Bounds::new(corners[0], corners[0]);
        for c in corners.iter().skip(1) {
            bounds = bounds.union(&Bounds::new(*c, *c));
        }
        return bounds;
    }

    fn center(&self) -> Point {
        if self.parallelogram {
            return self.vertices[0] + (self.edges[0] + self.edges[1]) / 2.0;
        }
        // centroid
        return (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0;
    }
}

#[derive(Debug, Copy, Clone)]
pub struct AxisAlignedBox {
    pub bounds: Bounds,
    pub material: usize,
}

impl AxisAlignedBox {
    pub fn new(material: usize, min: Point, max: Point) -> AxisAlignedBox {
        return AxisAlignedBox {
            bounds: Bounds::new(min.inf(&max), min.sup(&max)),
            material: material,
        };
    }
}

impl Hittable for AxisAlignedBox {
    fn hit(&self, ray: &Ray) -> Option<Intersection> {
        let t = self.bounds.intersect(ray)?;

        let p = ray.point_at(t) - self.bounds.center();
        let d = (self.bounds.max - self.bounds.min) * 0.5;
        let bias = 1.000001;
        let normal = Vec3f::new(
            (p.x / d.x.abs() * bias).trunc(),
            (p.y / d.y.abs() * bias).trunc(),
            (p.z / d.z.abs() * bias).trunc(),
        );
        let normal = if normal.norm_squared() > 0.0 {
            normal.normalize()
        } else {
            -ray.direction
        };

        return Some(Intersection::new(ray, self.material, t, normal, [0.0, 0.0]));
    }
}

impl Boundable for AxisAlignedBox {
    fn bounds(&self) -> Bounds {
        return self.bounds;
    }

    fn center(&self) -> Point {
        return self.bounds.center();
    }
}

#[derive(Debug, Copy, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Plane(Plane),
    Disc(Disc),
    Triangle(Triangle),
    AxisAlignedBox(AxisAlignedBox),
}

impl Shape {
    pub fn is_boundable(&self) -> bool {
        return !matches!(self, Shape::Plane(_));
    }

    /// `None` for shapes without finite extents.
    pub fn bounds(&self) -> Option<Bounds> {
        return match self {
            Shape::Sphere(s) => Some(s.bounds()),
            Shape::Plane(_) => None,
            Shape::Disc(s) => Some(s.bounds()),
            Shape::Triangle(s) => Some(s.bounds()),
            Shape::AxisAlignedBox(s) => Some(s.bounds()),
        };
    }

    pub fn center(&self) -> Point {
        return match self {
            Shape::Sphere(s) => s.center(),
            Shape::Plane(s) => s.center,
            Shape::Disc(s) => s.center(),
            Shape::Triangle(s) => s.center(),
            Shape::AxisAlignedBox(s) => s.center(),
        };
    }
}

impl Hittable for Shape {
    fn hit(&self, ray: &Ray) -> Option<Intersection> {
        return match self {
            Shape::Sphere(s) => s.hit(ray),
            Shape::Plane(s) => s.hit(ray),
            Shape::Disc(s) => s.hit(ray),
            Shape::Triangle(s) => s.hit(ray),
            Shape::AxisAlignedBox(s) => s.hit(ray),
        };
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Shape {
        return Shape::Sphere(s);
    }
}

impl From<Plane> for Shape {
    fn from(s: Plane) -> Shape {
        return Shape::Plane(s);
    }
}

impl From<Disc> for Shape {
    fn from(s: Disc) -> Shape {
        return Shape::Disc(s);
    }
}

impl From<Triangle> for Shape {
    fn from(s: Triangle) -> Shape {
        return Shape::Triangle(s);
    }
}

impl From<AxisAlignedBox> for Shape {
    fn from(s: AxisAlignedBox) -> Shape {
        return Shape::AxisAlignedBox(s);
    }
}

/// Nearest hit among `shapes`, by brute force.
pub fn intersect_linear<'a>(ray: &Ray, shapes: impl IntoIterator<Item = &'a Shape>) -> Option<Intersection> {
    let mut best = None;
    for shape in shapes {
        Intersection::replace(&mut best, shape.hit(ray));
    }
    return best;
}
