use std::f64;

use crate::utils::{MajorAxis, Point, Vec3f};

#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vec3f,
    pub inv_direction: Vec3f,
    pub major_axis: MajorAxis,
}

impl Ray {
    /// `direction` is expected to be normalised.
    pub fn new(origin: Point, direction: Vec3f) -> Ray {
        return Ray {
            origin: origin,
            direction: direction,
            inv_direction: direction.map(|v| 1.0 / v),
            major_axis: MajorAxis::of(&direction),
        };
    }

    pub fn point_at(&self, t: f64) -> Point {
        return self.origin + (t * self.direction);
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Intersection {
    pub material: usize,
    pub distance: f64,
    pub point: Point,
    pub normal: Vec3f,
    pub going_in: bool,
    /// Normal flipped to face the incoming ray.
    pub oriented_normal: Vec3f,
    pub uv: [f64; 2],
}

impl Intersection {
    pub fn new(ray: &Ray, material: usize, distance: f64, normal: Vec3f, uv: [f64; 2]) -> Intersection {
        let going_in = normal.dot(&ray.direction) < 0.0;
        return Intersection {
            material: material,
            distance: distance,
            point: ray.point_at(distance),
            normal: normal,
            going_in: going_in,
            oriented_normal: if going_in { normal } else { -normal },
            uv: uv,
        };
    }

    /// Keeps whichever of `best` and `candidate` is nearer, ignoring hits behind the origin.
    pub fn replace(best: &mut Option<Intersection>, candidate: Option<Intersection>) -> bool {
        let candidate = match candidate {
            Some(c) => c,
            None => return false,
        };

        let better = match best {
            None => true,
            Some(old) => candidate.distance < old.distance && candidate.distance > 0.0,
        };
        if better {
            *best = Some(candidate);
        }
        return better;
    }
}

/// Mirrors `v` (pointing at the surface) about `normal`.
pub fn reflect(v: &Vec3f, normal: &Vec3f) -> Vec3f {
    return v - normal * (2.0 * normal.dot(v));
}

/// Refracts `v` through a surface with oriented `normal`; `r` is n1 / n2.
/// Returns `None` on total internal reflection.
pub fn refract(v: &Vec3f, normal: &Vec3f, r: f64) -> Option<Vec3f> {
    let c = -v.dot(normal);
    let k = 1.0 - r * r * (1.0 - c * c);
    if k < 0.0 {
        return None;
    }
    return Some(v * r + normal * (r * c - k.sqrt()));
}

/// Lambertian and specular Blinn-Phong coefficients for a point light.
pub fn blinn_phong(light: &Point, point: &Point, normal: &Vec3f, view: &Vec3f, shininess: f64) -> (f64, f64) {
    let l = (light - point).normalize();
    let h = (l + view).normalize();

    let specular = h.dot(normal).max(0.0).powf(shininess);
    let lambertian = l.dot(normal).max(0.0);
    return (lambertian, specular);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(distance: f64) -> Intersection {
        let ray = Ray::new(Point::zeros(), Vec3f::new(0.0, 0.0, 1.0));
        return Intersection::new(&ray, 0, distance, Vec3f::new(0.0, 0.0, -1.0), [0.0, 0.0]);
    }

    #[test]
    fn intersection_orients_normal_towards_ray() {
        let ray = Ray::new(Point::zeros(), Vec3f::new(0.0, 0.0, 1.0));
        let hit = Intersection::new(&ray, 0, 2.0, Vec3f::new(0.0, 0.0, 1.0), [0.0, 0.0]);
        assert!(!hit.going_in);
        assert_eq!(hit.oriented_normal, Vec3f::new(0.0, 0.0, -1.0));
        assert_eq!(hit.point, Point::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn replace_keeps_nearest() {
        let mut best = None;
        assert!(Intersection::replace(&mut best, Some(hit_at(5.0))));
        assert!(Intersection::replace(&mut best, Some(hit_at(2.0))));
        assert!(!Intersection::replace(&mut best, Some(hit_at(3.0))));
        assert!(!Intersection::replace(&mut best, Some(hit_at(-1.0))));
        assert!(!Intersection::replace(&mut best, None));
        assert_eq!(best.unwrap().distance, 2.0);
    }

    #[test]
    fn reflection_flips_normal_component() {
        let v = Vec3f::new(1.0, -1.0, 0.0).normalize();
        let r = reflect(&v, &Vec3f::new(0.0, 1.0, 0.0));
        assert!((r - Vec3f::new(1.0, 1.0, 0.0).normalize()).norm() < 1e-12);
    }

    #[test]
    fn refraction_without_ior_change_is_straight() {
        let v = Vec3f::new(0.3, -1.0, 0.0).normalize();
        let r = refract(&v, &Vec3f::new(0.0, 1.0, 0.0), 1.0).unwrap();
        assert!((r - v).norm() < 1e-12);
    }

    #[test]
    fn grazing_exit_is_totally_reflected() {
        let v = Vec3f::new(1.0, -0.1, 0.0).normalize();
        assert!(refract(&v, &Vec3f::new(0.0, 1.0, 0.0), 1.5).is_none());
    }

    #[test]
    fn light_straight_above_is_fully_lit() {
        let (lambertian, specular) = blinn_phong(
            &Point::new(0.0, 10.0, 0.0),
            &Point::zeros(),
            &Vec3f::new(0.0, 1.0, 0.0),
            &Vec3f::new(0.0, 1.0, 0.0),
            16.0,
        );
        assert!((lambertian - 1.0).abs() < 1e-12);
        assert!((specular - 1.0).abs() < 1e-12);
    }
}
