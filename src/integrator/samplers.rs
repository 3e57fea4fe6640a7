use crate::random::{self, Lcg48};
use crate::ray::{blinn_phong, reflect, Ray};
use crate::scene::{RayStats, Scene, ShapeStore};
use crate::utils::{Color, Point, SENSIBLE_EPS};

/// Flat albedo of whatever the ray hits first.
#[derive(Debug, Default, Copy, Clone)]
pub struct Albedo;

impl super::Sampler for Albedo {
    fn sample(&self, ray: &Ray, scene: &Scene, _rng: &mut Lcg48) -> Color {
        let mut stats = RayStats::default();
        return match scene.intersect(ray, &mut stats) {
            Some(hit) => scene.material(hit.material).albedo,
            None => Color::zeros(),
        };
    }
}

/// Unidirectional path tracer.
///
/// Emission is collected whenever a path enters a surface. After depth 7 a
/// path survives each bounce with probability 0.8.
#[derive(Debug, Default, Copy, Clone)]
pub struct MonteCarlo;

const ROULETTE_DEPTH: usize = 7;
const ROULETTE_CONTINUE: f64 = 0.8;

impl super::Sampler for MonteCarlo {
    fn sample(&self, ray: &Ray, scene: &Scene, rng: &mut Lcg48) -> Color {
        let mut radiance = Color::zeros();
        let mut throughput = Color::new(1.0, 1.0, 1.0);
        let mut previous_cosine = 1.0;
        let mut stats = RayStats::default();
        let mut current = *ray;

        for depth in 0.. {
            if depth > ROULETTE_DEPTH && random::uniform_normalised(rng) > ROULETTE_CONTINUE {
                break;
            }

            let hit = match scene.intersect(&current, &mut stats) {
                Some(hit) => hit,
                None => break,
            };
            let material = scene.material(hit.material);

            if hit.going_in {
                radiance += material.emittance.component_mul(&throughput) * previous_cosine;
            }
            throughput = throughput.component_mul(&material.albedo);

            current = material.scatter(&current, &hit, rng);
            previous_cosine = current.direction.dot(&hit.oriented_normal);
        }

        return radiance;
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub position: Point,
    pub emission: Color,
}

/// Whitted style ray tracer: point lights with shadow rays and Blinn-Phong
/// shading, perfect mirrors followed up to depth 8.
#[derive(Debug, Clone)]
pub struct Whitted {
    pub lights: Vec<PointLight>,
    pub ambient: Color,
}

const WHITTED_DEPTH: usize = 8;
const SHININESS: f64 = 16.0;

impl Default for Whitted {
    fn default() -> Whitted {
        return Whitted {
            lights: vec![
                PointLight {
                    position: Point::new(-10.0, 10.0, -2.5),
                    emission: Color::new(1.0, 1.0, 1.0),
                },
                PointLight {
                    position: Point::new(10.0, 10.0, -2.5),
                    emission: Color::new(1.0, 1.0, 1.0),
                },
            ],
            ambient: Color::zeros(),
        };
    }
}

impl Whitted {
    pub fn new(lights: Vec<PointLight>) -> Whitted {
        return Whitted {
            lights: lights,
            ambient: Color::zeros(),
        };
    }

    fn trace(&self, ray: &Ray, scene: &Scene, depth: usize, stats: &mut RayStats) -> Color {
        if depth >= WHITTED_DEPTH {
            return Color::zeros();
        }

        let hit = match scene.intersect(ray, stats) {
            Some(hit) => hit,
            None => return Color::zeros(),
        };
        let material = scene.material(hit.material);
        let safe_spot = hit.point + hit.oriented_normal * SENSIBLE_EPS;

        if material.is_mirror() {
            let reflected = Ray::new(safe_spot, reflect(&ray.direction, &hit.oriented_normal));
            return self.trace(&reflected, scene, depth + 1, stats);
        }

        let mut lambertian = Color::zeros();
        let mut specular = Color::zeros();
        for light in self.lights.iter() {
            let to_light = light.position - hit.point;
            let distance = to_light.norm();

            let shadow = Ray::new(safe_spot, to_light / distance);
            if let Some(blocker) = scene.intersect(&shadow, stats) {
                if blocker.distance < distance {
                    continue;
                }
            }

            let (c_lamb, c_spec) = blinn_phong(
                &light.position,
                &hit.point,
                &hit.oriented_normal,
                &-ray.direction,
                SHININESS,
            );
            lambertian += light.emission * c_lamb;
            specular += light.emission * c_spec;
        }

        return material.albedo.component_mul(&(lambertian + specular + self.ambient));
    }
}

impl super::Sampler for Whitted {
    fn sample(&self, ray: &Ray, scene: &Scene, _rng: &mut Lcg48) -> Color {
        let mut stats = RayStats::default();
        return self.trace(ray, scene, 0, &mut stats);
    }
}

/// Visualises acceleration structure cost: red is bound checks, green is shape checks.
#[derive(Debug, Default, Copy, Clone)]
pub struct Statistics;

impl super::Sampler for Statistics {
    fn sample(&self, ray: &Ray, scene: &Scene, _rng: &mut Lcg48) -> Color {
        let mut stats = RayStats::default();
        scene.intersect(ray, &mut stats);
        return Color::new(stats.bound_checks as f64, stats.shape_checks as f64, 0.0);
    }
}
