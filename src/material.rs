use std::f64;

use rand::RngCore;

use crate::random;
use crate::ray::{reflect, Intersection, Ray};
use crate::utils::{Color, SENSIBLE_EPS};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    /// 1 is a perfect mirror.
    pub reflectance: f64,
    /// Index of refraction.
    pub ior: f64,
    pub albedo: Color,
    pub emittance: Color,
}

impl Default for Material {
    fn default() -> Material {
        return Material {
            reflectance: 0.0,
            ior: 1.003,
            albedo: Color::zeros(),
            emittance: Color::zeros(),
        };
    }
}

impl Material {
    pub fn diffuse(albedo: Color) -> Material {
        return Material {
            albedo: albedo,
            ..Material::default()
        };
    }

    pub fn emissive(emittance: Color) -> Material {
        return Material {
            emittance: emittance,
            ..Material::default()
        };
    }

    /// Continues a path at `hit`: a mirror bounce with probability `reflectance`,
    /// otherwise a uniformly random direction.
    pub fn scatter<R: RngCore + ?Sized>(&self, ray: &Ray, hit: &Intersection, rng: &mut R) -> Ray {
        let origin = hit.point + hit.oriented_normal * SENSIBLE_EPS;
        if random::uniform_normalised(rng) > self.reflectance {
            return Ray::new(origin, random::unit_vector(rng));
        }
        return Ray::new(origin, reflect(&ray.direction, &hit.oriented_normal));
    }

    pub fn is_mirror(&self) -> bool {
        return self.reflectance >= 0.95;
    }
}

/// Indices of refraction for some common substances.
const IOR_PRESETS: &[(&str, f64)] = &[
    ("acetone", 1.36),
    ("air", 1.0002926),
    ("alcohol", 1.329),
    ("amber", 1.546),
    ("benzene", 1.501),
    ("copper", 1.10),
    ("diamond", 2.417),
    ("emerald", 1.576),
    ("ethanol", 1.36),
    ("glass", 1.51714),
    ("glass_crown", 1.520),
    ("glass_flint_dense", 1.66),
    ("glass_flint_light", 1.58038),
    ("glycerine", 1.473),
    ("gold", 0.47),
    ("ice", 1.309),
    ("plastic", 1.460),
    ("plexiglas", 1.50),
    ("polystyrene", 1.55),
    ("quartz", 1.544),
    ("ruby", 1.760),
    ("sapphire", 1.760),
    ("silicon", 4.24),
    ("silver", 0.18),
    ("steel", 2.50),
    ("teflon", 1.35),
    ("topaz", 1.620),
    ("water", 1.33335),
    ("zircon_high", 1.960),
    ("zircon_low", 1.800),
    ("zirconia_cubic", 2.170),
];

/// Looks up a preset by name, case insensitively. `-` and ` ` match `_`.
pub fn ior_preset(name: &str) -> Option<f64> {
    let key = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    return IOR_PRESETS
        .iter()
        .find(|(preset, _)| *preset == key)
        .map(|&(_, ior)| ior);
}

pub fn ior_preset_names() -> impl Iterator<Item = &'static str> {
    return IOR_PRESETS.iter().map(|&(name, _)| name);
}
