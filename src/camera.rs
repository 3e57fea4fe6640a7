use std::f64;

use rand::RngCore;

use crate::random;
use crate::ray::Ray;
use crate::utils::{degrees_to_radians, rotation, rotation_aligning, Mat3f, Point, Vec3f};

/// Pinhole camera looking down +Z before `ray_transform` is applied, with an
/// optional thin lens.
#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub position: Point,
    pub resolution: [usize; 2],
    pub ray_transform: Mat3f,
    /// Horizontal field of view in degrees.
    pub fov_hint: f64,
    pub focal_distance: f64,
    /// Thin lens is skipped at or below 0.001.
    pub aperture_diameter: f64,

    resolution_scale: f64,
    scaled_resolution: [f64; 2],
    viewing_plane_distance: f64,
}

impl Default for Camera {
    fn default() -> Camera {
        return Camera {
            position: Point::zeros(),
            resolution: [0, 0],
            ray_transform: Mat3f::identity(),
            fov_hint: 45.0,
            focal_distance: 1.0,
            aperture_diameter: 1.0,
            resolution_scale: 0.0,
            scaled_resolution: [0.0, 0.0],
            viewing_plane_distance: 0.0,
        };
    }
}

impl Camera {
    pub fn new(position: Point, resolution: [usize; 2]) -> Camera {
        let mut camera = Camera {
            position: position,
            resolution: resolution,
            ..Camera::default()
        };
        camera.prepare();
        return camera;
    }

    pub fn set_look_deg(&mut self, angles: Vec3f) -> &mut Camera {
        return self.set_look_rad(degrees_to_radians(angles));
    }

    pub fn set_look_rad(&mut self, angles: Vec3f) -> &mut Camera {
        self.ray_transform = rotation(angles.x, angles.y, angles.z);
        return self;
    }

    /// Turns the camera so that +Z points at `target`.
    pub fn set_look_at(&mut self, target: Point) -> &mut Camera {
        let forward = Vec3f::new(0.0, 0.0, 1.0);
        let d = (target - self.position).normalize();
        if d.dot(&forward) < -1.0 + 1e-9 {
            // straight behind: any half turn will do
            self.ray_transform = rotation(0.0, f64::consts::PI, 0.0);
        } else {
            self.ray_transform = rotation_aligning(&forward, &d);
        }
        return self;
    }

    /// Derives the viewing plane from the field of view. Call after changing
    /// the resolution, fov or focal distance.
    pub fn prepare(&mut self) {
        let half_width = self.resolution[0] as f64 / 2.0;
        let half_fov = self.fov_hint / 2.0;

        self.viewing_plane_distance = half_width / (half_fov / 180.0 * f64::consts::PI).tan();
        self.resolution_scale = self.focal_distance / self.viewing_plane_distance;
        self.scaled_resolution = [
            self.resolution[0] as f64 * self.resolution_scale,
            self.resolution[1] as f64 * self.resolution_scale,
        ];
    }

    pub fn viewing_plane_distance(&self) -> f64 {
        return self.viewing_plane_distance;
    }

    /// Primary ray through pixel (`x`, `y`), jittered inside the pixel.
    pub fn make_ray<R: RngCore + ?Sized>(&self, x: usize, y: usize, rng: &mut R) -> Ray {
        let nudge = random::unit_disk(rng);
        let base = Vec3f::new(
            (x as f64 + nudge[0] - 0.5) * self.resolution_scale - self.scaled_resolution[0] / 2.0,
            (-(y as f64) + nudge[1] - 0.5) * self.resolution_scale + self.scaled_resolution[1] / 2.0,
            self.focal_distance,
        );

        if self.aperture_diameter > 0.001 {
            let offset = random::unit_disk(rng);
            let offset = Vec3f::new(offset[0], offset[1], 0.0) * self.aperture_diameter;
            return Ray::new(
                self.position + self.ray_transform * offset,
                (self.ray_transform * base - offset).normalize(),
            );
        }

        return Ray::new(self.position, (self.ray_transform * base).normalize());
    }
}
