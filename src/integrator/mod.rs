mod samplers;

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use rand::{RngCore, SeedableRng};
use threadpool::ThreadPool;
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::image::Image;
use crate::random::Lcg48;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::utils::Color;

pub use self::samplers::{Albedo, MonteCarlo, PointLight, Statistics, Whitted};

pub trait Integrator: Send {
    fn set_camera(&mut self, camera: Camera);

    fn set_scene(&mut self, scene: Arc<Scene>);

    /// Renders one full pass.
    fn render(&mut self);

    fn image(&mut self) -> &Image;
}

/// Colour along one primary ray.
pub trait Sampler: Send + Sync + 'static {
    fn sample(&self, ray: &Ray, scene: &Scene, rng: &mut Lcg48) -> Color;
}

pub fn default_thread_count() -> usize {
    return thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
}

/// Shoots one camera ray per pixel and hands it to a [`Sampler`].
///
/// Rows are split into one contiguous band per worker. Every band gets its own
/// generator, seeded from the integrator's generator, so a fixed seed renders
/// the same image regardless of scheduling. Band seeds go through
/// `seed_from_u64` since consecutive LCG outputs would only shift one stream.
pub struct SamplerIntegrator<S: Sampler> {
    sampler: Arc<S>,
    scene: Arc<Scene>,
    camera: Camera,
    image: Image,
    threads: usize,
    rng: Lcg48,
}

impl<S: Sampler> SamplerIntegrator<S> {
    pub fn new(sampler: S) -> SamplerIntegrator<S> {
        return SamplerIntegrator {
            sampler: Arc::new(sampler),
            scene: Arc::new(Scene::new()),
            camera: Camera::default(),
            image: Image::new(0, 0),
            threads: default_thread_count(),
            rng: Lcg48::new(rand::random()),
        };
    }

    pub fn with_threads(mut self, threads: usize) -> SamplerIntegrator<S> {
        self.threads = threads.max(1);
        return self;
    }

    pub fn with_seed(mut self, seed: u64) -> SamplerIntegrator<S> {
        self.rng = Lcg48::new(seed);
        return self;
    }
}

impl<S: Sampler> Integrator for SamplerIntegrator<S> {
    fn set_camera(&mut self, mut camera: Camera) {
        camera.prepare();
        self.image.resize(camera.resolution[0], camera.resolution[1]);
        self.camera = camera;
    }

    fn set_scene(&mut self, scene: Arc<Scene>) {
        self.scene = scene;
    }

    fn render(&mut self) {
        let [width, height] = self.camera.resolution;
        if width == 0 || height == 0 {
            return;
        }

        let band = (height + self.threads - 1) / self.threads;
        let pool = ThreadPool::new(self.threads);
        let (tx, rx) = channel();

        for start in (0..height).step_by(band) {
            let end = (start + band).min(height);
            let tx = tx.clone();
            let sampler = Arc::clone(&self.sampler);
            let scene = Arc::clone(&self.scene);
            let camera = self.camera;
            let mut rng = Lcg48::seed_from_u64(self.rng.next_u64());

            pool.execute(move || {
                for y in start..end {
                    let row: Vec<Color> = (0..width)
                        .map(|x| {
                            let ray = camera.make_ray(x, y, &mut rng);
                            sampler.sample(&ray, &scene, &mut rng)
                        })
                        .collect();
                    if tx.send((y, row)).is_err() {
                        return;
                    }
                }
            });
        }

        pool.join();
        drop(tx);

        if pool.panic_count() > 0 {
            warn!(panics = pool.panic_count(), "render workers panicked, some rows stay stale");
        }

        for (y, row) in rx.iter() {
            self.image.row_mut(y).copy_from_slice(&row);
        }
        debug!(width = width, height = height, threads = self.threads, "pass rendered");
    }

    fn image(&mut self) -> &Image {
        return &self.image;
    }
}

/// Sums successive passes of another integrator and reports their mean.
pub struct Averager {
    inner: Box<dyn Integrator>,
    sum: Image,
    average: Image,
    passes: usize,
}

impl Averager {
    pub fn new(inner: Box<dyn Integrator>) -> Averager {
        return Averager {
            inner: inner,
            sum: Image::new(0, 0),
            average: Image::new(0, 0),
            passes: 0,
        };
    }

    pub fn passes(&self) -> usize {
        return self.passes;
    }
}

impl Integrator for Averager {
    fn set_camera(&mut self, camera: Camera) {
        self.inner.set_camera(camera);
        self.sum.resize(camera.resolution[0], camera.resolution[1]);
        self.average.resize(camera.resolution[0], camera.resolution[1]);
    }

    fn set_scene(&mut self, scene: Arc<Scene>) {
        self.inner.set_scene(scene);
    }

    fn render(&mut self) {
        self.inner.render();
        self.sum.accumulate(self.inner.image());
        self.passes += 1;
    }

    fn image(&mut self) -> &Image {
        let passes = self.passes.max(1) as f64;
        self.average = self.sum.map_channels(|v| v / passes);
        return &self.average;
    }
}

/// Runs `passes` passes with a progress bar on stderr.
pub fn render_passes(integrator: &mut dyn Integrator, passes: usize, show_progress: bool) {
    let progress = if show_progress {
        ProgressBar::new(passes as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} passes ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for pass in 0..passes {
        integrator.render();
        progress.inc(1);
        debug!(pass = pass + 1, "pass done");
    }
    progress.finish_and_clear();
    info!(passes = passes, "render finished");
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::geometry::Sphere;
    use crate::random;
    use crate::material::Material;
    use crate::scene::{LinearStore, ShapeStore};
    use crate::utils::Point;

    struct Constant(Color);

    impl Sampler for Constant {
        fn sample(&self, _ray: &Ray, _scene: &Scene, _rng: &mut Lcg48) -> Color {
            return self.0;
        }
    }

    fn camera(width: usize, height: usize) -> Camera {
        let mut camera = Camera::new(Point::zeros(), [width, height]);
        camera.aperture_diameter = 0.0;
        return camera;
    }

    fn sphere_scene(material: Material) -> Arc<Scene> {
        let mut scene = Scene::new();
        let index = scene.insert_material(material, "sphere");
        let mut store = LinearStore::new();
        store.insert(
            Sphere {
                center: Point::new(0.0, 0.0, 5.0),
                radius: 1.0,
                material: index,
            }
            .into(),
        );
        scene.insert_store(Box::new(store));
        return Arc::new(scene);
    }

    #[test]
    fn every_pixel_is_sampled() {
        let mut integrator = SamplerIntegrator::new(Constant(Color::new(0.5, 1.0, 2.0))).with_threads(3);
        integrator.set_camera(camera(7, 5));
        integrator.render();
        let image = integrator.image();
        assert_eq!((image.width(), image.height()), (7, 5));
        assert!(image.pixels().iter().all(|&c| c == Color::new(0.5, 1.0, 2.0)));
    }

    #[test]
    fn albedo_sees_the_sphere_in_the_middle() {
        let mut integrator = SamplerIntegrator::new(Albedo).with_threads(2);
        integrator.set_camera(camera(9, 9));
        integrator.set_scene(sphere_scene(Material::diffuse(Color::new(1.0, 0.0, 0.0))));
        integrator.render();
        let image = integrator.image();
        assert_eq!(image.at(4, 4), Color::new(1.0, 0.0, 0.0));
        assert_eq!(image.at(0, 0), Color::zeros());
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let render = || {
            let mut integrator = SamplerIntegrator::new(MonteCarlo).with_threads(2).with_seed(11);
            let mut camera = camera(6, 4);
            camera.aperture_diameter = 0.5;
            integrator.set_camera(camera);
            integrator.set_scene(sphere_scene(Material {
                albedo: Color::new(0.5, 0.5, 0.5),
                emittance: Color::new(1.0, 1.0, 1.0),
                ..Material::default()
            }));
            integrator.render();
            integrator.image().clone()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn averager_of_identical_passes_is_the_pass() {
        let inner = SamplerIntegrator::new(Constant(Color::new(0.25, 0.5, 0.75))).with_threads(2);
        let mut averager = Averager::new(Box::new(inner));
        averager.set_camera(camera(4, 3));
        render_passes(&mut averager, 3, false);
        assert_eq!(averager.passes(), 3);
        assert!(averager
            .image()
            .pixels()
            .iter()
            .all(|c| (c - Color::new(0.25, 0.5, 0.75)).norm() < 1e-12));
    }

    struct Uniform;

    impl Sampler for Uniform {
        fn sample(&self, _ray: &Ray, _scene: &Scene, rng: &mut Lcg48) -> Color {
            return Color::new(random::uniform_normalised(rng), 0.0, 0.0);
        }
    }

    fn draws(image: &Image, rows: std::ops::Range<usize>) -> HashSet<u64> {
        let width = image.width();
        return rows
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| image.at(x, y).x.to_bits())
            .collect();
    }

    #[test]
    fn bands_and_passes_draw_fresh_numbers() {
        let mut integrator = SamplerIntegrator::new(Uniform).with_threads(2).with_seed(11);
        integrator.set_camera(camera(32, 32));
        integrator.render();
        let first = integrator.image().clone();
        integrator.render();
        let second = integrator.image().clone();

        let first_pass = draws(&first, 0..32);
        let repeated = draws(&second, 0..32).intersection(&first_pass).count();
        assert_eq!(repeated, 0);

        let top_band = draws(&first, 0..16);
        let shared = draws(&first, 16..32).intersection(&top_band).count();
        assert_eq!(shared, 0);
    }

    #[test]
    fn averaging_passes_reduces_variance() {
        let passes = 64;
        let inner = SamplerIntegrator::new(Uniform).with_threads(2).with_seed(11);
        let mut averager = Averager::new(Box::new(inner));
        averager.set_camera(camera(16, 16));
        render_passes(&mut averager, passes, false);

        let values: Vec<f64> = averager.image().pixels().iter().map(|c| c.x).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        // a single uniform draw has variance 1/12
        let independent = 1.0 / 12.0 / passes as f64;
        assert!((mean - 0.5).abs() < 0.02);
        assert!(variance < independent * 2.0, "variance {} vs {}", variance, independent);
    }

    #[test]
    fn empty_resolution_renders_nothing() {
        let mut integrator = SamplerIntegrator::new(Albedo);
        integrator.set_camera(Camera::default());
        integrator.render();
        assert!(integrator.image().pixels().is_empty());
    }
}
