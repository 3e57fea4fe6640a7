//! JSON scene description.
//!
//! A scene file lists named materials, one or more shape stores, the camera,
//! the integrator and where the image goes:
//!
//! ```json
//! {
//!   "camera": { "position": [0, 1, -5], "resolution": [320, 240], "look_at": [0, 0, 0] },
//!   "materials": [
//!     { "name": "white", "albedo": [1, 1, 1] },
//!     { "name": "lamp", "emittance": [5, 5, 5] }
//!   ],
//!   "stores": [
//!     { "kind": "linear", "shapes": [
//!       { "type": "plane", "material": "white", "center": [0, 0, 0], "normal": [0, 1, 0] },
//!       { "type": "disc", "material": "lamp", "center": [0, 4, 0], "normal": [0, -1, 0], "radius": 1 }
//!     ] },
//!     { "kind": "thin_bvh", "meshes": [ { "path": "teapot.stl", "material": "white" } ] }
//!   ],
//!   "integrator": { "sampler": "pt", "passes": 16 },
//!   "output": { "path": "out.exr" }
//! }
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::geometry::{AxisAlignedBox, Disc, Plane, Shape, Sphere, Triangle};
use crate::image::ExportFormat;
use crate::integrator::{Albedo, Averager, Integrator, MonteCarlo, PointLight, SamplerIntegrator, Statistics, Whitted};
use crate::material::{self, Material};
use crate::scene::{BvhParams, BvhTree, LinearStore, Scene, ShapeStore, ThinBvh};
use crate::stl::{BinaryStl, StlError};
use crate::utils::{degrees_to_radians, rotation, Mat3f, Vec3f};

/// Scene path meaning "read standard input".
pub const STDIN_PATH: &str = "-";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid scene description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load mesh {path}: {source}")]
    Mesh {
        path: PathBuf,
        #[source]
        source: StlError,
    },

    #[error("unknown index of refraction preset {0:?}")]
    UnknownIor(String),

    #[error("scene defines no materials")]
    NoMaterials,
}

type Result<T> = std::result::Result<T, ConfigError>;

fn to_vec(v: [f64; 3]) -> Vec3f {
    return Vec3f::new(v[0], v[1], v[2]);
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f64; 3],
    pub resolution: [usize; 2],
    pub fov: f64,
    pub focal_distance: f64,
    pub aperture: Option<f64>,
    /// Euler angles in degrees.
    pub look_deg: Option<[f64; 3]>,
    pub look_at: Option<[f64; 3]>,
}

impl Default for CameraConfig {
    fn default() -> CameraConfig {
        let camera = Camera::default();
        return CameraConfig {
            position: [0.0, 0.0, 0.0],
            resolution: [640, 360],
            fov: camera.fov_hint,
            focal_distance: camera.focal_distance,
            aperture: None,
            look_deg: None,
            look_at: None,
        };
    }
}

impl CameraConfig {
    pub fn build(&self) -> Camera {
        let mut camera = Camera::new(to_vec(self.position), self.resolution);
        camera.fov_hint = self.fov;
        camera.focal_distance = self.focal_distance;
        if let Some(aperture) = self.aperture {
            camera.aperture_diameter = aperture;
        }
        if let Some(angles) = self.look_deg {
            camera.set_look_deg(to_vec(angles));
        }
        if let Some(target) = self.look_at {
            camera.set_look_at(to_vec(target));
        }
        camera.prepare();
        return camera;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Ior {
    Value(f64),
    Preset(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reflectance: f64,
    pub ior: Option<Ior>,
    #[serde(default)]
    pub albedo: [f64; 3],
    #[serde(default)]
    pub emittance: [f64; 3],
}

impl MaterialConfig {
    pub fn build(&self) -> Result<Material> {
        let defaults = Material::default();
        let ior = match &self.ior {
            None => defaults.ior,
            Some(Ior::Value(v)) => *v,
            Some(Ior::Preset(name)) => material::ior_preset(name).ok_or_else(|| ConfigError::UnknownIor(name.clone()))?,
        };
        return Ok(Material {
            reflectance: self.reflectance,
            ior: ior,
            albedo: to_vec(self.albedo),
            emittance: to_vec(self.emittance),
        });
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ShapeConfig {
    Sphere {
        material: String,
        center: [f64; 3],
        radius: f64,
    },
    Plane {
        material: String,
        center: [f64; 3],
        normal: [f64; 3],
    },
    Disc {
        material: String,
        center: [f64; 3],
        normal: [f64; 3],
        radius: f64,
    },
    Triangle {
        material: String,
        vertices: [[f64; 3]; 3],
    },
    /// `vertices[0]` is the corner shared by the two edges.
    Parallelogram {
        material: String,
        vertices: [[f64; 3]; 3],
    },
    Box {
        material: String,
        min: [f64; 3],
        max: [f64; 3],
    },
}

impl ShapeConfig {
    fn material(&self) -> &str {
        return match self {
            ShapeConfig::Sphere { material, .. }
            | ShapeConfig::Plane { material, .. }
            | ShapeConfig::Disc { material, .. }
            | ShapeConfig::Triangle { material, .. }
            | ShapeConfig::Parallelogram { material, .. }
            | ShapeConfig::Box { material, .. } => material,
        };
    }

    pub fn build(&self, scene: &Scene) -> Shape {
        let material = resolve(scene, self.material());
        return match self {
            ShapeConfig::Sphere { center, radius, .. } => Sphere {
                center: to_vec(*center),
                radius: *radius,
                material: material,
            }
            .into(),
            ShapeConfig::Plane { center, normal, .. } => Plane::new(material, to_vec(*center), to_vec(*normal)).into(),
            ShapeConfig::Disc {
                center, normal, radius, ..
            } => Disc::new(material, to_vec(*center), to_vec(*normal), *radius).into(),
            ShapeConfig::Triangle { vertices, .. } => Triangle::new(material, vertices.map(to_vec)).into(),
            ShapeConfig::Parallelogram { vertices, .. } => Triangle::parallelogram(material, vertices.map(to_vec)).into(),
            ShapeConfig::Box { min, max, .. } => AxisAlignedBox::new(material, to_vec(*min), to_vec(*max)).into(),
        };
    }
}

fn resolve(scene: &Scene, alias: &str) -> usize {
    if !scene.has_material(alias) {
        warn!(material = alias, "unknown material, using the last one defined");
    }
    return scene.resolve_material(alias);
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshConfig {
    pub path: PathBuf,
    pub material: String,
    #[serde(default)]
    pub offset: [f64; 3],
    /// Euler angles in degrees, applied after scaling.
    #[serde(default)]
    pub rotation_deg: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    return 1.0;
}

impl MeshConfig {
    pub fn transform(&self) -> Mat3f {
        let angles = degrees_to_radians(to_vec(self.rotation_deg));
        return rotation(angles.x, angles.y, angles.z) * (Mat3f::identity() * self.scale);
    }

    pub fn load(&self, scene: &Scene, base_dir: &Path) -> Result<Vec<Shape>> {
        let path = base_dir.join(&self.path);
        let stl = BinaryStl::read(&path).map_err(|e| ConfigError::Mesh {
            path: path.clone(),
            source: e,
        })?;
        let material = resolve(scene, &self.material);
        let triangles = stl.to_triangles(material, to_vec(self.offset), self.transform());
        info!(path = %path.display(), triangles = triangles.len(), "mesh loaded");
        return Ok(triangles.into_iter().map(Shape::from).collect());
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Linear,
    Bvh,
    ThinBvh,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    #[serde(default)]
    pub shapes: Vec<ShapeConfig>,
    #[serde(default)]
    pub meshes: Vec<MeshConfig>,
    pub max_depth: Option<usize>,
    pub min_shapes: Option<usize>,
    /// Queried after this store, see [`ShapeStore::children`].
    #[serde(default)]
    pub children: Vec<StoreConfig>,
}

impl StoreConfig {
    fn params(&self) -> BvhParams {
        let defaults = BvhParams::default();
        return BvhParams {
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            min_shapes: self.min_shapes.unwrap_or(defaults.min_shapes),
        };
    }

    pub fn build(&self, scene: &Scene, base_dir: &Path) -> Result<Box<dyn ShapeStore>> {
        let mut shapes: Vec<Shape> = self.shapes.iter().map(|s| s.build(scene)).collect();
        for mesh in self.meshes.iter() {
            shapes.extend(mesh.load(scene, base_dir)?);
        }

        let count = shapes.len();
        let mut store: Box<dyn ShapeStore> = match self.kind {
            StoreKind::Linear => Box::new(shapes.into_iter().collect::<LinearStore>()),
            StoreKind::Bvh => Box::new(BvhTree::build(shapes, self.params())),
            StoreKind::ThinBvh => Box::new(ThinBvh::build(shapes, self.params())),
        };
        debug!(kind = ?self.kind, shapes = count, "store built");

        for child in self.children.iter() {
            store.insert_child(child.build(scene, base_dir)?);
        }
        return Ok(store);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    Albedo,
    /// Monte Carlo path tracing.
    #[serde(alias = "montecarlo")]
    Pt,
    Whitted,
    #[serde(alias = "statistics")]
    Stat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    pub position: [f64; 3],
    #[serde(default = "white")]
    pub emission: [f64; 3],
}

fn white() -> [f64; 3] {
    return [1.0, 1.0, 1.0];
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    pub sampler: SamplerKind,
    /// Wrap the sampler in an [`Averager`].
    pub average: bool,
    pub passes: usize,
    /// Whitted point lights; the built-in pair is used when absent.
    pub lights: Option<Vec<LightConfig>>,
    pub ambient: [f64; 3],
    pub threads: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for IntegratorConfig {
    fn default() -> IntegratorConfig {
        return IntegratorConfig {
            sampler: SamplerKind::Pt,
            average: true,
            passes: 1,
            lights: None,
            ambient: [0.0, 0.0, 0.0],
            threads: None,
            seed: None,
        };
    }
}

impl IntegratorConfig {
    fn wrap<S: crate::integrator::Sampler>(&self, sampler: S) -> Box<dyn Integrator> {
        let mut integrator = SamplerIntegrator::new(sampler);
        if let Some(threads) = self.threads {
            integrator = integrator.with_threads(threads);
        }
        if let Some(seed) = self.seed {
            integrator = integrator.with_seed(seed);
        }
        return Box::new(integrator);
    }

    pub fn build(&self) -> Box<dyn Integrator> {
        let inner = match self.sampler {
            SamplerKind::Albedo => self.wrap(Albedo),
            SamplerKind::Pt => self.wrap(MonteCarlo),
            SamplerKind::Stat => self.wrap(Statistics),
            SamplerKind::Whitted => {
                let mut whitted = Whitted::default();
                if let Some(lights) = &self.lights {
                    whitted.lights = lights
                        .iter()
                        .map(|l| PointLight {
                            position: to_vec(l.position),
                            emission: to_vec(l.emission),
                        })
                        .collect();
                }
                whitted.ambient = to_vec(self.ambient);
                self.wrap(whitted)
            }
        };

        if self.average {
            return Box::new(Averager::new(inner));
        }
        return inner;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Guessed from the extension of `path` when absent.
    pub format: Option<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> OutputConfig {
        return OutputConfig {
            path: PathBuf::from("out.png"),
            format: None,
        };
    }
}

impl OutputConfig {
    pub fn format(&self) -> ExportFormat {
        return self
            .format
            .or_else(|| ExportFormat::from_path(&self.path))
            .unwrap_or(ExportFormat::Png);
    }
}

/// Everything needed to render, resolved from a [`SceneConfig`].
pub struct RenderJob {
    pub camera: Camera,
    pub scene: Arc<Scene>,
    pub integrator: IntegratorConfig,
    pub output: OutputConfig,
}

impl RenderJob {
    /// Renders every configured pass and returns the integrator holding the result.
    pub fn run(&self, show_progress: bool) -> Box<dyn Integrator> {
        let mut integrator = self.integrator.build();
        integrator.set_camera(self.camera);
        integrator.set_scene(Arc::clone(&self.scene));
        crate::integrator::render_passes(integrator.as_mut(), self.integrator.passes, show_progress);
        return integrator;
    }
}

impl SceneConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<SceneConfig> {
        return Ok(serde_json::from_reader(reader)?);
    }

    pub fn parse(text: &str) -> Result<SceneConfig> {
        return Ok(serde_json::from_str(text)?);
    }

    /// Reads a scene file, or standard input for [`STDIN_PATH`].
    pub fn load(path: &Path) -> Result<SceneConfig> {
        if path == Path::new(STDIN_PATH) {
            return SceneConfig::from_reader(io::stdin().lock());
        }
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        return SceneConfig::parse(&text);
    }

    /// Relative mesh paths are resolved against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<RenderJob> {
        if self.materials.is_empty() {
            return Err(ConfigError::NoMaterials);
        }

        let mut scene = Scene::new();
        for m in self.materials.iter() {
            scene.insert_material(m.build()?, &m.name);
        }
        for store in self.stores.iter() {
            let built = store.build(&scene, base_dir)?;
            scene.insert_store(built);
        }
        info!(
            materials = scene.material_count(),
            stores = scene.store_count(),
            shapes = scene.total_shape_count(),
            "scene built"
        );

        return Ok(RenderJob {
            camera: self.camera.build(),
            scene: Arc::new(scene),
            integrator: self.integrator.clone(),
            output: self.output.clone(),
        });
    }
}

/// Directory relative mesh paths of the scene at `path` are resolved against.
pub fn base_dir(path: &Path) -> PathBuf {
    if path == Path::new(STDIN_PATH) {
        return PathBuf::from(".");
    }
    return match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ray::Ray;
    use crate::scene::RayStats;
    use crate::utils::Point;

    const SCENE: &str = r#"{
        "camera": { "position": [0, 0, -5], "resolution": [16, 12], "aperture": 0, "look_at": [0, 0, 0] },
        "materials": [
            { "name": "glass", "ior": "glass", "albedo": [0.9, 0.9, 0.9] },
            { "name": "lamp", "emittance": [4, 4, 4] },
            { "name": "mirror", "reflectance": 1, "ior": 1.2 }
        ],
        "stores": [
            { "kind": "linear", "shapes": [
                { "type": "sphere", "material": "glass", "center": [0, 0, 0], "radius": 1 },
                { "type": "plane", "material": "mirror", "center": [0, -1, 0], "normal": [0, 1, 0] }
            ], "children": [
                { "kind": "bvh", "min_shapes": 1, "shapes": [
                    { "type": "box", "material": "lamp", "min": [2, 2, 2], "max": [3, 3, 3] },
                    { "type": "parallelogram", "material": "lamp", "vertices": [[-3, 0, 4], [-2, 0, 4], [-3, 1, 4]] }
                ] }
            ] },
            { "kind": "thin_bvh", "shapes": [
                { "type": "disc", "material": "lamp", "center": [0, 5, 0], "normal": [0, -1, 0], "radius": 1 },
                { "type": "triangle", "material": "nope", "vertices": [[5, 0, 0], [6, 0, 0], [5, 1, 0]] }
            ] }
        ],
        "integrator": { "sampler": "whitted", "average": false, "passes": 2, "threads": 2, "seed": 3,
                        "lights": [ { "position": [0, 5, -5] } ] },
        "output": { "path": "render.exr" }
    }"#;

    #[test]
    fn parses_and_builds_a_full_scene() {
        let config = SceneConfig::parse(SCENE).unwrap();
        assert_eq!(config.integrator.sampler, SamplerKind::Whitted);
        assert_eq!(config.output.format(), ExportFormat::Exr);

        let job = config.build(Path::new(".")).unwrap();
        assert_eq!(job.scene.material_count(), 3);
        assert_eq!(job.scene.material(0).ior, 1.51714);
        assert_eq!(job.scene.total_shape_count(), 6);
        assert_eq!(job.camera.resolution, [16, 12]);

        let ray = Ray::new(Point::new(0.0, 0.0, -5.0), Vec3f::new(0.0, 0.0, 1.0));
        let hit = job.scene.intersect(&ray, &mut RayStats::default()).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-9);
        assert_eq!(hit.material, job.scene.resolve_material("glass"));
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = SceneConfig::parse(r#"{ "materials": [ { "albedo": [1, 1, 1] } ] }"#).unwrap();
        assert_eq!(config.integrator.sampler, SamplerKind::Pt);
        assert_eq!(config.integrator.passes, 1);
        assert_eq!(config.output.format(), ExportFormat::Png);
        assert_eq!(config.camera.resolution, [640, 360]);
        assert_eq!(config.materials[0].build().unwrap().ior, 1.003);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(SceneConfig::parse("{"), Err(ConfigError::Json(_))));
        assert!(matches!(
            SceneConfig::parse(r#"{ "materials": [], "bogus": 1 }"#),
            Err(ConfigError::Json(_))
        ));

        let config = SceneConfig::parse(r#"{ "materials": [] }"#).unwrap();
        assert!(matches!(config.build(Path::new(".")), Err(ConfigError::NoMaterials)));

        let config = SceneConfig::parse(r#"{ "materials": [ { "ior": "kryptonite" } ] }"#).unwrap();
        assert!(matches!(config.build(Path::new(".")), Err(ConfigError::UnknownIor(_))));

        let missing = SceneConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn meshes_resolve_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for v in [[0.0f32, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&[0, 0]);
        std::fs::write(dir.path().join("tri.stl"), bytes).unwrap();

        let config = SceneConfig::parse(
            r#"{ "materials": [ { "name": "white" } ],
                 "stores": [ { "kind": "linear", "meshes": [ { "path": "tri.stl", "material": "white", "scale": 2 } ] } ] }"#,
        )
        .unwrap();
        let job = config.build(dir.path()).unwrap();
        assert_eq!(job.scene.total_shape_count(), 1);

        let absent = config.build(Path::new("/definitely/not/here"));
        assert!(matches!(absent, Err(ConfigError::Mesh { .. })));
    }

    #[test]
    fn base_dir_of_scene_paths() {
        assert_eq!(base_dir(Path::new("-")), PathBuf::from("."));
        assert_eq!(base_dir(Path::new("scene.json")), PathBuf::from("."));
        assert_eq!(base_dir(Path::new("scenes/a.json")), PathBuf::from("scenes"));
    }

    #[test]
    fn job_renders_configured_passes() {
        let config = SceneConfig::parse(SCENE).unwrap();
        let job = config.build(Path::new(".")).unwrap();
        let mut integrator = job.run(false);
        let image = integrator.image();
        assert_eq!((image.width(), image.height()), (16, 12));
        // the lit front of the sphere sits in the middle of the frame
        assert!(image.at(8, 6).norm() > 0.0);
    }
}
