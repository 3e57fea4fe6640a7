pub mod bench;
pub mod camera;
pub mod config;
pub mod dists;
pub mod error;
pub mod geometry;
pub mod histogram;
pub mod image;
pub mod integrator;
pub mod material;
pub mod plot;
pub mod random;
pub mod ray;
pub mod scene;
pub mod stl;
pub mod utils;

pub use crate::error::{Error, Result};
