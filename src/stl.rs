//! Binary STL meshes.
//!
//! Layout: an 80 byte header, a little endian `u32` triangle count, then 50
//! bytes per triangle (normal and three vertices as `f32` triples, followed
//! by a `u16` attribute that is ignored).

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::geometry::Triangle;
use crate::utils::{Mat3f, Point, Vec3f};

const HEADER_LEN: usize = 80;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
const TRIANGLE_LEN: usize = 50;

#[derive(Error, Debug)]
pub enum StlError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("file is {0} bytes, shorter than the 84 byte preamble")]
    TooShort(usize),

    #[error("{0} bytes after the preamble is not a whole number of triangles")]
    Misaligned(usize),

    #[error("header declares {declared} triangles but the file holds {actual}")]
    CountMismatch { declared: u32, actual: usize },
}

type Result<T> = std::result::Result<T, StlError>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StlTriangle {
    pub normal: Vec3f,
    pub vertices: [Point; 3],
}

impl StlTriangle {
    /// Vertices are transformed first, then offset.
    pub fn to_triangle(&self, material: usize, offset: &Point, transform: &Mat3f) -> Triangle {
        let vertices = self.vertices.map(|v| transform * v + offset);
        return Triangle::new(material, vertices);
    }
}

#[derive(Debug, Clone)]
pub struct BinaryStl {
    pub header: [u8; HEADER_LEN],
    pub triangles: Vec<StlTriangle>,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    return u32::from_le_bytes(word);
}

fn read_vector(bytes: &[u8], offset: usize) -> Vec3f {
    let component = |i: usize| f32::from_bits(read_u32(bytes, offset + i * 4)) as f64;
    return Vec3f::new(component(0), component(1), component(2));
}

impl BinaryStl {
    pub fn parse(bytes: &[u8]) -> Result<BinaryStl> {
        if bytes.len() < PREAMBLE_LEN {
            return Err(StlError::TooShort(bytes.len()));
        }
        let body = bytes.len() - PREAMBLE_LEN;
        if body % TRIANGLE_LEN != 0 {
            return Err(StlError::Misaligned(body));
        }

        let count = body / TRIANGLE_LEN;
        let declared = read_u32(bytes, HEADER_LEN);
        if declared as usize != count {
            return Err(StlError::CountMismatch {
                declared: declared,
                actual: count,
            });
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);

        let triangles = (0..count)
            .map(|i| {
                let offset = PREAMBLE_LEN + i * TRIANGLE_LEN;
                StlTriangle {
                    normal: read_vector(bytes, offset),
                    vertices: [
                        read_vector(bytes, offset + 12),
                        read_vector(bytes, offset + 24),
                        read_vector(bytes, offset + 36),
                    ],
                }
            })
            .collect();

        return Ok(BinaryStl {
            header: header,
            triangles: triangles,
        });
    }

    pub fn read(path: impl AsRef<Path>) -> Result<BinaryStl> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let stl = BinaryStl::parse(&bytes)?;
        debug!(path = %path.display(), triangles = stl.triangles.len(), "read STL");
        return Ok(stl);
    }

    pub fn to_triangles(&self, material: usize, offset: Point, transform: Mat3f) -> Vec<Triangle> {
        return self
            .triangles
            .iter()
            .map(|t| t.to_triangle(material, &offset, &transform))
            .collect();
    }
}
