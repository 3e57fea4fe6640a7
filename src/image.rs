use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ::image::{ImageBuffer, Rgb, Rgb32FImage, Rgba, RgbaImage};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::utils::{self, Color};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot export an empty image")]
    Empty,

    #[error("unknown image format {0:?}, expected png or exr")]
    UnknownFormat(String),

    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

type Result<T> = std::result::Result<T, ExportError>;

/// Row major RGB image, `(0, 0)` is the top left pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Image {
        return Image {
            width: width,
            height: height,
            pixels: vec![Color::zeros(); width * height],
        };
    }

    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    pub fn pixels(&self) -> &[Color] {
        return &self.pixels;
    }

    pub fn at(&self, x: usize, y: usize) -> Color {
        return self.pixels[y * self.width + x];
    }

    pub fn at_mut(&mut self, x: usize, y: usize) -> &mut Color {
        return &mut self.pixels[y * self.width + x];
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [Color] {
        let start = y * self.width;
        return &mut self.pixels[start..start + self.width];
    }

    /// Keeps the overlapping top left region; new pixels are black.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }

        let mut pixels = vec![Color::zeros(); width * height];
        let copy_width = width.min(self.width);
        for y in 0..height.min(self.height) {
            let src = y * self.width;
            let dst = y * width;
            pixels[dst..dst + copy_width].copy_from_slice(&self.pixels[src..src + copy_width]);
        }

        self.width = width;
        self.height = height;
        self.pixels = pixels;
    }

    pub fn fill(&mut self, color: Color) {
        for p in self.pixels.iter_mut() {
            *p = color;
        }
    }

    /// Adds `other` pixel by pixel. Both images must have the same size.
    pub fn accumulate(&mut self, other: &Image) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (dst, src) in self.pixels.iter_mut().zip(other.pixels.iter()) {
            *dst += src;
        }
    }

    /// Runs `filter` over every channel of every pixel.
    pub fn map_channels(&self, filter: impl Fn(f64) -> f64) -> Image {
        return Image {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|c| c.map(&filter)).collect(),
        };
    }

    /// Smallest and largest pixel magnitude.
    pub fn magnitude_range(&self) -> Option<(f64, f64)> {
        if self.pixels.is_empty() {
            return None;
        }
        let (min_sq, max_sq) = self
            .pixels
            .iter()
            .map(|c| c.norm_squared())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        return Some((min_sq.sqrt(), max_sq.sqrt()));
    }

    /// 8-bit RGBA, channels normalised by the magnitude range and clamped.
    pub fn to_rgba(&self) -> RgbaImage {
        let (min, max) = self.magnitude_range().unwrap_or((0.0, 1.0));
        let filter = filters::sequence(
            filters::sequence(filters::inv_lerp(min, max), filters::clamp(0.0, 1.0)),
            filters::scale(255.0),
        );

        let mut out: RgbaImage = ImageBuffer::new(self.width as u32, self.height as u32);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let c = self.at(x as usize, y as usize);
            *pixel = Rgba([filter(c.x) as u8, filter(c.y) as u8, filter(c.z) as u8, 255]);
        }
        return out;
    }

    pub fn to_rgb32f(&self) -> Rgb32FImage {
        let mut out: Rgb32FImage = ImageBuffer::new(self.width as u32, self.height as u32);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let c = self.at(x as usize, y as usize);
            *pixel = Rgb([c.x as f32, c.y as f32, c.z as f32]);
        }
        return out;
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<()> {
        if self.pixels.is_empty() {
            return Err(ExportError::Empty);
        }

        match format {
            ExportFormat::Png => self.to_rgba().save_with_format(path, ::image::ImageFormat::Png)?,
            ExportFormat::Exr => self.to_rgb32f().save_with_format(path, ::image::ImageFormat::OpenExr)?,
        }
        info!(path = %path.display(), format = %format, "image exported");
        return Ok(());
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    /// OpenEXR, 32-bit float channels.
    Exr,
}

impl ExportFormat {
    /// Guessed from the file extension.
    pub fn from_path(path: &Path) -> Option<ExportFormat> {
        let ext = path.extension()?.to_str()?;
        return ext.parse().ok();
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> std::result::Result<ExportFormat, ExportError> {
        return match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "exr" => Ok(ExportFormat::Exr),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        };
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return match self {
            ExportFormat::Png => write!(f, "png"),
            ExportFormat::Exr => write!(f, "exr"),
        };
    }
}

/// Per channel filters, composed with [`filters::sequence`].
pub mod filters {
    use super::utils;

    pub fn lerp(min: f64, max: f64) -> impl Fn(f64) -> f64 {
        return move |v| utils::lerp(min, max, v);
    }

    pub fn inv_lerp(min: f64, max: f64) -> impl Fn(f64) -> f64 {
        return move |v| utils::inv_lerp(min, max, v);
    }

    pub fn clamp(min: f64, max: f64) -> impl Fn(f64) -> f64 {
        return move |v| v.clamp(min, max);
    }

    pub fn scale(factor: f64) -> impl Fn(f64) -> f64 {
        return move |v| v * factor;
    }

    /// `first`, then `second`.
    pub fn sequence(first: impl Fn(f64) -> f64, second: impl Fn(f64) -> f64) -> impl Fn(f64) -> f64 {
        return move |v| second(first(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_overlap() {
        let mut img = Image::new(3, 2);
        *img.at_mut(1, 1) = Color::new(1.0, 2.0, 3.0);
        *img.at_mut(2, 0) = Color::new(9.0, 9.0, 9.0);
        img.resize(2, 3);
        assert_eq!(img.at(1, 1), Color::new(1.0, 2.0, 3.0));
        assert_eq!(img.at(1, 2), Color::zeros());
        assert_eq!(img.pixels().len(), 6);
    }

    #[test]
    fn filters_compose_in_order() {
        let f = filters::sequence(filters::scale(2.0), filters::clamp(0.0, 1.0));
        assert_eq!(f(0.25), 0.5);
        assert_eq!(f(0.75), 1.0);
        let g = filters::sequence(filters::lerp(2.0, 4.0), filters::inv_lerp(2.0, 4.0));
        assert!((g(0.3) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rgba_is_normalised_by_magnitude() {
        let mut img = Image::new(2, 1);
        *img.at_mut(1, 0) = Color::new(4.0, 0.0, 0.0);
        let rgba = img.to_rgba();
        assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn exports_png_and_exr() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = Image::new(4, 3);
        img.fill(Color::new(0.5, 0.25, 1.0));
        *img.at_mut(0, 0) = Color::zeros();

        let png = dir.path().join("out.png");
        img.export(&png, ExportFormat::Png).unwrap();
        let decoded = ::image::open(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));

        let exr = dir.path().join("out.exr");
        img.export(&exr, ExportFormat::Exr).unwrap();
        assert!(std::fs::metadata(&exr).unwrap().len() > 0);
    }

    #[test]
    fn empty_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Image::new(0, 0).export(&dir.path().join("x.png"), ExportFormat::Png);
        assert!(matches!(err, Err(ExportError::Empty)));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.EXR")), Some(ExportFormat::Exr));
        assert_eq!(ExportFormat::from_path(Path::new("b.png")), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_path(Path::new("b")), None);
    }
}
