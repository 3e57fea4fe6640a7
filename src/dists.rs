//! The `dists` sample file.
//!
//! Four lines of comma separated floats: `uniform`, `normalBM`, `normalMP` and
//! a flattened list of unit vectors. Every value is written followed by `", "`,
//! so the trailing blank token of each line is expected and ignored.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use rand::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::random;

pub const DEFAULT_FILE_NAME: &str = "dists";

const LINE_NAMES: [&str; 4] = ["uniform", "normalBM", "normalMP", "unitVec"];

#[derive(Error, Debug)]
pub enum DistsError {
    #[error("failed to access dists file: {0}")]
    Io(#[from] io::Error),

    #[error("line {line} ({name}): `{token}` is not a number")]
    Parse {
        line: usize,
        name: &'static str,
        token: String,
    },

    #[error("line {line} ({name}) is missing")]
    MissingLine { line: usize, name: &'static str },
}

type Result<T> = std::result::Result<T, DistsError>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("`{0}` is not a number")]
pub struct InvalidToken(pub String);

/// How many samples [`Dists::sample`] draws for each series.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SampleCounts {
    /// Uniform pairs; the series holds twice as many values.
    pub uniform: usize,
    /// Normal pairs per generator.
    pub normal: usize,
    /// Unit vectors.
    pub sphere: usize,
}

impl Default for SampleCounts {
    fn default() -> SampleCounts {
        let n_samples = 1024 * 4;
        return SampleCounts {
            uniform: n_samples * 64,
            normal: n_samples * 64,
            sphere: 1024,
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dists {
    pub uniform: Vec<f64>,
    pub normal_bm: Vec<f64>,
    pub normal_mp: Vec<f64>,
    pub unit_vec: Vec<[f64; 3]>,
}

/// Parses one line. Blank tokens are skipped, so `""` and `"1, 2, "` are fine.
pub fn parse_float_list(line: &str) -> std::result::Result<Vec<f64>, InvalidToken> {
    let mut values = Vec::new();
    for token in line.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => return Err(InvalidToken(token.to_string())),
        }
    }
    return Ok(values);
}

/// Groups a flat list into triplets; a trailing partial group is dropped.
pub fn group_triplets(values: &[f64]) -> Vec<[f64; 3]> {
    let chunks = values.chunks_exact(3);
    let dropped = chunks.remainder().len();
    if dropped != 0 {
        warn!(dropped, "unit vector list is not a multiple of three, dropping the tail");
    }
    return chunks.map(|c| [c[0], c[1], c[2]]).collect();
}

impl Dists {
    pub fn parse(text: &str) -> Result<Dists> {
        let mut lines = text.lines();
        let mut series: Vec<Vec<f64>> = Vec::with_capacity(LINE_NAMES.len());

        for (index, name) in LINE_NAMES.iter().copied().enumerate() {
            let line = lines.next().ok_or(DistsError::MissingLine {
                line: index + 1,
                name: name,
            })?;
            let values = parse_float_list(line).map_err(|InvalidToken(token)| DistsError::Parse {
                line: index + 1,
                name: name,
                token: token,
            })?;
            debug!(series = name, count = values.len(), "parsed series");
            series.push(values);
        }

        let unit_vec = group_triplets(&series[3]);
        let mut series = series.into_iter();
        return Ok(Dists {
            uniform: series.next().unwrap_or_default(),
            normal_bm: series.next().unwrap_or_default(),
            normal_mp: series.next().unwrap_or_default(),
            unit_vec: unit_vec,
        });
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Dists> {
        let text = fs::read_to_string(path)?;
        return Dists::parse(&text);
    }

    /// Draws every series from `rng`.
    pub fn sample<R: RngCore + ?Sized>(counts: SampleCounts, rng: &mut R) -> Dists {
        let mut dists = Dists {
            uniform: Vec::with_capacity(counts.uniform * 2),
            normal_bm: Vec::with_capacity(counts.normal * 2),
            normal_mp: Vec::with_capacity(counts.normal * 2),
            unit_vec: Vec::with_capacity(counts.sphere),
        };

        for _ in 0..counts.uniform {
            dists.uniform.extend_from_slice(&random::unit_square(rng));
        }
        for _ in 0..counts.normal {
            dists.normal_bm.extend_from_slice(&random::normal_pair_bm(rng));
        }
        for _ in 0..counts.normal {
            dists.normal_mp.extend_from_slice(&random::to_normal_mp(rng));
        }
        for _ in 0..counts.sphere {
            let v = random::unit_vector(rng);
            dists.unit_vec.push([v.x, v.y, v.z]);
        }

        return dists;
    }

    pub fn write<W: Write>(&self, mut out: W) -> Result<()> {
        for series in [&self.uniform, &self.normal_bm, &self.normal_mp] {
            for v in series.iter() {
                write!(out, "{}, ", v)?;
            }
            writeln!(out)?;
        }
        for [x, y, z] in self.unit_vec.iter() {
            write!(out, "{}, {}, {}, ", x, y, z)?;
        }
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = fs::File::create(path)?;
        return self.write(io::BufWriter::new(file));
    }
}
