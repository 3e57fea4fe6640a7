use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::random::{self, Lcg48};

#[derive(Debug, Clone)]
pub struct BenchResult {
    pub name: &'static str,
    pub iterations: u64,
    pub elapsed: Duration,
}

impl BenchResult {
    pub fn per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return f64::INFINITY;
        }
        return self.iterations as f64 / secs;
    }

    pub fn nanos_per_iteration(&self) -> f64 {
        return self.elapsed.as_nanos() as f64 / self.iterations.max(1) as f64;
    }
}

fn measure(name: &'static str, iterations: u64, mut f: impl FnMut() -> f64) -> BenchResult {
    let start = Instant::now();
    let mut acc = 0.0;
    for _ in 0..iterations {
        acc += f();
    }
    black_box(acc);
    let result = BenchResult {
        name: name,
        iterations: iterations,
        elapsed: start.elapsed(),
    };
    debug!(bench = name, ns = result.nanos_per_iteration(), "bench done");
    return result;
}

/// Runs every benchmark for `iterations` rounds.
pub fn run(iterations: u64, seed: u64) -> Vec<BenchResult> {
    let mut lcg = Lcg48::new(seed);
    let mut std_rng = StdRng::seed_from_u64(seed);

    let mut results = Vec::new();
    results.push(measure("lcg48 uniform", iterations, || random::uniform_normalised(&mut lcg)));
    results.push(measure("thread engine uniform", iterations, || {
        random::with_thread_engine(|rng| random::uniform_normalised(rng))
    }));
    results.push(measure("std rng uniform", iterations, || std_rng.gen::<f64>()));
    results.push(measure("box-muller pair", iterations, || random::normal_pair_bm(&mut lcg)[0]));
    results.push(measure("marsaglia polar pair", iterations, || random::to_normal_mp(&mut lcg)[0]));
    results.push(measure("unit disk", iterations, || random::unit_disk(&mut lcg)[0]));
    results.push(measure("unit vector", iterations, || random::unit_vector(&mut lcg).x));
    return results;
}
