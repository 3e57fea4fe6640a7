use std::cell::RefCell;
use std::f64;

use rand::{RngCore, SeedableRng};

use crate::utils::Vec3f;

const LCG_A: u64 = 0x5_DEEC_E66D;
const LCG_C: u64 = 11;
const LCG_MASK: u64 = (1 << 48) - 1;

/// 48-bit linear congruential generator, the one behind `drand48`.
#[derive(Debug, Clone)]
pub struct Lcg48 {
    state: u64,
}

impl Default for Lcg48 {
    fn default() -> Lcg48 {
        return Lcg48 { state: 0x330E };
    }
}

impl Lcg48 {
    pub fn new(seed: u64) -> Lcg48 {
        return Lcg48 {
            state: seed & LCG_MASK,
        };
    }

    fn advance(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(LCG_A).wrapping_add(LCG_C) & LCG_MASK;
        return self.state;
    }
}

impl RngCore for Lcg48 {
    fn next_u32(&mut self) -> u32 {
        // high bits of an LCG are the well mixed ones
        return (self.advance() >> 16) as u32;
    }

    fn next_u64(&mut self) -> u64 {
        return self.advance();
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        return Ok(());
    }
}

impl SeedableRng for Lcg48 {
    type Seed = [u8; 8];

    fn from_seed(seed: [u8; 8]) -> Lcg48 {
        return Lcg48::new(u64::from_le_bytes(seed));
    }
}

thread_local! {
    static ENGINE: RefCell<Lcg48> = RefCell::new(Lcg48::new(rand::random()));
}

/// Runs `f` with this thread's entropy-seeded engine.
pub fn with_thread_engine<T>(f: impl FnOnce(&mut Lcg48) -> T) -> T {
    return ENGINE.with(|engine| f(&mut engine.borrow_mut()));
}

/// Uniform sample in `[0, 1)` built from the low 48 bits of the next output.
pub fn uniform_normalised<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    return (rng.next_u64() & LCG_MASK) as f64 * (2.0f64).powi(-48);
}

pub fn unit_square<R: RngCore + ?Sized>(rng: &mut R) -> [f64; 2] {
    return [uniform_normalised(rng), uniform_normalised(rng)];
}

/// Rejection sampled from `unit_square`, so it covers the positive quarter disk.
pub fn unit_disk<R: RngCore + ?Sized>(rng: &mut R) -> [f64; 2] {
    loop {
        let sample = unit_square(rng);
        if sample[0] * sample[0] + sample[1] * sample[1] < 1.0 {
            return sample;
        }
    }
}

/// Box-Muller transform of a uniform pair in `(0, 1]`.
pub fn to_normal_bm(sample: [f64; 2]) -> [f64; 2] {
    let inner = f64::consts::PI * 2.0 * sample[1];
    let lhs = (-2.0 * sample[0].ln()).sqrt();
    return [lhs * inner.cos(), lhs * inner.sin()];
}

/// Marsaglia polar method. Rejected candidates are redrawn from `rng`.
pub fn to_normal_mp<R: RngCore + ?Sized>(rng: &mut R) -> [f64; 2] {
    loop {
        let sample = unit_square(rng);
        let x = sample[0] * 2.0 - 1.0;
        let y = sample[1] * 2.0 - 1.0;
        let s = x * x + y * y;
        if s >= 1.0 || s == 0.0 {
            continue;
        }

        let f = (-2.0 * s.ln() / s).sqrt();
        return [x * f, y * f];
    }
}

/// Box-Muller pair; `unit_square` yields `[0, 1)` so the first input is flipped into `(0, 1]`.
pub fn normal_pair_bm<R: RngCore + ?Sized>(rng: &mut R) -> [f64; 2] {
    let [u0, u1] = unit_square(rng);
    return to_normal_bm([1.0 - u0, u1]);
}

/// Standard normal pair (mu = 0, sigma = 1) from the Marsaglia polar method.
pub fn normal_pair<R: RngCore + ?Sized>(rng: &mut R) -> [f64; 2] {
    return to_normal_mp(rng);
}

/// Single normal samples, handing out both halves of each generated pair.
#[derive(Debug, Default, Clone)]
pub struct Normal {
    spare: Option<f64>,
}

impl Normal {
    pub fn sample<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if let Some(v) = self.spare.take() {
            return v;
        }
        let [a, b] = normal_pair(rng);
        self.spare = Some(b);
        return a;
    }
}

/// Uniform point on the unit sphere surface, Marsaglia (1972).
pub fn unit_vector<R: RngCore + ?Sized>(rng: &mut R) -> Vec3f {
    loop {
        let x1 = uniform_normalised(rng) * 2.0 - 1.0;
        let x2 = uniform_normalised(rng) * 2.0 - 1.0;
        let s = x1 * x1 + x2 * x2;
        if s >= 1.0 {
            continue;
        }

        let rhs = (1.0 - s).sqrt();
        return Vec3f::new(2.0 * x1 * rhs, 2.0 * x2 * rhs, 1.0 - 2.0 * s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_and_variance(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        return (mean, var);
    }

    #[test]
    fn lcg_matches_drand48_recurrence() {
        let mut rng = Lcg48::default();
        let first = rng.next_u64();
        assert_eq!(first, (0x330E * LCG_A + LCG_C) & LCG_MASK);

        let mut again = Lcg48::default();
        assert_eq!(again.next_u64(), first);
    }

    #[test]
    fn lcg_state_stays_within_48_bits() {
        let mut rng = Lcg48::new(u64::MAX);
        for _ in 0..1000 {
            assert!(rng.next_u64() <= LCG_MASK);
        }
    }

    #[test]
    fn seeding_through_rand_is_deterministic() {
        let mut a = Lcg48::seed_from_u64(42);
        let mut b = Lcg48::seed_from_u64(42);
        let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn uniform_stays_in_unit_interval() {
        let mut rng = Lcg48::new(7);
        for _ in 0..10_000 {
            let v = uniform_normalised(&mut rng);
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn disk_samples_are_inside_the_circle() {
        let mut rng = Lcg48::new(3);
        for _ in 0..10_000 {
            let [x, y] = unit_disk(&mut rng);
            assert!(x * x + y * y < 1.0);
        }
    }

    #[test]
    fn unit_vectors_have_unit_length() {
        let mut rng = Lcg48::new(11);
        for _ in 0..10_000 {
            let v = unit_vector(&mut rng);
            assert!((v.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn box_muller_of_known_input() {
        let [a, b] = to_normal_bm([(-0.5f64).exp(), 0.0]);
        assert!((a - 1.0).abs() < 1e-12);
        assert!(b.abs() < 1e-12);
    }

    #[test]
    fn both_normal_generators_are_standard() {
        let mut rng = Lcg48::new(1234);
        let mut bm = Vec::new();
        let mut mp = Vec::new();
        for _ in 0..50_000 {
            bm.extend_from_slice(&normal_pair_bm(&mut rng));
            mp.extend_from_slice(&normal_pair(&mut rng));
        }

        for values in [bm, mp] {
            let (mean, var) = mean_and_variance(&values);
            assert!(mean.abs() < 0.02, "mean {}", mean);
            assert!((var - 1.0).abs() < 0.03, "variance {}", var);
        }
    }

    #[test]
    fn normal_hands_out_both_halves() {
        let mut rng = Lcg48::new(5);
        let pair = normal_pair(&mut Lcg48::new(5));

        let mut normal = Normal::default();
        assert_eq!(normal.sample(&mut rng), pair[0]);
        assert_eq!(normal.sample(&mut rng), pair[1]);
    }
}
