use std::ops::Range;

/// Fixed range histogram over `f64` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    min: f64,
    max: f64,
    bins: Vec<usize>,
}

impl Histogram {
    /// `bins` equally wide buckets spanning `[min, max]`. At least one bucket is kept.
    pub fn new(min: f64, max: f64, bins: usize) -> Histogram {
        let bins = bins.max(1);
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        return Histogram {
            min: min,
            max: max,
            bins: vec![0; bins],
        };
    }

    /// Range taken from the samples themselves. An empty slice gives `[0, 1]`
    /// and a single repeated value `v` gives `[v - 0.5, v + 0.5]`.
    pub fn from_samples(samples: &[f64], bins: usize) -> Histogram {
        let (min, max) = samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (min, max) = if min > max {
            (0.0, 1.0)
        } else if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let mut hist = Histogram::new(min, max, bins);
        hist.extend(samples.iter().copied());
        return hist;
    }

    /// Position of `v` inside the range as a fraction. Halved operands keep
    /// ranges wider than `f64::MAX` finite.
    fn fraction(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        if span.is_finite() {
            return (v - self.min) / span;
        }
        return (v / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0);
    }

    /// Values outside `[min, max]` are ignored; `max` itself lands in the last bin.
    pub fn push(&mut self, v: f64) {
        if !(v >= self.min && v <= self.max) {
            return;
        }
        let last = self.bins.len() - 1;
        let index = if self.max > self.min {
            ((self.fraction(v) * self.bins.len() as f64).floor() as usize).min(last)
        } else {
            0
        };
        self.bins[index] += 1;
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = f64>) {
        for v in values {
            self.push(v);
        }
    }

    pub fn bins(&self) -> &[usize] {
        return &self.bins;
    }

    pub fn bin_width(&self) -> f64 {
        let n = self.bins.len() as f64;
        return self.max / n - self.min / n;
    }

    pub fn range(&self) -> Range<f64> {
        return self.min..self.max;
    }

    fn edge(&self, i: usize) -> f64 {
        let t = i as f64 / self.bins.len() as f64;
        return self.min * (1.0 - t) + self.max * t;
    }

    pub fn bin_range(&self, i: usize) -> Range<f64> {
        return self.edge(i)..self.edge(i + 1);
    }

    pub fn total(&self) -> usize {
        return self.bins.iter().sum();
    }

    pub fn max_count(&self) -> usize {
        return self.bins.iter().copied().max().unwrap_or(0);
    }
}
