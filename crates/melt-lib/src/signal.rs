use serde::{Deserialize, Serialize};

/// One (time, value) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Time-ordered samples. Construction sorts by time; ties keep input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        // `sort_by` is stable, which is what keeps duplicate timestamps in input order.
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { samples }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(pairs.iter().map(|&(t, v)| Sample::new(t, v)).collect())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.time)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    /// Time covered between the first and last sample.
    pub fn span(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Piecewise-linear value at `t`, clamped to the end values outside the covered range.
    ///
    /// When several samples share a timestamp the last of them wins for queries at
    /// or after that time.
    pub fn interpolate(&self, t: f64) -> Option<f64> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if t <= first.time {
            return Some(if t < first.time { first.value } else { self.value_at_tie(t) });
        }
        if t >= last.time {
            return Some(last.value);
        }
        let upper = self.samples.partition_point(|s| s.time <= t);
        // A NaN query matches no sample.
        let (a, b) = match (upper.checked_sub(1), self.samples.get(upper)) {
            (Some(lower), Some(&b)) => (self.samples[lower], b),
            _ => return None,
        };
        let dt = b.time - a.time;
        if dt == 0.0 {
            return Some(a.value);
        }
        Some(a.value + (b.value - a.value) * (t - a.time) / dt)
    }

    fn value_at_tie(&self, t: f64) -> f64 {
        let upper = self.samples.partition_point(|s| s.time <= t);
        self.samples[upper.saturating_sub(1)].value
    }

    /// Uniform resampling over the covered time range with `points` evenly spaced samples.
    pub fn resample_uniform(&self, points: usize) -> Series {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => (f.time, l.time),
            _ => return Series::default(),
        };
        if points < 2 {
            return Series {
                samples: self.samples.iter().take(points).copied().collect(),
            };
        }
        let step = (last - first) / (points - 1) as f64;
        let samples = (0..points)
            .map(|i| {
                let t = if i == points - 1 {
                    last
                } else {
                    first + step * i as f64
                };
                let v = self.interpolate(t).unwrap_or(0.0);
                Sample::new(t, v)
            })
            .collect();
        Series { samples }
    }
}

impl From<Vec<Sample>> for Series {
    fn from(samples: Vec<Sample>) -> Self {
        Series::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_query_has_no_value() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 2.0)]);
        assert_eq!(series.interpolate(f64::NAN), None);
        let with_nan_time = Series::from_pairs(&[(0.0, 0.0), (1.0, 2.0), (f64::NAN, 0.0)]);
        assert_eq!(with_nan_time.resample_uniform(4).len(), 4);
    }

    #[test]
    fn sorts_by_time_and_keeps_tie_order() {
        let series = Series::from_pairs(&[(2.0, 20.0), (1.0, 10.0), (1.0, 11.0), (0.0, 0.0)]);
        let times: Vec<f64> = series.times().collect();
        let values: Vec<f64> = series.values().collect();
        assert_eq!(times, vec![0.0, 1.0, 1.0, 2.0]);
        assert_eq!(values, vec![0.0, 10.0, 11.0, 20.0]);
    }

    #[test]
    fn interpolates_linearly_between_samples() {
        let series = Series::from_pairs(&[(0.0, 0.0), (2.0, 4.0)]);
        assert!((series.interpolate(0.5).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(series.interpolate(-1.0), Some(0.0));
        assert_eq!(series.interpolate(3.0), Some(4.0));
    }

    #[test]
    fn resample_hits_both_endpoints() {
        let series = Series::from_pairs(&[(0.0, 1.0), (1.0, 3.0)]);
        let fine = series.resample_uniform(20);
        assert_eq!(fine.len(), 20);
        assert_eq!(fine.samples()[0], Sample::new(0.0, 1.0));
        assert_eq!(fine.samples()[19], Sample::new(1.0, 3.0));
    }

    #[test]
    fn duplicate_timestamps_take_later_value() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 5.0), (1.0, 7.0), (2.0, 7.0)]);
        assert_eq!(series.interpolate(1.0), Some(7.0));
        assert!((series.interpolate(0.5).unwrap() - 2.5).abs() < 1e-12);
    }
}
