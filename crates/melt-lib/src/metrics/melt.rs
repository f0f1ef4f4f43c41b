use crate::{
    detectors::crossing::{
        find_crossings_with, pair_intervals, Crossing, CrossingError, Direction, Interval,
        Resampling,
    },
    signal::Series,
};
use serde::{Deserialize, Serialize};

/// Reductions over the interval list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub crossing_count: usize,
    pub up_count: usize,
    pub down_count: usize,
    pub interval_count: usize,
    pub max_duration: f64,
    pub total_duration: f64,
    /// Longest interval; the earliest one wins ties.
    pub peak: Option<Interval>,
}

pub fn interval_stats(crossings: &[Crossing], intervals: &[Interval]) -> IntervalStats {
    let up_count = crossings
        .iter()
        .filter(|c| c.direction == Direction::Up)
        .count();
    let peak = intervals.iter().fold(None::<Interval>, |best, iv| match best {
        Some(b) if b.duration >= iv.duration => Some(b),
        _ => Some(*iv),
    });
    IntervalStats {
        crossing_count: crossings.len(),
        up_count,
        down_count: crossings.len() - up_count,
        interval_count: intervals.len(),
        max_duration: peak.map(|p| p.duration).unwrap_or(0.0),
        total_duration: intervals.iter().map(|iv| iv.duration).sum(),
        peak,
    }
}

/// Min/max/mean of the sampled values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

pub fn value_stats(series: &Series) -> Option<ValueStats> {
    if series.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for v in series.values() {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Some(ValueStats {
        count: series.len(),
        min,
        max,
        mean: sum / series.len() as f64,
    })
}

/// Everything one threshold pass over a series produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossingAnalysis {
    pub threshold: f64,
    pub resampling: Resampling,
    pub crossings: Vec<Crossing>,
    pub intervals: Vec<Interval>,
    pub stats: IntervalStats,
}

impl CrossingAnalysis {
    pub fn up_times(&self) -> Vec<f64> {
        self.times_for(Direction::Up)
    }

    pub fn down_times(&self) -> Vec<f64> {
        self.times_for(Direction::Down)
    }

    fn times_for(&self, direction: Direction) -> Vec<f64> {
        self.crossings
            .iter()
            .filter(|c| c.direction == direction)
            .map(|c| c.time)
            .collect()
    }
}

/// Find crossings, pair them and reduce the result in one go.
pub fn analyze_crossings(
    series: &Series,
    threshold: f64,
    resampling: Resampling,
) -> Result<CrossingAnalysis, CrossingError> {
    let crossings = find_crossings_with(series, threshold, resampling)?;
    let intervals = pair_intervals(&crossings);
    let stats = interval_stats(&crossings, &intervals);
    Ok(CrossingAnalysis {
        threshold,
        resampling,
        crossings,
        intervals,
        stats,
    })
}
