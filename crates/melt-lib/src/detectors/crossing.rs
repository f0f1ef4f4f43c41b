use crate::signal::{Sample, Series};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Oversampling factor applied before crossing detection unless configured otherwise.
pub const DEFAULT_OVERSAMPLE_FACTOR: usize = 10;

/// Upper bound on the resampled series length.
pub const MAX_RESAMPLED_POINTS: usize = 1 << 26;

#[derive(Debug, Error, PartialEq)]
pub enum CrossingError {
    #[error("need at least 2 samples to find crossings, got {found}")]
    InsufficientData { found: usize },
    /// Detection fired on a flat segment, meaning the sign test and the interpolation disagree.
    #[error("sign change detected on flat segment at resampled index {index}")]
    DegenerateSegment { index: usize },
    #[error("threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),
    #[error("sample {index} has non-finite time {time}")]
    NonFiniteTime { index: usize, time: f64 },
    #[error("oversampling {samples} samples by {factor} exceeds {max} points", max = MAX_RESAMPLED_POINTS)]
    OversampleTooLarge { samples: usize, factor: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// At-or-below threshold to above.
    Up,
    /// Above threshold to at-or-below.
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    pub time: f64,
    pub direction: Direction,
    /// Bracketing points the crossing time was interpolated from.
    pub before: Sample,
    pub after: Sample,
}

/// A period above threshold bounded by an `Up` crossing and the `Down` crossing right after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub sequence_number: usize,
}

/// How the input signal is prepared before the sign-change scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum Resampling {
    /// Uniform linear resampling with `factor × n` points.
    Oversampled { factor: usize },
    /// Scan the sorted input samples directly.
    Segmentwise,
}

impl Default for Resampling {
    fn default() -> Self {
        Resampling::Oversampled {
            factor: DEFAULT_OVERSAMPLE_FACTOR,
        }
    }
}

/// Sample value counts as above threshold only when strictly greater.
pub fn is_above(value: f64, threshold: f64) -> bool {
    value - threshold > 0.0
}

/// Find threshold crossings using the default oversampled scan.
pub fn find_crossings(series: &Series, threshold: f64) -> Result<Vec<Crossing>, CrossingError> {
    find_crossings_with(series, threshold, Resampling::default())
}

pub fn find_crossings_with(
    series: &Series,
    threshold: f64,
    resampling: Resampling,
) -> Result<Vec<Crossing>, CrossingError> {
    if series.len() < 2 {
        return Err(CrossingError::InsufficientData {
            found: series.len(),
        });
    }
    if !threshold.is_finite() {
        return Err(CrossingError::NonFiniteThreshold(threshold));
    }
    if let Some((index, s)) = series
        .samples()
        .iter()
        .enumerate()
        .find(|(_, s)| !s.time.is_finite())
    {
        return Err(CrossingError::NonFiniteTime {
            index,
            time: s.time,
        });
    }
    match resampling {
        Resampling::Oversampled { factor } => {
            let points = series
                .len()
                .checked_mul(factor.max(1))
                .filter(|&n| n <= MAX_RESAMPLED_POINTS)
                .ok_or(CrossingError::OversampleTooLarge {
                    samples: series.len(),
                    factor,
                })?;
            let fine = series.resample_uniform(points);
            scan_crossings(fine.samples(), threshold)
        }
        Resampling::Segmentwise => scan_crossings(series.samples(), threshold),
    }
}

fn scan_crossings(points: &[Sample], threshold: f64) -> Result<Vec<Crossing>, CrossingError> {
    let mut crossings = Vec::new();
    for (i, w) in points.windows(2).enumerate() {
        let (a, b) = (w[0], w[1]);
        let d0 = a.value - threshold;
        let d1 = b.value - threshold;
        let direction = if d0 <= 0.0 && d1 > 0.0 {
            Direction::Up
        } else if d0 > 0.0 && d1 <= 0.0 {
            Direction::Down
        } else {
            continue;
        };
        if b.value == a.value {
            return Err(CrossingError::DegenerateSegment { index: i });
        }
        let time = a.time + (threshold - a.value) * (b.time - a.time) / (b.value - a.value);
        crossings.push(Crossing {
            time,
            direction,
            before: a,
            after: b,
        });
    }
    Ok(crossings)
}

/// Greedy pairing: an `Up` immediately followed by a `Down` becomes an interval,
/// anything else is skipped one crossing at a time.
pub fn pair_intervals(crossings: &[Crossing]) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut i = 0;
    while i + 1 < crossings.len() {
        let (current, next) = (&crossings[i], &crossings[i + 1]);
        if current.direction == Direction::Up && next.direction == Direction::Down {
            intervals.push(Interval {
                start_time: current.time,
                end_time: next.time,
                duration: next.time - current.time,
                sequence_number: intervals.len() + 1,
            });
            i += 2;
        } else {
            i += 1;
        }
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossing(time: f64, direction: Direction) -> Crossing {
        let s = Sample::new(time, 0.0);
        Crossing {
            time,
            direction,
            before: s,
            after: s,
        }
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
    }

    #[test]
    fn rejects_short_series() {
        let series = Series::from_pairs(&[(0.0, 1.0)]);
        assert_eq!(
            find_crossings(&series, 0.5),
            Err(CrossingError::InsufficientData { found: 1 })
        );
        assert_eq!(
            find_crossings(&Series::default(), 0.5),
            Err(CrossingError::InsufficientData { found: 0 })
        );
    }

    #[test]
    fn rejects_non_finite_threshold() {
        let series = Series::from_pairs(&[(0.0, 1.0), (1.0, 2.0)]);
        assert!(matches!(
            find_crossings(&series, f64::NAN),
            Err(CrossingError::NonFiniteThreshold(_))
        ));
    }

    #[test]
    fn rejects_non_finite_sample_times() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 2000.0), (bad, 0.0)]);
            for mode in [Resampling::default(), Resampling::Segmentwise] {
                assert!(matches!(
                    find_crossings_with(&series, 1000.0, mode),
                    Err(CrossingError::NonFiniteTime { .. })
                ));
            }
        }
    }

    #[test]
    fn rejects_oversampling_beyond_limit() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 2000.0), (2.0, 0.0)]);
        assert_eq!(
            find_crossings_with(&series, 1000.0, Resampling::Oversampled { factor: usize::MAX }),
            Err(CrossingError::OversampleTooLarge {
                samples: 3,
                factor: usize::MAX
            })
        );
        assert!(matches!(
            find_crossings_with(
                &series,
                1000.0,
                Resampling::Oversampled {
                    factor: MAX_RESAMPLED_POINTS
                }
            ),
            Err(CrossingError::OversampleTooLarge { .. })
        ));
    }

    #[test]
    fn constant_signal_has_no_crossings() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let crossings = find_crossings(&series, 1000.0).unwrap();
        assert!(crossings.is_empty());
        assert!(pair_intervals(&crossings).is_empty());
    }

    #[test]
    fn monotone_ramp_has_single_up_crossing() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 2000.0)]);
        let crossings = find_crossings(&series, 1000.0).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].direction, Direction::Up);
        assert_close(crossings[0].time, 0.5, 1e-9);
        assert!(pair_intervals(&crossings).is_empty());
    }

    #[test]
    fn single_spike_round_trip() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 2000.0), (2.0, 0.0)]);
        let crossings = find_crossings(&series, 1000.0).unwrap();
        assert_eq!(crossings.len(), 2);
        assert_eq!(crossings[0].direction, Direction::Up);
        assert_eq!(crossings[1].direction, Direction::Down);
        assert_close(crossings[0].time, 0.5, 1e-9);
        assert_close(crossings[1].time, 1.5, 1e-9);

        let intervals = pair_intervals(&crossings);
        assert_eq!(intervals.len(), 1);
        assert_close(intervals[0].start_time, 0.5, 1e-9);
        assert_close(intervals[0].end_time, 1.5, 1e-9);
        assert_close(intervals[0].duration, 1.0, 1e-9);
        assert_eq!(intervals[0].sequence_number, 1);
    }

    #[test]
    fn segmentwise_matches_oversampled_on_single_spike() {
        let series = Series::from_pairs(&[(2.0, 0.0), (0.0, 0.0), (1.0, 2000.0)]);
        let crossings = find_crossings_with(&series, 1000.0, Resampling::Segmentwise).unwrap();
        assert_eq!(crossings.len(), 2);
        assert_close(crossings[0].time, 0.5, 1e-12);
        assert_close(crossings[1].time, 1.5, 1e-12);
        assert_eq!(crossings[0].before, Sample::new(0.0, 0.0));
        assert_eq!(crossings[0].after, Sample::new(1.0, 2000.0));
    }

    #[test]
    fn value_on_threshold_counts_as_not_above() {
        let series = Series::from_pairs(&[(0.0, 1000.0), (1.0, 1000.0), (2.0, 1500.0), (3.0, 1000.0)]);
        let crossings = find_crossings_with(&series, 1000.0, Resampling::Segmentwise).unwrap();
        let dirs: Vec<Direction> = crossings.iter().map(|c| c.direction).collect();
        assert_eq!(dirs, vec![Direction::Up, Direction::Down]);
        assert_close(crossings[0].time, 1.0, 1e-12);
        assert_close(crossings[1].time, 3.0, 1e-12);
    }

    #[test]
    fn crossings_are_sorted_and_sandwiched() {
        let pairs: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.25;
                (t, 1000.0 + 800.0 * (t * 1.7).sin())
            })
            .rev()
            .collect();
        let series = Series::from_pairs(&pairs);
        let threshold = 1200.0;
        for mode in [Resampling::default(), Resampling::Segmentwise] {
            let crossings = find_crossings_with(&series, threshold, mode).unwrap();
            assert!(!crossings.is_empty());
            for w in crossings.windows(2) {
                assert!(w[0].time <= w[1].time);
            }
            for c in &crossings {
                let d0 = c.before.value - threshold;
                let d1 = c.after.value - threshold;
                match c.direction {
                    Direction::Up => assert!(d0 <= 0.0 && d1 > 0.0),
                    Direction::Down => assert!(d0 > 0.0 && d1 <= 0.0),
                }
                assert!(c.before.time - 1e-9 <= c.time && c.time <= c.after.time + 1e-9);
            }
            let intervals = pair_intervals(&crossings);
            for interval in &intervals {
                assert!(interval.end_time >= interval.start_time);
                assert!(crossings
                    .iter()
                    .any(|c| c.time == interval.start_time && c.direction == Direction::Up));
                assert!(crossings
                    .iter()
                    .any(|c| c.time == interval.end_time && c.direction == Direction::Down));
            }
        }
    }

    #[test]
    fn pairs_adjacent_up_down() {
        let crossings = vec![
            crossing(1.0, Direction::Up),
            crossing(2.0, Direction::Down),
            crossing(3.0, Direction::Up),
            crossing(4.0, Direction::Down),
        ];
        let intervals = pair_intervals(&crossings);
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start_time, intervals[0].end_time), (1.0, 2.0));
        assert_eq!((intervals[1].start_time, intervals[1].end_time), (3.0, 4.0));
        assert_eq!(intervals[1].sequence_number, 2);
    }

    #[test]
    fn unmatched_up_is_dropped() {
        let crossings = vec![
            crossing(1.0, Direction::Up),
            crossing(2.0, Direction::Up),
            crossing(3.0, Direction::Down),
        ];
        let intervals = pair_intervals(&crossings);
        assert_eq!(intervals.len(), 1);
        assert_eq!((intervals[0].start_time, intervals[0].end_time), (2.0, 3.0));
        assert_eq!(intervals[0].sequence_number, 1);
    }

    #[test]
    fn leading_down_is_skipped() {
        let crossings = vec![
            crossing(0.5, Direction::Down),
            crossing(1.0, Direction::Up),
            crossing(2.0, Direction::Down),
        ];
        let intervals = pair_intervals(&crossings);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start_time, 1.0);
    }

    #[test]
    fn duplicate_timestamps_do_not_crash() {
        let series = Series::from_pairs(&[(0.0, 0.0), (1.0, 2000.0), (1.0, 500.0), (2.0, 0.0)]);
        let crossings = find_crossings(&series, 1000.0).unwrap();
        assert!(crossings.iter().all(|c| c.time.is_finite()));
        let segmentwise = find_crossings_with(&series, 1000.0, Resampling::Segmentwise).unwrap();
        // Jump down at the duplicated timestamp lands exactly on t = 1.
        assert_eq!(segmentwise.len(), 2);
        assert_close(segmentwise[1].time, 1.0, 1e-12);
    }

    #[test]
    fn threshold_comparison_is_strict() {
        assert!(!is_above(1000.0, 1000.0));
        assert!(is_above(1000.5, 1000.0));
    }
}
