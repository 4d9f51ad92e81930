//! Closed-form statistics over window samples.

use chrono::{DateTime, Utc};

/// Arithmetic mean; `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance; `None` for an empty sample.
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Average inter-arrival time in whole seconds over strictly consecutive
/// frame counters. `rows` pairs each distinct counter with its earliest
/// arrival and must be ordered by counter. `None` when no consecutive pair
/// exists.
pub fn sampling_rate(rows: &[(i64, DateTime<Utc>)]) -> Option<i64> {
    let diffs: Vec<f64> = rows
        .windows(2)
        .filter(|pair| pair[1].0 - pair[0].0 == 1)
        .map(|pair| (pair[1].1 - pair[0].1).num_milliseconds() as f64 / 1000.0)
        .collect();

    mean(&diffs).map(|avg| avg.floor() as i64)
}

/// Jitter over successive arrival deltas, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterStats {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
}

/// `None` when the window holds no arrivals; a single arrival yields zero
/// jitter.
pub fn jitter(arrivals: &[DateTime<Utc>]) -> Option<JitterStats> {
    if arrivals.is_empty() {
        return None;
    }

    let deltas: Vec<f64> = arrivals
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64)
        .collect();

    let mean_ms = mean(&deltas).unwrap_or(0.0);
    let std_dev_ms = if deltas.len() > 1 {
        population_variance(&deltas).unwrap_or(0.0).sqrt()
    } else {
        0.0
    };

    Some(JitterStats { mean_ms, std_dev_ms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    #[test]
    fn mean_and_variance() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        // population variance, not sample variance
        assert_relative_eq!(population_variance(&[2.0, 4.0]).unwrap(), 1.0);
    }

    #[test]
    fn sampling_rate_averages_consecutive_pairs() {
        // 5 -> 6 arrives 60 s apart, 6 -> 7 arrives 120 s apart: avg 90
        let rows = vec![(5, at(0)), (6, at(60)), (7, at(180))];
        assert_eq!(sampling_rate(&rows), Some(90));
    }

    #[test]
    fn sampling_rate_ignores_gapped_counters() {
        let rows = vec![(5, at(0)), (7, at(60)), (8, at(120))];
        // only 7 -> 8 is consecutive
        assert_eq!(sampling_rate(&rows), Some(60));
    }

    #[test]
    fn sampling_rate_none_without_consecutive_pair() {
        let rows = vec![(5, at(0)), (9, at(60))];
        assert_eq!(sampling_rate(&rows), None);
        assert_eq!(sampling_rate(&[]), None);
    }

    #[test]
    fn jitter_over_arrivals() {
        let stats = jitter(&[at(0), at(1), at(3)]).unwrap();
        // deltas 1000 ms and 2000 ms
        assert_relative_eq!(stats.mean_ms, 1500.0);
        assert_relative_eq!(stats.std_dev_ms, 500.0);
    }

    #[test]
    fn jitter_degenerate_cases() {
        assert_eq!(jitter(&[]), None);
        let single = jitter(&[at(0)]).unwrap();
        assert_relative_eq!(single.mean_ms, 0.0);
        assert_relative_eq!(single.std_dev_ms, 0.0);
    }
}
