// Nearest-rank percentile, per §4.B / §9: `floor(n·p)`, not linear
// interpolation. `durations_ms` must already be sorted ascending.

use fw_model::LatencyStats;

pub fn latency_stats(durations_ms: &[i64]) -> LatencyStats {
    let n = durations_ms.len();
    if n == 0 {
        return LatencyStats::empty();
    }
    if n == 1 {
        let v = round2(durations_ms[0] as f64);
        return LatencyStats {
            mean: v,
            p50: v,
            p95: v,
            p99: v,
            sample_count: 1,
        };
    }

    let mean = durations_ms.iter().sum::<i64>() as f64 / n as f64;
    LatencyStats {
        mean: round2(mean),
        p50: round2(nearest_rank(durations_ms, 0.50) as f64),
        p95: round2(nearest_rank(durations_ms, 0.95) as f64),
        p99: round2(nearest_rank(durations_ms, 0.99) as f64),
        sample_count: n as u64,
    }
}

fn nearest_rank(sorted: &[i64], p: f64) -> i64 {
    let n = sorted.len();
    let index = ((n as f64) * p).floor() as usize;
    sorted[index.min(n - 1)]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_all_zero() {
        let stats = latency_stats(&[]);
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.p99, 0.0);
    }

    #[test]
    fn single_value_fills_every_percentile() {
        let stats = latency_stats(&[42]);
        assert_eq!(stats.p50, 42.0);
        assert_eq!(stats.p95, 42.0);
        assert_eq!(stats.p99, 42.0);
        assert_eq!(stats.sample_count, 1);
    }

    #[test]
    fn nearest_rank_not_interpolated() {
        let durations: Vec<i64> = (1..=100).collect();
        let stats = latency_stats(&durations);
        // floor(100 * 0.95) = 95 -> sorted[95] = 96 (1-indexed values)
        assert_eq!(stats.p95, 96.0);
    }

    #[test]
    fn mean_rounds_to_two_decimal_places() {
        let stats = latency_stats(&[1, 2]);
        assert_eq!(stats.mean, 1.5);
    }
}
