// THEORY:
// Every analyzer in the engine reduces a window of samples to a handful of
// population statistics. These helpers follow the population (divide-by-N)
// convention throughout, so a "standard deviation" here always means the same
// thing whether it is computed over EAR samples, head positions, or a report
// window. Empty inputs reduce to 0.0 rather than NaN so callers never have to
// special-case an empty window.

pub mod stats {
    /// Arithmetic mean. Returns 0.0 for an empty input.
    pub fn mean<I>(values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }

    /// Population variance. Returns 0.0 for an empty input.
    pub fn variance(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let m = mean(values.iter().copied());
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
    }

    /// Population standard deviation.
    pub fn std_dev(values: &[f64]) -> f64 {
        variance(values).sqrt()
    }

    /// Largest value, or 0.0 for an empty input.
    pub fn max(values: &[f64]) -> f64 {
        values.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Clamps a score into the unit interval.
    pub fn clamp01(value: f64) -> f64 {
        value.clamp(0.0, 1.0)
    }
}
