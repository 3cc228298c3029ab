use super::score::coerce_number;
use serde::Serialize;
use serde_json::Value;

/// Descriptive statistics over a full numeric population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation (divides by `count`).
    pub std_dev: f64,
    pub q1: f64,
    pub q3: f64,
}

impl SummaryStatistics {
    /// Coerces mixed raw values first; `None` when nothing is numeric.
    pub fn from_values<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        Self::from_numbers(values.into_iter().filter_map(coerce_number))
    }

    pub fn from_numbers<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let n = count as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted
            .iter()
            .map(|value| {
                let delta = value - mean;
                delta * delta
            })
            .sum::<f64>()
            / n;

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median: percentile(&sorted, 0.5),
            std_dev: variance.sqrt(),
            q1: percentile(&sorted, 0.25),
            q3: percentile(&sorted, 0.75),
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Linear-interpolation percentile over ascending data, `p` in `[0, 1]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => return f64::NAN,
        1 => return sorted[0],
        _ => {}
    }

    let last = sorted.len() - 1;
    let idx = last as f64 * p.clamp(0.0, 1.0);
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }

    let weight = idx - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
