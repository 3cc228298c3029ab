//! Hybrid representative sampling.
//!
//! Works on a population already ranked by score (descending) and returns
//! rank positions tagged with the category that selected them. Every
//! category is bounded except outliers; the final list is deduplicated and
//! held to `SamplingLimits::max_entries` by shedding the least extreme
//! outliers, so the output size does not depend on the population size.

use super::stats::SummaryStatistics;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCategory {
    Top,
    Bottom,
    Median,
    Mean,
    Outlier,
    Decile,
}

impl SampleCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Outlier => "outlier",
            Self::Decile => "decile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingLimits {
    pub top: usize,
    pub bottom: usize,
    pub median_nearest: usize,
    pub mean_nearest: usize,
    pub deciles: usize,
    /// Deviation from the mean, in standard deviations, that marks an outlier.
    pub outlier_sigma: f64,
    /// Used when the exclusion rule leaves nothing to sample.
    pub fallback_top: usize,
    pub fallback_bottom: usize,
    pub max_entries: usize,
}

impl Default for SamplingLimits {
    fn default() -> Self {
        Self {
            top: 15,
            bottom: 5,
            median_nearest: 3,
            mean_nearest: 3,
            deciles: 10,
            outlier_sigma: 2.0,
            fallback_top: 5,
            fallback_bottom: 3,
            max_entries: 45,
        }
    }
}

/// Population figures the proximity and outlier categories are measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleAnchors {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl From<&SummaryStatistics> for SampleAnchors {
    fn from(stats: &SummaryStatistics) -> Self {
        Self {
            mean: stats.mean,
            median: stats.median,
            std_dev: stats.std_dev,
        }
    }
}

impl SampleAnchors {
    /// `None` when the population has no meaningful spread.
    fn outlier_threshold(&self, sigma: f64) -> Option<f64> {
        let scale = self.mean.abs().max(1.0);
        (self.std_dev > 1e-12 * scale).then(|| sigma * self.std_dev)
    }
}

/// A rank position (0 = highest score) chosen for the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePick {
    pub rank: usize,
    pub category: SampleCategory,
}

impl SamplePick {
    const fn new(rank: usize, category: SampleCategory) -> Self {
        Self { rank, category }
    }
}

/// Category selection over descending scores. Picks may repeat ranks;
/// [`hybrid_sample`] removes the duplicates.
pub type RankSelector = fn(&[f64], &SampleAnchors, &SamplingLimits) -> Vec<SamplePick>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleSelection {
    pub picks: Vec<SamplePick>,
    /// Ranked records removed by the exclusion rule.
    pub excluded: usize,
    /// True when exclusion removed everything and the unfiltered fallback ran.
    pub fallback: bool,
}

/// Runs `select` over the eligible ranks and deduplicates the result by
/// `key`, keeping the first (highest-priority) occurrence.
pub fn hybrid_sample<K, F>(
    ranked: &[f64],
    excluded: &[bool],
    anchors: &SampleAnchors,
    limits: &SamplingLimits,
    select: RankSelector,
    mut key: F,
) -> SampleSelection
where
    K: Eq + Hash,
    F: FnMut(usize) -> K,
{
    let eligible: Vec<usize> = (0..ranked.len())
        .filter(|rank| !excluded.get(*rank).copied().unwrap_or(false))
        .collect();
    let excluded_count = ranked.len() - eligible.len();

    let (picks, fallback) = if eligible.is_empty() && !ranked.is_empty() {
        (fallback_picks(ranked.len(), limits), true)
    } else if excluded_count == 0 {
        (select(ranked, anchors, limits), false)
    } else {
        let scores: Vec<f64> = eligible.iter().map(|rank| ranked[*rank]).collect();
        let picks = select(&scores, anchors, limits)
            .into_iter()
            .map(|pick| SamplePick::new(eligible[pick.rank], pick.category))
            .collect();
        (picks, false)
    };

    let mut seen_ranks = HashSet::new();
    let mut seen_keys = HashSet::new();
    let mut unique = Vec::with_capacity(picks.len());
    for pick in picks {
        if !seen_ranks.insert(pick.rank) {
            continue;
        }
        if seen_keys.insert(key(pick.rank)) {
            unique.push(pick);
        }
    }
    trim_to_limit(&mut unique, ranked, anchors.mean, limits.max_entries);

    SampleSelection {
        picks: unique,
        excluded: excluded_count,
        fallback,
    }
}

/// Drops the least extreme outliers until the sample fits `max_entries`, so
/// the bounded categories survive a heavy tail. Anything still over the limit
/// is cut from the end.
fn trim_to_limit(picks: &mut Vec<SamplePick>, ranked: &[f64], mean: f64, max_entries: usize) {
    let surplus = picks.len().saturating_sub(max_entries);
    if surplus > 0 {
        let mut outliers: Vec<usize> = picks
            .iter()
            .filter(|pick| pick.category == SampleCategory::Outlier)
            .map(|pick| pick.rank)
            .collect();
        // least extreme first; among equals the lower score goes first
        outliers.sort_by(|a: &usize, b: &usize| {
            let da = (ranked[*a] - mean).abs();
            let db = (ranked[*b] - mean).abs();
            da.total_cmp(&db).then(b.cmp(a))
        });
        let dropped: HashSet<usize> = outliers.into_iter().take(surplus).collect();
        picks.retain(|pick| {
            pick.category != SampleCategory::Outlier || !dropped.contains(&pick.rank)
        });
    }
    picks.truncate(max_entries);
}

fn fallback_picks(n: usize, limits: &SamplingLimits) -> Vec<SamplePick> {
    let top = limits.fallback_top.min(n);
    let bottom = limits.fallback_bottom.min(n);
    (0..top)
        .map(|rank| SamplePick::new(rank, SampleCategory::Top))
        .chain((n - bottom..n).map(|rank| SamplePick::new(rank, SampleCategory::Bottom)))
        .collect()
}

/// Half-open rank range of `band` when `n` ranks are split into `bands`.
fn band_bounds(n: usize, bands: usize, band: usize) -> (usize, usize) {
    (band * n / bands, (band + 1) * n / bands)
}

fn proximity_order(ranked: &[f64], target: f64) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    move |a: &usize, b: &usize| {
        let da = (ranked[*a] - target).abs();
        let db = (ranked[*b] - target).abs();
        da.total_cmp(&db).then(a.cmp(b))
    }
}

/// Selection by rank arithmetic: fixed ranges for top/bottom/deciles, binary
/// search for outliers and a bounded window for proximity picks.
pub fn select_by_rank(
    ranked: &[f64],
    anchors: &SampleAnchors,
    limits: &SamplingLimits,
) -> Vec<SamplePick> {
    let n = ranked.len();
    let mut picks = Vec::new();

    picks.extend((0..limits.top.min(n)).map(|rank| SamplePick::new(rank, SampleCategory::Top)));
    picks.extend(
        (n - limits.bottom.min(n)..n).map(|rank| SamplePick::new(rank, SampleCategory::Bottom)),
    );
    picks.extend(
        nearest_in_window(ranked, anchors.median, limits.median_nearest)
            .into_iter()
            .map(|rank| SamplePick::new(rank, SampleCategory::Median)),
    );
    picks.extend(
        nearest_in_window(ranked, anchors.mean, limits.mean_nearest)
            .into_iter()
            .map(|rank| SamplePick::new(rank, SampleCategory::Mean)),
    );

    if let Some(threshold) = anchors.outlier_threshold(limits.outlier_sigma) {
        let mean = anchors.mean;
        let high_end = ranked.partition_point(|score| score - mean > threshold);
        let low_start = ranked.partition_point(|score| mean - score <= threshold);
        picks.extend(
            (0..high_end)
                .chain(low_start.max(high_end)..n)
                .map(|rank| SamplePick::new(rank, SampleCategory::Outlier)),
        );
    }

    if limits.deciles > 0 {
        picks.extend((0..limits.deciles).filter_map(|band| {
            let (start, end) = band_bounds(n, limits.deciles, band);
            (end > start).then(|| SamplePick::new(start + (end - start) / 2, SampleCategory::Decile))
        }));
    }

    picks
}

/// The `k` ranks closest to `target`, ties going to the higher score.
///
/// Candidates are confined to `k` ranks either side of where `target` falls,
/// widened to cover runs of equal scores at the window edges.
fn nearest_in_window(ranked: &[f64], target: f64, k: usize) -> Vec<usize> {
    let n = ranked.len();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }

    let pivot = ranked.partition_point(|score| *score >= target);
    let mut start = pivot.saturating_sub(k);
    while start > 0 && ranked[start - 1] == ranked[start] {
        start -= 1;
    }
    let mut end = (pivot + k).min(n);
    while end < n && end > 0 && ranked[end] == ranked[end - 1] {
        end += 1;
    }

    let order = proximity_order(ranked, target);
    let mut window: Vec<usize> = (start..end).collect();
    if k < window.len() {
        window.select_nth_unstable_by(k - 1, &order);
        window.truncate(k);
    }
    window.sort_by(&order);
    window
}

/// Reference selection that enumerates the whole population for every
/// category. Produces the same picks as [`select_by_rank`].
pub fn select_by_enumeration(
    ranked: &[f64],
    anchors: &SampleAnchors,
    limits: &SamplingLimits,
) -> Vec<SamplePick> {
    let n = ranked.len();
    let mut picks = Vec::new();

    for rank in 0..n {
        if rank < limits.top {
            picks.push(SamplePick::new(rank, SampleCategory::Top));
        }
    }
    for rank in 0..n {
        if rank >= n.saturating_sub(limits.bottom) {
            picks.push(SamplePick::new(rank, SampleCategory::Bottom));
        }
    }

    for (target, k, category) in [
        (anchors.median, limits.median_nearest, SampleCategory::Median),
        (anchors.mean, limits.mean_nearest, SampleCategory::Mean),
    ] {
        let mut all: Vec<usize> = (0..n).collect();
        all.sort_by(proximity_order(ranked, target));
        picks.extend(
            all.into_iter()
                .take(k)
                .map(|rank| SamplePick::new(rank, category)),
        );
    }

    if let Some(threshold) = anchors.outlier_threshold(limits.outlier_sigma) {
        for (rank, score) in ranked.iter().enumerate() {
            if (score - anchors.mean).abs() > threshold {
                picks.push(SamplePick::new(rank, SampleCategory::Outlier));
            }
        }
    }

    if limits.deciles > 0 {
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); limits.deciles];
        for rank in 0..n {
            for (band, bucket) in members.iter_mut().enumerate() {
                let (start, end) = band_bounds(n, limits.deciles, band);
                if rank >= start && rank < end {
                    bucket.push(rank);
                    break;
                }
            }
        }
        for bucket in members.iter().filter(|bucket| !bucket.is_empty()) {
            picks.push(SamplePick::new(bucket[bucket.len() / 2], SampleCategory::Decile));
        }
    }

    picks
}
