use super::context::DigestContext;
use super::identity::IdentityResolver;
use super::record::{NormalizedLayer, NormalizedRecord};
use super::sampling::{select_by_enumeration, select_by_rank, RankSelector};
use super::score::resolve_score;
use super::summary::assemble::assemble;
use super::summary::views::Summary;
use super::DigestError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizerStrategy {
    #[default]
    Optimized,
    Naive,
}

impl SummarizerStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Optimized => "optimized",
            Self::Naive => "naive",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown summarizer strategy '{0}' (expected 'optimized' or 'naive')")]
pub struct UnknownStrategy(pub String);

impl FromStr for SummarizerStrategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimized" | "optimised" | "fast" => Ok(Self::Optimized),
            "naive" | "reference" => Ok(Self::Naive),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// A scored record: its position in the flattened population and its score.
pub type Scored = (usize, f64);

/// Descending score, then population order.
pub(crate) fn rank_order(a: &Scored, b: &Scored) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// Scoring, ranking and sample selection for one request.
///
/// Implementations differ only in how they compute; every strategy must
/// produce the same [`Summary`] for the same input.
pub trait Summarizer: Send + Sync {
    fn strategy(&self) -> SummarizerStrategy;

    /// One entry per record, in population order.
    fn score(&self, population: &[&NormalizedRecord], chain: &[String]) -> Vec<Option<f64>>;

    /// Sorts scored records by [`rank_order`].
    fn rank(&self, scored: &mut [Scored]);

    fn selector(&self) -> RankSelector;

    fn summarize(
        &self,
        context: &DigestContext,
        layers: &[NormalizedLayer],
        identity: &IdentityResolver,
    ) -> Result<Summary, DigestError> {
        assemble(self, context, layers, identity)
    }
}

/// Parallel scoring with rank-arithmetic sampling.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizedSummarizer;

impl Summarizer for OptimizedSummarizer {
    fn strategy(&self) -> SummarizerStrategy {
        SummarizerStrategy::Optimized
    }

    fn score(&self, population: &[&NormalizedRecord], chain: &[String]) -> Vec<Option<f64>> {
        population
            .par_iter()
            .map(|record| resolve_score(record, chain))
            .collect()
    }

    fn rank(&self, scored: &mut [Scored]) {
        scored.par_sort_unstable_by(rank_order);
    }

    fn selector(&self) -> RankSelector {
        select_by_rank
    }
}

/// Sequential scoring with full-scan sampling; the reference behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveSummarizer;

impl Summarizer for NaiveSummarizer {
    fn strategy(&self) -> SummarizerStrategy {
        SummarizerStrategy::Naive
    }

    fn score(&self, population: &[&NormalizedRecord], chain: &[String]) -> Vec<Option<f64>> {
        population
            .iter()
            .map(|record| resolve_score(record, chain))
            .collect()
    }

    fn rank(&self, scored: &mut [Scored]) {
        scored.sort_by(rank_order);
    }

    fn selector(&self) -> RankSelector {
        select_by_enumeration
    }
}

pub fn summarizer_for(strategy: SummarizerStrategy) -> Box<dyn Summarizer> {
    match strategy {
        SummarizerStrategy::Optimized => Box::new(OptimizedSummarizer),
        SummarizerStrategy::Naive => Box::new(NaiveSummarizer),
    }
}
