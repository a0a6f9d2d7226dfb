//! Composite relevance weight and ordering of matched titles.

use std::cmp::Ordering;

use crate::models::{MatchedTitle, WeightConfig};

/// Scores titles from rank position, recurrence and hotness.
#[derive(Debug, Clone, Copy)]
pub struct RankScorer {
    weights: WeightConfig,
    rank_threshold: u32,
}

impl RankScorer {
    pub fn new(weights: WeightConfig, rank_threshold: u32) -> Self {
        Self {
            weights,
            rank_threshold,
        }
    }

    pub fn rank_threshold(&self) -> u32 {
        self.rank_threshold
    }

    /// Weight of the observed ranks of a title seen `count` times.
    ///
    /// No ranks at all scores zero.
    pub fn score<'a>(&self, ranks: impl IntoIterator<Item = &'a u32>, count: u32) -> f64 {
        let ranks: Vec<u32> = ranks.into_iter().copied().collect();
        if ranks.is_empty() {
            return 0.0;
        }
        let n = ranks.len() as f64;

        let rank_weight = ranks
            .iter()
            .map(|&r| f64::from(11 - r.min(10)))
            .sum::<f64>()
            / n;
        let frequency_weight = f64::from(count.min(10)) * 10.0;
        let hot = ranks.iter().filter(|&&r| r <= self.rank_threshold).count() as f64;
        let hotness_weight = hot / n * 100.0;

        rank_weight * self.weights.rank
            + frequency_weight * self.weights.frequency
            + hotness_weight * self.weights.hotness
    }

    pub fn weight(&self, title: &MatchedTitle) -> f64 {
        self.score(&title.ranks, title.count)
    }

    /// Descending weight, then ascending minimum rank, then descending count.
    pub fn compare(&self, a: &MatchedTitle, b: &MatchedTitle) -> Ordering {
        self.weight(b)
            .total_cmp(&self.weight(a))
            .then_with(|| {
                let min_a = a.min_rank().unwrap_or(u32::MAX);
                let min_b = b.min_rank().unwrap_or(u32::MAX);
                min_a.cmp(&min_b)
            })
            .then_with(|| b.count.cmp(&a.count))
    }

    pub fn sort_titles(&self, titles: &mut [MatchedTitle]) {
        titles.sort_by(|a, b| self.compare(a, b));
    }
}
