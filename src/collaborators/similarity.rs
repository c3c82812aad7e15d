use std::collections::HashMap;

use async_trait::async_trait;

use super::{Candidate, SimilaritySearch};
use crate::error::AppResult;

/// In-process similarity over term-frequency vectors.
///
/// Tokens are lowercased alphanumeric runs, so Hangul and Latin text both
/// tokenize. Ties keep corpus order.
#[derive(Debug, Clone, Default)]
pub struct LexicalSimilarity;

impl LexicalSimilarity {
    pub fn new() -> Self {
        Self
    }

    /// Cosine similarity of two texts in `[0, 1]`.
    pub fn score(a: &str, b: &str) -> f64 {
        let left = term_frequencies(a);
        let right = term_frequencies(b);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }

        let dot: f64 = left
            .iter()
            .filter_map(|(term, count)| right.get(term).map(|other| (count * other) as f64))
            .sum();
        let norm = |v: &HashMap<String, usize>| {
            v.values().map(|c| (c * c) as f64).sum::<f64>().sqrt()
        };

        dot / (norm(&left) * norm(&right))
    }
}

/// Lowercased alphanumeric runs of `text`.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn term_frequencies(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl SimilaritySearch for LexicalSimilarity {
    async fn top_k(
        &self,
        query: &str,
        corpus: &[Candidate],
        k: usize,
    ) -> AppResult<Vec<Candidate>> {
        let k = k.min(corpus.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(usize, f64)> = corpus
            .iter()
            .enumerate()
            .map(|(i, c)| (i, Self::score(query, &c.text)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| corpus[i].clone())
            .collect())
    }
}
