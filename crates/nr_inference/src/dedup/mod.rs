//! Near-duplicate collapsing.
//!
//! Articles are clustered DBSCAN-style over a precomputed cosine-distance
//! matrix and each cluster is reduced to a single exemplar. With the default
//! `min_neighbors = 1` every article is a core point, so clusters are exactly
//! the connected components of the graph joining articles at distance `<= eps`.

use nr_core::config::DedupConfig;
use nr_core::{cosine_distance, ArticleRecord, Error, Result};
use rayon::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Full pairwise `1 - cosine` matrix. Rows are computed in parallel.
    /// Identical vectors are at distance 0, zero vectors included.
    pub fn distance_matrix(articles: &[ArticleRecord]) -> Result<Vec<Vec<f64>>> {
        if let Some(first) = articles.first() {
            let dimension = first.embedding.len();
            if let Some(bad) = articles.iter().find(|a| a.embedding.len() != dimension) {
                return Err(Error::Embedding(format!(
                    "inconsistent embedding length: expected {}, found {} for '{}'",
                    dimension,
                    bad.embedding.len(),
                    bad.title
                )));
            }
        }

        Ok((0..articles.len())
            .into_par_iter()
            .map(|i| {
                (0..articles.len())
                    .map(|j| {
                        if i == j || articles[i].embedding == articles[j].embedding {
                            0.0
                        } else {
                            cosine_distance(&articles[i].embedding, &articles[j].embedding)
                        }
                    })
                    .collect::<Vec<f64>>()
            })
            .collect())
    }

    /// Group indices into clusters. Each cluster lists its members in
    /// ascending order and clusters are ordered by their first member.
    pub fn cluster(&self, distances: &[Vec<f64>]) -> Vec<Vec<usize>> {
        let n = distances.len();
        let neighbors: Vec<Vec<usize>> = distances
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(j, d)| *j == i || **d <= self.config.eps)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        let is_core: Vec<bool> = neighbors
            .iter()
            .map(|n| n.len() >= self.config.min_neighbors)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for start in 0..n {
            if labels[start].is_some() || !is_core[start] {
                continue;
            }

            let label = clusters.len();
            let mut members = vec![start];
            labels[start] = Some(label);
            let mut queue = VecDeque::from([start]);

            while let Some(point) = queue.pop_front() {
                for &next in &neighbors[point] {
                    if labels[next].is_some() {
                        continue;
                    }
                    labels[next] = Some(label);
                    members.push(next);
                    if is_core[next] {
                        queue.push_back(next);
                    }
                }
            }
            clusters.push(members);
        }

        // points no core point reaches stand alone
        for (i, label) in labels.iter().enumerate() {
            if label.is_none() {
                clusters.push(vec![i]);
            }
        }

        for members in &mut clusters {
            members.sort_unstable();
        }
        clusters.sort_by_key(|members| members[0]);
        clusters
    }

    /// Collapse near-duplicates, keeping the member with the longest summary
    /// (first seen on ties). Exemplars come out in first-seen cluster order.
    pub fn deduplicate(&self, articles: Vec<ArticleRecord>) -> Result<Vec<ArticleRecord>> {
        if articles.len() <= 1 {
            return Ok(articles);
        }

        let distances = Self::distance_matrix(&articles)?;
        let clusters = self.cluster(&distances);
        tracing::debug!(
            articles = articles.len(),
            clusters = clusters.len(),
            eps = self.config.eps,
            "clustered articles"
        );

        let exemplars: Vec<usize> = clusters
            .iter()
            .map(|members| select_exemplar(&articles, members))
            .collect();

        let mut slots: Vec<Option<ArticleRecord>> = articles.into_iter().map(Some).collect();
        Ok(exemplars
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect())
    }
}

fn select_exemplar(articles: &[ArticleRecord], members: &[usize]) -> usize {
    let mut best = members[0];
    let mut best_len = articles[best].summary_len();
    for &index in &members[1..] {
        let len = articles[index].summary_len();
        if len > best_len {
            best = index;
            best_len = len;
        }
    }
    best
}
