//! Hybrid lexical + semantic scoring.

use std::fmt;
use std::sync::Arc;

use nr_core::config::RankingConfig;
use nr_core::{cosine_similarity, ArticleRecord, Result, SortOrder};

use crate::embeddings::CachedEmbedder;

const PHRASE_IN_TITLE: f64 = 10.0;
const PHRASE_IN_SUMMARY: f64 = 5.0;
const WORD_IN_TITLE: f64 = 3.0;
const WORD_IN_SUMMARY: f64 = 1.0;

/// Keyword-match subscore.
///
/// The whole phrase earns 10 in the title and 5 in the summary. Each word then
/// earns 3 if it is in the title, otherwise 1 if it is in the summary.
pub fn lexical_score(article: &ArticleRecord, keyword: &str) -> f64 {
    let title = article.title.to_lowercase();
    let summary = article.summary.to_lowercase();
    let phrase = keyword.to_lowercase();

    let mut score = 0.0;
    if !phrase.trim().is_empty() {
        if title.contains(&phrase) {
            score += PHRASE_IN_TITLE;
        }
        if summary.contains(&phrase) {
            score += PHRASE_IN_SUMMARY;
        }
    }

    for word in phrase.split_whitespace() {
        if title.contains(word) {
            score += WORD_IN_TITLE;
        } else if summary.contains(word) {
            score += WORD_IN_SUMMARY;
        }
    }
    score
}

/// Cosine similarity to the keyword, scaled to 0..100.
pub fn semantic_score(article: &ArticleRecord, keyword_embedding: &[f32]) -> f64 {
    cosine_similarity(&article.embedding, keyword_embedding) * 100.0
}

pub struct Ranker {
    config: RankingConfig,
    embedder: Arc<CachedEmbedder>,
}

impl fmt::Debug for Ranker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ranker")
            .field("config", &self.config)
            .field("embedder", &self.embedder)
            .finish()
    }
}

impl Ranker {
    pub fn new(config: RankingConfig, embedder: Arc<CachedEmbedder>) -> Self {
        Self { config, embedder }
    }

    /// Score and sort the articles. The keyword is embedded once, through the
    /// shared cache, and only when there is something to rank.
    pub async fn rank(
        &self,
        articles: Vec<ArticleRecord>,
        keyword: &str,
        order: SortOrder,
    ) -> Result<Vec<ArticleRecord>> {
        if articles.is_empty() {
            return Ok(articles);
        }
        let keyword_embedding = self.embedder.embed(keyword).await?;
        Ok(self.rank_with_embedding(articles, keyword, Some(&keyword_embedding), order))
    }

    /// Score against a precomputed keyword vector. `None` scores on the
    /// lexical subscore alone.
    pub fn rank_with_embedding(
        &self,
        articles: Vec<ArticleRecord>,
        keyword: &str,
        keyword_embedding: Option<&[f32]>,
        order: SortOrder,
    ) -> Vec<ArticleRecord> {
        let mut ranked: Vec<ArticleRecord> = articles
            .into_iter()
            .map(|mut article| {
                let lexical = lexical_score(&article, keyword);
                let semantic = keyword_embedding
                    .map(|k| semantic_score(&article, k))
                    .unwrap_or(0.0);
                article.score = Some(
                    self.config.lexical_weight * lexical + self.config.semantic_weight * semantic,
                );
                article
            })
            .collect();

        sort_by_score(&mut ranked, order);
        ranked
    }
}

/// Stable sort on `score`; equal scores keep their relative order.
pub fn sort_by_score(articles: &mut [ArticleRecord], order: SortOrder) {
    articles.sort_by(|a, b| {
        let (a, b) = (a.score.unwrap_or_default(), b.score.unwrap_or_default());
        match order {
            SortOrder::Descending => b.total_cmp(&a),
            SortOrder::Ascending => a.total_cmp(&b),
        }
    });
}
