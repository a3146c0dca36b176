use serde::{Deserialize, Serialize};

/// Canonical news record produced by the normalizer.
///
/// `embedding` is filled in by the embedding step and `score` by the ranker;
/// every other field always carries a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub source: String,
    pub summary: String,
    pub published_at: String,
    pub image: String,
    #[serde(default, skip_serializing)]
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl ArticleRecord {
    /// Text handed to the embedding model for this article.
    pub fn embedding_text(&self) -> String {
        format!("{}. {}", self.title, self.summary)
    }

    pub fn summary_len(&self) -> usize {
        self.summary.chars().count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desc" | "descending" => Ok(SortOrder::Descending),
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            other => Err(format!("Invalid sort order: {}", other)),
        }
    }
}

/// What a single provider contributed to a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub provider: String,
    pub fetched: usize,
    pub error: Option<String>,
    pub timed_out: bool,
}

/// Result of one pass of the search pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub keyword: String,
    pub articles: Vec<ArticleRecord>,
    pub providers: Vec<ProviderReport>,
    pub fetched: usize,
    pub relevant: usize,
    pub unique: usize,
}

impl SearchOutcome {
    pub fn unique_sources(&self) -> usize {
        self.sources().len()
    }

    /// Distinct sources in the result, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.articles.iter().map(|a| a.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }

    /// Keep only articles whose source matches one of `sources`, ignoring case.
    /// An empty filter keeps everything.
    pub fn retain_sources<S: AsRef<str>>(&mut self, sources: &[S]) {
        if sources.is_empty() {
            return;
        }
        self.articles.retain(|article| {
            sources
                .iter()
                .any(|s| s.as_ref().trim().eq_ignore_ascii_case(&article.source))
        });
    }

    pub fn average_score(&self) -> f64 {
        if self.articles.is_empty() {
            return 0.0;
        }
        let total: f64 = self.articles.iter().filter_map(|a| a.score).sum();
        total / self.articles.len() as f64
    }
}
