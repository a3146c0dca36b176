use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, FuturesUnordered, StreamExt};
use nr_core::config::{EmbeddingFailurePolicy, SearchConfig};
use nr_core::{
    is_relevant, ArticleRecord, NewsProvider, ProviderReport, Result, SearchOutcome, SortOrder,
};
use nr_inference::{CachedEmbedder, Deduplicator, Ranker};
use tokio::time::Instant;
use tracing::{debug, info, warn};

enum FetchFailure {
    Timeout,
    Failed(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "timed out"),
            FetchFailure::Failed(e) => write!(f, "{}", e),
        }
    }
}

type FetchResult = std::result::Result<Vec<ArticleRecord>, FetchFailure>;

/// Runs the whole search pipeline: fetch, filter, embed, deduplicate, rank.
pub struct SearchManager {
    providers: Vec<Arc<dyn NewsProvider>>,
    embedder: Arc<CachedEmbedder>,
    deduplicator: Deduplicator,
    ranker: Ranker,
    config: SearchConfig,
}

impl fmt::Debug for SearchManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchManager")
            .field("providers", &self.provider_names())
            .field("embedder", &self.embedder)
            .field("config", &self.config)
            .finish()
    }
}

impl SearchManager {
    pub fn new(
        providers: Vec<Arc<dyn NewsProvider>>,
        embedder: Arc<CachedEmbedder>,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            providers,
            deduplicator: Deduplicator::new(config.dedup),
            ranker: Ranker::new(config.ranking, embedder.clone()),
            embedder,
            config,
        })
    }

    pub fn add_provider(&mut self, provider: Arc<dyn NewsProvider>) {
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn embedder(&self) -> &Arc<CachedEmbedder> {
        &self.embedder
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Ranked, deduplicated articles for `keyword`, best first.
    pub async fn search(&self, keyword: &str) -> Result<Vec<ArticleRecord>> {
        Ok(self.search_with(keyword, SortOrder::default()).await?.articles)
    }

    pub async fn search_with(&self, keyword: &str, order: SortOrder) -> Result<SearchOutcome> {
        let keyword = keyword.trim();
        let mut outcome = SearchOutcome {
            keyword: keyword.to_string(),
            ..Default::default()
        };
        if keyword.is_empty() {
            debug!("empty keyword, nothing to search");
            return Ok(outcome);
        }

        info!("🔍 Searching for '{}'", keyword);
        let (raw, reports) = self.fetch_all(keyword).await;
        outcome.fetched = raw.len();
        outcome.providers = reports;
        info!("📰 Fetched {} raw articles", outcome.fetched);

        let relevant: Vec<ArticleRecord> = raw
            .into_iter()
            .filter(|article| is_relevant(article, keyword))
            .collect();
        outcome.relevant = relevant.len();
        info!("🧹 Relevant articles: {}", outcome.relevant);

        let fallback = match self.config.on_embedding_failure {
            EmbeddingFailurePolicy::LexicalOnly => Some(relevant.clone()),
            EmbeddingFailurePolicy::Fail => None,
        };

        let (unique, ranked) = match self.semantic_rank(relevant, keyword, order).await {
            Ok(result) => result,
            Err(err) => match fallback {
                Some(articles) => {
                    warn!(error = %err, "embedding failed, ranking on keyword matches only");
                    let count = articles.len();
                    (count, self.ranker.rank_with_embedding(articles, keyword, None, order))
                }
                None => return Err(err),
            },
        };

        outcome.unique = unique;
        outcome.articles = ranked;
        info!("✨ Final results: {}", outcome.articles.len());
        Ok(outcome)
    }

    /// Fetch from every provider in parallel.
    ///
    /// Each provider gets its own timeout and retries; the whole phase is
    /// bounded by the request timeout, after which whatever has arrived is
    /// used. Articles come back grouped in provider registration order.
    pub async fn fetch_all(&self, keyword: &str) -> (Vec<ArticleRecord>, Vec<ProviderReport>) {
        let deadline = Instant::now() + self.config.request_timeout;
        let mut pending: FuturesUnordered<_> = self
            .providers
            .iter()
            .enumerate()
            .map(|(index, provider)| {
                let provider = provider.clone();
                let keyword = keyword.to_string();
                let timeout = self.config.provider_timeout;
                let retries = self.config.provider_retries;
                async move {
                    let result =
                        fetch_with_retry(provider.as_ref(), &keyword, timeout, retries).await;
                    (index, result)
                }
            })
            .collect();

        let mut slots: Vec<Option<FetchResult>> = (0..self.providers.len()).map(|_| None).collect();
        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((index, result))) => slots[index] = Some(result),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        timeout = ?self.config.request_timeout,
                        waiting = pending.len(),
                        "request deadline reached, using partial results"
                    );
                    break;
                }
            }
        }

        let mut articles = Vec::new();
        let mut reports = Vec::with_capacity(slots.len());
        for (provider, slot) in self.providers.iter().zip(slots) {
            let name = provider.name().to_string();
            let report = match slot {
                Some(Ok(fetched)) => {
                    let report = ProviderReport {
                        provider: name,
                        fetched: fetched.len(),
                        error: None,
                        timed_out: false,
                    };
                    articles.extend(fetched);
                    report
                }
                Some(Err(failure)) => {
                    warn!(provider = %name, error = %failure, "provider contributed no articles");
                    ProviderReport {
                        provider: name,
                        fetched: 0,
                        timed_out: matches!(failure, FetchFailure::Timeout),
                        error: Some(failure.to_string()),
                    }
                }
                None => ProviderReport {
                    provider: name,
                    fetched: 0,
                    error: Some("request deadline exceeded".to_string()),
                    timed_out: true,
                },
            };
            reports.push(report);
        }
        (articles, reports)
    }

    async fn semantic_rank(
        &self,
        articles: Vec<ArticleRecord>,
        keyword: &str,
        order: SortOrder,
    ) -> Result<(usize, Vec<ArticleRecord>)> {
        if articles.is_empty() {
            return Ok((0, articles));
        }

        info!("🔢 Generating embeddings for {} articles", articles.len());
        let embedded = self.embed_all(articles).await?;
        let unique = self.deduplicator.deduplicate(embedded)?;
        info!("🧩 Unique stories: {}", unique.len());

        let count = unique.len();
        let ranked = self.ranker.rank(unique, keyword, order).await?;
        Ok((count, ranked))
    }

    async fn embed_all(&self, articles: Vec<ArticleRecord>) -> Result<Vec<ArticleRecord>> {
        let texts: Vec<String> = articles.iter().map(ArticleRecord::embedding_text).collect();
        let embedder = self.embedder.clone();
        let embeddings: Vec<Result<Vec<f32>>> = stream::iter(texts)
            .map(move |text| {
                let embedder = embedder.clone();
                async move { embedder.embed(&text).await.map(|v| v.as_ref().clone()) }
            })
            .buffered(self.config.embed_concurrency)
            .collect()
            .await;

        articles
            .into_iter()
            .zip(embeddings)
            .map(|(mut article, embedding)| {
                article.embedding = embedding?;
                Ok(article)
            })
            .collect()
    }
}

async fn fetch_with_retry(
    provider: &dyn NewsProvider,
    keyword: &str,
    timeout: Duration,
    retries: u32,
) -> FetchResult {
    let mut attempt = 0;
    loop {
        let failure = match tokio::time::timeout(timeout, provider.fetch(keyword)).await {
            Ok(Ok(articles)) => return Ok(articles),
            Ok(Err(e)) => FetchFailure::Failed(e.to_string()),
            Err(_) => FetchFailure::Timeout,
        };
        if attempt >= retries {
            return Err(failure);
        }
        attempt += 1;
        warn!(
            provider = provider.name(),
            attempt,
            error = %failure,
            "provider fetch failed, retrying"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nr_core::{EmbeddingModel, Error};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticProvider {
        name: &'static str,
        articles: Vec<ArticleRecord>,
        delay: Duration,
    }

    #[async_trait]
    impl NewsProvider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _keyword: &str) -> Result<Vec<ArticleRecord>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.articles.clone())
        }
    }

    struct FailingProvider {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl NewsProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _keyword: &str) -> Result<Vec<ArticleRecord>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Provider("rate limited".to_string()))
        }
    }

    /// Fails the first attempt, succeeds on the retry.
    struct FlakyProvider {
        attempts: AtomicUsize,
        articles: Vec<ArticleRecord>,
    }

    #[async_trait]
    impl NewsProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch(&self, _keyword: &str) -> Result<Vec<ArticleRecord>> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(Error::Provider("connection reset".to_string()));
            }
            Ok(self.articles.clone())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingModel {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.texts.lock().unwrap().push(text.to_string());
            let lower = text.to_lowercase();
            Ok(["industry", "prices", "refinery"]
                .iter()
                .map(|word| if lower.contains(word) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    #[derive(Debug)]
    struct OfflineModel;

    #[async_trait]
    impl EmbeddingModel for OfflineModel {
        fn name(&self) -> &str {
            "offline"
        }

        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::Embedding("model offline".to_string()))
        }
    }

    fn article(title: &str, source: &str, summary: &str) -> ArticleRecord {
        nr_core::normalize(
            Some(title),
            Some("https://example.com"),
            Some(source),
            Some(summary),
            None,
            None,
        )
    }

    fn provider(
        name: &'static str,
        articles: Vec<ArticleRecord>,
        delay_ms: u64,
    ) -> Arc<dyn NewsProvider> {
        Arc::new(StaticProvider {
            name,
            articles,
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn manager(
        providers: Vec<Arc<dyn NewsProvider>>,
        model: Arc<dyn EmbeddingModel>,
        config: SearchConfig,
    ) -> SearchManager {
        let embedder = Arc::new(CachedEmbedder::new(model, 1_000));
        SearchManager::new(providers, embedder, config).unwrap()
    }

    fn fast_config() -> SearchConfig {
        SearchConfig {
            provider_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_search_pipeline() {
        let model = Arc::new(RecordingModel::default());
        let providers = vec![
            provider(
                "wire",
                vec![
                    article("Gasoline Industry Outlook", "wire", "Refiners expect a busy summer."),
                    article("Football scores", "wire", "Weekend results."),
                ],
                0,
            ),
            provider(
                "gnews",
                vec![
                    article(
                        "Gasoline prices climb",
                        "gnews",
                        "Drivers pay more at the pump this week.",
                    ),
                    article(
                        "Gasoline prices jump",
                        "gnews",
                        "Pump prices rose again at stations nationwide.",
                    ),
                ],
                0,
            ),
        ];
        let manager = manager(providers, model.clone(), fast_config());

        let outcome = manager
            .search_with("gasoline industry", SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(outcome.keyword, "gasoline industry");
        assert_eq!(outcome.fetched, 4);
        assert_eq!(outcome.relevant, 3);
        // both price stories share an embedding; the longer summary survives
        assert_eq!(outcome.unique, 2);
        assert_eq!(outcome.articles.len(), 2);
        assert_eq!(outcome.articles[0].title, "Gasoline Industry Outlook");
        assert_eq!(outcome.articles[1].title, "Gasoline prices jump");
        assert!(outcome.articles.iter().all(|a| a.score.is_some()));
        assert!(outcome.providers.iter().all(|r| r.error.is_none()));

        let texts = model.texts.lock().unwrap();
        assert_eq!(texts.iter().filter(|t| t.as_str() == "gasoline industry").count(), 1);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_search_runs_on_spawned_task() {
        let providers = vec![provider(
            "wire",
            vec![
                article("Gasoline Industry Outlook", "wire", "Refiners expect a busy summer."),
                article("Gasoline prices jump", "wire", "Pump prices rose again."),
            ],
            0,
        )];
        let model = Arc::new(RecordingModel::default());
        let manager = Arc::new(manager(providers, model, fast_config()));

        let pending = manager.search_with("gasoline", SortOrder::Descending);
        assert_send(&pending);
        drop(pending);

        let shared = manager.clone();
        let articles = tokio::spawn(async move { shared.search("gasoline").await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(articles.len(), 2);
        assert!(manager.embedder().contains("gasoline"));
    }

    #[tokio::test]
    async fn test_empty_keyword_returns_nothing() {
        let providers = vec![provider("wire", vec![article("Anything", "wire", "at all")], 0)];
        let manager = manager(providers, Arc::new(OfflineModel), fast_config());

        let outcome = manager.search_with("   ", SortOrder::Descending).await.unwrap();
        assert!(outcome.articles.is_empty());
        assert!(outcome.providers.is_empty());
        assert!(manager.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_relevant_articles_needs_no_embedding() {
        let providers = vec![provider(
            "wire",
            vec![article("Football scores", "wire", "Weekend")],
            0,
        )];
        let manager = manager(providers, Arc::new(OfflineModel), fast_config());

        let outcome = manager.search_with("gasoline", SortOrder::Descending).await.unwrap();
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.relevant, 0);
        assert!(outcome.articles.is_empty());
    }

    #[tokio::test]
    async fn test_failed_provider_is_retried_and_reported() {
        let failing = Arc::new(FailingProvider { attempts: AtomicUsize::new(0) });
        let providers: Vec<Arc<dyn NewsProvider>> = vec![
            failing.clone(),
            provider("wire", vec![article("Gasoline rally", "wire", "Prices up")], 0),
        ];
        let manager = manager(providers, Arc::new(RecordingModel::default()), fast_config());

        let outcome = manager.search_with("gasoline", SortOrder::Descending).await.unwrap();
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.articles.len(), 1);
        assert_eq!(outcome.providers[0].provider, "failing");
        assert!(outcome.providers[0].error.as_deref().unwrap().contains("rate limited"));
        assert!(!outcome.providers[0].timed_out);
        assert_eq!(outcome.providers[1].fetched, 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_flaky_provider() {
        let flaky = Arc::new(FlakyProvider {
            attempts: AtomicUsize::new(0),
            articles: vec![article("Gasoline", "flaky", "s")],
        });
        let providers: Vec<Arc<dyn NewsProvider>> = vec![flaky.clone()];
        let manager = manager(providers, Arc::new(RecordingModel::default()), fast_config());

        let (articles, reports) = manager.fetch_all("gasoline").await;
        assert_eq!(articles.len(), 1);
        assert!(reports[0].error.is_none());
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let providers = vec![
            provider("slow", vec![article("Gasoline late", "slow", "s")], 5_000),
            provider("fast", vec![article("Gasoline early", "fast", "s")], 0),
        ];
        let config = SearchConfig {
            provider_timeout: Duration::from_millis(50),
            ..fast_config()
        };
        let manager = manager(providers, Arc::new(RecordingModel::default()), config);

        let (articles, reports) = manager.fetch_all("gasoline").await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Gasoline early");
        assert!(reports[0].timed_out);
        assert_eq!(reports[0].error.as_deref(), Some("timed out"));
    }

    #[tokio::test]
    async fn test_request_deadline_keeps_partial_results() {
        let providers = vec![
            provider("fast", vec![article("Gasoline early", "fast", "s")], 0),
            provider("slow", vec![article("Gasoline late", "slow", "s")], 5_000),
        ];
        let config = SearchConfig {
            provider_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let manager = manager(providers, Arc::new(RecordingModel::default()), config);

        let started = std::time::Instant::now();
        let (articles, reports) = manager.fetch_all("gasoline").await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(articles.len(), 1);
        assert!(reports[1].timed_out);
        assert_eq!(reports[1].error.as_deref(), Some("request deadline exceeded"));
    }

    #[tokio::test]
    async fn test_results_follow_registration_order() {
        let providers = vec![
            provider("first", vec![article("A", "first", "s")], 40),
            provider("second", vec![article("B", "second", "s")], 0),
        ];
        let manager = manager(providers, Arc::new(RecordingModel::default()), fast_config());

        let (articles, reports) = manager.fetch_all("x").await;
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        let names: Vec<&str> = reports.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_search_by_default() {
        let providers = vec![provider("wire", vec![article("Gasoline", "wire", "s")], 0)];
        let manager = manager(providers, Arc::new(OfflineModel), fast_config());

        let err = manager.search("gasoline").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_lexical_only_policy() {
        let providers = vec![provider(
            "wire",
            vec![
                article("Gasoline news", "wire", "same story"),
                article("Gasoline news", "wire", "same story"),
                article("Other", "wire", "gasoline mention"),
            ],
            0,
        )];
        let config = SearchConfig {
            on_embedding_failure: EmbeddingFailurePolicy::LexicalOnly,
            ..fast_config()
        };
        let manager = manager(providers, Arc::new(OfflineModel), config);

        let outcome = manager.search_with("gasoline", SortOrder::Descending).await.unwrap();
        // no deduplication without embeddings
        assert_eq!(outcome.articles.len(), 3);
        assert_eq!(outcome.unique, 3);
        assert_eq!(outcome.articles[0].score, Some(0.6 * 13.0));
        assert_eq!(outcome.articles[2].score, Some(0.6 * 6.0));
    }

    #[tokio::test]
    async fn test_ascending_order() {
        let providers = vec![provider(
            "wire",
            vec![
                article("Gasoline Industry Outlook", "wire", "s"),
                article("Industry", "wire", "gasoline refinery"),
            ],
            0,
        )];
        let manager = manager(providers, Arc::new(RecordingModel::default()), fast_config());

        let outcome = manager.search_with("gasoline industry", SortOrder::Ascending).await.unwrap();
        assert_eq!(outcome.articles.len(), 2);
        assert!(outcome.articles[0].score <= outcome.articles[1].score);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let embedder = Arc::new(CachedEmbedder::new(Arc::new(OfflineModel), 10));
        let config = SearchConfig {
            embed_concurrency: 0,
            ..Default::default()
        };
        assert!(SearchManager::new(Vec::new(), embedder, config).is_err());
    }
}
