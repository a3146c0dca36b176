use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use nr_core::{Error, Result, SearchOutcome, SortOrder};
use nr_inference::{create_model, CachedEmbedder};
use nr_providers::logging::{init_logging, level_for_verbosity};
use nr_providers::providers::PROVIDER_NAMES;
use nr_providers::{providers_from_keys, SearchManager};
use tracing::{info, warn};

mod cli;
mod duration;
mod export;

use cli::{Cli, Commands};

/// The persistent store holds as many embeddings as the in-memory cache.
fn store_capacity(cache_capacity: u64) -> usize {
    usize::try_from(cache_capacity).unwrap_or(usize::MAX)
}

async fn build_manager(cli: &Cli) -> Result<SearchManager> {
    let inference = cli.inference_config();
    let model = create_model(&inference)?;
    info!(
        "🧠 Embedding model initialized (using {}, {} dimensions)",
        model.name(),
        model.dimension()
    );

    let mut embedder = CachedEmbedder::new(model, inference.cache_capacity);
    if let Some(path) = &cli.embed_cache {
        let location = path.to_str().ok_or_else(|| {
            Error::Config(format!("Embedding cache path is not UTF-8: {}", path.display()))
        })?;
        let max_items = store_capacity(inference.cache_capacity);
        let store = nr_storage::create_store("sqlite", Some(location), max_items).await?;
        info!("💾 Persisting embeddings to {}", path.display());
        embedder = embedder.with_store(store);
    }

    let providers = providers_from_keys(&cli.provider_keys());
    if providers.is_empty() {
        warn!("No provider API keys configured; searches will return nothing");
    } else {
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        info!("📡 Providers initialized: {}", names.join(", "));
    }

    SearchManager::new(providers, Arc::new(embedder), cli.search_config())
}

fn print_outcome(outcome: &SearchOutcome) {
    println!(
        "\n{} articles from {} sources (average score {:.2})\n",
        outcome.articles.len(),
        outcome.unique_sources(),
        outcome.average_score()
    );
    for article in &outcome.articles {
        println!(
            "[{}] (Score: {:.2}) {}",
            article.source,
            article.score.unwrap_or_default(),
            article.title
        );
        println!("Link: {}", article.link);
        println!("{}", "-".repeat(80));
    }
    for report in outcome.providers.iter().filter(|r| r.error.is_some()) {
        let error = report.error.as_deref().unwrap_or_default();
        eprintln!("⚠️ {} failed: {}", report.provider, error);
    }
}

async fn run_search(
    manager: &SearchManager,
    keyword: &str,
    order: SortOrder,
    sources: &[String],
    limit: Option<usize>,
    export: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut outcome = manager.search_with(keyword, order).await?;
    outcome.retain_sources(sources);
    if let Some(limit) = limit {
        outcome.articles.truncate(limit);
    }

    if let Some(dir) = export {
        let path = export::export_csv(&outcome.articles, &dir, keyword, &chrono::Local::now())?;
        println!("📄 Saved {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(level_for_verbosity(cli.verbose));

    match &cli.command {
        Commands::Providers => {
            let configured = providers_from_keys(&cli.provider_keys());
            for name in PROVIDER_NAMES {
                let configured = configured.iter().any(|p| p.name() == name);
                let mark = if configured { "✅" } else { "❌" };
                println!("{} {}", mark, name);
            }
        }
        Commands::Search { keyword, order, sources, limit, export, json } => {
            let manager = build_manager(&cli).await?;
            let keyword = keyword.join(" ");
            run_search(&manager, &keyword, *order, sources, *limit, export.clone(), *json).await?;
        }
        Commands::Serve { addr } => {
            let manager = build_manager(&cli).await?;
            nr_web::serve(nr_web::AppState::new(Arc::new(manager)), *addr).await?;
        }
    }

    Ok(())
}
