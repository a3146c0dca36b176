use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use nr_core::{ArticleRecord, Error, Result};
use serde::Serialize;

#[derive(Serialize)]
struct CsvRow<'a> {
    title: &'a str,
    link: &'a str,
    source: &'a str,
    summary: &'a str,
    published_at: &'a str,
    image: &'a str,
    score: Option<f64>,
}

impl<'a> From<&'a ArticleRecord> for CsvRow<'a> {
    fn from(article: &'a ArticleRecord) -> Self {
        Self {
            title: &article.title,
            link: &article.link,
            source: &article.source,
            summary: &article.summary,
            published_at: &article.published_at,
            image: &article.image,
            score: article.score,
        }
    }
}

/// `news_results_{keyword}_{YYYYmmdd_HHMMSS}.csv`, keyword whitespace turned
/// into `_` and anything outside `[A-Za-z0-9_-]` dropped.
pub fn export_filename<Tz: TimeZone>(keyword: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let keyword: String = keyword
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("news_results_{}_{}.csv", keyword, at.format("%Y%m%d_%H%M%S"))
}

pub fn write_csv<W: Write>(writer: W, articles: &[ArticleRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for article in articles {
        writer
            .serialize(CsvRow::from(article))
            .map_err(|e| Error::Export(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the articles to a new CSV file in `dir` and return its path.
pub fn export_csv<Tz: TimeZone>(
    articles: &[ArticleRecord],
    dir: &Path,
    keyword: &str,
    at: &DateTime<Tz>,
) -> Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(keyword, at));
    let file = fs::File::create(&path)?;
    write_csv(file, articles)?;
    tracing::info!("💾 Exported {} articles to {}", articles.len(), path.display());
    Ok(path)
}
