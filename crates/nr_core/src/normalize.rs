use crate::types::ArticleRecord;

pub const DEFAULT_TITLE: &str = "No Headline";
pub const DEFAULT_LINK: &str = "#";
pub const DEFAULT_SUMMARY: &str = "No summary available.";
pub const DEFAULT_IMAGE: &str = "https://via.placeholder.com/150";
pub const MAX_SUMMARY_CHARS: usize = 1000;

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Map one provider item onto an [`ArticleRecord`], substituting defaults for
/// missing or empty fields.
pub fn normalize(
    title: Option<&str>,
    link: Option<&str>,
    source: Option<&str>,
    summary: Option<&str>,
    published_at: Option<&str>,
    image: Option<&str>,
) -> ArticleRecord {
    let summary = present(summary).unwrap_or(DEFAULT_SUMMARY);

    ArticleRecord {
        title: present(title).unwrap_or(DEFAULT_TITLE).to_string(),
        link: present(link).unwrap_or(DEFAULT_LINK).to_string(),
        source: source.unwrap_or_default().to_uppercase(),
        summary: summary.chars().take(MAX_SUMMARY_CHARS).collect(),
        published_at: published_at.unwrap_or_default().to_string(),
        image: present(image).unwrap_or(DEFAULT_IMAGE).to_string(),
        embedding: Vec::new(),
        score: None,
    }
}
