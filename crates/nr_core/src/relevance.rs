use crate::types::ArticleRecord;

/// Cheap keyword pre-filter run before any article is embedded.
///
/// An article passes when at least half of the keyword words (rounded down,
/// minimum one) occur somewhere in its title or summary.
pub fn is_relevant(article: &ArticleRecord, keyword: &str) -> bool {
    let content = format!("{} {}", article.title, article.summary).to_lowercase();
    let keyword = keyword.to_lowercase();
    let words: Vec<&str> = keyword.split_whitespace().collect();

    let matches = words.iter().filter(|w| content.contains(*w)).count();
    matches >= (words.len() / 2).max(1)
}
