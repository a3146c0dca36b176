pub mod logging;
pub mod manager;
pub mod providers;

pub use logging::init_logging;
pub use manager::SearchManager;
pub use providers::{providers_from_keys, GNewsProvider, NewsApiProvider, NewsDataProvider};

pub mod prelude {
    pub use super::manager::SearchManager;
    pub use super::providers::providers_from_keys;
    pub use nr_core::{ArticleRecord, Error, NewsProvider, Result, SearchOutcome, SortOrder};
}
