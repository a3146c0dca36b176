use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

/// Install the fmt subscriber once. Later calls, or a subscriber installed by
/// someone else, are left alone.
pub fn init_logging(level: Level) {
    if !tracing::dispatcher::has_been_set() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .init();
        });
    }
}

/// `-v` flags to a level: none is INFO, one is DEBUG, more is TRACE.
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
