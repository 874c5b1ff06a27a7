//! Process-wide diagnostic verbosity.
//!
//! The first call installs a `tracing-subscriber` fmt subscriber whose level
//! filter sits behind a reload handle; later calls only swap the level.

use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

static FILTER: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Switches diagnostic logging between quiet (WARN) and verbose (DEBUG).
pub fn set_verbose(verbose: bool) {
    let handle = FILTER.get_or_init(|| {
        let (filter, handle) = reload::Layer::new(level_for(verbose));
        // Another global subscriber may already be installed by the host.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init();
        handle
    });

    if let Err(err) = handle.modify(|filter| *filter = level_for(verbose)) {
        tracing::warn!(error = %err, "failed to update log level");
    }
}

/// Returns the level currently applied, if logging was ever configured.
pub fn current_level() -> Option<LevelFilter> {
    FILTER.get().and_then(|handle| handle.clone_current())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        set_verbose(true);
        assert_eq!(current_level(), Some(LevelFilter::DEBUG));
        set_verbose(false);
        assert_eq!(current_level(), Some(LevelFilter::WARN));
    }
}
