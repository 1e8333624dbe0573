use std::{env, path::PathBuf, sync::Once};

const DEFAULT_DIR_NAME: &str = ".cashbook_core";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("cashbook_core=info".parse().unwrap());

        fmt().with_env_filter(filter).init();
    });
}

/// Returns the application data directory, defaulting to
/// `~/.cashbook_core` and honoring a `CASHBOOK_CORE_HOME` override.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("CASHBOOK_CORE_HOME") {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}
