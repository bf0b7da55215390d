//! Pipeline configuration.
//!
//! ## Loading order
//!
//! 1. `DPAM_CONFIG` environment variable (path to a TOML file)
//! 2. `pipeline.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! config::init(PipelineConfig::load());
//! let workers = config::get().stage7_workers;
//! ```

mod pipeline_config;
pub mod defaults;

pub use pipeline_config::PipelineConfig;

use std::sync::OnceLock;

static PIPELINE_CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Initialize the global pipeline configuration. Must be called exactly
/// once before any call to [`get`].
pub fn init(config: PipelineConfig) {
    if PIPELINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get the global pipeline configuration.
///
/// Panics if [`init`] has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static PipelineConfig {
    PIPELINE_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Whether the global configuration has been initialized. Useful for tests.
pub fn is_initialized() -> bool {
    PIPELINE_CONFIG.get().is_some()
}

impl PipelineConfig {
    /// Resolve the env-var / cwd-file / defaults loading order described
    /// above.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("DPAM_CONFIG") {
            match Self::load_from_path(std::path::Path::new(&path)) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!("failed to load DPAM_CONFIG={path}: {e}"),
            }
        }
        let cwd_path = std::path::Path::new("pipeline.toml");
        if cwd_path.exists() {
            match Self::load_from_path(cwd_path) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!("failed to load ./pipeline.toml: {e}"),
            }
        }
        Self::default()
    }
}
