//! Render configuration, loaded from a TOML file.
//!
//! # Sections
//!
//! | Section      | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | `[render]`   | Worker pool, scout pacing, writer queue, output    |
//!
//! # Example
//!
//! ```toml
//! [render]
//! workers = 8               # 0 = one per core
//! scout_lookahead = 2       # waves the scout may run ahead
//! scout_join_timeout_ms = 500
//! writer_queue = 256        # bounded; a full queue blocks workers
//! output = "public"
//! templates = "templates"
//! minify = true
//! ```

pub mod defaults;
mod error;

pub use error::ConfigError;

use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rendering pipeline settings
    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::from)?;
        config.render.validate()?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }
}

// ============================================================================
// [render]
// ============================================================================

/// `[render]` section - scheduler, scout and writer settings.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Worker pool size. `0` selects one worker per available core.
    #[serde(default = "defaults::render::workers")]
    #[educe(Default = defaults::render::workers())]
    pub workers: usize,

    /// How many waves the scout may warm ahead of the workers.
    /// `0` keeps it on the workers' current wave.
    #[serde(default = "defaults::render::scout_lookahead")]
    #[educe(Default = defaults::render::scout_lookahead())]
    pub scout_lookahead: usize,

    /// Upper bound on waiting for the scout thread after the last wave.
    #[serde(default = "defaults::render::scout_join_timeout_ms")]
    #[educe(Default = defaults::render::scout_join_timeout_ms())]
    pub scout_join_timeout_ms: u64,

    /// Capacity of the output writer's queue.
    #[serde(default = "defaults::render::writer_queue")]
    #[educe(Default = defaults::render::writer_queue())]
    pub writer_queue: usize,

    /// Output directory for the file writer.
    #[serde(default = "defaults::render::output")]
    #[educe(Default = defaults::render::output())]
    pub output: PathBuf,

    /// Directory of `.hbs` templates for the bundled engine.
    #[serde(default = "defaults::render::templates")]
    #[educe(Default = defaults::render::templates())]
    pub templates: PathBuf,

    /// Minify HTML before writing.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub minify: bool,

    /// Show terminal progress bars while rendering.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub progress: bool,

    /// Link next/prev across pages that belong to no section.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub site_wide_navigation: bool,
}

impl RenderConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.writer_queue == 0 {
            return Err(ConfigError::Validation(
                "`render.writer_queue` must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the worker count, expanding `0` to the available parallelism.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            n => n,
        }
    }

    pub fn scout_join_timeout(&self) -> Duration {
        Duration::from_millis(self.scout_join_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.workers, 0);
        assert_eq!(config.scout_lookahead, 2);
        assert_eq!(config.writer_queue, 256);
        assert_eq!(config.output, PathBuf::from("public"));
        assert!(!config.minify);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_parse_render_section() {
        let config = Config::from_str(
            r#"
            [render]
            workers = 4
            scout_lookahead = 3
            minify = true
            "#,
        )
        .unwrap();
        assert_eq!(config.render.worker_count(), 4);
        assert_eq!(config.render.scout_lookahead, 3);
        assert!(config.render.minify);
        // Unspecified fields keep their defaults
        assert_eq!(config.render.scout_join_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.render.writer_queue, 256);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::from_str("[render]\nthreads = 3\n").is_err());
    }

    #[test]
    fn test_zero_queue_rejected() {
        let err = Config::from_str("[render]\nwriter_queue = 0\n").unwrap_err();
        assert!(err.to_string().contains("writer_queue"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Config::from_path(Path::new("/nonexistent/render.toml")).unwrap_err();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.toml");
        fs::write(&path, "[render]\nprogress = true\n").unwrap();
        let config = Config::from_path(&path).unwrap();
        assert!(config.render.progress);
    }
}
