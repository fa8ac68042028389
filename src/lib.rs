//! Immutable site snapshots and wave-scheduled parallel rendering.
//!
//! A build runs in three steps:
//!
//! ```text
//! ContentTree ──build_snapshot──► Arc<SiteSnapshot> ──Renderer──► OutputWriter
//!                                        │
//!                                        └──► Scout (warms templates ahead)
//! ```
//!
//! The snapshot is read by every worker and by the scout without locks.
//! The template engine's compile cache and the writer's queue are the only
//! shared mutable state, and both synchronize internally.

pub mod builder;
pub mod config;
pub mod content;
pub mod logger;
pub mod render;
pub mod scout;
pub mod snapshot;
pub mod template;
pub mod writer;

pub use builder::{BuildError, SnapshotBuilder, build_snapshot};
pub use config::{Config, RenderConfig};
pub use content::{ContentTree, MenuEntry, PageKey, PageSource, SectionKey, SectionSource, TocEntry};
pub use render::{CancelToken, Phase, RenderError, RenderStats, Renderer, render_all};
pub use scout::{Scout, ScoutReport};
pub use snapshot::{MenuItem, PageId, PageSnapshot, ScoutHint, SectionId, SectionSnapshot, SiteSnapshot, Wave};
pub use template::{HandlebarsEngine, PartialResolver, TemplateEngine, TemplateError};
pub use writer::{FsWriter, MemoryWriter, OutputWriter, WriteError};
