//! Wave-scheduled parallel rendering.
//!
//! Waves from the snapshot's topological order run one at a time on a
//! fixed-size worker pool. A wave is a barrier: wave `N + 1` is not
//! submitted until every page of wave `N` has finished. The scout runs
//! alongside on its own thread and is told which wave the workers reached.
//!
//! ```text
//! NotStarted ──► Scheduling ──► Draining ──► Done
//!                (scout runs)   (stop scout, flush writer)
//! ```
//!
//! A page that fails, or whose engine call panics, is recorded in
//! [`RenderStats`] and the build continues.

mod context;
mod stats;

pub use stats::{PageFailure, RenderFailure, RenderStats};

use std::any::Any;
use std::cmp::Reverse;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use thiserror::Error;

use context::ContextCache;

use crate::config::RenderConfig;
use crate::log;
use crate::logger::ProgressBars;
use crate::scout::Scout;
use crate::snapshot::{PageId, SiteSnapshot};
use crate::template::TemplateEngine;
use crate::writer::{OutputWriter, WriteError};

/// Failure to run the build at all. Page failures are not errors here.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation shared between the caller and the scheduler.
///
/// Checked between waves and before each page starts; a page already
/// rendering is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    /// Waves are being submitted while the scout warms ahead.
    Scheduling,
    /// Stopping the scout and flushing the writer.
    Draining,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Scheduling => "scheduling",
            Self::Draining => "draining",
            Self::Done => "done",
        })
    }
}

// ============================================================================
// Renderer
// ============================================================================

enum Outcome {
    Rendered,
    Failed(PageFailure),
    Skipped,
}

pub struct Renderer {
    config: RenderConfig,
    cancel: CancelToken,
    phase: Mutex<Phase>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            phase: Mutex::new(Phase::NotStarted),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    fn enter(&self, phase: Phase) {
        *self.phase.lock() = phase;
        log!("render"; "{}", phase);
    }

    /// Render every page of `snapshot` and hand the output to `writer`.
    ///
    /// The writer is flushed and closed before this returns.
    pub fn render(
        &self,
        snapshot: Arc<SiteSnapshot>,
        engine: Arc<dyn TemplateEngine>,
        writer: &dyn OutputWriter,
    ) -> Result<RenderStats, RenderError> {
        let started = Instant::now();
        let workers = self.config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("render-{i}"))
            .build()?;

        let contexts = ContextCache::new(&snapshot);
        let scout = match Scout::spawn(Arc::clone(&snapshot), Arc::clone(&engine), self.config.scout_lookahead) {
            Ok(scout) => Some(scout),
            Err(err) => {
                log!("scout"; "failed to start, templates compile on demand: {}", err);
                None
            }
        };

        self.enter(Phase::Scheduling);
        let progress = if self.config.progress {
            ProgressBars::new_filtered(&[("render", snapshot.page_count())])
        } else {
            None
        };

        let mut stats = RenderStats::default();
        let waves = snapshot.topological_order();
        for (index, wave) in waves.iter().enumerate() {
            if self.cancel.is_cancelled() {
                stats.cancelled = true;
                stats.skipped += waves[index..].iter().map(|w| w.len()).sum::<usize>();
                break;
            }
            if let Some(scout) = &scout {
                scout.advance(index);
            }

            // Heaviest pages first so the tail of the wave is short
            let mut pages: Vec<PageId> = wave.to_vec();
            pages.sort_by_key(|&id| Reverse(snapshot.page(id).estimated_cost()));

            let outcomes: Vec<Outcome> = pool.install(|| {
                pages
                    .par_iter()
                    .map(|&id| {
                        let outcome = self.render_page(&snapshot, &contexts, engine.as_ref(), writer, id);
                        if let Some(progress) = &progress {
                            progress.inc(0);
                        }
                        outcome
                    })
                    .collect()
            });

            for outcome in outcomes {
                match outcome {
                    Outcome::Rendered => stats.rendered += 1,
                    Outcome::Failed(failure) => stats.failed.push(failure),
                    Outcome::Skipped => {
                        stats.skipped += 1;
                        stats.cancelled = true;
                    }
                }
            }
            stats.waves += 1;
        }
        if let Some(progress) = &progress {
            progress.finish();
        }

        self.enter(Phase::Draining);
        if let Some(scout) = scout {
            stats.scout = scout.stop(self.config.scout_join_timeout());
        }
        match writer.flush_and_close() {
            Ok(written) => stats.written = written,
            Err(err) => {
                log!("error"; "writer: {}", err);
                if let WriteError::Incomplete { written, .. } = &err {
                    stats.written = *written;
                }
                stats.writer_error = Some(err);
            }
        }

        for failure in &stats.failed {
            log!("error"; "{}: {}", failure.source_path.display(), failure.error);
        }
        stats.elapsed = started.elapsed();
        log!(
            "render";
            "{} rendered, {} failed, {} skipped in {} waves on {} workers ({:.2?})",
            stats.rendered,
            stats.failed.len(),
            stats.skipped,
            stats.waves,
            workers,
            stats.elapsed
        );
        self.enter(Phase::Done);

        Ok(stats)
    }

    fn render_page(
        &self,
        snapshot: &SiteSnapshot,
        contexts: &ContextCache,
        engine: &dyn TemplateEngine,
        writer: &dyn OutputWriter,
        id: PageId,
    ) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Skipped;
        }
        let page = snapshot.page(id);
        let failed = |error: RenderFailure| {
            Outcome::Failed(PageFailure {
                source_path: page.source_path().to_path_buf(),
                error,
            })
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let context = contexts.page_context(snapshot, page);
            engine.render(page.template_name(), &context)
        }));
        let html = match result {
            Ok(Ok(html)) => html,
            Ok(Err(err)) => return failed(err.into()),
            Err(panic) => return failed(RenderFailure::Panic(panic_message(panic))),
        };

        match writer.enqueue(page.output_path().to_path_buf(), html) {
            Ok(()) => Outcome::Rendered,
            Err(err) => failed(err.into()),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

/// Render with default settings and `workers` threads (`0` = one per core).
pub fn render_all(
    snapshot: Arc<SiteSnapshot>,
    engine: Arc<dyn TemplateEngine>,
    writer: &dyn OutputWriter,
    workers: usize,
) -> Result<RenderStats, RenderError> {
    let config = RenderConfig {
        workers,
        ..RenderConfig::default()
    };
    Renderer::new(config).render(snapshot, engine, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_snapshot;
    use crate::content::{ContentTree, PageSource, SectionSource};
    use crate::template::{HandlebarsEngine, TemplateError};
    use crate::writer::{FsWriter, MemoryWriter, WriteError};
    use serde_json::Value;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Root with A (weight 1) and B (weight 2); subsection S with C.
    fn scenario() -> Arc<SiteSnapshot> {
        let mut tree = ContentTree::new(SectionSource::new("", "Home", "/"));
        let root = tree.root();
        tree.add_page(root, PageSource::new("a.md", "A", "/a/").with_weight(1));
        tree.add_page(root, PageSource::new("b.md", "B", "/b/").with_weight(2));
        let s = tree.add_section(root, SectionSource::new("s", "S", "/s/"));
        tree.add_page(s, PageSource::new("s/c.md", "C", "/s/c/"));
        Arc::new(build_snapshot(&tree).unwrap())
    }

    /// Renders `title|section title`; fails on `B`, panics on `P`.
    #[derive(Default)]
    struct FakeEngine {
        order: Mutex<Vec<String>>,
        cancel_on_render: Option<CancelToken>,
    }

    impl TemplateEngine for FakeEngine {
        fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
            let title = context["page"]["title"].as_str().unwrap_or_default().to_owned();
            self.order.lock().push(title.clone());
            if let Some(token) = &self.cancel_on_render {
                token.cancel();
            }
            match title.as_str() {
                "B" => Err(TemplateError::Render {
                    template: template.to_owned(),
                    message: "boom".into(),
                }),
                "P" => panic!("engine exploded"),
                _ => Ok(format!("{}|{}", title, context["section"]["title"].as_str().unwrap_or_default())),
            }
        }

        fn warm(&self, _: &str) -> Result<(), TemplateError> {
            Ok(())
        }
    }

    fn config(workers: usize) -> RenderConfig {
        RenderConfig {
            workers,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_failure_isolation() {
        let writer = MemoryWriter::new();
        let stats = Renderer::new(config(2))
            .render(scenario(), Arc::new(FakeEngine::default()), &writer)
            .unwrap();

        assert_eq!(stats.rendered, 2);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.waves, 2);
        assert_eq!(stats.failed_paths().collect::<Vec<_>>(), vec![Path::new("b.md")]);
        assert!(matches!(stats.failure_for(Path::new("b.md")), Some(RenderFailure::Template(_))));
        assert!(!stats.is_success());

        assert_eq!(writer.get(Path::new("a/index.html")).as_deref(), Some("A|Home"));
        assert_eq!(writer.get(Path::new("s/c/index.html")).as_deref(), Some("C|S"));
        assert!(writer.get(Path::new("b/index.html")).is_none());
        assert!(writer.is_closed());
    }

    #[test]
    fn test_waves_are_barriers() {
        let engine = Arc::new(FakeEngine::default());
        let writer = MemoryWriter::new();
        render_all(scenario(), engine.clone(), &writer, 4).unwrap();

        let order = engine.order.lock().clone();
        assert_eq!(order.len(), 3);
        assert_eq!(order[2], "C");
    }

    #[test]
    fn test_panic_is_recorded_as_failure() {
        let mut tree = ContentTree::new(SectionSource::new("", "Home", "/"));
        let root = tree.root();
        tree.add_page(root, PageSource::new("p.md", "P", "/p/"));
        tree.add_page(root, PageSource::new("q.md", "Q", "/q/"));
        let snapshot = Arc::new(build_snapshot(&tree).unwrap());

        let writer = MemoryWriter::new();
        let stats = render_all(snapshot, Arc::new(FakeEngine::default()), &writer, 2).unwrap();

        assert_eq!(stats.rendered, 1);
        match stats.failure_for(Path::new("p.md")) {
            Some(RenderFailure::Panic(message)) => assert!(message.contains("engine exploded")),
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(writer.get(Path::new("q/index.html")).as_deref(), Some("Q|Home"));
    }

    #[test]
    fn test_cancel_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let renderer = Renderer::new(config(2)).with_cancel(token);
        let writer = MemoryWriter::new();
        let stats = renderer
            .render(scenario(), Arc::new(FakeEngine::default()), &writer)
            .unwrap();

        assert!(stats.cancelled);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.rendered, 0);
        assert_eq!(stats.waves, 0);
        assert!(writer.is_empty());
        assert!(writer.is_closed());
        assert_eq!(renderer.phase(), Phase::Done);
    }

    #[test]
    fn test_cancel_stops_further_waves() {
        let token = CancelToken::new();
        let engine = Arc::new(FakeEngine {
            cancel_on_render: Some(token.clone()),
            ..FakeEngine::default()
        });
        let writer = MemoryWriter::new();
        let stats = Renderer::new(config(1))
            .with_cancel(token)
            .render(scenario(), engine.clone(), &writer)
            .unwrap();

        assert!(stats.cancelled);
        assert!(!engine.order.lock().contains(&"C".to_owned()));
        assert!(writer.get(Path::new("s/c/index.html")).is_none());
        assert_eq!(stats.rendered + stats.failed.len() + stats.skipped, 3);
    }

    struct RejectingWriter {
        inner: MemoryWriter,
        reject: PathBuf,
    }

    impl OutputWriter for RejectingWriter {
        fn enqueue(&self, path: PathBuf, html: String) -> Result<(), WriteError> {
            if path == self.reject {
                return Err(WriteError::Io(path, std::io::Error::other("disk full")));
            }
            self.inner.enqueue(path, html)
        }

        fn flush_and_close(&self) -> Result<usize, WriteError> {
            self.inner.flush_and_close()
        }
    }

    #[test]
    fn test_enqueue_failure_counts_against_page() {
        let writer = RejectingWriter {
            inner: MemoryWriter::new(),
            reject: PathBuf::from("s/c/index.html"),
        };
        let stats = render_all(scenario(), Arc::new(FakeEngine::default()), &writer, 2).unwrap();

        assert!(matches!(stats.failure_for(Path::new("s/c.md")), Some(RenderFailure::Write(_))));
        assert_eq!(stats.rendered, 1);
        assert_eq!(stats.written, 1);
    }

    /// Accepts everything, then reports one page as lost on flush.
    struct LossyWriter {
        inner: MemoryWriter,
    }

    impl OutputWriter for LossyWriter {
        fn enqueue(&self, path: PathBuf, html: String) -> Result<(), WriteError> {
            self.inner.enqueue(path, html)
        }

        fn flush_and_close(&self) -> Result<usize, WriteError> {
            let received = self.inner.flush_and_close()?;
            Err(WriteError::Incomplete {
                written: received - 1,
                failed: vec![PathBuf::from("s/c/index.html")],
            })
        }
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let mut tree = ContentTree::new(SectionSource::new("", "Home", "/"));
        let root = tree.root();
        tree.add_page(root, PageSource::new("a.md", "A", "/a/"));
        let s = tree.add_section(root, SectionSource::new("s", "S", "/s/"));
        tree.add_page(s, PageSource::new("s/c.md", "C", "/s/c/"));
        let snapshot = Arc::new(build_snapshot(&tree).unwrap());

        let writer = LossyWriter { inner: MemoryWriter::new() };
        let stats = render_all(snapshot, Arc::new(FakeEngine::default()), &writer, 2).unwrap();

        assert_eq!(stats.rendered, 2);
        assert!(stats.failed.is_empty());
        assert_eq!(stats.written, 1);
        match &stats.writer_error {
            Some(WriteError::Incomplete { failed, .. }) => {
                assert_eq!(failed, &vec![PathBuf::from("s/c/index.html")]);
            }
            other => panic!("unexpected writer error: {other:?}"),
        }
        assert!(!stats.is_success());
        assert_eq!(stats.waves, 2);
    }

    #[test]
    fn test_end_to_end_with_handlebars_and_files() {
        let templates = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(
            templates.path().join("page.hbs"),
            "{{> nav}}<h1>{{page.title}}</h1>{{#if page.next}}<a href=\"{{page.next.href}}\">next</a>{{/if}}",
        )
        .unwrap();
        fs::write(templates.path().join("nav.hbs"), "<nav>{{section.title}}</nav>").unwrap();

        let config = RenderConfig {
            workers: 2,
            templates: templates.path().to_path_buf(),
            output: output.path().to_path_buf(),
            ..RenderConfig::default()
        };
        let engine = Arc::new(HandlebarsEngine::from_config(&config));
        let writer = FsWriter::from_config(&config).unwrap();
        let stats = Renderer::new(config).render(scenario(), engine, &writer).unwrap();

        assert!(stats.is_success(), "{:?}", stats.failed);
        assert_eq!(stats.written, 3);
        let a = fs::read_to_string(output.path().join("a/index.html")).unwrap();
        assert_eq!(a, "<nav>Home</nav><h1>A</h1><a href=\"/b/\">next</a>");
        let c = fs::read_to_string(output.path().join("s/c/index.html")).unwrap();
        assert_eq!(c, "<nav>S</nav><h1>C</h1>");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::default(), Phase::NotStarted);
        assert_eq!(Phase::Draining.to_string(), "draining");
    }
}
