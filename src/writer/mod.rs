//! Output writer boundary.
//!
//! Workers hand each rendered page to an [`OutputWriter`] as soon as it is
//! produced. Writers own their queue, so `enqueue` must be callable from
//! any number of threads at once.

mod fs;
mod memory;

pub use fs::FsWriter;
pub use memory::MemoryWriter;

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("writer is closed")]
    Closed,

    #[error("`{}` is not a relative path inside the output root", .0.display())]
    OutsideRoot(PathBuf),

    #[error("failed to write `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("{} of {} files failed to write", failed.len(), failed.len() + written)]
    Incomplete { written: usize, failed: Vec<PathBuf> },

    #[error("writer thread panicked")]
    Panicked,
}

/// Destination for rendered pages.
pub trait OutputWriter: Send + Sync {
    /// Queue `html` for `path`, relative to the writer's output root.
    ///
    /// May block while the queue is full.
    fn enqueue(&self, path: PathBuf, html: String) -> Result<(), WriteError>;

    /// Wait for every queued page to land, then refuse further pages.
    ///
    /// Returns the number of pages written.
    fn flush_and_close(&self) -> Result<usize, WriteError>;
}

/// True when `path` names a file below the output root: relative, non-empty,
/// and free of `..` segments.
pub fn stays_in_root(path: &Path) -> bool {
    let mut named = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    named
}

/// Minify a rendered page, keeping tags browsers need for partial documents.
pub fn minify(html: &str) -> Cow<'_, str> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;

    match String::from_utf8(minify_html::minify(html.as_bytes(), &cfg)) {
        Ok(minified) => Cow::Owned(minified),
        Err(_) => Cow::Borrowed(html),
    }
}
