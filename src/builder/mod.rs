//! Snapshot construction.
//!
//! Turns a mutable [`ContentTree`] into a frozen [`SiteSnapshot`] in six
//! passes. Each pass only reads what earlier passes produced, and pages are
//! replaced by new instances rather than patched:
//!
//! ```text
//! 1. pages        PageSource → PageSnapshot (self-contained fields)
//! 2. sections     depth-first, children before parents, cycle detection
//! 3. back-refs    page.section from section membership
//! 4. navigation   prev / next along each section's sorted pages
//! 5. schedule     waves, template groups, attention order, scout hints
//! 6. listings     menus and taxonomies
//! ```
//!
//! Any structural inconsistency aborts the build with a [`BuildError`]
//! naming the offending source path; a snapshot is all-or-nothing.

mod error;
mod listings;
mod navigation;
mod schedule;
mod sections;

pub use error::BuildError;

use std::path::PathBuf;
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::config::RenderConfig;
use crate::content::{ContentTree, PageKey};
use crate::log;
use crate::snapshot::{PageId, PageSnapshot, SiteParts, SiteSnapshot};
use crate::template::PartialResolver;
use crate::writer::stays_in_root;

/// Build a snapshot with default options.
pub fn build_snapshot(tree: &ContentTree) -> Result<SiteSnapshot, BuildError> {
    SnapshotBuilder::new(tree).build()
}

/// Configurable snapshot construction.
pub struct SnapshotBuilder<'a> {
    tree: &'a ContentTree,
    resolver: Option<&'a dyn PartialResolver>,
    site_wide_navigation: bool,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(tree: &'a ContentTree) -> Self {
        Self {
            tree,
            resolver: None,
            site_wide_navigation: false,
        }
    }

    /// Builder with the snapshot options taken from `[render]`.
    pub fn from_config(tree: &'a ContentTree, config: &RenderConfig) -> Self {
        Self::new(tree).site_wide_navigation(config.site_wide_navigation)
    }

    /// Source of partial dependencies for scout hints.
    ///
    /// Without one, hints carry no partials.
    pub fn partials(mut self, resolver: &'a dyn PartialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Also chain pages that belong to no section with prev / next links.
    pub fn site_wide_navigation(mut self, enabled: bool) -> Self {
        self.site_wide_navigation = enabled;
        self
    }

    pub fn build(self) -> Result<SiteSnapshot, BuildError> {
        let started = Instant::now();
        let tree = self.tree;

        let (pages, page_ids) = snapshot_pages(tree)?;
        let pass = sections::snapshot_sections(tree, &pages, &page_ids)?;
        let pages = navigation::attach_sections(tree, pages, &pass)?;
        let pages = navigation::link_neighbors(pages, &pass.sections, self.site_wide_navigation);
        let schedule = schedule::schedule(&pages, &pass.sections, pass.root, self.resolver);

        let targets = listings::Targets {
            pages: &pages,
            sections: &pass.sections,
            page_ids: &page_ids,
            section_ids: &pass.ids,
        };
        let menus = listings::snapshot_menus(&tree.menus, &targets)?;
        let taxonomies = listings::snapshot_taxonomies(&tree.taxonomies, &pages);

        log!(
            "snapshot";
            "{} pages, {} sections, {} waves, {} templates in {:.1?}",
            pages.len(),
            pass.sections.len(),
            schedule.topological_order.len(),
            schedule.template_groups.len(),
            started.elapsed()
        );

        Ok(SiteParts {
            pages,
            sections: pass.sections,
            root: pass.root,
            config: tree.config.clone(),
            params: tree.params.clone(),
            data: tree.data.clone(),
            menus,
            taxonomies,
            topological_order: schedule.topological_order,
            template_groups: schedule.template_groups,
            attention_order: schedule.attention_order,
            scout_hints: schedule.scout_hints,
        }
        .freeze())
    }
}

/// Pass 1: freeze every page in tree order; `PageId(i)` is the `i`-th page.
fn snapshot_pages(tree: &ContentTree) -> Result<(Vec<PageSnapshot>, FxHashMap<PageKey, PageId>), BuildError> {
    let mut pages = Vec::with_capacity(tree.page_count());
    let mut ids = FxHashMap::default();
    let mut outputs: FxHashMap<PathBuf, PageId> = FxHashMap::default();

    for (index, (key, source)) in tree.pages().enumerate() {
        let id = PageId::new(index);
        let page = PageSnapshot::from_source(id, source);

        if !stays_in_root(page.output_path()) {
            return Err(BuildError::OutputOutsideRoot {
                page: page.source_path().to_path_buf(),
                output: page.output_path().to_path_buf(),
            });
        }
        if let Some(&first) = outputs.get(page.output_path()) {
            let first: &PageSnapshot = &pages[first.index()];
            return Err(BuildError::DuplicateOutput {
                first: first.source_path().to_path_buf(),
                second: page.source_path().to_path_buf(),
                output: page.output_path().to_path_buf(),
            });
        }
        outputs.insert(page.output_path().to_path_buf(), id);

        ids.insert(key, id);
        pages.push(page);
    }

    Ok((pages, ids))
}
