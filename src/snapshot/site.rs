//! The whole-build snapshot and its precomputed scheduling structures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};

use super::{MenuItem, PageId, PageSnapshot, SectionId, SectionSnapshot};

/// A batch of pages from one section, rendered between two barriers.
pub type Wave = Box<[PageId]>;

/// Taxonomy kind → term → pages carrying the term.
pub type Taxonomies = BTreeMap<String, BTreeMap<String, Box<[PageId]>>>;

/// Instruction for the scout: which template and partials to warm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutHint {
    template: String,
    partials: Box<[String]>,
    pages_using: usize,
    priority: usize,
    first_wave: usize,
}

impl ScoutHint {
    pub(crate) fn new(template: String, partials: Vec<String>, pages_using: usize, first_wave: usize) -> Self {
        Self {
            template,
            partials: partials.into_boxed_slice(),
            pages_using,
            priority: pages_using,
            first_wave,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Transitively included partials, in discovery order.
    pub fn partials(&self) -> &[String] {
        &self.partials
    }

    pub const fn pages_using(&self) -> usize {
        self.pages_using
    }

    /// Warm-up priority; equal to [`pages_using`](Self::pages_using).
    pub const fn priority(&self) -> usize {
        self.priority
    }

    /// Index of the first wave that renders this template.
    pub const fn first_wave(&self) -> usize {
        self.first_wave
    }
}

/// Everything the builder computed, handed over in one move.
pub(crate) struct SiteParts {
    pub pages: Vec<PageSnapshot>,
    pub sections: Vec<SectionSnapshot>,
    pub root: SectionId,
    pub config: Map<String, Value>,
    pub params: Map<String, Value>,
    pub data: Map<String, Value>,
    pub menus: BTreeMap<String, Vec<MenuItem>>,
    pub taxonomies: Taxonomies,
    pub topological_order: Vec<Wave>,
    pub template_groups: BTreeMap<String, Vec<PageId>>,
    pub attention_order: Vec<PageId>,
    pub scout_hints: Vec<ScoutHint>,
}

impl SiteParts {
    pub fn freeze(self) -> SiteSnapshot {
        let by_source = self
            .pages
            .iter()
            .map(|page| (page.source_path().to_path_buf(), page.id()))
            .collect();
        let by_href = self
            .pages
            .iter()
            .map(|page| (page.href().to_owned(), page.id()))
            .collect();
        // Same rule as a section's own regular pages
        let section_indexes: FxHashSet<PageId> = self
            .sections
            .iter()
            .filter_map(SectionSnapshot::index_page)
            .collect();
        let regular_pages = self
            .pages
            .iter()
            .filter(|page| !page.is_index() && !section_indexes.contains(&page.id()))
            .map(PageSnapshot::id)
            .collect();

        SiteSnapshot {
            pages: self.pages.into_boxed_slice(),
            regular_pages,
            sections: self.sections.into_boxed_slice(),
            root: self.root,
            config: self.config,
            params: self.params,
            data: self.data,
            menus: self
                .menus
                .into_iter()
                .map(|(name, items)| (name, items.into_boxed_slice()))
                .collect(),
            taxonomies: self.taxonomies,
            topological_order: self.topological_order.into_boxed_slice(),
            template_groups: self
                .template_groups
                .into_iter()
                .map(|(name, pages)| (name, pages.into_boxed_slice()))
                .collect(),
            attention_order: self.attention_order.into_boxed_slice(),
            scout_hints: self.scout_hints.into_boxed_slice(),
            by_source,
            by_href,
        }
    }
}

/// The frozen site: built once per build, shared read-only by all threads.
#[derive(Debug)]
pub struct SiteSnapshot {
    pages: Box<[PageSnapshot]>,
    regular_pages: Box<[PageId]>,
    sections: Box<[SectionSnapshot]>,
    root: SectionId,

    config: Map<String, Value>,
    params: Map<String, Value>,
    data: Map<String, Value>,

    menus: BTreeMap<String, Box<[MenuItem]>>,
    taxonomies: Taxonomies,

    topological_order: Box<[Wave]>,
    template_groups: BTreeMap<String, Box<[PageId]>>,
    attention_order: Box<[PageId]>,
    scout_hints: Box<[ScoutHint]>,

    by_source: FxHashMap<PathBuf, PageId>,
    by_href: FxHashMap<String, PageId>,
}

impl SiteSnapshot {
    pub fn pages(&self) -> &[PageSnapshot] {
        &self.pages
    }

    /// Pages that are not section index pages.
    pub fn regular_pages(&self) -> &[PageId] {
        &self.regular_pages
    }

    pub fn sections(&self) -> &[SectionSnapshot] {
        &self.sections
    }

    /// Panics if `id` did not come from this snapshot.
    pub fn page(&self, id: PageId) -> &PageSnapshot {
        &self.pages[id.index()]
    }

    /// Panics if `id` did not come from this snapshot.
    pub fn section(&self, id: SectionId) -> &SectionSnapshot {
        &self.sections[id.index()]
    }

    pub fn root_section(&self) -> &SectionSnapshot {
        self.section(self.root)
    }

    /// The page's section, or the shared sentinel for pages without one.
    pub fn section_of(&self, page: &PageSnapshot) -> &SectionSnapshot {
        match page.section() {
            Some(id) => self.section(id),
            None => SectionSnapshot::sentinel(),
        }
    }

    pub fn page_by_source(&self, path: &Path) -> Option<&PageSnapshot> {
        self.by_source.get(path).map(|&id| self.page(id))
    }

    pub fn page_by_href(&self, href: &str) -> Option<&PageSnapshot> {
        self.by_href.get(href).map(|&id| self.page(id))
    }

    pub const fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Externally loaded structured data.
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub const fn menus(&self) -> &BTreeMap<String, Box<[MenuItem]>> {
        &self.menus
    }

    pub fn menu(&self, name: &str) -> &[MenuItem] {
        self.menus.get(name).map_or(&[][..], |items| &items[..])
    }

    pub const fn taxonomies(&self) -> &Taxonomies {
        &self.taxonomies
    }

    /// Pages carrying `term` in taxonomy `kind`, newest first.
    pub fn taxonomy_pages(&self, kind: &str, term: &str) -> &[PageId] {
        self.taxonomies
            .get(kind)
            .and_then(|terms| terms.get(term))
            .map_or(&[][..], |pages| &pages[..])
    }

    /// Rendering waves in breadth-first section order.
    pub fn topological_order(&self) -> &[Wave] {
        &self.topological_order
    }

    pub const fn template_groups(&self) -> &BTreeMap<String, Box<[PageId]>> {
        &self.template_groups
    }

    /// All pages by descending attention score.
    pub fn attention_order(&self) -> &[PageId] {
        &self.attention_order
    }

    /// Warm-up hints, most reused template first.
    pub fn scout_hints(&self) -> &[ScoutHint] {
        &self.scout_hints
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
