//! Section snapshots.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde_json::{Map, Value};

use super::{PageId, SectionId};

/// Shared "no section" value: always truthy, every collection empty.
static SENTINEL: LazyLock<SectionSnapshot> = LazyLock::new(|| {
    SectionDraft {
        id: None,
        ..SectionDraft::default()
    }
    .freeze()
});

/// One grouping node, frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSnapshot {
    id: Option<SectionId>,
    name: String,
    title: String,
    nav_title: String,
    href: String,
    source_path: Option<PathBuf>,
    metadata: Map<String, Value>,

    pages: Box<[PageId]>,
    sorted_pages: Box<[PageId]>,
    regular_pages: Box<[PageId]>,
    subsections: Box<[SectionId]>,
    sorted_subsections: Box<[SectionId]>,

    parent: Option<SectionId>,
    root: Option<SectionId>,
    index_page: Option<PageId>,

    icon: Option<String>,
    weight: i64,
    depth: usize,
    hierarchy: String,
    dominant_template: Option<String>,
    total_pages: usize,
}

/// Mutable staging record the builder fills before freezing.
#[derive(Debug, Default)]
pub(crate) struct SectionDraft {
    pub id: Option<SectionId>,
    pub name: String,
    pub title: String,
    pub nav_title: Option<String>,
    pub href: String,
    pub source_path: Option<PathBuf>,
    pub metadata: Map<String, Value>,
    pub pages: Vec<PageId>,
    pub sorted_pages: Vec<PageId>,
    pub regular_pages: Vec<PageId>,
    pub subsections: Vec<SectionId>,
    pub sorted_subsections: Vec<SectionId>,
    pub parent: Option<SectionId>,
    pub root: Option<SectionId>,
    pub index_page: Option<PageId>,
    pub icon: Option<String>,
    pub weight: i64,
    pub depth: usize,
    pub hierarchy: String,
    pub dominant_template: Option<String>,
    pub total_pages: usize,
}

impl SectionDraft {
    pub fn freeze(self) -> SectionSnapshot {
        let nav_title = self.nav_title.unwrap_or_else(|| self.title.clone());
        SectionSnapshot {
            id: self.id,
            name: self.name,
            title: self.title,
            nav_title,
            href: self.href,
            source_path: self.source_path,
            metadata: self.metadata,
            pages: self.pages.into_boxed_slice(),
            sorted_pages: self.sorted_pages.into_boxed_slice(),
            regular_pages: self.regular_pages.into_boxed_slice(),
            subsections: self.subsections.into_boxed_slice(),
            sorted_subsections: self.sorted_subsections.into_boxed_slice(),
            parent: self.parent,
            root: self.root,
            index_page: self.index_page,
            icon: self.icon,
            weight: self.weight,
            depth: self.depth,
            hierarchy: self.hierarchy,
            dominant_template: self.dominant_template,
            total_pages: self.total_pages,
        }
    }
}

impl SectionSnapshot {
    /// The reserved "no section" value.
    ///
    /// Pages without a section resolve to this instead of `None`, so
    /// template code can test and iterate without null checks.
    pub fn sentinel() -> &'static SectionSnapshot {
        &SENTINEL
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_none()
    }

    /// Always `true`, including for the sentinel.
    pub const fn is_truthy(&self) -> bool {
        true
    }

    /// `None` only for the sentinel.
    pub const fn id(&self) -> Option<SectionId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn nav_title(&self) -> &str {
        &self.nav_title
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Alias of [`metadata`](Self::metadata) for template parity.
    pub const fn params(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Direct pages in declared order.
    pub fn pages(&self) -> &[PageId] {
        &self.pages
    }

    /// Direct pages by weight, then title.
    pub fn sorted_pages(&self) -> &[PageId] {
        &self.sorted_pages
    }

    /// Sorted pages without index pages.
    pub fn regular_pages(&self) -> &[PageId] {
        &self.regular_pages
    }

    pub fn subsections(&self) -> &[SectionId] {
        &self.subsections
    }

    pub fn sorted_subsections(&self) -> &[SectionId] {
        &self.sorted_subsections
    }

    pub const fn parent(&self) -> Option<SectionId> {
        self.parent
    }

    pub const fn root(&self) -> Option<SectionId> {
        self.root
    }

    pub const fn index_page(&self) -> Option<PageId> {
        self.index_page
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub const fn weight(&self) -> i64 {
        self.weight
    }

    /// Distance from the root section (root = 0).
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Dotted names from the root, e.g. `docs.guide.install`.
    pub fn hierarchy(&self) -> &str {
        &self.hierarchy
    }

    /// Sections without a backing directory.
    pub const fn is_virtual(&self) -> bool {
        self.source_path.is_none()
    }

    /// Most common template among direct pages.
    pub fn dominant_template(&self) -> Option<&str> {
        self.dominant_template.as_deref()
    }

    /// Pages in this section and every descendant.
    pub const fn total_pages(&self) -> usize {
        self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_truthy_and_empty() {
        let sentinel = SectionSnapshot::sentinel();
        assert!(sentinel.is_truthy());
        assert!(sentinel.is_sentinel());
        assert!(sentinel.pages().is_empty());
        assert!(sentinel.sorted_subsections().is_empty());
        assert_eq!(sentinel.total_pages(), 0);
        assert!(sentinel.parent().is_none());
    }

    #[test]
    fn test_sentinel_is_shared() {
        assert!(std::ptr::eq(SectionSnapshot::sentinel(), SectionSnapshot::sentinel()));
    }

    #[test]
    fn test_nav_title_defaults_to_title() {
        let section = SectionDraft {
            id: Some(SectionId::new(0)),
            title: "Guides".into(),
            ..SectionDraft::default()
        }
        .freeze();
        assert_eq!(section.nav_title(), "Guides");
        assert!(!section.is_sentinel());
        assert!(section.is_virtual());
    }
}
