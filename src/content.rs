//! Mutable content tree consumed by the snapshot builder.
//!
//! Content discovery fills a [`ContentTree`]: an arena of pages and sections
//! addressed by [`PageKey`] and [`SectionKey`]. Keys are the identity of a
//! source object; the builder uses them to resolve back-references without
//! re-walking the tree.
//!
//! # Structure
//!
//! ```text
//! ContentTree
//! ├── sections: Vec<SectionSource>   (root is always SectionKey(0))
//! │     ├── pages: Vec<PageKey>
//! │     ├── subsections: Vec<SectionKey>
//! │     └── index_page: Option<PageKey>
//! ├── pages: Vec<PageSource>
//! │     └── section: Option<SectionKey>  (declared owner)
//! ├── menus: name → Vec<MenuEntry>
//! └── config / params / data           (site-wide JSON maps)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Identity of a page inside a [`ContentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey(pub(crate) usize);

/// Identity of a section inside a [`ContentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey(pub(crate) usize);

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1 = `h1`)
    pub level: u8,
    /// Anchor id
    pub id: String,
    pub title: String,
}

// ============================================================================
// Pages
// ============================================================================

/// A page as discovered from the content directory.
#[derive(Debug, Clone, Default)]
pub struct PageSource {
    pub source_path: PathBuf,
    pub title: String,
    /// Logical URL path, e.g. `/posts/hello/`
    pub href: String,
    /// Explicit output path relative to the output root.
    pub output_path: Option<PathBuf>,
    /// Explicit template name; overrides metadata `template`.
    pub template: Option<String>,
    /// Pre-parsed HTML body.
    pub content: String,
    pub toc_html: String,
    pub toc: Vec<TocEntry>,
    pub excerpt: Option<String>,
    pub metadata: Map<String, Value>,
    /// Declared sort weight (lower sorts first).
    pub weight: i64,
    pub word_count: Option<usize>,
    pub reading_time: Option<usize>,
    /// Declared owning section.
    pub section: Option<SectionKey>,
}

impl PageSource {
    pub fn new(source_path: impl Into<PathBuf>, title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            title: title.into(),
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_content(mut self, html: impl Into<String>) -> Self {
        self.content = html.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Sections
// ============================================================================

/// A grouping node: a content directory or a virtual section.
#[derive(Debug, Clone, Default)]
pub struct SectionSource {
    pub name: String,
    pub title: String,
    pub nav_title: Option<String>,
    pub href: String,
    /// Backing directory; `None` for virtual sections.
    pub source_path: Option<PathBuf>,
    pub icon: Option<String>,
    pub weight: i64,
    pub metadata: Map<String, Value>,
    pub pages: Vec<PageKey>,
    pub subsections: Vec<SectionKey>,
    pub index_page: Option<PageKey>,
}

impl SectionSource {
    pub fn new(name: impl Into<String>, title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    /// Human-readable identity used in error messages.
    pub(crate) fn label(&self) -> PathBuf {
        self.source_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.href))
    }
}

// ============================================================================
// Menus
// ============================================================================

/// A menu entry as declared in site configuration or page front matter.
#[derive(Debug, Clone, Default)]
pub struct MenuEntry {
    pub title: String,
    /// Explicit link; falls back to the referenced page or section href.
    pub href: Option<String>,
    pub weight: i64,
    pub children: Vec<MenuEntry>,
    pub page: Option<PageKey>,
    pub section: Option<SectionKey>,
}

impl MenuEntry {
    pub fn link(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: Some(href.into()),
            ..Self::default()
        }
    }

    pub fn page(title: impl Into<String>, page: PageKey) -> Self {
        Self {
            title: title.into(),
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn section(title: impl Into<String>, section: SectionKey) -> Self {
        Self {
            title: title.into(),
            section: Some(section),
            ..Self::default()
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Taxonomy kinds collected when none are configured.
pub const DEFAULT_TAXONOMIES: &[&str] = &["tags", "categories"];

/// The mutable content tree for one build.
#[derive(Debug, Clone)]
pub struct ContentTree {
    pages: Vec<PageSource>,
    sections: Vec<SectionSource>,
    pub config: Map<String, Value>,
    pub params: Map<String, Value>,
    /// Externally loaded structured data (`data/*.json` and friends).
    pub data: Map<String, Value>,
    pub menus: BTreeMap<String, Vec<MenuEntry>>,
    /// Metadata keys that define taxonomies.
    pub taxonomies: Vec<String>,
}

impl ContentTree {
    /// Create a tree whose root section is `root`.
    pub fn new(root: SectionSource) -> Self {
        Self {
            pages: Vec::new(),
            sections: vec![root],
            config: Map::new(),
            params: Map::new(),
            data: Map::new(),
            menus: BTreeMap::new(),
            taxonomies: DEFAULT_TAXONOMIES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    pub const fn root(&self) -> SectionKey {
        SectionKey(0)
    }

    /// Add `section` as a child of `parent`.
    pub fn add_section(&mut self, parent: SectionKey, section: SectionSource) -> SectionKey {
        let key = SectionKey(self.sections.len());
        self.sections.push(section);
        self.link_subsection(parent, key);
        key
    }

    /// Add an extra parent → child edge between existing sections.
    ///
    /// Linking an ancestor under one of its descendants produces a cycle,
    /// which the snapshot builder rejects.
    pub fn link_subsection(&mut self, parent: SectionKey, child: SectionKey) {
        if let Some(section) = self.sections.get_mut(parent.0) {
            section.subsections.push(child);
        }
    }

    /// Add `page` to `section`, declaring the section as its owner.
    pub fn add_page(&mut self, section: SectionKey, mut page: PageSource) -> PageKey {
        let key = PageKey(self.pages.len());
        page.section = Some(section);
        self.pages.push(page);
        if let Some(parent) = self.sections.get_mut(section.0) {
            parent.pages.push(key);
        }
        key
    }

    /// Add a page that belongs to no section.
    pub fn add_orphan_page(&mut self, mut page: PageSource) -> PageKey {
        let key = PageKey(self.pages.len());
        page.section = None;
        self.pages.push(page);
        key
    }

    pub fn page(&self, key: PageKey) -> Option<&PageSource> {
        self.pages.get(key.0)
    }

    pub fn page_mut(&mut self, key: PageKey) -> Option<&mut PageSource> {
        self.pages.get_mut(key.0)
    }

    pub fn section(&self, key: SectionKey) -> Option<&SectionSource> {
        self.sections.get(key.0)
    }

    pub fn section_mut(&mut self, key: SectionKey) -> Option<&mut SectionSource> {
        self.sections.get_mut(key.0)
    }

    /// All pages with their keys, in insertion order.
    pub fn pages(&self) -> impl ExactSizeIterator<Item = (PageKey, &PageSource)> {
        self.pages.iter().enumerate().map(|(i, p)| (PageKey(i), p))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}
