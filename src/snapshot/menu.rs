//! Menu snapshots.

use super::{PageId, SectionId};

/// One menu entry with resolved references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    title: String,
    href: String,
    weight: i64,
    children: Box<[MenuItem]>,
    page: Option<PageId>,
    section: Option<SectionId>,
}

impl MenuItem {
    pub(crate) fn new(
        title: String,
        href: String,
        weight: i64,
        children: Vec<MenuItem>,
        page: Option<PageId>,
        section: Option<SectionId>,
    ) -> Self {
        Self {
            title,
            href,
            weight,
            children: children.into_boxed_slice(),
            page,
            section,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub const fn weight(&self) -> i64 {
        self.weight
    }

    /// Child entries sorted by weight, then title.
    pub fn children(&self) -> &[MenuItem] {
        &self.children
    }

    pub const fn page(&self) -> Option<PageId> {
        self.page
    }

    pub const fn section(&self) -> Option<SectionId> {
        self.section
    }
}
