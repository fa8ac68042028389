//! Immutable, thread-safe snapshot of a site.
//!
//! A [`SiteSnapshot`] is produced once per build by
//! [`build_snapshot`](crate::build_snapshot) and then shared through an
//! `Arc` by the wave scheduler and the scout thread. Nothing in this module
//! exposes `&mut` access: every field is private and read through accessors,
//! so readers on any number of threads need no lock.
//!
//! # Arena Layout
//!
//! Cross-references are typed indices into the site arena rather than
//! pointers, which lets cyclic relationships (page ↔ section, prev ↔ next)
//! live in immutable data:
//!
//! ```text
//! SiteSnapshot
//! ├── pages:    [PageSnapshot]      ◄── PageId
//! │               ├── section ──────────────┐
//! │               └── prev / next ──► PageId │
//! └── sections: [SectionSnapshot]   ◄── SectionId
//!                 ├── parent / root ──► SectionId
//!                 └── sorted_pages ──► [PageId]
//! ```

mod menu;
mod page;
mod section;
mod site;

pub use menu::MenuItem;
pub use page::PageSnapshot;
pub use section::SectionSnapshot;
pub use site::{ScoutHint, SiteSnapshot, Taxonomies, Wave};

pub(crate) use page::metadata_terms;
pub(crate) use section::SectionDraft;
pub(crate) use site::SiteParts;

/// Index of a page in [`SiteSnapshot::pages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(usize);

/// Index of a section in [`SiteSnapshot::sections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(usize);

impl PageId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl SectionId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(SiteSnapshot: Send, Sync);
    static_assertions::assert_impl_all!(PageSnapshot: Send, Sync);
    static_assertions::assert_impl_all!(SectionSnapshot: Send, Sync);
    static_assertions::assert_impl_all!(MenuItem: Send, Sync);
    static_assertions::assert_impl_all!(ScoutHint: Send, Sync);

    #[test]
    fn test_ids_round_trip_index() {
        assert_eq!(PageId::new(7).index(), 7);
        assert_eq!(SectionId::new(3).index(), 3);
        assert!(PageId::new(1) < PageId::new(2));
    }
}
