//! Pass 6: menus and taxonomy term lists.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use super::BuildError;
use crate::content::{MenuEntry, PageKey, SectionKey};
use crate::snapshot::{MenuItem, PageId, PageSnapshot, SectionId, SectionSnapshot, Taxonomies, metadata_terms};

/// Lookup tables shared by menu resolution.
pub(super) struct Targets<'a> {
    pub pages: &'a [PageSnapshot],
    pub sections: &'a [SectionSnapshot],
    pub page_ids: &'a FxHashMap<PageKey, PageId>,
    pub section_ids: &'a FxHashMap<SectionKey, SectionId>,
}

pub(super) fn snapshot_menus(
    menus: &BTreeMap<String, Vec<MenuEntry>>,
    targets: &Targets<'_>,
) -> Result<BTreeMap<String, Vec<MenuItem>>, BuildError> {
    menus
        .iter()
        .map(|(name, entries)| Ok((name.clone(), snapshot_entries(name, entries, targets)?)))
        .collect()
}

fn snapshot_entries(menu: &str, entries: &[MenuEntry], targets: &Targets<'_>) -> Result<Vec<MenuItem>, BuildError> {
    let mut items = entries
        .iter()
        .map(|entry| snapshot_entry(menu, entry, targets))
        .collect::<Result<Vec<_>, _>>()?;
    items.sort_by(|a, b| a.weight().cmp(&b.weight()).then_with(|| a.title().cmp(b.title())));
    Ok(items)
}

fn snapshot_entry(menu: &str, entry: &MenuEntry, targets: &Targets<'_>) -> Result<MenuItem, BuildError> {
    let unknown = || BuildError::UnknownMenuTarget {
        menu: menu.to_owned(),
        title: entry.title.clone(),
    };
    let page = entry
        .page
        .map(|key| targets.page_ids.get(&key).copied().ok_or_else(unknown))
        .transpose()?;
    let section = entry
        .section
        .map(|key| targets.section_ids.get(&key).copied().ok_or_else(unknown))
        .transpose()?;

    let href = entry
        .href
        .clone()
        .or_else(|| page.map(|id| targets.pages[id.index()].href().to_owned()))
        .or_else(|| section.map(|id| targets.sections[id.index()].href().to_owned()))
        .unwrap_or_default();

    Ok(MenuItem::new(
        entry.title.clone(),
        href,
        entry.weight,
        snapshot_entries(menu, &entry.children, targets)?,
        page,
        section,
    ))
}

/// Group non-draft pages by each configured taxonomy kind and term.
pub(super) fn snapshot_taxonomies(kinds: &[String], pages: &[PageSnapshot]) -> Taxonomies {
    let mut taxonomies = Taxonomies::new();

    for kind in kinds {
        let mut terms: BTreeMap<String, Vec<PageId>> = BTreeMap::new();
        for page in pages.iter().filter(|page| !page.is_draft()) {
            let unique: BTreeSet<String> = metadata_terms(page.metadata(), kind).into_iter().collect();
            for term in unique {
                terms.entry(term).or_default().push(page.id());
            }
        }

        let terms = terms
            .into_iter()
            .map(|(term, mut ids)| {
                ids.sort_by(|a, b| compare_by_date(&pages[a.index()], &pages[b.index()]));
                (term, ids.into_boxed_slice())
            })
            .collect();
        taxonomies.insert(kind.clone(), terms);
    }

    taxonomies
}

/// Dated pages first, newest first; then by title.
fn compare_by_date(a: &PageSnapshot, b: &PageSnapshot) -> Ordering {
    match (a.date(), b.date()) {
        (Some(da), Some(db)) => db.cmp(da).then_with(|| a.title().cmp(b.title())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title().cmp(b.title()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PageSource;
    use serde_json::json;

    fn page(i: usize, source: PageSource) -> PageSnapshot {
        PageSnapshot::from_source(PageId::new(i), &source)
    }

    #[test]
    fn test_compare_by_date() {
        let old = page(0, PageSource::new("a.md", "A", "/a/").with_meta("date", "2024-01-01"));
        let new = page(1, PageSource::new("b.md", "B", "/b/").with_meta("date", "2025-06-01"));
        let undated = page(2, PageSource::new("c.md", "C", "/c/"));

        assert_eq!(compare_by_date(&new, &old), Ordering::Less);
        assert_eq!(compare_by_date(&old, &undated), Ordering::Less);
        assert_eq!(compare_by_date(&undated, &new), Ordering::Greater);
    }

    #[test]
    fn test_taxonomies_skip_drafts_and_sort() {
        let pages = vec![
            page(0, PageSource::new("a.md", "A", "/a/").with_meta("tags", json!(["rust", "ssg"])).with_meta("date", "2024-01-01")),
            page(1, PageSource::new("b.md", "B", "/b/").with_meta("tags", "rust").with_meta("date", "2025-01-01")),
            page(2, PageSource::new("c.md", "C", "/c/").with_meta("tags", "rust").with_meta("draft", true)),
            page(3, PageSource::new("d.md", "D", "/d/").with_meta("tags", json!(["ssg", "ssg"]))),
        ];
        let kinds = vec!["tags".to_owned(), "series".to_owned()];
        let taxonomies = snapshot_taxonomies(&kinds, &pages);

        let tags = &taxonomies["tags"];
        assert_eq!(&*tags["rust"], &[PageId::new(1), PageId::new(0)]);
        assert_eq!(&*tags["ssg"], &[PageId::new(0), PageId::new(3)]);
        assert!(taxonomies["series"].is_empty());
    }
}
