//! Pass 2: depth-first section snapshots.
//!
//! Children are finished before their parent is frozen, because a parent's
//! `total_pages` and `sorted_subsections` read the finished children.
//! Sections are cached by source identity: a section reached again after it
//! is finished is reused, one reached again while still open is a cycle.

use std::cmp::Ordering;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use super::BuildError;
use crate::content::{ContentTree, PageKey, SectionKey};
use crate::snapshot::{PageId, PageSnapshot, SectionDraft, SectionId, SectionSnapshot};

/// Output of the section pass.
pub(super) struct SectionPass {
    pub sections: Vec<SectionSnapshot>,
    pub ids: FxHashMap<SectionKey, SectionId>,
    /// Which section lists each page.
    pub membership: FxHashMap<PageId, SectionId>,
    pub root: SectionId,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Open,
    Done,
}

struct Walker<'a> {
    tree: &'a ContentTree,
    pages: &'a [PageSnapshot],
    page_ids: &'a FxHashMap<PageKey, PageId>,
    slots: Vec<Option<SectionSnapshot>>,
    /// Every section below each finished section, itself included.
    reach: Vec<FxHashSet<SectionId>>,
    ids: FxHashMap<SectionKey, SectionId>,
    state: FxHashMap<SectionKey, Visit>,
    membership: FxHashMap<PageId, SectionId>,
}

/// Position of the section being visited.
struct Parent<'p> {
    id: Option<SectionId>,
    root: Option<SectionId>,
    depth: usize,
    hierarchy: &'p str,
    label: &'p Path,
}

pub(super) fn snapshot_sections(
    tree: &ContentTree,
    pages: &[PageSnapshot],
    page_ids: &FxHashMap<PageKey, PageId>,
) -> Result<SectionPass, BuildError> {
    let mut walker = Walker {
        tree,
        pages,
        page_ids,
        slots: Vec::with_capacity(tree.section_count()),
        reach: Vec::with_capacity(tree.section_count()),
        ids: FxHashMap::default(),
        state: FxHashMap::default(),
        membership: FxHashMap::default(),
    };

    let top = Parent {
        id: None,
        root: None,
        depth: 0,
        hierarchy: "",
        label: Path::new("/"),
    };
    let root = walker.visit(tree.root(), &top)?;

    let root_label = tree.section(tree.root()).map(|s| s.label()).unwrap_or_default();
    let sections = walker
        .slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(BuildError::Cycle(root_label))?;

    Ok(SectionPass {
        sections,
        ids: walker.ids,
        membership: walker.membership,
        root,
    })
}

impl Walker<'_> {
    fn visit(&mut self, key: SectionKey, parent: &Parent<'_>) -> Result<SectionId, BuildError> {
        let tree = self.tree;
        let source = tree.section(key).ok_or_else(|| BuildError::UnknownSection {
            referrer: parent.label.to_path_buf(),
            index: key.0,
        })?;
        let label = source.label();

        match self.state.get(&key) {
            Some(Visit::Open) => return Err(BuildError::Cycle(label)),
            Some(Visit::Done) => {
                if let Some(&id) = self.ids.get(&key) {
                    return Ok(id);
                }
            }
            None => {}
        }

        let id = SectionId::new(self.slots.len());
        self.slots.push(None);
        self.reach.push(FxHashSet::default());
        self.ids.insert(key, id);
        self.state.insert(key, Visit::Open);

        // Direct pages, claimed by this section
        let mut pages = Vec::with_capacity(source.pages.len());
        for &page_key in &source.pages {
            let page_id = self.lookup_page(page_key, &label)?;
            match self.membership.get(&page_id) {
                Some(&owner) if owner != id => {
                    return Err(BuildError::SectionMismatch {
                        page: self.pages[page_id.index()].source_path().to_path_buf(),
                        detail: "listed by more than one section".into(),
                    });
                }
                Some(_) => continue,
                None => {
                    self.membership.insert(page_id, id);
                    pages.push(page_id);
                }
            }
        }

        let sorted_pages = sort_pages(&pages, self.pages);
        let index_page = match source.index_page {
            Some(page_key) => {
                let page_id = self.lookup_page(page_key, &label)?;
                if !pages.contains(&page_id) {
                    return Err(BuildError::SectionMismatch {
                        page: self.pages[page_id.index()].source_path().to_path_buf(),
                        detail: format!("index page of `{}` but not one of its pages", label.display()),
                    });
                }
                Some(page_id)
            }
            None => pages
                .iter()
                .copied()
                .find(|p| self.pages[p.index()].is_index()),
        };
        let regular_pages = sorted_pages
            .iter()
            .copied()
            .filter(|&p| !self.pages[p.index()].is_index() && Some(p) != index_page)
            .collect();

        let hierarchy = join_hierarchy(parent.hierarchy, &source.name);

        // Children first: this section's totals depend on them
        let position = Parent {
            id: Some(id),
            root: Some(parent.root.unwrap_or(id)),
            depth: parent.depth + 1,
            hierarchy: &hierarchy,
            label: &label,
        };
        let mut subsections = Vec::with_capacity(source.subsections.len());
        for &child in &source.subsections {
            subsections.push(self.visit(child, &position)?);
        }

        let mut children = Vec::with_capacity(subsections.len());
        for &child in &subsections {
            let snapshot = self.slots[child.index()]
                .as_ref()
                .ok_or_else(|| BuildError::Cycle(label.clone()))?;
            children.push(snapshot);
        }

        // A subsection shared by several children is counted once
        let mut reach = FxHashSet::default();
        for &child in &subsections {
            reach.extend(self.reach[child.index()].iter().copied());
        }
        let nested: usize = reach
            .iter()
            .filter_map(|s| self.slots[s.index()].as_ref())
            .map(|s| s.pages().len())
            .sum();
        let total_pages = pages.len() + nested;
        reach.insert(id);
        children.sort_by(|a, b| by_weight_then_title((a.weight(), a.title()), (b.weight(), b.title())));
        let sorted_subsections = children.iter().filter_map(|c| c.id()).collect();

        let draft = SectionDraft {
            id: Some(id),
            name: source.name.clone(),
            title: source.title.clone(),
            nav_title: source.nav_title.clone(),
            href: source.href.clone(),
            source_path: source.source_path.clone(),
            metadata: source.metadata.clone(),
            dominant_template: dominant_template(&pages, self.pages),
            pages,
            sorted_pages,
            regular_pages,
            subsections,
            sorted_subsections,
            parent: parent.id,
            root: parent.root,
            index_page,
            icon: source.icon.clone(),
            weight: source.weight,
            depth: parent.depth,
            hierarchy,
            total_pages,
        };

        self.slots[id.index()] = Some(draft.freeze());
        self.reach[id.index()] = reach;
        self.state.insert(key, Visit::Done);
        Ok(id)
    }

    fn lookup_page(&self, key: PageKey, referrer: &Path) -> Result<PageId, BuildError> {
        self.page_ids
            .get(&key)
            .copied()
            .ok_or_else(|| BuildError::UnknownPage {
                referrer: referrer.to_path_buf(),
                index: key.0,
            })
    }
}

/// Stable sort by declared weight, then title.
fn sort_pages(ids: &[PageId], pages: &[PageSnapshot]) -> Vec<PageId> {
    let mut sorted = ids.to_vec();
    sorted.sort_by(|a, b| {
        let (a, b) = (&pages[a.index()], &pages[b.index()]);
        by_weight_then_title((a.weight(), a.title()), (b.weight(), b.title()))
    });
    sorted
}

fn by_weight_then_title(a: (i64, &str), b: (i64, &str)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

fn join_hierarchy(parent: &str, name: &str) -> String {
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name.to_owned(),
        (false, true) => parent.to_owned(),
        (false, false) => format!("{parent}.{name}"),
    }
}

/// Most common template among `ids`; ties go to the alphabetically first.
fn dominant_template(ids: &[PageId], pages: &[PageSnapshot]) -> Option<String> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for id in ids {
        *counts.entry(pages[id.index()].template_name()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(ta, ca), (tb, cb)| ca.cmp(cb).then_with(|| tb.cmp(ta)))
        .map(|(template, _)| template.to_owned())
}
