//! Pass 5: precomputed scheduling structures.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashSet;

use crate::snapshot::{PageId, PageSnapshot, ScoutHint, SectionId, SectionSnapshot, Wave};
use crate::template::PartialResolver;

pub(super) struct Schedule {
    pub topological_order: Vec<Wave>,
    pub template_groups: BTreeMap<String, Vec<PageId>>,
    pub attention_order: Vec<PageId>,
    pub scout_hints: Vec<ScoutHint>,
}

pub(super) fn schedule(
    pages: &[PageSnapshot],
    sections: &[SectionSnapshot],
    root: SectionId,
    resolver: Option<&dyn PartialResolver>,
) -> Schedule {
    let topological_order = waves(pages, sections, root);
    let template_groups = template_groups(pages);
    let attention_order = attention_order(pages);
    let scout_hints = scout_hints(pages, &topological_order, &template_groups, resolver);

    Schedule {
        topological_order,
        template_groups,
        attention_order,
        scout_hints,
    }
}

/// Breadth-first over the section tree, one wave per non-empty section.
///
/// Pages without a section form a final wave of their own.
fn waves(pages: &[PageSnapshot], sections: &[SectionSnapshot], root: SectionId) -> Vec<Wave> {
    let mut waves = Vec::new();
    let mut seen = vec![false; sections.len()];
    let mut queue = VecDeque::from([root]);
    seen[root.index()] = true;

    while let Some(id) = queue.pop_front() {
        let section = &sections[id.index()];
        if !section.sorted_pages().is_empty() {
            waves.push(section.sorted_pages().into());
        }
        for &child in section.sorted_subsections() {
            if !std::mem::replace(&mut seen[child.index()], true) {
                queue.push_back(child);
            }
        }
    }

    let orphans: Wave = pages
        .iter()
        .filter(|page| page.section().is_none())
        .map(PageSnapshot::id)
        .collect();
    if !orphans.is_empty() {
        waves.push(orphans);
    }

    waves
}

fn template_groups(pages: &[PageSnapshot]) -> BTreeMap<String, Vec<PageId>> {
    let mut groups: BTreeMap<String, Vec<PageId>> = BTreeMap::new();
    for page in pages {
        groups
            .entry(page.template_name().to_owned())
            .or_default()
            .push(page.id());
    }
    groups
}

/// Descending attention score; ties keep id order.
fn attention_order(pages: &[PageSnapshot]) -> Vec<PageId> {
    let mut order: Vec<&PageSnapshot> = pages.iter().collect();
    order.sort_by(|a, b| b.attention_score().total_cmp(&a.attention_score()));
    order.into_iter().map(PageSnapshot::id).collect()
}

/// One hint per template, in first-use order, then most-used first.
fn scout_hints(
    pages: &[PageSnapshot],
    waves: &[Wave],
    groups: &BTreeMap<String, Vec<PageId>>,
    resolver: Option<&dyn PartialResolver>,
) -> Vec<ScoutHint> {
    let mut seen = FxHashSet::default();
    let mut hints = Vec::with_capacity(groups.len());

    for (index, wave) in waves.iter().enumerate() {
        for &id in wave.iter() {
            let template = pages[id.index()].template_name();
            if !seen.insert(template) {
                continue;
            }
            let pages_using = groups.get(template).map_or(0, Vec::len);
            let partials = resolver.map_or_else(Vec::new, |r| transitive_partials(r, template));
            hints.push(ScoutHint::new(template.to_owned(), partials, pages_using, index));
        }
    }

    // Stable: equal priorities keep first-use order
    hints.sort_by(|a, b| b.priority().cmp(&a.priority()));
    hints
}

/// Every partial reachable from `template`, excluding the template itself.
fn transitive_partials(resolver: &dyn PartialResolver, template: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    seen.insert(template.to_owned());
    let mut found = Vec::new();
    let mut stack = vec![template.to_owned()];

    while let Some(current) = stack.pop() {
        for partial in resolver.partials(&current) {
            if seen.insert(partial.clone()) {
                found.push(partial.clone());
                stack.push(partial);
            }
        }
    }

    found
}
