//! Passes 3 and 4: section back-references and prev/next links.

use super::BuildError;
use super::sections::SectionPass;
use crate::content::ContentTree;
use crate::snapshot::{PageId, PageSnapshot, SectionSnapshot};

/// Point every page at the section that lists it.
///
/// `pages[i]` must have been built from the `i`-th page of `tree`.
pub(super) fn attach_sections(
    tree: &ContentTree,
    pages: Vec<PageSnapshot>,
    pass: &SectionPass,
) -> Result<Vec<PageSnapshot>, BuildError> {
    pages
        .into_iter()
        .zip(tree.pages())
        .map(|(page, (_, source))| {
            let listed = pass.membership.get(&page.id()).copied();
            let declared = match source.section {
                Some(key) => Some(
                    pass.ids
                        .get(&key)
                        .copied()
                        .ok_or_else(|| BuildError::UnvisitedSection(source.source_path.clone()))?,
                ),
                None => None,
            };

            match (declared, listed) {
                (Some(declared), Some(listed)) if declared != listed => Err(BuildError::SectionMismatch {
                    page: source.source_path.clone(),
                    detail: format!(
                        "declares section `{}` but is listed by `{}`",
                        pass.sections[declared.index()].href(),
                        pass.sections[listed.index()].href(),
                    ),
                }),
                (Some(declared), None) => Err(BuildError::SectionMismatch {
                    page: source.source_path.clone(),
                    detail: format!(
                        "declares section `{}` which does not list it",
                        pass.sections[declared.index()].href(),
                    ),
                }),
                (Some(section), Some(_)) | (None, Some(section)) => Ok(page.with_section(section)),
                (None, None) => Ok(page),
            }
        })
        .collect()
}

/// Link each page to its neighbours in its section's sorted order.
///
/// With `site_wide`, pages outside any section are also chained together in
/// id order.
pub(super) fn link_neighbors(
    pages: Vec<PageSnapshot>,
    sections: &[SectionSnapshot],
    site_wide: bool,
) -> Vec<PageSnapshot> {
    let mut links: Vec<(Option<PageId>, Option<PageId>)> = vec![(None, None); pages.len()];

    for section in sections {
        link_sequence(section.sorted_pages(), &mut links);
    }
    if site_wide {
        let orphans: Vec<PageId> = pages
            .iter()
            .filter(|page| page.section().is_none())
            .map(PageSnapshot::id)
            .collect();
        link_sequence(&orphans, &mut links);
    }

    pages
        .into_iter()
        .zip(links)
        .map(|(page, (prev, next))| page.with_neighbors(prev, next))
        .collect()
}

fn link_sequence(sequence: &[PageId], links: &mut [(Option<PageId>, Option<PageId>)]) {
    for pair in sequence.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        links[a.index()].1 = Some(b);
        links[b.index()].0 = Some(a);
    }
}
