//! Template contexts built purely from snapshot data.
//!
//! Every page is rendered with `{ page, section, site }`. The `site` and
//! `section` values are converted once per build and shared by all pages.

use serde_json::{Map, Value, json};

use crate::snapshot::{MenuItem, PageId, PageSnapshot, SectionSnapshot, SiteSnapshot};

pub(crate) struct ContextCache {
    site: Value,
    sections: Vec<Value>,
    sentinel: Value,
}

impl ContextCache {
    pub fn new(snapshot: &SiteSnapshot) -> Self {
        Self {
            site: site_value(snapshot),
            sections: snapshot
                .sections()
                .iter()
                .map(|section| section_value(snapshot, section))
                .collect(),
            sentinel: section_value(snapshot, SectionSnapshot::sentinel()),
        }
    }

    pub fn page_context(&self, snapshot: &SiteSnapshot, page: &PageSnapshot) -> Value {
        let section = match page.section() {
            Some(id) => &self.sections[id.index()],
            None => &self.sentinel,
        };
        json!({
            "page": page_value(snapshot, page),
            "section": section,
            "site": &self.site,
        })
    }
}

fn link(snapshot: &SiteSnapshot, id: PageId) -> Value {
    let page = snapshot.page(id);
    json!({ "title": page.title(), "href": page.href() })
}

fn page_value(snapshot: &SiteSnapshot, page: &PageSnapshot) -> Value {
    json!({
        "title": page.title(),
        "href": page.href(),
        "content": page.content(),
        "toc_html": page.toc_html(),
        "toc": page.toc(),
        "excerpt": page.excerpt(),
        "params": page.params(),
        "tags": page.tags(),
        "categories": page.categories(),
        "date": page.date(),
        "draft": page.is_draft(),
        "weight": page.weight(),
        "is_index": page.is_index(),
        "reading_time": page.reading_time(),
        "word_count": page.word_count(),
        "content_hash": page.content_hash(),
        "template": page.template_name(),
        "prev": page.prev_page().map(|id| link(snapshot, id)),
        "next": page.next_page().map(|id| link(snapshot, id)),
    })
}

fn section_value(snapshot: &SiteSnapshot, section: &SectionSnapshot) -> Value {
    let subsections: Vec<Value> = section
        .sorted_subsections()
        .iter()
        .map(|&id| {
            let child = snapshot.section(id);
            json!({
                "title": child.title(),
                "nav_title": child.nav_title(),
                "href": child.href(),
                "total_pages": child.total_pages(),
            })
        })
        .collect();

    json!({
        "name": section.name(),
        "title": section.title(),
        "nav_title": section.nav_title(),
        "href": section.href(),
        "params": section.params(),
        "icon": section.icon(),
        "weight": section.weight(),
        "depth": section.depth(),
        "hierarchy": section.hierarchy(),
        "total_pages": section.total_pages(),
        "is_virtual": section.is_virtual(),
        "is_sentinel": section.is_sentinel(),
        "index": section.index_page().map(|id| link(snapshot, id)),
        "pages": section.regular_pages().iter().map(|&id| link(snapshot, id)).collect::<Vec<_>>(),
        "subsections": subsections,
    })
}

fn menu_value(items: &[MenuItem]) -> Value {
    items
        .iter()
        .map(|item| {
            json!({
                "title": item.title(),
                "href": item.href(),
                "weight": item.weight(),
                "children": menu_value(item.children()),
            })
        })
        .collect()
}

fn site_value(snapshot: &SiteSnapshot) -> Value {
    let menus: Map<String, Value> = snapshot
        .menus()
        .iter()
        .map(|(name, items)| (name.clone(), menu_value(items)))
        .collect();

    let taxonomies: Map<String, Value> = snapshot
        .taxonomies()
        .iter()
        .map(|(kind, terms)| {
            let terms: Map<String, Value> = terms
                .iter()
                .map(|(term, pages)| (term.clone(), pages.iter().map(|&id| link(snapshot, id)).collect()))
                .collect();
            (kind.clone(), Value::Object(terms))
        })
        .collect();

    let root = snapshot.root_section();
    json!({
        "title": root.title(),
        "href": root.href(),
        "config": snapshot.config(),
        "params": snapshot.params(),
        "data": snapshot.data(),
        "menus": menus,
        "taxonomies": taxonomies,
        "page_count": snapshot.page_count(),
    })
}
