//! Page snapshots and the self-contained values derived from a page source.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::{PageId, SectionId};
use crate::content::{PageSource, TocEntry};

/// Words per minute used for reading-time estimates.
const WORDS_PER_MINUTE: usize = 200;

/// Maximum excerpt length in characters when derived from the body.
const EXCERPT_CHARS: usize = 160;

/// Extra cost units per table-of-contents entry.
const TOC_ENTRY_COST: u64 = 64;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// One rendered-content unit, frozen.
///
/// Navigation fields (`section`, `prev_page`, `next_page`) are resolved by
/// the builder's later passes; once the snapshot is returned they never
/// change.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    id: PageId,
    title: String,
    href: String,
    source_path: PathBuf,
    output_path: PathBuf,
    template_name: String,

    content: String,
    toc_html: String,
    toc: Box<[TocEntry]>,
    excerpt: String,

    metadata: Map<String, Value>,
    tags: Box<[String]>,
    categories: Box<[String]>,
    date: Option<String>,
    draft: bool,
    weight: i64,
    is_index: bool,

    reading_time: usize,
    word_count: usize,
    content_hash: String,
    attention_score: f64,
    estimated_cost: u64,

    section: Option<SectionId>,
    prev_page: Option<PageId>,
    next_page: Option<PageId>,
}

impl PageSnapshot {
    /// Freeze a page source with every self-contained field populated and
    /// navigation left unresolved.
    pub(crate) fn from_source(id: PageId, source: &PageSource) -> Self {
        let is_index = is_index_path(&source.source_path);
        let text = plain_text(&source.content);
        let word_count = source
            .word_count
            .unwrap_or_else(|| text.split_whitespace().count());
        let reading_time = source
            .reading_time
            .unwrap_or_else(|| estimate_reading_time(word_count));

        Self {
            id,
            title: source.title.clone(),
            href: source.href.clone(),
            source_path: source.source_path.clone(),
            output_path: source
                .output_path
                .clone()
                .unwrap_or_else(|| output_path_for(&source.href)),
            template_name: resolve_template(source, is_index),
            content: source.content.clone(),
            toc_html: source.toc_html.clone(),
            toc: source.toc.clone().into_boxed_slice(),
            excerpt: resolve_excerpt(source, &text),
            tags: metadata_terms(&source.metadata, "tags").into_boxed_slice(),
            categories: metadata_terms(&source.metadata, "categories").into_boxed_slice(),
            date: source
                .metadata
                .get("date")
                .and_then(Value::as_str)
                .map(str::to_owned),
            draft: source
                .metadata
                .get("draft")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            metadata: source.metadata.clone(),
            weight: source.weight,
            is_index,
            reading_time,
            word_count,
            content_hash: blake3::hash(source.content.as_bytes()).to_hex().to_string(),
            attention_score: attention_score(source, is_index),
            estimated_cost: (source.content.len() + source.toc_html.len()) as u64
                + TOC_ENTRY_COST * source.toc.len() as u64,
            section: None,
            prev_page: None,
            next_page: None,
        }
    }

    /// New instance with the owning section filled in.
    pub(crate) fn with_section(self, section: SectionId) -> Self {
        Self {
            section: Some(section),
            ..self
        }
    }

    /// New instance with sibling navigation filled in.
    pub(crate) fn with_neighbors(self, prev_page: Option<PageId>, next_page: Option<PageId>) -> Self {
        Self {
            prev_page,
            next_page,
            ..self
        }
    }

    pub const fn id(&self) -> PageId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Logical URL path.
    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Output path relative to the output root.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Pre-parsed HTML body.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn toc_html(&self) -> &str {
        &self.toc_html
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Alias of [`metadata`](Self::metadata) for template parity.
    pub const fn params(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Publication date from metadata (ISO 8601 string).
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub const fn is_draft(&self) -> bool {
        self.draft
    }

    pub const fn weight(&self) -> i64 {
        self.weight
    }

    /// Whether this page is a section landing page (`index` / `_index`).
    pub const fn is_index(&self) -> bool {
        self.is_index
    }

    /// Reading time in minutes.
    pub const fn reading_time(&self) -> usize {
        self.reading_time
    }

    pub const fn word_count(&self) -> usize {
        self.word_count
    }

    /// blake3 hex digest of the body.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Render-priority hint; higher renders earlier in priority-first modes.
    pub const fn attention_score(&self) -> f64 {
        self.attention_score
    }

    /// Relative render cost in abstract units.
    pub const fn estimated_cost(&self) -> u64 {
        self.estimated_cost
    }

    pub const fn section(&self) -> Option<SectionId> {
        self.section
    }

    pub const fn prev_page(&self) -> Option<PageId> {
        self.prev_page
    }

    pub const fn next_page(&self) -> Option<PageId> {
        self.next_page
    }
}

// ============================================================================
// Derivations
// ============================================================================

fn is_index_path(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem == "index" || stem == "_index")
}

/// Body text with tags removed and whitespace collapsed.
fn plain_text(html: &str) -> String {
    HTML_TAG
        .replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

const fn estimate_reading_time(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

fn resolve_template(source: &PageSource, is_index: bool) -> String {
    if let Some(template) = &source.template {
        return template.clone();
    }
    if let Some(template) = source.metadata.get("template").and_then(Value::as_str) {
        return template.to_owned();
    }
    let fallback = if is_index { "section" } else { "page" };
    fallback.to_owned()
}

fn resolve_excerpt(source: &PageSource, text: &str) -> String {
    if let Some(excerpt) = &source.excerpt {
        return excerpt.clone();
    }
    if let Some(summary) = ["summary", "description"]
        .iter()
        .find_map(|key| source.metadata.get(*key).and_then(Value::as_str))
    {
        return summary.to_owned();
    }
    truncate_words(text, EXCERPT_CHARS)
}

/// Cut `text` to at most `max_chars` characters on a word boundary.
fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut out = String::new();
    for word in text.split_whitespace() {
        let extra = usize::from(!out.is_empty()) + word.chars().count();
        if out.chars().count() + extra > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        // First word alone is too long: hard cut on a char boundary
        out = text.trim_start().chars().take(max_chars).collect();
    }
    out
}

/// Default output location for a logical path.
///
/// `/` → `index.html`, `/posts/a/` → `posts/a/index.html`,
/// `/404.html` → `404.html`.
fn output_path_for(href: &str) -> PathBuf {
    let trimmed = href.trim_matches('/');
    if trimmed.is_empty() {
        return PathBuf::from("index.html");
    }
    let path = PathBuf::from(trimmed);
    if path.extension().is_some() {
        path
    } else {
        path.join("index.html")
    }
}

fn attention_score(source: &PageSource, is_index: bool) -> f64 {
    if let Some(score) = source.metadata.get("attention").and_then(Value::as_f64) {
        return score;
    }
    let depth = source.href.split('/').filter(|s| !s.is_empty()).count();
    let base = 1.0 / (1.0 + depth as f64);
    if is_index { base + 0.5 } else { base }
}

/// Read a taxonomy-style metadata value: a string or an array of strings.
pub(crate) fn metadata_terms(metadata: &Map<String, Value>, key: &str) -> Vec<String> {
    match metadata.get(key) {
        Some(Value::String(term)) => vec![term.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(path: &str, href: &str) -> PageSource {
        PageSource::new(path, "Title", href)
    }

    #[test]
    fn test_word_count_strips_tags() {
        let source = page("a.md", "/a/").with_content("<p>one <em>two</em></p><p>three</p>");
        let snap = PageSnapshot::from_source(PageId::new(0), &source);
        assert_eq!(snap.word_count(), 3);
        assert_eq!(snap.reading_time(), 1);
    }

    #[test]
    fn test_declared_counts_win() {
        let mut source = page("a.md", "/a/").with_content("<p>one two</p>");
        source.word_count = Some(1000);
        source.reading_time = Some(7);
        let snap = PageSnapshot::from_source(PageId::new(0), &source);
        assert_eq!(snap.word_count(), 1000);
        assert_eq!(snap.reading_time(), 7);
    }

    #[test]
    fn test_empty_body_reads_in_zero_minutes() {
        let snap = PageSnapshot::from_source(PageId::new(0), &page("a.md", "/a/"));
        assert_eq!(snap.word_count(), 0);
        assert_eq!(snap.reading_time(), 0);
        assert_eq!(snap.excerpt(), "");
    }

    #[test]
    fn test_reading_time_rounds_up() {
        assert_eq!(estimate_reading_time(201), 2);
        assert_eq!(estimate_reading_time(200), 1);
    }

    #[test]
    fn test_template_resolution_order() {
        let explicit = page("a.md", "/a/")
            .with_template("post")
            .with_meta("template", "ignored");
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &explicit).template_name(), "post");

        let from_meta = page("a.md", "/a/").with_meta("template", "landing");
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &from_meta).template_name(), "landing");

        let index = page("docs/_index.md", "/docs/");
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &index).template_name(), "section");

        let regular = page("docs/intro.md", "/docs/intro/");
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &regular).template_name(), "page");
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(output_path_for("/"), PathBuf::from("index.html"));
        assert_eq!(output_path_for("/posts/a/"), PathBuf::from("posts/a/index.html"));
        assert_eq!(output_path_for("/404.html"), PathBuf::from("404.html"));
    }

    #[test]
    fn test_excerpt_prefers_summary_then_body() {
        let with_summary = page("a.md", "/a/")
            .with_content("<p>body text</p>")
            .with_meta("summary", "short");
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &with_summary).excerpt(), "short");

        let body_only = page("a.md", "/a/").with_content("<p>body   text</p>");
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &body_only).excerpt(), "body text");
    }

    #[test]
    fn test_truncate_words_respects_boundary() {
        assert_eq!(truncate_words("alpha beta gamma", 11), "alpha beta");
        assert_eq!(truncate_words("alpha", 3), "alp");
        assert_eq!(truncate_words("  ééééé rest", 2), "éé");
        assert_eq!(truncate_words("short", 160), "short");
    }

    #[test]
    fn test_attention_score() {
        let explicit = page("a.md", "/a/").with_meta("attention", 9.5);
        assert_eq!(PageSnapshot::from_source(PageId::new(0), &explicit).attention_score(), 9.5);

        let home = PageSnapshot::from_source(PageId::new(0), &page("index.md", "/"));
        let deep = PageSnapshot::from_source(PageId::new(1), &page("a/b/c.md", "/a/b/c/"));
        assert!(home.attention_score() > deep.attention_score());
        assert_eq!(home.attention_score(), 1.5);
    }

    #[test]
    fn test_metadata_terms() {
        let source = page("a.md", "/a/")
            .with_meta("tags", json!(["rust", "web"]))
            .with_meta("categories", "notes");
        let snap = PageSnapshot::from_source(PageId::new(0), &source);
        assert_eq!(snap.tags(), ["rust", "web"]);
        assert_eq!(snap.categories(), ["notes"]);
        assert_eq!(snap.params(), snap.metadata());
    }

    #[test]
    fn test_content_hash_tracks_body() {
        let a = PageSnapshot::from_source(PageId::new(0), &page("a.md", "/a/").with_content("x"));
        let b = PageSnapshot::from_source(PageId::new(1), &page("b.md", "/b/").with_content("x"));
        let c = PageSnapshot::from_source(PageId::new(2), &page("c.md", "/c/").with_content("y"));
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_with_section_returns_new_instance() {
        let original = PageSnapshot::from_source(PageId::new(0), &page("a.md", "/a/"));
        let resolved = original.clone().with_section(SectionId::new(2));
        assert_eq!(original.section(), None);
        assert_eq!(resolved.section(), Some(SectionId::new(2)));
        assert_eq!(resolved.title(), original.title());
    }
}
