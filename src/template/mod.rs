//! Template engine boundary.
//!
//! Rendering treats the engine as an opaque, thread-safe function from a
//! template name and a JSON context to HTML. The engine's compile cache is
//! the one piece of shared mutable state that workers and the scout both
//! touch, so implementations must synchronize it internally.

mod hbs;

pub use hbs::HandlebarsEngine;

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("failed to compile template `{template}`: {message}")]
    Compile { template: String, message: String },

    #[error("failed to render template `{template}`: {message}")]
    Render { template: String, message: String },

    #[error("failed to read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
}

/// A thread-safe template renderer.
pub trait TemplateEngine: Send + Sync {
    /// Render `template` with `context`.
    fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError>;

    /// Compile `template` into the shared cache ahead of need.
    ///
    /// Idempotent: warming an already compiled template is a no-op.
    fn warm(&self, template: &str) -> Result<(), TemplateError>;
}

/// Reports which partials a template includes directly.
pub trait PartialResolver {
    /// Direct partial names of `template`; empty when unknown.
    fn partials(&self, template: &str) -> Vec<String>;
}

/// Matches `{{> name}}`, `{{~> name}}` and `{{> "name"}}`.
static PARTIAL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{~?>[ \t\r\n]*"?([A-Za-z0-9_./-]+)"#).expect("valid partial regex")
});

/// Partial names included by a handlebars source, in first-use order.
pub(crate) fn scan_partials(source: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in PARTIAL_TAG.captures_iter(source) {
        let name = &caps[1];
        if !found.iter().any(|f| f == name) {
            found.push(name.to_owned());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_partials() {
        let source = r#"
            {{> header}}
            <main>{{{page.content}}}</main>
            {{~> "partials/footer"}}
            {{>header}}
            {{> (lookup page "sidebar")}}
        "#;
        assert_eq!(scan_partials(source), vec!["header", "partials/footer"]);
    }

    #[test]
    fn test_scan_partials_ignores_plain_expressions() {
        assert!(scan_partials("{{title}} {{#each pages}}{{this}}{{/each}}").is_empty());
    }
}
