//! Handlebars-backed engine reading `<name>.hbs` files from a directory.
//!
//! Templates compile on first use, either from a worker's `render` or from
//! the scout's `warm`. Partials referenced with `{{> name}}` are loaded and
//! registered alongside the template that includes them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{PartialResolver, TemplateEngine, TemplateError, scan_partials};
use crate::config::RenderConfig;

const EXTENSION: &str = "hbs";

/// Template engine with a lazily filled, lock-protected compile cache.
///
/// # Thread Safety
///
/// - `render` on a compiled template takes only the read lock
/// - compiling takes the write lock once per template
/// - reading template files happens outside any lock
pub struct HandlebarsEngine {
    root: PathBuf,
    registry: RwLock<Handlebars<'static>>,
    /// Direct partials per template, filled when a source is first read.
    partials: RwLock<FxHashMap<String, Vec<String>>>,
}

impl HandlebarsEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        Self {
            root: root.into(),
            registry: RwLock::new(registry),
            partials: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(&config.templates)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register an in-memory template, replacing any compiled version.
    pub fn register(&self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.compile(name, source, true)
    }

    pub fn is_compiled(&self, template: &str) -> bool {
        self.registry.read().has_template(template)
    }

    fn path_of(&self, template: &str) -> PathBuf {
        self.root.join(format!("{template}.{EXTENSION}"))
    }

    fn read_source(&self, template: &str) -> Result<String, TemplateError> {
        let path = self.path_of(template);
        fs::read_to_string(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound(template.to_owned()),
            _ => TemplateError::Io(path, err),
        })
    }

    /// Compile `template` and every partial it reaches, if not cached.
    fn load(&self, template: &str) -> Result<(), TemplateError> {
        // Fast path: read lock only
        if self.is_compiled(template) {
            return Ok(());
        }
        let source = self.read_source(template)?;
        self.compile(template, &source, false)
    }

    fn compile(&self, template: &str, source: &str, replace: bool) -> Result<(), TemplateError> {
        let includes = scan_partials(source);
        {
            let mut registry = self.registry.write();
            // Another thread may have compiled it while we read the file
            if !replace && registry.has_template(template) {
                return Ok(());
            }
            registry
                .register_template_string(template, source)
                .map_err(|err| TemplateError::Compile {
                    template: template.to_owned(),
                    message: err.to_string(),
                })?;
        }
        self.partials.write().insert(template.to_owned(), includes.clone());

        for partial in &includes {
            self.load(partial)?;
        }
        Ok(())
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
        self.load(template)?;
        self.registry
            .read()
            .render(template, context)
            .map_err(|err| TemplateError::Render {
                template: template.to_owned(),
                message: err.to_string(),
            })
    }

    fn warm(&self, template: &str) -> Result<(), TemplateError> {
        self.load(template)
    }
}

impl PartialResolver for HandlebarsEngine {
    fn partials(&self, template: &str) -> Vec<String> {
        if let Some(found) = self.partials.read().get(template) {
            return found.clone();
        }
        let found = match self.read_source(template) {
            Ok(source) => scan_partials(&source),
            Err(_) => Vec::new(),
        };
        self.partials.write().insert(template.to_owned(), found.clone());
        found
    }
}
