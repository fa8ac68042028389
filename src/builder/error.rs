//! Structural errors raised while building a snapshot.

use std::path::PathBuf;
use thiserror::Error;

/// The content tree is inconsistent; no snapshot was produced.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("section cycle detected at `{}`", .0.display())]
    Cycle(PathBuf),

    #[error("page `{}` claims a section that is not reachable from the root", .0.display())]
    UnvisitedSection(PathBuf),

    #[error("page `{}`: {detail}", page.display())]
    SectionMismatch { page: PathBuf, detail: String },

    #[error("`{}` references unknown page #{index}", referrer.display())]
    UnknownPage { referrer: PathBuf, index: usize },

    #[error("`{}` references unknown section #{index}", referrer.display())]
    UnknownSection { referrer: PathBuf, index: usize },

    #[error("`{}` and `{}` both render to `{}`", first.display(), second.display(), output.display())]
    DuplicateOutput {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },

    #[error("page `{}` renders to `{}`, outside the output root", page.display(), output.display())]
    OutputOutsideRoot { page: PathBuf, output: PathBuf },

    #[error("menu `{menu}`: entry `{title}` references an unknown page or section")]
    UnknownMenuTarget { menu: String, title: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_name_source_path() {
        let err = BuildError::UnvisitedSection(PathBuf::from("content/lost/a.md"));
        assert!(err.to_string().contains("content/lost/a.md"));

        let err = BuildError::Cycle(PathBuf::from("content/docs"));
        assert!(err.to_string().contains("cycle"));
        assert!(err.to_string().contains("content/docs"));

        let err = BuildError::DuplicateOutput {
            first: PathBuf::from("a.md"),
            second: PathBuf::from("b.md"),
            output: PathBuf::from("x/index.html"),
        };
        assert!(err.to_string().contains("x/index.html"));
    }
}
