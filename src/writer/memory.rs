//! In-memory writer, for previews and tests.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{OutputWriter, WriteError};

#[derive(Debug, Default)]
struct State {
    files: Vec<(PathBuf, String)>,
    closed: bool,
}

/// Collects rendered pages in arrival order.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    state: Mutex<State>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pages received so far, in arrival order.
    pub fn files(&self) -> Vec<(PathBuf, String)> {
        self.state.lock().files.clone()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.state
            .lock()
            .files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, html)| html.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl OutputWriter for MemoryWriter {
    fn enqueue(&self, path: PathBuf, html: String) -> Result<(), WriteError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(WriteError::Closed);
        }
        state.files.push((path, html));
        Ok(())
    }

    fn flush_and_close(&self) -> Result<usize, WriteError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(WriteError::Closed);
        }
        state.closed = true;
        Ok(state.files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_until_closed() {
        let writer = MemoryWriter::new();
        assert!(writer.is_empty());
        writer.enqueue("a.html".into(), "A".into()).unwrap();
        writer.enqueue("b.html".into(), "B".into()).unwrap();

        assert_eq!(writer.flush_and_close().unwrap(), 2);
        assert!(writer.is_closed());
        assert_eq!(writer.get(Path::new("b.html")).as_deref(), Some("B"));
        assert!(matches!(writer.enqueue("c.html".into(), "C".into()), Err(WriteError::Closed)));
        assert_eq!(writer.len(), 2);
    }
}
