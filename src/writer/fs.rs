//! Filesystem writer with a bounded queue and one background thread.
//!
//! A full queue blocks `enqueue`, which holds the worker until the disk
//! catches up. Write failures do not stop the thread; they are collected
//! and reported by `flush_and_close`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};

use super::{OutputWriter, WriteError, minify, stays_in_root};
use crate::config::RenderConfig;
use crate::log;

struct Job {
    path: PathBuf,
    html: String,
}

#[derive(Default)]
struct Report {
    written: usize,
    failed: Vec<PathBuf>,
}

pub struct FsWriter {
    root: PathBuf,
    minify: bool,
    sender: RwLock<Option<SyncSender<Job>>>,
    handle: Mutex<Option<JoinHandle<Report>>>,
}

impl FsWriter {
    /// Start the writer thread. `capacity` is clamped to at least 1.
    pub fn new(root: impl Into<PathBuf>, capacity: usize, minify: bool) -> std::io::Result<Self> {
        let root = root.into();
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::Builder::new()
            .name("writer".into())
            .spawn({
                let root = root.clone();
                move || drain(&root, receiver)
            })?;

        Ok(Self {
            root,
            minify,
            sender: RwLock::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn from_config(config: &RenderConfig) -> std::io::Result<Self> {
        Self::new(&config.output, config.writer_queue, config.minify)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn drain(root: &Path, receiver: Receiver<Job>) -> Report {
    let mut report = Report::default();
    for job in receiver {
        let target = root.join(&job.path);
        match write_file(&target, &job.html) {
            Ok(()) => report.written += 1,
            Err(err) => {
                log!("error"; "{}", err);
                report.failed.push(job.path);
            }
        }
    }
    report
}

fn write_file(target: &Path, html: &str) -> Result<(), WriteError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|err| WriteError::Io(parent.to_path_buf(), err))?;
    }
    fs::write(target, html).map_err(|err| WriteError::Io(target.to_path_buf(), err))
}

impl OutputWriter for FsWriter {
    fn enqueue(&self, path: PathBuf, html: String) -> Result<(), WriteError> {
        if !stays_in_root(&path) {
            return Err(WriteError::OutsideRoot(path));
        }
        let html = if self.minify {
            minify(&html).into_owned()
        } else {
            html
        };

        let sender = self.sender.read();
        let sender = sender.as_ref().ok_or(WriteError::Closed)?;
        sender
            .send(Job { path, html })
            .map_err(|_| WriteError::Closed)
    }

    fn flush_and_close(&self) -> Result<usize, WriteError> {
        // Dropping the last sender ends the writer thread's loop
        drop(self.sender.write().take());

        let handle = self.handle.lock().take().ok_or(WriteError::Closed)?;
        let report = handle.join().map_err(|_| WriteError::Panicked)?;

        if report.failed.is_empty() {
            Ok(report.written)
        } else {
            Err(WriteError::Incomplete {
                written: report.written,
                failed: report.failed,
            })
        }
    }
}

impl Drop for FsWriter {
    fn drop(&mut self) {
        drop(self.sender.get_mut().take());
        if let Some(handle) = self.handle.get_mut().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_writes_nested_paths() {
        let dir = TempDir::new().unwrap();
        let writer = FsWriter::new(dir.path(), 4, false).unwrap();
        writer.enqueue("index.html".into(), "<p>home</p>".into()).unwrap();
        writer.enqueue("posts/a/index.html".into(), "<p>a</p>".into()).unwrap();

        assert_eq!(writer.flush_and_close().unwrap(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), "<p>home</p>");
        assert_eq!(fs::read_to_string(dir.path().join("posts/a/index.html")).unwrap(), "<p>a</p>");
    }

    #[test]
    fn test_enqueue_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let writer = FsWriter::new(dir.path(), 1, false).unwrap();
        assert_eq!(writer.flush_and_close().unwrap(), 0);

        let err = writer.enqueue("late.html".into(), String::new()).unwrap_err();
        assert!(matches!(err, WriteError::Closed));
        assert!(matches!(writer.flush_and_close(), Err(WriteError::Closed)));
    }

    #[test]
    fn test_concurrent_producers_with_small_queue() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(FsWriter::new(dir.path(), 1, false).unwrap());

        let producers: Vec<_> = (0..4)
            .map(|t| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for i in 0..10 {
                        writer.enqueue(format!("t{t}/{i}.html").into(), format!("{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(writer.flush_and_close().unwrap(), 40);
        assert_eq!(fs::read_to_string(dir.path().join("t3/9.html")).unwrap(), "3-9");
    }

    #[test]
    fn test_failed_write_is_reported() {
        let dir = TempDir::new().unwrap();
        // A file where a directory is needed
        fs::write(dir.path().join("blocked"), "").unwrap();
        let writer = FsWriter::new(dir.path(), 2, false).unwrap();
        writer.enqueue("ok.html".into(), "ok".into()).unwrap();
        writer.enqueue("blocked/index.html".into(), "x".into()).unwrap();

        match writer.flush_and_close() {
            Err(WriteError::Incomplete { written, failed }) => {
                assert_eq!(written, 1);
                assert_eq!(failed, vec![PathBuf::from("blocked/index.html")]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_paths_leaving_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("public");
        let writer = FsWriter::new(&root, 2, false).unwrap();

        let err = writer.enqueue("../escaped/index.html".into(), "x".into()).unwrap_err();
        assert!(matches!(err, WriteError::OutsideRoot(_)));
        let outside = dir.path().join("elsewhere.html");
        let err = writer.enqueue(outside.clone(), "x".into()).unwrap_err();
        assert!(matches!(err, WriteError::OutsideRoot(_)));

        assert_eq!(writer.flush_and_close().unwrap(), 0);
        assert!(!dir.path().join("escaped").exists());
        assert!(!outside.exists());
    }

    #[test]
    fn test_minify_on_enqueue() {
        let dir = TempDir::new().unwrap();
        let writer = FsWriter::new(dir.path(), 1, true).unwrap();
        writer.enqueue("m.html".into(), "<p>   spaced   </p>\n\n".into()).unwrap();
        writer.flush_and_close().unwrap();

        let written = fs::read_to_string(dir.path().join("m.html")).unwrap();
        assert!(written.len() < "<p>   spaced   </p>\n\n".len());
    }
}
