//! Lookahead cache-warming thread.
//!
//! The scout walks the snapshot's scout hints and asks the template engine
//! to compile each template and partial before a worker needs it. It stays
//! at most `lookahead` waves ahead of the scheduler, which publishes the
//! wave it is on through [`Scout::advance`].
//!
//! Warming is an optimization only: a failure is logged and counted, and
//! the worker that reaches the template compiles it on demand.

use std::io;
use std::iter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::log;
use crate::snapshot::SiteSnapshot;
use crate::template::TemplateEngine;

/// Longest the scout sleeps before re-checking the wave counter.
const PARK_INTERVAL: Duration = Duration::from_millis(20);

/// How often `stop` polls for the thread to exit.
const JOIN_POLL: Duration = Duration::from_millis(2);

#[derive(Default)]
struct Shared {
    wave: AtomicUsize,
    stop: AtomicBool,
    warmed: AtomicUsize,
    failed: AtomicUsize,
    waiting: AtomicBool,
}

/// Counters reported when the scout stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoutReport {
    /// Resources compiled successfully.
    pub warmed: usize,
    /// Resources whose warm-up failed.
    pub failed: usize,
    /// `false` if the thread was still busy when the join timeout expired.
    pub finished: bool,
    /// Everything within the lookahead is warmed; the scout waits for
    /// the workers to advance.
    pub waiting: bool,
}

/// Handle to a running scout thread.
pub struct Scout {
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl Scout {
    pub fn spawn(snapshot: Arc<SiteSnapshot>, engine: Arc<dyn TemplateEngine>, lookahead: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let handle = thread::Builder::new().name("scout".into()).spawn({
            let shared = Arc::clone(&shared);
            move || run(&shared, &snapshot, engine.as_ref(), lookahead)
        })?;
        Ok(Self { shared, handle })
    }

    /// Publish that the workers have reached `wave`.
    pub fn advance(&self, wave: usize) {
        self.shared.wave.fetch_max(wave, Ordering::AcqRel);
        self.handle.thread().unpark();
    }

    pub fn current_wave(&self) -> usize {
        self.shared.wave.load(Ordering::Acquire)
    }

    pub fn report(&self) -> ScoutReport {
        ScoutReport {
            warmed: self.shared.warmed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            finished: self.handle.is_finished(),
            waiting: self.shared.waiting.load(Ordering::Acquire),
        }
    }

    /// Signal the scout to stop and wait up to `timeout` for it to exit.
    ///
    /// A scout still inside a warm-up call when the timeout expires is
    /// detached; it exits on its own once the call returns.
    pub fn stop(self, timeout: Duration) -> ScoutReport {
        self.shared.stop.store(true, Ordering::Release);
        self.handle.thread().unpark();

        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                log!("scout"; "still warming after {:?}, detaching", timeout);
                return self.report();
            }
            thread::sleep(JOIN_POLL);
        }

        let report = self.report();
        if self.handle.join().is_err() {
            log!("scout"; "thread panicked");
        }
        report
    }
}

fn run(shared: &Shared, snapshot: &SiteSnapshot, engine: &dyn TemplateEngine, lookahead: usize) {
    let hints = snapshot.scout_hints();
    let mut done = vec![false; hints.len()];
    let mut remaining = hints.len();
    let mut warmed: FxHashSet<&str> = FxHashSet::default();

    while remaining > 0 && !shared.stop.load(Ordering::Acquire) {
        let horizon = shared.wave.load(Ordering::Acquire).saturating_add(lookahead);

        // Highest priority eligible hint; rescan after each so newly
        // eligible hints are ordered correctly
        let next = hints
            .iter()
            .enumerate()
            .find(|(i, hint)| !done[*i] && hint.first_wave() <= horizon);

        let Some((index, hint)) = next else {
            shared.waiting.store(true, Ordering::Release);
            thread::park_timeout(PARK_INTERVAL);
            continue;
        };
        shared.waiting.store(false, Ordering::Release);

        let resources = iter::once(hint.template()).chain(hint.partials().iter().map(String::as_str));
        for resource in resources {
            if shared.stop.load(Ordering::Acquire) {
                return;
            }
            if !warmed.insert(resource) {
                continue;
            }
            match engine.warm(resource) {
                Ok(()) => {
                    shared.warmed.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    shared.failed.fetch_add(1, Ordering::Relaxed);
                    log!("scout"; "warming `{}` failed: {}", resource, err);
                }
            }
        }

        done[index] = true;
        remaining -= 1;
    }
}
