//! Terminal logging with colored prefixes and per-wave progress bars.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `ProgressBars` for displaying render progress while waves run
//!
//! # Example
//!
//! ```ignore
//! log!("snapshot"; "built {} pages in {} sections", pages, sections);
//!
//! let progress = ProgressBars::new(&[("render", 100)]);
//! progress.inc(0);
//! progress.finish();
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stdout},
    sync::{
        OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Active progress bar count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Layout Constants
// ============================================================================
//
// Progress bar format: "[render] [████░░░░] 42/100"
//                       ^------^ ^-------^ ^----^
//                       prefix   bar       count

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;
/// Bar wrapper: " []" (space + brackets around progress bar)
const BAR_WRAPPER_LEN: usize = 3;
/// Space before count: "...] 42/100" <- this space
const SPACE_BEFORE_COUNT: usize = 1;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails (e.g. output is piped).
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

// ============================================================================
// Progress Bars
// ============================================================================

/// Multiple progress bars displayed on separate terminal lines.
///
/// Bars are indexed by creation order and may be incremented from any
/// worker thread.
pub struct ProgressBars {
    bars: Vec<ProgressBar>,
    lock: Mutex<()>,
}

struct ProgressBar {
    /// Colored prefix string (e.g., "[render]" in green)
    prefix: ColoredString,
    prefix_len: usize,
    total: usize,
    current: AtomicUsize,
    /// Row index within the progress area (0 = first bar)
    row: usize,
}

impl ProgressBars {
    /// Create progress bars for `(module_name, total_count)` pairs.
    pub fn new(modules: &[(&'static str, usize)]) -> Self {
        // Reserve terminal lines for progress bars
        let mut stdout = stdout().lock();
        for _ in 0..modules.len() {
            writeln!(stdout).ok();
        }
        stdout.flush().ok();

        BAR_COUNT.store(modules.len(), Ordering::SeqCst);

        let bars = modules
            .iter()
            .enumerate()
            .map(|(row, (module, total))| ProgressBar {
                prefix: colorize_prefix(module, &module.to_ascii_lowercase()),
                prefix_len: calc_prefix_len(module.len()),
                total: *total,
                current: AtomicUsize::new(0),
                row,
            })
            .collect();

        Self {
            bars,
            lock: Mutex::new(()),
        }
    }

    /// Create progress bars only when there is more than one item to track.
    pub fn new_filtered(modules: &[(&'static str, usize)]) -> Option<Self> {
        let filtered: Vec<_> = modules
            .iter()
            .filter(|(_, count)| *count > 0)
            .copied()
            .collect();
        let total: usize = filtered.iter().map(|(_, c)| c).sum();

        if total <= 1 {
            return None;
        }

        Some(Self::new(&filtered))
    }

    /// Increment progress for the bar at the given index.
    ///
    /// Thread-safe: called concurrently by render workers.
    #[inline]
    pub fn inc(&self, index: usize) {
        if let Some(bar) = self.bars.get(index) {
            let current = bar.current.fetch_add(1, Ordering::Relaxed) + 1;
            self.display(bar, current);
        }
    }

    fn display(&self, bar: &ProgressBar, current: usize) {
        let _guard = self.lock.lock();

        let width = get_terminal_width() as usize;

        let progress_text = format!("{}/{}", current, bar.total);
        let overhead = bar.prefix_len + BAR_WRAPPER_LEN + SPACE_BEFORE_COUNT + progress_text.len();
        let bar_width = width.saturating_sub(overhead).clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH);

        let filled = if bar.total > 0 {
            (current.min(bar.total) * bar_width) / bar.total
        } else {
            0
        };
        let empty = bar_width.saturating_sub(filled);
        let progress_bar: String = "█".repeat(filled) + &"░".repeat(empty);

        let mut stdout = stdout().lock();
        #[allow(clippy::cast_possible_truncation)] // bars count is always small
        let lines_up = (self.bars.len() - bar.row) as u16;
        execute!(stdout, cursor::MoveUp(lines_up)).ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "{} [{}] {}", bar.prefix, progress_bar, progress_text).ok();
        execute!(stdout, cursor::MoveDown(lines_up)).ok();
        write!(stdout, "\r").ok();
        stdout.flush().ok();
    }

    /// Clear all progress bars from the terminal.
    #[allow(clippy::cast_possible_truncation)]
    pub fn finish(&self) {
        if BAR_COUNT.swap(0, Ordering::SeqCst) == 0 {
            return;
        }
        let _guard = self.lock.lock();

        let mut stdout = stdout().lock();
        let bars_len = self.bars.len() as u16;

        execute!(stdout, cursor::MoveUp(bars_len)).ok();
        for _ in &self.bars {
            execute!(stdout, Clear(ClearType::CurrentLine)).ok();
            execute!(stdout, cursor::MoveDown(1)).ok();
        }
        execute!(stdout, cursor::MoveUp(bars_len)).ok();
        stdout.flush().ok();
    }
}

impl Drop for ProgressBars {
    fn drop(&mut self) {
        self.finish();
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix.
///
/// Single-line messages are truncated to the terminal width.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module, &module.to_ascii_lowercase());
    let width = get_terminal_width() as usize;

    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveUp(bar_count as u16)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    }

    if message.contains('\n') {
        writeln!(stdout, "{prefix} {message}").ok();
    } else {
        let max_msg_len = width.saturating_sub(calc_prefix_len(module.len()));
        writeln!(stdout, "{prefix} {}", truncate_str(message, max_msg_len)).ok();
    }

    for _ in 0..bar_count {
        writeln!(stdout).ok();
    }

    stdout.flush().ok();
}

#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "scout" => prefix.bright_blue().bold(),
        "render" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes on a UTF-8 boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_prefix_len() {
        // "render" -> "[render] " = 6 + 2 + 1
        assert_eq!(calc_prefix_len(6), 9);
        assert_eq!(calc_prefix_len(0), 3);
    }

    #[test]
    fn test_truncate_str_ascii() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 5), "hello");
        assert_eq!(truncate_str("hello", 0), "");
    }

    #[test]
    fn test_truncate_str_unicode_boundary() {
        // "€" is 3 bytes; cutting at 4 must back off to 3
        assert_eq!(truncate_str("€€", 4), "€");
        assert_eq!(truncate_str("a€b", 3), "a");
    }

    #[test]
    fn test_new_filtered_skips_trivial_work() {
        assert!(ProgressBars::new_filtered(&[("render", 1)]).is_none());
        assert!(ProgressBars::new_filtered(&[("render", 0)]).is_none());
    }
}
