//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [render] Section Defaults
// ============================================================================

pub mod render {
    use std::path::PathBuf;

    /// Zero means "one worker per available core".
    pub fn workers() -> usize {
        0
    }

    pub fn scout_lookahead() -> usize {
        2
    }

    pub fn scout_join_timeout_ms() -> u64 {
        500
    }

    pub fn writer_queue() -> usize {
        256
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn templates() -> PathBuf {
        "templates".into()
    }
}
