//! Pass and render metrics.
//!
//! Collected unconditionally: the counters are plain integers bumped on the
//! step path, and the clock is read once when a pass starts and once when it
//! commits. The last completed pass is kept on the engine
//! ([`LSystem::last_pass`](crate::LSystem::last_pass)); a render reports its
//! metrics when it finishes.

use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

/// Statistics for one completed generation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassMetrics {
    /// Generation number the pass produced.
    pub generation: u64,
    /// Wall time from `generate_begin` to commit, including host pauses
    /// between chunked steps.
    pub duration: Duration,
    /// Traversal steps taken: modules plus branch enter/exit markers.
    pub visited: usize,
    /// Modules replaced by a rule's production.
    pub rewritten: usize,
    /// Modules copied verbatim because no rule matched.
    pub copied: usize,
    /// Inert modules dropped.
    pub dropped: usize,
    /// Element count of the produced generation, branch markers included.
    pub module_count: usize,
}

/// Statistics for one completed render walk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderMetrics {
    pub duration: Duration,
    /// Traversal steps taken.
    pub visited: usize,
    /// Steps that found and invoked an action.
    pub invoked: usize,
}
