//! Rewriting and rendering engine.
//!
//! This module is the internal core behind [`LSystem`](crate::LSystem). It is
//! split into focused submodules under `src/engine/`; the host-facing state
//! machine lives in `api.rs` and only drives what is defined here.
//!
//! ## How the parts work together
//!
//! ```text
//! rules ──── RuleTable::new              (compiled_rules.rs)
//!              - validate directions / probabilities
//!              - cumulative thresholds
//!              - (symbol, arity) buckets, ranked
//!                       │
//! forest ── TreeCursor ─┼─ Rewrite::step (rewrite.rs)
//! (gen n)  (cursor.rs)  │    - Enter/Exit   -> output frames
//!                       │    - "!"          -> dropped
//!                       │    - module       -> RuleTable::successors
//!                       │                       match_rule (context via cursor)
//!                       │                       Chance draw if stochastic
//!                       v
//!                  forest (gen n + 1) ── Render::step (render.rs)
//!                                          - action(symbol)(args)
//! ```
//!
//! Every pass and render is resumable: its state holds a [`TreeCursor`] that
//! is re-attached to the forest on each step, so the host can interleave
//! other work between steps.
//!
//! ## Responsibilities by module
//!
//! - `cursor.rs`: depth-first traversal plus context navigation.
//! - `compiled_rules.rs`: validation, ranking, matching and successor choice.
//! - `rewrite.rs`: one generation pass, one element per step.
//! - `render.rs`: action dispatch, one element per step.
//! - `metrics.rs`: pass and render statistics.
//!
//! ## Debugging
//!
//! Rule firings and verbatim copies are emitted as `tracing` events at `trace`
//! level; pass boundaries at `debug`.

#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/cursor.rs"]
mod cursor;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/render.rs"]
mod render;
#[path = "engine/rewrite.rs"]
mod rewrite;


pub use compiled_rules::{BucketKey, Chance, CompiledRule, RuleMeta, RuleShape, RuleTable};
pub use cursor::{Axis, Cursor, Direction, TreeCursor, Visit};
pub use metrics::{PassMetrics, RenderMetrics};
pub use render::{Action, Actions};
pub(crate) use render::Render;
pub(crate) use rewrite::Rewrite;
