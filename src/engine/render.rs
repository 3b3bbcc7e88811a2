//! Render walk.
//!
//! Depth-first walk over a finished generation that hands each visit to the
//! host: branch markers are looked up as `"["` and `"]"`, modules by their
//! symbol. A symbol without an action is skipped.

use super::cursor::{TreeCursor, Visit};
use super::metrics::RenderMetrics;
use crate::{Forest, Symbol};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Host callback for one symbol. Receives the module's arguments, or an empty
/// slice for branch markers and argument-less modules.
pub type Action<V> = Box<dyn FnMut(&[V])>;

/// Actions keyed by the symbol they handle.
pub type Actions<V> = HashMap<Symbol, Action<V>>;

/// In-progress render walk.
#[derive(Debug)]
pub(crate) struct Render {
    cursor: TreeCursor,
    metrics: RenderMetrics,
    started: Instant,
}

impl Render {
    pub(crate) fn begin() -> Self {
        Render { cursor: TreeCursor::new(), metrics: RenderMetrics::default(), started: Instant::now() }
    }

    pub(crate) fn has_next<V>(&self, forest: &Forest<V>) -> bool {
        self.cursor.has_next(forest)
    }

    /// Visit one element. Panics if the walk is already exhausted.
    pub(crate) fn step<V>(&mut self, forest: &Forest<V>, ignore: &HashSet<Symbol>, actions: &mut Actions<V>) {
        let mut cursor = self.cursor.over(forest, ignore);
        let visit = cursor.next();
        self.metrics.visited += 1;
        let Some(action) = actions.get_mut(visit.symbol()) else {
            return;
        };
        self.metrics.invoked += 1;
        match visit {
            Visit::Module(module) => action(module.args.as_slice()),
            Visit::Enter | Visit::Exit => action(&[]),
        }
    }

    pub(crate) fn finish(self) -> RenderMetrics {
        RenderMetrics { duration: self.started.elapsed(), ..self.metrics }
    }
}
