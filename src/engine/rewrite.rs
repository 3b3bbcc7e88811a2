//! One generation pass.
//!
//! A [`Rewrite`] is the parked state of a pass: the traversal position over
//! the current forest plus the partially built next generation. The engine
//! owns it between chunked steps; every [`Rewrite::step`] re-borrows the
//! forest it walks.
//!
//! ```text
//! current:  A  [  B  ]  !  C
//!           │  │  │  │  │  └─ no rule      -> copy
//!           │  │  │  │  └──── inert        -> drop
//!           │  │  │  └─────── Exit         -> pop frame, append as Branch
//!           │  │  └────────── rule fires   -> extend with production
//!           │  └───────────── Enter        -> push empty frame
//!           └──────────────── ...
//! stack:    [ out ] [ out, branch ] ...
//! ```

use super::compiled_rules::{Chance, RuleTable};
use super::cursor::{TreeCursor, Visit};
use super::metrics::PassMetrics;
use crate::{ConfigurationError, Element, Forest, Symbol, count_elements};
use std::collections::HashSet;
use std::time::Instant;
use tracing::trace;

/// In-progress generation pass.
#[derive(Debug)]
pub(crate) struct Rewrite<V> {
    cursor: TreeCursor,
    /// Output frames; the last one receives appended elements.
    stack: Vec<Forest<V>>,
    metrics: PassMetrics,
    started: Instant,
}

/// Frame that receives output. The stack is never empty while a pass runs.
fn top<V>(stack: &mut Vec<Forest<V>>) -> &mut Forest<V> {
    if stack.is_empty() {
        stack.push(Vec::new());
    }
    let last = stack.len() - 1;
    &mut stack[last]
}

impl<V: Clone> Rewrite<V> {
    pub(crate) fn begin() -> Self {
        Rewrite {
            cursor: TreeCursor::new(),
            stack: vec![Vec::new()],
            metrics: PassMetrics::default(),
            started: Instant::now(),
        }
    }

    pub(crate) fn has_next(&self, forest: &Forest<V>) -> bool {
        self.cursor.has_next(forest)
    }

    /// Consume one traversal step of `forest`.
    ///
    /// Panics if the traversal is already exhausted.
    pub(crate) fn step(
        &mut self,
        forest: &Forest<V>,
        ignore: &HashSet<Symbol>,
        rules: &RuleTable<V>,
        chance: &mut dyn Chance,
    ) -> Result<(), ConfigurationError> {
        let mut cursor = self.cursor.over(forest, ignore);
        self.metrics.visited += 1;
        match cursor.next() {
            Visit::Enter => self.stack.push(Vec::new()),
            Visit::Exit => {
                let branch = self.stack.pop().unwrap_or_default();
                self.metrics.module_count += 2;
                top(&mut self.stack).push(Element::Branch(branch));
            }
            Visit::Module(module) if module.is_inert() => self.metrics.dropped += 1,
            Visit::Module(module) => match rules.successors(module, &mut cursor, chance)? {
                Some(production) => {
                    self.metrics.rewritten += 1;
                    self.metrics.module_count += count_elements(&production);
                    top(&mut self.stack).extend(production);
                }
                None => {
                    trace!(symbol = %module.id, arity = module.arity(), "copied");
                    self.metrics.copied += 1;
                    self.metrics.module_count += 1;
                    top(&mut self.stack).push(Element::Leaf(module.clone()));
                }
            },
        }
        Ok(())
    }

    /// Close the pass, yielding the next generation and its metrics.
    pub(crate) fn finish(self, generation: u64) -> (Forest<V>, PassMetrics) {
        let Rewrite { mut stack, mut metrics, started, .. } = self;
        stack.truncate(1);
        let forest = stack.pop().unwrap_or_default();
        metrics.generation = generation;
        metrics.duration = started.elapsed();
        (forest, metrics)
    }
}
