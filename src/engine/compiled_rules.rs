//! Rule compilation, indexing and matching.
//!
//! This module holds the *static* side of the engine: the structures derived
//! from the raw rule list once, up front, so that a generation pass only does
//! lookups.
//!
//! Compilation ([`RuleTable::new`]):
//!
//! 1. Validate direction placement: the strict predecessor has none, every
//!    context predecessor has exactly one.
//! 2. Parse direction tags into [`Direction`] (never re-parsed at match time).
//! 3. Check that successor probabilities sum to exactly `1.0` and turn them
//!    into cumulative thresholds.
//! 4. Bucket by `(symbol, arity)` of the strict predecessor and order each
//!    bucket by rank (see below), keeping declaration order on ties.
//!
//! ```text
//! rank = 1000 × has_condition + number_of_predecessors
//!
//! ("F", 0) -> [ r3 (1002), r0 (2), r1 (1) ]
//! ("A", 1) -> [ r2 (1001) ]
//! ```
//!
//! ## Invariants
//!
//! - The first rule in a bucket whose whole chain and condition match wins.
//!   A failing context predecessor discards that rule only; lookup moves on to
//!   the next rule in the bucket.
//! - The last threshold of every rule is exactly `1.0`, so any draw in
//!   `[0, 1)` selects a successor.

use super::cursor::{Cursor, Direction};
use crate::{ConfigurationError, Condition, Forest, Module, Production, Rule, Symbol};
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Uniform draws in `[0, 1)` used to pick among weighted successors.
///
/// Implemented for the `rand` generators the engine uses; tests and hosts can
/// plug in their own source.
pub trait Chance {
    fn draw(&mut self) -> f64;
}

impl Chance for rand::rngs::StdRng {
    fn draw(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

impl Chance for rand::rngs::ThreadRng {
    fn draw(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

bitflags::bitflags! {
    /// Coarse classification of a compiled rule, for reports and traces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuleShape: u8 {
        /// Has a condition.
        const CONDITIONAL = 1 << 0;
        /// Has context predecessors.
        const CONTEXTUAL  = 1 << 1;
        /// Has more than one successor.
        const STOCHASTIC  = 1 << 2;
    }
}

/// Bucket key: symbol and arity of the strict predecessor.
pub type BucketKey = (Symbol, usize);

#[derive(Debug, Clone)]
struct CompiledPredecessor {
    symbol: Symbol,
    arity: usize,
    direction: Option<Direction>,
}

impl CompiledPredecessor {
    fn matches<V>(&self, module: &Module<V>) -> bool {
        self.symbol == module.id && self.arity == module.arity()
    }
}

struct Threshold<V> {
    /// Running sum of probabilities up to and including this successor.
    cumulative: f64,
    production: Production<V>,
}

/// A validated rule, ready for matching.
pub struct CompiledRule<V> {
    index: usize,
    predecessors: Vec<CompiledPredecessor>,
    condition: Option<Condition<V>>,
    successors: Vec<Threshold<V>>,
    shape: RuleShape,
}

impl<V> CompiledRule<V> {
    fn compile(index: usize, rule: Rule<V>) -> Result<Self, ConfigurationError> {
        let Rule { predecessors, condition, successors } = rule;
        if predecessors.is_empty() {
            return Err(ConfigurationError::EmptyPredecessors { rule: index });
        }

        let mut compiled = Vec::with_capacity(predecessors.len());
        for (position, predecessor) in predecessors.into_iter().enumerate() {
            let direction = match (position, predecessor.direction) {
                (0, None) => None,
                (0, Some(_)) => {
                    return Err(ConfigurationError::DirectedStrictPredecessor {
                        rule: index,
                        symbol: predecessor.symbol,
                    });
                }
                (_, None) => {
                    return Err(ConfigurationError::UndirectedContextPredecessor {
                        rule: index,
                        position,
                        symbol: predecessor.symbol,
                    });
                }
                (_, Some(tag)) => match Direction::parse(&tag) {
                    Some(direction) => Some(direction),
                    None => return Err(ConfigurationError::InvalidDirection { rule: index, direction: tag }),
                },
            };
            compiled.push(CompiledPredecessor { symbol: predecessor.symbol, arity: predecessor.arity, direction });
        }

        if successors.is_empty() {
            return Err(ConfigurationError::EmptySuccessors { rule: index });
        }
        let mut running = 0.0_f64;
        let mut thresholds = Vec::with_capacity(successors.len());
        for successor in successors {
            if !(0.0..=1.0).contains(&successor.probability) {
                return Err(ConfigurationError::InvalidProbability { rule: index, probability: successor.probability });
            }
            running += successor.probability;
            thresholds.push(Threshold { cumulative: running, production: successor.production });
        }
        if running != 1.0 {
            return Err(ConfigurationError::ProbabilitySum { rule: index, sum: running });
        }

        let mut shape = RuleShape::empty();
        if condition.is_some() {
            shape |= RuleShape::CONDITIONAL;
        }
        if compiled.len() > 1 {
            shape |= RuleShape::CONTEXTUAL;
        }
        if thresholds.len() > 1 {
            shape |= RuleShape::STOCHASTIC;
        }

        Ok(CompiledRule { index, predecessors: compiled, condition, successors: thresholds, shape })
    }

    /// Position of the rule in the list it was compiled from.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Specificity: conditions weigh 1000, each predecessor 1.
    pub fn rank(&self) -> usize {
        let conditional = if self.condition.is_some() { 1000 } else { 0 };
        conditional + self.predecessors.len()
    }

    pub fn shape(&self) -> RuleShape {
        self.shape
    }

    fn key(&self) -> BucketKey {
        let strict = &self.predecessors[0];
        (strict.symbol.clone(), strict.arity)
    }
}

impl<V> fmt::Debug for CompiledRule<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("index", &self.index)
            .field("predecessors", &self.predecessors)
            .field("condition", &self.condition.as_ref().map(|_| "<function>"))
            .field("thresholds", &self.successors.iter().map(|s| s.cumulative).collect::<Vec<_>>())
            .field("shape", &self.shape)
            .finish()
    }
}

/// Per-rule summary for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMeta {
    pub index: usize,
    pub rank: usize,
    pub predecessors: usize,
    pub successors: usize,
    pub shape: RuleShape,
}

/// Compiled, bucketed and ranked rule set.
pub struct RuleTable<V> {
    buckets: HashMap<BucketKey, Vec<CompiledRule<V>>>,
    len: usize,
}

impl<V> RuleTable<V> {
    /// Validate and index `rules`. Fails on the first invalid rule.
    pub fn new(rules: Vec<Rule<V>>) -> Result<Self, ConfigurationError> {
        let len = rules.len();
        let mut buckets: HashMap<BucketKey, Vec<CompiledRule<V>>> = HashMap::new();
        for (index, rule) in rules.into_iter().enumerate() {
            let compiled = CompiledRule::compile(index, rule)?;
            buckets.entry(compiled.key()).or_default().push(compiled);
        }
        for bucket in buckets.values_mut() {
            // Stable: equal ranks keep declaration order.
            bucket.sort_by_key(|rule| Reverse(rule.rank()));
        }
        Ok(RuleTable { buckets, len })
    }

    pub fn empty() -> Self {
        RuleTable { buckets: HashMap::new(), len: 0 }
    }

    /// Number of rules compiled into the table.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Candidate rules for `(symbol, arity)`, highest rank first.
    pub fn bucket(&self, symbol: &Symbol, arity: usize) -> Option<&[CompiledRule<V>]> {
        self.buckets.get(&(symbol.clone(), arity)).map(Vec::as_slice)
    }

    /// Bucket summaries sorted by key.
    pub fn metas(&self) -> Vec<(BucketKey, Vec<RuleMeta>)> {
        let mut out: Vec<(BucketKey, Vec<RuleMeta>)> = self
            .buckets
            .iter()
            .map(|(key, rules)| {
                let metas = rules
                    .iter()
                    .map(|rule| RuleMeta {
                        index: rule.index,
                        rank: rule.rank(),
                        predecessors: rule.predecessors.len(),
                        successors: rule.successors.len(),
                        shape: rule.shape,
                    })
                    .collect();
                (key.clone(), metas)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<V: Clone> RuleTable<V> {
    /// Try `rule` against `module`, the module `cursor` just produced.
    ///
    /// Returns the flat argument list (arguments of every matched predecessor,
    /// in predecessor order) when the whole chain and the condition match.
    pub fn match_rule(&self, rule: &CompiledRule<V>, module: &Module<V>, cursor: &mut Cursor<'_, '_, V>) -> Option<Vec<V>> {
        cursor.reset_context();
        let mut args = Vec::new();
        for predecessor in &rule.predecessors {
            let candidate = match predecessor.direction {
                None => module,
                Some(direction) => cursor.navigate(direction)?,
            };
            if !predecessor.matches(candidate) {
                return None;
            }
            args.extend(candidate.args.iter().cloned());
        }
        if let Some(condition) = &rule.condition {
            if !condition(args.as_slice()) {
                return None;
            }
        }
        Some(args)
    }

    /// Replacement for `module`, or `Ok(None)` when no rule applies and the
    /// module should be copied as is.
    pub fn successors(
        &self,
        module: &Module<V>,
        cursor: &mut Cursor<'_, '_, V>,
        chance: &mut dyn Chance,
    ) -> Result<Option<Forest<V>>, ConfigurationError> {
        let Some(bucket) = self.bucket(&module.id, module.arity()) else {
            return Ok(None);
        };
        for rule in bucket {
            let Some(args) = self.match_rule(rule, module, cursor) else {
                continue;
            };
            let production = match rule.successors.as_slice() {
                [only] => &only.production,
                several => {
                    let draw = chance.draw();
                    match several.iter().find(|successor| draw < successor.cumulative) {
                        Some(successor) => &successor.production,
                        None => return Err(ConfigurationError::InconsistentThresholds { rule: rule.index, draw }),
                    }
                }
            };
            trace!(rule = rule.index, symbol = %module.id, shape = ?rule.shape, "rule fired");
            return Ok(Some(production(args.as_slice())));
        }
        Ok(None)
    }
}

impl<V> fmt::Debug for RuleTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTable").field("len", &self.len).field("buckets", &self.buckets).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cursor::{TreeCursor, Visit};
    use crate::{Predecessor, Rule};
    use std::collections::HashSet;

    /// Replays a fixed list of draws.
    struct Scripted(Vec<f64>);

    impl Chance for Scripted {
        fn draw(&mut self) -> f64 {
            self.0.remove(0)
        }
    }

    fn leaf(id: &'static str) -> impl Fn(&[f64]) -> Forest<f64> + Send + Sync {
        move |_: &[f64]| forest![module!(id)]
    }

    fn rewrite_first(table: &RuleTable<f64>, forest: &Forest<f64>, chance: &mut dyn Chance) -> Option<Forest<f64>> {
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(forest, &ignore);
        let Visit::Module(module) = cursor.next() else { panic!("forest must start with a module") };
        table.successors(module, &mut cursor, chance).unwrap()
    }

    #[test]
    fn rejects_directed_strict_predecessor() {
        let rules = vec![
            Rule::new(Predecessor::new("A")).produce(leaf("A")),
            Rule::new(Predecessor::new("B").toward("<")).produce(leaf("B")),
        ];
        let err = RuleTable::<f64>::new(rules).unwrap_err();
        assert_eq!(err, ConfigurationError::DirectedStrictPredecessor { rule: 1, symbol: Symbol::from("B") });
    }

    #[test]
    fn rejects_undirected_context_predecessor() {
        let rules = vec![Rule::new(Predecessor::new("A")).context(Predecessor::new("B")).produce(leaf("A"))];
        let err = RuleTable::<f64>::new(rules).unwrap_err();
        assert!(matches!(err, ConfigurationError::UndirectedContextPredecessor { rule: 0, position: 1, .. }));
        assert!(err.to_string().contains("must specify a direction"));
    }

    #[test]
    fn rejects_unknown_direction_tag() {
        let rules = vec![Rule::new(Predecessor::new("A")).context(Predecessor::new("B").toward("v")).produce(leaf("A"))];
        let err = RuleTable::<f64>::new(rules).unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidDirection { rule: 0, direction: "v".to_string() });
    }

    #[test]
    fn rejects_missing_successors() {
        let rules = vec![Rule::<f64>::new(Predecessor::new("A"))];
        assert_eq!(RuleTable::new(rules).unwrap_err(), ConfigurationError::EmptySuccessors { rule: 0 });
        let rules = vec![Rule::<f64> { predecessors: Vec::new(), condition: None, successors: Vec::new() }];
        assert_eq!(RuleTable::new(rules).unwrap_err(), ConfigurationError::EmptyPredecessors { rule: 0 });
    }

    #[test]
    fn probabilities_must_sum_to_exactly_one() {
        for bad in [[0.49, 0.5], [0.51, 0.5]] {
            let rules = vec![Rule::new(Predecessor::new("A")).weighted(bad[0], leaf("B")).weighted(bad[1], leaf("C"))];
            let err = RuleTable::<f64>::new(rules).unwrap_err();
            assert!(matches!(err, ConfigurationError::ProbabilitySum { rule: 0, .. }), "{err}");
        }

        let exact: [&[f64]; 4] = [&[1.0], &[0.5, 0.5], &[0.25, 0.25, 0.5], &[0.125; 8]];
        for weights in exact {
            let mut rule = Rule::new(Predecessor::new("A"));
            for &w in weights {
                rule = rule.weighted(w, leaf("B"));
            }
            assert!(RuleTable::<f64>::new(vec![rule]).is_ok(), "{weights:?}");
        }
    }

    #[test]
    fn rejects_negative_probability() {
        let rules = vec![Rule::new(Predecessor::new("A")).weighted(1.5, leaf("B")).weighted(-0.5, leaf("C"))];
        let err = RuleTable::<f64>::new(rules).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidProbability { rule: 0, .. }));
    }

    #[test]
    fn buckets_rank_conditions_then_context_then_declaration() {
        let rules = vec![
            Rule::new(Predecessor::new("F")).produce(leaf("plain-a")),
            Rule::new(Predecessor::new("F")).context(Predecessor::new("G").toward("<")).produce(leaf("ctx")),
            Rule::new(Predecessor::new("F")).produce(leaf("plain-b")),
            Rule::new(Predecessor::new("F")).when(|_| true).produce(leaf("cond")),
            Rule::new(Predecessor::new("F").arity(1)).produce(leaf("unary")),
        ];
        let table = RuleTable::<f64>::new(rules).unwrap();
        assert_eq!(table.len(), 5);

        let order: Vec<usize> = table.bucket(&Symbol::from("F"), 0).unwrap().iter().map(|r| r.index()).collect();
        assert_eq!(order, vec![3, 1, 0, 2]);
        assert_eq!(table.bucket(&Symbol::from("F"), 1).unwrap().len(), 1);
        assert!(table.bucket(&Symbol::from("G"), 0).is_none());

        let metas = table.metas();
        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].1[0].rank, 1001);
        assert!(metas[0].1[0].shape.contains(RuleShape::CONDITIONAL));
        assert!(metas[0].1[1].shape.contains(RuleShape::CONTEXTUAL));
    }

    #[test]
    fn stochastic_selection_follows_thresholds() {
        let rules = vec![
            Rule::new(Predecessor::new("A"))
                .weighted(0.25, leaf("B"))
                .weighted(0.5, leaf("C"))
                .weighted(0.25, leaf("D")),
        ];
        let table = RuleTable::<f64>::new(rules).unwrap();
        let forest = forest![module!("A")];

        // Thresholds are 0.25, 0.75, 1.0; a draw equal to a threshold moves on.
        let draws = [0.0, 0.1, 0.25, 0.5, 0.74, 0.75, 0.9, 0.999];
        let expected = ["B", "B", "C", "C", "C", "D", "D", "D"];
        let mut chance = Scripted(draws.to_vec());
        for want in expected {
            let got = rewrite_first(&table, &forest, &mut chance).unwrap();
            assert_eq!(got, forest![module!(want)]);
        }
    }

    #[test]
    fn single_successor_does_not_draw() {
        let table = RuleTable::<f64>::new(vec![Rule::new(Predecessor::new("A")).produce(leaf("B"))]).unwrap();
        let mut chance = Scripted(Vec::new());
        let got = rewrite_first(&table, &forest![module!("A")], &mut chance);
        assert_eq!(got, Some(forest![module!("B")]));
    }

    #[test]
    fn condition_sees_flat_arguments_in_predecessor_order() {
        let rules = vec![
            Rule::new(Predecessor::new("A").arity(2))
                .context(Predecessor::new("B").arity(1).toward(">"))
                .when(|args: &[f64]| args == [1.0, 2.0, 3.0])
                .produce(|args: &[f64]| forest![module!("S"; args.iter().sum::<f64>())]),
        ];
        let table = RuleTable::<f64>::new(rules).unwrap();
        let mut chance = Scripted(Vec::new());

        let forest = forest![module!("A"; 1.0, 2.0), module!("B"; 3.0)];
        assert_eq!(rewrite_first(&table, &forest, &mut chance), Some(forest![module!("S"; 6.0)]));

        let failing = forest![module!("A"; 1.0, 2.0), module!("B"; 4.0)];
        assert_eq!(rewrite_first(&table, &failing, &mut chance), None);

        // Arity mismatch on the context predecessor.
        let wrong_arity = forest![module!("A"; 1.0, 2.0), module!("B"; 3.0, 0.0)];
        assert_eq!(rewrite_first(&table, &wrong_arity, &mut chance), None);
    }

    #[test]
    fn failed_context_falls_through_to_weaker_rule() {
        let rules = vec![
            Rule::new(Predecessor::new("A")).produce(leaf("plain")),
            Rule::new(Predecessor::new("A")).context(Predecessor::new("X").toward(">")).produce(leaf("ctx")),
        ];
        let table = RuleTable::<f64>::new(rules).unwrap();
        let mut chance = Scripted(Vec::new());
        assert_eq!(
            rewrite_first(&table, &forest![module!("A"), module!("X")], &mut chance),
            Some(forest![module!("ctx")])
        );
        assert_eq!(
            rewrite_first(&table, &forest![module!("A"), module!("Y")], &mut chance),
            Some(forest![module!("plain")])
        );
    }
}
