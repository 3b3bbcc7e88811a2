extern crate self as lindenmayer;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;

pub use api::{DumpStyle, LSystem, Options};
pub use engine::{
    Action, Actions, Axis, BucketKey, Chance, CompiledRule, Cursor, Direction, PassMetrics, RenderMetrics, RuleMeta,
    RuleShape, RuleTable, TreeCursor, Visit,
};
pub use error::ConfigurationError;

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

// --- Reserved symbols --------------------------------------------------------

/// Opens a branch when written as an explicit module.
pub const BRANCH_OPEN: &str = "[";
/// Closes a branch when written as an explicit module.
pub const BRANCH_CLOSE: &str = "]";
/// Inert module: never matched by a rule and never copied into the next generation.
pub const INERT: &str = "!";

// --- Module model ------------------------------------------------------------

/// Opaque symbol identifier. Cheap to clone; compares and hashes like its text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(text: impl AsRef<str>) -> Self {
        Symbol(Arc::from(text.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(text: &str) -> Self {
        Symbol::new(text)
    }
}

impl From<String> for Symbol {
    fn from(text: String) -> Self {
        Symbol(Arc::from(text))
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A symbol plus its ordered argument values.
///
/// The engine only ever looks at `args.len()` (the arity); the values
/// themselves are handed through untouched to conditions, productions and
/// render actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Module<V> {
    pub id: Symbol,
    pub args: Vec<V>,
}

impl<V> Module<V> {
    /// A module without arguments.
    pub fn new(id: impl Into<Symbol>) -> Self {
        Module { id: id.into(), args: Vec::new() }
    }

    pub fn with_args(id: impl Into<Symbol>, args: Vec<V>) -> Self {
        Module { id: id.into(), args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_inert(&self) -> bool {
        self.id == INERT
    }
}

/// One slot of a [`Forest`]: a module, or a nested branch.
///
/// A `Branch` directly following a module is a branch rooted at that module.
/// Branches may also be spelled with explicit `"["`/`"]"` leaves; those stay
/// ordinary modules to the rewrite engine and are only visible to context
/// matching as siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum Element<V> {
    Leaf(Module<V>),
    Branch(Forest<V>),
}

impl<V> From<Module<V>> for Element<V> {
    fn from(module: Module<V>) -> Self {
        Element::Leaf(module)
    }
}

/// An ordered sequence of modules and branches: one generation.
pub type Forest<V> = Vec<Element<V>>;

/// Number of traversal steps needed to walk `forest`: one per module, plus
/// two per branch for its enter/exit markers.
pub fn count_elements<V>(forest: &[Element<V>]) -> usize {
    forest
        .iter()
        .map(|element| match element {
            Element::Leaf(_) => 1,
            Element::Branch(sub) => count_elements(sub) + 2,
        })
        .sum()
}

// --- Rules -------------------------------------------------------------------

/// Boolean guard over the flat argument list gathered from the matched predecessors.
pub type Condition<V> = Box<dyn Fn(&[V]) -> bool + Send + Sync>;

/// Successor body: receives the flat argument list, returns the replacement fragment.
pub type Production<V> = Box<dyn Fn(&[V]) -> Forest<V> + Send + Sync>;

/// One item of a rule's left-hand side.
///
/// The first predecessor of a rule (the strict predecessor) is matched against
/// the module being rewritten and must not carry a direction. Every later
/// predecessor is a context predecessor and must carry one of `^ < > [ ]`,
/// optionally prefixed with `.` to restart navigation from the strict
/// predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predecessor {
    pub symbol: Symbol,
    pub arity: usize,
    pub direction: Option<String>,
}

impl Predecessor {
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Predecessor { symbol: symbol.into(), arity: 0, direction: None }
    }

    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    /// Tag this predecessor with a direction such as `"^"` or `".>"`.
    pub fn toward(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }
}

/// A weighted successor. Weights of one rule must add up to exactly `1.0`.
pub struct Successor<V> {
    pub probability: f64,
    pub production: Production<V>,
}

impl<V> fmt::Debug for Successor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Successor")
            .field("probability", &self.probability)
            .field("production", &"<function>")
            .finish()
    }
}

/// A production rule: predecessors, an optional condition, and one or more
/// successors.
///
/// The builder methods cover the usual shorthand: [`Rule::new`] takes the
/// single strict predecessor, [`Rule::produce`] adds a lone successor with
/// probability `1.0`.
///
/// ```
/// use lindenmayer::{Module, Predecessor, Rule};
///
/// let rule: Rule<f64> = Rule::new(Predecessor::new("A").arity(1))
///     .when(|args| args[0] < 3.0)
///     .produce(|args| vec![Module::with_args("A", vec![args[0] + 1.0]).into()]);
/// assert_eq!(rule.predecessors.len(), 1);
/// ```
pub struct Rule<V> {
    pub predecessors: Vec<Predecessor>,
    pub condition: Option<Condition<V>>,
    pub successors: Vec<Successor<V>>,
}

impl<V> Rule<V> {
    pub fn new(strict: Predecessor) -> Self {
        Rule { predecessors: vec![strict], condition: None, successors: Vec::new() }
    }

    /// Append a context predecessor. It must carry a direction.
    pub fn context(mut self, predecessor: Predecessor) -> Self {
        self.predecessors.push(predecessor);
        self
    }

    pub fn when(mut self, condition: impl Fn(&[V]) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Single deterministic successor.
    pub fn produce(self, production: impl Fn(&[V]) -> Forest<V> + Send + Sync + 'static) -> Self {
        self.weighted(1.0, production)
    }

    /// Add one stochastic successor chosen with `probability`.
    pub fn weighted(
        mut self,
        probability: f64,
        production: impl Fn(&[V]) -> Forest<V> + Send + Sync + 'static,
    ) -> Self {
        self.successors.push(Successor { probability, production: Box::new(production) });
        self
    }
}

impl<V> fmt::Debug for Rule<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("predecessors", &self.predecessors)
            .field("condition", &self.condition.as_ref().map(|_| "<function>"))
            .field("successors", &self.successors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn symbol_lookup_by_str() {
        let mut map: HashMap<Symbol, u8> = HashMap::new();
        map.insert(Symbol::from("F"), 1);
        assert_eq!(map.get("F"), Some(&1));
        assert!(Symbol::from("[") == BRANCH_OPEN);
    }

    #[test]
    fn module_arity_and_inert() {
        let m: Module<i32> = Module::with_args("X", vec![1, 2, 3]);
        assert_eq!(m.arity(), 3);
        assert!(!m.is_inert());
        assert!(Module::<i32>::new(INERT).is_inert());
    }

    #[test]
    fn count_elements_counts_branch_markers() {
        let forest: Forest<()> = forest![module!("A"), branch![module!("B"), branch![module!("C")]], module!("D")];
        // A, [, B, [, C, ], ], D
        assert_eq!(count_elements(&forest), 8);
        assert_eq!(count_elements::<()>(&[]), 0);
    }

    #[test]
    fn rule_builder_normalizes_shorthand() {
        let rule: Rule<f64> = Rule::new(Predecessor::new("F"))
            .context(Predecessor::new("G").toward("<"))
            .produce(|_| forest![module!("F")]);
        assert_eq!(rule.predecessors.len(), 2);
        assert_eq!(rule.successors.len(), 1);
        assert_eq!(rule.successors[0].probability, 1.0);
        assert_eq!(rule.predecessors[1].direction.as_deref(), Some("<"));
    }
}
