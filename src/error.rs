//! Configuration errors raised while compiling a grammar.

use crate::Symbol;

/// A grammar that cannot be used.
///
/// Every variant except [`ConfigurationError::InconsistentThresholds`] is
/// reported by [`RuleTable::new`](crate::RuleTable::new) or
/// [`LSystem::new`](crate::LSystem::new); `rule` is the rule's position in the
/// list that was handed in.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("rule {rule}: has no predecessors")]
    EmptyPredecessors { rule: usize },

    #[error("rule {rule}: strict predecessor `{symbol}` must not specify a direction")]
    DirectedStrictPredecessor { rule: usize, symbol: Symbol },

    #[error("rule {rule}: context predecessor {position} (`{symbol}`) must specify a direction")]
    UndirectedContextPredecessor { rule: usize, position: usize, symbol: Symbol },

    #[error("rule {rule}: invalid direction `{direction}`")]
    InvalidDirection { rule: usize, direction: String },

    #[error("rule {rule}: has no successors")]
    EmptySuccessors { rule: usize },

    #[error("rule {rule}: successor probability {probability} is outside [0, 1]")]
    InvalidProbability { rule: usize, probability: f64 },

    #[error("rule {rule}: successor probabilities sum to {sum}, expected exactly 1")]
    ProbabilitySum { rule: usize, sum: f64 },

    #[error("rule {rule}: no successor threshold exceeds draw {draw}")]
    InconsistentThresholds { rule: usize, draw: f64 },

    #[error("axiom must contain at least one element")]
    EmptyAxiom,
}
