//! Built-in grammars for the demo binary.

use lindenmayer::{Forest, Predecessor, Rule, branch, forest, module};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Everything needed to build an [`LSystem`](lindenmayer::LSystem) for one demo.
pub struct Grammar {
    pub axiom: Forest<f64>,
    pub rules: Vec<Rule<f64>>,
    /// Symbols skipped by context predecessors.
    pub ignore: &'static [&'static str],
}

pub struct Demo {
    pub summary: &'static str,
    pub generations: usize,
    pub build: fn() -> Grammar,
}

pub static CATALOG: Lazy<BTreeMap<&'static str, Demo>> = Lazy::new(|| {
    let mut catalog = BTreeMap::new();
    catalog.insert("koch", Demo { summary: "quadratic Koch island", generations: 3, build: koch });
    catalog.insert("signal", Demo { summary: "context-sensitive signal propagation", generations: 30, build: signal });
    catalog.insert("weed", Demo { summary: "stochastic branching weed", generations: 5, build: weed });
    catalog.insert("growth", Demo { summary: "parametric apex growth with a guard", generations: 6, build: growth });
    catalog
});

pub fn lookup(name: &str) -> Option<&'static Demo> {
    CATALOG.get(name)
}

fn symbols(ids: &[&str]) -> Forest<f64> {
    ids.iter().map(|&id| module!(id)).collect()
}

fn koch() -> Grammar {
    Grammar {
        axiom: symbols(&["F", "-", "F", "-", "F", "-", "F"]),
        rules: vec![
            Rule::new(Predecessor::new("F"))
                .produce(|_: &[f64]| symbols(&["F", "F", "-", "F", "-", "-", "F", "-", "F"])),
        ],
        ignore: &[],
    }
}

/// Binary signal travelling along a branching structure. Every `0`/`1`
/// looks at its left neighbor (or parent) and its right sibling; turtle
/// symbols are invisible to the match.
fn signal() -> Grammar {
    fn keyed(strict: &str, left: &str, right: &str, production: fn(&[f64]) -> Forest<f64>) -> Rule<f64> {
        Rule::new(Predecessor::new(strict))
            .context(Predecessor::new(left).toward("^"))
            .context(Predecessor::new(right).toward(".>"))
            .produce(production)
    }

    Grammar {
        axiom: symbols(&["F", "1", "F", "1", "F", "1"]),
        rules: vec![
            keyed("0", "0", "0", |_| symbols(&["0"])),
            keyed("0", "0", "1", |_| {
                forest![module!("1"), branch![module!("-"), module!("F"), module!("1"), module!("F"), module!("1")]]
            }),
            keyed("1", "0", "0", |_| symbols(&["1"])),
            keyed("1", "0", "1", |_| symbols(&["1"])),
            keyed("0", "1", "0", |_| symbols(&["0"])),
            keyed("0", "1", "1", |_| symbols(&["1", "F", "1"])),
            keyed("1", "1", "0", |_| symbols(&["1"])),
            keyed("1", "1", "1", |_| symbols(&["0"])),
            Rule::new(Predecessor::new("+")).produce(|_: &[f64]| symbols(&["-"])),
            Rule::new(Predecessor::new("-")).produce(|_: &[f64]| symbols(&["+"])),
        ],
        ignore: &["F", "+", "-"],
    }
}

fn weed() -> Grammar {
    Grammar {
        axiom: symbols(&["F"]),
        rules: vec![
            Rule::new(Predecessor::new("F"))
                .weighted(0.25, |_: &[f64]| {
                    forest![
                        module!("F"),
                        branch![module!("+"), module!("F")],
                        module!("F"),
                        branch![module!("-"), module!("F")],
                        module!("F")
                    ]
                })
                .weighted(0.25, |_: &[f64]| forest![module!("F"), branch![module!("+"), module!("F")], module!("F")])
                .weighted(0.5, |_: &[f64]| forest![module!("F"), branch![module!("-"), module!("F")], module!("F")]),
        ],
        ignore: &[],
    }
}

/// `A(len)` keeps extending while short, then flowers; side shoots are cut
/// with the inert `!` once they get old.
fn growth() -> Grammar {
    Grammar {
        axiom: forest![module!("A"; 1.0)],
        rules: vec![
            Rule::new(Predecessor::new("A").arity(1))
                .when(|args: &[f64]| args[0] < 5.0)
                .produce(|args: &[f64]| {
                    forest![
                        module!("F"; args[0]),
                        branch![module!("+"), module!("S"; 0.0)],
                        module!("A"; args[0] + 1.0)
                    ]
                }),
            Rule::new(Predecessor::new("A").arity(1)).produce(|_: &[f64]| forest![module!("K")]),
            Rule::new(Predecessor::new("S").arity(1))
                .when(|args: &[f64]| args[0] >= 2.0)
                .produce(|_: &[f64]| forest![module!("!")]),
            Rule::new(Predecessor::new("S").arity(1)).produce(|args: &[f64]| forest![module!("S"; args[0] + 1.0)]),
        ],
        ignore: &[],
    }
}
