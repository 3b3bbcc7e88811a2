use crate::engine::{Actions, Chance, PassMetrics, Render, RenderMetrics, Rewrite, RuleTable, TreeCursor, Visit};
use crate::{BRANCH_CLOSE, BRANCH_OPEN, ConfigurationError, Forest, Rule, Symbol, count_elements};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Construction options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Seed for stochastic successor choice. `None` draws from the thread-local
    /// generator, so stochastic runs differ from one another.
    pub seed: Option<u64>,
    /// Symbols skipped when looking up context predecessors.
    pub ignore: HashSet<Symbol>,
}

impl Options {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn ignore<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.ignore.extend(symbols.into_iter().map(Into::into));
        self
    }
}

/// Layout of [`LSystem::dump_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpStyle {
    /// Placed between consecutive elements.
    pub separator: String,
    /// When set, every branch starts on a new line, indented by one more unit.
    pub indent: Option<String>,
    /// When set, a line break is inserted once a line holds more than this
    /// many elements.
    pub wrap: Option<usize>,
}

impl Default for DumpStyle {
    fn default() -> Self {
        DumpStyle { separator: ", ".to_string(), indent: None, wrap: None }
    }
}

/// A running L-system: rules, the current generation, and host actions.
///
/// Generation and rendering are both available in one shot
/// ([`generate`](Self::generate), [`render`](Self::render)) or in chunks
/// (`*_begin`, `*_has_next`, `*_next`, `*_next_n`). Chunked forms let a host
/// spread a large pass across frames; stopping is just not calling again.
///
/// # Example
/// ```
/// use lindenmayer::{LSystem, Options, Predecessor, Rule, forest, module};
///
/// let rules = vec![Rule::new(Predecessor::new("F")).produce(|_: &[f64]| {
///     forest![module!("F"), module!("+"), module!("F")]
/// })];
/// let mut system = LSystem::new(Default::default(), forest![module!("F")], rules, Options::default()).unwrap();
/// system.generate_n(2).unwrap();
/// assert_eq!(system.to_string(), "[F, +, F, +, F, +, F]");
/// assert_eq!(system.generation(), 2);
/// ```
pub struct LSystem<V> {
    actions: Actions<V>,
    axiom: Forest<V>,
    rules: RuleTable<V>,
    ignore: HashSet<Symbol>,
    chance: Box<dyn Chance>,
    current: Forest<V>,
    generation: u64,
    module_count: usize,
    pass: Option<Rewrite<V>>,
    render: Option<Render>,
    last_pass: Option<PassMetrics>,
    last_render: Option<RenderMetrics>,
}

impl<V: Clone> LSystem<V> {
    /// Compile `rules` and install `axiom` as generation 0.
    pub fn new(
        actions: Actions<V>,
        axiom: Forest<V>,
        rules: Vec<Rule<V>>,
        options: Options,
    ) -> Result<Self, ConfigurationError> {
        if axiom.is_empty() {
            return Err(ConfigurationError::EmptyAxiom);
        }
        let rules = RuleTable::new(rules)?;
        let chance: Box<dyn Chance> = match options.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(rand::thread_rng()),
        };
        let module_count = count_elements(&axiom);
        debug!(rules = rules.len(), module_count, "l-system compiled");
        Ok(LSystem {
            actions,
            current: axiom.clone(),
            axiom,
            rules,
            ignore: options.ignore,
            chance,
            generation: 0,
            module_count,
            pass: None,
            render: None,
            last_pass: None,
            last_render: None,
        })
    }

    /// Replace the random source used for stochastic successors.
    pub fn with_chance(mut self, chance: impl Chance + 'static) -> Self {
        self.chance = Box::new(chance);
        self
    }

    // --- Accessors -----------------------------------------------------------

    /// Number of completed passes since construction or the last reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> &Forest<V> {
        &self.current
    }

    pub fn axiom(&self) -> &Forest<V> {
        &self.axiom
    }

    /// Traversal length of the current generation: modules plus two per branch.
    pub fn module_count(&self) -> usize {
        self.module_count
    }

    pub fn rules(&self) -> &RuleTable<V> {
        &self.rules
    }

    pub fn actions_mut(&mut self) -> &mut Actions<V> {
        &mut self.actions
    }

    /// Metrics of the most recently completed pass.
    pub fn last_pass(&self) -> Option<&PassMetrics> {
        self.last_pass.as_ref()
    }

    /// Metrics of the most recently completed render.
    pub fn last_render(&self) -> Option<&RenderMetrics> {
        self.last_render.as_ref()
    }

    // --- Lifecycle -----------------------------------------------------------

    /// Back to the axiom at generation 0. Abandons any pass or render in progress
    /// and forgets the metrics of both.
    pub fn reset(&mut self) {
        self.current = self.axiom.clone();
        self.generation = 0;
        self.module_count = count_elements(&self.current);
        self.pass = None;
        self.render = None;
        self.last_pass = None;
        self.last_render = None;
        debug!(module_count = self.module_count, "l-system reset");
    }

    /// Recompile and swap the rule table. On error the old table stays.
    ///
    /// A pass already in progress continues with the new table.
    pub fn set_rules(&mut self, rules: Vec<Rule<V>>) -> Result<(), ConfigurationError> {
        self.rules = RuleTable::new(rules)?;
        debug!(rules = self.rules.len(), "rules replaced");
        Ok(())
    }

    // --- Generation ----------------------------------------------------------

    /// Run one full pass.
    pub fn generate(&mut self) -> Result<(), ConfigurationError> {
        self.generate_begin();
        while self.generate_has_next() {
            self.generate_next()?;
        }
        Ok(())
    }

    pub fn generate_n(&mut self, n: usize) -> Result<(), ConfigurationError> {
        for _ in 0..n {
            self.generate()?;
        }
        Ok(())
    }

    /// Start a pass over the current generation, discarding any unfinished one.
    ///
    /// An empty generation has nothing to visit, so the pass commits at once.
    pub fn generate_begin(&mut self) {
        debug!(generation = self.generation, module_count = self.module_count, "pass started");
        let pass = Rewrite::begin();
        let exhausted = !pass.has_next(&self.current);
        self.pass = Some(pass);
        if exhausted {
            self.commit();
        }
    }

    pub fn generate_has_next(&self) -> bool {
        self.pass.as_ref().is_some_and(|pass| pass.has_next(&self.current))
    }

    /// Process one element of the current pass; commits the pass after its
    /// last element.
    ///
    /// A configuration error abandons the pass and leaves the current
    /// generation untouched.
    ///
    /// # Panics
    ///
    /// If no pass is in progress.
    pub fn generate_next(&mut self) -> Result<(), ConfigurationError> {
        let Some(pass) = self.pass.as_mut() else {
            panic!("generate_next called with no pass in progress");
        };
        if let Err(err) = pass.step(&self.current, &self.ignore, &self.rules, &mut *self.chance) {
            self.pass = None;
            return Err(err);
        }
        if !pass.has_next(&self.current) {
            self.commit();
        }
        Ok(())
    }

    /// Process up to `k` elements; returns how many were processed.
    pub fn generate_next_n(&mut self, k: usize) -> Result<usize, ConfigurationError> {
        let mut processed = 0;
        while processed < k && self.generate_has_next() {
            self.generate_next()?;
            processed += 1;
        }
        Ok(processed)
    }

    fn commit(&mut self) {
        let Some(pass) = self.pass.take() else {
            return;
        };
        let (forest, metrics) = pass.finish(self.generation + 1);
        self.current = forest;
        self.generation = metrics.generation;
        self.module_count = metrics.module_count;
        // A walk over the old generation would index into the new one.
        self.render = None;
        debug!(
            generation = metrics.generation,
            visited = metrics.visited,
            rewritten = metrics.rewritten,
            copied = metrics.copied,
            dropped = metrics.dropped,
            module_count = metrics.module_count,
            duration = ?metrics.duration,
            "pass committed"
        );
        self.last_pass = Some(metrics);
    }

    // --- Rendering -----------------------------------------------------------

    /// Walk the current generation, invoking the action of every symbol.
    pub fn render(&mut self) {
        self.render_begin();
        while self.render_has_next() {
            self.render_next();
        }
    }

    /// Start a walk, discarding any unfinished one.
    pub fn render_begin(&mut self) {
        let render = Render::begin();
        if render.has_next(&self.current) {
            self.render = Some(render);
        } else {
            self.render = None;
            self.last_render = Some(render.finish());
        }
    }

    pub fn render_has_next(&self) -> bool {
        self.render.as_ref().is_some_and(|render| render.has_next(&self.current))
    }

    /// # Panics
    ///
    /// If no render is in progress.
    pub fn render_next(&mut self) {
        let Some(render) = self.render.as_mut() else {
            panic!("render_next called with no render in progress");
        };
        render.step(&self.current, &self.ignore, &mut self.actions);
        if !render.has_next(&self.current) {
            if let Some(render) = self.render.take() {
                let metrics = render.finish();
                debug!(visited = metrics.visited, invoked = metrics.invoked, duration = ?metrics.duration, "render finished");
                self.last_render = Some(metrics);
            }
        }
    }

    /// Visit up to `k` elements; returns how many were visited.
    pub fn render_next_n(&mut self, k: usize) -> usize {
        let mut visited = 0;
        while visited < k && self.render_has_next() {
            self.render_next();
            visited += 1;
        }
        visited
    }
}

impl<V: fmt::Display> LSystem<V> {
    /// Human-readable dump of the current generation.
    ///
    /// Not a parse format: symbols are printed as is, arguments in parentheses,
    /// and nested branches as bracket markers.
    pub fn dump_with(&self, style: &DumpStyle) -> String {
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&self.current, &self.ignore);
        let separator = style.separator.as_str();
        let indent = style.indent.as_deref().filter(|unit| !unit.is_empty());

        let mut margin = String::new();
        let mut column = 0usize;
        let mut dedent = false;
        let mut out = String::from("[");

        while cursor.has_next() {
            let visit = cursor.next();
            let symbol = visit.symbol();

            if let Some(unit) = indent {
                if symbol == BRANCH_OPEN {
                    if column > 0 {
                        out.push_str(separator);
                    }
                    margin.push_str(unit);
                    out.push('\n');
                    out.push_str(&margin);
                    column = 0;
                } else if symbol == BRANCH_CLOSE {
                    margin.truncate(margin.len().saturating_sub(unit.len()));
                }
            }
            if style.wrap.is_some_and(|wrap| column > wrap) {
                out.push_str(separator);
                out.push('\n');
                out.push_str(&margin);
                column = 0;
            }
            if column > 0 && symbol != BRANCH_CLOSE {
                out.push_str(separator);
            }
            if dedent {
                out.push('\n');
                out.push_str(&margin);
                dedent = false;
            }

            out.push_str(symbol);
            if let Visit::Module(module) = &visit {
                if !module.args.is_empty() {
                    out.push('(');
                    for (i, arg) in module.args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&arg.to_string());
                    }
                    out.push(')');
                }
            }

            if symbol == BRANCH_OPEN {
                column = 0;
            } else {
                column += 1;
            }
            if indent.is_some() && symbol == BRANCH_CLOSE {
                dedent = true;
            }
        }

        out.push(']');
        out
    }
}

impl<V: fmt::Display> fmt::Display for LSystem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump_with(&DumpStyle::default()))
    }
}

impl<V> fmt::Debug for LSystem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LSystem")
            .field("generation", &self.generation)
            .field("module_count", &self.module_count)
            .field("rules", &self.rules.len())
            .field("actions", &self.actions.len())
            .field("pass_in_progress", &self.pass.is_some())
            .field("render_in_progress", &self.render.is_some())
            .finish()
    }
}
