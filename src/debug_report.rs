use crate::Turtle;
use lindenmayer::{LSystem, PassMetrics, RuleShape};
use std::time::Duration;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        fn wrap(&self, s: &str, code: &str) -> String {
            if self.enabled { format!("{code}{s}{RESET}") } else { s.to_string() }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            self.wrap(s.as_ref(), color)
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), DIM)
        }
    }
}

/// Longest dump printed before eliding the middle.
const DUMP_LIMIT: usize = 2_000;

pub struct Report<'a> {
    pub grammar: &'a str,
    pub summary: &'a str,
    pub system: &'a LSystem<f64>,
    pub passes: &'a [PassMetrics],
    pub turtle: &'a Turtle,
    pub dump: String,
}

pub fn print_run(report: &Report<'_>, color: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{} {}",
        palette.bold(palette.paint(format!("⚙  Grammar: {}", report.grammar), ansi::CYAN)),
        palette.dim(format!("({})", report.summary))
    );

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    print_rules(report.system, &palette);

    println!("\n{}", palette.paint("━━━ Generations ━━━", ansi::GRAY));
    if report.passes.is_empty() {
        println!("{}", palette.dim("  No passes run"));
    } else {
        print_passes(report.passes, &palette);
    }

    println!("\n{}", palette.paint("━━━ Render ━━━", ansi::GRAY));
    print_render(report, &palette);

    println!("\n{}", palette.paint("━━━ Current generation ━━━", ansi::GRAY));
    println!("{}", elide(&report.dump, DUMP_LIMIT));

    let total: Duration = report.passes.iter().map(|pass| pass.duration).sum();
    let render = report.system.last_render().map(|metrics| metrics.duration).unwrap_or_default();
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Generate: {}  │  Render: {}",
        palette.paint(format!("{total:?}"), ansi::GREEN),
        palette.paint(format!("{render:?}"), ansi::CYAN),
    );
    println!();
}

fn print_rules(system: &LSystem<f64>, palette: &ansi::Palette) {
    for ((symbol, arity), metas) in system.rules().metas() {
        println!("  {}", palette.paint(format!("{symbol}/{arity}"), ansi::BLUE));
        for meta in metas {
            println!(
                "    {} {} {} {}",
                palette.paint(format!("#{}", meta.index), ansi::GRAY),
                palette.dim(format!("rank {:>4}", meta.rank)),
                palette.paint(shape_label(meta.shape), ansi::YELLOW),
                palette.dim(format!("{} successor(s)", meta.successors)),
            );
        }
    }
}

fn shape_label(shape: RuleShape) -> String {
    let mut parts = Vec::new();
    if shape.contains(RuleShape::CONDITIONAL) {
        parts.push("conditional");
    }
    if shape.contains(RuleShape::CONTEXTUAL) {
        parts.push("contextual");
    }
    if shape.contains(RuleShape::STOCHASTIC) {
        parts.push("stochastic");
    }
    if parts.is_empty() { "plain".to_string() } else { parts.join("+") }
}

fn print_passes(passes: &[PassMetrics], palette: &ansi::Palette) {
    for pass in passes {
        let label = format!("Gen {}:", pass.generation);
        println!(
            "  {} {}  {} {}",
            palette.paint(label, ansi::BLUE),
            palette.paint(format!("{} elements", pass.module_count), ansi::GREEN),
            palette.dim("│"),
            palette.dim(format!(
                "rewritten {} copied {} dropped {} in {:?}",
                pass.rewritten, pass.copied, pass.dropped, pass.duration
            )),
        );
    }
}

fn print_render(report: &Report<'_>, palette: &ansi::Palette) {
    let Some(metrics) = report.system.last_render() else {
        println!("{}", palette.dim("  Not rendered"));
        return;
    };
    let turtle = report.turtle;
    let (min_x, min_y, max_x, max_y) = turtle.bounds;
    println!(
        "  {} visited, {} actions invoked",
        palette.paint(metrics.visited.to_string(), ansi::YELLOW),
        palette.paint(metrics.invoked.to_string(), ansi::YELLOW),
    );
    println!(
        "  {} segments  {}  depth {}  {}  bounds {}",
        palette.paint(turtle.segments.to_string(), ansi::GREEN),
        palette.dim("│"),
        palette.paint(turtle.max_depth.to_string(), ansi::CYAN),
        palette.dim("│"),
        palette.dim(format!("({min_x:.1}, {min_y:.1})..({max_x:.1}, {max_y:.1})")),
    );
}

fn elide(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit / 2).collect();
    let tail: Vec<char> = text.chars().rev().take(limit / 2).collect();
    let tail: String = tail.into_iter().rev().collect();
    format!("{head} … {tail}")
}
