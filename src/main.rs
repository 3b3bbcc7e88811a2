mod debug_report;
mod grammars;

use lindenmayer::{Actions, DumpStyle, LSystem, Options, PassMetrics, Symbol};
use std::cell::RefCell;
use std::io::{self, IsTerminal};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_logging();

    let Some(demo) = grammars::lookup(&config.grammar) else {
        eprintln!("error: unknown grammar '{}'\n\n{}", config.grammar, help_text());
        std::process::exit(2);
    };
    let grammar = (demo.build)();
    let turtle = Rc::new(RefCell::new(Turtle::default()));

    let mut options = Options::default().ignore(grammar.ignore.iter().copied());
    options.seed = config.seed;
    let mut system = match LSystem::new(turtle_actions(&turtle), grammar.axiom, grammar.rules, options) {
        Ok(system) => system,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let generations = config.generations.unwrap_or(demo.generations);
    let passes = match run(&mut system, generations, config.chunk) {
        Ok(passes) => passes,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let style = DumpStyle { indent: config.indent.clone(), ..DumpStyle::default() };
    let report = debug_report::Report {
        grammar: &config.grammar,
        summary: demo.summary,
        system: &system,
        passes: &passes,
        turtle: &turtle.borrow(),
        dump: system.dump_with(&style),
    };
    debug_report::print_run(&report, config.color);
}

/// Generate, then render once. With `chunk` set, both are driven in steps of
/// that many elements.
fn run(
    system: &mut LSystem<f64>,
    generations: usize,
    chunk: Option<usize>,
) -> Result<Vec<PassMetrics>, lindenmayer::ConfigurationError> {
    let mut passes = Vec::with_capacity(generations);
    for _ in 0..generations {
        match chunk {
            Some(k) => {
                system.generate_begin();
                while system.generate_has_next() {
                    system.generate_next_n(k)?;
                }
            }
            None => system.generate()?,
        }
        passes.extend(system.last_pass().cloned());
    }

    match chunk {
        Some(k) => {
            system.render_begin();
            while system.render_has_next() {
                system.render_next_n(k);
            }
        }
        None => system.render(),
    }
    Ok(passes)
}

fn init_logging() {
    let filter = if std::env::var_os("LINDENMAYER_DEBUG_RULES").is_some() {
        EnvFilter::new("lindenmayer=trace")
    } else {
        EnvFilter::try_from_env("LINDENMAYER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).compact().init();
}

// --- Turtle ------------------------------------------------------------------

/// Minimal 2D turtle that only measures what it would draw.
#[derive(Debug, Default)]
pub struct Turtle {
    x: f64,
    y: f64,
    heading: f64,
    saved: Vec<(f64, f64, f64)>,
    pub segments: usize,
    pub max_depth: usize,
    /// `(min_x, min_y, max_x, max_y)` of every visited point.
    pub bounds: (f64, f64, f64, f64),
}

const TURN_DEGREES: f64 = 90.0;

impl Turtle {
    fn forward(&mut self, length: f64) {
        let radians = self.heading.to_radians();
        self.x += length * radians.cos();
        self.y += length * radians.sin();
        self.segments += 1;
        let (min_x, min_y, max_x, max_y) = self.bounds;
        self.bounds = (min_x.min(self.x), min_y.min(self.y), max_x.max(self.x), max_y.max(self.y));
    }

    fn turn(&mut self, degrees: f64) {
        self.heading = (self.heading + degrees).rem_euclid(360.0);
    }

    fn push(&mut self) {
        self.saved.push((self.x, self.y, self.heading));
        self.max_depth = self.max_depth.max(self.saved.len());
    }

    fn pop(&mut self) {
        if let Some((x, y, heading)) = self.saved.pop() {
            self.x = x;
            self.y = y;
            self.heading = heading;
        }
    }
}

fn turtle_actions(turtle: &Rc<RefCell<Turtle>>) -> Actions<f64> {
    let mut actions: Actions<f64> = Actions::new();
    let mut bind = |symbol: &str, action: fn(&mut Turtle, &[f64])| {
        let turtle = Rc::clone(turtle);
        actions.insert(Symbol::from(symbol), Box::new(move |args: &[f64]| action(&mut turtle.borrow_mut(), args)));
    };
    bind("F", |t, args| t.forward(args.first().copied().unwrap_or(1.0)));
    bind("+", |t, _| t.turn(TURN_DEGREES));
    bind("-", |t, _| t.turn(-TURN_DEGREES));
    bind("[", |t, _| t.push());
    bind("]", |t, _| t.pop());
    actions
}

// --- Arguments ---------------------------------------------------------------

struct CliConfig {
    grammar: String,
    generations: Option<usize>,
    seed: Option<u64>,
    indent: Option<String>,
    chunk: Option<usize>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut grammar: Option<String> = None;
    let mut generations = None;
    let mut seed = None;
    let mut indent = None;
    let mut chunk = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| match inline.clone() {
            Some(value) => Ok(value),
            None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
        };
        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("lindenmayer {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-n" | "--generations" => generations = Some(parse_number("--generations", &value("--generations")?)?),
            "--seed" => seed = Some(parse_number("--seed", &value("--seed")?)?),
            "--indent" => indent = Some(value("--indent")?),
            "--chunk" => {
                let k: usize = parse_number("--chunk", &value("--chunk")?)?;
                if k == 0 {
                    return Err("error: --chunk must be at least 1".to_string());
                }
                chunk = Some(k);
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if grammar.is_some() {
                    return Err("error: grammar provided multiple times".to_string());
                }
                grammar = Some(arg);
            }
        }
    }

    let grammar = grammar.ok_or_else(|| format!("error: no grammar provided\n\n{}", help_text()))?;
    Ok(CliConfig { grammar, generations, seed, indent, chunk, color })
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value.parse().map_err(|_| format!("error: invalid {flag} '{value}' (expected a non-negative integer)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    let catalog: Vec<String> = grammars::CATALOG
        .iter()
        .map(|(name, demo)| format!("  {name:<10} {} (default {} generations)", demo.summary, demo.generations))
        .collect();
    format!(
        "lindenmayer {version}

Run a built-in L-system and report what each generation did.

Usage:
  lindenmayer [OPTIONS] <grammar>

Grammars:
{catalog}

Options:
  -n, --generations <n>      Number of passes. Default: per grammar.
  --seed <n>                 Seed for stochastic rules. Default: random.
  --indent <text>            Indent nested branches in the dump by <text>.
  --chunk <n>                Drive generation and rendering <n> elements at a time.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  LINDENMAYER_LOG            tracing filter, e.g. lindenmayer=debug. Default: warn.
  LINDENMAYER_DEBUG_RULES    Set to 1 to trace every rule firing.

Exit codes:
  0  Success.
  1  Grammar failed to compile or run.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        catalog = catalog.join("\n"),
    )
}
