//! Zircon CLI and REPL
//!
//! Usage:
//!   zircon run <file.zn>      - Execute a Zircon file
//!   zircon eval <source...>   - Evaluate source given on the command line
//!   zircon repl               - Start interactive REPL

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use zircon::{Session, SessionOptions, Sink, VERSION};

/// Source evaluated by `eval` when none is given: print the global scope
const DEFAULT_SOURCE: &str = "$.echo";

#[derive(Parser, Debug)]
#[command(name = "zircon")]
#[command(version, about = "An embeddable scripting language")]
struct Cli {
    /// Do not write the `#> value` trace after each unit
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a Zircon file
    Run { file: PathBuf },
    /// Evaluate source given as arguments (joined with spaces)
    Eval { source: Vec<String> },
    /// Start interactive REPL
    Repl,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let options = SessionOptions {
        trace: !cli.quiet,
        ..SessionOptions::default()
    };

    match cli.command {
        Command::Run { file } => {
            let source = match fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("{}: cannot read file '{}': {}", "error".red(), file.display(), e);
                    process::exit(1);
                }
            };
            run_source(&source, options);
        }
        Command::Eval { source } => {
            let source = source.join(" ");
            let source = if source.trim().is_empty() {
                DEFAULT_SOURCE.to_string()
            } else {
                source
            };
            run_source(&source, options);
        }
        Command::Repl => run_repl(options.trace),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn stdout_sink() -> Sink {
    Rc::new(RefCell::new(io::stdout()))
}

fn run_source(source: &str, options: SessionOptions) {
    let mut session = Session::with_options(stdout_sink(), options);
    if let Err(e) = session.run(source) {
        eprintln!("{}", format!("{}", e).red());
        process::exit(1);
    }
}

fn run_repl(show_results: bool) {
    println!(
        "{} {} - {}",
        "Zircon".cyan().bold(),
        VERSION.cyan(),
        "an embeddable scripting language".dimmed()
    );
    println!("Type {} to exit, {} for help\n", "exit".yellow(), "help".yellow());

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: cannot start REPL: {}", "error".red(), e);
            process::exit(1);
        }
    };

    // The root world persists across lines
    let mut session = repl_session(show_results);

    loop {
        match rl.readline(&format!("{} ", "zn>".green().bold())) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    "exit" | "quit" => {
                        println!("{}", "Goodbye!".cyan());
                        break;
                    }
                    "help" => {
                        print_repl_help();
                        continue;
                    }
                    "clear" => {
                        session = repl_session(show_results);
                        println!("{}", "State cleared.".dimmed());
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = session.run(line) {
                    eprintln!("{}", format!("{}", e).red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}

/// A session that traces every unit of a line to stdout, in order with the
/// script's own output
fn repl_session(show_results: bool) -> Session {
    let options = SessionOptions {
        trace: show_results,
        ..SessionOptions::default()
    };
    let session = Session::with_options(stdout_sink(), options);
    if show_results {
        session.with_diagnostics(stdout_sink())
    } else {
        session
    }
}

fn print_repl_help() {
    println!("{}", "REPL Commands:".yellow());
    println!("  exit, quit   Exit the REPL");
    println!("  clear        Reset the global scope");
    println!("  help         Show this help\n");
    println!("{}", "Language Examples:".yellow());
    println!("  let x = 10");
    println!("  x := x + 1");
    println!("  echo 'x is', x");
    println!("  double := do n: n * 2");
    println!("  5.double");
    println!("  if x > 10 {{ echo 'big' }} else {{ echo 'small' }}");
    println!("  for i in range(3) {{ echo i }}");
    println!("  $.echo");
}
