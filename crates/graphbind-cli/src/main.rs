//! graphbind command-line front end.
//!
//! Provides the `graphbind` binary, which evaluates handle-command scripts
//! either from a file (`run`) or interactively from stdin (`repl`).
//!
//! Exit codes: 0 = success, 1 = script error, 3 = I/O error.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use graphbind_cli::{Interpreter, Reply};

/// Environment variable consulted when `--engine` is not given.
const LAYOUT_ENV: &str = "GRAPHBIND_LAYOUT";

/// Graph handle scripting.
#[derive(Parser)]
#[command(name = "graphbind", about = "Graph handle scripting")]
struct Cli {
    /// Layout engine used by `layout` without an argument
    /// (default: $GRAPHBIND_LAYOUT, else chosen by graph direction).
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Print each result as a JSON value.
    #[arg(long, global = true)]
    json: bool,

    /// Log more (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate a script file.
    Run {
        /// Path to the script.
        script: PathBuf,
    },
    /// Read commands from stdin until end of input.
    Repl,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let engine = cli
        .engine
        .or_else(|| std::env::var(LAYOUT_ENV).ok())
        .unwrap_or_default();
    let mut interp = Interpreter::with_default_engine(engine);

    let exit_code = match cli.command {
        Commands::Run { script } => run_script(&mut interp, &script, cli.json),
        Commands::Repl => run_repl(&mut interp, cli.json),
    };
    process::exit(exit_code);
}

/// Execute the run subcommand.
fn run_script(interp: &mut Interpreter, path: &Path, json: bool) -> i32 {
    let script = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return 3;
        }
    };

    match interp.eval_script(&script, |reply| print_reply(reply, json)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Execute the repl subcommand. Errors are reported and evaluation continues.
fn run_repl(interp: &mut Interpreter, json: bool) -> i32 {
    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    let mut lines = stdin.lock().lines();
    loop {
        if prompt {
            print!("% ");
            // A failed flush only loses the prompt.
            let _ = io::stdout().flush();
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("I/O error: {}", e);
                return 3;
            }
            None => return 0,
        };
        match interp.eval_line(&line) {
            Ok(reply) if !reply.is_empty() => print_reply(&reply, json),
            Ok(_) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}

fn print_reply(reply: &Reply, json: bool) {
    if json {
        let out = serde_json::to_string(reply)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
        println!("{}", out);
    } else {
        println!("{}", reply);
    }
}
