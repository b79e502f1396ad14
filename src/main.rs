//! CLI tool to run targets from a runny file.

use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::FalseyValueParser;
use runny::{Error, Interpreter, Token, filter_target};
use tracing_subscriber::EnvFilter;

/// Run targets declared in a runny file.
#[derive(Parser)]
#[command(name = "runny")]
#[command(version)]
struct Cli {
    /// Target to run; without one every top-level statement is evaluated
    target: Option<String>,

    /// Source file, must have the .rny extension
    #[arg(short, long, default_value = "runny.rny")]
    file: PathBuf,

    /// Print the token stream and exit
    #[arg(long, conflicts_with_all = ["fmt", "check"])]
    tokens: bool,

    /// Print the file in canonical form and exit
    #[arg(long, conflicts_with = "check")]
    fmt: bool,

    /// Exit non-zero when the file is not in canonical form
    #[arg(long)]
    check: bool,

    /// Dump the token stream when the file fails to parse
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> ExitCode {
    let path = &cli.file;
    if path.extension().and_then(OsStr::to_str) != Some("rny") {
        eprintln!("{}: expected a .rny file", path.display());
        return ExitCode::from(2);
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::from(2);
        }
    };

    let tokens = match runny::scan(&content) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}: {}", path.display(), Error::from(e));
            return ExitCode::FAILURE;
        }
    };

    if cli.tokens {
        for token in &tokens {
            println!("{token}");
        }
        return ExitCode::SUCCESS;
    }

    let statements = match runny::parse(&tokens) {
        Ok(statements) => statements,
        Err(e) => {
            eprintln!("{}: {}", path.display(), Error::from(e));
            if cli.debug {
                dump(&tokens);
            }
            return ExitCode::FAILURE;
        }
    };

    if cli.fmt {
        print!("{}", runny::format(&statements));
        return ExitCode::SUCCESS;
    }

    if cli.check {
        if runny::format(&statements) == content {
            eprintln!("{}: formatted", path.display());
            return ExitCode::SUCCESS;
        }
        eprintln!("{}: not formatted", path.display());
        return ExitCode::FAILURE;
    }

    let statements = match &cli.target {
        Some(name) => match filter_target(&statements, name) {
            Ok(filtered) => filtered,
            Err(e) => {
                eprintln!("{}", Error::from(e));
                return ExitCode::FAILURE;
            }
        },
        None => statements,
    };

    match Interpreter::new(path).evaluate(&statements) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Error::from(e));
            ExitCode::FAILURE
        }
    }
}

fn dump(tokens: &[Token]) {
    for token in tokens {
        eprintln!("{token}");
    }
}
