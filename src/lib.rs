//! Lexer, parser, formatter and interpreter for the runny task language.
//!
//! A runny file declares variables, named targets and staged run blocks
//! whose bodies are raw shell scripts. Evaluation runs each script through
//! the configured shell with the visible variables injected into its
//! environment, and prints the output in statement order.
//!
//! # Quick start
//!
//! ## Parse and re-format a file
//!
//! ```
//! use runny::{scan, parse, format};
//!
//! let input = "var {\n\tname \"Tim\"\n}\n";
//! let tokens = scan(input).unwrap();
//! let statements = parse(&tokens).unwrap();
//! assert_eq!(format(&statements), input);
//! ```
//!
//! ## Run a target
//!
//! ```no_run
//! use runny::{Interpreter, filter_target, parse_str};
//!
//! let source = "target hello { run { echo hi } }";
//! let statements = parse_str(source).unwrap();
//! let statements = filter_target(&statements, "hello").unwrap();
//! Interpreter::new("runny.rny").evaluate(&statements).unwrap();
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod environment;
pub mod formatter;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

pub use ast::{Binding, Expression, Literal, RunStatement, Stage, Statement};
pub use environment::{Environment, Value};
pub use formatter::format;
pub use interpreter::{DEFAULT_SHELL, Interpreter, RuntimeError, filter_target};
pub use lexer::{LexError, LexErrorKind, scan};
pub use parser::{ParseError, ParseErrorKind, parse};
pub use printer::Printer;
pub use token::{Modifier, Span, Token, TokenKind};

/// Unified error type covering lexing, parsing and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// An evaluation error.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Scan and parse a source string in one step.
pub fn parse_str(input: &str) -> Result<Vec<Statement>, Error> {
    let tokens = scan(input)?;
    Ok(parse(&tokens)?)
}
