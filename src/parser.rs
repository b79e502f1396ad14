use std::fmt;

use crate::ast::{
    Binding, ConfigStatement, DescribeStatement, Expression, ExtendsStatement, Literal,
    RunStatement, Stage, Statement, TargetStatement, VariableStatement,
};
use crate::token::{Span, Token, TokenKind};

/// Classifies a parser error. `found` is `None` at end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Expected `{`.
    ExpectedOpenBrace { found: Option<String> },
    /// Expected `}`.
    ExpectedCloseBrace { found: Option<String> },
    /// Expected a variable, config, or target name.
    ExpectedName {
        what: &'static str,
        found: Option<String>,
    },
    /// A binding name was not followed by a value or `{ run … }`.
    ExpectedInitializer { name: String, found: Option<String> },
    /// `run` followed by neither a target name nor a block.
    ExpectedRunBlock { found: Option<String> },
    /// A `desc` entry that is not a quoted string.
    InvalidDescription { found: Option<String> },
    /// An `extends` entry that is not a literal.
    InvalidPath { found: Option<String> },
    /// Token that cannot start a statement.
    UnexpectedToken { found: Option<String> },
    /// Blocks nested deeper than [`MAX_DEPTH`].
    TooDeep,
}

fn got(found: Option<&String>) -> String {
    found.map_or_else(|| "end of input".to_string(), |t| format!("'{t}'"))
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedOpenBrace { found } => {
                write!(f, "expected '{{', got {}", got(found.as_ref()))
            }
            Self::ExpectedCloseBrace { found } => {
                write!(f, "expected '}}', got {}", got(found.as_ref()))
            }
            Self::ExpectedName { what, found } => {
                write!(f, "expected {what}, got {}", got(found.as_ref()))
            }
            Self::ExpectedInitializer { name, found } => {
                write!(
                    f,
                    "expected value or run block for '{name}', got {}",
                    got(found.as_ref())
                )
            }
            Self::ExpectedRunBlock { found } => {
                write!(f, "expected target name or '{{', got {}", got(found.as_ref()))
            }
            Self::InvalidDescription { found } => {
                write!(f, "expected quoted description, got {}", got(found.as_ref()))
            }
            Self::InvalidPath { found } => {
                write!(f, "expected path, got {}", got(found.as_ref()))
            }
            Self::UnexpectedToken { found } => {
                write!(f, "expected statement, got {}", got(found.as_ref()))
            }
            Self::TooDeep => write!(f, "blocks nested deeper than {MAX_DEPTH} levels"),
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Deepest brace nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 128;

/// Parse a token stream into a statement tree.
///
/// The first error aborts parsing; no partial tree is returned.
///
/// # Errors
///
/// Returns `ParseError` on missing braces, malformed bindings,
/// non-string descriptions, tokens that cannot start a statement, or
/// blocks nested deeper than [`MAX_DEPTH`].
pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, ParseError> {
    Parser::new(tokens).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        Ok(statements)
    }

    fn declaration(&mut self) -> Result<Statement, ParseError> {
        match self.peek_kind() {
            TokenKind::Config => self.config_statement(),
            TokenKind::Var => self.variable_statement(),
            TokenKind::Target => self.target_statement(),
            TokenKind::Run => self.run_statement(),
            TokenKind::Desc => self.describe_statement(),
            TokenKind::Extends => self.extends_statement(),
            TokenKind::Script => {
                let script = self.advance().text.clone();
                Ok(Statement::action(script))
            }
            _ => self.expression_statement(),
        }
    }

    fn config_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // config
        let items = self.bindings("config name")?;
        Ok(Statement::Config(ConfigStatement { items }))
    }

    fn variable_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // var
        let items = self.bindings("variable name")?;
        Ok(Statement::Variable(VariableStatement { items }))
    }

    fn target_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // target
        let name = self.expect_name("target name")?;
        let body = self.block()?;
        Ok(Statement::Target(TargetStatement { name, body }))
    }

    fn run_statement(&mut self) -> Result<Statement, ParseError> {
        let stage = Stage::from(self.advance().modifier);

        let name = if self.check(TokenKind::Identifier) {
            Some(self.advance().text.clone())
        } else {
            None
        };

        let body = if self.check(TokenKind::LeftBrace) {
            self.block()?
        } else if name.is_some() {
            // bare `run name`
            Vec::new()
        } else {
            return Err(self.error(ParseErrorKind::ExpectedRunBlock {
                found: self.peek().and_then(Token::found),
            }));
        };

        Ok(Statement::Run(RunStatement { name, body, stage }))
    }

    fn describe_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // desc
        self.open_brace()?;
        let mut lines = Vec::new();
        while self.skip_commas() {
            if !self.check(TokenKind::String) {
                return Err(self.error(ParseErrorKind::InvalidDescription {
                    found: self.peek().and_then(Token::found),
                }));
            }
            lines.push(self.advance().text.clone());
        }
        self.close_brace()?;
        Ok(Statement::Describe(DescribeStatement { lines }))
    }

    fn extends_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // extends
        self.open_brace()?;
        let mut paths = Vec::new();
        while self.skip_commas() {
            let Some(literal) = self.literal() else {
                return Err(self.error(ParseErrorKind::InvalidPath {
                    found: self.peek().and_then(Token::found),
                }));
            };
            paths.push(Expression::Literal(literal));
        }
        self.close_brace()?;
        Ok(Statement::Extends(ExtendsStatement { paths }))
    }

    fn expression_statement(&mut self) -> Result<Statement, ParseError> {
        self.literal().map(Statement::literal).ok_or_else(|| {
            self.error(ParseErrorKind::UnexpectedToken {
                found: self.peek().and_then(Token::found),
            })
        })
    }

    /// `{ (name initializer ,?)* }`
    fn bindings(&mut self, what: &'static str) -> Result<Vec<Binding>, ParseError> {
        self.open_brace()?;
        let mut items = Vec::new();
        while self.skip_commas() {
            let name = self.expect_name(what)?;
            let initializer = self.initializer(&name)?;
            items.push(Binding { name, initializer });
        }
        self.close_brace()?;
        Ok(items)
    }

    /// A literal, or `{ run … }` whose output becomes the value.
    fn initializer(&mut self, name: &str) -> Result<Statement, ParseError> {
        if let Some(literal) = self.literal() {
            return Ok(Statement::literal(literal));
        }

        if self.check(TokenKind::LeftBrace) {
            self.open_brace()?;
            if !self.check(TokenKind::Run) {
                return Err(self.error(ParseErrorKind::ExpectedInitializer {
                    name: name.to_string(),
                    found: self.peek().and_then(Token::found),
                }));
            }
            let run = self.run_statement()?;
            self.close_brace()?;
            return Ok(run);
        }

        Err(self.error(ParseErrorKind::ExpectedInitializer {
            name: name.to_string(),
            found: self.peek().and_then(Token::found),
        }))
    }

    /// `{ statement* }`
    fn block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.open_brace()?;
        let target_depth = self.depth - 1;
        let mut body = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.declaration()?);
        }
        self.close_brace()?;
        debug_assert_eq!(self.depth, target_depth);
        Ok(body)
    }

    fn literal(&mut self) -> Option<Literal> {
        let token = self.peek()?;
        let literal = match token.kind {
            TokenKind::String => Literal::String(token.text.clone()),
            TokenKind::Number => Literal::Number(token.text.clone()),
            TokenKind::Identifier => Literal::Identifier(token.text.clone()),
            _ => return None,
        };
        self.pos += 1;
        Some(literal)
    }

    fn expect_name(&mut self, what: &'static str) -> Result<String, ParseError> {
        if self.check(TokenKind::Identifier) {
            return Ok(self.advance().text.clone());
        }
        Err(self.error(ParseErrorKind::ExpectedName {
            what,
            found: self.peek().and_then(Token::found),
        }))
    }

    fn open_brace(&mut self) -> Result<(), ParseError> {
        if !self.check(TokenKind::LeftBrace) {
            return Err(self.error(ParseErrorKind::ExpectedOpenBrace {
                found: self.peek().and_then(Token::found),
            }));
        }
        if self.depth == MAX_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep));
        }
        self.pos += 1;
        self.depth += 1;
        Ok(())
    }

    fn close_brace(&mut self) -> Result<(), ParseError> {
        if !self.check(TokenKind::RightBrace) {
            return Err(self.error(ParseErrorKind::ExpectedCloseBrace {
                found: self.peek().and_then(Token::found),
            }));
        }
        self.pos += 1;
        self.depth -= 1;
        Ok(())
    }

    /// Skip separators. Returns `true` while another entry follows.
    fn skip_commas(&mut self) -> bool {
        while self.check(TokenKind::Comma) {
            self.pos += 1;
        }
        !self.check(TokenKind::RightBrace) && !self.is_at_end()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().map_or(TokenKind::Eof, |t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn advance(&mut self) -> &'a Token {
        let token = &self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        let span = self
            .peek()
            .or_else(|| self.tokens.last())
            .map_or(Span { line: 1, column: 1 }, |t| t.span);
        ParseError { kind, span }
    }
}
