use std::fmt;

use crate::token::{self, Modifier, Span, Token, TokenKind};

/// Classifies a scanner error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Quoted text ran into end of input.
    UnterminatedString,
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::UnexpectedCharacter('\n') => write!(f, "unexpected character: '\\n'"),
            Self::UnexpectedCharacter(ch) => write!(f, "unexpected character: '{ch}'"),
        }
    }
}

/// Error produced during scanning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// Scan source text into a token sequence terminated by an EOF token.
///
/// Inside `run { … }` the scanner does not tokenize at all: everything up
/// to the matching closing brace becomes one SCRIPT token, so shell syntax
/// never has to be understood here.
///
/// # Errors
///
/// Returns `LexError` on an unsupported character or unterminated string.
pub fn scan(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).scan()
}

/// Stack of the keywords whose blocks are currently open.
#[derive(Debug, Default)]
struct ContextStack {
    frames: Vec<TokenKind>,
}

impl ContextStack {
    fn current(&self) -> Option<TokenKind> {
        self.frames.last().copied()
    }

    fn push(&mut self, kind: TokenKind) {
        self.frames.push(kind);
    }

    fn replace(&mut self, kind: TokenKind) {
        self.frames.pop();
        self.frames.push(kind);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    start: usize,
    start_line: usize,
    start_col: usize,
    depth: usize,
    context: ContextStack,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        let pos = if input.starts_with('\u{FEFF}') {
            '\u{FEFF}'.len_utf8()
        } else {
            0
        };
        Self {
            input,
            pos,
            line: 1,
            col: 1,
            start: pos,
            start_line: 1,
            start_col: 1,
            depth: 0,
            context: ContextStack::default(),
            tokens: Vec::new(),
        }
    }

    fn scan(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.peek() {
            self.begin();
            match ch {
                '{' => {
                    self.advance();
                    self.push(TokenKind::LeftBrace, "{".to_string());
                    self.depth += 1;
                    if self.context.current() == Some(TokenKind::Run) {
                        self.read_script();
                    }
                }
                '}' => {
                    self.advance();
                    self.depth = self.depth.saturating_sub(1);
                    self.push(TokenKind::RightBrace, "}".to_string());
                    self.context.pop();
                }
                ',' => {
                    self.advance();
                    self.push(TokenKind::Comma, ",".to_string());
                }
                '#' => self.skip_comment(),
                ' ' | '\t' | '\r' | '\n' => self.advance(),
                '"' | '`' => self.read_string(ch)?,
                '$' => self.read_identifier(),
                c if c.is_ascii_digit() => self.read_number(),
                c if c.is_alphabetic() => self.read_identifier(),
                other => {
                    return Err(LexError {
                        kind: LexErrorKind::UnexpectedCharacter(other),
                        span: self.start_span(),
                    });
                }
            }
        }

        self.begin();
        self.push(TokenKind::Eof, String::new());
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn begin(&mut self) {
        self.start = self.pos;
        self.start_line = self.line;
        self.start_col = self.col;
    }

    const fn start_span(&self) -> Span {
        Span {
            line: self.start_line,
            column: self.start_col,
        }
    }

    fn push(&mut self, kind: TokenKind, text: String) {
        self.push_with(kind, text, None);
    }

    fn push_with(&mut self, kind: TokenKind, text: String, modifier: Option<Modifier>) {
        self.tokens.push(Token {
            kind,
            text,
            span: self.start_span(),
            position: self.start,
            depth: self.depth,
            modifier,
        });
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Copy raw text up to the brace that closes the block just opened.
    fn read_script(&mut self) {
        self.begin();
        let mut open = 1usize;
        while let Some(ch) = self.peek() {
            match ch {
                '{' => open += 1,
                '}' => {
                    open -= 1;
                    if open == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }

        let text = self.input[self.start..self.pos].trim();
        if !text.is_empty() {
            let text = text.to_string();
            self.push(TokenKind::Script, text);
        }
    }

    fn read_string(&mut self, delimiter: char) -> Result<(), LexError> {
        self.advance(); // opening delimiter
        let content_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedString,
                        span: self.start_span(),
                    });
                }
                Some(ch) if ch == delimiter => break,
                Some(_) => self.advance(),
            }
        }
        let text = self.input[content_start..self.pos].to_string();
        self.advance(); // closing delimiter
        self.push(TokenKind::String, text);
        Ok(())
    }

    fn read_number(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let text = self.input[self.start..self.pos].to_string();
        self.push(TokenKind::Number, text);
    }

    fn read_identifier(&mut self) {
        while self.peek().is_some_and(is_identifier_char) {
            self.advance();
        }
        let text = self.input[self.start..self.pos].to_string();

        if let Some(kind) = token::keyword(&text) {
            self.push(kind, text);
            self.context.push(kind);
        } else if let Some((kind, modifier)) = split_modifier(&text) {
            self.push_with(kind, text, Some(modifier));
            self.context.push(kind);
        } else {
            // `run name`: the block that follows belongs to a target
            // reference, not a script.
            if self.tokens.last().is_some_and(|t| t.kind == TokenKind::Run) {
                self.context.replace(TokenKind::Target);
            }
            self.push(TokenKind::Identifier, text);
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '$' | ':')
}

/// Split `keyword:modifier`, e.g. `run:before`.
fn split_modifier(text: &str) -> Option<(TokenKind, Modifier)> {
    let (head, tail) = text.split_once(':')?;
    Some((token::keyword(head)?, Modifier::lookup(tail)?))
}
