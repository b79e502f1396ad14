use std::fmt;

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Token kinds produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Opening brace `{`.
    LeftBrace,
    /// Closing brace `}`.
    RightBrace,
    /// Separator `,`.
    Comma,
    /// Bare word or `$name`.
    Identifier,
    /// Double-quoted or backtick-quoted text, quotes removed.
    String,
    /// Contiguous run of digits.
    Number,
    /// Raw shell text captured inside a `run { … }` block.
    Script,
    /// `var`
    Var,
    /// `target`
    Target,
    /// `run`
    Run,
    /// `config`
    Config,
    /// `desc`
    Desc,
    /// `extends`
    Extends,
    /// End of input. Always the last token.
    Eof,
}

impl TokenKind {
    /// Upper-case name used by token dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LeftBrace => "LEFT_BRACE",
            Self::RightBrace => "RIGHT_BRACE",
            Self::Comma => "COMMA",
            Self::Identifier => "IDENTIFIER",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Script => "SCRIPT",
            Self::Var => "VAR",
            Self::Target => "TARGET",
            Self::Run => "RUN",
            Self::Config => "CONFIG",
            Self::Desc => "DESC",
            Self::Extends => "EXTENDS",
            Self::Eof => "EOF",
        }
    }

    /// Whether this kind is a reserved keyword.
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Var | Self::Target | Self::Run | Self::Config | Self::Desc | Self::Extends
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage modifier attached to a keyword, as in `run:before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Before,
    After,
}

impl Modifier {
    #[must_use]
    pub fn lookup(text: &str) -> Option<Self> {
        match text {
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// Map a reserved word to its keyword kind.
#[must_use]
pub fn keyword(text: &str) -> Option<TokenKind> {
    match text {
        "var" => Some(TokenKind::Var),
        "target" => Some(TokenKind::Target),
        "run" => Some(TokenKind::Run),
        "config" => Some(TokenKind::Config),
        "desc" => Some(TokenKind::Desc),
        "extends" => Some(TokenKind::Extends),
        _ => None,
    }
}

/// A single token with its kind, text, and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// Byte offset of the token start.
    pub position: usize,
    /// Brace depth at the point the token was produced.
    pub depth: usize,
    pub modifier: Option<Modifier>,
}

impl Token {
    /// Text shown in error messages, `None` for end of input.
    #[must_use]
    pub fn found(&self) -> Option<String> {
        (self.kind != TokenKind::Eof).then(|| self.text.clone())
    }
}

const DUMP_LIMIT: usize = 50;

impl fmt::Display for Token {
    /// Renders `KIND(text)`, truncating long script bodies.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.chars().count() > DUMP_LIMIT {
            let head: String = self.text.chars().take(10).collect();
            write!(f, "{}({head:?}...)", self.kind)
        } else {
            write!(f, "{}({:?})", self.kind, self.text)
        }
    }
}
