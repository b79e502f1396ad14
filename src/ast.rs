use std::fmt;

use crate::token::Modifier;

/// Relative ordering of run blocks inside a target body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    Before,
    #[default]
    During,
    After,
}

impl From<Option<Modifier>> for Stage {
    fn from(modifier: Option<Modifier>) -> Self {
        match modifier {
            Some(Modifier::Before) => Self::Before,
            Some(Modifier::After) => Self::After,
            None => Self::During,
        }
    }
}

impl Stage {
    /// The modifier that selects this stage, `None` for the default stage.
    #[must_use]
    pub const fn modifier(self) -> Option<Modifier> {
        match self {
            Self::Before => Some(Modifier::Before),
            Self::During => None,
            Self::After => Some(Modifier::After),
        }
    }
}

/// Literal value as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Quoted text (`"…"` or `` `…` ``), quotes removed.
    String(String),
    /// Digit run, kept as text.
    Number(String),
    /// Bare word such as `post-auth`.
    Identifier(String),
}

impl Literal {
    /// Return the inner text regardless of how it was written.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::String(s) | Self::Number(s) | Self::Identifier(s) => s,
        }
    }

    /// Textual value, `None` for numbers.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Identifier(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) if s.contains('"') => write!(f, "`{s}`"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Number(s) | Self::Identifier(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Literal(Literal),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => literal.fmt(f),
        }
    }
}

/// One `name initializer` pair inside `var { … }` or `config { … }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Either an `Expression` statement or a `Run` statement.
    pub initializer: Statement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStatement {
    pub items: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableStatement {
    pub items: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetStatement {
    pub name: String,
    pub body: Vec<Statement>,
}

/// Inline block, target reference, or both (`run name { … }`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatement {
    pub name: Option<String>,
    pub body: Vec<Statement>,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStatement {
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeStatement {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendsStatement {
    pub paths: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionStatement {
    pub expression: Expression,
}

/// Statement tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Config(ConfigStatement),
    Variable(VariableStatement),
    Target(TargetStatement),
    Run(RunStatement),
    Action(ActionStatement),
    Describe(DescribeStatement),
    Extends(ExtendsStatement),
    Expression(ExpressionStatement),
}

impl Statement {
    /// Stage used when ordering a target body; only run blocks carry one.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Run(run) => run.stage,
            _ => Stage::During,
        }
    }

    /// Shorthand for a literal expression statement.
    #[must_use]
    pub const fn literal(literal: Literal) -> Self {
        Self::Expression(ExpressionStatement {
            expression: Expression::Literal(literal),
        })
    }

    /// Shorthand for an action statement.
    #[must_use]
    pub fn action(script: impl Into<String>) -> Self {
        Self::Action(ActionStatement {
            script: script.into(),
        })
    }
}

/// Stably sort a target body so `before` runs precede unmarked ones and
/// `after` runs come last.
pub fn sort_by_stage(body: &mut [Statement]) {
    body.sort_by_key(Statement::stage);
}

/// Strip the indentation shared by every continuation line of a script.
///
/// The first line is already trimmed by the scanner, so it is left alone.
#[must_use]
pub fn dedent(script: &str) -> String {
    let mut lines = script.lines();
    let Some(first) = lines.next() else {
        return String::new();
    };
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut out = first.trim_end().to_string();
    for line in rest {
        out.push('\n');
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(line[indent..].trim_end());
    }
    out
}
