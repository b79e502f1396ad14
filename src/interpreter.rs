//! Tree-walking evaluator.
//!
//! Walks a statement tree against a stack of [`Environment`] scopes.
//! Actions start their shell process immediately and hand it to the
//! [`Printer`], which presents output in statement order once the walk is
//! over.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::ast::{
    ActionStatement, Binding, ConfigStatement, DescribeStatement, Expression, ExtendsStatement,
    Literal, RunStatement, Stage, Statement, TargetStatement, VariableStatement, dedent,
    sort_by_stage,
};
use crate::environment::{Environment, Value};
use crate::printer::Printer;

/// Shell used when no `config { shell … }` is in effect.
pub const DEFAULT_SHELL: &str = "sh";

/// Failure raised while walking the tree or flushing its output.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("undefined target '{0}'")]
    UndefinedTarget(String),
    #[error("extends path must be a string, got {0}")]
    InvalidExtendsPath(String),
    #[error("circular extends of '{}'", .0.display())]
    CircularExtends(PathBuf),
    #[error("cannot read '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("in '{}': {source}", path.display())]
    Extends {
        path: PathBuf,
        source: Box<crate::Error>,
    },
    #[error("cannot start '{shell}': {source}")]
    Spawn { shell: String, source: io::Error },
    #[error("command failed ({status}): {command}")]
    CommandFailed { command: String, status: ExitStatus },
    #[error("output error: {0}")]
    Output(#[source] io::Error),
}

/// Evaluates statement trees, writing user-visible output to `W`.
///
/// One interpreter is used per entry file; files pulled in through
/// `extends` share its root scope and configuration.
pub struct Interpreter<W: Write = io::Stdout> {
    origin: PathBuf,
    environment: Environment,
    config: HashMap<String, Literal>,
    printer: Printer,
    out: W,
    extending: Vec<PathBuf>,
}

impl Interpreter<io::Stdout> {
    /// Interpreter for the file at `origin`, printing to stdout.
    #[must_use]
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self::with_output(origin, io::stdout())
    }
}

impl<W: Write> Interpreter<W> {
    /// Interpreter for the file at `origin`, printing to `out`.
    ///
    /// `origin` anchors relative `extends` paths.
    pub fn with_output(origin: impl Into<PathBuf>, out: W) -> Self {
        let origin = origin.into();
        let extending = vec![canonical(&origin)];
        Self {
            origin,
            environment: Environment::new(),
            config: HashMap::new(),
            printer: Printer::new(),
            out,
            extending,
        }
    }

    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The configured shell, or [`DEFAULT_SHELL`] when unset or not text.
    #[must_use]
    pub fn shell(&self) -> &str {
        self.config
            .get("shell")
            .and_then(Literal::as_text)
            .filter(|shell| !shell.is_empty())
            .unwrap_or(DEFAULT_SHELL)
    }

    #[must_use]
    pub fn config(&self, name: &str) -> Option<&Literal> {
        self.config.get(name)
    }

    /// Consume the interpreter and return its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Walk `statements`, then flush every queued output entry.
    ///
    /// Returns one result per top-level statement: the literal value for
    /// expression statements and `None` for everything else.
    ///
    /// # Errors
    ///
    /// The first failure aborts the walk. Output already queued is still
    /// flushed so started processes are reaped, and the walk error wins
    /// over any flush error.
    pub fn evaluate(&mut self, statements: &[Statement]) -> Result<Vec<Option<String>>, RuntimeError> {
        let walked = self.walk(statements);
        let flushed = self.printer.flush(&mut self.out);
        let results = walked?;
        flushed?;
        Ok(results)
    }

    fn walk(&mut self, statements: &[Statement]) -> Result<Vec<Option<String>>, RuntimeError> {
        statements
            .iter()
            .map(|statement| self.execute(statement))
            .collect()
    }

    fn execute_all<'s>(
        &mut self,
        statements: impl IntoIterator<Item = &'s Statement>,
    ) -> Result<(), RuntimeError> {
        for statement in statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Result<Option<String>, RuntimeError> {
        match statement {
            Statement::Config(config) => self.config_statement(config)?,
            Statement::Variable(variable) => self.variable_statement(variable)?,
            Statement::Target(target) => self.target_statement(target),
            Statement::Run(run) => self.run_statement(run)?,
            Statement::Action(action) => self.action_statement(action)?,
            Statement::Describe(describe) => self.describe_statement(describe),
            Statement::Extends(extends) => self.extends_statement(extends)?,
            Statement::Expression(expression) => {
                let Expression::Literal(literal) = &expression.expression;
                return Ok(Some(literal.value().to_string()));
            }
        }
        Ok(None)
    }

    fn config_statement(&mut self, config: &ConfigStatement) -> Result<(), RuntimeError> {
        for Binding { name, initializer } in &config.items {
            let value = match initializer {
                Statement::Expression(expression) => {
                    let Expression::Literal(literal) = &expression.expression;
                    literal.clone()
                }
                Statement::Run(run) => Literal::String(self.capture(run)?),
                other => Literal::String(self.execute(other)?.unwrap_or_default()),
            };
            debug!(name = %name, %value, "config set");
            self.config.insert(name.clone(), value);
        }
        Ok(())
    }

    fn variable_statement(&mut self, variable: &VariableStatement) -> Result<(), RuntimeError> {
        for Binding { name, initializer } in &variable.items {
            let value = match initializer {
                Statement::Run(run) => Value::Pending(run.clone()),
                Statement::Expression(expression) => {
                    let Expression::Literal(literal) = &expression.expression;
                    Value::Text(literal.value().to_string())
                }
                other => Value::Text(self.execute(other)?.unwrap_or_default()),
            };
            self.environment.define_variable(name, value);
        }
        Ok(())
    }

    fn target_statement(&mut self, target: &TargetStatement) {
        let mut body = target.body.clone();
        sort_by_stage(&mut body);
        debug!(name = %target.name, statements = body.len(), "target defined");
        self.environment.define_target(&target.name, body);
    }

    fn run_statement(&mut self, run: &RunStatement) -> Result<(), RuntimeError> {
        let target = match &run.name {
            Some(name) => {
                debug!(name = %name, "running target");
                self.environment.get_target(name)?.to_vec()
            }
            None => Vec::new(),
        };

        self.environment.push_scope();
        debug!(depth = self.environment.depth(), "scope entered");
        let result = self.execute_all(run.body.iter().chain(&target));
        self.environment.pop_scope();
        result
    }

    fn action_statement(&mut self, action: &ActionStatement) -> Result<(), RuntimeError> {
        let script = action.script.trim();
        if script.is_empty() {
            return Ok(());
        }
        let variables = self.resolve_variables()?;
        let shell = self.shell().to_string();

        self.printer.push_text(format!("{}\n", dedent(script)));
        debug!(shell = %shell, script, "spawning command");
        let child = Command::new(&shell)
            .arg("-c")
            .arg(script)
            .envs(variables)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::Spawn { shell, source })?;
        self.printer.push_process(script, child);
        Ok(())
    }

    fn describe_statement(&mut self, describe: &DescribeStatement) {
        for line in &describe.lines {
            self.printer.push_text(format!("> {line}\n"));
        }
    }

    fn extends_statement(&mut self, extends: &ExtendsStatement) -> Result<(), RuntimeError> {
        for Expression::Literal(literal) in &extends.paths {
            let relative = literal
                .as_text()
                .ok_or_else(|| RuntimeError::InvalidExtendsPath(literal.to_string()))?;
            let base = self.origin.parent().unwrap_or_else(|| Path::new(""));
            let path = base.join(relative);
            self.include(&path)?;
        }
        Ok(())
    }

    /// Read, scan, parse and walk another file in the current scope.
    fn include(&mut self, path: &Path) -> Result<(), RuntimeError> {
        let key = canonical(path);
        if self.extending.contains(&key) {
            return Err(RuntimeError::CircularExtends(path.to_path_buf()));
        }
        info!(path = %path.display(), "extending file");

        let source = fs::read_to_string(path).map_err(|source| RuntimeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let statements = crate::parse_str(&source).map_err(|source| RuntimeError::Extends {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        let previous = std::mem::replace(&mut self.origin, path.to_path_buf());
        self.extending.push(key);
        let result = self.walk(&statements);
        self.extending.pop();
        self.origin = previous;
        result.map(|_| ())
    }

    /// Resolve every visible variable to the text injected into a process
    /// environment.
    fn resolve_variables(&self) -> Result<Vec<(String, String)>, RuntimeError> {
        let visible = self.environment.visible_variables();
        let mut resolved = Vec::with_capacity(visible.len());
        for (name, value) in visible {
            let text = match value {
                Value::Text(text) => unquote(text).to_string(),
                Value::Pending(run) => self.capture(run)?,
            };
            resolved.push((name.to_string(), text));
        }
        Ok(resolved)
    }

    /// Run the scripts of a command-backed value synchronously and return
    /// their combined output with trailing newlines removed.
    ///
    /// Only literal-valued variables are passed to these commands. A
    /// non-zero exit is tolerated.
    fn capture(&self, run: &RunStatement) -> Result<String, RuntimeError> {
        let mut scripts = Vec::new();
        self.collect_scripts(run, &mut scripts)?;

        let literals: Vec<(&str, &str)> = self
            .environment
            .visible_variables()
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::Text(text) => Some((name, unquote(text))),
                Value::Pending(_) => None,
            })
            .collect();

        let shell = self.shell();
        let mut captured = Vec::new();
        for script in scripts {
            debug!(shell, script, "capturing command output");
            let output = Command::new(shell)
                .arg("-c")
                .arg(script)
                .envs(literals.iter().copied())
                .stdin(Stdio::null())
                .output()
                .map_err(|source| RuntimeError::Spawn {
                    shell: shell.to_string(),
                    source,
                })?;
            if !output.status.success() {
                warn!(script, status = %output.status, "command substitution failed");
            }
            captured.extend_from_slice(&output.stdout);
            captured.extend_from_slice(&output.stderr);
        }

        let text = String::from_utf8_lossy(&captured);
        Ok(text.trim_end_matches(['\n', '\r']).to_string())
    }

    fn collect_scripts<'s>(
        &'s self,
        run: &'s RunStatement,
        scripts: &mut Vec<&'s str>,
    ) -> Result<(), RuntimeError> {
        let target = match &run.name {
            Some(name) => self.environment.get_target(name)?,
            None => &[],
        };
        for statement in run.body.iter().chain(target) {
            match statement {
                Statement::Action(action) if !action.script.trim().is_empty() => {
                    scripts.push(action.script.trim());
                }
                Statement::Run(nested) => self.collect_scripts(nested, scripts)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn unquote(text: &str) -> &str {
    text.trim_matches('"')
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Restrict `statements` to running the target called `name`.
///
/// Every top-level statement except run blocks is kept, so definitions,
/// configuration, descriptions and extends still apply, and a run of the
/// named target is appended.
///
/// # Errors
///
/// Returns `RuntimeError::UndefinedTarget` when no top-level target has
/// that name; nothing should be evaluated in that case.
pub fn filter_target(statements: &[Statement], name: &str) -> Result<Vec<Statement>, RuntimeError> {
    let declared = statements
        .iter()
        .any(|statement| matches!(statement, Statement::Target(target) if target.name == name));
    if !declared {
        return Err(RuntimeError::UndefinedTarget(name.to_string()));
    }

    let mut filtered: Vec<Statement> = statements
        .iter()
        .filter(|statement| !matches!(statement, Statement::Run(_)))
        .cloned()
        .collect();
    filtered.push(Statement::Run(RunStatement {
        name: Some(name.to_string()),
        body: Vec::new(),
        stage: Stage::During,
    }));
    Ok(filtered)
}
