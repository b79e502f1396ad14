//! Lexically scoped name tables for variables and targets.
//!
//! Scopes are strictly nested: one is pushed when a run block is entered
//! and popped when it finishes, so the chain is a stack and lookups walk
//! it from the innermost scope outward.

use std::collections::{BTreeMap, HashMap};

use crate::ast::{RunStatement, Statement};
use crate::interpreter::RuntimeError;

/// Value bound to a variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Literal text.
    Text(String),
    /// Run block whose output is the value; executed on every lookup.
    Pending(RunStatement),
}

#[derive(Debug, Default)]
struct Scope {
    variables: HashMap<String, Value>,
    targets: HashMap<String, Vec<Statement>>,
}

#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Environment holding only the root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Nesting depth of the innermost scope; the root scope is 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Discard the innermost scope. The root scope is never discarded.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn innermost(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn define_variable(&mut self, name: &str, value: Value) {
        if !name.is_empty() {
            self.innermost().variables.insert(name.to_string(), value);
        }
    }

    pub fn define_target(&mut self, name: &str, body: Vec<Statement>) {
        if !name.is_empty() {
            self.innermost().targets.insert(name.to_string(), body);
        }
    }

    /// Look up a single binding, innermost scope first.
    ///
    /// Evaluation never fails on an unbound name: actions receive
    /// [`Environment::visible_variables`] as process environment, so the
    /// shell expands an unknown `$name` to nothing. This lookup serves
    /// embedders inspecting state after a walk.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::UndefinedVariable` when no scope binds `name`.
    pub fn get_variable(&self, name: &str) -> Result<&Value, RuntimeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.get(name))
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// # Errors
    ///
    /// Returns `RuntimeError::UndefinedTarget` when no scope binds `name`.
    pub fn get_target(&self, name: &str) -> Result<&[Statement], RuntimeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.targets.get(name))
            .map(Vec::as_slice)
            .ok_or_else(|| RuntimeError::UndefinedTarget(name.to_string()))
    }

    /// Every visible variable, inner bindings hiding outer ones, by name.
    #[must_use]
    pub fn visible_variables(&self) -> BTreeMap<&str, &Value> {
        let mut visible = BTreeMap::new();
        for scope in &self.scopes {
            for (name, value) in &scope.variables {
                visible.insert(name.as_str(), value);
            }
        }
        visible
    }
}
