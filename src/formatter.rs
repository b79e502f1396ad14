//! Pretty-printer that serializes a statement tree back into canonical
//! source text.
//!
//! Produces tab-indented output with one binding or description line per
//! line and a blank line around every target.

use std::fmt::Write as _;

use crate::ast::{Binding, RunStatement, Statement, dedent};

/// Format a statement tree into runnable source.
///
/// Formatting is idempotent: scanning and parsing the output and formatting
/// again yields the same text.
#[must_use]
pub fn format(statements: &[Statement]) -> String {
    let mut out = String::new();
    let mut prev_was_target = false;

    for (i, statement) in statements.iter().enumerate() {
        let is_target = matches!(statement, Statement::Target(_));
        if i > 0 && (is_target || prev_was_target) {
            out.push('\n');
        }
        format_statement(&mut out, statement, 0);
        prev_was_target = is_target;
    }

    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push('\t');
    }
}

fn format_statement(out: &mut String, statement: &Statement, level: usize) {
    indent(out, level);
    match statement {
        Statement::Config(config) => format_bindings(out, "config", &config.items, level),
        Statement::Variable(variable) => format_bindings(out, "var", &variable.items, level),
        Statement::Target(target) => {
            let _ = write!(out, "target {}", target.name);
            format_body(out, &target.body, level);
        }
        Statement::Run(run) => format_run(out, run, level),
        // A bare action only exists inside an unnamed run block.
        Statement::Action(action) => {
            out.push_str("run");
            format_scripts(out, &[action.script.as_str()], level);
        }
        Statement::Describe(describe) => {
            out.push_str("desc");
            format_lines(out, describe.lines.iter().map(|line| quote(line)), level);
        }
        Statement::Extends(extends) => {
            out.push_str("extends");
            format_lines(out, extends.paths.iter().map(ToString::to_string), level);
        }
        Statement::Expression(expression) => {
            let _ = writeln!(out, "{}", expression.expression);
        }
    }
}

fn format_bindings(out: &mut String, keyword: &str, items: &[Binding], level: usize) {
    out.push_str(keyword);
    if items.is_empty() {
        out.push_str(" {}\n");
        return;
    }

    out.push_str(" {\n");
    for Binding { name, initializer } in items {
        indent(out, level + 1);
        out.push_str(name);
        match initializer {
            Statement::Expression(expression) => {
                let _ = writeln!(out, " {}", expression.expression);
            }
            other => {
                out.push_str(" {\n");
                format_statement(out, other, level + 2);
                indent(out, level + 1);
                out.push_str("}\n");
            }
        }
    }
    indent(out, level);
    out.push_str("}\n");
}

fn format_body(out: &mut String, body: &[Statement], level: usize) {
    if body.is_empty() {
        out.push_str(" {}\n");
        return;
    }
    out.push_str(" {\n");
    for statement in body {
        format_statement(out, statement, level + 1);
    }
    indent(out, level);
    out.push_str("}\n");
}

fn format_run(out: &mut String, run: &RunStatement, level: usize) {
    out.push_str("run");
    if let Some(modifier) = run.stage.modifier() {
        let _ = write!(out, ":{}", modifier.as_str());
    }

    match &run.name {
        Some(name) => {
            let _ = write!(out, " {name}");
            if run.body.is_empty() {
                out.push('\n');
            } else {
                format_body(out, &run.body, level);
            }
        }
        None => {
            // Unnamed blocks are captured as raw script text, so only
            // actions survive in them.
            let scripts: Vec<&str> = run
                .body
                .iter()
                .filter_map(|statement| match statement {
                    Statement::Action(action) => Some(action.script.as_str()),
                    _ => None,
                })
                .collect();
            format_scripts(out, &scripts, level);
        }
    }
}

fn format_scripts(out: &mut String, scripts: &[&str], level: usize) {
    let script = dedent(scripts.join("\n").trim());
    if script.is_empty() {
        out.push_str(" {}\n");
    } else if !script.contains('\n') {
        let _ = writeln!(out, " {{ {script} }}");
    } else {
        out.push_str(" {\n");
        for line in script.lines() {
            if !line.is_empty() {
                indent(out, level + 1);
                out.push_str(line);
            }
            out.push('\n');
        }
        indent(out, level);
        out.push_str("}\n");
    }
}

fn format_lines(out: &mut String, lines: impl ExactSizeIterator<Item = String>, level: usize) {
    if lines.len() == 0 {
        out.push_str(" {}\n");
        return;
    }
    out.push_str(" {\n");
    for line in lines {
        indent(out, level + 1);
        out.push_str(&line);
        out.push('\n');
    }
    indent(out, level);
    out.push_str("}\n");
}

fn quote(text: &str) -> String {
    if text.contains('"') {
        format!("`{text}`")
    } else {
        format!("\"{text}\"")
    }
}
