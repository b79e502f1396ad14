//! Evaluation tests. Commands run through a POSIX `sh`.

mod common;

use common::{evaluate, evaluate_at, write};
use tempfile::tempdir;
use runny::{Error, Interpreter, RuntimeError, filter_target, parse_str};

// -----------------------------------------------------------
// Variables and scopes.
// -----------------------------------------------------------

#[test]
fn variables_reach_the_process_environment() {
    let (result, out) = evaluate("var { name \"Tim\" }\nrun { echo \"hi $name\" }");
    result.expect("evaluate");
    assert_eq!(out, "echo \"hi $name\"\nhi Tim\n");
}

#[test]
fn parent_environment_is_inherited() {
    let (result, out) = evaluate("run { test -n \"$PATH\" && echo has-path }");
    result.expect("evaluate");
    assert_eq!(out, "test -n \"$PATH\" && echo has-path\nhas-path\n");
}

#[test]
fn inner_scope_shadows_and_is_discarded() {
    let source = "\
target show {
\tvar {
\t\tx \"inner\"
\t}
\trun { echo $x }
}
var {
\tx \"outer\"
}
run show
run { echo $x }
";
    let (result, out) = evaluate(source);
    result.expect("evaluate");
    assert_eq!(out, "echo $x\ninner\necho $x\nouter\n");
}

#[test]
fn run_block_variable_not_visible_to_siblings() {
    let statements = parse_str(
        "target noop { }\nrun noop { var { who \"inner\" } }\nrun { echo \"[${who:-unset}]\" }",
    )
    .expect("parse");
    let mut interpreter = Interpreter::with_output("runny.rny", Vec::new());
    interpreter.evaluate(&statements).expect("evaluate");
    let out = String::from_utf8(interpreter.into_output()).unwrap();
    assert!(out.ends_with("[unset]\n"), "{out}");
}

#[test]
fn command_backed_variable_sees_literal_variables() {
    let (result, out) = evaluate(
        "var {\n\twho \"Ann\"\n\tgreeting {\n\t\trun { echo \"hi $who\" }\n\t}\n}\nrun { echo \"$greeting!\" }",
    );
    result.expect("evaluate");
    assert!(out.ends_with("hi Ann!\n"), "{out}");
}

#[test]
fn command_backed_variable_runs_on_every_lookup() {
    let dir = tempdir().expect("tempdir");
    let counter = dir.path().join("counter");
    let source = format!(
        "var {{\n\tn {{\n\t\trun {{ echo x >> '{0}'; wc -l < '{0}' | tr -d ' ' }}\n\t}}\n}}\nrun {{ echo $n }}\nrun {{ echo $n }}",
        counter.display()
    );
    let (result, out) = evaluate(&source);
    result.expect("evaluate");
    assert_eq!(out, "echo $n\n1\necho $n\n2\n");
}

#[test]
fn failed_capture_is_tolerated() {
    let (result, out) = evaluate(
        "var { v { run { echo partial; exit 1 } } }\nrun { echo \"[$v]\" }",
    );
    result.expect("evaluate");
    assert!(out.ends_with("[partial]\n"), "{out}");
}

#[test]
fn capture_includes_stderr() {
    let (result, out) = evaluate(
        "var { v { run { echo out; echo err >&2 } } }\nrun { echo \"$v\" | tr '\\n' ' ' }",
    );
    result.expect("evaluate");
    assert!(out.ends_with("out err \n"), "{out}");
}

// -----------------------------------------------------------
// Targets and stages.
// -----------------------------------------------------------

#[test]
fn target_stages_run_in_order() {
    let (result, out) = evaluate(
        "target t {\n\trun:after { echo C }\n\trun { echo B }\n\trun:before { echo A }\n}\nrun t",
    );
    result.expect("evaluate");
    assert_eq!(out, "echo A\nA\necho B\nB\necho C\nC\n");
}

#[test]
fn named_run_executes_its_body_then_the_target() {
    let (result, out) = evaluate(
        "target greet { run { echo \"hello $who\" } }\nrun greet { var { who \"world\" } }",
    );
    result.expect("evaluate");
    assert_eq!(out, "echo \"hello $who\"\nhello world\n");
}

#[test]
fn output_follows_statement_order() {
    let (result, out) = evaluate(
        "run { sleep 0.2; echo slow }\ndesc { \"between\" }\nrun { echo fast }",
    );
    result.expect("evaluate");
    assert_eq!(
        out,
        "sleep 0.2; echo slow\nslow\n> between\necho fast\nfast\n"
    );
}

#[test]
fn scripts_are_shown_dedented() {
    let (result, out) = evaluate("run {\n\t\techo a\n\t\techo b\n}");
    result.expect("evaluate");
    assert_eq!(out, "echo a\necho b\na\nb\n");
}

#[test]
fn failing_command_is_an_error() {
    let (result, out) = evaluate("run { echo before; exit 4 }\nrun { echo after }");
    let err = result.expect_err("exit 4");
    assert!(matches!(
        err,
        RuntimeError::CommandFailed { ref command, status }
            if command == "echo before; exit 4" && status.code() == Some(4)
    ));
    assert!(out.starts_with("echo before; exit 4\nbefore\n"), "{out}");
}

#[test]
fn configured_shell_is_used() {
    let (result, out) = evaluate("config { shell \"/bin/sh\" }\nrun { echo configured }");
    result.expect("evaluate");
    assert_eq!(out, "echo configured\nconfigured\n");
}

#[test]
fn missing_shell_is_a_spawn_error() {
    let (result, _) = evaluate("config { shell \"/nonexistent/shell\" }\nrun { echo hi }");
    assert!(matches!(
        result,
        Err(RuntimeError::Spawn { ref shell, .. }) if shell == "/nonexistent/shell"
    ));
}

// -----------------------------------------------------------
// Target filtering.
// -----------------------------------------------------------

#[test]
fn filter_runs_only_the_requested_target() {
    let statements = parse_str(
        "var { who \"b\" }\ntarget a { run { echo a } }\ntarget b { run { echo $who } }\nrun { echo top }",
    )
    .expect("parse");
    let filtered = filter_target(&statements, "b").expect("filter");
    let mut interpreter = Interpreter::with_output("runny.rny", Vec::new());
    interpreter.evaluate(&filtered).expect("evaluate");
    let out = String::from_utf8(interpreter.into_output()).unwrap();
    assert_eq!(out, "echo $who\nb\n");
}

#[test]
fn filter_unknown_target_runs_nothing() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("marker");
    let source = format!(
        "target a {{ run {{ touch '{}' }} }}\nrun a",
        marker.display()
    );
    let statements = parse_str(&source).expect("parse");
    let err = filter_target(&statements, "missing").expect_err("no such target");
    assert!(matches!(err, RuntimeError::UndefinedTarget(name) if name == "missing"));
    assert!(!marker.exists());
}

// -----------------------------------------------------------
// Extends.
// -----------------------------------------------------------

#[test]
fn extended_file_overrides_variables() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "b.rny", "var { name \"from b\" }\n");
    let main = write(
        dir.path(),
        "a.rny",
        "var { name \"from a\" }\nextends { \"b.rny\" }\nrun { echo \"$name\" }\n",
    );
    let source = std::fs::read_to_string(&main).unwrap();
    let (result, out) = evaluate_at(&main, &source);
    result.expect("evaluate");
    assert_eq!(out, "echo \"$name\"\nfrom b\n");
}

#[test]
fn extended_file_sees_existing_definitions() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "b.rny", "run { echo \"$greeting\" }\n");
    let main = dir.path().join("a.rny");
    let (result, out) = evaluate_at(&main, "var { greeting \"hi\" }\nextends { \"b.rny\" }");
    result.expect("evaluate");
    assert_eq!(out, "echo \"$greeting\"\nhi\n");
}

#[test]
fn targets_from_extended_files_can_run() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "lib/common.rny", "extends { \"more.rny\" }\n");
    write(dir.path(), "lib/more.rny", "target hello { run { echo hello } }\n");
    let main = dir.path().join("runny.rny");
    let (result, out) = evaluate_at(&main, "extends { \"lib/common.rny\" }\nrun hello");
    result.expect("evaluate");
    assert_eq!(out, "echo hello\nhello\n");
}

#[test]
fn targets_from_extended_files_cannot_be_selected() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "base.rny", "target greet { run { echo hi } }\n");
    let source = "extends { \"base.rny\" }\ntarget local { run greet }\n";
    let statements = parse_str(source).expect("parse");
    assert!(matches!(
        filter_target(&statements, "greet"),
        Err(RuntimeError::UndefinedTarget(name)) if name == "greet"
    ));

    let filtered = filter_target(&statements, "local").expect("filter");
    let mut interpreter = Interpreter::with_output(dir.path().join("runny.rny"), Vec::new());
    interpreter.evaluate(&filtered).expect("evaluate");
    let out = String::from_utf8(interpreter.into_output()).unwrap();
    assert_eq!(out, "echo hi\nhi\n");
}

#[test]
fn extending_twice_is_allowed() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "b.rny", "desc { \"b\" }\n");
    let main = dir.path().join("a.rny");
    let (result, out) = evaluate_at(&main, "extends { \"b.rny\", \"b.rny\" }");
    result.expect("evaluate");
    assert_eq!(out, "> b\n> b\n");
}

#[test]
fn circular_extends_is_an_error() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "b.rny", "extends { \"a.rny\" }\n");
    let main = write(dir.path(), "a.rny", "extends { \"b.rny\" }\n");
    let (result, _) = evaluate_at(&main, "extends { \"b.rny\" }\n");
    assert!(matches!(
        result,
        Err(RuntimeError::CircularExtends(ref path)) if path.ends_with("a.rny")
    ));
}

#[test]
fn missing_extended_file() {
    let dir = tempdir().expect("tempdir");
    let main = dir.path().join("a.rny");
    let (result, _) = evaluate_at(&main, "extends { \"nope.rny\" }");
    assert!(matches!(
        result,
        Err(RuntimeError::ReadFile { ref path, .. }) if path.ends_with("nope.rny")
    ));
}

#[test]
fn parse_error_in_extended_file() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), "broken.rny", "target {\n");
    let main = dir.path().join("a.rny");
    let (result, _) = evaluate_at(&main, "extends { \"broken.rny\" }");
    let err = result.expect_err("broken file");
    assert!(err.to_string().starts_with("in '"), "{err}");
    match err {
        RuntimeError::Extends { path, source } => {
            assert!(path.ends_with("broken.rny"));
            assert!(matches!(*source, Error::Parse(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn evaluate_returns_expression_values() {
    let (result, out) = evaluate("hello \"world\" 3 desc { \"x\" }");
    assert_eq!(
        result.expect("evaluate"),
        vec![
            Some("hello".to_string()),
            Some("world".to_string()),
            Some("3".to_string()),
            None,
        ]
    );
    assert_eq!(out, "> x\n");
}
