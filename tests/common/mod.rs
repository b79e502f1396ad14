#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use runny::{Interpreter, RuntimeError, format, parse, parse_str, scan};

pub fn roundtrip(input: &str) {
    let tokens = scan(input).expect("scan failed");
    let statements = parse(&tokens).expect("parse failed");
    let output = format(&statements);
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
}

/// Evaluate `source` as if it were the file at `origin`, capturing output.
pub fn evaluate_at(origin: &Path, source: &str) -> (Result<Vec<Option<String>>, RuntimeError>, String) {
    let statements = parse_str(source).unwrap_or_else(|e| panic!("{e}\n--- source ---\n{source}"));
    let mut interpreter = Interpreter::with_output(origin, Vec::new());
    let result = interpreter.evaluate(&statements);
    let output = String::from_utf8(interpreter.into_output()).expect("utf8 output");
    (result, output)
}

pub fn evaluate(source: &str) -> (Result<Vec<Option<String>>, RuntimeError>, String) {
    evaluate_at(Path::new("runny.rny"), source)
}

/// Write `contents` to `name` under `dir`, creating parent directories.
pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&path, contents).expect("write file");
    path
}
