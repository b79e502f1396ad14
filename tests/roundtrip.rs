//! Round-trip tests: canonical source survives scan, parse and format
//! unchanged.

mod common;

use common::roundtrip;
use runny::{format, parse_str};

#[test]
fn roundtrip_variables() {
    roundtrip("var {\n\tname \"Tim\"\n\tcount 3\n}\n");
}

#[test]
fn roundtrip_config() {
    roundtrip("config {\n\tshell \"/bin/bash\"\n}\n");
}

#[test]
fn roundtrip_target_and_run() {
    roundtrip("target build {\n\trun { cargo build }\n}\n\nrun build\n");
}

#[test]
fn roundtrip_staged_target() {
    roundtrip(
        "target release {\n\trun:before { echo start }\n\trun { make }\n\trun:after { echo done }\n}\n",
    );
}

#[test]
fn roundtrip_multi_line_script() {
    roundtrip("target image {\n\trun {\n\t\tdocker build \\\n\t\t-t app \\\n\t\t\t.\n\t}\n}\n");
}

#[test]
fn roundtrip_script_with_blank_line() {
    roundtrip("run {\n\techo one\n\n\techo two\n}\n");
}

#[test]
fn roundtrip_script_with_braces() {
    roundtrip("run { for f in *; do { echo \"$f\"; }; done }\n");
}

#[test]
fn roundtrip_description() {
    roundtrip("desc {\n\t\"builds the app\"\n\t`then says \"done\"`\n}\n");
}

#[test]
fn roundtrip_extends() {
    roundtrip("extends {\n\t\"base.rny\"\n\t\"lib/common.rny\"\n}\n");
}

#[test]
fn roundtrip_command_backed_variable() {
    roundtrip("var {\n\tsha {\n\t\trun { git rev-parse --short HEAD }\n\t}\n}\n");
}

#[test]
fn roundtrip_named_run_with_body() {
    roundtrip("target deploy {\n\trun:after notify {\n\t\tvar {\n\t\t\tchannel \"ops\"\n\t\t}\n\t}\n}\n");
}

#[test]
fn roundtrip_full_file() {
    roundtrip(
        "\
config {
\tshell \"sh\"
}
extends {
\t\"base.rny\"
}
var {
\tname \"runny\"
\tversion {
\t\trun { git describe --tags }
\t}
}

target build {
\tdesc {
\t\t\"compile everything\"
\t}
\trun:before { echo \"building $name\" }
\trun { make all }
}

target test {
\trun build
\trun { make test }
}

run test
",
    );
}

#[test]
fn format_is_idempotent_on_messy_input() {
    let messy = "var{a 1,b 2}target   t{run:after{  echo   a  }\n\n run{\n      ls\n         -la\n}}\nrun t";
    let once = format(&parse_str(messy).expect("parse messy"));
    let twice = format(&parse_str(&once).expect("parse formatted"));
    assert_eq!(once, twice);
}
