use std::{
    env,
    process::{Command, Output, Stdio},
};

fn root() -> String {
    env::var("CARGO_MANIFEST_DIR").expect("manifest dir not set by cargo")
}

fn yadrol(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_yadrol"))
        .current_dir(root())
        .args(args)
        .env_remove("YADROL_MODE")
        .env_remove("YADROL_SAMPLE_SIZE")
        .env_remove("YADROL_DEFAULT_TYPE")
        .env_remove("YADROL_SEED")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run yadrol")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "yadrol failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn inline_roll_prints_its_value() {
    let output = yadrol(&["-e", "roll 3", "--seed", "1"]);
    assert_eq!(stdout(&output), "3: 3\n");
}

#[test]
fn rolls_list_the_dice_thrown() {
    let text = stdout(&yadrol(&["-e", "roll 2d6 \"pair\"", "--seed", "9"]));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("pair: "));
    assert!(lines[1].starts_with("  d6 -> ["));
}

#[test]
fn implicit_output_samples_by_default() {
    let text = stdout(&yadrol(&["-e", "d6", "--sample-size", "600", "--seed", "4"]));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "d6");
    assert_eq!(lines.len(), 9);
    assert!(lines[8].contains("mean"));
}

#[test]
fn mode_can_come_from_the_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_yadrol"))
        .current_dir(root())
        .args(["-e", "2 + 3"])
        .env("YADROL_MODE", "roll")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run yadrol");
    assert_eq!(stdout(&output), "2 + 3: 5\n");
}

#[test]
fn imports_resolve_against_the_import_dir() {
    let text = stdout(&yadrol(&[
        "--import-dir",
        "lib",
        "-e",
        "import \"exploding.yadrol\"; roll successes([5, 6, 1], 5)",
    ]));
    assert!(text.ends_with(": 2\n"), "unexpected output {:?}", text);
}

#[test]
fn syntax_errors_fail_the_run() {
    let output = yadrol(&["-e", "1 +"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn evaluation_errors_fail_the_run() {
    let output = yadrol(&["-e", "roll 1 / 0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("division by zero"));
}

#[test]
fn runaway_recursion_is_reported() {
    let output = yadrol(&[
        "-e",
        "f = fun(n) { if n == 0 then 0 else f(n - 1) }; roll f(5000)",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("recursion limit"));

    let deep = stdout(&yadrol(&[
        "-e",
        "f = fun(n) { if n == 0 then 0 else f(n - 1) }; roll f(300) \"deep\"",
    ]));
    assert_eq!(deep, "deep: 0\n");
}
