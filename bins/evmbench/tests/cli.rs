use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join(name)
}

fn evmbench(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_evmbench"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to spawn evmbench")
}

fn run_fixture(path: &Path, extra: &[&str]) -> Output {
    let path = path.to_str().unwrap();
    let mut args = vec!["fixture", path, "--iterations", "100"];
    args.extend_from_slice(extra);
    evmbench(&args)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn well_formed_fixture_runs_all_iterations() {
    let output = run_fixture(&fixture("fixtures/sample.json"), &["--check-output"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout(&output);
    assert!(stdout.contains("Ran 100 iterations of"), "{stdout}");
    assert!(stdout.contains("sample.json::add_one"), "{stdout}");
    assert!(stdout.contains("Average time per iteration:"), "{stdout}");
}

#[test]
fn commit_mode_replays_the_transaction() {
    let output = run_fixture(&fixture("fixtures/sample.json"), &["--commit"]);
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn directory_runs_every_fixture() {
    let output = run_fixture(&fixture("fixtures"), &["--expect", "any"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout(&output);
    assert!(stdout.contains("revert.json::add_too_large"), "{stdout}");
    assert!(stdout.contains("sample.json::add_one"), "{stdout}");
}

#[test]
fn malformed_fixture_fails() {
    for name in ["malformed/missing_env.json", "malformed/truncated.json"] {
        let output = run_fixture(&fixture(name), &[]);
        assert!(!output.status.success(), "{name}: {output:?}");
        assert!(!stdout(&output).contains("Ran "), "{name}");
    }
}

#[test]
fn missing_path_fails() {
    let output = run_fixture(&fixture("fixtures/does_not_exist.json"), &[]);
    assert!(!output.status.success());
}

#[test]
fn revert_expectation_passes_on_revert() {
    let output = run_fixture(&fixture("fixtures/revert.json"), &["--expect", "revert"]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("Ran 100 iterations of"));
}

#[test]
fn revert_expectation_fails_on_success() {
    let output = run_fixture(&fixture("fixtures/sample.json"), &["--expect", "revert"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("expected revert but transaction succeeded"));
}

#[test]
fn success_expectation_fails_on_revert() {
    let output = run_fixture(&fixture("fixtures/revert.json"), &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("execution reverted"));
}

#[test]
fn revert_output_matches_fixture() {
    let output = run_fixture(
        &fixture("fixtures/revert.json"),
        &["--expect", "revert", "--check-output"],
    );
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn wrong_recorded_output_fails() {
    let output = run_fixture(&fixture("mismatch/wrong_out.json"), &["--check-output"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected output"));
    assert!(!stdout(&output).contains("Ran "));

    // Without the check the same fixture benchmarks fine.
    let output = run_fixture(&fixture("mismatch/wrong_out.json"), &[]);
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn duration_mode_runs_fixture() {
    let path = fixture("fixtures/sample.json");
    let output = evmbench(&["fixture", path.to_str().unwrap(), "--duration-ms", "10"]);
    assert!(output.status.success(), "{output:?}");
    assert!(!stdout(&output).contains("Average time per iteration:"));
}

#[test]
fn unknown_test_fails() {
    let output = run_fixture(&fixture("fixtures/sample.json"), &["--test", "nope"]);
    assert!(!output.status.success());
}

#[test]
fn contract_bench_runs_both_variants() {
    let output = evmbench(&["contract", "--iterations", "100"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout(&output);
    assert!(stdout.contains("Starting EVM benchmark with 100 iterations..."));
    assert!(stdout.contains("Ran 100 iterations of success test"), "{stdout}");
    assert!(stdout.contains("Ran 100 iterations of revert test"), "{stdout}");
}

#[test]
fn contract_bench_runs_on_sputnikvm() {
    let output = evmbench(&["contract", "--engine", "sputnik", "--iterations", "100"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout(&output);
    assert!(
        stdout.contains("Ran 100 iterations of success test on sputnikvm"),
        "{stdout}"
    );
    assert!(
        stdout.contains("Ran 100 iterations of revert test on sputnikvm"),
        "{stdout}"
    );
}
