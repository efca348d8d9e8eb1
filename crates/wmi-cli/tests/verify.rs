mod common;

use common::{build_wheel, json_of, read_member, stdout_of, wmi};

fn injected_wheel(dir: &std::path::Path) -> std::path::PathBuf {
    let wheel = build_wheel(dir, "demo", "1.0");
    wmi()
        .env("TEST_ENV_VAR", "test_value")
        .arg("inject")
        .arg(&wheel)
        .args(["--env-vars", "TEST_ENV_VAR"])
        .assert()
        .success();
    wheel
}

#[test]
fn show_prints_recorded_pairs() {
    let temp = tempfile::tempdir().expect("tempdir");
    let wheel = injected_wheel(temp.path());

    let assert = wmi().arg("show").arg(&wheel).assert().success();
    assert_eq!(stdout_of(assert.get_output()), "TEST_ENV_VAR: test_value\n");
}

#[test]
fn show_without_metadata_is_a_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let wheel = build_wheel(temp.path(), "demo", "1.0");
    wmi().arg("show").arg(&wheel).assert().code(1);
}

#[test]
fn verify_accepts_matching_values() {
    let temp = tempfile::tempdir().expect("tempdir");
    let wheel = injected_wheel(temp.path());

    let assert = wmi()
        .args(["--json", "verify"])
        .arg(&wheel)
        .args(["--env-var", "TEST_ENV_VAR=test_value"])
        .assert()
        .success();
    let payload = json_of(assert.get_output());
    assert_eq!(payload["details"]["report"]["variables"][0]["status"], "match");
    assert_eq!(
        payload["details"]["report"]["record_issues"]
            .as_array()
            .map(Vec::len),
        Some(0)
    );
}

#[test]
fn verify_reports_mismatch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let wheel = injected_wheel(temp.path());

    let assert = wmi()
        .args(["--json", "verify"])
        .arg(&wheel)
        .args(["--env-var", "TEST_ENV_VAR=other"])
        .args(["--env-var", "CC=gcc"])
        .assert()
        .code(1);
    let payload = json_of(assert.get_output());
    let variables = &payload["details"]["report"]["variables"];
    assert_eq!(variables[0]["status"], "mismatch");
    assert_eq!(variables[0]["found"], "test_value");
    assert_eq!(variables[1]["status"], "missing");
}

#[test]
fn hook_injects_and_honors_skip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let wheel = build_wheel(temp.path(), "demo", "1.0");

    wmi()
        .env("WHEEL_METADATA_INJECTOR_SKIP", "1")
        .env("CC", "gcc")
        .arg("hook")
        .arg(temp.path())
        .args(["demo", "--env-vars", "CC"])
        .assert()
        .success();
    assert!(read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata").is_none());

    wmi()
        .env("CC", "gcc")
        .arg("hook")
        .arg(temp.path())
        .args(["demo", "--env-vars", "CC"])
        .assert()
        .success();
    assert_eq!(
        read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata").as_deref(),
        Some("CC: gcc\n")
    );
}

#[test]
fn hook_without_wheel_only_warns() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = wmi()
        .arg("hook")
        .arg(temp.path())
        .arg("demo")
        .assert()
        .success();
    let stdout = stdout_of(assert.get_output());
    assert!(stdout.contains("No wheel matching demo*.whl"), "{stdout}");
}
