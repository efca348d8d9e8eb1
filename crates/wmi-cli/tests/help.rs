mod common;

use common::wmi;

fn help_output(args: &[&str]) -> String {
    let assert = wmi().args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 help")
}

#[test]
fn top_level_help_lists_commands() {
    let output = help_output(&["--help"]);
    for command in ["inject", "show", "verify", "whitelist", "hook"] {
        assert!(output.contains(command), "{command} missing: {output}");
    }
}

#[test]
fn inject_help_mentions_selection_flags() {
    let output = help_output(&["inject", "--help"]);
    assert!(output.contains("--env-vars"), "{output}");
    assert!(output.contains("--env-file"), "{output}");
    assert!(output.contains("--output"), "{output}");
}

#[test]
fn whitelist_prints_names() {
    let output = help_output(&["whitelist"]);
    let names: Vec<&str> = output.lines().collect();
    assert_eq!(names.first(), Some(&"TORCH_CUDA_ARCH_LIST"));
    assert!(names.contains(&"CUDA_HOME"));
    assert!(names.contains(&"LDFLAGS"));
}
