use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;
use wmi_core::{
    inject_built_wheel, process_wheel_with, read_injected_metadata, verify_wheel, Config,
    EnvSnapshot, ExecutionOutcome, HookOptions, HookOutcome, InjectRequest, Selection,
    VariableStatus, ENV_WHITELIST,
};
use wmi_domain::EnvVarPair;

use crate::cli::{CommandCli, HookArgs, InjectArgs, SelectionArgs, VerifyArgs};

/// Runs one CLI command against a captured environment.
pub fn execute(command: &CommandCli, env: &EnvSnapshot) -> ExecutionOutcome {
    let config = Config::from_snapshot(env);
    debug!(?config, command = command.name(), "dispatching");
    match command {
        CommandCli::Inject(args) => inject(args, &config, env),
        CommandCli::Show(args) => show(&args.wheel),
        CommandCli::Verify(args) => verify(args),
        CommandCli::Whitelist => whitelist(),
        CommandCli::Hook(args) => hook(args, &config, env),
    }
}

fn selection_for(args: &SelectionArgs, config: &Config) -> Selection {
    Selection::from_sources(
        args.env_vars.clone(),
        args.env_file
            .clone()
            .or_else(|| config.default_env_file.clone()),
    )
}

fn variable_lines(variables: &[EnvVarPair]) -> Vec<String> {
    variables.iter().map(|pair| format!("  {}", pair.name)).collect()
}

fn inject(args: &InjectArgs, config: &Config, env: &EnvSnapshot) -> ExecutionOutcome {
    let selection = selection_for(&args.selection, config);
    let request = InjectRequest::new(&args.wheel, selection.clone()).with_output(args.output.clone());
    let report = match process_wheel_with(&request, env) {
        Ok(report) => report,
        Err(err) => return ExecutionOutcome::from_error(&err),
    };

    let mut warnings = Vec::new();
    let mut lines = Vec::new();
    if report.variables.is_empty() {
        warnings.push("No environment variables found to inject.".to_string());
    } else {
        lines.push(format!(
            "Found {} environment variables to inject",
            report.variables.len()
        ));
        lines.extend(variable_lines(&report.variables));
    }
    ExecutionOutcome::success(
        format!("Successfully processed wheel: {}", report.path.display()),
        json!({
            "selection": selection.describe(),
            "report": report,
            "lines": lines,
            "warnings": warnings,
        }),
    )
}

fn show(wheel: &Path) -> ExecutionOutcome {
    let read = match read_injected_metadata(wheel) {
        Ok(read) => read,
        Err(err) => return ExecutionOutcome::from_error(&err),
    };
    let Some(variables) = read.variables else {
        return ExecutionOutcome::user_error(
            format!("{} has no {}", wheel.display(), read.layout.metadata_path),
            json!({
                "reason": "metadata_missing",
                "path": wheel.display().to_string(),
                "hint": "Run `wheel-metadata-injector inject` on the wheel first.",
            }),
        );
    };
    let lines: Vec<String> = variables
        .iter()
        .map(|pair| format!("{}: {}", pair.name, pair.value))
        .collect();
    ExecutionOutcome::success(
        format!(
            "{} variables recorded in {}",
            variables.len(),
            read.layout.metadata_path
        ),
        json!({
            "path": wheel.display().to_string(),
            "metadata_path": read.layout.metadata_path,
            "variables": variables,
            "lines": lines,
            "passthrough": true,
        }),
    )
}

fn verify(args: &VerifyArgs) -> ExecutionOutcome {
    let report = match verify_wheel(&args.wheel, &args.expected) {
        Ok(report) => report,
        Err(err) => return ExecutionOutcome::from_error(&err),
    };

    let mut lines = Vec::new();
    for check in &report.variables {
        lines.push(match &check.status {
            VariableStatus::Match => format!("  ok       {}={}", check.name, check.expected),
            VariableStatus::Mismatch { found } => format!(
                "  mismatch {}: expected `{}`, found `{}`",
                check.name, check.expected, found
            ),
            VariableStatus::Missing => format!("  missing  {}", check.name),
        });
    }
    for issue in &report.record_issues {
        lines.push(format!("  record   {}: {}", issue.path, issue.problem));
    }

    let details = json!({
        "path": args.wheel.display().to_string(),
        "report": report,
        "lines": lines,
    });
    if report.is_ok() {
        return ExecutionOutcome::success(
            format!("{} verified", args.wheel.display()),
            details,
        );
    }
    let message = if report.has_metadata {
        format!(
            "{} failed verification: {} variable(s) differ, {} RECORD issue(s)",
            args.wheel.display(),
            report.failed_variables(),
            report.record_issues.len()
        )
    } else {
        format!("{} carries no WHEEL.metadata", args.wheel.display())
    };
    ExecutionOutcome::user_error(message, details)
}

fn whitelist() -> ExecutionOutcome {
    ExecutionOutcome::success(
        format!("{} whitelisted variables", ENV_WHITELIST.len()),
        json!({
            "variables": ENV_WHITELIST,
            "lines": ENV_WHITELIST,
            "passthrough": true,
        }),
    )
}

fn hook(args: &HookArgs, config: &Config, env: &EnvSnapshot) -> ExecutionOutcome {
    let options = HookOptions {
        skip: args.skip,
        env_file: args.selection.env_file.clone(),
        env_vars: args.selection.env_vars.clone(),
    };
    let outcome = match inject_built_wheel(&args.dist_dir, &args.dist_name, &options, config, env)
    {
        Ok(outcome) => outcome,
        Err(err) => return ExecutionOutcome::from_error(&err),
    };
    match &outcome {
        HookOutcome::Skipped => ExecutionOutcome::success(
            "Skipping metadata injection",
            json!({ "hook": outcome }),
        ),
        HookOutcome::NoWheel { pattern } => ExecutionOutcome::success(
            format!("No wheel matching {pattern} in {}", args.dist_dir.display()),
            json!({
                "hook": outcome,
                "warnings": [format!("no wheel matching {pattern}; nothing injected")],
            }),
        ),
        HookOutcome::Injected { path, variables } => ExecutionOutcome::success(
            format!("Successfully processed wheel: {}", path.display()),
            json!({
                "hook": outcome,
                "lines": variable_lines(variables),
            }),
        ),
    }
}

/// Lines a renderer prints under the status message.
pub fn detail_lines(details: &Value, key: &str) -> Vec<String> {
    details
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::WheelArgs;
    use wmi_core::CommandStatus;

    #[test]
    fn whitelist_lists_every_name() {
        let outcome = execute(&CommandCli::Whitelist, &EnvSnapshot::default());
        assert_eq!(outcome.status, CommandStatus::Ok);
        let lines = detail_lines(&outcome.details, "lines");
        assert_eq!(lines.len(), ENV_WHITELIST.len());
        assert_eq!(lines[0], "TORCH_CUDA_ARCH_LIST");
    }

    #[test]
    fn missing_wheel_is_a_user_error() {
        let command = CommandCli::Show(WheelArgs {
            wheel: "/nonexistent/demo-1.0-py3-none-any.whl".into(),
        });
        let outcome = execute(&command, &EnvSnapshot::default());
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["code"], "WMI101");
    }

    #[test]
    fn explicit_list_beats_configured_file() {
        let config = Config {
            skip_injection: false,
            default_env_file: Some("ci/vars.txt".into()),
        };
        let args = SelectionArgs {
            env_file: None,
            env_vars: Some("CC".into()),
        };
        assert_eq!(
            selection_for(&args, &config),
            Selection::Explicit("CC".into())
        );
        assert_eq!(
            selection_for(&SelectionArgs::default(), &config),
            Selection::File("ci/vars.txt".into())
        );
    }
}
