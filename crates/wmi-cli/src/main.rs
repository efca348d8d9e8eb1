use std::io;

use atty::Stream;
use clap::Parser;
use color_eyre::Result;
use wmi_core::{EnvSnapshot, ExecutionOutcome, GlobalOptions};

mod cli;
mod dispatch;
mod style;

use cli::WmiCli;
use dispatch::detail_lines;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = WmiCli::parse();
    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };
    init_tracing(&global);

    let env = EnvSnapshot::capture();
    let outcome = dispatch::execute(&cli.command, &env);
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOptions) {
    let level = if global.trace {
        "trace"
    } else if global.quiet {
        "error"
    } else {
        match global.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("wmi_core={level},wmi_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &WmiCli, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.status.exit_code();

    if cli.json {
        let payload = outcome.to_json(cli.command.name());
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    if !outcome.is_ok() {
        eprintln!("{}", style.status(outcome.status, &outcome.message));
        if let Some(hint) = outcome.details.get("hint").and_then(|hint| hint.as_str()) {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
        for line in detail_lines(&outcome.details, "lines") {
            eprintln!("{line}");
        }
        return Ok(code);
    }
    if cli.quiet {
        return Ok(code);
    }

    let passthrough = outcome
        .details
        .get("passthrough")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if passthrough {
        for line in detail_lines(&outcome.details, "lines") {
            println!("{line}");
        }
        return Ok(code);
    }

    for warning in detail_lines(&outcome.details, "warnings") {
        println!("{}", style.warning(&format!("Warning: {warning}")));
    }
    for line in detail_lines(&outcome.details, "lines") {
        println!("{line}");
    }
    println!("{}", style.status(outcome.status, &outcome.message));
    Ok(code)
}
