use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use wmi_domain::EnvVarPair;

pub const WMI_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const WMI_BEFORE_HELP: &str = concat!(
    "wheel-metadata-injector ",
    env!("CARGO_PKG_VERSION"),
    " – Record build environment variables inside Python wheels\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  inject           Write selected variables to <dist-info>/WHEEL.metadata and patch RECORD.\n",
    "  show             Print the variables a wheel was built with.\n",
    "  verify           Check injected values and re-hash every RECORD entry.\n",
    "  whitelist        List the variables captured when no list or file is given.\n",
    "  hook             Post-build step: inject into the wheel a build just produced.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "wheel-metadata-injector",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = WMI_BEFORE_HELP,
    help_template = WMI_HELP_TEMPLATE
)]
pub struct WmiCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,command,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandCli {
    #[command(
        about = "Inject build environment variables into a wheel.",
        override_usage = "wheel-metadata-injector inject <WHEEL> [-o FILE] [-e FILE | --env-vars LIST]",
        after_help = "Examples:\n  wheel-metadata-injector inject dist/demo-1.0-py3-none-any.whl\n  wheel-metadata-injector inject demo.whl --env-vars CUDA_HOME,CC -o out/demo.whl"
    )]
    Inject(InjectArgs),
    #[command(
        about = "Print the WHEEL.metadata recorded in a wheel.",
        override_usage = "wheel-metadata-injector show <WHEEL>"
    )]
    Show(WheelArgs),
    #[command(
        about = "Verify injected values and RECORD hashes.",
        override_usage = "wheel-metadata-injector verify <WHEEL> [--env-var KEY=VALUE]..."
    )]
    Verify(VerifyArgs),
    #[command(about = "List the default whitelist of captured variables.")]
    Whitelist,
    #[command(
        about = "Inject into the wheel a build just wrote (post-build hook).",
        override_usage = "wheel-metadata-injector hook <DIST_DIR> <DIST_NAME> [--skip] [-e FILE | --env-vars LIST]"
    )]
    Hook(HookArgs),
}

impl CommandCli {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inject(_) => "inject",
            Self::Show(_) => "show",
            Self::Verify(_) => "verify",
            Self::Whitelist => "whitelist",
            Self::Hook(_) => "hook",
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    #[arg(
        short = 'e',
        long = "env-file",
        value_name = "FILE",
        help = "File listing variable names, one per line"
    )]
    pub env_file: Option<PathBuf>,
    #[arg(
        long = "env-vars",
        value_name = "LIST",
        help = "Comma-separated variable names (wins over --env-file)"
    )]
    pub env_vars: Option<String>,
}

#[derive(Args, Debug)]
pub struct InjectArgs {
    #[arg(value_name = "WHEEL", help = "Wheel to process")]
    pub wheel: PathBuf,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Write the result here instead of rewriting the wheel in place"
    )]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args, Debug)]
pub struct WheelArgs {
    #[arg(value_name = "WHEEL")]
    pub wheel: PathBuf,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(value_name = "WHEEL")]
    pub wheel: PathBuf,
    #[arg(
        long = "env-var",
        value_name = "KEY=VALUE",
        value_parser = parse_env_var,
        help = "Expected variable; repeat for several"
    )]
    pub expected: Vec<EnvVarPair>,
}

#[derive(Args, Debug)]
pub struct HookArgs {
    #[arg(value_name = "DIST_DIR", help = "Directory the build wrote wheels to")]
    pub dist_dir: PathBuf,
    #[arg(value_name = "DIST_NAME", help = "Wheel filename prefix, e.g. the distribution name")]
    pub dist_name: String,
    #[arg(long, help = "Do nothing (same as WHEEL_METADATA_INJECTOR_SKIP=1)")]
    pub skip: bool,
    #[command(flatten)]
    pub selection: SelectionArgs,
}

fn parse_env_var(raw: &str) -> Result<EnvVarPair, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(EnvVarPair::new(key.trim(), value)),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
