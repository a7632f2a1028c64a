//! Sigil CLI, the command-line driver of the Sigil IR linker.
//!
//! Provides `sigil link` to link the libraries of a `sigil.toml` project,
//! `sigil fingerprint` to print archive fingerprints, `sigil status` to show
//! which libraries changed since the last link, and `sigil dump` to print
//! the IR reachable from one entry of a single archive.

#![warn(missing_docs)]

mod dump;
mod fingerprint;
mod link;
mod pipeline;
mod status;

use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Sigil, an incremental, signature-addressed IR linker.
#[derive(Parser, Debug)]
#[command(name = "sigil", version, about = "Sigil IR linker")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link the libraries of a project.
    Link(LinkArgs),
    /// Print the fingerprints of an archive.
    Fingerprint(FingerprintArgs),
    /// Show which libraries changed since the last successful link.
    Status(StatusArgs),
    /// Link one archive from an entry signature and print the IR.
    Dump(DumpArgs),
}

/// Arguments for the `sigil link` subcommand.
#[derive(Parser, Debug)]
pub struct LinkArgs {
    /// Path to `sigil.toml` or the directory containing it.
    #[arg(long)]
    pub config: Option<String>,

    /// Replace unresolvable references with stubs, overriding the config.
    #[arg(long)]
    pub partial_linkage: bool,

    /// Print the linked IR to stdout.
    #[arg(long)]
    pub dump: bool,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Terminal)]
    pub format: ReportFormat,
}

/// Arguments for the `sigil fingerprint` subcommand.
#[derive(Parser, Debug)]
pub struct FingerprintArgs {
    /// Archive file.
    pub archive: String,

    /// Print the 16-byte form in hex.
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for the `sigil status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Path to `sigil.toml` or the directory containing it.
    #[arg(long)]
    pub config: Option<String>,
}

/// Arguments for the `sigil dump` subcommand.
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Archive file.
    pub archive: String,

    /// Public signature to start from, e.g. `app/main`.
    #[arg(long)]
    pub entry: String,

    /// Wrap the archive with the synthesized function types.
    #[arg(long)]
    pub builtins: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from the environment.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Terminal,
    /// One JSON object per line.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to use colored output.
    pub color: bool,
}

fn main() {
    let cli = Cli::parse();
    pipeline::init_tracing(cli.quiet, cli.verbose);

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    let global = GlobalArgs {
        quiet: cli.quiet,
        color,
    };

    let result = match cli.command {
        Command::Link(ref args) => link::run(args, &global),
        Command::Fingerprint(ref args) => fingerprint::run(args),
        Command::Status(ref args) => status::run(args),
        Command::Dump(ref args) => dump::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
