#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use typeprobe_core::ResolutionKind;

#[derive(Parser, Debug)]
#[command(name = "typeprobe")]
#[command(author, version, about = "Checks that a package's types match its runtime behavior", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Analyze a package directory
    Check {
        /// Directory containing the package's package.json
        dir: PathBuf,

        /// Directory of a paired @types package
        #[arg(long, value_name = "DIR")]
        types_dir: Option<PathBuf>,

        /// Options file (JSON); flags are applied on top
        #[arg(long, value_name = "FILE", env = "TYPEPROBE_CONFIG")]
        config: Option<PathBuf>,

        /// Check only these subpaths (repeatable)
        #[arg(long = "entrypoint", value_name = "SUBPATH")]
        entrypoints: Vec<String>,

        /// Add subpaths to the discovered ones (repeatable)
        #[arg(long = "include-entrypoint", value_name = "SUBPATH")]
        include_entrypoints: Vec<String>,

        /// Skip a subpath (repeatable)
        #[arg(long = "exclude-entrypoint", value_name = "SUBPATH")]
        exclude_entrypoints: Vec<String>,

        /// Skip subpaths matching a regular expression (repeatable)
        #[arg(long = "exclude-pattern", value_name = "REGEX")]
        exclude_patterns: Vec<String>,

        /// Without `exports`, treat every published source file as an entrypoint
        #[arg(long)]
        legacy: bool,

        /// Do not resolve or check under these kinds (repeatable)
        #[arg(long = "exclude-kind", value_enum, value_name = "KIND")]
        exclude_kinds: Vec<KindArg>,
    },
}

/// Resolution kinds as spelled on the command line.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Classic,
    DualCjs,
    DualEsm,
    Bundler,
}

impl From<KindArg> for ResolutionKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Classic => ResolutionKind::Classic,
            KindArg::DualCjs => ResolutionKind::DualCjs,
            KindArg::DualEsm => ResolutionKind::DualEsm,
            KindArg::Bundler => ResolutionKind::Bundler,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Check {
            dir,
            types_dir,
            config,
            entrypoints,
            include_entrypoints,
            exclude_entrypoints,
            exclude_patterns,
            legacy,
            exclude_kinds,
        }) => {
            let span = tracing::info_span!("check", cmd = "check", dir = %dir.display());
            let _guard = span.enter();
            let action = commands::check::CheckAction {
                dir,
                types_dir,
                config,
                entrypoints,
                include_entrypoints,
                exclude_entrypoints,
                exclude_patterns,
                legacy,
                exclude_kinds: exclude_kinds.into_iter().map(Into::into).collect(),
            };
            let clean = commands::check::run(&action, cli.json)?;
            if !clean {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
