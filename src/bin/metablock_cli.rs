//! Metablock CLI - host for the generator
//!
//! Commands: render, check, insert, keys
//! `check` and `keys` print JSON to stdout
//! Returns 2 on validation failure, 1 on configuration errors

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use userscript_metablock::{
    generate, loader::DEFAULT_META_FILE, CompiledBlock, Error, Options, ScriptManager,
    ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "metablock-cli")]
#[command(about = "Metablock CLI - userscript metadata block generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log rule decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct GenerateArgs {
    /// Meta file (.json, .yaml, .yml, .toml)
    #[arg(short, long, default_value = DEFAULT_META_FILE)]
    file: PathBuf,

    /// Script manager profile (tm, gm3, gm4, vm, compatible)
    #[arg(short, long)]
    manager: Option<String>,

    /// Error policy (off, warn, error)
    #[arg(short = 'p', long)]
    validator: Option<String>,

    /// Key order, `...` marks where unlisted keys go
    #[arg(short, long, value_delimiter = ',')]
    order: Option<Vec<String>>,

    /// JSON object merged over the meta file
    #[arg(long = "override")]
    overrides: Option<String>,
}

impl GenerateArgs {
    fn into_options(self) -> Result<Options, Error> {
        let overrides = match self.overrides {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };
        Ok(Options {
            file: Some(self.file),
            manager: self.manager,
            validator: self.validator,
            order: self.order,
            overrides,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the metadata block
    Render {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Validate and report as JSON
    Check {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Prepend the block to a script
    Insert {
        #[command(flatten)]
        args: GenerateArgs,

        /// Script to prepend to
        #[arg(short, long)]
        script: PathBuf,

        /// Write here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the keys a script manager accepts
    Keys {
        #[arg(short, long)]
        manager: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .try_init();
}

fn failure_code(err: &Error) -> ExitCode {
    if err.is_policy_failure() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn compile(args: GenerateArgs) -> Result<CompiledBlock, Error> {
    generate(&args.into_options()?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render { args } => match compile(args) {
            Ok(block) => {
                println!("{}", block.text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                failure_code(&e)
            }
        },

        Commands::Check { args } => match compile(args) {
            Ok(block) => {
                let output = serde_json::json!({
                    "valid": block.is_clean(),
                    "engine_version": ENGINE_VERSION,
                    "manager": block.manager,
                    "violations": block.violations,
                    "entries": block.entries,
                });
                println!("{output:#}");
                if block.is_clean() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(e) => {
                let output = serde_json::json!({
                    "valid": false,
                    "error": e.to_string(),
                });
                println!("{output}");
                failure_code(&e)
            }
        },

        Commands::Insert { args, script, output } => {
            let result = compile(args).and_then(|block| {
                let code = fs::read_to_string(&script)?;
                let combined = block.insert_into(&code);
                match &output {
                    Some(path) => fs::write(path, combined + "\n")?,
                    None => println!("{combined}"),
                }
                Ok(())
            });
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {e}");
                    failure_code(&e)
                }
            }
        }

        Commands::Keys { manager } => match ScriptManager::resolve(manager.as_deref()) {
            Ok(manager) => {
                let keys: Vec<_> = manager.table().names().collect();
                let output = serde_json::json!({
                    "manager": manager,
                    "keys": keys,
                });
                println!("{output:#}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
