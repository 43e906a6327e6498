use crate::{
    builder::package::{PackageOptions, create_package},
    runtime::commands::{self, RuntimeContext},
    types::source::{source_base_url, usd_sources},
    utils::{fetch::fetcher_for, signature::get_signature, version::get_version},
};
use clap::CommandFactory;
use clap::FromArgMatches;
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tokio::io;

mod builder;
mod runtime;
mod types;
mod utils;

#[derive(Parser)]
#[command(name = "usdpack")]
#[command(about = "Package the USD addon and bootstrap its binaries")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    package: PackageArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct PackageArgs {
    /// Skip zipping server package and create only server folder structure.
    #[arg(long, default_value_t = false)]
    skip_zip: bool,

    /// Keep folder structure when server package is created.
    #[arg(long, default_value_t = false)]
    keep_sources: bool,

    /// Directory path where package will be created (will be purged if already exists!)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct RuntimeArgs {
    /// Package version directory, its private directory, or a URL serving files_info.json
    #[arg(long)]
    package: String,

    /// Client addon directory (defaults to the current directory)
    #[arg(long)]
    addon_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and extract USD for this platform when missing or stale
    Bootstrap {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Print the environment a USD-enabled process needs
    Env {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Run a command with the USD environment applied
    Exec {
        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Command and arguments to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let version = get_version();
    let signature = get_signature(&version);

    let version_static: &'static str = Box::leak(format!("v{}", version).into_boxed_str());
    let signature_static: &'static str = Box::leak(signature.into_boxed_str());

    // Arguments after `--` belong to the `exec` child
    let raw_args: Vec<String> = std::env::args().collect();
    if raw_args
        .iter()
        .skip(1)
        .take_while(|a| a.as_str() != "--")
        .any(|a| a == "--version" || a == "-V")
    {
        println!("{}", signature_static);
        return Ok(());
    }

    let cmd = Cli::command().version(version_static).before_help(signature_static);
    let matches = cmd.get_matches();
    let cli = Cli::from_arg_matches(&matches).map_err(|e| io::Error::other(e.to_string()))?;

    let cwd = env::current_dir()
        .map_err(|e| io::Error::other(format!("Failed to get current dir: {}", e)))?;

    match cli.command {
        None => {
            let args = cli.package;
            let options = PackageOptions {
                output_dir: args.output.map(|o| cwd.join(o)),
                skip_zip: args.skip_zip,
                keep_sources: args.keep_sources,
            };
            let res = tokio::task::spawn_blocking(move || {
                let base_url = source_base_url();
                let sources = usd_sources(&base_url);
                let fetcher = fetcher_for(&base_url)?;
                create_package(&cwd, &options, &sources, fetcher.as_ref())
            })
            .await
            .map_err(|e| io::Error::other(format!("Join error: {}", e)))?;
            if let Err(e) = res {
                return Err(io::Error::other(e));
            }

            Ok(())
        }

        Some(Commands::Bootstrap { runtime }) => {
            let ctx = load_context(runtime, cwd).await?;
            if let Err(e) = commands::bootstrap(ctx).await {
                return Err(io::Error::other(e));
            }

            Ok(())
        }

        Some(Commands::Env { runtime }) => {
            let ctx = load_context(runtime, cwd).await?;
            if let Err(e) = commands::print_env(&ctx) {
                return Err(io::Error::other(e));
            }

            Ok(())
        }

        Some(Commands::Exec { runtime, command }) => {
            let ctx = load_context(runtime, cwd).await?;
            let res = tokio::task::spawn_blocking(move || commands::exec(&ctx, &command))
                .await
                .map_err(|e| io::Error::other(format!("Join error: {}", e)))?;
            match res {
                Ok(code) => std::process::exit(code),
                Err(e) => Err(io::Error::other(e)),
            }
        }
    }
}

async fn load_context(args: RuntimeArgs, cwd: PathBuf) -> io::Result<RuntimeContext> {
    let addon_dir = args.addon_dir.map(|d| cwd.join(d)).unwrap_or(cwd);
    let package = args.package;
    tokio::task::spawn_blocking(move || RuntimeContext::load(&package, &addon_dir))
        .await
        .map_err(|e| io::Error::other(format!("Join error: {}", e)))?
        .map_err(io::Error::other)
}
