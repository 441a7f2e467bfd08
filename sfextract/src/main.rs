use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sfdata::finder::find_game;
use sfdata::pipeline::{DryRun, Exporter, Umodel, extract_game_assets};
use sfdata::registry::{HostPlatform, PlatformInfo};
use sfdata::{ResolutionOptions, Test, Validator};

#[derive(Parser)]
#[command(name = "sfextract")]
#[command(version)]
#[command(about = "Find a Satisfactory install and extract its Docs.json and icons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the install directory found through Steam or Epic Games
    Find {
        /// experimental or earlyaccess
        #[arg(short, long, default_value = "experimental")]
        channel: String,

        /// Only look in Steam libraries
        #[arg(long)]
        only_steam: bool,

        /// Only look in Epic Games manifests
        #[arg(long)]
        only_epic: bool,
    },

    /// Convert Docs.json and export icons into an output directory
    Extract {
        /// Directory the game is installed in. Excludes --channel.
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// experimental or earlyaccess (default: experimental). Excludes --input-dir.
        #[arg(short, long)]
        channel: Option<String>,

        /// Directory extracted assets are written to
        #[arg(short, long)]
        output_dir: PathBuf,

        /// umodel program to run
        #[arg(long, env = "SFEXTRACT_UMODEL")]
        umodel: Option<PathBuf>,

        /// Log the umodel exports instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Only look in Steam libraries
        #[arg(long)]
        only_steam: bool,

        /// Only look in Epic Games manifests
        #[arg(long)]
        only_epic: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Find {
            channel,
            only_steam,
            only_epic,
        } => {
            let options = ResolutionOptions::parse(&channel, only_steam, only_epic)
                .context("Invalid arguments")?;
            let install = find_game(&options)?;
            println!("{}", install.display());
        }
        Commands::Extract {
            input_dir,
            channel,
            output_dir,
            umodel,
            dry_run,
            only_steam,
            only_epic,
        } => {
            validate_extract_args(input_dir.as_deref(), channel.as_deref(), only_steam, only_epic)
                .context("Invalid arguments")?;

            let install = match input_dir {
                Some(dir) => dir,
                None => {
                    let options = ResolutionOptions::parse(
                        channel.as_deref().unwrap_or("experimental"),
                        only_steam,
                        only_epic,
                    )
                    .context("Invalid arguments")?;
                    find_game(&options)?
                }
            };
            log::info!("Extracting from {}", install.display());

            let umodel = Umodel::new(umodel.unwrap_or_else(|| Umodel::default_program().into()));
            let dry = DryRun::default();
            let exporter: &dyn Exporter = if dry_run { &dry } else { &umodel };

            let summary = extract_game_assets(&install, &output_dir, exporter)
                .with_context(|| format!("Failed to extract assets from {}", install.display()))?;
            log::info!(
                "Wrote {}; {} icon exports succeeded, {} failed",
                summary.docs_path.display(),
                summary.exported,
                summary.failed
            );
        }
    }

    Ok(())
}

fn validate_extract_args(
    input_dir: Option<&Path>,
    channel: Option<&str>,
    only_steam: bool,
    only_epic: bool,
) -> Result<(), sfdata::ValidationError> {
    let mut validator = Validator::fail_fast()
        .require_mutually_exclusive(&[
            Test::new("--input-dir", input_dir.is_some()),
            Test::new("--channel", channel.is_some()),
        ])?
        .require_mutually_exclusive(&[
            Test::new("--only-steam", only_steam),
            Test::new("--only-epic", only_epic),
        ])?
        // Without a registry there is nothing to search
        .require_true(
            "--input-dir",
            input_dir.is_some() || channel.is_some() || HostPlatform.supports_registry_lookup(),
        )?;

    if let Some(dir) = input_dir {
        validator = validator.require_directory_exists(dir)?;
    }
    if let Some(channel) = channel {
        validator =
            validator.require_one_of("--channel", &channel, &["experimental", "earlyaccess"])?;
    }
    validator.finish(None)
}
