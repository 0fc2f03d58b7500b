//! Skillreg - skill registration from container image builds
//!
//! Usage:
//!   skillreg register --event event.json   # Register skills from an image event
//!   cat event.json | skillreg register     # Read the event from stdin
//!   skillreg config                        # Show the effective configuration

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillreg_core::catalog::TagOutcome;
use skillreg_core::config::{ConfigStore, SkillregConfig, to_toml};
use skillreg_core::context::RegistrationContext;
use skillreg_core::event::RegistrationEvent;
use skillreg_core::orchestration::{
    DescriptorSource, RegistrationOptions, RegistrationPipeline, RegistrationReport,
};

#[derive(Parser)]
#[command(name = "skillreg")]
#[command(about = "Register skills built as container images", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the skills of an image build event
    Register {
        /// Event JSON file, or '-' for stdin
        #[arg(long, default_value = "-")]
        event: String,

        /// Always read descriptors from the repository checkout
        #[arg(long)]
        prefer_repository: bool,

        /// Resolve everything without copying, registering or tagging
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the effective configuration with secrets redacted
    Config,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillreg=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Register {
            event,
            prefer_repository,
            dry_run,
            format,
        } => {
            let source = if prefer_repository {
                DescriptorSource::RepositoryFirst
            } else {
                DescriptorSource::ImageFirst
            };
            let options = RegistrationOptions::default()
                .with_source(source)
                .with_dry_run(dry_run);
            run_register(&config, &event, options, format)?;
        }
        Commands::Config => {
            print!("{}", to_toml(&config.redacted())?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SkillregConfig> {
    let store = ConfigStore::locate(path)?;
    store.load()
}

fn read_event(source: &str) -> Result<RegistrationEvent> {
    let input = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read event from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read event file: {}", source))?
    };
    RegistrationEvent::from_json(&input)
}

fn run_register(
    config: &SkillregConfig,
    event_source: &str,
    options: RegistrationOptions,
    format: OutputFormat,
) -> Result<()> {
    let event = read_event(event_source)?;
    let ctx = RegistrationContext::from_config(config)?;
    let report = RegistrationPipeline::new(&ctx, options).run(&event)?;

    match format {
        OutputFormat::Table => print_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn print_table(report: &RegistrationReport) {
    println!("Image:  {}", report.image);
    println!("Source: {}", report.origin);
    println!();
    println!(
        "{:<30} {:<14} {:<12} {:<8} Artifact",
        "Skill", "Version", "From", "Tag"
    );
    println!("{}", "-".repeat(90));

    for skill in &report.skills {
        let tag = match &skill.tag {
            Some(TagOutcome::Failed(_)) => "failed",
            Some(TagOutcome::Created) => "created",
            Some(TagOutcome::AlreadyExists) => "exists",
            None => "-",
        };
        println!(
            "{:<30} {:<14} {:<12} {:<8} {}",
            format!("{}/{}", skill.namespace, skill.name),
            skill.version,
            skill.version_source.to_string(),
            tag,
            skill.artifact.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!("{}", report.status_message());
}
