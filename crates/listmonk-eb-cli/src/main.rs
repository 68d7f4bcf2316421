//! listmonk-eb CLI - Synthesize and inspect the listmonk deployment plan
//!
//! This CLI provides operators with a terminal interface to:
//! - Synthesize the template and plan for the external provisioning engine
//! - Inspect creation order and outputs
//! - Diff a fresh synthesis against a previously applied plan
//! - Check whether teardown is blocked by deletion protection

use clap::{Parser, Subcommand};
use listmonk_eb_types::StackParameters;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use commands::{diff, graph, outputs, synth, teardown, Context};
use config::CliConfig;
use error::CliResult;

/// listmonk-eb CLI application
#[derive(Parser)]
#[command(name = "listmonk-eb")]
#[command(about = "Provisioning plan for listmonk on Elastic Beanstalk", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LISTMONK_EB_CONFIG")]
    config: Option<PathBuf>,

    /// Target account id
    #[arg(long, global = true, env = "CDK_DEFAULT_ACCOUNT")]
    account: Option<String>,

    /// TLS certificate for the HTTPS listener (AcmCertArn)
    #[arg(long, global = true, env = "ACM_CERT_ARN")]
    certificate_arn: Option<String>,

    /// listmonk image tag (ListmonkImageTag)
    #[arg(long, global = true, env = "LISTMONK_IMAGE_TAG")]
    image_tag: Option<String>,

    /// Directory holding the deployable bundle
    #[arg(long, global = true)]
    bundle_dir: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parameters given on the command line or through the environment
    fn flag_parameters(&self) -> StackParameters {
        StackParameters {
            account: self.account.clone(),
            certificate_arn: self.certificate_arn.clone(),
            image_tag: self.image_tag.clone(),
            bundle_dir: self.bundle_dir.clone(),
            ..Default::default()
        }
    }
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Write template.json and plan.json
    Synth {
        /// Output directory
        #[arg(long, default_value = "dist")]
        out_dir: PathBuf,
    },

    /// Show creation waves
    Graph,

    /// Diff a saved plan against a fresh synthesis
    Diff {
        /// Previously applied plan.json
        #[arg(long)]
        previous: PathBuf,
    },

    /// Show the operator outputs
    Outputs,

    /// Fail if deletion protection blocks teardown
    DestroyCheck {
        /// Saved plan.json (defaults to a fresh synthesis)
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Show resolved parameters
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    // Flags and environment variables win over the config file.
    let config = CliConfig::load(cli.config.as_deref())?;
    let ctx = Context {
        params: config.stack.merge(cli.flag_parameters()),
        format: cli.output,
    };

    match cli.command {
        Commands::Synth { out_dir } => synth::execute(&ctx, &out_dir),
        Commands::Graph => graph::execute(&ctx),
        Commands::Diff { previous } => diff::execute(&ctx, &previous),
        Commands::Outputs => outputs::execute(&ctx),
        Commands::DestroyCheck { plan } => teardown::execute(&ctx, plan.as_deref()),
        Commands::Config => {
            let resolved = ctx.params.resolve().map_err(listmonk_eb_plan::PlanError::from)?;
            output::print_single(&resolved, ctx.format)
        }
    }
}
