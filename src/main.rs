use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use stepable::config::Config;
use stepable::logging;
use stepable::report::{TransitionLog, WizardReport};
use stepable::view::markup::Markup;
use stepable::view::memory::Document;
use stepable::{StepController, StepOptions, TransitionPolicy};

#[derive(Parser)]
#[command(name = "stepable")]
#[command(about = "Drive step wizards described by markup files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a wizard from markup, click elements in order and print the result
    Run {
        /// Markup file (.toml, .json, .yaml)
        markup: PathBuf,

        /// Selector of an element to click (repeatable, applied in order)
        #[arg(long = "click")]
        clicks: Vec<String>,

        /// Override the initial step
        #[arg(long, allow_negative_numbers = true)]
        initial: Option<i64>,

        /// Reject transitions while another one is pending
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the steps and triggers a markup file produces
    Inspect {
        /// Markup file (.toml, .json, .yaml)
        markup: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Run {
            markup,
            clicks,
            initial,
            strict,
            json,
        } => {
            cmd_run(&config, &markup, &clicks, initial, strict, json)?;
        }
        Commands::Inspect { markup, json } => {
            cmd_inspect(&config, &markup, json)?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.exists() {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    Ok(())
}

fn load_document(path: &Path) -> Result<Document> {
    let markup = Markup::from_path(path)
        .with_context(|| format!("Failed to load markup from {}", path.display()))?;
    Ok(markup.build())
}

fn cmd_run(
    config: &Config,
    markup: &Path,
    clicks: &[String],
    initial: Option<i64>,
    strict: bool,
    json: bool,
) -> Result<()> {
    let document = load_document(markup)?;

    let mut options = StepOptions::from_config(&config.stepper);
    if let Some(initial) = initial {
        options.initial_step = initial;
    }
    if strict {
        options.policy = TransitionPolicy::Exclusive;
    }

    let log = TransitionLog::new();
    let controller = StepController::new(document.root().clone(), log.attach(options))
        .context("Failed to create step controller")?;

    for selector in clicks {
        let clicked = document
            .click(selector)
            .with_context(|| format!("Invalid click selector '{}'", selector))?;
        if clicked {
            tracing::debug!(selector = %selector, index = controller.current_index(), "clicked");
        } else {
            tracing::warn!(selector = %selector, "no element to click");
        }
    }

    let report = WizardReport::capture(&controller).with_transitions(log.records());
    print_report(&report, json)
}

fn cmd_inspect(config: &Config, markup: &Path, json: bool) -> Result<()> {
    let document = load_document(markup)?;
    let controller = StepController::new(
        document.root().clone(),
        StepOptions::from_config(&config.stepper),
    )
    .context("Failed to create step controller")?;

    print_report(&WizardReport::capture(&controller), json)
}

fn print_report(report: &WizardReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", report);
    }
    Ok(())
}
