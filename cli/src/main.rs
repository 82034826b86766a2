//! formkit CLI
//!
//! Offline tooling over form definitions and submission files.
//!
//! # Usage
//!
//! ```bash
//! formkit validate --form signup.json --values answers.json
//! formkit analyze --form signup.json --submissions subs.json --range 7d
//! formkit export --form signup.json --submissions subs.json --to excel
//! formkit ab-test --form signup.json --submissions subs.json --control A --treatment B
//! formkit render-email notifications --form signup.json --submission sub.json
//! formkit config set analytics.view_multiplier 2.0
//! ```

use clap::{Parser, Subcommand};
use formkit_analytics::TimeRange;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod input;
mod output;

#[derive(Parser)]
#[command(name = "formkit")]
#[command(author = "formkit")]
#[command(version)]
#[command(about = "Form validation, analytics and export tooling", long_about = None)]
struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short, env = "FORMKIT_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a set of answers against a form
    Validate {
        /// Form definition (JSON or YAML)
        #[arg(long)]
        form: PathBuf,
        /// Answers keyed by field id
        #[arg(long)]
        values: PathBuf,
        /// Skip cross-field checks
        #[arg(long)]
        no_cross_field: bool,
        #[arg(long)]
        stop_on_first_error: bool,
        /// Ignore fields hidden by their conditions
        #[arg(long)]
        skip_hidden: bool,
    },
    /// Report configuration problems in a form
    Lint {
        #[arg(long)]
        form: PathBuf,
    },
    /// Compute submission analytics
    Analyze {
        #[arg(long)]
        form: PathBuf,
        /// Submissions (JSON or YAML array)
        #[arg(long)]
        submissions: PathBuf,
        #[arg(long, default_value = "30d")]
        range: TimeRange,
        /// Known view count; estimated when absent
        #[arg(long)]
        views: Option<u64>,
        #[arg(long, value_enum, default_value = "all")]
        section: commands::analyze::Section,
    },
    /// Export submissions to a file
    Export {
        #[arg(long)]
        form: PathBuf,
        #[arg(long)]
        submissions: PathBuf,
        /// csv, json, excel or pdf
        #[arg(long, default_value = "csv")]
        to: String,
        /// Output path; a generated file name in the current directory by default
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Test two variants for a significant difference
    AbTest(commands::ab_test::AbTestArgs),
    /// Render notification emails
    RenderEmail {
        #[command(subcommand)]
        action: EmailCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum EmailCommands {
    /// Render one template with a JSON context
    Template {
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        context: PathBuf,
    },
    /// Compose the form's notifications for a submission
    Notifications {
        #[arg(long)]
        form: PathBuf,
        #[arg(long)]
        submission: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set configuration value (dotted key)
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let config = match config::Config::load(profile) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Config not loaded, using defaults: {:#}", e);
            config::Config::default()
        }
    };
    let format = cli.format.unwrap_or_else(|| config.output_format());

    let result = match cli.command {
        Commands::Validate { form, values, no_cross_field, stop_on_first_error, skip_hidden } => {
            let options = formkit_validation::FormValidationOptions {
                enable_cross_field_validation: !no_cross_field,
                stop_on_first_error,
                use_cache: false,
                skip_hidden_fields: skip_hidden,
            };
            commands::validate::handle(&form, &values, options, &config, format)
        }
        Commands::Lint { form } => commands::validate::lint(&form, format),
        Commands::Analyze { form, submissions, range, views, section } => {
            commands::analyze::handle(&form, &submissions, range, views, section, &config, format).await
        }
        Commands::Export { form, submissions, to, output } => {
            commands::export::handle(&form, &submissions, &to, output, &config)
        }
        Commands::AbTest(args) => commands::ab_test::handle(args, &config, format),
        Commands::RenderEmail { action } => commands::email::handle(action, format).await,
        Commands::Config { action } => commands::config::handle(action, profile, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::failure(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
