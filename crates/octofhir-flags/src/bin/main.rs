//! Patient flag command-line interface

use clap::{Parser, Subcommand};
use octofhir_flags::cli::{cohort, eval, evaluators, output, validate};
use std::path::PathBuf;

/// Patient flag command-line tool
#[derive(Parser)]
#[command(name = "flags")]
#[command(author, version, about = "Patient flag evaluation tools", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, table, pretty)
    #[arg(short = 'f', long, global = true)]
    format: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the criteria of every configured flag
    Validate {
        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Patient data file (JSON array)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Evaluate every enabled flag for one patient
    Eval {
        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Patient data file (JSON array)
        #[arg(short, long)]
        data: PathBuf,

        /// Patient id
        #[arg(short, long)]
        patient: i64,
    },

    /// Find the patients of a cohort for which a flag fires
    Cohort {
        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Patient data file (JSON array)
        #[arg(short, long)]
        data: PathBuf,

        /// Flag id
        #[arg(long)]
        flag: i64,

        /// Comma-separated patient ids (default: every loaded patient)
        #[arg(short, long)]
        patients: Option<String>,
    },

    /// List the available evaluators
    Evaluators,
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Validate { config, data } => validate::run(validate::ValidateConfig {
            config,
            data,
            format: cli.format,
            output: cli.output,
            verbose: cli.verbose,
        }),

        Commands::Eval {
            config,
            data,
            patient,
        } => eval::run(eval::EvalConfig {
            config,
            data,
            patient,
            format: cli.format,
            output: cli.output,
            verbose: cli.verbose,
        }),

        Commands::Cohort {
            config,
            data,
            flag,
            patients,
        } => cohort::run(cohort::CohortConfig {
            config,
            data,
            flag,
            patients,
            format: cli.format,
            output: cli.output,
            verbose: cli.verbose,
        }),

        Commands::Evaluators => evaluators::run(evaluators::EvaluatorsConfig {
            format: cli.format,
            output: cli.output,
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
