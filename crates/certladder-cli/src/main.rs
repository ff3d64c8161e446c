//! certladder CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "certladder", version, about = "Adaptive competency assessment engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Custom threshold table TOML (default: built-in table)
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },

    /// Print the threshold table
    Table {
        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Custom threshold table TOML (default: built-in table)
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },

    /// Show the next step a learner at LEVEL may take
    NextStep {
        /// Stored level, e.g. "none", "A2", "c1"
        #[arg(long)]
        level: String,
    },

    /// Run one attempt end to end from recorded answers
    Replay {
        /// Question bank file or directory; the step is chosen from --prior-level
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Comma-separated answer indices; -1 or empty means unanswered
        #[arg(long, allow_hyphen_values = true)]
        answers: String,

        /// Learner id recorded with the attempt
        #[arg(long, default_value = "anonymous")]
        learner: String,

        /// Learner's stored level before the attempt
        #[arg(long, default_value = "none")]
        prior_level: String,

        /// Submit trigger recorded with the attempt: manual, timer.
        /// Only a label; the replay is not timed.
        #[arg(long, default_value = "manual")]
        trigger: String,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Issue a certificate when a level is reached
        #[arg(long)]
        certificate: bool,

        /// Also save the attempt report as JSON
        #[arg(long)]
        output: Option<PathBuf>,

        /// Custom threshold table TOML (default: built-in table)
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("certladder=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { bank, thresholds } => commands::validate::execute(bank, thresholds),
        Commands::Table { format, thresholds } => commands::table::execute(format, thresholds),
        Commands::NextStep { level } => commands::next_step::execute(level),
        Commands::Replay {
            bank,
            answers,
            learner,
            prior_level,
            trigger,
            format,
            certificate,
            output,
            thresholds,
            config,
        } => {
            commands::replay::execute(commands::replay::ReplayArgs {
                bank,
                answers,
                learner,
                prior_level,
                trigger,
                format,
                certificate,
                output,
                thresholds,
                config,
            })
            .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
