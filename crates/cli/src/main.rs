//! RustedTutor CLI: the main entry point.
//!
//! Commands:
//! - `ask`: Answer a question (or read questions interactively)
//! - `classify`: Show which subject a question is routed to
//! - `calc`: Evaluate an arithmetic expression
//! - `solve`: Solve an equation for a variable
//! - `constant`: Look up a physical constant
//! - `constants`: List the constant table
//! - `onboard`: Write a default config file
//! - `status`: Show the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rustedtutor",
    about = "RustedTutor — routes questions to physics, math and computer science specialists",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use only the keyword classifier and reference handler (no network)
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question; without one, read questions from stdin
    Ask {
        /// The question text
        question: Vec<String>,

        /// Print the route trail, tool calls and pipeline events
        #[arg(short, long)]
        trace: bool,
    },

    /// Classify a question without answering it
    Classify {
        /// The question text
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Evaluate an arithmetic expression
    Calc {
        #[arg(required = true, allow_hyphen_values = true)]
        expression: Vec<String>,
    },

    /// Solve an equation
    Solve {
        /// The equation, e.g. "2*x + 5 = 11"
        #[arg(allow_hyphen_values = true)]
        equation: String,

        /// The variable to solve for
        #[arg(long = "for", default_value = "x")]
        solve_for: String,
    },

    /// Look up a physical constant
    Constant {
        #[arg(required = true)]
        name: Vec<String>,
    },

    /// List all known physical constants
    Constants,

    /// Write a default configuration file
    Onboard,

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { question, trace } => {
            let question = (!question.is_empty()).then(|| question.join(" "));
            commands::ask::run(question, trace, cli.offline).await?
        }
        Commands::Classify { question } => {
            commands::classify::run(&question.join(" "), cli.offline).await?
        }
        Commands::Calc { expression } => commands::tools::calc(&expression.join(" ")).await?,
        Commands::Solve { equation, solve_for } => {
            commands::tools::solve(&equation, &solve_for).await?
        }
        Commands::Constant { name } => commands::tools::constant(&name.join(" ")).await?,
        Commands::Constants => commands::tools::list_constants()?,
        Commands::Onboard => commands::onboard::run()?,
        Commands::Status => commands::status::run(cli.offline)?,
    }

    Ok(())
}
