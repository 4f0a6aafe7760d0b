mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use codeclass_common::JudgeConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "codeclass-cli")]
#[command(about = "Codeclass CLI - Evaluate submissions against problem test cases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Judge settings shared by every subcommand; flags override JUDGE_* env vars
#[derive(Args, Debug, Clone, Default)]
struct JudgeArgs {
    /// Language table (JSON); defaults to the built-in python/cpp table
    #[arg(long)]
    languages: Option<PathBuf>,

    /// Directory for per-evaluation scratch files
    #[arg(long)]
    temp_root: Option<PathBuf>,

    /// Compile step deadline in milliseconds
    #[arg(long)]
    compile_timeout_ms: Option<u64>,

    /// Per-test-case deadline in milliseconds
    #[arg(long)]
    execution_timeout_ms: Option<u64>,
}

impl JudgeArgs {
    fn into_config(self) -> JudgeConfig {
        let mut config = JudgeConfig::from_env();
        if let Some(path) = self.languages {
            config.languages_path = Some(path);
        }
        if let Some(root) = self.temp_root {
            config.temp_root = root;
        }
        if let Some(ms) = self.compile_timeout_ms {
            config.compile_timeout_ms = ms;
        }
        if let Some(ms) = self.execution_timeout_ms {
            config.execution_timeout_ms = ms;
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List configured languages
    Languages {
        #[command(flatten)]
        judge: JudgeArgs,
    },

    /// Evaluate a source file against a test case file
    Evaluate {
        /// Language id (e.g., python, cpp)
        #[arg(short, long)]
        language: String,

        /// Source file to evaluate
        #[arg(short, long)]
        source: PathBuf,

        /// Test cases: a JSON array or a problem file
        #[arg(short, long)]
        tests: PathBuf,

        #[command(flatten)]
        judge: JudgeArgs,
    },

    /// Submit a source file for a problem and print the scored submission
    Submit {
        /// Problem file with id and test_cases
        #[arg(short, long)]
        problem: PathBuf,

        /// Submitting user id
        #[arg(short, long)]
        user: u64,

        /// Language id (e.g., python, cpp)
        #[arg(short, long)]
        language: String,

        /// Source file to submit
        #[arg(short, long)]
        source: PathBuf,

        #[command(flatten)]
        judge: JudgeArgs,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries the JSON result, logs go to stderr
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Languages { judge } => {
            commands::list_languages(judge.into_config())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Evaluate {
            language,
            source,
            tests,
            judge,
        } => commands::evaluate(&language, &source, &tests, judge.into_config()).await,
        Commands::Submit {
            problem,
            user,
            language,
            source,
            judge,
        } => commands::submit(&problem, user, &language, &source, judge.into_config()).await,
    }
}
