//! examflow CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examflow", version, about = "Timed exam session engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate exam definition TOML files
    Validate {
        /// Path to an exam .toml file or directory
        #[arg(long)]
        exam: PathBuf,
    },

    /// Print an exam summary
    Info {
        /// Path to an exam .toml file
        #[arg(long)]
        exam: PathBuf,
    },

    /// Run a scripted attempt from start to submission
    Take {
        /// Exam id to take
        #[arg(long)]
        exam_id: String,

        /// Answer script TOML
        #[arg(long)]
        answers: PathBuf,

        /// Exam file or directory for local mode (defaults to the
        /// configured exam_dir)
        #[arg(long)]
        exam_path: Option<PathBuf>,

        /// Take the exam against the remote backend from config
        #[arg(long)]
        remote: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and an example exam
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examflow=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Info { exam } => commands::info::execute(exam),
        Commands::Take {
            exam_id,
            answers,
            exam_path,
            remote,
            config,
        } => commands::take::execute(exam_id, answers, exam_path, remote, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
