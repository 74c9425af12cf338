//! quizmill CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizmill", version, about = "Course evaluation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one evaluation attempt end-to-end
    Run {
        /// Study level (e.g. "L3")
        #[arg(long)]
        level: Option<String>,

        /// Course name
        #[arg(long)]
        course: String,

        /// Topic scope; omit for a course-wide general set
        #[arg(long)]
        topic: Option<String>,

        /// Question kind: qcm or ouverte
        #[arg(long, default_value = "qcm")]
        kind: String,

        /// Run the global evaluation variant (with remediation planning)
        #[arg(long)]
        global: bool,

        /// JSON file with the answers, one string per question
        #[arg(long)]
        answers: PathBuf,

        /// Language for result text: en or fr
        #[arg(long, default_value = "en")]
        lang: String,

        /// Report output path (defaults into the configured output dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a local question payload file
    Validate {
        /// Path to the JSON tuple file
        #[arg(long)]
        questions: PathBuf,

        /// Question kind: qcm or ouverte
        #[arg(long, default_value = "qcm")]
        kind: String,
    },

    /// Create a starter config and example files
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizmill=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            level,
            course,
            topic,
            kind,
            global,
            answers,
            lang,
            output,
            config,
        } => {
            commands::run::execute(
                level, course, topic, kind, global, answers, lang, output, config,
            )
            .await
        }
        Commands::Validate { questions, kind } => commands::validate::execute(questions, kind),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
