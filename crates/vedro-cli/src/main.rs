//! vedro CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::{ModelArgs, OutputFormat};

#[derive(Parser)]
#[command(
    name = "vedro",
    version,
    about = "AI tutor for the terminal: learning packs, lab experiments and quizzes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the tutor: greetings get a reply, topics get a learning pack
    Chat {
        /// Your message (may be empty when --file is given)
        #[arg(default_value = "")]
        message: String,

        /// Attach a file as a data URI (data:<mime>;base64,<payload>)
        #[arg(long)]
        file: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Append the exchange to a JSON transcript
        #[arg(long)]
        transcript: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Ask the study assistant a free-form question
    Ask {
        /// Question, or a request for a summary or MCQs
        query: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Generate learning packs for one or more topics
    Learn {
        /// Topics to study
        #[arg(required = true)]
        topics: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Max concurrent generations (default from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Write the rendered packs to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Mix sandbox elements in the beaker and have the Alchemist explain
    Experiment {
        /// Element ids (hcl, naoh, battery, wire, bulb, plant, sunlight, water)
        #[arg(required = true)]
        elements: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Check a photosynthesis concept-builder arrangement (offline)
    Concept {
        /// Tiles placed as inputs (comma-separated ids or labels)
        #[arg(long, value_delimiter = ',', required = true)]
        inputs: Vec<String>,

        /// Tiles placed as outputs (comma-separated ids or labels)
        #[arg(long, value_delimiter = ',', required = true)]
        outputs: Vec<String>,
    },

    /// Show or grade a multiple-choice quiz (offline)
    Quiz {
        /// Answers in order, as letters or option text (e.g. "A,C,B")
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<String>>,

        /// Learning pack JSON (from `vedro learn --format json`); default is the built-in bank
        #[arg(long)]
        pack: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vedro=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat {
            message,
            file,
            format,
            transcript,
            model,
        } => commands::chat::execute(message, file, format, transcript, model).await,
        Commands::Ask {
            query,
            format,
            model,
        } => commands::ask::execute(query, format, model).await,
        Commands::Learn {
            topics,
            format,
            parallelism,
            output,
            model,
        } => commands::learn::execute(topics, format, parallelism, output, model).await,
        Commands::Experiment {
            elements,
            format,
            model,
        } => commands::experiment::execute(elements, format, model).await,
        Commands::Concept { inputs, outputs } => commands::concept::execute(inputs, outputs),
        Commands::Quiz { answers, pack } => commands::quiz::execute(answers, pack),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
