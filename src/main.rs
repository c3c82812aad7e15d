use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use interview_agent::{
    collaborators::ResumeArtifact,
    config::{Config, LogFormat},
    interview::{InterviewSession, Interviewer, Reply},
    langbase::LangbaseClient,
    storage::SqliteStorage,
};

/// Resume-grounded interview agent.
#[derive(Debug, Parser)]
#[command(name = "interview-agent", version, about)]
struct Cli {
    /// Plain-text resume or cover letter to interview against
    #[arg(short, long)]
    resume: PathBuf,

    /// Do not persist interviews to SQLite
    #[arg(long)]
    no_store: bool,

    /// Skip creating the Langbase pipes at startup
    #[arg(long)]
    skip_pipe_setup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Interview agent starting..."
    );

    // Initialize Langbase client
    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    // Ensure interview pipes exist (create if needed)
    if !cli.skip_pipe_setup {
        info!("Ensuring interview Langbase pipes exist...");
        if let Err(e) = langbase.ensure_pipes(&config.pipes).await {
            error!(error = %e, "Failed to ensure interview pipes exist");
            return Err(e.into());
        }
    }

    let mut interviewer = Interviewer::from_langbase(&config, langbase);

    // Initialize storage
    if !cli.no_store {
        match SqliteStorage::new(&config.database).await {
            Ok(s) => {
                info!(path = %config.database.path.display(), "Database initialized");
                interviewer = interviewer.with_storage(s);
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize database");
                return Err(e.into());
            }
        }
    }

    let resume = ResumeArtifact::from_path(&cli.resume).await?;
    let mut session = InterviewSession::new(interviewer);

    println!("=== Interview Agent ===");
    let opening = session.begin(resume).await?;
    print_reply(&opening);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match session.reply(&line).await {
            Ok(reply) => {
                print_reply(&reply);
                if matches!(reply, Reply::Closed(_)) {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                eprintln!("Something went wrong ({}). Please send your answer again.", e);
            }
        }
    }

    info!("Interview agent shutdown complete");
    Ok(())
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Question(question) => println!("\n[Interviewer]: {}", question),
        Reply::Finished {
            report,
            restart_prompt,
        } => {
            println!("\n=== Interview finished ===\n");
            println!("{}", report);
            println!("\n[Interviewer]: {}", restart_prompt);
        }
        Reply::Guidance(message) | Reply::Closed(message) => {
            println!("\n[Interviewer]: {}", message)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
