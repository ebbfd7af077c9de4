//! The polls command line: serve the site or fill it with sample data.
//!
//! ```bash
//! polls create_testdata --authors 10 --questions 40
//! polls runserver
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use singleurlcrud_core::logging::setup_logging;
use singleurlcrud_core::SETTINGS;
use singleurlcrud_db_backends::connect;
use singleurlcrud_views::TeraRenderer;

use polls::settings::{load_settings, DEFAULT_SETTINGS_FILE};
use polls::testdata::create_testdata;
use polls::{polls_app, register_models};

#[derive(Debug, Parser)]
#[command(name = "polls", about = "Polls demo for singleurlcrud")]
struct Cli {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serves the authors and questions pages.
    Runserver {
        /// Address to bind, overriding `bind_address`.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Replaces all authors and questions with random ones.
    #[command(name = "create_testdata")]
    CreateTestdata {
        /// Number of author records to create.
        #[arg(long, default_value_t = 20)]
        authors: usize,
        /// Number of question records to create.
        #[arg(long, default_value_t = 50)]
        questions: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli.settings)
        .with_context(|| format!("loading {}", cli.settings.display()))?;
    setup_logging(&settings);
    SETTINGS.configure(settings.clone())?;

    let store = connect(&settings.database)?;
    register_models(store.as_ref()).await?;

    match cli.command {
        Command::Runserver { addr } => {
            let renderer = Arc::new(TeraRenderer::with_dirs(&settings.template_dirs)?);
            let addr = addr.unwrap_or_else(|| settings.bind_address.clone());
            polls_app(&settings, store, renderer)?.run(&addr).await?;
        }
        Command::CreateTestdata { authors, questions } => {
            let created =
                create_testdata(store.as_ref(), authors, questions, &mut rand::thread_rng()).await?;
            println!(
                "Created test records -- {} authors, {} questions!",
                created.authors, created.questions
            );
        }
    }
    Ok(())
}
