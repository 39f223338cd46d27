use std::path::PathBuf;
use clap::Parser;
use crate::Config;

mod chat;
mod deck;
mod serve;
mod write;

pub use serve::AppState;

#[derive(Parser)]
#[command(name = "flashdeck")]
#[command(about = "Turn study documents into flashcards and summaries", version = "1.0")]
pub enum Cli {
    /// Start the HTTP API
    Serve {
        #[arg(long, help = "Address to listen on, overrides bind_addr")]
        bind: Option<String>,
    },

    /// Flashcard set commands
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Summarize a document
    Summarize {
        #[arg(help = "PDF, DOCX or text file")]
        path: PathBuf,
    },

    /// Ask questions about your notes
    Chat {
        #[arg(long, help = "Notes file used as context")]
        notes: Option<PathBuf>,
    },
}

#[derive(Parser)]
pub enum DeckCommand {
    /// Generate flashcard sets from a file or directory
    Add {
        #[arg(help = "File or directory path")]
        path: PathBuf,

        #[arg(short, long, help = "Process subdirectories too")]
        recursive: bool,

        #[arg(short, long, help = "Set name; defaults to the file name")]
        name: Option<String>,
    },

    List,

    Show {
        #[arg(help = "Set name")]
        name: String,
    },

    /// Write a set to an Excel workbook
    Export {
        #[arg(help = "Set name")]
        name: String,

        #[arg(long, help = "Output .xlsx path")]
        path: PathBuf,
    },
}

pub async fn handler(args: Cli, config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    match args {
        Cli::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            serve::serve(state, &addr, config.max_upload_bytes).await
        }
        Cli::Deck(cmd) => handle_deck_command(cmd, &state).await,
        Cli::Summarize { path } => chat::summarize_file(&state, path).await,
        Cli::Chat { notes } => chat::handle_chat_session(&state, notes).await,
    }
}

async fn handle_deck_command(cmd: DeckCommand, state: &AppState) -> anyhow::Result<()> {
    use deck::*;

    match cmd {
        DeckCommand::Add { path, name, recursive } => add_documents(state, path, name.as_deref(), recursive).await,
        DeckCommand::List => list_sets(state).await,
        DeckCommand::Show { name } => show_set(state, &name).await,
        DeckCommand::Export { name, path } => {
            let cards = state.store.load(&name).await?;
            write::export_to_excel(&cards, &path)?;
            println!("Exported {} flashcards to {}", cards.len(), path.display());
            Ok(())
        }
    }
}
