use std::io::{self, Write};
use std::path::PathBuf;

use crate::document::process_document_blocking;
use super::AppState;

async fn read_document(path: PathBuf) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(&path).await?;
    let filename = path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    Ok(process_document_blocking(filename, bytes).await?)
}

pub async fn summarize_file(state: &AppState, path: PathBuf) -> anyhow::Result<()> {
    let content = read_document(path).await?;
    let summary = state.pipeline.summarize(&content).await?;
    println!("\n{}\n", summary);
    Ok(())
}

pub async fn handle_chat_session(state: &AppState, notes: Option<PathBuf>) -> anyhow::Result<()> {
    let notes = match notes {
        Some(path) => Some(read_document(path).await?),
        None => None,
    };

    let mut input = String::new();
    loop {
        println!("Ask a question (type 'quit' to exit)>>>");
        input.clear();
        io::stdout().flush()?;
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let question = input.trim();
        if question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match state.pipeline.answer(question, notes.as_deref()).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => println!("\nCould not get an answer: {}\n", err),
        }
    }

    Ok(())
}
