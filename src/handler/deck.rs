use std::path::{Path, PathBuf};
use walkdir::DirEntry;
use crate::document::{process_document_blocking, DocumentKind};
use crate::store::sanitize_name;
use super::AppState;

pub async fn add_documents(
    state: &AppState,
    path: PathBuf,
    name: Option<&str>,
    recursive: bool,
) -> anyhow::Result<()> {
    if path.is_dir() {
        process_directory(state, path, name, recursive).await
    } else {
        let set_name = match name {
            Some(name) => name.to_string(),
            None => file_stem(&path),
        };
        process_single_file(state, path, &set_name).await
    }
}

async fn process_directory(
    state: &AppState,
    path: PathBuf,
    name: Option<&str>,
    recursive: bool,
) -> anyhow::Result<()> {
    let entries = get_entries(&path, recursive);

    for entry in entries {
        let entry_path = entry.path();
        if !entry_path.is_file() {
            continue;
        }
        let filename = entry_path.file_name().and_then(|f| f.to_str()).unwrap_or_default();
        if DocumentKind::detect(filename, &[]).is_err() {
            println!("Skipping unsupported file: {}", entry_path.display());
            continue;
        }

        let set_name = match name {
            Some(prefix) => format!("{}_{}", prefix, file_stem(entry_path)),
            None => file_stem(entry_path),
        };
        process_single_file(state, entry_path.to_path_buf(), &set_name).await?;
    }
    Ok(())
}

async fn process_single_file(
    state: &AppState,
    path: PathBuf,
    set_name: &str,
) -> anyhow::Result<()> {
    println!("Processing {}", path.display());

    let bytes = tokio::fs::read(&path).await?;
    let filename = path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    let content = process_document_blocking(filename, bytes).await?;
    let generation = state.pipeline.generate_flashcards(&content).await?;

    for failure in &generation.failures {
        println!("\tchunk {} failed: {}", failure.index, failure.error);
    }
    if generation.all_failed() {
        anyhow::bail!("every chunk of {} failed", path.display());
    }

    let saved = state.store.save(set_name, &generation.flashcards).await?;
    println!(
        "{}: {} chunks, {} flashcards saved as '{}'{}",
        path.display(),
        generation.chunk_count,
        generation.flashcards.len(),
        saved,
        if generation.capped { " (card limit reached)" } else { "" },
    );
    Ok(())
}

fn file_stem(path: &Path) -> String {
    let stem = path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    sanitize_name(stem)
}

fn get_entries(path: &PathBuf, recursive: bool) -> Box<dyn Iterator<Item = DirEntry>> {
    let iter = if recursive {
        walkdir::WalkDir::new(path)
    } else {
        walkdir::WalkDir::new(path).max_depth(1)
    };
    Box::new(iter.sort_by_file_name().into_iter().filter_map(|e| e.ok()))
}

pub async fn list_sets(state: &AppState) -> anyhow::Result<()> {
    let sets = state.store.list().await?;
    println!("\nFlashcard sets:");
    for name in sets {
        println!("\t{}", name);
    }
    Ok(())
}

pub async fn show_set(state: &AppState, name: &str) -> anyhow::Result<()> {
    let cards = state.store.load(name).await?;
    for (i, card) in cards.iter().enumerate() {
        println!("{}. Q: {}\n   A: {}\n", i + 1, card.question, card.answer);
    }
    Ok(())
}
