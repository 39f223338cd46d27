#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
}

impl Chunk {
    pub fn new(index: usize, content: String) -> Self {
        Self {
            index,
            content,
        }
    }
}

/// Split `content` at fixed character offsets `0, chunk_size, 2 * chunk_size, ...`.
///
/// Word and sentence boundaries are not respected, so a sentence may straddle
/// two chunks. Concatenating the chunks in order reproduces `content` exactly.
pub fn chunk_document(content: &str, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut starts = content
        .char_indices()
        .map(|(pos, _)| pos)
        .step_by(chunk_size)
        .peekable();

    let mut chunks = Vec::new();
    while let Some(start) = starts.next() {
        let end = starts.peek().copied().unwrap_or(content.len());
        chunks.push(Chunk::new(chunks.len(), content[start..end].to_string()));
    }

    chunks
}

/// Cap `content` at `max_chars` characters, appending an ellipsis when it was cut.
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((pos, _)) => format!("{}...", &content[..pos]),
        None => content.to_string(),
    }
}
