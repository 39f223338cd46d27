use crate::chat::{Role, Talk};

/// Placeholder replaced by the chunk text in the user template.
pub const TEXT_SLOT: &str = "{text}";

pub const DEFAULT_SYSTEM: &str = "You are a helpful study assistant. You turn study notes into flashcards.";

pub const DEFAULT_USER: &str = "Create 5-10 flashcards (question-answer pairs) from the notes below. \
Format your response as a JSON array of objects with 'question' and 'answer' fields. \
If you cannot produce JSON, write each flashcard as a line starting with 'Question:' \
followed by a line starting with 'Answer:'.\n\nNotes:\n{text}";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM, DEFAULT_USER)
    }
}

impl PromptTemplate {
    /// A user template without a `{text}` slot gets the text appended on a new paragraph.
    pub fn new(system: &str, user: &str) -> Self {
        let user = if user.contains(TEXT_SLOT) {
            user.to_string()
        } else {
            format!("{user}\n\n{TEXT_SLOT}")
        };
        Self {
            system: system.to_string(),
            user,
        }
    }

    pub fn build(&self, chunk: &str) -> String {
        self.user.replacen(TEXT_SLOT, chunk, 1)
    }

    pub fn messages(&self, chunk: &str) -> Vec<Talk> {
        let mut messages = Vec::with_capacity(2);
        if !self.system.trim().is_empty() {
            messages.push(Talk::new(Role::System, self.system.clone()));
        }
        messages.push(Talk::new(Role::User, self.build(chunk)));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_substitutes_once() {
        let template = PromptTemplate::new("sys", "Cards for: {text} (not {text})");
        assert_eq!(template.build("cells"), "Cards for: cells (not {text})");
    }

    #[test]
    fn test_missing_slot_appends_text() {
        let template = PromptTemplate::new("sys", "Make flashcards.");
        assert_eq!(template.build("notes here"), "Make flashcards.\n\nnotes here");
    }

    #[test]
    fn test_messages() {
        let messages = PromptTemplate::default().messages("Osmosis moves water.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.ends_with("Osmosis moves water."));
        assert!(messages[1].content.contains("Question:"));

        let bare = PromptTemplate::new("", "{text}").messages("x");
        assert_eq!(bare, vec![Talk::new(Role::User, "x".to_string())]);
    }
}
