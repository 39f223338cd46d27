//! Turns free-form model output into flashcards.
//!
//! Strategies are tried in order and the first one producing any card wins:
//! an embedded JSON array, `Question:`/`Answer:` line pairs, `question: answer`
//! lines, and finally alternating question/answer lines.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::Flashcard;

static JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("valid regex")
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").expect("valid regex")
});

pub fn parse(raw: &str) -> Vec<Flashcard> {
    parse_limited(raw, usize::MAX)
}

/// Parse at most `limit` cards.
pub fn parse_limited(raw: &str, limit: usize) -> Vec<Flashcard> {
    if raw.trim().is_empty() || limit == 0 {
        return Vec::new();
    }

    let strategies: [fn(&str, usize) -> Vec<Flashcard>; 4] =
        [from_json, from_labeled_lines, from_colon_lines, from_alternating_lines];

    strategies
        .iter()
        .map(|strategy| strategy(raw, limit))
        .find(|cards| !cards.is_empty())
        .unwrap_or_default()
}

/// A JSON array of `{question, answer}` objects, possibly wrapped in prose.
/// One bad element rejects the whole array.
fn from_json(raw: &str, limit: usize) -> Vec<Flashcard> {
    let Some(span) = JSON_ARRAY.find(raw) else {
        return Vec::new();
    };
    let Ok(items) = serde_json::from_str::<Vec<Value>>(span.as_str()) else {
        return Vec::new();
    };

    let cards: Option<Vec<Flashcard>> = items
        .iter()
        .map(|item| {
            let question = item.get("question")?.as_str()?;
            let answer = item.get("answer")?.as_str()?;
            Flashcard::new(question, answer)
        })
        .collect();

    cards
        .map(|cards| cards.into_iter().take(limit).collect())
        .unwrap_or_default()
}

fn from_labeled_lines(raw: &str, limit: usize) -> Vec<Flashcard> {
    let mut cards = Vec::new();
    let mut pending: Option<&str> = None;

    for line in raw.lines() {
        if cards.len() >= limit {
            break;
        }
        let line = line.trim();
        if let Some(question) = strip_label(line, &["question:", "q:"]) {
            pending = Some(question);
        } else if let Some(answer) = strip_label(line, &["answer:", "a:"]) {
            if let Some(card) = pending.take().and_then(|q| Flashcard::new(q, answer)) {
                cards.push(card);
            }
        }
    }

    cards
}

fn from_colon_lines(raw: &str, limit: usize) -> Vec<Flashcard> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(question, answer)| Flashcard::new(question, answer))
        .take(limit)
        .collect()
}

fn from_alternating_lines(raw: &str, limit: usize) -> Vec<Flashcard> {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    lines
        .chunks_exact(2)
        .filter_map(|pair| {
            let question = LIST_MARKER.replace(pair[0], "");
            Flashcard::new(&question, pair[1])
        })
        .take(limit)
        .collect()
}

/// Case-insensitive prefix match returning the text after the label.
fn strip_label<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    labels.iter().find_map(|label| {
        let head = line.get(..label.len())?;
        head.eq_ignore_ascii_case(label).then(|| &line[label.len()..])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(q: &str, a: &str) -> Flashcard {
        Flashcard { question: q.to_string(), answer: a.to_string() }
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let cards = parse(r#"prefix [{"question":"Q1","answer":"A1"}] suffix"#);
        assert_eq!(cards, vec![card("Q1", "A1")]);
    }

    #[test]
    fn test_json_in_code_fence() {
        let raw = "Here you go:\n```json\n[\n  {\"question\": \"What is ATP?\", \"answer\": \"Energy currency\"},\n  {\"question\": \"Where is it made?\", \"answer\": \"Mitochondria\"}\n]\n```";
        assert_eq!(
            parse(raw),
            vec![card("What is ATP?", "Energy currency"), card("Where is it made?", "Mitochondria")]
        );
    }

    #[test]
    fn test_json_with_bad_element_falls_through() {
        let raw = r#"[{"question":"Q1","answer":"A1"},{"question":"Q2"}]"#;
        // JSON yields nothing, so the colon-line strategy takes the raw line.
        let cards = parse(raw);
        assert_ne!(cards, vec![card("Q1", "A1")]);
        assert_eq!(from_json(raw, usize::MAX), Vec::new());
    }

    #[test]
    fn test_labeled_lines() {
        let cards = parse("Question: What is 2+2?\nAnswer: 4\nQuestion: ignored\n");
        assert_eq!(cards, vec![card("What is 2+2?", "4")]);
    }

    #[test]
    fn test_labeled_lines_ignore_noise() {
        let raw = "Sure! Here are some cards.\nANSWER: orphan\nquestion: First?\n\nanswer: One\nQ: Second?\nA: Two";
        assert_eq!(parse(raw), vec![card("First?", "One"), card("Second?", "Two")]);
    }

    #[test]
    fn test_colon_lines() {
        let cards = parse("Capital of France: Paris\nCapital of Italy: Rome");
        assert_eq!(cards, vec![card("Capital of France", "Paris"), card("Capital of Italy", "Rome")]);
    }

    #[test]
    fn test_colon_split_on_first_colon_only() {
        let cards = parse("Ratio: 3:1");
        assert_eq!(cards, vec![card("Ratio", "3:1")]);
    }

    #[test]
    fn test_alternating_lines() {
        let cards = parse("2+2\n4\n3+3\n6");
        assert_eq!(cards, vec![card("2+2", "4"), card("3+3", "6")]);
    }

    #[test]
    fn test_alternating_strips_list_markers() {
        let cards = parse("1. Largest planet\nJupiter\n\n2. Smallest planet\nMercury\nleftover");
        assert_eq!(cards, vec![card("Largest planet", "Jupiter"), card("Smallest planet", "Mercury")]);
    }

    #[test]
    fn test_blank_output() {
        assert!(parse("").is_empty());
        assert!(parse("  \n\t\n").is_empty());
    }

    #[test]
    fn test_limit_applies_to_every_strategy() {
        assert_eq!(parse_limited(r#"[{"question":"a","answer":"b"},{"question":"c","answer":"d"}]"#, 1).len(), 1);
        assert_eq!(parse_limited("Question: a\nAnswer: b\nQuestion: c\nAnswer: d", 1).len(), 1);
        assert_eq!(parse_limited("a: b\nc: d", 1).len(), 1);
        assert_eq!(parse_limited("a\nb\nc\nd", 1).len(), 1);
        assert!(parse_limited("a: b", 0).is_empty());
    }

    #[test]
    fn test_parse_is_repeatable() {
        let raw = "Question: Why?\nAnswer: Because.\n";
        assert_eq!(parse(raw), parse(raw));
    }
}
