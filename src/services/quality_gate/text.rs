//! Text helpers shared by the quality gate checkers.

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use crate::domain::models::TaskId;

/// Stems are word prefixes of this many characters.
const STEM_CHARS: usize = 5;

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*task\s*#?\s*(\d+)\s*\]").expect("citation pattern is valid")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_']+").expect("word pattern is valid"));

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "was", "were", "are", "has", "have", "had",
    "from", "into", "onto", "its", "it's", "but", "not", "all", "any", "can", "will", "would",
    "should", "could", "been", "being", "also", "then", "than", "there", "their", "they", "them",
    "these", "those", "which", "who", "what", "when", "where", "while", "our", "you", "your",
    "his", "her", "she", "him", "task", "did", "does", "done", "per", "via", "about", "after",
    "before", "over", "under", "each", "some", "such", "only", "just", "very",
];

const CLAIM_MARKERS: &[&str] = &[
    "is", "are", "was", "were", "has", "have", "had", "contains", "returns", "uses", "runs",
    "ran", "wrote", "found", "shows", "reports", "exists", "includes", "passes", "fails",
];

const HEDGES: &[&str] = &[
    "i think", "maybe", "perhaps", "consider", "you should", "you could", "please", "let me",
    "next steps", "in summary", "overall",
];

/// Split text into sentences. Periods inside tokens (`lib.rs`, `1.5`) do
/// not end a sentence; line breaks always do.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' => match chars.peek() {
                None => Some(i + c.len_utf8()),
                Some(&(_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            let piece = text[start..end].trim();
            if !piece.is_empty() {
                out.push(piece);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Task ids cited as `[Task #N]` in `text`, in order of first appearance.
pub fn citations(text: &str) -> Vec<TaskId> {
    let mut seen = BTreeSet::new();
    CITATION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .map(TaskId)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// `text` with every citation removed.
pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").trim().to_string()
}

/// Lowercased word tokens.
pub fn words(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Lowercased tokens of three or more characters that are not stopwords.
pub fn content_words(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Crude stem: the first few characters of a word.
pub fn stem(word: &str) -> String {
    word.chars().take(STEM_CHARS).collect()
}

/// Stems of the content words in `text`.
pub fn stems(text: &str) -> HashSet<String> {
    content_words(text).iter().map(|w| stem(w)).collect()
}

/// Word n-grams of `text`.
pub fn shingles(text: &str, n: usize) -> HashSet<String> {
    let words = words(text);
    if words.len() < n {
        return HashSet::new();
    }
    words.windows(n).map(|w| w.join(" ")).collect()
}

/// Jaccard similarity of two sets; 0 when both are empty.
pub fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Whether a sentence asserts something checkable, as opposed to a
/// heading, question, hedge or recommendation.
pub fn is_factual_statement(sentence: &str) -> bool {
    let body = strip_citations(sentence);
    let trimmed = body.trim_start_matches(|c: char| c == '-' || c == '*' || c.is_whitespace());
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.ends_with('?') || trimmed.ends_with(':') {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if HEDGES.iter().any(|h| lower.starts_with(h)) {
        return false;
    }
    let tokens = words(&lower);
    if tokens.len() < 3 {
        return false;
    }
    tokens.iter().any(|w| {
        CLAIM_MARKERS.contains(&w.as_str())
            || (w.len() > 4 && w.ends_with("ed"))
            || w.chars().any(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_keep_file_names_intact() {
        let text = "Created src/lib.rs and Class1.ts. Tests passed!\nNext line";
        assert_eq!(
            sentences(text),
            vec!["Created src/lib.rs and Class1.ts.", "Tests passed!", "Next line"]
        );
    }

    #[test]
    fn test_citations_parsed_and_deduplicated() {
        let ids = citations("A [Task #3] and b [task 1] and again [Task #3]");
        assert_eq!(ids, vec![TaskId(3), TaskId(1)]);
        assert_eq!(strip_citations("File was modified [Task #3]"), "File was modified");
    }

    #[test]
    fn test_stems_match_inflections() {
        let a = stems("The file was modified");
        let b = stems("Modification of config file complete");
        assert!(a.contains("modif") && b.contains("modif"));
        assert!(a.contains("file"));
    }

    #[test]
    fn test_jaccard_of_identical_shingles_is_one() {
        let a = shingles("the quick brown fox jumps", 3);
        assert!((jaccard(&a, &a.clone()) - 1.0).abs() < f64::EPSILON);
        assert!(jaccard(&a, &shingles("entirely different words here", 3)) < 0.01);
    }

    #[test]
    fn test_factual_statement_detection() {
        assert!(is_factual_statement("File was modified [Task #3]"));
        assert!(is_factual_statement("The build produced 3 warnings."));
        assert!(!is_factual_statement("## Summary"));
        assert!(!is_factual_statement("Should we refactor the parser?"));
        assert!(!is_factual_statement("Consider adding more tests."));
        assert!(!is_factual_statement("Done."));
    }
}
