//! Title normalization and similarity scoring
//!
//! In-process replacement for storage-engine trigram matching. The contract:
//! `title_similarity` is symmetric, bounded to [0.0, 1.0], returns 1.0 for
//! titles that normalize identically, and 0.0 for titles sharing no
//! trigrams. Scores are comparable against the configured fuzzy-match
//! threshold (default 0.7).

use std::collections::HashSet;

/// Normalize a title for matching: lowercase, strip punctuation, collapse
/// whitespace runs to single spaces.
///
/// Idempotent: normalizing an already-normalized title is a no-op.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    let mut last_was_space = true;

    for c in title.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                normalized.push(lower);
            }
            last_was_space = false;
        } else if !last_was_space {
            normalized.push(' ');
            last_was_space = true;
        }
    }

    while normalized.ends_with(' ') {
        normalized.pop();
    }

    normalized
}

/// Similarity of two titles as Jaccard overlap of their trigram sets,
/// computed over normalized forms.
///
/// Titles too short to produce a trigram only match exactly (1.0 or 0.0).
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a_norm = normalize_title(a);
    let b_norm = normalize_title(b);

    if a_norm == b_norm {
        return 1.0;
    }

    let a_trigrams = trigrams(&a_norm);
    let b_trigrams = trigrams(&b_norm);

    if a_trigrams.is_empty() || b_trigrams.is_empty() {
        return 0.0;
    }

    let intersection = a_trigrams.intersection(&b_trigrams).count();
    let union = a_trigrams.len() + b_trigrams.len() - intersection;

    intersection as f64 / union as f64
}

fn trigrams(s: &str) -> HashSet<(char, char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .windows(3)
        .map(|w| (w[0], w[1], w[2]))
        .collect()
}
