// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fuzzy resolution of human-readable memory references to opaque ids.
//!
//! The editor agent frequently refers to an existing memory by quoting its
//! text rather than its id. Resolution normalizes both sides, tries an
//! exact match, then scores each candidate by the greater of token-overlap
//! ratio and substring-containment ratio. The acceptance threshold is a
//! config tunable (0.45 default).

use crate::types::Memory;

/// Lowercases and collapses all whitespace runs to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a reference text against candidate memories.
///
/// Returns the id of the best candidate at or above `threshold`, or `None`
/// when nothing matches well enough -- the caller then skips the action.
pub fn resolve_reference(
    reference: &str,
    candidates: &[Memory],
    threshold: f32,
) -> Option<String> {
    let reference = normalize_text(reference);
    if reference.is_empty() {
        return None;
    }

    let mut best: Option<(f32, &Memory)> = None;
    for candidate in candidates {
        let text = normalize_text(&candidate.text);
        if text == reference {
            return Some(candidate.id.clone());
        }

        let score = token_overlap(&reference, &text).max(containment_ratio(&reference, &text));
        match best {
            Some((best_score, _)) if best_score >= score => {}
            _ => best = Some((score, candidate)),
        }
    }

    best.filter(|(score, _)| *score >= threshold)
        .map(|(_, memory)| memory.id.clone())
}

/// Shared words divided by the reference word count.
fn token_overlap(reference: &str, candidate: &str) -> f32 {
    let ref_words: Vec<&str> = reference.split(' ').collect();
    if ref_words.is_empty() {
        return 0.0;
    }
    let shared = ref_words
        .iter()
        .filter(|w| candidate.split(' ').any(|c| c == **w))
        .count();
    shared as f32 / ref_words.len() as f32
}

/// When one normalized text contains the other, the shorter length divided
/// by the longer; zero otherwise.
fn containment_ratio(reference: &str, candidate: &str) -> f32 {
    let (shorter, longer) = if reference.len() <= candidate.len() {
        (reference, candidate)
    } else {
        (candidate, reference)
    };
    if longer.is_empty() || !longer.contains(shorter) {
        return 0.0;
    }
    shorter.len() as f32 / longer.len() as f32
}
