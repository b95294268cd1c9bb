//! Text normalization and tokenization
//!
//! `normalize` produces the canonical form used both as the cache key and as
//! scorer input, so two phrasings of the same question share one entry.

/// Leading words dropped from questions
const FILLER_WORDS: &[&str] = &["как", "где", "можно", "ли", "хочу", "нужно", "мне", "надо"];

/// Domain term variants folded to their canonical plural
const CANONICAL_TERMS: &[(&str, &str)] = &[("штраф", "штрафы")];

/// Canonicalize free text
///
/// Lowercases, collapses whitespace, strips trailing `?!.` and one leading
/// filler word at a time until nothing changes, then folds known singular
/// domain terms to their plural. The function is total and idempotent.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

    loop {
        let before = tokens.len();
        let last_len = tokens.last().map(|t| t.len());

        if let Some(last) = tokens.last_mut() {
            *last = last.trim_end_matches(['?', '!', '.']);
            if last.is_empty() {
                tokens.pop();
            }
        }

        // A lone filler word is kept: it is the whole question
        if tokens.len() > 1 && FILLER_WORDS.contains(&tokens[0]) {
            tokens.remove(0);
        }

        if tokens.len() == before && tokens.last().map(|t| t.len()) == last_len {
            break;
        }
    }

    tokens
        .into_iter()
        .map(|token| {
            CANONICAL_TERMS
                .iter()
                .find(|(variant, _)| *variant == token)
                .map(|(_, canonical)| *canonical)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on whitespace runs, keeping order and duplicates
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
