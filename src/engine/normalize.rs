//! Input canonicalization.
//!
//! Raw input is reduced to the lowercase word list the matcher and keyword
//! ranking operate on. Punctuation is stripped (apostrophes survive, so
//! contractions like `don't` stay one word), case is folded, and the script's
//! `pre:` substitutions are applied per word. A multi-word replacement is
//! split again, so `i'm -> i am` yields two words; replacements are not
//! re-substituted, which keeps cyclic `pre:` pairs harmless.

use super::rules::RuleSet;

/// Normalize one input line into sentence words.
pub(crate) fn sentence_words(rules: &RuleSet, input: &str) -> Vec<String> {
    let stripped = regex!(r"[\p{P}--']").replace_all(input, "");
    let lowered = stripped.to_lowercase();

    let mut words: Vec<String> = Vec::new();
    for word in lowered.split_whitespace() {
        match rules.pre_substitute(word) {
            Some(replacement) => words.extend(replacement.split_whitespace().map(str::to_string)),
            None => words.push(word.to_string()),
        }
    }
    words
}
