//! Decomposition matching.
//!
//! Given a candidate keyword and the normalized sentence, find the first
//! decomposition that fits. Decompositions are tried in script order and the
//! variants of each (one per synonym group member) in member order, so a
//! script author controls precedence by ordering alone.

use super::rules::{DecompId, KeywordId, RuleSet};

#[derive(Debug, Clone)]
pub(crate) struct MatchResult {
    pub(crate) decomp: DecompId,
    /// The synonym group member that matched, when the pattern had a marker.
    pub(crate) synonym: Option<String>,
    /// Raw captured segments in group order. A group that did not participate
    /// in the match (an optional wildcard that stayed absent) captures "".
    pub(crate) captures: Vec<String>,
}

/// Try a keyword's decompositions against the sentence, first match wins.
pub(crate) fn find_match(rules: &RuleSet, keyword: KeywordId, sentence: &str) -> Option<MatchResult> {
    let debug = std::env::var_os("DOOLITTLE_DEBUG_RULES").is_some();

    for &decomp_id in &rules.keyword(keyword).decomps {
        let decomp = rules.decomp(decomp_id);
        for variant in &decomp.variants {
            let Some(caps) = variant.regex.captures(sentence) else {
                continue;
            };
            let captures: Vec<String> =
                (1..caps.len()).map(|i| caps.get(i).map(|m| m.as_str()).unwrap_or("").to_string()).collect();
            if debug {
                eprintln!(
                    "[match] keyword='{}' pattern='{}' synonym={:?} captures={:?}",
                    rules.keyword(keyword).text, decomp.pattern, variant.synonym, captures
                );
            }
            return Some(MatchResult { decomp: decomp_id, synonym: variant.synonym.clone(), captures });
        }
    }
    None
}
