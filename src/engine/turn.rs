//! Turn orchestration.
//!
//! This module is the operational core of the engine:
//!
//! - Normalize the input into sentence words (see `normalize.rs`).
//! - Rank the keywords present in the sentence by weight (see `rules.rs`).
//! - Try each candidate keyword in order: first matching decomposition, then
//!   the reassembly under its cursor (see `matcher.rs` and `reassembly.rs`).
//! - Follow `goto` redirects by splicing the target keyword into the
//!   candidate list directly after the current one, so a failed redirect
//!   falls back to the remaining ranked keywords.
//! - When nothing answers, or a redirect chain exceeds the hop ceiling,
//!   answer from the fallback rule.
//!
//! ## Candidate walk
//!
//! ```text
//! ranked: [high, mid, low]
//!            │
//!            v
//! high matches, selects "goto other"
//!   -> candidates become [high, other*, mid, low]   (* via redirect)
//! other has no matching decomposition
//!   -> continue with mid, hop count resets
//! ```
//!
//! The hop count only grows across consecutive redirects. Passing the ceiling
//! abandons the chain rather than the turn; the fallback rule still answers.
//! Every turn therefore produces exactly one response, and the only state it
//! mutates is the reassembly cursors it advanced.
//!
//! ## Debugging
//!
//! Setting `DOOLITTLE_DEBUG_RULES=1` prints keyword ranking, match, and
//! redirect traces for each turn.

use super::matcher::find_match;
use super::metrics::{AttemptTrace, MatchTrace, OutcomeTrace, SelectionTrace, TurnMetrics, TurnRun, TurnTrace};
use super::normalize::sentence_words;
use super::reassembly::{clean_capture, render, select_reassembly};
use super::rules::{KeywordId, MAX_REDIRECT_HOPS, Reassembly, RuleSet};
use std::time::Instant;

/// Produce the response for one input line, advancing reassembly cursors.
///
/// `cursors` must be parallel to the rule set's decomposition arena, one
/// cursor per decomposition.
pub(crate) fn run(rules: &RuleSet, cursors: &mut [usize], input: &str) -> TurnRun {
    let debug = std::env::var_os("DOOLITTLE_DEBUG_RULES").is_some();
    let turn_start = Instant::now();

    let normalize_start = Instant::now();
    let words = sentence_words(rules, input);
    let sentence = words.join(" ");
    let normalize = normalize_start.elapsed();

    let search_start = Instant::now();
    let ranked = rules.keywords_present(&words);
    if debug {
        let listed: Vec<String> =
            ranked.iter().map(|&id| format!("{}({})", rules.keyword(id).text, rules.keyword(id).weight)).collect();
        eprintln!("[keyword_scan] sentence='{sentence}' ranked={listed:?}");
    }

    let mut attempts: Vec<AttemptTrace> = Vec::new();
    let (response, outcome) = match search(rules, cursors, &sentence, &ranked, &mut attempts) {
        SearchEnd::Answered { response, keyword } => (response, OutcomeTrace::Answered { keyword }),
        SearchEnd::Limit { target } => {
            let response = fallback_answer(rules, cursors, &sentence, &mut attempts);
            (response, OutcomeTrace::RedirectLimit { keyword: target })
        }
        SearchEnd::Exhausted => {
            let response = fallback_answer(rules, cursors, &sentence, &mut attempts);
            (response, OutcomeTrace::Fallback)
        }
    };
    let search = search_start.elapsed();

    TurnRun {
        response,
        trace: TurnTrace { sentence, ranked, attempts, outcome },
        metrics: TurnMetrics { total: turn_start.elapsed(), normalize, search },
    }
}

enum SearchEnd {
    /// A keyword matched and selected a template.
    Answered { response: String, keyword: KeywordId },
    /// A redirect chain passed the hop ceiling; `target` is the keyword the
    /// chain was about to enter.
    Limit { target: KeywordId },
    /// Every candidate was tried and none produced a template.
    Exhausted,
}

/// Walk the candidate keywords, splicing in redirect targets as they appear.
fn search(
    rules: &RuleSet,
    cursors: &mut [usize],
    sentence: &str,
    ranked: &[KeywordId],
    attempts: &mut Vec<AttemptTrace>,
) -> SearchEnd {
    let debug = std::env::var_os("DOOLITTLE_DEBUG_RULES").is_some();

    // (keyword, reached via redirect)
    let mut candidates: Vec<(KeywordId, bool)> = ranked.iter().map(|&id| (id, false)).collect();
    let mut hops = 0usize;
    let mut i = 0;
    while i < candidates.len() {
        let (keyword, via_redirect) = candidates[i];
        if !via_redirect {
            hops = 0;
        }

        match find_match(rules, keyword, sentence) {
            Some(hit) => {
                let captures: Vec<String> = hit.captures.iter().map(|c| clean_capture(rules, c)).collect();
                let matched = Some(MatchTrace { decomp: hit.decomp, synonym: hit.synonym, captures: captures.clone() });
                let (index, selected) = select_reassembly(rules, cursors, hit.decomp);
                match selected {
                    Reassembly::Template(template) => {
                        attempts.push(AttemptTrace {
                            keyword,
                            via_redirect,
                            matched,
                            selection: Some(SelectionTrace::Template { index }),
                        });
                        return SearchEnd::Answered { response: render(template, &captures), keyword };
                    }
                    Reassembly::Redirect(target) => {
                        attempts.push(AttemptTrace {
                            keyword,
                            via_redirect,
                            matched,
                            selection: Some(SelectionTrace::Redirect { target: *target }),
                        });
                        hops += 1;
                        if hops > MAX_REDIRECT_HOPS {
                            if debug {
                                eprintln!(
                                    "[redirect_limit] chain through '{}' exceeded {} hops",
                                    rules.keyword(*target).text,
                                    MAX_REDIRECT_HOPS
                                );
                            }
                            return SearchEnd::Limit { target: *target };
                        }
                        if debug {
                            eprintln!(
                                "[redirect] '{}' -> '{}' (hop {hops})",
                                rules.keyword(keyword).text,
                                rules.keyword(*target).text
                            );
                        }
                        candidates.insert(i + 1, (*target, true));
                    }
                }
            }
            None => {
                attempts.push(AttemptTrace { keyword, via_redirect, matched: None, selection: None });
            }
        }
        i += 1;
    }
    SearchEnd::Exhausted
}

/// Answer from the fallback rule. The fallback keyword is consulted like any
/// other; should it select a redirect, the turn is already in recovery, so
/// the redirect is not followed and the catch-all decomposition answers
/// instead.
fn fallback_answer(rules: &RuleSet, cursors: &mut [usize], sentence: &str, attempts: &mut Vec<AttemptTrace>) -> String {
    let fallback = rules.fallback();
    if std::env::var_os("DOOLITTLE_DEBUG_RULES").is_some() {
        eprintln!("[fallback] answering with '{}'", rules.keyword(fallback).text);
    }

    if let Some(hit) = find_match(rules, fallback, sentence) {
        let captures: Vec<String> = hit.captures.iter().map(|c| clean_capture(rules, c)).collect();
        let (index, selected) = select_reassembly(rules, cursors, hit.decomp);
        let matched = Some(MatchTrace { decomp: hit.decomp, synonym: hit.synonym, captures: captures.clone() });
        match selected {
            Reassembly::Template(template) => {
                attempts.push(AttemptTrace {
                    keyword: fallback,
                    via_redirect: false,
                    matched,
                    selection: Some(SelectionTrace::Template { index }),
                });
                return render(template, &captures);
            }
            Reassembly::Redirect(target) => {
                attempts.push(AttemptTrace {
                    keyword: fallback,
                    via_redirect: false,
                    matched,
                    selection: Some(SelectionTrace::Redirect { target: *target }),
                });
            }
        }
    }

    // The catch-all holds only templates; compile() rejects scripts where the
    // fallback keyword lacks one.
    let decomp_id = rules.fallback_catch_all();
    let decomp = rules.decomp(decomp_id);
    let captures: Vec<String> = match decomp.variants[0].regex.captures(sentence) {
        Some(caps) => {
            (1..caps.len()).map(|i| clean_capture(rules, caps.get(i).map(|m| m.as_str()).unwrap_or(""))).collect()
        }
        None => vec![String::new(); decomp.captures],
    };
    let (index, selected) = select_reassembly(rules, cursors, decomp_id);
    attempts.push(AttemptTrace {
        keyword: fallback,
        via_redirect: false,
        matched: Some(MatchTrace { decomp: decomp_id, synonym: None, captures: captures.clone() }),
        selection: Some(SelectionTrace::Template { index }),
    });
    match selected {
        Reassembly::Template(template) => render(template, &captures),
        Reassembly::Redirect(_) => String::new(),
    }
}
