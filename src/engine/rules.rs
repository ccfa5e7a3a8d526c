//! Rule compilation and keyword ranking.
//!
//! This module holds the *static* side of the engine: the structures derived
//! from a parsed [`Script`] that make every later turn cheap and infallible.
//!
//! Loading is intentionally split into two phases:
//!
//! 1. **Parse** (see `script.rs`): line-level syntax, producing the raw
//!    [`Script`] structure.
//! 2. **Compile** (this module): cross-checks and pattern compilation,
//!    producing the immutable [`RuleSet`].
//!
//! Compilation front-loads everything that could fail:
//!
//! - every decomposition pattern is compiled to anchored, case-insensitive
//!   regexes, with one variant per synonym group member where the pattern
//!   carries an `@marker`;
//! - every template placeholder is checked against the pattern's capture
//!   count;
//! - every `goto` target is resolved to a [`KeywordId`];
//! - the fallback keyword (`none`) and its catch-all decomposition are
//!   located.
//!
//! A `RuleSet` that compiles therefore answers every input without further
//! error checking, which is what lets the response path return plain values.
//!
//! ## Invariants
//!
//! - `KeywordId` indexes `RuleSet::keywords`; `DecompId` indexes
//!   `RuleSet::decomps`. Both are assigned once at compile time and never
//!   change, so conversations can hold a plain `Vec<usize>` of reassembly
//!   cursors parallel to the decomposition arena.
//! - `Keyword::decomps` preserves script order; `Decomposition::variants`
//!   preserves synonym member order. The matcher relies on both for
//!   first-match-wins semantics.
//! - `Reassembly::Redirect` always holds a valid `KeywordId`.
//! - `fallback_catch_all` names a decomposition that matches any sentence and
//!   whose reassemblies are all templates, so the fallback can never dead-end.

use crate::script::{ReassemblyDef, Script, ScriptError};
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};

/// Keyword identifier (index into the keywords vector).
pub(crate) type KeywordId = usize;

/// Decomposition identifier (index into the decomposition arena).
pub(crate) type DecompId = usize;

/// The keyword consulted when nothing else produces a response.
pub(crate) const FALLBACK_KEYWORD: &str = "none";

/// Redirect hops tolerated within a single turn before the engine gives up on
/// the chain and answers from the fallback rule. Scripted redirects are
/// normally one or two hops deep; hitting this ceiling means the script loops.
pub(crate) const MAX_REDIRECT_HOPS: usize = 10;

// --- Compiled structures -----------------------------------------------------

#[derive(Debug)]
pub(crate) struct Keyword {
    pub(crate) text: String,
    pub(crate) weight: i32,
    /// Decompositions in script order.
    pub(crate) decomps: Vec<DecompId>,
}

/// One compiled form of a decomposition pattern. Patterns without a synonym
/// marker have exactly one variant; patterns with `@group` have one per group
/// member, in member order.
#[derive(Debug)]
pub(crate) struct PatternVariant {
    pub(crate) regex: Regex,
    /// The synonym member this variant stands for, if any.
    pub(crate) synonym: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Decomposition {
    /// The pattern as written in the script, for traces and error text.
    pub(crate) pattern: String,
    pub(crate) variants: Vec<PatternVariant>,
    /// Capture group count; identical across variants.
    pub(crate) captures: usize,
    pub(crate) reassemblies: Vec<Reassembly>,
}

#[derive(Debug)]
pub(crate) enum Reassembly {
    Template(String),
    Redirect(KeywordId),
}

/// A compiled, immutable rule set.
///
/// Compilation validates everything up front (see the module docs), so a
/// `RuleSet` answers every input without further error checking. It carries no
/// conversation state and is cheap to share; wrap it in an `Arc` and hand it
/// to as many [`crate::Session`]s as needed.
#[derive(Debug)]
pub struct RuleSet {
    keywords: Vec<Keyword>,
    by_text: HashMap<String, KeywordId>,
    decomps: Vec<Decomposition>,
    pre: HashMap<String, String>,
    post: HashMap<String, String>,
    quit: HashSet<String>,
    fallback: KeywordId,
    fallback_catch_all: DecompId,
}

impl RuleSet {
    /// Compile a parsed script, validating cross-references and patterns.
    ///
    /// See [`ScriptError`] for everything this can reject. `Script` fields are
    /// public, so compilation re-checks properties the parser already
    /// guarantees for scripts that came from text.
    pub fn compile(script: &Script) -> Result<RuleSet, ScriptError> {
        let debug = std::env::var_os("DOOLITTLE_DEBUG_RULES").is_some();

        let mut keywords: Vec<Keyword> = Vec::with_capacity(script.keywords.len());
        let mut by_text: HashMap<String, KeywordId> = HashMap::new();
        for def in &script.keywords {
            let text = def.text.to_lowercase();
            if by_text.insert(text.clone(), keywords.len()).is_some() {
                return Err(ScriptError::DuplicateKeyword { keyword: text });
            }
            keywords.push(Keyword { text, weight: def.weight, decomps: Vec::new() });
        }

        // Canonical name -> members. A group redefined later wins outright.
        let mut synonyms: HashMap<String, Vec<String>> = HashMap::new();
        for group in &script.synonyms {
            let members: Vec<String> = group.members.iter().map(|m| m.to_lowercase()).collect();
            if let Some(canonical) = members.first() {
                synonyms.insert(canonical.clone(), members);
            }
        }

        let mut decomps: Vec<Decomposition> = Vec::new();
        for (id, def) in script.keywords.iter().enumerate() {
            for decomp in &def.decompositions {
                if decomp.reassemblies.is_empty() {
                    return Err(ScriptError::EmptyDecomposition {
                        keyword: keywords[id].text.clone(),
                        pattern: decomp.pattern.clone(),
                    });
                }

                let (variants, captures) = compile_pattern(&keywords[id].text, &decomp.pattern, &synonyms)?;
                if variants.is_empty() && debug {
                    eprintln!(
                        "[compile] keyword '{}': pattern '{}' names an undefined synonym group and can never match",
                        keywords[id].text, decomp.pattern
                    );
                }

                let mut reassemblies = Vec::with_capacity(decomp.reassemblies.len());
                for reasmb in &decomp.reassemblies {
                    match reasmb {
                        ReassemblyDef::Template(template) => {
                            validate_placeholders(&keywords[id].text, &decomp.pattern, template, captures)?;
                            reassemblies.push(Reassembly::Template(template.clone()));
                        }
                        ReassemblyDef::Redirect(target) => {
                            let target_text = target.to_lowercase();
                            let Some(&target_id) = by_text.get(&target_text) else {
                                return Err(ScriptError::UnknownRedirect {
                                    keyword: keywords[id].text.clone(),
                                    target: target_text,
                                });
                            };
                            reassemblies.push(Reassembly::Redirect(target_id));
                        }
                    }
                }

                keywords[id].decomps.push(decomps.len());
                decomps.push(Decomposition { pattern: decomp.pattern.clone(), variants, captures, reassemblies });
            }
        }

        let pre: HashMap<String, String> =
            script.pre.iter().map(|(word, repl)| (word.to_lowercase(), repl.to_lowercase())).collect();
        let post: HashMap<String, String> =
            script.post.iter().map(|(word, repl)| (word.to_lowercase(), repl.to_lowercase())).collect();
        let quit: HashSet<String> = script.quit_phrases.iter().map(|p| p.trim().to_lowercase()).collect();

        let Some(&fallback) = by_text.get(FALLBACK_KEYWORD) else {
            return Err(ScriptError::MissingFallback { fallback: FALLBACK_KEYWORD });
        };
        let fallback_catch_all = keywords[fallback]
            .decomps
            .iter()
            .copied()
            .find(|&id| {
                decomps[id].pattern == "(.*)"
                    && decomps[id].reassemblies.iter().all(|r| matches!(r, Reassembly::Template(_)))
            })
            .ok_or(ScriptError::MissingCatchAll { fallback: FALLBACK_KEYWORD })?;

        if debug {
            eprintln!(
                "[compile] {} keywords, {} decompositions, {} synonym groups, {} pre, {} post, {} quit phrases",
                keywords.len(),
                decomps.len(),
                synonyms.len(),
                pre.len(),
                post.len(),
                quit.len()
            );
        }

        Ok(RuleSet { keywords, by_text, decomps, pre, post, quit, fallback, fallback_catch_all })
    }

    /// True when `input` is one of the script's quit phrases, ignoring case
    /// and surrounding whitespace.
    pub fn is_quit(&self, input: &str) -> bool {
        self.quit.contains(&input.trim().to_lowercase())
    }

    pub(crate) fn keyword(&self, id: KeywordId) -> &Keyword {
        &self.keywords[id]
    }

    pub(crate) fn decomp(&self, id: DecompId) -> &Decomposition {
        &self.decomps[id]
    }

    pub(crate) fn decomp_count(&self) -> usize {
        self.decomps.len()
    }

    pub(crate) fn fallback(&self) -> KeywordId {
        self.fallback
    }

    pub(crate) fn fallback_catch_all(&self) -> DecompId {
        self.fallback_catch_all
    }

    pub(crate) fn pre_substitute(&self, word: &str) -> Option<&str> {
        self.pre.get(word).map(String::as_str)
    }

    pub(crate) fn post_substitute(&self, word: &str) -> Option<&str> {
        self.post.get(word).map(String::as_str)
    }

    /// Keywords appearing in the sentence, highest weight first. Each keyword
    /// is listed once even if it occurs several times; ties keep the order of
    /// first appearance in the input.
    pub(crate) fn keywords_present(&self, words: &[String]) -> Vec<KeywordId> {
        let mut seen: HashSet<KeywordId> = HashSet::new();
        let mut ranked: Vec<KeywordId> = Vec::new();
        for word in words {
            if let Some(&id) = self.by_text.get(word) {
                if seen.insert(id) {
                    ranked.push(id);
                }
            }
        }
        // Stable sort, so equal weights stay in appearance order.
        ranked.sort_by(|&a, &b| self.keywords[b].weight.cmp(&self.keywords[a].weight));
        ranked
    }
}

// --- Pattern compilation -----------------------------------------------------

/// Compile a decomposition pattern into its variants and count its captures.
///
/// A pattern may carry at most one `@group` marker; only the first is
/// recognized. The marker is spliced out and each group member substituted in
/// as its own capture group, so the member a sentence matched is recoverable
/// and the capture count stays identical across variants. An undefined group
/// yields zero variants, which simply never match.
fn compile_pattern(
    keyword: &str,
    pattern: &str,
    synonyms: &HashMap<String, Vec<String>>,
) -> Result<(Vec<PatternVariant>, usize), ScriptError> {
    let Some(found) = regex!(r"@(\w+)").captures(pattern) else {
        let regex = compile_anchored(keyword, pattern, pattern)?;
        let captures = regex.captures_len() - 1;
        return Ok((vec![PatternVariant { regex, synonym: None }], captures));
    };

    let span = found.get(0).unwrap();
    let group = found[1].to_lowercase();

    // Probe with the group name spliced in. This validates the surrounding
    // pattern and fixes the capture count even when the group is undefined.
    let probe = compile_anchored(keyword, pattern, &splice(pattern, span.start(), span.end(), &group))?;
    let captures = probe.captures_len() - 1;

    let members = synonyms.get(&group).map(Vec::as_slice).unwrap_or_default();
    let mut variants = Vec::with_capacity(members.len());
    for member in members {
        let regex = compile_anchored(keyword, pattern, &splice(pattern, span.start(), span.end(), member))?;
        variants.push(PatternVariant { regex, synonym: Some(member.clone()) });
    }
    Ok((variants, captures))
}

/// Replace `pattern[start..end]` with `(member)`, regex-escaped.
fn splice(pattern: &str, start: usize, end: usize, member: &str) -> String {
    format!("{}({}){}", &pattern[..start], regex::escape(member), &pattern[end..])
}

/// Patterns must cover the whole sentence, so anchor the body inside a
/// non-capturing group to keep alternations from escaping the anchors.
fn compile_anchored(keyword: &str, pattern: &str, body: &str) -> Result<Regex, ScriptError> {
    RegexBuilder::new(&format!("^(?:{body})$")).case_insensitive(true).build().map_err(|source| {
        ScriptError::BadPattern { keyword: keyword.to_string(), pattern: pattern.to_string(), source }
    })
}

fn validate_placeholders(keyword: &str, pattern: &str, template: &str, captures: usize) -> Result<(), ScriptError> {
    for caps in regex!(r"\((\d)\)").captures_iter(template) {
        let index = caps[1].parse::<usize>().unwrap_or(0);
        if index == 0 || index > captures {
            return Err(ScriptError::BadPlaceholder {
                keyword: keyword.to_string(),
                pattern: pattern.to_string(),
                template: template.to_string(),
                index,
                captures,
            });
        }
    }
    Ok(())
}
