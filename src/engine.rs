//! Matching and response engine.
//!
//! This module is the *public entry point* for the rule engine. The code is
//! split into focused submodules under `src/engine/` while keeping public paths
//! stable (callers see `crate::engine::RuleSet`; everything else stays
//! crate-private behind the [`crate::Session`] facade).
//!
//! ## How the parts work together
//!
//! Loading happens once per script:
//!
//! ```text
//! script text ── Script::parse ──> Script ── RuleSet::compile ──> RuleSet
//!                (script.rs)                  (rules.rs)
//!                  line syntax                 cross-checks + regex compilation
//! ```
//!
//! Producing a response is a pipeline over the compiled, immutable `RuleSet`
//! plus a small per-conversation cursor table:
//!
//! ```text
//! input ── sentence_words ──> lowercased words   (normalize.rs)
//!            (strip punctuation, apply pre subs)
//!                  │
//!                  v
//!        RuleSet::keywords_present                (rules.rs)
//!          rank by weight, ties in input order
//!                  │
//!                  v
//!            turn::run                            (turn.rs)
//!              for each candidate keyword:
//!                find_match        (matcher.rs)   first decomposition that fits
//!                select_reassembly (reassembly.rs) round-robin cursor advance
//!                  ├─ Template ──> render + lowercase ──> response
//!                  └─ Redirect ──> splice target keyword after current one
//!              no keyword answers ──> fallback rule ("none")
//! ```
//!
//! The engine is **deterministic**: for a fixed conversation history, the same
//! input against the same script always produces the same response. The only
//! state that survives a turn is the reassembly cursor table, which is what
//! makes repeated inputs cycle through a rule's phrasings instead of
//! repeating one.
//!
//! ## Responsibilities by module
//!
//! - `rules.rs`: compiles a parsed [`crate::Script`] into the immutable
//!   [`RuleSet`] arena (pattern variants per synonym member, redirect targets
//!   resolved to ids, fallback rule located) and ranks keywords per input.
//! - `normalize.rs`: input canonicalization; punctuation stripping, case
//!   folding, pre-substitution.
//! - `matcher.rs`: runs a keyword's decomposition patterns against the
//!   normalized sentence and captures wildcard segments.
//! - `reassembly.rs`: round-robin reassembly selection, post-substitution of
//!   captured text, template rendering.
//! - `turn.rs`: drives one full turn; keyword scan order, redirect splicing
//!   with the hop ceiling, fallback handling.
//! - `metrics.rs`: per-turn trace and timing data for the verbose API.
//!
//! ## Public surface
//!
//! Most code interacts with the engine via:
//!
//! - [`crate::Session`] (owns the cursors; `respond` / `respond_verbose`)
//! - [`RuleSet`] (compiled rules, shareable across sessions via `Arc`)
//!
//! ## Authoring notes
//!
//! - Decomposition patterns are regular expressions matched against the whole
//!   normalized sentence, case-insensitively. Parenthesized groups become the
//!   `(1)`..`(9)` captures that templates reference.
//! - A pattern may name one synonym group with `@word`; compilation expands it
//!   into one pattern variant per group member, tried in member order.
//! - Every script must define the fallback keyword `none` with a `(.*)`
//!   decomposition whose reassemblies are all templates. Compilation rejects
//!   scripts that lack it, so a loaded rule set always has an answer.
//!
//! ## Debugging
//!
//! Set `DOOLITTLE_DEBUG_RULES=1` to print compilation, keyword scan, and match
//! traces to stderr. For structured per-turn data use
//! [`crate::Session::respond_verbose`].

#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/normalize.rs"]
mod normalize;
#[path = "engine/reassembly.rs"]
mod reassembly;
#[path = "engine/rules.rs"]
mod rules;
#[path = "engine/turn.rs"]
mod turn;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use rules::RuleSet;

pub(crate) use metrics::{AttemptTrace, OutcomeTrace, SelectionTrace, TurnMetrics, TurnTrace};
pub(crate) use rules::MAX_REDIRECT_HOPS;
pub(crate) use turn::run;
