//! Per-turn trace and timing data.
//!
//! This module defines the structs used to observe what a turn did: which
//! keywords were considered, which decomposition matched, what was selected,
//! and how the turn ended.
//!
//! The intended usage is:
//!
//! - `Session::respond` for normal operation.
//! - `Session::respond_verbose` for inspecting a turn in detail.
//!
//! Traces are intentionally simple and *opt-in*: `turn::run` always records
//! them (a turn touches at most a handful of keywords, so the cost is
//! allocation noise), and the plain path simply discards everything but the
//! response text.
//!
//! ## Design notes
//!
//! - These types carry raw `KeywordId`/`DecompId` values. The public API
//!   resolves them to keyword text and pattern strings; see `api.rs`.
//! - `MatchTrace::captures` holds the cleaned segments (post-substituted,
//!   whitespace-normalized), the same text templates render with.

use super::rules::{DecompId, KeywordId};
use std::time::Duration;

// --- Turn traces -------------------------------------------------------------

/// A finished turn: the response plus everything observed producing it.
#[derive(Debug, Clone)]
pub(crate) struct TurnRun {
    pub(crate) response: String,
    pub(crate) trace: TurnTrace,
    pub(crate) metrics: TurnMetrics,
}

/// Timings for one turn.
#[derive(Debug, Default, Clone)]
pub(crate) struct TurnMetrics {
    /// Total elapsed time for the turn.
    pub(crate) total: Duration,
    /// Time spent normalizing the input.
    pub(crate) normalize: Duration,
    /// Time spent scanning keywords, matching, and reassembling.
    pub(crate) search: Duration,
}

#[derive(Debug, Clone)]
pub(crate) struct TurnTrace {
    /// The normalized sentence the matcher saw.
    pub(crate) sentence: String,
    /// Keywords found in the sentence, highest weight first.
    pub(crate) ranked: Vec<KeywordId>,
    /// Every keyword tried, in the order tried, including redirect targets.
    pub(crate) attempts: Vec<AttemptTrace>,
    pub(crate) outcome: OutcomeTrace,
}

/// One keyword tried during the turn.
#[derive(Debug, Clone)]
pub(crate) struct AttemptTrace {
    pub(crate) keyword: KeywordId,
    /// Whether this keyword was reached through a `goto` rather than ranking.
    pub(crate) via_redirect: bool,
    /// Present when one of the keyword's decompositions matched.
    pub(crate) matched: Option<MatchTrace>,
    /// Present when a reassembly was selected for the match.
    pub(crate) selection: Option<SelectionTrace>,
}

#[derive(Debug, Clone)]
pub(crate) struct MatchTrace {
    pub(crate) decomp: DecompId,
    pub(crate) synonym: Option<String>,
    pub(crate) captures: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum SelectionTrace {
    /// A template was selected; `index` is its position in the reassembly list.
    Template { index: usize },
    Redirect { target: KeywordId },
}

/// How the turn ended.
#[derive(Debug, Clone)]
pub(crate) enum OutcomeTrace {
    /// A ranked or redirected keyword produced the response.
    Answered { keyword: KeywordId },
    /// No keyword answered; the fallback rule did.
    Fallback,
    /// A redirect chain hit the hop ceiling; the fallback rule answered.
    RedirectLimit { keyword: KeywordId },
}
