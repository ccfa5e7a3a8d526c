use crate::engine;
use crate::engine::{AttemptTrace, MAX_REDIRECT_HOPS, OutcomeTrace, RuleSet, SelectionTrace, TurnMetrics, TurnTrace};
use crate::script::{Script, ScriptError};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// The conversation opener a front end should print before reading input.
pub const GREETING: &str = "Hello. How are you feeling today?";

/// The closing line for a conversation ended by a quit phrase.
pub const FAREWELL: &str = "Goodbye. Thank you for talking to me.";

/// The built-in psychotherapist script, embedded at compile time.
///
/// Parse it yourself to inspect or extend it; [`Session::doctor`] uses a
/// shared pre-compiled copy.
pub const DOCTOR_SCRIPT: &str = include_str!("../scripts/doctor.txt");

static DOCTOR: Lazy<Arc<RuleSet>> = Lazy::new(|| {
    let script = Script::parse(DOCTOR_SCRIPT).expect("built-in doctor script parses");
    Arc::new(RuleSet::compile(&script).expect("built-in doctor script compiles"))
});

/// One conversation against a compiled rule set.
///
/// A session owns the per-conversation reassembly cursors, so two sessions
/// sharing one [`RuleSet`] rotate through phrasings independently. Everything
/// else is immutable and shared. Responses are deterministic: a fresh session
/// given the same inputs always answers the same way.
#[derive(Debug, Clone)]
pub struct Session {
    rules: Arc<RuleSet>,
    /// One rotation cursor per decomposition in the rule set.
    cursors: Vec<usize>,
    redirect_warned: bool,
}

impl Session {
    /// Start a conversation with the built-in doctor script.
    pub fn doctor() -> Session {
        Session::new(Arc::clone(&DOCTOR))
    }

    /// Start a conversation with an already compiled rule set.
    pub fn new(rules: Arc<RuleSet>) -> Session {
        let cursors = vec![0; rules.decomp_count()];
        Session { rules, cursors, redirect_warned: false }
    }

    /// Parse and compile `text` and start a conversation with it.
    pub fn from_script(text: &str) -> Result<Session, ScriptError> {
        let script = Script::parse(text)?;
        Ok(Session::new(Arc::new(RuleSet::compile(&script)?)))
    }

    /// The rule set this session answers from.
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// True when `input` is one of the script's quit phrases. The caller
    /// decides what to do with that; [`respond`](Session::respond) does not
    /// check it.
    pub fn is_quit(&self, input: &str) -> bool {
        self.rules.is_quit(input)
    }

    /// Produce the response to one input line.
    ///
    /// # Example
    /// ```
    /// use doolittle::Session;
    ///
    /// let mut session = Session::doctor();
    /// let reply = session.respond("I am sad");
    /// assert_eq!(reply.response, "i am sorry to hear that you are sad.");
    /// ```
    pub fn respond(&mut self, input: &str) -> Reply {
        let run = engine::run(&self.rules, &mut self.cursors, input);
        self.warn_on_redirect_limit(&run.trace.outcome);
        Reply { input: input.to_string(), response: run.response, elapsed: run.metrics.total }
    }

    /// Like [`respond`](Session::respond), returning the full turn trace.
    ///
    /// This is useful for script debugging. The plain path does not build the
    /// extra summaries.
    pub fn respond_verbose(&mut self, input: &str) -> ReplyVerbose {
        let run = engine::run(&self.rules, &mut self.cursors, input);
        self.warn_on_redirect_limit(&run.trace.outcome);
        let details = turn_details(&self.rules, &run.trace, &run.metrics);
        ReplyVerbose { input: input.to_string(), response: run.response, elapsed: run.metrics.total, details }
    }

    /// Rewind the conversation: all reassembly rotations start over, as if
    /// the session were freshly created.
    pub fn reset(&mut self) {
        for cursor in &mut self.cursors {
            *cursor = 0;
        }
        self.redirect_warned = false;
    }

    fn warn_on_redirect_limit(&mut self, outcome: &OutcomeTrace) {
        if self.redirect_warned {
            return;
        }
        if let OutcomeTrace::RedirectLimit { keyword } = outcome {
            self.redirect_warned = true;
            eprintln!(
                "warning: rule script loops: redirect chain through '{}' exceeded {} hops; \
                 answering with the fallback rule",
                self.rules.keyword(*keyword).text,
                MAX_REDIRECT_HOPS
            );
        }
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::doctor()
    }
}

/// Result from [`Session::respond`].
#[derive(Debug, Clone)]
pub struct Reply {
    /// The input line as given.
    pub input: String,
    /// The rendered response, always lowercase.
    pub response: String,
    /// Total elapsed time for the turn.
    pub elapsed: Duration,
}

/// Result from [`Session::respond_verbose`].
#[derive(Debug, Clone)]
pub struct ReplyVerbose {
    pub input: String,
    pub response: String,
    pub elapsed: Duration,
    pub details: TurnDetails,
}

/// Everything observed while producing one response.
///
/// This is intentionally compact: it names keywords and patterns as they
/// appear in the script rather than exposing engine internals.
#[derive(Debug, Clone)]
pub struct TurnDetails {
    /// The normalized sentence the matcher saw.
    pub sentence: String,
    /// Keywords found in the sentence, highest weight first.
    pub ranked: Vec<RankedKeyword>,
    /// Every keyword tried, in the order tried, including redirect targets.
    pub attempts: Vec<AttemptSummary>,
    pub outcome: TurnOutcome,
    /// Total elapsed time.
    pub total: Duration,
    /// Time spent normalizing the input.
    pub normalize: Duration,
    /// Time spent matching and reassembling.
    pub search: Duration,
}

#[derive(Debug, Clone)]
pub struct RankedKeyword {
    pub keyword: String,
    pub weight: i32,
}

/// One keyword tried during a turn.
#[derive(Debug, Clone)]
pub struct AttemptSummary {
    pub keyword: String,
    /// Whether the keyword was reached through a `goto`.
    pub via_redirect: bool,
    /// The decomposition pattern that matched, if one did.
    pub pattern: Option<String>,
    /// The synonym group member that matched, when the pattern had a marker.
    pub synonym: Option<String>,
    /// Cleaned captures: post-substituted, whitespace-normalized.
    pub captures: Vec<String>,
    pub selected: Option<SelectionSummary>,
}

/// The reassembly a matched decomposition selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSummary {
    /// A template at `index` in the decomposition's reassembly list.
    Template { index: usize },
    /// A `goto` to another keyword.
    Redirect { target: String },
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A ranked or redirected keyword produced the response.
    Answered { keyword: String },
    /// No keyword answered; the fallback rule did.
    Fallback,
    /// A redirect chain hit the hop ceiling; the fallback rule answered.
    RedirectLimit { keyword: String },
}

fn turn_details(rules: &RuleSet, trace: &TurnTrace, metrics: &TurnMetrics) -> TurnDetails {
    TurnDetails {
        sentence: trace.sentence.clone(),
        ranked: trace
            .ranked
            .iter()
            .map(|&id| RankedKeyword { keyword: rules.keyword(id).text.clone(), weight: rules.keyword(id).weight })
            .collect(),
        attempts: trace.attempts.iter().map(|attempt| attempt_summary(rules, attempt)).collect(),
        outcome: match &trace.outcome {
            OutcomeTrace::Answered { keyword } => {
                TurnOutcome::Answered { keyword: rules.keyword(*keyword).text.clone() }
            }
            OutcomeTrace::Fallback => TurnOutcome::Fallback,
            OutcomeTrace::RedirectLimit { keyword } => {
                TurnOutcome::RedirectLimit { keyword: rules.keyword(*keyword).text.clone() }
            }
        },
        total: metrics.total,
        normalize: metrics.normalize,
        search: metrics.search,
    }
}

fn attempt_summary(rules: &RuleSet, attempt: &AttemptTrace) -> AttemptSummary {
    let (pattern, synonym, captures) = match &attempt.matched {
        Some(m) => (Some(rules.decomp(m.decomp).pattern.clone()), m.synonym.clone(), m.captures.clone()),
        None => (None, None, Vec::new()),
    };
    AttemptSummary {
        keyword: rules.keyword(attempt.keyword).text.clone(),
        via_redirect: attempt.via_redirect,
        pattern,
        synonym,
        captures,
        selected: attempt.selection.as_ref().map(|selection| match selection {
            SelectionTrace::Template { index } => SelectionSummary::Template { index: *index },
            SelectionTrace::Redirect { target } => {
                SelectionSummary::Redirect { target: rules.keyword(*target).text.clone() }
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_greets_a_stated_problem() {
        let mut session = Session::doctor();
        let reply = session.respond("Hello there");
        assert_eq!(reply.input, "Hello there");
        assert_eq!(reply.response, "how do you do. please state your problem.");
    }

    #[test]
    fn empty_input_gets_the_fallback_answer() {
        let mut session = Session::doctor();
        assert_eq!(session.respond("").response, "i am not sure i understand you fully.");
        assert_eq!(session.respond("???").response, "please go on.");
    }

    #[test]
    fn quit_phrases_are_recognized_not_answered() {
        let session = Session::doctor();
        assert!(session.is_quit("bye"));
        assert!(session.is_quit("  Goodbye "));
        assert!(!session.is_quit("say goodbye for me"));
    }

    #[test]
    fn verbose_reply_names_keywords_and_patterns() {
        let mut session = Session::doctor();
        let reply = session.respond_verbose("I am sad");

        assert_eq!(reply.details.sentence, "i am sad");
        assert_eq!(reply.details.outcome, TurnOutcome::Answered { keyword: "i".to_string() });
        assert!(reply.details.ranked.iter().any(|k| k.keyword == "i"));

        let answered = reply.details.attempts.last().unwrap();
        assert_eq!(answered.keyword, "i");
        assert_eq!(answered.synonym.as_deref(), Some("sad"));
        assert_eq!(answered.selected, Some(SelectionSummary::Template { index: 0 }));
        assert_eq!(reply.details.total, reply.elapsed);
    }

    #[test]
    fn redirected_attempts_name_their_own_keyword() {
        let mut session = Session::doctor();
        let reply = session.respond_verbose("Nobody likes me");
        assert_eq!(reply.response, "really, nobody ?");

        let attempts = &reply.details.attempts;
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].keyword, "nobody");
        assert!(!attempts[0].via_redirect);
        assert_eq!(attempts[0].selected, Some(SelectionSummary::Redirect { target: "everyone".to_string() }));
        assert_eq!(attempts[1].keyword, "everyone");
        assert!(attempts[1].via_redirect);
        assert_eq!(attempts[1].pattern.as_deref(), Some("(.* )?@everyone( .*)?"));
        assert_eq!(reply.details.outcome, TurnOutcome::Answered { keyword: "everyone".to_string() });
    }

    #[test]
    fn reset_rewinds_the_rotation() {
        let mut session = Session::doctor();
        let first = session.respond("blah").response;
        let second = session.respond("blah").response;
        assert_ne!(first, second);

        session.reset();
        assert_eq!(session.respond("blah").response, first);
    }

    #[test]
    fn sessions_rotate_independently() {
        let mut a = Session::doctor();
        let _ = a.respond("blah");
        let moved_on = a.respond("blah").response;

        let mut b = Session::new(Arc::clone(a.rules()));
        assert_ne!(b.respond("blah").response, moved_on);
    }

    #[test]
    fn custom_script_sessions_load_or_fail_atomically() {
        let session = Session::from_script("key: none\n decomp: (.*)\n  reasmb: Go on.\n");
        assert!(session.is_ok());

        let err = Session::from_script("key: hello\n").unwrap_err();
        assert!(matches!(err, ScriptError::MissingFallback { .. }));
    }
}
