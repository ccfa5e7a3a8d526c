extern crate self as doolittle;

#[macro_use]
mod macros;
mod api;
mod engine;
mod script;

pub use api::{
    AttemptSummary, DOCTOR_SCRIPT, FAREWELL, GREETING, RankedKeyword, Reply, ReplyVerbose, SelectionSummary, Session,
    TurnDetails, TurnOutcome,
};
pub use engine::RuleSet;
pub use script::{DecompDef, KeywordDef, ReassemblyDef, Script, ScriptError, SynonymGroup};
