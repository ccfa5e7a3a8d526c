//! Rule script parsing.
//!
//! Rule sets are authored as plain text, one directive per line, in the classic
//! `head: payload` format:
//!
//! ```text
//! quit: goodbye                      a phrase that ends the conversation
//! pre: i'm i am                      word -> replacement, applied before matching
//! post: me you                       word -> replacement, applied inside captures
//! synon: sad unhappy depressed       synonym group; the first word is the canonical name
//! key: remember 5                    keyword with an optional integer weight (default 0)
//!   decomp: (.* )?i remember( .*)?   decomposition pattern for the most recent key
//!     reasmb: Do you often think of (2) ?
//!     reasmb: goto dream             a redirect instead of a template
//! ```
//!
//! Blank lines are skipped and lines starting with `#` are comments. Leading
//! whitespace is ignored, so `decomp:`/`reasmb:` lines are conventionally
//! indented under their owners.
//!
//! Parsing is deliberately split from compilation:
//!
//! 1. [`Script::parse`] (this module) checks line-level syntax and produces the
//!    raw [`Script`] structure. Errors carry line numbers.
//! 2. `RuleSet::compile` (in the engine) validates cross-references (redirect
//!    targets, placeholder ranges, the fallback rule) and pre-compiles every
//!    decomposition pattern. Errors carry keyword/pattern context.
//!
//! Both phases report through the same [`ScriptError`] enum so callers have a
//! single load-error surface.

use thiserror::Error;

/// Errors produced while loading a rule script, either by [`Script::parse`]
/// (syntax, with line numbers) or by `RuleSet::compile` (validation, with
/// keyword context). All of them are fatal: a script that loads is fully
/// usable, and the engine never reports errors at response time.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: '{directive}:' is missing its payload")]
    MissingPayload { line: usize, directive: &'static str },

    #[error("line {line}: '{directive}:' expects a word followed by its replacement")]
    BadSubstitution { line: usize, directive: &'static str },

    #[error("line {line}: weight '{value}' is not an integer")]
    BadWeight { line: usize, value: String },

    #[error("line {line}: 'decomp:' before any 'key:'")]
    DecompBeforeKey { line: usize },

    #[error("line {line}: 'reasmb:' before any 'decomp:'")]
    ReassemblyBeforeDecomp { line: usize },

    #[error("line {line}: 'goto' without a target keyword")]
    EmptyRedirect { line: usize },

    #[error("keyword '{keyword}' is defined more than once")]
    DuplicateKeyword { keyword: String },

    #[error("keyword '{keyword}': decomposition '{pattern}' has no reassembly rules")]
    EmptyDecomposition { keyword: String, pattern: String },

    #[error("keyword '{keyword}': goto target '{target}' is not a keyword")]
    UnknownRedirect { keyword: String, target: String },

    #[error("keyword '{keyword}': pattern '{pattern}' does not compile: {source}")]
    BadPattern {
        keyword: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "keyword '{keyword}': template '{template}' references capture ({index}) but pattern '{pattern}' has {captures}"
    )]
    BadPlaceholder { keyword: String, pattern: String, template: String, index: usize, captures: usize },

    #[error("script has no '{fallback}' keyword")]
    MissingFallback { fallback: &'static str },

    #[error("fallback keyword '{fallback}' needs a '(.*)' decomposition whose reassemblies are all templates")]
    MissingCatchAll { fallback: &'static str },
}

/// A parsed rule script, before validation and pattern compilation.
///
/// This is a faithful structural mirror of the text format. Fields are public
/// so rule sets can also be built programmatically; `RuleSet::compile` performs
/// the same validation either way.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Phrases that end a conversation, in authoring order.
    pub quit_phrases: Vec<String>,
    /// Word substitutions applied to the input before matching.
    pub pre: Vec<(String, String)>,
    /// Word substitutions applied inside captured segments.
    pub post: Vec<(String, String)>,
    /// Synonym groups; `members[0]` is the canonical word a `@marker` names.
    pub synonyms: Vec<SynonymGroup>,
    /// Keywords in authoring order.
    pub keywords: Vec<KeywordDef>,
}

#[derive(Debug, Clone)]
pub struct SynonymGroup {
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct KeywordDef {
    pub text: String,
    pub weight: i32,
    pub decompositions: Vec<DecompDef>,
}

#[derive(Debug, Clone)]
pub struct DecompDef {
    pub pattern: String,
    pub reassemblies: Vec<ReassemblyDef>,
}

/// One reassembly rule: either a response template with `(1)`..`(9)`
/// placeholders, or a redirect to another keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyDef {
    Template(String),
    Redirect(String),
}

impl Script {
    /// Parse script text into a [`Script`].
    ///
    /// Only line-level syntax is checked here; see the module docs for the
    /// split between parsing and compilation.
    pub fn parse(text: &str) -> Result<Script, ScriptError> {
        let mut script = Script::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let Some((head, payload)) = content.split_once(':') else {
                return Err(ScriptError::UnknownDirective { line, directive: first_word(content) });
            };
            let head = head.trim();
            let payload = payload.trim();

            match head {
                "quit" => {
                    if payload.is_empty() {
                        return Err(ScriptError::MissingPayload { line, directive: "quit" });
                    }
                    script.quit_phrases.push(payload.to_string());
                }
                "pre" => script.pre.push(split_substitution(line, "pre", payload)?),
                "post" => script.post.push(split_substitution(line, "post", payload)?),
                "synon" => {
                    let members: Vec<String> = payload.split_whitespace().map(str::to_lowercase).collect();
                    if members.is_empty() {
                        return Err(ScriptError::MissingPayload { line, directive: "synon" });
                    }
                    script.synonyms.push(SynonymGroup { members });
                }
                "key" => {
                    let (word, weight) = match payload.split_once(char::is_whitespace) {
                        Some((word, rest)) => {
                            let rest = rest.trim();
                            let weight = rest
                                .parse::<i32>()
                                .map_err(|_| ScriptError::BadWeight { line, value: rest.to_string() })?;
                            (word, weight)
                        }
                        None => (payload, 0),
                    };
                    if word.is_empty() {
                        return Err(ScriptError::MissingPayload { line, directive: "key" });
                    }
                    script.keywords.push(KeywordDef {
                        text: word.to_lowercase(),
                        weight,
                        decompositions: Vec::new(),
                    });
                }
                "decomp" => {
                    if payload.is_empty() {
                        return Err(ScriptError::MissingPayload { line, directive: "decomp" });
                    }
                    let Some(key) = script.keywords.last_mut() else {
                        return Err(ScriptError::DecompBeforeKey { line });
                    };
                    key.decompositions.push(DecompDef { pattern: payload.to_string(), reassemblies: Vec::new() });
                }
                "reasmb" => {
                    if payload.is_empty() {
                        return Err(ScriptError::MissingPayload { line, directive: "reasmb" });
                    }
                    let decomp = script
                        .keywords
                        .last_mut()
                        .and_then(|key| key.decompositions.last_mut())
                        .ok_or(ScriptError::ReassemblyBeforeDecomp { line })?;
                    decomp.reassemblies.push(parse_reassembly(line, payload)?);
                }
                _ => return Err(ScriptError::UnknownDirective { line, directive: head.to_string() }),
            }
        }

        Ok(script)
    }
}

fn first_word(content: &str) -> String {
    content.split_whitespace().next().unwrap_or(content).to_string()
}

fn split_substitution(line: usize, directive: &'static str, payload: &str) -> Result<(String, String), ScriptError> {
    let Some((word, replacement)) = payload.split_once(char::is_whitespace) else {
        return Err(ScriptError::BadSubstitution { line, directive });
    };
    let replacement = replacement.trim();
    if replacement.is_empty() {
        return Err(ScriptError::BadSubstitution { line, directive });
    }
    Ok((word.to_lowercase(), replacement.to_lowercase()))
}

fn parse_reassembly(line: usize, payload: &str) -> Result<ReassemblyDef, ScriptError> {
    // The head word decides template vs redirect, ignoring case: a line like
    // "reasmb: GOTO sorry" must not slip through as literal template text.
    let (head, rest) = payload.split_once(char::is_whitespace).unwrap_or((payload, ""));
    if head.eq_ignore_ascii_case("goto") {
        let target = rest.trim();
        if target.is_empty() {
            return Err(ScriptError::EmptyRedirect { line });
        }
        return Ok(ReassemblyDef::Redirect(target.to_lowercase()));
    }
    Ok(ReassemblyDef::Template(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_directives() {
        let text = "\
# doctor subset
quit: goodbye
quit: good bye

pre: i'm i am
post: me you
synon: sad unhappy depressed

key: none
  decomp: (.*)
    reasmb: Please go on.

key: remember 5
  decomp: (.* )?i remember( .*)?
    reasmb: Do you often think of (2) ?
    reasmb: goto dream
";
        let script = Script::parse(text).unwrap();

        assert_eq!(script.quit_phrases, vec!["goodbye", "good bye"]);
        assert_eq!(script.pre, vec![("i'm".to_string(), "i am".to_string())]);
        assert_eq!(script.post, vec![("me".to_string(), "you".to_string())]);
        assert_eq!(script.synonyms.len(), 1);
        assert_eq!(script.synonyms[0].members, vec!["sad", "unhappy", "depressed"]);

        assert_eq!(script.keywords.len(), 2);
        assert_eq!(script.keywords[0].text, "none");
        assert_eq!(script.keywords[0].weight, 0);
        assert_eq!(script.keywords[1].text, "remember");
        assert_eq!(script.keywords[1].weight, 5);

        let decomp = &script.keywords[1].decompositions[0];
        assert_eq!(decomp.pattern, "(.* )?i remember( .*)?");
        assert_eq!(decomp.reassemblies[0], ReassemblyDef::Template("Do you often think of (2) ?".to_string()));
        assert_eq!(decomp.reassemblies[1], ReassemblyDef::Redirect("dream".to_string()));
    }

    #[test]
    fn keyword_case_is_folded() {
        let script = Script::parse("key: Hello\nsynon: Sad Unhappy\npre: I'M i am\n").unwrap();
        assert_eq!(script.keywords[0].text, "hello");
        assert_eq!(script.synonyms[0].members, vec!["sad", "unhappy"]);
        assert_eq!(script.pre[0], ("i'm".to_string(), "i am".to_string()));
    }

    #[test]
    fn template_containing_goto_midway_is_not_a_redirect() {
        let script = Script::parse("key: a\n decomp: (.*)\n  reasmb: Please goto the point.\n").unwrap();
        let reasmb = &script.keywords[0].decompositions[0].reassemblies[0];
        assert_eq!(*reasmb, ReassemblyDef::Template("Please goto the point.".to_string()));
    }

    #[test]
    fn goto_is_recognized_in_any_case() {
        let script = Script::parse("key: a\n decomp: (.*)\n  reasmb: GOTO SORRY\n  reasmb: Goto was\n").unwrap();
        let reassemblies = &script.keywords[0].decompositions[0].reassemblies;
        assert_eq!(reassemblies[0], ReassemblyDef::Redirect("sorry".to_string()));
        assert_eq!(reassemblies[1], ReassemblyDef::Redirect("was".to_string()));

        let err = Script::parse("key: a\n decomp: (.*)\n  reasmb: GOTO\n").unwrap_err();
        assert!(matches!(err, ScriptError::EmptyRedirect { line: 3 }));
    }

    #[test]
    fn decomp_before_key_is_rejected() {
        let err = Script::parse("decomp: (.*)\n").unwrap_err();
        assert!(matches!(err, ScriptError::DecompBeforeKey { line: 1 }));
    }

    #[test]
    fn reasmb_before_decomp_is_rejected() {
        let err = Script::parse("key: a\nreasmb: hello\n").unwrap_err();
        assert!(matches!(err, ScriptError::ReassemblyBeforeDecomp { line: 2 }));
    }

    #[test]
    fn non_integer_weight_is_rejected() {
        let err = Script::parse("key: name fifteen\n").unwrap_err();
        assert!(matches!(err, ScriptError::BadWeight { line: 1, .. }));
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let err = Script::parse("quip: hello\n").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownDirective { line: 1, .. }));
    }

    #[test]
    fn bare_goto_is_rejected() {
        let err = Script::parse("key: a\n decomp: (.*)\n  reasmb: goto\n").unwrap_err();
        assert!(matches!(err, ScriptError::EmptyRedirect { line: 3 }));
    }

    #[test]
    fn substitution_without_replacement_is_rejected() {
        let err = Script::parse("pre: dont\n").unwrap_err();
        assert!(matches!(err, ScriptError::BadSubstitution { line: 1, directive: "pre" }));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let script = Script::parse("\n# a comment\n\nquit: bye\n").unwrap();
        assert_eq!(script.quit_phrases, vec!["bye"]);
    }
}
