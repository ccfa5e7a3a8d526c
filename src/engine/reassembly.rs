//! Reassembly selection and template rendering.
//!
//! Each decomposition owns an ordered list of reassembly rules and, per
//! conversation, a cursor into that list. Selection takes the rule under the
//! cursor and advances it, wrapping at the end, so repeating the same kind of
//! input walks through a rule's phrasings in script order before repeating
//! one. The cursor advances even when the selected rule is a redirect;
//! revisiting the decomposition later continues from the next entry.

use super::rules::{DecompId, Reassembly, RuleSet};

/// Take the reassembly under the decomposition's cursor and advance it.
/// Returns the selected index alongside the rule for trace output.
pub(crate) fn select_reassembly<'a>(
    rules: &'a RuleSet,
    cursors: &mut [usize],
    decomp: DecompId,
) -> (usize, &'a Reassembly) {
    let options = &rules.decomp(decomp).reassemblies;
    let index = cursors[decomp];
    cursors[decomp] = (index + 1) % options.len();
    (index, &options[index])
}

/// Apply `post:` substitutions to a captured segment, word by word. Also
/// normalizes the segment's whitespace; raw captures can carry the spaces
/// that delimit them in the pattern.
pub(crate) fn clean_capture(rules: &RuleSet, raw: &str) -> String {
    raw.split_whitespace().map(|word| rules.post_substitute(word).unwrap_or(word)).collect::<Vec<_>>().join(" ")
}

/// Render a template against cleaned captures and lowercase the result.
///
/// Placeholders `(1)`..`(9)` are recognized anywhere inside a template word,
/// so `(2)?` and `(2).` keep their punctuation attached. A word left empty by
/// an empty capture is dropped rather than leaving a double space.
pub(crate) fn render(template: &str, captures: &[String]) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in template.split_whitespace() {
        let rendered = regex!(r"\((\d)\)").replace_all(word, |caps: &regex::Captures<'_>| {
            let index = caps[1].parse::<usize>().unwrap_or(0);
            match index.checked_sub(1).and_then(|i| captures.get(i)) {
                Some(text) => text.clone(),
                None => caps[0].to_string(),
            }
        });
        if !rendered.is_empty() {
            words.push(rendered.into_owned());
        }
    }
    words.join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Script;

    fn rules(extra: &str) -> RuleSet {
        let text = format!("key: none\n decomp: (.*)\n  reasmb: Go on.\n{extra}");
        RuleSet::compile(&Script::parse(&text).unwrap()).unwrap()
    }

    #[test]
    fn cursor_cycles_through_reassemblies_in_order() {
        let rules = rules("key: a\n decomp: (.*)\n  reasmb: One.\n  reasmb: Two.\n  reasmb: Three.\n");
        let id = rules.keywords_present(&["a".to_string()])[0];
        let decomp = rules.keyword(id).decomps[0];
        let mut cursors = vec![0; rules.decomp_count()];

        let picks: Vec<usize> = (0..5).map(|_| select_reassembly(&rules, &mut cursors, decomp).0).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn placeholders_substitute_inside_words() {
        let captures = vec!["my dreams".to_string()];
        assert_eq!(render("Really, (1)?", &captures), "really, my dreams?");
        assert_eq!(render("Why do you say (1) ?", &captures), "why do you say my dreams ?");
    }

    #[test]
    fn empty_capture_drops_its_word() {
        let captures = vec![String::new()];
        assert_eq!(render("Do you often say (1) ?", &captures), "do you often say ?");
    }

    #[test]
    fn unresolvable_placeholder_stays_literal() {
        assert_eq!(render("Out of range (7) here.", &[]), "out of range (7) here.");
    }

    #[test]
    fn rendered_response_is_lowercased() {
        let captures = vec!["My Father".to_string()];
        assert_eq!(render("Tell me about (1).", &captures), "tell me about my father.");
    }

    #[test]
    fn clean_capture_substitutes_and_trims() {
        let rules = rules("post: my your\npost: me you\n");
        assert_eq!(clean_capture(&rules, " my dog bit me"), "your dog bit you");
        assert_eq!(clean_capture(&rules, ""), "");
    }
}
