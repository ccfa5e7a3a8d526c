use super::rules::RuleSet;
use super::{MAX_REDIRECT_HOPS, OutcomeTrace, run};
use crate::{Script, Session};

const NONE_BLOCK: &str = "key: none\n decomp: (.*)\n  reasmb: Go on.\n";

fn session(text: &str) -> Session {
    Session::from_script(text).unwrap()
}

fn compiled(text: &str) -> RuleSet {
    RuleSet::compile(&Script::parse(text).unwrap()).unwrap()
}

#[test]
fn doctor_script_classic_conversation() {
    // Array of (expected_response, input_line). The conversation is order
    // sensitive on purpose: repeated visits to one rule must walk through its
    // phrasings, including visits that arrive through a goto.
    let cases: Vec<(&str, &str)> = vec![
        ("in what way ?", "Men are all alike."),
        ("can you think of a specific example ?", "They're always bugging us about something or other."),
        ("your boyfriend made you come here ?", "Well, my boyfriend made me come here."),
        ("i am sorry to hear that you are depressed.", "He says I'm depressed much of the time."),
        ("do you think coming here will help you not to be unhappy ?", "It's true. I am unhappy."),
        (
            "what would it mean to you if you got some help that much seems certain ?",
            "I need some help, that much seems certain.",
        ),
        ("tell me more about your family.", "Perhaps I could learn to get along with my mother."),
        ("who else in your family takes care of you ?", "My mother takes care of me."),
        ("your father ?", "My father."),
        ("what resemblance do you see ?", "You are like my father in some ways."),
    ];

    let mut session = Session::doctor();
    for (expected, input) in cases {
        let reply = session.respond(input);
        assert_eq!(reply.response, expected, "wrong response for input '{input}'");
    }
}

#[test]
fn synonym_keyword_redirects_to_its_group_rule() {
    let mut session = Session::doctor();
    assert_eq!(session.respond("Nobody likes me.").response, "really, nobody ?");
}

#[test]
fn heavier_keywords_are_tried_first() {
    let text = format!(
        "{NONE_BLOCK}key: small 1\n decomp: (.*)\n  reasmb: Small.\n\
         key: big 9\n decomp: (.*)\n  reasmb: Big.\n"
    );
    let mut session = session(&text);
    assert_eq!(session.respond("small plans and big dreams").response, "big.");
    assert_eq!(session.respond("just small plans").response, "small.");
}

#[test]
fn tied_weights_keep_input_appearance_order() {
    let text = format!(
        "{NONE_BLOCK}key: alpha\n decomp: (.*)\n  reasmb: From alpha.\n\
         key: beta\n decomp: (.*)\n  reasmb: From beta.\n"
    );
    let mut session = session(&text);
    assert_eq!(session.respond("beta before alpha").response, "from beta.");
    assert_eq!(session.respond("alpha before beta").response, "from alpha.");
}

#[test]
fn reassemblies_rotate_in_order_and_wrap() {
    let text = format!("{NONE_BLOCK}key: ping\n decomp: (.*)\n  reasmb: One.\n  reasmb: Two.\n  reasmb: Three.\n");
    let mut session = session(&text);

    let responses: Vec<String> = (0..4).map(|_| session.respond("ping").response).collect();
    assert_eq!(responses, vec!["one.", "two.", "three.", "one."]);
}

#[test]
fn synonym_member_is_matched_and_rendered() {
    let text = format!(
        "{NONE_BLOCK}synon: color red green blue\n\
         key: paint\n decomp: (.* )?paint it @color( .*)?\n  reasmb: Why (2) of all colors ?\n"
    );
    let mut session = session(&text);
    assert_eq!(session.respond("paint it blue").response, "why blue of all colors ?");
    assert_eq!(session.respond("PAINT IT RED please").response, "why red of all colors ?");
}

#[test]
fn undefined_synonym_group_falls_through_to_the_fallback() {
    let text = format!("{NONE_BLOCK}key: ghost\n decomp: (.* )?@spirits( .*)?\n  reasmb: Boo.\n");
    let mut session = session(&text);
    assert_eq!(session.respond("a ghost story").response, "go on.");
}

#[test]
fn redirect_target_is_tried_before_remaining_keywords() {
    let text = format!(
        "{NONE_BLOCK}key: alpha 5\n decomp: (.*)\n  reasmb: goto omega\n\
         key: beta 1\n decomp: (.*)\n  reasmb: From beta.\n\
         key: omega\n decomp: (.*)\n  reasmb: From omega.\n"
    );
    let mut session = session(&text);
    // omega never occurs in the input; it is reached through the goto alone.
    assert_eq!(session.respond("alpha and beta").response, "from omega.");
}

#[test]
fn failed_redirect_resumes_with_ranked_keywords() {
    let text = format!(
        "{NONE_BLOCK}key: alpha 5\n decomp: (.*)\n  reasmb: goto narrow\n\
         key: narrow\n decomp: (.* )?xyzzy( .*)?\n  reasmb: Narrow.\n\
         key: beta 1\n decomp: (.*)\n  reasmb: From beta.\n"
    );
    let mut session = session(&text);
    assert_eq!(session.respond("alpha and beta").response, "from beta.");
}

#[test]
fn redirect_cycle_hits_the_hop_ceiling_and_falls_back() {
    let text = format!(
        "{NONE_BLOCK}key: ping\n decomp: (.*)\n  reasmb: goto pong\n\
         key: pong\n decomp: (.*)\n  reasmb: goto ping\n"
    );
    let rules = compiled(&text);
    let mut cursors = vec![0; rules.decomp_count()];

    let turn = run(&rules, &mut cursors, "ping");
    assert!(matches!(turn.trace.outcome, OutcomeTrace::RedirectLimit { .. }));
    assert_eq!(turn.response, "go on.");
    // The chain is abandoned on the redirect past the ceiling, then the
    // fallback rule answers: one attempt per redirect taken, plus one.
    assert_eq!(turn.trace.attempts.len(), MAX_REDIRECT_HOPS + 2);
}

#[test]
fn keywordless_input_rotates_the_fallback_rule() {
    let text = "key: none\n decomp: (.*)\n  reasmb: First.\n  reasmb: Second.\n";
    let mut session = session(text);
    assert_eq!(session.respond("xyzzy plugh").response, "first.");
    assert_eq!(session.respond("xyzzy again").response, "second.");
}

#[test]
fn pre_substitution_feeds_keyword_scan_and_matching() {
    let text = format!(
        "pre: i'm i am\n{NONE_BLOCK}\
         key: i\n decomp: (.* )?i am( .*)?\n  reasmb: Since when are you (2) ?\n"
    );
    let mut session = session(&text);
    // "i" and "am" only exist after the pre substitution splits "i'm".
    assert_eq!(session.respond("I'm tired").response, "since when are you tired ?");
}

#[test]
fn post_substitution_rewrites_captures_but_not_templates() {
    let text = format!(
        "post: me you\npost: my your\n{NONE_BLOCK}\
         key: my\n decomp: (.* )?my (.*)\n  reasmb: Tell me about (2).\n"
    );
    let mut session = session(&text);
    // "me" inside the template survives; "me" inside the capture flips.
    assert_eq!(session.respond("my dog bit me").response, "tell me about dog bit you.");
}

#[test]
fn matching_ignores_case_and_stripped_punctuation() {
    let text = format!("{NONE_BLOCK}key: am\n decomp: (.* )?I AM( .*)?\n  reasmb: Are you really (2) ?\n");
    let mut session = session(&text);
    assert_eq!(session.respond("I... am, OK!!").response, "are you really ok ?");
}

#[test]
fn fresh_sessions_answer_identically() {
    let inputs = ["Men are all alike.", "I am sad", "What does any of this mean?", "My father."];

    let mut a = Session::doctor();
    let mut b = Session::doctor();
    for input in inputs {
        assert_eq!(a.respond(input).response, b.respond(input).response, "diverged on '{input}'");
    }
}
