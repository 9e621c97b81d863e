//! The ELIZA matching engine.
//!
//! Four pieces, evaluated top-down: tokenizer, backtracking pattern matcher,
//! rank-ordered rule selector, and template substitution. Everything here is
//! a pure function of its inputs; the rule table is threaded through
//! explicitly and never mutated, so concurrent turns against a shared table
//! are safe without locking.

use crate::script::{FALLBACK_KEYWORD, KeywordRule, RuleTable};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// =============================================================================
// Tokenizer
// =============================================================================

/// Normalize free-form text into lowercase word tokens.
///
/// Everything outside `[a-z0-9']` collapses to whitespace; apostrophes
/// survive so contractions stay one token. The result may be empty.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Pattern Matcher
// =============================================================================

/// A decomposition pattern element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatToken {
    /// Match this exact word.
    Literal(String),
    /// `*`: match zero or more words, captured positionally.
    Star,
    /// `?*name`: match zero or more words, captured under `name`.
    Var(String),
}

impl PatToken {
    fn parse(tok: &str) -> Self {
        if tok == "*" {
            return PatToken::Star;
        }
        if let Some(name) = tok.strip_prefix("?*") {
            if !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return PatToken::Var(name.to_string());
            }
        }
        PatToken::Literal(tok.to_string())
    }
}

fn parse_pattern(pattern: &str) -> Vec<PatToken> {
    pattern.split_whitespace().map(PatToken::parse).collect()
}

/// Number of literal words in a pattern; the selector's specificity score.
fn literal_count(tokens: &[PatToken]) -> usize {
    tokens
        .iter()
        .filter(|t| matches!(t, PatToken::Literal(_)))
        .count()
}

/// Captures produced by a successful match attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Named-variable captures, words joined by single spaces.
    pub bindings: HashMap<String, String>,
    /// One entry per `*` in the pattern, in left-to-right pattern order.
    pub star_groups: Vec<String>,
}

/// Cap on recursion steps per top-level match attempt. Backtracking is
/// exponential in the wildcard count for adversarial patterns; exhausting
/// the budget reports NO_MATCH for that attempt instead of hanging.
const STEP_BUDGET: usize = 1 << 20;

struct Matcher<'a> {
    input: &'a [String],
    bindings: HashMap<String, String>,
    star_groups: Vec<String>,
    steps_left: usize,
}

impl Matcher<'_> {
    fn try_match(&mut self, pattern: &[PatToken], input_idx: usize) -> bool {
        if self.steps_left == 0 {
            return false;
        }
        self.steps_left -= 1;

        let Some((tok, rest)) = pattern.split_first() else {
            return input_idx == self.input.len();
        };

        match tok {
            PatToken::Literal(word) => {
                self.input.get(input_idx).is_some_and(|w| w == word)
                    && self.try_match(rest, input_idx + 1)
            }
            // Greedy: prefer the longest capture, yield words back on failure.
            PatToken::Star => {
                for len in (0..=self.input.len() - input_idx).rev() {
                    self.star_groups
                        .push(self.input[input_idx..input_idx + len].join(" "));
                    if self.try_match(rest, input_idx + len) {
                        return true;
                    }
                    self.star_groups.pop();
                }
                false
            }
            PatToken::Var(name) => {
                for len in (0..=self.input.len() - input_idx).rev() {
                    self.bindings.insert(
                        name.clone(),
                        self.input[input_idx..input_idx + len].join(" "),
                    );
                    if self.try_match(rest, input_idx + len) {
                        return true;
                    }
                }
                self.bindings.remove(name);
                false
            }
        }
    }
}

/// Match one decomposition pattern against the whole token sequence.
///
/// `None` is the normal no-match outcome, not an error. A zero-token
/// pattern matches only a zero-length input; consecutive wildcards fall out
/// of the backtracking search without special-casing.
pub fn match_pattern(pattern: &str, input_tokens: &[String]) -> Option<MatchResult> {
    let pat_tokens = parse_pattern(pattern);
    let mut matcher = Matcher {
        input: input_tokens,
        bindings: HashMap::new(),
        star_groups: Vec::new(),
        steps_left: STEP_BUDGET,
    };
    if matcher.try_match(&pat_tokens, 0) {
        Some(MatchResult {
            bindings: matcher.bindings,
            star_groups: matcher.star_groups,
        })
    } else {
        None
    }
}

// =============================================================================
// Rule Selector
// =============================================================================

/// The winning (keyword, pattern, response) triple plus its captures.
#[derive(Debug, Clone)]
pub struct SelectedMatch<'a> {
    pub keyword: &'a str,
    pub pattern: &'a str,
    pub response: &'a str,
    pub bindings: HashMap<String, String>,
    pub star_groups: Vec<String>,
}

/// Find the best-matching rule for an utterance.
///
/// Rules are scanned in rank order (descending, stable for equal ranks) and
/// a rule is a candidate only when its keyword appears verbatim among the
/// input tokens. Every decomposition of every candidate is tried; the match
/// with the strictly highest literal count wins, ties keeping the first
/// found. Always returns: inputs matching nothing fall back to the `xnone`
/// rule's first response with empty captures.
pub fn select_best_match<'a>(input_text: &str, table: &'a RuleTable) -> SelectedMatch<'a> {
    let input_tokens = tokenize(input_text);

    let mut sorted: Vec<&KeywordRule> = table.rules().iter().collect();
    sorted.sort_by(|a, b| b.rank.cmp(&a.rank));

    let mut best: Option<SelectedMatch<'a>> = None;
    let mut best_score: i64 = -1;

    for rule in &sorted {
        if !input_tokens.iter().any(|t| *t == rule.keyword) {
            continue;
        }
        for decomp in &rule.decompositions {
            let Some(result) = match_pattern(&decomp.pattern, &input_tokens) else {
                continue;
            };
            let score = literal_count(&parse_pattern(&decomp.pattern)) as i64;
            tracing::debug!(
                keyword = %rule.keyword,
                pattern = %decomp.pattern,
                score,
                "decomposition matched"
            );
            if score > best_score {
                best = Some(SelectedMatch {
                    keyword: &rule.keyword,
                    pattern: &decomp.pattern,
                    response: &decomp.responses[0],
                    bindings: result.bindings,
                    star_groups: result.star_groups,
                });
                best_score = score;
            }
        }
    }

    if let Some(selected) = best {
        tracing::debug!(keyword = %selected.keyword, pattern = %selected.pattern, "selected");
        return selected;
    }

    // RuleTable construction guarantees the fallback exists.
    let fallback = sorted
        .iter()
        .find(|r| r.keyword == FALLBACK_KEYWORD)
        .expect("validated rule table contains a fallback rule");
    let decomp = &fallback.decompositions[0];
    tracing::debug!("no keyword matched, using fallback");
    SelectedMatch {
        keyword: &fallback.keyword,
        pattern: &decomp.pattern,
        response: &decomp.responses[0],
        bindings: HashMap::new(),
        star_groups: Vec::new(),
    }
}

// =============================================================================
// Response Synthesizer
// =============================================================================

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?([a-zA-Z]\w*)").expect("variable regex compiles"));
static GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("group regex compiles"));

/// Fill a response template from the matcher's captures.
///
/// `?name` becomes its binding when one exists and is non-empty; `(n)`
/// becomes the n-th (1-indexed) star group when in range. Unresolved
/// placeholders pass through verbatim. That leniency is deliberate.
pub fn substitute(
    template: &str,
    bindings: &HashMap<String, String>,
    star_groups: &[String],
) -> String {
    let vars_done = VAR_RE.replace_all(template, |caps: &regex::Captures| {
        match bindings.get(&caps[1]) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => caps[0].to_string(),
        }
    });
    GROUP_RE
        .replace_all(&vars_done, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| star_groups.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// =============================================================================
// Conversation Entry Point
// =============================================================================

/// One conversational turn: tokenize, select, substitute.
///
/// Stateless; no history is kept between turns.
pub fn reply(input: &str, table: &RuleTable) -> String {
    let selected = select_best_match(input, table);
    substitute(selected.response, &selected.bindings, &selected.star_groups)
}

impl RuleTable {
    /// Convenience form of [`reply`].
    pub fn reply(&self, input: &str) -> String {
        reply(input, self)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Decomposition, Script};
    use expect_test::expect;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn rule(keyword: &str, rank: i32, decomps: &[(&str, &str)]) -> KeywordRule {
        KeywordRule {
            keyword: keyword.to_string(),
            rank,
            decompositions: decomps
                .iter()
                .map(|(pattern, response)| Decomposition {
                    pattern: pattern.to_string(),
                    responses: vec![response.to_string()],
                })
                .collect(),
        }
    }

    fn table(rules: Vec<KeywordRule>) -> RuleTable {
        RuleTable::new(rules).expect("test table is valid")
    }

    #[test]
    fn tokenize_strips_punctuation_and_lowercases() {
        assert_eq!(tokenize("I'm SAD!! really."), toks(&["i'm", "sad", "really"]));
    }

    #[test]
    fn tokenize_empty_and_degenerate() {
        assert_eq!(tokenize(""), Vec::<String>::new());
        assert_eq!(tokenize("!!! ... ???"), Vec::<String>::new());
        assert_eq!(tokenize("  spaced   out  "), toks(&["spaced", "out"]));
    }

    #[test]
    fn tokenize_is_idempotent() {
        for text in ["I'm SAD!! really.", "Hello, world!", "a  b\tc\nd", "don't CAFE 123"] {
            let once = tokenize(text);
            let twice = tokenize(&once.join(" "));
            assert_eq!(once, twice, "re-tokenizing changed: {text:?}");
        }
    }

    #[test]
    fn wildcards_are_greedy() {
        let input = toks(&["i", "am", "very", "hungry", "today"]);
        let result = match_pattern("* hungry *", &input).unwrap();
        assert_eq!(result.star_groups, vec!["i am very", "today"]);
        assert!(result.bindings.is_empty());
    }

    #[test]
    fn named_variable_captures() {
        let input = toks(&["i", "am", "very", "sad"]);
        let result = match_pattern("i am ?*feeling", &input).unwrap();
        assert_eq!(result.bindings.get("feeling").unwrap(), "very sad");
        assert!(result.star_groups.is_empty());
    }

    #[test]
    fn literal_mismatch_is_no_match() {
        assert!(match_pattern("hello *", &toks(&["goodbye", "world"])).is_none());
    }

    #[test]
    fn empty_pattern_matches_only_empty_input() {
        assert!(match_pattern("", &[]).is_some());
        assert!(match_pattern("", &toks(&["word"])).is_none());
        assert!(match_pattern("*", &[]).is_some());
    }

    #[test]
    fn wildcard_can_capture_nothing() {
        let result = match_pattern("* hungry", &toks(&["hungry"])).unwrap();
        assert_eq!(result.star_groups, vec![""]);
    }

    #[test]
    fn consecutive_wildcards_split_the_input() {
        // The first star is greedy, the second yields everything back.
        let result = match_pattern("* *", &toks(&["a", "b", "c"])).unwrap();
        assert_eq!(result.star_groups, vec!["a b c", ""]);
    }

    #[test]
    fn backtracking_yields_words_to_later_literals() {
        let input = toks(&["the", "cat", "sat", "on", "the", "mat"]);
        let result = match_pattern("* the *", &input).unwrap();
        // Greedy first star takes through the second "the".
        assert_eq!(result.star_groups, vec!["the cat sat on", "mat"]);
    }

    #[test]
    fn repeated_variable_name_keeps_last_capture() {
        let input = toks(&["a", "x", "b", "x", "c"]);
        let result = match_pattern("?*v x ?*v x c", &input).unwrap();
        assert_eq!(result.bindings.get("v").unwrap(), "b");
    }

    #[test]
    fn selector_prefers_more_literals() {
        let t = table(vec![
            rule("xnone", 0, &[("*", "Please tell me more.")]),
            rule(
                "today",
                1,
                &[
                    ("* i am *", "two literals"),
                    ("* i feel * today", "three literals"),
                ],
            ),
            rule("i", 1, &[("* i am *", "also two literals")]),
        ]);
        let selected = select_best_match("i am sure i feel great today", &t);
        assert_eq!(selected.response, "three literals");
    }

    #[test]
    fn selector_keeps_first_on_equal_score() {
        let t = table(vec![
            rule("xnone", 0, &[("*", "fallback")]),
            rule(
                "am",
                1,
                &[("i am * today", "first seen"), ("i am * today *", "second seen")],
            ),
        ]);
        let selected = select_best_match("i am happy today", &t);
        assert_eq!(selected.response, "first seen");
    }

    #[test]
    fn selector_orders_by_rank() {
        let t = table(vec![
            rule("xnone", 0, &[("*", "fallback")]),
            rule("cat", 1, &[("*", "cat wins")]),
            rule("dog", 9, &[("*", "dog wins")]),
        ]);
        // Equal specificity, so the higher-ranked rule is seen first and a
        // later equal score cannot displace it.
        let selected = select_best_match("my dog chased my cat", &t);
        assert_eq!(selected.response, "dog wins");
        assert_eq!(selected.keyword, "dog");
    }

    #[test]
    fn keyword_must_appear_in_tokens() {
        let t = table(vec![
            rule("xnone", 0, &[("*", "fallback")]),
            rule("hungry", 5, &[("*", "matched hungry")]),
        ]);
        // "hungriness" contains the keyword as a substring but not a token.
        let selected = select_best_match("my hungriness is intense", &t);
        assert_eq!(selected.keyword, "xnone");
    }

    #[test]
    fn fallback_has_empty_captures() {
        let t = table(vec![
            rule("xnone", 0, &[("* ?*x", "Please tell me more.")]),
            rule("sad", 5, &[("* sad *", "so sad")]),
        ]);
        let selected = select_best_match("nothing configured here", &t);
        assert_eq!(selected.keyword, "xnone");
        assert_eq!(selected.response, "Please tell me more.");
        assert!(selected.bindings.is_empty());
        assert!(selected.star_groups.is_empty());
    }

    #[test]
    fn empty_input_falls_back() {
        let t = table(vec![rule("xnone", 0, &[("*", "Go on.")])]);
        assert_eq!(t.reply(""), "Go on.");
        assert_eq!(t.reply("?!?!"), "Go on.");
    }

    #[test]
    fn substitute_fills_vars_and_groups() {
        let bindings = HashMap::from([("topic".to_string(), "cats".to_string())]);
        let groups = vec!["loudly".to_string()];
        assert_eq!(
            substitute("you said ?topic and (1)", &bindings, &groups),
            "you said cats and loudly"
        );
    }

    #[test]
    fn substitute_passes_unresolved_through() {
        let empty = HashMap::new();
        assert_eq!(substitute("what about ?nothing", &empty, &[]), "what about ?nothing");
        assert_eq!(substitute("group (3) missing", &empty, &[]), "group (3) missing");
        assert_eq!(substitute("zero (0) stays", &empty, &["x".to_string()]), "zero (0) stays");
    }

    #[test]
    fn substitute_skips_empty_bindings() {
        let bindings = HashMap::from([("x".to_string(), String::new())]);
        assert_eq!(substitute("got ?x", &bindings, &[]), "got ?x");
    }

    #[test]
    fn substitute_handles_multiple_groups() {
        let groups = vec!["a".to_string(), "b".to_string()];
        assert_eq!(substitute("(2) then (1) then (2)", &HashMap::new(), &groups), "b then a then b");
    }

    #[test]
    fn end_to_end_scenario() {
        let t = table(vec![
            rule("sad", 5, &[("* sad *", "I am sorry you feel (1) sad (2)")]),
            rule("xnone", 0, &[("*", "Please tell me more.")]),
        ]);

        expect!["I am sorry you feel i am very sad today"]
            .assert_eq(&t.reply("I am very sad today"));
        expect!["Please tell me more."].assert_eq(&t.reply("Hello there"));
    }

    #[test]
    fn builtin_script_conversation() {
        let script = Script::builtin();
        let t = &script.table;

        // "my" scores one literal against "computer"'s bare wildcard, so the
        // scan across ranks still prefers the more specific pattern.
        expect!["Tell me more about your computer broke again."]
            .assert_eq(&t.reply("My computer broke again!"));
        expect!["Do computers worry you?"].assert_eq(&t.reply("it is a computer"));
        expect!["How long have you been very sad?"].assert_eq(&t.reply("I am very sad"));
        expect!["Tell me more about your job."].assert_eq(&t.reply("I hate my job"));
        expect!["Please tell me more."].assert_eq(&t.reply("qwerty asdf"));
    }
}
