//! Rule table loading and validation.
//!
//! A script is a TOML document holding a greeting plus an ordered list of
//! keyword rules. The table is parsed and validated once, up front, and is
//! immutable afterwards; the matching engine in [`crate::engine`] only ever
//! borrows it.

use serde::Deserialize;
use std::path::Path;

/// The keyword of the mandatory catch-all rule.
pub const FALLBACK_KEYWORD: &str = "xnone";

// =============================================================================
// Data Structures
// =============================================================================

/// One (pattern, response templates) pair under a keyword.
///
/// The pattern is a whitespace-separated sequence of literal words, `*`
/// wildcards, and `?*name` variables. Responses are templates that may
/// reference captured text with `(n)` and `?name`.
#[derive(Debug, Clone, Deserialize)]
pub struct Decomposition {
    pub pattern: String,
    pub responses: Vec<String>,
}

/// A trigger word plus its ranked decompositions.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    #[serde(rename = "word")]
    pub keyword: String,
    #[serde(default)]
    pub rank: i32,
    pub decompositions: Vec<Decomposition>,
}

/// An ordered, validated set of keyword rules.
///
/// Construction goes through [`RuleTable::new`], which enforces the
/// invariants the selector relies on: an `xnone` fallback rule exists, and
/// every decomposition has at least one response. Rules are private so a
/// table in hand is always a valid one.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<KeywordRule>,
}

/// The complete script: greeting plus rule table.
#[derive(Debug, Clone)]
pub struct Script {
    pub hello: String,
    pub table: RuleTable,
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors surfaced at load time, never mid-conversation.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to parse script TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read script file: {0}")]
    Io(#[from] std::io::Error),

    #[error("rule table has no `{FALLBACK_KEYWORD}` fallback rule")]
    MissingFallback,

    #[error("keyword rule `{keyword}` has no decompositions")]
    EmptyRule { keyword: String },

    #[error("keyword rule `{keyword}`, pattern `{pattern}` has no responses")]
    EmptyResponses { keyword: String, pattern: String },
}

// =============================================================================
// TOML Schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct TomlScript {
    hello: String,
    #[serde(default)]
    keywords: Vec<KeywordRule>,
}

// =============================================================================
// Construction
// =============================================================================

impl RuleTable {
    /// Validate and wrap an ordered sequence of keyword rules.
    pub fn new(rules: Vec<KeywordRule>) -> Result<Self, ScriptError> {
        if !rules.iter().any(|r| r.keyword == FALLBACK_KEYWORD) {
            return Err(ScriptError::MissingFallback);
        }
        for rule in &rules {
            if rule.decompositions.is_empty() {
                return Err(ScriptError::EmptyRule {
                    keyword: rule.keyword.clone(),
                });
            }
            for decomp in &rule.decompositions {
                if decomp.responses.is_empty() {
                    return Err(ScriptError::EmptyResponses {
                        keyword: rule.keyword.clone(),
                        pattern: decomp.pattern.clone(),
                    });
                }
            }
        }
        Ok(Self { rules })
    }

    /// The rules, in their original script order.
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Script {
    /// Parse and validate a script from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, ScriptError> {
        let toml_script: TomlScript = toml::from_str(toml_str)?;
        Ok(Self {
            hello: toml_script.hello,
            table: RuleTable::new(toml_script.keywords)?,
        })
    }

    /// Load a script from a TOML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// The built-in DOCTOR script.
    pub fn builtin() -> Self {
        Self::from_toml(DOCTOR_SCRIPT).expect("built-in script parses and validates")
    }
}

// =============================================================================
// Built-in DOCTOR Script
// =============================================================================

const DOCTOR_SCRIPT: &str = r#"
hello = "How do you do. Please tell me your problem."

# Fallback, used when no keyword appears in the input.
[[keywords]]
word = "xnone"
rank = 0
[[keywords.decompositions]]
pattern = "*"
responses = [
    "Please tell me more.",
    "Let's change focus a bit. Tell me about your family.",
    "Can you elaborate on that?",
    "I see.",
]

[[keywords]]
word = "hello"
rank = 0
[[keywords.decompositions]]
pattern = "*"
responses = ["How do you do. Please state your problem."]

[[keywords]]
word = "computer"
rank = 50
[[keywords.decompositions]]
pattern = "*"
responses = [
    "Do computers worry you?",
    "Why do you mention computers?",
    "What do you think machines have to do with your problem?",
]

[[keywords]]
word = "name"
rank = 15
[[keywords.decompositions]]
pattern = "*"
responses = ["I am not interested in names."]

[[keywords]]
word = "sorry"
rank = 0
[[keywords.decompositions]]
pattern = "*"
responses = [
    "Please don't apologize.",
    "Apologies are not necessary.",
]

[[keywords]]
word = "remember"
rank = 5
[[keywords.decompositions]]
pattern = "* i remember *"
responses = [
    "Do you often think of (2)?",
    "What else do you recollect?",
]
[[keywords.decompositions]]
pattern = "* do you remember *"
responses = ["Did you think I would forget (2)?"]
[[keywords.decompositions]]
pattern = "*"
responses = ["What are you trying to remember?"]

[[keywords]]
word = "dream"
rank = 3
[[keywords.decompositions]]
pattern = "* i dream *"
responses = ["Have you ever fantasized (2) while you were awake?"]
[[keywords.decompositions]]
pattern = "*"
responses = ["What does that dream suggest to you?"]

[[keywords]]
word = "sad"
rank = 5
[[keywords.decompositions]]
pattern = "* sad *"
responses = [
    "I am sorry to hear that you are sad.",
    "Do you think coming here will help you not to be sad?",
]

[[keywords]]
word = "happy"
rank = 5
[[keywords.decompositions]]
pattern = "* happy *"
responses = [
    "How have I helped you to be happy?",
    "What makes you happy just now?",
]

[[keywords]]
word = "am"
rank = 0
[[keywords.decompositions]]
pattern = "* am i *"
responses = [
    "Do you believe you are (2)?",
    "Would you want to be (2)?",
]
[[keywords.decompositions]]
pattern = "*"
responses = ["Why do you say 'am'?"]

[[keywords]]
word = "i"
rank = 0
[[keywords.decompositions]]
pattern = "* i am ?*feeling"
responses = [
    "How long have you been ?feeling?",
    "Do you believe it is normal to be ?feeling?",
    "Do you enjoy being ?feeling?",
]
[[keywords.decompositions]]
pattern = "* i want ?*thing"
responses = [
    "What would it mean to you if you got ?thing?",
    "Why do you want ?thing?",
]
[[keywords.decompositions]]
pattern = "* i feel *"
responses = [
    "Tell me more about such feelings.",
    "Do you often feel (2)?",
]
[[keywords.decompositions]]
pattern = "* i can't *"
responses = ["How do you know that you can't (2)?"]

[[keywords]]
word = "my"
rank = 2
[[keywords.decompositions]]
pattern = "* my ?*thing"
responses = [
    "Tell me more about your ?thing.",
    "Why do you say your ?thing?",
]

[[keywords]]
word = "you"
rank = 0
[[keywords.decompositions]]
pattern = "* you are *"
responses = [
    "What makes you think I am (2)?",
    "Does it please you to believe I am (2)?",
]
[[keywords.decompositions]]
pattern = "* you * me *"
responses = ["Why do you think I (2) you?"]
[[keywords.decompositions]]
pattern = "*"
responses = ["We were discussing you, not me."]

[[keywords]]
word = "yes"
rank = 0
[[keywords.decompositions]]
pattern = "*"
responses = ["You seem to be quite positive.", "I see."]

[[keywords]]
word = "no"
rank = 0
[[keywords.decompositions]]
pattern = "*"
responses = ["Are you saying no just to be negative?", "Why not?"]

[[keywords]]
word = "why"
rank = 0
[[keywords.decompositions]]
pattern = "* why don't you *"
responses = ["Do you believe I don't (2)?"]
[[keywords.decompositions]]
pattern = "* why can't i *"
responses = ["Do you think you should be able to (2)?"]
[[keywords.decompositions]]
pattern = "*"
responses = ["Why do you ask?"]

[[keywords]]
word = "because"
rank = 0
[[keywords.decompositions]]
pattern = "*"
responses = [
    "Is that the real reason?",
    "Don't any other reasons come to mind?",
]

[[keywords]]
word = "always"
rank = 1
[[keywords.decompositions]]
pattern = "*"
responses = ["Can you think of a specific example?", "When?"]

[[keywords]]
word = "alike"
rank = 10
[[keywords.decompositions]]
pattern = "*"
responses = ["In what way?", "What resemblance do you see?"]
"#;

// =============================================================================
// Tests
// =============================================================================
