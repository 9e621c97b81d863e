//! # elizette
//!
//! The classic ELIZA pattern-matching and substitution engine: a tokenizer,
//! a greedy backtracking wildcard matcher, rank-and-specificity rule
//! selection with a guaranteed fallback, and template substitution.
//!
//! The whole pipeline is synchronous, stateless, and in-process. A validated
//! [`RuleTable`] goes in, one reply string comes out:
//!
//! ```
//! use elizette::Script;
//!
//! let script = Script::builtin();
//! let reply = script.table.reply("I am very sad today");
//! assert!(!reply.is_empty());
//! ```
//!
//! Rule tables load from TOML ([`Script::from_toml`] / [`Script::from_path`])
//! or are built programmatically ([`RuleTable::new`]); both validate eagerly
//! so configuration errors surface at load time, never mid-conversation.
//! [`tree::rule_tree`] projects a table into a labeled tree for external
//! visualization tooling.

pub mod chat;
pub mod engine;
pub mod script;
pub mod tree;

pub use engine::{MatchResult, SelectedMatch, match_pattern, reply, select_best_match, substitute, tokenize};
pub use script::{Decomposition, KeywordRule, RuleTable, Script, ScriptError};
pub use tree::{NodeKind, RuleTree, rule_tree};
