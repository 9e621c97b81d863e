//! Diagnostic projection of a rule table into a labeled tree.
//!
//! Root, then one node per keyword, one per pattern, and one leaf per
//! response template. External visualization tooling consumes the
//! serialized form; nothing here affects conversational behavior.

use crate::script::RuleTable;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Keyword,
    Pattern,
    Response,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleTree {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RuleTree>,
}

impl RuleTree {
    fn leaf(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind: Some(kind),
            children: Vec::new(),
        }
    }
}

/// Flatten a rule table into a labeled tree, in script order.
///
/// Every response template appears, including the ones past index zero that
/// the selector never picks.
pub fn rule_tree(table: &RuleTable) -> RuleTree {
    let children = table
        .rules()
        .iter()
        .map(|rule| RuleTree {
            name: rule.keyword.clone(),
            kind: Some(NodeKind::Keyword),
            children: rule
                .decompositions
                .iter()
                .map(|decomp| RuleTree {
                    name: decomp.pattern.clone(),
                    kind: Some(NodeKind::Pattern),
                    children: decomp
                        .responses
                        .iter()
                        .map(|r| RuleTree::leaf(r, NodeKind::Response))
                        .collect(),
                })
                .collect(),
        })
        .collect();

    RuleTree {
        name: "ELIZA".to_string(),
        kind: None,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Script;

    #[test]
    fn tree_mirrors_the_table() {
        let script = Script::from_toml(
            r#"
hello = "hi"
[[keywords]]
word = "xnone"
[[keywords.decompositions]]
pattern = "*"
responses = ["Go on.", "I see."]
"#,
        )
        .unwrap();

        let tree = rule_tree(&script.table);
        assert_eq!(tree.name, "ELIZA");
        assert_eq!(tree.kind, None);
        assert_eq!(tree.children.len(), 1);

        let keyword = &tree.children[0];
        assert_eq!(keyword.name, "xnone");
        assert_eq!(keyword.kind, Some(NodeKind::Keyword));

        let pattern = &keyword.children[0];
        assert_eq!(pattern.name, "*");
        assert_eq!(pattern.children.len(), 2);
        assert_eq!(pattern.children[1].name, "I see.");
        assert_eq!(pattern.children[1].kind, Some(NodeKind::Response));
    }

    #[test]
    fn tree_serializes_without_empty_fields() {
        let script = Script::builtin();
        let json = serde_json::to_value(rule_tree(&script.table)).unwrap();
        assert_eq!(json["name"], "ELIZA");
        assert!(json.get("kind").is_none());
        assert_eq!(json["children"][0]["kind"], "keyword");
    }
}
