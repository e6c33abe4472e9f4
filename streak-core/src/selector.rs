//! Node selectors: `#id`, `.name` and type names, comma-separated.

use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Id(String),
    Name(String),
    Type(String),
}

/// A parsed selector: a node matches when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    terms: Vec<Term>,
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

impl Selector {
    /// Parse a selector. Returns `None` when any alternative is malformed.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let terms = input
            .split(',')
            .map(|part| {
                let part = part.trim();
                if let Some(id) = part.strip_prefix('#') {
                    is_ident(id).then(|| Term::Id(id.to_string()))
                } else if let Some(name) = part.strip_prefix('.') {
                    is_ident(name).then(|| Term::Name(name.to_string()))
                } else if part.starts_with(|c: char| c.is_ascii_alphabetic()) && is_ident(part) {
                    Some(Term::Type(part.to_string()))
                } else {
                    None
                }
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { terms })
    }

    /// True if the node matches any alternative.
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        self.terms.iter().any(|term| match term {
            Term::Id(id) => node.attrs().id.as_deref() == Some(id.as_str()),
            Term::Name(name) => node.attrs().has_name(name),
            Term::Type(ty) => node.node_type().as_str() == ty || node.class_name() == ty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alternatives() {
        let sel = Selector::parse("#a, .b,Circle").expect("valid");
        assert_eq!(
            sel.terms,
            vec![
                Term::Id("a".into()),
                Term::Name("b".into()),
                Term::Type("Circle".into())
            ]
        );
    }

    #[test]
    fn test_malformed_selectors() {
        for bad in ["", "#", ".", "a b", "#a,", "1abc", "#a b", ">Circle"] {
            assert!(Selector::parse(bad).is_none(), "{bad:?} should not parse");
        }
    }
}
