//! Parse tree nodes.
//!
//! The tree is a strict ownership tree rooted at a `Node::Root`. Token leaves
//! refer back into the token array by index and copy only the kind and
//! offsets. Every node's range is half-open `[from, to)` in source bytes.

use cssgram_lexer::TokenKind;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::node_type::NodeType;

/// A named production with ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNode {
    pub node_type: NodeType,
    pub from: usize,
    pub to: usize,
    pub children: Vec<Node>,
}

/// A leaf wrapping exactly one token of the token array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenNode {
    pub index: usize,
    pub kind: TokenKind,
    pub from: usize,
    pub to: usize,
}

/// A syntax problem marker. `Error` nodes hold the offending token (or are
/// zero-width when nothing was consumed), `Recovery` nodes hold the tokens
/// skipped while resynchronizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub node_type: NodeType,
    pub from: usize,
    pub to: usize,
    pub children: Vec<Node>,
}

impl ErrorNode {
    /// A zero-width error marker at `offset`.
    pub fn marker(offset: usize) -> Self {
        Self {
            node_type: NodeType::Error,
            from: offset,
            to: offset,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Root(RuleNode),
    Rule(RuleNode),
    Token(TokenNode),
    Error(ErrorNode),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Root(_) => NodeType::Root,
            Node::Rule(rule) => rule.node_type,
            Node::Token(_) => NodeType::Token,
            Node::Error(error) => error.node_type,
        }
    }

    pub fn from(&self) -> usize {
        match self {
            Node::Root(rule) | Node::Rule(rule) => rule.from,
            Node::Token(token) => token.from,
            Node::Error(error) => error.from,
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Node::Root(rule) | Node::Rule(rule) => rule.to,
            Node::Token(token) => token.to,
            Node::Error(error) => error.to,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(rule) | Node::Rule(rule) => &rule.children,
            Node::Token(_) => &[],
            Node::Error(error) => &error.children,
        }
    }

    /// The exact source text covered by this node.
    pub fn image<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.from()..self.to()).unwrap_or("")
    }

    pub fn as_token(&self) -> Option<&TokenNode> {
        match self {
            Node::Token(token) => Some(token),
            _ => None,
        }
    }
}

/// A node paired with the source it was parsed from.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    node: &'a Node,
    source: &'a str,
}

impl<'a> NodeRef<'a> {
    pub fn new(node: &'a Node, source: &'a str) -> Self {
        Self { node, source }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn node_type(&self) -> NodeType {
        self.node.node_type()
    }

    pub fn from(&self) -> usize {
        self.node.from()
    }

    pub fn to(&self) -> usize {
        self.node.to()
    }

    /// `source[from..to]`.
    pub fn image(&self) -> &'a str {
        self.node.image(self.source)
    }

    /// The token kind for token leaves.
    pub fn token_kind(&self) -> Option<TokenKind> {
        self.node.as_token().map(|t| t.kind)
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let source = self.source;
        self.node
            .children()
            .iter()
            .map(move |node| NodeRef::new(node, source))
    }

    /// All nodes below this one, in document order.
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack: Vec<&'a Node> = self.node.children().iter().collect();
        stack.reverse();
        Descendants {
            stack,
            source: self.source,
        }
    }

    /// All descendants of the given type, in document order.
    pub fn find_all(&self, node_type: NodeType) -> Vec<NodeRef<'a>> {
        self.descendants()
            .filter(|n| n.node_type() == node_type)
            .collect()
    }

    /// First node matching `path` below this one. Invalid paths match nothing.
    pub fn query(&self, path: &str) -> Option<NodeRef<'a>> {
        crate::query::query(*self, path).ok().flatten()
    }

    /// Indented text rendering of the subtree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match self.node {
            Node::Token(token) => {
                out.push_str(&format!(
                    "{:?} [{}, {}) {:?}\n",
                    token.kind,
                    token.from,
                    token.to,
                    self.image()
                ));
            }
            _ => {
                out.push_str(&format!(
                    "{} [{}, {})\n",
                    self.node_type(),
                    self.from(),
                    self.to()
                ));
            }
        }
        for child in self.children() {
            child.dump_into(out, depth + 1);
        }
    }
}

/// Pre-order iterator over the nodes below a [`NodeRef`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
    source: &'a str,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(NodeRef::new(node, self.source))
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.node {
            Node::Token(token) => {
                let mut state = serializer.serialize_struct("Token", 5)?;
                state.serialize_field("type", &NodeType::Token)?;
                state.serialize_field("kind", &token.kind)?;
                state.serialize_field("from", &token.from)?;
                state.serialize_field("to", &token.to)?;
                state.serialize_field("text", self.image())?;
                state.end()
            }
            _ => {
                let children: Vec<NodeRef<'_>> = self.children().collect();
                let mut state = serializer.serialize_struct("Node", 4)?;
                state.serialize_field("type", &self.node_type())?;
                state.serialize_field("from", &self.from())?;
                state.serialize_field("to", &self.to())?;
                state.serialize_field("children", &children)?;
                state.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(index: usize, kind: TokenKind, from: usize, to: usize) -> Node {
        Node::Token(TokenNode {
            index,
            kind,
            from,
            to,
        })
    }

    fn sample() -> Node {
        // "a b"
        Node::Root(RuleNode {
            node_type: NodeType::Root,
            from: 0,
            to: 3,
            children: vec![
                Node::Rule(RuleNode {
                    node_type: NodeType::ElementName,
                    from: 0,
                    to: 1,
                    children: vec![token(0, TokenKind::Ident, 0, 1)],
                }),
                token(1, TokenKind::Ws, 1, 2),
                Node::Error(ErrorNode {
                    node_type: NodeType::Error,
                    from: 2,
                    to: 3,
                    children: vec![token(2, TokenKind::Ident, 2, 3)],
                }),
            ],
        })
    }

    #[test]
    fn test_node_accessors() {
        let root = sample();
        assert_eq!(root.node_type(), NodeType::Root);
        assert_eq!((root.from(), root.to()), (0, 3));
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.children()[2].node_type(), NodeType::Error);
        assert_eq!(root.children()[1].image("a b"), " ");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = sample();
        let view = NodeRef::new(&root, "a b");
        let types: Vec<NodeType> = view.descendants().map(|n| n.node_type()).collect();
        assert_eq!(
            types,
            vec![
                NodeType::ElementName,
                NodeType::Token,
                NodeType::Token,
                NodeType::Error,
                NodeType::Token,
            ]
        );
    }

    #[test]
    fn test_find_all() {
        let root = sample();
        let view = NodeRef::new(&root, "a b");
        let tokens = view.find_all(NodeType::Token);
        let images: Vec<&str> = tokens.iter().map(|t| t.image()).collect();
        assert_eq!(images, vec!["a", " ", "b"]);
    }

    #[test]
    fn test_zero_width_marker() {
        let marker = Node::Error(ErrorNode::marker(7));
        assert_eq!((marker.from(), marker.to()), (7, 7));
        assert_eq!(marker.image("0123456789"), "");
        assert!(marker.children().is_empty());
    }

    #[test]
    fn test_dump() {
        let root = sample();
        let dump = NodeRef::new(&root, "a b").dump();
        assert_eq!(
            dump,
            "root [0, 3)\n  elementName [0, 1)\n    Ident [0, 1) \"a\"\n  Ws [1, 2) \" \"\n  error [2, 3)\n    Ident [2, 3) \"b\"\n"
        );
    }
}
