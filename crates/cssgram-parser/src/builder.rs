use crate::node_type::NodeType;
use crate::tree::{ErrorNode, Node, RuleNode, TokenNode};

/// Collects the children of one grammar production.
///
/// The node's range is computed from its children when it is built, and a
/// builder with no children builds nothing.
#[derive(Debug)]
pub(crate) struct NodeBuilder {
    node_type: NodeType,
    children: Vec<Node>,
}

impl NodeBuilder {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn push_opt(&mut self, node: Option<Node>) {
        if let Some(node) = node {
            self.children.push(node);
        }
    }

    /// Pop trailing token leaves accepted by `pred`. Returns the token index of
    /// the earliest popped leaf.
    pub fn pop_trailing(&mut self, pred: impl Fn(&TokenNode) -> bool) -> Option<usize> {
        let mut first = None;
        while let Some(Node::Token(token)) = self.children.last() {
            if !pred(token) {
                break;
            }
            first = Some(token.index);
            self.children.pop();
        }
        first
    }

    pub fn build(self) -> Option<Node> {
        let from = self.children.iter().map(Node::from).min()?;
        let to = self.children.iter().map(Node::to).max()?;

        let node = if self.node_type.is_error() {
            Node::Error(ErrorNode {
                node_type: self.node_type,
                from,
                to,
                children: self.children,
            })
        } else {
            Node::Rule(RuleNode {
                node_type: self.node_type,
                from,
                to,
                children: self.children,
            })
        };
        Some(node)
    }
}

/// Wrap a finished node in a parent of type `node_type` with the same range.
pub(crate) fn wrap(node_type: NodeType, inner: Option<Node>) -> Option<Node> {
    let inner = inner?;
    Some(Node::Rule(RuleNode {
        node_type,
        from: inner.from(),
        to: inner.to(),
        children: vec![inner],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cssgram_lexer::TokenKind;
    use pretty_assertions::assert_eq;

    fn leaf(index: usize, kind: TokenKind, from: usize, to: usize) -> Node {
        Node::Token(TokenNode {
            index,
            kind,
            from,
            to,
        })
    }

    #[test]
    fn test_empty_builder_builds_nothing() {
        assert_eq!(NodeBuilder::new(NodeType::Rule).build(), None);
    }

    #[test]
    fn test_span_from_children() {
        let mut b = NodeBuilder::new(NodeType::Property);
        b.push(leaf(0, TokenKind::Star, 2, 3));
        b.push(leaf(1, TokenKind::Ident, 3, 7));
        let node = b.build().unwrap();
        assert_eq!(node.node_type(), NodeType::Property);
        assert_eq!((node.from(), node.to()), (2, 7));
    }

    #[test]
    fn test_recovery_builds_error_node() {
        let mut b = NodeBuilder::new(NodeType::Recovery);
        b.push(leaf(4, TokenKind::Number, 10, 13));
        assert!(matches!(b.build(), Some(Node::Error(_))));
    }

    #[test]
    fn test_pop_trailing() {
        let mut b = NodeBuilder::new(NodeType::Selector);
        b.push(leaf(0, TokenKind::Ident, 0, 1));
        b.push(leaf(1, TokenKind::Ws, 1, 2));
        b.push(leaf(2, TokenKind::Comment, 2, 7));
        let first = b.pop_trailing(|t| t.kind.is_trivia());
        assert_eq!(first, Some(1));
        let node = b.build().unwrap();
        assert_eq!(node.to(), 1);
    }

    #[test]
    fn test_wrap_keeps_range() {
        let inner = leaf(0, TokenKind::Ident, 5, 9);
        let outer = wrap(NodeType::MediaType, Some(inner)).unwrap();
        assert_eq!((outer.from(), outer.to()), (5, 9));
        assert_eq!(outer.children().len(), 1);
        assert_eq!(wrap(NodeType::MediaType, None), None);
    }
}
