//! Structural path queries over the parse tree.
//!
//! A path is a `/`-separated list of steps. Each step is a node type name
//! (`declaration`) or the text of a token leaf (`color`), optionally followed
//! by `|N` to select the N-th matching sibling (zero based):
//!
//! ```text
//! rule/declarations/declaration|1/propertyDeclaration/property/background
//! ```
//!
//! The first step may match below any node of the searched subtree, so paths
//! do not have to start at the root.

use crate::tree::{Node, NodeRef};
use crate::QueryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPath {
    steps: Vec<Step>,
}

impl QueryPath {
    pub fn parse(path: &str) -> Result<Self, QueryError> {
        let mut steps = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let (name, index) = match segment.split_once('|') {
                Some((name, index)) => {
                    let index = index.trim().parse::<usize>().map_err(|_| {
                        QueryError::InvalidIndex {
                            step: segment.to_string(),
                        }
                    })?;
                    (name, Some(index))
                }
                None => (segment, None),
            };
            if name.is_empty() {
                return Err(QueryError::EmptyStep {
                    step: segment.to_string(),
                });
            }
            steps.push(Step {
                name: name.to_string(),
                index,
            });
        }

        if steps.is_empty() {
            return Err(QueryError::EmptyPath);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// First node in document order reached by this path from `base` or
    /// from any node below it.
    pub fn find<'a>(&self, base: NodeRef<'a>) -> Option<NodeRef<'a>> {
        if let Some(found) = match_steps(base, &self.steps) {
            return Some(found);
        }
        base.descendants()
            .find_map(|anchor| match_steps(anchor, &self.steps))
    }
}

/// Parse `path` and run it against `base`.
pub fn query<'a>(base: NodeRef<'a>, path: &str) -> Result<Option<NodeRef<'a>>, QueryError> {
    Ok(QueryPath::parse(path)?.find(base))
}

fn step_matches(node: NodeRef<'_>, name: &str) -> bool {
    match node.node() {
        Node::Token(_) => node.image() == name,
        _ => node.node_type().name() == name,
    }
}

fn match_steps<'a>(node: NodeRef<'a>, steps: &[Step]) -> Option<NodeRef<'a>> {
    let Some((step, rest)) = steps.split_first() else {
        return Some(node);
    };

    let mut candidates = node.children().filter(|c| step_matches(*c, &step.name));
    match step.index {
        Some(index) => {
            let child = candidates.nth(index)?;
            match_steps(child, rest)
        }
        None => candidates.find_map(|child| match_steps(child, rest)),
    }
}
