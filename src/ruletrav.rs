// ruletrav.rs - Rule tree traversal.
// Pre-order walk, tree validation and the string-start anchor check.

use std::collections::HashSet;

use crate::error::RuleError;
use crate::ruleint::DEFAULT_NEST_DEPTH_LIMIT;
use crate::rulenode::{AnchorType, Node, NodeInner};

/// Visit `node` and its descendants in pre-order.
/// Callback receives (node, level). The walk stops at the first error, and
/// never descends below `max_level`.
pub fn node_traverse<F>(node: &Node, max_level: u32, mut callback: F) -> Result<(), RuleError>
where
    F: FnMut(&Node, u32) -> Result<(), RuleError>,
{
    traverse(node, 0, max_level, &mut callback)
}

fn traverse<F>(node: &Node, level: u32, max_level: u32, callback: &mut F) -> Result<(), RuleError>
where
    F: FnMut(&Node, u32) -> Result<(), RuleError>,
{
    if level > max_level {
        return Err(RuleError::NestDepthLimitOver);
    }
    callback(node, level)?;
    for child in node.children() {
        traverse(child, level + 1, max_level, callback)?;
    }
    Ok(())
}

/// Reject trees the generator cannot turn into a well-formed program:
/// repeated ids, `min > max` quantifiers and excessive nesting.
pub fn check_tree(root: &Node) -> Result<(), RuleError> {
    let mut seen = HashSet::new();
    node_traverse(root, DEFAULT_NEST_DEPTH_LIMIT, |node, _| {
        if !seen.insert(node.id) {
            return Err(RuleError::DuplicateNodeId(node.id));
        }
        if let Some(max) = node.quant.max {
            if node.quant.min > max {
                return Err(RuleError::InvalidQuantifier {
                    id: node.id,
                    min: node.quant.min,
                    max,
                });
            }
        }
        Ok(())
    })
}

/// True when every match of `node` must start at position 0, so scanning
/// later start positions is pointless.
pub fn is_bos_anchored(node: &Node) -> bool {
    match &node.inner {
        NodeInner::Anchor(AnchorType::BeginString) => true,
        NodeInner::Concat(left, _) => is_bos_anchored(left),
        NodeInner::Group { body, .. } => node.quant.is_once() && is_bos_anchored(body),
        NodeInner::Alt(left, right) => is_bos_anchored(left) && is_bos_anchored(right),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rulenode::{NodeFactory, NodeId};

    #[test]
    fn traverse_is_preorder() {
        let f = NodeFactory::new();
        let root = f.concat(f.literal(b"a"), f.alt(f.any_char(), f.pattern_end()));
        let mut visited: Vec<(NodeId, u32)> = Vec::new();
        node_traverse(&root, 10, |n, level| {
            visited.push((n.id, level));
            Ok(())
        })
        .unwrap();
        assert_eq!(visited, vec![(4, 0), (0, 1), (3, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn traverse_stops_at_first_error() {
        let f = NodeFactory::new();
        let root = f.concat(f.literal(b"a"), f.literal(b"b"));
        let mut count = 0;
        let r = node_traverse(&root, 10, |n, _| {
            count += 1;
            if n.as_literal().is_some() {
                Err(RuleError::Memory)
            } else {
                Ok(())
            }
        });
        assert_eq!(r, Err(RuleError::Memory));
        assert_eq!(count, 2);
    }

    #[test]
    fn check_tree_accepts_factory_trees() {
        let f = NodeFactory::new();
        let root = f.sequence(vec![
            f.group(0, f.literal(b"ab")).quantified(1, None, true),
            f.backref(0),
            f.pattern_end(),
        ]);
        assert_eq!(check_tree(&root), Ok(()));
    }

    #[test]
    fn check_tree_rejects_duplicate_ids() {
        let f = NodeFactory::new();
        let a = f.literal(b"a");
        let b = Node::new(a.id, NodeInner::AnyChar);
        let root = f.concat(a, b);
        assert_eq!(check_tree(&root), Err(RuleError::DuplicateNodeId(0)));
    }

    #[test]
    fn check_tree_rejects_inverted_quantifier() {
        let f = NodeFactory::new();
        let root = f.concat(f.any_char().quantified(4, Some(2), true), f.pattern_end());
        assert_eq!(
            check_tree(&root),
            Err(RuleError::InvalidQuantifier { id: 0, min: 4, max: 2 })
        );
    }

    #[test]
    fn check_tree_rejects_deep_nesting() {
        let f = NodeFactory::new();
        let mut node = f.literal(b"x");
        for _ in 0..=DEFAULT_NEST_DEPTH_LIMIT {
            node = f.group(-1, node);
        }
        assert_eq!(check_tree(&node), Err(RuleError::NestDepthLimitOver));
    }

    #[test]
    fn bos_anchor_detection() {
        let f = NodeFactory::new();
        let bos = || f.anchor(AnchorType::BeginString);
        assert!(is_bos_anchored(&f.concat(bos(), f.literal(b"a"))));
        assert!(is_bos_anchored(&f.group(0, f.concat(bos(), f.any_char()))));
        assert!(!is_bos_anchored(
            &f.group(0, bos()).quantified(0, Some(1), true)
        ));
        assert!(is_bos_anchored(&f.alt(bos(), bos())));
        assert!(!is_bos_anchored(&f.alt(bos(), f.literal(b"a"))));
        assert!(!is_bos_anchored(&f.concat(f.literal(b"a"), bos())));
        assert!(!is_bos_anchored(&f.anchor(AnchorType::BeginLine)));
    }
}
