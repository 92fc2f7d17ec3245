// rulenode.rs - Rule expression AST.
// Node types, quantifiers and the id-assigning node factory handed to parsers.

use std::cell::Cell;

use crate::error::RuleError;

/// Identifier of a node, unique across one rule tree. Every generated label is
/// derived from it.
pub type NodeId = u32;

// === Node Type Enum ===
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    PatternEnd = 0,
    AnyChar = 1,
    Literal = 2,
    BackRef = 3,
    Concat = 4,
    Group = 5,
    Alt = 6,
    AnchorBos = 7,
    AnchorEos = 8,
    AnchorBol = 9,
    AnchorEol = 10,
    CutAlt = 11,
    CutRule = 12,
    Null = 13,
}

impl TryFrom<u8> for NodeType {
    type Error = RuleError;

    /// Converts a raw parser tag. Tags outside the closed set are rejected.
    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => NodeType::PatternEnd,
            1 => NodeType::AnyChar,
            2 => NodeType::Literal,
            3 => NodeType::BackRef,
            4 => NodeType::Concat,
            5 => NodeType::Group,
            6 => NodeType::Alt,
            7 => NodeType::AnchorBos,
            8 => NodeType::AnchorEos,
            9 => NodeType::AnchorBol,
            10 => NodeType::AnchorEol,
            11 => NodeType::CutAlt,
            12 => NodeType::CutRule,
            13 => NodeType::Null,
            _ => return Err(RuleError::UnsupportedNodeKind(tag)),
        })
    }
}

// === Anchor Type ===
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorType {
    BeginString,
    EndString,
    BeginLine,
    EndLine,
}

// === Cut Type ===
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CutType {
    /// Commit to the current alternative of the enclosing group.
    Alt,
    /// Abandon the whole rule.
    Rule,
}

// === Quantifier ===

/// Repetition bounds of a node. `max == None` is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    pub max: Option<u32>,
    pub greedy: bool,
}

impl Quantifier {
    /// Exactly one, greedy. The default for every node.
    pub const ONCE: Quantifier = Quantifier {
        min: 1,
        max: Some(1),
        greedy: true,
    };

    pub fn new(min: u32, max: Option<u32>, greedy: bool) -> Self {
        Quantifier { min, max, greedy }
    }

    pub fn is_once(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    pub fn is_fixed(&self) -> bool {
        self.max == Some(self.min)
    }

    pub fn is_valid(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }
}

impl Default for Quantifier {
    fn default() -> Self {
        Quantifier::ONCE
    }
}

// === Node ===

pub struct Node {
    pub id: NodeId,
    pub quant: Quantifier,
    /// Once the minimal attempt is taken, no other repetition count is explored.
    pub cut: bool,
    pub inner: NodeInner,
}

pub enum NodeInner {
    PatternEnd,
    AnyChar,
    Literal(Vec<u8>),
    BackRef { group: i32 },
    Concat(Box<Node>, Box<Node>),
    /// `group >= 0` captures into that slot; negative groups only repeat.
    Group { group: i32, body: Box<Node> },
    Alt(Box<Node>, Box<Node>),
    Anchor(AnchorType),
    Cut(CutType),
    Null,
}

impl Node {
    pub fn new(id: NodeId, inner: NodeInner) -> Self {
        Node {
            id,
            quant: Quantifier::ONCE,
            cut: false,
            inner,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match &self.inner {
            NodeInner::PatternEnd => NodeType::PatternEnd,
            NodeInner::AnyChar => NodeType::AnyChar,
            NodeInner::Literal(_) => NodeType::Literal,
            NodeInner::BackRef { .. } => NodeType::BackRef,
            NodeInner::Concat(..) => NodeType::Concat,
            NodeInner::Group { .. } => NodeType::Group,
            NodeInner::Alt(..) => NodeType::Alt,
            NodeInner::Anchor(AnchorType::BeginString) => NodeType::AnchorBos,
            NodeInner::Anchor(AnchorType::EndString) => NodeType::AnchorEos,
            NodeInner::Anchor(AnchorType::BeginLine) => NodeType::AnchorBol,
            NodeInner::Anchor(AnchorType::EndLine) => NodeType::AnchorEol,
            NodeInner::Cut(CutType::Alt) => NodeType::CutAlt,
            NodeInner::Cut(CutType::Rule) => NodeType::CutRule,
            NodeInner::Null => NodeType::Null,
        }
    }

    /// Set the repetition bounds.
    pub fn quantified(mut self, min: u32, max: Option<u32>, greedy: bool) -> Self {
        self.quant = Quantifier::new(min, max, greedy);
        self
    }

    /// Mark the node as cut (no give-back on backtrack).
    pub fn with_cut(mut self) -> Self {
        self.cut = true;
        self
    }

    /// Direct children, left to right.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        let (a, b): (Option<&Node>, Option<&Node>) = match &self.inner {
            NodeInner::Concat(l, r) | NodeInner::Alt(l, r) => (Some(&**l), Some(&**r)),
            NodeInner::Group { body, .. } => (Some(&**body), None),
            _ => (None, None),
        };
        a.into_iter().chain(b)
    }

    pub fn as_literal(&self) -> Option<&[u8]> {
        match &self.inner {
            NodeInner::Literal(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("Node");
        d.field("id", &self.id).field("type", &self.node_type());
        if !self.quant.is_once() {
            d.field("quant", &self.quant);
        }
        if self.cut {
            d.field("cut", &true);
        }
        match &self.inner {
            NodeInner::Literal(s) => {
                d.field("literal", &String::from_utf8_lossy(s));
            }
            NodeInner::BackRef { group } => {
                d.field("group", group);
            }
            NodeInner::Group { group, body } => {
                d.field("group", group).field("body", body);
            }
            NodeInner::Concat(l, r) | NodeInner::Alt(l, r) => {
                d.field("left", l).field("right", r);
            }
            _ => {}
        }
        d.finish()
    }
}

// === NodeFactory ===

/// Hands out nodes with fresh, never reused ids.
///
/// Children are built before their parent, so ids grow bottom-up:
///
/// ```
/// use ferrule::rulenode::NodeFactory;
///
/// let f = NodeFactory::new();
/// let root = f.concat(f.literal(b"ab"), f.pattern_end());
/// assert_eq!(root.id, 2);
/// ```
#[derive(Debug, Default)]
pub struct NodeFactory {
    next_id: Cell<NodeId>,
}

impl NodeFactory {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: NodeId) -> Self {
        NodeFactory {
            next_id: Cell::new(first),
        }
    }

    fn node(&self, inner: NodeInner) -> Node {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Node::new(id, inner)
    }

    pub fn pattern_end(&self) -> Node {
        self.node(NodeInner::PatternEnd)
    }

    pub fn any_char(&self) -> Node {
        self.node(NodeInner::AnyChar)
    }

    pub fn literal(&self, s: &[u8]) -> Node {
        self.node(NodeInner::Literal(s.to_vec()))
    }

    pub fn backref(&self, group: i32) -> Node {
        self.node(NodeInner::BackRef { group })
    }

    pub fn concat(&self, left: Node, right: Node) -> Node {
        self.node(NodeInner::Concat(Box::new(left), Box::new(right)))
    }

    /// Right-nested concatenation of `items`.
    ///
    /// # Panics
    ///
    /// Panics if `items` is empty.
    pub fn sequence(&self, items: Vec<Node>) -> Node {
        let mut iter = items.into_iter().rev();
        let last = iter.next().expect("sequence needs at least one node");
        iter.fold(last, |acc, n| self.concat(n, acc))
    }

    pub fn group(&self, group: i32, body: Node) -> Node {
        self.node(NodeInner::Group {
            group,
            body: Box::new(body),
        })
    }

    pub fn alt(&self, left: Node, right: Node) -> Node {
        self.node(NodeInner::Alt(Box::new(left), Box::new(right)))
    }

    pub fn anchor(&self, anchor: AnchorType) -> Node {
        self.node(NodeInner::Anchor(anchor))
    }

    pub fn cut(&self, cut: CutType) -> Node {
        self.node(NodeInner::Cut(cut))
    }

    pub fn null(&self) -> Node {
        self.node(NodeInner::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_from_tag() {
        assert_eq!(NodeType::try_from(2).unwrap(), NodeType::Literal);
        assert_eq!(NodeType::try_from(13).unwrap(), NodeType::Null);
        for tag in 0..=13u8 {
            assert_eq!(NodeType::try_from(tag).unwrap() as u8, tag);
        }
    }

    #[test]
    fn node_type_rejects_unknown_tag() {
        let err = NodeType::try_from(14).unwrap_err();
        assert_eq!(err, RuleError::UnsupportedNodeKind(14));
    }

    #[test]
    fn quantifier_validity() {
        assert!(Quantifier::ONCE.is_once());
        assert!(Quantifier::new(2, None, true).is_valid());
        assert!(Quantifier::new(3, Some(3), false).is_fixed());
        assert!(!Quantifier::new(4, Some(2), true).is_valid());
    }

    #[test]
    fn factory_assigns_unique_ids() {
        let f = NodeFactory::starting_at(10);
        let root = f.sequence(vec![f.literal(b"a"), f.any_char(), f.pattern_end()]);
        let mut ids = Vec::new();
        fn walk(n: &Node, ids: &mut Vec<NodeId>) {
            ids.push(n.id);
            n.children().for_each(|c| walk(c, ids));
        }
        walk(&root, &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn anchor_node_types() {
        let f = NodeFactory::new();
        assert_eq!(f.anchor(AnchorType::EndLine).node_type(), NodeType::AnchorEol);
        assert_eq!(f.cut(CutType::Rule).node_type(), NodeType::CutRule);
    }
}
