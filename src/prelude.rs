// prelude.rs - Convenient re-exports for the idiomatic API.
//
//! # Prelude
//!
//! ```
//! use ferrule::prelude::*;
//!
//! let f = NodeFactory::new();
//! let rule = Rule::new(&f.concat(f.literal(b"42"), f.pattern_end())).unwrap();
//! let m = rule.find("answer: 42").unwrap();
//! assert_eq!(m.as_str(), "42");
//! ```

pub use crate::api::{FindIter, Match, MatchCursor, Rule, RuleBuilder};
pub use crate::error::RuleError;
pub use crate::ruleexec::{Captures, MatchBoundary, MatchHandle, Resume};
pub use crate::ruleint::RuleOptions;
pub use crate::rulenode::{AnchorType, CutType, Node, NodeFactory, NodeInner, Quantifier};
