//! # Ferrule
//!
//! Pattern-rule compiler and reference backtracking VM.
//!
//! A rule is a tree of [`rulenode::Node`]s: literals, any-character,
//! quantified repetition, concatenation, alternation, capturing and
//! non-capturing groups, anchors, backreferences and cut operators. The
//! compiler turns it into a block program whose choice points are
//! call/return pairs, and serializes that program as text. The VM runs the
//! program as a resumable search that reports one match per resumption until
//! the search space is exhausted.
//!
//! The rule-source grammar is not part of this crate; a front end builds
//! trees through [`rulenode::NodeFactory`].
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrule::prelude::*;
//!
//! let f = NodeFactory::new();
//! let root = f.sequence(vec![
//!     f.group(1, f.any_char().quantified(2, Some(2), true)),
//!     f.literal(b"-"),
//!     f.backref(1),
//!     f.pattern_end(),
//! ]);
//! let rule = Rule::new(&root).unwrap();
//! let m = rule.find("id: ab-ab").unwrap();
//! assert_eq!(m.as_str(), "ab-ab");
//! assert_eq!(m.group(1), Some(&b"ab"[..]));
//! ```
//!
//! Every resumption continues the backtracking search, so alternatives at
//! the same start position are reported too:
//!
//! ```rust
//! use ferrule::prelude::*;
//!
//! let f = NodeFactory::new();
//! let root = f.concat(f.any_char().quantified(2, Some(4), true), f.pattern_end());
//! let rule = Rule::new(&root).unwrap();
//! let ends: Vec<usize> = rule.find_iter("abcde").take(3).map(|m| m.end()).collect();
//! assert_eq!(ends, vec![4, 3, 2]);
//! ```
//!
//! ## Low-Level API
//!
//! ```rust
//! use ferrule::rulecomp::compile_rule;
//! use ferrule::ruleexec::{MatchHandle, Resume};
//! use ferrule::ruleint::RuleOptions;
//! use ferrule::rulenode::NodeFactory;
//!
//! let f = NodeFactory::new();
//! let root = f.concat(f.literal(b"ab"), f.pattern_end());
//! let prog = compile_rule(&root, RuleOptions::empty()).unwrap();
//! assert!(prog.text().starts_with(b".sub _rule\n"));
//!
//! let mut h = MatchHandle::new(&prog, b"xaby");
//! assert_eq!(h.resume().unwrap().into_match().unwrap().range(), 1..3);
//! assert_eq!(h.resume().unwrap(), Resume::Exhausted);
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`rulenode`] | Rule tree, quantifiers, node factory |
//! | [`rulelit`] | String-constant escaping, quantifier annotations |
//! | [`rulebuf`] | Program text buffer |
//! | [`ruleint`] | Labels, ops, blocks, linked programs |
//! | [`ruletrav`] | Tree traversal and validation |
//! | [`rulecomp`] | Tree-to-program compiler |
//! | [`ruleexec`] | Backtracking VM and match handles |
//! | [`api`] | `Rule`, `RuleBuilder`, `Match`, `FindIter` |
//! | [`error`] | `RuleError` |

pub mod api;
pub mod error;
pub mod prelude;
pub mod rulebuf;
pub mod rulecomp;
pub mod ruleexec;
pub mod ruleint;
pub mod rulelit;
pub mod rulenode;
pub mod ruletrav;
