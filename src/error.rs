// error.rs - Error type for rule compilation and matching.
//
// Compile-time failures and run-time limit violations share one enum, the
// way the engine always reported them. A subject that simply does not match is
// never an error: the match handle reports exhaustion instead.

use thiserror::Error;

use crate::rulenode::NodeId;

/// Error type for rule compilation and matching operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The program buffer could not be extended.
    #[error("memory allocation failed")]
    Memory,
    /// A node tag outside the closed set of rule node kinds.
    #[error("unsupported node kind: tag {0}")]
    UnsupportedNodeKind(u8),
    /// `min > max` on a bounded quantifier.
    #[error("invalid quantifier on node {id}: min {min} > max {max}")]
    InvalidQuantifier { id: NodeId, min: u32, max: u32 },
    /// Two nodes share an id, so their labels would collide.
    #[error("duplicate node id {0}")]
    DuplicateNodeId(NodeId),
    /// The rule tree nests deeper than the generator allows.
    #[error("nest depth limit over")]
    NestDepthLimitOver,
    /// Choice-point stack limit exceeded.
    #[error("match-stack limit over")]
    MatchStackLimitOver,
    /// Backtrack limit exceeded.
    #[error("retry-limit-in-match over")]
    RetryLimitInMatchOver,
    /// Inconsistent program or VM state (should not occur in correct usage).
    #[error("internal error: {0}")]
    InternalBug(String),
}

impl RuleError {
    /// Returns `true` for errors raised while compiling a rule, as opposed to
    /// limits hit while running one.
    pub fn is_compile_error(&self) -> bool {
        !matches!(
            self,
            RuleError::MatchStackLimitOver | RuleError::RetryLimitInMatchOver
        )
    }

    pub(crate) fn bug(message: impl Into<String>) -> Self {
        RuleError::InternalBug(message.into())
    }
}
