// api.rs - Idiomatic Rust API for Ferrule.
//
// Wraps the compiler and the VM (compile_rule, MatchHandle) with
// Rust-native types: Rule, RuleBuilder, MatchCursor, Match, FindIter.

use std::ops::Range;

use crate::error::RuleError;
use crate::rulecomp::compile_rule;
use crate::ruleexec::{Captures, MatchBoundary, MatchHandle, Resume};
use crate::ruleint::{Program, RuleOptions};
use crate::rulenode::Node;

/// A compiled pattern rule.
///
/// # Examples
///
/// ```
/// use ferrule::api::Rule;
/// use ferrule::rulenode::NodeFactory;
///
/// let f = NodeFactory::new();
/// let rule = Rule::new(&f.concat(f.literal(b"42"), f.pattern_end())).unwrap();
/// assert!(rule.is_match("hello 42"));
///
/// let m = rule.find("hello 42").unwrap();
/// assert_eq!(m.as_str(), "42");
/// assert_eq!(m.start(), 6);
/// assert_eq!(m.end(), 8);
/// ```
pub struct Rule {
    program: Program,
    retry_limit: Option<u64>,
    stack_limit: Option<u32>,
}

impl Rule {
    /// Compile a rule tree with default options.
    pub fn new(root: &Node) -> Result<Rule, RuleError> {
        RuleBuilder::new().build(root)
    }

    /// Create a [`RuleBuilder`] for fine-grained control over compilation.
    pub fn builder() -> RuleBuilder {
        RuleBuilder::new()
    }

    /// Create a match handle positioned before the first match.
    pub fn handle<'r, 't>(&'r self, subject: &'t [u8]) -> MatchHandle<'r, 't> {
        self.handle_bounded(subject, None, subject.len())
    }

    fn handle_bounded<'r, 't>(
        &'r self,
        subject: &'t [u8],
        start: Option<usize>,
        end: usize,
    ) -> MatchHandle<'r, 't> {
        let mut h = MatchHandle::with_bounds(&self.program, subject, start, end);
        if let Some(n) = self.retry_limit {
            h = h.retry_limit(n);
        }
        if let Some(n) = self.stack_limit {
            h = h.stack_limit(n);
        }
        h
    }

    /// Start a search of `subject` and run it to the first match.
    pub fn exec<'r, 't>(&'r self, subject: &'t [u8]) -> Result<MatchCursor<'r, 't>, RuleError> {
        MatchCursor::start(self.handle(subject))
    }

    /// Attempt a match at `pos` only.
    pub fn exec_at<'r, 't>(
        &'r self,
        subject: &'t [u8],
        pos: usize,
    ) -> Result<MatchCursor<'r, 't>, RuleError> {
        MatchCursor::start(self.handle_bounded(subject, Some(pos), subject.len()))
    }

    /// Search with an explicit end bound. `start == None` scans every position
    /// up to `end`.
    pub fn exec_bounded<'r, 't>(
        &'r self,
        subject: &'t [u8],
        start: Option<usize>,
        end: usize,
    ) -> Result<MatchCursor<'r, 't>, RuleError> {
        MatchCursor::start(self.handle_bounded(subject, start, end))
    }

    /// Return the first match in `text`, or `None` if no match.
    ///
    /// A search that hits a match limit counts as no match; use
    /// [`exec`](Rule::exec) to see the error.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.find_bytes(text.as_bytes())
    }

    /// Return the first match in `text` (as bytes), or `None` if no match.
    pub fn find_bytes<'t>(&self, text: &'t [u8]) -> Option<Match<'t>> {
        self.exec(text).ok()?.into_match()
    }

    /// Check whether `text` matches the rule anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.is_match_bytes(text.as_bytes())
    }

    /// Check whether `text` (as bytes) matches the rule anywhere.
    pub fn is_match_bytes(&self, text: &[u8]) -> bool {
        self.find_bytes(text).is_some()
    }

    /// Iterate over every match the search reports, in order. Unlike a regex
    /// engine's non-overlapping iteration, this includes every backtracked
    /// alternative at the same start position.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> FindIter<'r, 't> {
        self.find_iter_bytes(text.as_bytes())
    }

    /// Iterate over every match in `text` (as bytes).
    pub fn find_iter_bytes<'r, 't>(&'r self, text: &'t [u8]) -> FindIter<'r, 't> {
        FindIter {
            handle: self.handle(text),
        }
    }

    /// The generated program text.
    pub fn text(&self) -> &[u8] {
        self.program.text()
    }

    /// The linked block program.
    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("blocks", &self.program.blocks().len())
            .field("options", &self.program.options())
            .finish_non_exhaustive()
    }
}

// === RuleBuilder ===

/// Builder for compiling a [`Rule`] with custom options.
///
/// # Examples
///
/// ```
/// use ferrule::api::Rule;
/// use ferrule::rulenode::NodeFactory;
///
/// let f = NodeFactory::new();
/// let rule = Rule::builder()
///     .trace(true)
///     .build(&f.concat(f.literal(b"hi"), f.pattern_end()))
///     .unwrap();
/// assert!(rule.program().is_traced());
/// ```
#[derive(Debug, Default, Clone)]
pub struct RuleBuilder {
    options: RuleOptions,
    retry_limit: Option<u64>,
    stack_limit: Option<u32>,
}

impl RuleBuilder {
    pub fn new() -> Self {
        RuleBuilder::default()
    }

    /// Enable or disable trace calls in the generated program.
    pub fn trace(mut self, yes: bool) -> Self {
        self.options.set(RuleOptions::TRACE, yes);
        self
    }

    /// Set raw option flags.
    pub fn option(mut self, flags: RuleOptions) -> Self {
        self.options |= flags;
        self
    }

    /// Backtrack limit for searches of this rule, instead of the
    /// process-wide setting.
    pub fn retry_limit(mut self, n: u64) -> Self {
        self.retry_limit = Some(n);
        self
    }

    /// Choice-point frame limit for searches of this rule.
    pub fn match_stack_limit(mut self, n: u32) -> Self {
        self.stack_limit = Some(n);
        self
    }

    /// Compile `root` into a [`Rule`].
    pub fn build(self, root: &Node) -> Result<Rule, RuleError> {
        let program = compile_rule(root, self.options)?;
        Ok(Rule {
            program,
            retry_limit: self.retry_limit,
            stack_limit: self.stack_limit,
        })
    }
}

// === MatchCursor ===

/// A started search: the current match, if any, and the handle to resume.
#[derive(Debug)]
pub struct MatchCursor<'r, 't> {
    handle: MatchHandle<'r, 't>,
    current: Option<Match<'t>>,
}

impl<'r, 't> MatchCursor<'r, 't> {
    fn start(mut handle: MatchHandle<'r, 't>) -> Result<Self, RuleError> {
        let current = next_match(&mut handle)?;
        Ok(MatchCursor { handle, current })
    }

    /// The match the search stopped at, or `None` once exhausted.
    pub fn get(&self) -> Option<&Match<'t>> {
        self.current.as_ref()
    }

    /// Resume the search.
    pub fn advance(&mut self) -> Result<Option<&Match<'t>>, RuleError> {
        self.current = next_match(&mut self.handle)?;
        Ok(self.current.as_ref())
    }

    pub fn into_match(self) -> Option<Match<'t>> {
        self.current
    }

    pub fn into_handle(self) -> MatchHandle<'r, 't> {
        self.handle
    }
}

fn next_match<'t>(handle: &mut MatchHandle<'_, 't>) -> Result<Option<Match<'t>>, RuleError> {
    let text = handle.subject();
    Ok(handle
        .resume()?
        .into_match()
        .map(|b| Match::from_boundary(text, b)))
}

// === Match ===

/// A single match result referencing the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t [u8],
    start: usize,
    end: usize,
    captures: Captures,
}

impl<'t> Match<'t> {
    fn from_boundary(text: &'t [u8], b: MatchBoundary) -> Self {
        Match {
            text,
            start: b.start,
            end: b.end,
            captures: b.captures,
        }
    }

    /// Byte offset of the start of the match.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset of the end of the match (exclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte range of the match.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The matched text as a byte slice.
    pub fn as_bytes(&self) -> &'t [u8] {
        &self.text[self.start..self.end]
    }

    /// The matched text as a `&str`.
    ///
    /// # Panics
    ///
    /// Panics if the matched bytes are not valid UTF-8.
    pub fn as_str(&self) -> &'t str {
        std::str::from_utf8(self.as_bytes()).expect("match is not valid UTF-8")
    }

    /// Returns the length of the match in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the match is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Capture state when the match was reported.
    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// Text of the most recent capture of `group`.
    pub fn group(&self, group: i32) -> Option<&'t [u8]> {
        let r = self.captures.group(group)?;
        self.text.get(r)
    }
}

// === FindIter ===

/// Iterator over every match a search reports. Stops at exhaustion or at
/// the first limit error.
#[derive(Debug)]
pub struct FindIter<'r, 't> {
    handle: MatchHandle<'r, 't>,
}

impl<'r, 't> Iterator for FindIter<'r, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        next_match(&mut self.handle).ok().flatten()
    }
}

impl std::iter::FusedIterator for FindIter<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rulenode::{AnchorType, NodeFactory};

    fn literal_rule(s: &[u8]) -> Rule {
        let f = NodeFactory::new();
        Rule::new(&f.concat(f.literal(s), f.pattern_end())).unwrap()
    }

    #[test]
    fn rule_new_and_find() {
        let rule = literal_rule(b"42");
        let m = rule.find("hello 42 world").unwrap();
        assert_eq!(m.as_str(), "42");
        assert_eq!(m.start(), 6);
        assert_eq!(m.end(), 8);
        assert_eq!(m.range(), 6..8);
        assert_eq!(m.len(), 2);
        assert!(!m.is_empty());
    }

    #[test]
    fn rule_no_match() {
        let rule = literal_rule(b"42");
        assert!(rule.find("no digits here").is_none());
        assert!(!rule.is_match("4 2"));
    }

    #[test]
    fn rule_is_match() {
        let rule = literal_rule(b"hello");
        assert!(rule.is_match("say hello"));
        assert!(!rule.is_match("say goodbye"));
    }

    #[test]
    fn cursor_walks_all_matches() {
        let f = NodeFactory::new();
        let rule = Rule::new(&f.concat(
            f.any_char().quantified(1, Some(2), true),
            f.pattern_end(),
        ))
        .unwrap();
        let mut cur = rule.exec(b"ab").unwrap();
        assert_eq!(cur.get().map(Match::range), Some(0..2));
        assert_eq!(cur.advance().unwrap().map(Match::range), Some(0..1));
        assert_eq!(cur.advance().unwrap().map(Match::range), Some(1..2));
        assert_eq!(cur.advance().unwrap(), None);
        assert_eq!(cur.advance().unwrap(), None);
    }

    #[test]
    fn exec_at_and_bounded() {
        let rule = literal_rule(b"a");
        assert!(rule.exec_at(b"ba", 0).unwrap().get().is_none());
        assert_eq!(rule.exec_at(b"ba", 1).unwrap().get().map(Match::start), Some(1));
        assert!(rule.exec_bounded(b"bba", None, 2).unwrap().get().is_some());
        assert!(rule.exec_bounded(b"bbba", None, 2).unwrap().get().is_none());
    }

    #[test]
    fn find_iter_reports_backtracked_matches() {
        let f = NodeFactory::new();
        let rule = Rule::new(&f.concat(
            f.alt(f.literal(b"a"), f.literal(b"ab")),
            f.pattern_end(),
        ))
        .unwrap();
        let found: Vec<&str> = rule.find_iter("ab ab").map(|m| m.as_str()).collect();
        assert_eq!(found, vec!["a", "ab", "a", "ab"]);
    }

    #[test]
    fn match_group_text() {
        let f = NodeFactory::new();
        let rule = Rule::new(&f.sequence(vec![
            f.group(1, f.any_char().quantified(2, Some(2), true)),
            f.literal(b"-"),
            f.backref(1),
            f.pattern_end(),
        ]))
        .unwrap();
        let m = rule.find("xx ab-ab").unwrap();
        assert_eq!(m.as_str(), "ab-ab");
        assert_eq!(m.group(1), Some(&b"ab"[..]));
        assert_eq!(m.captures().repetitions(1), Some(1));
        assert_eq!(m.group(2), None);
    }

    #[test]
    fn builder_sets_trace() {
        let f = NodeFactory::new();
        let root = f.concat(f.anchor(AnchorType::BeginString), f.pattern_end());
        let rule = Rule::builder().trace(true).build(&root).unwrap();
        assert!(rule.program().is_traced());
        assert!(String::from_utf8_lossy(rule.text()).contains(".trace(pos, '^anchor')"));
        let plain = Rule::builder().trace(true).trace(false).build(&root).unwrap();
        assert!(!plain.program().is_traced());
    }

    #[test]
    fn builder_limits_apply_to_searches() {
        let f = NodeFactory::new();
        let root = f.concat(f.any_char().quantified(0, None, true), f.literal(b"z"));
        let rule = Rule::builder().retry_limit(10).build(&root).unwrap();
        let subject = [b'a'; 100];
        assert_eq!(
            rule.exec(&subject).unwrap_err(),
            RuleError::RetryLimitInMatchOver
        );
        assert!(rule.find_bytes(&subject).is_none());
    }

    #[test]
    fn invalid_tree_is_rejected() {
        let f = NodeFactory::new();
        let root = f.concat(f.any_char().quantified(3, Some(1), true), f.pattern_end());
        let err = Rule::new(&root).unwrap_err();
        assert!(matches!(err, RuleError::InvalidQuantifier { .. }));
    }

    #[test]
    fn rule_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Rule>();
    }
}
