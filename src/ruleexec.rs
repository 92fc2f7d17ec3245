// ruleexec.rs - Reference backtracking VM.
// Runs a linked Program against a subject through a resumable MatchHandle.
//
// Choice points are explicit frames: a Call pushes the return address and the
// registers it preserves, a Ret pops the most recent frame. A Ret with no
// frame left means the search space is used up.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::RuleError;
use crate::ruleint::*;

// ============================================================================
// Global limits
// ============================================================================

static RETRY_LIMIT_IN_MATCH: AtomicU64 = AtomicU64::new(DEFAULT_RETRY_LIMIT_IN_MATCH);
static MATCH_STACK_LIMIT: AtomicU32 = AtomicU32::new(DEFAULT_MATCH_STACK_LIMIT);

/// Backtracks allowed per handle; 0 means unlimited.
pub fn set_retry_limit_in_match(n: u64) { RETRY_LIMIT_IN_MATCH.store(n, Ordering::Relaxed); }
pub fn get_retry_limit_in_match() -> u64 { RETRY_LIMIT_IN_MATCH.load(Ordering::Relaxed) }
/// Choice-point frames allowed per handle; 0 means unlimited.
pub fn set_match_stack_limit(n: u32) { MATCH_STACK_LIMIT.store(n, Ordering::Relaxed); }
pub fn get_match_stack_limit() -> u32 { MATCH_STACK_LIMIT.load(Ordering::Relaxed) }

// ============================================================================
// Results
// ============================================================================

/// Capture boundaries and repetition counts of capturing groups, as they
/// stood when a match was reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Captures {
    offsets: BTreeMap<i32, Vec<usize>>,
    counts: BTreeMap<i32, u32>,
}

impl Captures {
    /// Raw boundary stack of `group`: start and end of every completed
    /// repetition, in order.
    pub fn offsets(&self, group: i32) -> &[usize] {
        self.offsets.get(&group).map_or(&[], Vec::as_slice)
    }

    /// Every completed capture of `group`.
    pub fn spans(&self, group: i32) -> impl Iterator<Item = Range<usize>> + '_ {
        self.offsets(group).chunks_exact(2).map(|p| p[0]..p[1])
    }

    /// The most recent completed capture of `group`.
    pub fn group(&self, group: i32) -> Option<Range<usize>> {
        self.spans(group).last()
    }

    /// Repetition count of `group` when the match was reported.
    pub fn repetitions(&self, group: i32) -> Option<u32> {
        self.counts.get(&group).copied()
    }

    /// Groups that have a capture stack.
    pub fn groups(&self) -> impl Iterator<Item = i32> + '_ {
        self.offsets.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.values().all(|s| s.len() < 2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchBoundary {
    pub start: usize,
    pub end: usize,
    pub captures: Captures,
}

impl MatchBoundary {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resume {
    Match(MatchBoundary),
    /// No further matches; every later resume reports this again.
    Exhausted,
}

impl Resume {
    pub fn into_match(self) -> Option<MatchBoundary> {
        match self {
            Resume::Match(m) => Some(m),
            Resume::Exhausted => None,
        }
    }
}

// ============================================================================
// Machine state
// ============================================================================

/// The `str` register: either a literal of the program or a slice of the
/// subject extracted for a backreference.
#[derive(Clone, Copy, Debug)]
enum StrReg<'r, 't> {
    Program(&'r [u8]),
    Subject(&'t [u8]),
}

impl StrReg<'_, '_> {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        match self {
            StrReg::Program(s) => s,
            StrReg::Subject(s) => s,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Saved<'r, 't> {
    Pos(i64),
    Rep(i64),
    MaxRep(i64),
    Str(StrReg<'r, 't>),
    StrLen(i64),
    GrCap(Option<GroupKey>),
    GrRep(Option<GroupKey>),
    I0(i64),
    I1(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pc {
    block: usize,
    op: usize,
}

#[derive(Debug)]
struct Frame<'r, 't> {
    ret: Pc,
    saved: SmallVec<[Saved<'r, 't>; 4]>,
}

#[derive(Debug)]
struct Registers<'r, 't> {
    pos: i64,
    rep: i64,
    maxrep: i64,
    strlen: i64,
    i0: i64,
    i1: i64,
    str: StrReg<'r, 't>,
    gr_rep: Option<GroupKey>,
    gr_cap: Option<GroupKey>,
    from: i64,
    cutgrp: bool,
}

#[derive(Debug)]
enum HandleState {
    Running,
    Exhausted,
    Poisoned(RuleError),
}

enum Step {
    Match(MatchBoundary),
    Exhausted,
}

fn position(v: i64) -> Result<usize, RuleError> {
    usize::try_from(v).map_err(|_| RuleError::bug(format!("negative position {}", v)))
}

// ============================================================================
// MatchHandle
// ============================================================================

/// Resumable search of one subject. Each [`resume`](MatchHandle::resume)
/// continues the backtracking search to the next match or to exhaustion.
///
/// ```
/// use ferrule::rulecomp::compile_rule;
/// use ferrule::ruleexec::{MatchHandle, Resume};
/// use ferrule::ruleint::RuleOptions;
/// use ferrule::rulenode::NodeFactory;
///
/// let f = NodeFactory::new();
/// let root = f.concat(f.literal(b"ab"), f.pattern_end());
/// let prog = compile_rule(&root, RuleOptions::empty()).unwrap();
///
/// let mut h = MatchHandle::new(&prog, b"xaby");
/// let m = h.resume().unwrap().into_match().unwrap();
/// assert_eq!(m.range(), 1..3);
/// assert_eq!(h.resume().unwrap(), Resume::Exhausted);
/// ```
#[derive(Debug)]
pub struct MatchHandle<'r, 't> {
    program: &'r Program,
    subject: &'t [u8],
    lastpos: i64,
    pc: Pc,
    regs: Registers<'r, 't>,
    frames: Vec<Frame<'r, 't>>,
    counts: BTreeMap<GroupKey, i64>,
    caps: BTreeMap<GroupKey, Vec<usize>>,
    state: HandleState,
    retry_limit: u64,
    retry_count: u64,
    stack_limit: u32,
}

impl<'r, 't> MatchHandle<'r, 't> {
    /// Search every start position of `subject`.
    pub fn new(program: &'r Program, subject: &'t [u8]) -> Self {
        Self::with_bounds(program, subject, None, subject.len())
    }

    /// Attempt a match at `start` only.
    pub fn at(program: &'r Program, subject: &'t [u8], start: usize) -> Self {
        Self::with_bounds(program, subject, Some(start), subject.len())
    }

    /// Search with an explicit end bound: no scan starts past `lastpos`, and
    /// the end-of-string anchor matches at `lastpos`. `lastpos` is clamped to
    /// the subject length. A `start` past the bound is exhausted immediately.
    pub fn with_bounds(
        program: &'r Program,
        subject: &'t [u8],
        start: Option<usize>,
        lastpos: usize,
    ) -> Self {
        let lastpos = lastpos.min(subject.len());
        let state = match start {
            Some(s) if s > lastpos => HandleState::Exhausted,
            _ => HandleState::Running,
        };
        MatchHandle {
            program,
            subject,
            lastpos: lastpos as i64,
            pc: Pc {
                block: program.resolve(Label::Start).unwrap_or(0),
                op: 0,
            },
            regs: Registers {
                pos: start.map_or(-1, |s| s as i64),
                rep: 0,
                maxrep: 0,
                strlen: 0,
                i0: 0,
                i1: 0,
                str: StrReg::Program(&[]),
                gr_rep: None,
                gr_cap: None,
                from: 0,
                cutgrp: false,
            },
            frames: Vec::with_capacity(INIT_MATCH_STACK_SIZE),
            counts: BTreeMap::new(),
            caps: BTreeMap::new(),
            state,
            retry_limit: get_retry_limit_in_match(),
            retry_count: 0,
            stack_limit: get_match_stack_limit(),
        }
    }

    /// Override the process-wide retry limit for this handle.
    pub fn retry_limit(mut self, n: u64) -> Self {
        self.retry_limit = n;
        self
    }

    /// Override the process-wide frame limit for this handle.
    pub fn stack_limit(mut self, n: u32) -> Self {
        self.stack_limit = n;
        self
    }

    pub fn subject(&self) -> &'t [u8] {
        self.subject
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, HandleState::Exhausted)
    }

    /// Run to the next match or to exhaustion.
    ///
    /// A limit violation is returned as an error and sticks: the handle
    /// reports the same error on every later call.
    pub fn resume(&mut self) -> Result<Resume, RuleError> {
        match &self.state {
            HandleState::Running => {}
            HandleState::Exhausted => return Ok(Resume::Exhausted),
            HandleState::Poisoned(err) => return Err(err.clone()),
        }
        match self.run() {
            Ok(Step::Match(m)) => Ok(Resume::Match(m)),
            Ok(Step::Exhausted) => {
                debug!(retries = self.retry_count, "match handle exhausted");
                self.frames.clear();
                self.state = HandleState::Exhausted;
                Ok(Resume::Exhausted)
            }
            Err(err) => {
                debug!(error = %err, retries = self.retry_count, "match aborted");
                self.frames.clear();
                self.state = HandleState::Poisoned(err.clone());
                Err(err)
            }
        }
    }

    // ========================================================================
    // Interpreter loop
    // ========================================================================

    fn run(&mut self) -> Result<Step, RuleError> {
        let program = self.program;
        let traced = program.is_traced();
        loop {
            let block = program
                .blocks
                .get(self.pc.block)
                .ok_or_else(|| RuleError::bug("control fell off the program"))?;
            let Some(op) = block.ops.get(self.pc.op) else {
                self.pc = Pc {
                    block: self.pc.block + 1,
                    op: 0,
                };
                continue;
            };
            self.pc.op += 1;

            match op {
                Op::Comment(_) => {}
                Op::Trace(msg) => {
                    if traced {
                        trace!(
                            pos = self.regs.pos,
                            label = %String::from_utf8_lossy(msg),
                            "rule"
                        );
                    }
                }
                Op::Set(r, o) => {
                    let v = self.operand(*o);
                    *self.reg_mut(*r) = v;
                }
                Op::Add(r, o) => {
                    let v = self.operand(*o);
                    *self.reg_mut(*r) += v;
                }
                Op::Sub(r, o) => {
                    let v = self.operand(*o);
                    *self.reg_mut(*r) -= v;
                }
                Op::If {
                    lhs,
                    cmp,
                    rhs,
                    target,
                } => {
                    if cmp.eval(self.reg(*lhs), self.operand(*rhs)) {
                        self.jump(*target)?;
                    }
                }
                Op::Goto(target) => self.jump(*target)?,
                Op::Call { target, saves } => {
                    if self.stack_limit != 0 && self.frames.len() >= self.stack_limit as usize {
                        return Err(RuleError::MatchStackLimitOver);
                    }
                    let frame = Frame {
                        ret: self.pc,
                        saved: self.save(*saves),
                    };
                    self.frames.push(frame);
                    self.jump(*target)?;
                }
                Op::IfGroupCut(target) => {
                    if self.regs.cutgrp {
                        self.jump(*target)?;
                    }
                }
                Op::Ret { group_cut } => {
                    self.regs.cutgrp = *group_cut;
                    self.retry_count += 1;
                    if self.retry_limit != 0 && self.retry_count > self.retry_limit {
                        return Err(RuleError::RetryLimitInMatchOver);
                    }
                    let Some(frame) = self.frames.pop() else {
                        return Ok(Step::Exhausted);
                    };
                    for saved in frame.saved {
                        self.restore(saved);
                    }
                    self.pc = frame.ret;
                }
                Op::SetFrom => self.regs.from = self.regs.pos,
                Op::Yield => return Ok(Step::Match(self.boundary()?)),
                Op::YieldExhausted => return Ok(Step::Exhausted),
                Op::LoadStr(s) => self.regs.str = StrReg::Program(s),
                Op::IfStrNe(target) => {
                    if !self.str_at_pos() {
                        self.jump(*target)?;
                    }
                }
                Op::ExtractStr => {
                    let subject = self.subject;
                    let start = position(self.regs.i0)?.min(subject.len());
                    let end = start
                        .saturating_add(position(self.regs.strlen)?)
                        .min(subject.len());
                    self.regs.str = StrReg::Subject(&subject[start..end]);
                }
                Op::IfUncaptured { group, target } => {
                    if self.caps.get(group).map_or(true, |s| s.len() < 2) {
                        self.jump(*target)?;
                    }
                }
                Op::LoadLastCapture { group } => {
                    let stack = self
                        .caps
                        .get(group)
                        .filter(|s| s.len() >= 2)
                        .ok_or_else(|| RuleError::bug(format!("group {} has no capture", group)))?;
                    self.regs.i0 = stack[stack.len() - 2] as i64;
                    self.regs.i1 = stack[stack.len() - 1] as i64;
                }
                Op::IfByteAt {
                    offset,
                    byte,
                    target,
                } => {
                    let at = self.regs.pos + offset;
                    let hit = usize::try_from(at)
                        .ok()
                        .and_then(|i| self.subject.get(i))
                        .map_or(false, |b| b == byte);
                    if hit {
                        self.jump(*target)?;
                    }
                }
                Op::InitCounter { group } => {
                    self.counts.entry(*group).or_insert(0);
                }
                Op::InitCaptures { group } => {
                    self.caps.entry(*group).or_default();
                }
                Op::SaveCount { group } => {
                    let count = self.counts.entry(*group).or_insert(0);
                    self.regs.i1 = *count;
                    *count = 0;
                }
                Op::RestoreCount { group } => {
                    self.counts.insert(*group, self.regs.i1);
                }
                Op::CaptureDepth { group } => {
                    self.regs.i0 = self.caps.get(group).map_or(0, Vec::len) as i64;
                }
                Op::TruncateCaptures { group } => {
                    let depth = position(self.regs.i0)?;
                    if let Some(stack) = self.caps.get_mut(group) {
                        stack.truncate(depth);
                    }
                }
                Op::SelectGroup { group, capture } => {
                    self.regs.gr_rep = Some(*group);
                    if *capture {
                        self.regs.gr_cap = Some(*group);
                    }
                }
                Op::IfCount { cmp, n, target } => {
                    if cmp.eval(*self.count_mut()?, *n as i64) {
                        self.jump(*target)?;
                    }
                }
                Op::IncCount => *self.count_mut()? += 1,
                Op::DecCount => *self.count_mut()? -= 1,
                Op::PushCapture => {
                    let pos = position(self.regs.pos)?;
                    self.capture_stack()?.push(pos);
                }
                Op::PopCapture => {
                    let v = self
                        .capture_stack()?
                        .pop()
                        .ok_or_else(|| RuleError::bug("pop from empty capture stack"))?;
                    self.regs.i0 = v as i64;
                }
            }
        }
    }

    #[inline]
    fn jump(&mut self, label: Label) -> Result<(), RuleError> {
        let block = self
            .program
            .resolve(label)
            .ok_or_else(|| RuleError::bug(format!("undefined label {}", label)))?;
        self.pc = Pc { block, op: 0 };
        Ok(())
    }

    #[inline]
    fn reg(&self, r: Reg) -> i64 {
        match r {
            Reg::Pos => self.regs.pos,
            Reg::Rep => self.regs.rep,
            Reg::MaxRep => self.regs.maxrep,
            Reg::StrLen => self.regs.strlen,
            Reg::I0 => self.regs.i0,
            Reg::I1 => self.regs.i1,
        }
    }

    #[inline]
    fn reg_mut(&mut self, r: Reg) -> &mut i64 {
        match r {
            Reg::Pos => &mut self.regs.pos,
            Reg::Rep => &mut self.regs.rep,
            Reg::MaxRep => &mut self.regs.maxrep,
            Reg::StrLen => &mut self.regs.strlen,
            Reg::I0 => &mut self.regs.i0,
            Reg::I1 => &mut self.regs.i1,
        }
    }

    #[inline]
    fn operand(&self, o: Operand) -> i64 {
        match o {
            Operand::Imm(n) => n,
            Operand::Reg(r) => self.reg(r),
            Operand::Len => self.subject.len() as i64,
            Operand::LastPos => self.lastpos,
        }
    }

    fn save(&self, saves: Saves) -> SmallVec<[Saved<'r, 't>; 4]> {
        saves
            .iter()
            .map(|flag| {
                if flag == Saves::POS {
                    Saved::Pos(self.regs.pos)
                } else if flag == Saves::REP {
                    Saved::Rep(self.regs.rep)
                } else if flag == Saves::MAXREP {
                    Saved::MaxRep(self.regs.maxrep)
                } else if flag == Saves::STR {
                    Saved::Str(self.regs.str)
                } else if flag == Saves::STRLEN {
                    Saved::StrLen(self.regs.strlen)
                } else if flag == Saves::GR_CAP {
                    Saved::GrCap(self.regs.gr_cap)
                } else if flag == Saves::GR_REP {
                    Saved::GrRep(self.regs.gr_rep)
                } else if flag == Saves::I0 {
                    Saved::I0(self.regs.i0)
                } else {
                    Saved::I1(self.regs.i1)
                }
            })
            .collect()
    }

    fn restore(&mut self, saved: Saved<'r, 't>) {
        match saved {
            Saved::Pos(v) => self.regs.pos = v,
            Saved::Rep(v) => self.regs.rep = v,
            Saved::MaxRep(v) => self.regs.maxrep = v,
            Saved::Str(s) => self.regs.str = s,
            Saved::StrLen(v) => self.regs.strlen = v,
            Saved::GrCap(g) => self.regs.gr_cap = g,
            Saved::GrRep(g) => self.regs.gr_rep = g,
            Saved::I0(v) => self.regs.i0 = v,
            Saved::I1(v) => self.regs.i1 = v,
        }
    }

    /// Does the subject hold `str` at `pos`? Out of range compares unequal.
    fn str_at_pos(&self) -> bool {
        let (Ok(pos), Ok(len)) = (
            usize::try_from(self.regs.pos),
            usize::try_from(self.regs.strlen),
        ) else {
            return false;
        };
        pos.checked_add(len)
            .and_then(|end| self.subject.get(pos..end))
            .map_or(false, |s| s == self.regs.str.as_bytes())
    }

    fn count_mut(&mut self) -> Result<&mut i64, RuleError> {
        let key = self
            .regs
            .gr_rep
            .ok_or_else(|| RuleError::bug("no group selected"))?;
        Ok(self.counts.entry(key).or_insert(0))
    }

    fn capture_stack(&mut self) -> Result<&mut Vec<usize>, RuleError> {
        let key = self
            .regs
            .gr_cap
            .ok_or_else(|| RuleError::bug("no capture group selected"))?;
        Ok(self.caps.entry(key).or_default())
    }

    fn boundary(&self) -> Result<MatchBoundary, RuleError> {
        let offsets = self
            .caps
            .iter()
            .filter_map(|(&k, v)| i32::try_from(k).ok().filter(|g| *g >= 0).map(|g| (g, v.clone())))
            .collect();
        let counts = self
            .counts
            .iter()
            .filter_map(|(&k, &c)| {
                let g = i32::try_from(k).ok().filter(|g| *g >= 0)?;
                Some((g, u32::try_from(c).unwrap_or(0)))
            })
            .collect();
        Ok(MatchBoundary {
            start: position(self.regs.from)?,
            end: position(self.regs.pos)?,
            captures: Captures { offsets, counts },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rulecomp::compile_rule;
    use crate::rulenode::{AnchorType, CutType, Node, NodeFactory};

    fn compile(root: &Node) -> Program {
        compile_rule(root, RuleOptions::empty()).unwrap()
    }

    fn all_matches(prog: &Program, subject: &[u8]) -> Vec<(usize, usize)> {
        let mut h = MatchHandle::new(prog, subject);
        let mut out = Vec::new();
        while let Resume::Match(m) = h.resume().unwrap() {
            out.push((m.start, m.end));
        }
        out
    }

    #[test]
    fn literal_scan() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(f.literal(b"ab"), f.pattern_end()));
        assert_eq!(all_matches(&prog, b"xaby"), vec![(1, 3)]);
        assert_eq!(all_matches(&prog, b"abab"), vec![(0, 2), (2, 4)]);
        assert!(all_matches(&prog, b"a").is_empty());
    }

    #[test]
    fn exhaustion_is_sticky() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(f.literal(b"q"), f.pattern_end()));
        let mut h = MatchHandle::new(&prog, b"abc");
        assert_eq!(h.resume().unwrap(), Resume::Exhausted);
        assert!(h.is_exhausted());
        assert_eq!(h.resume().unwrap(), Resume::Exhausted);
    }

    #[test]
    fn resume_at_position_tries_once() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(f.literal(b"b"), f.pattern_end()));
        let mut h = MatchHandle::at(&prog, b"abab", 0);
        assert_eq!(h.resume().unwrap(), Resume::Exhausted);
        let mut h = MatchHandle::at(&prog, b"abab", 3);
        assert_eq!(h.resume().unwrap().into_match().map(|m| m.range()), Some(3..4));
        assert_eq!(h.resume().unwrap(), Resume::Exhausted);
    }

    #[test]
    fn start_past_bound_is_exhausted() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(f.null(), f.pattern_end()));
        let mut h = MatchHandle::with_bounds(&prog, b"abc", Some(3), 2);
        assert!(h.is_exhausted());
        assert_eq!(h.resume().unwrap(), Resume::Exhausted);
    }

    #[test]
    fn end_bound_limits_scan_and_eos() {
        let f = NodeFactory::new();
        let prog = compile(&f.sequence(vec![
            f.any_char(),
            f.anchor(AnchorType::EndString),
            f.pattern_end(),
        ]));
        let mut h = MatchHandle::with_bounds(&prog, b"abcd", None, 2);
        assert_eq!(h.resume().unwrap().into_match().map(|m| m.range()), Some(1..2));
        assert_eq!(h.resume().unwrap(), Resume::Exhausted);
    }

    #[test]
    fn lazy_literal_repetition() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(
            f.literal(b"a").quantified(1, Some(3), false),
            f.pattern_end(),
        ));
        let mut h = MatchHandle::new(&prog, b"aaaa");
        let ends: Vec<usize> = (0..3)
            .map(|_| h.resume().unwrap().into_match().unwrap().end)
            .collect();
        assert_eq!(ends, vec![1, 2, 3]);
    }

    #[test]
    fn greedy_cut_literal_takes_max_only() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(
            f.literal(b"a").quantified(0, None, true).with_cut(),
            f.pattern_end(),
        ));
        let mut h = MatchHandle::new(&prog, b"aa");
        assert_eq!(h.resume().unwrap().into_match().map(|m| m.range()), Some(0..2));
        // No give-back: the next match starts at the next scan position.
        assert_eq!(h.resume().unwrap().into_match().map(|m| m.range()), Some(1..2));
    }

    #[test]
    fn lazy_cut_literal_takes_min_only() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(
            f.literal(b"a").quantified(2, None, false).with_cut(),
            f.pattern_end(),
        ));
        let ranges: Vec<_> = all_matches(&prog, b"aaaa");
        assert_eq!(ranges, vec![(0, 2), (1, 3), (2, 4)]);
    }

    #[test]
    fn alternation_left_first() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(
            f.alt(f.literal(b"a"), f.literal(b"ab")),
            f.pattern_end(),
        ));
        assert_eq!(all_matches(&prog, b"ab"), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn cut_rule_ends_search() {
        let f = NodeFactory::new();
        let prog = compile(&f.sequence(vec![
            f.literal(b"a"),
            f.cut(CutType::Rule),
            f.pattern_end(),
        ]));
        assert!(all_matches(&prog, b"xxa").is_empty());
    }

    #[test]
    fn retry_limit_poisons_handle() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(
            f.any_char().quantified(0, None, true),
            f.literal(b"z"),
        ));
        let subject = [b'a'; 200];
        let mut h = MatchHandle::new(&prog, &subject).retry_limit(50);
        assert_eq!(h.resume(), Err(RuleError::RetryLimitInMatchOver));
        assert_eq!(h.resume(), Err(RuleError::RetryLimitInMatchOver));
    }

    #[test]
    fn zero_width_group_hits_stack_limit() {
        let f = NodeFactory::new();
        let prog = compile(&f.concat(
            f.group(-1, f.null()).quantified(0, None, true),
            f.pattern_end(),
        ));
        let mut h = MatchHandle::new(&prog, b"a").stack_limit(64);
        assert_eq!(h.resume(), Err(RuleError::MatchStackLimitOver));
    }

    #[test]
    fn traced_program_runs() {
        let f = NodeFactory::new();
        let root = f.concat(f.literal(b"b"), f.pattern_end());
        let prog = compile_rule(&root, RuleOptions::TRACE).unwrap();
        assert_eq!(all_matches(&prog, b"abc"), vec![(1, 2)]);
    }

    #[test]
    fn captures_of_nested_alternation() {
        let f = NodeFactory::new();
        let prog = compile(&f.sequence(vec![
            f.group(1, f.alt(f.literal(b"x"), f.literal(b"yy"))),
            f.backref(1),
            f.pattern_end(),
        ]));
        let mut h = MatchHandle::new(&prog, b"ayyyy");
        let m = h.resume().unwrap().into_match().unwrap();
        assert_eq!(m.range(), 1..5);
        assert_eq!(m.captures.group(1), Some(1..3));
        assert_eq!(m.captures.repetitions(1), Some(1));
    }

    #[test]
    fn captures_helpers() {
        let mut c = Captures::default();
        assert!(c.is_empty());
        c.offsets.insert(0, vec![0, 1, 1, 2, 2]);
        assert_eq!(c.spans(0).collect::<Vec<_>>(), vec![0..1, 1..2]);
        assert_eq!(c.group(0), Some(1..2));
        assert_eq!(c.group(3), None);
        assert_eq!(c.offsets(3), &[] as &[usize]);
        assert!(!c.is_empty());
    }
}
