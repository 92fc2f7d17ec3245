// ruleint.rs - Internal types of the block program.
// Registers, operands, ops, labels, blocks and the linked Program.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

use crate::error::RuleError;
use crate::rulenode::NodeId;

// === Config Constants ===
pub const DEFAULT_NEST_DEPTH_LIMIT: u32 = 4096;
pub const INIT_MATCH_STACK_SIZE: usize = 64;
pub const DEFAULT_MATCH_STACK_LIMIT: u32 = 1 << 20;
pub const DEFAULT_RETRY_LIMIT_IN_MATCH: u64 = 10_000_000;
/// Longest trace message; longer ones are truncated.
pub const TRACE_MESSAGE_MAX_LEN: usize = 79;
/// Prefix of a literal shown in its trace message.
pub const TRACE_LITERAL_MAX_LEN: usize = 16;

bitflags! {
    /// Compile options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RuleOptions: u32 {
        /// Emit trace calls into the program text and trace events in the VM.
        const TRACE = 1 << 0;
    }
}

bitflags! {
    /// Registers preserved across a subroutine call. Iteration order is the
    /// order they are saved in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Saves: u16 {
        const POS    = 1 << 0;
        const REP    = 1 << 1;
        const MAXREP = 1 << 2;
        const STR    = 1 << 3;
        const STRLEN = 1 << 4;
        const GR_CAP = 1 << 5;
        const GR_REP = 1 << 6;
        const I0     = 1 << 7;
        const I1     = 1 << 8;
    }
}

impl Saves {
    /// Register name in the program text.
    pub fn register_name(self) -> &'static str {
        const NAMES: [(Saves, &str); 9] = [
            (Saves::POS, "pos"),
            (Saves::REP, "rep"),
            (Saves::MAXREP, "maxrep"),
            (Saves::STR, "str"),
            (Saves::STRLEN, "strlen"),
            (Saves::GR_CAP, "gr_cap"),
            (Saves::GR_REP, "gr_rep"),
            (Saves::I0, "$I0"),
            (Saves::I1, "$I1"),
        ];
        NAMES
            .iter()
            .find(|(flag, _)| *flag == self)
            .map_or("?", |(_, name)| name)
    }
}

// === Registers and Operands ===

/// Integer registers of the match state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    Pos,
    Rep,
    MaxRep,
    StrLen,
    I0,
    I1,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reg::Pos => "pos",
            Reg::Rep => "rep",
            Reg::MaxRep => "maxrep",
            Reg::StrLen => "strlen",
            Reg::I0 => "$I0",
            Reg::I1 => "$I1",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Imm(i64),
    Reg(Reg),
    /// Length of the whole subject.
    Len,
    /// Last valid scan position (the end bound).
    LastPos,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(n) => write!(f, "{}", n),
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Len => f.write_str("length target"),
            Operand::LastPos => f.write_str("lastpos"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    #[inline]
    pub fn eval(self, a: i64, b: i64) -> bool {
        match self {
            Cmp::Eq => a == b,
            Cmp::Ne => a != b,
            Cmp::Lt => a < b,
            Cmp::Le => a <= b,
            Cmp::Gt => a > b,
            Cmp::Ge => a >= b,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cmp::Eq => "==",
            Cmp::Ne => "!=",
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
        }
    }
}

/// Key of a group's repetition counter and capture stack. Capturing groups use
/// their group number; every non-capturing group gets its own negative key.
pub type GroupKey = i64;

pub fn group_key(group: i32, id: NodeId) -> GroupKey {
    if group >= 0 {
        group as GroupKey
    } else {
        -1 - id as GroupKey
    }
}

// === Labels ===

/// Block label. Every label is derived from node identity or names one of the
/// shared driver blocks, so two distinct labels never render the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Start,
    /// Primary block of a node: `R<id>`.
    Node(NodeId),
    /// Auxiliary block: `R<id>_<n>`.
    Local(NodeId, u8),
    /// Group repeat block: `R<id>_repeat`.
    Repeat(NodeId),
    /// `R<id>_repeat_<n>`.
    RepeatLocal(NodeId, u8),
    /// `R<id>_repeat_fail`.
    RepeatFail(NodeId),
    TryMatch,
    TryOnceAtPos,
    FailForever,
    FailGroup,
    Fail,
    Accept,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Label::Start => f.write_str("start"),
            Label::Node(id) => write!(f, "R{}", id),
            Label::Local(id, n) => write!(f, "R{}_{}", id, n),
            Label::Repeat(id) => write!(f, "R{}_repeat", id),
            Label::RepeatLocal(id, n) => write!(f, "R{}_repeat_{}", id, n),
            Label::RepeatFail(id) => write!(f, "R{}_repeat_fail", id),
            Label::TryMatch => f.write_str("try_match"),
            Label::TryOnceAtPos => f.write_str("try_once_at_pos"),
            Label::FailForever => f.write_str("fail_forever"),
            Label::FailGroup => f.write_str("fail_group"),
            Label::Fail => f.write_str("fail"),
            Label::Accept => f.write_str("accept"),
        }
    }
}

// === Operations ===

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Text-only annotation.
    Comment(Box<[u8]>),
    /// Annotation that also becomes a trace point in traced programs.
    Trace(Box<[u8]>),
    Set(Reg, Operand),
    Add(Reg, Operand),
    Sub(Reg, Operand),
    If {
        lhs: Reg,
        cmp: Cmp,
        rhs: Operand,
        target: Label,
    },
    Goto(Label),
    /// Save `saves`, run `target` until it returns, restore `saves`.
    Call { target: Label, saves: Saves },
    /// Jump when the last returning call failed at group scope.
    IfGroupCut(Label),
    /// Return to the most recent call, setting the group-cut flag.
    Ret { group_cut: bool },
    /// Record `pos` as the start of the current attempt.
    SetFrom,
    /// Suspend with a match ending at `pos`.
    Yield,
    /// Report permanent exhaustion.
    YieldExhausted,
    LoadStr(Box<[u8]>),
    /// Jump unless the subject holds `str` at `pos`.
    IfStrNe(Label),
    /// `str = subject[$I0 .. $I0 + strlen]`.
    ExtractStr,
    /// Jump when the group has no complete capture.
    IfUncaptured { group: GroupKey, target: Label },
    /// `$I0, $I1` = the group's most recent capture boundaries.
    LoadLastCapture { group: GroupKey },
    /// Jump when the subject byte at `pos + offset` equals `byte`.
    IfByteAt { offset: i64, byte: u8, target: Label },
    /// Create the group's counter unless it exists.
    InitCounter { group: GroupKey },
    /// Create the group's capture stack unless it exists.
    InitCaptures { group: GroupKey },
    /// `$I1 = count; count = 0`.
    SaveCount { group: GroupKey },
    /// `count = $I1`.
    RestoreCount { group: GroupKey },
    /// `$I0` = number of boundaries on the group's capture stack.
    CaptureDepth { group: GroupKey },
    /// Drop capture boundaries above depth `$I0`.
    TruncateCaptures { group: GroupKey },
    /// Point `gr_rep` (and `gr_cap`) at the group's tables.
    SelectGroup { group: GroupKey, capture: bool },
    IfCount { cmp: Cmp, n: u32, target: Label },
    IncCount,
    DecCount,
    PushCapture,
    PopCapture,
}

impl Op {
    /// Labels this op may transfer control to.
    pub fn target(&self) -> Option<Label> {
        match *self {
            Op::If { target, .. }
            | Op::Goto(target)
            | Op::Call { target, .. }
            | Op::IfGroupCut(target)
            | Op::IfStrNe(target)
            | Op::IfUncaptured { target, .. }
            | Op::IfByteAt { target, .. }
            | Op::IfCount { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Ops after which control never falls through.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Op::Goto(_) | Op::Ret { .. })
    }
}

// === Blocks and Program ===

#[derive(Clone, Debug)]
pub struct Block {
    pub label: Label,
    pub ops: Vec<Op>,
}

impl Block {
    pub fn new(label: Label) -> Self {
        Block {
            label,
            ops: Vec::new(),
        }
    }
}

/// A linked block program. Control falls from the end of one block into the
/// next, exactly like the serialized text reads.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) blocks: Vec<Block>,
    pub(crate) labels: HashMap<Label, usize>,
    pub(crate) options: RuleOptions,
    pub(crate) text: Vec<u8>,
}

impl Program {
    /// Build the label table and check that every referenced label is
    /// defined exactly once.
    pub(crate) fn link(blocks: Vec<Block>, options: RuleOptions) -> Result<Program, RuleError> {
        let mut labels = HashMap::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            if labels.insert(block.label, i).is_some() {
                return Err(RuleError::bug(format!("duplicate label {}", block.label)));
            }
        }
        for op in blocks.iter().flat_map(|b| b.ops.iter()) {
            if let Some(target) = op.target() {
                if !labels.contains_key(&target) {
                    return Err(RuleError::bug(format!("undefined label {}", target)));
                }
            }
        }
        Ok(Program {
            blocks,
            labels,
            options,
            text: Vec::new(),
        })
    }

    /// Index of the block carrying `label`.
    #[inline]
    pub fn resolve(&self, label: Label) -> Option<usize> {
        self.labels.get(&label).copied()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, label: Label) -> Option<&Block> {
        self.resolve(label).map(|i| &self.blocks[i])
    }

    /// The serialized program text.
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn options(&self) -> RuleOptions {
        self.options
    }

    pub fn is_traced(&self) -> bool {
        self.options.contains(RuleOptions::TRACE)
    }
}
