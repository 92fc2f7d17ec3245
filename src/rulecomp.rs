// rulecomp.rs - Rule compiler.
// Converts a rule tree (Node) into a linked block program and its text.
//
// Code generation is continuation passing: every node is generated together
// with the label to continue at once it matched. Choice points are calls; a
// call returns only when everything downstream of it failed. Structure:
// codegen context -> leaf rules -> repeated string matching -> structural
// rules -> anchors and cuts -> driver -> serialization.

use tracing::debug;

use crate::error::RuleError;
use crate::rulebuf::{emit, ProgramBuffer};
use crate::ruleint::*;
use crate::rulelit::{encode_string_literal, encode_string_prefix, format_quant};
use crate::rulenode::{AnchorType, CutType, Node, NodeInner, Quantifier};
use crate::ruletrav::{check_tree, is_bos_anchored};

// ============================================================================
// Codegen context
// ============================================================================

/// Per-compile state. Nothing here outlives one `compile_rule` call.
struct CodeGen {
    done: Vec<Block>,
    cur: Block,
    accept_used: bool,
}

#[inline]
fn imm(n: u32) -> Operand {
    Operand::Imm(n as i64)
}

impl CodeGen {
    fn new() -> Self {
        CodeGen {
            done: Vec::new(),
            cur: Block::new(Label::Start),
            accept_used: false,
        }
    }

    /// Close the current block and open a new one.
    fn label(&mut self, label: Label) {
        let prev = std::mem::replace(&mut self.cur, Block::new(label));
        self.done.push(prev);
    }

    #[inline]
    fn op(&mut self, op: Op) {
        self.cur.ops.push(op);
    }

    fn goto(&mut self, target: Label) {
        self.op(Op::Goto(target));
    }

    fn if_(&mut self, lhs: Reg, cmp: Cmp, rhs: Operand, target: Label) {
        self.op(Op::If {
            lhs,
            cmp,
            rhs,
            target,
        });
    }

    fn if_count(&mut self, cmp: Cmp, n: u32, target: Label) {
        self.op(Op::IfCount { cmp, n, target });
    }

    /// Call `target` with `saves` preserved; a group-scope failure coming back
    /// out of the call keeps propagating.
    fn call_sub(&mut self, target: Label, saves: Saves) {
        self.op(Op::Call { target, saves });
        self.op(Op::IfGroupCut(Label::FailGroup));
    }

    fn trace(&mut self, mut msg: Vec<u8>) {
        msg.truncate(TRACE_MESSAGE_MAX_LEN);
        self.op(Op::Trace(msg.into_boxed_slice()));
    }

    /// Label of a success continuation. The root's continuation is null and
    /// lands on the shared accept block.
    fn resolve(&mut self, succ: Option<Label>) -> Label {
        match succ {
            Some(label) => label,
            None => {
                self.accept_used = true;
                Label::Accept
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.done.push(self.cur);
        self.done
    }

    // ========================================================================
    // Dispatcher
    // ========================================================================

    fn generate(&mut self, node: &Node, succ: Option<Label>) {
        self.label(Label::Node(node.id));
        match &node.inner {
            NodeInner::Null => {
                let succ = self.resolve(succ);
                self.goto(succ);
            }
            NodeInner::PatternEnd => self.gen_pattern_end(),
            NodeInner::AnyChar => self.gen_any_char(node, succ),
            NodeInner::Literal(s) => self.gen_literal(node, s, succ),
            NodeInner::BackRef { group } => self.gen_backref(node, *group, succ),
            NodeInner::Concat(left, right) => self.gen_concat(left, right, succ),
            NodeInner::Group { group, body } => self.gen_group(node, *group, body, succ),
            NodeInner::Alt(left, right) => self.gen_alt(left, right, succ),
            NodeInner::Anchor(anchor) => self.gen_anchor(*anchor, succ),
            NodeInner::Cut(cut) => self.gen_cut(*cut, succ),
        }
    }

    // ========================================================================
    // Leaf rules
    // ========================================================================

    fn gen_pattern_end(&mut self) {
        self.trace(b"eop".to_vec());
        self.op(Op::Yield);
        self.goto(Label::Fail);
    }

    fn gen_any_char(&mut self, node: &Node, succ: Option<Label>) {
        let id = node.id;
        let q = node.quant;
        self.trace(format!("dot {}", format_quant(&q)).into_bytes());

        self.op(Op::Set(Reg::MaxRep, Operand::Len));
        self.op(Op::Sub(Reg::MaxRep, Operand::Reg(Reg::Pos)));
        if q.min > 0 {
            self.if_(Reg::MaxRep, Cmp::Lt, imm(q.min), Label::Fail);
        }
        let succ = self.resolve(succ);
        if q.is_fixed() {
            self.op(Op::Add(Reg::Pos, imm(q.min)));
            self.goto(succ);
            return;
        }
        if let Some(max) = q.max {
            self.if_(Reg::MaxRep, Cmp::Le, imm(max), Label::Local(id, 1));
            self.op(Op::Set(Reg::MaxRep, imm(max)));
            self.label(Label::Local(id, 1));
        }

        if q.greedy {
            self.op(Op::Set(Reg::Rep, Operand::Reg(Reg::MaxRep)));
            self.op(Op::Add(Reg::Pos, Operand::Reg(Reg::Rep)));
            self.label(Label::Local(id, 2));
            self.if_(Reg::Rep, Cmp::Lt, imm(q.min), Label::Fail);
            if node.cut {
                self.goto(succ);
                return;
            }
            self.if_(Reg::Rep, Cmp::Eq, imm(q.min), succ);
            self.call_sub(succ, Saves::POS | Saves::REP);
            self.op(Op::Sub(Reg::Rep, Operand::Imm(1)));
            self.op(Op::Sub(Reg::Pos, Operand::Imm(1)));
            self.goto(Label::Local(id, 2));
        } else {
            self.op(Op::Set(Reg::Rep, imm(q.min)));
            if q.min > 0 {
                self.op(Op::Add(Reg::Pos, imm(q.min)));
            }
            self.label(Label::Local(id, 3));
            self.if_(Reg::Rep, Cmp::Gt, Operand::Reg(Reg::MaxRep), Label::Fail);
            if node.cut {
                self.goto(succ);
                return;
            }
            self.if_(Reg::Rep, Cmp::Eq, Operand::Reg(Reg::MaxRep), succ);
            self.call_sub(succ, Saves::POS | Saves::REP | Saves::MAXREP);
            self.op(Op::Add(Reg::Rep, Operand::Imm(1)));
            self.op(Op::Add(Reg::Pos, Operand::Imm(1)));
            self.goto(Label::Local(id, 3));
        }
    }

    fn gen_literal(&mut self, node: &Node, s: &[u8], succ: Option<Label>) {
        let mut msg = encode_string_prefix(s, TRACE_LITERAL_MAX_LEN);
        msg.push(b' ');
        msg.extend_from_slice(format_quant(&node.quant).as_bytes());
        self.trace(msg);

        if s.is_empty() {
            // Zero width; repeating it would never advance.
            let succ = self.resolve(succ);
            self.goto(succ);
            return;
        }
        self.op(Op::LoadStr(s.into()));
        self.op(Op::Set(Reg::StrLen, Operand::Imm(s.len() as i64)));
        self.gen_string(node, succ);
    }

    /// A reference to a group that never captured, or whose last capture is
    /// empty or inverted, matches the empty string.
    fn gen_backref(&mut self, node: &Node, group: i32, succ: Option<Label>) {
        let key = group_key(group, node.id);
        self.trace(format!("backref ${} {}", group, format_quant(&node.quant)).into_bytes());

        let succ_label = self.resolve(succ);
        self.op(Op::IfUncaptured {
            group: key,
            target: succ_label,
        });
        self.op(Op::LoadLastCapture { group: key });
        self.if_(Reg::I0, Cmp::Ge, Operand::Reg(Reg::I1), succ_label);
        self.op(Op::Set(Reg::StrLen, Operand::Reg(Reg::I1)));
        self.op(Op::Sub(Reg::StrLen, Operand::Reg(Reg::I0)));
        self.op(Op::ExtractStr);
        self.gen_string(node, succ);
    }

    // ========================================================================
    // Repeated string matching
    // ========================================================================

    /// Match `str` (length `strlen`) repeatedly per the node's quantifier.
    /// `str` does not change while the repetition runs.
    fn gen_string(&mut self, node: &Node, succ: Option<Label>) {
        let id = node.id;
        let Quantifier { min, max, greedy } = node.quant;
        let succ = self.resolve(succ);

        if node.quant.is_once() {
            self.op(Op::IfStrNe(Label::Fail));
            self.op(Op::Add(Reg::Pos, Operand::Reg(Reg::StrLen)));
            self.goto(succ);
            return;
        }

        self.op(Op::Set(Reg::Rep, Operand::Imm(0)));
        self.label(Label::Local(id, 1));
        if greedy {
            if let Some(max) = max {
                self.if_(Reg::Rep, Cmp::Ge, imm(max), Label::Local(id, 2));
            }
            self.op(Op::IfStrNe(Label::Local(id, 2)));
            self.op(Op::Add(Reg::Rep, Operand::Imm(1)));
            self.op(Op::Add(Reg::Pos, Operand::Reg(Reg::StrLen)));
            self.goto(Label::Local(id, 1));

            self.label(Label::Local(id, 2));
            if min > 0 {
                self.if_(Reg::Rep, Cmp::Lt, imm(min), Label::Fail);
            }
            if node.cut {
                self.goto(succ);
                return;
            }
            self.if_(Reg::Rep, Cmp::Eq, imm(min), succ);
            self.call_sub(succ, Saves::POS | Saves::REP | Saves::STRLEN);
            self.op(Op::Sub(Reg::Rep, Operand::Imm(1)));
            self.op(Op::Sub(Reg::Pos, Operand::Reg(Reg::StrLen)));
            self.goto(Label::Local(id, 2));
        } else {
            if min > 0 {
                self.if_(Reg::Rep, Cmp::Lt, imm(min), Label::Local(id, 2));
            }
            if node.cut {
                self.goto(succ);
            } else {
                if let Some(max) = max {
                    self.if_(Reg::Rep, Cmp::Eq, imm(max), succ);
                }
                self.call_sub(succ, Saves::POS | Saves::REP | Saves::STR | Saves::STRLEN);
            }
            // Still needed under cut: it consumes the first `min` repeats.
            self.label(Label::Local(id, 2));
            self.op(Op::IfStrNe(Label::Fail));
            self.op(Op::Add(Reg::Rep, Operand::Imm(1)));
            self.op(Op::Add(Reg::Pos, Operand::Reg(Reg::StrLen)));
            self.goto(Label::Local(id, 1));
        }
    }

    // ========================================================================
    // Structural rules
    // ========================================================================

    fn gen_concat(&mut self, left: &Node, right: &Node, succ: Option<Label>) {
        self.op(Op::Comment(
            format!("concat R{}, R{}", left.id, right.id).into_bytes().into(),
        ));
        self.generate(left, Some(Label::Node(right.id)));
        self.generate(right, succ);
    }

    // Init calls Repeat once with the counter zeroed and restores the
    // enclosing value afterwards. Repeat runs after every completed body
    // match; it closes the capture and decides between another repetition
    // and the continuation. A group-scope failure from inside the group is
    // absorbed by Init: the call there does not check the cut flag.
    fn gen_group(&mut self, node: &Node, group: i32, body: &Node, succ: Option<Label>) {
        let id = node.id;
        let q = node.quant;
        let capture = group >= 0;
        let key = group_key(group, id);
        let (open, close) = if capture { ('(', ')') } else { ('[', ']') };
        self.trace(
            format!(
                "group \"{}\" {} R{} {} {}",
                group,
                open,
                body.id,
                close,
                format_quant(&q)
            )
            .into_bytes(),
        );

        if q.is_once() && !capture {
            self.generate(body, succ);
            return;
        }

        // Init. A group-scope failure skips the pops inside Repeat, so the
        // capture stack is cut back to its depth at entry.
        let mut init_saves = Saves::POS | Saves::GR_REP | Saves::I1;
        self.op(Op::InitCounter { group: key });
        if capture {
            self.op(Op::InitCaptures { group: key });
            self.op(Op::CaptureDepth { group: key });
            init_saves |= Saves::I0;
        }
        self.op(Op::SaveCount { group: key });
        self.op(Op::Call {
            target: Label::Repeat(id),
            saves: init_saves,
        });
        self.op(Op::RestoreCount { group: key });
        if capture {
            self.op(Op::TruncateCaptures { group: key });
        }
        self.goto(Label::Fail);

        // Repeat
        self.label(Label::Repeat(id));
        self.op(Op::SelectGroup {
            group: key,
            capture,
        });
        if capture {
            // Close the repetition that just completed.
            self.if_count(Cmp::Lt, 1, Label::RepeatLocal(id, 1));
            self.op(Op::PushCapture);
        }
        self.label(Label::RepeatLocal(id, 1));

        let succ = self.resolve(succ);
        let saves = Saves::POS | Saves::GR_CAP | Saves::GR_REP;
        if q.greedy {
            if let Some(max) = q.max {
                self.if_count(Cmp::Ge, max, Label::RepeatLocal(id, 2));
            }
            self.gen_group_more(body, capture, saves);
            self.label(Label::RepeatLocal(id, 2));
            if q.min > 0 {
                self.if_count(Cmp::Lt, q.min, Label::RepeatFail(id));
            }
            self.call_sub(succ, saves);
        } else {
            if q.min > 0 {
                self.if_count(Cmp::Lt, q.min, Label::RepeatLocal(id, 3));
            }
            self.call_sub(succ, saves);
            self.label(Label::RepeatLocal(id, 3));
            if let Some(max) = q.max {
                self.if_count(Cmp::Ge, max, Label::RepeatFail(id));
            }
            self.gen_group_more(body, capture, saves);
        }

        // Fail
        self.label(Label::RepeatFail(id));
        self.if_count(Cmp::Lt, 1, Label::Fail);
        if capture {
            self.op(Op::PopCapture);
        }
        self.goto(if node.cut { Label::FailGroup } else { Label::Fail });

        self.generate(body, Some(Label::Repeat(id)));
    }

    /// Try one more repetition of the group body, undoing it on return.
    fn gen_group_more(&mut self, body: &Node, capture: bool, saves: Saves) {
        self.op(Op::IncCount);
        if capture {
            self.op(Op::PushCapture);
        }
        self.call_sub(Label::Node(body.id), saves);
        if capture {
            self.op(Op::PopCapture);
        }
        self.op(Op::DecCount);
    }

    fn gen_alt(&mut self, left: &Node, right: &Node, succ: Option<Label>) {
        self.trace(format!("alt R{} | R{}", left.id, right.id).into_bytes());
        self.call_sub(Label::Node(left.id), Saves::POS);
        self.goto(Label::Node(right.id));
        self.generate(left, succ);
        self.generate(right, succ);
    }

    // ========================================================================
    // Anchors and cuts
    // ========================================================================

    fn gen_anchor(&mut self, anchor: AnchorType, succ: Option<Label>) {
        let succ = self.resolve(succ);
        match anchor {
            AnchorType::BeginString => {
                self.trace(b"^anchor".to_vec());
                self.if_(Reg::Pos, Cmp::Ne, Operand::Imm(0), Label::Fail);
                self.goto(succ);
            }
            AnchorType::EndString => {
                self.trace(b"anchor$".to_vec());
                self.if_(Reg::Pos, Cmp::Ne, Operand::LastPos, Label::Fail);
                self.goto(succ);
            }
            AnchorType::BeginLine => {
                self.trace(b"^^anchor".to_vec());
                self.if_(Reg::Pos, Cmp::Eq, Operand::Imm(0), succ);
                self.op(Op::IfByteAt {
                    offset: -1,
                    byte: b'\n',
                    target: succ,
                });
                self.goto(Label::Fail);
            }
            AnchorType::EndLine => {
                self.trace(b"anchor$$".to_vec());
                self.if_(Reg::Pos, Cmp::Eq, Operand::LastPos, succ);
                self.op(Op::IfByteAt {
                    offset: 0,
                    byte: b'\n',
                    target: succ,
                });
                self.op(Op::IfByteAt {
                    offset: -1,
                    byte: b'\n',
                    target: succ,
                });
                self.goto(Label::Fail);
            }
        }
    }

    fn gen_cut(&mut self, cut: CutType, succ: Option<Label>) {
        match cut {
            CutType::Alt => {
                self.trace(b"::cut alt".to_vec());
                let succ = self.resolve(succ);
                self.call_sub(succ, Saves::empty());
                self.goto(Label::FailGroup);
            }
            CutType::Rule => {
                self.trace(b"::cut rule".to_vec());
                self.op(Op::YieldExhausted);
                self.goto(Label::Fail);
            }
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Compile a rule tree into a linked program.
///
/// The same tree and options always produce the same program text.
///
/// ```
/// use ferrule::rulecomp::compile_rule;
/// use ferrule::ruleint::RuleOptions;
/// use ferrule::rulenode::NodeFactory;
///
/// let f = NodeFactory::new();
/// let root = f.concat(f.literal(b"ab"), f.pattern_end());
/// let prog = compile_rule(&root, RuleOptions::empty()).unwrap();
/// let text = String::from_utf8_lossy(prog.text());
/// assert!(text.contains("  R0:\n"));
/// assert!(text.contains("    str = \"ab\"\n"));
/// ```
pub fn compile_rule(root: &Node, options: RuleOptions) -> Result<Program, RuleError> {
    check_tree(root)?;
    let anchored = is_bos_anchored(root);
    let root_label = Label::Node(root.id);

    let mut cg = CodeGen::new();

    // Search procedure. A non-negative start position asks for a single
    // attempt at that position.
    cg.if_(Reg::Pos, Cmp::Ge, Operand::Imm(0), Label::TryOnceAtPos);
    cg.op(Op::Set(Reg::Pos, Operand::Imm(0)));
    if !anchored {
        cg.label(Label::TryMatch);
        cg.if_(Reg::Pos, Cmp::Gt, Operand::LastPos, Label::FailForever);
        cg.op(Op::SetFrom);
        cg.call_sub(root_label, Saves::POS);
        cg.op(Op::Add(Reg::Pos, Operand::Imm(1)));
        cg.goto(Label::TryMatch);
    }
    cg.label(Label::TryOnceAtPos);
    cg.op(Op::SetFrom);
    cg.call_sub(root_label, Saves::empty());
    cg.label(Label::FailForever);
    cg.op(Op::YieldExhausted);
    cg.goto(Label::FailForever);

    cg.generate(root, None);

    cg.label(Label::FailGroup);
    cg.trace(b"fail_group".to_vec());
    cg.op(Op::Ret { group_cut: true });
    cg.label(Label::Fail);
    cg.trace(b"fail".to_vec());
    cg.op(Op::Ret { group_cut: false });
    if cg.accept_used {
        cg.label(Label::Accept);
        cg.op(Op::Yield);
        cg.goto(Label::Fail);
    }

    let mut program = Program::link(cg.finish(), options)?;
    program.text = serialize(&program)?;

    debug!(
        root = root.id,
        blocks = program.blocks.len(),
        text_len = program.text.len(),
        anchored,
        traced = program.is_traced(),
        "compiled rule"
    );
    Ok(program)
}

// ============================================================================
// Serialization
// ============================================================================

const TRACE_MACRO: &str = "\
.macro trace(POS, LABEL)
    $S31 = repeat ' ', .POS
    print $S31
    print .LABEL
    print \"\\n\"
.endm

";

const ENTRY_SUB: &str = "\
.sub _rule
    .param string target
    .local pmc match
    .local pmc rulecor
    .local pmc newmeth
    newsub rulecor, .Coroutine, _rule_cor
    find_global newmeth, \"Rule::Match\", \"new\"
    match = newmeth(target, rulecor)
    match.\"_next\"()
    .return(match)
.end

";

const COR_PROLOGUE: &str = "\
.sub _rule_cor
    .param pmc match
    .param string target
    .param int pos
    .param int lastpos
    .local int rep
    .local int maxrep
    .local pmc gr_rep
    .local pmc gr_cap
    .local int cutgrp
    .local string str
    .local int strlen
    .local int from
";

fn serialize(program: &Program) -> Result<Vec<u8>, RuleError> {
    let traced = program.is_traced();
    let mut buf = ProgramBuffer::new();
    if traced {
        buf.emit_str(TRACE_MACRO)?;
    }
    buf.emit_str(ENTRY_SUB)?;
    buf.emit_str(COR_PROLOGUE)?;

    for block in program.blocks() {
        if let Label::Node(_) = block.label {
            buf.checkpoint_line_marker()?;
        }
        emit!(buf, "  {}:\n", block.label)?;
        for op in &block.ops {
            emit_op(&mut buf, op, traced)?;
        }
        if block.ops.last().map_or(false, Op::is_terminator) {
            buf.emit_str("\n")?;
        }
    }
    buf.emit_str(".end\n")?;
    Ok(buf.into_bytes())
}

fn emit_op(buf: &mut ProgramBuffer, op: &Op, traced: bool) -> Result<(), RuleError> {
    match op {
        Op::Comment(s) => {
            buf.emit_str("    #")?;
            buf.emit(s)?;
            buf.emit_str("\n")
        }
        Op::Trace(s) => {
            buf.emit_str("    # ")?;
            buf.emit(s)?;
            buf.emit_str("\n")?;
            if traced {
                buf.emit_str("    .trace(pos, '")?;
                buf.emit(s)?;
                buf.emit_str("')\n")?;
            }
            Ok(())
        }
        Op::Set(r, o) => emit!(buf, "    {} = {}\n", r, o),
        Op::Add(r, Operand::Imm(1)) => emit!(buf, "    inc {}\n", r),
        Op::Add(r, o) => emit!(buf, "    {} += {}\n", r, o),
        Op::Sub(r, Operand::Imm(1)) => emit!(buf, "    dec {}\n", r),
        Op::Sub(r, o) => emit!(buf, "    {} -= {}\n", r, o),
        Op::If {
            lhs,
            cmp,
            rhs,
            target,
        } => emit!(buf, "    if {} {} {} goto {}\n", lhs, cmp.as_str(), rhs, target),
        Op::Goto(target) => emit!(buf, "    goto {}\n", target),
        Op::Call { target, saves } => {
            let names: Vec<&str> = saves.iter().map(Saves::register_name).collect();
            for name in &names {
                emit!(buf, "    save {}\n", name)?;
            }
            emit!(buf, "    bsr {}\n", target)?;
            for name in names.iter().rev() {
                emit!(buf, "    restore {}\n", name)?;
            }
            Ok(())
        }
        Op::IfGroupCut(target) => emit!(buf, "    if cutgrp goto {}\n", target),
        Op::Ret { group_cut } => emit!(buf, "    cutgrp = {}\n    ret\n", *group_cut as u8),
        Op::SetFrom => buf.emit_str("    from = pos\n"),
        Op::Yield => buf.emit_str("    .yield(pos)\n"),
        Op::YieldExhausted => buf.emit_str("    .yield(-2)\n"),
        Op::LoadStr(s) => {
            buf.emit_str("    str = ")?;
            buf.emit(&encode_string_literal(s))?;
            buf.emit_str("\n")
        }
        Op::IfStrNe(target) => emit!(
            buf,
            "    substr $S0, target, pos, strlen\n    if $S0 != str goto {}\n",
            target
        ),
        Op::ExtractStr => buf.emit_str("    substr str, target, $I0, strlen\n"),
        Op::IfUncaptured { group, target } => emit!(
            buf,
            "    $P1 = match.\"_cap\"(\"{}\")\n    $I0 = elements $P1\n    if $I0 < 2 goto {}\n",
            group,
            target
        ),
        Op::LoadLastCapture { group } => emit!(
            buf,
            "    $P1 = match.\"_cap\"(\"{}\")\n    $I0 = $P1[-2]\n    $I1 = $P1[-1]\n",
            group
        ),
        Op::IfByteAt {
            offset,
            byte,
            target,
        } => {
            match offset.signum() {
                0 => buf.emit_str("    substr $S0, target, pos, 1\n")?,
                -1 => emit!(buf, "    $I0 = pos - {}\n    substr $S0, target, $I0, 1\n", -offset)?,
                _ => emit!(buf, "    $I0 = pos + {}\n    substr $S0, target, $I0, 1\n", offset)?,
            }
            buf.emit_str("    if $S0 == ")?;
            buf.emit(&encode_string_literal(&[*byte]))?;
            emit!(buf, " goto {}\n", target)
        }
        Op::InitCounter { group } => emit!(buf, "    match.\"_init_rep\"(\"{}\")\n", group),
        Op::InitCaptures { group } => emit!(buf, "    match.\"_init_cap\"(\"{}\")\n", group),
        Op::SaveCount { group } => emit!(
            buf,
            "    $P1 = match.\"_rep\"(\"{}\")\n    $I1 = $P1\n    $P1 = 0\n",
            group
        ),
        Op::RestoreCount { group } => emit!(
            buf,
            "    $P1 = match.\"_rep\"(\"{}\")\n    $P1 = $I1\n",
            group
        ),
        Op::CaptureDepth { group } => emit!(
            buf,
            "    $P1 = match.\"_cap\"(\"{}\")\n    $I0 = elements $P1\n",
            group
        ),
        Op::TruncateCaptures { group } => emit!(
            buf,
            "    $P1 = match.\"_cap\"(\"{}\")\n    $P1 = $I0\n",
            group
        ),
        Op::SelectGroup { group, capture } => {
            emit!(buf, "    gr_rep = match.\"_rep\"(\"{}\")\n", group)?;
            if *capture {
                emit!(buf, "    gr_cap = match.\"_cap\"(\"{}\")\n", group)?;
            }
            Ok(())
        }
        Op::IfCount { cmp, n, target } => {
            emit!(buf, "    if gr_rep {} {} goto {}\n", cmp.as_str(), n, target)
        }
        Op::IncCount => buf.emit_str("    inc gr_rep\n"),
        Op::DecCount => buf.emit_str("    dec gr_rep\n"),
        Op::PushCapture => buf.emit_str("    push gr_cap, pos\n"),
        Op::PopCapture => buf.emit_str("    $I0 = pop gr_cap\n"),
    }
}
