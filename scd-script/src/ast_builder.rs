//! Folds the flat opcode stream of a [`crate::reader::read_script`] pass into a [`ScriptAst`].

use log::trace;

use crate::ast::{
    AstNode, BasicBlock, CaseNode, ElseBranch, IfNode, ScriptAst, ScriptNode, SubroutineNode,
    SwitchNode,
};
use crate::constants::constant_table;
use crate::instruction::{Instruction, Op};
use crate::reader::ScriptVisitor;
use crate::version::{BioVersion, ScriptKind};

struct IfFrame {
    if_op: Instruction,
    conditions: Vec<Instruction>,
    if_block: Vec<AstNode>,
    else_op: Option<Instruction>,
    else_block: Vec<AstNode>,
}

impl IfFrame {
    /// First offset past the else block.
    fn else_end(&self) -> Option<u32> {
        match &self.else_op {
            Some(Instruction {
                offset,
                op: Op::Else { block_len, .. },
                ..
            }) => Some(offset + *block_len as u32),
            _ => None,
        }
    }

    fn finish(self, end_if: Option<Instruction>) -> AstNode {
        let else_block = self.else_block;
        AstNode::If(IfNode {
            if_op: self.if_op,
            conditions: self.conditions,
            if_block: BasicBlock::new(self.if_block),
            else_branch: self.else_op.map(|else_op| ElseBranch {
                else_op,
                block: BasicBlock::new(else_block),
            }),
            end_if,
        })
    }
}

struct SwitchFrame {
    switch_op: Instruction,
    /// Statements seen before the first arm; emitted ahead of the switch.
    prologue: Vec<AstNode>,
    cases: Vec<CaseNode>,
}

enum Frame {
    If(IfFrame),
    Switch(SwitchFrame),
}

/// [`ScriptVisitor`] that builds one [`ScriptNode`] per script kind.
///
/// One builder handles the scripts of one room; call [`ScriptAstBuilder::into_ast`] when done.
pub struct ScriptAstBuilder {
    version: BioVersion,
    ast: ScriptAst,
    subroutines: Vec<SubroutineNode>,
    frames: Vec<Frame>,
    root: Vec<AstNode>,
    ended: bool,
}

impl Default for ScriptAstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptAstBuilder {
    pub fn new() -> Self {
        ScriptAstBuilder {
            version: BioVersion::Biohazard2,
            ast: ScriptAst::default(),
            subroutines: Vec::new(),
            frames: Vec::new(),
            root: Vec::new(),
            ended: false,
        }
    }

    pub fn ast(&self) -> &ScriptAst {
        &self.ast
    }

    pub fn into_ast(self) -> ScriptAst {
        self.ast
    }

    fn current_block(&mut self) -> &mut Vec<AstNode> {
        match self.frames.last_mut() {
            Some(Frame::If(frame)) => {
                if frame.else_op.is_some() {
                    &mut frame.else_block
                } else {
                    &mut frame.if_block
                }
            }
            Some(Frame::Switch(frame)) => match frame.cases.last_mut() {
                Some(case) => &mut case.block.statements,
                None => &mut frame.prologue,
            },
            None => &mut self.root,
        }
    }

    /// True while the current block ends in a `while` or `do ... while` opcode followed only by
    /// conditions. Those conditions belong to the loop and stay in the block.
    fn in_loop_header(&mut self) -> bool {
        let table = constant_table(self.version);
        let header = self.current_block().iter().rev().find(|node| match node {
            AstNode::Opcode(inst) => !table.is_condition(inst.opcode),
            _ => true,
        });
        matches!(
            header,
            Some(AstNode::Opcode(Instruction {
                op: Op::While { .. } | Op::EndDo { .. },
                ..
            }))
        )
    }

    fn add_statement(&mut self, node: AstNode) {
        self.current_block().push(node);
    }

    /// Pops the innermost frame and appends the finished node to its parent block.
    fn close_frame(&mut self, end: Option<Instruction>) {
        match self.frames.pop() {
            Some(Frame::If(frame)) => {
                let node = frame.finish(end);
                self.add_statement(node);
            }
            Some(Frame::Switch(frame)) => {
                let SwitchFrame {
                    switch_op,
                    prologue,
                    cases,
                } = frame;
                for node in prologue {
                    self.add_statement(node);
                }
                self.add_statement(AstNode::Switch(SwitchNode {
                    switch_op,
                    cases,
                    end_switch: end,
                }));
            }
            None => {}
        }
    }

    /// Else blocks end by length. Closes every open else frame whose block ends at or before
    /// `inst`, unless `inst` is the `endif` that closes it explicitly.
    fn close_finished_else_blocks(&mut self, inst: &Instruction) {
        while let Some(Frame::If(frame)) = self.frames.last() {
            let Some(end) = frame.else_end() else {
                break;
            };
            if inst.offset < end {
                break;
            }
            if inst.offset == end && matches!(inst.op, Op::EndIf { .. }) {
                break;
            }
            trace!("else block at 0x{:04X} closed by length", inst.offset);
            self.close_frame(None);
        }
    }

    fn visit_instruction(&mut self, inst: Instruction) {
        self.close_finished_else_blocks(&inst);
        let is_condition = constant_table(self.version).is_condition(inst.opcode);
        let has_procedures = self.version.has_procedures();
        let loop_condition = is_condition && self.in_loop_header();

        match inst.op {
            Op::If { .. } => self.frames.push(Frame::If(IfFrame {
                if_op: inst,
                conditions: Vec::new(),
                if_block: Vec::new(),
                else_op: None,
                else_block: Vec::new(),
            })),
            _ if is_condition && !loop_condition => match self.frames.last_mut() {
                Some(Frame::If(frame)) => frame.conditions.push(inst),
                _ => self.add_statement(AstNode::Opcode(inst)),
            },
            Op::Else { .. } => match self.frames.last_mut() {
                Some(Frame::If(frame)) if frame.else_op.is_none() => frame.else_op = Some(inst),
                _ => self.add_statement(AstNode::Opcode(inst)),
            },
            Op::EndIf { .. } => match self.frames.last() {
                Some(Frame::If(_)) => self.close_frame(Some(inst)),
                _ => self.add_statement(AstNode::Opcode(inst)),
            },
            Op::Switch { .. } if has_procedures => {
                self.frames.push(Frame::Switch(SwitchFrame {
                    switch_op: inst,
                    prologue: Vec::new(),
                    cases: Vec::new(),
                }))
            }
            Op::Case { .. } | Op::Default { .. } => match self.frames.last_mut() {
                Some(Frame::Switch(frame)) => frame.cases.push(CaseNode {
                    case_op: inst,
                    block: BasicBlock::default(),
                }),
                _ => self.add_statement(AstNode::Opcode(inst)),
            },
            Op::EndSwitch { .. } => match self.frames.last() {
                Some(Frame::Switch(_)) => self.close_frame(Some(inst)),
                _ => self.add_statement(AstNode::Opcode(inst)),
            },
            Op::EvtEnd { .. } if has_procedures => {
                self.add_statement(AstNode::Opcode(inst));
                if !self.frames.iter().any(|f| matches!(f, Frame::If(_))) {
                    self.ended = true;
                }
            }
            _ => self.add_statement(AstNode::Opcode(inst)),
        }
    }
}

impl ScriptVisitor for ScriptAstBuilder {
    fn version(&mut self, version: BioVersion) {
        self.version = version;
    }

    fn begin_script(&mut self, _kind: ScriptKind) {
        self.subroutines.clear();
    }

    fn begin_subroutine(&mut self, _index: usize) {
        self.ended = false;
        self.frames.clear();
        self.root.clear();
    }

    fn opcode(&mut self, offset: u32, bytes: &[u8]) {
        if self.ended {
            return;
        }
        let inst = Instruction::decode(self.version, offset, bytes);
        self.visit_instruction(inst);
    }

    fn end_subroutine(&mut self, index: usize) {
        while !self.frames.is_empty() {
            self.close_frame(None);
        }
        self.subroutines.push(SubroutineNode {
            index,
            block: BasicBlock::new(std::mem::take(&mut self.root)),
        });
    }

    fn end_script(&mut self, kind: ScriptKind) {
        let node = ScriptNode {
            version: self.version,
            subroutines: std::mem::take(&mut self.subroutines),
        };
        match kind {
            ScriptKind::Init => self.ast.init = Some(node),
            ScriptKind::Main => self.ast.main = Some(node),
            ScriptKind::Event => self.ast.event = Some(node),
        }
    }
}
