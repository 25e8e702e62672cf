//! Structured view of a decoded script.
//!
//! Trees are produced by [`crate::ScriptAstBuilder`] and only read afterwards. Traversal goes
//! through [`AstVisitor`], whose hooks all default to no-ops.

use crate::instruction::Instruction;
use crate::version::BioVersion;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicBlock {
    pub statements: Vec<AstNode>,
}

impl BasicBlock {
    pub fn new(statements: Vec<AstNode>) -> Self {
        BasicBlock { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        for statement in &self.statements {
            statement.accept(visitor);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    Opcode(Instruction),
    If(IfNode),
    Switch(SwitchNode),
}

impl AstNode {
    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            AstNode::Opcode(inst) => visitor.visit_opcode(inst),
            AstNode::If(node) => node.accept(visitor),
            AstNode::Switch(node) => node.accept(visitor),
        }
    }

    /// Offset of the first instruction the node covers.
    pub fn offset(&self) -> u32 {
        match self {
            AstNode::Opcode(inst) => inst.offset,
            AstNode::If(node) => node.if_op.offset,
            AstNode::Switch(node) => node.switch_op.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseBranch {
    pub else_op: Instruction,
    pub block: BasicBlock,
}

/// `if` with its condition opcodes. The else block exists exactly when an else opcode was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfNode {
    pub if_op: Instruction,
    pub conditions: Vec<Instruction>,
    pub if_block: BasicBlock,
    pub else_branch: Option<ElseBranch>,
    /// Absent when the block was closed by its length rather than an `endif`.
    pub end_if: Option<Instruction>,
}

impl IfNode {
    pub fn else_op(&self) -> Option<&Instruction> {
        self.else_branch.as_ref().map(|e| &e.else_op)
    }

    pub fn else_block(&self) -> Option<&BasicBlock> {
        self.else_branch.as_ref().map(|e| &e.block)
    }

    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_if(self);
        visitor.visit_opcode(&self.if_op);
        for condition in &self.conditions {
            visitor.visit_opcode(condition);
        }
        self.if_block.accept(visitor);
        if let Some(branch) = &self.else_branch {
            visitor.visit_else(self);
            visitor.visit_opcode(&branch.else_op);
            branch.block.accept(visitor);
        }
        visitor.visit_end_if(self);
        if let Some(end_if) = &self.end_if {
            visitor.visit_opcode(end_if);
        }
    }
}

/// A `case` or `default` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseNode {
    pub case_op: Instruction,
    pub block: BasicBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchNode {
    pub switch_op: Instruction,
    pub cases: Vec<CaseNode>,
    pub end_switch: Option<Instruction>,
}

impl SwitchNode {
    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_opcode(&self.switch_op);
        for case in &self.cases {
            visitor.visit_opcode(&case.case_op);
            case.block.accept(visitor);
        }
        if let Some(end) = &self.end_switch {
            visitor.visit_opcode(end);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubroutineNode {
    pub index: usize,
    pub block: BasicBlock,
}

impl SubroutineNode {
    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_subroutine(self);
        self.block.accept(visitor);
    }
}

/// One decoded buffer: its dialect and every subroutine in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNode {
    pub version: BioVersion,
    pub subroutines: Vec<SubroutineNode>,
}

impl ScriptNode {
    pub fn subroutine(&self, index: usize) -> Option<&SubroutineNode> {
        self.subroutines.iter().find(|s| s.index == index)
    }

    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        for subroutine in &self.subroutines {
            subroutine.accept(visitor);
        }
    }
}

/// The scripts of one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptAst {
    pub init: Option<ScriptNode>,
    pub main: Option<ScriptNode>,
    pub event: Option<ScriptNode>,
}

impl ScriptAst {
    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        for node in [&self.init, &self.main, &self.event].into_iter().flatten() {
            node.accept(visitor);
        }
    }
}

/// Read-only traversal hooks. `visit_else` fires between the if block and the else opcode.
pub trait AstVisitor {
    fn visit_subroutine(&mut self, _node: &SubroutineNode) {}

    fn visit_if(&mut self, _node: &IfNode) {}

    fn visit_else(&mut self, _node: &IfNode) {}

    fn visit_end_if(&mut self, _node: &IfNode) {}

    fn visit_opcode(&mut self, _inst: &Instruction) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Trace(Vec<String>);

    impl AstVisitor for Trace {
        fn visit_subroutine(&mut self, node: &SubroutineNode) {
            self.0.push(format!("sub {}", node.index));
        }

        fn visit_if(&mut self, _node: &IfNode) {
            self.0.push("if".to_string());
        }

        fn visit_else(&mut self, _node: &IfNode) {
            self.0.push("else".to_string());
        }

        fn visit_end_if(&mut self, _node: &IfNode) {
            self.0.push("endif".to_string());
        }

        fn visit_opcode(&mut self, inst: &Instruction) {
            self.0.push(format!("{:02X}@{}", inst.opcode, inst.offset));
        }
    }

    fn op(offset: u32, bytes: &[u8]) -> Instruction {
        Instruction::decode(BioVersion::Biohazard2, offset, bytes)
    }

    #[test]
    fn if_else_visit_order() {
        let node = IfNode {
            if_op: op(0, &[0x06, 0x00, 0x08, 0x00]),
            conditions: vec![op(4, &[0x21, 0x01, 0x00, 0x01])],
            if_block: BasicBlock::new(vec![AstNode::Opcode(op(8, &[0x00]))]),
            else_branch: Some(ElseBranch {
                else_op: op(9, &[0x07, 0x00, 0x05, 0x00]),
                block: BasicBlock::new(vec![AstNode::Opcode(op(13, &[0x00]))]),
            }),
            end_if: None,
        };
        let sub = SubroutineNode {
            index: 0,
            block: BasicBlock::new(vec![AstNode::If(node)]),
        };
        let mut trace = Trace(Vec::new());
        sub.accept(&mut trace);
        assert_eq!(
            trace.0,
            vec!["sub 0", "if", "06@0", "21@4", "00@8", "else", "07@9", "00@13", "endif"]
        );
    }
}
