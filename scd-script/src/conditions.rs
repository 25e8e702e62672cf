//! Which game conditions guard each instruction.
//!
//! The walk follows the AST from subroutine 0, descending into `gosub` and `evt_exec` targets the
//! first time each is seen. A subroutine reached from several call sites is analysed once, under
//! the conditions of the first. Inside nested ifs only the first test of a given flag counts.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::ast::{AstVisitor, IfNode, ScriptAst, ScriptNode};
use crate::constants::constant_table;
use crate::instruction::{Condition, Instruction, Op};

/// Game-state constraints active at a point in a script. Each field is 0 or 1 when known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScriptCondition {
    pub player: Option<u8>,
    pub scenario: Option<u8>,
    pub game_mode: Option<u8>,
    pub difficulty: Option<u8>,
}

impl ScriptCondition {
    pub fn is_empty(&self) -> bool {
        *self == ScriptCondition::default()
    }

    /// Records a flag test; fields already known are left alone.
    fn apply(&mut self, bit_array: u8, index: u8, value: u8) {
        let field = match (bit_array, index) {
            (1, 0) => &mut self.player,
            (1, 1) => &mut self.scenario,
            (1, 6) => &mut self.game_mode,
            (0, 0x19) => &mut self.difficulty,
            _ => return,
        };
        field.get_or_insert(value);
    }
}

impl fmt::Display for ScriptCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pick = |field: Option<u8>, zero: &'static str, one: &'static str| {
            field.map(|v| if v == 0 { zero } else { one })
        };
        let parts: Vec<&str> = [
            pick(self.player, "leon", "claire"),
            pick(self.scenario, "a", "b"),
            pick(self.game_mode, "normal", "bonus"),
            pick(self.difficulty, "jpn", "usa"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            return Ok(());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Receives every opcode reached by a [`ConditionalWalker`] with the conditions guarding it.
pub trait ConditionSink {
    fn opcode(&mut self, inst: &Instruction, condition: &ScriptCondition);
}

/// [`AstVisitor`] that keeps a stack of [`ScriptCondition`]s in step with the if nesting.
pub struct ConditionalWalker<'a, S: ConditionSink + ?Sized> {
    script: &'a ScriptNode,
    stack: Vec<ScriptCondition>,
    visited: HashSet<usize>,
    sink: &'a mut S,
}

impl<'a, S: ConditionSink + ?Sized> ConditionalWalker<'a, S> {
    pub fn new(script: &'a ScriptNode, sink: &'a mut S) -> Self {
        ConditionalWalker {
            script,
            stack: vec![ScriptCondition::default()],
            visited: HashSet::new(),
            sink,
        }
    }

    /// Walks from subroutine 0.
    pub fn walk(mut self) {
        self.enter_subroutine(0);
    }

    pub fn condition(&self) -> ScriptCondition {
        self.stack.last().copied().unwrap_or_default()
    }

    fn enter_subroutine(&mut self, index: usize) {
        if !self.visited.insert(index) {
            return;
        }
        let script = self.script;
        if let Some(sub) = script.subroutine(index) {
            sub.accept(self);
        }
    }

    fn push_fork(&mut self) {
        let top = self.condition();
        self.stack.push(top);
    }

    fn apply_if(&mut self, node: &IfNode, negate: bool) {
        let mut current = self.condition();
        for inst in &node.conditions {
            if let Some(Condition::Ck {
                bit_array,
                index,
                value,
                ..
            }) = inst.condition()
            {
                let value = if negate { u8::from(*value == 0) } else { *value };
                current.apply(*bit_array, *index, value);
            }
        }
        if let Some(top) = self.stack.last_mut() {
            *top = current;
        }
    }
}

impl<S: ConditionSink + ?Sized> AstVisitor for ConditionalWalker<'_, S> {
    fn visit_if(&mut self, node: &IfNode) {
        self.push_fork();
        self.apply_if(node, false);
    }

    fn visit_else(&mut self, node: &IfNode) {
        self.stack.pop();
        self.push_fork();
        self.apply_if(node, true);
    }

    fn visit_end_if(&mut self, _node: &IfNode) {
        self.stack.pop();
    }

    fn visit_opcode(&mut self, inst: &Instruction) {
        let condition = self.condition();
        self.sink.opcode(inst, &condition);
        match inst.op {
            Op::Gosub { index } => self.enter_subroutine(index as usize),
            Op::EvtExec { procedure, .. } => self.enter_subroutine(procedure as usize),
            _ => {}
        }
    }
}

/// Maps the offset of every reachable opcode to the conditions guarding it.
#[derive(Debug, Default)]
pub struct ConditionCollector {
    conditions: BTreeMap<u32, ScriptCondition>,
}

impl ConditionCollector {
    pub fn collect(script: &ScriptNode) -> BTreeMap<u32, ScriptCondition> {
        let mut collector = ConditionCollector::default();
        ConditionalWalker::new(script, &mut collector).walk();
        collector.conditions
    }
}

impl ConditionSink for ConditionCollector {
    fn opcode(&mut self, inst: &Instruction, condition: &ScriptCondition) {
        self.conditions.entry(inst.offset).or_insert(*condition);
    }
}

/// One line per door, item and enemy placement, with its guarding conditions.
pub struct AstPrinter {
    out: String,
}

fn room_name(stage: u8, room: u8) -> String {
    if stage == 15 {
        format!("RDT_G{:02X}", room)
    } else {
        format!("RDT_{:X}{:02X}", stage + 1, room)
    }
}

impl AstPrinter {
    pub fn print(ast: &ScriptAst) -> String {
        let mut printer = AstPrinter { out: String::new() };
        for node in [&ast.init, &ast.main].into_iter().flatten() {
            if !node.subroutines.is_empty() {
                ConditionalWalker::new(node, &mut printer).walk();
            }
        }
        printer.out
    }

    fn line(&mut self, text: String, condition: &ScriptCondition) {
        self.out.push_str("    ");
        self.out.push_str(&text);
        if !condition.is_empty() {
            self.out.push(' ');
            self.out.push_str(&condition.to_string());
        }
        self.out.push('\n');
    }
}

impl ConditionSink for AstPrinter {
    fn opcode(&mut self, inst: &Instruction, condition: &ScriptCondition) {
        let table = constant_table(inst.version);
        let text = match &inst.op {
            Op::Door(door) => format!(
                "Door #{}: {} (0x{:02X})",
                door.id,
                room_name(door.stage, door.room),
                inst.offset
            ),
            Op::Item(item) => format!(
                "Item #{}: {} x{} (0x{:02X})",
                item.id,
                table.item_name(item.item_type as u8),
                item.amount,
                inst.offset
            ),
            Op::Enemy(enemy) => format!(
                "Enemy #{}: {} (0x{:02X})",
                enemy.id,
                table.enemy_name(enemy.enemy_type),
                inst.offset
            ),
            _ => return,
        };
        self.line(text, condition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_builder::ScriptAstBuilder;
    use crate::reader::read_script;
    use crate::version::{BioVersion, ScriptKind};
    use pretty_assertions::assert_eq;

    fn build(bytes: &[u8]) -> ScriptNode {
        let mut builder = ScriptAstBuilder::new();
        read_script(bytes, BioVersion::Biohazard2, ScriptKind::Main, 0, &mut builder);
        builder.into_ast().main.unwrap()
    }

    #[test]
    fn display() {
        assert_eq!(ScriptCondition::default().to_string(), "");
        let c = ScriptCondition {
            player: Some(1),
            scenario: Some(0),
            game_mode: None,
            difficulty: Some(1),
        };
        assert_eq!(c.to_string(), "[claire, a, usa]");
    }

    #[test]
    fn if_and_else_branches() {
        // if (player == 0) { nop } else { nop } evt_end
        let bytes = [
            0x02, 0x00, //
            0x06, 0x00, 0x09, 0x00, //
            0x21, 0x01, 0x00, 0x00, //
            0x00, //
            0x07, 0x00, 0x05, 0x00, //
            0x00, //
            0x01, 0x00,
        ];
        let map = ConditionCollector::collect(&build(&bytes));
        let leon = ScriptCondition {
            player: Some(0),
            ..Default::default()
        };
        let claire = ScriptCondition {
            player: Some(1),
            ..Default::default()
        };
        assert_eq!(map.get(&0x0A), Some(&leon));
        assert_eq!(map.get(&0x0F), Some(&claire));
        assert_eq!(map.get(&0x10), Some(&ScriptCondition::default()));
    }

    #[test]
    fn outer_test_wins() {
        // if (player == 1) { if (player == 0) { nop } }
        let bytes = [
            0x02, 0x00, //
            0x06, 0x00, 0x12, 0x00, //
            0x21, 0x01, 0x00, 0x01, //
            0x06, 0x00, 0x09, 0x00, //
            0x21, 0x01, 0x00, 0x00, //
            0x00, //
            0x08, //
            0x08, //
            0x01, 0x00,
        ];
        let map = ConditionCollector::collect(&build(&bytes));
        assert_eq!(map.get(&0x12).and_then(|c| c.player), Some(1));
    }
}
