//! Text renderings of a script: assembly source, assembly listing and structured pseudocode.
//!
//! Assembly output follows the opcode stream directly and can be fed back to the assembler.
//! Structured output is rendered from the AST and is meant for reading only.

use std::collections::HashMap;

use num_traits::FromPrimitive;

use crate::ast::{AstNode, IfNode, ScriptNode, SwitchNode};
use crate::ast_builder::ScriptAstBuilder;
use crate::builder::{label_name, ScriptBuilder};
use crate::constants::{
    constant_table, signature_name, signature_operands, ConstantTable, OPERATOR_SYMBOLS,
};
use crate::instruction::{Condition, Instruction, Op};
use crate::opcode::OpcodeV1;
use crate::reader::{read_script, ScriptVisitor};
use crate::version::{BioVersion, ScriptKind};

const DATA_ROW: usize = 16;
/// Index of the "last room" slot in the comparison array.
const LAST_ROOM_INDEX: u8 = 27;

/// Byte width of one signature character.
pub(crate) fn operand_width(c: char) -> usize {
    if c.is_ascii_uppercase() || c == '~' || c == '@' {
        2
    } else {
        1
    }
}

pub(crate) fn is_label_char(c: char) -> bool {
    matches!(c, 'l' | '\'' | 'L' | '~' | '@')
}

/// Absolute target of a label operand stored at `field` (absolute) with the given width.
pub(crate) fn label_target(field: u32, width: usize, value: i32) -> Option<u32> {
    u32::try_from(field as i64 - width as i64 + value as i64).ok()
}

fn procedure_name(kind: ScriptKind, index: usize) -> String {
    match kind {
        ScriptKind::Init => format!("init_{:02X}", index),
        _ => format!("main_{:02X}", index),
    }
}

fn variable_name(id: u8) -> String {
    format!("var_{:02X}", id)
}

/// Mnemonic and rendered operands, driven by the opcode's signature. Opcodes without a
/// signature, or whose length disagrees with the size table, come out as `unk`.
fn format_operands(inst: &Instruction, mut on_label: impl FnMut(u32)) -> (String, Vec<String>) {
    let table = constant_table(inst.version);
    let bytes = inst.to_bytes();
    let opcode = inst.opcode;
    let signature = table.signature(opcode);
    if signature.is_empty() || bytes.len() != table.instruction_size(opcode) {
        let mut args = vec![format!("0x{:02X}", opcode)];
        args.extend(bytes[1..].iter().map(|b| b.to_string()));
        return ("unk".to_string(), args);
    }
    let name = signature_name(signature).to_string();
    let Some(chars) = signature_operands(signature) else {
        return (name, bytes[1..].iter().map(|b| b.to_string()).collect());
    };

    let mut args = Vec::new();
    let mut pos = 1;
    for (i, c) in chars.chars().enumerate() {
        let width = operand_width(c);
        let Some(field) = bytes.get(pos..pos + width) else {
            break;
        };
        let unsigned = if width == 2 {
            u16::from_le_bytes([field[0], field[1]]) as i32
        } else {
            field[0] as i32
        };
        let signed = if width == 2 {
            i16::from_le_bytes([field[0], field[1]]) as i32
        } else {
            unsigned
        };

        let arg = if let Some(name) = table.get_contextual_constant(opcode, i, &bytes) {
            name
        } else if is_label_char(c) {
            let value = if matches!(c, '~' | '@') { signed } else { unsigned };
            match label_target(inst.offset + pos as u32, width, value) {
                Some(target) => {
                    on_label(target);
                    label_name(target)
                }
                None => value.to_string(),
            }
        } else {
            match c {
                'u' | 'U' => unsigned.to_string(),
                'I' => signed.to_string(),
                'b' => format!("{} | {}", (unsigned >> 5) << 5, unsigned & 0x1F),
                'r' => format!("RDT_{:X}{:02X}", unsigned >> 5, unsigned & 0x1F),
                _ => table
                    .get_constant(c, unsigned)
                    .unwrap_or_else(|| unsigned.to_string()),
            }
        };
        args.push(arg);
        pos += width;
    }
    (name, args)
}

/// Mnemonic and operands as the assembler reads them, without registering labels.
pub fn instruction_operands(inst: &Instruction) -> (String, Vec<String>) {
    format_operands(inst, |_| {})
}

/// [`ScriptVisitor`] producing text. Feed it one or more scripts through
/// [`read_script`], then take the result with [`ScriptDecompiler::script`].
pub struct ScriptDecompiler {
    assembly: bool,
    version: BioVersion,
    kind: ScriptKind,
    sb: ScriptBuilder,
    ast: ScriptAstBuilder,
    wrote_version: bool,
    subroutine: usize,
    subroutine_end: Option<u32>,
    /// Structured mode: per subroutine, its trailing data and end offset.
    trailing: HashMap<usize, Vec<(u32, Vec<u8>)>>,
    ends: HashMap<usize, u32>,
}

impl ScriptDecompiler {
    /// `listing` only has an effect together with `assembly`.
    pub fn new(assembly: bool, listing: bool) -> Self {
        ScriptDecompiler {
            assembly,
            version: BioVersion::Biohazard2,
            kind: ScriptKind::Main,
            sb: ScriptBuilder::new(assembly, listing),
            ast: ScriptAstBuilder::new(),
            wrote_version: false,
            subroutine: 0,
            subroutine_end: None,
            trailing: HashMap::new(),
            ends: HashMap::new(),
        }
    }

    pub fn script(&self) -> String {
        self.sb.to_string()
    }

    fn table(&self) -> &'static dyn ConstantTable {
        constant_table(self.version)
    }

    fn operands(&mut self, inst: &Instruction) -> (String, Vec<String>) {
        let sb = &mut self.sb;
        format_operands(inst, |target| sb.insert_label(target))
    }

    fn write_general(&mut self, inst: &Instruction) {
        let (name, args) = self.operands(inst);
        self.sb.write_standard_opcode(&name, &args);
    }

    fn write_data(&mut self, offset: u32, bytes: &[u8]) {
        for (i, row) in bytes.chunks(DATA_ROW).enumerate() {
            self.sb.record_opcode(offset + (i * DATA_ROW) as u32, row);
            let args: Vec<String> = row.iter().map(|b| format!("0x{:02X}", b)).collect();
            self.sb.write_standard_opcode("db", &args);
        }
    }

    fn flag_name(&self, object: u8, bit_array: u8, index: u8) -> String {
        if self.version == BioVersion::Biohazard1 {
            return format!("${}[{}][{}]", object, bit_array, index);
        }
        match self.table().named_flag(bit_array, index) {
            Some(name) => name.to_string(),
            None => format!("bits[{}][{}]", bit_array, index),
        }
    }

    fn expression(&mut self, inst: &Instruction) -> String {
        let table = self.table();
        match inst.condition() {
            Some(Condition::Ck {
                object,
                bit_array,
                index,
                value,
            }) => format!("{} == {}", self.flag_name(*object, *bit_array, *index), value),
            Some(Condition::Cmp {
                index,
                operator,
                value,
                ..
            }) => {
                let op = table.comparator_symbol(*operator);
                if *index == LAST_ROOM_INDEX && self.version.has_procedures() {
                    format!("game.last_room {} 0x{:03X}", op, value)
                } else {
                    format!("arr[{}] {} {}", index, op, value)
                }
            }
            Some(Condition::CmpByte {
                index,
                operator,
                value,
            }) => format!("arr[{}] {} {}", index, table.comparator_symbol(*operator), value),
            Some(Condition::MemberCmp {
                member,
                operator,
                value,
                ..
            }) => format!("&{} {} {}", member, table.comparator_symbol(*operator), value),
            _ => {
                let (name, args) = self.operands(inst);
                format!("{}({})", name, args.join(", "))
            }
        }
    }

    /// Writes the leading condition opcodes of `statements` joined by `&&` and returns how many
    /// were consumed.
    fn write_conditions(&mut self, statements: &[AstNode]) -> usize {
        let table = self.table();
        let mut parts = Vec::new();
        for node in statements {
            match node {
                AstNode::Opcode(inst) if table.is_condition(inst.opcode) => {
                    parts.push(self.expression(inst))
                }
                _ => break,
            }
        }
        self.sb.write(&parts.join(" && "));
        parts.len()
    }

    fn render_statement(&mut self, inst: &Instruction) {
        let table = self.table();
        if table.opcode_name(inst.opcode) == Some("nop") {
            self.sb.write_anchor(inst.offset);
            return;
        }
        self.sb.record_opcode(inst.offset, &inst.to_bytes());
        match &inst.op {
            Op::EvtEnd { ret } => self.sb.write_line(&format!("return {};", ret)),
            Op::Goto { rel, .. } => {
                match label_target(inst.offset + 4, 2, *rel as i32) {
                    Some(target) => {
                        self.sb.insert_label(target);
                        self.sb.write_line(&format!("goto {};", label_name(target)));
                    }
                    None => self.write_general(inst),
                }
            }
            Op::Gosub { index } => {
                let name = procedure_name(self.kind, *index as usize);
                self.sb.write_line(&format!("{}();", name));
            }
            Op::Return { .. } => self.sb.write_line("return;"),
            Op::Break { .. } => self.sb.write_line("break;"),
            Op::Set(flag) => {
                let target = self.flag_name(flag.object, flag.bit_array, flag.index);
                let suffix = match flag.value {
                    0 => " = 0;",
                    1 => " = 1;",
                    7 => " ^= 1;",
                    _ => " (INVALID);",
                };
                self.sb.write_line(&format!("{}{}", target, suffix));
            }
            Op::Calc {
                operator,
                var,
                value,
                ..
            } => {
                let op = OPERATOR_SYMBOLS.get(*operator as usize).unwrap_or(&"?");
                self.sb
                    .write_line(&format!("{} {}= {:02X};", variable_name(*var), op, value));
            }
            Op::Unknown(payload)
                if self.version == BioVersion::Biohazard1
                    && OpcodeV1::from_u8(inst.opcode) == Some(OpcodeV1::Set8)
                    && payload.len() >= 2 =>
            {
                self.sb
                    .write_line(&format!("$${} = {};", payload[0], payload[1]));
            }
            _ => self.write_general(inst),
        }
    }

    fn render_if(&mut self, node: &IfNode) {
        let mut bytes = node.if_op.to_bytes();
        for condition in &node.conditions {
            bytes.extend(condition.to_bytes());
        }
        self.sb.record_opcode(node.if_op.offset, &bytes);
        let parts: Vec<String> = node.conditions.iter().map(|c| self.expression(c)).collect();
        self.sb.write_line(&format!("if ({})", parts.join(" && ")));
        self.sb.open_block();
        self.render_block(&node.if_block.statements);
        if let Some(branch) = &node.else_branch {
            self.sb.close_block();
            self.sb
                .record_opcode(branch.else_op.offset, &branch.else_op.to_bytes());
            self.sb.write_line("else");
            self.sb.open_block();
            self.render_block(&branch.block.statements);
        }
        self.sb.unindent();
        if let Some(end_if) = &node.end_if {
            self.sb.record_opcode(end_if.offset, &end_if.to_bytes());
        }
        self.sb.write_line("}");
    }

    fn render_switch(&mut self, node: &SwitchNode) {
        self.sb
            .record_opcode(node.switch_op.offset, &node.switch_op.to_bytes());
        match node.switch_op.op {
            Op::Switch { var, .. } => self
                .sb
                .write_line(&format!("switch ({})", variable_name(var))),
            _ => self.write_general(&node.switch_op),
        }
        self.sb.open_block();
        for case in &node.cases {
            let statements = &case.block.statements;
            let inst = &case.case_op;
            self.sb.record_opcode(inst.offset, &inst.to_bytes());
            let mut skip = 0;
            match inst.op {
                Op::Case { value, .. } => {
                    self.sb.unindent();
                    if self.version == BioVersion::Biohazard3 {
                        self.sb.write("case when (");
                        skip = self.write_conditions(statements);
                        self.sb.write_line("):");
                    } else {
                        self.sb.write_line(&format!("case {}:", value));
                    }
                    self.sb.indent();
                }
                Op::Default { .. } => {
                    self.sb.unindent();
                    self.sb.write_line("default:");
                    self.sb.indent();
                }
                _ => self.write_general(inst),
            }
            self.render_block(&statements[skip..]);
        }
        self.sb.unindent();
        if let Some(end) = &node.end_switch {
            self.sb.record_opcode(end.offset, &end.to_bytes());
        }
        self.sb.write_line("}");
    }

    /// Loops stay flat in the AST; their braces are opened and closed here by their opcodes.
    fn render_block(&mut self, statements: &[AstNode]) {
        let mut open_loops = 0usize;
        let mut i = 0;
        while i < statements.len() {
            match &statements[i] {
                AstNode::If(node) => self.render_if(node),
                AstNode::Switch(node) => self.render_switch(node),
                AstNode::Opcode(inst) => {
                    match inst.op {
                        Op::For { count, .. } => {
                            self.sb.record_opcode(inst.offset, &inst.to_bytes());
                            self.sb.write_line(&format!("for {} times", count));
                            self.sb.open_block();
                            open_loops += 1;
                        }
                        Op::While { .. } => {
                            self.sb.record_opcode(inst.offset, &inst.to_bytes());
                            self.sb.write("while (");
                            i += self.write_conditions(&statements[i + 1..]);
                            self.sb.write_line(")");
                            self.sb.open_block();
                            open_loops += 1;
                        }
                        Op::Do { .. } => {
                            self.sb.record_opcode(inst.offset, &inst.to_bytes());
                            self.sb.write_line("do");
                            self.sb.open_block();
                            open_loops += 1;
                        }
                        Op::Next { .. } | Op::EndWhile { .. } if open_loops > 0 => {
                            self.sb.unindent();
                            self.sb.record_opcode(inst.offset, &inst.to_bytes());
                            self.sb.write_line("}");
                            open_loops -= 1;
                        }
                        Op::EndDo { .. } if open_loops > 0 => {
                            self.sb.unindent();
                            self.sb.record_opcode(inst.offset, &inst.to_bytes());
                            self.sb.write("} while (");
                            i += self.write_conditions(&statements[i + 1..]);
                            self.sb.write_line(");");
                            open_loops -= 1;
                        }
                        _ => self.render_statement(inst),
                    }
                }
            }
            i += 1;
        }
        for _ in 0..open_loops {
            self.sb.close_block();
        }
    }

    fn render_script(&mut self, node: &ScriptNode) {
        for sub in &node.subroutines {
            self.sb.reset_indent();
            self.sb.indent();
            if sub.index != 0 {
                self.sb.end_line();
            }
            if node.version.has_procedures() {
                self.sb
                    .write_line(&format!("{}()", procedure_name(self.kind, sub.index)));
                self.sb.open_block();
            }
            self.render_block(&sub.block.statements);
            if let Some(rows) = self.trailing.remove(&sub.index) {
                for (offset, bytes) in rows {
                    self.write_data(offset, &bytes);
                }
            }
            if let Some(end) = self.ends.get(&sub.index) {
                self.sb.write_anchor(*end);
            }
            if node.version.has_procedures() {
                self.sb.close_block();
            }
        }
    }
}

impl ScriptVisitor for ScriptDecompiler {
    fn version(&mut self, version: BioVersion) {
        self.version = version;
        self.ast.version(version);
        if !self.wrote_version {
            self.wrote_version = true;
            let prefix = if self.assembly { "." } else { "" };
            self.sb
                .write_line(&format!("{}version {}", prefix, version.number()));
        }
    }

    fn begin_script(&mut self, kind: ScriptKind) {
        self.kind = kind;
        if kind != ScriptKind::Init {
            self.sb.end_line();
        }
        if self.assembly {
            self.sb.write_line(&format!(".{}", kind));
        } else {
            self.sb.write_line(&kind.to_string());
            self.sb.open_block();
        }
        self.trailing.clear();
        self.ends.clear();
        self.ast.begin_script(kind);
    }

    fn begin_subroutine(&mut self, index: usize) {
        self.subroutine = index;
        self.subroutine_end = None;
        if self.assembly {
            if index != 0 {
                self.sb.end_line();
            }
            if self.version.has_procedures() {
                self.sb
                    .write_line(&format!(".proc {}", procedure_name(self.kind, index)));
            }
        }
        self.ast.begin_subroutine(index);
    }

    fn opcode(&mut self, offset: u32, bytes: &[u8]) {
        self.subroutine_end = Some(offset + bytes.len() as u32);
        if self.assembly {
            self.sb.record_opcode(offset, bytes);
            let inst = Instruction::decode(self.version, offset, bytes);
            self.write_general(&inst);
        } else {
            self.ast.opcode(offset, bytes);
        }
    }

    fn trailing_data(&mut self, offset: u32, bytes: &[u8]) {
        self.subroutine_end = Some(offset + bytes.len() as u32);
        if self.assembly {
            self.write_data(offset, bytes);
        } else {
            self.trailing
                .entry(self.subroutine)
                .or_default()
                .push((offset, bytes.to_vec()));
        }
    }

    fn end_subroutine(&mut self, index: usize) {
        if self.assembly {
            if let Some(end) = self.subroutine_end {
                self.sb.write_anchor(end);
            }
        } else {
            self.ast.end_subroutine(index);
            if let Some(end) = self.subroutine_end {
                self.ends.insert(index, end);
            }
        }
    }

    fn end_script(&mut self, kind: ScriptKind) {
        if self.assembly {
            return;
        }
        self.ast.end_script(kind);
        let ast = self.ast.ast();
        let node = match kind {
            ScriptKind::Init => ast.init.clone(),
            ScriptKind::Main => ast.main.clone(),
            ScriptKind::Event => ast.event.clone(),
        };
        if let Some(node) = node {
            self.render_script(&node);
        }
        self.sb.reset_indent();
        self.sb.close_block();
    }
}

/// Assembly source for one buffer; with `listing`, offsets and opcode bytes are shown too.
pub fn disassemble(bytes: &[u8], version: BioVersion, kind: ScriptKind, listing: bool) -> String {
    let mut decompiler = ScriptDecompiler::new(true, listing);
    read_script(bytes, version, kind, 0, &mut decompiler);
    decompiler.script()
}

/// Structured pseudocode for one buffer.
pub fn decompile(bytes: &[u8], version: BioVersion, kind: ScriptKind) -> String {
    let mut decompiler = ScriptDecompiler::new(false, false);
    read_script(bytes, version, kind, 0, &mut decompiler);
    decompiler.script()
}
