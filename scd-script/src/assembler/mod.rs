//! Text to bytecode.
//!
//! A single pass over the token stream drives a small state machine. Label operands are written
//! as placeholders and patched when their procedure ends. Errors are collected and parsing resumes
//! on the next line, so one run reports as many problems as possible.

mod diagnostic;
mod lexer;

use std::collections::HashMap;

use log::debug;

use crate::constants::{constant_table, signature_operands, ConstantTable};
use crate::decompiler::{is_label_char, operand_width};
use crate::error::{Result, ScdError};
use crate::version::{BioVersion, ScriptKind};

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
use lexer::{parse_number, Lexer, Token, TokenKind};

/// Output buffers; `None` for a script the source never mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledScript {
    pub version: Option<BioVersion>,
    pub init: Option<Vec<u8>>,
    pub main: Option<Vec<u8>>,
    pub event: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Default,
    ExpectVersion,
    ExpectProcName,
    ExpectOpcode,
    ExpectOperand,
    ExpectCommaOrOperator,
    SkipToNextLine,
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combine {
    Set,
    Add,
    Sub,
    Or,
}

#[derive(Debug, Default)]
struct ScriptBuffer {
    declared: bool,
    procedures: Vec<Vec<u8>>,
    names: HashMap<String, usize>,
}

struct LabelRef {
    name: String,
    /// Position of the field inside the procedure.
    field: usize,
    width: usize,
    /// Signature character of the field.
    kind: char,
    token: Token,
}

/// Operand being accumulated from `a + b | c` style terms.
#[derive(Default)]
struct Operand {
    value: i64,
    label: Option<Token>,
}

enum OpcodeShape {
    /// Operand characters from the signature.
    Signature(Vec<char>),
    /// `db` and `unk`: any number of raw bytes.
    Raw { min: usize },
}

pub struct ScdAssembler {
    used: bool,
    path: String,
    diagnostics: Vec<Diagnostic>,
    state: State,
    version: Option<BioVersion>,
    kind: ScriptKind,
    buffers: HashMap<ScriptKind, ScriptBuffer>,
    in_procedure: bool,
    proc_data: Vec<u8>,
    labels: HashMap<String, usize>,
    label_refs: Vec<LabelRef>,
    shape: OpcodeShape,
    operand_count: usize,
    operand: Operand,
    combine: Combine,
}

impl Default for ScdAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ScdAssembler {
    pub fn new() -> Self {
        ScdAssembler {
            used: false,
            path: String::new(),
            diagnostics: Vec::new(),
            state: State::Default,
            version: None,
            kind: ScriptKind::Main,
            buffers: HashMap::new(),
            in_procedure: false,
            proc_data: Vec::new(),
            labels: HashMap::new(),
            label_refs: Vec::new(),
            shape: OpcodeShape::Raw { min: 0 },
            operand_count: 0,
            operand: Operand::default(),
            combine: Combine::Set,
        }
    }

    /// Everything reported so far, warnings included.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Assembles `source`; `path` only labels diagnostics. Fails with every diagnostic when any
    /// error was reported. An instance assembles a single source.
    pub fn assemble(&mut self, path: &str, source: &str) -> Result<AssembledScript> {
        if self.used {
            return Err(ScdError::InvalidOperation("assembler instance already used"));
        }
        self.used = true;
        self.path = path.to_string();
        let tokens = Lexer::new(path, source).tokenize(&mut self.diagnostics);
        for token in &tokens {
            self.process_token(token);
            if self.state == State::Terminate {
                break;
            }
        }
        if self.state != State::Terminate {
            self.end_procedure();
        }
        if self.error_count() != 0 {
            return Err(ScdError::Assembly(self.diagnostics.clone()));
        }
        Ok(self.output())
    }

    fn table(&self) -> &'static dyn ConstantTable {
        constant_table(self.version.unwrap_or(BioVersion::Biohazard2))
    }

    fn error(&mut self, token: &Token, code: DiagnosticCode, message: String) {
        self.diagnostics
            .push(Diagnostic::error(&self.path, token, code, message));
    }

    fn warning(&mut self, token: &Token, code: DiagnosticCode, message: String) {
        self.diagnostics
            .push(Diagnostic::warning(&self.path, token, code, message));
    }

    /// Reports an error and drops the rest of the line.
    fn skip_line(&mut self, token: &Token, code: DiagnosticCode, message: String) {
        self.error(token, code, message);
        self.state = if token.is_end_of_line() {
            self.line_start_state()
        } else {
            State::SkipToNextLine
        };
    }

    fn line_start_state(&self) -> State {
        if self.in_procedure {
            State::ExpectOpcode
        } else {
            State::Default
        }
    }

    fn process_token(&mut self, token: &Token) {
        if token.kind == TokenKind::Invalid {
            // already reported by the lexer
            self.state = State::SkipToNextLine;
            return;
        }
        match self.state {
            State::Terminate => {}
            State::SkipToNextLine => {
                if token.is_end_of_line() {
                    self.state = self.line_start_state();
                }
            }
            State::Default | State::ExpectOpcode => self.process_statement(token),
            State::ExpectVersion => self.process_version(token),
            State::ExpectProcName => {
                if token.kind == TokenKind::Symbol {
                    self.begin_procedure(Some(&token.text));
                    self.state = State::ExpectOpcode;
                } else {
                    self.skip_line(
                        token,
                        DiagnosticCode::ExpectedProcName,
                        "Expected procedure name.".to_string(),
                    );
                }
            }
            State::ExpectOperand => match token.kind {
                TokenKind::Number | TokenKind::Symbol => {
                    self.state = State::ExpectCommaOrOperator;
                    self.add_term(token);
                }
                _ if token.is_end_of_line()
                    && self.operand_count == 0
                    && self.combine == Combine::Set =>
                {
                    self.end_opcode(token);
                    self.state = State::ExpectOpcode;
                }
                _ => self.skip_line(
                    token,
                    DiagnosticCode::ExpectedOperand,
                    "Expected operand.".to_string(),
                ),
            },
            State::ExpectCommaOrOperator => match token.kind {
                TokenKind::Comma => {
                    if self.commit_operand(token) {
                        self.state = State::ExpectOperand;
                    }
                }
                TokenKind::Plus | TokenKind::Minus | TokenKind::Pipe => {
                    self.combine = match token.kind {
                        TokenKind::Plus => Combine::Add,
                        TokenKind::Minus => Combine::Sub,
                        _ => Combine::Or,
                    };
                    self.state = State::ExpectOperand;
                }
                // `x -2` lexes as a negative literal
                TokenKind::Number if token.text.starts_with('-') => {
                    self.combine = Combine::Add;
                    self.add_term(token);
                }
                _ if token.is_end_of_line() => {
                    if self.commit_operand(token) {
                        self.end_opcode(token);
                    }
                    self.state = self.line_start_state();
                }
                _ => self.skip_line(
                    token,
                    DiagnosticCode::ExpectedComma,
                    "Expected comma after operand.".to_string(),
                ),
            },
        }
    }

    fn process_statement(&mut self, token: &Token) {
        if self.version.is_none() && !token.is_end_of_line() && token.kind != TokenKind::Directive
        {
            self.error(
                token,
                DiagnosticCode::ExpectedVersion,
                "Expected .version before any other statement.".to_string(),
            );
            self.state = State::Terminate;
            return;
        }
        match token.kind {
            TokenKind::Directive => self.process_directive(token),
            TokenKind::Label if self.in_procedure => {
                let name = token.label_name().to_string();
                if self.labels.contains_key(&name) {
                    self.error(
                        token,
                        DiagnosticCode::LabelAlreadyDefined,
                        format!("'{}' has already been defined.", name),
                    );
                } else {
                    self.labels.insert(name, self.proc_data.len());
                }
            }
            TokenKind::Opcode if self.in_procedure => self.begin_opcode(token),
            TokenKind::Label | TokenKind::Opcode => self.skip_line(
                token,
                DiagnosticCode::OpcodeOutsideProc,
                "Opcode can only appear within a procedure.".to_string(),
            ),
            _ if token.is_end_of_line() => {}
            _ => self.skip_line(
                token,
                DiagnosticCode::ExpectedOpcode,
                "Expected opcode.".to_string(),
            ),
        }
    }

    fn process_directive(&mut self, token: &Token) {
        if self.version.is_none() && token.text != ".version" {
            self.error(
                token,
                DiagnosticCode::ExpectedVersion,
                "Expected .version before any other directive.".to_string(),
            );
            self.state = State::Terminate;
            return;
        }
        match token.text.as_str() {
            ".version" => self.state = State::ExpectVersion,
            ".init" | ".main" | ".event" => {
                let kind = match token.text.as_str() {
                    ".init" => ScriptKind::Init,
                    ".main" => ScriptKind::Main,
                    _ => ScriptKind::Event,
                };
                self.end_procedure();
                let buffer = self.buffers.entry(kind).or_default();
                let duplicate = buffer.declared;
                buffer.declared = true;
                self.kind = kind;
                if duplicate {
                    self.error(
                        token,
                        DiagnosticCode::ScriptAlreadyDefined,
                        format!("'{}' has already been defined.", token.text),
                    );
                }
                if self.version.is_some_and(|v| !v.has_procedures()) {
                    self.begin_procedure(None);
                }
                self.state = self.line_start_state();
            }
            ".proc" => {
                if self.version.is_some_and(|v| v.has_procedures()) {
                    self.end_procedure();
                    self.state = State::ExpectProcName;
                } else {
                    self.skip_line(
                        token,
                        DiagnosticCode::ProcNotSupported,
                        "Procedures are not supported in this version.".to_string(),
                    );
                }
            }
            _ => self.skip_line(
                token,
                DiagnosticCode::UnknownDirective,
                format!("Unknown directive '{}'.", token.text),
            ),
        }
    }

    fn process_version(&mut self, token: &Token) {
        let version = (token.kind == TokenKind::Number)
            .then(|| parse_number(&token.text))
            .flatten()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| BioVersion::try_from(n).ok());
        if self.version.is_some() {
            self.skip_line(
                token,
                DiagnosticCode::ExpectedVersion,
                "Version has already been set.".to_string(),
            );
            return;
        }
        match version {
            Some(version) => {
                self.version = Some(version);
                if version.has_procedures() {
                    self.state = State::Default;
                } else {
                    self.begin_procedure(None);
                    self.state = State::ExpectOpcode;
                }
            }
            None => {
                self.error(
                    token,
                    DiagnosticCode::ExpectedVersion,
                    "Expected version number 1, 2 or 3.".to_string(),
                );
                self.state = State::Terminate;
            }
        }
    }

    fn begin_procedure(&mut self, name: Option<&str>) {
        self.in_procedure = true;
        self.proc_data.clear();
        self.labels.clear();
        self.label_refs.clear();
        let buffer = self.buffers.entry(self.kind).or_default();
        if let Some(name) = name {
            let index = buffer.procedures.len();
            buffer.names.insert(name.to_string(), index);
        }
    }

    /// Patches label references and appends the procedure to the current buffer.
    fn end_procedure(&mut self) {
        if !self.in_procedure {
            return;
        }
        self.in_procedure = false;
        let refs = std::mem::take(&mut self.label_refs);
        for r in refs {
            let Some(&target) = self.labels.get(&r.name) else {
                self.error(
                    &r.token,
                    DiagnosticCode::UndefinedLabel,
                    format!("'{}' is not defined.", r.name),
                );
                continue;
            };
            let field = &mut self.proc_data[r.field..r.field + r.width];
            let placeholder = if r.width == 2 {
                i16::from_le_bytes([field[0], field[1]]) as i64
            } else {
                field[0] as i64
            };
            let value = placeholder + target as i64 - r.field as i64 + r.width as i64;
            debug!(
                "label {} -> 0x{:04X}: field 0x{:04X} = {}",
                r.name, target, r.field, value
            );
            if r.width == 2 {
                field.copy_from_slice(&(value as i16).to_le_bytes());
            } else {
                field[0] = value as u8;
            }
            if !label_range(r.kind, r.width).contains(&value) {
                self.error(
                    &r.token,
                    DiagnosticCode::LabelOutOfRange,
                    format!("'{}' is out of range.", r.name),
                );
            }
        }

        let data = std::mem::take(&mut self.proc_data);
        let buffer = self.buffers.entry(self.kind).or_default();
        debug!(
            "{} procedure {}: {} bytes",
            self.kind,
            buffer.procedures.len(),
            data.len()
        );
        if data.is_empty() && !buffer.declared && self.version.is_some_and(|v| !v.has_procedures())
        {
            return;
        }
        buffer.procedures.push(data);
    }

    fn begin_opcode(&mut self, token: &Token) {
        self.operand_count = 0;
        self.operand = Operand::default();
        self.combine = Combine::Set;
        if matches!(token.text.as_str(), "db" | "unk") {
            self.shape = OpcodeShape::Raw { min: 1 };
            self.state = State::ExpectOperand;
            return;
        }
        let table = self.table();
        let Some(opcode) = table.find_opcode(&token.text) else {
            self.skip_line(
                token,
                DiagnosticCode::UnknownOpcode,
                format!("Unknown opcode '{}'.", token.text),
            );
            return;
        };
        let signature = table.signature(opcode);
        let chars = match signature_operands(signature) {
            Some(chars) => chars.chars().collect(),
            None => vec!['u'; table.instruction_size(opcode).saturating_sub(1)],
        };
        self.shape = OpcodeShape::Signature(chars);
        self.proc_data.push(opcode);
        self.state = State::ExpectOperand;
    }

    /// Folds one number or symbol into the pending operand.
    fn add_term(&mut self, token: &Token) {
        let slot = match &self.shape {
            OpcodeShape::Signature(chars) => chars.get(self.operand_count).copied(),
            OpcodeShape::Raw { .. } => None,
        };
        let value = if token.kind == TokenKind::Number {
            match parse_number(&token.text) {
                Some(v) => v,
                None => {
                    self.skip_line(
                        token,
                        DiagnosticCode::InvalidSymbol,
                        format!("Invalid number '{}'.", token.text),
                    );
                    return;
                }
            }
        } else if slot.is_some_and(is_label_char) {
            if self.combine != Combine::Set || self.operand.label.is_some() {
                self.skip_line(
                    token,
                    DiagnosticCode::InvalidSymbol,
                    "A label must be the first term of an operand.".to_string(),
                );
                return;
            }
            self.operand.label = Some(token.clone());
            0
        } else {
            match self.resolve_symbol(&token.text) {
                Some(v) => v,
                None => {
                    self.skip_line(
                        token,
                        DiagnosticCode::UnknownSymbol,
                        format!("Unknown symbol '{}'.", token.text),
                    );
                    return;
                }
            }
        };
        self.operand.value = match self.combine {
            Combine::Set => value,
            Combine::Add => self.operand.value + value,
            Combine::Sub => self.operand.value - value,
            Combine::Or => self.operand.value | value,
        };
    }

    fn resolve_symbol(&self, symbol: &str) -> Option<i64> {
        if let Some(&index) = self
            .buffers
            .get(&self.kind)
            .and_then(|b| b.names.get(symbol))
        {
            return Some(index as i64);
        }
        if let Some(room) = symbol.strip_prefix("RDT_") {
            if room.len() >= 2 {
                let (stage, room) = room.split_at(room.len() - 2);
                let stage = u8::from_str_radix(stage, 16).ok()?;
                let room = u8::from_str_radix(room, 16).ok()?;
                return Some(((stage as i64) << 5) | room as i64);
            }
        }
        self.table().constant_value(symbol).map(i64::from)
    }

    /// Writes the pending operand into the procedure. False when the line was abandoned.
    fn commit_operand(&mut self, token: &Token) -> bool {
        let operand = std::mem::take(&mut self.operand);
        self.combine = Combine::Set;
        let slot = match &self.shape {
            OpcodeShape::Signature(chars) => Some(chars.get(self.operand_count).copied()),
            OpcodeShape::Raw { .. } => None,
        };
        let slot = match slot {
            Some(None) => {
                self.skip_line(
                    token,
                    DiagnosticCode::TooManyOperands,
                    "Too many operands for this opcode.".to_string(),
                );
                return false;
            }
            Some(c) => c,
            None => None,
        };
        self.operand_count += 1;
        let width = slot.map_or(1, operand_width);
        let (min, max) = match slot {
            Some('I' | '~' | '@') => (i16::MIN as i64, i16::MAX as i64),
            _ if width == 2 => (i16::MIN as i64, u16::MAX as i64),
            _ => (i8::MIN as i64, u8::MAX as i64),
        };
        if !(min..=max).contains(&operand.value) {
            self.warning(
                token,
                DiagnosticCode::ValueTruncated,
                format!("{} does not fit in {} byte(s).", operand.value, width),
            );
        }
        if let Some(label) = operand.label {
            self.label_refs.push(LabelRef {
                name: label.text.clone(),
                field: self.proc_data.len(),
                width,
                kind: slot.unwrap_or('l'),
                token: label,
            });
        }
        if width == 2 {
            self.proc_data
                .extend_from_slice(&(operand.value as u16).to_le_bytes());
        } else {
            self.proc_data.push(operand.value as u8);
        }
        true
    }

    fn end_opcode(&mut self, token: &Token) {
        let expected = match &self.shape {
            OpcodeShape::Signature(chars) => chars.len() == self.operand_count,
            OpcodeShape::Raw { min } => self.operand_count >= *min,
        };
        if !expected {
            self.error(
                token,
                DiagnosticCode::IncorrectOperandCount,
                "Incorrect number of operands for opcode.".to_string(),
            );
        }
    }

    fn output(&self) -> AssembledScript {
        let version = self.version;
        let render = |kind: ScriptKind| {
            let buffer = self.buffers.get(&kind)?;
            if !buffer.declared && buffer.procedures.is_empty() {
                return None;
            }
            Some(match version {
                Some(BioVersion::Biohazard1) => flat_buffer(kind, &buffer.procedures),
                _ => procedure_buffer(&buffer.procedures),
            })
        };
        AssembledScript {
            version,
            init: render(ScriptKind::Init),
            main: render(ScriptKind::Main),
            event: render(ScriptKind::Event),
        }
    }
}

/// Values a patched label field can hold.
fn label_range(kind: char, width: usize) -> std::ops::RangeInclusive<i64> {
    match kind {
        '~' | '@' => i16::MIN as i64..=i16::MAX as i64,
        _ if width == 2 => 0..=u16::MAX as i64,
        _ => 0..=u8::MAX as i64,
    }
}

/// Dialect 1: u16 end position, the body, then padding to four bytes. Event scripts are bare.
fn flat_buffer(kind: ScriptKind, procedures: &[Vec<u8>]) -> Vec<u8> {
    let body = procedures.concat();
    if kind == ScriptKind::Event {
        return body;
    }
    let end = if body.is_empty() { 0 } else { body.len() + 2 };
    let mut out = Vec::with_capacity(body.len() + 5);
    out.extend_from_slice(&(end as u16).to_le_bytes());
    out.extend_from_slice(&body);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// Dialects 2 and 3: u16 offsets from the start of the buffer, then the bodies in order.
fn procedure_buffer(procedures: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offset = procedures.len() * 2;
    for procedure in procedures {
        out.extend_from_slice(&(offset as u16).to_le_bytes());
        offset += procedure.len();
    }
    for procedure in procedures {
        out.extend_from_slice(procedure);
    }
    out
}

/// Convenience wrapper around [`ScdAssembler::assemble`].
pub fn assemble(path: &str, source: &str) -> Result<AssembledScript> {
    ScdAssembler::new().assemble(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn codes(source: &str) -> Vec<(usize, DiagnosticCode)> {
        let mut asm = ScdAssembler::new();
        let _ = asm.assemble("t.s", source);
        asm.diagnostics()
            .iter()
            .map(|d| (d.line, d.code))
            .collect()
    }

    #[test]
    fn single_flag_check() {
        let out = assemble("t.s", ".version 2\n.proc main\n    ck 1, 0, 1\n").unwrap();
        assert_eq!(out.main, Some(vec![0x02, 0x00, 0x21, 0x01, 0x00, 0x01]));
        assert_eq!(out.init, None);
    }

    #[test]
    fn offset_table_counts_from_buffer_start() {
        let out = assemble(
            "t.s",
            ".version 2\n.proc main_00\nevt_end 0\n.proc main_01\nnop\nevt_end 0\n",
        )
        .unwrap();
        assert_eq!(
            out.main,
            Some(vec![0x04, 0x00, 0x06, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00])
        );
    }

    #[test]
    fn forward_goto_is_patched() {
        // goto at 0, label field at 4, target 6: 6 - 4 + 2 = 4
        let source = ".version 2\n.proc main_00\ngoto 0, 0, 0, skip\nskip:\nevt_end 0\n";
        let out = assemble("t.s", source).unwrap();
        assert_eq!(
            out.main.unwrap()[2..],
            [0x17, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn label_plus_offset() {
        let source = ".version 2\n.proc main_00\ngoto 0, 0, 0, skip + 1\nskip:\nevt_end 0\n";
        let out = assemble("t.s", source).unwrap();
        assert_eq!(out.main.unwrap()[6..8], [0x05, 0x00]);
    }

    #[test]
    fn if_block_length_from_label() {
        // if at 0: field at 2, width 2, endif at 8 -> 8 - 2 + 2 = 8
        let source = ".version 2\n.proc main_00\nif 0, done\nck 1, 0, 1\ndone:\nendif\nevt_end 0\n";
        let out = assemble("t.s", source).unwrap();
        assert_eq!(
            out.main.unwrap()[2..],
            [0x06, 0x00, 0x08, 0x00, 0x21, 0x01, 0x00, 0x01, 0x08, 0x01, 0x00]
        );
    }

    #[test]
    fn symbols_and_expressions() {
        let source = ".version 2\n.proc main_00\ngosub main_00\nevt_exec 0xFF, I_GOSUB, main_00\n";
        let out = assemble("t.s", source).unwrap();
        assert_eq!(
            out.main.unwrap()[2..],
            [0x18, 0x00, 0x04, 0xFF, 0x18, 0x00]
        );
        let out = assemble("t.s", ".version 2\n.proc p\ndb 32 | 5, 0x10 + 1, 3 -1\n").unwrap();
        assert_eq!(out.main.unwrap()[2..], [37, 17, 2]);
    }

    #[test]
    fn proc_names_resolve_as_symbols() {
        let source = ".version 2\n.proc first\nevt_end 0\n.proc second\ngosub first\n";
        let out = assemble("t.s", source).unwrap();
        assert_eq!(out.main.unwrap()[6..], [0x18, 0x00]);
    }

    #[test]
    fn unknown_opcode_bytes() {
        let out = assemble("t.s", ".version 2\n.proc p\nunk 0xFF, 1, 2\n").unwrap();
        assert_eq!(out.main.unwrap()[2..], [0xFF, 1, 2]);
    }

    #[test]
    fn dialect1_prefix_and_padding() {
        let out = assemble("t.s", ".version 1\n.init\nnop 0\n.main\n").unwrap();
        assert_eq!(out.init, Some(vec![0x04, 0x00, 0x0E, 0x00]));
        assert_eq!(out.main, Some(vec![0x00, 0x00, 0x00, 0x00]));
    }

    #[test]
    fn errors_are_collected_per_line() {
        let source = ".version 2\n\
                      nop\n\
                      .proc main_00\n\
                      frobnicate 1\n\
                      ck 1, 0\n\
                      ck 1 0 1\n\
                      ck 1, 0, NO_SUCH\n\
                      goto 0, 0, 0, nowhere\n\
                      a:\n\
                      a:\n\
                      .main\n\
                      .main\n";
        assert_eq!(
            codes(source),
            vec![
                (1, DiagnosticCode::OpcodeOutsideProc),
                (3, DiagnosticCode::UnknownOpcode),
                (4, DiagnosticCode::IncorrectOperandCount),
                (5, DiagnosticCode::ExpectedComma),
                (6, DiagnosticCode::UnknownSymbol),
                (9, DiagnosticCode::LabelAlreadyDefined),
                (7, DiagnosticCode::UndefinedLabel),
                (11, DiagnosticCode::ScriptAlreadyDefined),
            ]
        );
    }

    #[test]
    fn missing_version_terminates() {
        assert_eq!(
            codes(".proc main_00\nfoo\nbar\n"),
            vec![(0, DiagnosticCode::ExpectedVersion)]
        );
        assert_eq!(
            codes(".version 7\nfoo\n"),
            vec![(0, DiagnosticCode::ExpectedVersion)]
        );
    }

    #[test]
    fn failure_carries_diagnostics() {
        match assemble("room.s", ".version 2\n.proc p\nck 1\n") {
            Err(ScdError::Assembly(diagnostics)) => {
                assert_eq!(
                    diagnostics[0].to_string(),
                    "room.s(3,5): error SCD0010: Incorrect number of operands for opcode."
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn truncation_is_only_a_warning() {
        let mut asm = ScdAssembler::new();
        let out = asm.assemble("t.s", ".version 2\n.proc p\ndb 300\n").unwrap();
        assert_eq!(out.main.unwrap()[2..], [44]);
        assert_eq!(asm.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn long_if_block_fits_unsigned_length() {
        // field at 2, target 4 + 0x8000: 0x8004 fits a u16 but not an i16
        let mut source = String::from(".version 2\n.proc p\nif 0, done\n");
        source.push_str(&"db 0\n".repeat(0x8000));
        source.push_str("done:\n");
        let out = assemble("t.s", &source).unwrap();
        assert_eq!(out.main.unwrap()[2..6], [0x06, 0x00, 0x04, 0x80]);
    }

    #[test]
    fn backward_branch_out_of_range() {
        let mut source = String::from(".version 2\n.proc p\ntop:\n");
        source.push_str(&"db 0\n".repeat(0x8000));
        source.push_str("goto 0, 0, 0, top\n");
        assert_eq!(
            codes(&source),
            vec![(0x8000 + 3, DiagnosticCode::LabelOutOfRange)]
        );
        assert_eq!(label_range('L', 2), 0..=0xFFFF);
        assert_eq!(label_range('l', 1), 0..=0xFF);
    }

    #[test]
    fn instance_is_single_use() {
        let mut asm = ScdAssembler::new();
        assert!(asm.assemble("t.s", ".version 2\n").is_ok());
        assert!(matches!(
            asm.assemble("t.s", ".version 2\n"),
            Err(ScdError::InvalidOperation(_))
        ));
    }
}
