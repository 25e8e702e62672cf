//! Line-oriented text sink shared by the decompiler modes.
//!
//! Each emitted line remembers the byte range of the opcode it renders. Label positions are
//! collected while writing and only turned into `off_XXXX:` lines when the text is assembled, so
//! forward references need no second pass over the bytecode.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const INDENT: usize = 4;
const LISTING_MNEMONIC_COLUMN: usize = 96;
const ASSEMBLY_MNEMONIC_COLUMN: usize = 4;
const OPERAND_GAP: usize = 24;
const LISTING_HEX_COLUMN: usize = 8;

struct Line {
    offset: Option<u32>,
    len: u32,
    text: String,
    /// Zero-length marker for a position with no instruction (end of a procedure).
    anchor: bool,
}

#[derive(Default)]
pub struct ScriptBuilder {
    pub assembly: bool,
    pub listing: bool,
    lines: Vec<Line>,
    line: String,
    labels: BTreeSet<u32>,
    indent: usize,
    current: Option<(u32, Vec<u8>)>,
}

pub fn label_name(offset: u32) -> String {
    format!("off_{:04X}", offset)
}

impl ScriptBuilder {
    pub fn new(assembly: bool, listing: bool) -> Self {
        ScriptBuilder {
            assembly,
            listing: assembly && listing,
            ..Default::default()
        }
    }

    pub fn reset_indent(&mut self) {
        self.indent = 0;
    }

    pub fn indent(&mut self) {
        self.indent += INDENT;
    }

    pub fn unindent(&mut self) {
        self.indent = self.indent.saturating_sub(INDENT);
    }

    pub fn write(&mut self, s: &str) {
        if self.line.is_empty() {
            self.line.extend(std::iter::repeat(' ').take(self.indent));
        }
        self.line.push_str(s);
    }

    pub fn move_to_column(&mut self, column: usize) {
        if column > self.line.len() {
            let pad = " ".repeat(column - self.line.len());
            self.write(&pad);
        }
    }

    /// Ends the current line, tagging it with the recorded opcode range if any.
    pub fn end_line(&mut self) {
        let text = self.line.trim_end().to_string();
        self.line.clear();
        let (offset, len) = match self.current.take() {
            Some((offset, bytes)) => (Some(offset), bytes.len() as u32),
            None => (None, 0),
        };
        self.lines.push(Line {
            offset,
            len,
            text,
            anchor: false,
        });
    }

    pub fn write_line(&mut self, s: &str) {
        self.write(s);
        self.end_line();
    }

    pub fn record_opcode(&mut self, offset: u32, bytes: &[u8]) {
        self.current = Some((offset, bytes.to_vec()));
    }

    /// Marks `offset` as a position that may receive a label without emitting any text.
    pub fn write_anchor(&mut self, offset: u32) {
        self.lines.push(Line {
            offset: Some(offset),
            len: 0,
            text: String::new(),
            anchor: true,
        });
    }

    pub fn insert_label(&mut self, offset: u32) {
        self.labels.insert(offset);
    }

    pub fn open_block(&mut self) {
        self.write_line("{");
        self.indent();
    }

    pub fn close_block(&mut self) {
        self.unindent();
        self.write_line("}");
    }

    /// One opcode as a line: `name(a, b);` in structured mode, or padded mnemonic and operand
    /// columns in assembly mode (with offset and hex columns in front when listing).
    pub fn write_standard_opcode(&mut self, name: &str, args: &[String]) {
        let mut column = LISTING_MNEMONIC_COLUMN;
        if self.listing {
            let (offset, bytes) = self.current.clone().unwrap_or_default();
            self.write(&format!("{:04X}:", offset));
            self.move_to_column(LISTING_HEX_COLUMN);
            let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            self.write(&hex);
            self.move_to_column(column);
        } else if self.assembly {
            column = ASSEMBLY_MNEMONIC_COLUMN;
            self.move_to_column(column);
        }
        self.write(name);
        if self.assembly {
            self.move_to_column(column + OPERAND_GAP);
            self.write(&args.join(", "));
        } else {
            self.write(&format!("({});", args.join(", ")));
        }
        self.end_line();
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let mut rebased = BTreeMap::new();
        for line in &self.lines {
            if let Some(offset) = line.offset {
                let end = offset + line.len.max(1);
                let mut needs_label = false;
                for &label in self.labels.range(offset..end) {
                    if line.anchor && label != offset {
                        continue;
                    }
                    needs_label = true;
                    if label != offset {
                        rebased.insert(label, offset);
                    }
                }
                if needs_label {
                    out.push('\n');
                    out.push_str(&label_name(offset));
                    out.push_str(":\n");
                }
            }
            if !line.anchor {
                out.push_str(&line.text);
                out.push('\n');
            }
        }
        for (label, base) in rebased {
            let delta = label - base;
            let replacement = format!("{} + {}", label_name(base), delta);
            out = replace_label(&out, &label_name(label), &replacement);
        }
        out
    }
}

/// Replaces whole-word occurrences of `name`.
fn replace_label(text: &str, name: &str, replacement: &str) -> String {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(name) {
        let before = text[..text.len() - rest.len() + pos].chars().next_back();
        let after = &rest[pos + name.len()..];
        let whole = !before.is_some_and(is_ident) && !after.starts_with(is_ident);
        out.push_str(&rest[..pos]);
        out.push_str(if whole { replacement } else { name });
        rest = after;
    }
    out.push_str(rest);
    out
}

impl fmt::Display for ScriptBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembly_columns() {
        let mut sb = ScriptBuilder::new(true, false);
        sb.record_opcode(0x10, &[0x21, 0x01, 0x00, 0x01]);
        sb.write_standard_opcode("ck", &["1".into(), "0".into(), "1".into()]);
        assert_eq!(sb.to_string(), format!("    ck{}1, 0, 1\n", " ".repeat(22)));
    }

    #[test]
    fn listing_columns() {
        let mut sb = ScriptBuilder::new(true, true);
        sb.record_opcode(0x0A, &[0x00]);
        sb.write_standard_opcode("nop", &[]);
        let expected = format!("000A:   00{}nop\n", " ".repeat(96 - 10));
        assert_eq!(sb.to_string(), expected);
    }

    #[test]
    fn structured_blocks_and_trailing_spaces() {
        let mut sb = ScriptBuilder::new(false, false);
        sb.write_line("main_00()");
        sb.open_block();
        sb.write_standard_opcode("nop", &[]);
        sb.write("x   ");
        sb.end_line();
        sb.close_block();
        assert_eq!(sb.to_string(), "main_00()\n{\n    nop();\n    x\n}\n");
    }

    #[test]
    fn labels_land_before_their_line() {
        let mut sb = ScriptBuilder::new(true, false);
        sb.record_opcode(0, &[0x17, 0, 0, 0, 0, 0]);
        sb.write_standard_opcode("goto", &[label_name(6)]);
        sb.record_opcode(6, &[0x00]);
        sb.write_standard_opcode("nop", &[]);
        sb.insert_label(6);
        let text = sb.to_string();
        assert!(text.contains("\noff_0006:\n    nop"), "{}", text);
    }

    #[test]
    fn label_at_offset_zero() {
        let mut sb = ScriptBuilder::new(true, false);
        sb.record_opcode(0, &[0x00]);
        sb.write_standard_opcode("nop", &[]);
        sb.insert_label(0);
        assert!(sb.to_string().starts_with("\noff_0000:\n"));
    }

    #[test]
    fn mid_instruction_label_is_rebased() {
        let mut sb = ScriptBuilder::new(true, false);
        sb.record_opcode(0x20, &[0x01, 0x02, 0x03, 0x04]);
        sb.write_standard_opcode("unk", &[]);
        sb.record_opcode(0x24, &[0x17]);
        sb.write_standard_opcode("goto", &[label_name(0x22)]);
        sb.insert_label(0x22);
        let text = sb.to_string();
        assert!(text.contains("\noff_0020:\n"), "{}", text);
        assert!(text.contains("off_0020 + 2"), "{}", text);
        assert!(!text.contains("off_0022"), "{}", text);
    }

    #[test]
    fn anchor_only_emits_a_label() {
        let mut sb = ScriptBuilder::new(true, false);
        sb.write_anchor(0x30);
        assert_eq!(sb.to_string(), "");
        sb.insert_label(0x30);
        assert_eq!(sb.to_string(), "\noff_0030:\n");
    }

    #[test]
    fn replace_is_whole_word() {
        assert_eq!(
            replace_label("off_0012 off_00120", "off_0012", "X"),
            "X off_00120"
        );
        assert_eq!(
            replace_label("xoff_0012 _off_0012,off_0012", "off_0012", "X"),
            "xoff_0012 _off_0012,X"
        );
    }
}
