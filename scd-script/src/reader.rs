//! Walks a script buffer and reports each opcode to a [`ScriptVisitor`].
//!
//! Dialect 1 buffers start with a u16 end position and hold a single function. Dialects 2 and 3
//! start with a table of u16 function offsets whose first entry also gives the table size.
//! Decoding is best effort: corrupt lengths are clamped and the walk stops quietly.

use byteorder::{ByteOrder, LittleEndian};
use log::{trace, warn};
use num_traits::FromPrimitive;

use crate::constants::constant_table;
use crate::opcode::OpcodeV2;
use crate::version::{BioVersion, ScriptKind};

/// Longest chunk handed out when an opcode's size is unknown or runs past the function end.
const MAX_CLAMPED_SIZE: usize = 16;

/// Receives the decoded stream in address order.
pub trait ScriptVisitor {
    fn version(&mut self, _version: BioVersion) {}

    fn begin_script(&mut self, _kind: ScriptKind) {}

    fn begin_subroutine(&mut self, _index: usize) {}

    /// `bytes` starts with the opcode byte.
    fn opcode(&mut self, _offset: u32, _bytes: &[u8]) {}

    fn trailing_data(&mut self, _offset: u32, _bytes: &[u8]) {}

    fn end_subroutine(&mut self, _index: usize) {}

    fn end_script(&mut self, _kind: ScriptKind) {}
}

/// Decodes `bytes` as a script of the given dialect and kind. Every reported offset has
/// `base_offset` added.
pub fn read_script<V: ScriptVisitor + ?Sized>(
    bytes: &[u8],
    version: BioVersion,
    kind: ScriptKind,
    base_offset: u32,
    visitor: &mut V,
) {
    visitor.version(version);
    visitor.begin_script(kind);
    match version {
        BioVersion::Biohazard1 => read_flat(bytes, kind, base_offset, visitor),
        BioVersion::Biohazard2 | BioVersion::Biohazard3 => {
            read_procedures(bytes, version, base_offset, visitor)
        }
    }
    visitor.end_script(kind);
}

fn read_u16(bytes: &[u8], pos: usize) -> Option<u16> {
    bytes.get(pos..pos + 2).map(LittleEndian::read_u16)
}

fn read_flat<V: ScriptVisitor + ?Sized>(
    bytes: &[u8],
    kind: ScriptKind,
    base_offset: u32,
    visitor: &mut V,
) {
    let table = constant_table(BioVersion::Biohazard1);
    let (mut pos, script_end) = match kind {
        ScriptKind::Event => (0, bytes.len()),
        _ => (2, read_u16(bytes, 0).unwrap_or(0) as usize),
    };
    let script_end = script_end.min(bytes.len());

    visitor.begin_subroutine(0);
    while pos < script_end {
        let opcode = bytes[pos];
        let size = table.instruction_size(opcode);
        if size == 0 {
            trace!("stopping at 0x{:04X}: opcode 0x{:02X} has no fixed size", pos, opcode);
            break;
        }
        let Some(chunk) = bytes.get(pos..pos + size) else {
            break;
        };
        visitor.opcode(base_offset + pos as u32, chunk);
        pos += size;
    }
    visitor.end_subroutine(0);
}

fn read_procedures<V: ScriptVisitor + ?Sized>(
    bytes: &[u8],
    version: BioVersion,
    base_offset: u32,
    visitor: &mut V,
) {
    let table = constant_table(version);
    let sizes = table.instruction_sizes();

    let Some(first) = read_u16(bytes, 0) else {
        warn!("script buffer too short for a procedure table");
        return;
    };
    let count = first as usize / 2;
    let mut offsets = Vec::with_capacity(count + 1);
    offsets.push(first as usize);
    for i in 1..count {
        match read_u16(bytes, i * 2) {
            Some(off) => offsets.push(off as usize),
            None => {
                warn!("procedure table truncated after {} entries", i);
                break;
            }
        }
    }
    let count = offsets.len();
    offsets.push(bytes.len());

    for i in 0..count {
        let is_last = i == count - 1;
        let start = offsets[i].min(bytes.len());
        let end = offsets[i + 1].clamp(start, bytes.len());
        trace!("procedure {}: 0x{:04X}..0x{:04X}", i, start, end);

        visitor.begin_subroutine(i);
        let mut pos = start;
        let mut end_min = start;
        let mut if_depth = 0i32;
        while pos < end {
            let opcode = bytes[pos];
            if is_last && opcode as usize >= sizes.len() {
                break;
            }
            let remaining = end - pos;
            let mut size = table.instruction_size(opcode);
            if size == 0 || size > remaining {
                size = remaining.min(MAX_CLAMPED_SIZE);
                warn!(
                    "clamping opcode 0x{:02X} at 0x{:04X} to {} bytes",
                    opcode,
                    base_offset as usize + pos,
                    size
                );
            }
            let chunk = &bytes[pos..pos + size];
            visitor.opcode(base_offset + pos as u32, chunk);

            let mut finished = false;
            if is_last {
                // both dialects share the numbering of these four opcodes
                match OpcodeV2::from_u8(opcode) {
                    Some(OpcodeV2::EvtEnd) => finished = pos >= end_min && if_depth == 0,
                    Some(OpcodeV2::IfelCk) => {
                        end_min = pos + read_u16(chunk, 2).unwrap_or(0) as usize;
                        if_depth += 1;
                    }
                    Some(OpcodeV2::ElseCk) => {
                        if_depth -= 1;
                        end_min = pos + read_u16(chunk, 2).unwrap_or(0) as usize;
                    }
                    Some(OpcodeV2::EndIf) => if_depth -= 1,
                    _ => {}
                }
            }
            pos += size;
            if finished {
                break;
            }
        }
        if pos < end {
            if is_last {
                warn!("{} trailing bytes after the last procedure", end - pos);
            }
            visitor.trailing_data(base_offset + pos as u32, &bytes[pos..end]);
        }
        visitor.end_subroutine(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ScriptVisitor for Recorder {
        fn begin_subroutine(&mut self, index: usize) {
            self.events.push(format!("begin {}", index));
        }

        fn opcode(&mut self, offset: u32, bytes: &[u8]) {
            self.events.push(format!("{:04X} {:02X?}", offset, bytes));
        }

        fn trailing_data(&mut self, offset: u32, bytes: &[u8]) {
            self.events.push(format!("data {:04X} {}", offset, bytes.len()));
        }

        fn end_subroutine(&mut self, index: usize) {
            self.events.push(format!("end {}", index));
        }
    }

    #[test]
    fn two_procedures_of_nops() {
        let bytes = [0x04, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut rec = Recorder::default();
        read_script(&bytes, BioVersion::Biohazard2, ScriptKind::Main, 0, &mut rec);
        assert_eq!(
            rec.events,
            vec![
                "begin 0",
                "0004 [00]",
                "0005 [00]",
                "end 0",
                "begin 1",
                "0006 [00]",
                "0007 [00]",
                "end 1",
            ]
        );
    }

    #[test]
    fn last_procedure_stops_after_evt_end() {
        // if (len 6) ck; endif; evt_end; padding
        let bytes = [
            0x02, 0x00, 0x06, 0x00, 0x06, 0x00, 0x21, 0x01, 0x00, 0x01, 0x08, 0x01,
            0x00, 0xFF, 0xFF,
        ];
        let mut rec = Recorder::default();
        read_script(&bytes, BioVersion::Biohazard2, ScriptKind::Main, 0x100, &mut rec);
        assert_eq!(
            rec.events,
            vec![
                "begin 0",
                "0102 [06, 00, 06, 00]",
                "0106 [21, 01, 00, 01]",
                "010A [08]",
                "010B [01, 00]",
                "data 010D 2",
                "end 0",
            ]
        );
    }

    #[test]
    fn flat_script_uses_leading_length() {
        // end position 6: ck + evt_end would overflow, so only the ck is read
        let bytes = [0x06, 0x00, 0x04, 0x00, 0x21, 0x01, 0x00, 0x00];
        let mut rec = Recorder::default();
        read_script(&bytes, BioVersion::Biohazard1, ScriptKind::Main, 0, &mut rec);
        assert_eq!(rec.events, vec!["begin 0", "0002 [04, 00, 21, 01]", "end 0"]);
    }

    #[test]
    fn flat_script_stops_on_variable_length_opcode() {
        let bytes = [0x26, 0x01, 0x02, 0x03];
        let mut rec = Recorder::default();
        read_script(&bytes, BioVersion::Biohazard1, ScriptKind::Event, 0, &mut rec);
        assert_eq!(rec.events, vec!["begin 0", "end 0"]);
    }

    #[test]
    fn oversized_opcode_is_clamped() {
        // aot_set needs 20 bytes, only 3 remain in the procedure
        let bytes = [0x02, 0x00, 0x2C, 0x01, 0x02];
        let mut rec = Recorder::default();
        read_script(&bytes, BioVersion::Biohazard2, ScriptKind::Init, 0, &mut rec);
        assert_eq!(rec.events, vec!["begin 0", "0002 [2C, 01, 02]", "end 0"]);
    }
}
