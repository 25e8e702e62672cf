//! Per-dialect opcode and symbol tables.
//!
//! Every dialect gets a zero-sized table type with static data behind it. Tables hold no mutable
//! state, so [`constant_table`] hands out `&'static` references that can be shared across threads.

mod bio1;
mod bio2;
mod bio3;

use std::collections::HashMap;

use bitflags::bitflags;
use itertools::Itertools;

use crate::version::BioVersion;

pub use bio1::Bio1ConstantTable;
pub use bio2::Bio2ConstantTable;
pub use bio3::Bio3ConstantTable;

pub const SCE_EVENT: u8 = 5;

pub(crate) const COMPARATOR_NAMES: [&str; 6] =
    ["CMP_EQ", "CMP_GT", "CMP_GE", "CMP_LT", "CMP_LE", "CMP_NE"];
pub(crate) const COMPARATOR_SYMBOLS: [&str; 6] = ["==", ">", ">=", "<", "<=", "!="];

pub(crate) const OPERATOR_NAMES: [&str; 12] = [
    "OP_ADD", "OP_SUB", "OP_MUL", "OP_DIV", "OP_MOD", "OP_OR", "OP_AND", "OP_XOR", "OP_NOT",
    "OP_LSL", "OP_LSR", "OP_ASR",
];
pub(crate) const OPERATOR_SYMBOLS: [&str; 12] =
    ["+", "-", "*", "/", "%", "|", "&", "^", "~", "<<", ">>", ">>>"];

const SAT_NAMES: [&str; 8] = [
    "SAT_PL",
    "SAT_EM",
    "SAT_SPL",
    "SAT_OB",
    "SAT_MANUAL",
    "SAT_FRONT",
    "SAT_UNDER",
    "0x80",
];

const SCE_NAMES: [&str; 15] = [
    "SCE_AUTO",
    "SCE_DOOR",
    "SCE_ITEM",
    "SCE_NORMAL",
    "SCE_MESSAGE",
    "SCE_EVENT",
    "SCE_FLAG_CHG",
    "SCE_WATER",
    "SCE_MOVE",
    "SCE_SAVE",
    "SCE_ITEMBOX",
    "SCE_DAMAGE",
    "SCE_STATUS",
    "SCE_HIKIDASHI",
    "SCE_WINDOWS",
];

const WORK_KIND_NAMES: [&str; 7] = [
    "WK_NONE",
    "WK_PLAYER",
    "WK_SPLAYER",
    "WK_ENEMY",
    "WK_OBJECT",
    "WK_DOOR",
    "WK_ALL",
];

bitflags! {
    /// Trigger mask of an AOT: which entities can set it off, and how.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sat: u8 {
        const PL = 0x01;
        const EM = 0x02;
        const SPL = 0x04;
        const OB = 0x08;
        const MANUAL = 0x10;
        const FRONT = 0x20;
        const UNDER = 0x40;
        const UNK80 = 0x80;
    }
}

/// Renders a SAT mask: `SAT_AUTO` for zero, otherwise the set bits joined by ` | `.
pub fn sat_name(value: u8) -> String {
    let sat = Sat::from_bits_retain(value);
    if sat.is_empty() {
        return "SAT_AUTO".to_string();
    }
    sat.iter()
        .map(|flag| SAT_NAMES[flag.bits().trailing_zeros() as usize])
        .join(" | ")
}

fn work_kind_name(value: i32) -> Option<String> {
    let name = match value {
        0x80 => "WK_PL_PARTS",
        0xA0 => "WK_SPL_PARTS",
        0xC0 => "WK_EM_PARTS",
        0xE0 => "WK_OM_PARTS",
        v => WORK_KIND_NAMES.get(usize::try_from(v).ok()?)?,
    };
    Some(name.to_string())
}

fn indexed(names: &[&str], value: i32) -> Option<String> {
    let i = usize::try_from(value).ok()?;
    names.get(i).map(|s| s.to_string())
}

/// `ENEMY_` / `ITEM_` style symbol from a display name.
pub(crate) fn symbol_name(prefix: &str, name: &str) -> String {
    let body = name.replace(' ', "_").replace(['(', ')'], "").to_uppercase();
    format!("{prefix}{body}")
}

/// Mnemonic part of a signature (`"aot_on"` for `"aot_on:u"`).
pub fn signature_name(signature: &str) -> &str {
    match signature.split_once(':') {
        Some((name, _)) => name,
        None => signature,
    }
}

/// Operand characters of a signature; `None` when the signature has no operand list.
pub fn signature_operands(signature: &str) -> Option<&str> {
    signature.split_once(':').map(|(_, ops)| ops)
}

pub(crate) fn build_opcode_index(signatures: &[&'static str]) -> HashMap<&'static str, u8> {
    let mut index = HashMap::new();
    for (i, sig) in signatures.iter().enumerate() {
        if sig.is_empty() {
            continue;
        }
        // first definition wins
        index.entry(signature_name(sig)).or_insert(i as u8);
    }
    index
}

/// Symbol and opcode knowledge for a single dialect.
pub trait ConstantTable: Sync {
    fn version(&self) -> BioVersion;

    fn instruction_sizes(&self) -> &'static [u8];

    fn signatures(&self) -> &'static [&'static str];

    fn opcode_index(&self) -> &'static HashMap<&'static str, u8>;

    fn is_condition(&self, opcode: u8) -> bool;

    fn gosub_opcode(&self) -> u8;

    /// Opcodes of `aot_reset`, `aot_set` and `aot_set_4p`, when the dialect has them.
    fn aot_opcodes(&self) -> Option<[u8; 3]> {
        None
    }

    fn enemy_name(&self, kind: u8) -> String;

    fn item_name(&self, kind: u8) -> String;

    /// Enemy constant; `None` when the id has no distinct name.
    fn enemy_constant(&self, kind: u8) -> Option<String>;

    /// Item constant; `None` when the id has no distinct name.
    fn item_constant(&self, kind: u8) -> Option<String>;

    fn comparator_names(&self) -> &'static [&'static str] {
        &COMPARATOR_NAMES
    }

    fn comparator_symbols(&self) -> &'static [&'static str] {
        &COMPARATOR_SYMBOLS
    }

    fn named_flag(&self, _bit_array: u8, _index: u8) -> Option<&'static str> {
        None
    }

    /// Fixed instruction length, or 0 when the opcode is unknown or variable-length.
    fn instruction_size(&self, opcode: u8) -> usize {
        self.instruction_sizes()
            .get(opcode as usize)
            .map_or(0, |&s| s as usize)
    }

    fn signature(&self, opcode: u8) -> &'static str {
        self.signatures().get(opcode as usize).copied().unwrap_or("")
    }

    fn opcode_name(&self, opcode: u8) -> Option<&'static str> {
        let sig = self.signature(opcode);
        if sig.is_empty() {
            None
        } else {
            Some(signature_name(sig))
        }
    }

    fn find_opcode(&self, name: &str) -> Option<u8> {
        self.opcode_index().get(name).copied()
    }

    fn comparator_symbol(&self, value: u8) -> &'static str {
        self.comparator_symbols()
            .get(value as usize)
            .copied()
            .unwrap_or("?")
    }

    fn get_constant(&self, kind: char, value: i32) -> Option<String> {
        match kind {
            'e' => self.enemy_constant(u8::try_from(value).ok()?),
            't' | 'T' => match value {
                255 => Some("LOCKED".to_string()),
                254 => Some("UNLOCK".to_string()),
                0 => Some("UNLOCKED".to_string()),
                v => self.item_constant(u8::try_from(v).ok()?),
            },
            'c' => indexed(self.comparator_names(), value),
            'o' => indexed(&OPERATOR_NAMES, value),
            's' => indexed(&SCE_NAMES, value),
            'a' => Some(sat_name(u8::try_from(value).ok()?)),
            'w' => work_kind_name(value),
            'g' if value == self.gosub_opcode() as i32 => Some("I_GOSUB".to_string()),
            'p' => Some(format!("main_{:02X}", u8::try_from(value).ok()?)),
            _ => None,
        }
    }

    /// Constants whose meaning depends on neighbouring operands: an event AOT's embedded
    /// opcode and procedure index.
    fn get_contextual_constant(&self, opcode: u8, operand: usize, bytes: &[u8]) -> Option<String> {
        let [reset, set, set_4p] = self.aot_opcodes()?;
        let (g_operand, g_byte) = if opcode == reset {
            (5, 6)
        } else if opcode == set {
            (11, 16)
        } else if opcode == set_4p {
            (15, 24)
        } else {
            return None;
        };
        if *bytes.get(2)? != SCE_EVENT {
            return None;
        }
        let event_opcode = *bytes.get(g_byte)?;
        if operand == g_operand {
            self.get_constant('g', event_opcode as i32)
        } else if operand == g_operand + 1 && event_opcode == self.gosub_opcode() {
            self.get_constant('p', *bytes.get(g_byte + 1)? as i32)
        } else {
            None
        }
    }

    /// Inverse of [`ConstantTable::get_constant`].
    fn constant_value(&self, symbol: &str) -> Option<i32> {
        match symbol {
            "LOCKED" => return Some(255),
            "UNLOCK" => return Some(254),
            "UNLOCKED" => return Some(0),
            "I_GOSUB" => return Some(self.gosub_opcode() as i32),
            _ => {}
        }
        for prefix in ["main_", "init_"] {
            if let Some(hex) = symbol.strip_prefix(prefix) {
                return i32::from_str_radix(hex, 16).ok();
            }
        }
        let kind = [
            ("ENEMY_", 'e'),
            ("ITEM_", 't'),
            ("CMP_", 'c'),
            ("OP_", 'o'),
            ("SCE_", 's'),
            ("SAT_", 'a'),
            ("WK_", 'w'),
        ]
        .into_iter()
        .find(|(prefix, _)| symbol.starts_with(prefix))
        .map(|(_, kind)| kind)?;
        (0..256).find(|&i| self.get_constant(kind, i).as_deref() == Some(symbol))
    }
}

static BIO1: Bio1ConstantTable = Bio1ConstantTable;
static BIO2: Bio2ConstantTable = Bio2ConstantTable;
static BIO3: Bio3ConstantTable = Bio3ConstantTable;

/// Process-wide table for a dialect.
pub fn constant_table(version: BioVersion) -> &'static dyn ConstantTable {
    match version {
        BioVersion::Biohazard1 => &BIO1,
        BioVersion::Biohazard2 => &BIO2,
        BioVersion::Biohazard3 => &BIO3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sat_names_combine() {
        assert_eq!(sat_name(0), "SAT_AUTO");
        assert_eq!(sat_name(0x01), "SAT_PL");
        assert_eq!(sat_name(0x21), "SAT_PL | SAT_FRONT");
        assert_eq!(sat_name(0x80), "0x80");
    }

    #[test]
    fn symbol_names_are_upper_snake() {
        assert_eq!(symbol_name("ENEMY_", "Zombie (Guy 1)"), "ENEMY_ZOMBIE_GUY_1");
        assert_eq!(symbol_name("ITEM_", "Herb (GR)"), "ITEM_HERB_GR");
    }

    #[test]
    fn shared_symbols_resolve_in_every_dialect() {
        for version in [
            BioVersion::Biohazard1,
            BioVersion::Biohazard2,
            BioVersion::Biohazard3,
        ] {
            let table = constant_table(version);
            assert_eq!(table.version(), version);
            assert_eq!(table.constant_value("LOCKED"), Some(255));
            assert_eq!(table.constant_value("UNLOCKED"), Some(0));
            assert_eq!(table.constant_value("main_1A"), Some(0x1A));
            assert_eq!(table.constant_value("NOT_A_SYMBOL"), None);
        }
    }

    #[test]
    fn sat_and_work_kind_round_trip() {
        let table = constant_table(BioVersion::Biohazard2);
        assert_eq!(table.constant_value("SAT_FRONT"), Some(0x20));
        assert_eq!(table.constant_value("SAT_AUTO"), Some(0));
        assert_eq!(table.constant_value("WK_EM_PARTS"), Some(0xC0));
        assert_eq!(table.get_constant('w', 3).as_deref(), Some("WK_ENEMY"));
        assert_eq!(table.get_constant('s', 42), None);
    }

    #[test]
    fn every_signature_matches_its_instruction_size() {
        for version in [
            BioVersion::Biohazard1,
            BioVersion::Biohazard2,
            BioVersion::Biohazard3,
        ] {
            let table = constant_table(version);
            for opcode in 0..=255u8 {
                let Some(ops) = signature_operands(table.signature(opcode)) else {
                    continue;
                };
                let width: usize = ops
                    .chars()
                    .map(|c| if c.is_ascii_uppercase() || c == '~' || c == '@' { 2 } else { 1 })
                    .sum();
                assert_eq!(
                    width + 1,
                    table.instruction_size(opcode),
                    "dialect {} opcode 0x{:02X} ({})",
                    version,
                    opcode,
                    table.signature(opcode)
                );
            }
        }
    }
}
