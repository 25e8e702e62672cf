use std::collections::HashMap;

use lazy_static::lazy_static;

use super::{build_opcode_index, symbol_name, ConstantTable};
use crate::version::BioVersion;

const INSTRUCTION_SIZES: [u8; 81] = [
    2, 2, 2, 2, 4, 4, 4, 6, 4, 2, 2, 4, 26, 18, 2, 8, //
    2, 2, 10, 4, 4, 2, 2, 10, 26, 4, 2, 22, 6, 2, 4, 28, //
    14, 14, 4, 2, 4, 4, 0, 2, 4, 2, 12, 4, 2, 4, 0, 4, //
    12, 4, 4, 4, 8, 4, 4, 4, 4, 2, 4, 6, 6, 12, 2, 6, //
    16, 4, 4, 4, 2, 2, 44, 14, 2, 2, 2, 2, 4, 2, 4, 2, //
    2,
];

const SIGNATURES: [&str; 32] = [
    "evt_end:u",
    "if:l",
    "else:l",
    "endif:u",
    "ck:ubu",
    "set:ubu",
    "cmp6:ucu",
    "cmp7:uucI",
    "set8:uuu",
    "cut_set_9:u",
    "cut_set_a:u",
    "",
    "door_aot_se:uIIUUuuuuurIIIIuu",
    "nonitem_set",
    "nop:u",
    "",
    "test_item:t",
    "test_pickup:t",
    "item_12",
    "",
    "",
    "",
    "",
    "",
    "item_aot_set:uIIIItuuuuuuuuuuuuuuu",
    "",
    "",
    "sce_em_set:euuuuuuIuuIIIuuuu",
    "",
    "",
    "",
    "om_set",
];

const ENEMY_NAMES: [&str; 51] = [
    "Zombie (Groundskeeper)",
    "Zombie (Naked)",
    "Cerberus",
    "Spider (Brown)",
    "Spider (Black)",
    "Crow",
    "Hunter",
    "Bee",
    "Plant 42",
    "Chimera",
    "Snake",
    "Neptune",
    "Tyrant 1",
    "Yawn 1",
    "Plant42 (roots)",
    "Fountain Plant",
    "Tyrant 2",
    "Zombie (Researcher)",
    "Yawn 2",
    "Cobweb",
    "Computer Hands (left)",
    "Computer Hands (right)",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Unknown",
    "Chris (Stars)",
    "Jill (Stars)",
    "Barry (Stars)",
    "Rebecca (Stars)",
    "Wesker (Stars)",
    "Kenneth 1",
    "Forrest",
    "Richard",
    "Enrico",
    "Kenneth 2",
    "Barry 2",
    "Barry 2 (Stars)",
    "Rebecca 2 (Stars)",
    "Barry 3",
    "Wesker 2 (Stars)",
    "Chris (Jacket)",
    "Jill (Black Shirt)",
    "Chris 2 (Jacket)",
    "Jill (Red Shirt)",
];

const ITEM_NAMES: [&str; 76] = [
    "Nothing",
    "Combat Knife",
    "Beretta",
    "Shotgun",
    "DumDum Colt",
    "Colt Python",
    "FlameThrower",
    "Bazooka Acid",
    "Bazooka Explosive",
    "Bazooka Flame",
    "Rocket Launcher",
    "Clip",
    "Shells",
    "DumDum Rounds",
    "Magnum Rounds",
    "FlameThrower Fuel",
    "Explosive Rounds",
    "Acid Rounds",
    "Flame Rounds",
    "Empty Bottle",
    "Water",
    "Umb No. 2",
    "Umb No. 4",
    "Umb No. 7",
    "Umb No. 13",
    "Yellow 6",
    "NP-003",
    "V-Jolt",
    "Broken Shotgun",
    "Square Crank",
    "Hex Crank",
    "Wood Emblem",
    "Gold Emblem",
    "Blue Jewel",
    "Red Jewel",
    "Music Notes",
    "Wolf Medal",
    "Eagle Medal",
    "Chemical",
    "Battery",
    "MO Disk",
    "Wind Crest",
    "Flare",
    "Slides",
    "Moon Crest",
    "Star Crest",
    "Sun Crest",
    "Ink Ribbon",
    "Lighter",
    "Lock Pick",
    "Nameless (Can of Oil)",
    "Sword Key",
    "Armor Key",
    "Sheild Key",
    "Helmet Key",
    "Lab Key (1)",
    "Special Key",
    "Dorm Key (002)",
    "Dorm Key (003)",
    "C. Room Key",
    "Lab Key (2)",
    "Small Key",
    "Red Book",
    "Doom Book (2)",
    "Doom Book (1)",
    "F-Aid Spray",
    "Serum",
    "Red Herb",
    "Green Herb",
    "Blue Herb",
    "Mixed (Red+Green)",
    "Mixed (2 Green)",
    "Mixed (Blue + Green)",
    "Mixed (All)",
    "Mixed (Silver Color)",
    "Mixed (Bright Blue-Green)",
];

lazy_static! {
    static ref OPCODE_INDEX: HashMap<&'static str, u8> = build_opcode_index(&SIGNATURES);
}

/// Dialect 1: a single flat function, packed flag operands and a reduced comparator order.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bio1ConstantTable;

impl ConstantTable for Bio1ConstantTable {
    fn version(&self) -> BioVersion {
        BioVersion::Biohazard1
    }

    fn instruction_sizes(&self) -> &'static [u8] {
        &INSTRUCTION_SIZES
    }

    fn signatures(&self) -> &'static [&'static str] {
        &SIGNATURES
    }

    fn opcode_index(&self) -> &'static HashMap<&'static str, u8> {
        &OPCODE_INDEX
    }

    fn is_condition(&self, opcode: u8) -> bool {
        matches!(opcode, 0x04 | 0x06 | 0x07 | 0x10 | 0x11)
    }

    fn gosub_opcode(&self) -> u8 {
        // no gosub in this dialect; an out-of-table opcode never matches a real one
        0xFF
    }

    fn enemy_name(&self, kind: u8) -> String {
        self.enemy_constant(kind)
            .unwrap_or_else(|| "ENEMY_UNKNOWN".to_string())
    }

    fn item_name(&self, kind: u8) -> String {
        self.item_constant(kind)
            .unwrap_or_else(|| "ITEM_UNKNOWN".to_string())
    }

    fn enemy_constant(&self, kind: u8) -> Option<String> {
        match ENEMY_NAMES.get(kind as usize) {
            Some(&"Unknown") | None => None,
            Some(name) => Some(symbol_name("ENEMY_", name)),
        }
    }

    fn item_constant(&self, kind: u8) -> Option<String> {
        ITEM_NAMES
            .get(kind as usize)
            .map(|name| symbol_name("ITEM_", name))
    }

    fn comparator_names(&self) -> &'static [&'static str] {
        &["CMP_EQ", "CMP_LT", "CMP_LE", "CMP_GT", "CMP_GE", "CMP_NE"]
    }

    fn comparator_symbols(&self) -> &'static [&'static str] {
        &["==", "<", "<=", ">", ">=", "!="]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn out_of_range_enemy_is_unknown() {
        let table = Bio1ConstantTable;
        assert_eq!(table.enemy_name(255), "ENEMY_UNKNOWN");
        assert_eq!(table.enemy_name(25), "ENEMY_UNKNOWN");
        assert_eq!(table.enemy_name(2), "ENEMY_CERBERUS");
        assert_eq!(table.get_constant('e', 255), None);
    }

    #[test]
    fn lookups() {
        let table = Bio1ConstantTable;
        assert_eq!(table.instruction_size(0x0C), 26);
        assert_eq!(table.instruction_size(0x26), 0);
        assert_eq!(table.instruction_size(200), 0);
        assert_eq!(table.find_opcode("test_item"), Some(0x10));
        assert_eq!(table.opcode_name(0x0B), None);
        assert_eq!(table.item_name(1), "ITEM_COMBAT_KNIFE");
        assert_eq!(table.item_name(200), "ITEM_UNKNOWN");
        assert_eq!(table.comparator_symbol(1), "<");
        assert_eq!(table.constant_value("CMP_GT"), Some(3));
    }
}
