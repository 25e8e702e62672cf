use std::collections::HashMap;

use lazy_static::lazy_static;

use super::{build_opcode_index, symbol_name, ConstantTable};
use crate::version::BioVersion;

const INSTRUCTION_SIZES: [u8; 144] = [
    1, 2, 1, 2, 4, 2, 4, 4, 2, 1, 3, 1, 1, 6, 4, 2, //
    4, 2, 4, 2, 4, 6, 2, 2, 6, 2, 4, 2, 1, 4, 4, 4, //
    6, 4, 4, 1, 2, 4, 6, 1, 1, 8, 6, 2, 4, 4, 6, 2, //
    6, 6, 6, 4, 10, 6, 3, 2, 2, 16, 16, 3, 1, 2, 2, 3, //
    4, 3, 3, 6, 6, 4, 11, 3, 4, 1, 1, 1, 4, 4, 6, 1, //
    2, 1, 2, 3, 4, 8, 8, 6, 6, 8, 2, 6, 2, 1, 3, 2, //
    22, 32, 40, 20, 28, 10, 2, 22, 30, 14, 16, 2, 4, 4, 4, 2, //
    16, 18, 22, 24, 5, 2, 3, 12, 6, 4, 2, 6, 1, 24, 2, 40, //
    4, 8, 10, 1, 4, 2, 1, 1, 4, 2, 1, 1, 1, 1, 4, 2, //
];

const SIGNATURES: [&str; 144] = [
    // 0x00
    "nop",
    "evt_end",
    "sleep_1",
    "evt_chain",
    "evt_exec:ugp",
    "evt_kill",
    "if:uL",
    "else:u@",
    "endif",
    "sleep",
    "sleeping:U",
    "wsleep",
    "wsleeping",
    "for:uLU",
    "",
    "next",
    // 0x10
    "while:uL",
    "ewhile",
    "do:uL",
    "edwhile:'",
    "switch:uL",
    "case:uuuuu",
    "default",
    "eswitch",
    "goto:uuu~",
    "gosub",
    "return",
    "break",
    "break_point",
    "",
    "set_1e",
    "set_1f",
    // 0x20
    "calc_op",
    "",
    "evt_cut",
    "",
    "chaser_evt_clr",
    "map_open",
    "point_add",
    "door_ck",
    "diedemo_on",
    "dir_ck",
    "parts_set",
    "vloop_set",
    "ota_be_set",
    "line_begin",
    "line_main",
    "line_end",
    // 0x30
    "light_pos_set",
    "light_kido_set",
    "light_color_set",
    "ahead_room_set",
    "espr_ctr",
    "eval_bgm_tbl_ck",
    "item_get_ck",
    "om_rev",
    "chaser_life_init",
    "parts_bomb",
    "parts_down",
    "chaser_item_set",
    "weapon_chg_old",
    "sel_evt_on",
    "item_lost",
    "floor_set",
    // 0x40
    "memb_set",
    "memb_set2",
    "memb_cpy",
    "memb_cmp",
    "memb_calc",
    "memb_calc2",
    "fade_set",
    "work_set",
    "spd_set",
    "add_spd",
    "add_aspd",
    "add_vspd",
    "ck:uuu",
    "set:uuu",
    "cmp:uucI",
    "rnd",
    // 0x50
    "cut_chg",
    "cut_old",
    "cut_auto",
    "cut_replace",
    "cut_be_set",
    "pos_set",
    "dir_set",
    "set_vib0",
    "set_vib1",
    "set_vib_fade",
    "rbj_set",
    "message_on",
    "rain_set",
    "message_off",
    "shake_on",
    "weapon_chg",
    // 0x60
    "",
    "door_aot_se:usauuIIIIIIIIuuuuuuuutu",
    "door_aot_set_4p:usauuIIIIIIIIIIIIuuuuuuuutu",
    "aot_set:usauuIIIIuuuuuu",
    "aot_set_4p:usauuIIIIIIIIuuuuuu",
    "aot_reset:usauuuuuu",
    "aot_on",
    "item_aot_set:usauuIIUUTUUuu",
    "item_aot_set_4p:usauuIIIIIIIITUUuu",
    "kage_set",
    "super_set",
    "keep_item_ck",
    "key_ck",
    "trg_ck",
    "sca_id_set",
    "om_bomb",
    // 0x70
    "espr_on",
    "espr_on2",
    "espr3d_on",
    "espr3d_on2",
    "espr_kill",
    "espr_kill2",
    "espr_kill_all",
    "se_on",
    "bgm_ctl",
    "xa_on",
    "movie_on",
    "bgm_tbl_set",
    "status_on",
    "em_set:uueuuuuuuuuIIIIUU",
    "mizu_div",
    "om_set",
    // 0x80
    "plc_motion",
    "plc_dest",
    "plc_neck",
    "plc_ret",
    "plc_flg",
    "plc_gun",
    "plc_gun_eff",
    "plc_stop",
    "plc_rot",
    "plc_cnt",
    "splc_ret",
    "splc_sce",
    "plc_sce",
    "spl_weapon_chg",
    "plc_mot_num",
    "em_reset",
];

const ENEMY_NAMES: [&str; 93] = [
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "Zombie (Guy 1)",
    "Zombie (Girl 1)",
    "Zombie (Fat)",
    "Zombie (Girl 2)",
    "Zombie (RPD 1)",
    "Zombie (Guy 2)",
    "Zombie (Guy 3)",
    "Zombie (Guy 4)",
    "Zombie (Naked)",
    "Zombie (Guy 5)",
    "Zombie (Guy 6)",
    "Zombie (Lab)",
    "Zombie (Girl 3)",
    "Zombie (RPD 2)",
    "Zombie (Guy 7)",
    "Zombie (Guy 8)",
    "Cerberus",
    "Crow",
    "Hunter",
    "BS23",
    "HunterGamma",
    "Spider",
    "MiniSpider",
    "MiniBrainsucker",
    "BS28",
    "",
    "",
    "",
    "",
    "Arm",
    "",
    "",
    "",
    "",
    "MiniWorm",
    "",
    "Nemesis",
    "",
    "Nemesis 3",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "Nikolai Zinoviev",
    "Brad Vickers",
    "Dario Rosso",
    "Murphy Seeker",
    "",
    "",
    "Brad (Zombie)",
    "Dario (Zombie)",
    "Promo Girl",
    "",
    "Carlos Oliveira",
];

const ITEM_NAMES: [&str; 134] = [
    "",
    "Combat Knife",
    "Handgun Sigpro",
    "Handgun Beretta",
    "Shotgun Benelli",
    "Magnum SW",
    "Grenade Launcher (Burst)",
    "Grenade Launcher (Flame)",
    "Grenade Launcher (Acid)",
    "Grenade Launcher (Freeze)",
    "Rocket Launcher",
    "Gatling Gun",
    "Mine Thrower",
    "Hangun Eagle",
    "Rifle M4A1 (Manual)",
    "Rifle M4A1 (Auto)",
    "Shotgun M37",
    "Handgun Sigpro (Enhanced)",
    "Handgun Beretta (Enhanced)",
    "Shotgun Benelli (Enhanced)",
    "Mine Thrower (Enhanced)",
    "Handgun Ammo",
    "Magnum Ammo",
    "Shotgun Ammo",
    "Grenade Rounds",
    "Flame Rounds",
    "Acid Rounds",
    "Freeze Rounds",
    "Mine Thrower Ammo",
    "Rifle Ammo",
    "Handgun Enhanced Ammo",
    "Shotgun Enhanced Ammo",
    "First Aid Spray",
    "Herb (G)",
    "Herb (B)",
    "Herb (R)",
    "Herb (GG)",
    "Herb (GB)",
    "Herb (GR)",
    "Herb (GGG)",
    "Herb (GGB)",
    "Herb (GRB)",
    "First Aid Spray Box",
    "Crank",
    "Medal (Red)",
    "Medal (Blue)",
    "Medal (Gold)",
    "STARS Card (Jill)",
    "Oil Can",
    "Battery",
    "Fire Hook",
    "Power Cable",
    "Fuse",
    "Broken Fire Hose",
    "Oil Additive",
    "Card case (Brad)",
    "STARS Card (Brad)",
    "Machine Oil",
    "Mixed Oil",
    "Unknown Steel Chain",
    "Wrench",
    "Iron Pipe",
    "Unknown Cylinder",
    "Fire Hose",
    "Tape Recorder",
    "Lighter (Oil)",
    "Lighter (No Oil)",
    "Lighter",
    "Gem (Green)",
    "Gem (Blue)",
    "Ball (Amber)",
    "Ball (Obsidian)",
    "Ball (Crystal)",
    "Remote Control (No Batteries)",
    "Remote Control (Batteries)",
    "AA Batteries",
    "Gear (Gold)",
    "Gear (Silver)",
    "Gear (Chronos)",
    "Bronze Book",
    "Bronze Compass",
    "Vaccine Medium",
    "Vaccine Base",
    "",
    "",
    "Vaccine",
    "",
    "",
    "Medium Base",
    "EAGLE Parts (A)",
    "EAGLE Parts (B)",
    "M37 Parts (A)",
    "M37 Parts (B)",
    "",
    "Chronos Chain",
    "Rusted Crank",
    "Card Key",
    "Gunpowder (A)",
    "Gunpowder (B)",
    "Gunpowder (C)",
    "Gunpowder (AA)",
    "Gunpowder (BB)",
    "Gunpowder (AC)",
    "Gunpowder (BC)",
    "Gunpowder (CC)",
    "Gunpowder (AAA)",
    "Gunpowder (AAB)",
    "Gunpowder (BBA)",
    "Gunpowder (BBB)",
    "Gunpowder (CCC)",
    "Infinite Bullets",
    "Water Sample",
    "System Disk",
    "Dummy Key",
    "Lockpick",
    "Warehouse Key",
    "Sickroom Key",
    "Emblem Key",
    "Keyring With 4 Unknown Keys",
    "Clock Tower Key (Bezel)",
    "Clock Tower Key (Winder)",
    "Chronos Key",
    "",
    "Park Key (Front)",
    "Park Key (Graveyard)",
    "Park Key (Rear)",
    "Facility Key (No barcode)",
    "Facility Key (Barcode)",
    "Boutique Key",
    "Ink Ribbon",
    "Reloading Tool",
    "Game Instructions (A)",
    "Game Instructions (B)",
    "Game Instructions (A2)",
];

const NAMED_FLAGS: [((u8, u8), &str); 7] = [
    ((0, 23), "game.easy"),
    ((0, 0x19), "game.difficult"),
    ((1, 0), "game.player"),
    ((1, 1), "game.scenario"),
    ((1, 6), "game.bonus"),
    ((1, 0x1B), "game.cutscene"),
    ((0xB, 0x1F), "input.question"),
];

lazy_static! {
    static ref OPCODE_INDEX: HashMap<&'static str, u8> = build_opcode_index(&SIGNATURES);
}

/// Dialect 3. Shares the procedure layout with dialect 2 but renumbers most opcodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bio3ConstantTable;

impl ConstantTable for Bio3ConstantTable {
    fn version(&self) -> BioVersion {
        BioVersion::Biohazard3
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
        matches!(opcode, 0x4C | 0x4E | 0x6B | 0x6C | 0x6D)
    }

    fn gosub_opcode(&self) -> u8 {
        0x19
    }

    fn aot_opcodes(&self) -> Option<[u8; 3]> {
        Some([0x65, 0x63, 0x64])
    }

    fn enemy_name(&self, kind: u8) -> String {
        self.enemy_constant(kind)
            .unwrap_or_else(|| format!("ENEMY_{:02X}", kind))
    }

    fn item_name(&self, kind: u8) -> String {
        self.item_constant(kind)
            .unwrap_or_else(|| "ITEM_UNKNOWN".to_string())
    }

    fn enemy_constant(&self, kind: u8) -> Option<String> {
        ENEMY_NAMES
            .get(kind as usize)
            .filter(|name| !name.is_empty())
            .map(|name| symbol_name("ENEMY_", name))
    }

    fn item_constant(&self, kind: u8) -> Option<String> {
        ITEM_NAMES
            .get(kind as usize)
            .filter(|name| !name.is_empty())
            .map(|name| symbol_name("ITEM_", name))
    }

    fn named_flag(&self, bit_array: u8, index: u8) -> Option<&'static str> {
        NAMED_FLAGS
            .iter()
            .find(|(key, _)| *key == (bit_array, index))
            .map(|(_, name)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names() {
        let table = Bio3ConstantTable;
        assert_eq!(table.enemy_name(0x10), "ENEMY_ZOMBIE_GUY_1");
        assert_eq!(table.enemy_name(0x34), "ENEMY_NEMESIS");
        assert_eq!(table.enemy_name(0x00), "ENEMY_00");
        assert_eq!(table.item_name(2), "ITEM_HANDGUN_SIGPRO");
        assert_eq!(table.get_constant('t', 0x53), None);
        assert_eq!(table.constant_value("ITEM_HERB_GR"), Some(0x26));
    }

    #[test]
    fn opcodes() {
        let table = Bio3ConstantTable;
        assert_eq!(table.find_opcode("ck"), Some(0x4C));
        assert_eq!(table.find_opcode("em_set"), Some(0x7D));
        assert_eq!(table.instruction_size(0x7D), 24);
        assert_eq!(table.opcode_name(0x0E), None);
        assert_eq!(table.constant_value("I_GOSUB"), Some(0x19));
        assert_eq!(table.named_flag(0, 23), Some("game.easy"));
    }
}
