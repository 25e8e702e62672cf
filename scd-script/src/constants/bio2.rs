use std::collections::HashMap;

use lazy_static::lazy_static;

use super::{build_opcode_index, ConstantTable};
use crate::version::BioVersion;

const INSTRUCTION_SIZES: [u8; 143] = [
    1, 2, 1, 4, 4, 2, 4, 4, 1, 4, 3, 1, 1, 6, 2, 4, //
    2, 4, 2, 4, 6, 2, 2, 6, 2, 2, 2, 6, 1, 4, 1, 1, //
    1, 4, 4, 6, 4, 3, 6, 4, 1, 2, 1, 6, 20, 38, 3, 4, //
    1, 1, 8, 8, 4, 3, 12, 4, 3, 8, 16, 32, 2, 3, 6, 4, //
    8, 10, 1, 4, 22, 5, 10, 2, 16, 8, 2, 3, 5, 22, 22, 4, //
    4, 6, 6, 6, 22, 6, 4, 8, 4, 4, 2, 2, 3, 2, 2, 2, //
    14, 4, 2, 1, 16, 2, 1, 28, 40, 30, 6, 4, 1, 4, 6, 2, //
    1, 1, 16, 8, 4, 22, 3, 4, 6, 1, 16, 16, 6, 6, 6, 6, //
    2, 3, 3, 1, 2, 6, 1, 1, 3, 1, 6, 6, 8, 24, 24,
];

const SIGNATURES: [&str; 143] = [
    // 0x00
    "nop",
    "evt_end:u",
    "evt_next",
    "evt_chain:uuu",
    "evt_exec:ugp",
    "evt_kill:u",
    "if:uL",
    "else:uL",
    "endif",
    "sleep:uU",
    "sleeping:U",
    "wsleep",
    "wsleeping",
    "for:uLU",
    "next:u",
    "while:uL",
    // 0x10
    "ewhile:u",
    "do:uL",
    "edwhile:'",
    "switch:uL",
    "case:uLU",
    "default:u",
    "eswitch:u",
    "goto:uuu~",
    "gosub:p",
    "return:u",
    "break:u",
    "for2:uLuu",
    "break_point",
    "work_copy:uuu",
    "nop_1e",
    "nop_1f",
    // 0x20
    "nop_20",
    "ck:uuu",
    "set:uuu",
    "cmp:uucI",
    "save:uI",
    "copy:uu",
    "calc:uouI",
    "calc2:ouu",
    "sce_rnd",
    "cut_chg:u",
    "cut_old",
    "message_on:uuuU",
    "aot_set:usauuIIIIuuuuuu",
    "obj_model_set:uuuuuuuUUIIIIIIIIIIIII",
    "work_set:wu",
    "speed_set:uI",
    // 0x30
    "add_speed",
    "add_aspeed",
    "pos_set:uIII",
    "dir_set:uIII",
    "member_set:uI",
    "member_set2:uu",
    "se_on:uIIIII",
    "sca_id_set:uU",
    "flr_set:uu",
    "dir_ck:uIII",
    "sce_espr_on:uUUUIIII",
    "door_aot_se:usauuIIUUIIIIuuuuuuuutu",
    "cut_auto:u",
    "member_copy:uu",
    "member_cmp:uucI",
    "plc_motion:uuu",
    // 0x40
    "plc_dest:uuuII",
    "plc_neck:uIIIuu",
    "plc_ret",
    "plc_flg:uuu",
    "sce_em_set:uueuuuuuuIIIIUU",
    "col_chg_set:uuuu",
    "aot_reset:usauuuuuu",
    "aot_on:u",
    "super_set:uuuIIIIII",
    "super_reset:uIII",
    "plc_gun:u",
    "cut_replace:uu",
    "sce_espr_kill:uuuu",
    "door_model_set:uuuuuUIIIIUUU",
    "item_aot_set:usauuIIUUTUUuu",
    "sce_key_ck:uU",
    // 0x50
    "sce_trg_ck:uU",
    "sce_bgm_control:uuuuu",
    "sce_espr_control:uuuuu",
    "sce_fade_set:uuuU",
    "sce_espr3d_on:uUUUIIIIIII",
    "member_calc:uouI",
    "member_calc2:ouu",
    "sce_bgmtbl_set:uuuUU",
    "plc_rot:uU",
    "xa_on:uU",
    "weapon_chg:t",
    "plc_cnt:u",
    "sce_shake_on:uu",
    "mizu_div_set:u",
    "keep_item_ck:t",
    "xa_vol:u",
    // 0x60
    "kage_set:uuuuuUUUU",
    "cut_be_set:uuu",
    "sce_item_lost:t",
    "plc_gun_eff",
    "sce_espr_on2:uUuuUIIII",
    "sce_espr_kill2:u",
    "plc_stop",
    "aot_set_4p:usauuIIIIIIIIuuuuuu",
    "door_aot_set_4p:usauuIIIIIIIIIIIIuuuuuuuutu",
    "item_aot_set_4p:usauuIIIIIIIITUUuu",
    "light_pos_set:uuuI",
    "light_kido_set:uI",
    "rbj_reset",
    "sce_scr_move:uI",
    "parts_set:uuuI",
    "movie_on:u",
    // 0x70
    "splc_ret",
    "splc_sce",
    "super_on:uuuIIIIII",
    "mirror_set:uUUU",
    "sce_fade_adjust:uI",
    "sce_espr3d_on2:uUUUUUUUUUU",
    "sce_item_get:tu",
    "sce_line_start:uU",
    "sce_line_main:uII",
    "sce_line_end",
    "sce_parts_bomb:uuuuuIIIII",
    "sce_parts_down:uIIIIIII",
    "light_color_set:uuuuu",
    "light_pos_set2:uuuI",
    "light_kido_set2:uuuU",
    "light_color_set2:uuuuu",
    // 0x80
    "se_vol:u",
    "keep_item_ck2:tu",
    "sce_espr_task:uu",
    "plc_heal",
    "st_map_hint:u",
    "sce_em_pos_ck:uuuU",
    "poison_ck",
    "poison_clr",
    "sce_item_lost2:tu",
    "evt_next2",
    "vib_set0:uUU",
    "vib_set1:uUU",
    "vib_fade_set:uuuUU",
    "item_aot_set2:usauuIIUUTUUuuuu",
    "sce_em_set2:uueuuuuuuIIIIUUU",
];

const ENEMY_NAMES: [(u8, &str); 50] = [
    (0x10, "ZombieCop"),
    (0x11, "ZombieBrad"),
    (0x12, "ZombieGuy1"),
    (0x13, "ZombieGirl"),
    (0x15, "ZombieTestSubject"),
    (0x16, "ZombieScientist"),
    (0x17, "ZombieNaked"),
    (0x18, "ZombieGuy2"),
    (0x1E, "ZombieGuy3"),
    (0x1F, "ZombieRandom"),
    (0x20, "Cerebrus"),
    (0x22, "Crow"),
    (0x23, "LickerRed"),
    (0x24, "Alligator"),
    (0x25, "LickerGrey"),
    (0x26, "Spider"),
    (0x27, "BabySpider"),
    (0x2A, "Cockroach"),
    (0x2B, "Tyrant1"),
    (0x2C, "Tyrant2"),
    (0x2E, "ZombieArms"),
    (0x2F, "Ivy"),
    (0x30, "Vines"),
    (0x31, "Birkin1"),
    (0x32, "Birkin2"),
    (0x33, "Birkin3"),
    (0x34, "Birkin4"),
    (0x36, "Birkin5"),
    (0x39, "IvyPurple"),
    (0x3A, "GiantMoth"),
    (0x40, "ChiefIrons1"),
    (0x41, "AdaWong1"),
    (0x42, "ChiefIrons2"),
    (0x43, "AdaWong2"),
    (0x44, "BenBertolucci1"),
    (0x45, "SherryWithPendant"),
    (0x46, "BenBertolucci2"),
    (0x47, "AnnetteBirkin1"),
    (0x48, "RobertKendo"),
    (0x49, "AnnetteBirkin2"),
    (0x4A, "MarvinBranagh"),
    (0x4B, "MayorsDaughter"),
    (0x4F, "SherryWithClairesJacket"),
    (0x50, "LeonKennedyRpd"),
    (0x51, "ClaireRedfield"),
    (0x54, "LeonKennedyBandaged"),
    (0x55, "ClaireRedfieldNoJacket"),
    (0x58, "LeonKennedyCapTankTop"),
    (0x59, "ClaireRedfieldCowGirl"),
    (0x5A, "LeonKennedyBlackLeather"),
];

const ITEM_NAMES: [&str; 100] = [
    "None",
    "Knife",
    "HandgunLeon",
    "HandgunClaire",
    "CustomHandgun",
    "Magnum",
    "CustomMagnum",
    "Shotgun",
    "CustomShotgun",
    "GrenadeLauncherExplosive",
    "GrenadeLauncherFlame",
    "GrenadeLauncherAcid",
    "Bowgun",
    "ColtSAA",
    "Sparkshot",
    "SMG",
    "Flamethrower",
    "RocketLauncher",
    "GatlingGun",
    "Beretta",
    "HandgunAmmo",
    "ShotgunAmmo",
    "MagnumAmmo",
    "FuelTank",
    "ExplosiveRounds",
    "FlameRounds",
    "AcidRounds",
    "SMGAmmo",
    "SparkshotAmmo",
    "BowgunAmmo",
    "InkRibbon",
    "SmallKey",
    "HandgunParts",
    "MagnumParts",
    "ShotgunParts",
    "FAidSpray",
    "AntivirusBomb",
    "ChemicalACw32",
    "HerbG",
    "HerbR",
    "HerbB",
    "HerbGG",
    "HerbGR",
    "HerbGB",
    "HerbGGG",
    "HerbGGB",
    "HerbGRB",
    "Lighter",
    "Lockpick",
    "PhotoSherry",
    "ValveHandle",
    "RedJewel",
    "RedCard",
    "BlueCard",
    "SerpentStone",
    "JaguarStone",
    "JaguarStoneL",
    "JaguarStoneR",
    "EagleStone",
    "BishopPlug",
    "RookPlug",
    "KnightPlug",
    "KingPlug",
    "WeaponBoxKey",
    "Detonator",
    "C4",
    "C4Detonator",
    "Crank",
    "FilmA",
    "FilmB",
    "FilmC",
    "UnicornMedal",
    "EagleMedal",
    "WolfMedal",
    "Cog",
    "ManholeOpener",
    "MainFuse",
    "FuseCase",
    "Vaccine",
    "VaccineCart",
    "FilmD",
    "VaccineBase",
    "GVirus",
    "SpecialKey",
    "JointPlugBlue",
    "JointPlugRed",
    "Cord",
    "PhotoAda",
    "CabinKey",
    "SpadeKey",
    "DiamondKey",
    "HeartKey",
    "ClubKey",
    "DownKey",
    "UpKey",
    "PowerRoomKey",
    "MODisk",
    "UmbrellaKeyCard",
    "MasterKey",
    "PlatformKey",
];

pub(crate) const NAMED_FLAGS: [((u8, u8), &str); 6] = [
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

#[derive(Debug, Default, Clone, Copy)]
pub struct Bio2ConstantTable;

impl ConstantTable for Bio2ConstantTable {
    fn version(&self) -> BioVersion {
        BioVersion::Biohazard2
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
        matches!(opcode, 0x21 | 0x23 | 0x3E | 0x4F | 0x50 | 0x5E)
    }

    fn gosub_opcode(&self) -> u8 {
        0x18
    }

    fn aot_opcodes(&self) -> Option<[u8; 3]> {
        Some([0x46, 0x2C, 0x67])
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
            .iter()
            .find(|(id, _)| *id == kind)
            .map(|(_, name)| format!("ENEMY_{}", name.to_uppercase()))
    }

    fn item_constant(&self, kind: u8) -> Option<String> {
        ITEM_NAMES
            .get(kind as usize)
            .map(|name| format!("ITEM_{}", name.to_uppercase()))
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
    fn enemy_names_fall_back_to_hex() {
        let table = Bio2ConstantTable;
        assert_eq!(table.enemy_name(0x10), "ENEMY_ZOMBIECOP");
        assert_eq!(table.enemy_name(0x14), "ENEMY_14");
        assert_eq!(table.get_constant('e', 0x14), None);
        assert_eq!(table.constant_value("ENEMY_LICKERRED"), Some(0x23));
    }

    #[test]
    fn item_names() {
        let table = Bio2ConstantTable;
        assert_eq!(table.item_name(2), "ITEM_HANDGUNLEON");
        assert_eq!(table.item_name(0x63), "ITEM_PLATFORMKEY");
        assert_eq!(table.item_name(0xF0), "ITEM_UNKNOWN");
        assert_eq!(table.get_constant('t', 0).as_deref(), Some("UNLOCKED"));
    }

    #[test]
    fn opcode_lookups() {
        let table = Bio2ConstantTable;
        assert_eq!(table.find_opcode("ck"), Some(0x21));
        assert_eq!(table.find_opcode("aot_reset"), Some(0x46));
        assert_eq!(table.opcode_name(0x18), Some("gosub"));
        assert_eq!(table.instruction_size(0x8E), 24);
        assert_eq!(table.instruction_size(0x8F), 0);
        assert!(table.is_condition(0x23));
        assert!(!table.is_condition(0x22));
    }

    #[test]
    fn named_flags() {
        let table = Bio2ConstantTable;
        assert_eq!(table.named_flag(1, 0), Some("game.player"));
        assert_eq!(table.named_flag(0, 23), None);
    }

    #[test]
    fn event_aot_operands_are_contextual() {
        let table = Bio2ConstantTable;
        // aot_reset id=1 sce=EVENT sat=0 .. data[0] = gosub, data[1] = 3
        let bytes = [0x46, 1, 5, 0, 0, 0, 0x18, 3, 0, 0];
        assert_eq!(
            table.get_contextual_constant(0x46, 5, &bytes).as_deref(),
            Some("I_GOSUB")
        );
        assert_eq!(
            table.get_contextual_constant(0x46, 6, &bytes).as_deref(),
            Some("main_03")
        );
        let door = [0x46, 1, 1, 0, 0, 0, 0x18, 3, 0, 0];
        assert_eq!(table.get_contextual_constant(0x46, 5, &door), None);
    }
}
