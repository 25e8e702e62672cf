//! Opcodes with typed payloads.
//!
//! Only the opcodes the decoder, AST builder and analyzer care about are listed. Anything else is
//! handled generically through the signature tables in [`crate::constants`].

use num_derive::FromPrimitive;

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Hash)]
pub enum OpcodeV1 {
    EvtEnd = 0x00,
    IfelCk = 0x01,
    ElseCk = 0x02,
    EndIf = 0x03,
    Ck = 0x04,
    Set = 0x05,
    Cmp6 = 0x06,
    Cmp7 = 0x07,
    Set8 = 0x08,
    CutSet9 = 0x09,
    CutSetA = 0x0A,
    DoorAotSe = 0x0C,
    NonItemSet = 0x0D,
    Nop = 0x0E,
    TestItem = 0x10,
    TestPickup = 0x11,
    Item12 = 0x12,
    ItemAotSet = 0x18,
    SceEmSet = 0x1B,
    OmSet = 0x1F,
}

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Hash)]
pub enum OpcodeV2 {
    Nop = 0x00,
    EvtEnd = 0x01,
    EvtExec = 0x04,
    IfelCk = 0x06,
    ElseCk = 0x07,
    EndIf = 0x08,
    For = 0x0D,
    Next = 0x0E,
    While = 0x0F,
    Ewhile = 0x10,
    Do = 0x11,
    Edwhile = 0x12,
    Switch = 0x13,
    Case = 0x14,
    Default = 0x15,
    Eswitch = 0x16,
    Goto = 0x17,
    Gosub = 0x18,
    Return = 0x19,
    Break = 0x1A,
    Ck = 0x21,
    Set = 0x22,
    Cmp = 0x23,
    Calc = 0x26,
    AotSet = 0x2C,
    DirCk = 0x39,
    DoorAotSe = 0x3B,
    MemberCmp = 0x3E,
    SceEmSet = 0x44,
    AotReset = 0x46,
    AotOn = 0x47,
    ItemAotSet = 0x4E,
    SceKeyCk = 0x4F,
    SceTrgCk = 0x50,
    XaOn = 0x59,
    KeepItemCk = 0x5E,
    AotSet4p = 0x67,
    DoorAotSet4p = 0x68,
    ItemAotSet4p = 0x69,
    SceItemGet = 0x76,
}

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Hash)]
pub enum OpcodeV3 {
    Nop = 0x00,
    EvtEnd = 0x01,
    EvtExec = 0x04,
    IfelCk = 0x06,
    ElseCk = 0x07,
    EndIf = 0x08,
    For = 0x0D,
    Next = 0x0F,
    While = 0x10,
    Ewhile = 0x11,
    Do = 0x12,
    Edwhile = 0x13,
    Switch = 0x14,
    Case = 0x15,
    Default = 0x16,
    Eswitch = 0x17,
    Goto = 0x18,
    Gosub = 0x19,
    Return = 0x1A,
    Break = 0x1B,
    CalcOp = 0x20,
    DirCk = 0x29,
    Ck = 0x4C,
    Set = 0x4D,
    Cmp = 0x4E,
    DoorAotSe = 0x61,
    DoorAotSet4p = 0x62,
    AotSet = 0x63,
    AotSet4p = 0x64,
    AotReset = 0x65,
    AotOn = 0x66,
    ItemAotSet = 0x67,
    ItemAotSet4p = 0x68,
    KeepItemCk = 0x6B,
    KeyCk = 0x6C,
    TrgCk = 0x6D,
    XaOn = 0x79,
    EmSet = 0x7D,
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn from_byte() {
        assert_eq!(OpcodeV1::from_u8(0x10), Some(OpcodeV1::TestItem));
        assert_eq!(OpcodeV2::from_u8(0x17), Some(OpcodeV2::Goto));
        assert_eq!(OpcodeV3::from_u8(0x18), Some(OpcodeV3::Goto));
        assert_eq!(OpcodeV3::from_u8(0x0E), None);
    }
}
