use pretty_assertions::assert_eq;
use scd_script::{ScdAssembler, ScdError};

#[test]
fn every_bad_line_is_reported() {
    let source = "\
.version 2
.proc main_00
    nop 1
    bogus
    ck 1, 0, 1
    ck 1,, 0
    goto 0, 0, 0, missing
";
    let mut asm = ScdAssembler::new();
    let result = asm.assemble("room.s", source);
    let messages: Vec<String> = asm.diagnostics().iter().map(|d| d.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "room.s(3,10): error SCD0012: Too many operands for this opcode.",
            "room.s(4,5): error SCD0001: Unknown opcode 'bogus'.",
            "room.s(6,10): error SCD0016: Expected operand.",
            "room.s(7,19): error SCD0008: 'missing' is not defined.",
        ]
    );
    match result {
        Err(ScdError::Assembly(diagnostics)) => assert_eq!(diagnostics.len(), 4),
        other => panic!("expected a failed assembly, got {:?}", other),
    }
}

#[test]
fn missing_version_stops_parsing() {
    let mut asm = ScdAssembler::new();
    assert!(asm.assemble("room.s", "ck 1, 0, 1\nbogus\n").is_err());
    assert_eq!(asm.error_count(), 1);
    assert_eq!(
        asm.diagnostics()[0].to_string(),
        "room.s(1,1): error SCD0009: Expected .version before any other statement."
    );
}
