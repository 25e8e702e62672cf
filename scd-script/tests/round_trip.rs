use pretty_assertions::assert_eq;
use scd_script::{assemble, disassemble, BioVersion, ScriptKind};

fn asm(mnemonic: &str, operands: &str) -> String {
    format!("    {:<24}{}", mnemonic, operands)
        .trim_end()
        .to_string()
}

const IF_ELSE: &str = "\
.version 2
.main
.proc main_00
    if 0, lbl_else
    ck 1, 0, 1
    set 5, 2, 1
lbl_else:
    else 0, lbl_end
    set 5, 2, 0
lbl_end:
    evt_end 0
";

const IF_ELSE_BYTES: [u8; 24] = [
    0x02, 0x00, //
    0x06, 0x00, 0x0C, 0x00, //
    0x21, 0x01, 0x00, 0x01, //
    0x22, 0x05, 0x02, 0x01, //
    0x07, 0x00, 0x08, 0x00, //
    0x22, 0x05, 0x02, 0x00, //
    0x01, 0x00,
];

#[test]
fn single_flag_check() -> anyhow::Result<()> {
    let out = assemble("test.s", ".version 2\n.proc main\n  ck 1,0,1\n")?;
    let main = out.main.unwrap_or_default();
    assert_eq!(main, vec![0x02, 0x00, 0x21, 0x01, 0x00, 0x01]);

    let text = disassemble(&main, BioVersion::Biohazard2, ScriptKind::Main, false);
    assert!(!text.contains("if"), "{}", text);
    assert!(text.ends_with(&format!("{}\n", asm("ck", "1, 0, 1"))), "{}", text);
    Ok(())
}

#[test]
fn branch_fields_are_relative_to_the_field_end() -> anyhow::Result<()> {
    let out = assemble("test.s", IF_ELSE)?;
    assert_eq!(out.main.unwrap_or_default(), IF_ELSE_BYTES.to_vec());
    Ok(())
}

#[test]
fn disassembly_reassembles_to_the_same_bytes() -> anyhow::Result<()> {
    let text = disassemble(&IF_ELSE_BYTES, BioVersion::Biohazard2, ScriptKind::Main, false);
    let expected = [
        ".version 2".to_string(),
        String::new(),
        ".main".to_string(),
        ".proc main_00".to_string(),
        asm("if", "0, off_000E"),
        asm("ck", "1, 0, 1"),
        asm("set", "5, 2, 1"),
        String::new(),
        "off_000E:".to_string(),
        asm("else", "0, off_0016"),
        asm("set", "5, 2, 0"),
        String::new(),
        "off_0016:".to_string(),
        asm("evt_end", "0"),
    ]
    .join("\n")
        + "\n";
    assert_eq!(text, expected);

    let again = assemble("round.s", &text)?;
    assert_eq!(again.main.unwrap_or_default(), IF_ELSE_BYTES.to_vec());
    Ok(())
}

#[test]
fn backward_goto_round_trips() -> anyhow::Result<()> {
    let source = "\
.version 2
.proc main_00
top:
    nop
    goto 0, 0, 0, top
    evt_end 0
";
    let main = assemble("test.s", source)?.main.unwrap_or_default();
    // field at 5, target 0: 0 - 5 + 2 = -3
    assert_eq!(main[2..], [0x00, 0x17, 0x00, 0x00, 0x00, 0xFD, 0xFF, 0x01, 0x00]);

    let text = disassemble(&main, BioVersion::Biohazard2, ScriptKind::Main, false);
    assert!(text.contains(&asm("goto", "0, 0, 0, off_0002")), "{}", text);
    let again = assemble("round.s", &text)?;
    assert_eq!(again.main.unwrap_or_default(), main);
    Ok(())
}

#[test]
fn dialect1_round_trip() -> anyhow::Result<()> {
    let source = ".version 1\n.main\nck 0, 32 | 3, 1\nnop 0\n";
    let main = assemble("test.s", source)?.main.unwrap_or_default();
    assert_eq!(main, vec![0x08, 0x00, 0x04, 0x00, 0x23, 0x01, 0x0E, 0x00]);

    let text = disassemble(&main, BioVersion::Biohazard1, ScriptKind::Main, false);
    assert!(text.contains(&asm("ck", "0, 32 | 3, 1")), "{}", text);
    let again = assemble("round.s", &text)?;
    assert_eq!(again.main.unwrap_or_default(), main);
    Ok(())
}

#[test]
fn dialect3_round_trip() -> anyhow::Result<()> {
    let source = "\
.version 3
.proc main_00
    if 0, lbl_else
    ck 1, 0, 1
lbl_else:
    else 0, lbl_end
    set 1, 0, 0
lbl_end:
    endif 0
    evt_end 0
";
    let main = assemble("test.s", source)?.main.unwrap_or_default();
    assert_eq!(
        main,
        vec![
            0x02, 0x00, //
            0x06, 0x00, 0x08, 0x00, //
            0x4C, 0x01, 0x00, 0x01, //
            0x07, 0x00, 0x08, 0x00, //
            0x4D, 0x01, 0x00, 0x00, //
            0x08, 0x00, //
            0x01, 0x00,
        ]
    );

    let text = disassemble(&main, BioVersion::Biohazard3, ScriptKind::Main, false);
    assert!(text.starts_with(".version 3\n"), "{}", text);
    assert!(text.contains(&asm("if", "0, off_000A")), "{}", text);
    assert!(text.contains(&asm("else", "0, off_0012")), "{}", text);
    assert!(text.contains(&asm("ck", "1, 0, 1")), "{}", text);
    let again = assemble("round.s", &text)?;
    assert_eq!(again.main.unwrap_or_default(), main);
    Ok(())
}

#[test]
fn init_and_main_in_one_source() -> anyhow::Result<()> {
    let source = "\
.version 2
.init
.proc init_00
    evt_end 0
.main
.proc main_00
    nop
    evt_end 0
";
    let out = assemble("test.s", source)?;
    assert_eq!(out.version, Some(BioVersion::Biohazard2));
    assert_eq!(out.init, Some(vec![0x02, 0x00, 0x01, 0x00]));
    assert_eq!(out.main, Some(vec![0x02, 0x00, 0x00, 0x01, 0x00]));
    assert_eq!(out.event, None);
    Ok(())
}
