use std::path::Path;

use scd_script::{assemble, disassemble, BioVersion, ScriptKind};

/// Disassembles a real room script and assembles the text again.
#[test]
fn room_script_reassembles() -> anyhow::Result<()> {
    let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/main.scd"));
    if !path.exists() {
        println!("skipping: {} not found", path.display());
        return Ok(());
    }
    let bytes = std::fs::read(path)?;
    let text = disassemble(&bytes, BioVersion::Biohazard2, ScriptKind::Main, false);
    let out = assemble("main.s", &text)?;
    assert_eq!(out.main.unwrap_or_default(), bytes);
    Ok(())
}
