use anyhow::{bail, Context, Result};
use clap::Parser;
use scd_script::{
    instruction_operands, read_script, BioVersion, Instruction, ScriptDecompiler, ScriptKind,
    ScriptVisitor,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct Inst {
    offset: u32,
    size: usize,
    opcode: u8,
    mnemonic: String,
    operands: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Subroutine {
    index: usize,
    insts: Vec<Inst>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Script {
    kind: String,
    subroutines: Vec<Subroutine>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScdProject {
    version: u8,
    source_file: PathBuf,
    init_output: Option<PathBuf>,
    main_output: Option<PathBuf>,
}

/// Collects every decoded opcode for the YAML dump.
#[derive(Default)]
struct InstCollector {
    version: Option<BioVersion>,
    scripts: Vec<Script>,
}

impl InstCollector {
    fn current(&mut self) -> Option<&mut Subroutine> {
        self.scripts.last_mut()?.subroutines.last_mut()
    }
}

impl ScriptVisitor for InstCollector {
    fn version(&mut self, version: BioVersion) {
        self.version = Some(version);
    }

    fn begin_script(&mut self, kind: ScriptKind) {
        self.scripts.push(Script {
            kind: kind.to_string(),
            subroutines: Vec::new(),
        });
    }

    fn begin_subroutine(&mut self, index: usize) {
        if let Some(script) = self.scripts.last_mut() {
            script.subroutines.push(Subroutine {
                index,
                insts: Vec::new(),
            });
        }
    }

    fn opcode(&mut self, offset: u32, bytes: &[u8]) {
        let Some(version) = self.version else {
            return;
        };
        let inst = Instruction::decode(version, offset, bytes);
        let (mnemonic, operands) = instruction_operands(&inst);
        if let Some(sub) = self.current() {
            sub.insts.push(Inst {
                offset,
                size: bytes.len(),
                opcode: inst.opcode,
                mnemonic,
                operands,
            });
        }
    }

    fn trailing_data(&mut self, offset: u32, bytes: &[u8]) {
        if let Some(sub) = self.current() {
            sub.insts.push(Inst {
                offset,
                size: bytes.len(),
                opcode: bytes.first().copied().unwrap_or(0),
                mnemonic: "db".to_string(),
                operands: bytes.iter().map(|b| format!("0x{:02X}", b)).collect(),
            });
        }
    }
}

pub struct Disassembler {
    version: BioVersion,
    scripts: Vec<(ScriptKind, Vec<u8>)>,
}

impl Disassembler {
    pub fn new(version: BioVersion, init: Option<PathBuf>, main: Option<PathBuf>) -> Result<Self> {
        let mut scripts = Vec::new();
        for (kind, path) in [(ScriptKind::Init, init), (ScriptKind::Main, main)] {
            if let Some(path) = path {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                log::debug!("{}: {} bytes from {}", kind, bytes.len(), path.display());
                scripts.push((kind, bytes));
            }
        }
        if scripts.is_empty() {
            bail!("nothing to disassemble: pass --init and/or --main");
        }
        Ok(Self { version, scripts })
    }

    fn render(&self, listing: bool) -> String {
        let mut decompiler = ScriptDecompiler::new(true, listing);
        for (kind, bytes) in &self.scripts {
            read_script(bytes, self.version, *kind, 0, &mut decompiler);
        }
        decompiler.script()
    }

    fn collect(&self) -> Vec<Script> {
        let mut collector = InstCollector::default();
        for (kind, bytes) in &self.scripts {
            read_script(bytes, self.version, *kind, 0, &mut collector);
        }
        collector.scripts
    }

    fn has(&self, kind: ScriptKind) -> bool {
        self.scripts.iter().any(|(k, _)| *k == kind)
    }

    pub fn write(&self, output: impl AsRef<Path>, listing: bool, yaml: bool) -> Result<()> {
        let output = output.as_ref();
        if !output.exists() {
            std::fs::create_dir_all(output)
                .with_context(|| format!("failed to create {}", output.display()))?;
        }

        let source_path = output.join("script.s");
        std::fs::write(&source_path, self.render(false))
            .with_context(|| format!("failed to write {}", source_path.display()))?;

        if listing {
            let listing_path = output.join("script.lst");
            std::fs::write(&listing_path, self.render(true))
                .with_context(|| format!("failed to write {}", listing_path.display()))?;
        }

        if yaml {
            let disassembly_path = output.join("disassembly.yaml");
            let mut writer = std::fs::File::create(&disassembly_path)
                .with_context(|| format!("failed to create {}", disassembly_path.display()))?;
            serde_yaml::to_writer(&mut writer, &self.collect())?;
        }

        let project = ScdProject {
            version: self.version.number(),
            source_file: PathBuf::from("script.s"),
            init_output: self
                .has(ScriptKind::Init)
                .then(|| PathBuf::from("init.scd")),
            main_output: self
                .has(ScriptKind::Main)
                .then(|| PathBuf::from("main.scd")),
        };
        let toml_project = output.join("project.toml");
        let mut writer = std::fs::File::create(&toml_project)
            .with_context(|| format!("failed to create {}", toml_project.display()))?;
        let serialized_string = toml::to_string_pretty(&project)?;
        writer.write_all(serialized_string.as_bytes())?;

        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Init script (.scd)
    #[arg(long)]
    init: Option<PathBuf>,

    /// Main script (.scd)
    #[arg(long)]
    main: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Script dialect: 1, 2 or 3
    #[arg(short, long, default_value = "2")]
    dialect: BioVersion,

    /// Also write script.lst with offsets and opcode bytes
    #[arg(short, long)]
    listing: bool,

    /// Also write disassembly.yaml
    #[arg(short, long)]
    yaml: bool,
}

fn run(args: Args) -> Result<()> {
    let disassembler = Disassembler::new(args.dialect, args.init, args.main)?;
    disassembler.write(args.output, args.listing, args.yaml)
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("Error: {:?}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_instructions_per_subroutine() {
        let bytes = [0x04, 0x00, 0x06, 0x00, 0x01, 0x00, 0x21, 0x01, 0x00, 0x01, 0x01, 0x00];
        let mut collector = InstCollector::default();
        read_script(
            &bytes,
            BioVersion::Biohazard2,
            ScriptKind::Main,
            0,
            &mut collector,
        );
        let script = &collector.scripts[0];
        assert_eq!(script.kind, "main");
        assert_eq!(script.subroutines.len(), 2);
        let ck = &script.subroutines[1].insts[0];
        assert_eq!((ck.offset, ck.mnemonic.as_str()), (6, "ck"));
        assert_eq!(ck.operands, vec!["1", "0", "1"]);
    }
}
