use anyhow::{bail, Context, Result};
use clap::Parser;
use scd_script::{AssembledScript, BioVersion, ScdAssembler, ScdError, ScriptKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct ScdProject {
    version: u8,
    source_file: PathBuf,
    init_output: Option<PathBuf>,
    main_output: Option<PathBuf>,
}

impl ScdProject {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ScdProject = toml::from_str(&config_str)?;
        Ok(config)
    }
}

/// One entry of the disassembler's `disassembly.yaml`.
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

fn label(offset: u32) -> String {
    format!("off_{:04X}", offset)
}

/// Offsets every dump label can anchor to: instruction starts and subroutine ends.
fn label_anchors(scripts: &[Script]) -> BTreeSet<u32> {
    let mut anchors = BTreeSet::new();
    for sub in scripts.iter().flat_map(|s| &s.subroutines) {
        anchors.extend(sub.insts.iter().map(|inst| inst.offset));
        if let Some(last) = sub.insts.last() {
            anchors.insert(last.offset + last.size as u32);
        }
    }
    anchors
}

/// Rewrites an `off_XXXX` operand that points inside an instruction to `off_BASE + delta`.
fn rebase_operand(operand: &str, anchors: &BTreeSet<u32>) -> String {
    let target = operand
        .strip_prefix("off_")
        .and_then(|hex| u32::from_str_radix(hex, 16).ok());
    match target {
        Some(target) if !anchors.contains(&target) => match anchors.range(..target).next_back() {
            Some(&base) => format!("{} + {}", label(base), target - base),
            None => operand.to_string(),
        },
        _ => operand.to_string(),
    }
}

/// Rebuilds assembly text from an instruction dump. Every instruction gets a label at its own
/// offset so branch operands resolve without knowing which ones are targets.
fn yaml_to_source(version: BioVersion, scripts: &[Script]) -> Result<String> {
    let anchors = label_anchors(scripts);
    let mut source = String::new();
    writeln!(source, ".version {}", version)?;
    for script in scripts {
        let kind = ScriptKind::parse(&script.kind)?;
        writeln!(source, ".{}", kind)?;
        for sub in &script.subroutines {
            if version.has_procedures() {
                let prefix = if kind == ScriptKind::Init { "init" } else { "main" };
                writeln!(source, ".proc {}_{:02X}", prefix, sub.index)?;
            }
            for inst in &sub.insts {
                let operands: Vec<String> = inst
                    .operands
                    .iter()
                    .map(|op| rebase_operand(op, &anchors))
                    .collect();
                writeln!(source, "{}:", label(inst.offset))?;
                writeln!(source, "    {} {}", inst.mnemonic, operands.join(", "))?;
            }
            if let Some(last) = sub.insts.last() {
                writeln!(source, "{}:", label(last.offset + last.size as u32))?;
            }
        }
    }
    Ok(source)
}

fn assemble(path: &Path, source: &str) -> Result<AssembledScript> {
    let mut assembler = ScdAssembler::new();
    let name = path.display().to_string();
    match assembler.assemble(&name, source) {
        Ok(out) => {
            for d in assembler.diagnostics() {
                log::warn!("{}", d);
            }
            Ok(out)
        }
        Err(ScdError::Assembly(diagnostics)) => {
            for d in &diagnostics {
                if d.is_error() {
                    log::error!("{}", d);
                } else {
                    log::warn!("{}", d);
                }
            }
            bail!("failed to assemble {}: {} error(s)", name, assembler.error_count())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}

fn compile(
    input: &Path,
    version: BioVersion,
    init_output: &Path,
    main_output: &Path,
    event_output: &Path,
) -> Result<()> {
    let source = if input.extension().is_some_and(|e| e == "yaml") {
        let file = std::fs::File::open(input)
            .with_context(|| format!("failed to open {}", input.display()))?;
        let scripts: Vec<Script> = serde_yaml::from_reader(file)?;
        yaml_to_source(version, &scripts)?
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let out = assemble(input, &source)?;
    if let Some(init) = &out.init {
        write_output(init_output, init)?;
    }
    if let Some(main) = &out.main {
        write_output(main_output, main)?;
    }
    if let Some(event) = &out.event {
        write_output(event_output, event)?;
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Assembly source (.s), or a disassembly.yaml dump
    #[arg(short, long, conflicts_with = "project")]
    input: Option<PathBuf>,

    /// Output directory for init.scd / main.scd
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dialect of a YAML dump; assembly source names its own with `.version`
    #[arg(short, long, default_value = "2")]
    dialect: BioVersion,

    /// project.toml written by the disassembler
    #[arg(short, long)]
    project: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    if let Some(project_path) = &args.project {
        let project = ScdProject::new(project_path)?;
        let dir = project_path.parent().unwrap_or(Path::new(""));
        let version = BioVersion::try_from(project.version)?;
        let output = |p: &Option<PathBuf>, default: &str| {
            dir.join(p.clone().unwrap_or_else(|| PathBuf::from(default)))
        };
        return compile(
            &dir.join(&project.source_file),
            version,
            &output(&project.init_output, "init.scd"),
            &output(&project.main_output, "main.scd"),
            &dir.join("event.scd"),
        );
    }

    let Some(input) = &args.input else {
        bail!("pass --input or --project");
    };
    let dir = match &args.output {
        Some(dir) => dir.clone(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    compile(
        input,
        args.dialect,
        &dir.join("init.scd"),
        &dir.join("main.scd"),
        &dir.join("event.scd"),
    )
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("Error: {:?}", e);
        std::process::exit(1);
    }
}
