use anyhow::{bail, Context, Result};
use clap::Parser;
use scd_script::{
    read_script, AstPrinter, BioVersion, ScriptAstBuilder, ScriptDecompiler, ScriptKind,
};
use std::path::PathBuf;

struct Decompiler {
    version: BioVersion,
    scripts: Vec<(ScriptKind, Vec<u8>)>,
}

impl Decompiler {
    fn new(version: BioVersion, init: Option<PathBuf>, main: Option<PathBuf>) -> Result<Self> {
        let mut scripts = Vec::new();
        for (kind, path) in [(ScriptKind::Init, init), (ScriptKind::Main, main)] {
            if let Some(path) = path {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                scripts.push((kind, bytes));
            }
        }
        if scripts.is_empty() {
            bail!("nothing to decompile: pass --init and/or --main");
        }
        Ok(Self { version, scripts })
    }

    fn pseudocode(&self) -> String {
        let mut decompiler = ScriptDecompiler::new(false, false);
        for (kind, bytes) in &self.scripts {
            read_script(bytes, self.version, *kind, 0, &mut decompiler);
        }
        decompiler.script()
    }

    /// Door, item and enemy placements with the game conditions guarding them.
    fn conditions(&self) -> String {
        let mut builder = ScriptAstBuilder::new();
        for (kind, bytes) in &self.scripts {
            read_script(bytes, self.version, *kind, 0, &mut builder);
        }
        AstPrinter::print(builder.ast())
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

    /// Output file (.bio)
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Script dialect: 1, 2 or 3
    #[arg(short, long, default_value = "2")]
    dialect: BioVersion,

    /// Print the conditions guarding each door, item and enemy
    #[arg(short, long)]
    conditions: bool,
}

fn run(args: Args) -> Result<()> {
    let decompiler = Decompiler::new(args.dialect, args.init, args.main)?;
    std::fs::write(&args.output, decompiler.pseudocode())
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    if args.conditions {
        print!("{}", decompiler.conditions());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("Error: {:?}", e);
        std::process::exit(1);
    }
}
