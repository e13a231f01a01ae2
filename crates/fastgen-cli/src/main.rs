use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use fastgen_contracts::{
    FASTGEN_MANIFEST_SCHEMA_VERSION, INLINE_EXTENSION, METADATA_EXTENSION, SOURCE_EXTENSION,
};
use fastgen_core::diagnostics::render_diagnostics_md;
use fastgen_core::{CompiledUnit, Compiler, GenError};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fast_type_gen")]
#[command(about = "FAST template schema compiler: XML templates -> mFAST C++ instruction tables and accessors.", long_about = None)]
struct Cli {
    /// Schema documents, compiled in order. A document may reference templates
    /// of documents listed before it.
    inputs: Vec<PathBuf>,
    /// Read inputs (and optionally the output directory) from a JSON manifest.
    /// Manifest inputs come before positional ones.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Output directory (writes <out>/<unit>.inl and <out>/<unit>.cpp).
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// If set, fail if any output differs; do not write.
    #[arg(long, default_value_t = false)]
    check: bool,
    /// Also write <out>/<unit>.metadata.json.
    #[arg(long, default_value_t = false)]
    metadata_json: bool,
    /// Print the diagnostics catalog as Markdown and exit.
    #[arg(long, default_value_t = false)]
    diagnostics_md: bool,
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    schema_version: String,
    #[serde(default)]
    out_dir: Option<PathBuf>,
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<GenError>() {
            Some(gen_err) => {
                eprintln!("error[{}]: {err:#}", gen_err.code().code_str());
                ExitCode::from(gen_err.exit_code())
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::from(2)
            }
        },
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn try_main(cli: Cli) -> Result<()> {
    if cli.diagnostics_md {
        print!("{}", render_diagnostics_md());
        return Ok(());
    }

    let mut inputs = Vec::new();
    let mut out_dir = None;
    if let Some(path) = &cli.manifest {
        let m = load_manifest(path)?;
        inputs.extend(m.inputs);
        out_dir = m.out_dir;
    }
    inputs.extend(cli.inputs);
    if inputs.is_empty() {
        anyhow::bail!("no schema documents given (pass files or --manifest)");
    }
    let out_dir = cli
        .out_dir
        .or(out_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut compiler = Compiler::new();
    for path in &inputs {
        let unit = compiler
            .compile_path(path)
            .with_context(|| format!("compile {}", path.display()))?;
        write_unit(&out_dir, &unit, cli.metadata_json, cli.check)?;
    }
    info!(
        units = inputs.len(),
        templates = compiler.registry().len(),
        "done"
    );
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read manifest: {}", path.display()))?;
    let mut m: Manifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse manifest JSON: {}", path.display()))?;
    if m.schema_version.trim() != FASTGEN_MANIFEST_SCHEMA_VERSION {
        anyhow::bail!(
            "manifest schema_version mismatch: expected {FASTGEN_MANIFEST_SCHEMA_VERSION} got {:?}",
            m.schema_version
        );
    }
    // Relative paths are relative to the manifest itself.
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for input in &mut m.inputs {
        if input.is_relative() {
            *input = base.join(&*input);
        }
    }
    if let Some(dir) = &mut m.out_dir {
        if dir.is_relative() {
            *dir = base.join(&*dir);
        }
    }
    Ok(m)
}

fn write_unit(out_dir: &Path, unit: &CompiledUnit, metadata: bool, check: bool) -> Result<()> {
    write_output(
        &out_dir.join(format!("{}.{INLINE_EXTENSION}", unit.unit)),
        &unit.inline_src,
        check,
    )?;
    write_output(
        &out_dir.join(format!("{}.{SOURCE_EXTENSION}", unit.unit)),
        &unit.source_src,
        check,
    )?;
    if metadata {
        write_output(
            &out_dir.join(format!("{}.{METADATA_EXTENSION}", unit.unit)),
            &unit.metadata_json()?,
            check,
        )?;
    }
    Ok(())
}

fn write_output(out_path: &Path, src: &str, check: bool) -> Result<()> {
    if check {
        let cur = std::fs::read_to_string(out_path)
            .with_context(|| format!("read existing output: {}", out_path.display()))?;
        if cur != src {
            anyhow::bail!("generated output differs: {}", out_path.display());
        }
        return Ok(());
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }
    std::fs::write(out_path, src.as_bytes())
        .with_context(|| format!("write output: {}", out_path.display()))?;
    info!(path = %out_path.display(), bytes = src.len(), "wrote");
    Ok(())
}
