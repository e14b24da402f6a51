use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod cli;
pub mod frontend;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&args)
}

/// Reads the input file, compiles it and writes the SQL. The output file is
/// only touched once compilation has succeeded.
pub fn run(args: &cli::Args) -> Result<()> {
    if !args.input.exists() {
        bail!("File '{}' does not exist.", args.input.display());
    }

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Error reading file '{}'", args.input.display()))?;
    info!("Compiling {} ({} bytes)", args.input.display(), source.len());

    let sql = frontend::compile(&source)?;

    fs::write(&args.output, &sql)
        .with_context(|| format!("Error writing to file '{}'", args.output.display()))?;
    info!("Wrote {} bytes to {}", sql.len(), args.output.display());

    Ok(())
}
