use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "schema.sql";

/// Command line arguments for the schema compiler
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compile a schema definition into CREATE TABLE statements"
)]
pub struct Args {
    /// Schema source file
    pub input: PathBuf,

    /// Where to write the generated SQL
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Log debug output when RUST_LOG is not set
    #[arg(short, long)]
    pub verbose: bool,
}
