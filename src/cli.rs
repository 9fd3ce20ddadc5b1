use crate::server::DEFAULT_MAX_UPLOAD_BYTES;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "excel-schema")]
#[command(version, about = "Infer SQL CREATE TABLE statements from Excel workbooks")]
pub struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,

        /// Largest accepted request body in bytes
        #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: usize,
    },
    /// Convert a local workbook and print the generated SQL
    Convert {
        /// Path to a .xlsx or .xls file
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the full result (tables and sql) as JSON
        #[arg(long)]
        json: bool,
    },
}
