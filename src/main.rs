use anyhow::Context;
use clap::Parser;
use excel_schema::cli::Cli;
use excel_schema::cli::Commands;
use excel_schema::converter::convert_workbook;
use excel_schema::logging::setup_logging;
use excel_schema::server;
use excel_schema::server::ServerConfig;
use std::path::Path;
use std::path::PathBuf;
use tracing::error;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = setup_logging(cli.verbose) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }

    if let Err(error) = run(cli.command).await {
        error!("{error:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            max_upload_bytes,
        } => {
            info!("Starting excel-schema v{}", env!("CARGO_PKG_VERSION"));
            let config = ServerConfig {
                host,
                port,
                max_upload_bytes,
            };
            server::serve(config).await.context("Server failed")
        }
        Commands::Convert { file, output, json } => convert(&file, output, json),
    }
}

fn convert(file: &Path, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let result = convert_workbook(&file_name, bytes).with_context(|| format!("Failed to convert {}", file.display()))?;
    let text = if json {
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    } else {
        result.sql
    };
    match output {
        Some(path) => {
            std::fs::write(&path, format!("{text}\n")).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(output = %path.display(), "wrote schema");
        }
        None => println!("{text}"),
    }
    Ok(())
}
