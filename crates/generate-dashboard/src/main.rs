use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{generate_from_file, DEFAULT_DATA_FILE, DEFAULT_HTML_FILE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "generate-dashboard")]
#[command(about = "Render the SCAPIS publications dashboard from the fetched dataset")]
struct Args {
    /// Publication dataset written by fetch-publications
    #[arg(default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Dashboard HTML to write
    #[arg(default_value = DEFAULT_HTML_FILE)]
    output: PathBuf,
}

fn main() -> Result<()> {
    shared::init_logging();
    let args = Args::parse();

    println!(
        "📝 Generating dashboard from {} -> {}",
        args.data.display(),
        args.output.display()
    );

    let report = generate_from_file(&args.data, &args.output, Utc::now())
        .context("Failed to generate dashboard")?;

    println!(
        "✓ Dashboard generated: {} publications, years {}",
        report.publications, report.year_range
    );
    println!("File size: {:.0} KB", report.bytes as f64 / 1024.0);

    Ok(())
}
