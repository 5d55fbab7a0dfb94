use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{fetch_all, save_dataset, Config, DEFAULT_DATA_FILE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fetch-publications")]
#[command(about = "Fetch SCAPIS publications from PubMed and the SCAPIS website")]
struct Args {
    /// Where to write the publication dataset
    #[arg(default_value = DEFAULT_DATA_FILE)]
    output: PathBuf,

    /// Override the PubMed search query
    #[arg(short, long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    shared::init_logging();
    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(query) = args.query {
        config.pubmed_query = query;
    }

    println!("=== SCAPIS Publication Fetcher ===");
    println!("Run time: {}\n", Utc::now().format("%Y-%m-%d %H:%M UTC"));

    println!("🔎 Searching PubMed and the SCAPIS website...");
    let report = fetch_all(&config)
        .await
        .context("Failed to fetch publications")?;

    println!(
        "✓ PubMed: {} IDs, {} publications",
        report.pubmed_ids, report.pubmed_records
    );
    println!("✓ SCAPIS website: {} publications", report.website_records);

    let data = report.data;
    println!("\nTotal unique publications: {}", data.len());

    save_dataset(&data, &args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    println!("💾 Saved to {}", args.output.display());

    println!(
        "Year range: {} - {}",
        data.min_year().unwrap_or("?"),
        data.max_year().unwrap_or("?")
    );
    println!(
        "Publications with abstracts: {}/{}",
        data.with_abstracts(),
        data.len()
    );

    Ok(())
}
