use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{run_update, start_weekly_updater, Config, UpdatePaths, DEFAULT_DATA_FILE, DEFAULT_HTML_FILE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "update-dashboard")]
#[command(about = "Fetch publications and regenerate the dashboard when the data changed")]
struct Args {
    /// Publication dataset to refresh
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Dashboard HTML to regenerate
    #[arg(long, default_value = DEFAULT_HTML_FILE)]
    output: PathBuf,

    /// Keep running and update on the weekly schedule (UPDATE_SCHEDULE)
    #[arg(long)]
    daemon: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    shared::init_logging();
    let args = Args::parse();
    let config = Config::from_env()?;
    let paths = UpdatePaths {
        data: args.data,
        html: args.output,
    };

    if args.daemon {
        println!("⏰ Scheduling updates with cron expression \"{}\"", config.schedule);
        let scheduler = start_weekly_updater(config, paths).await?;
        scheduler
            .start()
            .await
            .context("Failed to start scheduler")?;

        println!("Daemon running. Press Ctrl+C to stop.");
        tokio::signal::ctrl_c().await?;
        println!("Shutting down...");
        return Ok(());
    }

    println!("🔄 Updating dashboard...");
    let outcome = run_update(&config, &paths, Utc::now())
        .await
        .context("Dashboard update failed")?;

    if outcome.kept_existing {
        println!("⚠ Sources returned no publications; kept the existing dataset");
    }
    if outcome.changed() {
        println!(
            "✅ changed: {} publications, dashboard at {}",
            outcome.publications,
            paths.html.display()
        );
    } else {
        println!("✓ unchanged: {} publications", outcome.publications);
    }

    Ok(())
}
