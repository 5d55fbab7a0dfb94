// Public modules
pub mod config;
pub mod dashboard;
pub mod http;
pub mod io;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod pubmed;
pub mod render;
pub mod scapis;
pub mod scheduler;
pub mod topics;

// Re-export commonly used types
pub use config::Config;
pub use dashboard::build_dashboard_data;
pub use io::{load_dataset, save_dataset, DEFAULT_DATA_FILE, DEFAULT_HTML_FILE};
pub use merge::merge_publications;
pub use models::{DashboardData, DashboardPublication, Publication, Source};
pub use pipeline::{fetch_all, generate_from_file, run_update, FetchReport, UpdateOutcome, UpdatePaths};
pub use pubmed::PubMedClient;
pub use render::DashboardGenerator;
pub use scapis::ScapisClient;
pub use scheduler::start_weekly_updater;
pub use topics::classify_topics;

/// Install the `tracing` subscriber used by the command-line tools.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .try_init();
}
