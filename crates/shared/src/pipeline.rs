use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::dashboard::build_dashboard_data;
use crate::io::{load_dataset, load_existing_dataset, save_dataset, DEFAULT_DATA_FILE, DEFAULT_HTML_FILE};
use crate::merge::merge_publications;
use crate::models::DashboardData;
use crate::pubmed::PubMedClient;
use crate::render::DashboardGenerator;
use crate::scapis::ScapisClient;

/// Counts from one fetch run, plus the resulting dataset
#[derive(Debug)]
pub struct FetchReport {
    pub pubmed_ids: usize,
    pub pubmed_records: usize,
    pub website_records: usize,
    pub data: DashboardData,
}

/// Query PubMed and the SCAPIS website concurrently, merge, and build the dataset
pub async fn fetch_all(config: &Config) -> Result<FetchReport> {
    let pubmed = PubMedClient::new(config)?;
    let scapis = ScapisClient::new(config)?;

    let pubmed_fut = async {
        let ids = pubmed.search_ids(&config.pubmed_query).await?;
        info!("Found {} PubMed IDs", ids.len());
        let records = if ids.is_empty() {
            Vec::new()
        } else {
            pubmed.fetch_details(&ids).await?
        };
        Ok::<_, anyhow::Error>((ids.len(), records))
    };

    let (pubmed_result, website_result) =
        futures::future::join(pubmed_fut, scapis.fetch_publications()).await;
    let (pubmed_ids, pubmed_records) = pubmed_result?;
    let website_records = website_result?;

    let report_counts = (pubmed_records.len(), website_records.len());
    let merged = merge_publications(pubmed_records, website_records);
    let data = build_dashboard_data(&merged);

    Ok(FetchReport {
        pubmed_ids,
        pubmed_records: report_counts.0,
        website_records: report_counts.1,
        data,
    })
}

/// Size and coverage of a rendered dashboard
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub publications: usize,
    pub year_range: String,
    pub bytes: usize,
}

/// Render `data` to `html_path`
pub fn write_dashboard(
    data: &DashboardData,
    html_path: &Path,
    now: DateTime<Utc>,
) -> Result<GenerateReport> {
    let html = DashboardGenerator::generate(data, now)?;
    DashboardGenerator::save(&html, html_path)?;

    Ok(GenerateReport {
        publications: data.len(),
        year_range: data.year_range(),
        bytes: html.len(),
    })
}

/// Load the dataset at `data_path` and render it to `html_path`
pub fn generate_from_file(
    data_path: &Path,
    html_path: &Path,
    now: DateTime<Utc>,
) -> Result<GenerateReport> {
    let data = load_dataset(data_path)?;
    write_dashboard(&data, html_path, now)
}

#[derive(Debug, Clone)]
pub struct UpdatePaths {
    pub data: PathBuf,
    pub html: PathBuf,
}

impl Default for UpdatePaths {
    fn default() -> Self {
        Self {
            data: PathBuf::from(DEFAULT_DATA_FILE),
            html: PathBuf::from(DEFAULT_HTML_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub publications: usize,
    /// The fetch came back empty and the previous dataset was kept
    pub kept_existing: bool,
    pub dataset_changed: bool,
    pub html_written: bool,
}

impl UpdateOutcome {
    pub fn changed(&self) -> bool {
        self.dataset_changed || self.html_written
    }
}

/// Fetch, then persist the dataset and regenerate the dashboard only if the
/// dataset differs from what is on disk (or the dashboard is missing).
pub async fn run_update(
    config: &Config,
    paths: &UpdatePaths,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome> {
    let report = fetch_all(config).await?;

    let existing = match load_existing_dataset(&paths.data) {
        Ok(existing) => existing,
        Err(e) => {
            warn!("Ignoring unreadable dataset: {:#}", e);
            None
        }
    };

    let mut kept_existing = false;
    let data = match existing.as_ref() {
        Some(previous) if report.data.is_empty() && !previous.is_empty() => {
            warn!(
                "Fetch returned no publications; keeping the existing {} records",
                previous.len()
            );
            kept_existing = true;
            previous.clone()
        }
        _ => report.data,
    };

    let dataset_changed = save_dataset(&data, &paths.data)?;
    if dataset_changed {
        info!("Saved {} publications to {}", data.len(), paths.data.display());
    }

    let html_written = if dataset_changed || !paths.html.exists() {
        write_dashboard(&data, &paths.html, now)?;
        true
    } else {
        false
    };

    Ok(UpdateOutcome {
        publications: data.len(),
        kept_existing,
        dataset_changed,
        html_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EFETCH_XML: &str = r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>111</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><Year>2022</Year></PubDate></JournalIssue><Title>Thorax</Title></Journal>
        <ArticleTitle>Lung function in SCAPIS</ArticleTitle>
        <AuthorList><Author><LastName>Torén</LastName><Initials>K</Initials></Author></AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData><ArticleIdList><ArticleId IdType="doi">10.1/lung</ArticleId></ArticleIdList></PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    const PAGE_DATA: &str = r#"{"result":{"data":{"allPublications":{"nodes":[
        {"title":"Lung function in SCAPIS","doi":"10.1/LUNG"},
        {"title":"Sleep and coronary plaque","year":"2023","journal":"Sleep"}
    ]}}}}"#;

    async fn mount_sources(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"esearchresult":{"idlist":["111"]}}"#),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/efetch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_XML))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page-data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_DATA))
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer) -> Config {
        Config {
            pubmed_base_url: server.uri(),
            scapis_page_data_url: format!("{}/page-data.json", server.uri()),
            batch_delay: Duration::from_millis(1),
            retry_delay: Duration::from_millis(1),
            ..Config::default()
        }
    }

    fn paths_in(dir: &Path) -> UpdatePaths {
        UpdatePaths {
            data: dir.join("data").join("publications.json"),
            html: dir.join("index.html"),
        }
    }

    fn now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_all_merges_sources() {
        let server = MockServer::start().await;
        mount_sources(&server).await;

        let report = fetch_all(&config_for(&server)).await.unwrap();
        assert_eq!(report.pubmed_ids, 1);
        assert_eq!(report.pubmed_records, 1);
        assert_eq!(report.website_records, 2);

        let titles: Vec<&str> = report
            .data
            .publications
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Sleep and coronary plaque", "Lung function in SCAPIS"]);
        assert_eq!(report.data.publications[1].first_author, "Torén K");
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_website_records_when_esearch_is_garbled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page-data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_DATA))
            .mount(&server)
            .await;

        let report = fetch_all(&config_for(&server)).await.unwrap();
        assert_eq!(report.pubmed_ids, 0);
        assert_eq!(report.website_records, 2);
        assert_eq!(report.data.len(), 2);
    }

    #[tokio::test]
    async fn test_run_update_writes_then_detects_no_change() {
        let server = MockServer::start().await;
        mount_sources(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let config = config_for(&server);

        let first = run_update(&config, &paths, now()).await.unwrap();
        assert!(first.changed());
        assert!(first.dataset_changed);
        assert_eq!(first.publications, 2);
        assert!(fs::read_to_string(&paths.html).unwrap().contains("2 publications (2022\u{2013}2023)"));

        let second = run_update(&config, &paths, now()).await.unwrap();
        assert!(!second.changed());
        assert!(!second.kept_existing);
    }

    #[tokio::test]
    async fn test_run_update_keeps_dataset_when_sources_are_down() {
        let good = MockServer::start().await;
        mount_sources(&good).await;
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        run_update(&config_for(&good), &paths, now()).await.unwrap();
        let saved = fs::read_to_string(&paths.data).unwrap();

        let down = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&down)
            .await;

        let outcome = run_update(&config_for(&down), &paths, now()).await.unwrap();
        assert!(outcome.kept_existing);
        assert!(!outcome.changed());
        assert_eq!(outcome.publications, 2);
        assert_eq!(fs::read_to_string(&paths.data).unwrap(), saved);
    }

    #[tokio::test]
    async fn test_run_update_regenerates_missing_dashboard() {
        let server = MockServer::start().await;
        mount_sources(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let config = config_for(&server);

        run_update(&config, &paths, now()).await.unwrap();
        fs::remove_file(&paths.html).unwrap();

        let outcome = run_update(&config, &paths, now()).await.unwrap();
        assert!(!outcome.dataset_changed);
        assert!(outcome.html_written);
        assert!(paths.html.exists());
    }

    #[test]
    fn test_generate_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save_dataset(&DashboardData::default(), &paths.data).unwrap();

        let report = generate_from_file(&paths.data, &paths.html, now()).unwrap();
        assert_eq!(report.publications, 0);
        assert_eq!(report.year_range, "N/A");
        assert_eq!(report.bytes, fs::metadata(&paths.html).unwrap().len() as usize);
    }
}
