//! Best-effort scrape of the publication list on the SCAPIS website.
//!
//! The site is a Gatsby build; its publication page ships a `page-data.json`
//! whose `result.data` holds one GraphQL query result. The query name and the
//! exact node shape are not stable, so the first collection found is used.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::http::HttpFetcher;
use crate::models::{Publication, Source};

pub struct ScapisClient {
    fetcher: HttpFetcher,
    page_data_url: String,
}

impl ScapisClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(config)?,
            page_data_url: config.scapis_page_data_url.clone(),
        })
    }

    /// Never fails: an unreachable or unrecognised page yields no publications.
    pub async fn fetch_publications(&self) -> Result<Vec<Publication>> {
        let Some(body) = self.fetcher.fetch_text(&self.page_data_url).await? else {
            info!("SCAPIS page-data not accessible, skipping");
            return Ok(Vec::new());
        };

        let page_data: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse SCAPIS page-data: {}", e);
                return Ok(Vec::new());
            }
        };

        let publications = parse_page_data(&page_data);
        if publications.is_empty() {
            info!("No publication data found in SCAPIS page-data");
        }
        Ok(publications)
    }
}

/// Locate the publication nodes under `result.data`: the first entry that is a
/// `{ nodes }` connection, an `{ edges: [{ node }] }` connection, or a plain list.
/// The first connection found is final, even if its `nodes`/`edges` is not a list.
fn find_nodes(data: &Map<String, Value>) -> Vec<&Value> {
    for value in data.values() {
        if let Some(nodes) = value.get("nodes") {
            return nodes.as_array().map(|n| n.iter().collect()).unwrap_or_default();
        }
        if let Some(edges) = value.get("edges") {
            return edges
                .as_array()
                .map(|e| e.iter().filter_map(|edge| edge.get("node")).collect())
                .unwrap_or_default();
        }
        if let Some(list) = value.as_array() {
            return list.iter().collect();
        }
    }
    Vec::new()
}

/// First non-empty value among `keys`, with numbers rendered as text
fn first_text(node: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| match node.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_default()
}

pub fn parse_page_data(page_data: &Value) -> Vec<Publication> {
    let Some(data) = page_data
        .get("result")
        .and_then(|r| r.get("data"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    find_nodes(data)
        .into_iter()
        .filter_map(|node| {
            let mut p = Publication::new(Source::ScapisWebsite);
            p.title = first_text(node, &["title", "name"]);
            if p.title.is_empty() {
                return None;
            }

            p.journal = first_text(node, &["journal", "publication"]);
            p.year = first_text(node, &["year"]);
            if p.year.is_empty() {
                p.year = first_text(node, &["date"]).chars().take(4).collect();
            }
            p.first_author = first_text(node, &["firstAuthor", "author"]);
            p.doi = first_text(node, &["doi", "link"]);
            p.pmid = first_text(node, &["pmid"]);
            p.abstract_text = first_text(node, &["abstract"]);
            Some(p)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_nodes_connection() {
        let page = json!({
            "componentChunkName": "component---src-pages-publications-js",
            "result": { "data": {
                "site": { "siteMetadata": { "title": "SCAPIS" } },
                "allSanityPublication": { "nodes": [
                    { "title": "Prevalence of subclinical coronary artery atherosclerosis",
                      "journal": "Circulation", "year": 2021,
                      "firstAuthor": "Bergström G", "doi": "10.1161/CIRCULATIONAHA.121.055340" },
                    { "name": "Lung density in never-smokers", "publication": "Thorax",
                      "date": "2020-05-14", "author": "Torén K", "link": "https://example.org/x" },
                    { "journal": "Untitled" }
                ]}
            }}
        });

        let pubs = parse_page_data(&page);
        assert_eq!(pubs.len(), 2);

        assert_eq!(pubs[0].year, "2021");
        assert_eq!(pubs[0].journal, "Circulation");
        assert_eq!(pubs[0].first_author, "Bergström G");
        assert_eq!(pubs[0].source, Source::ScapisWebsite);

        assert_eq!(pubs[1].title, "Lung density in never-smokers");
        assert_eq!(pubs[1].journal, "Thorax");
        assert_eq!(pubs[1].year, "2020");
        assert_eq!(pubs[1].first_author, "Torén K");
        assert_eq!(pubs[1].doi, "https://example.org/x");
        assert!(pubs[1].authors.is_empty());
    }

    #[test]
    fn test_first_connection_wins_even_when_malformed() {
        let page = json!({ "result": { "data": {
            "allPublication": { "nodes": { "title": "Not a list" } },
            "backup": [ { "title": "Should not be used" } ]
        }}});
        assert!(parse_page_data(&page).is_empty());

        let page = json!({ "result": { "data": {
            "publications": { "edges": null },
            "backup": { "nodes": [ { "title": "Should not be used" } ] }
        }}});
        assert!(parse_page_data(&page).is_empty());
    }

    #[test]
    fn test_parse_edges_connection() {
        let page = json!({ "result": { "data": { "publications": { "edges": [
            { "node": { "title": "Edge paper", "year": "2019" } },
            { "cursor": "abc" }
        ]}}}});

        let pubs = parse_page_data(&page);
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].title, "Edge paper");
        assert_eq!(pubs[0].year, "2019");
    }

    #[test]
    fn test_parse_plain_list() {
        let page = json!({ "result": { "data": { "items": [ { "title": "Listed" } ] } } });
        let pubs = parse_page_data(&page);
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].year, "");
    }

    #[test]
    fn test_parse_unrecognised_shape() {
        assert!(parse_page_data(&json!({ "result": {} })).is_empty());
        assert!(parse_page_data(&json!({ "result": { "data": { "site": { "x": 1 } } } })).is_empty());
        assert!(parse_page_data(&json!([1, 2, 3])).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_publications_tolerates_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page-data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let config = Config {
            scapis_page_data_url: format!("{}/page-data.json", server.uri()),
            retry_delay: Duration::from_millis(1),
            ..Config::default()
        };
        let client = ScapisClient::new(&config).unwrap();
        assert!(client.fetch_publications().await.unwrap().is_empty());
    }
}
