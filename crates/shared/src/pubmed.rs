//! PubMed E-utilities: `esearch` for PMIDs, `efetch` for article XML.

use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::HttpFetcher;
use crate::models::{Publication, Source};

const ESEARCH_RETMAX: usize = 5000;

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedClient {
    fetcher: HttpFetcher,
    esearch_url: String,
    efetch_url: String,
    api_key: Option<String>,
    batch_size: usize,
    batch_delay: Duration,
}

impl PubMedClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(config)?,
            esearch_url: config.esearch_url(),
            efetch_url: config.efetch_url(),
            api_key: config.ncbi_api_key.clone(),
            batch_size: config.pubmed_batch_size.max(1),
            batch_delay: config.batch_delay,
        })
    }

    fn api_key_param(&self) -> String {
        match &self.api_key {
            Some(key) => format!("&api_key={}", urlencoding::encode(key)),
            None => String::new(),
        }
    }

    /// Search PubMed and return the matching PMIDs. An unreachable API or an
    /// unreadable response yields no IDs.
    pub async fn search_ids(&self, query: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}?db=pubmed&term={}&retmax={}&retmode=json{}",
            self.esearch_url,
            urlencoding::encode(query),
            ESEARCH_RETMAX,
            self.api_key_param()
        );

        let Some(body) = self.fetcher.fetch_text(&url).await? else {
            return Ok(Vec::new());
        };

        let response: ESearchResponse = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to parse PubMed esearch response: {}", e);
                return Ok(Vec::new());
            }
        };

        let ids = response
            .esearchresult
            .map(|r| r.idlist)
            .unwrap_or_default();

        debug!(count = ids.len(), "esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch article metadata in batches. Batches that cannot be fetched are skipped.
    pub async fn fetch_details(&self, pmids: &[String]) -> Result<Vec<Publication>> {
        let mut publications = Vec::new();
        let total = pmids.len();
        let batches = pmids.chunks(self.batch_size).count();

        for (index, batch) in pmids.chunks(self.batch_size).enumerate() {
            let start = index * self.batch_size;
            info!(
                "Fetching details: {}-{} of {}...",
                start + 1,
                start + batch.len(),
                total
            );

            let url = format!(
                "{}?db=pubmed&id={}&retmode=xml{}",
                self.efetch_url,
                batch.join(","),
                self.api_key_param()
            );

            match self.fetcher.fetch_text(&url).await? {
                Some(xml) => publications.extend(parse_pubmed_xml(&xml)),
                None => warn!("Skipping PubMed batch starting at {}", start + 1),
            }

            // NCBI allows 3 requests/second without an API key
            if index + 1 < batches {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        Ok(publications)
    }
}

fn medline_year_regex() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"(20\d{2})").expect("valid year pattern"))
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Pmid,
    Title,
    Journal,
    JournalAbbr,
    Year,
    MedlineDate,
    LastName,
    Initials,
    Doi,
    Keyword,
    MeshDescriptor,
    AbstractText { label: Option<String> },
}

/// Text being collected for one element, including any inline markup inside it
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

struct ArticleBuilder {
    publication: Publication,
    has_article: bool,
    in_pub_date: bool,
    pub_date_seen: bool,
    year: String,
    medline_date: String,
    last_name: String,
    initials: String,
    abstract_parts: Vec<String>,
}

impl ArticleBuilder {
    fn new() -> Self {
        Self {
            publication: Publication::new(Source::PubMed),
            has_article: false,
            in_pub_date: false,
            pub_date_seen: false,
            year: String::new(),
            medline_date: String::new(),
            last_name: String::new(),
            initials: String::new(),
            abstract_parts: Vec::new(),
        }
    }

    fn store(&mut self, field: Field, text: String) {
        let text = text.trim().to_string();
        let p = &mut self.publication;
        match field {
            Field::Pmid => p.pmid = text,
            Field::Title => p.title = text,
            Field::Journal => p.journal = text,
            Field::JournalAbbr => p.journal_abbr = text,
            Field::Year => self.year = text,
            Field::MedlineDate => self.medline_date = text,
            Field::LastName => self.last_name = text,
            Field::Initials => self.initials = text,
            Field::Doi => p.doi = text,
            Field::Keyword => {
                if !text.is_empty() {
                    p.keywords.push(text);
                }
            }
            Field::MeshDescriptor => {
                if !text.is_empty() {
                    p.mesh_terms.push(text);
                }
            }
            Field::AbstractText { label } => {
                if text.is_empty() {
                    return;
                }
                match label {
                    Some(label) if !label.is_empty() => {
                        self.abstract_parts.push(format!("{}: {}", label, text))
                    }
                    _ => self.abstract_parts.push(text),
                }
            }
        }
    }

    fn finish_author(&mut self) {
        if !self.last_name.is_empty() {
            let name = format!("{} {}", self.last_name, self.initials)
                .trim()
                .to_string();
            self.publication.authors.push(name);
        }
        self.last_name.clear();
        self.initials.clear();
    }

    fn build(self) -> Option<Publication> {
        if !self.has_article {
            return None;
        }

        let mut p = self.publication;
        p.year = if !self.year.is_empty() {
            self.year
        } else {
            medline_year_regex()
                .captures(&self.medline_date)
                .map(|c| c[1].to_string())
                .unwrap_or_default()
        };
        p.abstract_text = self.abstract_parts.join(" ");
        p.first_author = p.authors.first().cloned().unwrap_or_default();
        p.author_count = p.authors.len();
        Some(p)
    }
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse an efetch `PubmedArticleSet` document.
///
/// Articles without an `Article` element are skipped. On malformed XML the
/// articles parsed before the error are returned.
pub fn parse_pubmed_xml(xml: &str) -> Vec<Publication> {
    let mut publications = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<ArticleBuilder> = None;
    let mut capture: Option<Capture> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let parent = stack.last().cloned().unwrap_or_default();
                let grandparent = stack
                    .len()
                    .checked_sub(2)
                    .and_then(|i| stack.get(i))
                    .cloned()
                    .unwrap_or_default();
                stack.push(name.clone());

                if name == "PubmedArticle" {
                    current = Some(ArticleBuilder::new());
                    continue;
                }

                let Some(article) = current.as_mut() else {
                    continue;
                };
                if capture.is_some() {
                    continue;
                }

                let field = match (name.as_str(), parent.as_str()) {
                    ("Article", "MedlineCitation") => {
                        article.has_article = true;
                        None
                    }
                    ("PMID", "MedlineCitation") => Some(Field::Pmid),
                    ("ArticleTitle", "Article") => Some(Field::Title),
                    ("Title", "Journal") => Some(Field::Journal),
                    ("ISOAbbreviation", "Journal") => Some(Field::JournalAbbr),
                    ("PubDate", _) => {
                        article.in_pub_date = !article.pub_date_seen;
                        None
                    }
                    ("Year", "PubDate") if article.in_pub_date => Some(Field::Year),
                    ("MedlineDate", "PubDate") if article.in_pub_date => {
                        Some(Field::MedlineDate)
                    }
                    ("Author", "AuthorList") => {
                        article.last_name.clear();
                        article.initials.clear();
                        None
                    }
                    ("LastName", "Author") => Some(Field::LastName),
                    ("Initials", "Author") => Some(Field::Initials),
                    ("ArticleId", "ArticleIdList") if grandparent == "PubmedData" => {
                        match attribute(e, "IdType").as_deref() {
                            Some("doi") => Some(Field::Doi),
                            _ => None,
                        }
                    }
                    ("Keyword", "KeywordList") => Some(Field::Keyword),
                    ("DescriptorName", "MeshHeading") => Some(Field::MeshDescriptor),
                    ("AbstractText", "Abstract") => Some(Field::AbstractText {
                        label: attribute(e, "Label"),
                    }),
                    _ => None,
                };

                if let Some(field) = field {
                    capture = Some(Capture {
                        field,
                        depth: stack.len(),
                        text: String::new(),
                    });
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(c) = capture.as_mut() {
                    match e.unescape() {
                        Ok(text) => c.text.push_str(&text),
                        Err(_) => c.text.push_str(&String::from_utf8_lossy(e)),
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(_)) => {
                if capture.as_ref().is_some_and(|c| c.depth == stack.len()) {
                    if let (Some(c), Some(article)) = (capture.take(), current.as_mut()) {
                        article.store(c.field, c.text);
                    }
                }

                let name = stack.pop().unwrap_or_default();
                let parent = stack.last().map(String::as_str).unwrap_or_default();

                match (name.as_str(), parent) {
                    ("PubmedArticle", _) => {
                        if let Some(article) = current.take() {
                            match article.build() {
                                Some(p) => publications.push(p),
                                None => debug!("Skipping PubmedArticle without Article element"),
                            }
                        }
                    }
                    ("PubDate", _) => {
                        if let Some(article) = current.as_mut() {
                            if article.in_pub_date {
                                article.in_pub_date = false;
                                article.pub_date_seen = true;
                            }
                        }
                    }
                    ("Author", "AuthorList") => {
                        if let Some(article) = current.as_mut() {
                            article.finish_author();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "PubMed XML parse error at position {}: {}",
                    reader.error_position(),
                    e
                );
                break;
            }
            _ => {}
        }
    }

    publications
}
