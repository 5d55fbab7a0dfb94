use serde::{Deserialize, Serialize};

/// Where a raw publication record was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    PubMed,
    ScapisWebsite,
}

/// A publication as fetched, before topic classification
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub pmid: String,
    pub title: String,
    pub journal: String,
    pub journal_abbr: String,
    pub year: String,
    /// "LastName Initials", in author order
    pub authors: Vec<String>,
    pub first_author: String,
    pub author_count: usize,
    pub doi: String,
    pub keywords: Vec<String>,
    pub mesh_terms: Vec<String>,
    pub abstract_text: String,
    pub source: Source,
}

impl Publication {
    pub fn new(source: Source) -> Self {
        Self {
            pmid: String::new(),
            title: String::new(),
            journal: String::new(),
            journal_abbr: String::new(),
            year: String::new(),
            authors: Vec::new(),
            first_author: String::new(),
            author_count: 0,
            doi: String::new(),
            keywords: Vec::new(),
            mesh_terms: Vec::new(),
            abstract_text: String::new(),
            source,
        }
    }

    pub fn first_author_or_fallback(&self) -> &str {
        self.authors
            .first()
            .map(String::as_str)
            .unwrap_or(&self.first_author)
    }

    pub fn author_count_or_fallback(&self) -> usize {
        if self.authors.is_empty() {
            self.author_count
        } else {
            self.authors.len()
        }
    }
}

/// One row of the dashboard dataset. Field names match what the HTML template reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPublication {
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub first_author: String,
    #[serde(default)]
    pub author_count: usize,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub pmid: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

/// The dataset written to `data/publications.json` and embedded in the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub publications: Vec<DashboardPublication>,
}

impl DashboardData {
    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    fn years(&self) -> impl Iterator<Item = &str> {
        self.publications
            .iter()
            .map(|p| p.year.as_str())
            .filter(|y| !y.is_empty())
    }

    pub fn min_year(&self) -> Option<&str> {
        self.years().min()
    }

    pub fn max_year(&self) -> Option<&str> {
        self.years().max()
    }

    /// "2018–2025", or "N/A" when no record carries a year
    pub fn year_range(&self) -> String {
        match (self.min_year(), self.max_year()) {
            (Some(min), Some(max)) => format!("{}\u{2013}{}", min, max),
            _ => "N/A".to_string(),
        }
    }

    pub fn with_abstracts(&self) -> usize {
        self.publications
            .iter()
            .filter(|p| !p.abstract_text.is_empty())
            .count()
    }
}
