use crate::models::{DashboardData, DashboardPublication, Publication};
use crate::topics::classify_topics;

impl From<&Publication> for DashboardPublication {
    fn from(p: &Publication) -> Self {
        Self {
            title: p.title.clone(),
            year: p.year.clone(),
            journal: p.journal.clone(),
            first_author: p.first_author_or_fallback().to_string(),
            author_count: p.author_count_or_fallback(),
            authors: p.authors.join(", "),
            topics: classify_topics(&p.title, &p.abstract_text),
            doi: p.doi.clone(),
            pmid: p.pmid.clone(),
            abstract_text: p.abstract_text.clone(),
        }
    }
}

/// Convert merged records into the dashboard dataset, newest year first, then
/// title descending within a year.
pub fn build_dashboard_data(publications: &[Publication]) -> DashboardData {
    let mut rows: Vec<DashboardPublication> =
        publications.iter().map(DashboardPublication::from).collect();

    rows.sort_by(|a, b| (&b.year, &b.title).cmp(&(&a.year, &a.title)));

    DashboardData { publications: rows }
}
