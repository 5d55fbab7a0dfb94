use std::collections::HashMap;
use tracing::info;

use crate::models::Publication;

/// Website titles sharing this many leading characters with a known record are duplicates.
const TITLE_PREFIX_CHARS: usize = 50;

fn normalise(value: &str) -> String {
    value.trim().to_lowercase()
}

fn prefix(key: &str) -> &str {
    match key.char_indices().nth(TITLE_PREFIX_CHARS) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

/// Insertion-ordered set of publications keyed by DOI, or by title when there is no DOI
#[derive(Default)]
struct MergedSet {
    entries: Vec<(String, Publication)>,
    index: HashMap<String, usize>,
}

impl MergedSet {
    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Replaces an existing entry in place, keeping its position
    fn insert(&mut self, key: String, publication: Publication) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = publication,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, publication));
            }
        }
    }

    fn has_title_prefix(&self, title_key: &str) -> bool {
        let wanted = prefix(title_key);
        self.entries
            .iter()
            .any(|(key, _)| !key.is_empty() && prefix(key) == wanted)
    }

    fn into_publications(self) -> Vec<Publication> {
        self.entries.into_iter().map(|(_, p)| p).collect()
    }
}

/// Merge PubMed records with website records.
///
/// PubMed is authoritative. A website record is only added when neither its DOI
/// nor its title is already known and its title does not share a 50-character
/// prefix with any existing key.
pub fn merge_publications(pubmed: Vec<Publication>, website: Vec<Publication>) -> Vec<Publication> {
    let mut merged = MergedSet::default();

    for p in pubmed {
        let doi_key = normalise(&p.doi);
        let key = if doi_key.is_empty() {
            normalise(&p.title)
        } else {
            doi_key
        };
        if !key.is_empty() {
            merged.insert(key, p);
        }
    }

    let mut added = 0;
    for p in website {
        let doi_key = normalise(&p.doi);
        let title_key = normalise(&p.title);

        if !doi_key.is_empty() && merged.contains(&doi_key) {
            continue;
        }
        if !title_key.is_empty() && merged.contains(&title_key) {
            continue;
        }
        if !title_key.is_empty() && merged.has_title_prefix(&title_key) {
            continue;
        }

        let key = if doi_key.is_empty() { title_key } else { doi_key };
        if !key.is_empty() {
            merged.insert(key, p);
            added += 1;
        }
    }

    if added > 0 {
        info!(
            "Added {} publications from SCAPIS website not found in PubMed",
            added
        );
    }

    merged.into_publications()
}
