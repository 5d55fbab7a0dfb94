use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

use crate::models::DashboardData;

const TEMPLATE: &str = include_str!("../templates/dashboard.html");

pub struct DashboardGenerator;

impl DashboardGenerator {
    /// Render the static dashboard with `data` embedded as the page's dataset
    pub fn generate(data: &DashboardData, updated: DateTime<Utc>) -> Result<String> {
        let data_json = Self::script_safe_json(data)?;
        let pub_count = data.len().to_string();
        let year_range = Self::escape_html(&data.year_range());
        let update_date = updated.format("%d %b %Y").to_string();

        Ok(Self::fill_template(
            TEMPLATE,
            &[
                ("DATA", data_json.as_str()),
                ("PUB_COUNT", pub_count.as_str()),
                ("YEAR_RANGE", year_range.as_str()),
                ("UPDATE_DATE", update_date.as_str()),
            ],
        ))
    }

    pub fn save(content: &str, filepath: &Path) -> Result<()> {
        if let Some(parent) = filepath.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(filepath, content).context("Failed to write dashboard file")
    }

    /// JSON for embedding in a `<script>` element. `<` only occurs inside JSON
    /// strings, where `\u003c` is an equivalent escape, so no record text can
    /// close the element.
    fn script_safe_json(data: &DashboardData) -> Result<String> {
        let json = serde_json::to_string(data).context("Failed to serialize dashboard data")?;
        Ok(json.replace('<', "\\u003c"))
    }

    /// Substitute `%%NAME%%` placeholders in one pass, so substituted text is
    /// never scanned for further placeholders.
    fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("%%") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let matched = values.iter().find(|(name, _)| {
                after.starts_with(name) && after[name.len()..].starts_with("%%")
            });

            match matched {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &after[name.len() + 2..];
                }
                None => {
                    out.push_str("%%");
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DashboardPublication;
    use chrono::TimeZone;

    fn row(title: &str, year: &str, abstract_text: &str) -> DashboardPublication {
        DashboardPublication {
            title: title.to_string(),
            year: year.to_string(),
            journal: "Eur Heart J".to_string(),
            first_author: "Bergström G".to_string(),
            author_count: 3,
            authors: "Bergström G, Persson M, Engström G".to_string(),
            topics: vec!["Cardiovascular".to_string()],
            doi: "10.1/x".to_string(),
            pmid: "1".to_string(),
            abstract_text: abstract_text.to_string(),
        }
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_generate_fills_placeholders() {
        let data = DashboardData {
            publications: vec![row("Plaque burden", "2019", ""), row("CAC scores", "2024", "")],
        };
        let html = DashboardGenerator::generate(&data, date()).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("2 publications (2019\u{2013}2024)"));
        assert!(html.contains("Last updated: 02 Mar 2026"));
        assert!(html.contains("const FULL_DATA = {\"publications\":[{\"title\":\"Plaque burden\""));
        assert!(html.contains("\"firstAuthor\":\"Bergström G\""));
        assert!(!html.contains("%%"));
    }

    #[test]
    fn test_generate_empty_dataset() {
        let html = DashboardGenerator::generate(&DashboardData::default(), date()).unwrap();
        assert!(html.contains("0 publications (N/A)"));
        assert!(html.contains("const FULL_DATA = {\"publications\":[]};"));
    }

    #[test]
    fn test_record_text_cannot_close_script() {
        let data = DashboardData {
            publications: vec![row("Evil</script><script>alert(1)</script>", "2020", "")],
        };
        let html = DashboardGenerator::generate(&data, date()).unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains("Evil\\u003c/script>"));
    }

    #[test]
    fn test_placeholder_text_in_records_is_not_substituted() {
        let data = DashboardData {
            publications: vec![row("About %%PUB_COUNT%% things", "2020", "%%DATA%%")],
        };
        let html = DashboardGenerator::generate(&data, date()).unwrap();
        assert!(html.contains("About %%PUB_COUNT%% things"));
        assert!(html.contains("\"abstract\":\"%%DATA%%\""));
    }

    #[test]
    fn test_fill_template_leaves_unknown_markers() {
        let out = DashboardGenerator::fill_template("a %%X%% b %%Y%% 100%%", &[("Y", "y")]);
        assert_eq!(out, "a %%X%% b y 100%%");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            DashboardGenerator::escape_html("<a href=\"x\">R&D's</a>"),
            "&lt;a href=&quot;x&quot;&gt;R&amp;D&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site").join("index.html");
        DashboardGenerator::save("<html></html>", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
