use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized citation derived from a search tool's raw result.
///
/// Invariant: `url` is non-empty and `relevance_score` is in `[0, 1]`,
/// non-increasing across a capture batch.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceRecord {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub relevance_score: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub favicon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arxiv_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub authors: Option<Vec<String>>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none", default)]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pdf_url: Option<String>,
}

/// Relevance approximation by result position, floored at zero
pub fn relevance_for_index(index: usize) -> f32 {
    (1.0 - index as f32 * 0.1).max(0.0)
}

/// Host part of a URL with any leading `www.` removed
pub fn domain_from_url(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(rest)
        .split('@')
        .last()
        .unwrap_or(rest);
    let host = host.split(':').next().unwrap_or(host);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Synthesized favicon URL for providers that don't supply one
pub fn favicon_for_domain(domain: &str) -> String {
    format!("https://www.google.com/s2/favicons?domain={}&sz=64", domain)
}

fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

/// An arXiv result carries an id field or an arxiv.org URL
pub fn is_arxiv_result(value: &Value) -> bool {
    if str_field(value, &["arxiv_id", "arxivId"]).is_some() {
        return true;
    }
    str_field(value, &["url"])
        .map(|u| u.contains("arxiv.org"))
        .unwrap_or(false)
}

/// Map one raw search result to a record. Results without a URL are dropped
/// (the non-empty-url invariant), never defaulted.
pub fn record_from_raw(value: &Value, index: usize) -> Option<SourceRecord> {
    let url = str_field(value, &["url", "link"])?;
    let domain = domain_from_url(&url);
    let title = str_field(value, &["title"]).unwrap_or_else(|| domain.clone());
    let favicon_url = str_field(value, &["favicon", "favicon_url"])
        .or_else(|| Some(favicon_for_domain(&domain)));

    let mut record = SourceRecord {
        title,
        url,
        domain,
        relevance_score: relevance_for_index(index),
        favicon_url,
        snippet: None,
        published_date: str_field(value, &["publishedDate", "published_date", "published"]),
        arxiv_id: None,
        authors: None,
        abstract_text: None,
        pdf_url: None,
    };

    if is_arxiv_result(value) {
        record.arxiv_id = str_field(value, &["arxiv_id", "arxivId"])
            .or_else(|| arxiv_id_from_url(&record.url));
        record.abstract_text = str_field(value, &["abstract", "summary"]);
        record.authors = value
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.as_str().map(|s| s.to_string()))
                    .collect::<Vec<_>>()
            })
            .filter(|v: &Vec<String>| !v.is_empty());
        record.pdf_url = str_field(value, &["pdf_url", "pdfUrl"]).or_else(|| {
            record
                .arxiv_id
                .as_ref()
                .map(|id| format!("https://arxiv.org/pdf/{}", id))
        });
    } else {
        record.snippet = str_field(value, &["text", "content", "snippet"]);
    }

    Some(record)
}

fn arxiv_id_from_url(url: &str) -> Option<String> {
    let marker = url.find("arxiv.org/")?;
    let path = &url[marker + "arxiv.org/".len()..];
    let id = path
        .strip_prefix("abs/")
        .or_else(|| path.strip_prefix("pdf/"))?;
    let id = id.split(['?', '#']).next().unwrap_or(id);
    let id = id.strip_suffix(".pdf").unwrap_or(id);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Best-effort scrape of a raw response body for known result-array field
/// names. First non-empty array wins.
pub fn scan_for_source_arrays(raw: &Value) -> Vec<SourceRecord> {
    for key in ["results", "data", "searchResults", "webSearchResults"] {
        if let Some(items) = raw.get(key).and_then(|v| v.as_array()) {
            let records: Vec<SourceRecord> = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| record_from_raw(item, i))
                .collect();
            if !records.is_empty() {
                return records;
            }
        }
    }
    Vec::new()
}
