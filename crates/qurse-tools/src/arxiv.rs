use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use qurse_models::sources::{favicon_for_domain, relevance_for_index};
use qurse_models::SourceRecord;

use crate::context::ToolContext;
use crate::param;
use crate::tool::{ParameterDefinition, Tool, ToolParameters, ToolResult};

pub const ARXIV_BASE_URL: &str = "https://arxiv.org";

const DEFAULT_RESULTS_PER_QUERY: usize = 5;
const ABSTRACT_PREVIEW_CHARS: usize = 500;

/// One paper record extracted from the arXiv search listing
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivPaper {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub abstract_text: Option<String>,
    pub submitted: Option<String>,
    pub comments: Option<String>,
    pub journal_ref: Option<String>,
}

impl ArxivPaper {
    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.arxiv_id)
    }

    pub fn pdf_url(&self) -> String {
        format!("https://arxiv.org/pdf/{}", self.arxiv_id)
    }

    pub fn to_source_record(&self, index: usize) -> SourceRecord {
        SourceRecord {
            title: self.title.clone(),
            url: self.abs_url(),
            domain: "arxiv.org".to_string(),
            relevance_score: relevance_for_index(index),
            favicon_url: Some(favicon_for_domain("arxiv.org")),
            snippet: None,
            published_date: self.submitted.clone(),
            arxiv_id: Some(self.arxiv_id.clone()),
            authors: if self.authors.is_empty() {
                None
            } else {
                Some(self.authors.clone())
            },
            abstract_text: self.abstract_text.clone(),
            pdf_url: Some(self.pdf_url()),
        }
    }
}

/// Client for the arXiv full-text search endpoint.
///
/// The endpoint returns HTML, so paper records are recovered with regex
/// extraction; malformed fragments are skipped, never fatal.
pub struct ArxivClient {
    base_url: String,
    client: reqwest::Client,
}

impl ArxivClient {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| ARXIV_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivPaper>> {
        let response = self
            .client
            .get(format!("{}/search/", self.base_url))
            .query(&[("searchtype", "all"), ("query", query), ("start", "0")])
            .send()
            .await
            .context("request to arXiv search failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("arXiv search returned status {}", status));
        }

        let html = response.text().await?;
        let mut papers = parse_listing(&html);
        papers.truncate(max_results);
        Ok(papers)
    }
}

/// Extract paper records from a search listing page
pub fn parse_listing(html: &str) -> Vec<ArxivPaper> {
    let id_re = Regex::new(r"arxiv\.org/abs/([0-9]{4}\.[0-9]{4,5}(?:v[0-9]+)?)")
        .expect("arXiv id pattern is valid");
    let title_re =
        Regex::new(r#"(?s)<p class="title[^"]*">(.*?)</p>"#).expect("title pattern is valid");
    let authors_block_re =
        Regex::new(r#"(?s)<p class="authors">(.*?)</p>"#).expect("authors pattern is valid");
    let anchor_re = Regex::new(r"(?s)<a[^>]*>(.*?)</a>").expect("anchor pattern is valid");
    let category_re =
        Regex::new(r#"(?s)<span class="tag[^"]*"[^>]*>(.*?)</span>"#).expect("tag pattern is valid");
    let abstract_full_re = Regex::new(r#"(?s)<span class="abstract-full[^"]*"[^>]*>(.*?)</span>"#)
        .expect("abstract pattern is valid");
    let abstract_short_re = Regex::new(r#"(?s)<span class="abstract-short[^"]*"[^>]*>(.*?)</span>"#)
        .expect("abstract pattern is valid");
    let submitted_re =
        Regex::new(r">Submitted</span>\s*([^;<]+)").expect("submitted pattern is valid");
    let notes_block_re = Regex::new(r#"(?s)<p class="comments[^"]*">(.*?)</p>"#)
        .expect("comments pattern is valid");

    let mut papers = Vec::new();

    for block in html.split(r#"<li class="arxiv-result">"#).skip(1) {
        let Some(arxiv_id) = id_re
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        let Some(title) = title_re
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| clean_fragment(m.as_str()))
            .filter(|t| !t.is_empty())
        else {
            continue;
        };

        let authors = authors_block_re
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| {
                anchor_re
                    .captures_iter(m.as_str())
                    .filter_map(|c| c.get(1))
                    .map(|m| clean_fragment(m.as_str()))
                    .filter(|a| !a.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut categories: Vec<String> = category_re
            .captures_iter(block)
            .filter_map(|c| c.get(1))
            .map(|m| clean_fragment(m.as_str()))
            .filter(|c| !c.is_empty())
            .collect();
        categories.dedup();

        let abstract_text = abstract_full_re
            .captures(block)
            .or_else(|| abstract_short_re.captures(block))
            .and_then(|c| c.get(1))
            .map(|m| {
                clean_fragment(m.as_str())
                    .trim_end_matches("△ Less")
                    .trim()
                    .to_string()
            })
            .filter(|a| !a.is_empty());

        let submitted = submitted_re
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| clean_fragment(m.as_str()))
            .filter(|s| !s.is_empty());

        let mut comments = None;
        let mut journal_ref = None;
        for notes in notes_block_re.captures_iter(block) {
            let raw = notes.get(1).map(|m| m.as_str()).unwrap_or_default();
            let text = clean_fragment(raw);
            if let Some(rest) = text.strip_prefix("Journal ref:") {
                journal_ref = Some(rest.trim().to_string()).filter(|s| !s.is_empty());
            } else if let Some(rest) = text.strip_prefix("Comments:") {
                comments = Some(rest.trim().to_string()).filter(|s| !s.is_empty());
            }
        }

        papers.push(ArxivPaper {
            arxiv_id,
            title,
            authors,
            categories,
            abstract_text,
            submitted,
            comments,
            journal_ref,
        });
    }

    papers
}

/// Strip tags, decode the common entities, collapse whitespace
fn clean_fragment(fragment: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").expect("tag-strip pattern is valid");
    let without_tags = tag_re.replace_all(fragment, " ");
    let decoded = without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&#9651;", "△");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// arXiv search tool for research-paper questions
pub struct ArxivSearchTool {
    client: ArxivClient,
}

impl ArxivSearchTool {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn name(&self) -> &str {
        crate::ARXIV_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search arXiv for academic papers. Accepts multiple queries and returns paper records with authors and abstracts. Synthesize answers from the abstracts and cite the papers."
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        HashMap::from([
            param!("queries", "array", "Search queries to run against arXiv", required),
            param!("max_results", "integer", "Maximum papers per query", optional, 5),
        ])
    }

    async fn execute(&self, params: ToolParameters, context: &ToolContext) -> ToolResult {
        let queries = match params.get_required::<Vec<String>>("queries") {
            Ok(queries) => queries,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let queries: Vec<String> = match context.max_queries {
            Some(cap) => queries.into_iter().take(cap).collect(),
            None => queries,
        };

        let requested_results = params
            .get_optional::<usize>("max_results")
            .unwrap_or(None)
            .unwrap_or(DEFAULT_RESULTS_PER_QUERY);
        let per_query = match context.max_results {
            Some(cap) => requested_results.min(cap),
            None => requested_results,
        };

        let mut records: Vec<SourceRecord> = Vec::new();
        let mut sections: Vec<String> = Vec::new();

        for query in &queries {
            match self.client.search(query, per_query).await {
                Ok(papers) => {
                    let mut lines = vec![format!("arXiv results for \"{}\":", query)];
                    for paper in &papers {
                        let index = records.len();
                        lines.push(format_paper(paper, lines.len()));
                        records.push(paper.to_source_record(index));
                    }
                    if lines.len() == 1 {
                        lines.push("No papers found.".to_string());
                    }
                    sections.push(lines.join("\n"));
                }
                Err(e) => {
                    sections.push(format!("arXiv search for \"{}\" failed: {}", query, e));
                }
            }
        }

        if records.is_empty() && sections.iter().all(|s| s.contains("failed")) {
            return ToolResult::error("All arXiv queries failed".to_string());
        }

        context.session.record_sources(records);
        ToolResult::success(sections.join("\n\n"))
    }
}

fn format_paper(paper: &ArxivPaper, position: usize) -> String {
    let mut line = format!("{}. {} (arXiv:{})", position, paper.title, paper.arxiv_id);
    if !paper.authors.is_empty() {
        line.push_str(&format!("\n   Authors: {}", paper.authors.join(", ")));
    }
    if let Some(abstract_text) = &paper.abstract_text {
        let preview: String = abstract_text.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
        line.push_str(&format!("\n   Abstract: {}", preview));
    }
    line.push_str(&format!("\n   PDF: {}", paper.pdf_url()));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_FIXTURE: &str = r##"
<ol class="breathe-horizontal">
<li class="arxiv-result">
  <div class="is-marginless">
    <p class="list-title is-inline-block">
      <a href="https://arxiv.org/abs/2401.12345">arXiv:2401.12345</a>
      <span>&nbsp;[<a href="https://arxiv.org/pdf/2401.12345">pdf</a>]</span>
    </p>
    <div class="tags is-inline-block">
      <span class="tag is-small is-link tooltip is-tooltip-top" data-tooltip="Machine Learning">cs.LG</span>
      <span class="tag is-small is-grey tooltip is-tooltip-top" data-tooltip="Artificial Intelligence">cs.AI</span>
    </div>
  </div>
  <p class="title is-5 mathjax">
    Scaling Laws for Sparse Mixture-of-Experts
  </p>
  <p class="authors">
    <span class="has-text-black-bis has-text-weight-semibold">Authors:</span>
    <a href="/search/?searchtype=author&amp;query=Doe%2C+J">Jane Doe</a>,
    <a href="/search/?searchtype=author&amp;query=Smith%2C+J">John Smith</a>
  </p>
  <p class="abstract mathjax">
    <span class="has-text-black-bis has-text-weight-semibold">Abstract</span>:
    <span class="abstract-short has-text-grey-dark mathjax">Short version&hellip;</span>
    <span class="abstract-full has-text-grey-dark mathjax" style="display: none;">
      We study scaling laws for sparse mixture-of-experts models &amp; their dense counterparts.
      <a class="is-size-7" href="#">&#9651; Less</a>
    </span>
  </p>
  <p class="is-size-7">
    <span class="has-text-black-bis has-text-weight-semibold">Submitted</span> 22 January, 2024;
    <span class="has-text-black-bis has-text-weight-semibold">originally announced</span> January 2024.
  </p>
  <p class="comments is-size-7">
    <span class="has-text-black-bis has-text-weight-semibold">Comments:</span>
    <span>18 pages, 7 figures</span>
  </p>
  <p class="comments is-size-7">
    <span class="has-text-black-bis has-text-weight-semibold">Journal ref:</span>
    JMLR 2024
  </p>
</li>
<li class="arxiv-result">
  <p class="title is-5 mathjax">Malformed entry with no id link</p>
</li>
<li class="arxiv-result">
  <div class="is-marginless">
    <p class="list-title is-inline-block">
      <a href="https://arxiv.org/abs/2312.00001v2">arXiv:2312.00001v2</a>
    </p>
  </div>
  <p class="title is-5 mathjax">Second Paper</p>
</li>
</ol>
"##;

    #[test]
    fn extracts_full_record() {
        let papers = parse_listing(LISTING_FIXTURE);
        assert_eq!(papers.len(), 2);

        let paper = &papers[0];
        assert_eq!(paper.arxiv_id, "2401.12345");
        assert_eq!(paper.title, "Scaling Laws for Sparse Mixture-of-Experts");
        assert_eq!(paper.authors, vec!["Jane Doe", "John Smith"]);
        assert_eq!(paper.categories, vec!["cs.LG", "cs.AI"]);
        assert!(paper
            .abstract_text
            .as_ref()
            .unwrap()
            .starts_with("We study scaling laws for sparse mixture-of-experts models &"));
        assert_eq!(paper.submitted.as_deref(), Some("22 January, 2024"));
        assert_eq!(paper.comments.as_deref(), Some("18 pages, 7 figures"));
        assert_eq!(paper.journal_ref.as_deref(), Some("JMLR 2024"));
        assert_eq!(paper.pdf_url(), "https://arxiv.org/pdf/2401.12345");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let papers = parse_listing(LISTING_FIXTURE);
        assert!(papers.iter().all(|p| !p.arxiv_id.is_empty()));
        assert_eq!(papers[1].arxiv_id, "2312.00001v2");
        assert_eq!(papers[1].title, "Second Paper");
        assert!(papers[1].authors.is_empty());
    }

    #[test]
    fn source_record_keeps_paper_fields() {
        let papers = parse_listing(LISTING_FIXTURE);
        let record = papers[0].to_source_record(0);
        assert_eq!(record.url, "https://arxiv.org/abs/2401.12345");
        assert_eq!(record.domain, "arxiv.org");
        assert_eq!(record.arxiv_id.as_deref(), Some("2401.12345"));
        assert_eq!(record.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2401.12345"));
        assert!((record.relevance_score - 1.0).abs() < f32::EPSILON);
        assert_eq!(record.authors.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn empty_page_yields_no_records() {
        assert!(parse_listing("<html><body>No results</body></html>").is_empty());
    }
}
