//! Search port: keyword search returning ranked results with fetched page text.
//!
//! The HTTP implementation queries a Brave-style web search API, then fetches
//! each hit and cleans the body. A page that cannot be fetched within the
//! timeout still produces a result with the provider snippet as content; a
//! failed search API call fails the whole query.

use std::time::Duration;

use regex_lite::Regex;
use serde_json::Value;

use crate::config::{Config, SearchConfig};
use crate::domain::SearchResult;
use crate::llm::BoxFuture;

/// Search module errors.
#[derive(Debug)]
pub enum SearchError {
    Config(String),
    Http(String),
    Parse(String),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::Config(s) => write!(f, "search config: {}", s),
            SearchError::Http(s) => write!(f, "search http: {}", s),
            SearchError::Parse(s) => write!(f, "search parse: {}", s),
        }
    }
}

impl std::error::Error for SearchError {}

/// Keyword search capability. Results are ordered as ranked by the provider.
pub trait SearchPort: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
        num_results: u8,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, SearchError>>;
}

const DEFAULT_API_BASE: &str = "https://api.search.brave.com/res/v1/web/search";
const SEARCH_TIMEOUT_SECS: u64 = 15;
const FETCH_TIMEOUT_SECS: u64 = 8;
const MAX_REDIRECTS: usize = 5;
const MAX_CONTENT_CHARS: usize = 5_000;
const USER_AGENT: &str = "concierge/0.1";

/// HTTP search provider: Brave-shaped API + per-URL page fetch.
pub struct HttpSearch {
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSearch {
    /// Build provider from validated config.
    pub fn from_config(cfg: &Config) -> Result<Self, SearchError> {
        let search: &SearchConfig = cfg
            .search
            .as_ref()
            .ok_or_else(|| SearchError::Config("search section missing".into()))?;
        let api_key = search
            .api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SearchError::Config("search.api_key required".into()))?
            .to_string();
        let api_base = search
            .api_base
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| SearchError::Config(format!("reqwest client: {}", e)))?;
        Ok(Self {
            api_base,
            api_key,
            client,
        })
    }

    /// Call the search API and return (url, title, snippet) triples.
    async fn keyword_search(
        &self,
        query: &str,
        count: u8,
    ) -> Result<Vec<(String, String, String)>, SearchError> {
        let url = reqwest::Url::parse_with_params(
            &self.api_base,
            &[("q", query), ("count", &count.to_string())],
        )
        .map_err(|e| SearchError::Config(e.to_string()))?;

        let res = self
            .client
            .get(url)
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(SearchError::Http(format!("{} {}", status, body.trim())));
        }

        let v: Value = serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))?;
        let results = v
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or(&[]);

        Ok(results
            .iter()
            .map(|r| {
                (
                    r.get("url").and_then(Value::as_str).unwrap_or("").to_string(),
                    r.get("title").and_then(Value::as_str).unwrap_or("").to_string(),
                    r.get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                )
            })
            .collect())
    }

    /// GET a result page and reduce it to clean, truncated text.
    async fn fetch_page(&self, url: &str) -> Result<String, SearchError> {
        let res = self
            .client
            .get(url)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;
        if !res.status().is_success() {
            return Err(SearchError::Http(format!("{} fetching {}", res.status(), url)));
        }
        let body = res
            .text()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;
        Ok(truncate_chars(&clean_text(&html_to_lines(&body)), MAX_CONTENT_CHARS))
    }
}

impl SearchPort for HttpSearch {
    fn search<'a>(
        &'a self,
        query: &'a str,
        num_results: u8,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, SearchError>> {
        Box::pin(async move {
            let count = num_results.clamp(1, 10);
            let hits = self.keyword_search(query, count).await?;

            let mut results = Vec::with_capacity(hits.len());
            for (url, title, snippet) in hits {
                let content = match self.fetch_page(&url).await {
                    Ok(text) => text,
                    Err(e) => {
                        eprintln!("search: page fetch failed ({}): {}", url, e);
                        snippet
                    }
                };
                results.push(SearchResult {
                    url,
                    title,
                    content,
                });
            }
            Ok(results)
        })
    }
}

/// Strip script/style blocks, then turn remaining tags into line breaks so
/// the page's block structure survives as lines.
fn html_to_lines(html: &str) -> String {
    let script_re = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style_re = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let tag_re = Regex::new("<[^>]+>").unwrap();

    let s = script_re.replace_all(html, "\n");
    let s = style_re.replace_all(&s, "\n");
    let s = tag_re.replace_all(&s, "\n");
    html_unescape(&s)
}

/// Collapse blank-line runs, trim every line, drop empties.
fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => s[..i].to_string(),
        None => s.to_string(),
    }
}

fn html_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_trims_and_drops_empties() {
        let raw = "  first line \n\n\n   \n second line\t\n\n";
        assert_eq!(clean_text(raw), "first line\nsecond line");
    }

    #[test]
    fn clean_text_empty_input() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("\n\n \n"), "");
    }

    #[test]
    fn html_to_lines_strips_script_style_and_tags() {
        let html = "<html><head><script>alert(1)</script><style>.x{}</style></head>\
                    <body><p>Hello</p><b>world</b></body></html>";
        let text = clean_text(&html_to_lines(html));
        assert!(!text.contains("alert"));
        assert!(!text.contains(".x"));
        assert_eq!(text, "Hello\nworld");
    }

    #[test]
    fn html_to_lines_unescapes_entities() {
        let text = clean_text(&html_to_lines("<p>a &amp; b &lt;c&gt;</p>"));
        assert_eq!(text, "a & b <c>");
    }

    #[test]
    fn truncate_chars_limits_and_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multibyte: counts characters, not bytes.
        assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
    }

    #[test]
    fn truncate_cap_matches_contract() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 500);
        assert_eq!(truncate_chars(&long, MAX_CONTENT_CHARS).chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn brave_results_shape_parses() {
        let body = serde_json::json!({
            "web": {
                "results": [
                    { "url": "https://a.example", "title": "A", "description": "first" },
                    { "url": "https://b.example", "title": "B" }
                ]
            }
        });
        let results = body
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["description"], "first");
        assert!(results[1].get("description").is_none());
    }
}
