//! DuckDuckGo web search client
//!
//! Uses the HTML endpoint, which needs no API key. Results are scraped from
//! the `result__a` anchors and their following `result__snippet` blocks.

use crate::collector::SearchProvider;
use crate::error::{Result, StockError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const BASE_URL: &str = "https://html.duckduckgo.com/html/";

static RESULT_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#).expect("result anchor pattern")
});

static RESULT_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(a|div)[^>]*class="result__snippet"[^>]*>(.*?)</(?:a|div)>"#)
        .expect("result snippet pattern")
});

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("href pattern"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("numeric entity pattern")
});

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// DuckDuckGo HTML search client
#[derive(Debug, Clone)]
pub struct DuckDuckGoClient {
    client: Client,
    base_url: String,
}

impl DuckDuckGoClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)")
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StockError::SearchError(format!("HTTP error: {status}")));
        }

        let html = response.text().await?;
        let hits: Vec<SearchHit> = parse_results(&html).into_iter().take(max_results).collect();
        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }
}

/// Parse result entries out of a DuckDuckGo HTML page
pub fn parse_results(html: &str) -> Vec<SearchHit> {
    let anchors: Vec<_> = RESULT_ANCHOR.captures_iter(html).collect();
    let snippets: Vec<_> = RESULT_SNIPPET.captures_iter(html).collect();

    anchors
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let attrs = caps.get(1)?.as_str();
            let href = HREF.captures(attrs)?.get(1)?.as_str();
            let title = clean_text(caps.get(2)?.as_str());
            if title.is_empty() {
                return None;
            }

            let next_start = anchors
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let snippet = snippets
                .iter()
                .filter_map(|s| s.get(0).zip(s.get(2)))
                .find(|(m, _)| m.start() >= whole.end() && m.start() < next_start)
                .map(|(_, body)| clean_text(body.as_str()))
                .unwrap_or_default();

            Some(SearchHit {
                title,
                link: resolve_link(href),
                snippet,
            })
        })
        .collect()
}

// Result links go through a /l/?uddg=<target> redirect.
fn resolve_link(href: &str) -> String {
    let href = decode_entities(href);
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.clone()
    };

    Url::parse(&absolute)
        .ok()
        .filter(|url| url.path().starts_with("/l/"))
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(href)
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

// `&amp;` goes last so an escaped entity such as `&amp;lt;` decodes only once.
fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
