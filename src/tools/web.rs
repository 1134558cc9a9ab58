//! Web search and fetch.
//!
//! Tool output is always plain text. Anything that goes wrong comes back as
//! an error string the model can read and work around; the pipeline never
//! fails because a page was unreachable. Successful fetches are cached for
//! the life of the process since research agents tend to re-request the
//! same handful of pages.

use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use url::Url;

/// Fetched pages are cut at this length; research agents only need a skim.
const MAX_CONTENT_CHARS: usize = 5000;

/// Some sites reject requests without a browser user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Most results to include in a search reply.
const MAX_SEARCH_RESULTS: usize = 5;

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .expect("HTTP client builds with default TLS")
});

static FETCH_CACHE: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
        .expect("script/style pattern is valid")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

static SEARCH_SNIPPET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#)
        .expect("snippet pattern is valid")
});

/// Fetch a URL and return its readable text.
///
/// Bare domains get an `https://` scheme before parsing. Every failure mode
/// maps to a stable `Error: ...` string.
pub async fn web_fetch(url: &str, timeout: Duration) -> String {
    let target = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };

    if Url::parse(&target).is_err() {
        return format!("Error: Invalid URL format: {target}");
    }

    if let Some(cached) = FETCH_CACHE.get(&target) {
        return cached.clone();
    }

    let response = match CLIENT.get(&target).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            return format!("Error: Request timeout while fetching {target}");
        }
        Err(e) if e.is_connect() => {
            return format!("Error: Unable to connect to {target}");
        }
        Err(e) => return format!("Error fetching content from {target}: {e}"),
    };

    let status = response.status();
    if !status.is_success() {
        return format!("Error: HTTP {} when fetching {}", status.as_u16(), target);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return format!("Error fetching content from {target}: {e}"),
    };

    let reply = format!("Content from {target}:\n\n{}", truncate(html_to_text(&body)));
    FETCH_CACHE.insert(target, reply.clone());
    reply
}

/// Search the web and return result snippets, newest-first as the engine
/// ranks them. An empty result set is reported in prose, not as an error.
pub async fn web_search(query: &str, timeout: Duration) -> String {
    search_at(SEARCH_ENDPOINT, query, timeout).await
}

async fn search_at(endpoint: &str, query: &str, timeout: Duration) -> String {
    if query.trim().is_empty() {
        return "Error: empty search query".to_string();
    }

    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let target = format!("{endpoint}?q={encoded}");

    let response = match CLIENT.get(&target).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            return format!("Error: Request timeout while fetching {target}");
        }
        Err(e) if e.is_connect() => {
            return format!("Error: Unable to connect to {target}");
        }
        Err(e) => return format!("Error fetching content from {target}: {e}"),
    };

    let status = response.status();
    if !status.is_success() {
        return format!("Error: HTTP {} when fetching {}", status.as_u16(), target);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return format!("Error fetching content from {target}: {e}"),
    };

    let snippets: Vec<String> = SEARCH_SNIPPET
        .captures_iter(&body)
        .filter_map(|c| c.get(1))
        .map(|m| collapse_inline(&strip_tags(m.as_str())))
        .filter(|s| !s.is_empty())
        .take(MAX_SEARCH_RESULTS)
        .collect();

    if snippets.is_empty() {
        return "No good DuckDuckGo Search Result was found".to_string();
    }

    snippets.join("\n\n")
}

/// Strip markup down to line-per-block plain text.
fn html_to_text(html: &str) -> String {
    let text = strip_tags(html);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_tags(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_blocks, "\n");
    decode_entities(&without_tags)
}

/// The handful of entities that dominate real pages.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn collapse_inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(content: String) -> String {
    if content.len() <= MAX_CONTENT_CHARS {
        return content;
    }
    let mut cut = MAX_CONTENT_CHARS;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n\n[Content truncated - showing first {MAX_CONTENT_CHARS} characters]",
        &content[..cut]
    )
}
