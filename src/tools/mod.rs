//! Tool surface offered to tool-capable providers.
//!
//! Tool ids are validated at registry construction, long before a provider
//! sees them. Execution problems never escape as errors: a tool call that
//! goes wrong returns readable text for the model to react to.

pub mod web;

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{DossierError, Result};

pub const WEB_SEARCH: &str = "web_search";
pub const WEB_FETCH: &str = "web_fetch";

const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Every tool id the pipeline can offer.
pub fn available() -> &'static [&'static str] {
    &[WEB_SEARCH, WEB_FETCH]
}

/// Reject unknown tool ids.
pub fn validate(names: &[&str]) -> Result<()> {
    for name in names {
        if !available().contains(name) {
            return Err(DossierError::UnknownTool {
                name: (*name).to_string(),
                available: available().join(", "),
            });
        }
    }
    Ok(())
}

/// Function-call definitions for the requested tools, in the shape the
/// Ollama chat API expects. Unknown ids are skipped; [`validate`] has
/// already rejected them on every production path.
pub fn definitions(allowed: &[String]) -> Vec<Value> {
    allowed
        .iter()
        .filter_map(|name| definition(name))
        .collect()
}

fn definition(name: &str) -> Option<Value> {
    match name {
        WEB_SEARCH => Some(json!({
            "type": "function",
            "function": {
                "name": WEB_SEARCH,
                "description": "Search the web and return short result snippets.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query."
                        }
                    },
                    "required": ["query"]
                }
            }
        })),
        WEB_FETCH => Some(json!({
            "type": "function",
            "function": {
                "name": WEB_FETCH,
                "description": "Fetch a URL and return its readable text content.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "The URL to fetch."
                        }
                    },
                    "required": ["url"]
                }
            }
        })),
        _ => None,
    }
}

/// Execute one tool call. The reply is plain text in every case.
pub async fn dispatch(name: &str, args: &Value) -> String {
    match name {
        WEB_SEARCH => {
            let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
            web::web_search(query, TOOL_CALL_TIMEOUT).await
        }
        WEB_FETCH => {
            let url = args.get("url").and_then(Value::as_str).unwrap_or_default();
            web::web_fetch(url, TOOL_CALL_TIMEOUT).await
        }
        other => format!("Error: unknown tool: {other}"),
    }
}
