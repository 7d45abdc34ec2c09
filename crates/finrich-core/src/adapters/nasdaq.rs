use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::fetch_body;
use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::source::IdentifierSource;
use crate::{unique_identifiers, Identifier};

pub const NASDAQ100_URL: &str = "https://api.nasdaq.com/api/quote/list-type/nasdaq100";

// The endpoint rejects requests without a browser user agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Nasdaq-100 constituents from the Nasdaq list-type API.
#[derive(Clone)]
pub struct Nasdaq100Source {
    http: Arc<dyn HttpClient>,
    url: String,
    timeout_ms: u64,
}

impl Nasdaq100Source {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_url(http, NASDAQ100_URL)
    }

    pub fn with_url(http: Arc<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl IdentifierSource for Nasdaq100Source {
    fn name(&self) -> &str {
        "nasdaq100"
    }

    fn fetch_identifiers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Identifier>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(&self.url)
                .with_header("user-agent", BROWSER_USER_AGENT)
                .with_header("accept", "application/json")
                .with_timeout_ms(self.timeout_ms);
            let body = fetch_body(self.http.as_ref(), self.name(), request).await?;

            Ok(parse_nasdaq_rows(&body).unwrap_or_else(|| {
                warn!(
                    target: "finrich::source",
                    source = "nasdaq100",
                    "response does not contain data.data.rows; no identifiers produced"
                );
                Vec::new()
            }))
        })
    }
}

/// Reads `data.data.rows[].symbol`. Returns `None` when the rows array is missing.
///
/// Rows without a string `symbol` are skipped.
pub fn parse_nasdaq_rows(body: &str) -> Option<Vec<Identifier>> {
    let document: Value = serde_json::from_str(body).ok()?;
    let rows = document.pointer("/data/data/rows")?.as_array()?;

    let symbols = rows
        .iter()
        .filter_map(|row| row.get("symbol").and_then(Value::as_str));
    Some(unique_identifiers(symbols))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_symbols_in_row_order() {
        let body = r#"{"data":{"data":{"rows":[
            {"symbol":"AAPL","companyName":"Apple Inc."},
            {"symbol":" MSFT "},
            {"companyName":"no symbol"},
            {"symbol":""},
            {"symbol":"AAPL"}
        ]}}}"#;

        let ids = parse_nasdaq_rows(body).expect("rows present");
        let rendered = ids.iter().map(Identifier::as_str).collect::<Vec<_>>();
        assert_eq!(rendered, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn unexpected_shapes_yield_none() {
        assert_eq!(parse_nasdaq_rows(r#"{"data":null}"#), None);
        assert_eq!(parse_nasdaq_rows(r#"{"data":{"data":{"rows":{}}}}"#), None);
        assert_eq!(parse_nasdaq_rows("<html>blocked</html>"), None);
    }
}
