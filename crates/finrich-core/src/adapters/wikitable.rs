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

/// S&P 500 constituents rendered by wikitable2json.
pub const SP500_WIKITABLE_URL: &str =
    "https://www.wikitable2json.com/api/List_of_S%26P_500_companies?table=0";

const SYMBOL_HEADER: &str = "Symbol";

/// Identifier list scraped from a table-to-JSON endpoint of shape
/// `[[header_row, row, row, ...]]`.
#[derive(Clone)]
pub struct WikitableSource {
    http: Arc<dyn HttpClient>,
    name: String,
    url: String,
    timeout_ms: u64,
}

impl WikitableSource {
    pub fn sp500(http: Arc<dyn HttpClient>) -> Self {
        Self::new(http, "sp500", SP500_WIKITABLE_URL)
    }

    pub fn new(http: Arc<dyn HttpClient>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            http,
            name: name.into(),
            url: url.into(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl IdentifierSource for WikitableSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_identifiers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Identifier>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(&self.url).with_timeout_ms(self.timeout_ms);
            let body = fetch_body(self.http.as_ref(), &self.name, request).await?;

            Ok(parse_wikitable(&body).unwrap_or_else(|| {
                warn!(
                    target: "finrich::source",
                    source = %self.name,
                    "response is not a [[header, rows...]] table; no identifiers produced"
                );
                Vec::new()
            }))
        })
    }
}

/// Reads the `Symbol` column of the first table, falling back to column 0
/// when the header has no such name. Returns `None` when the document is not
/// a non-empty array whose first element is an array.
pub fn parse_wikitable(body: &str) -> Option<Vec<Identifier>> {
    let document: Value = serde_json::from_str(body).ok()?;
    let table = document.as_array()?.first()?.as_array()?;
    let (header, rows) = table.split_first()?;

    let column = header
        .as_array()
        .and_then(|cells| {
            cells
                .iter()
                .position(|cell| cell.as_str().map(str::trim) == Some(SYMBOL_HEADER))
        })
        .unwrap_or(0);

    let symbols = rows.iter().filter_map(|row| {
        row.as_array()
            .and_then(|cells| cells.get(column))
            .and_then(Value::as_str)
    });
    Some(unique_identifiers(symbols))
}
