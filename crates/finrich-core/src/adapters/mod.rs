mod file;
mod nasdaq;
mod polygon;
mod wikitable;

pub use file::CsvListSource;
pub use nasdaq::{parse_nasdaq_rows, Nasdaq100Source, NASDAQ100_URL};
pub use polygon::{decode_ticker_details, PolygonClient, TickerDetailsPayload, POLYGON_BASE_URL};
pub use wikitable::{parse_wikitable, WikitableSource, SP500_WIKITABLE_URL};

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};

/// Executes a GET and returns the body of a successful response.
async fn fetch_body(
    http: &dyn HttpClient,
    provider: &str,
    request: HttpRequest,
) -> Result<String, SourceError> {
    let response = http
        .execute(request)
        .await
        .map_err(|error| SourceError::from_transport(provider, &error))?;

    if !response.is_success() {
        return Err(SourceError::from_status(provider, response.status));
    }

    Ok(response.body)
}
