use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use time::Date;
use tracing::debug;

use super::fetch_body;
use crate::data_source::{MarketDataSource, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{
    date_from_unix_millis, format_date, EnrichmentRecord, HistoryRecord, HistoryWindow, Identifier,
};

pub const POLYGON_BASE_URL: &str = "https://api.polygon.io";

const PROVIDER: &str = "polygon";
const MAX_PAGES: usize = 100;

/// Polygon.io REST client for ticker details and daily aggregates.
#[derive(Clone)]
pub struct PolygonClient {
    http: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    timeout_ms: u64,
}

impl PolygonClient {
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            auth: HttpAuth::BearerToken(api_key.into()),
            base_url: POLYGON_BASE_URL.to_owned(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let request = HttpRequest::get(url)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        let body = fetch_body(self.http.as_ref(), PROVIDER, request).await?;

        serde_json::from_str(&body).map_err(|error| {
            SourceError::malformed(format!("failed to parse polygon response: {error}"))
        })
    }

    fn details_url(&self, identifier: &Identifier) -> String {
        format!(
            "{}/v3/reference/tickers/{}",
            self.base_url,
            urlencoding::encode(identifier.as_str())
        )
    }

    fn daily_aggs_url(&self, identifier: &Identifier, window: HistoryWindow) -> String {
        format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}?adjusted=true&sort=asc&limit=50000",
            self.base_url,
            urlencoding::encode(identifier.as_str()),
            format_date(window.start),
            format_date(window.end)
        )
    }

    fn grouped_url(&self, date: Date) -> String {
        format!(
            "{}/v2/aggs/grouped/locale/us/market/stocks/{}?adjusted=true",
            self.base_url,
            format_date(date)
        )
    }
}

impl MarketDataSource for PolygonClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn ticker_details<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = Result<EnrichmentRecord, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let envelope: DetailsEnvelope = self.get_json(&self.details_url(identifier)).await?;
            let payload = envelope.results.ok_or_else(|| {
                SourceError::not_found(format!("polygon has no ticker details for {identifier}"))
            })?;
            decode_ticker_details(identifier, payload)
        })
    }

    fn daily_bars<'a>(
        &'a self,
        identifier: &'a Identifier,
        window: HistoryWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<HistoryRecord>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let mut url = self.daily_aggs_url(identifier, window);
            let mut seen_dates = HashSet::new();
            let mut bars = Vec::new();

            for page in 1..=MAX_PAGES {
                let envelope: AggsEnvelope = self.get_json(&url).await?;
                for agg in envelope.results {
                    let bar = agg.into_history(identifier.clone())?;
                    if seen_dates.insert(bar.date) {
                        bars.push(bar);
                    }
                }

                match envelope.next_url {
                    Some(next) if !next.is_empty() => {
                        debug!(
                            target: "finrich::polygon",
                            ticker = %identifier,
                            page,
                            "following aggregate pagination"
                        );
                        url = next;
                    }
                    _ => return Ok(bars),
                }
            }

            Err(SourceError::malformed(format!(
                "polygon pagination for {identifier} exceeded {MAX_PAGES} pages"
            )))
        })
    }

    fn grouped_daily<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<HistoryRecord>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let envelope: AggsEnvelope = self.get_json(&self.grouped_url(date)).await?;
            envelope
                .results
                .into_iter()
                .filter_map(|agg| {
                    let ticker = agg.ticker.as_deref().and_then(|raw| Identifier::parse(raw).ok())?;
                    Some(agg.into_history(ticker))
                })
                .collect()
        })
    }
}

#[derive(Debug, Deserialize)]
struct DetailsEnvelope {
    results: Option<TickerDetailsPayload>,
}

/// Ticker detail fields as returned by `/v3/reference/tickers/{ticker}`.
/// Every field is independently optional.
#[derive(Debug, Default, Deserialize)]
pub struct TickerDetailsPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub cik: Option<String>,
    pub composite_figi: Option<String>,
    pub market_cap: Option<f64>,
    pub weighted_shares_outstanding: Option<f64>,
    pub share_class_shares_outstanding: Option<f64>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub sic_code: Option<String>,
    pub sic_description: Option<String>,
    pub homepage_url: Option<String>,
    #[serde(rename = "type")]
    pub security_type: Option<String>,
}

/// Turns a detail payload into a record; fields the payload lacks stay absent.
pub fn decode_ticker_details(
    identifier: &Identifier,
    payload: TickerDetailsPayload,
) -> Result<EnrichmentRecord, SourceError> {
    EnrichmentRecord::new(identifier.clone())
        .with_optional("name", payload.name)
        .and_then(|record| record.with_optional("description", payload.description))
        .and_then(|record| record.with_optional("cik", payload.cik))
        .and_then(|record| record.with_optional("composite_figi", payload.composite_figi))
        .and_then(|record| record.with_optional("market_cap", payload.market_cap))
        .and_then(|record| {
            record.with_optional(
                "weighted_shares_outstanding",
                payload.weighted_shares_outstanding,
            )
        })
        .and_then(|record| {
            record.with_optional(
                "share_class_shares_outstanding",
                payload.share_class_shares_outstanding,
            )
        })
        .and_then(|record| record.with_optional("sic_code", payload.sic_code))
        .and_then(|record| record.with_optional("sic_description", payload.sic_description))
        .and_then(|record| record.with_optional("homepage_url", payload.homepage_url))
        .and_then(|record| record.with_optional("type", payload.security_type))
        .map_err(|error| SourceError::internal(error.to_string()))
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct AggsEnvelope {
    #[serde(default)]
    results: Vec<AggPayload>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggPayload {
    #[serde(rename = "T")]
    ticker: Option<String>,
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    vw: Option<f64>,
    n: Option<u64>,
}

impl AggPayload {
    fn into_history(self, ticker: Identifier) -> Result<HistoryRecord, SourceError> {
        let date = date_from_unix_millis(self.t).ok_or_else(|| {
            SourceError::malformed(format!("bar timestamp {} is out of range", self.t))
        })?;

        Ok(HistoryRecord {
            ticker,
            date,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
            vwap: self.vw,
            transactions: self.n,
        })
    }
}
