//! Behavior tests for the Polygon.io adapter.
//!
//! These tests verify request shape, authentication, pagination and how
//! upstream failures map to source error kinds.

use std::sync::Arc;

use finrich_core::{
    FieldValue, HistoryWindow, HttpError, HttpResponse, Identifier, IdentifierSource,
    LowPriceSource, LowPriceThreshold, MarketDataSource, PolygonClient, SourceErrorKind,
};
use finrich_tests::{rendered, ScriptedHttpClient};
use time::macros::date;

fn client(http: Arc<ScriptedHttpClient>) -> PolygonClient {
    PolygonClient::new(http, "secret-key").with_base_url("http://polygon.test")
}

fn aapl() -> Identifier {
    Identifier::parse("AAPL").expect("valid identifier")
}

// =============================================================================
// Ticker details
// =============================================================================

#[tokio::test]
async fn when_details_are_requested_the_key_travels_as_bearer_token() {
    // Given: Polygon returns a full detail payload
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(
            r#"{"status":"OK","results":{"name":"Apple Inc.","cik":"0000320193","market_cap":3.0e12,"type":"CS","homepage_url":"https://www.apple.com"}}"#,
        ))
        .into_shared();

    // When: Details for AAPL are fetched
    let record = client(http.clone())
        .ticker_details(&aapl())
        .await
        .expect("details decode");

    // Then: The request is authenticated and the record carries the fields
    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://polygon.test/v3/reference/tickers/AAPL");
    assert_eq!(
        requests[0].headers.get("authorization").map(String::as_str),
        Some("Bearer secret-key")
    );
    assert!(!requests[0].url.contains("secret-key"));
    assert_eq!(record.get("cik"), Some(&FieldValue::Text(String::from("0000320193"))));
    assert_eq!(record.metric("market_cap"), Some(3.0e12));
    assert!(!record.contains("sic_code"));
}

#[tokio::test]
async fn when_results_are_missing_details_report_not_found() {
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(r#"{"status":"NOT_FOUND"}"#))
        .into_shared();

    let error = client(http)
        .ticker_details(&aapl())
        .await
        .expect_err("no results");

    assert_eq!(error.kind(), SourceErrorKind::NotFound);
}

#[tokio::test]
async fn when_polygon_answers_429_the_error_is_rate_limited_and_retryable() {
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::with_status(429, "slow down"))
        .into_shared();

    let error = client(http)
        .ticker_details(&aapl())
        .await
        .expect_err("rate limited");

    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    assert!(error.retryable());
}

#[tokio::test]
async fn when_the_body_is_not_json_the_error_is_malformed() {
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json("<html>maintenance</html>"))
        .into_shared();

    let error = client(http)
        .ticker_details(&aapl())
        .await
        .expect_err("malformed");

    assert_eq!(error.kind(), SourceErrorKind::MalformedResponse);
}

#[tokio::test]
async fn when_the_transport_fails_the_error_is_unavailable() {
    let http = ScriptedHttpClient::new()
        .fail(HttpError::new("connection reset"))
        .into_shared();

    let error = client(http)
        .ticker_details(&aapl())
        .await
        .expect_err("transport failure");

    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(error.message().contains("connection reset"));
}

// =============================================================================
// Daily bars
// =============================================================================

#[tokio::test]
async fn when_aggregates_paginate_every_page_is_followed_and_dates_deduplicated() {
    // Given: Two pages where the second repeats the last bar of the first
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(
            r#"{"results":[
                {"t":1740978000000,"o":1,"h":2,"l":0.5,"c":1.5,"v":10},
                {"t":1741064400000,"o":2,"h":3,"l":1.5,"c":2.5,"v":20}
            ],"next_url":"http://polygon.test/v2/aggs/page2"}"#,
        ))
        .respond(HttpResponse::ok_json(
            r#"{"results":[
                {"t":1741064400000,"o":2,"h":3,"l":1.5,"c":2.5,"v":20},
                {"t":1741150800000,"o":3,"h":4,"l":2.5,"c":3.5,"v":30,"vw":3.1,"n":12}
            ]}"#,
        ))
        .into_shared();
    let window = HistoryWindow::trailing(date!(2025 - 03 - 05), 7).expect("valid window");

    // When: Daily bars are fetched
    let bars = client(http.clone())
        .daily_bars(&aapl(), window)
        .await
        .expect("bars decode");

    // Then: Three distinct days in ascending order
    let closes = bars.iter().map(|bar| bar.close).collect::<Vec<_>>();
    assert_eq!(closes, vec![1.5, 2.5, 3.5]);
    assert_eq!(bars[2].vwap, Some(3.1));
    assert_eq!(bars[2].transactions, Some(12));
    assert_eq!(
        http.urls(),
        vec![
            String::from(
                "http://polygon.test/v2/aggs/ticker/AAPL/range/1/day/2025-02-26/2025-03-05?adjusted=true&sort=asc&limit=50000"
            ),
            String::from("http://polygon.test/v2/aggs/page2"),
        ]
    );
}

#[tokio::test]
async fn when_no_bars_exist_an_empty_series_is_returned() {
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(r#"{"resultsCount":0}"#))
        .into_shared();
    let window = HistoryWindow::trailing(date!(2025 - 03 - 05), 7).expect("valid window");

    let bars = client(http).daily_bars(&aapl(), window).await.expect("empty");

    assert!(bars.is_empty());
}

// =============================================================================
// Low-price screen
// =============================================================================

#[tokio::test]
async fn when_screening_grouped_bars_only_strictly_lower_closes_survive() {
    // Given: Grouped bars with closes straddling the threshold
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(
            r#"{"results":[
                {"T":"PENNY","t":1741064400000,"o":1,"h":1,"l":1,"c":0.9,"v":1},
                {"T":"EDGE","t":1741064400000,"o":5,"h":5,"l":5,"c":5.0,"v":1},
                {"T":"BIG","t":1741064400000,"o":50,"h":50,"l":50,"c":50.0,"v":1},
                {"T":"CHEAP","t":1741064400000,"o":4,"h":4,"l":4,"c":4.99,"v":1}
            ]}"#,
        ))
        .into_shared();
    let market = Arc::new(client(http.clone()));
    let source = LowPriceSource::new(market, date!(2025 - 03 - 04), LowPriceThreshold::under_five());

    // When: The screen runs
    let selected = source.fetch_identifiers().await.expect("screen succeeds");

    // Then: Closes equal to the threshold are excluded
    assert_eq!(rendered(&selected), vec!["PENNY", "CHEAP"]);
    assert_eq!(
        http.urls(),
        vec![String::from(
            "http://polygon.test/v2/aggs/grouped/locale/us/market/stocks/2025-03-04?adjusted=true"
        )]
    );
}
