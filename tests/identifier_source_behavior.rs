//! Behavior tests for identifier sources.
//!
//! These tests verify how each list source parses its upstream shape, and how
//! empty or failing lists become a fatal `NoIdentifiers` error after retries.

use std::sync::Arc;
use std::time::Duration;

use finrich_core::{
    collect_identifiers, CsvListSource, HttpError, HttpResponse, IdentifierSource,
    Nasdaq100Source, PipelineError, RetryConfig, RetryExecutor, WikitableSource,
};
use finrich_tests::{rendered, RecordingSleeper, ScriptedHttpClient};

fn retry(sleeper: Arc<RecordingSleeper>) -> RetryExecutor {
    RetryExecutor::with_sleeper(RetryConfig::default(), sleeper)
}

// =============================================================================
// Nasdaq-100 list
// =============================================================================

#[tokio::test]
async fn when_nasdaq_returns_rows_symbols_are_read_in_order_without_duplicates() {
    // Given: A Nasdaq list response with a repeated and a blank symbol
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(
            r#"{"data":{"data":{"rows":[
                {"symbol":"AAPL","companyName":"Apple"},
                {"symbol":"MSFT"},
                {"symbol":" "},
                {"symbol":"AAPL"},
                {"companyName":"no symbol"},
                {"symbol":"NVDA"}
            ]}}}"#,
        ))
        .into_shared();
    let source = Nasdaq100Source::with_url(http.clone(), "http://nasdaq.test/list");

    // When: The list is collected
    let identifiers = collect_identifiers(&source, &retry(Arc::new(RecordingSleeper::new())))
        .await
        .expect("list loads");

    // Then: Order is kept and the browser user agent was sent
    assert_eq!(rendered(&identifiers), vec!["AAPL", "MSFT", "NVDA"]);
    let requests = http.requests();
    assert!(requests[0]
        .headers
        .get("user-agent")
        .is_some_and(|agent| agent.contains("Mozilla")));
}

#[tokio::test]
async fn when_nasdaq_changes_its_shape_the_run_has_no_identifiers() {
    // Given: A response without data.data.rows
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(r#"{"data":{"table":[]}}"#))
        .into_shared();
    let source = Nasdaq100Source::with_url(http, "http://nasdaq.test/list");

    // When: The list is collected
    let result = collect_identifiers(&source, &retry(Arc::new(RecordingSleeper::new()))).await;

    // Then: The run fails with NoIdentifiers naming the source
    match result {
        Err(PipelineError::NoIdentifiers { source_name, .. }) => {
            assert_eq!(source_name, "nasdaq100");
        }
        other => panic!("expected NoIdentifiers, got {other:?}"),
    }
}

#[tokio::test]
async fn when_the_list_endpoint_recovers_on_the_third_attempt_the_run_proceeds() {
    // Given: Two transient failures then a good list
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::with_status(503, "busy"))
        .fail(HttpError::new("timeout"))
        .respond(HttpResponse::ok_json(
            r#"{"data":{"data":{"rows":[{"symbol":"AMZN"}]}}}"#,
        ))
        .into_shared();
    let source = Nasdaq100Source::with_url(http.clone(), "http://nasdaq.test/list");
    let sleeper = Arc::new(RecordingSleeper::new());

    // When: The list is collected
    let identifiers = collect_identifiers(&source, &retry(sleeper.clone()))
        .await
        .expect("third attempt succeeds");

    // Then: Two backoff sleeps preceded success
    assert_eq!(rendered(&identifiers), vec!["AMZN"]);
    assert_eq!(http.requests().len(), 3);
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_millis(1000), Duration::from_millis(2100)]
    );
}

#[tokio::test]
async fn when_the_list_endpoint_never_recovers_the_run_has_no_identifiers() {
    let http = ScriptedHttpClient::new().into_shared();
    let source = Nasdaq100Source::with_url(http.clone(), "http://nasdaq.test/list");

    let result = collect_identifiers(&source, &retry(Arc::new(RecordingSleeper::new()))).await;

    assert!(matches!(result, Err(PipelineError::NoIdentifiers { .. })));
    assert_eq!(http.requests().len(), 3);
}

// =============================================================================
// Wikitable list
// =============================================================================

#[tokio::test]
async fn when_the_wikitable_has_a_symbol_header_that_column_is_used() {
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(
            r#"[[
                ["Security","Symbol","GICS Sector"],
                ["3M","MMM","Industrials"],
                ["Apple Inc.","AAPL","Information Technology"]
            ]]"#,
        ))
        .into_shared();
    let source = WikitableSource::new(http, "sp500", "http://wiki.test/sp500");

    let identifiers = source.fetch_identifiers().await.expect("table parses");

    assert_eq!(rendered(&identifiers), vec!["MMM", "AAPL"]);
    assert_eq!(source.name(), "sp500");
}

#[tokio::test]
async fn when_the_wikitable_is_not_a_table_no_identifiers_are_produced() {
    let http = ScriptedHttpClient::new()
        .respond(HttpResponse::ok_json(r#"{"error":"moved"}"#))
        .into_shared();
    let source = WikitableSource::new(http, "sp500", "http://wiki.test/sp500");

    let identifiers = source.fetch_identifiers().await.expect("shape mismatch is not an error");

    assert!(identifiers.is_empty());
}

// =============================================================================
// File list
// =============================================================================

#[tokio::test]
async fn when_a_saved_symbol_table_is_read_blank_and_repeated_rows_collapse() {
    // Given: A saved tickers file
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("watchlist_tickers.csv");
    std::fs::write(&path, "Symbol\nTSLA\n\nAMD\nTSLA\n").expect("write file");

    // When: The file source is collected
    let identifiers = collect_identifiers(
        &CsvListSource::new(&path),
        &retry(Arc::new(RecordingSleeper::new())),
    )
    .await
    .expect("file loads");

    // Then: Duplicates and blanks are gone
    assert_eq!(rendered(&identifiers), vec!["TSLA", "AMD"]);
}
