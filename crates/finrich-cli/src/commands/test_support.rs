//! Fakes shared by command tests.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use finrich_core::config::{NASDAQ100_URL_VAR, POLYGON_BASE_URL_VAR};
use finrich_core::{Config, HttpClient, HttpError, HttpRequest, HttpResponse, API_KEY_VAR};
use time::macros::date;
use tokio_util::sync::CancellationToken;

use super::{PolicyOverrides, RunContext};

pub const POLYGON_TEST_URL: &str = "http://polygon.test";
pub const NASDAQ_TEST_URL: &str = "http://nasdaq.test/api/quote/list-type/nasdaq100";

/// HTTP client answering by URL fragment. Unrouted URLs get a 404.
#[derive(Default)]
pub struct RoutedHttpClient {
    routes: Vec<(String, HttpResponse)>,
    urls: Mutex<Vec<String>>,
}

impl RoutedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, body: &str) -> Self {
        self.routes
            .push((fragment.to_owned(), HttpResponse::ok_json(body)));
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| HttpResponse::with_status(404, "{}"));
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(request.url);
        }
        Box::pin(async move { Ok(response) })
    }
}

/// Context for 2025-03-04 with one attempt per read and no pauses.
pub fn context(output_dir: &Path, http: Arc<dyn HttpClient>) -> RunContext {
    let config = Config::from_lookup(|name| match name {
        API_KEY_VAR => Some(String::from("test-key")),
        POLYGON_BASE_URL_VAR => Some(String::from(POLYGON_TEST_URL)),
        NASDAQ100_URL_VAR => Some(String::from(NASDAQ_TEST_URL)),
        _ => None,
    })
    .expect("valid test configuration");

    RunContext {
        config: Some(config),
        http,
        overrides: PolicyOverrides {
            batch_size: None,
            pause: Some(Duration::ZERO),
            max_attempts: Some(1),
            workers: None,
        },
        output_dir: output_dir.to_path_buf(),
        date: date!(2025 - 03 - 04),
        cancel: CancellationToken::new(),
    }
}
