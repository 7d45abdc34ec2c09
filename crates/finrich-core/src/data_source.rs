//! Provider contract and the structured error shared by every upstream call.
//!
//! | Operation | Input | Output |
//! |-----------|-------|--------|
//! | [`MarketDataSource::ticker_details`] | one identifier | [`EnrichmentRecord`] |
//! | [`MarketDataSource::daily_bars`] | identifier + [`HistoryWindow`] | daily [`HistoryRecord`]s |
//! | [`MarketDataSource::grouped_daily`] | calendar date | one [`HistoryRecord`] per traded identifier |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::http_client::HttpError;
use crate::{EnrichmentRecord, HistoryRecord, HistoryWindow, Identifier};

/// Upstream error classification.
///
/// `Unavailable` and `RateLimited` are transient. The retry executor retries
/// every kind regardless; the classification is for reporting and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    MalformedResponse,
    NotFound,
    InvalidRequest,
    Internal,
}

/// Structured error returned by sources and adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a non-success HTTP status to an error kind.
    pub fn from_status(provider: &str, status: u16) -> Self {
        let message = format!("{provider} upstream returned status {status}");
        match status {
            429 => Self::rate_limited(message),
            408 | 500..=599 => Self::unavailable(message),
            404 => Self::not_found(message),
            _ => Self::invalid_request(message),
        }
    }

    pub fn from_transport(provider: &str, error: &HttpError) -> Self {
        let message = format!("{provider} transport error: {}", error.message());
        if error.retryable() {
            Self::unavailable(message)
        } else {
            Self::internal(message)
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::MalformedResponse => "source.malformed_response",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Market data provider contract.
///
/// Implementations hold their own client and credentials; nothing is ambient.
/// Every method performs idempotent reads, so callers may repeat them freely.
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches the current company detail snapshot for one identifier.
    fn ticker_details<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = Result<EnrichmentRecord, SourceError>> + Send + 'a>>;

    /// Fetches daily bars for one identifier, following provider pagination.
    fn daily_bars<'a>(
        &'a self,
        identifier: &'a Identifier,
        window: HistoryWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<HistoryRecord>, SourceError>> + Send + 'a>>;

    /// Fetches one bar per traded identifier for a single date.
    fn grouped_daily<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<HistoryRecord>, SourceError>> + Send + 'a>>;
}
