use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::data_source::{MarketDataSource, SourceError};
use crate::enrichment::Fetch;
use crate::{EnrichmentRecord, HistoryRecord, HistoryWindow, Identifier};

/// One detail snapshot per identifier.
#[derive(Clone)]
pub struct DetailsFetcher {
    source: Arc<dyn MarketDataSource>,
}

impl DetailsFetcher {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }
}

impl Fetch for DetailsFetcher {
    type Output = EnrichmentRecord;

    fn fetch<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = Result<EnrichmentRecord, SourceError>> + Send + 'a>> {
        self.source.ticker_details(identifier)
    }
}

/// Daily bars over a fixed window, one series per identifier.
#[derive(Clone)]
pub struct HistoryFetcher {
    source: Arc<dyn MarketDataSource>,
    window: HistoryWindow,
}

impl HistoryFetcher {
    pub fn new(source: Arc<dyn MarketDataSource>, window: HistoryWindow) -> Self {
        Self { source, window }
    }

    pub fn window(&self) -> HistoryWindow {
        self.window
    }
}

impl Fetch for HistoryFetcher {
    type Output = Vec<HistoryRecord>;

    fn fetch<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<HistoryRecord>, SourceError>> + Send + 'a>> {
        self.source.daily_bars(identifier, self.window)
    }
}
