use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use time::Date;
use tracing::info;

use crate::data_source::{MarketDataSource, SourceError};
use crate::retry::RetryExecutor;
use crate::source::IdentifierSource;
use crate::{format_date, HistoryRecord, Identifier, PipelineError, ValidationError};

/// Closing-price ceiling for the low-price screen. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPriceThreshold(f64);

impl LowPriceThreshold {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::InvalidThreshold {
                value: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    pub const fn under_five() -> Self {
        Self(5.0)
    }

    pub const fn under_ten() -> Self {
        Self(10.0)
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn admits(self, close: f64) -> bool {
        close < self.0
    }
}

impl Default for LowPriceThreshold {
    fn default() -> Self {
        Self::under_ten()
    }
}

impl Display for LowPriceThreshold {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LowPriceThreshold {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidThreshold {
                value: value.to_owned(),
            })?;
        Self::new(parsed)
    }
}

/// Bars whose close is strictly below `threshold`, in bar order, the first per ticker.
pub fn low_price_snapshot(
    bars: &[HistoryRecord],
    threshold: LowPriceThreshold,
) -> Vec<HistoryRecord> {
    let mut seen = HashSet::new();
    bars.iter()
        .filter(|bar| threshold.admits(bar.close))
        .filter(|bar| seen.insert(&bar.ticker))
        .cloned()
        .collect()
}

/// Identifiers whose close is strictly below `threshold`, in bar order, each once.
pub fn screen_low_price(bars: &[HistoryRecord], threshold: LowPriceThreshold) -> Vec<Identifier> {
    low_price_snapshot(bars, threshold)
        .into_iter()
        .map(|bar| bar.ticker)
        .collect()
}

/// Identifiers trading below a price ceiling on one date, from grouped daily bars.
#[derive(Clone)]
pub struct LowPriceSource {
    market: Arc<dyn MarketDataSource>,
    date: Date,
    threshold: LowPriceThreshold,
}

impl LowPriceSource {
    pub fn new(market: Arc<dyn MarketDataSource>, date: Date, threshold: LowPriceThreshold) -> Self {
        Self {
            market,
            date,
            threshold,
        }
    }

    /// Grouped bars of the admitted tickers on the screen date.
    pub async fn fetch_snapshot(&self) -> Result<Vec<HistoryRecord>, SourceError> {
        let bars = self.market.grouped_daily(self.date).await?;
        let snapshot = low_price_snapshot(&bars, self.threshold);
        info!(
            target: "finrich::screening",
            date = %format_date(self.date),
            threshold = self.threshold.value(),
            traded = bars.len(),
            selected = snapshot.len(),
            "low-price screen complete"
        );
        Ok(snapshot)
    }

    /// Runs the screen through `retry`. No admitted ticker ends the run.
    pub async fn collect_snapshot(
        &self,
        retry: &RetryExecutor,
    ) -> Result<Vec<HistoryRecord>, PipelineError> {
        let no_identifiers = |reason: String| PipelineError::NoIdentifiers {
            source_name: self.name().to_owned(),
            reason,
        };

        let snapshot = retry
            .execute(self.name(), || self.fetch_snapshot())
            .await
            .map_err(|exhausted| no_identifiers(exhausted.to_string()))?;
        if snapshot.is_empty() {
            return Err(no_identifiers(format!(
                "no ticker closed below {} on {}",
                self.threshold,
                format_date(self.date)
            )));
        }
        Ok(snapshot)
    }
}

impl IdentifierSource for LowPriceSource {
    fn name(&self) -> &str {
        "low-price"
    }

    fn fetch_identifiers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Identifier>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let snapshot = self.fetch_snapshot().await?;
            Ok(snapshot.into_iter().map(|bar| bar.ticker).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn bar(ticker: &str, close: f64) -> HistoryRecord {
        HistoryRecord {
            ticker: Identifier::parse(ticker).expect("valid identifier"),
            date: Date::from_calendar_date(2025, Month::March, 4).expect("valid date"),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
            vwap: None,
            transactions: None,
        }
    }

    #[test]
    fn close_must_be_strictly_below_threshold() {
        let bars = vec![bar("AAA", 4.99), bar("BBB", 5.0), bar("CCC", 9.5), bar("AAA", 1.0)];

        let under_five = screen_low_price(&bars, LowPriceThreshold::under_five());
        assert_eq!(under_five, vec![bars[0].ticker.clone()]);

        let under_ten = screen_low_price(&bars, LowPriceThreshold::under_ten());
        let rendered = under_ten.iter().map(Identifier::as_str).collect::<Vec<_>>();
        assert_eq!(rendered, vec!["AAA", "BBB", "CCC"]);
    }

    #[test]
    fn snapshot_keeps_the_first_admitted_bar_per_ticker() {
        let bars = vec![bar("AAA", 4.0), bar("BBB", 12.0), bar("AAA", 3.0), bar("CCC", 9.99)];

        let snapshot = low_price_snapshot(&bars, LowPriceThreshold::under_ten());

        assert_eq!(snapshot, vec![bars[0].clone(), bars[3].clone()]);
    }

    #[test]
    fn threshold_rejects_non_positive_values() {
        assert!(LowPriceThreshold::new(0.0).is_err());
        assert!(LowPriceThreshold::new(f64::NAN).is_err());
        assert!("abc".parse::<LowPriceThreshold>().is_err());
        assert_eq!(
            "7.5".parse::<LowPriceThreshold>().map(LowPriceThreshold::value),
            Ok(7.5)
        );
    }
}
