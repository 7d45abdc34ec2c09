use finrich_core::{format_date, table, EnrichmentPolicy, Identifier, LowPriceSource};

use super::RunContext;
use crate::cli::ScreenArgs;
use crate::error::CliError;

pub async fn run(args: &ScreenArgs, context: &RunContext) -> Result<(), CliError> {
    let source = LowPriceSource::new(context.market()?, context.date(), args.max_close);
    let engine = context.engine(EnrichmentPolicy::details_default())?;
    let snapshot = source.collect_snapshot(engine.retry()).await?;
    let identifiers = snapshot
        .iter()
        .map(|bar| bar.ticker.clone())
        .collect::<Vec<Identifier>>();

    for identifier in &identifiers {
        println!("{identifier}");
    }

    let prefix = format!("low_price_{}", format_date(context.date()));
    let path = context.output_path(&table::tickers_file_name(&prefix))?;
    table::save_identifiers(&path, &identifiers)?;

    let bars_path = context.output_path(&table::low_price_stocks_file_name(context.date()))?;
    table::save_history(&bars_path, &snapshot)?;

    println!(
        "{} identifiers closed below {} on {}; saved to {} with bars in {}",
        identifiers.len(),
        args.max_close,
        format_date(context.date()),
        path.display(),
        bars_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use finrich_core::LowPriceThreshold;

    use super::*;
    use crate::commands::test_support::{context, RoutedHttpClient};

    const GROUPED: &str = r#"{"results":[
        {"T":"PENNY","t":1741064400000,"o":1,"h":1.1,"l":0.8,"c":0.9,"v":1200,"vw":0.95,"n":40},
        {"T":"BIG","t":1741064400000,"o":50,"h":51,"l":49,"c":50.0,"v":900},
        {"T":"CHEAP","t":1741064400000,"o":4,"h":4.2,"l":3.9,"c":4.99,"v":300}
    ]}"#;

    #[tokio::test]
    async fn saves_identifiers_and_the_bars_they_were_screened_on() {
        let dir = tempfile::tempdir().expect("tempdir");
        let http = Arc::new(RoutedHttpClient::new().route("/v2/aggs/grouped/", GROUPED));
        let args = ScreenArgs {
            max_close: LowPriceThreshold::under_five(),
        };

        run(&args, &context(dir.path(), http.clone()))
            .await
            .expect("screen succeeds");

        let tickers = table::load_identifiers(&dir.path().join("low_price_2025-03-04_tickers.csv"))
            .expect("tickers saved");
        assert_eq!(
            tickers.iter().map(Identifier::as_str).collect::<Vec<_>>(),
            vec!["PENNY", "CHEAP"]
        );

        let bars = table::load_history(&dir.path().join("low_price_stocks_2025-03-04.csv"))
            .expect("bars saved");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 0.9);
        assert_eq!(bars[0].vwap, Some(0.95));
        assert_eq!(bars[1].ticker.as_str(), "CHEAP");
        assert_eq!(http.urls().len(), 1);
    }

    #[tokio::test]
    async fn empty_screen_is_a_run_level_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let http = Arc::new(RoutedHttpClient::new().route("/v2/aggs/grouped/", GROUPED));
        let args = ScreenArgs {
            max_close: LowPriceThreshold::new(0.5).expect("valid threshold"),
        };

        let error = run(&args, &context(dir.path(), http))
            .await
            .expect_err("nothing closed below 0.5");

        assert_eq!(error.exit_code(), 4);
        assert!(!dir.path().join("low_price_stocks_2025-03-04.csv").exists());
    }
}
