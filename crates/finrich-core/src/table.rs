//! Tabular persistence.
//!
//! | File | Columns |
//! |------|---------|
//! | tickers | `Symbol` |
//! | details | `ticker`, detail schema, then any extra fields in name order |
//! | history | `ticker,date,open,high,low,close,volume,vwap,transactions` |
//!
//! Absent values are written as [`MISSING_MARKER`] and read back as absent.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use time::Date;

use crate::{
    detail_field_kind, format_date, parse_date, unique_identifiers, EnrichmentRecord, FieldKind,
    FieldValue, HistoryRecord, Identifier, TableError, DETAIL_SCHEMA, IDENTIFIER_FIELD,
};

pub const MISSING_MARKER: &str = "NA";
pub const SYMBOL_COLUMN: &str = "Symbol";

const HISTORY_COLUMNS: [&str; 9] = [
    "ticker",
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "vwap",
    "transactions",
];

pub fn tickers_file_name(prefix: &str) -> String {
    format!("{prefix}_tickers.csv")
}

pub fn companies_file_name(prefix: &str, date: Date) -> String {
    format!("{prefix}_companies_{}.csv", format_date(date))
}

pub fn history_file_name(prefix: &str, days: u32, date: Date) -> String {
    format!("{prefix}_history_{days}days_{}.csv", format_date(date))
}

/// Grouped daily bars of the tickers admitted by a low-price screen.
pub fn low_price_stocks_file_name(date: Date) -> String {
    format!("low_price_stocks_{}.csv", format_date(date))
}

pub fn merged_file_name(date: Date) -> String {
    format!("merged_{}.csv", format_date(date))
}

pub fn write_identifiers<W: Write>(writer: W, identifiers: &[Identifier]) -> Result<(), TableError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([SYMBOL_COLUMN])?;
    for identifier in identifiers {
        csv.write_record([identifier.as_str()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Reads the `Symbol` column; blank cells are skipped and duplicates collapse
/// to their first occurrence.
pub fn read_identifiers<R: Read>(reader: R) -> Result<Vec<Identifier>, TableError> {
    let mut csv = csv::Reader::from_reader(reader);
    let column = csv
        .headers()?
        .iter()
        .position(|name| name.trim() == SYMBOL_COLUMN)
        .ok_or(TableError::MissingColumn {
            column: SYMBOL_COLUMN,
        })?;

    let mut symbols = Vec::new();
    for row in csv.records() {
        let row = row?;
        if let Some(cell) = row.get(column) {
            symbols.push(cell.to_owned());
        }
    }
    Ok(unique_identifiers(symbols))
}

pub fn write_details<W: Write>(writer: W, records: &[EnrichmentRecord]) -> Result<(), TableError> {
    let extra = records
        .iter()
        .flat_map(EnrichmentRecord::fields)
        .map(|(name, _)| name)
        .filter(|name| detail_field_kind(name).is_none())
        .collect::<BTreeSet<_>>();
    let columns = DETAIL_SCHEMA
        .iter()
        .map(|(name, _)| *name)
        .chain(extra)
        .collect::<Vec<_>>();

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(std::iter::once(IDENTIFIER_FIELD).chain(columns.iter().copied()))?;

    for record in records {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(record.ticker().to_string());
        for column in &columns {
            row.push(
                record
                    .get(column)
                    .map_or_else(|| MISSING_MARKER.to_owned(), FieldValue::to_cell),
            );
        }
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Reads a details table. Schema columns are typed by their declared kind;
/// other columns are inferred per cell.
pub fn read_details<R: Read>(reader: R) -> Result<Vec<EnrichmentRecord>, TableError> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    let ticker_column = headers
        .iter()
        .position(|name| name == IDENTIFIER_FIELD)
        .ok_or(TableError::MissingColumn {
            column: IDENTIFIER_FIELD,
        })?;

    let mut records = Vec::new();
    for (index, row) in csv.records().enumerate() {
        let row = row?;
        let line = index + 2;
        let invalid = |message: String| TableError::InvalidRow { row: line, message };

        let ticker = Identifier::parse(row.get(ticker_column).unwrap_or_default())
            .map_err(|error| invalid(error.to_string()))?;
        let mut record = EnrichmentRecord::new(ticker);

        for (column, (name, cell)) in headers.iter().zip(row.iter()).enumerate() {
            if column == ticker_column || cell == MISSING_MARKER {
                continue;
            }

            let value = match detail_field_kind(name) {
                Some(FieldKind::Text) => FieldKind::Text.parse_cell(cell).map_err(&invalid)?,
                Some(_) if cell.trim().is_empty() => continue,
                Some(kind) => kind.parse_cell(cell).map_err(&invalid)?,
                None => FieldKind::infer(cell),
            };
            record = record
                .with_field(name, value)
                .map_err(|error| invalid(error.to_string()))?;
        }
        records.push(record);
    }
    Ok(records)
}

pub fn write_history<W: Write>(writer: W, records: &[HistoryRecord]) -> Result<(), TableError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HISTORY_COLUMNS)?;

    for bar in records {
        csv.write_record([
            bar.ticker.to_string(),
            format_date(bar.date),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.vwap
                .map_or_else(|| MISSING_MARKER.to_owned(), |value| value.to_string()),
            bar.transactions
                .map_or_else(|| MISSING_MARKER.to_owned(), |value| value.to_string()),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn read_history<R: Read>(reader: R) -> Result<Vec<HistoryRecord>, TableError> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    let positions = HISTORY_COLUMNS
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|name| name == *column)
                .map(|index| (*column, index))
                .ok_or(TableError::MissingColumn { column: *column })
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    let mut records = Vec::new();
    for (index, row) in csv.records().enumerate() {
        let row = row?;
        let line = index + 2;
        let invalid = |message: String| TableError::InvalidRow { row: line, message };
        let cell = |column: &str| {
            positions
                .get(column)
                .and_then(|position| row.get(*position))
                .unwrap_or_default()
        };
        let number = |column: &str| {
            cell(column)
                .trim()
                .parse::<f64>()
                .map_err(|error| invalid(format!("{column}: {error}")))
        };
        let optional = |column: &str| {
            let value = cell(column).trim();
            (!value.is_empty() && value != MISSING_MARKER).then_some(value)
        };

        records.push(HistoryRecord {
            ticker: Identifier::parse(cell("ticker")).map_err(|error| invalid(error.to_string()))?,
            date: parse_date(cell("date")).map_err(|error| invalid(error.to_string()))?,
            open: number("open")?,
            high: number("high")?,
            low: number("low")?,
            close: number("close")?,
            volume: number("volume")?,
            vwap: optional("vwap")
                .map(str::parse::<f64>)
                .transpose()
                .map_err(|error| invalid(format!("vwap: {error}")))?,
            transactions: optional("transactions")
                .map(str::parse::<u64>)
                .transpose()
                .map_err(|error| invalid(format!("transactions: {error}")))?,
        });
    }
    Ok(records)
}

pub fn save_identifiers(path: &Path, identifiers: &[Identifier]) -> Result<(), TableError> {
    write_identifiers(File::create(path)?, identifiers)
}

pub fn load_identifiers(path: &Path) -> Result<Vec<Identifier>, TableError> {
    read_identifiers(File::open(path)?)
}

pub fn save_details(path: &Path, records: &[EnrichmentRecord]) -> Result<(), TableError> {
    write_details(File::create(path)?, records)
}

pub fn load_details(path: &Path) -> Result<Vec<EnrichmentRecord>, TableError> {
    read_details(File::open(path)?)
}

pub fn save_history(path: &Path, records: &[HistoryRecord]) -> Result<(), TableError> {
    write_history(File::create(path)?, records)
}

pub fn load_history(path: &Path) -> Result<Vec<HistoryRecord>, TableError> {
    read_history(File::open(path)?)
}
