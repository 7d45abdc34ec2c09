//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Identifier`] | Case-sensitive instrument token |
//! | [`EnrichmentRecord`] | Optional-field attribute snapshot for one identifier |
//! | [`HistoryRecord`] | One daily bar for one identifier |
//! | [`Dataset`] | Ordered output of one enrichment run |
//! | [`HistoryWindow`] | Calendar range requested from a history provider |

mod calendar;
mod dataset;
mod identifier;
mod record;

pub use calendar::{date_from_unix_millis, format_date, parse_date, today_utc, HistoryWindow};
pub use dataset::Dataset;
pub use identifier::{unique_identifiers, Identifier};
pub use record::{
    detail_field_kind, EnrichmentRecord, FieldKind, FieldValue, HistoryRecord, DETAIL_SCHEMA,
    IDENTIFIER_FIELD,
};
