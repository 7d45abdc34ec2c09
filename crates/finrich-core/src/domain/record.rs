use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Identifier, ValidationError};

/// Column name used for the identifier in every serialized record.
pub const IDENTIFIER_FIELD: &str = "ticker";

/// Scalar attribute value carried by an [`EnrichmentRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view used for metric comparisons. Text is never coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            Self::Integer(_) | Self::Number(_) => None,
        }
    }

    /// Tabular form read back unchanged by [`FieldKind::infer`].
    ///
    /// Numbers always carry a fraction or exponent so `5.0` does not come
    /// back as the integer `5`.
    pub fn to_cell(&self) -> String {
        match self {
            Self::Number(value) => format!("{value:?}"),
            Self::Integer(_) | Self::Text(_) => self.to_string(),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Declared type of a tabular column, used when reading values back from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
}

impl FieldKind {
    pub fn parse_cell(self, cell: &str) -> Result<FieldValue, String> {
        match self {
            Self::Text => Ok(FieldValue::Text(cell.to_owned())),
            Self::Integer => cell
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|error| format!("'{cell}' is not an integer: {error}")),
            Self::Number => cell
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|error| format!("'{cell}' is not a number: {error}")),
        }
    }

    /// Typing for columns without a declared kind.
    ///
    /// A cell is numeric only when it is already in canonical form, so
    /// codes like `0042` stay text.
    pub fn infer(cell: &str) -> FieldValue {
        if let Ok(value) = cell.parse::<i64>() {
            if value.to_string() == cell {
                return FieldValue::Integer(value);
            }
        }
        match cell.parse::<f64>() {
            Ok(value) if value.is_finite() && format!("{value:?}") == cell => {
                FieldValue::Number(value)
            }
            _ => FieldValue::Text(cell.to_owned()),
        }
    }
}

/// Attribute schema of company detail records, in output column order.
///
/// CIK and SIC codes are kept as text so leading zeros survive.
pub const DETAIL_SCHEMA: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    ("description", FieldKind::Text),
    ("cik", FieldKind::Text),
    ("composite_figi", FieldKind::Text),
    ("market_cap", FieldKind::Number),
    ("weighted_shares_outstanding", FieldKind::Number),
    ("share_class_shares_outstanding", FieldKind::Number),
    ("sic_code", FieldKind::Text),
    ("sic_description", FieldKind::Text),
    ("homepage_url", FieldKind::Text),
    ("type", FieldKind::Text),
];

pub fn detail_field_kind(name: &str) -> Option<FieldKind> {
    DETAIL_SCHEMA
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, kind)| *kind)
}

/// Snapshot of optional attributes for one identifier.
///
/// An attribute that the upstream response did not carry is simply not
/// present in the record; it is never replaced by zero or an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    ticker: Identifier,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

impl EnrichmentRecord {
    pub fn new(ticker: Identifier) -> Self {
        Self {
            ticker,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyFieldName);
        }
        if name == IDENTIFIER_FIELD {
            return Err(ValidationError::ReservedField { field: name });
        }

        self.fields.insert(name, value.into());
        Ok(self)
    }

    /// Adds the field only when a value is present.
    pub fn with_optional<V>(
        self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Result<Self, ValidationError>
    where
        V: Into<FieldValue>,
    {
        match value {
            Some(value) => self.with_field(name, value),
            None => Ok(self),
        }
    }

    pub fn ticker(&self) -> &Identifier {
        &self.ticker
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Finite numeric value of `name`, if present.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(FieldValue::as_f64)
            .filter(|value| value.is_finite())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// One daily bar for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub ticker: Identifier,
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
    pub transactions: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> Identifier {
        Identifier::parse(raw).expect("valid identifier")
    }

    #[test]
    fn absent_field_round_trips_as_absent() {
        let record = EnrichmentRecord::new(id("AAPL"))
            .with_field("name", "Apple Inc.")
            .and_then(|record| record.with_optional::<String>("homepage_url", None))
            .and_then(|record| record.with_field("market_cap", 3.1e12))
            .expect("valid record");

        let json = serde_json::to_string(&record).expect("serializes");
        assert!(!json.contains("homepage_url"));

        let decoded: EnrichmentRecord = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(decoded, record);
        assert!(decoded.get("homepage_url").is_none());
        assert_eq!(decoded.metric("market_cap"), Some(3.1e12));
    }

    #[test]
    fn explicit_empty_text_is_not_absence() {
        let record = EnrichmentRecord::new(id("XYZ"))
            .with_field("description", "")
            .expect("valid record");

        assert!(record.contains("description"));
        assert_eq!(record.get("description").and_then(FieldValue::as_text), Some(""));
    }

    #[test]
    fn identifier_column_is_reserved() {
        let err = EnrichmentRecord::new(id("XYZ"))
            .with_field(IDENTIFIER_FIELD, "ABC")
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::ReservedField { .. }));
    }

    #[test]
    fn text_values_never_count_as_metrics() {
        let record = EnrichmentRecord::new(id("XYZ"))
            .with_field("market_cap", "100")
            .expect("valid record");
        assert_eq!(record.metric("market_cap"), None);
    }

    #[test]
    fn cells_read_back_as_the_value_they_were_written_from() {
        for value in [
            FieldValue::Integer(-12),
            FieldValue::Number(5.0),
            FieldValue::Number(3.1e12),
            FieldValue::Number(0.25),
            FieldValue::Text(String::from("0042")),
            FieldValue::Text(String::from("1e3")),
        ] {
            assert_eq!(FieldKind::infer(&value.to_cell()), value);
        }
    }

    #[test]
    fn cell_inference_prefers_integer_then_number() {
        assert_eq!(FieldKind::infer("42"), FieldValue::Integer(42));
        assert_eq!(FieldKind::infer("4.5"), FieldValue::Number(4.5));
        assert_eq!(FieldKind::infer("NaN"), FieldValue::Text(String::from("NaN")));
        assert_eq!(FieldKind::infer("0042"), FieldValue::Text(String::from("0042")));
        assert_eq!(FieldKind::infer(" 7"), FieldValue::Text(String::from(" 7")));
        assert_eq!(
            FieldKind::Text.parse_cell("0000320193"),
            Ok(FieldValue::Text(String::from("0000320193")))
        );
    }
}
