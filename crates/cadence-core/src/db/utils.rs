//! Row-mapping helpers shared by the query modules.

use jiff::Timestamp;
use rusqlite::types::Type;

/// Parses a timestamp column stored as an RFC 3339 string.
pub(super) fn parse_timestamp(index: usize, value: String) -> rusqlite::Result<Timestamp> {
    value.parse::<Timestamp>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })
}

/// Parses an optional timestamp column.
pub(super) fn parse_timestamp_opt(
    index: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<Timestamp>> {
    value.map(|v| parse_timestamp(index, v)).transpose()
}

/// Parses an enum column via its `FromStr` wire string.
pub(super) fn parse_enum<T>(index: usize, value: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// Parses a JSON column.
pub(super) fn parse_json<T: serde::de::DeserializeOwned>(
    index: usize,
    value: String,
) -> rusqlite::Result<T> {
    serde_json::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })
}
