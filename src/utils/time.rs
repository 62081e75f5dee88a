use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// A trailing `Z` is normalized to `+00:00` before parsing.  Timestamps that
/// carry an offset are converted to UTC; timestamps without one are assumed
/// to already be UTC.  Empty or unparseable input yields `None`.
pub fn parse_timestamp(input: &str) -> Option<OffsetDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let normalized = match input.strip_suffix('Z') {
        Some(prefix) => format!("{prefix}+00:00"),
        None => input.to_string(),
    };
    if let Ok(dt) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Some(dt.to_offset(UtcOffset::UTC));
    }
    if let Ok(dt) = OffsetDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Some(dt.to_offset(UtcOffset::UTC));
    }
    match PrimitiveDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        Ok(dt) => Some(dt.assume_utc()),
        Err(err) => {
            tracing::warn!(timestamp = input, error = %err, "could not parse timestamp");
            None
        }
    }
}

/// Deserialize an optional ISO-8601 string, mapping bad values to `None`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.as_deref().and_then(parse_timestamp))
}

/// Serialize an optional OffsetDateTime into an RFC 3339 formatted string.
pub fn serialize<S>(datetime: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match datetime {
        Some(datetime) => {
            let s = datetime
                .format(&Rfc3339)
                .map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&s)
        }
        None => serializer.serialize_none(),
    }
}
