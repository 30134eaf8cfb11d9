use bson::Bson;
use time::OffsetDateTime;

use crate::error::{Error, Result};

/// The canonical timestamp type every encoding in §4.2 is normalized to.
pub type Timestamp = OffsetDateTime;

const FALLBACK_LAYOUT_T: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const FALLBACK_LAYOUT_SPACE: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Normalizes the universe of timestamp encodings seen on source documents
/// (§4.2): native BSON date, integer epoch seconds, float epoch seconds,
/// ISO-8601/RFC-3339, and the two fallback layouts `YYYY-MM-DDTHH:MM:SSZ`
/// and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(value: &Bson) -> Result<Timestamp> {
    match value {
        Bson::DateTime(dt) => Ok(dt.to_time_0_3()),
        Bson::Int32(secs) => OffsetDateTime::from_unix_timestamp(*secs as i64)
            .map_err(|_| Error::UnsupportedTimestamp(format!("int32 {secs}"))),
        Bson::Int64(secs) => OffsetDateTime::from_unix_timestamp(*secs)
            .map_err(|_| Error::UnsupportedTimestamp(format!("int64 {secs}"))),
        Bson::Double(secs) => {
            let nanos = (*secs * 1_000_000_000.0).round() as i128;
            OffsetDateTime::from_unix_timestamp_nanos(nanos)
                .map_err(|_| Error::UnsupportedTimestamp(format!("float {secs}")))
        }
        Bson::String(s) => parse_timestamp_str(s),
        other => Err(Error::UnsupportedTimestamp(format!("{other:?}"))),
    }
}

fn parse_timestamp_str(s: &str) -> Result<Timestamp> {
    if let Ok(dt) = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339) {
        return Ok(dt);
    }
    if let Ok(dt) = time::PrimitiveDateTime::parse(s, FALLBACK_LAYOUT_T) {
        return Ok(dt.assume_utc());
    }
    if let Ok(dt) = time::PrimitiveDateTime::parse(s, FALLBACK_LAYOUT_SPACE) {
        return Ok(dt.assume_utc());
    }
    Err(Error::UnsupportedTimestamp(s.to_string()))
}

/// Extracts the creation timestamp embedded in a MongoDB ObjectId — used
/// when `timestamp_field == "_id"` (§3, §4.5).
pub fn timestamp_from_object_id(oid: &bson::oid::ObjectId) -> Timestamp {
    oid.timestamp().to_time_0_3()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_int32_epoch_seconds() {
        let ts = parse_timestamp(&Bson::Int32(0)).unwrap();
        assert_eq!(ts, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn parses_int64_epoch_seconds() {
        let ts = parse_timestamp(&Bson::Int64(1_700_000_000)).unwrap();
        assert_eq!(ts.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_float_epoch_seconds() {
        let ts = parse_timestamp(&Bson::Double(1_700_000_000.5)).unwrap();
        assert_eq!(ts.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_rfc3339_string() {
        let ts = parse_timestamp(&Bson::String("2024-01-02T03:04:05Z".to_string())).unwrap();
        assert_eq!(ts.unix_timestamp(), 1_704_165_845);
    }

    #[test]
    fn parses_fallback_space_layout() {
        let ts = parse_timestamp(&Bson::String("2024-01-02 03:04:05".to_string())).unwrap();
        assert_eq!(ts.unix_timestamp(), 1_704_165_845);
    }

    #[test]
    fn rejects_unsupported_encoding() {
        let err = parse_timestamp(&Bson::String("not a date".to_string())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTimestamp(_)));
    }

    #[test]
    fn rejects_unsupported_bson_type() {
        let err = parse_timestamp(&Bson::Boolean(true)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTimestamp(_)));
    }
}
