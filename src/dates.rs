use anyhow::Context;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime,
};

const DAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses a reporting-period bound. Accepts a plain `YYYY-MM-DD` day
/// (interpreted as midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_period_bound(raw: &str) -> anyhow::Result<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt);
    }
    let day = Date::parse(raw, DAY_FORMAT).with_context(|| format!("unrecognized date {raw:?}"))?;
    Ok(day.midnight().assume_utc())
}

/// Dedup key for a reporting period: both bounds as exact timestamp strings.
/// Two entries are the same upload event iff their keys are equal.
pub fn period_key(from: OffsetDateTime, to: OffsetDateTime) -> String {
    let fmt = |t: OffsetDateTime| {
        t.format(&Rfc3339)
            .unwrap_or_else(|_| t.unix_timestamp().to_string())
    };
    format!("{}_{}", fmt(from), fmt(to))
}
