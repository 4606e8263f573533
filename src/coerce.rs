use crate::document::{Timestamp, TypedDocument, TypedValue};
use crate::source::RawRow;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

/// Field name endings that switch on date parsing. Renaming a column so it
/// gains or loses one of these changes how its values are typed.
pub const DATE_FIELD_SUFFIXES: [&str; 3] = ["_date", "_at", "purchased_date"];

lazy_static::lazy_static! {
    static ref CALENDAR_DATE: Regex =
        Regex::new(r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{1,2})-(?P<day>[0-9]{1,2})$")
            .expect("we know the regex is fine");

    // Hour, then optional minute, second and fraction, then an optional offset.
    static ref ISO_DATETIME: Regex = Regex::new(concat!(
        r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{2})-(?P<day>[0-9]{2})",
        r"T(?P<hour>[0-9]{2})",
        r"(?::(?P<minute>[0-9]{2})(?::(?P<second>[0-9]{2})(?:\.(?P<fraction>[0-9]+))?)?)?",
        r"(?:(?P<sign>[+-])(?P<offset_hour>[0-9]{2})(?::?(?P<offset_minute>[0-9]{2}))?)?$",
    ))
    .expect("we know the regex is fine");

    static ref DECIMAL_DIGIT: Regex = Regex::new(r"^\p{Nd}$").expect("we know the regex is fine");
}

pub fn is_date_field(field: &str) -> bool {
    DATE_FIELD_SUFFIXES
        .iter()
        .any(|suffix| field.ends_with(suffix))
}

/// Types a single CSV cell. The first matching rule wins: empty, boolean,
/// date field, numeric, then plain string. Never fails; a value that looks
/// typed but does not parse is kept as a string.
pub fn coerce_value(field: &str, value: &str) -> TypedValue {
    if value.is_empty() {
        return TypedValue::Null;
    }

    if let Some(boolean) = parse_boolean(value) {
        return TypedValue::Boolean(boolean);
    }

    if is_date_field(field) {
        return match parse_timestamp(value) {
            Some(timestamp) => TypedValue::Timestamp(timestamp),
            None => TypedValue::String(value.to_owned()),
        };
    }

    if looks_numeric(value) {
        return parse_number(value).unwrap_or_else(|| TypedValue::String(value.to_owned()));
    }

    TypedValue::String(value.to_owned())
}

pub fn coerce_row(row: &RawRow) -> TypedDocument {
    let mut document = TypedDocument::with_capacity(row.len());
    for (field, value) in row {
        document.insert(field.as_str(), coerce_value(field, value));
    }
    document
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<Timestamp> {
    if value.contains('T') {
        parse_iso_datetime(&value.replace('Z', "+00:00"))
    } else if value.matches('-').count() == 2 {
        parse_date(value)
    } else {
        None
    }
}

fn capture_number(captures: &Captures, name: &str) -> Option<u32> {
    match captures.name(name) {
        Some(capture) => capture.as_str().parse().ok(),
        None => Some(0),
    }
}

fn parse_iso_datetime(value: &str) -> Option<Timestamp> {
    let captures = ISO_DATETIME.captures(value)?;

    let date = NaiveDate::from_ymd_opt(
        capture_number(&captures, "year")? as i32,
        capture_number(&captures, "month")?,
        capture_number(&captures, "day")?,
    )?;

    // Fractions past microseconds are truncated.
    let micro: u32 = match captures.name("fraction") {
        Some(fraction) => {
            let digits: String = fraction.as_str().chars().take(6).collect();
            format!("{digits:0<6}").parse().ok()?
        }
        None => 0,
    };
    let time = NaiveTime::from_hms_micro_opt(
        capture_number(&captures, "hour")?,
        capture_number(&captures, "minute")?,
        capture_number(&captures, "second")?,
        micro,
    )?;
    let datetime = NaiveDateTime::new(date, time);

    let Some(sign) = captures.name("sign") else {
        return Some(Timestamp::Naive(datetime));
    };
    let offset_minute = capture_number(&captures, "offset_minute")?;
    if offset_minute > 59 {
        return None;
    }
    let seconds = (capture_number(&captures, "offset_hour")? * 3600 + offset_minute * 60) as i32;
    let offset = match sign.as_str() {
        "-" => FixedOffset::west_opt(seconds)?,
        _ => FixedOffset::east_opt(seconds)?,
    };
    datetime
        .and_local_timezone(offset)
        .single()
        .map(Timestamp::Zoned)
}

fn parse_date(value: &str) -> Option<Timestamp> {
    let captures = CALENDAR_DATE.captures(value)?;
    let date = NaiveDate::from_ymd_opt(
        capture_number(&captures, "year")? as i32,
        capture_number(&captures, "month")?,
        capture_number(&captures, "day")?,
    )?;
    Some(Timestamp::Naive(date.and_hms_opt(0, 0, 0)?))
}

/// Value of a Unicode decimal digit (general category Nd), in any script.
fn decimal_digit_value(c: char) -> Option<u32> {
    if c.is_ascii() {
        return c.to_digit(10);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    // Nd digits are encoded in contiguous runs of ten, zero first.
    let mut first = c as u32;
    while let Some(previous) = first.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(previous) {
            break;
        }
        first -= 1;
    }
    Some((c as u32 - first) % 10)
}

fn is_decimal_digit(c: char) -> bool {
    let mut buffer = [0; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buffer))
}

// Deliberately loose: "1.2.3" and "12-3" pass here and are rejected by the parse.
fn looks_numeric(value: &str) -> bool {
    let mut digits = value
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '+'))
        .peekable();
    digits.peek().is_some() && digits.all(|c| decimal_digit_value(c).is_some())
}

fn parse_number(value: &str) -> Option<TypedValue> {
    let ascii: String = value
        .chars()
        .map(|c| match decimal_digit_value(c) {
            Some(digit) => char::from_digit(digit, 10).unwrap_or(c),
            None => c,
        })
        .collect();

    if ascii.contains('.') {
        ascii.parse::<f64>().ok().map(TypedValue::Float)
    } else {
        ascii.parse::<i64>().ok().map(TypedValue::Integer)
    }
}
