//! 12-hour clock strings, trip durations, and peso formatting.
//!
//! Trip rows store wall-clock times as "H:MM AM/PM" strings, the format the
//! field devices display. Parsing is lenient: a malformed clock string degrades
//! to zero minutes instead of erroring, so one bad record cannot block a report.

use chrono::{NaiveTime, Timelike};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Format minutes-since-midnight as "H:MM AM/PM".
///
/// Hour 0 renders as 12 AM, hour 12 as 12 PM; no leading zero on the hour.
pub fn format_clock(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hour24 = minutes / 60;
    let minute = minutes % 60;
    let meridiem = if hour24 < 12 { "AM" } else { "PM" };
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, minute, meridiem)
}

/// Clock string for a wall-clock time.
pub fn clock_from_time(time: NaiveTime) -> String {
    format_clock(time.hour() * 60 + time.minute())
}

/// Parse "H:MM AM/PM" into minutes since midnight.
pub fn parse_clock(clock: &str) -> Option<u32> {
    let mut parts = clock.split_whitespace();
    let hm = parts.next()?;
    let meridiem = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (hour_str, minute_str) = hm.split_once(':')?;
    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }

    let hour24 = match meridiem.to_ascii_uppercase().as_str() {
        "AM" => hour % 12,
        "PM" => hour % 12 + 12,
        _ => return None,
    };
    Some(hour24 * 60 + minute)
}

/// Advance a clock string by one minute, wrapping on the 12-hour boundary
/// (12:59 PM becomes 1:00 PM, not 13:00 or 0:00).
///
/// Used when a trip closes within the same minute it started, so the stored
/// end time always differs from the start. Unparsable input is returned as-is.
pub fn bump_one_minute(clock: &str) -> String {
    match parse_clock(clock) {
        Some(minutes) => format_clock((minutes + 1) % MINUTES_PER_DAY),
        None => clock.to_string(),
    }
}

/// Minutes elapsed from `start` to `end`, both "H:MM AM/PM" strings.
///
/// Wraps across midnight (end earlier than start means an overnight trip).
/// Either side failing to parse yields 0.
pub fn duration_minutes(start: &str, end: &str) -> u32 {
    match (parse_clock(start), parse_clock(end)) {
        (Some(s), Some(e)) => {
            let diff = e as i32 - s as i32;
            if diff < 0 {
                (diff + MINUTES_PER_DAY as i32) as u32
            } else {
                diff as u32
            }
        }
        _ => 0,
    }
}

/// Format a minute count as "Xh YYm".
pub fn format_duration(minutes: u32) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Format a peso amount with thousands separators: "₱1,234.56".
///
/// Rounded to centavos; whole amounts drop the fraction ("₱620", "₱0").
pub fn format_peso(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if frac == 0 {
        format!("{}₱{}", sign, grouped)
    } else {
        format!("{}₱{}.{:02}", sign, grouped, frac)
    }
}
