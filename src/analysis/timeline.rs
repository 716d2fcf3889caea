//! Date-driven timeline extraction

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::ScrapedContent;
use crate::models::TimelineEvent;

pub const MAX_TIMELINE_EVENTS: usize = 10;
const CONTEXT_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 200;

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september", "october",
    "november", "december",
];

/// Patterns in priority order: `Month D, YYYY`, `M/D/YYYY`, `YYYY-MM-DD`
static DATE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    let compile = |p: &str| Regex::new(p).unwrap_or_else(|e| panic!("invalid date regex {p}: {e}"));
    [
        compile(
            r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})\b",
        ),
        compile(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"),
        compile(r"\b(\d{4})-(\d{2})-(\d{2})\b"),
    ]
});

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Validated calendar date for a match of pattern `pattern_index`
fn normalize(pattern_index: usize, caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    let year = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();

    match pattern_index {
        0 => NaiveDate::from_ymd_opt(year(3)?, month_number(caps.get(1)?.as_str())?, num(2)?),
        1 => NaiveDate::from_ymd_opt(year(3)?, num(1)?, num(2)?),
        2 => NaiveDate::from_ymd_opt(year(1)?, num(2)?, num(3)?),
        _ => None,
    }
}

/// Up to `CONTEXT_CHARS` characters on each side of the byte range, trimmed and capped
fn context(text: &str, start: usize, end: usize) -> String {
    let before: String = {
        let mut chars: Vec<char> = text[..start].chars().rev().take(CONTEXT_CHARS).collect();
        chars.reverse();
        chars.into_iter().collect()
    };
    let after: String = text[end..].chars().take(CONTEXT_CHARS).collect();

    let joined = format!("{before}{}{after}", &text[start..end]);
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

/// Scan successful documents for dated events.
///
/// Dates that do not exist on the calendar are dropped, as are repeats of an
/// already-seen calendar day. Each event names the document it came from.
pub fn extract_timeline(documents: &[ScrapedContent]) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    let mut seen: HashSet<NaiveDate> = HashSet::new();

    for doc in documents.iter().filter(|d| d.is_success()) {
        for (index, pattern) in DATE_PATTERNS.iter().enumerate() {
            for caps in pattern.captures_iter(&doc.text) {
                let Some(whole) = caps.get(0) else { continue };
                let Some(date) = normalize(index, &caps) else {
                    continue;
                };
                if !seen.insert(date) {
                    continue;
                }

                events.push(TimelineEvent {
                    date: whole.as_str().to_string(),
                    normalized_date: date,
                    description: context(&doc.text, whole.start(), whole.end()),
                    source: doc.url.clone(),
                });

                if events.len() >= MAX_TIMELINE_EVENTS {
                    return events;
                }
            }
        }
    }

    events
}
