//! Compiles a human search string into [`SearchCriteria`].
//!
//! Recognised field tokens are `from:(..)`, `to:(..)`, `subject:(..)`,
//! `has:(..)` and `date:(..)`. Text outside the tokens is matched against
//! the message body. Without any token, the whole input is matched as
//! text anywhere in the message.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveTime};
use regex::Regex;

use super::SearchCriteria;

const DATE_INPUT_FORMAT: &str = "%Y.%m.%d";

#[allow(clippy::expect_used)] // constant pattern
static FIELD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(from|to|subject|date|has):\(([^)]+)\)").expect("valid field token pattern")
});

/// A `field:(value)` token found in the query.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldToken<'a> {
    field: &'a str,
    value: &'a str,
}

/// Builder for search criteria.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchQueryBuilder {
    timezone_offset_secs: i64,
}

impl SearchQueryBuilder {
    /// Creates a builder for UTC callers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timezone_offset_secs: 0,
        }
    }

    /// Sets the caller's offset from UTC, applied to `date:` bounds.
    #[must_use]
    pub const fn timezone_offset(mut self, secs: i64) -> Self {
        self.timezone_offset_secs = secs;
        self
    }

    /// Compiles `query`.
    ///
    /// An empty query yields [`SearchCriteria::All`].
    #[must_use]
    pub fn build(&self, query: &str) -> SearchCriteria {
        let query = collapse_whitespace(query);
        if query.is_empty() {
            return SearchCriteria::All;
        }

        let (tokens, residual) = tokenize(&query);
        if tokens.is_empty() {
            return SearchCriteria::Or(vec![SearchCriteria::Text(query)]);
        }

        let mut criteria = Vec::new();
        for token in &tokens {
            self.push_field(&mut criteria, token);
        }

        let residual = collapse_whitespace(&residual);
        if !residual.is_empty() {
            criteria.push(SearchCriteria::Body(residual));
        }

        SearchCriteria::And(criteria)
    }

    fn push_field(&self, criteria: &mut Vec<SearchCriteria>, token: &FieldToken<'_>) {
        let value = token.value.to_string();
        match token.field {
            "from" => criteria.push(SearchCriteria::From(value)),
            "to" => {
                criteria.push(SearchCriteria::To(value.clone()));
                criteria.push(SearchCriteria::Cc(value));
            }
            "subject" => criteria.push(SearchCriteria::Subject(value)),
            "has" => {
                // Only attachments map to a criterion; other values are ignored.
                if token.value.contains("attachments") {
                    criteria.push(SearchCriteria::Header(
                        "CONTENT-TYPE".into(),
                        "MULTIPART/MIXED".into(),
                    ));
                }
            }
            "date" => self.push_date_range(criteria, token.value),
            _ => {}
        }
    }

    fn push_date_range(&self, criteria: &mut Vec<SearchCriteria>, value: &str) {
        let (since, before) = match value.split_once('/') {
            Some((from, to)) if !to.contains('/') => (
                self.search_day(from),
                self.search_day(to).and_then(|d| d.succ_opt()),
            ),
            Some(_) => (None, None),
            None => {
                let day = self.search_day(value);
                (day, day.and_then(|d| d.succ_opt()))
            }
        };

        if let Some(day) = since {
            criteria.push(SearchCriteria::Since(day));
        }
        if let Some(day) = before {
            criteria.push(SearchCriteria::Before(day));
        }
    }

    /// Midnight UTC of a `YYYY.MM.DD` day, shifted by the caller's offset.
    fn search_day(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let day = NaiveDate::parse_from_str(text, DATE_INPUT_FORMAT).ok()?;
        let instant = day.and_time(NaiveTime::MIN) - Duration::seconds(self.timezone_offset_secs);
        Some(instant.date())
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds every `field:(value)` token, leftmost first, and returns them
/// together with the query text that remains once they are cut out.
fn tokenize(query: &str) -> (Vec<FieldToken<'_>>, String) {
    let tokens = FIELD_TOKEN
        .captures_iter(query)
        .filter_map(|caps| {
            Some(FieldToken {
                field: caps.get(1)?.as_str(),
                value: caps.get(2)?.as_str(),
            })
        })
        .collect();
    let residual = FIELD_TOKEN.replace_all(query, "").into_owned();
    (tokens, residual)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn from_token_with_body_text() {
        let criteria = SearchQueryBuilder::new().build("from:(alice) hello world");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::From("alice".into()),
                SearchCriteria::Body("hello world".into()),
            ])
        );
        assert_eq!(criteria.to_string(), "FROM alice BODY \"hello world\"");
    }

    #[test]
    fn plain_text_is_single_or_text() {
        let criteria = SearchQueryBuilder::new().build("  quarterly   report ");
        assert_eq!(
            criteria,
            SearchCriteria::Or(vec![SearchCriteria::Text("quarterly report".into())])
        );
    }

    #[test]
    fn empty_query_matches_all() {
        assert_eq!(SearchQueryBuilder::new().build("   "), SearchCriteria::All);
    }

    #[test]
    fn to_adds_to_and_cc() {
        let criteria = SearchQueryBuilder::new().build("to:(bob@example.com)");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::To("bob@example.com".into()),
                SearchCriteria::Cc("bob@example.com".into()),
            ])
        );
    }

    #[test]
    fn has_attachments_matches_multipart_mixed() {
        let criteria = SearchQueryBuilder::new().build("has:(attachments) subject:(invoice)");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::Header("CONTENT-TYPE".into(), "MULTIPART/MIXED".into()),
                SearchCriteria::Subject("invoice".into()),
            ])
        );
    }

    #[test]
    fn has_flagged_is_ignored() {
        let criteria = SearchQueryBuilder::new().build("has:(flagged)");
        assert_eq!(criteria, SearchCriteria::And(Vec::new()));
        assert_eq!(criteria.to_string(), "ALL");
    }

    #[test]
    fn date_range_is_since_and_before_next_day() {
        let criteria = SearchQueryBuilder::new().build("date:(2024.01.10/2024.01.20)");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::Since(day(2024, 1, 10)),
                SearchCriteria::Before(day(2024, 1, 21)),
            ])
        );
        assert_eq!(criteria.to_string(), "SINCE 10-Jan-2024 BEFORE 21-Jan-2024");
    }

    #[test]
    fn single_date_is_one_day() {
        let criteria = SearchQueryBuilder::new().build("date:(2024.02.29)");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::Since(day(2024, 2, 29)),
                SearchCriteria::Before(day(2024, 3, 1)),
            ])
        );
    }

    #[test]
    fn open_ended_ranges() {
        let builder = SearchQueryBuilder::new();
        assert_eq!(
            builder.build("date:(/2024.01.20)"),
            SearchCriteria::And(vec![SearchCriteria::Before(day(2024, 1, 21))])
        );
        assert_eq!(
            builder.build("date:(2024.01.10/)"),
            SearchCriteria::And(vec![SearchCriteria::Since(day(2024, 1, 10))])
        );
    }

    #[test]
    fn positive_offset_shifts_to_previous_day() {
        let criteria = SearchQueryBuilder::new()
            .timezone_offset(3600)
            .build("date:(2024.01.10)");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::Since(day(2024, 1, 9)),
                SearchCriteria::Before(day(2024, 1, 10)),
            ])
        );
    }

    #[test]
    fn invalid_date_is_skipped() {
        let criteria = SearchQueryBuilder::new().build("date:(yesterday) hello");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![SearchCriteria::Body("hello".into())])
        );
    }

    #[test]
    fn unknown_and_empty_tokens_stay_in_text() {
        let criteria = SearchQueryBuilder::new().build("cc:(bob) from:() hi");
        assert_eq!(
            criteria,
            SearchCriteria::Or(vec![SearchCriteria::Text("cc:(bob) from:() hi".into())])
        );
    }

    #[test]
    fn tokens_anywhere_in_text() {
        let criteria = SearchQueryBuilder::new().build("meeting subject:(Q3 plan) notes");
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::Subject("Q3 plan".into()),
                SearchCriteria::Body("meeting notes".into()),
            ])
        );
    }

    #[test]
    fn unclosed_token_stays_in_text() {
        let (tokens, residual) = tokenize("subject:(draft notes");
        assert!(tokens.is_empty());
        assert_eq!(residual, "subject:(draft notes");

        let (tokens, residual) = tokenize("from:(a)to:(b) rest");
        assert_eq!(
            tokens,
            vec![
                FieldToken { field: "from", value: "a" },
                FieldToken { field: "to", value: "b" },
            ]
        );
        assert_eq!(residual, " rest");
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let criteria = SearchQueryBuilder::new().build("from:(José) café");
        assert!(criteria.has_non_ascii());
        assert_eq!(
            criteria,
            SearchCriteria::And(vec![
                SearchCriteria::From("José".into()),
                SearchCriteria::Body("café".into()),
            ])
        );
    }
}
