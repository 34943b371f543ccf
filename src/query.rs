/// Time-series query descriptor and the clock used to default its date range.
///
/// A `TimeSeriesQuery` is validated once at construction and is immutable
/// afterwards. The default window (trailing 365 days ending today) is
/// computed from an injected `Clock` at build time, never at module load.

use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;

use crate::model::QueryError;

/// Length of the default date window, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 365;

/// Facet name to accepted values, e.g. `{"respondent": ["CISO"]}`.
pub type Facets = BTreeMap<String, Vec<String>>;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "today" for default date ranges.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock time in the process's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Query window
// ---------------------------------------------------------------------------

/// Optional knobs shared by every facade query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Zero-based page to start from.
    pub page_index: u64,
}

// ---------------------------------------------------------------------------
// TimeSeriesQuery
// ---------------------------------------------------------------------------

/// Immutable request descriptor for one paginated upstream fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesQuery {
    url_segment: String,
    facets: Facets,
    value_column_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    page_index: u64,
}

impl TimeSeriesQuery {
    pub fn builder(url_segment: &str, value_column_name: &str) -> TimeSeriesQueryBuilder {
        TimeSeriesQueryBuilder {
            url_segment: url_segment.to_string(),
            value_column_name: value_column_name.to_string(),
            facets: Facets::new(),
            window: QueryWindow::default(),
        }
    }

    pub fn url_segment(&self) -> &str {
        &self.url_segment
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn value_column_name(&self) -> &str {
        &self.value_column_name
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn page_index(&self) -> u64 {
        self.page_index
    }
}

/// Collects facets and window options, then validates them in `build`.
#[derive(Debug, Clone)]
pub struct TimeSeriesQueryBuilder {
    url_segment: String,
    value_column_name: String,
    facets: Facets,
    window: QueryWindow,
}

impl TimeSeriesQueryBuilder {
    /// Adds (or replaces) one facet.
    pub fn facet<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facets
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn window(mut self, window: &QueryWindow) -> Self {
        self.window = window.clone();
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.window.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.window.end_date = Some(date);
        self
    }

    pub fn page_index(mut self, page_index: u64) -> Self {
        self.window.page_index = page_index;
        self
    }

    /// Validates the query, filling missing dates from `clock`.
    ///
    /// # Errors
    /// - `QueryError::EmptyUrlSegment` / `EmptyValueColumn` for blank names.
    /// - `QueryError::NoFacets` when no facet was supplied.
    /// - `QueryError::EmptyFacet` when a facet has no non-blank values.
    /// - `QueryError::InvertedRange` when start is after end.
    pub fn build(self, clock: &dyn Clock) -> Result<TimeSeriesQuery, QueryError> {
        let url_segment = self.url_segment.trim().trim_matches('/').to_string();
        if url_segment.is_empty() {
            return Err(QueryError::EmptyUrlSegment);
        }
        if self.value_column_name.trim().is_empty() {
            return Err(QueryError::EmptyValueColumn);
        }
        if self.facets.is_empty() {
            return Err(QueryError::NoFacets);
        }

        let mut facets = Facets::new();
        for (name, values) in self.facets {
            let values: Vec<String> = values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if values.is_empty() {
                return Err(QueryError::EmptyFacet(name));
            }
            facets.insert(name, values);
        }

        let today = clock.today();
        let end_date = self.window.end_date.unwrap_or(today);
        let start_date = self
            .window
            .start_date
            .unwrap_or(today - Duration::days(DEFAULT_WINDOW_DAYS));

        if start_date > end_date {
            return Err(QueryError::InvertedRange {
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }

        Ok(TimeSeriesQuery {
            url_segment,
            facets,
            value_column_name: self.value_column_name,
            start_date,
            end_date,
            page_index: self.window.page_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap())
    }

    #[test]
    fn test_default_window_is_trailing_year_from_clock() {
        let query = TimeSeriesQuery::builder("daily-fuel-type-data", "Generation (MWh)")
            .facet("respondent", ["CISO"])
            .build(&clock())
            .expect("valid query");

        assert_eq!(query.end_date(), NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(query.start_date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(query.page_index(), 0);
    }

    #[test]
    fn test_explicit_window_overrides_defaults() {
        let window = QueryWindow {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
            page_index: 2,
        };
        let query = TimeSeriesQuery::builder("daily-region-data", "Demand (MWh)")
            .facet("respondent", ["PJM"])
            .window(&window)
            .build(&clock())
            .unwrap();

        assert_eq!(query.start_date().to_string(), "2024-01-01");
        assert_eq!(query.end_date().to_string(), "2024-01-31");
        assert_eq!(query.page_index(), 2);
    }

    #[test]
    fn test_missing_facets_rejected() {
        let result = TimeSeriesQuery::builder("daily-fuel-type-data", "Generation (MWh)")
            .build(&clock());
        assert_eq!(result, Err(QueryError::NoFacets));
    }

    #[test]
    fn test_blank_facet_values_rejected() {
        let result = TimeSeriesQuery::builder("daily-fuel-type-data", "Generation (MWh)")
            .facet("respondent", ["", "  "])
            .build(&clock());
        assert_eq!(result, Err(QueryError::EmptyFacet("respondent".to_string())));
    }

    #[test]
    fn test_blank_url_segment_rejected() {
        let result = TimeSeriesQuery::builder(" / ", "Generation (MWh)")
            .facet("respondent", ["CISO"])
            .build(&clock());
        assert_eq!(result, Err(QueryError::EmptyUrlSegment));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = TimeSeriesQuery::builder("daily-fuel-type-data", "Generation (MWh)")
            .facet("respondent", ["CISO"])
            .start_date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
            .end_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .build(&clock());
        assert!(matches!(result, Err(QueryError::InvertedRange { .. })));
    }

    #[test]
    fn test_start_after_default_end_rejected() {
        // Only the start is supplied; the end defaults to "today".
        let result = TimeSeriesQuery::builder("daily-fuel-type-data", "Generation (MWh)")
            .facet("respondent", ["CISO"])
            .start_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .build(&clock());
        assert!(matches!(result, Err(QueryError::InvertedRange { .. })));
    }
}
