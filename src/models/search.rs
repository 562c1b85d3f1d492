//! Search request model.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Upper bound applied to `max_results` before it reaches an upstream API
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Date window for the PubMed "recent" mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecentWindow {
    PastWeek,
    PastMonth,
}

impl RecentWindow {
    pub fn days(&self) -> i64 {
        match self {
            RecentWindow::PastWeek => 7,
            RecentWindow::PastMonth => 30,
        }
    }

    /// Earliest publication date included by this window
    pub fn date_floor(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.days())
    }
}

/// Search query parameters shared by all adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Keyword string passed to the upstream search
    pub keywords: String,

    /// Inclusive start of the publication year range
    pub start_year: Option<i32>,

    /// Inclusive end of the publication year range
    pub end_year: Option<i32>,

    /// Maximum number of results to return
    pub max_results: usize,

    /// Restrict to recently published records, sorted by date (PubMed only)
    pub recent: Option<RecentWindow>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            start_year: None,
            end_year: None,
            max_results: 10,
            recent: None,
        }
    }
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            ..Default::default()
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Set an inclusive publication year range
    pub fn years(mut self, start: i32, end: i32) -> Self {
        self.start_year = Some(start);
        self.end_year = Some(end);
        self
    }

    pub fn recent(mut self, window: RecentWindow) -> Self {
        self.recent = Some(window);
        self
    }

    /// The year range, present only when both bounds are set
    pub fn year_range(&self) -> Option<(i32, i32)> {
        match (self.start_year, self.end_year) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// `max_results` clamped to what the upstream APIs accept
    pub fn effective_max(&self) -> usize {
        self.max_results.min(MAX_RESULTS_LIMIT)
    }

    /// Check the input constraints every adapter relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.keywords.trim().is_empty() {
            return Err("keywords must not be empty".to_string());
        }
        if self.max_results == 0 {
            return Err("max_results must be positive".to_string());
        }
        match (self.start_year, self.end_year) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) if start <= end => Ok(()),
            (Some(start), Some(end)) => Err(format!(
                "start year {} is after end year {}",
                start, end
            )),
            _ => Err("start_year and end_year must be given together".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(SearchQuery::new("cancer").validate().is_ok());
        assert!(SearchQuery::new("cancer").years(2020, 2021).validate().is_ok());
        assert!(SearchQuery::new("cancer").years(2022, 2021).validate().is_err());
        assert!(SearchQuery::new("  ").validate().is_err());
        assert!(SearchQuery::new("cancer").max_results(0).validate().is_err());

        let mut half_open = SearchQuery::new("cancer");
        half_open.start_year = Some(2020);
        assert!(half_open.validate().is_err());
        assert_eq!(half_open.year_range(), None);
    }

    #[test]
    fn test_effective_max() {
        assert_eq!(SearchQuery::new("x").max_results(5).effective_max(), 5);
        assert_eq!(SearchQuery::new("x").max_results(500).effective_max(), 100);
    }

    #[test]
    fn test_recent_window_floor() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(
            RecentWindow::PastWeek.date_floor(today),
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()
        );
        assert_eq!(
            RecentWindow::PastMonth.date_floor(today),
            NaiveDate::from_ymd_opt(2024, 2, 9).unwrap()
        );
    }
}
