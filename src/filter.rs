//! Client-side record filtering
//!
//! Narrows the fetched record set by up to three substring criteria. All
//! non-empty criteria must match (logical AND); matching is case-sensitive.
//! The output keeps the input's relative order and borrows from it.

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::types::SalesRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Three independent substring queries
///
/// An empty query is inactive. With every query empty the filter is an
/// identity pass-through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Substring of the order number
    #[serde(default)]
    pub order_no: String,
    /// Substring of the rendered record date
    #[serde(default)]
    pub date: String,
    /// Substring of the customer number
    #[serde(default)]
    pub customer_no: String,
}

impl FilterCriteria {
    /// Whether no criterion is active
    pub fn is_empty(&self) -> bool {
        self.order_no.is_empty() && self.date.is_empty() && self.customer_no.is_empty()
    }
}

/// Applies [`FilterCriteria`] to records
#[derive(Clone, Debug)]
pub struct FilterEngine {
    date_format: String,
    offset: FixedOffset,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self {
            date_format: FilterConfig::default().date_format,
            offset: Utc.fix(),
        }
    }
}

impl FilterEngine {
    /// Create an engine from configuration
    ///
    /// Fails when the date format contains an invalid specifier or the UTC
    /// offset is out of range.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        if StrftimeItems::new(&config.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::config(
                "date_format",
                format!("invalid date format {:?}", config.date_format),
            ));
        }
        let offset = FixedOffset::east_opt(config.utc_offset_minutes.saturating_mul(60))
            .ok_or_else(|| {
                Error::config(
                    "utc_offset_minutes",
                    format!("offset {} is out of range", config.utc_offset_minutes),
                )
            })?;
        Ok(Self {
            date_format: config.date_format.clone(),
            offset,
        })
    }

    /// Render a record's date the way the date criterion sees it
    ///
    /// A record without a date renders as an empty string, which no date
    /// query matches.
    pub fn format_date(&self, record: &SalesRecord) -> String {
        let Some(recorded_at) = record.recorded_at else {
            return String::new();
        };
        let local = recorded_at.with_timezone(&self.offset);
        let mut rendered = String::new();
        if write!(rendered, "{}", local.format(&self.date_format)).is_err() {
            // Invalid formats are rejected in `new`
            rendered = local.date_naive().to_string();
        }
        rendered
    }

    /// Whether a record satisfies every active criterion
    pub fn matches(&self, record: &SalesRecord, criteria: &FilterCriteria) -> bool {
        if !criteria.order_no.is_empty() && !record.order_no.contains(&criteria.order_no) {
            return false;
        }
        if !criteria.customer_no.is_empty()
            && !record.customer_no.contains(&criteria.customer_no)
        {
            return false;
        }
        if !criteria.date.is_empty() && !self.format_date(record).contains(&criteria.date) {
            return false;
        }
        true
    }

    /// Filter a record collection
    ///
    /// A collection that has not been loaded yet (`None`) yields an empty result.
    pub fn apply<'a>(
        &self,
        records: Option<&'a [SalesRecord]>,
        criteria: &FilterCriteria,
    ) -> Vec<&'a SalesRecord> {
        let Some(records) = records else {
            return Vec::new();
        };
        if criteria.is_empty() {
            return records.iter().collect();
        }
        records
            .iter()
            .filter(|record| self.matches(record, criteria))
            .collect()
    }
}
