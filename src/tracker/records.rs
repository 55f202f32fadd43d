use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::Serialize;

/// A finished stretch of time spent in one window. Immutable once created.
#[derive(PartialEq, Eq, Debug, Serialize, Clone)]
pub struct ApplicationUsageRecord {
    /// Assigned by the aggregator, 0 until the record is stored.
    pub id: u64,
    pub app_name: Arc<str>,
    pub window_title: Arc<str>,
    pub process_name: Arc<str>,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub category: Arc<str>,
}

/// Derived from an [ApplicationUsageRecord] whose process is a browser.
#[derive(PartialEq, Eq, Debug, Serialize, Clone)]
pub struct WebsiteUsageRecord {
    pub id: u64,
    pub website: Arc<str>,
    /// Window titles are the closest thing to a URL the OS exposes.
    pub url: Arc<str>,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub category: Arc<str>,
}

/// Common view over both record kinds used by the aggregator queries.
pub trait UsageRecord {
    fn start(&self) -> DateTime<Local>;

    fn end(&self) -> DateTime<Local>;

    fn category(&self) -> &Arc<str>;

    fn duration(&self) -> Duration {
        self.end() - self.start()
    }

    fn day(&self) -> NaiveDate {
        self.start().date_naive()
    }
}

impl UsageRecord for ApplicationUsageRecord {
    fn start(&self) -> DateTime<Local> {
        self.start
    }

    fn end(&self) -> DateTime<Local> {
        self.end
    }

    fn category(&self) -> &Arc<str> {
        &self.category
    }
}

impl UsageRecord for WebsiteUsageRecord {
    fn start(&self) -> DateTime<Local> {
        self.start
    }

    fn end(&self) -> DateTime<Local> {
        self.end
    }

    fn category(&self) -> &Arc<str> {
        &self.category
    }
}

impl ApplicationUsageRecord {
    pub fn duration(&self) -> Duration {
        UsageRecord::duration(self)
    }
}

impl WebsiteUsageRecord {
    pub fn duration(&self) -> Duration {
        UsageRecord::duration(self)
    }
}
