use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::{utils::time::duration_seconds, window_api::UNKNOWN};

use super::records::{ApplicationUsageRecord, UsageRecord, WebsiteUsageRecord};

pub type SharedAggregator = Arc<Mutex<Aggregator>>;

/// Locks the aggregator, taking over a poisoned lock. Every mutation is a single push or insert.
pub fn lock(aggregator: &SharedAggregator) -> MutexGuard<'_, Aggregator> {
    aggregator.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The running duration of whatever has been used the longest in its current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentActivity {
    pub name: Arc<str>,
    #[serde(with = "duration_seconds")]
    pub duration: Duration,
}

impl CurrentActivity {
    fn unknown() -> Self {
        Self {
            name: UNKNOWN.into(),
            duration: Duration::zero(),
        }
    }
}

/// Keeps closed records and the running totals of open sessions.
#[derive(Debug)]
pub struct Aggregator {
    app_records: Vec<ApplicationUsageRecord>,
    website_records: Vec<WebsiteUsageRecord>,
    app_times: HashMap<Arc<str>, RunningTotal>,
    website_times: HashMap<Arc<str>, RunningTotal>,
    /// Day the running totals belong to.
    totals_day: Option<NaiveDate>,
    next_id: u64,
    history_days: u32,
}

/// Running duration of an open session and the day it was last updated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunningTotal {
    duration: Duration,
    day: NaiveDate,
}

impl Aggregator {
    pub fn new(history_days: u32) -> Self {
        Self {
            app_records: vec![],
            website_records: vec![],
            app_times: HashMap::new(),
            website_times: HashMap::new(),
            totals_day: None,
            next_id: 1,
            history_days,
        }
    }

    pub fn shared(history_days: u32) -> SharedAggregator {
        Arc::new(Mutex::new(Self::new(history_days)))
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Stores a closed record, assigning its id. Records older than the retention window are
    /// dropped at the same time.
    pub fn record_app(&mut self, mut record: ApplicationUsageRecord) -> ApplicationUsageRecord {
        record.id = self.take_id();
        self.prune(record.day());
        self.app_records.push(record.clone());
        record
    }

    pub fn record_website(&mut self, mut record: WebsiteUsageRecord) -> WebsiteUsageRecord {
        record.id = self.take_id();
        self.prune(record.day());
        self.website_records.push(record.clone());
        record
    }

    fn prune(&mut self, today: NaiveDate) {
        let Some(cutoff) = today.checked_sub_days(chrono::Days::new(self.history_days.into()))
        else {
            return;
        };
        self.app_records.retain(|v| v.day() >= cutoff);
        self.website_records.retain(|v| v.day() >= cutoff);
        self.app_times.retain(|_, v| v.day >= cutoff);
        self.website_times.retain(|_, v| v.day >= cutoff);
    }

    /// Drops running totals that weren't updated on `today`. Only does work once per day.
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.totals_day == Some(today) {
            return;
        }
        self.app_times.retain(|_, v| v.day == today);
        self.website_times.retain(|_, v| v.day == today);
        self.totals_day = Some(today);
    }

    /// Sets the running duration of the open session for an application. Starting a new session
    /// for the same name overwrites the previous value.
    pub fn update_app_time(&mut self, name: Arc<str>, duration: Duration, today: NaiveDate) {
        self.roll_over(today);
        self.app_times.insert(name, RunningTotal { duration, day: today });
    }

    pub fn update_website_time(
        &mut self,
        website: Arc<str>,
        duration: Duration,
        today: NaiveDate,
    ) {
        self.roll_over(today);
        self.website_times.insert(website, RunningTotal { duration, day: today });
    }

    /// Records started on `today`, most recent first.
    pub fn today_app_records(&self, today: NaiveDate) -> Vec<ApplicationUsageRecord> {
        records_of_day(&self.app_records, today)
    }

    pub fn today_website_records(&self, today: NaiveDate) -> Vec<WebsiteUsageRecord> {
        records_of_day(&self.website_records, today)
    }

    /// Sum of today's application records. The open session isn't included until it closes.
    pub fn total_today(&self, today: NaiveDate) -> Duration {
        self.app_records
            .iter()
            .filter(|v| v.day() == today)
            .fold(Duration::zero(), |acc, v| acc + UsageRecord::duration(v))
    }

    pub fn app_usage_by_category(&self, today: NaiveDate) -> BTreeMap<Arc<str>, Duration> {
        by_category(&self.app_records, today)
    }

    pub fn website_usage_by_category(&self, today: NaiveDate) -> BTreeMap<Arc<str>, Duration> {
        by_category(&self.website_records, today)
    }

    pub fn most_active_app(&self) -> CurrentActivity {
        most_active(&self.app_times)
    }

    pub fn most_active_website(&self) -> CurrentActivity {
        most_active(&self.website_times)
    }
}

fn records_of_day<R: UsageRecord + Clone>(records: &[R], today: NaiveDate) -> Vec<R> {
    let mut result = records
        .iter()
        .filter(|v| v.day() == today)
        .cloned()
        .collect::<Vec<_>>();
    // Stable sort keeps insertion order for records starting at the same instant.
    result.sort_by(|a, b| b.start().cmp(&a.start()));
    result
}

fn by_category<R: UsageRecord>(records: &[R], today: NaiveDate) -> BTreeMap<Arc<str>, Duration> {
    let mut map = BTreeMap::<Arc<str>, Duration>::new();
    for record in records.iter().filter(|v| v.day() == today) {
        *map.entry(record.category().clone())
            .or_insert_with(Duration::zero) += record.duration();
    }
    map
}

/// Longest running total; equal durations resolve to the lexically smallest name.
fn most_active(times: &HashMap<Arc<str>, RunningTotal>) -> CurrentActivity {
    times
        .iter()
        .max_by(|(a_name, a), (b_name, b)| {
            a.duration.cmp(&b.duration).then_with(|| b_name.cmp(a_name))
        })
        .map_or_else(CurrentActivity::unknown, |(name, total)| CurrentActivity {
            name: name.clone(),
            duration: total.duration,
        })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, TimeZone};

    use super::*;
    use crate::utils::clock::test_clock::TEST_START_DATE;

    fn at(seconds: i64) -> DateTime<Local> {
        Local.from_local_datetime(&TEST_START_DATE).unwrap() + Duration::seconds(seconds)
    }

    fn today() -> NaiveDate {
        at(0).date_naive()
    }

    fn app(name: &str, category: &str, start: i64, end: i64) -> ApplicationUsageRecord {
        ApplicationUsageRecord {
            id: 0,
            app_name: name.into(),
            window_title: format!("{name} window").into(),
            process_name: name.into(),
            start: at(start),
            end: at(end),
            category: category.into(),
        }
    }

    fn website(name: &str, category: &str, start: i64, end: i64) -> WebsiteUsageRecord {
        WebsiteUsageRecord {
            id: 0,
            website: name.into(),
            url: format!("{name} - Google Chrome").into(),
            start: at(start),
            end: at(end),
            category: category.into(),
        }
    }

    #[test]
    fn assigns_sequential_ids() {
        let mut aggregator = Aggregator::new(7);
        assert_eq!(aggregator.record_app(app("code", "Development", 0, 10)).id, 1);
        assert_eq!(aggregator.record_website(website("GitHub", "Development", 0, 10)).id, 2);
        assert_eq!(aggregator.record_app(app("chrome", "Browser", 10, 20)).id, 3);
    }

    #[test]
    fn today_records_are_most_recent_first() {
        let mut aggregator = Aggregator::new(7);
        aggregator.record_app(app("code", "Development", 0, 10));
        aggregator.record_app(app("chrome", "Browser", 10, 25));
        aggregator.record_app(app("yesterday", "Other", -86_400, -86_300));

        let records = aggregator.today_app_records(today());
        let names = records.iter().map(|v| &*v.app_name).collect::<Vec<_>>();
        assert_eq!(names, vec!["chrome", "code"]);
    }

    #[test]
    fn total_is_sum_of_today() {
        let mut aggregator = Aggregator::new(7);
        aggregator.record_app(app("code", "Development", 0, 10));
        aggregator.record_app(app("chrome", "Browser", 10, 25));
        aggregator.record_app(app("yesterday", "Other", -86_400, -86_300));
        // Website time overlaps application time and isn't counted twice.
        aggregator.record_website(website("GitHub", "Development", 10, 25));

        assert_eq!(aggregator.total_today(today()), Duration::seconds(25));
        assert_eq!(
            aggregator.total_today(today().pred_opt().unwrap()),
            Duration::seconds(100)
        );
    }

    #[test]
    fn groups_by_category() {
        let mut aggregator = Aggregator::new(7);
        aggregator.record_app(app("code", "Development", 0, 10));
        aggregator.record_app(app("devenv", "Development", 10, 15));
        aggregator.record_app(app("chrome", "Browser", 15, 45));
        aggregator.record_website(website("GitHub", "Development", 15, 30));
        aggregator.record_website(website("YouTube", "Video", 30, 45));

        let apps = aggregator.app_usage_by_category(today());
        assert_eq!(apps.len(), 2);
        assert_eq!(apps["Development"], Duration::seconds(15));
        assert_eq!(apps["Browser"], Duration::seconds(30));

        let websites = aggregator.website_usage_by_category(today());
        assert_eq!(websites["Development"], Duration::seconds(15));
        assert_eq!(websites["Video"], Duration::seconds(15));
    }

    #[test]
    fn most_active_defaults_to_unknown() {
        let aggregator = Aggregator::new(7);
        assert_eq!(aggregator.most_active_app(), CurrentActivity::unknown());
        assert_eq!(aggregator.most_active_website().duration, Duration::zero());
    }

    #[test]
    fn most_active_picks_longest_then_name() {
        let mut aggregator = Aggregator::new(7);
        let day = today();
        aggregator.update_app_time("VS Code".into(), Duration::seconds(30), day);
        aggregator.update_app_time("Google Chrome".into(), Duration::seconds(90), day);
        assert_eq!(&*aggregator.most_active_app().name, "Google Chrome");

        aggregator.update_app_time("Discord".into(), Duration::seconds(90), day);
        assert_eq!(&*aggregator.most_active_app().name, "Discord");

        // A new session for the same name resets its running total.
        aggregator.update_app_time("Discord".into(), Duration::zero(), day);
        aggregator.update_app_time("Google Chrome".into(), Duration::seconds(1), day);
        let current = aggregator.most_active_app();
        assert_eq!(&*current.name, "VS Code");
        assert_eq!(current.duration, Duration::seconds(30));
    }

    #[test]
    fn old_records_are_pruned() {
        let mut aggregator = Aggregator::new(1);
        aggregator.record_app(app("old", "Other", -3 * 86_400, -3 * 86_400 + 10));
        aggregator.record_app(app("yesterday", "Other", -86_400, -86_390));
        aggregator.record_app(app("code", "Development", 0, 10));

        assert!(aggregator.app_records.iter().all(|v| &*v.app_name != "old"));
        assert_eq!(aggregator.app_records.len(), 2);
    }

    #[test]
    fn running_totals_follow_the_day() {
        let mut aggregator = Aggregator::new(7);
        let day = today();
        let next_day = day.succ_opt().unwrap();
        aggregator.update_app_time("VS Code".into(), Duration::hours(3), day);
        aggregator.update_website_time("GitHub".into(), Duration::hours(1), day);
        for i in 0..100 {
            aggregator.update_app_time(format!("app {i}").into(), Duration::seconds(59), day);
        }
        assert_eq!(aggregator.app_times.len(), 101);

        aggregator.update_app_time("Notepad".into(), Duration::seconds(60), next_day);
        let current = aggregator.most_active_app();
        assert_eq!(&*current.name, "Notepad");
        assert_eq!(current.duration, Duration::seconds(60));
        assert_eq!(aggregator.app_times.len(), 1);
        assert_eq!(aggregator.most_active_website(), CurrentActivity::unknown());
        assert!(aggregator.website_times.is_empty());
    }

    #[test]
    fn pruning_drops_stale_running_totals() {
        let mut aggregator = Aggregator::new(1);
        let old = at(-3 * 86_400).date_naive();
        aggregator.update_app_time("old".into(), Duration::seconds(10), old);
        aggregator.update_website_time("old site".into(), Duration::seconds(10), old);

        aggregator.record_app(app("code", "Development", 0, 10));
        assert!(aggregator.app_times.is_empty());
        assert!(aggregator.website_times.is_empty());
    }
}
