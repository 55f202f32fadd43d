use std::{collections::BTreeMap, sync::Arc};

use chrono::Duration;
use serde::Serialize;

use crate::{
    tracker::{
        records::{ApplicationUsageRecord, WebsiteUsageRecord},
        ActivityTracker,
    },
    utils::{
        percentage::duration_percentage,
        time::{duration_seconds, format_duration},
    },
};

#[derive(Debug, Serialize)]
pub struct CategoryUsage {
    pub category: Arc<str>,
    #[serde(with = "duration_seconds")]
    pub duration: Duration,
    pub percentage: f64,
}

/// Everything tracked today, as printed when `watch` stops.
#[derive(Debug, Serialize)]
pub struct TodayReport {
    #[serde(with = "duration_seconds")]
    pub total: Duration,
    pub app_categories: Vec<CategoryUsage>,
    pub website_categories: Vec<CategoryUsage>,
    pub apps: Vec<ApplicationUsageRecord>,
    pub websites: Vec<WebsiteUsageRecord>,
}

impl TodayReport {
    pub fn collect(tracker: &ActivityTracker) -> Self {
        let apps = tracker.today_app_usage();
        let websites = tracker.today_website_usage();
        let total = tracker.total_tracked_today();
        let website_total = websites
            .iter()
            .fold(Duration::zero(), |acc, v| acc + v.duration());
        Self {
            total,
            app_categories: category_usage(tracker.app_usage_by_category(), total),
            website_categories: category_usage(tracker.website_usage_by_category(), website_total),
            apps,
            websites,
        }
    }

    pub fn print(&self) {
        println!("Tracked today\t{}", format_duration(self.total));
        println!();

        print_categories("Applications", &self.app_categories);
        print_categories("Websites", &self.website_categories);

        if !self.apps.is_empty() {
            println!("Sessions");
            for record in &self.apps {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.start.format("%H:%M:%S"),
                    format_duration(record.duration()),
                    record.category,
                    record.app_name,
                    record.window_title
                );
            }
            println!();
        }
    }
}

fn print_categories(title: &str, categories: &[CategoryUsage]) {
    if categories.is_empty() {
        return;
    }
    println!("{title}");
    for entry in categories {
        println!(
            "{:.0}%\t{}\t{}",
            entry.percentage,
            format_duration(entry.duration),
            entry.category
        );
    }
    println!();
}

/// Largest category first.
fn category_usage(categories: BTreeMap<Arc<str>, Duration>, whole: Duration) -> Vec<CategoryUsage> {
    let mut usages = categories
        .into_iter()
        .map(|(category, duration)| CategoryUsage {
            percentage: *duration_percentage(duration, whole),
            category,
            duration,
        })
        .collect::<Vec<_>>();
    usages.sort_by(|a, b| b.duration.cmp(&a.duration));
    usages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_sorted_by_duration() {
        let categories = BTreeMap::from([
            (Arc::<str>::from("Browser"), Duration::seconds(30)),
            (Arc::<str>::from("Development"), Duration::seconds(90)),
        ]);
        let usages = category_usage(categories, Duration::seconds(120));

        assert_eq!(&*usages[0].category, "Development");
        assert_eq!(usages[0].percentage, 75.);
        assert_eq!(&*usages[1].category, "Browser");
        assert_eq!(usages[1].percentage, 25.);
    }
}
