//! Passive screen-time tracking. [ActivityTracker] owns a [collector::TrackingModule] that runs
//! on the tokio runtime while tracking is on:
//!  - [sampler] reads the foreground window every tick;
//!  - [session] decides where one usage session ends and the next begins;
//!  - closed sessions are categorized and kept by the [aggregator];
//!  - [events] are broadcast for consumers that want to react immediately.

pub mod aggregator;
pub mod collector;
pub mod events;
pub mod records;
pub mod sampler;
pub mod session;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use aggregator::{Aggregator, CurrentActivity, SharedAggregator};
use anyhow::{anyhow, Result};
use chrono::Duration;
use collector::TrackingModule;
use events::TrackerEvent;
use records::{ApplicationUsageRecord, WebsiteUsageRecord};
use sampler::WindowSampler;
use session::SessionSegmenter;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    categorizer::{Categorizer, RuleCategorizer},
    config::TrackerConfig,
    utils::clock::Clock,
    window_api::WindowManager,
};

enum TrackerState {
    Idle(TrackingModule),
    Running {
        shutdown: CancellationToken,
        handle: JoinHandle<TrackingModule>,
    },
    /// The loop panicked and took the window manager with it.
    Failed,
}

/// Raised while a tracking task is alive. Lowered when the task ends, including by panicking.
struct TrackingFlag(Arc<AtomicBool>);

impl TrackingFlag {
    fn raise(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for TrackingFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Entry point for consumers. Construct one per process and share it, e.g. behind an [Arc].
pub struct ActivityTracker {
    state: Mutex<TrackerState>,
    tracking: Arc<AtomicBool>,
    aggregator: SharedAggregator,
    events: broadcast::Sender<TrackerEvent>,
    clock: Arc<dyn Clock>,
}

impl ActivityTracker {
    pub fn new(
        manager: impl WindowManager + Send + 'static,
        categorizer: Arc<dyn Categorizer>,
        clock: Arc<dyn Clock>,
        config: &TrackerConfig,
    ) -> Self {
        let aggregator = Aggregator::shared(config.history_days);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let module = TrackingModule::new(
            WindowSampler::new(Box::new(manager)),
            SessionSegmenter::new(config.min_session()),
            categorizer,
            aggregator.clone(),
            events.clone(),
            config.sampling_interval(),
            clock.clone(),
        );
        Self {
            state: Mutex::new(TrackerState::Idle(module)),
            tracking: Arc::new(AtomicBool::new(false)),
            aggregator,
            events,
            clock,
        }
    }

    /// Builds a tracker that categorizes with the rules from `config`.
    pub fn from_config(
        manager: impl WindowManager + Send + 'static,
        clock: Arc<dyn Clock>,
        config: &TrackerConfig,
    ) -> Self {
        let categorizer = Arc::new(RuleCategorizer::new(config.rules.clone()));
        Self::new(manager, categorizer, clock, config)
    }

    /// Starts the tracking loop. Does nothing if it is already running.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, TrackerState::Failed) {
            TrackerState::Idle(module) => {
                let shutdown = CancellationToken::new();
                let flag = TrackingFlag::raise(self.tracking.clone());
                let token = shutdown.clone();
                let handle = tokio::spawn(async move {
                    let _flag = flag;
                    module.run(token).await
                });
                *state = TrackerState::Running { shutdown, handle };
                Ok(())
            }
            running @ TrackerState::Running { .. } => {
                debug!("Tracking is already running");
                *state = running;
                Ok(())
            }
            TrackerState::Failed => Err(anyhow!("Tracking loop has failed and can't be restarted")),
        }
    }

    /// Stops the tracking loop and waits until the open session has been recorded.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, TrackerState::Failed) {
            TrackerState::Running { shutdown, handle } => {
                shutdown.cancel();
                let module = handle
                    .await
                    .inspect_err(|e| error!("Tracking loop terminated abnormally {e:?}"))?;
                *state = TrackerState::Idle(module);
                info!("Tracking stopped by request");
                Ok(())
            }
            idle @ TrackerState::Idle(_) => {
                *state = idle;
                Ok(())
            }
            TrackerState::Failed => Ok(()),
        }
    }

    /// False as soon as the tracking task ends, even if it died without [Self::stop].
    pub fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::SeqCst)
    }

    /// Receives events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Today's application records, most recent first.
    pub fn today_app_usage(&self) -> Vec<ApplicationUsageRecord> {
        aggregator::lock(&self.aggregator).today_app_records(self.clock.today())
    }

    /// Today's website records, most recent first.
    pub fn today_website_usage(&self) -> Vec<WebsiteUsageRecord> {
        aggregator::lock(&self.aggregator).today_website_records(self.clock.today())
    }

    pub fn total_tracked_today(&self) -> Duration {
        aggregator::lock(&self.aggregator).total_today(self.clock.today())
    }

    pub fn app_usage_by_category(&self) -> BTreeMap<Arc<str>, Duration> {
        aggregator::lock(&self.aggregator).app_usage_by_category(self.clock.today())
    }

    pub fn website_usage_by_category(&self) -> BTreeMap<Arc<str>, Duration> {
        aggregator::lock(&self.aggregator).website_usage_by_category(self.clock.today())
    }

    pub fn current_app_activity(&self) -> CurrentActivity {
        aggregator::lock(&self.aggregator).most_active_app()
    }

    pub fn current_website_activity(&self) -> CurrentActivity {
        aggregator::lock(&self.aggregator).most_active_website()
    }
}

impl Drop for ActivityTracker {
    fn drop(&mut self) {
        if let TrackerState::Running { shutdown, .. } = self.state.get_mut() {
            shutdown.cancel();
        }
    }
}

#[cfg(test)]
mod tracker_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::{events::TrackerEvent, ActivityTracker};
    use crate::{
        config::TrackerConfig,
        utils::{clock::test_clock::TestClock, logging::TEST_LOGGING},
        window_api::{ActiveWindowData, MockWindowManager},
    };

    fn chrome() -> ActiveWindowData {
        ActiveWindowData {
            window_title: "GitHub - Pull Requests - Google Chrome".into(),
            process_name: "chrome".into(),
            process_id: 100,
        }
    }

    fn notepad() -> ActiveWindowData {
        ActiveWindowData {
            window_title: "untitled - Notepad".into(),
            process_name: "notepad".into(),
            process_id: 200,
        }
    }

    fn config() -> TrackerConfig {
        TrackerConfig {
            event_capacity: 1024,
            ..TrackerConfig::default()
        }
    }

    fn tracker_with(manager: MockWindowManager) -> ActivityTracker {
        ActivityTracker::from_config(manager, Arc::new(TestClock::new()), &config())
    }

    fn drain(receiver: &mut tokio::sync::broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
        let mut events = vec![];
        loop {
            match receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn browser_session_then_switch() -> Result<()> {
        *TEST_LOGGING;
        let mut manager = MockWindowManager::new();
        let mut calls = 0;
        manager.expect_get_active_window_data().returning(move || {
            calls += 1;
            Ok(if calls <= 90 { chrome() } else { notepad() })
        });
        let tracker = tracker_with(manager);
        let mut receiver = tracker.subscribe();

        tracker.start().await?;
        tokio::time::sleep(Duration::from_millis(95_500)).await;
        tracker.stop().await?;

        let apps = tracker.today_app_usage();
        assert_eq!(apps.len(), 2);
        // Most recent first.
        assert_eq!(&*apps[0].process_name, "notepad");
        let chrome_record = &apps[1];
        assert_eq!(&*chrome_record.app_name, "Google Chrome");
        assert_eq!(&*chrome_record.category, "Browser");
        assert_eq!(chrome_record.duration(), chrono::Duration::seconds(90));
        assert!(chrome_record.end >= chrome_record.start);

        let websites = tracker.today_website_usage();
        assert_eq!(websites.len(), 1);
        assert_eq!(&*websites[0].website, "GitHub - Pull Requests");
        assert_eq!(&*websites[0].category, "Development");
        assert_eq!(&*websites[0].url, "GitHub - Pull Requests - Google Chrome");
        assert_eq!(websites[0].duration(), chrono::Duration::seconds(90));

        assert_eq!(
            tracker.total_tracked_today(),
            apps.iter()
                .fold(chrono::Duration::zero(), |acc, v| acc + v.duration())
        );
        let categories = tracker.app_usage_by_category();
        assert_eq!(categories["Browser"], chrono::Duration::seconds(90));
        assert!(categories.contains_key("Text"));

        let events = drain(&mut receiver);
        let app_records = events
            .iter()
            .filter(|v| matches!(v, TrackerEvent::AppRecorded(_)))
            .count();
        let website_records = events
            .iter()
            .filter(|v| matches!(v, TrackerEvent::WebsiteRecorded(_)))
            .count();
        assert_eq!(app_records, 2);
        assert_eq!(website_records, 1);

        let current = tracker.current_website_activity();
        assert_eq!(&*current.name, "GitHub - Pull Requests");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stop_right_after_start_records_nothing() -> Result<()> {
        *TEST_LOGGING;
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_data()
            .returning(|| Ok(notepad()));
        let tracker = tracker_with(manager);

        tracker.start().await?;
        assert!(tracker.is_tracking());
        tracker.stop().await?;
        assert!(!tracker.is_tracking());

        assert!(tracker.today_app_usage().is_empty());
        assert!(tracker.today_website_usage().is_empty());
        assert_eq!(tracker.total_tracked_today(), chrono::Duration::zero());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn identical_samples_only_grow_running_total() -> Result<()> {
        *TEST_LOGGING;
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_data()
            .returning(|| Ok(notepad()));
        let tracker = tracker_with(manager);

        tracker.start().await?;
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        let first = tracker.current_app_activity();
        assert_eq!(&*first.name, "Notepad");
        assert_eq!(first.duration, chrono::Duration::seconds(5));

        tokio::time::sleep(Duration::from_secs(5)).await;
        let second = tracker.current_app_activity();
        assert_eq!(second.duration, chrono::Duration::seconds(10));
        assert!(tracker.today_app_usage().is_empty());
        assert_eq!(
            tracker.current_website_activity().duration,
            chrono::Duration::zero()
        );

        tracker.stop().await?;
        assert_eq!(tracker.today_app_usage().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_restartable() -> Result<()> {
        *TEST_LOGGING;
        let mut manager = MockWindowManager::new();
        let mut calls = 0;
        manager.expect_get_active_window_data().returning(move || {
            calls += 1;
            Ok(if calls % 2 == 0 { chrome() } else { notepad() })
        });
        let tracker = tracker_with(manager);

        tracker.start().await?;
        tracker.start().await?;
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        tracker.stop().await?;
        tracker.stop().await?;
        let after_first_run = tracker.today_app_usage().len();
        assert!(after_first_run >= 3);

        tracker.start().await?;
        assert!(tracker.is_tracking());
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        tracker.stop().await?;
        assert!(tracker.today_app_usage().len() > after_first_run);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn running_totals_are_published_every_tick() -> Result<()> {
        *TEST_LOGGING;
        let mut manager = MockWindowManager::new();
        let mut calls = 0;
        manager.expect_get_active_window_data().returning(move || {
            calls += 1;
            Ok(if calls <= 3 { chrome() } else { notepad() })
        });
        let tracker = tracker_with(manager);
        let mut receiver = tracker.subscribe();

        tracker.start().await?;
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        tracker.stop().await?;
        let events = drain(&mut receiver);

        let chrome_updates = events
            .iter()
            .filter_map(|v| match v {
                TrackerEvent::AppUpdated { name, duration } if &**name == "Google Chrome" => {
                    Some(duration.num_seconds())
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(chrome_updates, vec![0, 1, 2]);

        let website_updates = events
            .iter()
            .filter_map(|v| match v {
                TrackerEvent::WebsiteUpdated { name, duration } => {
                    Some((name.to_string(), duration.num_seconds()))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        let expected = (0..3)
            .map(|v| ("GitHub - Pull Requests".to_string(), v))
            .collect::<Vec<_>>();
        assert_eq!(website_updates, expected);

        // Nothing about websites once the browser session has closed.
        let closed_at = events
            .iter()
            .position(|v| matches!(v, TrackerEvent::WebsiteRecorded(_)))
            .unwrap();
        assert!(events[closed_at..]
            .iter()
            .all(|v| !matches!(v, TrackerEvent::WebsiteUpdated { .. })));

        let notepad_updates = events
            .iter()
            .filter(|v| matches!(v, TrackerEvent::AppUpdated { name, .. } if &**name == "Notepad"))
            .count();
        assert_eq!(notepad_updates, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_loop_is_not_tracking() -> Result<()> {
        *TEST_LOGGING;
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_data()
            .returning(|| panic!("window backend exploded"));
        let tracker = tracker_with(manager);

        tracker.start().await?;
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(!tracker.is_tracking());

        assert!(tracker.stop().await.is_err());
        assert!(tracker.start().await.is_err());
        assert!(!tracker.is_tracking());
        Ok(())
    }
}
