use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, trace_span};

use crate::{categorizer::Categorizer, utils::clock::Clock};

use super::{
    aggregator::{self, SharedAggregator},
    events::TrackerEvent,
    records::{ApplicationUsageRecord, WebsiteUsageRecord},
    sampler::WindowSampler,
    session::{ClosedSession, SessionSegmenter},
};

/// The tracking loop: sample, segment, categorize and aggregate once per tick.
pub struct TrackingModule {
    sampler: WindowSampler,
    segmenter: SessionSegmenter,
    categorizer: Arc<dyn Categorizer>,
    aggregator: SharedAggregator,
    events: broadcast::Sender<TrackerEvent>,
    collection_frequency: Duration,
    time_provider: Arc<dyn Clock>,
}

impl TrackingModule {
    pub fn new(
        sampler: WindowSampler,
        segmenter: SessionSegmenter,
        categorizer: Arc<dyn Categorizer>,
        aggregator: SharedAggregator,
        events: broadcast::Sender<TrackerEvent>,
        collection_frequency: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sampler,
            segmenter,
            categorizer,
            aggregator,
            events,
            collection_frequency,
            time_provider,
        }
    }

    /// Executes the tracking loop until `shutdown` is cancelled. The open session is flushed
    /// before returning, and the module is handed back so tracking can be restarted.
    pub async fn run(mut self, shutdown: CancellationToken) -> Self {
        info!("Tracking started");
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.collection_frequency;

            trace_span!("Tracking tick").in_scope(|| self.tick());

            tokio::select! {
                _ = shutdown.cancelled() => {
                    break
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }

        let now = self.time_provider.local_time();
        if let Some(closed) = self.segmenter.flush(now) {
            self.record(closed);
        }
        info!("Tracking stopped");
        self
    }

    fn tick(&mut self) {
        let window = self.sampler.sample();
        let now = self.time_provider.local_time();
        trace!("Sampled {window:?}");

        if let Some(closed) = self.segmenter.observe(window, now) {
            self.record(closed);
        }
        self.refresh_running_totals(now);
    }

    fn refresh_running_totals(&mut self, now: DateTime<Local>) {
        let today = now.date_naive();
        let Some(session) = self.segmenter.current() else {
            aggregator::lock(&self.aggregator).roll_over(today);
            return;
        };
        let elapsed = session.elapsed(now);
        let app_name: Arc<str> = self.categorizer.display_name(&session.process_name).into();
        let website: Option<Arc<str>> = self
            .categorizer
            .is_browser(&session.process_name)
            .then(|| self.categorizer.extract_website(&session.window_title).into());

        {
            let mut aggregator = aggregator::lock(&self.aggregator);
            aggregator.update_app_time(app_name.clone(), elapsed, today);
            if let Some(website) = &website {
                aggregator.update_website_time(website.clone(), elapsed, today);
            }
        }

        self.publish(TrackerEvent::AppUpdated {
            name: app_name,
            duration: elapsed,
        });
        if let Some(website) = website {
            self.publish(TrackerEvent::WebsiteUpdated {
                name: website,
                duration: elapsed,
            });
        }
    }

    /// Turns a closed session into records, browser sessions also yield a website record.
    fn record(&mut self, closed: ClosedSession) {
        let ClosedSession { session, end } = closed;
        let categorizer = &self.categorizer;

        let app_record = ApplicationUsageRecord {
            id: 0,
            app_name: categorizer.display_name(&session.process_name).into(),
            category: categorizer
                .categorize_app(&session.process_name, &session.window_title)
                .into(),
            window_title: session.window_title.clone(),
            process_name: session.process_name.clone(),
            start: session.start,
            end,
        };
        let website_record = categorizer.is_browser(&session.process_name).then(|| {
            let website = categorizer.extract_website(&session.window_title);
            WebsiteUsageRecord {
                id: 0,
                category: categorizer.categorize_website(&website).into(),
                website: website.into(),
                url: session.window_title.clone(),
                start: session.start,
                end,
            }
        });

        let (app_record, website_record) = {
            let mut aggregator = aggregator::lock(&self.aggregator);
            (
                aggregator.record_app(app_record),
                website_record.map(|v| aggregator.record_website(v)),
            )
        };

        debug!(
            "Recorded {} ({}) for {}s",
            app_record.app_name,
            app_record.category,
            app_record.duration().num_seconds()
        );
        self.publish(TrackerEvent::AppRecorded(app_record));
        if let Some(website_record) = website_record {
            debug!("Recorded website {}", website_record.website);
            self.publish(TrackerEvent::WebsiteRecorded(website_record));
        }
    }

    fn publish(&self, event: TrackerEvent) {
        // Having no subscribers is the normal state when nobody listens.
        let _ = self.events.send(event);
    }
}
