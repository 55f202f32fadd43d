use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    tracker::{events::TrackerEvent, ActivityTracker},
    utils::time::format_duration,
};

use super::report::TodayReport;

#[derive(Debug, Parser)]
pub struct WatchCommand {
    #[arg(long, default_value_t = 2, help = "Seconds between two printed status lines")]
    poll: u64,
    #[arg(long, help = "Print the final report as JSON")]
    json: bool,
}

/// Tracks until Ctrl-C, printing the most active application and website on every poll, then
/// prints today's report.
pub async fn process_watch_command(
    WatchCommand { poll, json }: WatchCommand,
    tracker: ActivityTracker,
) -> Result<()> {
    let tracker = Arc::new(tracker);
    let shutdown = CancellationToken::new();

    let events = tokio::spawn(log_events(
        BroadcastStream::new(tracker.subscribe()),
        shutdown.clone(),
    ));

    tracker.start().await?;
    println!("Tracking, press Ctrl-C to stop");

    let mut interval = tokio::time::interval(Duration::from_secs(poll.max(1)));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C {e:?}");
                }
                break;
            }
            _ = interval.tick() => print_status(&tracker),
        }
    }

    tracker.stop().await?;
    shutdown.cancel();
    if let Err(e) = events.await {
        warn!("Event logger ended abnormally {e:?}");
    }

    let report = TodayReport::collect(&tracker);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

fn print_status(tracker: &ActivityTracker) {
    let app = tracker.current_app_activity();
    let website = tracker.current_website_activity();
    println!(
        "{}\t{}\t{}\t{}\ttoday {}",
        app.name,
        format_duration(app.duration),
        website.name,
        format_duration(website.duration),
        format_duration(tracker.total_tracked_today()),
    );
}

/// Drains tracker events independently of the polling loop.
async fn log_events(mut events: BroadcastStream<TrackerEvent>, shutdown: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => return,
            event = events.next() => event,
        };
        match event {
            Some(Ok(TrackerEvent::AppRecorded(record))) => info!(
                "Closed {} ({}) after {}",
                record.app_name,
                record.category,
                format_duration(record.duration())
            ),
            Some(Ok(TrackerEvent::WebsiteRecorded(record))) => info!(
                "Closed website {} ({}) after {}",
                record.website,
                record.category,
                format_duration(record.duration())
            ),
            Some(Ok(_)) => (),
            Some(Err(e)) => warn!("Event logger fell behind: {e}"),
            None => return,
        }
    }
}
