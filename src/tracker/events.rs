use std::sync::Arc;

use chrono::Duration;

use super::records::{ApplicationUsageRecord, WebsiteUsageRecord};

/// Published by the tracking loop on a bounded broadcast channel. Consumers that fall behind
/// lose the oldest events instead of slowing the loop down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    AppRecorded(ApplicationUsageRecord),
    WebsiteRecorded(WebsiteUsageRecord),
    /// Running duration of the open session, keyed by application display name.
    AppUpdated { name: Arc<str>, duration: Duration },
    /// Running duration of the open browser session, keyed by website label.
    WebsiteUpdated { name: Arc<str>, duration: Duration },
}
