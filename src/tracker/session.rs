use std::sync::Arc;

use chrono::{DateTime, Duration, Local};

use crate::window_api::ActiveWindowData;

/// The window currently being timed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSession {
    pub process_name: Arc<str>,
    pub window_title: Arc<str>,
    pub process_id: u32,
    pub start: DateTime<Local>,
}

impl UsageSession {
    fn open(window: ActiveWindowData, start: DateTime<Local>) -> Self {
        Self {
            process_name: window.process_name,
            window_title: window.window_title,
            process_id: window.process_id,
            start,
        }
    }

    fn is_window(&self, window: &ActiveWindowData) -> bool {
        self.process_name == window.process_name && self.window_title == window.window_title
    }

    pub fn elapsed(&self, now: DateTime<Local>) -> Duration {
        (now - self.start).max(Duration::zero())
    }
}

/// A session that has ended and is long enough to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub session: UsageSession,
    pub end: DateTime<Local>,
}

impl ClosedSession {
    pub fn duration(&self) -> Duration {
        self.end - self.session.start
    }
}

/// Splits the stream of sampled windows into sessions. A session lasts while consecutive samples
/// have exactly the same process name and window title.
#[derive(Debug)]
pub struct SessionSegmenter {
    current: Option<UsageSession>,
    min_duration: Duration,
}

impl SessionSegmenter {
    pub fn new(min_duration: Duration) -> Self {
        Self {
            current: None,
            min_duration,
        }
    }

    pub fn current(&self) -> Option<&UsageSession> {
        self.current.as_ref()
    }

    /// Feeds the next sample. Returns the session that just ended when the window changed.
    pub fn observe(
        &mut self,
        window: ActiveWindowData,
        now: DateTime<Local>,
    ) -> Option<ClosedSession> {
        match &self.current {
            Some(session) if session.is_window(&window) => None,
            _ => {
                let previous = self.current.replace(UsageSession::open(window, now));
                previous.and_then(|session| self.close(session, now))
            }
        }
    }

    /// Ends the open session, if any, and goes back to the idle state.
    pub fn flush(&mut self, now: DateTime<Local>) -> Option<ClosedSession> {
        self.current
            .take()
            .and_then(|session| self.close(session, now))
    }

    fn close(&self, session: UsageSession, now: DateTime<Local>) -> Option<ClosedSession> {
        if session.process_name.is_empty() {
            return None;
        }
        // A clock that went backwards still yields end >= start.
        let end = now.max(session.start);
        let closed = ClosedSession { session, end };
        (closed.duration() >= self.min_duration).then_some(closed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, TimeZone};

    use super::*;
    use crate::utils::clock::test_clock::TEST_START_DATE;

    fn at(seconds: i64) -> DateTime<Local> {
        Local.from_local_datetime(&TEST_START_DATE).unwrap() + Duration::seconds(seconds)
    }

    fn window(process: &str, title: &str) -> ActiveWindowData {
        ActiveWindowData {
            window_title: title.into(),
            process_name: process.into(),
            process_id: 1,
        }
    }

    fn segmenter() -> SessionSegmenter {
        SessionSegmenter::new(Duration::seconds(1))
    }

    #[test]
    fn first_sample_opens_a_session() {
        let mut segmenter = segmenter();
        assert!(segmenter.current().is_none());

        assert_eq!(segmenter.observe(window("code", "main.rs"), at(0)), None);
        let current = segmenter.current().unwrap();
        assert_eq!(&*current.process_name, "code");
        assert_eq!(current.start, at(0));
    }

    #[test]
    fn identical_samples_keep_the_session() {
        let mut segmenter = segmenter();
        segmenter.observe(window("code", "main.rs"), at(0));
        assert_eq!(segmenter.observe(window("code", "main.rs"), at(5)), None);
        assert_eq!(segmenter.current().unwrap().start, at(0));
        assert_eq!(segmenter.current().unwrap().elapsed(at(5)), Duration::seconds(5));
    }

    #[test]
    fn changed_title_closes_the_session() {
        let mut segmenter = segmenter();
        segmenter.observe(window("chrome", "GitHub - Google Chrome"), at(0));
        let closed = segmenter
            .observe(window("chrome", "YouTube - Google Chrome"), at(90))
            .unwrap();

        assert_eq!(&*closed.session.window_title, "GitHub - Google Chrome");
        assert_eq!(closed.duration(), Duration::seconds(90));
        assert_eq!(segmenter.current().unwrap().start, at(90));
    }

    #[test]
    fn title_comparison_is_exact() {
        let mut segmenter = segmenter();
        segmenter.observe(window("code", "main.rs"), at(0));
        assert!(segmenter.observe(window("code", "Main.rs"), at(3)).is_some());
        assert!(segmenter.observe(window("code", "Main.rs "), at(6)).is_some());
    }

    #[test]
    fn short_sessions_are_dropped() {
        let mut segmenter = segmenter();
        segmenter.observe(window("code", "main.rs"), at(0));
        let closed = segmenter.observe(
            window("notepad", "untitled - Notepad"),
            at(0) + Duration::milliseconds(900),
        );
        assert_eq!(closed, None);
        assert_eq!(&*segmenter.current().unwrap().process_name, "notepad");
    }

    #[test]
    fn flush_returns_to_idle() {
        let mut segmenter = segmenter();
        assert_eq!(segmenter.flush(at(0)), None);

        segmenter.observe(window("code", "main.rs"), at(0));
        let closed = segmenter.flush(at(4)).unwrap();
        assert_eq!(closed.duration(), Duration::seconds(4));
        assert!(segmenter.current().is_none());

        segmenter.observe(window("code", "main.rs"), at(10));
        assert_eq!(segmenter.flush(at(10)), None);
    }

    #[test]
    fn nameless_processes_are_not_recorded() {
        let mut segmenter = segmenter();
        segmenter.observe(window("", "desktop"), at(0));
        assert_eq!(segmenter.observe(window("code", "main.rs"), at(10)), None);
    }

    #[test]
    fn one_record_per_run() {
        // Runs of (window, seconds held).
        let runs = [("a", 3), ("b", 1), ("a", 7), ("c", 2), ("c", 0)];
        let mut segmenter = segmenter();
        let mut closed = vec![];
        let mut time = 0;
        for (name, held) in runs {
            for offset in 0..=held {
                closed.extend(segmenter.observe(window(name, name), at(time + offset)));
            }
            time += held + 1;
        }
        closed.extend(segmenter.flush(at(time)));

        let durations = closed
            .iter()
            .map(|v| (v.session.process_name.to_string(), v.duration().num_seconds()))
            .collect::<Vec<_>>();
        assert_eq!(
            durations,
            vec![
                ("a".to_string(), 4),
                ("b".to_string(), 2),
                ("a".to_string(), 8),
                ("c".to_string(), 4),
            ]
        );
    }
}
