//! The output table: one wide row per event.
//!
//! Downstream aggregation code indexes columns by name, so the column set is
//! part of the contract: every row carries every column, with `None` for the
//! fields owned by other event types, and an empty table still has the full
//! schema (see [`crate::output::events_schema`]).

use crate::scenario::DeviceType;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Event vocabulary of the swipe landing page tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    SessionStart,
    PageView,
    Click,
    FormStart,
    FormProgress,
    Conversion,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::SessionStart => "session_start",
            EventName::PageView => "page_view",
            EventName::Click => "click",
            EventName::FormStart => "form_start",
            EventName::FormProgress => "form_progress",
            EventName::Conversion => "conversion",
        }
    }

    /// Whether this event represents a page dwell (carries a real stay time).
    pub fn is_page_event(&self) -> bool {
        matches!(self, EventName::SessionStart | EventName::PageView)
    }
}

/// Swipe direction of a page transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

/// Conversion classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvType {
    Primary,
    Micro,
}

impl CvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CvType::Primary => "primary",
            CvType::Micro => "micro",
        }
    }
}

/// A/B assignment of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbVariant {
    A,
    B,
}

impl AbVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbVariant::A => "A",
            AbVariant::B => "B",
        }
    }
}

/// What the running A/B test is exercising, when one is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbTestTarget {
    HeroImage,
    CtaButton,
    Headline,
    Layout,
}

impl AbTestTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbTestTarget::HeroImage => "hero_image",
            AbTestTarget::CtaButton => "cta_button",
            AbTestTarget::Headline => "headline",
            AbTestTarget::Layout => "layout",
        }
    }
}

/// One event row. Field order matches [`EventTable::COLUMNS`].
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_date: NaiveDate,
    pub event_timestamp: DateTime<Utc>,
    pub event_name: EventName,
    pub user_pseudo_id: String,
    pub ga_session_id: i64,
    pub ga_session_number: i32,
    pub session_id: String,
    pub page_location: String,
    /// Only set on a session's first event.
    pub page_referrer: Option<&'static str>,
    pub page_path: String,
    pub page_num_dom: i32,
    pub stay_ms: i64,
    pub load_time_ms: i64,
    /// Backfilled by [`EventTable::backfill_total_duration`]; zero until then.
    pub total_duration_ms: i64,
    pub max_page_reached: i32,
    pub total_pages: i32,
    pub scroll_pct: f64,
    pub utm_source: &'static str,
    pub utm_medium: &'static str,
    pub utm_campaign: Option<&'static str>,
    pub utm_content: Option<String>,
    pub device_type: DeviceType,
    pub direction: Direction,
    pub ab_variant: AbVariant,
    pub ab_test_target: Option<AbTestTarget>,
    pub cv_type: Option<CvType>,
    pub cv_value: Option<i64>,
    pub value: Option<i64>,
    pub form_page_number: Option<i32>,
    pub form_duration_ms: Option<i64>,
    pub form_direction: Option<Direction>,
    pub click_x_rel: Option<f64>,
    pub click_y_rel: Option<f64>,
    pub elem_tag: Option<&'static str>,
    pub elem_id: Option<&'static str>,
    pub elem_classes: Option<&'static str>,
    /// Carried for schema stability; this tracker never populates it.
    pub link_url: Option<String>,
    /// Carried for schema stability; this tracker never populates it.
    pub video_src: Option<String>,
}

/// The assembled table of all sessions' events.
#[derive(Debug, Default)]
pub struct EventTable {
    pub events: Vec<EventRecord>,
}

impl EventTable {
    /// The fixed output column set, in order.
    pub const COLUMNS: [&'static str; 38] = [
        "event_date",
        "event_timestamp",
        "event_name",
        "user_pseudo_id",
        "ga_session_id",
        "ga_session_number",
        "session_id",
        "page_location",
        "page_referrer",
        "page_path",
        "page_num_dom",
        "stay_ms",
        "load_time_ms",
        "total_duration_ms",
        "max_page_reached",
        "total_pages",
        "scroll_pct",
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_content",
        "device_type",
        "direction",
        "ab_variant",
        "ab_test_target",
        "cv_type",
        "cv_value",
        "value",
        "form_page_number",
        "form_duration_ms",
        "form_direction",
        "click_x_rel",
        "click_y_rel",
        "elem_tag",
        "elem_id",
        "elem_classes",
        "link_url",
        "video_src",
    ];

    pub fn new(events: Vec<EventRecord>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Global chronological sort.
    pub fn sort_by_timestamp(&mut self) {
        self.events.sort_by_key(|e| e.event_timestamp);
    }

    /// Set `total_duration_ms` on every row to the span between its
    /// session's first and last event.
    pub fn backfill_total_duration(&mut self) {
        let mut spans: HashMap<String, (i64, i64)> = HashMap::new();
        for event in &self.events {
            let ts = event.event_timestamp.timestamp_millis();
            spans
                .entry(event.session_id.clone())
                .and_modify(|(min, max)| {
                    *min = (*min).min(ts);
                    *max = (*max).max(ts);
                })
                .or_insert((ts, ts));
        }

        for event in &mut self.events {
            let (min, max) = spans[&event.session_id];
            event.total_duration_ms = max - min;
        }
    }

    /// Aggregate statistics over the table. Every rate guards its
    /// denominator, so an empty table yields zeros rather than NaN.
    pub fn summary(&self) -> TableSummary {
        let mut sessions: HashSet<&str> = HashSet::new();
        let mut fv_exit_sessions: HashSet<&str> = HashSet::new();
        let mut conversions = 0usize;
        let mut stay_total: i64 = 0;
        let mut stay_count = 0usize;

        for event in &self.events {
            sessions.insert(&event.session_id);
            if event.max_page_reached == 1 {
                fv_exit_sessions.insert(&event.session_id);
            }
            if event.event_name == EventName::Conversion {
                conversions += 1;
            }
            if event.event_name.is_page_event() {
                stay_total += event.stay_ms;
                stay_count += 1;
            }
        }

        let session_count = sessions.len();
        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        TableSummary {
            events: self.events.len(),
            sessions: session_count,
            conversions,
            conversion_rate: ratio(conversions, session_count),
            fv_exit_rate: ratio(fv_exit_sessions.len(), session_count),
            avg_stay_ms: if stay_count == 0 {
                0.0
            } else {
                stay_total as f64 / stay_count as f64
            },
        }
    }
}

/// Headline numbers for a generated table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSummary {
    pub events: usize,
    pub sessions: usize,
    pub conversions: usize,
    pub conversion_rate: f64,
    pub fv_exit_rate: f64,
    pub avg_stay_ms: f64,
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events across {} sessions, {} conversions (CVR {:.2}%), FV exit {:.1}%, avg stay {:.0} ms",
            self.events,
            self.sessions,
            self.conversions,
            self.conversion_rate * 100.0,
            self.fv_exit_rate * 100.0,
            self.avg_stay_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(session: &str, offset_ms: i64, name: EventName) -> EventRecord {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        EventRecord {
            event_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            event_timestamp: base + Duration::milliseconds(offset_ms),
            event_name: name,
            user_pseudo_id: "user_000001".to_string(),
            ga_session_id: 1234567890,
            ga_session_number: 1,
            session_id: session.to_string(),
            page_location: "https://lp.example.com/swipe/index.html#page-1".to_string(),
            page_referrer: None,
            page_path: "/swipe/index.html#page-1".to_string(),
            page_num_dom: 1,
            stay_ms: 2000,
            load_time_ms: 300,
            total_duration_ms: 0,
            max_page_reached: 1,
            total_pages: 10,
            scroll_pct: 0.5,
            utm_source: "google",
            utm_medium: "organic",
            utm_campaign: None,
            utm_content: None,
            device_type: DeviceType::Mobile,
            direction: Direction::Forward,
            ab_variant: AbVariant::A,
            ab_test_target: None,
            cv_type: None,
            cv_value: None,
            value: None,
            form_page_number: None,
            form_duration_ms: None,
            form_direction: None,
            click_x_rel: None,
            click_y_rel: None,
            elem_tag: None,
            elem_id: None,
            elem_classes: None,
            link_url: None,
            video_src: None,
        }
    }

    #[test]
    fn test_sort_by_timestamp() {
        let mut table = EventTable::new(vec![
            record("s1", 5000, EventName::PageView),
            record("s2", 1000, EventName::SessionStart),
            record("s1", 0, EventName::SessionStart),
        ]);
        table.sort_by_timestamp();

        let offsets: Vec<i64> = table
            .events
            .iter()
            .map(|e| e.event_timestamp.timestamp_millis())
            .collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn test_backfill_total_duration() {
        let mut table = EventTable::new(vec![
            record("s1", 0, EventName::SessionStart),
            record("s1", 4000, EventName::PageView),
            record("s1", 9500, EventName::Conversion),
            record("s2", 100, EventName::SessionStart),
        ]);
        table.backfill_total_duration();

        for event in &table.events {
            match event.session_id.as_str() {
                "s1" => assert_eq!(event.total_duration_ms, 9500),
                "s2" => assert_eq!(event.total_duration_ms, 0),
                other => panic!("unexpected session {}", other),
            }
        }
    }

    #[test]
    fn test_backfill_matches_span_per_session() {
        let mut table = EventTable::new(vec![
            record("s1", 200, EventName::SessionStart),
            record("s1", 7300, EventName::PageView),
            record("s1", 3100, EventName::Click),
        ]);
        table.sort_by_timestamp();
        table.backfill_total_duration();

        let min = table
            .events
            .iter()
            .map(|e| e.event_timestamp.timestamp_millis())
            .min()
            .unwrap();
        let max = table
            .events
            .iter()
            .map(|e| e.event_timestamp.timestamp_millis())
            .max()
            .unwrap();
        for event in &table.events {
            assert_eq!(event.total_duration_ms, max - min);
        }
    }

    #[test]
    fn test_summary_guards_zero_denominators() {
        let summary = EventTable::empty().summary();
        assert_eq!(summary.events, 0);
        assert_eq!(summary.sessions, 0);
        assert_eq!(summary.conversion_rate, 0.0);
        assert_eq!(summary.fv_exit_rate, 0.0);
        assert_eq!(summary.avg_stay_ms, 0.0);
    }

    #[test]
    fn test_summary_counts() {
        let mut cv = record("s1", 9000, EventName::Conversion);
        cv.cv_type = Some(CvType::Primary);
        let table = EventTable::new(vec![
            record("s1", 0, EventName::SessionStart),
            record("s1", 4000, EventName::PageView),
            cv,
            record("s2", 0, EventName::SessionStart),
        ]);

        let summary = table.summary();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.conversions, 1);
        assert_eq!(summary.conversion_rate, 0.5);
        assert_eq!(summary.avg_stay_ms, 2000.0);
    }
}
