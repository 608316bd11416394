//! Synthetic event data for swipe landing page analytics.
//!
//! This crate fabricates realistic multi-page session telemetry (page views,
//! clicks, conversions, form funnels, A/B assignments) for a swipe-style
//! landing page, shaped by named business scenarios: a healthy funnel, a
//! leaky one, a mobile-specific degradation. The output is one wide,
//! fixed-schema event table that dashboards and aggregation code can consume
//! directly or via Arrow/Parquet.
//!
//! # Key properties
//!
//! - **Deterministic**: same seed, same table, byte for byte
//! - **Scenario-driven**: every tunable lives in a serializable
//!   [`ScenarioConfig`]; named scenarios are overrides on one baseline
//! - **Coherent by construction**: converting sessions traverse every
//!   planned page, timestamps are monotone within a session, and the
//!   session-duration column is backfilled from the final table
//!
//! # Quick start
//!
//! ```rust
//! use swipe_datagen::{EventGenerator, GeneratorConfig, ScenarioRegistry};
//!
//! let registry = ScenarioRegistry::builtin();
//! let config = GeneratorConfig::new("baseline").days(7).seed(42);
//! let table = EventGenerator::new(config, &registry).unwrap().generate();
//!
//! println!("{}", table.summary());
//! ```
//!
//! # Custom scenarios
//!
//! ```rust
//! use swipe_datagen::{ScenarioOverrides, ScenarioRegistry};
//!
//! let mut registry = ScenarioRegistry::builtin();
//! registry.register(
//!     "flash-sale",
//!     ScenarioOverrides {
//!         sessions_per_day: Some((2000, 3000)),
//!         cvr_multiplier: Some(1.5),
//!         ..Default::default()
//!     },
//! );
//! ```
//!
//! # Arrow output
//!
//! ```rust
//! use swipe_datagen::{output, EventGenerator, GeneratorConfig, ScenarioRegistry};
//!
//! let registry = ScenarioRegistry::builtin();
//! let config = GeneratorConfig::new("baseline").days(2).seed(42);
//! let table = EventGenerator::new(config, &registry).unwrap().generate();
//!
//! let batch = output::events_to_batch(&table);
//! assert_eq!(batch.num_rows(), table.len());
//! ```

pub mod anomaly;
pub mod error;
pub mod events;
pub mod generator;
pub mod output;
pub mod presets;
pub mod scenario;
pub mod session;
pub mod table;

// Re-export main types for convenience
pub use anomaly::AnomalyKind;
pub use error::ScenarioError;
pub use generator::{EventGenerator, GeneratorConfig};
pub use scenario::{
    Channel, DeviceType, PageCountModel, ScenarioConfig, ScenarioOverrides, ScenarioRegistry,
};
pub use session::{Difficulty, ProgressionOutcome, SessionGenerator, SessionPlan};
pub use table::{EventName, EventRecord, EventTable, TableSummary};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_end_to_end() {
        let registry = ScenarioRegistry::builtin();
        let config = GeneratorConfig::new("baseline").days(3).seed(12345);
        let table = EventGenerator::new(config, &registry).unwrap().generate();

        assert!(!table.is_empty());
        let summary = table.summary();
        assert!(summary.sessions > 0);
        assert!(summary.events >= summary.sessions);

        let batch = output::events_to_batch(&table);
        assert_eq!(batch.num_rows(), table.len());
        assert_eq!(batch.num_columns(), EventTable::COLUMNS.len());
    }

    #[test]
    fn test_conversions_follow_their_pages() {
        let registry = ScenarioRegistry::builtin();
        let config = GeneratorConfig::new("baseline")
            .days(3)
            .target_cvr(0.3)
            .seed(9);
        let table = EventGenerator::new(config, &registry).unwrap().generate();

        let mut last_page_ts: HashMap<&str, chrono::DateTime<chrono::Utc>> = HashMap::new();
        for event in &table.events {
            if event.event_name.is_page_event() {
                let entry = last_page_ts
                    .entry(&event.session_id)
                    .or_insert(event.event_timestamp);
                *entry = (*entry).max(event.event_timestamp);
            }
        }

        let mut conversions_per_session: HashMap<&str, usize> = HashMap::new();
        for event in &table.events {
            if event.event_name == EventName::Conversion {
                *conversions_per_session.entry(&event.session_id).or_insert(0) += 1;
                assert!(
                    event.event_timestamp > last_page_ts[event.session_id.as_str()],
                    "conversion at or before a page view in {}",
                    event.session_id
                );
            }
        }
        assert!(!conversions_per_session.is_empty());
        for (session, count) in conversions_per_session {
            assert_eq!(count, 1, "session {} has {} conversions", session, count);
        }
    }

    #[test]
    fn test_empirical_cvr_near_target() {
        let registry = ScenarioRegistry::builtin();
        // ~30 days x 300-500 sessions: comfortably past 10k sessions.
        let config = GeneratorConfig::new("baseline")
            .days(30)
            .target_cvr(0.04)
            .seed(42);
        let table = EventGenerator::new(config, &registry).unwrap().generate();

        let summary = table.summary();
        assert!(summary.sessions > 10_000);

        // Expected CVR is the target times the average device (~0.955) and
        // channel (~1.035) coefficients; the band below absorbs both the
        // multipliers and sampling noise.
        assert!(
            (0.030..=0.050).contains(&summary.conversion_rate),
            "empirical CVR {} outside tolerance band",
            summary.conversion_rate
        );
    }

    #[test]
    fn test_high_exit_scenario_fv_rate() {
        let mut registry = ScenarioRegistry::builtin();
        // Low engagement, high exit: 70% first-view exit with near-certain
        // continuation afterwards, so first-view exits dominate max_page == 1.
        registry.register(
            "low-engagement",
            ScenarioOverrides {
                sessions_per_day: Some((1000, 1000)),
                fv_exit_rate: Some(0.70),
                transition_mean: Some(0.98),
                transition_sd: Some(0.01),
                bottleneck_pages: Some(Default::default()),
                cvr_multiplier: Some(0.0),
                ..Default::default()
            },
        );

        let config = GeneratorConfig::new("low-engagement").days(3).seed(42);
        let table = EventGenerator::new(config, &registry).unwrap().generate();

        let summary = table.summary();
        assert!(summary.sessions > 2000);
        assert!(
            (0.65..=0.75).contains(&summary.fv_exit_rate),
            "fv exit rate {} outside 70% +/- 5pp",
            summary.fv_exit_rate
        );
    }

    #[test]
    fn test_unknown_scenario_matches_default() {
        let registry = ScenarioRegistry::builtin();
        let unknown = EventGenerator::new(
            GeneratorConfig::new("definitely-not-registered").days(2).seed(42),
            &registry,
        )
        .unwrap()
        .generate();
        let default = EventGenerator::new(
            GeneratorConfig::new("baseline").days(2).seed(42),
            &registry,
        )
        .unwrap()
        .generate();

        // Same resolved configuration and same seed: the tables agree row
        // for row, not just structurally.
        assert_eq!(unknown.len(), default.len());
        for (a, b) in unknown.events.iter().zip(default.events.iter()) {
            assert_eq!(a.session_id, b.session_id);
            assert_eq!(a.event_timestamp, b.event_timestamp);
            assert_eq!(a.event_name, b.event_name);
        }
    }

    #[test]
    fn test_session_rows_agree_on_reach() {
        let registry = ScenarioRegistry::builtin();
        let config = GeneratorConfig::new("leaky-funnel").days(2).seed(42);
        let table = EventGenerator::new(config, &registry).unwrap().generate();

        let mut reach: HashMap<&str, (i32, i32)> = HashMap::new();
        for event in &table.events {
            let entry = reach
                .entry(&event.session_id)
                .or_insert((event.max_page_reached, event.total_pages));
            assert_eq!(entry.0, event.max_page_reached);
            assert_eq!(entry.1, event.total_pages);
        }
    }
}
