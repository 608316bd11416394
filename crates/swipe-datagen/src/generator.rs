//! The generation entry point: resolve a scenario, iterate days and
//! sessions, materialize events, assemble the table.

use crate::error::ScenarioError;
use crate::events::materialize_session;
use crate::scenario::{PageCountModel, ScenarioConfig, ScenarioRegistry};
use crate::session::{Difficulty, SessionGenerator};
use crate::table::EventTable;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Inputs of one generation run.
///
/// # Example
/// ```
/// use swipe_datagen::GeneratorConfig;
///
/// let config = GeneratorConfig::new("baseline")
///     .days(30)
///     .target_cvr(0.04)
///     .seed(42);
/// assert_eq!(config.num_days, 30);
/// ```
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Scenario name; unknown names fall back to the registry default.
    pub scenario: String,
    pub num_days: u32,
    /// Fallback page count when the scenario has no page-count model.
    pub nominal_pages: u32,
    pub target_cvr: f64,
    pub difficulty: Difficulty,
    pub start_date: NaiveDate,
    /// Master seed; the generator never seeds itself from the OS.
    pub seed: u64,
}

impl GeneratorConfig {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            num_days: 30,
            nominal_pages: 10,
            target_cvr: 0.04,
            difficulty: Difficulty::default(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            seed: 42,
        }
    }

    pub fn days(mut self, num_days: u32) -> Self {
        self.num_days = num_days;
        self
    }

    pub fn nominal_pages(mut self, pages: u32) -> Self {
        self.nominal_pages = pages;
        self
    }

    pub fn target_cvr(mut self, cvr: f64) -> Self {
        self.target_cvr = cvr;
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new("baseline")
    }
}

/// Generates one [`EventTable`] per invocation. Construction resolves and
/// validates the scenario; generation itself cannot fail.
pub struct EventGenerator {
    scenario: ScenarioConfig,
    config: GeneratorConfig,
}

impl EventGenerator {
    pub fn new(
        config: GeneratorConfig,
        registry: &ScenarioRegistry,
    ) -> Result<Self, ScenarioError> {
        if config.nominal_pages == 0 {
            return Err(ScenarioError::InvalidParameter {
                field: "nominal_pages",
                value: 0.0,
                reason: "page count must be at least 1",
            });
        }
        if !(0.0..=1.0).contains(&config.target_cvr) {
            return Err(ScenarioError::InvalidParameter {
                field: "target_cvr",
                value: config.target_cvr,
                reason: "must be a probability in [0, 1]",
            });
        }

        let scenario = registry.resolve(&config.scenario)?;
        Ok(Self { scenario, config })
    }

    /// The resolved scenario this generator runs with.
    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run the simulation and assemble the table: day loop, per-session
    /// materialization, global sort, duration backfill.
    pub fn generate(&self) -> EventTable {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let page_model = self.scenario.page_count.unwrap_or(PageCountModel::Fixed {
            pages: self.config.nominal_pages,
        });
        let sessions = SessionGenerator::new(
            &self.scenario,
            self.config.target_cvr,
            self.config.difficulty,
            page_model,
            self.config.num_days,
            self.config.start_date,
        );

        let mut events = Vec::new();
        for day_index in 0..self.config.num_days {
            let day = sessions.day_context(day_index, &mut rng);
            for _ in 0..day.session_count {
                let plan = sessions.plan_session(&day, &mut rng);
                materialize_session(&plan, &self.scenario, &mut rng, &mut events);
            }
        }

        let mut table = EventTable::new(events);
        table.sort_by_timestamp();
        table.backfill_total_duration();
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioOverrides;
    use crate::table::EventName;
    use std::collections::HashMap;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig::new("baseline").days(3).seed(42)
    }

    #[test]
    fn test_zero_days_yields_empty_table() {
        let registry = ScenarioRegistry::builtin();
        let generator =
            EventGenerator::new(GeneratorConfig::new("baseline").days(0), &registry).unwrap();
        let table = generator.generate();
        assert!(table.is_empty());
    }

    #[test]
    fn test_zero_volume_yields_empty_table() {
        let mut registry = ScenarioRegistry::builtin();
        registry.register(
            "silent",
            ScenarioOverrides {
                sessions_per_day: Some((0, 0)),
                ..Default::default()
            },
        );
        let generator =
            EventGenerator::new(GeneratorConfig::new("silent").days(5), &registry).unwrap();
        let table = generator.generate();
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_nominal_pages_rejected() {
        let registry = ScenarioRegistry::builtin();
        let result =
            EventGenerator::new(GeneratorConfig::new("baseline").nominal_pages(0), &registry);
        assert!(result.is_err());
    }

    #[test]
    fn test_generated_table_is_sorted_and_backfilled() {
        let registry = ScenarioRegistry::builtin();
        let generator = EventGenerator::new(small_config(), &registry).unwrap();
        let table = generator.generate();
        assert!(!table.is_empty());

        for window in table.events.windows(2) {
            assert!(window[0].event_timestamp <= window[1].event_timestamp);
        }

        // total_duration_ms equals the span of each session and is identical
        // across the session's rows.
        let mut spans: HashMap<&str, (i64, i64)> = HashMap::new();
        for event in &table.events {
            let ts = event.event_timestamp.timestamp_millis();
            spans
                .entry(&event.session_id)
                .and_modify(|(min, max)| {
                    *min = (*min).min(ts);
                    *max = (*max).max(ts);
                })
                .or_insert((ts, ts));
        }
        for event in &table.events {
            let (min, max) = spans[event.session_id.as_str()];
            assert_eq!(event.total_duration_ms, max - min);
        }
    }

    #[test]
    fn test_same_seed_same_table() {
        let registry = ScenarioRegistry::builtin();
        let table1 = EventGenerator::new(small_config(), &registry)
            .unwrap()
            .generate();
        let table2 = EventGenerator::new(small_config(), &registry)
            .unwrap()
            .generate();

        assert_eq!(table1.len(), table2.len());
        for (a, b) in table1.events.iter().zip(table2.events.iter()) {
            assert_eq!(a.session_id, b.session_id);
            assert_eq!(a.event_timestamp, b.event_timestamp);
            assert_eq!(a.event_name, b.event_name);
            assert_eq!(a.stay_ms, b.stay_ms);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let registry = ScenarioRegistry::builtin();
        let table1 = EventGenerator::new(small_config(), &registry)
            .unwrap()
            .generate();
        let table2 = EventGenerator::new(small_config().seed(43), &registry)
            .unwrap()
            .generate();

        let differs = table1.len() != table2.len()
            || table1
                .events
                .iter()
                .zip(table2.events.iter())
                .any(|(a, b)| a.session_id != b.session_id);
        assert!(differs);
    }

    #[test]
    fn test_forced_conversion_always_converts() {
        // Saturate the session-level probability: even the smallest
        // device/channel/day multiplier combination stays at or above 1.0.
        let mut registry = ScenarioRegistry::builtin();
        registry.register(
            "always-converts",
            ScenarioOverrides {
                cvr_multiplier: Some(50.0),
                ..Default::default()
            },
        );
        let generator = EventGenerator::new(
            GeneratorConfig::new("always-converts")
                .days(2)
                .target_cvr(1.0)
                .seed(7),
            &registry,
        )
        .unwrap();
        let table = generator.generate();

        let mut sessions: HashMap<&str, (bool, i32, i32)> = HashMap::new();
        for event in &table.events {
            let entry = sessions
                .entry(&event.session_id)
                .or_insert((false, event.max_page_reached, event.total_pages));
            if event.event_name == EventName::Conversion {
                entry.0 = true;
            }
        }

        assert!(!sessions.is_empty());
        for (session, (converted, max_page, total_pages)) in sessions {
            assert!(converted, "session {} did not convert", session);
            assert_eq!(max_page, total_pages, "session {} stopped early", session);
        }
    }
}
