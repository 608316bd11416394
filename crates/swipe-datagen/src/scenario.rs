//! Scenario model: the fully-populated generative configuration, partial
//! overrides, and the registry that resolves one from the other.
//!
//! Every tunable the generator reads lives on [`ScenarioConfig`], and every
//! default lives in exactly one place: [`ScenarioConfig::baseline`]. A named
//! scenario is stored as a [`ScenarioOverrides`] value and resolved by merging
//! it field-by-field onto a fresh baseline, so a resolved configuration is
//! always complete.

use crate::error::ScenarioError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Device categories sessions are attributed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Desktop,
    Tablet,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Desktop => "desktop",
            DeviceType::Tablet => "tablet",
        }
    }
}

/// Marketing channels sessions arrive through.
///
/// Channels drive attribution (UTM fields, referrer) and carry cvr/stay
/// coefficients; the channel itself is not an output column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    OrganicSearch,
    PaidSearch,
    PaidSocial,
    Direct,
    Referral,
    Other,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::OrganicSearch => "Organic Search",
            Channel::PaidSearch => "Paid Search",
            Channel::PaidSocial => "Paid Social",
            Channel::Direct => "Direct",
            Channel::Referral => "Referral",
            Channel::Other => "Other",
        }
    }
}

/// Per-device multipliers on conversion rate, stay time and load time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCoeff {
    pub cvr: f64,
    pub stay: f64,
    pub load: f64,
}

impl Default for DeviceCoeff {
    fn default() -> Self {
        Self {
            cvr: 1.0,
            stay: 1.0,
            load: 1.0,
        }
    }
}

/// Per-channel multipliers on conversion rate and stay time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelCoeff {
    pub cvr: f64,
    pub stay: f64,
}

impl Default for ChannelCoeff {
    fn default() -> Self {
        Self { cvr: 1.0, stay: 1.0 }
    }
}

/// How many pages a session plans to traverse.
///
/// A tagged value rather than a sampling closure, so scenario files stay
/// serializable and inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageCountModel {
    Fixed { pages: u32 },
    UniformRange { min: u32, max: u32 },
}

impl PageCountModel {
    /// Draw a page count for one session.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> u32 {
        match *self {
            PageCountModel::Fixed { pages } => pages,
            PageCountModel::UniformRange { min, max } => rng.gen_range(min..=max),
        }
    }
}

/// A fully-resolved scenario: every field the generator reads, populated.
///
/// Produced only by merging [`ScenarioOverrides`] onto
/// [`ScenarioConfig::baseline`]; construct one through a
/// [`ScenarioRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub description: String,

    // Volume and funnel shape
    pub sessions_per_day: (u32, u32),
    pub fv_exit_rate: f64,
    pub transition_mean: f64,
    pub transition_sd: f64,
    /// Clamp bounds for the per-page continuation probability.
    pub transition_clamp: (f64, f64),
    /// Extra drop probability per page index (1-based).
    pub bottleneck_pages: BTreeMap<u32, f64>,

    // Conversion and interaction
    pub cta_click_rate: f64,
    pub cvr_multiplier: f64,
    /// Additive uplift on the stay-time location parameter for converting
    /// sessions, in log-seconds.
    pub conversion_stay_uplift: f64,
    pub conversion_value_range: (u32, u32),
    /// Fraction of converting sessions that also emit a form funnel.
    pub form_funnel_rate: f64,
    pub form_steps: (u32, u32),

    // Dwell and navigation
    /// Location parameter of the stay-time log-normal, in log-seconds.
    pub stay_time_mu: f64,
    pub stay_time_sigma: f64,
    pub min_stay_ms: f64,
    pub backflow_rate: f64,
    pub backflow_stay_bonus: f64,
    pub info_jump_pages: BTreeSet<u32>,
    pub info_jump_backflow_bonus: f64,
    pub rich_content_pages: BTreeSet<u32>,
    pub rich_content_stay_factor: f64,

    // Click targets beyond the CTA
    pub banner_click_bonus: f64,
    pub exit_pop_click_bonus: f64,

    // Load time (gamma)
    pub load_time_shape: f64,
    pub load_time_scale_ms: f64,
    pub min_load_ms: f64,

    // Audience mix
    pub device_mix: Vec<(DeviceType, f64)>,
    pub device_coeff: BTreeMap<DeviceType, DeviceCoeff>,
    pub channel_mix: Vec<(Channel, f64)>,
    pub channel_coeff: BTreeMap<Channel, ChannelCoeff>,

    // Seasonality
    pub hour_seasonality: [f64; 24],
    /// Indexed Monday..Sunday.
    pub weekday_seasonality: [f64; 7],

    /// Page-count model; `None` defers to the generator's nominal page count.
    pub page_count: Option<PageCountModel>,

    // Landing page identity
    pub page_url_base: String,
    pub page_path_base: String,
}

impl ScenarioConfig {
    /// The single source of defaults. Field values match a mid-funnel
    /// landing page with an ordinary audience mix.
    pub fn baseline() -> Self {
        let mut hour_seasonality = [1.0; 24];
        // Lunch and evening peaks.
        hour_seasonality[12] = 1.2;
        hour_seasonality[20] = 1.3;
        hour_seasonality[21] = 1.3;
        hour_seasonality[22] = 1.2;
        hour_seasonality[23] = 1.1;

        // Weekends run hot, Friday runs cold.
        let weekday_seasonality = [1.0, 1.0, 1.0, 1.0, 0.9, 1.1, 1.1];

        Self {
            description: "Standard performance".to_string(),
            sessions_per_day: (300, 500),
            fv_exit_rate: 0.35,
            transition_mean: 0.92,
            transition_sd: 0.03,
            transition_clamp: (0.05, 0.99),
            bottleneck_pages: BTreeMap::from([(4, 0.2)]),
            cta_click_rate: 0.12,
            cvr_multiplier: 1.0,
            conversion_stay_uplift: 0.5,
            conversion_value_range: (1000, 10_000),
            form_funnel_rate: 0.4,
            form_steps: (2, 4),
            stay_time_mu: 3.0,
            stay_time_sigma: 0.6,
            min_stay_ms: 1000.0,
            backflow_rate: 0.05,
            backflow_stay_bonus: 0.3,
            info_jump_pages: BTreeSet::from([2, 9]),
            info_jump_backflow_bonus: 0.6,
            rich_content_pages: BTreeSet::from([1, 8]),
            rich_content_stay_factor: 1.5,
            banner_click_bonus: 0.1,
            exit_pop_click_bonus: 0.2,
            load_time_shape: 2.0,
            load_time_scale_ms: 300.0,
            min_load_ms: 100.0,
            device_mix: vec![
                (DeviceType::Mobile, 0.7),
                (DeviceType::Desktop, 0.25),
                (DeviceType::Tablet, 0.05),
            ],
            device_coeff: BTreeMap::from([
                (
                    DeviceType::Mobile,
                    DeviceCoeff {
                        cvr: 0.9,
                        stay: 0.9,
                        load: 1.1,
                    },
                ),
                (
                    DeviceType::Desktop,
                    DeviceCoeff {
                        cvr: 1.1,
                        stay: 1.1,
                        load: 0.9,
                    },
                ),
                (DeviceType::Tablet, DeviceCoeff::default()),
            ]),
            channel_mix: vec![
                (Channel::OrganicSearch, 0.35),
                (Channel::PaidSearch, 0.25),
                (Channel::PaidSocial, 0.20),
                (Channel::Direct, 0.10),
                (Channel::Referral, 0.05),
                (Channel::Other, 0.05),
            ],
            channel_coeff: BTreeMap::from([
                (Channel::PaidSearch, ChannelCoeff { cvr: 1.2, stay: 1.1 }),
                (Channel::PaidSocial, ChannelCoeff { cvr: 0.8, stay: 0.8 }),
                (Channel::OrganicSearch, ChannelCoeff { cvr: 1.1, stay: 1.2 }),
                (Channel::Direct, ChannelCoeff::default()),
                (Channel::Referral, ChannelCoeff { cvr: 1.1, stay: 1.1 }),
                (Channel::Other, ChannelCoeff { cvr: 0.7, stay: 0.8 }),
            ]),
            hour_seasonality,
            weekday_seasonality,
            page_count: None,
            page_url_base: "https://lp.example.com/swipe/index.html".to_string(),
            page_path_base: "/swipe/index.html".to_string(),
        }
    }

    /// Merge overrides onto this configuration. Named fields win wholesale;
    /// the seasonality maps patch individual slots.
    pub fn apply(&mut self, overrides: &ScenarioOverrides) -> Result<(), ScenarioError> {
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = &overrides.$field {
                    self.$field = v.clone();
                }
            };
        }

        take!(description);
        take!(sessions_per_day);
        take!(fv_exit_rate);
        take!(transition_mean);
        take!(transition_sd);
        take!(transition_clamp);
        take!(bottleneck_pages);
        take!(cta_click_rate);
        take!(cvr_multiplier);
        take!(conversion_stay_uplift);
        take!(conversion_value_range);
        take!(form_funnel_rate);
        take!(form_steps);
        take!(stay_time_mu);
        take!(stay_time_sigma);
        take!(min_stay_ms);
        take!(backflow_rate);
        take!(backflow_stay_bonus);
        take!(info_jump_pages);
        take!(info_jump_backflow_bonus);
        take!(rich_content_pages);
        take!(rich_content_stay_factor);
        take!(banner_click_bonus);
        take!(exit_pop_click_bonus);
        take!(load_time_shape);
        take!(load_time_scale_ms);
        take!(min_load_ms);
        take!(device_mix);
        take!(device_coeff);
        take!(channel_mix);
        take!(channel_coeff);
        take!(page_url_base);
        take!(page_path_base);

        if let Some(model) = overrides.page_count {
            self.page_count = Some(model);
        }

        if let Some(hours) = &overrides.hour_seasonality {
            for (&hour, &factor) in hours {
                if hour >= 24 {
                    return Err(ScenarioError::UnknownKey {
                        field: "hour_seasonality",
                        key: hour.to_string(),
                    });
                }
                self.hour_seasonality[hour as usize] = factor;
            }
        }

        if let Some(days) = &overrides.weekday_seasonality {
            for (name, &factor) in days {
                let idx = match name.to_lowercase().as_str() {
                    "mon" => 0,
                    "tue" => 1,
                    "wed" => 2,
                    "thu" => 3,
                    "fri" => 4,
                    "sat" => 5,
                    "sun" => 6,
                    _ => {
                        return Err(ScenarioError::UnknownKey {
                            field: "weekday_seasonality",
                            key: name.clone(),
                        })
                    }
                };
                self.weekday_seasonality[idx] = factor;
            }
        }

        Ok(())
    }

    /// Reject parameters the sampling distributions cannot accept.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        fn probability(
            field: &'static str,
            value: f64,
        ) -> Result<(), ScenarioError> {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScenarioError::InvalidParameter {
                    field,
                    value,
                    reason: "must be a probability in [0, 1]",
                });
            }
            Ok(())
        }

        fn positive(field: &'static str, value: f64) -> Result<(), ScenarioError> {
            if !(value > 0.0) {
                return Err(ScenarioError::InvalidParameter {
                    field,
                    value,
                    reason: "must be strictly positive",
                });
            }
            Ok(())
        }

        fn non_negative(field: &'static str, value: f64) -> Result<(), ScenarioError> {
            if !(value >= 0.0) {
                return Err(ScenarioError::InvalidParameter {
                    field,
                    value,
                    reason: "must be non-negative",
                });
            }
            Ok(())
        }

        fn weighted<T>(
            field: &'static str,
            entries: &[(T, f64)],
        ) -> Result<(), ScenarioError> {
            if entries.is_empty() {
                return Err(ScenarioError::EmptyDistribution { field });
            }
            let mut total = 0.0;
            for &(_, w) in entries {
                non_negative(field, w)?;
                total += w;
            }
            if total <= 0.0 {
                return Err(ScenarioError::EmptyDistribution { field });
            }
            Ok(())
        }

        let (lo, hi) = self.sessions_per_day;
        if lo > hi {
            return Err(ScenarioError::InvalidParameter {
                field: "sessions_per_day",
                value: lo as f64,
                reason: "range minimum exceeds maximum",
            });
        }

        probability("fv_exit_rate", self.fv_exit_rate)?;
        probability("cta_click_rate", self.cta_click_rate)?;
        probability("backflow_rate", self.backflow_rate)?;
        probability("form_funnel_rate", self.form_funnel_rate)?;
        non_negative("transition_sd", self.transition_sd)?;
        non_negative("stay_time_sigma", self.stay_time_sigma)?;
        non_negative("cvr_multiplier", self.cvr_multiplier)?;
        non_negative("backflow_stay_bonus", self.backflow_stay_bonus)?;
        non_negative("info_jump_backflow_bonus", self.info_jump_backflow_bonus)?;
        probability("banner_click_bonus", self.banner_click_bonus)?;
        probability("exit_pop_click_bonus", self.exit_pop_click_bonus)?;
        positive("load_time_shape", self.load_time_shape)?;
        positive("load_time_scale_ms", self.load_time_scale_ms)?;
        positive("min_load_ms", self.min_load_ms)?;
        positive("min_stay_ms", self.min_stay_ms)?;
        positive("rich_content_stay_factor", self.rich_content_stay_factor)?;

        let (clamp_lo, clamp_hi) = self.transition_clamp;
        probability("transition_clamp", clamp_lo)?;
        probability("transition_clamp", clamp_hi)?;
        if clamp_lo > clamp_hi {
            return Err(ScenarioError::InvalidParameter {
                field: "transition_clamp",
                value: clamp_lo,
                reason: "lower bound exceeds upper bound",
            });
        }

        for (&page, &penalty) in &self.bottleneck_pages {
            if page == 0 {
                return Err(ScenarioError::UnknownKey {
                    field: "bottleneck_pages",
                    key: page.to_string(),
                });
            }
            probability("bottleneck_pages", penalty)?;
        }

        weighted("device_mix", &self.device_mix)?;
        weighted("channel_mix", &self.channel_mix)?;

        for &factor in &self.hour_seasonality {
            non_negative("hour_seasonality", factor)?;
        }
        if self.hour_seasonality.iter().sum::<f64>() <= 0.0 {
            return Err(ScenarioError::EmptyDistribution {
                field: "hour_seasonality",
            });
        }
        for &factor in &self.weekday_seasonality {
            non_negative("weekday_seasonality", factor)?;
        }

        match self.page_count {
            Some(PageCountModel::Fixed { pages }) if pages == 0 => {
                return Err(ScenarioError::InvalidParameter {
                    field: "page_count",
                    value: 0.0,
                    reason: "page count must be at least 1",
                });
            }
            Some(PageCountModel::UniformRange { min, max }) if min == 0 || min > max => {
                return Err(ScenarioError::InvalidParameter {
                    field: "page_count",
                    value: min as f64,
                    reason: "range must satisfy 1 <= min <= max",
                });
            }
            _ => {}
        }

        let (cv_lo, cv_hi) = self.conversion_value_range;
        if cv_lo > cv_hi {
            return Err(ScenarioError::InvalidParameter {
                field: "conversion_value_range",
                value: cv_lo as f64,
                reason: "range minimum exceeds maximum",
            });
        }

        let (steps_lo, steps_hi) = self.form_steps;
        if steps_lo == 0 || steps_lo > steps_hi {
            return Err(ScenarioError::InvalidParameter {
                field: "form_steps",
                value: steps_lo as f64,
                reason: "range must satisfy 1 <= min <= max",
            });
        }

        Ok(())
    }

    /// Device coefficients, defaulting to neutral multipliers.
    pub fn device_coeff(&self, device: DeviceType) -> DeviceCoeff {
        self.device_coeff.get(&device).copied().unwrap_or_default()
    }

    /// Channel coefficients, defaulting to neutral multipliers.
    pub fn channel_coeff(&self, channel: Channel) -> ChannelCoeff {
        self.channel_coeff.get(&channel).copied().unwrap_or_default()
    }

    /// Seasonality factor for a calendar day.
    pub fn weekday_factor(&self, date: chrono::NaiveDate) -> f64 {
        use chrono::Datelike;
        self.weekday_seasonality[date.weekday().num_days_from_monday() as usize]
    }
}

/// A partial scenario: only the fields a named scenario wants to change.
///
/// Deserializable from YAML so callers can ship custom scenarios as data.
/// Seasonality overrides are sparse maps (`hour -> factor`,
/// `"mon".."sun" -> factor`) patched onto the baseline tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOverrides {
    pub description: Option<String>,
    pub sessions_per_day: Option<(u32, u32)>,
    pub fv_exit_rate: Option<f64>,
    pub transition_mean: Option<f64>,
    pub transition_sd: Option<f64>,
    pub transition_clamp: Option<(f64, f64)>,
    pub bottleneck_pages: Option<BTreeMap<u32, f64>>,
    pub cta_click_rate: Option<f64>,
    pub cvr_multiplier: Option<f64>,
    pub conversion_stay_uplift: Option<f64>,
    pub conversion_value_range: Option<(u32, u32)>,
    pub form_funnel_rate: Option<f64>,
    pub form_steps: Option<(u32, u32)>,
    pub stay_time_mu: Option<f64>,
    pub stay_time_sigma: Option<f64>,
    pub min_stay_ms: Option<f64>,
    pub backflow_rate: Option<f64>,
    pub backflow_stay_bonus: Option<f64>,
    pub info_jump_pages: Option<BTreeSet<u32>>,
    pub info_jump_backflow_bonus: Option<f64>,
    pub rich_content_pages: Option<BTreeSet<u32>>,
    pub rich_content_stay_factor: Option<f64>,
    pub banner_click_bonus: Option<f64>,
    pub exit_pop_click_bonus: Option<f64>,
    pub load_time_shape: Option<f64>,
    pub load_time_scale_ms: Option<f64>,
    pub min_load_ms: Option<f64>,
    pub device_mix: Option<Vec<(DeviceType, f64)>>,
    pub device_coeff: Option<BTreeMap<DeviceType, DeviceCoeff>>,
    pub channel_mix: Option<Vec<(Channel, f64)>>,
    pub channel_coeff: Option<BTreeMap<Channel, ChannelCoeff>>,
    pub hour_seasonality: Option<BTreeMap<u32, f64>>,
    pub weekday_seasonality: Option<BTreeMap<String, f64>>,
    pub page_count: Option<PageCountModel>,
    pub page_url_base: Option<String>,
    pub page_path_base: Option<String>,
}

/// Named scenarios and the fallback policy.
///
/// An explicit value rather than process-global state: callers that register
/// custom scenarios from multiple generation calls own the synchronization.
pub struct ScenarioRegistry {
    scenarios: HashMap<String, ScenarioOverrides>,
    default_name: String,
}

impl ScenarioRegistry {
    /// Registry seeded with the built-in scenarios from [`crate::presets`].
    pub fn builtin() -> Self {
        let mut registry = Self {
            scenarios: HashMap::new(),
            default_name: crate::presets::BASELINE.to_string(),
        };
        for (name, overrides) in crate::presets::builtin_scenarios() {
            registry.register(name, overrides);
        }
        registry
    }

    /// Name of the scenario unknown lookups fall back to.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered scenario names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scenarios.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register (or replace) a named scenario.
    pub fn register(&mut self, name: impl Into<String>, overrides: ScenarioOverrides) {
        self.scenarios.insert(name.into(), overrides);
    }

    /// Load a `name -> overrides` YAML document and register every entry.
    /// Returns the registered names.
    pub fn register_from_yaml(&mut self, path: &Path) -> Result<Vec<String>, ScenarioError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ScenarioError::ScenarioFile {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
        let entries: BTreeMap<String, ScenarioOverrides> = serde_yaml::from_str(&content)
            .map_err(|e| ScenarioError::ScenarioFile {
                path: path.to_path_buf(),
                source: e.into(),
            })?;

        let mut names = Vec::with_capacity(entries.len());
        for (name, overrides) in entries {
            names.push(name.clone());
            self.register(name, overrides);
        }
        Ok(names)
    }

    /// Resolve a name into a complete, validated configuration.
    ///
    /// Unknown names fall back to the default scenario; this never fails for
    /// a missing name, only for malformed override parameters.
    pub fn resolve(&self, name: &str) -> Result<ScenarioConfig, ScenarioError> {
        let overrides = self
            .scenarios
            .get(name)
            .or_else(|| self.scenarios.get(&self.default_name));

        let mut config = ScenarioConfig::baseline();
        if let Some(overrides) = overrides {
            config.apply(overrides)?;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_baseline_is_valid() {
        let config = ScenarioConfig::baseline();
        config.validate().unwrap();
    }

    #[test]
    fn test_builtin_scenarios_resolve() {
        let registry = ScenarioRegistry::builtin();
        for name in registry.names() {
            let config = registry.resolve(name).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_unknown_name_falls_back_to_default() {
        let registry = ScenarioRegistry::builtin();
        let fallback = registry.resolve("no-such-scenario").unwrap();
        let default = registry.resolve(registry.default_name()).unwrap();
        assert_eq!(fallback.sessions_per_day, default.sessions_per_day);
        assert_eq!(fallback.fv_exit_rate, default.fv_exit_rate);
        assert_eq!(fallback.page_count, default.page_count);
    }

    #[test]
    fn test_overrides_merge_not_replace() {
        let mut registry = ScenarioRegistry::builtin();
        registry.register(
            "custom",
            ScenarioOverrides {
                fv_exit_rate: Some(0.9),
                ..Default::default()
            },
        );

        let custom = registry.resolve("custom").unwrap();
        let baseline = ScenarioConfig::baseline();

        assert_eq!(custom.fv_exit_rate, 0.9);
        // Everything else passes through from the defaults.
        assert_eq!(custom.transition_mean, baseline.transition_mean);
        assert_eq!(custom.channel_mix, baseline.channel_mix);
        assert_eq!(custom.load_time_scale_ms, baseline.load_time_scale_ms);
    }

    #[test]
    fn test_seasonality_overrides_patch_slots() {
        let mut config = ScenarioConfig::baseline();
        let overrides = ScenarioOverrides {
            hour_seasonality: Some(BTreeMap::from([(3, 2.5)])),
            weekday_seasonality: Some(BTreeMap::from([("wed".to_string(), 0.5)])),
            ..Default::default()
        };
        config.apply(&overrides).unwrap();

        assert_eq!(config.hour_seasonality[3], 2.5);
        // Untouched slots keep their defaults.
        assert_eq!(config.hour_seasonality[12], 1.2);
        assert_eq!(config.weekday_seasonality[2], 0.5);
        assert_eq!(config.weekday_seasonality[5], 1.1);
    }

    #[test]
    fn test_bad_hour_key_is_rejected() {
        let mut config = ScenarioConfig::baseline();
        let overrides = ScenarioOverrides {
            hour_seasonality: Some(BTreeMap::from([(24, 1.5)])),
            ..Default::default()
        };
        assert!(matches!(
            config.apply(&overrides),
            Err(ScenarioError::UnknownKey { field: "hour_seasonality", .. })
        ));
    }

    #[test]
    fn test_invalid_gamma_scale_is_rejected() {
        let mut config = ScenarioConfig::baseline();
        config.load_time_scale_ms = -10.0;
        assert!(matches!(
            config.validate(),
            Err(ScenarioError::InvalidParameter { field: "load_time_scale_ms", .. })
        ));
    }

    #[test]
    fn test_empty_device_mix_is_rejected() {
        let mut config = ScenarioConfig::baseline();
        config.device_mix.clear();
        assert!(matches!(
            config.validate(),
            Err(ScenarioError::EmptyDistribution { field: "device_mix" })
        ));
    }

    #[test]
    fn test_page_count_model_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let fixed = PageCountModel::Fixed { pages: 10 };
        for _ in 0..20 {
            assert_eq!(fixed.sample(&mut rng), 10);
        }

        let range = PageCountModel::UniformRange { min: 8, max: 12 };
        for _ in 0..200 {
            let pages = range.sample(&mut rng);
            assert!((8..=12).contains(&pages));
        }
    }

    #[test]
    fn test_missing_coefficients_default_to_neutral() {
        let mut config = ScenarioConfig::baseline();
        config.device_coeff.clear();
        config.channel_coeff.clear();

        let dc = config.device_coeff(DeviceType::Mobile);
        assert_eq!(dc.cvr, 1.0);
        assert_eq!(dc.stay, 1.0);
        assert_eq!(dc.load, 1.0);

        let cc = config.channel_coeff(Channel::PaidSearch);
        assert_eq!(cc.cvr, 1.0);
        assert_eq!(cc.stay, 1.0);
    }

    #[test]
    fn test_overrides_yaml_round_trip() {
        let overrides = ScenarioOverrides {
            fv_exit_rate: Some(0.7),
            sessions_per_day: Some((800, 1200)),
            bottleneck_pages: Some(BTreeMap::from([(3, 0.6), (5, 0.5)])),
            page_count: Some(PageCountModel::UniformRange { min: 8, max: 12 }),
            device_mix: Some(vec![
                (DeviceType::Mobile, 0.9),
                (DeviceType::Desktop, 0.1),
            ]),
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&overrides).unwrap();
        let parsed: ScenarioOverrides = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.fv_exit_rate, Some(0.7));
        assert_eq!(parsed.sessions_per_day, Some((800, 1200)));
        assert_eq!(
            parsed.page_count,
            Some(PageCountModel::UniformRange { min: 8, max: 12 })
        );
        assert!(parsed.transition_mean.is_none());
    }

    #[test]
    fn test_register_from_yaml() {
        use std::io::Write;

        let yaml = r#"
flash-sale:
  description: Flash sale burst
  sessions_per_day: [2000, 3000]
  fv_exit_rate: 0.25
  cvr_multiplier: 1.5
  page_count:
    kind: fixed
    pages: 6
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let mut registry = ScenarioRegistry::builtin();
        let names = registry.register_from_yaml(file.path()).unwrap();
        assert_eq!(names, vec!["flash-sale".to_string()]);

        let config = registry.resolve("flash-sale").unwrap();
        assert_eq!(config.sessions_per_day, (2000, 3000));
        assert_eq!(config.fv_exit_rate, 0.25);
        assert_eq!(config.page_count, Some(PageCountModel::Fixed { pages: 6 }));
        // Unspecified fields come from the baseline.
        assert_eq!(config.transition_mean, 0.92);
    }
}
