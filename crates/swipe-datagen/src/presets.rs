//! Built-in scenarios.
//!
//! Each scenario is a bundle of overrides on [`ScenarioConfig::baseline`]
//! describing one business situation. Parameters here are the whole story:
//! nothing in the generator special-cases a scenario by name.
//!
//! [`ScenarioConfig::baseline`]: crate::scenario::ScenarioConfig::baseline

use crate::scenario::{
    DeviceCoeff, DeviceType, PageCountModel, ScenarioOverrides,
};
use std::collections::{BTreeMap, BTreeSet};

/// The designated default; unknown scenario names resolve to this.
pub const BASELINE: &str = "baseline";
/// Heavy paid traffic, most of it lost before page 2.
pub const LEAKY_FUNNEL: &str = "leaky-funnel";
/// Small, loyal audience that reads everything and converts well.
pub const ENGAGED_NICHE: &str = "engaged-niche";
/// Overall numbers look fine; mobile sessions are quietly broken.
pub const MOBILE_DEGRADED: &str = "mobile-degraded";

/// All built-in scenarios as `(name, overrides)` pairs.
pub fn builtin_scenarios() -> Vec<(&'static str, ScenarioOverrides)> {
    vec![
        (BASELINE, baseline()),
        (LEAKY_FUNNEL, leaky_funnel()),
        (ENGAGED_NICHE, engaged_niche()),
        (MOBILE_DEGRADED, mobile_degraded()),
    ]
}

/// Standard performance. Everything inherits from the defaults except the
/// page-count spread.
pub fn baseline() -> ScenarioOverrides {
    ScenarioOverrides {
        description: Some("Standard performance".to_string()),
        page_count: Some(PageCountModel::UniformRange { min: 10, max: 16 }),
        ..Default::default()
    }
}

/// High volume, high churn: 70% leave at first view, and two bottleneck
/// pages shed half of whoever is left. Short, jittery dwell times.
pub fn leaky_funnel() -> ScenarioOverrides {
    ScenarioOverrides {
        description: Some("High inflow, high exit (ad spend leaking)".to_string()),
        sessions_per_day: Some((800, 1200)),
        fv_exit_rate: Some(0.70),
        transition_mean: Some(0.60),
        transition_sd: Some(0.10),
        bottleneck_pages: Some(BTreeMap::from([(3, 0.6), (5, 0.5)])),
        cta_click_rate: Some(0.05),
        cvr_multiplier: Some(0.8),
        stay_time_mu: Some(2.0),
        stay_time_sigma: Some(0.8),
        backflow_rate: Some(0.02),
        device_mix: Some(vec![
            (DeviceType::Mobile, 0.9),
            (DeviceType::Desktop, 0.1),
        ]),
        page_count: Some(PageCountModel::UniformRange { min: 8, max: 12 }),
        ..Default::default()
    }
}

/// Low volume, committed readers: almost nobody bounces, dwell is long,
/// and the page count is high because the audience wants the detail.
pub fn engaged_niche() -> ScenarioOverrides {
    ScenarioOverrides {
        description: Some("Low inflow, high conversion (core fans)".to_string()),
        sessions_per_day: Some((50, 100)),
        fv_exit_rate: Some(0.15),
        transition_mean: Some(0.98),
        transition_sd: Some(0.01),
        bottleneck_pages: Some(BTreeMap::new()),
        cta_click_rate: Some(0.25),
        cvr_multiplier: Some(1.3),
        stay_time_mu: Some(3.5),
        stay_time_sigma: Some(0.4),
        backflow_rate: Some(0.15),
        device_mix: Some(vec![
            (DeviceType::Mobile, 0.6),
            (DeviceType::Desktop, 0.3),
            (DeviceType::Tablet, 0.1),
        ]),
        page_count: Some(PageCountModel::UniformRange { min: 15, max: 20 }),
        ..Default::default()
    }
}

/// Responsive-design trouble: mobile conversion collapses, mobile dwell
/// shortens, mobile loads drag, while desktop looks healthy.
pub fn mobile_degraded() -> ScenarioOverrides {
    ScenarioOverrides {
        description: Some("Mobile-only degradation (responsive issues)".to_string()),
        sessions_per_day: Some((400, 600)),
        fv_exit_rate: Some(0.40),
        transition_mean: Some(0.90),
        transition_sd: Some(0.03),
        bottleneck_pages: Some(BTreeMap::from([(2, 0.4), (6, 0.4)])),
        cta_click_rate: Some(0.10),
        cvr_multiplier: Some(0.8),
        stay_time_mu: Some(2.5),
        stay_time_sigma: Some(0.6),
        backflow_rate: Some(0.05),
        device_mix: Some(vec![
            (DeviceType::Mobile, 0.7),
            (DeviceType::Desktop, 0.3),
        ]),
        page_count: Some(PageCountModel::UniformRange { min: 10, max: 14 }),
        device_coeff: Some(BTreeMap::from([
            (
                DeviceType::Mobile,
                DeviceCoeff {
                    cvr: 0.2,
                    stay: 0.6,
                    load: 1.5,
                },
            ),
            (
                DeviceType::Desktop,
                DeviceCoeff {
                    cvr: 1.5,
                    stay: 1.2,
                    load: 0.8,
                },
            ),
            (DeviceType::Tablet, DeviceCoeff::default()),
        ])),
        info_jump_pages: Some(BTreeSet::from([2, 6])),
        ..Default::default()
    }
}
