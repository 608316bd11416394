//! Per-day session planning: how many sessions arrive, who they are, how
//! they found the page, and how far they get.
//!
//! Conversion and page progression are decided together in
//! [`decide_progression`], which returns one [`ProgressionOutcome`]; the
//! invariant "a converting session traverses every planned page" holds by
//! construction rather than by convention.

use crate::scenario::{Channel, DeviceType, PageCountModel, ScenarioConfig};
use crate::table::{AbTestTarget, AbVariant};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Normal;
use std::str::FromStr;

/// Day-to-day volatility of the generated period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    /// Mild uniform fluctuation around the target.
    #[default]
    Stable,
    /// Sine wave plus heavy noise, floored to stay positive.
    Oscillating,
    /// Stable until a crash day near the end of the period, then a flat
    /// degradation of both conversion and traffic.
    Cliff,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Stable => "stable",
            Difficulty::Oscillating => "oscillating",
            Difficulty::Cliff => "cliff",
        }
    }

    /// Day-level `(cvr_multiplier, traffic_factor)` for day `day_index` of
    /// `num_days`.
    pub fn day_multipliers<R: Rng>(
        &self,
        day_index: u32,
        num_days: u32,
        rng: &mut R,
    ) -> (f64, f64) {
        match self {
            Difficulty::Stable => (rng.gen_range(0.9..=1.1), 1.0),
            Difficulty::Oscillating => {
                let wave = (day_index as f64 / 2.0).sin() * 0.2;
                let noise = rng.gen_range(-0.3..=0.3);
                ((1.0 + wave + noise).max(0.2), 1.0)
            }
            Difficulty::Cliff => {
                let crash_day = num_days.saturating_sub(7);
                if day_index >= crash_day {
                    (0.4, 0.8)
                } else {
                    (rng.gen_range(0.9..=1.1), 1.0)
                }
            }
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stable" => Ok(Difficulty::Stable),
            "oscillating" => Ok(Difficulty::Oscillating),
            "cliff" => Ok(Difficulty::Cliff),
            other => Err(format!(
                "unknown difficulty '{}', expected stable, oscillating or cliff",
                other
            )),
        }
    }
}

/// One simulated day's context, drawn before its sessions.
#[derive(Debug, Clone, Copy)]
pub struct DayContext {
    pub date: NaiveDate,
    pub cvr_multiplier: f64,
    pub session_count: u32,
}

/// The joint conversion / progression decision for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionOutcome {
    pub is_converting: bool,
    pub max_page_reached: u32,
}

/// Decide conversion and page progression in one step.
///
/// Converting sessions traverse every planned page. Non-converting sessions
/// either exit at first view or walk pages 2..N, continuing while a uniform
/// draw stays under a normal-distributed continuation probability reduced by
/// the page's bottleneck penalty and clamped into the scenario's bounds.
pub fn decide_progression<R: Rng>(
    config: &ScenarioConfig,
    conversion_prob: f64,
    total_pages: u32,
    rng: &mut R,
) -> ProgressionOutcome {
    if rng.gen_bool(conversion_prob.clamp(0.0, 1.0)) {
        return ProgressionOutcome {
            is_converting: true,
            max_page_reached: total_pages,
        };
    }

    if rng.gen_bool(config.fv_exit_rate) {
        return ProgressionOutcome {
            is_converting: false,
            max_page_reached: 1,
        };
    }

    let (clamp_lo, clamp_hi) = config.transition_clamp;
    let continuation = Normal::new(config.transition_mean, config.transition_sd)
        .expect("transition parameters validated");

    let mut max_page = 1;
    for page in 2..=total_pages {
        let penalty = config
            .bottleneck_pages
            .get(&(page - 1))
            .copied()
            .unwrap_or(0.0);
        let p_continue = (continuation.sample(rng) - penalty).clamp(clamp_lo, clamp_hi);
        if rng.gen::<f64>() > p_continue {
            break;
        }
        max_page = page;
    }

    ProgressionOutcome {
        is_converting: false,
        max_page_reached: max_page,
    }
}

/// Everything decided about one session before any events exist.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub user_pseudo_id: String,
    pub ga_session_id: i64,
    pub ga_session_number: i32,
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub device_type: DeviceType,
    pub channel: Channel,
    pub utm_source: &'static str,
    pub utm_medium: &'static str,
    pub utm_campaign: Option<&'static str>,
    pub utm_content: Option<String>,
    pub referrer: Option<&'static str>,
    pub ab_variant: AbVariant,
    pub ab_test_target: Option<AbTestTarget>,
    pub total_pages: u32,
    pub outcome: ProgressionOutcome,
}

struct TrafficSource {
    source: &'static str,
    medium: &'static str,
    referrer: &'static str,
}

const ORGANIC_SEARCH_SOURCES: &[TrafficSource] = &[
    TrafficSource { source: "google", medium: "organic", referrer: "https://www.google.com/" },
    TrafficSource { source: "yahoo", medium: "organic", referrer: "https://www.yahoo.co.jp/" },
    TrafficSource { source: "bing", medium: "organic", referrer: "https://www.bing.com/" },
];

const PAID_SEARCH_SOURCES: &[TrafficSource] = &[
    TrafficSource { source: "google", medium: "cpc", referrer: "https://www.google.com/" },
    TrafficSource { source: "yahoo", medium: "cpc", referrer: "https://www.yahoo.co.jp/" },
    TrafficSource { source: "bing", medium: "cpc", referrer: "https://www.bing.com/" },
];

const PAID_SOCIAL_SOURCES: &[TrafficSource] = &[
    TrafficSource { source: "facebook", medium: "paidsocial", referrer: "https://www.facebook.com/" },
    TrafficSource { source: "instagram", medium: "paidsocial", referrer: "https://www.instagram.com/" },
    TrafficSource { source: "twitter", medium: "paidsocial", referrer: "https://t.co/" },
    TrafficSource { source: "line", medium: "paidsocial", referrer: "https://line.me/" },
];

const REFERRAL_SOURCES: &[TrafficSource] = &[
    TrafficSource { source: "youtube", medium: "referral", referrer: "https://www.youtube.com/" },
    TrafficSource { source: "smartnews", medium: "referral", referrer: "https://www.smartnews.com/" },
    TrafficSource { source: "facebook", medium: "referral", referrer: "https://www.facebook.com/" },
];

const OTHER_SOURCES: &[TrafficSource] = &[
    TrafficSource { source: "youtube", medium: "paidvideo", referrer: "https://www.youtube.com/" },
    TrafficSource { source: "smartnews", medium: "display", referrer: "https://www.smartnews.com/" },
];

/// UTM fields and referrer consistent with a channel. Direct traffic gets
/// the GA-style placeholders and no referrer.
fn draw_attribution<R: Rng>(
    channel: Channel,
    rng: &mut R,
) -> (&'static str, &'static str, Option<&'static str>) {
    let sources = match channel {
        Channel::Direct => return ("(direct)", "(none)", None),
        Channel::OrganicSearch => ORGANIC_SEARCH_SOURCES,
        Channel::PaidSearch => PAID_SEARCH_SOURCES,
        Channel::PaidSocial => PAID_SOCIAL_SOURCES,
        Channel::Referral => REFERRAL_SOURCES,
        Channel::Other => OTHER_SOURCES,
    };
    let picked = &sources[rng.gen_range(0..sources.len())];
    (picked.source, picked.medium, Some(picked.referrer))
}

const UTM_CAMPAIGNS: [Option<&str>; 4] = [
    Some("spring_sale"),
    Some("summer_campaign"),
    Some("brand_awareness"),
    None,
];

const AB_TEST_TARGETS: [Option<AbTestTarget>; 5] = [
    Some(AbTestTarget::HeroImage),
    Some(AbTestTarget::CtaButton),
    Some(AbTestTarget::Headline),
    Some(AbTestTarget::Layout),
    None,
];

/// Mediums that carry ad-level `utm_content`.
const PAID_MEDIUMS: [&str; 3] = ["cpc", "paidsocial", "display"];

/// Plans sessions for one generation run.
pub struct SessionGenerator<'a> {
    config: &'a ScenarioConfig,
    target_cvr: f64,
    difficulty: Difficulty,
    page_model: PageCountModel,
    num_days: u32,
    start_date: NaiveDate,
    user_pool_size: u32,
    hour_dist: WeightedIndex<f64>,
    device_dist: WeightedIndex<f64>,
    channel_dist: WeightedIndex<f64>,
}

impl<'a> SessionGenerator<'a> {
    pub fn new(
        config: &'a ScenarioConfig,
        target_cvr: f64,
        difficulty: Difficulty,
        page_model: PageCountModel,
        num_days: u32,
        start_date: NaiveDate,
    ) -> Self {
        let hour_dist =
            WeightedIndex::new(config.hour_seasonality).expect("hour seasonality validated");
        let device_dist = WeightedIndex::new(config.device_mix.iter().map(|(_, w)| *w))
            .expect("device mix validated");
        let channel_dist = WeightedIndex::new(config.channel_mix.iter().map(|(_, w)| *w))
            .expect("channel mix validated");

        // Repeat visitors: the pool is smaller than the expected session count.
        let (_, max_per_day) = config.sessions_per_day;
        let user_pool_size =
            ((max_per_day as f64 * num_days as f64 / 1.5).ceil() as u32).max(1);

        Self {
            config,
            target_cvr,
            difficulty,
            page_model,
            num_days,
            start_date,
            user_pool_size,
            hour_dist,
            device_dist,
            channel_dist,
        }
    }

    /// Draw the day-level multipliers and session count for one day.
    pub fn day_context<R: Rng>(&self, day_index: u32, rng: &mut R) -> DayContext {
        let date = self.start_date + Duration::days(day_index as i64);
        let (cvr_multiplier, traffic_factor) =
            self.difficulty
                .day_multipliers(day_index, self.num_days, rng);

        let (lo, hi) = self.config.sessions_per_day;
        let base = rng.gen_range(lo as f64..=hi as f64);
        let session_count =
            (base * self.config.weekday_factor(date) * traffic_factor) as u32;

        DayContext {
            date,
            cvr_multiplier,
            session_count,
        }
    }

    /// Plan one session within a day: identity, arrival time, attribution,
    /// A/B assignment, page count and progression outcome.
    pub fn plan_session<R: Rng>(&self, day: &DayContext, rng: &mut R) -> SessionPlan {
        let user_pseudo_id = format!("user_{:06}", rng.gen_range(0..self.user_pool_size));
        let ga_session_id: i64 = rng.gen_range(1_000_000_000..=9_999_999_999);
        let ga_session_number = rng.gen_range(1..=10);
        let session_id = format!("{}-{}", user_pseudo_id, ga_session_id);

        let hour = self.hour_dist.sample(rng) as u32;
        let start_time = day
            .date
            .and_hms_opt(hour, rng.gen_range(0..60), rng.gen_range(0..60))
            .expect("valid time of day")
            .and_utc();

        let device_type = self.config.device_mix[self.device_dist.sample(rng)].0;
        let channel = self.config.channel_mix[self.channel_dist.sample(rng)].0;
        let (utm_source, utm_medium, referrer) = draw_attribution(channel, rng);
        let utm_campaign = UTM_CAMPAIGNS[rng.gen_range(0..UTM_CAMPAIGNS.len())];
        let utm_content = if PAID_MEDIUMS.contains(&utm_medium) {
            Some(format!("ad_{}", rng.gen_range(1..=5)))
        } else {
            None
        };

        let ab_variant = if rng.gen_bool(0.5) {
            AbVariant::A
        } else {
            AbVariant::B
        };
        let ab_test_target = AB_TEST_TARGETS[rng.gen_range(0..AB_TEST_TARGETS.len())];

        let total_pages = self.page_model.sample(rng);

        let conversion_prob = self.target_cvr
            * self.config.cvr_multiplier
            * day.cvr_multiplier
            * self.config.device_coeff(device_type).cvr
            * self.config.channel_coeff(channel).cvr;
        let outcome = decide_progression(self.config, conversion_prob, total_pages, rng);

        SessionPlan {
            user_pseudo_id,
            ga_session_id,
            ga_session_number,
            session_id,
            start_time,
            device_type,
            channel,
            utm_source,
            utm_medium,
            utm_campaign,
            utm_content,
            referrer,
            ab_variant,
            ab_test_target,
            total_pages,
            outcome,
        }
    }
}
