//! Event materialization: expand one session plan into time-ordered rows.
//!
//! Load times come from a gamma distribution, dwell times from a log-normal
//! whose location shifts for converting sessions, and the cumulative cursor
//! advances by dwell plus load per page so timestamps stay monotone within a
//! session.

use crate::scenario::ScenarioConfig;
use crate::session::SessionPlan;
use crate::table::{CvType, Direction, EventName, EventRecord};
use chrono::Duration;
use rand::Rng;
use rand_distr::{Distribution, Gamma, LogNormal};

/// What a click event landed on.
enum ClickTarget {
    Cta,
    FloatingBanner,
    ExitPopup,
}

impl ClickTarget {
    fn element(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ClickTarget::Cta => ("button", "cta_button", "cta"),
            ClickTarget::FloatingBanner => ("div", "floating_banner", "banner"),
            ClickTarget::ExitPopup => ("div", "exit_popup", "overlay"),
        }
    }
}

/// Expand one planned session into event rows, appending to `out`.
pub fn materialize_session<R: Rng>(
    plan: &SessionPlan,
    config: &ScenarioConfig,
    rng: &mut R,
    out: &mut Vec<EventRecord>,
) {
    let converting = plan.outcome.is_converting;
    let max_page = plan.outcome.max_page_reached;

    let device = config.device_coeff(plan.device_type);
    let channel = config.channel_coeff(plan.channel);

    let load_dist = Gamma::new(
        config.load_time_shape,
        config.load_time_scale_ms * device.load,
    )
    .expect("load time parameters validated");

    // The uplift is additive in log-seconds, so converting sessions dwell
    // roughly e^uplift times longer.
    let mut stay_mu = config.stay_time_mu;
    if converting {
        stay_mu += config.conversion_stay_uplift;
    }
    let stay_scale_ms = stay_mu.exp() * device.stay * channel.stay * 1000.0;
    let stay_dist = LogNormal::new(stay_scale_ms.ln(), config.stay_time_sigma)
        .expect("stay time parameters validated");

    let mut cursor_ms: i64 = 0;
    let mut last_page_record: Option<EventRecord> = None;

    for page in 1..=max_page {
        let page_ts = plan.start_time + Duration::milliseconds(cursor_ms);

        let load_ms = load_dist.sample(rng).max(config.min_load_ms);
        let mut stay_ms = stay_dist.sample(rng).max(config.min_stay_ms);
        if config.rich_content_pages.contains(&page) {
            stay_ms *= config.rich_content_stay_factor;
        }

        let mut direction = Direction::Forward;
        if page > 1 {
            let mut p_back = config.backflow_rate;
            if config.info_jump_pages.contains(&page) {
                p_back += config.info_jump_backflow_bonus;
            }
            if rng.gen_bool(p_back.min(1.0)) {
                direction = Direction::Backward;
                stay_ms *= 1.0 + config.backflow_stay_bonus;
            }
        }

        // Deep readers scroll further; converting sessions read to the end.
        let base_scroll = if converting {
            rng.gen_range(0.8..1.0)
        } else {
            rng.gen_range(0.2..0.8)
        };
        let scroll_pct = (base_scroll + stay_ms / 20_000.0 * 0.5).min(1.0);

        let record = EventRecord {
            event_date: plan.start_time.date_naive(),
            event_timestamp: page_ts,
            event_name: if page == 1 {
                EventName::SessionStart
            } else {
                EventName::PageView
            },
            user_pseudo_id: plan.user_pseudo_id.clone(),
            ga_session_id: plan.ga_session_id,
            ga_session_number: plan.ga_session_number,
            session_id: plan.session_id.clone(),
            page_location: format!("{}#page-{}", config.page_url_base, page),
            page_referrer: if page == 1 { plan.referrer } else { None },
            page_path: format!("{}#page-{}", config.page_path_base, page),
            page_num_dom: page as i32,
            stay_ms: stay_ms as i64,
            load_time_ms: load_ms as i64,
            total_duration_ms: 0,
            max_page_reached: max_page as i32,
            total_pages: plan.total_pages as i32,
            scroll_pct,
            utm_source: plan.utm_source,
            utm_medium: plan.utm_medium,
            utm_campaign: plan.utm_campaign,
            utm_content: plan.utm_content.clone(),
            device_type: plan.device_type,
            direction,
            ab_variant: plan.ab_variant,
            ab_test_target: plan.ab_test_target,
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
        };

        let cta_prob = if converting && page == max_page {
            // A converting session all but always clicks the final CTA.
            0.9
        } else {
            config.cta_click_rate
        };
        let click_target = if rng.gen_bool(cta_prob) {
            Some(ClickTarget::Cta)
        } else if scroll_pct >= 0.5 && rng.gen_bool(config.banner_click_bonus) {
            Some(ClickTarget::FloatingBanner)
        } else if !converting && page == max_page && rng.gen_bool(config.exit_pop_click_bonus)
        {
            Some(ClickTarget::ExitPopup)
        } else {
            None
        };

        let click = click_target.map(|target| {
            let mut click = record.clone();
            click.event_name = EventName::Click;
            // Strictly inside the page's stay window.
            let offset = rng.gen_range(100..(stay_ms as i64).max(101));
            click.event_timestamp = page_ts + Duration::milliseconds(offset);
            click.page_referrer = None;
            click.click_x_rel = Some(rng.gen_range(0.0..1.0));
            click.click_y_rel = Some(rng.gen_range(0.0..1.0));
            let (tag, id, classes) = target.element();
            click.elem_tag = Some(tag);
            click.elem_id = Some(id);
            click.elem_classes = Some(classes);
            click
        });

        last_page_record = Some(record.clone());
        out.push(record);
        if let Some(click) = click {
            out.push(click);
        }

        cursor_ms += (stay_ms + load_ms) as i64;
    }

    if !converting {
        return;
    }
    let base = last_page_record.expect("converting session has at least one page");

    if rng.gen_bool(config.form_funnel_rate) {
        let (steps_lo, steps_hi) = config.form_steps;
        let steps = rng.gen_range(steps_lo..=steps_hi);
        for step in 1..=steps {
            let duration_ms: i64 = rng.gen_range(3_000..=15_000);
            let mut form = base.clone();
            form.event_name = if step == 1 {
                EventName::FormStart
            } else {
                EventName::FormProgress
            };
            form.event_timestamp = plan.start_time + Duration::milliseconds(cursor_ms);
            form.page_referrer = None;
            form.form_page_number = Some(step as i32);
            form.form_duration_ms = Some(duration_ms);
            form.form_direction = Some(if step > 1 && rng.gen_bool(config.backflow_rate) {
                Direction::Backward
            } else {
                Direction::Forward
            });
            out.push(form);
            cursor_ms += duration_ms;
        }
    }

    let mut conversion = base;
    conversion.event_name = EventName::Conversion;
    conversion.event_timestamp = plan.start_time + Duration::milliseconds(cursor_ms + 1000);
    conversion.page_referrer = None;
    conversion.cv_type = Some(if rng.gen_bool(0.5) {
        CvType::Primary
    } else {
        CvType::Micro
    });
    let (cv_lo, cv_hi) = config.conversion_value_range;
    let cv_value = rng.gen_range(cv_lo..=cv_hi) as i64;
    conversion.cv_value = Some(cv_value);
    conversion.value = Some(cv_value);
    out.push(conversion);
}
