//! Anomaly injection: a post-processing pass over an assembled table.
//!
//! Kept outside the generative model on purpose. The pass only deletes rows
//! (conversion events during an outage, whole sessions during a traffic
//! drop); it never edits the rows that survive, and it runs after sorting
//! and duration backfill.

use crate::table::{EventName, EventTable};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;

/// A deliberate defect to fabricate in the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnomalyKind {
    /// The conversion tag stops firing on `days` randomly chosen dates.
    ConversionOutage { days: u32 },
    /// Traffic collapses on `days` randomly chosen dates; each session on
    /// an affected date survives with probability `keep_ratio`.
    TrafficDrop { days: u32, keep_ratio: f64 },
}

/// Apply one anomaly to the table, deleting the affected rows.
pub fn inject<R: Rng>(table: &mut EventTable, kind: AnomalyKind, rng: &mut R) {
    let dates: Vec<NaiveDate> = table
        .events
        .iter()
        .map(|e| e.event_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if dates.is_empty() {
        return;
    }

    match kind {
        AnomalyKind::ConversionOutage { days } => {
            let affected: HashSet<NaiveDate> = dates
                .choose_multiple(rng, days as usize)
                .copied()
                .collect();
            table.events.retain(|e| {
                !(e.event_name == EventName::Conversion && affected.contains(&e.event_date))
            });
        }
        AnomalyKind::TrafficDrop { days, keep_ratio } => {
            let affected: HashSet<NaiveDate> = dates
                .choose_multiple(rng, days as usize)
                .copied()
                .collect();

            // A session belongs to the date of its first event. BTreeMap so
            // the per-session draws happen in a stable order.
            let mut session_dates: BTreeMap<String, NaiveDate> = BTreeMap::new();
            for event in &table.events {
                session_dates
                    .entry(event.session_id.clone())
                    .or_insert(event.event_date);
            }

            let keep_ratio = keep_ratio.clamp(0.0, 1.0);
            let dropped: HashSet<String> = session_dates
                .into_iter()
                .filter(|(_, date)| affected.contains(date))
                .filter(|_| !rng.gen_bool(keep_ratio))
                .map(|(session, _)| session)
                .collect();

            table.events.retain(|e| !dropped.contains(&e.session_id));
        }
    }
}

impl FromStr for AnomalyKind {
    type Err = String;

    /// Parse `conversion-outage:<days>` or `traffic-drop:<days>:<keep_ratio>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["conversion-outage", days] => {
                let days = days
                    .parse()
                    .map_err(|_| format!("invalid day count '{}'", days))?;
                Ok(AnomalyKind::ConversionOutage { days })
            }
            ["traffic-drop", days, keep_ratio] => {
                let days = days
                    .parse()
                    .map_err(|_| format!("invalid day count '{}'", days))?;
                let keep_ratio: f64 = keep_ratio
                    .parse()
                    .map_err(|_| format!("invalid keep ratio '{}'", keep_ratio))?;
                if !(0.0..=1.0).contains(&keep_ratio) {
                    return Err(format!("keep ratio {} outside [0, 1]", keep_ratio));
                }
                Ok(AnomalyKind::TrafficDrop { days, keep_ratio })
            }
            _ => Err(format!(
                "unknown anomaly '{}', expected conversion-outage:<days> or traffic-drop:<days>:<keep_ratio>",
                s
            )),
        }
    }
}
