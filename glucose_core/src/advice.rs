//! Combined advice: rules findings plus titration suggestions.

use crate::config::Targets;
use crate::rules::evaluate;
use crate::titration::suggest_titration;
use crate::{Advice, ClinicalContext, MedicationState, NormalizedReading};
use chrono::NaiveDateTime;

/// Run both engines and merge their output for rendering
///
/// Alerts and stats come from the rules engine; recommendations are the
/// rules engine's followed by the titration engine's.
pub fn advise(
    readings: &[NormalizedReading],
    meds: &MedicationState,
    context: &ClinicalContext,
    targets: &Targets,
    now: NaiveDateTime,
    lookback_days: usize,
) -> Advice {
    let rules = evaluate(readings, meds, context, now);
    let titration = suggest_titration(
        readings,
        &meds.insulins,
        targets,
        context.steroid.on,
        lookback_days,
    );

    tracing::info!(
        "Advice: {} alerts, {} rule recommendations, {} titration suggestions",
        rules.alerts.len(),
        rules.recs.len(),
        titration.len()
    );

    let mut recs = rules.recs;
    recs.extend(titration);

    Advice {
        alerts: rules.alerts,
        recs,
        stats: rules.stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InsulinEntry, SteroidCourse};
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-11-06T12:00", "%Y-%m-%dT%H:%M").unwrap()
    }

    fn reading(ts: NaiveDateTime, value: f64) -> NormalizedReading {
        let timestamp = ts.format("%Y-%m-%dT%H:%M").to_string();
        NormalizedReading {
            id: timestamp.clone(),
            timestamp,
            value,
            ts_date: ts,
        }
    }

    #[test]
    fn test_titration_follows_rule_recommendations() {
        let readings = vec![
            reading(now() - Duration::hours(6), 13.0), // 06:00
            reading(now() - Duration::hours(4), 12.0),
            reading(now() - Duration::hours(2), 11.5),
        ];
        let meds = MedicationState {
            basal_insulin: true,
            basal_dose: Some(20.0),
            insulins: vec![InsulinEntry {
                id: "1".into(),
                insulin_id: "glargine".into(),
                dose_units: Some(20.0),
                time: None,
            }],
            ..Default::default()
        };

        let advice = advise(
            &readings,
            &meds,
            &ClinicalContext::default(),
            &Targets::default(),
            now(),
            3,
        );

        let titles: Vec<_> = advice.recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Possible basal insulin uptitration",
                "Morning highs: consider basal uptitration",
            ]
        );
        assert_eq!(advice.stats.n24h, 3);
    }

    #[test]
    fn test_steroid_course_biases_titration() {
        let readings = vec![reading(now() - Duration::hours(20), 11.8)]; // 16:00 yesterday
        let mut context = ClinicalContext::default();

        let plain = advise(&readings, &MedicationState::default(), &context, &Targets::default(), now(), 3);
        assert_eq!(plain.recs.len(), 1);

        context.steroid = SteroidCourse {
            on: true,
            ..Default::default()
        };
        let biased = advise(&readings, &MedicationState::default(), &context, &Targets::default(), now(), 3);
        assert!(biased.recs.is_empty());
    }
}
