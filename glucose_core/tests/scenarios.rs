//! End-to-end checks of the rules and titration engines.
//!
//! These cover:
//! - Purity and severity-tier exclusivity over generated inputs (proptest)
//! - Sort order after normalization
//! - The reference scenarios for hypos, SU, basal and titration

use chrono::{Duration, NaiveDateTime};
use glucose_core::*;
use proptest::prelude::*;

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-11-06T12:00", "%Y-%m-%dT%H:%M").unwrap()
}

fn rows(points: &[(NaiveDateTime, f64)]) -> Vec<RawReading> {
    points
        .iter()
        .enumerate()
        .map(|(i, (ts, value))| RawReading {
            id: format!("r{}", i),
            timestamp: ts.format("%Y-%m-%dT%H:%M").to_string(),
            value: RawValue::Number(*value),
        })
        .collect()
}

fn hours_ago(h: i64) -> NaiveDateTime {
    now() - Duration::hours(h)
}

prop_compose! {
    /// A reading within the last 36 hours, in tenths of mmol/L
    fn reading_point()(
        minutes_ago in 0i64..36 * 60,
        tenths in 15u32..=215,
    ) -> (NaiveDateTime, f64) {
        (now() - Duration::minutes(minutes_ago), f64::from(tenths) / 10.0)
    }
}

fn reading_rows() -> impl Strategy<Value = Vec<RawReading>> {
    prop::collection::vec(reading_point(), 0..16).prop_map(|points| rows(&points))
}

fn any_meds() -> impl Strategy<Value = MedicationState> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), 0u32..60).prop_map(
        |(basal_insulin, bolus_insulin, sulfonylurea, metformin, dose)| MedicationState {
            basal_insulin,
            basal_dose: Some(f64::from(dose)).filter(|d| *d > 0.0),
            bolus_insulin,
            sulfonylurea,
            metformin,
            ..Default::default()
        },
    )
}

fn any_context() -> impl Strategy<Value = ClinicalContext> {
    (prop::option::of(5u32..120), any::<bool>()).prop_map(|(egfr, npo)| ClinicalContext {
        egfr: egfr.map(f64::from),
        npo,
        ..Default::default()
    })
}

fn nonzero_percent() -> impl Strategy<Value = f64> {
    prop_oneof![-50.0f64..-0.01, 0.01f64..50.0]
}

proptest! {
    #[test]
    fn prop_evaluation_is_idempotent(
        raw in reading_rows(),
        meds in any_meds(),
        context in any_context(),
    ) {
        let readings = normalize(&raw);
        let first = evaluate(&readings, &meds, &context, now());
        let second = evaluate(&readings, &meds, &context, now());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_severe_hypo_alert_excludes_plain_hypo_alert(raw in reading_rows()) {
        let readings = normalize(&raw);
        let out = evaluate(&readings, &MedicationState::default(), &ClinicalContext::default(), now());

        let severe = out.alerts.iter().filter(|a| a.title.starts_with("Severe")).count();
        let plain = out
            .alerts
            .iter()
            .filter(|a| a.title.starts_with("Hypoglycaemia"))
            .count();

        if out.stats.any_severe {
            prop_assert_eq!((severe, plain), (1, 0));
        } else if out.stats.any_hypo {
            prop_assert_eq!((severe, plain), (0, 1));
        } else {
            prop_assert_eq!((severe, plain), (0, 0));
        }
    }

    #[test]
    fn prop_normalized_readings_are_time_ordered(
        mut raw in reading_rows(),
        junk in prop::collection::vec("[a-z ]{0,6}", 0..4),
    ) {
        raw.extend(junk.into_iter().map(|text| RawReading {
            id: text.clone(),
            timestamp: text.clone(),
            value: RawValue::Text(text),
        }));
        let readings = normalize(&raw);
        prop_assert!(readings.windows(2).all(|w| w[0].ts_date <= w[1].ts_date));
    }

    #[test]
    fn prop_bounded_change_always_moves_and_stays_positive(
        current in 2u32..=500,
        pct in nonzero_percent(),
    ) {
        let current = f64::from(current);
        let proposed = bounded_percent_change(current, pct, 1.0, 20.0);

        prop_assert!(proposed >= 1.0);
        prop_assert_ne!(proposed, current);
        prop_assert_eq!(proposed > current, pct > 0.0);
        prop_assert!((proposed - current).abs() <= current * 0.2 + 1.0);
    }
}

#[test]
fn empty_input_is_stable() {
    let out = evaluate(&[], &MedicationState::default(), &ClinicalContext::default(), now());
    assert_eq!(out.stats.mean_24h, None);
    assert_eq!(out.stats.pm_mean, None);
    assert!(!out.stats.any_hypo);
    assert!(!out.stats.any_severe);
    assert!(out.alerts.is_empty());
    assert!(out.recs.is_empty());
}

#[test]
fn scenario_a_single_low_a_day_ago() {
    // 3.2 is a hypo but not severe
    let readings = normalize(&rows(&[(hours_ago(23), 3.2)]));
    let out = evaluate(&readings, &MedicationState::default(), &ClinicalContext::default(), now());

    assert_eq!(out.alerts.len(), 1);
    assert_eq!(out.alerts[0].severity, Severity::Stat);
    assert!(out.alerts[0].title.starts_with("Hypoglycaemia"));
    assert!(out.recs.is_empty());
    assert!(out.stats.any_hypo);
    assert!(!out.stats.any_severe);

    let readings = normalize(&rows(&[(hours_ago(23), 2.8)]));
    let out = evaluate(&readings, &MedicationState::default(), &ClinicalContext::default(), now());

    assert_eq!(out.alerts.len(), 1);
    assert_eq!(out.alerts[0].severity, Severity::Stat);
    assert!(out.alerts[0].title.starts_with("Severe"));
    assert!(out.recs.is_empty());
    assert!(out.stats.any_severe);
}

#[test]
fn scenario_b_two_hypos_on_sulfonylurea() {
    let readings = normalize(&rows(&[(hours_ago(1), 3.8), (hours_ago(2), 3.9)]));
    let meds = MedicationState {
        sulfonylurea: true,
        ..Default::default()
    };
    let out = evaluate(&readings, &meds, &ClinicalContext::default(), now());

    let stat = out.alerts.iter().filter(|a| a.severity == Severity::Stat).count();
    let warn: Vec<_> = out
        .alerts
        .iter()
        .filter(|a| a.severity == Severity::Warn)
        .collect();
    assert_eq!(stat, 1);
    assert_eq!(warn.len(), 1);
    assert_eq!(warn[0].title, "Recurrent hypoglycaemia in 24h");
    // earliest episode is cited first
    assert!(warn[0].evidence.as_deref().unwrap().starts_with("3.9@"));
    assert!(out
        .recs
        .iter()
        .any(|r| r.title == "Sulfonylurea and hypoglycaemia"));
}

#[test]
fn scenario_c_basal_uptitration() {
    let readings = normalize(&rows(&[
        (hours_ago(8), 11.2),
        (hours_ago(6), 12.5),
        (hours_ago(4), 10.8),
        (hours_ago(2), 13.0),
    ]));
    let meds = MedicationState {
        basal_insulin: true,
        basal_dose: Some(18.0),
        ..Default::default()
    };
    let out = evaluate(&readings, &meds, &ClinicalContext::default(), now());

    let rec = out
        .recs
        .iter()
        .find(|r| r.title == "Possible basal insulin uptitration")
        .expect("uptitration recommendation");
    assert!(rec.body.contains("Example: 18 → 20 units"));
}

#[test]
fn scenario_d_overnight_low_reduces_basal() {
    let overnight = NaiveDateTime::parse_from_str("2025-11-06T03:00", "%Y-%m-%dT%H:%M").unwrap();
    let readings = normalize(&rows(&[(overnight, 3.5)]));
    let meds = MedicationState {
        basal_insulin: true,
        basal_dose: Some(18.0),
        ..Default::default()
    };
    let out = evaluate(&readings, &meds, &ClinicalContext::default(), now());

    assert_eq!(out.stats.overnight_lows, 1);
    let rec = out
        .recs
        .iter()
        .find(|r| r.title == "Overnight lows: consider basal reduction")
        .expect("reduction recommendation");
    assert!(rec.body.contains("Example: 18 → 16 units"));
}

#[test]
fn scenario_e_titration_uptitrates_by_ten_percent() {
    let at = |ts: &str| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").unwrap();
    let readings = normalize(&rows(&[
        (at("2025-11-04T07:00"), 12.0),
        (at("2025-11-05T05:30"), 11.0),
        (at("2025-11-05T07:30"), 13.0),
        (at("2025-11-06T06:15"), 12.0),
    ]));
    let insulins = vec![InsulinEntry {
        id: "b".into(),
        insulin_id: "glargine".into(),
        dose_units: Some(20.0),
        time: None,
    }];

    let out = suggest_titration(&readings, &insulins, &Targets::default(), false, 3);

    assert_eq!(out.len(), 1);
    assert!(out[0].body.contains("+10%"));
    assert!(out[0].body.contains("20 → 22 units"));
    assert_eq!(bounded_percent_change(20.0, 10.0, 1.0, 20.0), 22.0);
}

#[test]
fn full_pipeline_from_raw_form() {
    let form = FormState::default()
        .apply(Command::AddReading { at: None })
        .apply(Command::LoadDemo { now: now() })
        .apply(Command::AddInsulin(RawInsulinEntry {
            id: "i1".into(),
            insulin_id: "aspart".into(),
            dose_units: Some(RawValue::Text("6".into())),
            time: Some("12:00".into()),
        }));

    let advice = form.evaluate(now(), &Config::default());
    assert_eq!(advice.stats.n24h, 5);
    assert!(advice.stats.mean_24h.is_some());
    assert!(!advice.alerts.is_empty());
}
