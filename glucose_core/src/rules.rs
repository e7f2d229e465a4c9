//! Rules engine for alerts and advisory recommendations.
//!
//! Works on the rolling 24 hours before and after `now`:
//! - Hypoglycaemia alerts (severe and plain tiers, recurrence)
//! - Steroid-pattern afternoon hyperglycaemia
//! - Sulfonylurea, renal, basal and bolus advisories

use crate::titration::round_half_up;
use crate::windowing::{in_hour_window, last_24h, mean};
use crate::{
    Alert, ClinicalContext, MedicationState, NormalizedReading, Recommendation, RulesOutput,
    Severity, Stats,
};
use chrono::NaiveDateTime;

/// BG below this is hypoglycaemia (mmol/L)
pub const HYPO_THRESHOLD: f64 = 4.0;
/// BG below this is severe hypoglycaemia (mmol/L)
pub const SEVERE_HYPO_THRESHOLD: f64 = 3.0;
/// Readings above this count as highs for basal uptitration (mmol/L)
pub const HIGH_THRESHOLD: f64 = 10.0;
/// Afternoon/evening mean above this suggests a steroid or prandial pattern
pub const PM_MEAN_THRESHOLD: f64 = 12.0;
/// eGFR below this is significant renal impairment (mL/min/1.73m²)
pub const RENAL_EGFR_THRESHOLD: f64 = 30.0;

const OVERNIGHT_WINDOW: (f64, f64) = (0.0, 6.0);
const PM_WINDOW: (f64, f64) = (14.0, 22.0);

/// Facts about the 24h window every rule draws on
struct Window<'a> {
    readings: Vec<&'a NormalizedReading>,
    hypos: Vec<&'a NormalizedReading>,
    stats: Stats,
}

impl<'a> Window<'a> {
    fn new(readings: &'a [NormalizedReading], now: NaiveDateTime) -> Self {
        let readings = last_24h(readings, now);
        let hypos: Vec<_> = readings
            .iter()
            .copied()
            .filter(|r| r.value < HYPO_THRESHOLD)
            .collect();

        let overnight_lows = readings
            .iter()
            .filter(|r| in_hour_window(r, OVERNIGHT_WINDOW.0, OVERNIGHT_WINDOW.1))
            .filter(|r| r.value < HYPO_THRESHOLD)
            .count();

        let pm_mean = mean(
            readings
                .iter()
                .filter(|r| in_hour_window(r, PM_WINDOW.0, PM_WINDOW.1))
                .map(|r| r.value),
        );

        let stats = Stats {
            n24h: readings.len(),
            any_hypo: !hypos.is_empty(),
            any_severe: readings.iter().any(|r| r.value < SEVERE_HYPO_THRESHOLD),
            mean_24h: mean(readings.iter().map(|r| r.value)),
            overnight_lows,
            pm_mean,
        };

        Self {
            readings,
            hypos,
            stats,
        }
    }

    fn count_where(&self, pred: impl Fn(f64) -> bool) -> usize {
        self.readings.iter().filter(|r| pred(r.value)).count()
    }

    /// All 24h values, in time order, as alert evidence
    fn evidence(&self) -> String {
        let values: Vec<String> = self.readings.iter().map(|r| r.value.to_string()).collect();
        format!("BG readings: {}", values.join(", "))
    }

    fn pm_mean_above(&self, threshold: f64) -> Option<f64> {
        self.stats.pm_mean.filter(|m| *m > threshold)
    }
}

/// Evaluate alerts, recommendations and stats for the current inputs
///
/// Pure and deterministic: the same inputs always give the same output.
/// Rules are independent of one another except the two hypoglycaemia tiers,
/// where the severe alert replaces the plain one.
pub fn evaluate(
    readings: &[NormalizedReading],
    meds: &MedicationState,
    context: &ClinicalContext,
    now: NaiveDateTime,
) -> RulesOutput {
    let window = Window::new(readings, now);

    let alerts = evaluate_alerts(&window, context);
    let recs = evaluate_recommendations(&window, meds, context);

    tracing::debug!(
        "Rules evaluated over {} readings: {} alerts, {} recommendations",
        window.stats.n24h,
        alerts.len(),
        recs.len()
    );

    RulesOutput {
        alerts,
        recs,
        stats: window.stats,
    }
}

fn evaluate_alerts(window: &Window<'_>, context: &ClinicalContext) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let stats = &window.stats;

    // Rule 1: hypoglycaemia, severe tier first
    if stats.any_severe {
        let first = window
            .readings
            .iter()
            .find(|r| r.value < SEVERE_HYPO_THRESHOLD)
            .map(|r| r.timestamp.as_str());
        tracing::debug!("Severe hypoglycaemia alert");
        alerts.push(Alert {
            title: "Severe hypoglycaemia (BG < 3.0 mmol/L)".into(),
            severity: Severity::Stat,
            detail: format!(
                "Treat immediately per hypo protocol; recheck in 10-15 min. Last severe at {}.",
                first.unwrap_or("unknown")
            ),
            evidence: Some(window.evidence()),
        });
    } else if stats.any_hypo {
        let first = window.hypos.first().map(|r| r.timestamp.as_str());
        tracing::debug!("Hypoglycaemia alert");
        alerts.push(Alert {
            title: "Hypoglycaemia (BG < 4.0 mmol/L)".into(),
            severity: Severity::Stat,
            detail: format!(
                "Treat per protocol; recheck in 10-15 min. Last hypo at {}.",
                first.unwrap_or("unknown")
            ),
            evidence: Some(window.evidence()),
        });
    }

    // Rule 2: recurrence, independent of the tier above
    if window.hypos.len() >= 2 {
        let episodes: Vec<String> = window
            .hypos
            .iter()
            .map(|h| format!("{}@{}", h.value, h.timestamp))
            .collect();
        tracing::debug!("Recurrent hypoglycaemia alert ({} episodes)", episodes.len());
        alerts.push(Alert {
            title: "Recurrent hypoglycaemia in 24h".into(),
            severity: Severity::Warn,
            detail: format!(
                "{} episodes recorded in last 24h. Review causes/meds and add overnight monitoring plan.",
                window.hypos.len()
            ),
            evidence: Some(episodes.join(", ")),
        });
    }

    // Rule 3: morning steroid with afternoon/evening highs
    if context.steroid.is_morning_dose() && stats.n24h >= 3 {
        if let Some(pm_mean) = window.pm_mean_above(PM_MEAN_THRESHOLD) {
            tracing::debug!("Steroid-pattern alert (PM mean {:.1})", pm_mean);
            alerts.push(Alert {
                title: "Steroid-pattern hyperglycaemia (PM)".into(),
                severity: Severity::Warn,
                detail: format!(
                    "Mean BG between 14:00-22:00 is {:.1} mmol/L with AM steroid ticked. Consider steroid-pattern adjustments.",
                    pm_mean
                ),
                evidence: None,
            });
        }
    }

    alerts
}

fn evaluate_recommendations(
    window: &Window<'_>,
    meds: &MedicationState,
    context: &ClinicalContext,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    let stats = &window.stats;
    let renal_impairment = context.egfr.filter(|e| *e < RENAL_EGFR_THRESHOLD);

    if meds.sulfonylurea && stats.any_hypo {
        tracing::debug!("Sulfonylurea hypo advisory");
        recs.push(Recommendation {
            title: "Sulfonylurea and hypoglycaemia".into(),
            body: format!(
                "A hypo occurred while on a sulfonylurea ({}). Consider holding tonight and review dose/regimen. Add increased monitoring for the next 24 hours.",
                meds.sulfonylurea_name.as_deref().unwrap_or("SU")
            ),
            caveat: Some("Review renal function, nutrition status, and timing of doses.".into()),
        });
    }

    if let Some(egfr) = renal_impairment {
        if meds.sulfonylurea && stats.any_hypo {
            tracing::debug!("Renal SU escalation advisory (eGFR {})", egfr);
            recs.push(Recommendation {
                title: "Renal impairment with SU and hypos".into(),
                body: format!(
                    "eGFR {} with hypoglycaemia on an SU suggests higher risk of prolonged hypos. Consider stopping the SU and using an insulin-based regimen with review.",
                    egfr
                ),
                caveat: Some(
                    "Discuss with senior/diabetes team; align to local renal dosing guidance."
                        .into(),
                ),
            });
        }

        if meds.metformin {
            tracing::debug!("Renal metformin advisory (eGFR {})", egfr);
            recs.push(Recommendation {
                title: "Renal impairment with metformin".into(),
                body: format!(
                    "eGFR {}. Consider stopping metformin while inpatient and reassessing post-discharge.",
                    egfr
                ),
                caveat: Some("Check local guidance; consider risks/benefits and indication.".into()),
            });
        }
    }

    let highs = window.count_where(|v| v > HIGH_THRESHOLD);
    let lows = window.count_where(|v| v < HYPO_THRESHOLD);

    if meds.basal_insulin && highs >= 3 && lows == 0 {
        tracing::debug!("Basal uptitration advisory ({} highs)", highs);
        recs.push(Recommendation {
            title: "Possible basal insulin uptitration".into(),
            body: format!(
                "Frequent readings >10 mmol/L without hypos in 24h. Consider a cautious basal increase (~10%).{}",
                dose_example(meds.basal_dose, 1.10)
            ),
            caveat: Some(
                "Check fasting/overnight values, nutrition status, and risk of hypoglycaemia."
                    .into(),
            ),
        });
    }

    if meds.basal_insulin && stats.overnight_lows >= 1 {
        tracing::debug!("Basal reduction advisory ({} overnight lows)", stats.overnight_lows);
        recs.push(Recommendation {
            title: "Overnight lows: consider basal reduction".into(),
            body: format!(
                "Overnight hypoglycaemia detected. Consider basal dose reduction (~10%).{}",
                dose_example(meds.basal_dose, 0.90)
            ),
            caveat: Some("Review timing of basal, evening intake, and concurrent SUs.".into()),
        });
    }

    if meds.bolus_insulin && !stats.any_hypo {
        if let Some(pm_mean) = window.pm_mean_above(PM_MEAN_THRESHOLD) {
            tracing::debug!("Prandial titration advisory (PM mean {:.1})", pm_mean);
            recs.push(Recommendation {
                title: "Post-prandial hyperglycaemia pattern".into(),
                body: format!(
                    "Afternoon/evening mean {:.1} mmol/L. Consider prandial dose titration or adding/adjusting correction scale per local protocol.",
                    pm_mean
                ),
                caveat: Some(
                    "Check carbohydrate intake, missed doses, and injection technique.".into(),
                ),
            });
        }
    }

    if context.npo && meds.bolus_insulin {
        tracing::debug!("NPO bolus advisory");
        recs.push(Recommendation {
            title: "NPO status with bolus insulin".into(),
            body: "If patient is currently NPO, consider holding prandial insulin and using a basal ± correction regimen while NPO.".into(),
            caveat: Some(
                "Ensure hypoglycaemia prevention plan and fluids if needed per local protocol."
                    .into(),
            ),
        });
    }

    recs
}

/// Suggested dose after scaling by `factor`, never below one unit
///
/// `None` when there is no usable current dose.
pub fn scaled_dose(dose: Option<f64>, factor: f64) -> Option<f64> {
    dose.filter(|d| *d != 0.0)
        .map(|d| round_half_up(d * factor).max(1.0))
}

fn dose_example(dose: Option<f64>, factor: f64) -> String {
    match (dose, scaled_dose(dose, factor)) {
        (Some(current), Some(suggested)) => {
            format!(" Example: {} → {} units", current, suggested)
        }
        _ => String::new(),
    }
}
