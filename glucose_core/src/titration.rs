//! Titration suggestions from the structured insulin regimen.
//!
//! Looks at the most recent calendar days rather than a rolling window and
//! smooths each measure as a mean of daily means, so a day with many
//! readings counts the same as a day with one.
//!
//! Suggestion rules:
//! 1. **Basal** (first basal entry with a dose only):
//!    - Any overnight hypo day → reduce 10%
//!    - Else fasting mean above target → increase 5/7/10% by distance
//! 2. **Afternoon/evening**: PM mean above the post-prandial target (one
//!    unit more tolerant while on steroids) → prandial review, or suggest
//!    mealtime insulin when no bolus insulin is prescribed

use crate::catalog::insulin_catalogue;
use crate::config::Targets;
use crate::rules::HYPO_THRESHOLD;
use crate::windowing::{group_by_calendar_day, in_hour_window, mean, readings_in_window, DayBucket};
use crate::{InsulinEntry, InsulinRole, NormalizedReading, Recommendation};

/// Default number of calendar days considered
pub const DEFAULT_LOOKBACK_DAYS: usize = 3;

const FASTING_WINDOW: (f64, f64) = (4.0, 8.0);
const OVERNIGHT_WINDOW: (f64, f64) = (0.0, 6.0);
const PM_WINDOW: (f64, f64) = (14.0, 22.0);

/// Round half up, so 2.5 becomes 3 and -2.5 becomes -2
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Apply a percent change to a dose with safety bounds
///
/// - `pct` is clamped to `[-max_pct, max_pct]`
/// - when a change is intended but rounding would move the dose by less than
///   `min_abs`, the result is nudged one unit in the intended direction
/// - the result is never below one unit
pub fn bounded_percent_change(current: f64, pct: f64, min_abs: f64, max_pct: f64) -> f64 {
    let pct = pct.clamp(-max_pct, max_pct);
    let mut proposed = round_half_up(current * (1.0 + pct / 100.0));

    if pct != 0.0 && (proposed - current).abs() < min_abs {
        proposed += pct.signum();
    }

    proposed.max(1.0)
}

/// `bounded_percent_change` with the standard bounds (1 unit, 20%)
pub fn bounded_change(current: f64, pct: f64) -> f64 {
    bounded_percent_change(current, pct, 1.0, 20.0)
}

/// Percent increase for a fasting mean `diff` mmol/L above target
fn uptitration_pct(diff: f64) -> f64 {
    if diff >= 4.0 {
        10.0
    } else if diff >= 2.0 {
        7.0
    } else {
        5.0
    }
}

/// Mean of per-day means over a window, skipping days with no readings in it
fn mean_of_daily_means(days: &[DayBucket<'_>], window: (f64, f64)) -> Option<f64> {
    let daily: Vec<f64> = days
        .iter()
        .filter_map(|day| {
            mean(
                readings_in_window(day.readings.iter().copied(), window.0, window.1)
                    .iter()
                    .map(|r| r.value),
            )
        })
        .collect();
    mean(daily)
}

fn overnight_hypo_days(days: &[DayBucket<'_>]) -> usize {
    days.iter()
        .filter(|day| {
            day.readings.iter().any(|r| {
                in_hour_window(r, OVERNIGHT_WINDOW.0, OVERNIGHT_WINDOW.1)
                    && r.value < HYPO_THRESHOLD
            })
        })
        .count()
}

/// Produce basal and prandial titration suggestions
///
/// Only the last `lookback_days` day buckets are used. The basal suggestion,
/// if any, precedes the afternoon/evening one. Suggestions carry no caveat.
pub fn suggest_titration(
    readings: &[NormalizedReading],
    insulins: &[InsulinEntry],
    targets: &Targets,
    steroid_on: bool,
    lookback_days: usize,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let catalogue = insulin_catalogue();

    let all_days = group_by_calendar_day(readings);
    let days = &all_days[all_days.len().saturating_sub(lookback_days)..];
    let n_days = days.len();

    let fasting_mean = mean_of_daily_means(days, FASTING_WINDOW);
    let hypo_days = overnight_hypo_days(days);

    tracing::debug!(
        "Titration over {} days: fasting mean {:?}, overnight hypo days {}",
        n_days,
        fasting_mean,
        hypo_days
    );

    // 1) Basal: first basal entry with a known dose wins
    let basal_dose = insulins
        .iter()
        .filter(|e| catalogue.classify(&e.insulin_id) == InsulinRole::Basal)
        .find_map(|e| e.dose_units);

    if let Some(dose) = basal_dose {
        if hypo_days > 0 {
            let new_dose = bounded_change(dose, -10.0);
            out.push(Recommendation {
                title: "Overnight lows: consider basal reduction".into(),
                body: format!(
                    "Overnight hypoglycaemia detected on {}/{} recent days. Consider reducing basal ~10% (e.g., {} → {} units) and review evening intake/timing.",
                    hypo_days, n_days, dose, new_dose
                ),
                caveat: None,
            });
        } else if let Some(fasting) = fasting_mean.filter(|m| *m > targets.fasting_high) {
            let pct = uptitration_pct(fasting - targets.fasting_high);
            let new_dose = bounded_change(dose, pct);
            out.push(Recommendation {
                title: "Morning highs: consider basal uptitration".into(),
                body: format!(
                    "Mean fasting BG ~{:.1} mmol/L over {}d. Consider +{}% basal (e.g., {} → {} units). Check for missed doses and injection timing.",
                    fasting, n_days, pct, dose, new_dose
                ),
                caveat: None,
            });
        }
    }

    // 2) Afternoon/evening pattern
    let pm_mean = mean_of_daily_means(days, PM_WINDOW);
    let pm_threshold = if steroid_on {
        targets.pp_high + 1.0
    } else {
        targets.pp_high
    };

    if let Some(pm) = pm_mean.filter(|m| *m > pm_threshold) {
        let has_bolus = insulins
            .iter()
            .any(|e| catalogue.classify(&e.insulin_id) == InsulinRole::Bolus);

        if has_bolus {
            out.push(Recommendation {
                title: "Afternoon/evening highs: prandial/correction review".into(),
                body: format!(
                    "PM mean ~{:.1} mmol/L over {}d. Consider bolus titration or adjusting the correction scale, especially with steroid AM use.",
                    pm, n_days
                ),
                caveat: None,
            });
        } else {
            out.push(Recommendation {
                title: "Afternoon/evening highs without bolus insulin".into(),
                body: format!(
                    "PM mean ~{:.1} mmol/L. Consider introducing mealtime rapid insulin or structured correction dosing per local protocol.",
                    pm
                ),
                caveat: None,
            });
        }
    }

    out
}
