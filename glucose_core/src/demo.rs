//! Built-in demonstration form.

use crate::input::{new_row_id, RawContext, RawMedications, RawReading, RawValue};
use crate::state::FormState;
use chrono::{Duration, NaiveDateTime};

/// Readings as (hours before now, mmol/L)
const DEMO_READINGS: &[(i64, f64)] = &[(23, 3.2), (20, 7.8), (8, 14.2), (6, 12.9), (2, 11.4)];

/// Minute-resolution local timestamp, the form's entry format
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M").to_string()
}

/// A populated form anchored at `now`
///
/// Basal insulin 18 units, gliclazide 80 mg, metformin and a morning
/// steroid, with an eGFR of 28.
pub fn demo_form(now: NaiveDateTime) -> FormState {
    let readings = DEMO_READINGS
        .iter()
        .map(|(hours_ago, value)| RawReading {
            id: new_row_id(),
            timestamp: format_timestamp(now - Duration::hours(*hours_ago)),
            value: RawValue::Number(*value),
        })
        .collect();

    let meds = RawMedications {
        basal_insulin: true,
        basal_dose: Some(RawValue::Number(18.0)),
        bolus_insulin: false,
        su: true,
        su_name: Some("Gliclazide".into()),
        su_dose: Some(RawValue::Number(80.0)),
        metformin: true,
        sglt2: false,
        steroid_am: true,
    };

    let context = RawContext {
        egfr: Some(RawValue::Number(28.0)),
        npo: false,
        weight_kg: Some(RawValue::Number(78.0)),
        ..Default::default()
    };

    FormState {
        readings,
        meds,
        context,
        insulin_meds: Vec::new(),
    }
}
