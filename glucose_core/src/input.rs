//! Raw form shapes and their mapping onto the canonical model.
//!
//! The form hands us loosely typed data: numbers that may arrive as text,
//! oral-agent fields duplicated between the medication and context sections,
//! and a morning-steroid checkbox alongside a structured steroid course.
//! Everything is folded into one `MedicationState` and one `ClinicalContext`
//! here, so the engines never see the overlap.

use crate::catalog::insulin_catalogue;
use crate::normalize::parse_value;
use crate::types::*;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A form value that may be a JSON number or free text
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::Text(String::new())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

pub(crate) fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A reading row exactly as entered
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    #[serde(default = "new_row_id")]
    pub id: String,
    #[serde(default, alias = "ts")]
    pub timestamp: String,
    #[serde(default)]
    pub value: RawValue,
}

impl RawReading {
    /// An empty row with a fresh id
    pub fn blank() -> Self {
        Self {
            id: new_row_id(),
            timestamp: String::new(),
            value: RawValue::default(),
        }
    }
}

/// Medication checkboxes and doses
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMedications {
    pub basal_insulin: bool,
    pub basal_dose: Option<RawValue>,
    pub bolus_insulin: bool,
    pub su: bool,
    pub su_name: Option<String>,
    pub su_dose: Option<RawValue>,
    pub metformin: bool,
    pub sglt2: bool,
    #[serde(rename = "steroidAM")]
    pub steroid_am: bool,
}

/// Structured steroid course from the context section
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSteroid {
    pub on: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub route: Option<String>,
    pub dose: Option<RawValue>,
    #[serde(alias = "time")]
    pub timing: Option<String>,
    pub duration: Option<RawValue>,
}

/// Clinical context section, including the oral-agent fields it duplicates
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContext {
    pub egfr: Option<RawValue>,
    pub npo: bool,
    /// "normal", "reduced" or "nil-by-mouth"
    pub carb_intake: Option<String>,
    #[serde(alias = "weight")]
    pub weight_kg: Option<RawValue>,
    pub albumin: Option<RawValue>,
    pub diabetes_type: Option<String>,
    pub steroid: Option<RawSteroid>,
    pub metformin: bool,
    pub metformin_dose: Option<RawValue>,
    pub su: bool,
    pub su_name: Option<String>,
    pub su_dose: Option<RawValue>,
}

/// A row of the insulin regimen editor
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawInsulinEntry {
    #[serde(default = "new_row_id")]
    pub id: String,
    #[serde(default)]
    pub insulin_id: String,
    #[serde(default)]
    pub dose_units: Option<RawValue>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Parse an optional numeric field; anything unparseable is absent
fn number(field: &str, raw: Option<&RawValue>) -> Option<f64> {
    let raw = raw?;
    match parse_value(raw) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::debug!("Treating {} as absent: {}", field, e);
            None
        }
    }
}

fn non_empty(s: Option<&String>) -> Option<String> {
    s.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_timing(raw: &str) -> SteroidTiming {
    match raw.trim().to_lowercase().as_str() {
        "am" | "morning" | "mane" | "om" => SteroidTiming::Morning,
        "pm" | "evening" | "nocte" | "on" => SteroidTiming::Evening,
        "bd" | "divided" | "twice daily" | "split" => SteroidTiming::Divided,
        _ => SteroidTiming::Unspecified,
    }
}

fn parse_diabetes_type(raw: &str) -> Option<DiabetesType> {
    let key: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    match key.as_str() {
        "" => None,
        "1" | "t1" | "t1dm" | "type1" => Some(DiabetesType::Type1),
        "2" | "t2" | "t2dm" | "type2" => Some(DiabetesType::Type2),
        _ => Some(DiabetesType::Other),
    }
}

impl RawInsulinEntry {
    /// Map to the canonical entry; an unreadable time or dose is absent
    pub fn to_entry(&self) -> InsulinEntry {
        let time = self
            .time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok());

        InsulinEntry {
            id: self.id.clone(),
            insulin_id: self.insulin_id.trim().to_string(),
            dose_units: number("doseUnits", self.dose_units.as_ref()),
            time,
        }
    }
}

impl RawSteroid {
    fn to_course(&self) -> SteroidCourse {
        SteroidCourse {
            on: self.on,
            kind: non_empty(self.kind.as_ref()),
            route: non_empty(self.route.as_ref()),
            dose_mg: number("steroid.dose", self.dose.as_ref()),
            timing: self
                .timing
                .as_deref()
                .map(parse_timing)
                .unwrap_or_default(),
            duration_days: number("steroid.duration", self.duration.as_ref()),
        }
    }
}

/// Fold the raw medication, context and insulin sections into the canonical pair
///
/// Mapping rules:
/// - Oral-agent flags are set if either section sets them; names and doses
///   prefer the medication section.
/// - Basal/bolus flags are also set by any catalogue-classified insulin entry.
/// - The basal dose prefers a non-zero form dose, then the first basal entry.
/// - The morning-steroid checkbox turns the steroid course on with morning
///   timing, whatever timing the course itself records.
pub fn to_canonical(
    meds: &RawMedications,
    context: &RawContext,
    insulins: &[RawInsulinEntry],
) -> (MedicationState, ClinicalContext) {
    let catalogue = insulin_catalogue();
    let entries: Vec<InsulinEntry> = insulins.iter().map(RawInsulinEntry::to_entry).collect();

    let has_role = |role: InsulinRole| {
        entries
            .iter()
            .any(|e| catalogue.classify(&e.insulin_id) == role)
    };
    let first_basal_dose = entries
        .iter()
        .filter(|e| catalogue.classify(&e.insulin_id) == InsulinRole::Basal)
        .find_map(|e| e.dose_units);

    let basal_dose = number("basalDose", meds.basal_dose.as_ref())
        .filter(|d| *d != 0.0)
        .or(first_basal_dose);

    let medication = MedicationState {
        basal_insulin: meds.basal_insulin || has_role(InsulinRole::Basal),
        basal_dose,
        bolus_insulin: meds.bolus_insulin || has_role(InsulinRole::Bolus),
        sulfonylurea: meds.su || context.su,
        sulfonylurea_name: non_empty(meds.su_name.as_ref())
            .or_else(|| non_empty(context.su_name.as_ref())),
        sulfonylurea_dose: number("suDose", meds.su_dose.as_ref())
            .or_else(|| number("context.suDose", context.su_dose.as_ref())),
        metformin: meds.metformin || context.metformin,
        metformin_dose: number("metforminDose", context.metformin_dose.as_ref()),
        sglt2: meds.sglt2,
        insulins: entries,
    };

    let mut steroid = context
        .steroid
        .as_ref()
        .map(RawSteroid::to_course)
        .unwrap_or_default();
    if meds.steroid_am {
        steroid.on = true;
        steroid.timing = SteroidTiming::Morning;
    }

    let nil_by_mouth = context
        .carb_intake
        .as_deref()
        .is_some_and(|c| c.trim().eq_ignore_ascii_case("nil-by-mouth"));

    let clinical = ClinicalContext {
        egfr: number("egfr", context.egfr.as_ref()),
        npo: context.npo || nil_by_mouth,
        weight_kg: number("weightKg", context.weight_kg.as_ref()),
        albumin: number("albumin", context.albumin.as_ref()),
        diabetes_type: context.diabetes_type.as_deref().and_then(parse_diabetes_type),
        steroid,
    };

    (medication, clinical)
}
