//! Core domain types for the glucose advisor.
//!
//! This module defines the canonical types the engines consume and produce:
//! - Normalized readings
//! - Insulin catalogue entries and their functional roles
//! - Medication state and clinical context (one canonical shape each)
//! - Alerts, recommendations and summary statistics

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Readings
// ============================================================================

/// A reading that survived normalization.
///
/// `timestamp` keeps the text as entered so findings can cite it verbatim;
/// `ts_date` is the parsed local time everything else works from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NormalizedReading {
    pub id: String,
    pub timestamp: String,
    pub value: f64,
    pub ts_date: NaiveDateTime,
}

// ============================================================================
// Insulin Catalogue Types
// ============================================================================

/// Pharmacologic action class of an insulin product
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    Rapid,
    Short,
    Intermediate,
    Long,
    Premix,
}

/// Functional role an insulin plays in a regimen
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsulinRole {
    Basal,
    Bolus,
    Premix,
    /// Not in the catalogue; excluded from role-based logic
    None,
}

impl From<ActionClass> for InsulinRole {
    fn from(acting: ActionClass) -> Self {
        match acting {
            ActionClass::Long | ActionClass::Intermediate => InsulinRole::Basal,
            ActionClass::Rapid | ActionClass::Short => InsulinRole::Bolus,
            ActionClass::Premix => InsulinRole::Premix,
        }
    }
}

/// A reference entry in the insulin catalogue
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsulinCatalogueEntry {
    pub id: String,
    pub brand: String,
    pub generic: String,
    pub acting: ActionClass,
    pub onset_min: u32,
    /// `None` for peakless (flat) profiles
    pub peak_min: Option<u32>,
    pub duration_h: f64,
    pub tags: Vec<String>,
}

/// The read-only insulin reference table
#[derive(Clone, Debug)]
pub struct InsulinCatalogue {
    pub entries: Vec<InsulinCatalogueEntry>,
}

// ============================================================================
// Medication and Context
// ============================================================================

/// One insulin in the structured regimen list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsulinEntry {
    pub id: String,
    pub insulin_id: String,
    pub dose_units: Option<f64>,
    pub time: Option<NaiveTime>,
}

/// Canonical medication state consumed by both engines
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct MedicationState {
    pub basal_insulin: bool,
    pub basal_dose: Option<f64>,
    pub bolus_insulin: bool,
    pub sulfonylurea: bool,
    pub sulfonylurea_name: Option<String>,
    pub sulfonylurea_dose: Option<f64>,
    pub metformin: bool,
    pub metformin_dose: Option<f64>,
    pub sglt2: bool,
    pub insulins: Vec<InsulinEntry>,
}

/// When a systemic steroid is given during the day
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SteroidTiming {
    Morning,
    Evening,
    Divided,
    #[default]
    Unspecified,
}

/// Systemic steroid course
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct SteroidCourse {
    pub on: bool,
    pub kind: Option<String>,
    pub route: Option<String>,
    pub dose_mg: Option<f64>,
    pub timing: SteroidTiming,
    pub duration_days: Option<f64>,
}

impl SteroidCourse {
    /// Once-daily morning steroid, the pattern behind afternoon hyperglycaemia
    pub fn is_morning_dose(&self) -> bool {
        self.on && self.timing == SteroidTiming::Morning
    }
}

/// Diabetes type, carried for the data checker
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiabetesType {
    Type1,
    Type2,
    Other,
}

/// Canonical patient context
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ClinicalContext {
    pub egfr: Option<f64>,
    pub npo: bool,
    pub weight_kg: Option<f64>,
    pub albumin: Option<f64>,
    pub diabetes_type: Option<DiabetesType>,
    pub steroid: SteroidCourse,
}

// ============================================================================
// Findings
// ============================================================================

/// Urgency of an alert
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Act now
    Stat,
    /// Review soon
    Warn,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub title: String,
    pub severity: Severity,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caveat: Option<String>,
}

/// Summary statistics over the last 24 hours
///
/// Means are `None` when no reading falls in their window, which is not the
/// same as a mean of zero.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub n24h: usize,
    pub any_hypo: bool,
    pub any_severe: bool,
    pub mean_24h: Option<f64>,
    pub overnight_lows: usize,
    pub pm_mean: Option<f64>,
}

/// Output of the rules engine
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct RulesOutput {
    pub alerts: Vec<Alert>,
    pub recs: Vec<Recommendation>,
    pub stats: Stats,
}

/// Rules output with titration suggestions appended, ready to render
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Advice {
    pub alerts: Vec<Alert>,
    pub recs: Vec<Recommendation>,
    pub stats: Stats,
}
