//! Data checker: a reviewable snapshot of exactly what the engines consumed.

use crate::catalog::insulin_catalogue;
use crate::normalize::NormalizeReport;
use crate::windowing::last_24h;
use crate::{
    ClinicalContext, DiabetesType, InsulinEntry, InsulinRole, MedicationState, NormalizedReading,
    Result, SteroidCourse, Stats,
};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Version stamp of the rule set, tied to the crate release
pub const RULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hours covered by the rules engine window
pub const LOOKBACK_HOURS: u32 = 24;

#[derive(Clone, Debug, Serialize)]
pub struct CheckCounts {
    pub readings_used: usize,
    pub insulin_entries: usize,
    pub rejected_rows: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckOverview {
    pub diabetes_type: Option<DiabetesType>,
    pub lookback_hours: u32,
    pub lookback_days: usize,
    pub rule_version: &'static str,
    pub counts: CheckCounts,
}

/// An insulin entry with the role the catalogue gave it
#[derive(Clone, Debug, Serialize)]
pub struct ClassifiedInsulin {
    #[serde(flatten)]
    pub entry: InsulinEntry,
    pub role: InsulinRole,
}

#[derive(Clone, Debug, Serialize)]
pub struct OralAgents {
    pub metformin: bool,
    pub metformin_dose: Option<f64>,
    pub sulfonylurea: bool,
    pub sulfonylurea_name: Option<String>,
    pub sulfonylurea_dose: Option<f64>,
    pub sglt2: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckMedications {
    pub insulins: Vec<ClassifiedInsulin>,
    pub orals: OralAgents,
    pub steroid: SteroidCourse,
}

/// Everything passed to the engines for one evaluation
#[derive(Clone, Debug, Serialize)]
pub struct DataCheck {
    pub overview: CheckOverview,
    pub readings_used: Vec<NormalizedReading>,
    pub rejected: NormalizeReport,
    pub medications: CheckMedications,
    pub context: ClinicalContext,
    pub stats: Stats,
}

impl DataCheck {
    /// Assemble the snapshot from canonical inputs and the computed stats
    pub fn build(
        readings: &[NormalizedReading],
        report: &NormalizeReport,
        meds: &MedicationState,
        context: &ClinicalContext,
        stats: &Stats,
        now: NaiveDateTime,
        lookback_days: usize,
    ) -> Self {
        let catalogue = insulin_catalogue();
        let readings_used: Vec<NormalizedReading> =
            last_24h(readings, now).into_iter().cloned().collect();

        let insulins = meds
            .insulins
            .iter()
            .map(|e| ClassifiedInsulin {
                entry: e.clone(),
                role: catalogue.classify(&e.insulin_id),
            })
            .collect();

        Self {
            overview: CheckOverview {
                diabetes_type: context.diabetes_type,
                lookback_hours: LOOKBACK_HOURS,
                lookback_days,
                rule_version: RULE_VERSION,
                counts: CheckCounts {
                    readings_used: readings_used.len(),
                    insulin_entries: meds.insulins.len(),
                    rejected_rows: report.rejected.len(),
                },
            },
            readings_used,
            rejected: report.clone(),
            medications: CheckMedications {
                insulins,
                orals: OralAgents {
                    metformin: meds.metformin,
                    metformin_dose: meds.metformin_dose,
                    sulfonylurea: meds.sulfonylurea,
                    sulfonylurea_name: meds.sulfonylurea_name.clone(),
                    sulfonylurea_dose: meds.sulfonylurea_dose,
                    sglt2: meds.sglt2,
                },
                steroid: context.steroid.clone(),
            },
            context: context.clone(),
            stats: stats.clone(),
        }
    }

    /// Pretty-printed JSON, as shown to the reviewer
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::normalize::RejectedRow;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-11-06T12:00", "%Y-%m-%dT%H:%M").unwrap()
    }

    fn at(ts: &str, value: f64) -> NormalizedReading {
        NormalizedReading {
            id: ts.into(),
            timestamp: ts.into(),
            value,
            ts_date: NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").unwrap(),
        }
    }

    #[test]
    fn test_snapshot_counts_and_roles() {
        let readings = vec![at("2025-11-01T08:00", 6.0), at("2025-11-06T08:00", 7.0)];
        let report = NormalizeReport {
            accepted: 2,
            rejected: vec![RejectedRow {
                id: "x".into(),
                reason: ParseError::Empty,
            }],
        };
        let meds = MedicationState {
            insulins: vec![
                InsulinEntry {
                    id: "a".into(),
                    insulin_id: "glargine".into(),
                    dose_units: Some(20.0),
                    time: None,
                },
                InsulinEntry {
                    id: "b".into(),
                    insulin_id: "mystery".into(),
                    dose_units: None,
                    time: None,
                },
            ],
            ..Default::default()
        };

        let check = DataCheck::build(
            &readings,
            &report,
            &meds,
            &ClinicalContext::default(),
            &Stats::default(),
            now(),
            3,
        );

        assert_eq!(check.overview.counts.readings_used, 1);
        assert_eq!(check.overview.counts.insulin_entries, 2);
        assert_eq!(check.overview.counts.rejected_rows, 1);
        assert_eq!(check.overview.rule_version, RULE_VERSION);
        assert_eq!(check.medications.insulins[0].role, InsulinRole::Basal);
        assert_eq!(check.medications.insulins[1].role, InsulinRole::None);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let check = DataCheck::build(
            &[],
            &NormalizeReport::default(),
            &MedicationState::default(),
            &ClinicalContext::default(),
            &Stats::default(),
            now(),
            3,
        );
        let json: serde_json::Value =
            serde_json::from_str(&check.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["overview"]["lookback_hours"], 24);
        assert!(json["readings_used"].as_array().unwrap().is_empty());
        assert!(json["stats"]["mean_24h"].is_null());
    }
}
