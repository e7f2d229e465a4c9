//! Form state and its single update entry point.
//!
//! `FormState` is an immutable value. Every edit goes through
//! `FormState::apply` with a `Command` and yields a new state; evaluation
//! reads a state and never changes it.

use crate::advice::advise;
use crate::check::DataCheck;
use crate::demo::{demo_form, format_timestamp};
use crate::input::{
    to_canonical, RawContext, RawInsulinEntry, RawMedications, RawReading, RawValue,
};
use crate::normalize::{normalize_with_report, NormalizeReport};
use crate::rules::evaluate;
use crate::{Advice, ClinicalContext, Config, Error, MedicationState, NormalizedReading, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the form holds, exactly as entered
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(default)]
    pub readings: Vec<RawReading>,
    #[serde(default)]
    pub meds: RawMedications,
    #[serde(default)]
    pub context: RawContext,
    #[serde(default)]
    pub insulin_meds: Vec<RawInsulinEntry>,
}

impl Default for FormState {
    /// A fresh form has one blank reading row
    fn default() -> Self {
        Self {
            readings: vec![RawReading::blank()],
            meds: RawMedications::default(),
            context: RawContext::default(),
            insulin_meds: Vec::new(),
        }
    }
}

/// A single edit to the form
#[derive(Clone, Debug)]
pub enum Command {
    /// Append a row; blank, or stamped with the given time
    AddReading { at: Option<NaiveDateTime> },
    UpdateReading {
        id: String,
        timestamp: String,
        value: RawValue,
    },
    RemoveReading { id: String },
    /// Reset to a single blank row
    ClearReadings,
    /// Replace readings, medications and context with the demo form
    LoadDemo { now: NaiveDateTime },
    SetMedications(RawMedications),
    SetContext(RawContext),
    AddInsulin(RawInsulinEntry),
    UpdateInsulin { id: String, entry: RawInsulinEntry },
    RemoveInsulin { id: String },
}

/// Canonical inputs derived from a form
#[derive(Clone, Debug)]
pub struct CanonicalInputs {
    pub readings: Vec<NormalizedReading>,
    pub meds: MedicationState,
    pub context: ClinicalContext,
    pub report: NormalizeReport,
}

impl FormState {
    /// Apply one command, returning the updated state
    ///
    /// Commands naming an unknown row id leave the state unchanged.
    pub fn apply(self, command: Command) -> Self {
        let mut next = self;

        match command {
            Command::AddReading { at } => {
                let mut row = RawReading::blank();
                if let Some(ts) = at {
                    row.timestamp = format_timestamp(ts);
                }
                next.readings.push(row);
            }

            Command::UpdateReading {
                id,
                timestamp,
                value,
            } => match next.readings.iter_mut().find(|r| r.id == id) {
                Some(row) => {
                    row.timestamp = timestamp;
                    row.value = value;
                }
                None => tracing::debug!("Update for unknown reading {:?} ignored", id),
            },

            Command::RemoveReading { id } => {
                next.readings.retain(|r| r.id != id);
            }

            Command::ClearReadings => {
                next.readings = vec![RawReading::blank()];
            }

            Command::LoadDemo { now } => {
                let demo = demo_form(now);
                next.readings = demo.readings;
                next.meds = demo.meds;
                next.context = demo.context;
            }

            Command::SetMedications(meds) => next.meds = meds,

            Command::SetContext(context) => next.context = context,

            Command::AddInsulin(entry) => next.insulin_meds.push(entry),

            Command::UpdateInsulin { id, entry } => {
                match next.insulin_meds.iter_mut().find(|m| m.id == id) {
                    Some(existing) => {
                        *existing = RawInsulinEntry {
                            id: existing.id.clone(),
                            ..entry
                        };
                    }
                    None => tracing::debug!("Update for unknown insulin entry {:?} ignored", id),
                }
            }

            Command::RemoveInsulin { id } => {
                next.insulin_meds.retain(|m| m.id != id);
            }
        }

        next
    }

    /// Normalize readings and fold medications/context into canonical form
    pub fn canonical(&self) -> CanonicalInputs {
        let (readings, report) = normalize_with_report(&self.readings);
        let (meds, context) = to_canonical(&self.meds, &self.context, &self.insulin_meds);

        CanonicalInputs {
            readings,
            meds,
            context,
            report,
        }
    }

    /// Run the full pipeline at `now`
    pub fn evaluate(&self, now: NaiveDateTime, config: &Config) -> Advice {
        let inputs = self.canonical();
        advise(
            &inputs.readings,
            &inputs.meds,
            &inputs.context,
            &config.targets,
            now,
            config.titration.lookback_days,
        )
    }

    /// Build the data-checker snapshot for this form at `now`
    pub fn data_check(&self, now: NaiveDateTime, config: &Config) -> DataCheck {
        let inputs = self.canonical();
        let rules = evaluate(&inputs.readings, &inputs.meds, &inputs.context, now);

        DataCheck::build(
            &inputs.readings,
            &inputs.report,
            &inputs.meds,
            &inputs.context,
            &rules.stats,
            now,
            config.titration.lookback_days,
        )
    }

    /// Load a form bundle from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let form: FormState = serde_json::from_str(&contents)
            .map_err(|e| Error::Input(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(
            "Loaded form from {:?}: {} readings, {} insulin entries",
            path,
            form.readings.len(),
            form.insulin_meds.len()
        );
        Ok(form)
    }
}
