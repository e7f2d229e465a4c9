#![forbid(unsafe_code)]

//! Core domain model and rules for the inpatient glucose advisor.
//!
//! This crate provides:
//! - Domain types (readings, medications, context, findings)
//! - Reading normalization and time-window helpers
//! - Insulin catalogue
//! - Rules engine (alerts and advisories) and titration engine
//! - Form state reducer, data checker and demo form
//!
//! Prototype only: a rules lookup for education, not a medical device.

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod input;
pub mod normalize;
pub mod windowing;
pub mod rules;
pub mod titration;
pub mod advice;
pub mod check;
pub mod demo;
pub mod import;
pub mod state;

// Re-export commonly used types
pub use error::{Error, ParseError, Result};
pub use types::*;
pub use catalog::insulin_catalogue;
pub use config::{Config, Targets};
pub use input::{RawContext, RawInsulinEntry, RawMedications, RawReading, RawValue};
pub use normalize::{normalize, normalize_with_report, NormalizeReport};
pub use rules::evaluate;
pub use titration::{bounded_percent_change, suggest_titration};
pub use advice::advise;
pub use check::DataCheck;
pub use import::load_readings_csv;
pub use state::{Command, FormState};
