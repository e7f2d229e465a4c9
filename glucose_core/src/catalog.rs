//! Built-in insulin catalogue.
//!
//! Static reference data used to classify a regimen entry into a functional
//! role (basal, bolus, premix). Read-only after construction.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached catalogue - built once and reused across all evaluations
static INSULIN_CATALOGUE: Lazy<InsulinCatalogue> = Lazy::new(build_insulin_catalogue);

/// Get a reference to the cached insulin catalogue
pub fn insulin_catalogue() -> &'static InsulinCatalogue {
    &INSULIN_CATALOGUE
}

/// Builds the built-in insulin catalogue
///
/// **Note**: For production use, prefer `insulin_catalogue()` which returns a
/// cached reference. This function is retained for testing.
pub fn build_insulin_catalogue() -> InsulinCatalogue {
    let entries = vec![
        // Rapid
        entry(
            "aspart",
            "NovoRapid",
            "Insulin aspart",
            ActionClass::Rapid,
            10,
            Some(60),
            4.0,
            &["prandial"],
        ),
        entry(
            "lispro",
            "Humalog",
            "Insulin lispro",
            ActionClass::Rapid,
            10,
            Some(60),
            4.0,
            &["prandial"],
        ),
        // Short
        entry(
            "regular",
            "Actrapid",
            "Regular insulin",
            ActionClass::Short,
            30,
            Some(120),
            6.0,
            &["prandial"],
        ),
        // Intermediate
        entry(
            "nph",
            "Insulatard",
            "Isophane (NPH)",
            ActionClass::Intermediate,
            90,
            Some(360),
            12.0,
            &["basal"],
        ),
        // Long
        entry(
            "glargine",
            "Lantus",
            "Insulin glargine U100",
            ActionClass::Long,
            90,
            None,
            24.0,
            &["basal"],
        ),
        entry(
            "detemir",
            "Levemir",
            "Insulin detemir",
            ActionClass::Long,
            90,
            None,
            20.0,
            &["basal"],
        ),
        entry(
            "degludec",
            "Tresiba",
            "Insulin degludec",
            ActionClass::Long,
            60,
            None,
            42.0,
            &["basal"],
        ),
        // Premix
        entry(
            "biphasic30",
            "NovoMix 30",
            "Biphasic aspart 30",
            ActionClass::Premix,
            10,
            Some(60),
            18.0,
            &["premix 30/70"],
        ),
    ];

    InsulinCatalogue { entries }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    brand: &str,
    generic: &str,
    acting: ActionClass,
    onset_min: u32,
    peak_min: Option<u32>,
    duration_h: f64,
    tags: &[&str],
) -> InsulinCatalogueEntry {
    InsulinCatalogueEntry {
        id: id.into(),
        brand: brand.into(),
        generic: generic.into(),
        acting,
        onset_min,
        peak_min,
        duration_h,
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
    }
}

impl InsulinCatalogue {
    /// All entries in catalogue order
    pub fn entries(&self) -> &[InsulinCatalogueEntry] {
        &self.entries
    }

    /// Find an entry by id (exact match)
    pub fn lookup(&self, id: &str) -> Option<&InsulinCatalogueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Classify an insulin id into its functional role
    ///
    /// Ids missing from the catalogue classify as `InsulinRole::None`.
    pub fn classify(&self, id: &str) -> InsulinRole {
        match self.lookup(id) {
            Some(meta) => InsulinRole::from(meta.acting),
            None => {
                tracing::debug!("Insulin id {:?} not in catalogue", id);
                InsulinRole::None
            }
        }
    }

    /// Validate the catalogue for internal consistency
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for e in &self.entries {
            if e.id.is_empty() {
                errors.push("Insulin has empty ID".to_string());
            }
            if !seen.insert(e.id.as_str()) {
                errors.push(format!("Duplicate insulin id '{}'", e.id));
            }
            if e.brand.is_empty() || e.generic.is_empty() {
                errors.push(format!("Insulin '{}' is missing a name", e.id));
            }
            if e.duration_h <= 0.0 {
                errors.push(format!("Insulin '{}' has non-positive duration", e.id));
            }
            if let Some(peak) = e.peak_min {
                if f64::from(peak) >= e.duration_h * 60.0 {
                    errors.push(format!(
                        "Insulin '{}': peak {} min is not before end of action ({} h)",
                        e.id, peak, e.duration_h
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_builds() {
        let catalogue = build_insulin_catalogue();
        assert_eq!(catalogue.entries().len(), 8);
    }

    #[test]
    fn test_default_catalogue_validates() {
        let errors = insulin_catalogue().validate();
        assert!(
            errors.is_empty(),
            "Default catalogue has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_classify_known_ids() {
        let catalogue = insulin_catalogue();
        assert_eq!(catalogue.classify("glargine"), InsulinRole::Basal);
        assert_eq!(catalogue.classify("nph"), InsulinRole::Basal);
        assert_eq!(catalogue.classify("aspart"), InsulinRole::Bolus);
        assert_eq!(catalogue.classify("regular"), InsulinRole::Bolus);
        assert_eq!(catalogue.classify("biphasic30"), InsulinRole::Premix);
    }

    #[test]
    fn test_unknown_id_classifies_as_none() {
        assert_eq!(insulin_catalogue().classify("toujeo"), InsulinRole::None);
        assert_eq!(insulin_catalogue().classify(""), InsulinRole::None);
    }

    #[test]
    fn test_validate_catches_duplicates_and_bad_peaks() {
        let mut catalogue = build_insulin_catalogue();
        let mut dup = catalogue.entries[0].clone();
        dup.peak_min = Some(600);
        catalogue.entries.push(dup);

        let errors = catalogue.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate insulin id 'aspart'")));
        assert!(errors.iter().any(|e| e.contains("peak 600 min")));
    }
}
