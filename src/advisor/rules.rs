//! TOML loading and validation of the reference tables.
//!
//! Provides two loading methods:
//! - `default_reference_data()` - Tables embedded in the binary at compile time
//! - `load_reference_data(dir)` - Tables from a directory, falling back to the
//!   embedded copy for any file the directory does not contain
//!
//! Both run the same validation, so a bad table is rejected at load time
//! instead of surfacing as a confusing recommendation later.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::catalog::{MaterialCatalog, MaterialsConfig, PolymerFamily};
use crate::error::AdvisorError;

use super::types::*;

pub const MATERIALS_FILE: &str = "materials.toml";
pub const RULES_FILE: &str = "structure_rules.toml";
pub const BARRIER_PROFILES_FILE: &str = "barrier_profiles.toml";

const DEFAULT_MATERIALS: &str = include_str!("../../config/materials.toml");
const DEFAULT_RULES: &str = include_str!("../../config/structure_rules.toml");
const DEFAULT_BARRIER_PROFILES: &str = include_str!("../../config/barrier_profiles.toml");

/// The three immutable reference tables plus override settings.
///
/// Built once at startup and handed to [`super::RecommendationEngine`];
/// nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub materials: MaterialCatalog,
    pub rules: RuleTable,
    pub barrier_profiles: BarrierProfileTable,
    pub overrides: OverrideConfig,
}

impl ReferenceData {
    /// Validate parsed configuration and build the lookup tables.
    pub fn from_configs(
        materials: MaterialsConfig,
        rules: StructureRulesConfig,
        barrier_profiles: BarrierProfilesConfig,
    ) -> Result<Self, AdvisorError> {
        let catalog = MaterialCatalog::new(materials.materials)?;

        validate_overrides(&rules.overrides, &catalog)?;

        let mut seen_ids = HashSet::new();
        let mut built = Vec::with_capacity(rules.rules.len());
        for rule in &rules.rules {
            if rule.applications.is_empty() {
                return Err(invalid(format!("rule '{}' lists no applications", rule.id)));
            }
            if !seen_ids.insert(rule.id.clone()) {
                return Err(invalid(format!("duplicate rule id '{}'", rule.id)));
            }
            built.push(build_rule(rule, &catalog)?);
        }

        if !seen_ids.insert(rules.fallback.id.clone()) {
            return Err(invalid(format!(
                "fallback rule id '{}' duplicates a regular rule",
                rules.fallback.id
            )));
        }
        let fallback = build_rule(&rules.fallback, &catalog)?;

        check_barrier_values("default", barrier_profiles.default)?;
        for (key, values) in &barrier_profiles.profiles {
            check_barrier_values(key, *values)?;
        }

        debug!(
            "Reference data: {} materials, {} rules, {} barrier profiles",
            catalog.len(),
            built.len(),
            barrier_profiles.profiles.len()
        );

        Ok(Self {
            materials: catalog,
            rules: RuleTable::new(built, fallback),
            barrier_profiles: BarrierProfileTable::new(
                barrier_profiles.profiles,
                barrier_profiles.default,
            ),
            overrides: rules.overrides,
        })
    }

    /// Parse and validate the three TOML documents.
    pub fn from_toml(materials: &str, rules: &str, barrier_profiles: &str) -> Result<Self> {
        let materials: MaterialsConfig =
            toml::from_str(materials).context("failed to parse materials table")?;
        let rules: StructureRulesConfig =
            toml::from_str(rules).context("failed to parse structure rules table")?;
        let barrier_profiles: BarrierProfilesConfig =
            toml::from_str(barrier_profiles).context("failed to parse barrier profile table")?;

        Ok(Self::from_configs(materials, rules, barrier_profiles)?)
    }
}

fn invalid(message: String) -> AdvisorError {
    AdvisorError::InvalidReferenceData(message)
}

fn validate_overrides(overrides: &OverrideConfig, catalog: &MaterialCatalog) -> Result<(), AdvisorError> {
    // Neither substitute may belong to a family that either restriction
    // removes, or one swap could feed the other.
    for (kind, id) in [
        ("aluminium", &overrides.aluminium_substitute),
        ("nylon", &overrides.nylon_substitute),
    ] {
        let substitute = catalog.require(id)?;
        if matches!(substitute.family, PolymerFamily::AL | PolymerFamily::PA) {
            return Err(invalid(format!(
                "{} substitute '{}' is in the removed family {}",
                kind,
                substitute.id,
                substitute.family.as_str()
            )));
        }
    }
    Ok(())
}

fn build_rule(rule: &RuleConfig, catalog: &MaterialCatalog) -> Result<Rule, AdvisorError> {
    if rule.id.trim().is_empty() {
        return Err(invalid("rule with empty id".to_string()));
    }
    let in_range = |v: u8| (SUSTAINABILITY_MIN..=SUSTAINABILITY_MAX).contains(&v);
    if !in_range(rule.sustainability_min)
        || !in_range(rule.sustainability_max)
        || rule.sustainability_min > rule.sustainability_max
    {
        return Err(invalid(format!(
            "rule '{}' has invalid sustainability range {}..={}",
            rule.id, rule.sustainability_min, rule.sustainability_max
        )));
    }

    Ok(Rule {
        id: rule.id.clone(),
        applications: rule.applications.iter().copied().collect(),
        sustainability_min: rule.sustainability_min,
        sustainability_max: rule.sustainability_max,
        conventional: build_structure(&rule.id, &rule.conventional, catalog)?,
        sustainable: build_structure(&rule.id, &rule.sustainable, catalog)?,
    })
}

fn build_structure(
    rule_id: &str,
    structure: &StructureConfig,
    catalog: &MaterialCatalog,
) -> Result<StructureRecommendation, AdvisorError> {
    for layer in &structure.layers {
        if !catalog.contains(&layer.material) {
            return Err(invalid(format!(
                "rule '{}' structure '{}' references unknown material '{}'",
                rule_id, structure.label, layer.material
            )));
        }
    }
    StructureRecommendation::new(
        structure.label.clone(),
        structure.layers.clone(),
        structure.notes.clone(),
        structure.rationale.clone(),
        catalog,
    )
    .map_err(|e| match e {
        AdvisorError::InvalidReferenceData(msg) => invalid(format!("rule '{}': {}", rule_id, msg)),
        other => other,
    })
}

fn check_barrier_values(key: &str, values: BarrierValues) -> Result<(), AdvisorError> {
    for (field, value) in [("otr", values.otr), ("wvtr", values.wvtr)] {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!(
                "barrier profile '{}' has invalid {} {}",
                key, field, value
            )));
        }
    }
    Ok(())
}

/// Load reference tables from a directory.
///
/// Each of `materials.toml`, `structure_rules.toml` and
/// `barrier_profiles.toml` is read from `dir` when present and taken from the
/// embedded defaults otherwise.
///
/// # Example
/// ```ignore
/// let data = load_reference_data(Path::new("/etc/laminate-advisor"))?;
/// ```
pub fn load_reference_data(dir: &Path) -> Result<ReferenceData> {
    let materials = read_or_default(dir, MATERIALS_FILE, DEFAULT_MATERIALS)?;
    let rules = read_or_default(dir, RULES_FILE, DEFAULT_RULES)?;
    let barrier_profiles = read_or_default(dir, BARRIER_PROFILES_FILE, DEFAULT_BARRIER_PROFILES)?;

    ReferenceData::from_toml(&materials, &rules, &barrier_profiles)
        .with_context(|| format!("invalid reference data in {:?}", dir))
}

fn read_or_default(dir: &Path, name: &str, embedded: &str) -> Result<String> {
    let path = dir.join(name);
    if path.is_file() {
        debug!("Loading {} from {:?}", name, path);
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {:?}", path))
    } else {
        debug!("{} not found in {:?}, using embedded copy", name, dir);
        Ok(embedded.to_string())
    }
}

/// Reference tables embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a build-time bug,
/// covered by `test_default_reference_data_loads`).
pub fn default_reference_data() -> ReferenceData {
    ReferenceData::from_toml(DEFAULT_MATERIALS, DEFAULT_RULES, DEFAULT_BARRIER_PROFILES)
        .expect("embedded reference tables must be valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reference_data_loads() {
        let data = default_reference_data();
        assert!(!data.materials.is_empty(), "Should have materials");
        assert!(!data.rules.rules().is_empty(), "Should have rules");
        assert!(!data.barrier_profiles.is_empty(), "Should have barrier profiles");
        assert_eq!(data.rules.fallback().id, "general_purpose");
    }

    #[test]
    fn test_every_application_has_a_rule() {
        let data = default_reference_data();
        for app in Application::ALL {
            assert!(data.rules.covers(app), "No rule covers {}", app.id());
        }
    }

    #[test]
    fn test_rule_ranges_are_ordered() {
        let data = default_reference_data();
        for rule in data.rules.rules() {
            assert!(
                rule.sustainability_min <= rule.sustainability_max,
                "Rule {} has inverted range",
                rule.id
            );
        }
    }

    #[test]
    fn test_profile_keys_derived_from_abbreviations() {
        let data = default_reference_data();
        let retort = data.rules.get("retort_standard").expect("retort_standard rule");
        assert_eq!(retort.conventional.profile_key(), "PET/NY/AL/RCPP");
        assert_eq!(retort.sustainable.profile_key(), "BOPP/EVOH/RCPP");
    }

    #[test]
    fn test_default_structures_have_barrier_profiles() {
        let data = default_reference_data();
        for rule in data.rules.rules().iter().chain(std::iter::once(data.rules.fallback())) {
            for structure in [&rule.conventional, &rule.sustainable] {
                assert!(
                    data.barrier_profiles.get(structure.profile_key()).is_some(),
                    "Rule {} structure '{}' key {} has no barrier profile",
                    rule.id,
                    structure.label,
                    structure.profile_key()
                );
            }
        }
    }

    #[test]
    fn test_unknown_layer_material_rejected() {
        let rules = DEFAULT_RULES.replace("\"BOPA\"", "\"UNOBTAINIUM\"");
        let err = ReferenceData::from_toml(DEFAULT_MATERIALS, &rules, DEFAULT_BARRIER_PROFILES)
            .unwrap_err();
        assert!(
            format!("{:#}", err).contains("UNOBTAINIUM"),
            "Error should name the material: {:#}",
            err
        );
    }

    #[test]
    fn test_inverted_sustainability_range_rejected() {
        let rules = DEFAULT_RULES.replacen("sustainability_min = 4", "sustainability_min = 4\nsustainability_max = 2", 1);
        assert!(ReferenceData::from_toml(DEFAULT_MATERIALS, &rules, DEFAULT_BARRIER_PROFILES).is_err());
    }

    #[test]
    fn test_empty_layer_list_rejected() {
        let rules = r#"
            rules = []

            [overrides]
            aluminium_substitute = "PET_ALOX"
            nylon_substitute = "MDO_PE"

            [fallback]
            id = "general_purpose"

            [fallback.conventional]
            label = "Nothing"
            layers = []

            [fallback.sustainable]
            label = "PE"
            layers = [{ material = "LLDPE", role = "sealant", function = "Sealant", thickness = "50µm" }]
        "#;
        let err = ReferenceData::from_toml(DEFAULT_MATERIALS, rules, DEFAULT_BARRIER_PROFILES).unwrap_err();
        assert!(format!("{:#}", err).contains("no layers"), "Unexpected error: {:#}", err);
    }

    #[test]
    fn test_aluminium_substitute_must_not_be_aluminium() {
        let rules = DEFAULT_RULES.replace(
            "aluminium_substitute = \"PET_ALOX\"",
            "aluminium_substitute = \"AL_FOIL\"",
        );
        assert!(ReferenceData::from_toml(DEFAULT_MATERIALS, &rules, DEFAULT_BARRIER_PROFILES).is_err());
    }

    #[test]
    fn test_substitutes_must_not_feed_each_other() {
        for (from, to) in [
            ("nylon_substitute = \"MDO_PE\"", "nylon_substitute = \"AL_FOIL\""),
            ("aluminium_substitute = \"PET_ALOX\"", "aluminium_substitute = \"BOPA\""),
        ] {
            let rules = DEFAULT_RULES.replace(from, to);
            assert_ne!(rules, DEFAULT_RULES, "Replacement '{}' did not apply", from);
            let err = ReferenceData::from_toml(DEFAULT_MATERIALS, &rules, DEFAULT_BARRIER_PROFILES)
                .unwrap_err();
            assert!(
                format!("{:#}", err).contains("removed family"),
                "Unexpected error for '{}': {:#}",
                to,
                err
            );
        }
    }

    #[test]
    fn test_negative_barrier_profile_rejected() {
        let profiles = format!(
            "{}\n\"BROKEN\" = {{ otr = -1.0, wvtr = 1.0 }}\n",
            DEFAULT_BARRIER_PROFILES
        );
        assert!(ReferenceData::from_toml(DEFAULT_MATERIALS, DEFAULT_RULES, &profiles).is_err());
    }

    #[test]
    fn test_load_from_directory_falls_back_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = r#"
            [default]
            otr = 42.0
            wvtr = 4.2

            [profiles]
            "PET/LLDPE" = { otr = 45.0, wvtr = 8.0 }
        "#;
        std::fs::write(dir.path().join(BARRIER_PROFILES_FILE), profiles).unwrap();

        let data = load_reference_data(dir.path()).unwrap();
        assert_eq!(data.barrier_profiles.len(), 1);
        assert_eq!(data.barrier_profiles.default_point().otr, 42.0);
        // Materials and rules came from the embedded copies.
        assert!(data.materials.contains("AL_FOIL"));
        assert!(data.rules.covers(Application::Retort));
    }

    #[test]
    fn test_load_from_directory_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MATERIALS_FILE), "this is not toml [").unwrap();
        let err = load_reference_data(dir.path()).unwrap_err();
        assert!(
            format!("{:#}", err).contains("materials"),
            "Error should mention the materials table: {:#}",
            err
        );
    }
}
