//! Restriction overrides: layer substitutions driven by material restrictions.
//!
//! Only `avoid_aluminium` and `avoid_nylon` change layers. The mono-material
//! preferences and the PCR requirement are advisory and handled by the
//! constraint validator.
//!
//! Substitution matches on the material family being removed, and the
//! configured substitutes are validated at load time to come from neither
//! removed family, so applying the same flags twice changes nothing the
//! second time.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::catalog::{MaterialCatalog, PolymerFamily};

use super::types::{LayerRole, LayerSpec, OverrideConfig, Restriction, StructureRecommendation};

/// One family-to-material swap.
struct Substitution<'a> {
    remove: PolymerFamily,
    with: &'a str,
    force_role: Option<LayerRole>,
}

pub struct RestrictionOverrideEngine<'a> {
    catalog: &'a MaterialCatalog,
    overrides: &'a OverrideConfig,
}

impl<'a> RestrictionOverrideEngine<'a> {
    pub fn new(catalog: &'a MaterialCatalog, overrides: &'a OverrideConfig) -> Self {
        Self { catalog, overrides }
    }

    /// Return a copy of `structure` with every active substituting
    /// restriction applied. The input is never modified.
    pub fn apply(
        &self,
        structure: &StructureRecommendation,
        restrictions: &BTreeSet<Restriction>,
    ) -> StructureRecommendation {
        let mut layers = structure.layers().to_vec();
        let mut label = structure.label.clone();
        let mut changed = false;

        for restriction in restrictions {
            let substitution = match restriction {
                Restriction::AvoidAluminium => Substitution {
                    remove: PolymerFamily::AL,
                    with: &self.overrides.aluminium_substitute,
                    force_role: None,
                },
                Restriction::AvoidNylon => Substitution {
                    remove: PolymerFamily::PA,
                    with: &self.overrides.nylon_substitute,
                    force_role: Some(LayerRole::Surface),
                },
                Restriction::PreferPeMono | Restriction::PreferPpMono | Restriction::PcrRequired => {
                    continue
                }
            };

            if let Some(suffix) = self.substitute(&mut layers, &substitution) {
                label = format!("{} {}", label, suffix);
                changed = true;
            }
        }

        if !changed {
            return structure.clone();
        }

        debug!(
            "Overrides turned '{}' into '{}'",
            structure.profile_key(),
            layers
                .iter()
                .map(|l| self.catalog.abbreviation(&l.material))
                .collect::<Vec<_>>()
                .join("/")
        );
        match structure.with_layers(label, layers, self.catalog) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Override of '{}' discarded: {}", structure.label, e);
                structure.clone()
            }
        }
    }

    /// Swap every layer of the removed family in place. Returns the label
    /// suffix when anything was swapped.
    fn substitute(&self, layers: &mut [LayerSpec], substitution: &Substitution<'_>) -> Option<String> {
        let replacement_abbr = self.catalog.abbreviation(substitution.with);
        let replacement_name = self
            .catalog
            .get(substitution.with)
            .map(|m| m.name.as_str())
            .unwrap_or(substitution.with);

        let mut replaced_abbr: Option<String> = None;

        for layer in layers.iter_mut() {
            if self.catalog.family(&layer.material).as_ref() != Some(&substitution.remove) {
                continue;
            }
            let original_abbr = self.catalog.abbreviation(&layer.material).to_string();

            *layer = LayerSpec {
                material: substitution.with.to_string(),
                role: substitution.force_role.unwrap_or(layer.role),
                function: format!(
                    "{} replacing {} ({})",
                    replacement_name, original_abbr, layer.function
                ),
                thickness: layer.thickness.clone(),
                substituted_from: Some(layer.material.clone()),
            };

            replaced_abbr.get_or_insert(original_abbr);
        }

        replaced_abbr.map(|orig| format!("[{} → {}]", orig, replacement_abbr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{default_reference_data, ReferenceData};

    fn flags(list: &[Restriction]) -> BTreeSet<Restriction> {
        list.iter().copied().collect()
    }

    fn retort_conventional(data: &ReferenceData) -> StructureRecommendation {
        data.rules
            .get("retort_standard")
            .expect("retort_standard rule")
            .conventional
            .clone()
    }

    #[test]
    fn test_avoid_aluminium_replaces_foil() {
        let data = default_reference_data();
        let engine = RestrictionOverrideEngine::new(&data.materials, &data.overrides);
        let original = retort_conventional(&data);

        let result = engine.apply(&original, &flags(&[Restriction::AvoidAluminium]));

        assert!(
            result
                .layers()
                .iter()
                .all(|l| data.materials.family(&l.material) != Some(PolymerFamily::AL)),
            "No AL-family layer should remain: {:?}",
            result.layers()
        );
        assert_eq!(result.profile_key(), "PET/NY/AlOx-PET/RCPP");

        let swapped = &result.layers()[2];
        assert_eq!(swapped.material, "PET_ALOX");
        assert_eq!(swapped.role, LayerRole::Barrier, "Role should be preserved");
        assert_eq!(swapped.thickness, "7–9µm", "Thickness should be preserved");
        assert_eq!(swapped.substituted_from.as_deref(), Some("AL_FOIL"));
        assert!(swapped.function.contains("replacing AL"));
        assert!(result.label.ends_with("[AL → AlOx-PET]"), "Label: {}", result.label);
    }

    #[test]
    fn test_avoid_nylon_forces_surface_role() {
        let data = default_reference_data();
        let engine = RestrictionOverrideEngine::new(&data.materials, &data.overrides);
        let original = retort_conventional(&data);

        let result = engine.apply(&original, &flags(&[Restriction::AvoidNylon]));

        let swapped = &result.layers()[1];
        assert_eq!(swapped.material, "MDO_PE");
        assert_eq!(swapped.role, LayerRole::Surface);
        assert_eq!(swapped.substituted_from.as_deref(), Some("BOPA"));
        assert_eq!(result.profile_key(), "PET/MDO-PE/AL/RCPP");
    }

    #[test]
    fn test_original_structure_untouched() {
        let data = default_reference_data();
        let engine = RestrictionOverrideEngine::new(&data.materials, &data.overrides);
        let original = retort_conventional(&data);

        let _ = engine.apply(
            &original,
            &flags(&[Restriction::AvoidAluminium, Restriction::AvoidNylon]),
        );

        assert_eq!(original.profile_key(), "PET/NY/AL/RCPP");
        assert_eq!(
            data.rules.get("retort_standard").unwrap().conventional,
            original
        );
    }

    #[test]
    fn test_advisory_flags_do_not_mutate() {
        let data = default_reference_data();
        let engine = RestrictionOverrideEngine::new(&data.materials, &data.overrides);
        let original = retort_conventional(&data);

        let result = engine.apply(
            &original,
            &flags(&[
                Restriction::PreferPeMono,
                Restriction::PreferPpMono,
                Restriction::PcrRequired,
            ]),
        );
        assert_eq!(result, original);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let data = default_reference_data();
        let engine = RestrictionOverrideEngine::new(&data.materials, &data.overrides);
        let all = [
            Restriction::AvoidAluminium,
            Restriction::AvoidNylon,
            Restriction::PreferPeMono,
            Restriction::PreferPpMono,
            Restriction::PcrRequired,
        ];

        // Every subset of the five flags against every structure in the table.
        for mask in 0u32..(1 << all.len()) {
            let set: BTreeSet<_> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, r)| *r)
                .collect();
            for rule in data.rules.rules() {
                for structure in [&rule.conventional, &rule.sustainable] {
                    let once = engine.apply(structure, &set);
                    let twice = engine.apply(&once, &set);
                    assert_eq!(once, twice, "Not idempotent for {} with {:?}", rule.id, set);
                }
            }
        }
    }

    #[test]
    fn test_unknown_material_left_alone() {
        let data = default_reference_data();
        let engine = RestrictionOverrideEngine::new(&data.materials, &data.overrides);
        let structure = StructureRecommendation::new(
            "Mystery",
            vec![LayerSpec {
                material: "MYSTERY_FOIL".to_string(),
                role: LayerRole::Barrier,
                function: "Unknown".to_string(),
                thickness: "9µm".to_string(),
                substituted_from: None,
            }],
            None,
            None,
            &data.materials,
        )
        .unwrap();

        let result = engine.apply(&structure, &flags(&[Restriction::AvoidAluminium]));
        assert_eq!(result, structure);
    }
}
