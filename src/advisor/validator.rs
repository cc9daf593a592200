use std::collections::BTreeSet;

use crate::catalog::{Capability, MaterialCatalog, PolymerFamily};

use super::types::{
    Application, BarrierRequirement, LayerRole, LayerSpec, MechanicalRequirement, Restriction,
    StructureRecommendation,
};

/// Catalog capability a layer needs to satisfy a barrier requirement on its
/// own. `Low` and `Medium` are met by any laminate.
pub fn required_capability(requirement: BarrierRequirement) -> Option<Capability> {
    match requirement {
        BarrierRequirement::Low | BarrierRequirement::Medium => None,
        BarrierRequirement::HighOtr => Some(Capability::HighOtr),
        BarrierRequirement::HighMoisture => Some(Capability::HighMoisture),
        BarrierRequirement::Light => Some(Capability::Light),
        BarrierRequirement::Aroma => Some(Capability::Aroma),
    }
}

/// Mechanical requirements implied by the application even when the request
/// does not list them.
pub fn implied_mechanical(application: Application) -> &'static [MechanicalRequirement] {
    match application {
        Application::Retort => &[MechanicalRequirement::Retort],
        Application::Vacuum => &[MechanicalRequirement::Vacuum],
        Application::FrozenFood => &[MechanicalRequirement::ColdChain],
        Application::Lidding => &[MechanicalRequirement::Peelable],
        _ => &[],
    }
}

/// Advisory checks of one structure against the requested constraints.
///
/// Checks run in a fixed order: restriction advisories, then barrier
/// requirements, then mechanical requirements, each group in flag
/// declaration order. Warnings never block a recommendation.
pub struct ConstraintValidator<'a> {
    catalog: &'a MaterialCatalog,
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(catalog: &'a MaterialCatalog) -> Self {
        Self { catalog }
    }

    pub fn validate(
        &self,
        structure: &StructureRecommendation,
        barriers: &BTreeSet<BarrierRequirement>,
        mechanical: &BTreeSet<MechanicalRequirement>,
        restrictions: &BTreeSet<Restriction>,
        application: Application,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        let layers = structure.layers();

        for restriction in restrictions {
            if let Some(message) = self.restriction_advisory(*restriction, layers) {
                warnings.push(message);
            }
        }

        for requirement in barriers {
            let Some(capability) = required_capability(*requirement) else {
                continue;
            };
            if !self.has_layer_with(layers, capability) {
                warnings.push(format!(
                    "{} requested but the conventional structure has no qualifying layer (needs one of {})",
                    requirement.label(),
                    self.abbreviations(capability)
                ));
            }
        }

        let mut effective: BTreeSet<MechanicalRequirement> = mechanical.clone();
        effective.extend(implied_mechanical(application).iter().copied());

        for requirement in &effective {
            if let Some(message) = self.mechanical_check(*requirement, layers) {
                warnings.push(message);
            }
        }

        warnings
    }

    fn restriction_advisory(&self, restriction: Restriction, layers: &[LayerSpec]) -> Option<String> {
        match restriction {
            Restriction::AvoidAluminium => self
                .substitution_notice(layers, PolymerFamily::AL)
                .map(|swap| {
                    format!(
                        "Aluminium avoided: {}. Coated-film barrier and aroma retention must be validated against the foil baseline.",
                        swap
                    )
                }),
            Restriction::AvoidNylon => self
                .substitution_notice(layers, PolymerFamily::PA)
                .map(|swap| {
                    format!(
                        "Nylon avoided: {}. Puncture and vacuum performance may be reduced.",
                        swap
                    )
                }),
            Restriction::PreferPeMono => Some(self.mono_preference(
                layers,
                PolymerFamily::PE,
                "Prefer mono-PE: prioritise MDO-PE + LLDPE, with EVOH if barrier is needed.",
            )),
            Restriction::PreferPpMono => Some(self.mono_preference(
                layers,
                PolymerFamily::PP,
                "Prefer mono-PP: prioritise BOPP + VMOPP/VMCPP or BOPP-HS.",
            )),
            Restriction::PcrRequired => {
                let sealants: Vec<&str> = layers
                    .iter()
                    .filter(|l| l.role == LayerRole::Sealant)
                    .map(|l| self.catalog.abbreviation(&l.material))
                    .collect();
                let target = if sealants.is_empty() {
                    "the inner layers".to_string()
                } else {
                    sealants.join(", ")
                };
                Some(format!(
                    "PCR required: incorporate post-consumer recycled content in {} (PCR-PE or PCR-PP via mass balance or mechanical recycling).",
                    target
                ))
            }
        }
    }

    /// "AL → AlOx-PET" style summary of the layers swapped away from `family`.
    fn substitution_notice(&self, layers: &[LayerSpec], family: PolymerFamily) -> Option<String> {
        let swaps: Vec<String> = layers
            .iter()
            .filter_map(|l| {
                let original = l.substituted_from.as_deref()?;
                (self.catalog.family(original).as_ref() == Some(&family)).then(|| {
                    format!(
                        "{} replaced with {}",
                        self.catalog.abbreviation(original),
                        self.catalog.abbreviation(&l.material)
                    )
                })
            })
            .collect();

        if swaps.is_empty() {
            None
        } else {
            Some(swaps.join(", "))
        }
    }

    fn mono_preference(&self, layers: &[LayerSpec], stream: PolymerFamily, advice: &str) -> String {
        let outliers: Vec<&str> = layers
            .iter()
            .filter(|l| {
                self.catalog
                    .get(&l.material)
                    .and_then(|m| m.mono_family.as_ref())
                    != Some(&stream)
            })
            .map(|l| self.catalog.abbreviation(&l.material))
            .collect();

        if outliers.is_empty() {
            format!("{} Conventional structure is already mono-{}.", advice, stream.as_str())
        } else {
            format!(
                "{} Conventional structure has non-{} layers: {}.",
                advice,
                stream.as_str(),
                outliers.join(", ")
            )
        }
    }

    fn mechanical_check(&self, requirement: MechanicalRequirement, layers: &[LayerSpec]) -> Option<String> {
        let sealants: Vec<&LayerSpec> = layers.iter().filter(|l| l.role == LayerRole::Sealant).collect();
        let sealant_family = |families: &[PolymerFamily]| {
            sealants.iter().any(|l| {
                self.catalog
                    .family(&l.material)
                    .is_some_and(|f| families.contains(&f))
            })
        };

        match requirement {
            MechanicalRequirement::Retort => {
                let ok = sealants
                    .iter()
                    .any(|l| self.catalog.has_capability(&l.material, Capability::RetortSealant));
                (!ok).then(|| {
                    format!(
                        "Retort requested but no retort-grade sealant ({}) is present",
                        self.abbreviations(Capability::RetortSealant)
                    )
                })
            }
            MechanicalRequirement::Vacuum => (!self.has_layer_with(layers, Capability::Tough)).then(|| {
                format!(
                    "Vacuum requested but no layer carries vacuum-hold load ({})",
                    self.abbreviations(Capability::Tough)
                )
            }),
            MechanicalRequirement::ColdChain => (!sealant_family(&[PolymerFamily::PE])).then(|| {
                "Cold chain requested but the sealant is not PE-based; validate seal performance at -40°C"
                    .to_string()
            }),
            MechanicalRequirement::Puncture => (!self.has_layer_with(layers, Capability::Tough)).then(|| {
                format!(
                    "High puncture requested but no puncture-resistant layer ({}) is present",
                    self.abbreviations(Capability::Tough)
                )
            }),
            MechanicalRequirement::N2Flush => {
                (!self.has_layer_with(layers, Capability::HighOtr)).then(|| {
                    "N₂ flush requested but no oxygen-barrier layer holds the modified atmosphere".to_string()
                })
            }
            MechanicalRequirement::Hffs | MechanicalRequirement::Vffs => {
                if sealants.is_empty() {
                    return Some(format!(
                        "{} requested but the structure has no sealant layer",
                        requirement.label()
                    ));
                }
                let surface_pe = layers
                    .iter()
                    .find(|l| l.role == LayerRole::Surface)
                    .and_then(|l| self.catalog.family(&l.material))
                    == Some(PolymerFamily::PE);
                surface_pe.then(|| {
                    format!(
                        "{}: PE surface web narrows the seal window; validate jaw temperature and dwell",
                        requirement.label()
                    )
                })
            }
            MechanicalRequirement::Peelable => {
                (!sealant_family(&[PolymerFamily::PE, PolymerFamily::PP])).then(|| {
                    "Peelable seal requested but the sealant is not PE or PP; match sealant family to the tray"
                        .to_string()
                })
            }
        }
    }

    fn has_layer_with(&self, layers: &[LayerSpec], capability: Capability) -> bool {
        layers
            .iter()
            .any(|l| self.catalog.has_capability(&l.material, capability))
    }

    fn abbreviations(&self, capability: Capability) -> String {
        let ids = self.catalog.with_capability(capability);
        if ids.is_empty() {
            return "none in catalog".to_string();
        }
        ids.iter()
            .map(|id| self.catalog.abbreviation(id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
