use std::collections::BTreeSet;

use crate::catalog::{MaterialCatalog, PolymerFamily};

use super::types::{LayerSpec, RecyclabilityScore};

/// Coarse recycling family of a layer. EVOH is tracked apart from the main
/// families because a thin EVOH layer does not break a mono-material claim
/// outright.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StreamFamily {
    Pe,
    Pp,
    Pet,
    Al,
    Pa,
    Evoh,
    /// Catalog family outside the known streams, keyed by its tag
    Tag(String),
    /// Material id missing from the catalog; each id is its own family
    Unknown(String),
}

impl StreamFamily {
    fn of(layer: &LayerSpec, catalog: &MaterialCatalog) -> Self {
        match catalog.family(&layer.material) {
            Some(PolymerFamily::PE) => StreamFamily::Pe,
            Some(PolymerFamily::PP) | Some(PolymerFamily::OPP) => StreamFamily::Pp,
            Some(PolymerFamily::PET) => StreamFamily::Pet,
            Some(PolymerFamily::AL) => StreamFamily::Al,
            Some(PolymerFamily::PA) => StreamFamily::Pa,
            Some(PolymerFamily::EVOH) => StreamFamily::Evoh,
            Some(other) => StreamFamily::Tag(other.as_str().to_string()),
            None => StreamFamily::Unknown(layer.material.clone()),
        }
    }
}

/// Classifies a layer stack into one of five fixed recyclability outcomes.
pub struct RecyclabilityScorer<'a> {
    catalog: &'a MaterialCatalog,
}

impl<'a> RecyclabilityScorer<'a> {
    pub fn new(catalog: &'a MaterialCatalog) -> Self {
        Self { catalog }
    }

    /// Score a layer list. Layer order does not matter. Total over any
    /// input, including unknown material ids.
    pub fn score(&self, layers: &[LayerSpec]) -> RecyclabilityScore {
        let families: BTreeSet<StreamFamily> =
            layers.iter().map(|l| StreamFamily::of(l, self.catalog)).collect();

        let has_evoh = families.contains(&StreamFamily::Evoh);
        let main_count = families.iter().filter(|f| **f != StreamFamily::Evoh).count();

        if main_count == 1 && !has_evoh {
            outcome(95, "High", true, "Mono-material structure. Recyclable in standard stream.")
        } else if main_count == 1 {
            outcome(
                80,
                "Moderate-High",
                false,
                "Mono-material with EVOH <5%. Recyclable with minor functional barrier.",
            )
        } else if families.contains(&StreamFamily::Al) {
            outcome(25, "Low", false, "Contains aluminium. Not recyclable in standard streams.")
        } else if families.contains(&StreamFamily::Pa) {
            outcome(40, "Moderate-Low", false, "Contains nylon. Multi-material, limited recyclability.")
        } else {
            outcome(55, "Moderate", false, "Multi-material laminate. Check local recycling infrastructure.")
        }
    }
}

fn outcome(score: u8, label: &str, is_mono: bool, note: &str) -> RecyclabilityScore {
    RecyclabilityScore {
        score,
        label: label.to_string(),
        is_mono,
        note: note.to_string(),
    }
}
