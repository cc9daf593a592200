//! Immutable film catalog.
//!
//! Every other table refers to materials by id; the catalog is the only place
//! their properties live. Nothing downstream copies a `Material` with edited
//! fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// Polymer family of a film.
///
/// `OPP` (oriented polypropylene) is kept apart from cast `PP` because the
/// catalog distinguishes them, but both belong to the PP recycling stream.
/// Families outside the known set keep their raw tag, so two different
/// unknown families never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolymerFamily {
    PE,
    PP,
    OPP,
    PET,
    PA,
    AL,
    EVOH,
    Paper,
    Other(String),
}

impl PolymerFamily {
    pub fn as_str(&self) -> &str {
        match self {
            PolymerFamily::PE => "PE",
            PolymerFamily::PP => "PP",
            PolymerFamily::OPP => "OPP",
            PolymerFamily::PET => "PET",
            PolymerFamily::PA => "PA",
            PolymerFamily::AL => "AL",
            PolymerFamily::EVOH => "EVOH",
            PolymerFamily::Paper => "Paper",
            PolymerFamily::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for PolymerFamily {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PE" => PolymerFamily::PE,
            "PP" => PolymerFamily::PP,
            "OPP" => PolymerFamily::OPP,
            "PET" => PolymerFamily::PET,
            "PA" => PolymerFamily::PA,
            "AL" => PolymerFamily::AL,
            "EVOH" => PolymerFamily::EVOH,
            "Paper" => PolymerFamily::Paper,
            _ => PolymerFamily::Other(s),
        }
    }
}

impl From<PolymerFamily> for String {
    fn from(family: PolymerFamily) -> Self {
        match family {
            PolymerFamily::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Performance a film contributes on its own, as tagged under `qualifies`
/// in `materials.toml`. Barrier and mechanical checks look layers up by
/// capability rather than by material id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    HighOtr,
    HighMoisture,
    Light,
    Aroma,
    /// Carries puncture and vacuum-hold load
    Tough,
    RetortSealant,
}

/// A single film as listed in `materials.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Stable identifier referenced by rules (e.g. "AL_FOIL")
    pub id: String,
    /// Short label used in stack diagrams and profile keys (e.g. "AL")
    pub abbreviation: String,
    /// Long display name
    pub name: String,
    pub family: PolymerFamily,
    /// Recycling stream this film is compatible with on its own, if any
    #[serde(default)]
    pub mono_family: Option<PolymerFamily>,
    /// Oxygen transmission rate, cc/m2/day
    pub otr: f64,
    /// Water vapour transmission rate, g/m2/day
    pub wvtr: f64,
    /// Converting and processing cautions shown next to the recommendation
    #[serde(default)]
    pub risk_notes: Vec<String>,
    #[serde(default)]
    pub qualifies: Vec<Capability>,
}

/// Root of `materials.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialsConfig {
    pub materials: Vec<Material>,
}

/// Id-indexed, read-only material lookup.
#[derive(Debug, Clone)]
pub struct MaterialCatalog {
    materials: Vec<Material>,
    index: HashMap<String, usize>,
}

impl MaterialCatalog {
    /// Build a catalog, rejecting duplicate ids, empty abbreviations,
    /// negative or non-finite transmission rates and mono-family tags
    /// outside PE/PP/PET.
    pub fn new(materials: Vec<Material>) -> Result<Self, AdvisorError> {
        let mut index = HashMap::with_capacity(materials.len());

        for (i, material) in materials.iter().enumerate() {
            if material.id.trim().is_empty() {
                return Err(AdvisorError::InvalidReferenceData(format!(
                    "material #{} has an empty id",
                    i
                )));
            }
            if material.abbreviation.trim().is_empty() {
                return Err(AdvisorError::InvalidReferenceData(format!(
                    "material '{}' has an empty abbreviation",
                    material.id
                )));
            }
            if material.abbreviation.contains('/') {
                return Err(AdvisorError::InvalidReferenceData(format!(
                    "material '{}' abbreviation '{}' must not contain '/'",
                    material.id, material.abbreviation
                )));
            }
            for (field, value) in [("otr", material.otr), ("wvtr", material.wvtr)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(AdvisorError::InvalidReferenceData(format!(
                        "material '{}' has invalid {} {}",
                        material.id, field, value
                    )));
                }
            }
            if let Some(mono) = &material.mono_family {
                if !matches!(mono, PolymerFamily::PE | PolymerFamily::PP | PolymerFamily::PET) {
                    return Err(AdvisorError::InvalidReferenceData(format!(
                        "material '{}' has unsupported mono_family {}",
                        material.id,
                        mono.as_str()
                    )));
                }
            }
            if index.insert(material.id.clone(), i).is_some() {
                return Err(AdvisorError::InvalidReferenceData(format!(
                    "duplicate material id '{}'",
                    material.id
                )));
            }
        }

        Ok(Self { materials, index })
    }

    pub fn get(&self, id: &str) -> Option<&Material> {
        self.index.get(id).map(|&i| &self.materials[i])
    }

    /// Lookup that must succeed, e.g. for configured substitute films.
    pub fn require(&self, id: &str) -> Result<&Material, AdvisorError> {
        self.get(id)
            .ok_or_else(|| AdvisorError::UnknownMaterial(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Display abbreviation, or the raw id for materials not in the catalog.
    pub fn abbreviation<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|m| m.abbreviation.as_str()).unwrap_or(id)
    }

    pub fn family(&self, id: &str) -> Option<PolymerFamily> {
        self.get(id).map(|m| m.family.clone())
    }

    pub fn has_capability(&self, id: &str, capability: Capability) -> bool {
        self.get(id).is_some_and(|m| m.qualifies.contains(&capability))
    }

    /// Ids of the films tagged with `capability`, in catalog file order.
    pub fn with_capability(&self, capability: Capability) -> Vec<&str> {
        self.materials
            .iter()
            .filter(|m| m.qualifies.contains(&capability))
            .map(|m| m.id.as_str())
            .collect()
    }

    /// Materials in catalog file order.
    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
