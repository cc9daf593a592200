//! Type definitions for the structure recommendation engine.
//!
//! These types support both TOML deserialization (for loading the reference
//! tables) and JSON serialization (for the rendering layer and snapshots).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::MaterialCatalog;
use crate::error::AdvisorError;

/// Lowest and highest sustainability priority a request may carry.
pub const SUSTAINABILITY_MIN: u8 = 1;
pub const SUSTAINABILITY_MAX: u8 = 5;

// =============================================================================
// REQUEST FLAGS
// =============================================================================

/// Product/packaging application the structure is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Application {
    FrozenFood,
    Snacks,
    PuffedSnacks,
    Vacuum,
    LiquidsHotfill,
    Retort,
    CoffeeTea,
    PetFood,
    Powder,
    Detergents,
    Cosmetics,
    Confectionery,
    Lidding,
}

impl Application {
    pub const ALL: [Application; 13] = [
        Application::FrozenFood,
        Application::Snacks,
        Application::PuffedSnacks,
        Application::Vacuum,
        Application::LiquidsHotfill,
        Application::Retort,
        Application::CoffeeTea,
        Application::PetFood,
        Application::Powder,
        Application::Detergents,
        Application::Cosmetics,
        Application::Confectionery,
        Application::Lidding,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Application::FrozenFood => "frozen_food",
            Application::Snacks => "snacks",
            Application::PuffedSnacks => "puffed_snacks",
            Application::Vacuum => "vacuum",
            Application::LiquidsHotfill => "liquids_hotfill",
            Application::Retort => "retort",
            Application::CoffeeTea => "coffee_tea",
            Application::PetFood => "pet_food",
            Application::Powder => "powder",
            Application::Detergents => "detergents",
            Application::Cosmetics => "cosmetics",
            Application::Confectionery => "confectionery",
            Application::Lidding => "lidding",
        }
    }

    /// Human-readable name for display
    pub fn label(&self) -> &'static str {
        match self {
            Application::FrozenFood => "Frozen Food",
            Application::Snacks => "Snacks / Biscuits",
            Application::PuffedSnacks => "Puffed Snacks",
            Application::Vacuum => "Vacuum Packaging",
            Application::LiquidsHotfill => "Liquids / Hot-Fill",
            Application::Retort => "Retort 121–135°C",
            Application::CoffeeTea => "Coffee / Tea",
            Application::PetFood => "Pet Food",
            Application::Powder => "Powder Products",
            Application::Detergents => "Detergents & Chemicals",
            Application::Cosmetics => "Cosmetics",
            Application::Confectionery => "Confectionery",
            Application::Lidding => "Lidding / Peelable",
        }
    }
}

/// Barrier requirement flags. Variant order is the order checks run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierRequirement {
    Low,
    Medium,
    HighOtr,
    HighMoisture,
    Light,
    Aroma,
}

impl BarrierRequirement {
    pub fn label(&self) -> &'static str {
        match self {
            BarrierRequirement::Low => "Low barrier",
            BarrierRequirement::Medium => "Medium barrier",
            BarrierRequirement::HighOtr => "High OTR barrier",
            BarrierRequirement::HighMoisture => "High moisture barrier",
            BarrierRequirement::Light => "Light barrier",
            BarrierRequirement::Aroma => "Aroma barrier",
        }
    }
}

/// Mechanical and processing requirement flags. Variant order is check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanicalRequirement {
    Retort,
    Vacuum,
    ColdChain,
    Puncture,
    #[serde(rename = "n2_flush", alias = "nitrogen_flush")]
    N2Flush,
    Hffs,
    Vffs,
    Peelable,
}

impl MechanicalRequirement {
    pub fn label(&self) -> &'static str {
        match self {
            MechanicalRequirement::Retort => "Retort",
            MechanicalRequirement::Vacuum => "Vacuum",
            MechanicalRequirement::ColdChain => "Cold chain",
            MechanicalRequirement::Puncture => "High puncture",
            MechanicalRequirement::N2Flush => "N₂ flush",
            MechanicalRequirement::Hffs => "HFFS",
            MechanicalRequirement::Vffs => "VFFS",
            MechanicalRequirement::Peelable => "Peelable seal",
        }
    }
}

/// Material restriction flags. Variant order is the order advisories appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    #[serde(alias = "avoid_al")]
    AvoidAluminium,
    #[serde(alias = "avoid_ny")]
    AvoidNylon,
    #[serde(alias = "prefer_pe")]
    PreferPeMono,
    #[serde(alias = "prefer_pp")]
    PreferPpMono,
    #[serde(alias = "pcr")]
    PcrRequired,
}

// =============================================================================
// STRUCTURES
// =============================================================================

/// Position/purpose of a layer in the laminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Surface,
    Barrier,
    Core,
    Sealant,
}

/// One film in a laminate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Material id from the catalog
    pub material: String,
    pub role: LayerRole,
    /// What the layer does in this structure (free text)
    pub function: String,
    /// Thickness or thickness range for display (e.g. "15–25µm")
    pub thickness: String,
    /// Original material id when a restriction override swapped this layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substituted_from: Option<String>,
}

/// Canonical profile key: material abbreviations joined with "/", outer to
/// inner. Unknown materials contribute their raw id.
pub fn derive_profile_key(layers: &[LayerSpec], catalog: &MaterialCatalog) -> String {
    layers
        .iter()
        .map(|l| catalog.abbreviation(&l.material))
        .collect::<Vec<_>>()
        .join("/")
}

/// A recommended laminate: ordered, non-empty layer stack plus advisory text.
///
/// Layers are only replaced through [`StructureRecommendation::with_layers`],
/// which re-derives the profile key, so the key can never go stale.
///
/// Deserialized values are checked for a non-empty stack and a profile key
/// with one segment per layer. Abbreviations need the catalog, so a key read
/// back from JSON is not compared against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StructureRecord")]
pub struct StructureRecommendation {
    pub label: String,
    layers: Vec<LayerSpec>,
    profile_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Wire shape of [`StructureRecommendation`] before validation.
#[derive(Deserialize)]
struct StructureRecord {
    label: String,
    layers: Vec<LayerSpec>,
    profile_key: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

impl TryFrom<StructureRecord> for StructureRecommendation {
    type Error = AdvisorError;

    fn try_from(record: StructureRecord) -> Result<Self, Self::Error> {
        if record.layers.is_empty() {
            return Err(no_layers(&record.label));
        }
        let segments: Vec<&str> = record.profile_key.split('/').collect();
        if segments.len() != record.layers.len() || segments.iter().any(|s| s.is_empty()) {
            return Err(AdvisorError::InvalidReferenceData(format!(
                "structure '{}' profile key '{}' does not match its {} layers",
                record.label,
                record.profile_key,
                record.layers.len()
            )));
        }
        Ok(Self {
            label: record.label,
            layers: record.layers,
            profile_key: record.profile_key,
            notes: record.notes,
            rationale: record.rationale,
        })
    }
}

fn no_layers(label: &str) -> AdvisorError {
    AdvisorError::InvalidReferenceData(format!("structure '{}' has no layers", label))
}

impl StructureRecommendation {
    pub fn new(
        label: impl Into<String>,
        layers: Vec<LayerSpec>,
        notes: Option<String>,
        rationale: Option<String>,
        catalog: &MaterialCatalog,
    ) -> Result<Self, AdvisorError> {
        let label = label.into();
        if layers.is_empty() {
            return Err(no_layers(&label));
        }
        let profile_key = derive_profile_key(&layers, catalog);
        Ok(Self {
            label,
            layers,
            profile_key,
            notes,
            rationale,
        })
    }

    /// Copy of this structure with a new layer list and label; the profile
    /// key is recomputed. Notes and rationale carry over.
    pub fn with_layers(
        &self,
        label: String,
        layers: Vec<LayerSpec>,
        catalog: &MaterialCatalog,
    ) -> Result<Self, AdvisorError> {
        Self::new(label, layers, self.notes.clone(), self.rationale.clone(), catalog)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn profile_key(&self) -> &str {
        &self.profile_key
    }

    pub fn contains_material(&self, material_id: &str) -> bool {
        self.layers.iter().any(|l| l.material == material_id)
    }
}

// =============================================================================
// CONFIGURATION TYPES (loaded from TOML)
// =============================================================================

/// A structure as written in `structure_rules.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StructureConfig {
    pub label: String,
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

fn default_sustainability_min() -> u8 {
    SUSTAINABILITY_MIN
}

fn default_sustainability_max() -> u8 {
    SUSTAINABILITY_MAX
}

/// A rule as written in `structure_rules.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub id: String,
    /// Applications this rule covers (empty only for the fallback rule)
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default = "default_sustainability_min")]
    pub sustainability_min: u8,
    #[serde(default = "default_sustainability_max")]
    pub sustainability_max: u8,
    pub conventional: StructureConfig,
    pub sustainable: StructureConfig,
}

/// Substitute films used by the restriction overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideConfig {
    /// Replaces aluminium-family layers under `avoid_aluminium`
    pub aluminium_substitute: String,
    /// Replaces nylon-family layers under `avoid_nylon`
    pub nylon_substitute: String,
}

/// Root of `structure_rules.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StructureRulesConfig {
    pub overrides: OverrideConfig,
    pub fallback: RuleConfig,
    pub rules: Vec<RuleConfig>,
}

/// Approximate combined barrier of a laminate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierValues {
    /// cc/m2/day
    pub otr: f64,
    /// g/m2/day
    pub wvtr: f64,
}

/// Root of `barrier_profiles.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BarrierProfilesConfig {
    /// Point used for profile keys with no entry
    pub default: BarrierValues,
    pub profiles: HashMap<String, BarrierValues>,
}

// =============================================================================
// RESOLVED TABLES
// =============================================================================

/// A validated rule mapping applications and a sustainability range to a
/// pair of structures.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub applications: BTreeSet<Application>,
    pub sustainability_min: u8,
    pub sustainability_max: u8,
    pub conventional: StructureRecommendation,
    pub sustainable: StructureRecommendation,
}

impl Rule {
    pub fn applies_to(&self, application: Application) -> bool {
        self.applications.contains(&application)
    }

    pub fn covers_level(&self, level: u8) -> bool {
        self.sustainability_min <= level && level <= self.sustainability_max
    }
}

/// Ordered rule list plus the designated generic fallback.
#[derive(Debug, Clone)]
pub struct RuleTable {
    pub(crate) rules: Vec<Rule>,
    pub(crate) fallback: Rule,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>, fallback: Rule) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fallback(&self) -> &Rule {
        &self.fallback
    }

    /// True when at least one rule names the application.
    pub fn covers(&self, application: Application) -> bool {
        self.rules.iter().any(|r| r.applies_to(application))
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .chain(std::iter::once(&self.fallback))
            .find(|r| r.id == id)
    }
}

/// Profile key -> approximate laminate barrier.
#[derive(Debug, Clone)]
pub struct BarrierProfileTable {
    pub(crate) profiles: HashMap<String, BarrierValues>,
    pub(crate) default: BarrierValues,
}

impl BarrierProfileTable {
    pub fn new(profiles: HashMap<String, BarrierValues>, default: BarrierValues) -> Self {
        Self { profiles, default }
    }

    pub fn get(&self, profile_key: &str) -> Option<BarrierValues> {
        self.profiles.get(profile_key).copied()
    }

    pub fn default_point(&self) -> BarrierValues {
        self.default
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

// =============================================================================
// INPUT TYPES
// =============================================================================

/// One resolution request from the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub application: Application,
    /// 1 = performance first, 5 = recyclability first. Out-of-range values
    /// are clamped with a warning.
    pub sustainability: i64,
    #[serde(default)]
    pub barriers: BTreeSet<BarrierRequirement>,
    #[serde(default)]
    pub mechanical: BTreeSet<MechanicalRequirement>,
    #[serde(default)]
    pub restrictions: BTreeSet<Restriction>,
}

impl ResolveRequest {
    pub fn new(application: Application, sustainability: i64) -> Self {
        Self {
            application,
            sustainability,
            barriers: BTreeSet::new(),
            mechanical: BTreeSet::new(),
            restrictions: BTreeSet::new(),
        }
    }

    pub fn with_barriers(mut self, flags: impl IntoIterator<Item = BarrierRequirement>) -> Self {
        self.barriers.extend(flags);
        self
    }

    pub fn with_mechanical(mut self, flags: impl IntoIterator<Item = MechanicalRequirement>) -> Self {
        self.mechanical.extend(flags);
        self
    }

    pub fn with_restrictions(mut self, flags: impl IntoIterator<Item = Restriction>) -> Self {
        self.restrictions.extend(flags);
        self
    }

    /// Parse a JSON request. Missing `application`/`sustainability`, unknown
    /// flag ids and wrong types are all reported as `MalformedRequest`.
    pub fn from_json(json: &str) -> Result<Self, AdvisorError> {
        serde_json::from_str(json).map_err(|e| AdvisorError::MalformedRequest(e.to_string()))
    }
}

// =============================================================================
// OUTPUT TYPES (serialized to the rendering layer)
// =============================================================================

/// Which resolution stage produced the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionConfidence {
    /// Application and sustainability range both matched
    Exact,
    /// Application matched; sustainability range ignored
    ApplicationOnly,
    /// No rule names the application; generic fallback used
    Fallback,
}

/// Recyclability classification of one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecyclabilityScore {
    /// One of 25, 40, 55, 80, 95
    pub score: u8,
    pub label: String,
    pub is_mono: bool,
    /// Short explanation of the classification
    pub note: String,
}

/// Coarse barrier class of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierGrade {
    Ultra,
    High,
    Medium,
    Low,
}

/// Position of a structure on the log-log OTR/WVTR chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub log_otr: f64,
    pub log_wvtr: f64,
    /// Values the logs were taken from (after flooring)
    pub otr: f64,
    pub wvtr: f64,
    /// True when the profile key had no table entry and the default was used
    pub approximate: bool,
    pub otr_grade: BarrierGrade,
    pub wvtr_grade: BarrierGrade,
}

/// Background scatter point for one catalog material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub material: String,
    pub label: String,
    pub log_otr: f64,
    pub log_wvtr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoints {
    pub conventional: ChartPoint,
    pub sustainable: ChartPoint,
}

/// Processing cautions for one material present in the recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRiskNotes {
    pub material: String,
    pub abbreviation: String,
    pub notes: Vec<String>,
}

/// Complete output of one `resolve` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Id of the rule the structures came from
    pub rule_id: String,
    pub confidence: ResolutionConfidence,
    /// Shorthand for `confidence == Fallback`
    pub fallback: bool,
    /// Sustainability level actually used (after clamping)
    pub sustainability: u8,
    /// Structures after restriction overrides
    pub conventional: StructureRecommendation,
    pub sustainable: StructureRecommendation,
    pub conventional_score: RecyclabilityScore,
    pub sustainable_score: RecyclabilityScore,
    /// Advisory messages in a fixed, deterministic order
    pub warnings: Vec<String>,
    pub chart_points: ChartPoints,
    pub risk_notes: Vec<MaterialRiskNotes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize_with_aliases() {
        let json = r#"{
            "application": "coffee_tea",
            "sustainability": 4,
            "barriers": ["high_otr", "aroma"],
            "mechanical": ["nitrogen_flush", "vffs"],
            "restrictions": ["avoid_al", "pcr_required"]
        }"#;
        let req = ResolveRequest::from_json(json).unwrap();
        assert_eq!(req.application, Application::CoffeeTea);
        assert_eq!(req.sustainability, 4);
        assert!(req.barriers.contains(&BarrierRequirement::HighOtr));
        assert!(req.mechanical.contains(&MechanicalRequirement::N2Flush));
        assert!(req.restrictions.contains(&Restriction::AvoidAluminium));
        assert!(req.restrictions.contains(&Restriction::PcrRequired));
    }

    #[test]
    fn test_request_flag_sets_default_to_empty() {
        let req = ResolveRequest::from_json(r#"{"application": "retort", "sustainability": 2}"#).unwrap();
        assert!(req.barriers.is_empty());
        assert!(req.mechanical.is_empty());
        assert!(req.restrictions.is_empty());
    }

    #[test]
    fn test_request_missing_field_is_malformed() {
        let err = ResolveRequest::from_json(r#"{"sustainability": 3}"#).unwrap_err();
        assert!(matches!(err, AdvisorError::MalformedRequest(_)));
        assert!(err.to_string().contains("application"), "Unexpected error: {}", err);
    }

    #[test]
    fn test_request_unknown_application_is_malformed() {
        let err = ResolveRequest::from_json(r#"{"application": "spaceship", "sustainability": 3}"#).unwrap_err();
        assert!(matches!(err, AdvisorError::MalformedRequest(_)));
    }

    #[test]
    fn test_flag_sets_iterate_in_declaration_order() {
        let req = ResolveRequest::new(Application::Snacks, 3).with_restrictions([
            Restriction::PcrRequired,
            Restriction::AvoidNylon,
            Restriction::AvoidAluminium,
        ]);
        let order: Vec<_> = req.restrictions.iter().copied().collect();
        assert_eq!(
            order,
            vec![
                Restriction::AvoidAluminium,
                Restriction::AvoidNylon,
                Restriction::PcrRequired
            ]
        );
    }

    #[test]
    fn test_mechanical_n2_flush_serializes_short_id() {
        let json = serde_json::to_string(&MechanicalRequirement::N2Flush).unwrap();
        assert_eq!(json, r#""n2_flush""#);
    }

    #[test]
    fn test_application_ids_match_serde() {
        for app in Application::ALL {
            let json = serde_json::to_string(&app).unwrap();
            assert_eq!(json, format!("\"{}\"", app.id()));
        }
    }

    fn layer(material: &str) -> LayerSpec {
        LayerSpec {
            material: material.to_string(),
            role: LayerRole::Core,
            function: String::new(),
            thickness: String::new(),
            substituted_from: None,
        }
    }

    #[test]
    fn test_with_layers_rejects_empty_stack() {
        let catalog = MaterialCatalog::new(vec![]).unwrap();
        let structure = StructureRecommendation::new(
            "PET / PE",
            vec![layer("BOPET"), layer("LLDPE")],
            Some("note".to_string()),
            None,
            &catalog,
        )
        .unwrap();

        let err = structure.with_layers("empty".to_string(), vec![], &catalog).unwrap_err();
        assert!(err.to_string().contains("no layers"), "Unexpected error: {}", err);

        let swapped = structure
            .with_layers("PET / MDO".to_string(), vec![layer("BOPET"), layer("MDO_PE")], &catalog)
            .unwrap();
        assert_eq!(swapped.profile_key(), "BOPET/MDO_PE");
        assert_eq!(swapped.notes.as_deref(), Some("note"));
    }

    #[test]
    fn test_structure_deserialize_is_validated() {
        let empty = r#"{"label": "x", "layers": [], "profile_key": ""}"#;
        let err = serde_json::from_str::<StructureRecommendation>(empty).unwrap_err();
        assert!(err.to_string().contains("no layers"), "Unexpected error: {}", err);

        let stale = r#"{
            "label": "x",
            "layers": [{"material": "BOPET", "role": "surface", "function": "", "thickness": ""}],
            "profile_key": "PET/AL/RCPP"
        }"#;
        let err = serde_json::from_str::<StructureRecommendation>(stale).unwrap_err();
        assert!(err.to_string().contains("does not match"), "Unexpected error: {}", err);

        let catalog = MaterialCatalog::new(vec![]).unwrap();
        let original =
            StructureRecommendation::new("PET / PE", vec![layer("BOPET"), layer("LLDPE")], None, None, &catalog)
                .unwrap();
        let json = serde_json::to_string(&original).unwrap();
        let back: StructureRecommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_layer_spec_deserialize_from_toml() {
        let toml_src = r#"
            material = "BOPA"
            role = "core"
            function = "Puncture resistance"
            thickness = "15µm"
        "#;
        let layer: LayerSpec = toml::from_str(toml_src).unwrap();
        assert_eq!(layer.role, LayerRole::Core);
        assert!(layer.substituted_from.is_none());
    }
}
