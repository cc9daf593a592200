//! Recommendation orchestrator.
//!
//! The `RecommendationEngine` owns the reference tables and runs one request
//! through rule resolution, restriction overrides, constraint checks,
//! recyclability scoring and barrier mapping.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::AdvisorError;

use super::barrier::BarrierProfileMapper;
use super::overrides::RestrictionOverrideEngine;
use super::recyclability::RecyclabilityScorer;
use super::resolver::RuleResolver;
use super::rules::ReferenceData;
use super::types::*;
use super::validator::ConstraintValidator;

/// The recommendation engine.
///
/// Holds only immutable reference data, so one engine can serve any number
/// of concurrent `resolve` calls through a shared reference.
pub struct RecommendationEngine {
    data: ReferenceData,
}

impl RecommendationEngine {
    /// Create an engine over the given tables.
    ///
    /// # Arguments
    /// * `data` - Reference tables (typically from `default_reference_data()` or `load_reference_data()`)
    pub fn new(data: ReferenceData) -> Self {
        Self { data }
    }

    /// Read-only access for the rendering layer (abbreviations, names).
    pub fn reference_data(&self) -> &ReferenceData {
        &self.data
    }

    /// Produce a complete recommendation for one request.
    ///
    /// Never fails: out-of-range sustainability, unmatched applications and
    /// unmapped profile keys all degrade to warnings on the result.
    ///
    /// Warnings are ordered: clamping, rule confidence, constraint checks
    /// (conventional structure only), approximate chart points.
    pub fn resolve(&self, request: &ResolveRequest) -> RecommendationResult {
        let mut warnings = Vec::new();

        let level = clamp_sustainability(request.sustainability);
        if i64::from(level) != request.sustainability {
            warn!(
                "Sustainability {} out of range, clamped to {}",
                request.sustainability, level
            );
            warnings.push(format!(
                "Sustainability level {} is outside {}–{}; clamped to {}",
                request.sustainability, SUSTAINABILITY_MIN, SUSTAINABILITY_MAX, level
            ));
        }

        let resolved = RuleResolver::new(&self.data.rules).resolve(request.application, level);
        let rule = resolved.rule;
        match resolved.confidence {
            ResolutionConfidence::Exact => {}
            ResolutionConfidence::ApplicationOnly => warnings.push(format!(
                "No rule for {} covers sustainability level {}; showing '{}' (levels {}–{})",
                request.application.label(),
                level,
                rule.id,
                rule.sustainability_min,
                rule.sustainability_max
            )),
            ResolutionConfidence::Fallback => warnings.push(format!(
                "No rule covers {}; showing the general-purpose fallback. Treat as low confidence.",
                request.application.label()
            )),
        }

        let overrides = RestrictionOverrideEngine::new(&self.data.materials, &self.data.overrides);
        let conventional = overrides.apply(&rule.conventional, &request.restrictions);
        let sustainable = overrides.apply(&rule.sustainable, &request.restrictions);

        warnings.extend(ConstraintValidator::new(&self.data.materials).validate(
            &conventional,
            &request.barriers,
            &request.mechanical,
            &request.restrictions,
            request.application,
        ));

        let scorer = RecyclabilityScorer::new(&self.data.materials);
        let conventional_score = scorer.score(conventional.layers());
        let sustainable_score = scorer.score(sustainable.layers());

        let mapper = BarrierProfileMapper::new(&self.data.barrier_profiles);
        let chart_points = ChartPoints {
            conventional: mapper.map_to_chart_point(conventional.profile_key()),
            sustainable: mapper.map_to_chart_point(sustainable.profile_key()),
        };
        for (kind, point, structure) in [
            ("Conventional", &chart_points.conventional, &conventional),
            ("Sustainable", &chart_points.sustainable, &sustainable),
        ] {
            if point.approximate {
                warnings.push(format!(
                    "{} structure {} has no barrier profile; chart position is approximate",
                    kind,
                    structure.profile_key()
                ));
            }
        }

        let risk_notes = self.collect_risk_notes(&[&conventional, &sustainable]);

        debug!(
            "Resolved {} @ {} via '{}' ({:?}): {} | {} ({} warnings)",
            request.application.id(),
            level,
            rule.id,
            resolved.confidence,
            conventional.profile_key(),
            sustainable.profile_key(),
            warnings.len()
        );

        RecommendationResult {
            rule_id: rule.id.clone(),
            confidence: resolved.confidence,
            fallback: resolved.confidence == ResolutionConfidence::Fallback,
            sustainability: level,
            conventional,
            sustainable,
            conventional_score,
            sustainable_score,
            warnings,
            chart_points,
            risk_notes,
        }
    }

    /// Parse a JSON request and resolve it. A malformed request is the only
    /// error.
    pub fn resolve_json(&self, json: &str) -> Result<RecommendationResult, AdvisorError> {
        let request = ResolveRequest::from_json(json)?;
        Ok(self.resolve(&request))
    }

    /// Catalog materials as background chart points.
    pub fn reference_points(&self) -> Vec<ReferencePoint> {
        BarrierProfileMapper::new(&self.data.barrier_profiles).reference_points(&self.data.materials)
    }

    /// Risk notes for each distinct material in the structures, in first
    /// appearance order.
    fn collect_risk_notes(&self, structures: &[&StructureRecommendation]) -> Vec<MaterialRiskNotes> {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();

        for layer in structures.iter().flat_map(|s| s.layers()) {
            if !seen.insert(layer.material.as_str()) {
                continue;
            }
            let Some(material) = self.data.materials.get(&layer.material) else {
                continue;
            };
            if material.risk_notes.is_empty() {
                continue;
            }
            collected.push(MaterialRiskNotes {
                material: material.id.clone(),
                abbreviation: material.abbreviation.clone(),
                notes: material.risk_notes.clone(),
            });
        }

        collected
    }
}

/// Clamp a requested level into `SUSTAINABILITY_MIN..=SUSTAINABILITY_MAX`.
pub fn clamp_sustainability(requested: i64) -> u8 {
    // The clamp bounds fit in u8, so the cast is lossless.
    requested.clamp(i64::from(SUSTAINABILITY_MIN), i64::from(SUSTAINABILITY_MAX)) as u8
}
