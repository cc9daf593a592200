//! Base-rule selection.
//!
//! Resolution runs in three explicit stages and reports which one produced
//! the rule:
//!
//! 1. **Exact** - first rule (table order) naming the application whose
//!    sustainability range contains the level
//! 2. **ApplicationOnly** - first rule naming the application, range ignored
//! 3. **Fallback** - the table's designated generic rule

use tracing::debug;

use super::types::{Application, ResolutionConfidence, Rule, RuleTable};

/// A selected rule and the stage that selected it.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRule<'a> {
    pub rule: &'a Rule,
    pub confidence: ResolutionConfidence,
}

/// Picks the single applicable rule for an application and sustainability
/// level. Deterministic and side-effect free.
pub struct RuleResolver<'a> {
    table: &'a RuleTable,
}

impl<'a> RuleResolver<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self { table }
    }

    /// Resolve the base rule. `level` is expected to be already clamped to
    /// 1..=5; an out-of-range level simply fails the exact stage.
    pub fn resolve(&self, application: Application, level: u8) -> ResolvedRule<'a> {
        let rules = self.table.rules();

        if let Some(rule) = rules
            .iter()
            .find(|r| r.applies_to(application) && r.covers_level(level))
        {
            debug!("Rule '{}' matched {} at level {}", rule.id, application.id(), level);
            return ResolvedRule {
                rule,
                confidence: ResolutionConfidence::Exact,
            };
        }

        if let Some(rule) = rules.iter().find(|r| r.applies_to(application)) {
            debug!(
                "No rule for {} covers level {}; using '{}' ({}..={})",
                application.id(),
                level,
                rule.id,
                rule.sustainability_min,
                rule.sustainability_max
            );
            return ResolvedRule {
                rule,
                confidence: ResolutionConfidence::ApplicationOnly,
            };
        }

        let fallback = self.table.fallback();
        debug!(
            "No rule names {}; using fallback '{}'",
            application.id(),
            fallback.id
        );
        ResolvedRule {
            rule: fallback,
            confidence: ResolutionConfidence::Fallback,
        }
    }
}
