//! Canonical weighted credit score over self-reported applicant attributes.
//!
//! Four factor sub-scores (income, housing, employment, financial situation) are
//! each in `0..=100` and combined with fixed weights summing to one. The engine
//! never fails: an unexpected computation error yields the neutral
//! [`FALLBACK_SCORE`] and a warning, so lead intake is never blocked.

mod model;
mod rules;

pub use model::{
    describe, DebtTierView, FactorWeightView, FinancialRuleView, IncomeRuleView, ScoreFactor,
    ScoringModelView, TableEntryView,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{ApplicantAttributes, ScoreSource};

pub const FALLBACK_SCORE: u8 = 50;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("applicant field '{field}' is not a finite number")]
    NonFiniteInput { field: &'static str },
    #[error("weighted score is not a finite number")]
    NonFiniteResult,
}

/// Contribution of one factor, kept for audits and the score endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub sub_score: f64,
    pub weight: f64,
    pub notes: String,
}

impl ScoreComponent {
    fn new(factor: ScoreFactor, sub_score: f64, notes: String) -> Self {
        Self {
            factor,
            sub_score,
            weight: factor.weight(),
            notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub components: Vec<ScoreComponent>,
    pub weighted_total: f64,
    pub score: u8,
}

impl ScoreBreakdown {
    pub fn component(&self, factor: ScoreFactor) -> Option<&ScoreComponent> {
        self.components
            .iter()
            .find(|component| component.factor == factor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: u8,
    pub source: ScoreSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

/// Stateless scorer shared by lead intake, the score endpoint, and the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Strict variant surfacing the underlying error.
    pub fn breakdown(
        &self,
        attributes: &ApplicantAttributes,
    ) -> Result<ScoreBreakdown, ScoringError> {
        rules::score_attributes(attributes)
    }

    pub fn score(&self, attributes: &ApplicantAttributes) -> ScoreOutcome {
        match self.breakdown(attributes) {
            Ok(breakdown) => ScoreOutcome {
                score: breakdown.score,
                source: ScoreSource::Model,
                breakdown: Some(breakdown),
            },
            Err(error) => {
                warn!(%error, fallback = FALLBACK_SCORE, "scoring fallback applied");
                ScoreOutcome {
                    score: FALLBACK_SCORE,
                    source: ScoreSource::Fallback,
                    breakdown: None,
                }
            }
        }
    }

    pub fn model(&self) -> ScoringModelView {
        describe(FALLBACK_SCORE)
    }
}
