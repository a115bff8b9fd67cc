use serde::{Deserialize, Serialize};

use super::super::domain::{EmploymentStatus, HousingType};
use super::rules;

pub(crate) const BASIS_POINTS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Income,
    Housing,
    Employment,
    FinancialSituation,
}

impl ScoreFactor {
    pub const ALL: [ScoreFactor; 4] = [
        ScoreFactor::Income,
        ScoreFactor::Housing,
        ScoreFactor::Employment,
        ScoreFactor::FinancialSituation,
    ];

    pub const fn weight_basis_points(self) -> u32 {
        match self {
            ScoreFactor::Income => 3_500,
            ScoreFactor::Housing => 1_500,
            ScoreFactor::Employment => 2_500,
            ScoreFactor::FinancialSituation => 2_500,
        }
    }

    pub fn weight(self) -> f64 {
        f64::from(self.weight_basis_points()) / f64::from(BASIS_POINTS)
    }
}

/// Published description of the canonical scoring formula.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringModelView {
    pub weights: Vec<FactorWeightView>,
    pub income: IncomeRuleView,
    pub housing: Vec<TableEntryView>,
    pub employment: Vec<TableEntryView>,
    pub financial: FinancialRuleView,
    pub fallback_score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorWeightView {
    pub factor: ScoreFactor,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomeRuleView {
    pub floor: f64,
    pub ceiling: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableEntryView {
    pub value: &'static str,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialRuleView {
    pub base: i32,
    pub savings_bonus: i32,
    pub investment_bonus: i32,
    pub recent_loan_penalty: i32,
    pub debt_ratio_penalties: Vec<DebtTierView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtTierView {
    pub above_ratio: f64,
    pub penalty: i32,
}

pub fn describe(fallback_score: u8) -> ScoringModelView {
    ScoringModelView {
        weights: ScoreFactor::ALL
            .iter()
            .map(|factor| FactorWeightView {
                factor: *factor,
                weight: factor.weight(),
            })
            .collect(),
        income: IncomeRuleView {
            floor: rules::INCOME_FLOOR,
            ceiling: rules::INCOME_CEILING,
            threshold: rules::INCOME_THRESHOLD,
        },
        housing: HousingType::ALL
            .iter()
            .map(|housing| TableEntryView {
                value: housing.label(),
                score: rules::housing_points(*housing),
            })
            .collect(),
        employment: EmploymentStatus::ALL
            .iter()
            .map(|employment| TableEntryView {
                value: employment.label(),
                score: rules::employment_points(*employment),
            })
            .collect(),
        financial: FinancialRuleView {
            base: rules::FINANCIAL_BASE,
            savings_bonus: rules::SAVINGS_BONUS,
            investment_bonus: rules::INVESTMENT_BONUS,
            recent_loan_penalty: rules::RECENT_LOAN_PENALTY,
            debt_ratio_penalties: rules::DEBT_RATIO_TIERS
                .iter()
                .map(|(above_ratio, penalty)| DebtTierView {
                    above_ratio: *above_ratio,
                    penalty: *penalty,
                })
                .collect(),
        },
        fallback_score,
    }
}
