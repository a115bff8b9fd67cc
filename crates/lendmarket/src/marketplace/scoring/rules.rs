use super::super::domain::{ApplicantAttributes, EmploymentStatus, HousingType};
use super::model::{ScoreFactor, BASIS_POINTS};
use super::{ScoreBreakdown, ScoreComponent, ScoringError};

pub(crate) const INCOME_FLOOR: f64 = 20.0;
pub(crate) const INCOME_CEILING: f64 = 100.0;
pub(crate) const INCOME_THRESHOLD: f64 = 10_000.0;

pub(crate) const FINANCIAL_BASE: i32 = 70;
pub(crate) const SAVINGS_BONUS: i32 = 10;
pub(crate) const INVESTMENT_BONUS: i32 = 10;
pub(crate) const RECENT_LOAN_PENALTY: i32 = 15;

/// Debt-to-annual-income tiers, checked from the highest ratio down.
pub(crate) const DEBT_RATIO_TIERS: [(f64, i32); 3] = [(0.5, 30), (0.3, 20), (0.1, 10)];

pub(crate) const fn housing_points(housing: HousingType) -> u8 {
    match housing {
        HousingType::Owned => 100,
        HousingType::Family => 80,
        HousingType::Rented => 60,
        HousingType::Mortgaged => 70,
        HousingType::Other => 40,
    }
}

pub(crate) const fn employment_points(employment: EmploymentStatus) -> u8 {
    match employment {
        EmploymentStatus::FullTime => 100,
        EmploymentStatus::PartTime => 70,
        EmploymentStatus::SelfEmployed => 80,
        EmploymentStatus::BusinessOwner => 90,
        EmploymentStatus::Student => 50,
        EmploymentStatus::Retired => 60,
        EmploymentStatus::Unemployed => 20,
        EmploymentStatus::Other => 30,
    }
}

/// Linear scale from the floor at zero income to the ceiling at the threshold.
pub(crate) fn income_points(monthly_income: f64) -> f64 {
    if monthly_income <= 0.0 {
        return 0.0;
    }
    let scaled =
        INCOME_FLOOR + (monthly_income / INCOME_THRESHOLD) * (INCOME_CEILING - INCOME_FLOOR);
    scaled.min(INCOME_CEILING)
}

pub(crate) fn financial_points(attributes: &ApplicantAttributes) -> (i32, Vec<String>) {
    let mut score = FINANCIAL_BASE;
    let mut notes = Vec::new();

    if attributes.savings.is_some_and(|savings| savings > 0.0) {
        score += SAVINGS_BONUS;
        notes.push(format!("+{SAVINGS_BONUS} savings"));
    }
    if attributes
        .investments
        .is_some_and(|investments| investments > 0.0)
    {
        score += INVESTMENT_BONUS;
        notes.push(format!("+{INVESTMENT_BONUS} investment accounts"));
    }
    if attributes.recent_loans {
        score -= RECENT_LOAN_PENALTY;
        notes.push(format!("-{RECENT_LOAN_PENALTY} recent loans"));
    }

    if let Some(ratio) = debt_to_annual_income(attributes) {
        if let Some((threshold, penalty)) = DEBT_RATIO_TIERS
            .iter()
            .find(|(threshold, _)| ratio > *threshold)
        {
            score -= penalty;
            notes.push(format!("-{penalty} debt ratio {ratio:.2} above {threshold:.1}"));
        }
    }

    (score.clamp(0, 100), notes)
}

/// Declared debt over twelve months of income. Missing income counts as zero,
/// so any declared debt lands in the worst tier.
pub(crate) fn debt_to_annual_income(attributes: &ApplicantAttributes) -> Option<f64> {
    if !attributes.has_other_debts {
        return None;
    }
    let debt = attributes.debt_amount.filter(|amount| *amount > 0.0)?;
    let annual_income = attributes.monthly_income.unwrap_or(0.0) * 12.0;
    Some(debt / annual_income)
}

fn ensure_finite(field: &'static str, value: Option<f64>) -> Result<(), ScoringError> {
    match value {
        Some(value) if !value.is_finite() => Err(ScoringError::NonFiniteInput { field }),
        _ => Ok(()),
    }
}

pub(crate) fn score_attributes(
    attributes: &ApplicantAttributes,
) -> Result<ScoreBreakdown, ScoringError> {
    ensure_finite("monthly_income", attributes.monthly_income)?;
    ensure_finite("savings", attributes.savings)?;
    ensure_finite("investments", attributes.investments)?;
    ensure_finite("debt_amount", attributes.debt_amount)?;

    let income = attributes.monthly_income.unwrap_or(0.0);
    let housing = attributes.housing.unwrap_or(HousingType::Other);
    let employment = attributes.employment.unwrap_or(EmploymentStatus::Other);
    let (financial, financial_notes) = financial_points(attributes);

    let components = vec![
        ScoreComponent::new(
            ScoreFactor::Income,
            income_points(income),
            format!("monthly income {income:.2}"),
        ),
        ScoreComponent::new(
            ScoreFactor::Housing,
            f64::from(housing_points(housing)),
            format!("housing {}", housing.label()),
        ),
        ScoreComponent::new(
            ScoreFactor::Employment,
            f64::from(employment_points(employment)),
            format!("employment {}", employment.label()),
        ),
        ScoreComponent::new(
            ScoreFactor::FinancialSituation,
            f64::from(financial),
            if financial_notes.is_empty() {
                "base financial standing".to_string()
            } else {
                financial_notes.join(", ")
            },
        ),
    ];

    // Weights are integral basis points so that exact halves survive the sum.
    let weighted: f64 = components
        .iter()
        .map(|component| component.sub_score * f64::from(component.factor.weight_basis_points()))
        .sum();
    let weighted_total = weighted / f64::from(BASIS_POINTS);

    if !weighted_total.is_finite() {
        return Err(ScoringError::NonFiniteResult);
    }

    let score = weighted_total.round().clamp(0.0, 100.0) as u8;

    Ok(ScoreBreakdown {
        components,
        weighted_total,
        score,
    })
}
