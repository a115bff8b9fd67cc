//! Bulk applicant import from CSV exports, scored and ranked for review.

use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{ApplicantAttributes, EmploymentStatus, HousingType, ScoreSource};
use super::scoring::ScoringEngine;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read applicant export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid applicant CSV data: {}", err),
            ImportError::InvalidValue {
                line,
                column,
                value,
            } => write!(f, "line {}: invalid {} value '{}'", line, column, value),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// One applicant row after column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedApplicant {
    pub line: u64,
    pub full_name: String,
    pub requested_amount: Option<f64>,
    pub applicant: ApplicantAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedApplicant {
    pub rank: usize,
    pub full_name: String,
    pub score: u8,
    pub source: ScoreSource,
    pub requested_amount: Option<f64>,
}

pub fn load_applicants(path: &Path) -> Result<Vec<ImportedApplicant>, ImportError> {
    let file = File::open(path)?;
    parse_applicants(file)
}

pub fn parse_applicants<R: Read>(reader: R) -> Result<Vec<ImportedApplicant>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut applicants = Vec::new();

    for record in csv_reader.deserialize::<ApplicantRow>() {
        let row = record?;
        applicants.push(row.into_applicant(applicants.len() as u64 + 2)?);
    }

    Ok(applicants)
}

/// Score every applicant and order them best first; ties keep name order.
pub fn rank_applicants(
    engine: &ScoringEngine,
    applicants: &[ImportedApplicant],
) -> Vec<RankedApplicant> {
    let mut scored: Vec<_> = applicants
        .iter()
        .map(|imported| (imported, engine.score(&imported.applicant)))
        .collect();
    scored.sort_by(|(left, left_outcome), (right, right_outcome)| {
        match right_outcome.score.cmp(&left_outcome.score) {
            Ordering::Equal => left.full_name.cmp(&right.full_name),
            other => other,
        }
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (imported, outcome))| RankedApplicant {
            rank: index + 1,
            full_name: imported.full_name.clone(),
            score: outcome.score,
            source: outcome.source,
            requested_amount: imported.requested_amount,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApplicantRow {
    full_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    monthly_income: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    housing: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    employment: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    savings: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    investments: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    recent_loans: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    debt_amount: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    requested_amount: Option<String>,
}

impl ApplicantRow {
    fn into_applicant(self, line: u64) -> Result<ImportedApplicant, ImportError> {
        let amount = |column: &'static str, value: &Option<String>| {
            value
                .as_deref()
                .map(|raw| {
                    raw.replace(',', "")
                        .parse::<f64>()
                        .map_err(|_| ImportError::InvalidValue {
                            line,
                            column,
                            value: raw.to_string(),
                        })
                })
                .transpose()
        };

        let debt_amount = amount("debt_amount", &self.debt_amount)?;
        let applicant = ApplicantAttributes {
            monthly_income: amount("monthly_income", &self.monthly_income)?,
            housing: lookup(line, "housing", &self.housing, &HousingType::ALL, |kind| {
                kind.label()
            })?,
            employment: lookup(
                line,
                "employment",
                &self.employment,
                &EmploymentStatus::ALL,
                |status| status.label(),
            )?,
            savings: amount("savings", &self.savings)?,
            investments: amount("investments", &self.investments)?,
            recent_loans: flag(line, "recent_loans", &self.recent_loans)?,
            has_other_debts: debt_amount.is_some_and(|debt| debt != 0.0),
            debt_amount,
            ..ApplicantAttributes::default()
        };

        Ok(ImportedApplicant {
            line,
            full_name: self.full_name,
            requested_amount: amount("requested_amount", &self.requested_amount)?,
            applicant,
        })
    }
}

fn lookup<T: Copy>(
    line: u64,
    column: &'static str,
    value: &Option<String>,
    candidates: &[T],
    label: impl Fn(T) -> &'static str,
) -> Result<Option<T>, ImportError> {
    let Some(raw) = value.as_deref() else {
        return Ok(None);
    };
    let wanted = raw.to_ascii_lowercase().replace([' ', '-'], "_");
    candidates
        .iter()
        .copied()
        .find(|candidate| label(*candidate) == wanted)
        .map(Some)
        .ok_or_else(|| ImportError::InvalidValue {
            line,
            column,
            value: raw.to_string(),
        })
}

fn flag(line: u64, column: &'static str, value: &Option<String>) -> Result<bool, ImportError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false" | "no" | "n" | "0") => Ok(false),
        Some("true" | "yes" | "y" | "1") => Ok(true),
        Some(_) => Err(ImportError::InvalidValue {
            line,
            column,
            value: value.clone().unwrap_or_default(),
        }),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
