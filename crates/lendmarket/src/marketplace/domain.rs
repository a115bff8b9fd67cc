use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

identifier!(
    /// Identifier for an applicant's credit request.
    LeadId
);
identifier!(
    /// Identifier for a bank's proposed loan terms.
    OfferId
);
identifier!(BankId);
identifier!(DisbursementId);
identifier!(DocumentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HousingType {
    Owned,
    Family,
    Rented,
    Mortgaged,
    Other,
}

impl HousingType {
    pub const ALL: [HousingType; 5] = [
        HousingType::Owned,
        HousingType::Family,
        HousingType::Rented,
        HousingType::Mortgaged,
        HousingType::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            HousingType::Owned => "owned",
            HousingType::Family => "family",
            HousingType::Rented => "rented",
            HousingType::Mortgaged => "mortgaged",
            HousingType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    FullTime,
    PartTime,
    SelfEmployed,
    BusinessOwner,
    Student,
    Retired,
    Unemployed,
    Other,
}

impl EmploymentStatus {
    pub const ALL: [EmploymentStatus; 8] = [
        EmploymentStatus::FullTime,
        EmploymentStatus::PartTime,
        EmploymentStatus::SelfEmployed,
        EmploymentStatus::BusinessOwner,
        EmploymentStatus::Student,
        EmploymentStatus::Retired,
        EmploymentStatus::Unemployed,
        EmploymentStatus::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::FullTime => "full_time",
            EmploymentStatus::PartTime => "part_time",
            EmploymentStatus::SelfEmployed => "self_employed",
            EmploymentStatus::BusinessOwner => "business_owner",
            EmploymentStatus::Student => "student",
            EmploymentStatus::Retired => "retired",
            EmploymentStatus::Unemployed => "unemployed",
            EmploymentStatus::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Primary,
    Secondary,
    IncompleteUniversity,
    University,
    Postgraduate,
}

/// Self-reported applicant data consumed by the scoring engine.
///
/// Every numeric field is optional; the scoring rules document what a missing
/// value contributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantAttributes {
    pub monthly_income: Option<f64>,
    pub housing: Option<HousingType>,
    pub employment: Option<EmploymentStatus>,
    pub savings: Option<f64>,
    pub investments: Option<f64>,
    /// New loans taken during the last three months.
    pub recent_loans: bool,
    pub has_other_debts: bool,
    pub debt_amount: Option<f64>,
    pub education: Option<EducationLevel>,
    pub tenure_years: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
}

/// Payload collected by the multi-step applicant form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadSubmission {
    pub contact: ContactDetails,
    #[serde(default)]
    pub applicant: ApplicantAttributes,
    #[serde(default)]
    pub requested_amount: Option<f64>,
    #[serde(default)]
    pub loan_purpose: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    Reviewing,
    Approved,
    Rejected,
    OfferAccepted,
    Completed,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Reviewing => "reviewing",
            LeadStatus::Approved => "approved",
            LeadStatus::Rejected => "rejected",
            LeadStatus::OfferAccepted => "offer_accepted",
            LeadStatus::Completed => "completed",
        }
    }

    /// Banks may only bid on leads that have not been decided yet.
    pub const fn accepts_offers(self) -> bool {
        matches!(self, LeadStatus::Pending | LeadStatus::Reviewing)
    }
}

/// Whether a stored score came from the model or from the neutral fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Model,
    Fallback,
}

/// Aggregate root for an applicant's credit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub submission: LeadSubmission,
    pub score: u8,
    pub score_source: ScoreSource,
    pub status: LeadStatus,
    pub has_offers: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn view(&self) -> LeadView {
        LeadView {
            id: self.id,
            status: self.status.label(),
            score: self.score,
            has_offers: self.has_offers,
            version: self.version,
            full_name: self.submission.contact.full_name.clone(),
            requested_amount: self.submission.requested_amount,
            loan_purpose: self.submission.loan_purpose.clone(),
            applicant: self.submission.applicant.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }
}

/// Lead representation exposed over HTTP; contact details beyond the name stay private.
#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    pub id: LeadId,
    pub status: &'static str,
    pub score: u8,
    pub has_offers: bool,
    pub version: u64,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_purpose: Option<String>,
    pub applicant: ApplicantAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Completed => "completed",
        }
    }
}

/// Loan terms as proposed by the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferProposal {
    pub amount: f64,
    /// Nominal annual interest rate, in percent.
    pub annual_rate: f64,
    pub term_months: u32,
    #[serde(default)]
    pub monthly_installment: Option<f64>,
    #[serde(default)]
    pub validity_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub amount: f64,
    pub annual_rate: f64,
    pub term_months: u32,
    pub monthly_installment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub lead_id: LeadId,
    pub bank_id: BankId,
    pub terms: OfferTerms,
    pub valid_until: DateTime<Utc>,
    pub status: OfferStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        at > self.valid_until
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }
}

/// Funds released by a bank against an accepted offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disbursement {
    pub id: DisbursementId,
    pub lead_id: LeadId,
    pub bank_id: BankId,
    pub offer_id: OfferId,
    pub amount: f64,
    pub disbursed_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementRequest {
    pub lead_id: LeadId,
    pub amount: f64,
    #[serde(default)]
    pub disbursed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub id: BankId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRegistration {
    pub name: String,
    pub email: String,
}

/// Per-bank filter applied when browsing leads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankCriteria {
    pub min_score: Option<u8>,
    pub max_amount: Option<f64>,
}

/// Status change requested by a bank or operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadStatusUpdate {
    pub status: LeadStatus,
    #[serde(default)]
    pub expected_version: Option<u64>,
}
