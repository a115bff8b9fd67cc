use super::domain::{
    ApplicantAttributes, BankCriteria, BankRegistration, DisbursementRequest, LeadSubmission,
    OfferProposal, OfferTerms,
};

const MAX_TERM_MONTHS: u32 = 360;
const MAX_VALIDITY_DAYS: i64 = 365;
const NATIONAL_ID_DIGITS: usize = 13;
const PHONE_DIGITS: usize = 8;

/// Validation errors raised before any write reaches the repository.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),
    #[error("phone number must have 8 digits and not start with 0 or 1")]
    InvalidPhone,
    #[error("national id must have 13 digits")]
    InvalidNationalId,
    #[error("'{field}' must be a finite, non-negative amount (found {value})")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("'{field}' must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("'{field}' must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },
    #[error("status '{0}' cannot be set directly")]
    UnsupportedStatus(&'static str),
    #[error("'{field}' is not a valid identifier: {value}")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("unknown document kind '{0}'")]
    UnknownDocumentKind(String),
}

/// Sanitises applicant and bank input into the shapes stored by the repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn lead_submission(
        &self,
        mut submission: LeadSubmission,
    ) -> Result<LeadSubmission, ValidationError> {
        let contact = &mut submission.contact;
        contact.full_name = required("contact.full_name", &contact.full_name)?;
        contact.email = required("contact.email", &contact.email)?.to_ascii_lowercase();
        if !is_valid_email(&contact.email) {
            return Err(ValidationError::InvalidEmail(contact.email.clone()));
        }
        contact.phone = normalize_phone(&contact.phone)?;
        if let Some(national_id) = contact.national_id.take() {
            let digits = digits_only(&national_id);
            if digits.is_empty() {
                contact.national_id = None;
            } else if digits.len() != NATIONAL_ID_DIGITS {
                return Err(ValidationError::InvalidNationalId);
            } else {
                contact.national_id = Some(digits);
            }
        }

        self.applicant(&submission.applicant)?;

        if let Some(amount) = submission.requested_amount {
            positive("requested_amount", amount)?;
        }
        submission.loan_purpose = submission
            .loan_purpose
            .map(|purpose| purpose.trim().to_string())
            .filter(|purpose| !purpose.is_empty());

        Ok(submission)
    }

    pub fn applicant(&self, applicant: &ApplicantAttributes) -> Result<(), ValidationError> {
        non_negative("applicant.monthly_income", applicant.monthly_income)?;
        non_negative("applicant.savings", applicant.savings)?;
        non_negative("applicant.investments", applicant.investments)?;
        non_negative("applicant.debt_amount", applicant.debt_amount)?;
        Ok(())
    }

    /// Minimum attribute set required by the standalone score endpoint.
    pub fn score_request(&self, applicant: &ApplicantAttributes) -> Result<(), ValidationError> {
        if applicant.monthly_income.is_none() {
            return Err(ValidationError::MissingField("monthly_income"));
        }
        if applicant.housing.is_none() {
            return Err(ValidationError::MissingField("housing"));
        }
        if applicant.employment.is_none() {
            return Err(ValidationError::MissingField("employment"));
        }
        self.applicant(applicant)
    }

    /// Validate a bank's proposal, deriving the installment when it was omitted.
    pub fn offer_terms(
        &self,
        proposal: &OfferProposal,
        default_validity_days: i64,
    ) -> Result<(OfferTerms, i64), ValidationError> {
        positive("amount", proposal.amount)?;
        positive("annual_rate", proposal.annual_rate)?;
        if proposal.term_months == 0 || proposal.term_months > MAX_TERM_MONTHS {
            return Err(ValidationError::OutOfRange {
                field: "term_months",
                min: 1,
                max: i64::from(MAX_TERM_MONTHS),
            });
        }

        let monthly_installment = match proposal.monthly_installment {
            Some(installment) => {
                positive("monthly_installment", installment)?;
                installment
            }
            None => amortized_installment(proposal.amount, proposal.annual_rate, proposal.term_months),
        };

        let validity_days = proposal.validity_days.unwrap_or(default_validity_days);
        if !(1..=MAX_VALIDITY_DAYS).contains(&validity_days) {
            return Err(ValidationError::OutOfRange {
                field: "validity_days",
                min: 1,
                max: MAX_VALIDITY_DAYS,
            });
        }

        Ok((
            OfferTerms {
                amount: proposal.amount,
                annual_rate: proposal.annual_rate,
                term_months: proposal.term_months,
                monthly_installment,
            },
            validity_days,
        ))
    }

    pub fn disbursement(&self, request: &DisbursementRequest) -> Result<(), ValidationError> {
        positive("amount", request.amount)
    }

    pub fn bank_registration(
        &self,
        mut registration: BankRegistration,
    ) -> Result<BankRegistration, ValidationError> {
        registration.name = required("name", &registration.name)?;
        registration.email = required("email", &registration.email)?.to_ascii_lowercase();
        if !is_valid_email(&registration.email) {
            return Err(ValidationError::InvalidEmail(registration.email));
        }
        Ok(registration)
    }

    pub fn bank_criteria(&self, criteria: &BankCriteria) -> Result<(), ValidationError> {
        if let Some(min_score) = criteria.min_score {
            if min_score > 100 {
                return Err(ValidationError::OutOfRange {
                    field: "min_score",
                    min: 0,
                    max: 100,
                });
            }
        }
        if let Some(max_amount) = criteria.max_amount {
            positive("max_amount", max_amount)?;
        }
        Ok(())
    }
}

/// French amortisation: constant installment for a nominal annual rate in percent.
pub fn amortized_installment(amount: f64, annual_rate: f64, term_months: u32) -> f64 {
    let months = f64::from(term_months.max(1));
    let monthly_rate = annual_rate / 100.0 / 12.0;
    let installment = if monthly_rate <= 0.0 {
        amount / months
    } else {
        amount * monthly_rate / (1.0 - (1.0 + monthly_rate).powf(-months))
    };
    (installment * 100.0).round() / 100.0
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn non_negative(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(ValidationError::InvalidAmount { field, value })
        }
        _ => Ok(()),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidAmount { field, value });
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return Err(ValidationError::MissingField("contact.phone"));
    }
    match digits.chars().next() {
        Some('2'..='9') if digits.len() == PHONE_DIGITS => Ok(digits),
        _ => Err(ValidationError::InvalidPhone),
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
