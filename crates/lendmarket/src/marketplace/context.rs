use axum::http::HeaderMap;
use uuid::Uuid;

use super::domain::BankId;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const BANK_ID_HEADER: &str = "x-bank-id";

/// Who is acting on the marketplace for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Applicant,
    Bank(BankId),
    /// Batch jobs and command-line tooling.
    System,
}

/// Request-scoped context handed to every service and repository call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub actor: Actor,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self {
            request_id: Uuid::new_v4().simple().to_string(),
            actor,
        }
    }

    pub fn applicant() -> Self {
        Self::new(Actor::Applicant)
    }

    pub fn bank(bank_id: BankId) -> Self {
        Self::new(Actor::Bank(bank_id))
    }

    pub fn system() -> Self {
        Self::new(Actor::System)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Build the context from HTTP headers; requests without a bank header act as applicants.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AccessError> {
        let actor = match headers.get(BANK_ID_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AccessError::InvalidBankId("<non-ascii>".to_string()))?;
                let bank_id = raw
                    .parse::<BankId>()
                    .map_err(|_| AccessError::InvalidBankId(raw.to_string()))?;
                Actor::Bank(bank_id)
            }
            None => Actor::Applicant,
        };

        let context = Self::new(actor);
        let context = match headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            Some(request_id) => context.with_request_id(request_id),
            None => context,
        };

        Ok(context)
    }

    pub fn bank_id(&self) -> Result<BankId, AccessError> {
        match self.actor {
            Actor::Bank(bank_id) => Ok(bank_id),
            _ => Err(AccessError::BankRequired),
        }
    }

    pub fn ensure_not_bank(&self) -> Result<(), AccessError> {
        match self.actor {
            Actor::Bank(_) => Err(AccessError::ApplicantOnly),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("bank authentication required")]
    BankRequired,
    #[error("invalid bank identifier '{0}'")]
    InvalidBankId(String),
    #[error("bank {0} is not registered")]
    UnknownBank(BankId),
    #[error("only the applicant may perform this action")]
    ApplicantOnly,
}
