use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::context::RequestContext;
use super::documents::DocumentRecord;
use super::domain::{
    Bank, BankCriteria, BankId, Disbursement, Lead, LeadId, LeadStatus, Offer, OfferId,
};
use super::lifecycle::{LeadEvent, TransitionError};

/// Selection applied when listing leads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub statuses: Vec<LeadStatus>,
    pub min_score: Option<u8>,
    pub max_amount: Option<f64>,
}

impl LeadFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Leads still open for bidding that satisfy a bank's criteria.
    pub fn qualifying(criteria: &BankCriteria) -> Self {
        Self {
            statuses: vec![LeadStatus::Pending, LeadStatus::Reviewing],
            min_score: criteria.min_score,
            max_amount: criteria.max_amount,
        }
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&lead.status) {
            return false;
        }
        if self.min_score.is_some_and(|min| lead.score < min) {
            return false;
        }
        match (self.max_amount, lead.submission.requested_amount) {
            (Some(max), Some(requested)) => requested <= max,
            _ => true,
        }
    }
}

/// Effects of a successful acceptance, written as one unit.
#[derive(Debug, Clone, Serialize)]
pub struct OfferAcceptance {
    pub lead: Lead,
    pub accepted: Offer,
    pub rejected: Vec<OfferId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDisbursement {
    pub lead_id: LeadId,
    pub bank_id: BankId,
    pub amount: f64,
    pub disbursed_on: NaiveDate,
}

/// Effects of a successful disbursement, written as one unit.
#[derive(Debug, Clone, Serialize)]
pub struct DisbursementReceipt {
    pub disbursement: Disbursement,
    pub lead: Lead,
    pub offer: Offer,
}

/// Storage abstraction for leads, offers, banks, disbursements, and document metadata.
///
/// Multi-row operations (`create_offer`, `accept_offer`, `create_disbursement`)
/// must be all-or-nothing: every check runs before the first write.
pub trait MarketplaceRepository: Send + Sync {
    fn create_lead(&self, ctx: &RequestContext, lead: Lead) -> Result<Lead, RepositoryError>;
    fn get_lead(&self, ctx: &RequestContext, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    fn list_leads(
        &self,
        ctx: &RequestContext,
        filter: &LeadFilter,
    ) -> Result<Vec<Lead>, RepositoryError>;
    fn update_lead_status(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
        event: LeadEvent,
        expected_version: Option<u64>,
        at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError>;

    fn register_bank(&self, ctx: &RequestContext, bank: Bank) -> Result<Bank, RepositoryError>;
    fn get_bank(&self, ctx: &RequestContext, id: &BankId) -> Result<Option<Bank>, RepositoryError>;
    fn set_bank_criteria(
        &self,
        ctx: &RequestContext,
        id: &BankId,
        criteria: BankCriteria,
    ) -> Result<BankCriteria, RepositoryError>;
    fn bank_criteria(
        &self,
        ctx: &RequestContext,
        id: &BankId,
    ) -> Result<BankCriteria, RepositoryError>;

    fn create_offer(&self, ctx: &RequestContext, offer: Offer) -> Result<Offer, RepositoryError>;
    fn get_offer(&self, ctx: &RequestContext, id: &OfferId)
        -> Result<Option<Offer>, RepositoryError>;
    fn list_offers_for_lead(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
    ) -> Result<Vec<Offer>, RepositoryError>;
    fn list_offers_for_bank(
        &self,
        ctx: &RequestContext,
        id: &BankId,
    ) -> Result<Vec<Offer>, RepositoryError>;
    fn accept_offer(
        &self,
        ctx: &RequestContext,
        offer_id: &OfferId,
        lead_id: &LeadId,
        at: DateTime<Utc>,
    ) -> Result<OfferAcceptance, RepositoryError>;

    fn create_disbursement(
        &self,
        ctx: &RequestContext,
        request: NewDisbursement,
        at: DateTime<Utc>,
    ) -> Result<DisbursementReceipt, RepositoryError>;
    fn list_disbursements_for_lead(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
    ) -> Result<Vec<Disbursement>, RepositoryError>;

    fn record_document(
        &self,
        ctx: &RequestContext,
        document: DocumentRecord,
    ) -> Result<DocumentRecord, RepositoryError>;
    fn list_documents(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("no accepted offer from bank {bank_id} exists for lead {lead_id}")]
    NoAcceptedOffer { lead_id: LeadId, bank_id: BankId },
    #[error("offer {0} expired before it was accepted")]
    OfferExpired(OfferId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
