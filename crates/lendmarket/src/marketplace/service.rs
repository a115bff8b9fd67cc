use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use super::context::{AccessError, Actor, RequestContext};
use super::documents::{
    storage_path, DocumentError, DocumentPolicy, DocumentReceipt, DocumentRecord, DocumentStore,
    DocumentUpload,
};
use super::domain::{
    ApplicantAttributes, Bank, BankCriteria, BankId, BankRegistration, DisbursementRequest,
    DocumentId, Lead, LeadId, LeadStatus, LeadStatusUpdate, LeadSubmission, Offer, OfferId,
    OfferProposal, OfferStatus, ScoreSource,
};
use super::intake::{IntakeGuard, ValidationError};
use super::lifecycle::LeadEvent;
use super::repository::{
    DisbursementReceipt, LeadFilter, MarketplaceRepository, NewDisbursement, OfferAcceptance,
    RepositoryError,
};
use super::scoring::{ScoreOutcome, ScoringEngine, ScoringModelView};
use crate::config::MarketplaceConfig;

/// Service composing intake validation, scoring, the repository, and document storage.
pub struct MarketplaceService<R, D> {
    repository: Arc<R>,
    documents: Arc<D>,
    guard: IntakeGuard,
    engine: ScoringEngine,
    config: MarketplaceConfig,
}

impl<R, D> MarketplaceService<R, D>
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(repository: Arc<R>, documents: Arc<D>, config: MarketplaceConfig) -> Self {
        Self {
            repository,
            documents,
            guard: IntakeGuard,
            engine: ScoringEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Validate and score a form submission, storing it as a pending lead.
    pub fn submit_lead(
        &self,
        ctx: &RequestContext,
        submission: LeadSubmission,
    ) -> Result<Lead, MarketplaceError> {
        ctx.ensure_not_bank()?;
        let submission = self.guard.lead_submission(submission)?;
        let outcome = self.engine.score(&submission.applicant);
        if outcome.source == ScoreSource::Fallback {
            warn!(request_id = %ctx.request_id, "lead stored with fallback score");
        }

        let now = Utc::now();
        let lead = Lead {
            id: LeadId::new(),
            submission,
            score: outcome.score,
            score_source: outcome.source,
            status: LeadStatus::Pending,
            has_offers: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.create_lead(ctx, lead)?;
        info!(
            request_id = %ctx.request_id,
            lead_id = %stored.id,
            score = stored.score,
            "lead submitted"
        );
        Ok(stored)
    }

    pub fn get_lead(&self, ctx: &RequestContext, lead_id: &LeadId) -> Result<Lead, MarketplaceError> {
        let lead = self
            .repository
            .get_lead(ctx, lead_id)?
            .ok_or_else(|| RepositoryError::not_found("lead", lead_id))?;
        Ok(lead)
    }

    pub fn list_leads(&self, ctx: &RequestContext) -> Result<Vec<Lead>, MarketplaceError> {
        Ok(self.repository.list_leads(ctx, &LeadFilter::all())?)
    }

    /// Manual review decisions; only registered banks and system callers may make them.
    pub fn update_lead_status(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
        update: LeadStatusUpdate,
    ) -> Result<Lead, MarketplaceError> {
        if ctx.actor != Actor::System {
            self.authorize_bank(ctx)?;
        }
        let event = LeadEvent::for_manual_target(update.status)
            .ok_or(ValidationError::UnsupportedStatus(update.status.label()))?;
        let lead = self.repository.update_lead_status(
            ctx,
            lead_id,
            event,
            update.expected_version,
            Utc::now(),
        )?;
        info!(
            request_id = %ctx.request_id,
            lead_id = %lead_id,
            status = lead.status.label(),
            "lead status changed"
        );
        Ok(lead)
    }

    pub fn lead_offers(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
    ) -> Result<Vec<Offer>, MarketplaceError> {
        self.get_lead(ctx, lead_id)?;
        Ok(self.repository.list_offers_for_lead(ctx, lead_id)?)
    }

    /// Accept one offer for the lead; siblings are rejected in the same write.
    pub fn accept_offer(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
        offer_id: &OfferId,
    ) -> Result<OfferAcceptance, MarketplaceError> {
        ctx.ensure_not_bank()?;
        let acceptance = self
            .repository
            .accept_offer(ctx, offer_id, lead_id, Utc::now())?;
        info!(
            request_id = %ctx.request_id,
            lead_id = %lead_id,
            offer_id = %offer_id,
            rejected = acceptance.rejected.len(),
            "offer accepted"
        );
        Ok(acceptance)
    }

    pub fn register_bank(
        &self,
        ctx: &RequestContext,
        registration: BankRegistration,
    ) -> Result<Bank, MarketplaceError> {
        let registration = self.guard.bank_registration(registration)?;
        let bank = Bank {
            id: BankId::new(),
            name: registration.name,
            email: registration.email,
            created_at: Utc::now(),
        };
        let bank = self.repository.register_bank(ctx, bank)?;
        info!(request_id = %ctx.request_id, bank_id = %bank.id, "bank registered");
        Ok(bank)
    }

    /// Resolve the calling bank, failing when the context is not a registered bank.
    pub fn authorize_bank(&self, ctx: &RequestContext) -> Result<Bank, MarketplaceError> {
        let bank_id = ctx.bank_id()?;
        let bank = self
            .repository
            .get_bank(ctx, &bank_id)?
            .ok_or(AccessError::UnknownBank(bank_id))?;
        Ok(bank)
    }

    pub fn set_bank_criteria(
        &self,
        ctx: &RequestContext,
        criteria: BankCriteria,
    ) -> Result<BankCriteria, MarketplaceError> {
        let bank = self.authorize_bank(ctx)?;
        self.guard.bank_criteria(&criteria)?;
        Ok(self.repository.set_bank_criteria(ctx, &bank.id, criteria)?)
    }

    /// Open leads matching the calling bank's criteria.
    pub fn qualifying_leads(&self, ctx: &RequestContext) -> Result<Vec<Lead>, MarketplaceError> {
        let bank = self.authorize_bank(ctx)?;
        let criteria = self.repository.bank_criteria(ctx, &bank.id)?;
        Ok(self
            .repository
            .list_leads(ctx, &LeadFilter::qualifying(&criteria))?)
    }

    pub fn bank_offers(&self, ctx: &RequestContext) -> Result<Vec<Offer>, MarketplaceError> {
        let bank = self.authorize_bank(ctx)?;
        Ok(self.repository.list_offers_for_bank(ctx, &bank.id)?)
    }

    pub fn create_offer(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
        proposal: OfferProposal,
    ) -> Result<Offer, MarketplaceError> {
        let bank = self.authorize_bank(ctx)?;
        let (terms, validity_days) = self
            .guard
            .offer_terms(&proposal, self.config.default_offer_validity_days)?;

        let now = Utc::now();
        let offer = Offer {
            id: OfferId::new(),
            lead_id: *lead_id,
            bank_id: bank.id,
            terms,
            valid_until: now + Duration::days(validity_days),
            status: OfferStatus::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
            accepted_at: None,
        };

        let offer = self.repository.create_offer(ctx, offer)?;
        info!(
            request_id = %ctx.request_id,
            lead_id = %lead_id,
            offer_id = %offer.id,
            bank = %bank.name,
            "offer created"
        );
        Ok(offer)
    }

    /// Record released funds against the calling bank's accepted offer.
    pub fn disburse(
        &self,
        ctx: &RequestContext,
        request: DisbursementRequest,
    ) -> Result<DisbursementReceipt, MarketplaceError> {
        let bank = self.authorize_bank(ctx)?;
        self.guard.disbursement(&request)?;
        let now = Utc::now();
        let receipt = self.repository.create_disbursement(
            ctx,
            NewDisbursement {
                lead_id: request.lead_id,
                bank_id: bank.id,
                amount: request.amount,
                disbursed_on: request.disbursed_on.unwrap_or_else(|| now.date_naive()),
            },
            now,
        )?;
        info!(
            request_id = %ctx.request_id,
            lead_id = %receipt.lead.id,
            offer_id = %receipt.offer.id,
            amount = receipt.disbursement.amount,
            "disbursement recorded"
        );
        Ok(receipt)
    }

    pub fn upload_document(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
        upload: DocumentUpload,
    ) -> Result<DocumentReceipt, MarketplaceError> {
        self.get_lead(ctx, lead_id)?;
        let mime = self.document_policy().validate(&upload)?;

        let path = storage_path(lead_id, upload.kind, &mime);
        self.documents.put(&path, &mime, &upload.bytes)?;

        let now = Utc::now();
        let recorded = self.repository.record_document(
            ctx,
            DocumentRecord {
                id: DocumentId::new(),
                lead_id: *lead_id,
                kind: upload.kind,
                original_name: upload.file_name,
                content_type: mime.essence_str().to_string(),
                size_bytes: upload.bytes.len() as u64,
                storage_path: path.clone(),
                created_at: now,
            },
        );
        let record = match recorded {
            Ok(record) => record,
            Err(err) => {
                // An object is only kept once its metadata row exists.
                if let Err(cleanup) = self.documents.delete(&path) {
                    warn!(
                        request_id = %ctx.request_id,
                        path = %path,
                        error = %cleanup,
                        "orphaned document could not be removed"
                    );
                }
                return Err(err.into());
            }
        };

        let expires_at = now + self.document_policy().url_ttl;
        let access_url = self.documents.signed_url(&record.storage_path, expires_at)?;
        info!(
            request_id = %ctx.request_id,
            lead_id = %lead_id,
            kind = record.kind.label(),
            size = record.size_bytes,
            "document uploaded"
        );

        Ok(DocumentReceipt {
            document: record,
            access_url,
            expires_at,
        })
    }

    pub fn lead_documents(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
    ) -> Result<Vec<DocumentRecord>, MarketplaceError> {
        self.get_lead(ctx, lead_id)?;
        Ok(self.repository.list_documents(ctx, lead_id)?)
    }

    /// Score a bare attribute record without storing anything.
    pub fn calculate_score(
        &self,
        applicant: &ApplicantAttributes,
    ) -> Result<ScoreOutcome, MarketplaceError> {
        self.guard.score_request(applicant)?;
        Ok(self.engine.score(applicant))
    }

    pub fn scoring_model(&self) -> ScoringModelView {
        self.engine.model()
    }

    fn document_policy(&self) -> DocumentPolicy {
        DocumentPolicy {
            max_bytes: self.config.document_max_bytes,
            url_ttl: Duration::seconds(self.config.document_url_ttl_secs),
        }
    }
}

/// Error raised by the marketplace service.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl MarketplaceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketplaceError::Access(AccessError::BankRequired)
            | MarketplaceError::Access(AccessError::InvalidBankId(_)) => StatusCode::UNAUTHORIZED,
            MarketplaceError::Access(_) => StatusCode::FORBIDDEN,
            MarketplaceError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            MarketplaceError::Repository(
                RepositoryError::Conflict(_)
                | RepositoryError::Transition(_)
                | RepositoryError::NoAcceptedOffer { .. }
                | RepositoryError::OfferExpired(_),
            ) => StatusCode::CONFLICT,
            MarketplaceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            MarketplaceError::Document(DocumentError::TooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            MarketplaceError::Document(DocumentError::UnsupportedType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            MarketplaceError::Document(DocumentError::Empty | DocumentError::MissingFileName) => {
                StatusCode::BAD_REQUEST
            }
            MarketplaceError::Document(DocumentError::Storage(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
