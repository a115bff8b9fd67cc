use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::context::RequestContext;
use crate::marketplace::documents::{DocumentRecord, InMemoryDocumentStore};
use crate::marketplace::domain::{
    ApplicantAttributes, Bank, BankCriteria, BankId, BankRegistration, ContactDetails,
    Disbursement, EmploymentStatus, HousingType, Lead, LeadId, LeadSubmission, Offer, OfferId,
    OfferProposal,
};
use crate::marketplace::lifecycle::LeadEvent;
use crate::marketplace::repository::{
    DisbursementReceipt, LeadFilter, MarketplaceRepository, NewDisbursement, OfferAcceptance,
    RepositoryError,
};
use crate::marketplace::{marketplace_router, InMemoryMarketplaceRepository, MarketplaceService};

pub(super) type MemoryService = MarketplaceService<InMemoryMarketplaceRepository, InMemoryDocumentStore>;

pub(super) fn marketplace_config() -> MarketplaceConfig {
    MarketplaceConfig {
        document_max_bytes: 1024,
        document_url_ttl_secs: 3600,
        default_offer_validity_days: 30,
        storage_base_url: "https://files.lendmarket.test".to_string(),
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    InMemoryMarketplaceRepository,
    InMemoryDocumentStore,
) {
    let repository = InMemoryMarketplaceRepository::default();
    let documents = InMemoryDocumentStore::new("https://files.lendmarket.test");
    let service = MarketplaceService::new(
        Arc::new(repository.clone()),
        Arc::new(documents.clone()),
        marketplace_config(),
    );
    (service, repository, documents)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    marketplace_router(Arc::new(service))
}

/// Salaried homeowner earning above the income threshold with no debts.
pub(super) fn strong_applicant() -> ApplicantAttributes {
    ApplicantAttributes {
        monthly_income: Some(12_000.0),
        housing: Some(HousingType::Owned),
        employment: Some(EmploymentStatus::FullTime),
        ..ApplicantAttributes::default()
    }
}

pub(super) fn submission() -> LeadSubmission {
    LeadSubmission {
        contact: ContactDetails {
            full_name: "  Ana Lucia Lopez ".to_string(),
            email: "Ana.Lopez@Correo.GT".to_string(),
            phone: "5555-1234".to_string(),
            national_id: Some("2547 89012 0101".to_string()),
        },
        applicant: strong_applicant(),
        requested_amount: Some(25_000.0),
        loan_purpose: Some("vehicle".to_string()),
    }
}

pub(super) fn submit_lead(service: &MemoryService) -> Lead {
    service
        .submit_lead(&RequestContext::applicant(), submission())
        .expect("lead submission succeeds")
}

pub(super) fn register_bank(service: &MemoryService, name: &str) -> Bank {
    service
        .register_bank(
            &RequestContext::system(),
            BankRegistration {
                name: name.to_string(),
                email: format!("{}@bancos.gt", name.to_ascii_lowercase().replace(' ', ".")),
            },
        )
        .expect("bank registration succeeds")
}

pub(super) fn proposal(amount: f64) -> OfferProposal {
    OfferProposal {
        amount,
        annual_rate: 18.0,
        term_months: 36,
        monthly_installment: None,
        validity_days: None,
    }
}

pub(super) fn offer_from(service: &MemoryService, bank: &Bank, lead: &Lead, amount: f64) -> Offer {
    service
        .create_offer(&RequestContext::bank(bank.id), &lead.id, proposal(amount))
        .expect("offer creation succeeds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl MarketplaceRepository for UnavailableRepository {
    fn create_lead(&self, _ctx: &RequestContext, _lead: Lead) -> Result<Lead, RepositoryError> {
        offline()
    }

    fn get_lead(&self, _ctx: &RequestContext, _id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        offline()
    }

    fn list_leads(
        &self,
        _ctx: &RequestContext,
        _filter: &LeadFilter,
    ) -> Result<Vec<Lead>, RepositoryError> {
        offline()
    }

    fn update_lead_status(
        &self,
        _ctx: &RequestContext,
        _id: &LeadId,
        _event: LeadEvent,
        _expected_version: Option<u64>,
        _at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        offline()
    }

    fn register_bank(&self, _ctx: &RequestContext, _bank: Bank) -> Result<Bank, RepositoryError> {
        offline()
    }

    fn get_bank(&self, _ctx: &RequestContext, _id: &BankId) -> Result<Option<Bank>, RepositoryError> {
        offline()
    }

    fn set_bank_criteria(
        &self,
        _ctx: &RequestContext,
        _id: &BankId,
        _criteria: BankCriteria,
    ) -> Result<BankCriteria, RepositoryError> {
        offline()
    }

    fn bank_criteria(
        &self,
        _ctx: &RequestContext,
        _id: &BankId,
    ) -> Result<BankCriteria, RepositoryError> {
        offline()
    }

    fn create_offer(&self, _ctx: &RequestContext, _offer: Offer) -> Result<Offer, RepositoryError> {
        offline()
    }

    fn get_offer(
        &self,
        _ctx: &RequestContext,
        _id: &OfferId,
    ) -> Result<Option<Offer>, RepositoryError> {
        offline()
    }

    fn list_offers_for_lead(
        &self,
        _ctx: &RequestContext,
        _id: &LeadId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        offline()
    }

    fn list_offers_for_bank(
        &self,
        _ctx: &RequestContext,
        _id: &BankId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        offline()
    }

    fn accept_offer(
        &self,
        _ctx: &RequestContext,
        _offer_id: &OfferId,
        _lead_id: &LeadId,
        _at: DateTime<Utc>,
    ) -> Result<OfferAcceptance, RepositoryError> {
        offline()
    }

    fn create_disbursement(
        &self,
        _ctx: &RequestContext,
        _request: NewDisbursement,
        _at: DateTime<Utc>,
    ) -> Result<DisbursementReceipt, RepositoryError> {
        offline()
    }

    fn list_disbursements_for_lead(
        &self,
        _ctx: &RequestContext,
        _id: &LeadId,
    ) -> Result<Vec<Disbursement>, RepositoryError> {
        offline()
    }

    fn record_document(
        &self,
        _ctx: &RequestContext,
        _document: DocumentRecord,
    ) -> Result<DocumentRecord, RepositoryError> {
        offline()
    }

    fn list_documents(
        &self,
        _ctx: &RequestContext,
        _lead_id: &LeadId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        offline()
    }
}

/// In-memory store whose document metadata writes always fail.
#[derive(Default)]
pub(super) struct MetadataOutage {
    inner: InMemoryMarketplaceRepository,
}

impl MarketplaceRepository for MetadataOutage {
    fn create_lead(&self, ctx: &RequestContext, lead: Lead) -> Result<Lead, RepositoryError> {
        self.inner.create_lead(ctx, lead)
    }

    fn get_lead(&self, ctx: &RequestContext, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        self.inner.get_lead(ctx, id)
    }

    fn list_leads(
        &self,
        ctx: &RequestContext,
        filter: &LeadFilter,
    ) -> Result<Vec<Lead>, RepositoryError> {
        self.inner.list_leads(ctx, filter)
    }

    fn update_lead_status(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
        event: LeadEvent,
        expected_version: Option<u64>,
        at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        self.inner
            .update_lead_status(ctx, id, event, expected_version, at)
    }

    fn register_bank(&self, ctx: &RequestContext, bank: Bank) -> Result<Bank, RepositoryError> {
        self.inner.register_bank(ctx, bank)
    }

    fn get_bank(&self, ctx: &RequestContext, id: &BankId) -> Result<Option<Bank>, RepositoryError> {
        self.inner.get_bank(ctx, id)
    }

    fn set_bank_criteria(
        &self,
        ctx: &RequestContext,
        id: &BankId,
        criteria: BankCriteria,
    ) -> Result<BankCriteria, RepositoryError> {
        self.inner.set_bank_criteria(ctx, id, criteria)
    }

    fn bank_criteria(
        &self,
        ctx: &RequestContext,
        id: &BankId,
    ) -> Result<BankCriteria, RepositoryError> {
        self.inner.bank_criteria(ctx, id)
    }

    fn create_offer(&self, ctx: &RequestContext, offer: Offer) -> Result<Offer, RepositoryError> {
        self.inner.create_offer(ctx, offer)
    }

    fn get_offer(
        &self,
        ctx: &RequestContext,
        id: &OfferId,
    ) -> Result<Option<Offer>, RepositoryError> {
        self.inner.get_offer(ctx, id)
    }

    fn list_offers_for_lead(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        self.inner.list_offers_for_lead(ctx, id)
    }

    fn list_offers_for_bank(
        &self,
        ctx: &RequestContext,
        id: &BankId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        self.inner.list_offers_for_bank(ctx, id)
    }

    fn accept_offer(
        &self,
        ctx: &RequestContext,
        offer_id: &OfferId,
        lead_id: &LeadId,
        at: DateTime<Utc>,
    ) -> Result<OfferAcceptance, RepositoryError> {
        self.inner.accept_offer(ctx, offer_id, lead_id, at)
    }

    fn create_disbursement(
        &self,
        ctx: &RequestContext,
        request: NewDisbursement,
        at: DateTime<Utc>,
    ) -> Result<DisbursementReceipt, RepositoryError> {
        self.inner.create_disbursement(ctx, request, at)
    }

    fn list_disbursements_for_lead(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
    ) -> Result<Vec<Disbursement>, RepositoryError> {
        self.inner.list_disbursements_for_lead(ctx, id)
    }

    fn record_document(
        &self,
        _ctx: &RequestContext,
        _document: DocumentRecord,
    ) -> Result<DocumentRecord, RepositoryError> {
        offline()
    }

    fn list_documents(
        &self,
        ctx: &RequestContext,
        lead_id: &LeadId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        self.inner.list_documents(ctx, lead_id)
    }
}
