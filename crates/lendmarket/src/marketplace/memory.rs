//! Process-local repository backing the API binary, the CLI demo, and tests.
//!
//! The whole store sits behind one mutex, so every repository call is a
//! serialisable transaction. Multi-row operations validate against the locked
//! state first and only then write, which keeps failures free of partial
//! effects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::context::RequestContext;
use super::documents::DocumentRecord;
use super::domain::{
    Bank, BankCriteria, BankId, Disbursement, DisbursementId, Lead, LeadId, Offer, OfferId,
    OfferStatus,
};
use super::lifecycle::{LeadEvent, OfferEvent};
use super::repository::{
    DisbursementReceipt, LeadFilter, MarketplaceRepository, NewDisbursement, OfferAcceptance,
    RepositoryError,
};

#[derive(Debug, Default)]
struct MarketplaceStore {
    leads: HashMap<LeadId, Lead>,
    offers: HashMap<OfferId, Offer>,
    banks: HashMap<BankId, Bank>,
    criteria: HashMap<BankId, BankCriteria>,
    disbursements: HashMap<DisbursementId, Disbursement>,
    documents: Vec<DocumentRecord>,
}

impl MarketplaceStore {
    fn lead(&self, id: &LeadId) -> Result<&Lead, RepositoryError> {
        self.leads
            .get(id)
            .ok_or_else(|| RepositoryError::not_found("lead", id))
    }

    fn offers_for_lead(&self, lead_id: &LeadId) -> Vec<Offer> {
        let mut offers: Vec<Offer> = self
            .offers
            .values()
            .filter(|offer| &offer.lead_id == lead_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        offers
    }

    fn create_offer(&mut self, mut offer: Offer) -> Result<Offer, RepositoryError> {
        if !self.banks.contains_key(&offer.bank_id) {
            return Err(RepositoryError::not_found("bank", offer.bank_id));
        }
        if self.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict(format!(
                "offer {} already exists",
                offer.id
            )));
        }
        let lead = self.lead(&offer.lead_id)?;
        if !lead.status.accepts_offers() {
            return Err(RepositoryError::Conflict(format!(
                "lead {} is {} and no longer accepts offers",
                lead.id,
                lead.status.label()
            )));
        }

        offer.status = OfferStatus::Pending;
        offer.accepted_at = None;

        if let Some(lead) = self.leads.get_mut(&offer.lead_id) {
            if !lead.has_offers {
                lead.has_offers = true;
                lead.touch(offer.created_at);
            }
        }
        self.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    fn accept_offer(
        &mut self,
        offer_id: &OfferId,
        lead_id: &LeadId,
        at: DateTime<Utc>,
    ) -> Result<OfferAcceptance, RepositoryError> {
        let mut lead = self.lead(lead_id)?.clone();
        let mut accepted = self
            .offers
            .get(offer_id)
            .filter(|offer| &offer.lead_id == lead_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("offer", offer_id))?;

        if let Some(existing) = self.offers.values().find(|candidate| {
            &candidate.lead_id == lead_id
                && candidate.id != *offer_id
                && candidate.status == OfferStatus::Accepted
        }) {
            return Err(RepositoryError::Conflict(format!(
                "lead {lead_id} already accepted offer {}",
                existing.id
            )));
        }

        let accepted_status = accepted.status.apply(OfferEvent::Accept).map_err(|err| {
            RepositoryError::Conflict(format!("offer {offer_id} cannot be accepted: {err}"))
        })?;
        if accepted.is_expired(at) {
            return Err(RepositoryError::OfferExpired(*offer_id));
        }
        let lead_status = lead.status.apply(LeadEvent::AcceptOffer)?;

        let siblings: Vec<OfferId> = self
            .offers
            .values()
            .filter(|candidate| &candidate.lead_id == lead_id && candidate.id != *offer_id)
            .filter(|candidate| candidate.status.apply(OfferEvent::Reject).is_ok())
            .map(|candidate| candidate.id)
            .collect();

        // All checks passed; apply every effect.
        accepted.status = accepted_status;
        accepted.accepted_at = Some(at);
        accepted.touch(at);
        self.offers.insert(accepted.id, accepted.clone());

        for sibling_id in &siblings {
            if let Some(sibling) = self.offers.get_mut(sibling_id) {
                sibling.status = OfferStatus::Rejected;
                sibling.touch(at);
            }
        }

        lead.status = lead_status;
        lead.touch(at);
        self.leads.insert(lead.id, lead.clone());

        Ok(OfferAcceptance {
            lead,
            accepted,
            rejected: siblings,
        })
    }

    fn create_disbursement(
        &mut self,
        request: NewDisbursement,
        at: DateTime<Utc>,
    ) -> Result<DisbursementReceipt, RepositoryError> {
        if !self.banks.contains_key(&request.bank_id) {
            return Err(RepositoryError::not_found("bank", request.bank_id));
        }
        let lead = self.lead(&request.lead_id)?;
        let offer = self
            .offers
            .values()
            .find(|offer| {
                offer.lead_id == request.lead_id
                    && offer.bank_id == request.bank_id
                    && offer.status == OfferStatus::Accepted
            })
            .ok_or(RepositoryError::NoAcceptedOffer {
                lead_id: request.lead_id,
                bank_id: request.bank_id,
            })?;

        let offer_status = offer.status.apply(OfferEvent::Complete)?;
        let lead_status = lead.status.apply(LeadEvent::Complete)?;

        let disbursement = Disbursement {
            id: DisbursementId::new(),
            lead_id: request.lead_id,
            bank_id: request.bank_id,
            offer_id: offer.id,
            amount: request.amount,
            disbursed_on: request.disbursed_on,
            created_at: at,
        };

        let mut offer = offer.clone();
        offer.status = offer_status;
        offer.touch(at);
        let mut lead = lead.clone();
        lead.status = lead_status;
        lead.touch(at);

        self.offers.insert(offer.id, offer.clone());
        self.leads.insert(lead.id, lead.clone());
        self.disbursements
            .insert(disbursement.id, disbursement.clone());

        Ok(DisbursementReceipt {
            disbursement,
            lead,
            offer,
        })
    }
}

/// Mutex-guarded marketplace store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketplaceRepository {
    store: Arc<Mutex<MarketplaceStore>>,
}

impl InMemoryMarketplaceRepository {
    fn store(&self) -> Result<MutexGuard<'_, MarketplaceStore>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("marketplace store lock poisoned".to_string()))
    }

    pub fn disbursement_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.store()?.disbursements.len())
    }
}

impl MarketplaceRepository for InMemoryMarketplaceRepository {
    fn create_lead(&self, ctx: &RequestContext, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut store = self.store()?;
        if store.leads.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict(format!(
                "lead {} already exists",
                lead.id
            )));
        }
        debug!(request_id = %ctx.request_id, lead_id = %lead.id, "lead stored");
        store.leads.insert(lead.id, lead.clone());
        Ok(lead)
    }

    fn get_lead(&self, _ctx: &RequestContext, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.store()?.leads.get(id).cloned())
    }

    fn list_leads(
        &self,
        _ctx: &RequestContext,
        filter: &LeadFilter,
    ) -> Result<Vec<Lead>, RepositoryError> {
        let store = self.store()?;
        let mut leads: Vec<Lead> = store
            .leads
            .values()
            .filter(|lead| filter.matches(lead))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    fn update_lead_status(
        &self,
        ctx: &RequestContext,
        id: &LeadId,
        event: LeadEvent,
        expected_version: Option<u64>,
        at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        let mut store = self.store()?;
        let lead = store
            .leads
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("lead", id))?;

        if let Some(expected) = expected_version {
            if lead.version != expected {
                return Err(RepositoryError::Conflict(format!(
                    "lead {id} is at version {} (expected {expected})",
                    lead.version
                )));
            }
        }

        lead.status = lead.status.apply(event)?;
        lead.touch(at);
        debug!(
            request_id = %ctx.request_id,
            lead_id = %id,
            status = lead.status.label(),
            "lead status updated"
        );
        Ok(lead.clone())
    }

    fn register_bank(&self, ctx: &RequestContext, bank: Bank) -> Result<Bank, RepositoryError> {
        let mut store = self.store()?;
        if store
            .banks
            .values()
            .any(|existing| existing.id == bank.id || existing.email == bank.email)
        {
            return Err(RepositoryError::Conflict(format!(
                "bank {} is already registered",
                bank.email
            )));
        }
        debug!(request_id = %ctx.request_id, bank_id = %bank.id, "bank registered");
        store.banks.insert(bank.id, bank.clone());
        Ok(bank)
    }

    fn get_bank(&self, _ctx: &RequestContext, id: &BankId) -> Result<Option<Bank>, RepositoryError> {
        Ok(self.store()?.banks.get(id).cloned())
    }

    fn set_bank_criteria(
        &self,
        _ctx: &RequestContext,
        id: &BankId,
        criteria: BankCriteria,
    ) -> Result<BankCriteria, RepositoryError> {
        let mut store = self.store()?;
        if !store.banks.contains_key(id) {
            return Err(RepositoryError::not_found("bank", id));
        }
        store.criteria.insert(*id, criteria);
        Ok(criteria)
    }

    fn bank_criteria(
        &self,
        _ctx: &RequestContext,
        id: &BankId,
    ) -> Result<BankCriteria, RepositoryError> {
        Ok(self.store()?.criteria.get(id).copied().unwrap_or_default())
    }

    fn create_offer(&self, ctx: &RequestContext, offer: Offer) -> Result<Offer, RepositoryError> {
        let stored = self.store()?.create_offer(offer)?;
        debug!(
            request_id = %ctx.request_id,
            offer_id = %stored.id,
            lead_id = %stored.lead_id,
            "offer stored"
        );
        Ok(stored)
    }

    fn get_offer(
        &self,
        _ctx: &RequestContext,
        id: &OfferId,
    ) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.store()?.offers.get(id).cloned())
    }

    fn list_offers_for_lead(
        &self,
        _ctx: &RequestContext,
        id: &LeadId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        Ok(self.store()?.offers_for_lead(id))
    }

    fn list_offers_for_bank(
        &self,
        _ctx: &RequestContext,
        id: &BankId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        let store = self.store()?;
        let mut offers: Vec<Offer> = store
            .offers
            .values()
            .filter(|offer| &offer.bank_id == id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers)
    }

    fn accept_offer(
        &self,
        ctx: &RequestContext,
        offer_id: &OfferId,
        lead_id: &LeadId,
        at: DateTime<Utc>,
    ) -> Result<OfferAcceptance, RepositoryError> {
        let acceptance = self.store()?.accept_offer(offer_id, lead_id, at)?;
        debug!(
            request_id = %ctx.request_id,
            offer_id = %offer_id,
            rejected = acceptance.rejected.len(),
            "offer acceptance committed"
        );
        Ok(acceptance)
    }

    fn create_disbursement(
        &self,
        ctx: &RequestContext,
        request: NewDisbursement,
        at: DateTime<Utc>,
    ) -> Result<DisbursementReceipt, RepositoryError> {
        let receipt = self.store()?.create_disbursement(request, at)?;
        debug!(
            request_id = %ctx.request_id,
            disbursement_id = %receipt.disbursement.id,
            "disbursement committed"
        );
        Ok(receipt)
    }

    fn list_disbursements_for_lead(
        &self,
        _ctx: &RequestContext,
        id: &LeadId,
    ) -> Result<Vec<Disbursement>, RepositoryError> {
        let store = self.store()?;
        Ok(store
            .disbursements
            .values()
            .filter(|disbursement| &disbursement.lead_id == id)
            .cloned()
            .collect())
    }

    fn record_document(
        &self,
        _ctx: &RequestContext,
        document: DocumentRecord,
    ) -> Result<DocumentRecord, RepositoryError> {
        let mut store = self.store()?;
        store.lead(&document.lead_id)?;
        store.documents.push(document.clone());
        Ok(document)
    }

    fn list_documents(
        &self,
        _ctx: &RequestContext,
        lead_id: &LeadId,
    ) -> Result<Vec<DocumentRecord>, RepositoryError> {
        let store = self.store()?;
        Ok(store
            .documents
            .iter()
            .filter(|document| &document.lead_id == lead_id)
            .cloned()
            .collect())
    }
}
