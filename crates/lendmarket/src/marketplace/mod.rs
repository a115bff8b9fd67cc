//! Lead intake, bank offers, and disbursement tracking for the credit marketplace.
//!
//! Applicants submit leads that are scored on arrival. Registered banks browse
//! leads matching their criteria and propose offers; the applicant accepts one
//! offer, which rejects the rest, and the bank closes the lead by recording the
//! disbursement.

pub mod context;
pub mod documents;
pub mod domain;
pub mod import;
pub mod intake;
pub mod lifecycle;
mod memory;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use context::{AccessError, Actor, RequestContext, BANK_ID_HEADER, REQUEST_ID_HEADER};
pub use documents::{
    DocumentError, DocumentKind, DocumentReceipt, DocumentRecord, DocumentStore, DocumentUpload,
    InMemoryDocumentStore,
};
pub use domain::{
    ApplicantAttributes, Bank, BankCriteria, BankId, BankRegistration, ContactDetails,
    Disbursement, DisbursementRequest, EducationLevel, EmploymentStatus, HousingType, Lead,
    LeadId, LeadStatus, LeadStatusUpdate, LeadSubmission, LeadView, Offer, OfferId,
    OfferProposal, OfferStatus, OfferTerms, ScoreSource,
};
pub use import::{ImportError, ImportedApplicant, RankedApplicant};
pub use intake::{amortized_installment, ValidationError};
pub use lifecycle::{LeadEvent, OfferEvent, TransitionError};
pub use memory::InMemoryMarketplaceRepository;
pub use repository::{
    DisbursementReceipt, LeadFilter, MarketplaceRepository, NewDisbursement, OfferAcceptance,
    RepositoryError,
};
pub use router::marketplace_router;
pub use scoring::{ScoreBreakdown, ScoreFactor, ScoreOutcome, ScoringEngine, FALLBACK_SCORE};
pub use service::{MarketplaceError, MarketplaceService};
