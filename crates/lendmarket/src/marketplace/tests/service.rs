use std::sync::Arc;

use axum::http::StatusCode;
use chrono::NaiveDate;

use super::common::*;

use crate::marketplace::context::{AccessError, RequestContext};
use crate::marketplace::documents::{
    DocumentError, DocumentKind, DocumentUpload, InMemoryDocumentStore,
};
use crate::marketplace::domain::{
    ApplicantAttributes, BankCriteria, BankId, BankRegistration, DisbursementRequest, LeadStatus,
    OfferStatus, ScoreSource,
};
use crate::marketplace::intake::ValidationError;
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::service::{MarketplaceError, MarketplaceService};

#[test]
fn submitted_lead_is_normalised_scored_and_pending() {
    let (service, _, _) = build_service();
    let lead = submit_lead(&service);

    assert_eq!(lead.status, LeadStatus::Pending);
    assert_eq!(lead.score, 93);
    assert_eq!(lead.score_source, ScoreSource::Model);
    assert!(!lead.has_offers);
    assert_eq!(lead.submission.contact.full_name, "Ana Lucia Lopez");
    assert_eq!(lead.submission.contact.email, "ana.lopez@correo.gt");
    assert_eq!(lead.submission.contact.phone, "55551234");
    assert_eq!(
        lead.submission.contact.national_id.as_deref(),
        Some("2547890120101")
    );
}

#[test]
fn banks_cannot_submit_leads_or_accept_offers() {
    let (service, _, _) = build_service();
    let bank = register_bank(&service, "Banco Uno");
    let ctx = RequestContext::bank(bank.id);

    let error = service
        .submit_lead(&ctx, submission())
        .expect_err("bank cannot submit");
    assert!(matches!(
        error,
        MarketplaceError::Access(AccessError::ApplicantOnly)
    ));
    assert_eq!(error.status_code(), StatusCode::FORBIDDEN);

    let lead = submit_lead(&service);
    let offer = offer_from(&service, &bank, &lead, 10_000.0);
    let error = service
        .accept_offer(&ctx, &lead.id, &offer.id)
        .expect_err("bank cannot accept on behalf of the applicant");
    assert!(matches!(
        error,
        MarketplaceError::Access(AccessError::ApplicantOnly)
    ));
}

#[test]
fn invalid_contact_details_are_rejected_before_storage() {
    let (service, _, _) = build_service();
    let mut bad = submission();
    bad.contact.email = "ana@correo".to_string();

    let error = service
        .submit_lead(&RequestContext::applicant(), bad)
        .expect_err("invalid email rejected");
    assert!(matches!(
        error,
        MarketplaceError::Validation(ValidationError::InvalidEmail(_))
    ));
    assert!(service
        .list_leads(&RequestContext::system())
        .expect("listing works")
        .is_empty());
}

#[test]
fn bank_routes_require_registered_bank() {
    let (service, _, _) = build_service();

    let anonymous = service
        .qualifying_leads(&RequestContext::applicant())
        .expect_err("applicant is not a bank");
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let unknown = service
        .qualifying_leads(&RequestContext::bank(BankId::new()))
        .expect_err("unregistered bank refused");
    assert!(matches!(
        unknown,
        MarketplaceError::Access(AccessError::UnknownBank(_))
    ));
    assert_eq!(unknown.status_code(), StatusCode::FORBIDDEN);
}

#[test]
fn duplicate_bank_email_conflicts() {
    let (service, _, _) = build_service();
    register_bank(&service, "Banco Uno");

    let error = service
        .register_bank(
            &RequestContext::system(),
            BankRegistration {
                name: "Banco Uno Bis".to_string(),
                email: "BANCO.UNO@bancos.gt".to_string(),
            },
        )
        .expect_err("duplicate email refused");
    assert_eq!(error.status_code(), StatusCode::CONFLICT);
}

#[test]
fn qualifying_leads_follow_bank_criteria() {
    let (service, _, _) = build_service();
    let bank = register_bank(&service, "Banco Uno");
    let ctx = RequestContext::bank(bank.id);

    let strong = submit_lead(&service);
    let mut weak = submission();
    weak.applicant = ApplicantAttributes::default();
    weak.requested_amount = Some(5_000.0);
    let weak = service
        .submit_lead(&RequestContext::applicant(), weak)
        .expect("weak lead stored");

    assert_eq!(service.qualifying_leads(&ctx).expect("listing").len(), 2);

    service
        .set_bank_criteria(
            &ctx,
            BankCriteria {
                min_score: Some(60),
                max_amount: None,
            },
        )
        .expect("criteria saved");
    let leads = service.qualifying_leads(&ctx).expect("listing");
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].id, strong.id);

    service
        .set_bank_criteria(
            &ctx,
            BankCriteria {
                min_score: None,
                max_amount: Some(10_000.0),
            },
        )
        .expect("criteria saved");
    let leads = service.qualifying_leads(&ctx).expect("listing");
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].id, weak.id);

    let invalid = service
        .set_bank_criteria(
            &ctx,
            BankCriteria {
                min_score: Some(101),
                max_amount: None,
            },
        )
        .expect_err("score above range refused");
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
fn offers_derive_installment_and_flag_the_lead() {
    let (service, _, _) = build_service();
    let lead = submit_lead(&service);
    let bank = register_bank(&service, "Banco Uno");

    let offer = service
        .create_offer(
            &RequestContext::bank(bank.id),
            &lead.id,
            crate::marketplace::domain::OfferProposal {
                amount: 12_000.0,
                annual_rate: 12.0,
                term_months: 12,
                monthly_installment: None,
                validity_days: Some(7),
            },
        )
        .expect("offer created");

    assert_eq!(offer.status, OfferStatus::Pending);
    assert_eq!(offer.terms.monthly_installment, 1066.19);
    assert_eq!((offer.valid_until - offer.created_at).num_days(), 7);

    let stored = service
        .get_lead(&RequestContext::system(), &lead.id)
        .expect("lead found");
    assert!(stored.has_offers);
    assert_eq!(
        service
            .bank_offers(&RequestContext::bank(bank.id))
            .expect("bank offers")
            .len(),
        1
    );
}

#[test]
fn two_bank_scenario_ends_in_conflict_for_the_loser() {
    let (service, _, _) = build_service();
    let lead = submit_lead(&service);
    let first = register_bank(&service, "Banco Uno");
    let second = register_bank(&service, "Banco Dos");
    let o1 = offer_from(&service, &first, &lead, 25_000.0);
    let o2 = offer_from(&service, &second, &lead, 22_000.0);

    let acceptance = service
        .accept_offer(&RequestContext::applicant(), &lead.id, &o1.id)
        .expect("o1 accepted");
    assert_eq!(acceptance.accepted.status, OfferStatus::Accepted);
    assert_eq!(acceptance.lead.status, LeadStatus::OfferAccepted);
    assert_eq!(acceptance.rejected, vec![o2.id]);

    let offers = service
        .lead_offers(&RequestContext::applicant(), &lead.id)
        .expect("offers listed");
    let o2_now = offers
        .iter()
        .find(|offer| offer.id == o2.id)
        .expect("o2 present");
    assert_eq!(o2_now.status, OfferStatus::Rejected);

    let error = service
        .accept_offer(&RequestContext::applicant(), &lead.id, &o2.id)
        .expect_err("o2 cannot be accepted");
    assert_eq!(error.status_code(), StatusCode::CONFLICT);
}

#[test]
fn disbursement_without_accepted_offer_creates_nothing() {
    let (service, repository, _) = build_service();
    let lead = submit_lead(&service);
    let bank = register_bank(&service, "Banco Uno");
    offer_from(&service, &bank, &lead, 25_000.0);

    let error = service
        .disburse(
            &RequestContext::bank(bank.id),
            DisbursementRequest {
                lead_id: lead.id,
                amount: 25_000.0,
                disbursed_on: None,
            },
        )
        .expect_err("no accepted offer");
    assert!(matches!(
        error,
        MarketplaceError::Repository(RepositoryError::NoAcceptedOffer { .. })
    ));
    assert_eq!(error.status_code(), StatusCode::CONFLICT);
    assert_eq!(repository.disbursement_count().expect("store readable"), 0);

    let stored = service
        .get_lead(&RequestContext::system(), &lead.id)
        .expect("lead found");
    assert_eq!(stored.status, LeadStatus::Pending);
}

#[test]
fn only_the_accepted_bank_may_disburse() {
    let (service, repository, _) = build_service();
    let lead = submit_lead(&service);
    let winner = register_bank(&service, "Banco Uno");
    let loser = register_bank(&service, "Banco Dos");
    let offer = offer_from(&service, &winner, &lead, 25_000.0);
    offer_from(&service, &loser, &lead, 24_000.0);
    service
        .accept_offer(&RequestContext::applicant(), &lead.id, &offer.id)
        .expect("accepted");

    let error = service
        .disburse(
            &RequestContext::bank(loser.id),
            DisbursementRequest {
                lead_id: lead.id,
                amount: 24_000.0,
                disbursed_on: None,
            },
        )
        .expect_err("rejected bank cannot disburse");
    assert!(matches!(
        error,
        MarketplaceError::Repository(RepositoryError::NoAcceptedOffer { .. })
    ));
    assert_eq!(repository.disbursement_count().expect("store readable"), 0);
}

#[test]
fn disbursement_completes_offer_and_lead() {
    let (service, repository, _) = build_service();
    let lead = submit_lead(&service);
    let bank = register_bank(&service, "Banco Uno");
    let offer = offer_from(&service, &bank, &lead, 25_000.0);
    service
        .accept_offer(&RequestContext::applicant(), &lead.id, &offer.id)
        .expect("accepted");

    let disbursed_on = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date");
    let receipt = service
        .disburse(
            &RequestContext::bank(bank.id),
            DisbursementRequest {
                lead_id: lead.id,
                amount: 25_000.0,
                disbursed_on: Some(disbursed_on),
            },
        )
        .expect("disbursement recorded");

    assert_eq!(receipt.offer.status, OfferStatus::Completed);
    assert_eq!(receipt.lead.status, LeadStatus::Completed);
    assert_eq!(receipt.disbursement.offer_id, offer.id);
    assert_eq!(receipt.disbursement.lead_id, lead.id);
    assert_eq!(receipt.disbursement.disbursed_on, disbursed_on);
    assert_eq!(repository.disbursement_count().expect("store readable"), 1);

    let history = repository
        .list_disbursements_for_lead(&RequestContext::system(), &lead.id)
        .expect("history");
    assert_eq!(history.len(), 1);

    let again = service
        .disburse(
            &RequestContext::bank(bank.id),
            DisbursementRequest {
                lead_id: lead.id,
                amount: 25_000.0,
                disbursed_on: None,
            },
        )
        .expect_err("completed offer cannot be disbursed twice");
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
    assert_eq!(repository.disbursement_count().expect("store readable"), 1);
}

#[test]
fn documents_are_stored_and_signed() {
    let (service, _, documents) = build_service();
    let lead = submit_lead(&service);
    let ctx = RequestContext::applicant();

    let receipt = service
        .upload_document(
            &ctx,
            &lead.id,
            DocumentUpload {
                kind: DocumentKind::IncomeProof,
                file_name: "constancia.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                bytes: b"%PDF-1.7 payroll".to_vec(),
            },
        )
        .expect("upload succeeds");

    assert_eq!(receipt.document.content_type, "application/pdf");
    assert_eq!(receipt.document.original_name, "constancia.pdf");
    assert!(receipt
        .access_url
        .starts_with("https://files.lendmarket.test/"));
    assert_eq!(
        (receipt.expires_at - receipt.document.created_at).num_seconds(),
        3600
    );
    assert!(documents.object(&receipt.document.storage_path).is_some());

    let listed = service
        .lead_documents(&ctx, &lead.id)
        .expect("documents listed");
    assert_eq!(listed, vec![receipt.document]);
}

#[test]
fn oversized_or_unknown_documents_never_reach_storage() {
    let (service, _, documents) = build_service();
    let lead = submit_lead(&service);
    let ctx = RequestContext::applicant();

    let too_large = service
        .upload_document(
            &ctx,
            &lead.id,
            DocumentUpload {
                kind: DocumentKind::Identity,
                file_name: "dpi.png".to_string(),
                content_type: None,
                bytes: vec![0; 2048],
            },
        )
        .expect_err("size limit enforced");
    assert!(matches!(
        too_large,
        MarketplaceError::Document(DocumentError::TooLarge { .. })
    ));
    assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let unknown_lead = service
        .upload_document(
            &ctx,
            &crate::marketplace::domain::LeadId::new(),
            DocumentUpload {
                kind: DocumentKind::Identity,
                file_name: "dpi.png".to_string(),
                content_type: None,
                bytes: vec![0; 16],
            },
        )
        .expect_err("lead must exist");
    assert_eq!(unknown_lead.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(documents.object_count(), Ok(0));
}

#[test]
fn failed_metadata_write_removes_stored_document() {
    let documents = InMemoryDocumentStore::new("https://files.lendmarket.test");
    let service = MarketplaceService::new(
        Arc::new(MetadataOutage::default()),
        Arc::new(documents.clone()),
        marketplace_config(),
    );
    let lead = service
        .submit_lead(&RequestContext::applicant(), submission())
        .expect("lead stored");

    let error = service
        .upload_document(
            &RequestContext::applicant(),
            &lead.id,
            DocumentUpload {
                kind: DocumentKind::IncomeProof,
                file_name: "payslip.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                bytes: b"%PDF-1.7".to_vec(),
            },
        )
        .expect_err("metadata write fails");

    assert!(matches!(
        error,
        MarketplaceError::Repository(RepositoryError::Unavailable(_))
    ));
    assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(documents.object_count(), Ok(0));
}

#[test]
fn standalone_score_requires_core_attributes() {
    let (service, _, _) = build_service();

    let outcome = service
        .calculate_score(&strong_applicant())
        .expect("scenario scores");
    assert_eq!(outcome.score, 93);

    let error = service
        .calculate_score(&ApplicantAttributes {
            monthly_income: Some(4_000.0),
            ..ApplicantAttributes::default()
        })
        .expect_err("housing missing");
    assert!(matches!(
        error,
        MarketplaceError::Validation(ValidationError::MissingField("housing"))
    ));
}

#[test]
fn repository_outage_surfaces_as_server_error() {
    let service = MarketplaceService::new(
        Arc::new(UnavailableRepository),
        Arc::new(InMemoryDocumentStore::default()),
        marketplace_config(),
    );
    let error = service
        .submit_lead(&RequestContext::applicant(), submission())
        .expect_err("store offline");
    assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(UnavailableRepository
        .list_leads(&RequestContext::system(), &Default::default())
        .is_err());
}
