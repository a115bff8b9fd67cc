use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::context::RequestContext;
use super::documents::{DocumentKind, DocumentStore, DocumentUpload};
use super::domain::{
    ApplicantAttributes, BankCriteria, BankRegistration, DisbursementRequest, LeadId,
    LeadStatusUpdate, LeadSubmission, OfferId, OfferProposal,
};
use super::intake::ValidationError;
use super::repository::MarketplaceRepository;
use super::service::{MarketplaceError, MarketplaceService};

pub const DOCUMENT_KIND_HEADER: &str = "x-document-kind";
pub const FILE_NAME_HEADER: &str = "x-file-name";

type SharedService<R, D> = State<Arc<MarketplaceService<R, D>>>;

/// Router builder exposing the applicant, bank, and scoring endpoints.
pub fn marketplace_router<R, D>(service: Arc<MarketplaceService<R, D>>) -> Router
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    // One byte of headroom so the service reports oversize files itself.
    let upload_limit = service.config().document_max_bytes.saturating_add(1);

    Router::new()
        .route(
            "/api/v1/leads",
            post(submit_lead_handler::<R, D>).get(list_leads_handler::<R, D>),
        )
        .route("/api/v1/leads/:lead_id", get(lead_handler::<R, D>))
        .route(
            "/api/v1/leads/:lead_id/status",
            patch(lead_status_handler::<R, D>),
        )
        .route(
            "/api/v1/leads/:lead_id/offers",
            get(lead_offers_handler::<R, D>),
        )
        .route(
            "/api/v1/leads/:lead_id/offers/:offer_id/accept",
            post(accept_offer_handler::<R, D>),
        )
        .route(
            "/api/v1/leads/:lead_id/documents",
            post(upload_document_handler::<R, D>)
                .get(list_documents_handler::<R, D>)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/banks", post(register_bank_handler::<R, D>))
        .route("/api/v1/banks/leads", get(bank_leads_handler::<R, D>))
        .route("/api/v1/banks/criteria", put(bank_criteria_handler::<R, D>))
        .route("/api/v1/banks/offers", get(bank_offers_handler::<R, D>))
        .route(
            "/api/v1/banks/leads/:lead_id/offers",
            post(create_offer_handler::<R, D>),
        )
        .route(
            "/api/v1/banks/disbursements",
            post(disbursement_handler::<R, D>),
        )
        .route(
            "/api/v1/scoring/calculate",
            post(calculate_score_handler::<R, D>),
        )
        .route("/api/v1/scoring/model", get(scoring_model_handler::<R, D>))
        .with_state(service)
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "marketplace request failed");
        }
        let payload = json!({
            "error": self.to_string(),
        });
        (status, Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, MarketplaceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn parse_id<T: FromStr>(field: &'static str, raw: &str) -> Result<T, MarketplaceError> {
    raw.parse::<T>().map_err(|_| {
        MarketplaceError::from(ValidationError::InvalidIdentifier {
            field,
            value: raw.to_string(),
        })
    })
}

fn context(headers: &HeaderMap) -> Result<RequestContext, MarketplaceError> {
    Ok(RequestContext::from_headers(headers)?)
}

pub(crate) async fn submit_lead_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Json(submission): Json<LeadSubmission>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers)
        .and_then(|ctx| service.submit_lead(&ctx, submission))
        .map(|lead| lead.view());
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn list_leads_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers)
        .and_then(|ctx| service.list_leads(&ctx))
        .map(|leads| leads.iter().map(|lead| lead.view()).collect::<Vec<_>>());
    respond(StatusCode::OK, result)
}

pub(crate) async fn lead_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        service.get_lead(&ctx, &lead_id).map(|lead| lead.view())
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn lead_status_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(update): Json<LeadStatusUpdate>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        service
            .update_lead_status(&ctx, &lead_id, update)
            .map(|lead| lead.view())
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn lead_offers_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        service.lead_offers(&ctx, &lead_id)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn accept_offer_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path((lead_id, offer_id)): Path<(String, String)>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        let offer_id: OfferId = parse_id("offer_id", &offer_id)?;
        let acceptance = service.accept_offer(&ctx, &lead_id, &offer_id)?;
        Ok(json!({
            "lead": acceptance.lead.view(),
            "offer": acceptance.accepted,
            "rejected_offers": acceptance.rejected,
        }))
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn upload_document_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    body: Bytes,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        let upload = document_upload(&headers, body)?;
        service.upload_document(&ctx, &lead_id, upload)
    });
    respond(StatusCode::CREATED, result)
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn document_upload(headers: &HeaderMap, body: Bytes) -> Result<DocumentUpload, MarketplaceError> {
    let kind = match header_text(headers, DOCUMENT_KIND_HEADER) {
        Some(raw) => DocumentKind::parse(raw)
            .ok_or_else(|| ValidationError::UnknownDocumentKind(raw.to_string()))?,
        None => DocumentKind::Other,
    };

    Ok(DocumentUpload {
        kind,
        file_name: header_text(headers, FILE_NAME_HEADER)
            .unwrap_or_default()
            .to_string(),
        content_type: header_text(headers, header::CONTENT_TYPE.as_str()).map(str::to_string),
        bytes: body.to_vec(),
    })
}

pub(crate) async fn list_documents_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        service.lead_documents(&ctx, &lead_id)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn register_bank_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Json(registration): Json<BankRegistration>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| service.register_bank(&ctx, registration));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn bank_leads_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers)
        .and_then(|ctx| service.qualifying_leads(&ctx))
        .map(|leads| leads.iter().map(|lead| lead.view()).collect::<Vec<_>>());
    respond(StatusCode::OK, result)
}

pub(crate) async fn bank_criteria_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Json(criteria): Json<BankCriteria>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| service.set_bank_criteria(&ctx, criteria));
    respond(StatusCode::OK, result)
}

pub(crate) async fn bank_offers_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| service.bank_offers(&ctx));
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_offer_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(proposal): Json<OfferProposal>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let lead_id: LeadId = parse_id("lead_id", &lead_id)?;
        service.create_offer(&ctx, &lead_id, proposal)
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn disbursement_handler<R, D>(
    State(service): SharedService<R, D>,
    headers: HeaderMap,
    Json(request): Json<DisbursementRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = context(&headers).and_then(|ctx| {
        let receipt = service.disburse(&ctx, request)?;
        Ok(json!({
            "disbursement": receipt.disbursement,
            "lead": receipt.lead.view(),
            "offer": receipt.offer,
        }))
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn calculate_score_handler<R, D>(
    State(service): SharedService<R, D>,
    Json(applicant): Json<ApplicantAttributes>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.calculate_score(&applicant))
}

pub(crate) async fn scoring_model_handler<R, D>(State(service): SharedService<R, D>) -> Response
where
    R: MarketplaceRepository + 'static,
    D: DocumentStore + 'static,
{
    (StatusCode::OK, Json(service.scoring_model())).into_response()
}
