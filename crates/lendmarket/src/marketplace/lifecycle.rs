//! Offer and lead state machines.
//!
//! Offers move `pending -> accepted | rejected` and `accepted -> completed`.
//! Rejected and completed offers are terminal. Leads follow the applicant's
//! progress through review, acceptance of an offer, and disbursement.

use serde::{Deserialize, Serialize};

use super::domain::{LeadStatus, OfferStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferEvent {
    Accept,
    Reject,
    Complete,
}

impl OfferEvent {
    pub const fn label(self) -> &'static str {
        match self {
            OfferEvent::Accept => "accept",
            OfferEvent::Reject => "reject",
            OfferEvent::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadEvent {
    Review,
    Approve,
    Reject,
    AcceptOffer,
    Complete,
}

impl LeadEvent {
    pub const fn label(self) -> &'static str {
        match self {
            LeadEvent::Review => "review",
            LeadEvent::Approve => "approve",
            LeadEvent::Reject => "reject",
            LeadEvent::AcceptOffer => "accept_offer",
            LeadEvent::Complete => "complete",
        }
    }

    /// Event reaching `status` through a manual status update, if one exists.
    ///
    /// `pending` is only an entry state, `offer_accepted` is only reachable
    /// through offer acceptance, and `completed` only through a disbursement.
    pub const fn for_manual_target(status: LeadStatus) -> Option<Self> {
        match status {
            LeadStatus::Reviewing => Some(LeadEvent::Review),
            LeadStatus::Approved => Some(LeadEvent::Approve),
            LeadStatus::Rejected => Some(LeadEvent::Reject),
            LeadStatus::Pending | LeadStatus::OfferAccepted | LeadStatus::Completed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} in state '{from}' does not allow '{event}'")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub event: &'static str,
}

impl OfferStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, OfferStatus::Rejected | OfferStatus::Completed)
    }

    pub fn apply(self, event: OfferEvent) -> Result<OfferStatus, TransitionError> {
        match (self, event) {
            (OfferStatus::Pending, OfferEvent::Accept) => Ok(OfferStatus::Accepted),
            (OfferStatus::Pending, OfferEvent::Reject) => Ok(OfferStatus::Rejected),
            (OfferStatus::Accepted, OfferEvent::Complete) => Ok(OfferStatus::Completed),
            (from, event) => Err(TransitionError {
                entity: "offer",
                from: from.label(),
                event: event.label(),
            }),
        }
    }
}

impl LeadStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Rejected | LeadStatus::Completed)
    }

    pub fn apply(self, event: LeadEvent) -> Result<LeadStatus, TransitionError> {
        use LeadStatus::*;

        match (self, event) {
            (Pending, LeadEvent::Review) => Ok(Reviewing),
            (Pending | Reviewing, LeadEvent::Approve) => Ok(Approved),
            (Pending | Reviewing | Approved, LeadEvent::Reject) => Ok(Rejected),
            (Pending | Reviewing | Approved, LeadEvent::AcceptOffer) => Ok(OfferAccepted),
            (OfferAccepted, LeadEvent::Complete) => Ok(Completed),
            (from, event) => Err(TransitionError {
                entity: "lead",
                from: from.label(),
                event: event.label(),
            }),
        }
    }
}
