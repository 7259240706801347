// libs/lead-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// QUOTE REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    pub services: Vec<String>,
    pub project_details: Option<String>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteStatus::Pending => write!(f, "pending"),
            QuoteStatus::InProgress => write!(f, "in_progress"),
            QuoteStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuoteRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub project_details: Option<String>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteSearchQuery {
    pub status: Option<QuoteStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuoteStatusRequest {
    pub status: QuoteStatus,
}

// ==============================================================================
// CLIENT PIPELINE
// ==============================================================================

/// Where a contact sits in the sales pipeline. One row per client email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStage {
    Lead,
    Prospect,
    Client,
    Lost,
}

impl fmt::Display for ClientStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStage::Lead => write!(f, "lead"),
            ClientStage::Prospect => write!(f, "prospect"),
            ClientStage::Client => write!(f, "client"),
            ClientStage::Lost => write!(f, "lost"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStatus {
    pub client_email: String,
    pub status: ClientStage,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SetClientStageRequest {
    pub status: ClientStage,
    pub notes: Option<String>,
}

// ==============================================================================
// CALL NOTES
// ==============================================================================

/// Structured notes staff take during or after a booked call. A single flat
/// record with optional fields; which sections the console shows is derived
/// from the client's declared services, never from the record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub call_booking_id: Uuid,
    pub call_summary: Option<String>,
    pub follow_up_actions: Option<String>,
    pub call_outcome: Option<CallOutcome>,
    pub callback_date: Option<NaiveDate>,
    pub internal_notes: Option<String>,
}

impl CallNotes {
    pub fn empty(call_booking_id: Uuid) -> Self {
        Self {
            id: None,
            call_booking_id,
            call_summary: None,
            follow_up_actions: None,
            call_outcome: None,
            callback_date: None,
            internal_notes: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.call_summary.is_none()
            && self.follow_up_actions.is_none()
            && self.call_outcome.is_none()
            && self.callback_date.is_none()
            && self.internal_notes.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Interested,
    ConvertedToQuote,
    NotInterested,
    NoAnswer,
    CallbackScheduled,
}

/// Sections of the client-contact sheet. Visibility is a pure function of
/// the declared services; see `visible_sections`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSection {
    GeneralQuestions,
    CallInfo,
    Business,
    Website,
    MobileApp,
    Automation,
    Ecommerce,
    VisualIdentity,
    ProjectManagement,
    Estimation,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum LeadError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("At least one service must be selected")]
    NoServiceSelected,

    #[error("Consent to the privacy policy is required")]
    ConsentRequired,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: QuoteStatus, to: QuoteStatus },

    #[error("Quote request not found: {0}")]
    QuoteNotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
