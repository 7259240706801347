// libs/lead-cell/src/services/quotes.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ClientStage, ClientStatus, LeadError, QuoteRequest, QuoteSearchQuery, QuoteStatus,
    SubmitQuoteRequest,
};

pub struct QuoteService {
    supabase: Arc<SupabaseClient>,
}

impl QuoteService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Accept a quote request from the public form.
    pub async fn submit_quote(
        &self,
        request: SubmitQuoteRequest,
    ) -> Result<QuoteRequest, LeadError> {
        validate_quote_request(&request)?;

        let quote_data = json!({
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "business_type": request.business_type,
            "services": request.services,
            "project_details": request.project_details,
            "budget": request.budget,
            "timeline": request.timeline,
            "status": QuoteStatus::Pending,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/quote_requests",
                None,
                Some(quote_data),
                Some(headers),
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| LeadError::DatabaseError("Insert returned no row".to_string()))?;

        let quote: QuoteRequest = serde_json::from_value(row)
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse quote: {}", e)))?;

        info!("Quote request {} received from {}", quote.id, quote.email);
        Ok(quote)
    }

    /// Admin listing with status filter and free-text search over name,
    /// email and business type.
    pub async fn list_quotes(
        &self,
        query: &QuoteSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<QuoteRequest>, LeadError> {
        let mut query_parts = Vec::new();

        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
            let pattern = format!("*{}*", term.trim());
            let encoded = urlencoding::encode(&pattern);
            query_parts.push(format!(
                "or=(name.ilike.{enc},email.ilike.{enc},business_type.ilike.{enc})",
                enc = encoded
            ));
        }
        query_parts.push("order=created_at.desc".to_string());

        let path = format!("/rest/v1/quote_requests?{}", query_parts.join("&"));

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<QuoteRequest>, _>>()
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse quotes: {}", e)))
    }

    pub async fn get_quote(
        &self,
        quote_id: Uuid,
        auth_token: &str,
    ) -> Result<QuoteRequest, LeadError> {
        let path = format!("/rest/v1/quote_requests?id=eq.{}", quote_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(LeadError::QuoteNotFound(quote_id))?;

        serde_json::from_value(row)
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse quote: {}", e)))
    }

    /// Staff pipeline transition for a quote request.
    pub async fn update_status(
        &self,
        quote_id: Uuid,
        new_status: QuoteStatus,
        auth_token: &str,
    ) -> Result<QuoteRequest, LeadError> {
        let current = self.get_quote(quote_id, auth_token).await?;
        validate_status_transition(current.status, new_status)?;

        let path = format!("/rest/v1/quote_requests?id=eq.{}", quote_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": new_status })),
                Some(headers),
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(LeadError::QuoteNotFound(quote_id))?;

        serde_json::from_value(row)
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse quote: {}", e)))
    }

    /// Remove a quote request, then drop the client's pipeline row if this
    /// was their last interaction.
    pub async fn delete_quote(&self, quote_id: Uuid, auth_token: &str) -> Result<(), LeadError> {
        let quote = self.get_quote(quote_id, auth_token).await?;

        let path = format!("/rest/v1/quote_requests?id=eq.{}", quote_id);
        let _: Value = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        info!("Quote request {} deleted", quote_id);
        self.cleanup_orphaned_client(&quote.email, auth_token).await?;
        Ok(())
    }

    // ==============================================================================
    // CLIENT PIPELINE
    // ==============================================================================

    pub async fn list_clients(&self, auth_token: &str) -> Result<Vec<ClientStatus>, LeadError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/client_statuses?order=updated_at.desc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ClientStatus>, _>>()
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse clients: {}", e)))
    }

    /// Upsert the pipeline stage for a client email.
    pub async fn set_client_stage(
        &self,
        client_email: &str,
        stage: ClientStage,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<ClientStatus, LeadError> {
        debug!("Setting {} to stage {}", client_email, stage);

        let status_data = json!({
            "client_email": client_email,
            "status": stage,
            "notes": notes,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static(
                "resolution=merge-duplicates,return=representation",
            ),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/client_statuses?on_conflict=client_email",
                Some(auth_token),
                Some(status_data),
                Some(headers),
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| LeadError::DatabaseError("Upsert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse client: {}", e)))
    }

    /// Drop the pipeline row for an email with no remaining quote requests
    /// or call bookings.
    async fn cleanup_orphaned_client(
        &self,
        client_email: &str,
        auth_token: &str,
    ) -> Result<(), LeadError> {
        let encoded = urlencoding::encode(client_email);

        let quotes: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                &format!("/rest/v1/quote_requests?email=eq.{}&select=id", encoded),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        let bookings: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                &format!("/rest/v1/call_bookings?email=eq.{}&select=id", encoded),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        if !quotes.is_empty() || !bookings.is_empty() {
            return Ok(());
        }

        warn!("Removing orphaned pipeline row for {}", client_email);
        let _: Value = self
            .supabase
            .request(
                Method::DELETE,
                &format!("/rest/v1/client_statuses?client_email=eq.{}", encoded),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

fn validate_quote_request(request: &SubmitQuoteRequest) -> Result<(), LeadError> {
    if request.name.trim().is_empty() {
        return Err(LeadError::MissingField("name"));
    }
    if request.email.trim().is_empty() {
        return Err(LeadError::MissingField("email"));
    }
    if !request.email.contains('@') {
        return Err(LeadError::InvalidEmail);
    }
    if request.services.is_empty() {
        return Err(LeadError::NoServiceSelected);
    }
    if !request.consent_given {
        return Err(LeadError::ConsentRequired);
    }
    Ok(())
}

fn validate_status_transition(from: QuoteStatus, to: QuoteStatus) -> Result<(), LeadError> {
    let allowed: &[QuoteStatus] = match from {
        QuoteStatus::Pending => &[QuoteStatus::InProgress, QuoteStatus::Completed],
        QuoteStatus::InProgress => &[QuoteStatus::Completed],
        // Completed quotes can be reopened when a client comes back
        QuoteStatus::Completed => &[QuoteStatus::InProgress],
    };

    if allowed.contains(&to) {
        Ok(())
    } else {
        Err(LeadError::InvalidStatusTransition { from, to })
    }
}
