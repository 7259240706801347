// libs/assistant-cell/src/services/gateway.rs
use futures::StreamExt;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::models::AssistantError;
use crate::services::stream::StreamAggregator;

/// Client for the OpenAI-compatible text-generation gateway. Only the
/// `data: <json>` / `data: [DONE]` line protocol is assumed, not any
/// particular provider.
pub struct AiGatewayService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AiGatewayService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.ai_gateway_url.clone(),
            api_key: config.ai_gateway_api_key.clone(),
            model: config.ai_gateway_model.clone(),
        }
    }

    /// Start a streaming chat completion and hand back the open response.
    ///
    /// Known gateway statuses map to distinguishable errors so the console
    /// can tell "try again in a minute" from "top up your credits".
    pub async fn chat_stream(
        &self,
        messages: Vec<Value>,
    ) -> Result<reqwest::Response, AssistantError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Requesting streaming completion from {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            429 => {
                warn!("AI gateway rate limited the request");
                Err(AssistantError::RateLimited)
            }
            402 => {
                warn!("AI gateway reports exhausted credits");
                Err(AssistantError::CreditsExhausted)
            }
            _ if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                error!("AI gateway error ({}): {}", status, body);
                Err(AssistantError::Upstream(format!("{}: {}", status, body)))
            }
            _ => Ok(response),
        }
    }

    /// Drive a streaming response through the aggregator to completion and
    /// return the full text.
    pub async fn collect(&self, response: reqwest::Response) -> Result<String, AssistantError> {
        let mut aggregator = StreamAggregator::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AssistantError::Network(e.to_string()))?;
            aggregator.push(&chunk);
            if aggregator.is_done() {
                break;
            }
        }

        let text = aggregator.into_text();
        if text.is_empty() {
            return Err(AssistantError::EmptyCompletion);
        }
        Ok(text)
    }
}
