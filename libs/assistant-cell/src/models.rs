// libs/assistant-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What the admin console is asking the assistant to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantTask {
    /// Periodic overview of the pipeline: stale quotes, today's calls, trends
    Insights,
    /// Free-form staff question over the dashboard snapshot
    CustomQuery,
    /// Rewrite a note field into clean professional French
    EnhanceText,
    /// One-paragraph briefing about a single client
    GenerateClientSummary,
    /// Price-range suggestion for a quote request
    EstimatePrice,
}

fn default_stream() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantRequest {
    #[serde(rename = "type")]
    pub task: AssistantTask,
    pub query: Option<String>,
    /// Snapshot of the dashboard data the task should reason over. The
    /// console sends aggregates and recent rows, never the full tables.
    #[serde(default)]
    pub data: Value,
    /// Stream tokens as they arrive (default), or aggregate server-side and
    /// return the finished text as JSON.
    #[serde(default = "default_stream")]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Public chatbot turn: the visitor-side conversation so far.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("AI gateway rate limit reached")]
    RateLimited,

    #[error("AI gateway credits exhausted")]
    CreditsExhausted,

    #[error("AI gateway error: {0}")]
    Upstream(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("The stream produced no text")]
    EmptyCompletion,
}
