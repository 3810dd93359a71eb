use serde::{Deserialize, Serialize};

/// One message of the conversation the agent runtime forwards. Only the
/// system message carrying the selected-source convention is inspected.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    pub content: String,
}

fn default_top_k() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: u64,
    /// Conversation context; selected sources are parsed out of it.
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub result: String,
}
