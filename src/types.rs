use serde::{Deserialize, Serialize};

/// Success value for endpoints that answer with an empty body (e.g. deletes).
///
/// Returned by `execute_no_content` without touching the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoContent;

/// Request body for the AI assistant endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub reply: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}
