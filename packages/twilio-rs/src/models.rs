use serde::{Deserialize, Serialize};

/// Message resource returned by `POST /Accounts/{sid}/Messages.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    pub status: String,
    pub to: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

/// Error body returned on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct MessageErrorResponse {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub status: Option<u16>,
}
