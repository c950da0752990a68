//! API request and response types

use crate::state_machine::Session;
use serde::Serialize;

/// Response for the health probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Response with the active sessions
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: Vec<Session>,
}

/// Response for clearing sessions
#[derive(Debug, Serialize)]
pub struct ClearSessionsResponse {
    pub cleared: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
